// The extension registry: one `NativeExtension` per loaded library.
//
// A `NativeExtension` owns the dynamic library, the `Initialization` record
// its entry symbol filled in, its current initialization level and an arena
// of the classes it registered. Its address is the `ClassLibraryPtr` the
// extension receives; the registration callbacks below map that pointer back
// to the extension through the `LIVE` table, so a stale or forged handle is
// rejected instead of dereferenced.
//
// Lifecycle:
// - `open_library(path, entry_symbol)` (or `open_static` for an entry
//   function linked into the host) calls the entry symbol with the frozen
//   interface table. The level starts at -1.
// - `initialize_library(level)` requires `level` above the current level.
// - `deinitialize_library(level)` requires `level` at or below the current
//   level and leaves the extension at `level - 1`.
// - `close_library()` unregisters every class still in the arena, newest
//   first, then releases the library.
//
// Registration rules: a class name must be a valid identifier not yet in
// the class database; its parent must be a core class or a class of this
// same extension. Everything registered on a class (methods, constants,
// properties, groups, signals) requires the class to be in this
// extension's arena.
//
// **Critical constraint:** the state lock is never held while foreign code
// runs (entry symbol, initialize/deinitialize). Extensions re-enter the
// registration callbacks from those calls.

use std::ffi::c_char;
use std::mem::MaybeUninit;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Weak};

use gdhost_core::class_db::{
    self, BoundMethod, ClassApi, ClassDbError, ClassRegistration, ExtensionClassVTable,
    PropertyDesc, PropertyGroup,
};
use gdhost_core::{ForeignPtr, GString, StringName, VariantType};
use gdhost_sys::{
    self as sys, ClassLibraryPtr, ExtensionClassCreationInfo, ExtensionClassMethodInfo, GdBool,
    GdInt, Initialization, InitializationFunction, InitializationLevel, PropertyInfo, StringPtr,
};
use indexmap::IndexMap;
use libloading::Library;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::interface::{self, RegistrationHooks, c_str, emplace, name_arg};
use crate::method_bind::ExtensionMethodBind;

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("library is already open")]
    AlreadyOpen,
    #[error("library is not open")]
    NotOpen,
    #[error("cannot open library {path}: {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("entry symbol '{symbol}' not found in {path}: {source}")]
    MissingSymbol {
        symbol: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("entry symbol of {0} reported failure")]
    InitializationFailed(String),
    #[error("initialization level {requested} is not above the current level {current}")]
    LevelNotAscending { requested: InitializationLevel, current: i32 },
    #[error("deinitialization level {requested} is above the current level {current}")]
    LevelAboveCurrent { requested: InitializationLevel, current: i32 },
    #[error("invalid initialization level {0}")]
    InvalidLevel(InitializationLevel),
    #[error("'{0}' is not a valid class name")]
    InvalidClassName(String),
    #[error("class '{0}' is already registered")]
    ClassExists(StringName),
    #[error("parent class '{parent}' of '{class}' does not exist")]
    ParentNotFound { class: StringName, parent: StringName },
    #[error(
        "class '{class}' inherits '{parent}' from another extension; \
         inheriting from another extension class is unsupported"
    )]
    CrossExtensionParent { class: StringName, parent: StringName },
    #[error("class '{0}' is not registered by this extension")]
    ClassNotInExtension(StringName),
    #[error("class '{0}' cannot be unregistered while its children exist")]
    ChildrenExist(StringName),
    #[error("invalid method: {0}")]
    InvalidMethod(String),
    #[error(transparent)]
    ClassDb(#[from] ClassDbError),
}

/// A class registered by an extension, as tracked in its arena.
#[derive(Clone)]
pub struct ExtensionClass {
    pub class_name: StringName,
    pub parent_class_name: StringName,
    /// Set when the parent is another class of the same extension.
    pub parent: Option<StringName>,
    pub children: Vec<StringName>,
    pub vtable: Arc<ExtensionClassVTable>,
}

#[derive(Clone, Copy)]
struct InitRecord(Initialization);

// The userdata pointer belongs to the extension and is only passed back.
unsafe impl Send for InitRecord {}

#[derive(Default)]
struct ExtensionState {
    open: bool,
    library: Option<Library>,
    path: Option<PathBuf>,
    initialization: Option<InitRecord>,
    level: i32,
    classes: IndexMap<StringName, ExtensionClass>,
}

pub struct NativeExtension {
    state: Mutex<ExtensionState>,
}

static LIVE: LazyLock<RwLock<FxHashMap<usize, Weak<NativeExtension>>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

impl NativeExtension {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ExtensionState {
                level: -1,
                ..ExtensionState::default()
            }),
        })
    }

    /// The handle passed to the extension as `ClassLibraryPtr`.
    pub fn handle(self: &Arc<Self>) -> ClassLibraryPtr {
        Arc::as_ptr(self).cast_mut().cast()
    }

    /// Resolve a handle received from foreign code.
    pub fn from_handle(library: ClassLibraryPtr) -> Option<Arc<NativeExtension>> {
        LIVE.read().get(&(library as usize)).and_then(Weak::upgrade)
    }

    pub fn is_library_open(&self) -> bool {
        self.state.lock().open
    }

    /// Current initialization level; -1 before the first level.
    pub fn initialization_level(&self) -> i32 {
        self.state.lock().level
    }

    pub fn minimum_initialization_level(&self) -> InitializationLevel {
        self.state
            .lock()
            .initialization
            .map_or(sys::INITIALIZATION_CORE, |i| i.0.minimum_initialization_level)
    }

    pub fn library_path(&self) -> Option<PathBuf> {
        self.state.lock().path.clone()
    }

    /// Classes in registration order.
    pub fn class_names(&self) -> Vec<StringName> {
        self.state.lock().classes.keys().cloned().collect()
    }

    pub fn class(&self, name: &StringName) -> Option<ExtensionClass> {
        self.state.lock().classes.get(name).cloned()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Load the library at `path` and run its entry symbol.
    pub fn open_library(self: &Arc<Self>, path: &Path, entry_symbol: &str) -> Result<(), ExtensionError> {
        if self.is_library_open() {
            return Err(ExtensionError::AlreadyOpen);
        }
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let library = unsafe { Library::new(&absolute) }.map_err(|source| {
            ExtensionError::LoadFailed {
                path: absolute.clone(),
                source,
            }
        })?;
        let entry: InitializationFunction = unsafe {
            library
                .get::<InitializationFunction>(entry_symbol.as_bytes())
                .map(|symbol| *symbol)
        }
        .map_err(|source| ExtensionError::MissingSymbol {
            symbol: entry_symbol.to_owned(),
            path: absolute.clone(),
            source,
        })?;
        log::info!("opened extension library {}", absolute.display());
        {
            let mut state = self.state.lock();
            state.library = Some(library);
            state.path = Some(absolute.clone());
        }
        unsafe { self.run_entry(entry, &absolute.display().to_string()) }
    }

    /// Run an entry function that is linked into the host instead of loaded
    /// from a file. `label` stands in for the library path.
    ///
    /// # Safety
    /// `entry` must follow the `InitializationFunction` contract.
    pub unsafe fn open_static(
        self: &Arc<Self>,
        entry: InitializationFunction,
        label: &str,
    ) -> Result<(), ExtensionError> {
        {
            let mut state = self.state.lock();
            if state.open {
                return Err(ExtensionError::AlreadyOpen);
            }
            state.path = Some(PathBuf::from(label));
        }
        unsafe { self.run_entry(entry, label) }
    }

    unsafe fn run_entry(
        self: &Arc<Self>,
        entry: InitializationFunction,
        label: &str,
    ) -> Result<(), ExtensionError> {
        LIVE.write()
            .insert(self.handle() as usize, Arc::downgrade(self));
        let mut init = MaybeUninit::new(Initialization::default());
        let ok = unsafe { entry(interface::native_interface(), self.handle(), init.as_mut_ptr()) };
        if ok == 0 {
            let (classes, library) = {
                let mut state = self.state.lock();
                state.path = None;
                (std::mem::take(&mut state.classes), state.library.take())
            };
            unregister_all(&classes);
            LIVE.write().remove(&(self.handle() as usize));
            drop(library);
            log::error!("entry symbol of {label} returned failure");
            return Err(ExtensionError::InitializationFailed(label.to_owned()));
        }
        let init = unsafe { init.assume_init() };
        let mut state = self.state.lock();
        state.initialization = Some(InitRecord(init));
        state.level = -1;
        state.open = true;
        Ok(())
    }

    pub fn initialize_library(&self, level: InitializationLevel) -> Result<(), ExtensionError> {
        if level >= sys::INITIALIZATION_MAX {
            return Err(ExtensionError::InvalidLevel(level));
        }
        let init = {
            let mut state = self.state.lock();
            if !state.open {
                return Err(ExtensionError::NotOpen);
            }
            if level as i32 <= state.level {
                return Err(ExtensionError::LevelNotAscending {
                    requested: level,
                    current: state.level,
                });
            }
            state.level = level as i32;
            state.initialization
        };
        if let Some(InitRecord(init)) = init
            && let Some(f) = init.initialize
        {
            unsafe { f(init.userdata, level) };
        }
        log::debug!("initialized extension at level {level}");
        Ok(())
    }

    pub fn deinitialize_library(&self, level: InitializationLevel) -> Result<(), ExtensionError> {
        let init = {
            let mut state = self.state.lock();
            if !state.open {
                return Err(ExtensionError::NotOpen);
            }
            if level as i32 > state.level {
                return Err(ExtensionError::LevelAboveCurrent {
                    requested: level,
                    current: state.level,
                });
            }
            state.level = level as i32 - 1;
            state.initialization
        };
        if let Some(InitRecord(init)) = init
            && let Some(f) = init.deinitialize
        {
            unsafe { f(init.userdata, level) };
        }
        log::debug!("deinitialized extension at level {level}");
        Ok(())
    }

    /// Unregister the remaining classes and release the library.
    pub fn close_library(&self) -> Result<(), ExtensionError> {
        let (classes, library) = {
            let mut state = self.state.lock();
            if !state.open {
                return Err(ExtensionError::NotOpen);
            }
            state.open = false;
            state.initialization = None;
            state.level = -1;
            state.path = None;
            (std::mem::take(&mut state.classes), state.library.take())
        };
        unregister_all(&classes);
        LIVE.write()
            .remove(&(std::ptr::from_ref(self) as usize));
        drop(library);
        log::info!("closed extension library");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    fn require_class(&self, class: &StringName) -> Result<(), ExtensionError> {
        if self.state.lock().classes.contains_key(class) {
            Ok(())
        } else {
            Err(ExtensionError::ClassNotInExtension(class.clone()))
        }
    }

    pub fn register_class(
        self: &Arc<Self>,
        class_name: StringName,
        parent_class_name: StringName,
        info: &ExtensionClassCreationInfo,
    ) -> Result<(), ExtensionError> {
        if !GString::from(class_name.as_str()).is_valid_identifier() {
            return Err(ExtensionError::InvalidClassName(class_name.to_string()));
        }
        if class_db::class_exists(&class_name) {
            return Err(ExtensionError::ClassExists(class_name));
        }
        let mut state = self.state.lock();
        let parent = if state.classes.contains_key(&parent_class_name) {
            Some(parent_class_name.clone())
        } else {
            match class_db::class_info(&parent_class_name) {
                Some(info) if info.api == ClassApi::Extension => {
                    return Err(ExtensionError::CrossExtensionParent {
                        class: class_name,
                        parent: parent_class_name,
                    });
                }
                Some(_) => None,
                None => {
                    return Err(ExtensionError::ParentNotFound {
                        class: class_name,
                        parent: parent_class_name,
                    });
                }
            }
        };
        let vtable = Arc::new(ExtensionClassVTable { info: *info });
        class_db::register_extension_class(ClassRegistration {
            name: class_name.clone(),
            parent: parent_class_name.clone(),
            library: ForeignPtr(self.handle()),
            vtable: Arc::clone(&vtable),
        })?;
        if let Some(parent) = &parent
            && let Some(record) = state.classes.get_mut(parent)
        {
            record.children.push(class_name.clone());
        }
        state.classes.insert(
            class_name.clone(),
            ExtensionClass {
                class_name,
                parent_class_name,
                parent,
                children: Vec::new(),
                vtable,
            },
        );
        Ok(())
    }

    /// # Safety
    /// See `ExtensionMethodBind::from_info`.
    pub unsafe fn register_method(
        &self,
        class: &StringName,
        info: &ExtensionClassMethodInfo,
    ) -> Result<(), ExtensionError> {
        self.require_class(class)?;
        let bind = unsafe { ExtensionMethodBind::from_info(info) }.map_err(ExtensionError::InvalidMethod)?;
        class_db::bind_method(class, BoundMethod::new(Box::new(bind)))?;
        Ok(())
    }

    pub fn register_integer_constant(
        &self,
        class: &StringName,
        enum_name: &StringName,
        name: &StringName,
        value: i64,
        bitfield: bool,
    ) -> Result<(), ExtensionError> {
        self.require_class(class)?;
        class_db::bind_integer_constant(class, enum_name, name, value, bitfield)?;
        Ok(())
    }

    pub fn register_property(
        &self,
        class: &StringName,
        desc: PropertyDesc,
        setter: StringName,
        getter: StringName,
    ) -> Result<(), ExtensionError> {
        self.require_class(class)?;
        class_db::add_property(class, desc, setter, getter)?;
        Ok(())
    }

    pub fn register_property_group(
        &self,
        class: &StringName,
        group: PropertyGroup,
    ) -> Result<(), ExtensionError> {
        self.require_class(class)?;
        class_db::add_property_group(class, group)?;
        Ok(())
    }

    pub fn register_signal(
        &self,
        class: &StringName,
        name: &StringName,
        arguments: Vec<PropertyDesc>,
    ) -> Result<(), ExtensionError> {
        self.require_class(class)?;
        class_db::add_signal(class, name, arguments)?;
        Ok(())
    }

    pub fn unregister_class(&self, class: &StringName) -> Result<(), ExtensionError> {
        let mut state = self.state.lock();
        let record = state
            .classes
            .get(class)
            .ok_or_else(|| ExtensionError::ClassNotInExtension(class.clone()))?;
        if !record.children.is_empty() {
            return Err(ExtensionError::ChildrenExist(class.clone()));
        }
        let parent = record.parent.clone();
        class_db::unregister_class(class)?;
        state.classes.shift_remove(class);
        if let Some(parent) = parent
            && let Some(record) = state.classes.get_mut(&parent)
        {
            record.children.retain(|c| c != class);
        }
        Ok(())
    }
}

impl std::fmt::Debug for NativeExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("NativeExtension")
            .field("path", &state.path)
            .field("open", &state.open)
            .field("level", &state.level)
            .field("classes", &state.classes.len())
            .finish()
    }
}

/// Unregisters newest first, so children go before their parents.
fn unregister_all(classes: &IndexMap<StringName, ExtensionClass>) {
    for name in classes.keys().rev() {
        if let Err(e) = class_db::unregister_class(name) {
            log::warn!("class {name} was already gone at close: {e}");
        }
    }
}

impl Drop for NativeExtension {
    fn drop(&mut self) {
        if self.state.get_mut().open
            && let Err(e) = self.close_library()
        {
            log::warn!("closing extension on drop failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Registration callbacks handed to extensions
// ---------------------------------------------------------------------------

fn with_extension(library: ClassLibraryPtr, f: impl FnOnce(&Arc<NativeExtension>) -> Result<(), ExtensionError>) {
    let Some(extension) = NativeExtension::from_handle(library) else {
        gdhost_core::err_print!("library handle {library:p} does not name a loaded extension");
        return;
    };
    if let Err(e) = f(&extension) {
        gdhost_core::err_print!("{e}");
    }
}

/// Convert a foreign property description. `None` when the name is unusable.
///
/// # Safety
/// The strings in `info` must be null or NUL-terminated.
pub unsafe fn property_desc(info: &PropertyInfo) -> Option<PropertyDesc> {
    let name = unsafe { c_str(info.name) }?;
    let ty = VariantType::from_raw(info.type_).unwrap_or_else(|| {
        gdhost_core::err_print!("property '{name}' has invalid type {}", info.type_);
        VariantType::Nil
    });
    let mut desc = PropertyDesc::new(ty, name);
    if let Some(class_name) = unsafe { c_str(info.class_name) } {
        desc.class_name = StringName::new(class_name);
    }
    desc.hint = info.hint;
    desc.hint_string = unsafe { c_str(info.hint_string) }.unwrap_or_default().to_owned();
    desc.usage = info.usage;
    Some(desc)
}

unsafe fn optional_name(ptr: *const c_char) -> StringName {
    unsafe { c_str(ptr) }.map(StringName::new).unwrap_or_default()
}

unsafe extern "C" fn register_class(
    library: ClassLibraryPtr,
    class_name: *const c_char,
    parent_class_name: *const c_char,
    info: *const ExtensionClassCreationInfo,
) {
    let (Some(class_name), Some(parent)) = (unsafe {
        (
            name_arg(class_name, "class name"),
            name_arg(parent_class_name, "parent class name"),
        )
    }) else {
        return;
    };
    let Some(info) = (unsafe { info.as_ref() }) else {
        gdhost_core::err_print!("class '{class_name}' registered without creation info");
        return;
    };
    with_extension(library, |ext| ext.register_class(class_name, parent, info));
}

unsafe extern "C" fn register_method(
    library: ClassLibraryPtr,
    class_name: *const c_char,
    info: *const ExtensionClassMethodInfo,
) {
    let Some(class_name) = (unsafe { name_arg(class_name, "class name") }) else {
        return;
    };
    let Some(info) = (unsafe { info.as_ref() }) else {
        gdhost_core::err_print!("method of '{class_name}' registered without info");
        return;
    };
    with_extension(library, |ext| unsafe { ext.register_method(&class_name, info) });
}

unsafe extern "C" fn register_integer_constant(
    library: ClassLibraryPtr,
    class_name: *const c_char,
    enum_name: *const c_char,
    constant_name: *const c_char,
    value: GdInt,
    is_bitfield: GdBool,
) {
    let (Some(class_name), Some(constant_name)) = (unsafe {
        (
            name_arg(class_name, "class name"),
            name_arg(constant_name, "constant name"),
        )
    }) else {
        return;
    };
    let enum_name = unsafe { optional_name(enum_name) };
    with_extension(library, |ext| {
        ext.register_integer_constant(&class_name, &enum_name, &constant_name, value, is_bitfield != 0)
    });
}

unsafe extern "C" fn register_property(
    library: ClassLibraryPtr,
    class_name: *const c_char,
    info: *const PropertyInfo,
    setter: *const c_char,
    getter: *const c_char,
) {
    let Some(class_name) = (unsafe { name_arg(class_name, "class name") }) else {
        return;
    };
    let Some(desc) = (unsafe { info.as_ref() }).and_then(|i| unsafe { property_desc(i) }) else {
        gdhost_core::err_print!("property of '{class_name}' registered without a usable name");
        return;
    };
    let (setter, getter) = unsafe { (optional_name(setter), optional_name(getter)) };
    with_extension(library, |ext| ext.register_property(&class_name, desc, setter, getter));
}

unsafe fn register_group(
    library: ClassLibraryPtr,
    class_name: *const c_char,
    group_name: *const c_char,
    prefix: *const c_char,
    subgroup: bool,
) {
    let (Some(class_name), Some(group_name)) = (unsafe {
        (name_arg(class_name, "class name"), c_str(group_name))
    }) else {
        gdhost_core::err_print!("property group registered without a usable name");
        return;
    };
    let group = PropertyGroup {
        name: group_name.to_owned(),
        prefix: unsafe { c_str(prefix) }.unwrap_or_default().to_owned(),
        subgroup,
    };
    with_extension(library, |ext| ext.register_property_group(&class_name, group));
}

unsafe extern "C" fn register_property_group(
    library: ClassLibraryPtr,
    class_name: *const c_char,
    group_name: *const c_char,
    prefix: *const c_char,
) {
    unsafe { register_group(library, class_name, group_name, prefix, false) }
}

unsafe extern "C" fn register_property_subgroup(
    library: ClassLibraryPtr,
    class_name: *const c_char,
    subgroup_name: *const c_char,
    prefix: *const c_char,
) {
    unsafe { register_group(library, class_name, subgroup_name, prefix, true) }
}

unsafe extern "C" fn register_signal(
    library: ClassLibraryPtr,
    class_name: *const c_char,
    signal_name: *const c_char,
    argument_info: *const PropertyInfo,
    argument_count: GdInt,
) {
    let (Some(class_name), Some(signal_name)) = (unsafe {
        (
            name_arg(class_name, "class name"),
            name_arg(signal_name, "signal name"),
        )
    }) else {
        return;
    };
    let count = usize::try_from(argument_count).unwrap_or(0);
    if count > 0 && argument_info.is_null() {
        gdhost_core::err_print!("signal '{class_name}::{signal_name}' declares arguments but passes none");
        return;
    }
    let mut arguments = Vec::with_capacity(count);
    for i in 0..count {
        match unsafe { property_desc(&*argument_info.add(i)) } {
            Some(desc) => arguments.push(desc),
            None => {
                gdhost_core::err_print!("argument {i} of signal '{class_name}::{signal_name}' has no name");
                return;
            }
        }
    }
    with_extension(library, |ext| ext.register_signal(&class_name, &signal_name, arguments));
}

unsafe extern "C" fn unregister_class(library: ClassLibraryPtr, class_name: *const c_char) {
    let Some(class_name) = (unsafe { name_arg(class_name, "class name") }) else {
        return;
    };
    with_extension(library, |ext| ext.unregister_class(&class_name));
}

/// Writes the absolute library path into the uninitialized `r_path`.
unsafe extern "C" fn get_library_path(library: ClassLibraryPtr, r_path: StringPtr) {
    let path = NativeExtension::from_handle(library)
        .and_then(|ext| ext.library_path())
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    unsafe { emplace(r_path, GString::from(path.as_str())) };
}

/// The registration group of the interface table.
pub fn registration_hooks() -> RegistrationHooks {
    RegistrationHooks {
        register_class,
        register_method,
        register_integer_constant,
        register_property,
        register_property_group,
        register_property_subgroup,
        register_signal,
        unregister_class,
        get_library_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_extension_is_closed_at_level_minus_one() {
        let ext = NativeExtension::new();
        assert!(!ext.is_library_open());
        assert_eq!(ext.initialization_level(), -1);
        assert!(matches!(ext.initialize_library(0), Err(ExtensionError::NotOpen)));
        assert!(matches!(ext.close_library(), Err(ExtensionError::NotOpen)));
        assert!(NativeExtension::from_handle(ext.handle()).is_none());
    }

    #[test]
    fn missing_library_is_a_load_error() {
        let ext = NativeExtension::new();
        let err = ext
            .open_library(Path::new("/nonexistent/libnothing.so"), "entry")
            .expect_err("missing file");
        assert!(matches!(err, ExtensionError::LoadFailed { .. }));
        assert!(!ext.is_library_open());
    }

    #[test]
    fn forged_handles_are_rejected() {
        let ((), reports) = gdhost_core::diag::capture(|| unsafe {
            unregister_class(0x1234 as ClassLibraryPtr, c"Foo".as_ptr());
        });
        assert_eq!(reports.len(), 1);
        assert!(reports[0].message.contains("does not name a loaded extension"));
    }

    #[test]
    fn property_info_conversion() {
        let info = PropertyInfo {
            type_: sys::VARIANT_TYPE_INT,
            name: c"value".as_ptr(),
            class_name: std::ptr::null(),
            hint: sys::PROPERTY_HINT_NONE,
            hint_string: std::ptr::null(),
            usage: sys::PROPERTY_USAGE_DEFAULT,
        };
        let desc = unsafe { property_desc(&info) }.expect("named");
        assert_eq!(desc.ty, VariantType::Int);
        assert_eq!(desc.name.as_str(), "value");
        assert!(desc.class_name.is_empty());
        let unnamed = PropertyInfo {
            name: std::ptr::null(),
            ..info
        };
        assert!(unsafe { property_desc(&unnamed) }.is_none());
    }
}
