// The class database.
//
// A global, name-keyed registry of every class the engine knows: the core
// classes built into this crate (`Object`, `RefCounted`, `Resource`,
// `Engine`) and classes registered at runtime by native extensions. Each
// `ClassInfo` records its parent by name, its bound methods, integer
// constants and enums, properties (backed by setter/getter methods), property
// groups, signals, an opaque class tag, and for extension classes the
// foreign vtable.
//
// Methods are stored as `Arc<BoundMethod>`. The address of the `BoundMethod`
// is the `MethodBindPtr` returned to foreign code; it stays valid while the
// class stays registered.
//
// Lookups walk the parent chain. Mutation happens only while extensions
// register or unregister classes during initialization-level transitions.
//
// **Critical constraint:** the database lock is never held while calling a
// method or any foreign callback; lookups clone the `Arc` out first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use gdhost_sys::{ConstTypePtr, TypePtr};
use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use thiserror::Error;

use crate::core_classes;
use crate::error::CallError;
use crate::object::{self, Object};
use crate::string::{GString, StringName};
use crate::types::ForeignPtr;
use crate::variant::{Variant, VariantType, native};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClassDbError {
    #[error("class '{0}' does not exist")]
    ClassNotFound(StringName),
    #[error("class '{0}' already exists")]
    AlreadyExists(StringName),
    #[error("'{0}' is not a valid class name")]
    InvalidName(String),
    #[error("parent class '{parent}' of '{class}' does not exist")]
    ParentNotFound { class: StringName, parent: StringName },
    #[error("method '{class}::{method}' already exists")]
    MethodExists { class: StringName, method: StringName },
    #[error("method '{class}::{method}' does not exist")]
    MethodNotFound { class: StringName, method: StringName },
    #[error("method '{class}::{method}' has hash {actual}, but {requested} was requested")]
    HashMismatch {
        class: StringName,
        method: StringName,
        actual: u32,
        requested: u32,
    },
    #[error("constant '{class}::{name}' already exists")]
    ConstantExists { class: StringName, name: StringName },
    #[error("property '{class}::{name}' already exists")]
    PropertyExists { class: StringName, name: StringName },
    #[error("invalid {role} '{method}' for property '{class}::{property}'")]
    InvalidAccessor {
        class: StringName,
        property: StringName,
        role: &'static str,
        method: StringName,
    },
    #[error("signal '{class}::{name}' already exists")]
    SignalExists { class: StringName, name: StringName },
    #[error("class '{0}' has inheritors")]
    HasInheritors(StringName),
    #[error("class '{0}' cannot be instantiated")]
    NotInstantiable(StringName),
    #[error("instantiating class '{0}' did not produce an object")]
    InstantiationFailed(StringName),
    #[error("class '{0}' is not an extension class")]
    NotExtensionClass(StringName),
    #[error("class '{class}' does not inherit '{base}'")]
    NotInheriting { class: StringName, base: StringName },
}

// ---------------------------------------------------------------------------
// Method binds
// ---------------------------------------------------------------------------

/// A callable method of an engine class.
pub trait MethodBind: Send + Sync {
    fn name(&self) -> &StringName;

    /// Signature hash, as computed by `gdhost_sys::method_signature_hash`.
    fn hash(&self) -> u32;

    fn argument_count(&self) -> usize;

    /// Type of argument `index`, or of the return value for `-1`. `Nil` means
    /// any Variant.
    fn argument_type(&self, index: i32) -> VariantType;

    fn argument_metadata(&self, _index: i32) -> u32 {
        gdhost_sys::METHOD_ARGUMENT_METADATA_NONE
    }

    fn has_return(&self) -> bool;

    fn is_const(&self) -> bool;

    fn is_vararg(&self) -> bool {
        false
    }

    /// Defaults for the trailing arguments.
    fn default_arguments(&self) -> &[Variant];

    fn call(&self, object: &Object, args: &[&Variant]) -> Result<Variant, CallError>;

    /// Call with native-typed arguments.
    ///
    /// # Safety
    /// `args` must hold `argument_count()` pointers to initialized values of
    /// the declared argument types, and `ret` must point to initialized
    /// storage of the return type (ignored for void methods).
    unsafe fn ptrcall(&self, object: &Object, args: *const ConstTypePtr, ret: TypePtr);
}

/// Owning wrapper that gives a method bind a thin, stable address.
pub struct BoundMethod {
    bind: Box<dyn MethodBind>,
}

impl BoundMethod {
    pub fn new(bind: Box<dyn MethodBind>) -> Arc<Self> {
        Arc::new(Self { bind })
    }

    pub fn as_ptr(self: &Arc<Self>) -> gdhost_sys::MethodBindPtr {
        Arc::as_ptr(self).cast()
    }

    /// # Safety
    /// `ptr` must come from `as_ptr` on a method still held by the class
    /// database.
    pub unsafe fn from_ptr<'a>(ptr: gdhost_sys::MethodBindPtr) -> Option<&'a BoundMethod> {
        unsafe { ptr.cast::<BoundMethod>().as_ref() }
    }
}

impl std::ops::Deref for BoundMethod {
    type Target = dyn MethodBind;

    fn deref(&self) -> &Self::Target {
        self.bind.as_ref()
    }
}

/// Arity check, default filling and argument conversion shared by method
/// binds. Returns one owned value per declared argument (plus any extra
/// arguments of a vararg method).
pub fn prepare_arguments(
    bind: &dyn MethodBind,
    args: &[&Variant],
) -> Result<SmallVec<[Variant; 8]>, CallError> {
    let declared = bind.argument_count();
    let defaults = bind.default_arguments();
    if args.len() > declared && !bind.is_vararg() {
        return Err(CallError::TooManyArguments {
            expected: declared as i32,
        });
    }
    if args.len() + defaults.len() < declared {
        return Err(CallError::TooFewArguments {
            expected: (declared - defaults.len()) as i32,
        });
    }
    let mut out = SmallVec::with_capacity(declared.max(args.len()));
    for i in 0..declared.max(args.len()) {
        let value = match args.get(i) {
            Some(v) => (*v).clone(),
            None => defaults[defaults.len() - (declared - i)].clone(),
        };
        if i >= declared {
            out.push(value);
            continue;
        }
        let expected = bind.argument_type(i as i32);
        let ty = value.get_type();
        if expected == VariantType::Nil || ty == expected {
            out.push(value);
        } else if expected == VariantType::Object && ty == VariantType::Nil {
            out.push(value);
        } else if Variant::can_convert_strict(ty, expected) {
            let converted = value.convert(expected).map_err(|_| CallError::InvalidArgument {
                argument: i as i32,
                expected,
            })?;
            out.push(converted);
        } else {
            return Err(CallError::InvalidArgument {
                argument: i as i32,
                expected,
            });
        }
    }
    Ok(out)
}

pub type NativeMethodFn = fn(&Object, &[Variant]) -> Result<Variant, CallError>;

/// A method implemented in Rust by the engine.
pub struct NativeMethod {
    name: StringName,
    arguments: Vec<VariantType>,
    return_type: Option<VariantType>,
    is_const: bool,
    defaults: Vec<Variant>,
    hash: u32,
    func: NativeMethodFn,
}

impl NativeMethod {
    pub fn new(
        name: &str,
        arguments: &[VariantType],
        return_type: Option<VariantType>,
        is_const: bool,
        func: NativeMethodFn,
    ) -> Self {
        let raw_args: Vec<u32> = arguments.iter().map(|t| t.raw()).collect();
        Self {
            name: StringName::new(name),
            arguments: arguments.to_vec(),
            return_type,
            is_const,
            defaults: Vec::new(),
            hash: gdhost_sys::method_signature_hash(
                return_type.map(VariantType::raw),
                &raw_args,
                is_const,
                false,
            ),
            func,
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<Variant>) -> Self {
        self.defaults = defaults;
        self
    }
}

impl MethodBind for NativeMethod {
    fn name(&self) -> &StringName {
        &self.name
    }

    fn hash(&self) -> u32 {
        self.hash
    }

    fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    fn argument_type(&self, index: i32) -> VariantType {
        if index < 0 {
            return self.return_type.unwrap_or(VariantType::Nil);
        }
        self.arguments
            .get(index as usize)
            .copied()
            .unwrap_or(VariantType::Nil)
    }

    fn has_return(&self) -> bool {
        self.return_type.is_some()
    }

    fn is_const(&self) -> bool {
        self.is_const
    }

    fn default_arguments(&self) -> &[Variant] {
        &self.defaults
    }

    fn call(&self, object: &Object, args: &[&Variant]) -> Result<Variant, CallError> {
        let prepared = prepare_arguments(self, args)?;
        (self.func)(object, &prepared)
    }

    unsafe fn ptrcall(&self, object: &Object, args: *const ConstTypePtr, ret: TypePtr) {
        let values: SmallVec<[Variant; 8]> = self
            .arguments
            .iter()
            .enumerate()
            .map(|(i, ty)| unsafe { native::read(*ty, *args.add(i)) })
            .collect();
        match (self.func)(object, &values) {
            Ok(value) => {
                if let Some(rt) = self.return_type {
                    unsafe { native::write(rt, ret, value) };
                }
            }
            Err(e) => crate::err_print!("ptrcall to '{}' failed: {e}", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Class records
// ---------------------------------------------------------------------------

/// Foreign vtable of an extension class.
pub struct ExtensionClassVTable {
    pub info: gdhost_sys::ExtensionClassCreationInfo,
}

// The vtable holds foreign function pointers and an opaque userdata token.
unsafe impl Send for ExtensionClassVTable {}
unsafe impl Sync for ExtensionClassVTable {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassApi {
    Core,
    Extension,
}

/// Description of a property, argument or return value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDesc {
    pub ty: VariantType,
    pub name: StringName,
    pub class_name: StringName,
    pub hint: u32,
    pub hint_string: String,
    pub usage: u32,
}

impl PropertyDesc {
    pub fn new(ty: VariantType, name: &str) -> Self {
        Self {
            ty,
            name: StringName::new(name),
            class_name: StringName::default(),
            hint: gdhost_sys::PROPERTY_HINT_NONE,
            hint_string: String::new(),
            usage: gdhost_sys::PROPERTY_USAGE_DEFAULT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PropertyRecord {
    pub desc: PropertyDesc,
    pub setter: StringName,
    pub getter: StringName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyGroup {
    pub name: String,
    pub prefix: String,
    pub subgroup: bool,
}

#[derive(Clone, Debug, Default)]
pub struct EnumInfo {
    pub constants: Vec<StringName>,
    pub bitfield: bool,
}

#[derive(Clone)]
pub struct ClassInfo {
    pub name: StringName,
    pub parent: Option<StringName>,
    pub api: ClassApi,
    pub tag: usize,
    /// Owning extension library; null for core classes.
    pub library: ForeignPtr,
    pub instantiable: bool,
    pub is_virtual: bool,
    pub is_abstract: bool,
    pub ref_counted: bool,
    pub methods: IndexMap<StringName, Arc<BoundMethod>>,
    pub constants: IndexMap<StringName, i64>,
    pub enums: IndexMap<StringName, EnumInfo>,
    pub properties: IndexMap<StringName, PropertyRecord>,
    pub groups: Vec<PropertyGroup>,
    pub signals: IndexMap<StringName, Vec<PropertyDesc>>,
    pub extension: Option<Arc<ExtensionClassVTable>>,
}

impl ClassInfo {
    pub(crate) fn core(name: &str, parent: Option<&str>, instantiable: bool) -> Self {
        Self {
            name: StringName::new(name),
            parent: parent.map(StringName::new),
            api: ClassApi::Core,
            tag: next_tag(),
            library: ForeignPtr::NULL,
            instantiable,
            is_virtual: false,
            is_abstract: false,
            ref_counted: false,
            methods: IndexMap::new(),
            constants: IndexMap::new(),
            enums: IndexMap::new(),
            properties: IndexMap::new(),
            groups: Vec::new(),
            signals: IndexMap::new(),
            extension: None,
        }
    }

    pub(crate) fn method(&mut self, method: NativeMethod) {
        self.methods
            .insert(method.name.clone(), BoundMethod::new(Box::new(method)));
    }

    pub(crate) fn property(&mut self, desc: PropertyDesc, setter: &str, getter: &str) {
        self.properties.insert(
            desc.name.clone(),
            PropertyRecord {
                desc,
                setter: StringName::new(setter),
                getter: StringName::new(getter),
            },
        );
    }
}

/// What an extension supplies to register a class.
pub struct ClassRegistration {
    pub name: StringName,
    pub parent: StringName,
    pub library: ForeignPtr,
    pub vtable: Arc<ExtensionClassVTable>,
}

static NEXT_TAG: AtomicUsize = AtomicUsize::new(1);

fn next_tag() -> usize {
    NEXT_TAG.fetch_add(1, Ordering::Relaxed)
}

static CLASS_DB: LazyLock<RwLock<IndexMap<StringName, ClassInfo>>> = LazyLock::new(|| {
    let mut classes = IndexMap::new();
    for info in core_classes::core_classes() {
        classes.insert(info.name.clone(), info);
    }
    RwLock::new(classes)
});

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn class_exists(name: &StringName) -> bool {
    CLASS_DB.read().contains_key(name)
}

pub fn class_list() -> Vec<StringName> {
    CLASS_DB.read().keys().cloned().collect()
}

/// Snapshot of one class record.
pub fn class_info(name: &StringName) -> Option<ClassInfo> {
    CLASS_DB.read().get(name).cloned()
}

pub fn parent_class(name: &StringName) -> Option<StringName> {
    CLASS_DB.read().get(name).and_then(|c| c.parent.clone())
}

/// Direct inheritors of `name`.
pub fn inheriters(name: &StringName) -> Vec<StringName> {
    CLASS_DB
        .read()
        .values()
        .filter(|c| c.parent.as_ref() == Some(name))
        .map(|c| c.name.clone())
        .collect()
}

/// Whether `class` is `inherits` or derives from it.
pub fn is_parent_class(class: &StringName, inherits: &StringName) -> bool {
    let db = CLASS_DB.read();
    let mut current = Some(class.clone());
    while let Some(name) = current {
        if &name == inherits {
            return true;
        }
        current = db.get(&name).and_then(|c| c.parent.clone());
    }
    false
}

pub fn class_tag(name: &StringName) -> Option<usize> {
    CLASS_DB.read().get(name).map(|c| c.tag)
}

pub fn class_for_tag(tag: usize) -> Option<StringName> {
    CLASS_DB
        .read()
        .values()
        .find(|c| c.tag == tag)
        .map(|c| c.name.clone())
}

pub fn class_library(name: &StringName) -> Option<ForeignPtr> {
    CLASS_DB.read().get(name).map(|c| c.library)
}

pub fn is_ref_counted_class(name: &StringName) -> bool {
    CLASS_DB.read().get(name).is_some_and(|c| c.ref_counted)
}

/// Vtable of `name`, if it is an extension class.
pub fn extension_vtable(name: &StringName) -> Option<Arc<ExtensionClassVTable>> {
    CLASS_DB.read().get(name).and_then(|c| c.extension.clone())
}

fn walk<T>(class: &StringName, mut f: impl FnMut(&ClassInfo) -> Option<T>) -> Option<T> {
    let db = CLASS_DB.read();
    let mut current = db.get(class);
    while let Some(info) = current {
        if let Some(found) = f(info) {
            return Some(found);
        }
        current = info.parent.as_ref().and_then(|p| db.get(p));
    }
    None
}

/// Method `name` of `class` or its nearest ancestor.
pub fn get_method(class: &StringName, name: &StringName) -> Option<Arc<BoundMethod>> {
    walk(class, |c| c.methods.get(name).cloned())
}

/// Method lookup that also checks the signature hash.
pub fn get_method_with_hash(
    class: &StringName,
    name: &StringName,
    hash: u32,
) -> Result<Arc<BoundMethod>, ClassDbError> {
    if !class_exists(class) {
        return Err(ClassDbError::ClassNotFound(class.clone()));
    }
    let bind = get_method(class, name).ok_or_else(|| ClassDbError::MethodNotFound {
        class: class.clone(),
        method: name.clone(),
    })?;
    if bind.hash() != hash {
        return Err(ClassDbError::HashMismatch {
            class: class.clone(),
            method: name.clone(),
            actual: bind.hash(),
            requested: hash,
        });
    }
    Ok(bind)
}

pub fn has_method(class: &StringName, name: &StringName, no_inheritance: bool) -> bool {
    if no_inheritance {
        return CLASS_DB
            .read()
            .get(class)
            .is_some_and(|c| c.methods.contains_key(name));
    }
    get_method(class, name).is_some()
}

pub fn get_integer_constant(class: &StringName, name: &StringName) -> Option<i64> {
    walk(class, |c| c.constants.get(name).copied())
}

pub fn get_property_record(class: &StringName, name: &StringName) -> Option<PropertyRecord> {
    walk(class, |c| c.properties.get(name).cloned())
}

pub fn has_signal(class: &StringName, name: &StringName) -> bool {
    walk(class, |c| c.signals.contains_key(name).then_some(())).is_some()
}

/// Set a registered property through its setter.
pub fn set_property(object: &Object, property: &StringName, value: &Variant) -> bool {
    let Some(record) = get_property_record(&object.class_name(), property) else {
        return false;
    };
    let Some(setter) = get_method(&object.class_name(), &record.setter) else {
        return false;
    };
    match setter.call(object, &[value]) {
        Ok(_) => true,
        Err(e) => {
            crate::err_print!("setting property '{property}' failed: {e}");
            false
        }
    }
}

/// Read a registered property through its getter.
pub fn get_property(object: &Object, property: &StringName) -> Option<Variant> {
    let record = get_property_record(&object.class_name(), property)?;
    let getter = get_method(&object.class_name(), &record.getter)?;
    getter.call(object, &[]).ok()
}

/// Construct an instance of `class`.
pub fn instantiate(class: &StringName) -> Result<Arc<Object>, ClassDbError> {
    let (instantiable, ref_counted, vtable) = {
        let db = CLASS_DB.read();
        let info = db
            .get(class)
            .ok_or_else(|| ClassDbError::ClassNotFound(class.clone()))?;
        (info.instantiable, info.ref_counted, info.extension.clone())
    };
    if !instantiable {
        return Err(ClassDbError::NotInstantiable(class.clone()));
    }
    match vtable {
        None => Ok(object::create(class.clone(), ref_counted)),
        Some(vtable) => {
            let create = vtable
                .info
                .create_instance_func
                .ok_or_else(|| ClassDbError::NotInstantiable(class.clone()))?;
            let ptr = unsafe { create(vtable.info.class_userdata) };
            object::from_ptr(ptr.cast_const())
                .ok_or_else(|| ClassDbError::InstantiationFailed(class.clone()))
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

pub fn register_extension_class(reg: ClassRegistration) -> Result<usize, ClassDbError> {
    if !GString::from(reg.name.as_str()).is_valid_identifier() {
        return Err(ClassDbError::InvalidName(reg.name.to_string()));
    }
    let mut db = CLASS_DB.write();
    if db.contains_key(&reg.name) {
        return Err(ClassDbError::AlreadyExists(reg.name));
    }
    let parent = db
        .get(&reg.parent)
        .ok_or_else(|| ClassDbError::ParentNotFound {
            class: reg.name.clone(),
            parent: reg.parent.clone(),
        })?;
    let ref_counted = parent.ref_counted;
    let abstract_ = reg.vtable.info.is_abstract != 0;
    let tag = next_tag();
    let info = ClassInfo {
        name: reg.name.clone(),
        parent: Some(reg.parent),
        api: ClassApi::Extension,
        tag,
        library: reg.library,
        instantiable: !abstract_ && reg.vtable.info.create_instance_func.is_some(),
        is_virtual: reg.vtable.info.is_virtual != 0,
        is_abstract: abstract_,
        ref_counted,
        methods: IndexMap::new(),
        constants: IndexMap::new(),
        enums: IndexMap::new(),
        properties: IndexMap::new(),
        groups: Vec::new(),
        signals: IndexMap::new(),
        extension: Some(reg.vtable),
    };
    log::debug!("registered class {} (tag {tag})", info.name);
    db.insert(reg.name, info);
    Ok(tag)
}

/// Remove a class. Fails while other classes inherit it.
pub fn unregister_class(name: &StringName) -> Result<(), ClassDbError> {
    let mut db = CLASS_DB.write();
    if !db.contains_key(name) {
        return Err(ClassDbError::ClassNotFound(name.clone()));
    }
    if db.values().any(|c| c.parent.as_ref() == Some(name)) {
        return Err(ClassDbError::HasInheritors(name.clone()));
    }
    let removed = db.shift_remove(name);
    drop(db);
    drop(removed);
    log::debug!("unregistered class {name}");
    Ok(())
}

fn with_class<T>(
    class: &StringName,
    f: impl FnOnce(&mut ClassInfo) -> Result<T, ClassDbError>,
) -> Result<T, ClassDbError> {
    let mut db = CLASS_DB.write();
    let info = db
        .get_mut(class)
        .ok_or_else(|| ClassDbError::ClassNotFound(class.clone()))?;
    f(info)
}

pub fn bind_method(class: &StringName, method: Arc<BoundMethod>) -> Result<(), ClassDbError> {
    with_class(class, |info| {
        let name = method.name().clone();
        if info.methods.contains_key(&name) {
            return Err(ClassDbError::MethodExists {
                class: class.clone(),
                method: name,
            });
        }
        info.methods.insert(name, method);
        Ok(())
    })
}

pub fn bind_integer_constant(
    class: &StringName,
    enum_name: &StringName,
    name: &StringName,
    value: i64,
    bitfield: bool,
) -> Result<(), ClassDbError> {
    with_class(class, |info| {
        if info.constants.contains_key(name) {
            return Err(ClassDbError::ConstantExists {
                class: class.clone(),
                name: name.clone(),
            });
        }
        info.constants.insert(name.clone(), value);
        if !enum_name.is_empty() {
            let e = info.enums.entry(enum_name.clone()).or_default();
            e.constants.push(name.clone());
            e.bitfield |= bitfield;
        }
        Ok(())
    })
}

/// Add a property backed by existing setter and getter methods. An empty
/// setter makes the property read-only.
pub fn add_property(
    class: &StringName,
    desc: PropertyDesc,
    setter: StringName,
    getter: StringName,
) -> Result<(), ClassDbError> {
    for (role, method) in [("setter", &setter), ("getter", &getter)] {
        if role == "setter" && method.is_empty() {
            continue;
        }
        if get_method(class, method).is_none() {
            return Err(ClassDbError::InvalidAccessor {
                class: class.clone(),
                property: desc.name.clone(),
                role,
                method: method.clone(),
            });
        }
    }
    with_class(class, |info| {
        if info.properties.contains_key(&desc.name) {
            return Err(ClassDbError::PropertyExists {
                class: class.clone(),
                name: desc.name.clone(),
            });
        }
        info.properties.insert(
            desc.name.clone(),
            PropertyRecord {
                desc,
                setter,
                getter,
            },
        );
        Ok(())
    })
}

pub fn add_property_group(
    class: &StringName,
    group: PropertyGroup,
) -> Result<(), ClassDbError> {
    with_class(class, |info| {
        info.groups.push(group);
        Ok(())
    })
}

pub fn add_signal(
    class: &StringName,
    name: &StringName,
    arguments: Vec<PropertyDesc>,
) -> Result<(), ClassDbError> {
    with_class(class, |info| {
        if info.signals.contains_key(name) {
            return Err(ClassDbError::SignalExists {
                class: class.clone(),
                name: name.clone(),
            });
        }
        info.signals.insert(name.clone(), arguments);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sn(s: &str) -> StringName {
        StringName::new(s)
    }

    #[test]
    fn core_hierarchy() {
        assert!(is_parent_class(&sn("Resource"), &sn("Object")));
        assert!(is_parent_class(&sn("RefCounted"), &sn("RefCounted")));
        assert!(!is_parent_class(&sn("Object"), &sn("RefCounted")));
        assert!(is_ref_counted_class(&sn("Resource")));
        assert!(!is_ref_counted_class(&sn("Object")));
    }

    #[test]
    fn methods_are_found_through_parents() {
        let m = get_method(&sn("Resource"), &sn("get_class"));
        assert!(m.is_some());
        assert!(has_method(&sn("Resource"), &sn("get_class"), false));
        assert!(!has_method(&sn("Resource"), &sn("get_class"), true));
    }

    #[test]
    fn hash_is_checked() {
        let m = get_method(&sn("Object"), &sn("get_instance_id"));
        let hash = m.map(|m| m.hash()).unwrap_or_default();
        assert!(get_method_with_hash(&sn("Object"), &sn("get_instance_id"), hash).is_ok());
        let err = get_method_with_hash(&sn("Object"), &sn("get_instance_id"), hash ^ 1);
        assert!(matches!(err, Err(ClassDbError::HashMismatch { .. })));
    }

    #[test]
    fn instantiate_core_and_call() {
        let obj = instantiate(&sn("Object")).expect("Object is instantiable");
        let id = obj.call(&sn("get_instance_id"), &[]).expect("call");
        assert_eq!(id, Variant::Int(obj.id().0 as i64));
        let class = obj.call(&sn("get_class"), &[]).expect("call");
        assert_eq!(class, Variant::from("Object"));
        assert_eq!(
            obj.call(&sn("is_class"), &[]),
            Err(CallError::TooFewArguments { expected: 1 })
        );
        assert_eq!(
            obj.call(&sn("is_class"), &[&Variant::from(1), &Variant::from(2)]),
            Err(CallError::TooManyArguments { expected: 1 })
        );
        assert_eq!(
            obj.call(&sn("is_class"), &[&Variant::from(crate::math::Vector2::ONE)]),
            Err(CallError::InvalidArgument {
                argument: 0,
                expected: VariantType::String
            })
        );
        object::destroy(obj.id());
    }

    #[test]
    fn engine_is_not_instantiable() {
        assert_eq!(
            instantiate(&sn("Engine")).map(|o| o.id()),
            Err(ClassDbError::NotInstantiable(sn("Engine")))
        );
    }

    #[test]
    fn resource_path_property() {
        let res = instantiate(&sn("Resource")).expect("Resource");
        let holder = Variant::from(&res);
        assert!(res.set(&sn("resource_path"), &Variant::from("res://a.tres")));
        assert_eq!(res.get(&sn("resource_path")), Some(Variant::from("res://a.tres")));
        drop(holder);
    }

    #[test]
    fn unregister_missing_class_fails() {
        assert_eq!(
            unregister_class(&sn("NoSuchClassHere")),
            Err(ClassDbError::ClassNotFound(sn("NoSuchClassHere")))
        );
    }

    #[test]
    fn prepare_fills_defaults() {
        let m = NativeMethod::new(
            "f",
            &[VariantType::Int, VariantType::Int],
            Some(VariantType::Int),
            false,
            |_, args| Ok(Variant::Int(args[0].to_int() + args[1].to_int())),
        )
        .with_defaults(vec![Variant::Int(10)]);
        let prepared = prepare_arguments(&m, &[&Variant::from(1.0)]).expect("ok");
        assert_eq!(prepared.as_slice(), &[Variant::Int(1), Variant::Int(10)]);
        assert_eq!(
            prepare_arguments(&m, &[]).map(|v| v.len()),
            Err(CallError::TooFewArguments { expected: 1 })
        );
    }
}
