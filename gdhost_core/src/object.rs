// Engine objects and the object database.
//
// Every engine object lives behind an `Arc<Object>` registered in a global
// database keyed by `InstanceId`. The address of the `Object` (what
// `Arc::as_ptr` returns) is the `ObjectPtr` handed to foreign code; the
// database also indexes objects by that address so a pointer coming back
// across the boundary is validated before use instead of dereferenced.
//
// Objects whose class inherits `RefCounted` carry an atomic reference count
// driven by `ObjectRef` (the payload of `Variant::Object`): cloning a counted
// ref increments it, dropping decrements, and the object is destroyed at
// zero. Other objects live until `destroy` is called explicitly.
//
// An object may carry one extension instance (set by `object_set_instance`
// while the extension's `create_instance` callback runs) and any number of
// instance bindings keyed by an opaque token. Destroying the object calls the
// extension's `free_instance` and each binding's free callback.
//
// **Critical constraint:** no database or object lock is held while foreign
// callbacks run. Foreign code re-enters the engine freely.

use std::ffi::c_void;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::class_db::{self, ClassDbError, ExtensionClassVTable};
use crate::error::CallError;
use crate::string::StringName;
use crate::types::{ForeignPtr, InstanceId};
use crate::variant::Variant;

/// The extension half of an object.
#[derive(Clone)]
pub struct ExtensionInstance {
    pub class_name: StringName,
    pub instance: ForeignPtr,
    pub vtable: Arc<ExtensionClassVTable>,
}

#[derive(Clone, Copy)]
struct InstanceBinding {
    token: ForeignPtr,
    binding: ForeignPtr,
    callbacks: gdhost_sys::InstanceBindingCallbacks,
}

struct ObjectState {
    class_name: StringName,
    extension: Option<ExtensionInstance>,
    bindings: SmallVec<[InstanceBinding; 1]>,
    meta: IndexMap<StringName, Variant>,
}

pub struct Object {
    id: InstanceId,
    refcount: Option<AtomicU32>,
    state: Mutex<ObjectState>,
}

impl Object {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Most-derived class name.
    pub fn class_name(&self) -> StringName {
        self.state.lock().class_name.clone()
    }

    pub fn is_class(&self, class: &StringName) -> bool {
        class_db::is_parent_class(&self.class_name(), class)
    }

    pub fn is_ref_counted(&self) -> bool {
        self.refcount.is_some()
    }

    pub fn reference_count(&self) -> u32 {
        self.refcount
            .as_ref()
            .map_or(0, |r| r.load(Ordering::Acquire))
    }

    /// Increment the reference count. No-op for uncounted objects.
    pub fn reference(&self) {
        if let Some(rc) = &self.refcount {
            rc.fetch_add(1, Ordering::AcqRel);
            if let Some(ext) = self.extension_instance()
                && let Some(f) = ext.vtable.info.reference_func
            {
                unsafe { f(ext.instance.get()) };
            }
        }
    }

    /// Decrement the reference count; true when it reached zero.
    pub fn unreference(&self) -> bool {
        let Some(rc) = &self.refcount else {
            return false;
        };
        if let Some(ext) = self.extension_instance()
            && let Some(f) = ext.vtable.info.unreference_func
        {
            unsafe { f(ext.instance.get()) };
        }
        let previous = rc
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        previous <= 1
    }

    pub fn as_ptr(self: &Arc<Self>) -> gdhost_sys::ObjectPtr {
        Arc::as_ptr(self) as *mut c_void
    }

    pub fn extension_instance(&self) -> Option<ExtensionInstance> {
        self.state.lock().extension.clone()
    }

    /// Attach the extension instance for `class_name`, which must be an
    /// extension class inheriting the object's current class. The object
    /// takes on that class.
    pub fn set_extension_instance(
        &self,
        class_name: &StringName,
        instance: ForeignPtr,
    ) -> Result<(), ClassDbError> {
        let vtable = class_db::extension_vtable(class_name)
            .ok_or_else(|| ClassDbError::NotExtensionClass(class_name.clone()))?;
        let current = self.class_name();
        if !class_db::is_parent_class(class_name, &current) {
            return Err(ClassDbError::NotInheriting {
                class: class_name.clone(),
                base: current,
            });
        }
        let mut state = self.state.lock();
        state.class_name = class_name.clone();
        state.extension = Some(ExtensionInstance {
            class_name: class_name.clone(),
            instance,
            vtable,
        });
        Ok(())
    }

    /// Dynamic call through the class database.
    pub fn call(&self, method: &StringName, args: &[&Variant]) -> Result<Variant, CallError> {
        let bind =
            class_db::get_method(&self.class_name(), method).ok_or(CallError::InvalidMethod)?;
        bind.call(self, args)
    }

    pub fn has_method(&self, method: &StringName) -> bool {
        class_db::has_method(&self.class_name(), method, false)
    }

    /// Set a property: the extension's `set` hook first, then a registered
    /// property setter. False when nothing accepted it.
    pub fn set(&self, property: &StringName, value: &Variant) -> bool {
        if let Some(ext) = self.extension_instance()
            && let Some(f) = ext.vtable.info.set_func
        {
            let handled = unsafe {
                f(
                    ext.instance.get(),
                    std::ptr::from_ref(property).cast(),
                    std::ptr::from_ref(value).cast(),
                )
            };
            if handled != 0 {
                return true;
            }
        }
        class_db::set_property(self, property, value)
    }

    pub fn get(&self, property: &StringName) -> Option<Variant> {
        if let Some(ext) = self.extension_instance()
            && let Some(f) = ext.vtable.info.get_func
        {
            let mut out = Variant::Nil;
            let handled = unsafe {
                f(
                    ext.instance.get(),
                    std::ptr::from_ref(property).cast(),
                    std::ptr::from_mut(&mut out).cast(),
                )
            };
            if handled != 0 {
                return Some(out);
            }
        }
        class_db::get_property(self, property)
    }

    pub fn set_meta(&self, name: &StringName, value: Variant) {
        let old = self.state.lock().meta.insert(name.clone(), value);
        drop(old);
    }

    pub fn get_meta(&self, name: &StringName) -> Option<Variant> {
        self.state.lock().meta.get(name).cloned()
    }

    pub fn has_meta(&self, name: &StringName) -> bool {
        self.state.lock().meta.contains_key(name)
    }

    /// The binding stored for `token`, creating it through `callbacks` when
    /// absent. Null when absent and no create callback is given.
    ///
    /// # Safety
    /// The callbacks must be valid to call with this object's pointer.
    pub unsafe fn instance_binding(
        self: &Arc<Self>,
        token: ForeignPtr,
        callbacks: Option<&gdhost_sys::InstanceBindingCallbacks>,
    ) -> ForeignPtr {
        if let Some(existing) = self.find_binding(token) {
            return existing;
        }
        let Some(callbacks) = callbacks.copied() else {
            return ForeignPtr::NULL;
        };
        let Some(create) = callbacks.create_callback else {
            return ForeignPtr::NULL;
        };
        let created = ForeignPtr(unsafe { create(token.get(), self.as_ptr()) });
        let mut state = self.state.lock();
        if let Some(raced) = state.bindings.iter().find(|b| b.token == token) {
            return raced.binding;
        }
        state.bindings.push(InstanceBinding {
            token,
            binding: created,
            callbacks,
        });
        created
    }

    pub fn set_instance_binding(
        &self,
        token: ForeignPtr,
        binding: ForeignPtr,
        callbacks: Option<&gdhost_sys::InstanceBindingCallbacks>,
    ) {
        let callbacks = callbacks.copied().unwrap_or(gdhost_sys::InstanceBindingCallbacks {
            create_callback: None,
            free_callback: None,
            reference_callback: None,
        });
        let mut state = self.state.lock();
        match state.bindings.iter_mut().find(|b| b.token == token) {
            Some(slot) => {
                slot.binding = binding;
                slot.callbacks = callbacks;
            }
            None => state.bindings.push(InstanceBinding {
                token,
                binding,
                callbacks,
            }),
        }
    }

    fn find_binding(&self, token: ForeignPtr) -> Option<ForeignPtr> {
        self.state
            .lock()
            .bindings
            .iter()
            .find(|b| b.token == token)
            .map(|b| b.binding)
    }

    /// Text form: the extension's `to_string` hook, or `<Class#id>`.
    pub fn to_display_string(&self) -> String {
        if let Some(ext) = self.extension_instance()
            && let Some(f) = ext.vtable.info.to_string_func
        {
            let mut text = crate::string::GString::new();
            unsafe { f(ext.instance.get(), std::ptr::from_mut(&mut text).cast()) };
            if !text.is_empty() {
                return text.to_string();
            }
        }
        format!("<{}#{}>", self.class_name(), self.id.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({}#{})", self.class_name(), self.id.0)
    }
}

// ---------------------------------------------------------------------------
// Object database
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ObjectDb {
    by_id: FxHashMap<InstanceId, Arc<Object>>,
    by_addr: FxHashMap<usize, InstanceId>,
}

static OBJECT_DB: LazyLock<RwLock<ObjectDb>> = LazyLock::new(|| RwLock::new(ObjectDb::default()));
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Register a new bare object of `class_name`. Does not consult the class
/// database; see `class_db::instantiate` for constructing a class.
pub fn create(class_name: StringName, counted: bool) -> Arc<Object> {
    let id = InstanceId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    let object = Arc::new(Object {
        id,
        refcount: counted.then(|| AtomicU32::new(0)),
        state: Mutex::new(ObjectState {
            class_name,
            extension: None,
            bindings: SmallVec::new(),
            meta: IndexMap::new(),
        }),
    });
    let mut db = OBJECT_DB.write();
    db.by_addr.insert(Arc::as_ptr(&object) as usize, id);
    db.by_id.insert(id, Arc::clone(&object));
    object
}

pub fn get(id: InstanceId) -> Option<Arc<Object>> {
    if id.is_null() {
        return None;
    }
    OBJECT_DB.read().by_id.get(&id).cloned()
}

/// Resolve a pointer handed out by `Object::as_ptr`. Unknown or stale
/// pointers resolve to `None` without being dereferenced.
pub fn from_ptr(ptr: *const c_void) -> Option<Arc<Object>> {
    if ptr.is_null() {
        return None;
    }
    let db = OBJECT_DB.read();
    let id = db.by_addr.get(&(ptr as usize))?;
    db.by_id.get(id).cloned()
}

pub fn is_valid(id: InstanceId) -> bool {
    OBJECT_DB.read().by_id.contains_key(&id)
}

/// Number of live objects.
pub fn live_count() -> usize {
    OBJECT_DB.read().by_id.len()
}

/// Remove an object from the database and release its extension instance
/// and bindings. False if the id was not live.
pub fn destroy(id: InstanceId) -> bool {
    let removed = {
        let mut db = OBJECT_DB.write();
        let removed = db.by_id.remove(&id);
        if let Some(object) = &removed {
            db.by_addr.remove(&(Arc::as_ptr(object) as usize));
        }
        removed
    };
    let Some(object) = removed else {
        return false;
    };
    let ptr = object.as_ptr();
    let (extension, bindings, meta) = {
        let mut state = object.state.lock();
        (
            state.extension.take(),
            std::mem::take(&mut state.bindings),
            std::mem::take(&mut state.meta),
        )
    };
    if let Some(ext) = extension
        && let Some(free) = ext.vtable.info.free_instance_func
    {
        unsafe { free(ext.vtable.info.class_userdata, ext.instance.get()) };
    }
    for b in bindings {
        if let Some(free) = b.callbacks.free_callback {
            unsafe { free(b.token.get(), ptr, b.binding.get()) };
        }
    }
    drop(meta);
    log::trace!("destroyed object {id}");
    true
}

// ---------------------------------------------------------------------------
// Singletons
// ---------------------------------------------------------------------------

static SINGLETONS: LazyLock<RwLock<IndexMap<StringName, InstanceId>>> = LazyLock::new(|| {
    let engine = create(StringName::new("Engine"), false);
    let mut map = IndexMap::new();
    map.insert(StringName::new("Engine"), engine.id());
    RwLock::new(map)
});

pub fn register_singleton(name: StringName, object: &Arc<Object>) {
    SINGLETONS.write().insert(name, object.id());
}

pub fn singleton(name: &StringName) -> Option<Arc<Object>> {
    let id = SINGLETONS.read().get(name).copied()?;
    get(id)
}

pub fn has_singleton(name: &StringName) -> bool {
    SINGLETONS.read().contains_key(name)
}

pub fn singleton_names() -> Vec<StringName> {
    SINGLETONS.read().keys().cloned().collect()
}

// ---------------------------------------------------------------------------
// ObjectRef
// ---------------------------------------------------------------------------

/// The object payload of a Variant: an id plus whether this reference holds
/// a count on a `RefCounted` object.
pub struct ObjectRef {
    pub id: InstanceId,
    counted: bool,
}

impl ObjectRef {
    pub fn null() -> Self {
        Self {
            id: InstanceId::NULL,
            counted: false,
        }
    }

    pub fn new(object: &Arc<Object>) -> Self {
        let counted = object.is_ref_counted();
        if counted {
            object.reference();
        }
        Self {
            id: object.id(),
            counted,
        }
    }

    pub fn from_id(id: InstanceId) -> Self {
        match get(id) {
            Some(object) => Self::new(&object),
            None => Self::null(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.id.is_null()
    }

    /// The live object, or `None` if null or freed.
    pub fn get(&self) -> Option<Arc<Object>> {
        get(self.id)
    }
}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        if self.counted
            && let Some(object) = self.get()
        {
            object.reference();
        }
        Self {
            id: self.id,
            counted: self.counted,
        }
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        if !self.counted {
            return;
        }
        if let Some(object) = self.get()
            && object.unreference()
        {
            drop(object);
            destroy(self.id);
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.id)
    }
}

impl From<&Arc<Object>> for Variant {
    fn from(object: &Arc<Object>) -> Self {
        Variant::Object(ObjectRef::new(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointers_round_trip_until_destroyed() {
        let obj = create(StringName::new("Object"), false);
        let ptr = obj.as_ptr();
        let found = from_ptr(ptr).map(|o| o.id());
        assert_eq!(found, Some(obj.id()));
        assert!(destroy(obj.id()));
        assert!(from_ptr(ptr).is_none());
        assert!(!destroy(obj.id()));
    }

    #[test]
    fn counted_refs_free_at_zero() {
        let obj = create(StringName::new("RefCounted"), true);
        let id = obj.id();
        drop(obj);
        let a = ObjectRef::from_id(id);
        let b = a.clone();
        assert_eq!(get(id).map(|o| o.reference_count()), Some(2));
        drop(a);
        assert!(is_valid(id));
        drop(b);
        assert!(!is_valid(id));
    }

    #[test]
    fn uncounted_refs_do_not_free() {
        let obj = create(StringName::new("Object"), false);
        let id = obj.id();
        let r = ObjectRef::new(&obj);
        drop(r);
        assert!(is_valid(id));
        destroy(id);
    }

    #[test]
    fn engine_singleton_exists() {
        let engine = singleton(&StringName::new("Engine"));
        assert!(engine.is_some());
        assert!(has_singleton(&StringName::new("Engine")));
        assert!(singleton(&StringName::new("Nope")).is_none());
    }

    #[test]
    fn meta_round_trip() {
        let obj = create(StringName::new("Object"), false);
        let key = StringName::new("k");
        obj.set_meta(&key, Variant::from(3));
        assert_eq!(obj.get_meta(&key), Some(Variant::from(3)));
        assert!(obj.has_meta(&key));
        destroy(obj.id());
    }
}
