// Object, instance binding and ClassDB entry points.
//
// Object pointers coming from foreign code are resolved through the object
// database (`object::from_ptr`) and never dereferenced directly, so a stale
// pointer degrades to an error instead of a use-after-free. Method bind
// pointers are the addresses of `BoundMethod`s held by the class database.

use std::ffi::{c_char, c_void};
use std::ptr;
use std::sync::Arc;

use gdhost_core::class_db::{self, BoundMethod, ClassDbError};
use gdhost_core::error::CallError;
use gdhost_core::object::{self, Object};
use gdhost_core::variant::ptr::report_hash_mismatch;
use gdhost_core::{ForeignPtr, InstanceId};
use gdhost_sys::{
    self as sys, ClassInstancePtr, ConstObjectPtr, ConstTypePtr, ConstVariantPtr, GdInt,
    InstanceBindingCallbacks, MethodBindPtr, ObjectInstanceId, ObjectPtr, TypePtr, VariantPtr,
};

use super::{finish_call, name_arg, variant_args};

fn resolve(ptr: ConstObjectPtr) -> Option<Arc<Object>> {
    let found = object::from_ptr(ptr);
    if found.is_none() {
        gdhost_core::err_print!("object pointer {ptr:p} does not name a live object");
    }
    found
}

unsafe fn method_bind<'a>(ptr: MethodBindPtr) -> Option<&'a BoundMethod> {
    let bind = unsafe { BoundMethod::from_ptr(ptr) };
    if bind.is_none() {
        gdhost_core::err_print!("null method bind");
    }
    bind
}

// ---------------------------------------------------------------------------
// Method binds
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn method_bind_call(
    method: MethodBindPtr,
    instance: ObjectPtr,
    args: *const ConstVariantPtr,
    argument_count: GdInt,
    r_return: VariantPtr,
    r_error: *mut sys::CallError,
) {
    let result = (|| {
        let bind = unsafe { method_bind(method) }.ok_or(CallError::InvalidMethod)?;
        let object = resolve(instance).ok_or(CallError::InstanceIsNull)?;
        let args = unsafe { variant_args(args, argument_count) }?;
        bind.call(&object, &args)
    })();
    unsafe { finish_call(result, r_return, r_error) };
}

pub(super) unsafe extern "C" fn method_bind_ptrcall(
    method: MethodBindPtr,
    instance: ObjectPtr,
    args: *const ConstTypePtr,
    r_return: TypePtr,
) {
    let Some(bind) = (unsafe { method_bind(method) }) else {
        return;
    };
    let Some(object) = resolve(instance) else {
        return;
    };
    unsafe { bind.ptrcall(&object, args, r_return) };
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn destroy(instance: ObjectPtr) {
    if let Some(object) = resolve(instance) {
        let id = object.id();
        drop(object);
        object::destroy(id);
    }
}

pub(super) unsafe extern "C" fn global_get_singleton(name: *const c_char) -> ObjectPtr {
    let Some(name) = (unsafe { name_arg(name, "singleton name") }) else {
        return ptr::null_mut();
    };
    match object::singleton(&name) {
        Some(object) => object.as_ptr(),
        None => {
            gdhost_core::err_print!("no singleton named '{name}'");
            ptr::null_mut()
        }
    }
}

pub(super) unsafe extern "C" fn get_instance_binding(
    instance: ObjectPtr,
    token: *mut c_void,
    callbacks: *const InstanceBindingCallbacks,
) -> *mut c_void {
    let Some(object) = resolve(instance) else {
        return ptr::null_mut();
    };
    unsafe { object.instance_binding(ForeignPtr(token), callbacks.as_ref()) }.get()
}

pub(super) unsafe extern "C" fn set_instance_binding(
    instance: ObjectPtr,
    token: *mut c_void,
    binding: *mut c_void,
    callbacks: *const InstanceBindingCallbacks,
) {
    if let Some(object) = resolve(instance) {
        object.set_instance_binding(ForeignPtr(token), ForeignPtr(binding), unsafe {
            callbacks.as_ref()
        });
    }
}

pub(super) unsafe extern "C" fn set_instance(
    instance: ObjectPtr,
    class_name: *const c_char,
    extension_instance: ClassInstancePtr,
) {
    let (Some(object), Some(class_name)) =
        (resolve(instance), unsafe { name_arg(class_name, "class name") })
    else {
        return;
    };
    if let Err(e) = object.set_extension_instance(&class_name, ForeignPtr(extension_instance)) {
        gdhost_core::err_print!("cannot attach extension instance: {e}");
    }
}

pub(super) unsafe extern "C" fn cast_to(instance: ConstObjectPtr, class_tag: *mut c_void) -> ObjectPtr {
    let Some(object) = object::from_ptr(instance) else {
        return ptr::null_mut();
    };
    match class_db::class_for_tag(class_tag as usize) {
        Some(class) if object.is_class(&class) => object.as_ptr(),
        _ => ptr::null_mut(),
    }
}

pub(super) unsafe extern "C" fn get_instance_from_id(id: ObjectInstanceId) -> ObjectPtr {
    object::get(InstanceId(id)).map_or(ptr::null_mut(), |o| o.as_ptr())
}

pub(super) unsafe extern "C" fn get_instance_id(instance: ConstObjectPtr) -> ObjectInstanceId {
    object::from_ptr(instance).map_or(0, |o| o.id().0)
}

// ---------------------------------------------------------------------------
// ClassDB
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn classdb_construct_object(class_name: *const c_char) -> ObjectPtr {
    let Some(class_name) = (unsafe { name_arg(class_name, "class name") }) else {
        return ptr::null_mut();
    };
    match class_db::instantiate(&class_name) {
        Ok(object) => object.as_ptr(),
        Err(e) => {
            gdhost_core::err_print!("cannot construct object: {e}");
            ptr::null_mut()
        }
    }
}

pub(super) unsafe extern "C" fn classdb_get_method_bind(
    class_name: *const c_char,
    method_name: *const c_char,
    hash: GdInt,
) -> MethodBindPtr {
    let (Some(class_name), Some(method_name)) = (unsafe {
        (
            name_arg(class_name, "class name"),
            name_arg(method_name, "method name"),
        )
    }) else {
        return ptr::null();
    };
    let Ok(hash32) = u32::try_from(hash) else {
        gdhost_core::err_print!("method hash {hash} is out of range");
        return ptr::null();
    };
    match class_db::get_method_with_hash(&class_name, &method_name, hash32) {
        Ok(bind) => bind.as_ptr(),
        Err(ClassDbError::HashMismatch { actual, .. }) => {
            report_hash_mismatch("method", &format!("{class_name}::{method_name}"), actual, hash);
            ptr::null()
        }
        Err(e) => {
            gdhost_core::err_print!("{e}");
            ptr::null()
        }
    }
}

pub(super) unsafe extern "C" fn classdb_get_class_tag(class_name: *const c_char) -> *mut c_void {
    let Some(class_name) = (unsafe { name_arg(class_name, "class name") }) else {
        return ptr::null_mut();
    };
    class_db::class_tag(&class_name).map_or(ptr::null_mut(), |tag| tag as *mut c_void)
}

#[cfg(test)]
mod tests {
    use std::mem::MaybeUninit;

    use gdhost_core::{StringName, Variant, diag};

    use super::*;

    #[test]
    fn method_bind_round_trip() {
        let object = class_db::instantiate(&StringName::new("Object")).expect("Object");
        let bind = class_db::get_method(&StringName::new("Object"), &StringName::new("get_class"))
            .expect("get_class");
        let found = unsafe {
            classdb_get_method_bind(c"Object".as_ptr(), c"get_class".as_ptr(), GdInt::from(bind.hash()))
        };
        assert_eq!(found, bind.as_ptr());

        let mut ret = MaybeUninit::<Variant>::uninit();
        let mut error = sys::CallError::OK;
        unsafe {
            method_bind_call(found, object.as_ptr(), ptr::null(), 0, ret.as_mut_ptr().cast(), &mut error);
            assert_eq!(ret.assume_init(), Variant::from("Object"));
        }
        assert!(error.is_ok());
        object::destroy(object.id());
    }

    #[test]
    fn hash_mismatch_is_null_and_reported_once() {
        let (found, reports) = diag::capture(|| unsafe {
            let a = classdb_get_method_bind(c"Object".as_ptr(), c"is_class".as_ptr(), 12345);
            let b = classdb_get_method_bind(c"Object".as_ptr(), c"is_class".as_ptr(), 12345);
            (a, b)
        });
        assert!(found.0.is_null() && found.1.is_null());
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn calls_on_dead_objects_report_instance_is_null() {
        let object = class_db::instantiate(&StringName::new("Object")).expect("Object");
        let raw = object.as_ptr();
        let bind = class_db::get_method(&StringName::new("Object"), &StringName::new("get_class"))
            .expect("get_class");
        object::destroy(object.id());
        drop(object);
        let mut ret = MaybeUninit::<Variant>::uninit();
        let mut error = sys::CallError::OK;
        unsafe {
            method_bind_call(bind.as_ptr(), raw, ptr::null(), 0, ret.as_mut_ptr().cast(), &mut error);
            drop(ret.assume_init());
        }
        assert_eq!(error.error, sys::CALL_ERROR_INSTANCE_IS_NULL);
    }

    #[test]
    fn singletons_ids_and_tags() {
        let engine = unsafe { global_get_singleton(c"Engine".as_ptr()) };
        assert!(!engine.is_null());
        let id = unsafe { get_instance_id(engine) };
        assert_eq!(unsafe { get_instance_from_id(id) }, engine);

        let tag = unsafe { classdb_get_class_tag(c"Object".as_ptr()) };
        assert_eq!(unsafe { cast_to(engine, tag) }, engine);
        let ref_tag = unsafe { classdb_get_class_tag(c"RefCounted".as_ptr()) };
        assert!(unsafe { cast_to(engine, ref_tag) }.is_null());
    }

    #[test]
    fn construct_and_destroy_objects() {
        let before = object::live_count();
        let raw = unsafe { classdb_construct_object(c"Object".as_ptr()) };
        assert!(!raw.is_null());
        unsafe { destroy(raw) };
        assert!(object::from_ptr(raw).is_none());
        assert!(object::live_count() <= before);
        let missing = unsafe { classdb_construct_object(c"NoSuchClass".as_ptr()) };
        assert!(missing.is_null());
    }
}
