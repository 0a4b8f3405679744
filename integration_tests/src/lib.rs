// Test harness for end-to-end extension tests.
//
// Links `gdhost_test_extension` into the test binary and opens it through
// `NativeExtension::open_static`, so every call still crosses the real
// `NativeInterface` table and the extension's `extern "C"` callbacks. The
// only test-specific code is the setup/teardown in `SampleHost` and a few
// helpers that wrap the raw table calls.
//
// The class database and object database are process-global, and the sample
// extension registers fixed class names. `serial()` returns a guard every
// test holds for its whole body so tests in one binary never overlap.
//
// See also: `tests/foo_calls.rs`, `tests/registration.rs`,
// `tests/dynamic_library.rs`.

use std::ffi::CStr;
use std::ptr;
use std::sync::Arc;

use gdhost_core::Variant;
use gdhost_extension::{NativeExtension, native_interface};
use gdhost_sys::{self as sys, InitializationFunction, MethodBindPtr, NativeInterface, ObjectPtr};
use parking_lot::{Mutex, MutexGuard};

static SERIAL: Mutex<()> = Mutex::new(());

/// Hold for the duration of a test that touches the class database.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock()
}

pub fn interface() -> &'static NativeInterface {
    native_interface()
}

// ---------------------------------------------------------------------------
// Signature hashes of the sample extension's methods
// ---------------------------------------------------------------------------

pub fn get_value_hash() -> u32 {
    sys::method_signature_hash(Some(sys::VARIANT_TYPE_INT), &[], true, false)
}

pub fn set_value_hash() -> u32 {
    sys::method_signature_hash(None, &[sys::VARIANT_TYPE_INT], false, false)
}

pub fn answer_hash() -> u32 {
    sys::method_signature_hash(Some(sys::VARIANT_TYPE_INT), &[], false, false)
}

pub fn sum_hash() -> u32 {
    sys::method_signature_hash(Some(sys::VARIANT_TYPE_INT), &[], false, true)
}

// ---------------------------------------------------------------------------
// SampleHost
// ---------------------------------------------------------------------------

/// One opened instance of the sample extension, initialized through the
/// scene level. Dropping it deinitializes and closes the extension.
pub struct SampleHost {
    pub extension: Arc<NativeExtension>,
}

impl SampleHost {
    /// Open with the main entry symbol and initialize core..=scene.
    pub fn start() -> Self {
        Self::start_with(gdhost_test_extension::gdhost_test_extension_init, "sample")
    }

    pub fn start_with(entry: InitializationFunction, label: &str) -> Self {
        let extension = NativeExtension::new();
        unsafe { extension.open_static(entry, label) }.expect("open_static failed");
        for level in sys::INITIALIZATION_CORE..=sys::INITIALIZATION_SCENE {
            extension
                .initialize_library(level)
                .expect("initialize_library failed");
        }
        Self { extension }
    }

    /// Walk the levels back down without closing.
    pub fn deinitialize(&self) {
        let current = self.extension.initialization_level();
        for level in (0..=current).rev() {
            self.extension
                .deinitialize_library(level as sys::InitializationLevel)
                .expect("deinitialize_library failed");
        }
    }
}

impl Drop for SampleHost {
    fn drop(&mut self) {
        if !self.extension.is_library_open() {
            return;
        }
        self.deinitialize();
        let _ = self.extension.close_library();
    }
}

// ---------------------------------------------------------------------------
// Raw interface helpers
// ---------------------------------------------------------------------------

pub fn construct(class: &CStr) -> ObjectPtr {
    let f = interface().classdb_construct_object.expect("classdb_construct_object");
    unsafe { f(class.as_ptr()) }
}

pub fn destroy(object: ObjectPtr) {
    let f = interface().object_destroy.expect("object_destroy");
    unsafe { f(object) };
}

pub fn method_bind(class: &CStr, method: &CStr, hash: i64) -> MethodBindPtr {
    let f = interface().classdb_get_method_bind.expect("classdb_get_method_bind");
    unsafe { f(class.as_ptr(), method.as_ptr(), hash) }
}

/// `object_method_bind_call` with owned arguments.
pub fn call(
    bind: MethodBindPtr,
    object: ObjectPtr,
    args: &[Variant],
) -> (Variant, sys::CallError) {
    let f = interface().object_method_bind_call.expect("object_method_bind_call");
    let pointers: Vec<sys::ConstVariantPtr> =
        args.iter().map(|a| ptr::from_ref(a).cast()).collect();
    let mut ret = Variant::Nil;
    let mut error = sys::CallError::OK;
    unsafe {
        f(
            bind,
            object,
            pointers.as_ptr(),
            pointers.len() as sys::GdInt,
            ptr::from_mut(&mut ret).cast(),
            &mut error,
        )
    };
    (ret, error)
}

/// What `ptrcall_int` returns when the callee never wrote its return slot.
pub const PTRCALL_UNTOUCHED: i64 = i64::MIN;

/// `object_method_bind_ptrcall` for methods taking and returning ints.
pub fn ptrcall_int(bind: MethodBindPtr, object: ObjectPtr, args: &[i64]) -> i64 {
    let f = interface().object_method_bind_ptrcall.expect("object_method_bind_ptrcall");
    let pointers: Vec<sys::ConstTypePtr> = args.iter().map(|a| ptr::from_ref(a).cast()).collect();
    let mut ret: i64 = PTRCALL_UNTOUCHED;
    unsafe { f(bind, object, pointers.as_ptr(), ptr::from_mut(&mut ret).cast()) };
    ret
}
