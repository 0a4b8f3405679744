// Allocator, diagnostics and struct-size entry points.

use std::ffi::{c_char, c_void};
use std::mem;

use gdhost_core::Variant;
use gdhost_core::diag::{self, Severity};
use gdhost_core::variant::{VariantType, native};

use super::{c_str, c_str_lossy};

pub(super) unsafe extern "C" fn mem_alloc(bytes: usize) -> *mut c_void {
    unsafe { libc::malloc(bytes) }
}

pub(super) unsafe extern "C" fn mem_realloc(ptr: *mut c_void, bytes: usize) -> *mut c_void {
    unsafe { libc::realloc(ptr, bytes) }
}

pub(super) unsafe extern "C" fn mem_free(ptr: *mut c_void) {
    unsafe { libc::free(ptr) }
}

unsafe fn forward(
    severity: Severity,
    description: *const c_char,
    function: *const c_char,
    file: *const c_char,
    line: i32,
) {
    let (description, function, file) = unsafe {
        (
            c_str_lossy(description),
            c_str_lossy(function),
            c_str_lossy(file),
        )
    };
    diag::report(
        severity,
        description,
        &function,
        &file,
        u32::try_from(line).unwrap_or(0),
    );
}

pub(super) unsafe extern "C" fn print_error(
    description: *const c_char,
    function: *const c_char,
    file: *const c_char,
    line: i32,
) {
    unsafe { forward(Severity::Error, description, function, file, line) }
}

pub(super) unsafe extern "C" fn print_warning(
    description: *const c_char,
    function: *const c_char,
    file: *const c_char,
    line: i32,
) {
    unsafe { forward(Severity::Warning, description, function, file, line) }
}

pub(super) unsafe extern "C" fn print_script_error(
    description: *const c_char,
    function: *const c_char,
    file: *const c_char,
    line: i32,
) {
    unsafe { forward(Severity::ScriptError, description, function, file, line) }
}

/// Byte size of the named engine struct as laid out by this build: every
/// builtin kind by its type name, plus `Variant`, `ObjectID` and
/// `CallError`. Zero for unknown names.
pub fn native_struct_size(name: &str) -> u64 {
    let size = match name {
        "Variant" => mem::size_of::<Variant>(),
        "ObjectID" => mem::size_of::<gdhost_sys::ObjectInstanceId>(),
        "CallError" => mem::size_of::<gdhost_sys::CallError>(),
        _ => VariantType::from_name(name).map_or(0, native::size_of),
    };
    size as u64
}

pub(super) unsafe extern "C" fn get_native_struct_size(name: *const c_char) -> u64 {
    unsafe { c_str(name) }.map_or(0, native_struct_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_sizes() {
        assert_eq!(native_struct_size("int"), 8);
        assert_eq!(native_struct_size("bool"), 1);
        assert_eq!(native_struct_size("Vector2"), 8);
        assert_eq!(native_struct_size("ObjectID"), 8);
        assert_eq!(native_struct_size("CallError"), 12);
        assert_eq!(native_struct_size("Variant"), mem::size_of::<Variant>() as u64);
        assert!(native_struct_size("Variant") <= gdhost_sys::VARIANT_STORAGE_SIZE as u64);
        assert_eq!(native_struct_size("NoSuchStruct"), 0);
    }

    #[test]
    fn foreign_errors_reach_the_diagnostics_channel() {
        let ((), reports) = diag::capture(|| unsafe {
            print_error(c"boom".as_ptr(), c"ext_fn".as_ptr(), c"ext.c".as_ptr(), 12);
        });
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].message, "boom");
        assert_eq!(reports[0].function, "ext_fn");
        assert_eq!(reports[0].file, "ext.c");
        assert_eq!(reports[0].line, 12);
        assert_eq!(reports[0].severity, Severity::Error);
    }

    #[test]
    fn allocator_round_trip() {
        unsafe {
            let p = mem_alloc(16).cast::<u64>();
            assert!(!p.is_null());
            p.write(7);
            let p = mem_realloc(p.cast(), 64).cast::<u64>();
            assert_eq!(p.read(), 7);
            mem_free(p.cast());
        }
    }
}
