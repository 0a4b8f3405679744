// The native interface table handed to every extension.
//
// `NativeInterface` (defined in `gdhost_sys`) is a flat `#[repr(C)]` table of
// `extern "C"` entry points. This module fills it in two phases:
//
// 1. `InterfaceBuilder::new()` fills every group that only depends on
//    `gdhost_core`: allocator, diagnostics, Variant operations and ptrcall
//    lookups, string marshaling, element pointers, object and ClassDB ops.
//    The registration group stays `None`.
// 2. `with_class_registration(hooks)` fills the registration group with the
//    callbacks of the extension registry (`crate::extension`).
//
// `native_interface()` builds the complete table once and freezes it in a
// `OnceLock`; every extension receives a pointer to that same table.
//
// Module overview:
// - `host.rs`:     mem_alloc/realloc/free, print_*, get_native_struct_size.
// - `variant.rs`:  Variant operations and ptrcall lookups.
// - `strings.rs`:  String construction/extraction and element pointers.
// - `objects.rs`:  object, instance binding and ClassDB entry points.
//
// Out-parameters typed `VariantPtr` (and `StringPtr` on constructors) are
// uninitialized storage: entry points construct into them with
// `ptr::write`. In/out parameters (`variant_iter_next`'s iterator, the base
// of `variant_set*`) are initialized values and are assigned.
//
// **Critical constraint: nothing unwinds out of an entry point.** Every
// function validates its pointers, converts failures into `CallError`,
// `valid`/`oob` flags or a null return, and reports through `diag`.

mod host;
mod objects;
mod strings;
mod variant;

use std::ffi::{CStr, c_char, c_void};
use std::sync::OnceLock;

use gdhost_core::error::CallError;
use gdhost_core::{StringName, Variant};
use gdhost_sys::{
    self as sys, ClassLibraryPtr, ConstStringNamePtr, ConstVariantPtr, ExtensionClassCreationInfo,
    ExtensionClassMethodInfo, GdBool, GdInt, NativeInterface, PropertyInfo, StringPtr, VariantPtr,
};
use smallvec::SmallVec;

pub use self::host::native_struct_size;

// ---------------------------------------------------------------------------
// Registration hooks
// ---------------------------------------------------------------------------

/// Callbacks of the registration group, supplied by the extension registry.
#[derive(Clone, Copy)]
pub struct RegistrationHooks {
    pub register_class: unsafe extern "C" fn(
        ClassLibraryPtr,
        *const c_char,
        *const c_char,
        *const ExtensionClassCreationInfo,
    ),
    pub register_method:
        unsafe extern "C" fn(ClassLibraryPtr, *const c_char, *const ExtensionClassMethodInfo),
    pub register_integer_constant: unsafe extern "C" fn(
        ClassLibraryPtr,
        *const c_char,
        *const c_char,
        *const c_char,
        GdInt,
        GdBool,
    ),
    pub register_property: unsafe extern "C" fn(
        ClassLibraryPtr,
        *const c_char,
        *const PropertyInfo,
        *const c_char,
        *const c_char,
    ),
    pub register_property_group:
        unsafe extern "C" fn(ClassLibraryPtr, *const c_char, *const c_char, *const c_char),
    pub register_property_subgroup:
        unsafe extern "C" fn(ClassLibraryPtr, *const c_char, *const c_char, *const c_char),
    pub register_signal: unsafe extern "C" fn(
        ClassLibraryPtr,
        *const c_char,
        *const c_char,
        *const PropertyInfo,
        GdInt,
    ),
    pub unregister_class: unsafe extern "C" fn(ClassLibraryPtr, *const c_char),
    pub get_library_path: unsafe extern "C" fn(ClassLibraryPtr, StringPtr),
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Two-phase construction of the interface table.
pub struct InterfaceBuilder {
    table: NativeInterface,
}

impl Default for InterfaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceBuilder {
    /// Table with every group filled except class registration.
    pub fn new() -> Self {
        let table = NativeInterface {
            version_major: sys::VERSION_MAJOR,
            version_minor: sys::VERSION_MINOR,
            version_patch: sys::VERSION_PATCH,
            version_string: sys::VERSION_STRING.as_ptr(),

            mem_alloc: Some(host::mem_alloc),
            mem_realloc: Some(host::mem_realloc),
            mem_free: Some(host::mem_free),
            print_error: Some(host::print_error),
            print_warning: Some(host::print_warning),
            print_script_error: Some(host::print_script_error),
            get_native_struct_size: Some(host::get_native_struct_size),

            variant_new_copy: Some(variant::new_copy),
            variant_new_nil: Some(variant::new_nil),
            variant_destroy: Some(variant::destroy),
            variant_call: Some(variant::call),
            variant_call_static: Some(variant::call_static),
            variant_evaluate: Some(variant::evaluate),
            variant_set: Some(variant::set),
            variant_set_named: Some(variant::set_named),
            variant_set_keyed: Some(variant::set_keyed),
            variant_set_indexed: Some(variant::set_indexed),
            variant_get: Some(variant::get),
            variant_get_named: Some(variant::get_named),
            variant_get_keyed: Some(variant::get_keyed),
            variant_get_indexed: Some(variant::get_indexed),
            variant_iter_init: Some(variant::iter_init),
            variant_iter_next: Some(variant::iter_next),
            variant_iter_get: Some(variant::iter_get),
            variant_hash: Some(variant::hash),
            variant_recursive_hash: Some(variant::recursive_hash),
            variant_hash_compare: Some(variant::hash_compare),
            variant_booleanize: Some(variant::booleanize),
            variant_sub: Some(variant::sub),
            variant_blend: Some(variant::blend),
            variant_interpolate: Some(variant::interpolate),
            variant_duplicate: Some(variant::duplicate),
            variant_stringify: Some(variant::stringify),
            variant_get_type: Some(variant::get_type),
            variant_has_method: Some(variant::has_method),
            variant_has_member: Some(variant::has_member),
            variant_has_key: Some(variant::has_key),
            variant_get_type_name: Some(variant::get_type_name),
            variant_can_convert: Some(variant::can_convert),
            variant_can_convert_strict: Some(variant::can_convert_strict),

            get_variant_from_type_constructor: Some(variant::from_type_constructor),
            get_variant_to_type_constructor: Some(variant::to_type_constructor),
            variant_get_ptr_operator_evaluator: Some(variant::ptr_operator_evaluator),
            variant_get_ptr_builtin_method: Some(variant::ptr_builtin_method),
            variant_get_ptr_constructor: Some(variant::ptr_constructor),
            variant_get_ptr_destructor: Some(variant::ptr_destructor),
            variant_construct: Some(variant::construct),
            variant_get_ptr_setter: Some(variant::ptr_setter),
            variant_get_ptr_getter: Some(variant::ptr_getter),
            variant_get_ptr_indexed_setter: Some(variant::ptr_indexed_setter),
            variant_get_ptr_indexed_getter: Some(variant::ptr_indexed_getter),
            variant_get_ptr_keyed_setter: Some(variant::ptr_keyed_setter),
            variant_get_ptr_keyed_getter: Some(variant::ptr_keyed_getter),
            variant_get_ptr_keyed_checker: Some(variant::ptr_keyed_checker),
            variant_get_constant_value: Some(variant::constant_value),
            variant_get_ptr_utility_function: Some(variant::ptr_utility_function),

            string_new_with_latin1_chars: Some(strings::new_with_latin1_chars),
            string_new_with_utf8_chars: Some(strings::new_with_utf8_chars),
            string_new_with_utf16_chars: Some(strings::new_with_utf16_chars),
            string_new_with_utf32_chars: Some(strings::new_with_utf32_chars),
            string_new_with_wide_chars: Some(strings::new_with_wide_chars),
            string_new_with_latin1_chars_and_len: Some(strings::new_with_latin1_chars_and_len),
            string_new_with_utf8_chars_and_len: Some(strings::new_with_utf8_chars_and_len),
            string_new_with_utf16_chars_and_len: Some(strings::new_with_utf16_chars_and_len),
            string_new_with_utf32_chars_and_len: Some(strings::new_with_utf32_chars_and_len),
            string_new_with_wide_chars_and_len: Some(strings::new_with_wide_chars_and_len),
            string_to_latin1_chars: Some(strings::to_latin1_chars),
            string_to_utf8_chars: Some(strings::to_utf8_chars),
            string_to_utf16_chars: Some(strings::to_utf16_chars),
            string_to_utf32_chars: Some(strings::to_utf32_chars),
            string_to_wide_chars: Some(strings::to_wide_chars),
            string_operator_index: Some(strings::string_index),
            string_operator_index_const: Some(strings::string_index_const),

            packed_byte_array_operator_index: Some(strings::packed_byte_index),
            packed_byte_array_operator_index_const: Some(strings::packed_byte_index_const),
            packed_color_array_operator_index: Some(strings::packed_color_index),
            packed_color_array_operator_index_const: Some(strings::packed_color_index_const),
            packed_float32_array_operator_index: Some(strings::packed_float32_index),
            packed_float32_array_operator_index_const: Some(strings::packed_float32_index_const),
            packed_float64_array_operator_index: Some(strings::packed_float64_index),
            packed_float64_array_operator_index_const: Some(strings::packed_float64_index_const),
            packed_int32_array_operator_index: Some(strings::packed_int32_index),
            packed_int32_array_operator_index_const: Some(strings::packed_int32_index_const),
            packed_int64_array_operator_index: Some(strings::packed_int64_index),
            packed_int64_array_operator_index_const: Some(strings::packed_int64_index_const),
            packed_string_array_operator_index: Some(strings::packed_string_index),
            packed_string_array_operator_index_const: Some(strings::packed_string_index_const),
            packed_vector2_array_operator_index: Some(strings::packed_vector2_index),
            packed_vector2_array_operator_index_const: Some(strings::packed_vector2_index_const),
            packed_vector3_array_operator_index: Some(strings::packed_vector3_index),
            packed_vector3_array_operator_index_const: Some(strings::packed_vector3_index_const),
            array_operator_index: Some(strings::array_index),
            array_operator_index_const: Some(strings::array_index_const),
            dictionary_operator_index: Some(strings::dictionary_index),
            dictionary_operator_index_const: Some(strings::dictionary_index_const),

            object_method_bind_call: Some(objects::method_bind_call),
            object_method_bind_ptrcall: Some(objects::method_bind_ptrcall),
            object_destroy: Some(objects::destroy),
            global_get_singleton: Some(objects::global_get_singleton),
            object_get_instance_binding: Some(objects::get_instance_binding),
            object_set_instance_binding: Some(objects::set_instance_binding),
            object_set_instance: Some(objects::set_instance),
            object_cast_to: Some(objects::cast_to),
            object_get_instance_from_id: Some(objects::get_instance_from_id),
            object_get_instance_id: Some(objects::get_instance_id),

            classdb_construct_object: Some(objects::classdb_construct_object),
            classdb_get_method_bind: Some(objects::classdb_get_method_bind),
            classdb_get_class_tag: Some(objects::classdb_get_class_tag),

            classdb_register_extension_class: None,
            classdb_register_extension_class_method: None,
            classdb_register_extension_class_integer_constant: None,
            classdb_register_extension_class_property: None,
            classdb_register_extension_class_property_group: None,
            classdb_register_extension_class_property_subgroup: None,
            classdb_register_extension_class_signal: None,
            classdb_unregister_extension_class: None,
            get_library_path: None,
        };
        Self { table }
    }

    pub fn with_class_registration(mut self, hooks: RegistrationHooks) -> Self {
        let t = &mut self.table;
        t.classdb_register_extension_class = Some(hooks.register_class);
        t.classdb_register_extension_class_method = Some(hooks.register_method);
        t.classdb_register_extension_class_integer_constant =
            Some(hooks.register_integer_constant);
        t.classdb_register_extension_class_property = Some(hooks.register_property);
        t.classdb_register_extension_class_property_group = Some(hooks.register_property_group);
        t.classdb_register_extension_class_property_subgroup =
            Some(hooks.register_property_subgroup);
        t.classdb_register_extension_class_signal = Some(hooks.register_signal);
        t.classdb_unregister_extension_class = Some(hooks.unregister_class);
        t.get_library_path = Some(hooks.get_library_path);
        self
    }

    pub fn build(self) -> NativeInterface {
        self.table
    }
}

static INTERFACE: OnceLock<NativeInterface> = OnceLock::new();

/// The complete table, built on first use and never modified afterwards.
pub fn native_interface() -> &'static NativeInterface {
    INTERFACE.get_or_init(|| {
        InterfaceBuilder::new()
            .with_class_registration(crate::extension::registration_hooks())
            .build()
    })
}

// ---------------------------------------------------------------------------
// Pointer helpers shared by the entry points
// ---------------------------------------------------------------------------

/// Borrow a NUL-terminated UTF-8 string. `None` for null or invalid UTF-8.
pub(crate) unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

pub(crate) unsafe fn c_str_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// A name argument; reports and yields `None` when unusable.
pub(crate) unsafe fn name_arg(ptr: *const c_char, role: &str) -> Option<StringName> {
    match unsafe { c_str(ptr) } {
        Some(text) => Some(StringName::new(text)),
        None => {
            gdhost_core::err_print!("{role} is null or not valid UTF-8");
            None
        }
    }
}

pub(crate) unsafe fn variant_ref<'a>(ptr: ConstVariantPtr) -> Option<&'a Variant> {
    unsafe { ptr.cast::<Variant>().as_ref() }
}

pub(crate) unsafe fn string_name_ref<'a>(ptr: ConstStringNamePtr) -> Option<&'a StringName> {
    unsafe { ptr.cast::<StringName>().as_ref() }
}

/// Construct `value` in uninitialized storage. Dropped when `ptr` is null.
pub(crate) unsafe fn emplace<T>(ptr: *mut c_void, value: T) {
    if !ptr.is_null() {
        unsafe { ptr.cast::<T>().write(value) };
    }
}

pub(crate) unsafe fn set_flag(flag: *mut GdBool, value: bool) {
    if !flag.is_null() {
        unsafe { *flag = GdBool::from(value) };
    }
}

/// Write the outcome of a dynamic call: the value into uninitialized
/// `r_return` (Nil on error), the error into `r_error`.
pub(crate) unsafe fn finish_call(
    result: Result<Variant, CallError>,
    r_return: VariantPtr,
    r_error: *mut sys::CallError,
) {
    let (value, error) = match result {
        Ok(value) => (value, sys::CallError::OK),
        Err(e) => (Variant::Nil, e.to_sys()),
    };
    unsafe { emplace(r_return, value) };
    if !r_error.is_null() {
        unsafe { *r_error = error };
    }
}

/// Borrow `count` Variant arguments. A null argument is an invalid argument.
pub(crate) unsafe fn variant_args<'a>(
    args: *const ConstVariantPtr,
    count: GdInt,
) -> Result<SmallVec<[&'a Variant; 8]>, CallError> {
    let count = usize::try_from(count).unwrap_or(0);
    if count > 0 && args.is_null() {
        return Err(CallError::InvalidArgument {
            argument: 0,
            expected: gdhost_core::VariantType::Nil,
        });
    }
    let mut out = SmallVec::with_capacity(count);
    for i in 0..count {
        let arg = unsafe { variant_ref(*args.add(i)) }.ok_or(CallError::InvalidArgument {
            argument: i32::try_from(i).unwrap_or(i32::MAX),
            expected: gdhost_core::VariantType::Nil,
        })?;
        out.push(arg);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_builder_leaves_registration_empty() {
        let table = InterfaceBuilder::new().build();
        assert!(table.classdb_register_extension_class.is_none());
        assert!(table.get_library_path.is_none());
        assert!(table.variant_new_copy.is_some());
        assert!(table.classdb_get_method_bind.is_some());
        assert_eq!(table.version_major, sys::VERSION_MAJOR);
    }

    #[test]
    fn frozen_table_has_registration_and_is_shared() {
        let a = native_interface();
        let b = native_interface();
        assert!(std::ptr::eq(a, b));
        assert!(a.classdb_register_extension_class.is_some());
        assert!(a.classdb_unregister_extension_class.is_some());
    }

    #[test]
    fn null_argument_is_rejected() {
        let v = Variant::from(1);
        let args: [ConstVariantPtr; 2] = [std::ptr::from_ref(&v).cast(), std::ptr::null()];
        let err = unsafe { variant_args(args.as_ptr(), 2) }.map(|a| a.len());
        assert_eq!(
            err,
            Err(CallError::InvalidArgument {
                argument: 1,
                expected: gdhost_core::VariantType::Nil
            })
        );
    }
}
