// gdhost_sys: C ABI definitions shared by the engine and native extensions.
//
// Everything in this crate is `#[repr(C)]` or a plain integer so that a
// module compiled by a different toolchain (or a different version of this
// workspace) can read it. The engine side (`gdhost_core`,
// `gdhost_extension`) and every extension (see `gdhost_test_extension`)
// compile against these definitions and nothing else.
//
// Module overview:
// - Opaque pointer aliases (`VariantPtr`, `TypePtr`, `ObjectPtr`, ...).
// - Enumerations as raw `u32` constants (`VARIANT_TYPE_*`, `OP_*`,
//   `CALL_ERROR_*`, `INITIALIZATION_*`, method flags, property usage).
//   Enums are never transmuted from foreign integers; receivers range-check.
// - Function-pointer typedefs for the ptrcall family and extension vtables.
// - `NativeInterface`: the flat dispatch table handed to extensions.
// - `method_signature_hash`: the signature hash both sides must agree on.
//
// **Critical constraint: binary stability.** Fields of `NativeInterface` are
// only ever appended. Reordering, removing or retyping a field breaks every
// extension compiled against an earlier layout. Bump `VERSION_MINOR` when
// appending.

use std::ffi::{c_char, c_void};

pub const VERSION_MAJOR: u32 = 4;
pub const VERSION_MINOR: u32 = 0;
pub const VERSION_PATCH: u32 = 0;
pub const VERSION_STRING: &std::ffi::CStr = c"gdhost v4.0.0.stable";

// ---------------------------------------------------------------------------
// Scalar and pointer aliases
// ---------------------------------------------------------------------------

pub type GdInt = i64;
pub type GdBool = u8;
pub type ObjectInstanceId = u64;

pub type VariantPtr = *mut c_void;
pub type ConstVariantPtr = *const c_void;
pub type StringNamePtr = *mut c_void;
pub type ConstStringNamePtr = *const c_void;
pub type StringPtr = *mut c_void;
pub type ConstStringPtr = *const c_void;
pub type ObjectPtr = *mut c_void;
pub type ConstObjectPtr = *const c_void;
pub type TypePtr = *mut c_void;
pub type ConstTypePtr = *const c_void;
pub type MethodBindPtr = *const c_void;
pub type ClassLibraryPtr = *mut c_void;
pub type ClassInstancePtr = *mut c_void;

/// Platform `wchar_t`.
#[cfg(windows)]
pub type WChar = u16;
#[cfg(not(windows))]
pub type WChar = u32;

/// Upper bound on the size of engine `Variant` storage. Extensions may use
/// this to reserve stack storage; `get_native_struct_size("Variant")` gives
/// the exact size for the running engine.
pub const VARIANT_STORAGE_SIZE: usize = 40;

/// Caller-owned storage for one engine `Variant`.
#[repr(C, align(8))]
pub struct VariantStorage(pub [u8; VARIANT_STORAGE_SIZE]);

impl VariantStorage {
    pub const fn uninit() -> Self {
        Self([0; VARIANT_STORAGE_SIZE])
    }

    pub fn as_mut_ptr(&mut self) -> VariantPtr {
        self.0.as_mut_ptr().cast()
    }

    pub fn as_ptr(&self) -> ConstVariantPtr {
        self.0.as_ptr().cast()
    }
}

/// Upper bound on the size of any non-Variant builtin kind whose native
/// representation is an engine handle (String, StringName, Array, ...).
pub const OPAQUE_HANDLE_SIZE: usize = 16;

/// Caller-owned storage for one handle-backed builtin value.
#[repr(C, align(8))]
pub struct OpaqueStorage(pub [u8; OPAQUE_HANDLE_SIZE]);

impl OpaqueStorage {
    pub const fn uninit() -> Self {
        Self([0; OPAQUE_HANDLE_SIZE])
    }

    pub fn as_mut_ptr(&mut self) -> TypePtr {
        self.0.as_mut_ptr().cast()
    }

    pub fn as_ptr(&self) -> ConstTypePtr {
        self.0.as_ptr().cast()
    }
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

pub type VariantType = u32;

pub const VARIANT_TYPE_NIL: VariantType = 0;
pub const VARIANT_TYPE_BOOL: VariantType = 1;
pub const VARIANT_TYPE_INT: VariantType = 2;
pub const VARIANT_TYPE_FLOAT: VariantType = 3;
pub const VARIANT_TYPE_STRING: VariantType = 4;
pub const VARIANT_TYPE_VECTOR2: VariantType = 5;
pub const VARIANT_TYPE_VECTOR2I: VariantType = 6;
pub const VARIANT_TYPE_RECT2: VariantType = 7;
pub const VARIANT_TYPE_RECT2I: VariantType = 8;
pub const VARIANT_TYPE_VECTOR3: VariantType = 9;
pub const VARIANT_TYPE_VECTOR3I: VariantType = 10;
pub const VARIANT_TYPE_TRANSFORM2D: VariantType = 11;
pub const VARIANT_TYPE_VECTOR4: VariantType = 12;
pub const VARIANT_TYPE_VECTOR4I: VariantType = 13;
pub const VARIANT_TYPE_PLANE: VariantType = 14;
pub const VARIANT_TYPE_QUATERNION: VariantType = 15;
pub const VARIANT_TYPE_AABB: VariantType = 16;
pub const VARIANT_TYPE_BASIS: VariantType = 17;
pub const VARIANT_TYPE_TRANSFORM3D: VariantType = 18;
pub const VARIANT_TYPE_PROJECTION: VariantType = 19;
pub const VARIANT_TYPE_COLOR: VariantType = 20;
pub const VARIANT_TYPE_STRING_NAME: VariantType = 21;
pub const VARIANT_TYPE_NODE_PATH: VariantType = 22;
pub const VARIANT_TYPE_RID: VariantType = 23;
pub const VARIANT_TYPE_OBJECT: VariantType = 24;
pub const VARIANT_TYPE_CALLABLE: VariantType = 25;
pub const VARIANT_TYPE_SIGNAL: VariantType = 26;
pub const VARIANT_TYPE_DICTIONARY: VariantType = 27;
pub const VARIANT_TYPE_ARRAY: VariantType = 28;
pub const VARIANT_TYPE_PACKED_BYTE_ARRAY: VariantType = 29;
pub const VARIANT_TYPE_PACKED_INT32_ARRAY: VariantType = 30;
pub const VARIANT_TYPE_PACKED_INT64_ARRAY: VariantType = 31;
pub const VARIANT_TYPE_PACKED_FLOAT32_ARRAY: VariantType = 32;
pub const VARIANT_TYPE_PACKED_FLOAT64_ARRAY: VariantType = 33;
pub const VARIANT_TYPE_PACKED_STRING_ARRAY: VariantType = 34;
pub const VARIANT_TYPE_PACKED_VECTOR2_ARRAY: VariantType = 35;
pub const VARIANT_TYPE_PACKED_VECTOR3_ARRAY: VariantType = 36;
pub const VARIANT_TYPE_PACKED_COLOR_ARRAY: VariantType = 37;
pub const VARIANT_TYPE_MAX: VariantType = 38;

pub type VariantOperator = u32;

pub const OP_EQUAL: VariantOperator = 0;
pub const OP_NOT_EQUAL: VariantOperator = 1;
pub const OP_LESS: VariantOperator = 2;
pub const OP_LESS_EQUAL: VariantOperator = 3;
pub const OP_GREATER: VariantOperator = 4;
pub const OP_GREATER_EQUAL: VariantOperator = 5;
pub const OP_ADD: VariantOperator = 6;
pub const OP_SUBTRACT: VariantOperator = 7;
pub const OP_MULTIPLY: VariantOperator = 8;
pub const OP_DIVIDE: VariantOperator = 9;
pub const OP_NEGATE: VariantOperator = 10;
pub const OP_POSITIVE: VariantOperator = 11;
pub const OP_MODULE: VariantOperator = 12;
pub const OP_POWER: VariantOperator = 13;
pub const OP_SHIFT_LEFT: VariantOperator = 14;
pub const OP_SHIFT_RIGHT: VariantOperator = 15;
pub const OP_BIT_AND: VariantOperator = 16;
pub const OP_BIT_OR: VariantOperator = 17;
pub const OP_BIT_XOR: VariantOperator = 18;
pub const OP_BIT_NEGATE: VariantOperator = 19;
pub const OP_AND: VariantOperator = 20;
pub const OP_OR: VariantOperator = 21;
pub const OP_XOR: VariantOperator = 22;
pub const OP_NOT: VariantOperator = 23;
pub const OP_IN: VariantOperator = 24;
pub const OP_MAX: VariantOperator = 25;

pub type CallErrorType = u32;

pub const CALL_OK: CallErrorType = 0;
pub const CALL_ERROR_INVALID_METHOD: CallErrorType = 1;
/// `expected` holds the expected variant type.
pub const CALL_ERROR_INVALID_ARGUMENT: CallErrorType = 2;
/// `argument` holds the expected argument count.
pub const CALL_ERROR_TOO_MANY_ARGUMENTS: CallErrorType = 3;
/// `argument` holds the expected argument count.
pub const CALL_ERROR_TOO_FEW_ARGUMENTS: CallErrorType = 4;
pub const CALL_ERROR_INSTANCE_IS_NULL: CallErrorType = 5;

/// Structured error for dynamic calls. Never thrown; always written to an
/// out-parameter.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallError {
    pub error: CallErrorType,
    pub argument: i32,
    pub expected: i32,
}

impl CallError {
    pub const OK: CallError = CallError {
        error: CALL_OK,
        argument: 0,
        expected: 0,
    };

    pub fn is_ok(&self) -> bool {
        self.error == CALL_OK
    }
}

pub type InitializationLevel = u32;

pub const INITIALIZATION_CORE: InitializationLevel = 0;
pub const INITIALIZATION_SERVERS: InitializationLevel = 1;
pub const INITIALIZATION_SCENE: InitializationLevel = 2;
pub const INITIALIZATION_EDITOR: InitializationLevel = 3;
pub const INITIALIZATION_MAX: InitializationLevel = 4;

pub const METHOD_FLAG_NORMAL: u32 = 1;
pub const METHOD_FLAG_EDITOR: u32 = 2;
pub const METHOD_FLAG_CONST: u32 = 4;
pub const METHOD_FLAG_VIRTUAL: u32 = 8;
pub const METHOD_FLAG_VARARG: u32 = 16;
pub const METHOD_FLAG_STATIC: u32 = 32;
pub const METHOD_FLAGS_DEFAULT: u32 = METHOD_FLAG_NORMAL;

pub type MethodArgumentMetadata = u32;

pub const METHOD_ARGUMENT_METADATA_NONE: MethodArgumentMetadata = 0;
pub const METHOD_ARGUMENT_METADATA_INT_IS_INT8: MethodArgumentMetadata = 1;
pub const METHOD_ARGUMENT_METADATA_INT_IS_INT16: MethodArgumentMetadata = 2;
pub const METHOD_ARGUMENT_METADATA_INT_IS_INT32: MethodArgumentMetadata = 3;
pub const METHOD_ARGUMENT_METADATA_INT_IS_INT64: MethodArgumentMetadata = 4;
pub const METHOD_ARGUMENT_METADATA_INT_IS_UINT8: MethodArgumentMetadata = 5;
pub const METHOD_ARGUMENT_METADATA_INT_IS_UINT16: MethodArgumentMetadata = 6;
pub const METHOD_ARGUMENT_METADATA_INT_IS_UINT32: MethodArgumentMetadata = 7;
pub const METHOD_ARGUMENT_METADATA_INT_IS_UINT64: MethodArgumentMetadata = 8;
pub const METHOD_ARGUMENT_METADATA_REAL_IS_FLOAT: MethodArgumentMetadata = 9;
pub const METHOD_ARGUMENT_METADATA_REAL_IS_DOUBLE: MethodArgumentMetadata = 10;

pub const PROPERTY_HINT_NONE: u32 = 0;
pub const PROPERTY_USAGE_NONE: u32 = 0;
pub const PROPERTY_USAGE_STORAGE: u32 = 2;
pub const PROPERTY_USAGE_EDITOR: u32 = 4;
pub const PROPERTY_USAGE_DEFAULT: u32 = PROPERTY_USAGE_STORAGE | PROPERTY_USAGE_EDITOR;
pub const PROPERTY_USAGE_GROUP: u32 = 64;
pub const PROPERTY_USAGE_SUBGROUP: u32 = 256;

// ---------------------------------------------------------------------------
// Ptrcall function types
// ---------------------------------------------------------------------------

pub type VariantFromTypeConstructorFunc = unsafe extern "C" fn(VariantPtr, ConstTypePtr);
pub type TypeFromVariantConstructorFunc = unsafe extern "C" fn(TypePtr, ConstVariantPtr);
pub type PtrOperatorEvaluator = unsafe extern "C" fn(ConstTypePtr, ConstTypePtr, TypePtr);
pub type PtrBuiltInMethod =
    unsafe extern "C" fn(TypePtr, *const ConstTypePtr, TypePtr, i32);
pub type PtrConstructor = unsafe extern "C" fn(TypePtr, *const ConstTypePtr);
pub type PtrDestructor = unsafe extern "C" fn(TypePtr);
pub type PtrSetter = unsafe extern "C" fn(TypePtr, ConstTypePtr);
pub type PtrGetter = unsafe extern "C" fn(ConstTypePtr, TypePtr);
pub type PtrIndexedSetter = unsafe extern "C" fn(TypePtr, GdInt, ConstTypePtr);
pub type PtrIndexedGetter = unsafe extern "C" fn(ConstTypePtr, GdInt, TypePtr);
pub type PtrKeyedSetter = unsafe extern "C" fn(TypePtr, ConstTypePtr, ConstTypePtr);
pub type PtrKeyedGetter = unsafe extern "C" fn(ConstTypePtr, ConstTypePtr, TypePtr);
pub type PtrKeyedChecker = unsafe extern "C" fn(ConstVariantPtr, ConstVariantPtr) -> u32;
pub type PtrUtilityFunction = unsafe extern "C" fn(TypePtr, *const ConstTypePtr, i32);

pub type ClassConstructor = unsafe extern "C" fn() -> ObjectPtr;

// ---------------------------------------------------------------------------
// Instance bindings
// ---------------------------------------------------------------------------

pub type InstanceBindingCreateCallback =
    unsafe extern "C" fn(token: *mut c_void, instance: *mut c_void) -> *mut c_void;
pub type InstanceBindingFreeCallback =
    unsafe extern "C" fn(token: *mut c_void, instance: *mut c_void, binding: *mut c_void);
pub type InstanceBindingReferenceCallback =
    unsafe extern "C" fn(token: *mut c_void, binding: *mut c_void, reference: GdBool) -> GdBool;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct InstanceBindingCallbacks {
    pub create_callback: Option<InstanceBindingCreateCallback>,
    pub free_callback: Option<InstanceBindingFreeCallback>,
    pub reference_callback: Option<InstanceBindingReferenceCallback>,
}

// ---------------------------------------------------------------------------
// Extension classes
// ---------------------------------------------------------------------------

pub type ExtensionClassSet =
    unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr, ConstVariantPtr) -> GdBool;
pub type ExtensionClassGet =
    unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr, VariantPtr) -> GdBool;
pub type ExtensionClassGetRid = unsafe extern "C" fn(ClassInstancePtr) -> u64;
pub type ExtensionClassGetPropertyList =
    unsafe extern "C" fn(ClassInstancePtr, *mut u32) -> *const PropertyInfo;
pub type ExtensionClassFreePropertyList =
    unsafe extern "C" fn(ClassInstancePtr, *const PropertyInfo);
pub type ExtensionClassPropertyCanRevert =
    unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr) -> GdBool;
pub type ExtensionClassPropertyGetRevert =
    unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr, VariantPtr) -> GdBool;
pub type ExtensionClassNotification = unsafe extern "C" fn(ClassInstancePtr, i32);
pub type ExtensionClassToString = unsafe extern "C" fn(ClassInstancePtr, StringPtr);
pub type ExtensionClassReference = unsafe extern "C" fn(ClassInstancePtr);
pub type ExtensionClassUnreference = unsafe extern "C" fn(ClassInstancePtr);
pub type ExtensionClassCallVirtual =
    unsafe extern "C" fn(ClassInstancePtr, *const ConstTypePtr, TypePtr);
pub type ExtensionClassCreateInstance = unsafe extern "C" fn(userdata: *mut c_void) -> ObjectPtr;
pub type ExtensionClassFreeInstance =
    unsafe extern "C" fn(userdata: *mut c_void, instance: ClassInstancePtr);
pub type ExtensionClassGetVirtual =
    unsafe extern "C" fn(userdata: *mut c_void, name: ConstStringNamePtr) -> Option<ExtensionClassCallVirtual>;

/// Property description passed across the boundary. Strings are
/// NUL-terminated UTF-8 and only need to live for the duration of the call
/// that receives them.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PropertyInfo {
    pub type_: VariantType,
    pub name: *const c_char,
    pub class_name: *const c_char,
    pub hint: u32,
    pub hint_string: *const c_char,
    pub usage: u32,
}

/// The vtable an extension supplies when registering a class.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ExtensionClassCreationInfo {
    pub is_virtual: GdBool,
    pub is_abstract: GdBool,
    pub set_func: Option<ExtensionClassSet>,
    pub get_func: Option<ExtensionClassGet>,
    pub get_property_list_func: Option<ExtensionClassGetPropertyList>,
    pub free_property_list_func: Option<ExtensionClassFreePropertyList>,
    pub property_can_revert_func: Option<ExtensionClassPropertyCanRevert>,
    pub property_get_revert_func: Option<ExtensionClassPropertyGetRevert>,
    pub notification_func: Option<ExtensionClassNotification>,
    pub to_string_func: Option<ExtensionClassToString>,
    pub reference_func: Option<ExtensionClassReference>,
    pub unreference_func: Option<ExtensionClassUnreference>,
    pub create_instance_func: Option<ExtensionClassCreateInstance>,
    pub free_instance_func: Option<ExtensionClassFreeInstance>,
    pub get_virtual_func: Option<ExtensionClassGetVirtual>,
    pub get_rid_func: Option<ExtensionClassGetRid>,
    pub class_userdata: *mut c_void,
}

pub type ExtensionClassMethodCall = unsafe extern "C" fn(
    method_userdata: *mut c_void,
    instance: ClassInstancePtr,
    args: *const ConstVariantPtr,
    argument_count: GdInt,
    r_return: VariantPtr,
    r_error: *mut CallError,
);
pub type ExtensionClassMethodPtrCall = unsafe extern "C" fn(
    method_userdata: *mut c_void,
    instance: ClassInstancePtr,
    args: *const ConstTypePtr,
    r_return: TypePtr,
);
/// Argument `-1` asks for the return value.
pub type ExtensionClassMethodGetArgumentType =
    unsafe extern "C" fn(method_userdata: *mut c_void, argument: i32) -> VariantType;
pub type ExtensionClassMethodGetArgumentInfo =
    unsafe extern "C" fn(method_userdata: *mut c_void, argument: i32, r_info: *mut PropertyInfo);
pub type ExtensionClassMethodGetArgumentMetadata =
    unsafe extern "C" fn(method_userdata: *mut c_void, argument: i32) -> MethodArgumentMetadata;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct ExtensionClassMethodInfo {
    pub name: *const c_char,
    pub method_userdata: *mut c_void,
    pub call_func: Option<ExtensionClassMethodCall>,
    pub ptrcall_func: Option<ExtensionClassMethodPtrCall>,
    pub method_flags: u32,
    pub argument_count: u32,
    pub has_return_value: GdBool,
    pub get_argument_type_func: Option<ExtensionClassMethodGetArgumentType>,
    pub get_argument_info_func: Option<ExtensionClassMethodGetArgumentInfo>,
    pub get_argument_metadata_func: Option<ExtensionClassMethodGetArgumentMetadata>,
    pub default_argument_count: u32,
    pub default_arguments: *const ConstVariantPtr,
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy)]
pub struct Initialization {
    pub minimum_initialization_level: InitializationLevel,
    pub userdata: *mut c_void,
    pub initialize: Option<unsafe extern "C" fn(userdata: *mut c_void, level: InitializationLevel)>,
    pub deinitialize:
        Option<unsafe extern "C" fn(userdata: *mut c_void, level: InitializationLevel)>,
}

impl Default for Initialization {
    fn default() -> Self {
        Self {
            minimum_initialization_level: INITIALIZATION_CORE,
            userdata: std::ptr::null_mut(),
            initialize: None,
            deinitialize: None,
        }
    }
}

/// Signature of the entry symbol named by the extension manifest. Returns
/// nonzero on success.
pub type InitializationFunction = unsafe extern "C" fn(
    interface: *const NativeInterface,
    library: ClassLibraryPtr,
    r_initialization: *mut Initialization,
) -> GdBool;

// ---------------------------------------------------------------------------
// The interface table
// ---------------------------------------------------------------------------

type Fp<T> = Option<T>;

/// Flat table of engine entry points. The version fields come first and are
/// the only fields an extension may read before checking compatibility.
#[repr(C)]
pub struct NativeInterface {
    pub version_major: u32,
    pub version_minor: u32,
    pub version_patch: u32,
    pub version_string: *const c_char,

    // Core
    pub mem_alloc: Fp<unsafe extern "C" fn(usize) -> *mut c_void>,
    pub mem_realloc: Fp<unsafe extern "C" fn(*mut c_void, usize) -> *mut c_void>,
    pub mem_free: Fp<unsafe extern "C" fn(*mut c_void)>,
    pub print_error: Fp<unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, i32)>,
    pub print_warning: Fp<unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, i32)>,
    pub print_script_error:
        Fp<unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, i32)>,
    pub get_native_struct_size: Fp<unsafe extern "C" fn(*const c_char) -> u64>,

    // Variant
    pub variant_new_copy: Fp<unsafe extern "C" fn(VariantPtr, ConstVariantPtr)>,
    pub variant_new_nil: Fp<unsafe extern "C" fn(VariantPtr)>,
    pub variant_destroy: Fp<unsafe extern "C" fn(VariantPtr)>,
    pub variant_call: Fp<
        unsafe extern "C" fn(
            VariantPtr,
            ConstStringNamePtr,
            *const ConstVariantPtr,
            GdInt,
            VariantPtr,
            *mut CallError,
        ),
    >,
    pub variant_call_static: Fp<
        unsafe extern "C" fn(
            VariantType,
            ConstStringNamePtr,
            *const ConstVariantPtr,
            GdInt,
            VariantPtr,
            *mut CallError,
        ),
    >,
    pub variant_evaluate: Fp<
        unsafe extern "C" fn(VariantOperator, ConstVariantPtr, ConstVariantPtr, VariantPtr, *mut GdBool),
    >,
    pub variant_set:
        Fp<unsafe extern "C" fn(VariantPtr, ConstVariantPtr, ConstVariantPtr, *mut GdBool)>,
    pub variant_set_named:
        Fp<unsafe extern "C" fn(VariantPtr, ConstStringNamePtr, ConstVariantPtr, *mut GdBool)>,
    pub variant_set_keyed:
        Fp<unsafe extern "C" fn(VariantPtr, ConstVariantPtr, ConstVariantPtr, *mut GdBool)>,
    pub variant_set_indexed:
        Fp<unsafe extern "C" fn(VariantPtr, GdInt, ConstVariantPtr, *mut GdBool, *mut GdBool)>,
    pub variant_get:
        Fp<unsafe extern "C" fn(ConstVariantPtr, ConstVariantPtr, VariantPtr, *mut GdBool)>,
    pub variant_get_named:
        Fp<unsafe extern "C" fn(ConstVariantPtr, ConstStringNamePtr, VariantPtr, *mut GdBool)>,
    pub variant_get_keyed:
        Fp<unsafe extern "C" fn(ConstVariantPtr, ConstVariantPtr, VariantPtr, *mut GdBool)>,
    pub variant_get_indexed:
        Fp<unsafe extern "C" fn(ConstVariantPtr, GdInt, VariantPtr, *mut GdBool, *mut GdBool)>,
    pub variant_iter_init: Fp<unsafe extern "C" fn(ConstVariantPtr, VariantPtr, *mut GdBool) -> GdBool>,
    pub variant_iter_next: Fp<unsafe extern "C" fn(ConstVariantPtr, VariantPtr, *mut GdBool) -> GdBool>,
    pub variant_iter_get:
        Fp<unsafe extern "C" fn(ConstVariantPtr, VariantPtr, VariantPtr, *mut GdBool)>,
    pub variant_hash: Fp<unsafe extern "C" fn(ConstVariantPtr) -> GdInt>,
    pub variant_recursive_hash: Fp<unsafe extern "C" fn(ConstVariantPtr, GdInt) -> GdInt>,
    pub variant_hash_compare: Fp<unsafe extern "C" fn(ConstVariantPtr, ConstVariantPtr) -> GdBool>,
    pub variant_booleanize: Fp<unsafe extern "C" fn(ConstVariantPtr) -> GdBool>,
    pub variant_sub: Fp<unsafe extern "C" fn(ConstVariantPtr, ConstVariantPtr, VariantPtr)>,
    pub variant_blend: Fp<unsafe extern "C" fn(ConstVariantPtr, ConstVariantPtr, f32, VariantPtr)>,
    pub variant_interpolate:
        Fp<unsafe extern "C" fn(ConstVariantPtr, ConstVariantPtr, f32, VariantPtr)>,
    pub variant_duplicate: Fp<unsafe extern "C" fn(ConstVariantPtr, VariantPtr, GdBool)>,
    pub variant_stringify: Fp<unsafe extern "C" fn(ConstVariantPtr, StringPtr)>,
    pub variant_get_type: Fp<unsafe extern "C" fn(ConstVariantPtr) -> VariantType>,
    pub variant_has_method: Fp<unsafe extern "C" fn(ConstVariantPtr, ConstStringNamePtr) -> GdBool>,
    pub variant_has_member: Fp<unsafe extern "C" fn(VariantType, ConstStringNamePtr) -> GdBool>,
    pub variant_has_key:
        Fp<unsafe extern "C" fn(ConstVariantPtr, ConstVariantPtr, *mut GdBool) -> GdBool>,
    pub variant_get_type_name: Fp<unsafe extern "C" fn(VariantType, StringPtr)>,
    pub variant_can_convert: Fp<unsafe extern "C" fn(VariantType, VariantType) -> GdBool>,
    pub variant_can_convert_strict: Fp<unsafe extern "C" fn(VariantType, VariantType) -> GdBool>,

    // Ptrcall lookups
    pub get_variant_from_type_constructor:
        Fp<unsafe extern "C" fn(VariantType) -> Option<VariantFromTypeConstructorFunc>>,
    pub get_variant_to_type_constructor:
        Fp<unsafe extern "C" fn(VariantType) -> Option<TypeFromVariantConstructorFunc>>,
    pub variant_get_ptr_operator_evaluator: Fp<
        unsafe extern "C" fn(VariantOperator, VariantType, VariantType) -> Option<PtrOperatorEvaluator>,
    >,
    pub variant_get_ptr_builtin_method:
        Fp<unsafe extern "C" fn(VariantType, *const c_char, GdInt) -> Option<PtrBuiltInMethod>>,
    pub variant_get_ptr_constructor:
        Fp<unsafe extern "C" fn(VariantType, i32) -> Option<PtrConstructor>>,
    pub variant_get_ptr_destructor: Fp<unsafe extern "C" fn(VariantType) -> Option<PtrDestructor>>,
    pub variant_construct: Fp<
        unsafe extern "C" fn(VariantType, VariantPtr, *const ConstVariantPtr, i32, *mut CallError),
    >,
    pub variant_get_ptr_setter:
        Fp<unsafe extern "C" fn(VariantType, *const c_char) -> Option<PtrSetter>>,
    pub variant_get_ptr_getter:
        Fp<unsafe extern "C" fn(VariantType, *const c_char) -> Option<PtrGetter>>,
    pub variant_get_ptr_indexed_setter:
        Fp<unsafe extern "C" fn(VariantType) -> Option<PtrIndexedSetter>>,
    pub variant_get_ptr_indexed_getter:
        Fp<unsafe extern "C" fn(VariantType) -> Option<PtrIndexedGetter>>,
    pub variant_get_ptr_keyed_setter: Fp<unsafe extern "C" fn(VariantType) -> Option<PtrKeyedSetter>>,
    pub variant_get_ptr_keyed_getter: Fp<unsafe extern "C" fn(VariantType) -> Option<PtrKeyedGetter>>,
    pub variant_get_ptr_keyed_checker:
        Fp<unsafe extern "C" fn(VariantType) -> Option<PtrKeyedChecker>>,
    pub variant_get_constant_value: Fp<unsafe extern "C" fn(VariantType, *const c_char, VariantPtr)>,
    pub variant_get_ptr_utility_function:
        Fp<unsafe extern "C" fn(*const c_char, GdInt) -> Option<PtrUtilityFunction>>,

    // Strings
    pub string_new_with_latin1_chars: Fp<unsafe extern "C" fn(StringPtr, *const c_char)>,
    pub string_new_with_utf8_chars: Fp<unsafe extern "C" fn(StringPtr, *const c_char)>,
    pub string_new_with_utf16_chars: Fp<unsafe extern "C" fn(StringPtr, *const u16)>,
    pub string_new_with_utf32_chars: Fp<unsafe extern "C" fn(StringPtr, *const u32)>,
    pub string_new_with_wide_chars: Fp<unsafe extern "C" fn(StringPtr, *const WChar)>,
    pub string_new_with_latin1_chars_and_len:
        Fp<unsafe extern "C" fn(StringPtr, *const c_char, GdInt)>,
    pub string_new_with_utf8_chars_and_len: Fp<unsafe extern "C" fn(StringPtr, *const c_char, GdInt)>,
    pub string_new_with_utf16_chars_and_len: Fp<unsafe extern "C" fn(StringPtr, *const u16, GdInt)>,
    pub string_new_with_utf32_chars_and_len: Fp<unsafe extern "C" fn(StringPtr, *const u32, GdInt)>,
    pub string_new_with_wide_chars_and_len: Fp<unsafe extern "C" fn(StringPtr, *const WChar, GdInt)>,
    pub string_to_latin1_chars: Fp<unsafe extern "C" fn(ConstStringPtr, *mut c_char, GdInt) -> GdInt>,
    pub string_to_utf8_chars: Fp<unsafe extern "C" fn(ConstStringPtr, *mut c_char, GdInt) -> GdInt>,
    pub string_to_utf16_chars: Fp<unsafe extern "C" fn(ConstStringPtr, *mut u16, GdInt) -> GdInt>,
    pub string_to_utf32_chars: Fp<unsafe extern "C" fn(ConstStringPtr, *mut u32, GdInt) -> GdInt>,
    pub string_to_wide_chars: Fp<unsafe extern "C" fn(ConstStringPtr, *mut WChar, GdInt) -> GdInt>,
    pub string_operator_index: Fp<unsafe extern "C" fn(StringPtr, GdInt) -> *mut u32>,
    pub string_operator_index_const: Fp<unsafe extern "C" fn(ConstStringPtr, GdInt) -> *const u32>,

    // Packed arrays, Array, Dictionary
    pub packed_byte_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> *mut u8>,
    pub packed_byte_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> *const u8>,
    pub packed_color_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> TypePtr>,
    pub packed_color_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> ConstTypePtr>,
    pub packed_float32_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> *mut f32>,
    pub packed_float32_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> *const f32>,
    pub packed_float64_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> *mut f64>,
    pub packed_float64_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> *const f64>,
    pub packed_int32_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> *mut i32>,
    pub packed_int32_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> *const i32>,
    pub packed_int64_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> *mut i64>,
    pub packed_int64_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> *const i64>,
    pub packed_string_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> StringPtr>,
    pub packed_string_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> ConstStringPtr>,
    pub packed_vector2_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> TypePtr>,
    pub packed_vector2_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> ConstTypePtr>,
    pub packed_vector3_array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> TypePtr>,
    pub packed_vector3_array_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> ConstTypePtr>,
    pub array_operator_index: Fp<unsafe extern "C" fn(TypePtr, GdInt) -> VariantPtr>,
    pub array_operator_index_const: Fp<unsafe extern "C" fn(ConstTypePtr, GdInt) -> ConstVariantPtr>,
    pub dictionary_operator_index: Fp<unsafe extern "C" fn(TypePtr, ConstVariantPtr) -> VariantPtr>,
    pub dictionary_operator_index_const:
        Fp<unsafe extern "C" fn(ConstTypePtr, ConstVariantPtr) -> ConstVariantPtr>,

    // Objects
    pub object_method_bind_call: Fp<
        unsafe extern "C" fn(
            MethodBindPtr,
            ObjectPtr,
            *const ConstVariantPtr,
            GdInt,
            VariantPtr,
            *mut CallError,
        ),
    >,
    pub object_method_bind_ptrcall:
        Fp<unsafe extern "C" fn(MethodBindPtr, ObjectPtr, *const ConstTypePtr, TypePtr)>,
    pub object_destroy: Fp<unsafe extern "C" fn(ObjectPtr)>,
    pub global_get_singleton: Fp<unsafe extern "C" fn(*const c_char) -> ObjectPtr>,
    pub object_get_instance_binding: Fp<
        unsafe extern "C" fn(ObjectPtr, *mut c_void, *const InstanceBindingCallbacks) -> *mut c_void,
    >,
    pub object_set_instance_binding: Fp<
        unsafe extern "C" fn(ObjectPtr, *mut c_void, *mut c_void, *const InstanceBindingCallbacks),
    >,
    /// The class name must be a registered extension class inheriting the
    /// object's current class.
    pub object_set_instance: Fp<unsafe extern "C" fn(ObjectPtr, *const c_char, ClassInstancePtr)>,
    pub object_cast_to: Fp<unsafe extern "C" fn(ConstObjectPtr, *mut c_void) -> ObjectPtr>,
    pub object_get_instance_from_id: Fp<unsafe extern "C" fn(ObjectInstanceId) -> ObjectPtr>,
    pub object_get_instance_id: Fp<unsafe extern "C" fn(ConstObjectPtr) -> ObjectInstanceId>,

    // ClassDB
    pub classdb_construct_object: Fp<unsafe extern "C" fn(*const c_char) -> ObjectPtr>,
    pub classdb_get_method_bind:
        Fp<unsafe extern "C" fn(*const c_char, *const c_char, GdInt) -> MethodBindPtr>,
    pub classdb_get_class_tag: Fp<unsafe extern "C" fn(*const c_char) -> *mut c_void>,

    // ClassDB extension registration. Left `None` by the raw table and
    // filled in by the extension registry.
    pub classdb_register_extension_class: Fp<
        unsafe extern "C" fn(
            ClassLibraryPtr,
            *const c_char,
            *const c_char,
            *const ExtensionClassCreationInfo,
        ),
    >,
    pub classdb_register_extension_class_method:
        Fp<unsafe extern "C" fn(ClassLibraryPtr, *const c_char, *const ExtensionClassMethodInfo)>,
    pub classdb_register_extension_class_integer_constant: Fp<
        unsafe extern "C" fn(
            ClassLibraryPtr,
            *const c_char,
            *const c_char,
            *const c_char,
            GdInt,
            GdBool,
        ),
    >,
    pub classdb_register_extension_class_property: Fp<
        unsafe extern "C" fn(
            ClassLibraryPtr,
            *const c_char,
            *const PropertyInfo,
            *const c_char,
            *const c_char,
        ),
    >,
    pub classdb_register_extension_class_property_group:
        Fp<unsafe extern "C" fn(ClassLibraryPtr, *const c_char, *const c_char, *const c_char)>,
    pub classdb_register_extension_class_property_subgroup:
        Fp<unsafe extern "C" fn(ClassLibraryPtr, *const c_char, *const c_char, *const c_char)>,
    pub classdb_register_extension_class_signal: Fp<
        unsafe extern "C" fn(
            ClassLibraryPtr,
            *const c_char,
            *const c_char,
            *const PropertyInfo,
            GdInt,
        ),
    >,
    /// Unregistering a parent before its inheritors fails.
    pub classdb_unregister_extension_class: Fp<unsafe extern "C" fn(ClassLibraryPtr, *const c_char)>,
    pub get_library_path: Fp<unsafe extern "C" fn(ClassLibraryPtr, StringPtr)>,
}

// The table only holds function pointers and a pointer to a static string.
unsafe impl Send for NativeInterface {}
unsafe impl Sync for NativeInterface {}

// ---------------------------------------------------------------------------
// Signature hashing
// ---------------------------------------------------------------------------

pub const HASH_MURMUR3_SEED: u32 = 0x7F07_C65;

/// One round of 32-bit murmur3 mixing.
pub const fn hash_murmur3_one_32(input: u32, seed: u32) -> u32 {
    let mut k = input.wrapping_mul(0xcc9e_2d51);
    k = k.rotate_left(15);
    k = k.wrapping_mul(0x1b87_3593);
    let mut h = seed ^ k;
    h = h.rotate_left(13);
    h.wrapping_mul(5).wrapping_add(0xe654_6b64)
}

/// Murmur3 finalizer.
pub const fn hash_fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Hash of a callable signature: return type (or none), const-ness,
/// vararg-ness and argument types. Arguments typed as "any Variant" use
/// `VARIANT_TYPE_NIL`. Engine and extension must compute this identically;
/// it is part of the ABI version.
pub fn method_signature_hash(
    return_type: Option<VariantType>,
    arg_types: &[VariantType],
    is_const: bool,
    is_vararg: bool,
) -> u32 {
    let mut hash = hash_murmur3_one_32(u32::from(return_type.is_some()), HASH_MURMUR3_SEED);
    if let Some(ret) = return_type {
        hash = hash_murmur3_one_32(ret, hash);
    }
    hash = hash_murmur3_one_32(u32::from(is_const), hash);
    hash = hash_murmur3_one_32(u32::from(is_vararg), hash);
    #[allow(clippy::cast_possible_truncation)]
    let argc = arg_types.len() as u32;
    hash = hash_murmur3_one_32(argc, hash);
    for &arg in arg_types {
        hash = hash_murmur3_one_32(arg, hash);
    }
    hash_fmix32(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_hash_depends_on_every_component() {
        let base = method_signature_hash(Some(VARIANT_TYPE_INT), &[VARIANT_TYPE_INT], false, false);
        assert_ne!(base, method_signature_hash(None, &[VARIANT_TYPE_INT], false, false));
        assert_ne!(base, method_signature_hash(Some(VARIANT_TYPE_FLOAT), &[VARIANT_TYPE_INT], false, false));
        assert_ne!(base, method_signature_hash(Some(VARIANT_TYPE_INT), &[VARIANT_TYPE_INT], true, false));
        assert_ne!(base, method_signature_hash(Some(VARIANT_TYPE_INT), &[VARIANT_TYPE_INT], false, true));
        assert_ne!(base, method_signature_hash(Some(VARIANT_TYPE_INT), &[], false, false));
        assert_eq!(base, method_signature_hash(Some(VARIANT_TYPE_INT), &[VARIANT_TYPE_INT], false, false));
    }

    #[test]
    fn murmur_round_is_not_identity() {
        assert_ne!(hash_murmur3_one_32(0, HASH_MURMUR3_SEED), HASH_MURMUR3_SEED);
        assert_ne!(hash_fmix32(1), 1);
    }

    #[test]
    fn version_fields_lead_the_table() {
        assert_eq!(std::mem::offset_of!(NativeInterface, version_major), 0);
        assert_eq!(std::mem::offset_of!(NativeInterface, version_minor), 4);
        assert_eq!(std::mem::offset_of!(NativeInterface, version_patch), 8);
    }
}
