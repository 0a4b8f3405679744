// gdhost_test_extension: a sample native extension built only against
// `gdhost_sys`.
//
// It talks to the engine exclusively through the `NativeInterface` table it
// receives, the same way an extension compiled by another toolchain would.
// The host test suites load it both as a dynamic library (through a
// `.gdextension` manifest) and linked in (`NativeExtension::open_static`).
//
// At the scene level the main entry symbol registers:
// - `Foo : Object` with an int `value`, `get_value` / `set_value` (call and
//   ptrcall), a static `answer`, a vararg `sum`, a `Mode` enum, a `Stats`
//   property group, the `value` property and a `value_changed` signal.
// - `FooChild : Foo`, which exercises same-extension inheritance.
// Deinitializing the scene level unregisters both, child first.
//
// Other entry symbols:
// - `gdhost_test_extension_init_fail`: reports failure.
// - `gdhost_test_extension_child_init`: registers `Bar : Foo` (rejected:
//   `Foo` belongs to another extension) and `Baz : Object`.
//
// `live_instances()` counts `Foo` instances not yet freed, so tests can
// check allocation balance.
//
// **Critical constraint:** nothing here may panic; every callback is
// `extern "C"`.

use std::ffi::{c_char, c_void};
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use gdhost_sys::{
    self as sys, ClassInstancePtr, ClassLibraryPtr, ConstTypePtr, ConstVariantPtr,
    ExtensionClassCreationInfo, ExtensionClassMethodInfo, GdBool, GdInt, Initialization,
    InitializationLevel, NativeInterface, ObjectPtr, PropertyInfo, TypePtr, VariantPtr,
};

pub const ENTRY_SYMBOL: &str = "gdhost_test_extension_init";

static INTERFACE: AtomicPtr<NativeInterface> = AtomicPtr::new(ptr::null_mut());
static LIVE_INSTANCES: AtomicUsize = AtomicUsize::new(0);

fn interface() -> Option<&'static NativeInterface> {
    unsafe { INTERFACE.load(Ordering::Acquire).as_ref() }
}

/// `Foo` / `FooChild` instances created and not yet freed.
pub fn live_instances() -> usize {
    LIVE_INSTANCES.load(Ordering::Acquire)
}

// ---------------------------------------------------------------------------
// Variant marshaling through the interface
// ---------------------------------------------------------------------------

unsafe fn int_to_variant(dst: VariantPtr, value: i64) {
    let Some(get) = interface().and_then(|i| i.get_variant_from_type_constructor) else {
        return;
    };
    if let Some(ctor) = unsafe { get(sys::VARIANT_TYPE_INT) } {
        unsafe { ctor(dst, ptr::from_ref(&value).cast()) };
    }
}

/// `None` unless `src` holds an int.
unsafe fn variant_to_int(src: ConstVariantPtr) -> Option<i64> {
    let iface = interface()?;
    if unsafe { (iface.variant_get_type?)(src) } != sys::VARIANT_TYPE_INT {
        return None;
    }
    let ctor = unsafe { (iface.get_variant_to_type_constructor?)(sys::VARIANT_TYPE_INT) }?;
    let mut out: i64 = 0;
    unsafe { ctor(ptr::from_mut(&mut out).cast(), src) };
    Some(out)
}

unsafe fn set_error(r_error: *mut sys::CallError, error: sys::CallError) {
    if !r_error.is_null() {
        unsafe { *r_error = error };
    }
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

pub struct FooInstance {
    pub object: ObjectPtr,
    pub value: i64,
}

unsafe fn foo<'a>(instance: ClassInstancePtr) -> Option<&'a mut FooInstance> {
    unsafe { instance.cast::<FooInstance>().as_mut() }
}

/// `class_userdata` is the NUL-terminated class name.
unsafe extern "C" fn create_instance(userdata: *mut c_void) -> ObjectPtr {
    let Some(iface) = interface() else {
        return ptr::null_mut();
    };
    let (Some(construct), Some(set_instance)) =
        (iface.classdb_construct_object, iface.object_set_instance)
    else {
        return ptr::null_mut();
    };
    let object = unsafe { construct(c"Object".as_ptr()) };
    if object.is_null() {
        return object;
    }
    let instance = Box::into_raw(Box::new(FooInstance { object, value: 0 }));
    LIVE_INSTANCES.fetch_add(1, Ordering::AcqRel);
    unsafe { set_instance(object, userdata.cast::<c_char>(), instance.cast()) };
    object
}

unsafe extern "C" fn free_instance(_userdata: *mut c_void, instance: ClassInstancePtr) {
    if instance.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(instance.cast::<FooInstance>()) });
    LIVE_INSTANCES.fetch_sub(1, Ordering::AcqRel);
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

unsafe extern "C" fn get_value_call(
    _userdata: *mut c_void,
    instance: ClassInstancePtr,
    _args: *const ConstVariantPtr,
    _count: GdInt,
    r_return: VariantPtr,
    r_error: *mut sys::CallError,
) {
    let Some(foo) = (unsafe { foo(instance) }) else {
        unsafe {
            set_error(r_error, sys::CallError {
                error: sys::CALL_ERROR_INSTANCE_IS_NULL,
                argument: 0,
                expected: 0,
            })
        };
        return;
    };
    unsafe { int_to_variant(r_return, foo.value) };
}

unsafe extern "C" fn get_value_ptrcall(
    _userdata: *mut c_void,
    instance: ClassInstancePtr,
    _args: *const ConstTypePtr,
    r_return: TypePtr,
) {
    if let Some(foo) = unsafe { foo(instance) }
        && !r_return.is_null()
    {
        unsafe { *r_return.cast::<i64>() = foo.value };
    }
}

unsafe extern "C" fn set_value_call(
    _userdata: *mut c_void,
    instance: ClassInstancePtr,
    args: *const ConstVariantPtr,
    count: GdInt,
    _r_return: VariantPtr,
    r_error: *mut sys::CallError,
) {
    let Some(foo) = (unsafe { foo(instance) }) else {
        unsafe {
            set_error(r_error, sys::CallError {
                error: sys::CALL_ERROR_INSTANCE_IS_NULL,
                argument: 0,
                expected: 0,
            })
        };
        return;
    };
    if count < 1 || args.is_null() {
        unsafe {
            set_error(r_error, sys::CallError {
                error: sys::CALL_ERROR_TOO_FEW_ARGUMENTS,
                argument: 1,
                expected: 0,
            })
        };
        return;
    }
    match unsafe { variant_to_int(*args) } {
        Some(value) => foo.value = value,
        None => unsafe {
            set_error(r_error, sys::CallError {
                error: sys::CALL_ERROR_INVALID_ARGUMENT,
                argument: 0,
                expected: sys::VARIANT_TYPE_INT as i32,
            })
        },
    }
}

unsafe extern "C" fn set_value_ptrcall(
    _userdata: *mut c_void,
    instance: ClassInstancePtr,
    args: *const ConstTypePtr,
    _r_return: TypePtr,
) {
    if let Some(foo) = unsafe { foo(instance) }
        && !args.is_null()
    {
        foo.value = unsafe { *(*args).cast::<i64>() };
    }
}

unsafe extern "C" fn answer_call(
    _userdata: *mut c_void,
    instance: ClassInstancePtr,
    _args: *const ConstVariantPtr,
    _count: GdInt,
    r_return: VariantPtr,
    _r_error: *mut sys::CallError,
) {
    // Static: the engine passes no instance.
    let value = if instance.is_null() { 42 } else { -1 };
    unsafe { int_to_variant(r_return, value) };
}

unsafe extern "C" fn sum_call(
    _userdata: *mut c_void,
    _instance: ClassInstancePtr,
    args: *const ConstVariantPtr,
    count: GdInt,
    r_return: VariantPtr,
    r_error: *mut sys::CallError,
) {
    let mut total: i64 = 0;
    for i in 0..usize::try_from(count).unwrap_or(0) {
        match unsafe { variant_to_int(*args.add(i)) } {
            Some(v) => total = total.wrapping_add(v),
            None => {
                unsafe {
                    set_error(r_error, sys::CallError {
                        error: sys::CALL_ERROR_INVALID_ARGUMENT,
                        argument: i as i32,
                        expected: sys::VARIANT_TYPE_INT as i32,
                    })
                };
                return;
            }
        }
    }
    unsafe { int_to_variant(r_return, total) };
}

unsafe extern "C" fn int_return(_userdata: *mut c_void, _argument: i32) -> sys::VariantType {
    sys::VARIANT_TYPE_INT
}

unsafe extern "C" fn int_metadata(_userdata: *mut c_void, _argument: i32) -> sys::MethodArgumentMetadata {
    sys::METHOD_ARGUMENT_METADATA_INT_IS_INT64
}

/// `set_value(int)`: argument 0 is int, no return.
unsafe extern "C" fn set_value_types(_userdata: *mut c_void, argument: i32) -> sys::VariantType {
    if argument == 0 {
        sys::VARIANT_TYPE_INT
    } else {
        sys::VARIANT_TYPE_NIL
    }
}

fn method(name: &'static std::ffi::CStr) -> ExtensionClassMethodInfo {
    ExtensionClassMethodInfo {
        name: name.as_ptr(),
        method_userdata: ptr::null_mut(),
        call_func: None,
        ptrcall_func: None,
        method_flags: sys::METHOD_FLAGS_DEFAULT,
        argument_count: 0,
        has_return_value: 0,
        get_argument_type_func: None,
        get_argument_info_func: None,
        get_argument_metadata_func: None,
        default_argument_count: 0,
        default_arguments: ptr::null(),
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

fn class_info(name: &'static std::ffi::CStr) -> ExtensionClassCreationInfo {
    ExtensionClassCreationInfo {
        is_virtual: 0,
        is_abstract: 0,
        set_func: None,
        get_func: None,
        get_property_list_func: None,
        free_property_list_func: None,
        property_can_revert_func: None,
        property_get_revert_func: None,
        notification_func: None,
        to_string_func: None,
        reference_func: None,
        unreference_func: None,
        create_instance_func: Some(create_instance),
        free_instance_func: Some(free_instance),
        get_virtual_func: None,
        get_rid_func: None,
        class_userdata: name.as_ptr().cast_mut().cast(),
    }
}

unsafe fn register_foo(iface: &NativeInterface, library: ClassLibraryPtr) -> Option<()> {
    let register_class = iface.classdb_register_extension_class?;
    let register_method = iface.classdb_register_extension_class_method?;
    let register_constant = iface.classdb_register_extension_class_integer_constant?;
    let register_property = iface.classdb_register_extension_class_property?;
    let register_group = iface.classdb_register_extension_class_property_group?;
    let register_signal = iface.classdb_register_extension_class_signal?;

    unsafe {
        register_class(library, c"Foo".as_ptr(), c"Object".as_ptr(), &class_info(c"Foo"));

        let get_value = ExtensionClassMethodInfo {
            call_func: Some(get_value_call),
            ptrcall_func: Some(get_value_ptrcall),
            method_flags: sys::METHOD_FLAGS_DEFAULT | sys::METHOD_FLAG_CONST,
            has_return_value: 1,
            get_argument_type_func: Some(int_return),
            get_argument_metadata_func: Some(int_metadata),
            ..method(c"get_value")
        };
        register_method(library, c"Foo".as_ptr(), &get_value);

        let set_value = ExtensionClassMethodInfo {
            call_func: Some(set_value_call),
            ptrcall_func: Some(set_value_ptrcall),
            argument_count: 1,
            get_argument_type_func: Some(set_value_types),
            get_argument_metadata_func: Some(int_metadata),
            ..method(c"set_value")
        };
        register_method(library, c"Foo".as_ptr(), &set_value);

        let answer = ExtensionClassMethodInfo {
            call_func: Some(answer_call),
            method_flags: sys::METHOD_FLAGS_DEFAULT | sys::METHOD_FLAG_STATIC,
            has_return_value: 1,
            get_argument_type_func: Some(int_return),
            ..method(c"answer")
        };
        register_method(library, c"Foo".as_ptr(), &answer);

        let sum = ExtensionClassMethodInfo {
            call_func: Some(sum_call),
            method_flags: sys::METHOD_FLAGS_DEFAULT | sys::METHOD_FLAG_VARARG,
            has_return_value: 1,
            get_argument_type_func: Some(int_return),
            ..method(c"sum")
        };
        register_method(library, c"Foo".as_ptr(), &sum);

        register_constant(library, c"Foo".as_ptr(), c"Mode".as_ptr(), c"MODE_IDLE".as_ptr(), 0, 0);
        register_constant(library, c"Foo".as_ptr(), c"Mode".as_ptr(), c"MODE_BUSY".as_ptr(), 1, 0);

        register_group(library, c"Foo".as_ptr(), c"Stats".as_ptr(), c"".as_ptr());
        let value = PropertyInfo {
            type_: sys::VARIANT_TYPE_INT,
            name: c"value".as_ptr(),
            class_name: ptr::null(),
            hint: sys::PROPERTY_HINT_NONE,
            hint_string: ptr::null(),
            usage: sys::PROPERTY_USAGE_DEFAULT,
        };
        register_property(
            library,
            c"Foo".as_ptr(),
            &value,
            c"set_value".as_ptr(),
            c"get_value".as_ptr(),
        );

        let new_value = PropertyInfo {
            name: c"new_value".as_ptr(),
            ..value
        };
        register_signal(library, c"Foo".as_ptr(), c"value_changed".as_ptr(), &new_value, 1);

        register_class(library, c"FooChild".as_ptr(), c"Foo".as_ptr(), &class_info(c"FooChild"));
    }
    Some(())
}

unsafe extern "C" fn initialize(userdata: *mut c_void, level: InitializationLevel) {
    if level != sys::INITIALIZATION_SCENE {
        return;
    }
    if let Some(iface) = interface() {
        unsafe { register_foo(iface, userdata) };
    }
}

unsafe extern "C" fn deinitialize(userdata: *mut c_void, level: InitializationLevel) {
    if level != sys::INITIALIZATION_SCENE {
        return;
    }
    if let Some(unregister) = interface().and_then(|i| i.classdb_unregister_extension_class) {
        unsafe {
            unregister(userdata, c"FooChild".as_ptr());
            unregister(userdata, c"Foo".as_ptr());
        }
    }
}

unsafe fn accept(
    interface: *const NativeInterface,
    library: ClassLibraryPtr,
    r_initialization: *mut Initialization,
    initialize: unsafe extern "C" fn(*mut c_void, InitializationLevel),
    deinitialize: unsafe extern "C" fn(*mut c_void, InitializationLevel),
) -> GdBool {
    let Some(table) = (unsafe { interface.as_ref() }) else {
        return 0;
    };
    if table.version_major != sys::VERSION_MAJOR || r_initialization.is_null() {
        return 0;
    }
    INTERFACE.store(interface.cast_mut(), Ordering::Release);
    unsafe {
        r_initialization.write(Initialization {
            minimum_initialization_level: sys::INITIALIZATION_SCENE,
            userdata: library,
            initialize: Some(initialize),
            deinitialize: Some(deinitialize),
        })
    };
    1
}

/// Main entry symbol.
///
/// # Safety
/// Called by the engine with a valid interface table and output record.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gdhost_test_extension_init(
    interface: *const NativeInterface,
    library: ClassLibraryPtr,
    r_initialization: *mut Initialization,
) -> GdBool {
    unsafe { accept(interface, library, r_initialization, initialize, deinitialize) }
}

/// Entry symbol that always refuses to load.
///
/// # Safety
/// Same contract as `gdhost_test_extension_init`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gdhost_test_extension_init_fail(
    _interface: *const NativeInterface,
    _library: ClassLibraryPtr,
    _r_initialization: *mut Initialization,
) -> GdBool {
    0
}

/// Entry symbol that registers `Leaky` from inside the call, then refuses.
///
/// # Safety
/// Same contract as `gdhost_test_extension_init`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gdhost_test_extension_init_register_then_fail(
    interface: *const NativeInterface,
    library: ClassLibraryPtr,
    _r_initialization: *mut Initialization,
) -> GdBool {
    if let Some(register) = unsafe { interface.as_ref() }.and_then(|i| i.classdb_register_extension_class) {
        unsafe { register(library, c"Leaky".as_ptr(), c"Object".as_ptr(), &class_info(c"Leaky")) };
    }
    0
}

unsafe extern "C" fn child_initialize(userdata: *mut c_void, level: InitializationLevel) {
    if level != sys::INITIALIZATION_SCENE {
        return;
    }
    if let Some(register) = interface().and_then(|i| i.classdb_register_extension_class) {
        unsafe {
            register(userdata, c"Bar".as_ptr(), c"Foo".as_ptr(), &class_info(c"Bar"));
            register(userdata, c"Baz".as_ptr(), c"Object".as_ptr(), &class_info(c"Baz"));
        }
    }
}

unsafe extern "C" fn child_deinitialize(userdata: *mut c_void, level: InitializationLevel) {
    if level != sys::INITIALIZATION_SCENE {
        return;
    }
    if let Some(unregister) = interface().and_then(|i| i.classdb_unregister_extension_class) {
        unsafe { unregister(userdata, c"Baz".as_ptr()) };
    }
}

/// Second extension: tries to inherit a class of the first one.
///
/// # Safety
/// Same contract as `gdhost_test_extension_init`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gdhost_test_extension_child_init(
    interface: *const NativeInterface,
    library: ClassLibraryPtr,
    r_initialization: *mut Initialization,
) -> GdBool {
    unsafe {
        accept(
            interface,
            library,
            r_initialization,
            child_initialize,
            child_deinitialize,
        )
    }
}
