// Registry behavior seen from the extension side of the table: library
// paths, class tags and casts for extension classes, and instance bindings
// on extension objects.

use std::ffi::c_void;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gdhost_core::GString;
use gdhost_extension::{NativeExtension, native_interface};
use gdhost_sys as sys;
use parking_lot::Mutex;

static SERIAL: Mutex<()> = Mutex::new(());

fn open_sample(label: &str) -> Arc<NativeExtension> {
    let extension = NativeExtension::new();
    unsafe { extension.open_static(gdhost_test_extension::gdhost_test_extension_init, label) }
        .unwrap();
    for level in sys::INITIALIZATION_CORE..=sys::INITIALIZATION_SCENE {
        extension.initialize_library(level).unwrap();
    }
    extension
}

#[test]
fn library_path_is_reported_through_the_table() {
    let _guard = SERIAL.lock();
    let extension = open_sample("static/sample");
    let get_path = native_interface().get_library_path.unwrap();

    let mut out = MaybeUninit::<GString>::uninit();
    unsafe { get_path(extension.handle(), out.as_mut_ptr().cast()) };
    let path = unsafe { out.assume_init() };
    assert_eq!(path.to_string(), "static/sample");

    // An unknown handle writes an empty string.
    let mut out = MaybeUninit::<GString>::uninit();
    unsafe { get_path(ptr::null_mut(), out.as_mut_ptr().cast()) };
    assert!(unsafe { out.assume_init() }.to_string().is_empty());

    extension.close_library().unwrap();
}

#[test]
fn extension_classes_have_tags_and_cast() {
    let _guard = SERIAL.lock();
    let extension = open_sample("tags");
    let table = native_interface();
    let tag_of = table.classdb_get_class_tag.unwrap();
    let cast_to = table.object_cast_to.unwrap();
    let construct = table.classdb_construct_object.unwrap();
    let destroy = table.object_destroy.unwrap();

    let foo_tag = unsafe { tag_of(c"Foo".as_ptr()) };
    let child_tag = unsafe { tag_of(c"FooChild".as_ptr()) };
    let object_tag = unsafe { tag_of(c"Object".as_ptr()) };
    assert!(!foo_tag.is_null() && !child_tag.is_null());
    assert_ne!(foo_tag, child_tag);

    let foo = unsafe { construct(c"Foo".as_ptr()) };
    assert_eq!(unsafe { cast_to(foo, object_tag) }, foo);
    assert_eq!(unsafe { cast_to(foo, foo_tag) }, foo);
    assert!(unsafe { cast_to(foo, child_tag) }.is_null());

    let child = unsafe { construct(c"FooChild".as_ptr()) };
    assert_eq!(unsafe { cast_to(child, foo_tag) }, child);

    unsafe {
        destroy(foo);
        destroy(child);
    }
    for level in (sys::INITIALIZATION_CORE..=sys::INITIALIZATION_SCENE).rev() {
        extension.deinitialize_library(level).unwrap();
    }
    assert!(unsafe { tag_of(c"Foo".as_ptr()) }.is_null());
    extension.close_library().unwrap();
}

static BINDINGS_FREED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn create_binding(_token: *mut c_void, instance: *mut c_void) -> *mut c_void {
    instance
}

unsafe extern "C" fn free_binding(
    _token: *mut c_void,
    _instance: *mut c_void,
    _binding: *mut c_void,
) {
    BINDINGS_FREED.fetch_add(1, Ordering::AcqRel);
}

#[test]
fn instance_bindings_are_created_once_and_freed_with_the_object() {
    let _guard = SERIAL.lock();
    let extension = open_sample("bindings");
    let table = native_interface();
    let construct = table.classdb_construct_object.unwrap();
    let get_binding = table.object_get_instance_binding.unwrap();
    let destroy = table.object_destroy.unwrap();

    let callbacks = sys::InstanceBindingCallbacks {
        create_callback: Some(create_binding),
        free_callback: Some(free_binding),
        reference_callback: None,
    };
    let token = ptr::from_ref(&callbacks).cast_mut().cast();
    let foo = unsafe { construct(c"Foo".as_ptr()) };
    let first = unsafe { get_binding(foo, token, &callbacks) };
    let second = unsafe { get_binding(foo, token, &callbacks) };
    assert_eq!(first, foo);
    assert_eq!(first, second);

    let freed = BINDINGS_FREED.load(Ordering::Acquire);
    unsafe { destroy(foo) };
    assert_eq!(BINDINGS_FREED.load(Ordering::Acquire), freed + 1);
    extension.close_library().unwrap();
}
