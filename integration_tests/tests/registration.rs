// Class registration and extension lifecycle, driven by the sample
// extension's entry symbols.
//
// Covers what the extension registers at the scene level (methods,
// constants, enums, property groups, properties, signals), same-extension
// inheritance and its unregister ordering, the rejection of a parent that
// belongs to another extension, failing entry symbols, level ordering, and
// what closing a library leaves behind.

use gdhost_core::class_db::{self, ClassApi};
use gdhost_core::{StringName, VariantType, diag};
use gdhost_extension::{ExtensionError, ExtensionManager, HostConfig, NativeExtension};
use gdhost_sys as sys;
use integration_tests::{SampleHost, construct, destroy, serial};

fn name(s: &str) -> StringName {
    StringName::new(s)
}

#[test]
fn scene_level_registers_foo_and_child() {
    let _guard = serial();
    assert!(!class_db::class_exists(&name("Foo")));

    let host = SampleHost::start();
    let foo = class_db::class_info(&name("Foo")).expect("Foo registered");
    assert_eq!(foo.api, ClassApi::Extension);
    assert_eq!(foo.parent, Some(name("Object")));
    assert_eq!(foo.library.get(), host.extension.handle());
    assert!(foo.instantiable);
    for method in ["get_value", "set_value", "answer", "sum"] {
        assert!(foo.methods.contains_key(&name(method)), "missing {method}");
    }

    assert_eq!(foo.constants.get(&name("MODE_IDLE")), Some(&0));
    assert_eq!(foo.constants.get(&name("MODE_BUSY")), Some(&1));
    let mode = foo.enums.get(&name("Mode")).expect("Mode enum");
    assert_eq!(mode.constants, vec![name("MODE_IDLE"), name("MODE_BUSY")]);
    assert!(!mode.bitfield);

    assert_eq!(foo.groups.len(), 1);
    assert_eq!(foo.groups[0].name, "Stats");
    let value = foo.properties.get(&name("value")).expect("value property");
    assert_eq!(value.desc.ty, VariantType::Int);
    assert_eq!(value.setter, name("set_value"));
    assert_eq!(value.getter, name("get_value"));

    let signal = foo.signals.get(&name("value_changed")).expect("value_changed");
    assert_eq!(signal.len(), 1);
    assert_eq!(signal[0].name, name("new_value"));

    assert_eq!(class_db::parent_class(&name("FooChild")), Some(name("Foo")));
    let child = host.extension.class(&name("FooChild")).expect("FooChild record");
    assert_eq!(child.parent, Some(name("Foo")));
    let parent = host.extension.class(&name("Foo")).expect("Foo record");
    assert_eq!(parent.children, vec![name("FooChild")]);
    assert_eq!(host.extension.class_names(), vec![name("Foo"), name("FooChild")]);
}

#[test]
fn scene_deinitialization_unregisters_child_first() {
    let _guard = serial();
    let host = SampleHost::start();
    host.deinitialize();
    assert!(!class_db::class_exists(&name("FooChild")));
    assert!(!class_db::class_exists(&name("Foo")));
    assert!(host.extension.class_names().is_empty());
    assert_eq!(host.extension.initialization_level(), -1);
}

#[test]
fn parent_with_children_cannot_be_unregistered() {
    let _guard = serial();
    let host = SampleHost::start();
    let result = host.extension.unregister_class(&name("Foo"));
    assert!(matches!(result, Err(ExtensionError::ChildrenExist(ref c)) if *c == name("Foo")));
    assert!(class_db::class_exists(&name("Foo")));

    host.extension
        .unregister_class(&name("FooChild"))
        .expect("unregister FooChild");
    host.extension
        .unregister_class(&name("Foo"))
        .expect("unregister Foo");
    assert!(!class_db::class_exists(&name("Foo")));
}

#[test]
fn inheriting_another_extensions_class_is_rejected() {
    let _guard = serial();
    let _host = SampleHost::start();

    let second = NativeExtension::new();
    unsafe { second.open_static(gdhost_test_extension::gdhost_test_extension_child_init, "second") }
        .expect("open second extension");
    let mut outcome = Ok(());
    let ((), reports) = diag::capture(|| {
        for level in sys::INITIALIZATION_CORE..=sys::INITIALIZATION_SCENE {
            if let Err(e) = second.initialize_library(level) {
                outcome = Err(e);
            }
        }
    });
    assert!(outcome.is_ok());

    // Bar : Foo was refused, with one report naming the restriction.
    assert!(!class_db::class_exists(&name("Bar")));
    assert_eq!(reports.len(), 1);
    assert!(
        reports[0]
            .message
            .contains("inheriting from another extension class is unsupported")
    );

    // The same extension's other class still registered.
    assert_eq!(class_db::parent_class(&name("Baz")), Some(name("Object")));
    assert_eq!(second.class_names(), vec![name("Baz")]);

    second.close_library().expect("close second");
    assert!(!class_db::class_exists(&name("Baz")));
    assert!(class_db::class_exists(&name("Foo")));
}

#[test]
fn direct_cross_extension_registration_returns_an_error() {
    let _guard = serial();
    let host = SampleHost::start();
    let info = host.extension.class(&name("Foo")).expect("Foo").vtable.info;

    let other = NativeExtension::new();
    unsafe { other.open_static(gdhost_test_extension::gdhost_test_extension_child_init, "other") }
        .expect("open other");
    let result = other.register_class(name("Qux"), name("Foo"), &info);
    assert!(matches!(result, Err(ExtensionError::CrossExtensionParent { .. })));

    let result = other.register_class(name("Qux"), name("NoSuchClass"), &info);
    assert!(matches!(result, Err(ExtensionError::ParentNotFound { .. })));

    let result = other.register_class(name("Foo"), name("Object"), &info);
    assert!(matches!(result, Err(ExtensionError::ClassExists(_))));

    let result = other.register_class(name("not a name"), name("Object"), &info);
    assert!(matches!(result, Err(ExtensionError::InvalidClassName(_))));
    other.close_library().expect("close other");
}

#[test]
fn failing_entry_symbol_leaves_nothing_open() {
    let _guard = serial();
    let extension = NativeExtension::new();
    let result =
        unsafe { extension.open_static(gdhost_test_extension::gdhost_test_extension_init_fail, "fail") };
    assert!(matches!(result, Err(ExtensionError::InitializationFailed(_))));
    assert!(!extension.is_library_open());
    assert!(extension.library_path().is_none());
    assert!(matches!(
        extension.initialize_library(sys::INITIALIZATION_CORE),
        Err(ExtensionError::NotOpen)
    ));
    assert!(NativeExtension::from_handle(extension.handle()).is_none());
}

#[test]
fn failing_entry_symbol_unregisters_what_it_registered() {
    let _guard = serial();
    let extension = NativeExtension::new();
    let result = unsafe {
        extension.open_static(
            gdhost_test_extension::gdhost_test_extension_init_register_then_fail,
            "leaky",
        )
    };
    assert!(matches!(result, Err(ExtensionError::InitializationFailed(_))));
    assert!(!class_db::class_exists(&name("Leaky")));
    assert!(extension.class_names().is_empty());
    drop(extension);
    assert!(!class_db::class_exists(&name("Leaky")));
}

#[test]
fn levels_must_ascend_and_descend_in_order() {
    let _guard = serial();
    let host = SampleHost::start();
    let extension = &host.extension;
    assert_eq!(extension.initialization_level(), sys::INITIALIZATION_SCENE as i32);
    assert_eq!(extension.minimum_initialization_level(), sys::INITIALIZATION_SCENE);

    assert!(matches!(
        extension.initialize_library(sys::INITIALIZATION_SERVERS),
        Err(ExtensionError::LevelNotAscending { .. })
    ));
    assert!(matches!(
        extension.initialize_library(sys::INITIALIZATION_MAX),
        Err(ExtensionError::InvalidLevel(_))
    ));
    assert!(matches!(
        extension.deinitialize_library(sys::INITIALIZATION_EDITOR),
        Err(ExtensionError::LevelAboveCurrent { .. })
    ));
    assert!(matches!(
        unsafe { extension.open_static(gdhost_test_extension::gdhost_test_extension_init, "again") },
        Err(ExtensionError::AlreadyOpen)
    ));
}

#[test]
fn closing_unregisters_remaining_classes() {
    let _guard = serial();
    let host = SampleHost::start();
    let foo = construct(c"Foo");
    destroy(foo);

    host.extension.close_library().expect("close");
    assert!(!host.extension.is_library_open());
    assert!(!class_db::class_exists(&name("Foo")));
    assert!(!class_db::class_exists(&name("FooChild")));
    assert!(matches!(host.extension.close_library(), Err(ExtensionError::NotOpen)));
}

#[test]
fn manager_catches_late_extensions_up_and_tears_down() {
    let _guard = serial();
    let mut manager = ExtensionManager::new(HostConfig::default());
    manager.initialize_extensions(sys::INITIALIZATION_CORE);
    manager.initialize_extensions(sys::INITIALIZATION_SERVERS);
    manager.initialize_extensions(sys::INITIALIZATION_SCENE);

    let extension = NativeExtension::new();
    unsafe { extension.open_static(gdhost_test_extension::gdhost_test_extension_init, "managed") }
        .expect("open");
    manager
        .add_extension("managed".as_ref(), extension.clone())
        .expect("add");
    assert!(class_db::class_exists(&name("Foo")));
    assert_eq!(extension.initialization_level(), sys::INITIALIZATION_SCENE as i32);

    manager.deinitialize_extensions(sys::INITIALIZATION_SCENE);
    assert!(!class_db::class_exists(&name("Foo")));

    manager
        .unload_extension("managed".as_ref())
        .expect("unload");
    assert!(!extension.is_library_open());
    assert!(manager.loaded_extensions().is_empty());
}
