// Loading the sample extension as a real shared library through a
// `.gdextension` manifest.
//
// Cargo builds `gdhost_test_extension`'s cdylib next to the test binary.
// When it is not there (e.g. a build that skipped cdylib outputs) the tests
// print a note and return instead of failing.

use std::path::{Path, PathBuf};

use gdhost_core::{StringName, Variant, class_db, object};
use gdhost_extension::{ExtensionLoadError, ExtensionManager, HostConfig, config::LevelName};
use integration_tests::{serial, set_value_hash};

fn library_file_name() -> String {
    format!(
        "{}gdhost_test_extension{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

fn sample_library() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    let name = library_file_name();
    [deps.join(&name), deps.parent()?.join(&name)]
        .into_iter()
        .find(|p| p.is_file())
}

fn write_manifest(dir: &Path, library: &Path, entry: &str) -> PathBuf {
    let key = format!("{}.{}", std::env::consts::OS, std::env::consts::ARCH);
    let text = format!(
        "[configuration]\n\
         entry_symbol = \"{entry}\"\n\
         compatibility_minimum = \"{}.{}\"\n\
         \n\
         [libraries]\n\
         {key} = \"{}\"\n",
        gdhost_sys::VERSION_MAJOR,
        gdhost_sys::VERSION_MINOR,
        library.display()
    );
    let path = dir.join("sample.gdextension");
    std::fs::write(&path, text).expect("write manifest");
    path
}

fn scene_config() -> HostConfig {
    HostConfig {
        initialization_level: LevelName::Scene,
        ..HostConfig::default()
    }
}

#[test]
fn manifest_loads_library_and_registers_classes() {
    let Some(library) = sample_library() else {
        eprintln!("skipping: {} not built", library_file_name());
        return;
    };
    let _guard = serial();
    let dir = tempfile::tempdir().expect("create scratch dir");
    let manifest = write_manifest(dir.path(), &library, gdhost_test_extension::ENTRY_SYMBOL);

    let mut manager = ExtensionManager::new(scene_config());
    let extension = manager.load_extension(&manifest).expect("load extension");
    assert!(extension.is_library_open());
    assert!(manager.is_extension_loaded(&manifest));
    manager.initialize_all();
    assert!(class_db::class_exists(&StringName::new("Foo")));

    // The dynamically loaded copy has its own statics; only engine-side
    // state is observable from here.
    let objects_before = object::live_count();
    let foo = class_db::instantiate(&StringName::new("Foo")).expect("instantiate");
    foo.call(&StringName::new("set_value"), &[&Variant::Int(-1)])
        .expect("set_value");
    assert_eq!(
        foo.call(&StringName::new("get_value"), &[]).expect("get_value"),
        Variant::Int(-1)
    );
    let bind = class_db::get_method(&StringName::new("Foo"), &StringName::new("set_value"))
        .expect("set_value bind");
    assert_eq!(bind.hash(), set_value_hash());
    object::destroy(foo.id());
    assert_eq!(object::live_count(), objects_before);

    manager.deinitialize_all();
    manager.unload_extension(&manifest).expect("unload");
    assert!(!class_db::class_exists(&StringName::new("Foo")));
    assert!(!extension.is_library_open());
}

#[test]
fn missing_entry_symbol_is_a_load_error() {
    let Some(library) = sample_library() else {
        eprintln!("skipping: {} not built", library_file_name());
        return;
    };
    let _guard = serial();
    let dir = tempfile::tempdir().expect("create scratch dir");
    let manifest = write_manifest(dir.path(), &library, "no_such_entry_symbol");

    let mut manager = ExtensionManager::new(scene_config());
    let result = manager.load_extension(&manifest);
    assert!(matches!(result, Err(ExtensionLoadError::Open { .. })));
    assert!(!manager.is_extension_loaded(&manifest));
}

#[test]
fn loading_the_same_manifest_twice_is_refused() {
    let Some(library) = sample_library() else {
        eprintln!("skipping: {} not built", library_file_name());
        return;
    };
    let _guard = serial();
    let dir = tempfile::tempdir().expect("create scratch dir");
    let manifest = write_manifest(dir.path(), &library, gdhost_test_extension::ENTRY_SYMBOL);

    let mut manager = ExtensionManager::new(scene_config());
    manager.load_extension(&manifest).expect("first load");
    assert!(matches!(
        manager.load_extension(&manifest),
        Err(ExtensionLoadError::AlreadyLoaded(_))
    ));
    manager.unload_extension(&manifest).expect("unload");
}
