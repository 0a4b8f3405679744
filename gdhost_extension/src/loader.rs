// Resource loader for extension manifests.
//
// Recognizes files with the `gdextension` extension and produces a
// `NativeExtension` resource: parse the manifest, require
// `configuration/entry_symbol`, pick the first library whose tags the host
// satisfies, resolve its path and open it. The opened extension is at level
// -1; initializing it is the manager's job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::HostConfig;
use crate::extension::{ExtensionError, NativeExtension};
use crate::manifest::{ExtensionManifest, ManifestError};

pub const RECOGNIZED_EXTENSIONS: &[&str] = &["gdextension"];
pub const RESOURCE_TYPE: &str = "NativeExtension";

#[derive(Debug, Error)]
pub enum ExtensionLoadError {
    #[error("cannot load manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("{path}: manifest must contain a \"configuration/entry_symbol\" key")]
    InvalidData { path: PathBuf },
    #[error("{path}: no library found for features [{features}]")]
    FileNotFound { path: PathBuf, features: String },
    #[error("{path}: requires engine {major}.{minor} or newer")]
    Incompatible { path: PathBuf, major: u32, minor: u32 },
    #[error("{path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: ExtensionError,
    },
    #[error("extension {0} is already loaded")]
    AlreadyLoaded(PathBuf),
    #[error("extension {0} is not loaded")]
    NotLoaded(PathBuf),
}

pub fn recognizes(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| RECOGNIZED_EXTENSIONS.iter().any(|r| r.eq_ignore_ascii_case(e)))
}

pub fn handles_type(type_name: &str) -> bool {
    type_name == RESOURCE_TYPE
}

/// `RESOURCE_TYPE` for recognized paths.
pub fn resource_type(path: &Path) -> Option<&'static str> {
    recognizes(path).then_some(RESOURCE_TYPE)
}

/// Library path a manifest selects for this host, resolved.
pub fn select_library(
    manifest: &ExtensionManifest,
    manifest_path: &Path,
    config: &HostConfig,
) -> Result<PathBuf, ExtensionLoadError> {
    let features = config.feature_tags();
    let library = manifest
        .library_for(&features)
        .ok_or_else(|| ExtensionLoadError::FileNotFound {
            path: manifest_path.to_path_buf(),
            features: features.join(", "),
        })?;
    Ok(manifest.resolve_path(library, &config.project_root))
}

pub fn load(manifest_path: &Path, config: &HostConfig) -> Result<Arc<NativeExtension>, ExtensionLoadError> {
    let manifest = ExtensionManifest::load(manifest_path)?;
    let entry_symbol = manifest
        .entry_symbol()
        .ok_or_else(|| ExtensionLoadError::InvalidData {
            path: manifest_path.to_path_buf(),
        })?;
    if let Some((major, minor)) = manifest.compatibility_minimum()
        && (major, minor) > (gdhost_sys::VERSION_MAJOR, gdhost_sys::VERSION_MINOR)
    {
        return Err(ExtensionLoadError::Incompatible {
            path: manifest_path.to_path_buf(),
            major,
            minor,
        });
    }
    let library = select_library(&manifest, manifest_path, config)?;
    log::debug!(
        "{} selects library {}",
        manifest_path.display(),
        library.display()
    );
    let extension = NativeExtension::new();
    extension
        .open_library(&library, entry_symbol)
        .map_err(|source| ExtensionLoadError::Open {
            path: manifest_path.to_path_buf(),
            source,
        })?;
    Ok(extension)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_manifest(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(format!("{name}.gdextension"));
        std::fs::write(&path, text).unwrap();
        path
    }

    fn load_err(path: &Path) -> ExtensionLoadError {
        match load(path, &HostConfig::default()) {
            Ok(extension) => panic!("expected a load error, got {extension:?}"),
            Err(e) => e,
        }
    }

    #[test]
    fn recognizes_manifest_files() {
        assert!(recognizes(Path::new("addons/demo.gdextension")));
        assert!(!recognizes(Path::new("addons/demo.tres")));
        assert_eq!(resource_type(Path::new("x.gdextension")), Some("NativeExtension"));
        assert!(handles_type("NativeExtension"));
    }

    #[test]
    fn missing_entry_symbol_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, "no_entry", "[configuration]\n[libraries]\nlinux = \"x.so\"\n");
        let err = load_err(&path);
        assert!(matches!(err, ExtensionLoadError::InvalidData { .. }));
    }

    #[test]
    fn no_matching_library_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            "no_match",
            "[configuration]\nentry_symbol = \"init\"\n[libraries]\nnot_a_platform.64 = \"x.so\"\n",
        );
        let err = load_err(&path);
        assert!(matches!(err, ExtensionLoadError::FileNotFound { .. }));
    }

    #[test]
    fn newer_engine_requirement_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            "too_new",
            "[configuration]\nentry_symbol = \"init\"\ncompatibility_minimum = 99.0\n",
        );
        let err = load_err(&path);
        assert!(matches!(err, ExtensionLoadError::Incompatible { major: 99, .. }));
    }

    #[test]
    fn unopenable_library_is_an_open_error() {
        let os = std::env::consts::OS;
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            "missing_lib",
            &format!("[configuration]\nentry_symbol = \"init\"\n[libraries]\n{os} = \"missing.so\"\n"),
        );
        let err = load_err(&path);
        assert!(matches!(
            err,
            ExtensionLoadError::Open {
                source: ExtensionError::LoadFailed { .. },
                ..
            }
        ));
    }
}
