// Host configuration.
//
// `HostConfig` is loaded from JSON at startup (`gdhost --config host.json`)
// or built from defaults. Every field is optional in the file. It controls
// which feature tags select a library out of an extension manifest, where
// `res://` paths point, which manifests are loaded at startup and how far
// the manager walks the initialization levels.
//
// Feature tags always include the platform name (`std::env::consts::OS`),
// the architecture (`x86_64`, `aarch64`, ...), the pointer width (`64` or
// `32`) and `debug` or `release`. The `features` list adds to them.

use std::path::{Path, PathBuf};

use gdhost_sys::InitializationLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Initialization levels by name, as written in the config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelName {
    Core,
    Servers,
    Scene,
    #[default]
    Editor,
}

impl LevelName {
    pub fn level(self) -> InitializationLevel {
        match self {
            LevelName::Core => gdhost_sys::INITIALIZATION_CORE,
            LevelName::Servers => gdhost_sys::INITIALIZATION_SERVERS,
            LevelName::Scene => gdhost_sys::INITIALIZATION_SCENE,
            LevelName::Editor => gdhost_sys::INITIALIZATION_EDITOR,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Feature tags added to the built-in ones.
    pub features: Vec<String>,
    /// Directory `res://` resolves to.
    pub project_root: PathBuf,
    /// File listing one manifest path per line, loaded at startup.
    pub extension_list: Option<PathBuf>,
    /// Highest level the manager initializes extensions to.
    pub initialization_level: LevelName,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            project_root: PathBuf::from("."),
            extension_list: None,
            initialization_level: LevelName::default(),
        }
    }
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HostConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded host config from {}", path.display());
        Ok(config)
    }

    /// Every feature tag this host satisfies.
    pub fn feature_tags(&self) -> Vec<String> {
        let mut tags = default_feature_tags();
        for extra in &self.features {
            if !tags.contains(extra) {
                tags.push(extra.clone());
            }
        }
        tags
    }

    pub fn has_feature(&self, tag: &str) -> bool {
        self.feature_tags().iter().any(|t| t == tag)
    }
}

pub fn default_feature_tags() -> Vec<String> {
    let build = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    vec![
        std::env::consts::OS.to_owned(),
        std::env::consts::ARCH.to_owned(),
        (usize::BITS).to_string(),
        build.to_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: HostConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.initialization_level.level(), gdhost_sys::INITIALIZATION_EDITOR);
    }

    #[test]
    fn config_loads_from_json_string() {
        let json = r#"{
            "features": ["demo"],
            "project_root": "/srv/project",
            "extension_list": "/srv/project/.godot/extension_list.cfg",
            "initialization_level": "scene"
        }"#;
        let config: HostConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.project_root, PathBuf::from("/srv/project"));
        assert_eq!(config.initialization_level, LevelName::Scene);
        assert!(config.has_feature("demo"));
        assert!(config.has_feature(std::env::consts::OS));
    }

    #[test]
    fn built_in_tags_cover_platform_and_build() {
        let tags = default_feature_tags();
        assert!(tags.contains(&"64".to_owned()) || tags.contains(&"32".to_owned()));
        assert!(tags.iter().any(|t| t == "debug" || t == "release"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = HostConfig::load(Path::new("/nonexistent/host.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
