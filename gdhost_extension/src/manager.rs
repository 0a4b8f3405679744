// The extension manager: every loaded extension, walked through the
// initialization levels together.
//
// The manager tracks the highest level it has initialized to. Extensions
// loaded later catch up to that level immediately (skipping levels below
// their `minimum_initialization_level`); unloading walks an extension back
// down before closing it. Level transitions visit extensions in load order
// going up and in reverse load order going down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gdhost_sys::InitializationLevel;
use indexmap::IndexMap;

use crate::config::HostConfig;
use crate::extension::NativeExtension;
use crate::loader::{self, ExtensionLoadError};

pub struct ExtensionManager {
    config: HostConfig,
    extensions: IndexMap<PathBuf, Arc<NativeExtension>>,
    level: i32,
}

fn initialize_one(path: &Path, extension: &NativeExtension, level: InitializationLevel) {
    if level < extension.minimum_initialization_level() {
        return;
    }
    if let Err(e) = extension.initialize_library(level) {
        log::error!("{}: {e}", path.display());
    }
}

fn deinitialize_one(path: &Path, extension: &NativeExtension, level: InitializationLevel) {
    if level < extension.minimum_initialization_level()
        || (level as i32) > extension.initialization_level()
    {
        return;
    }
    if let Err(e) = extension.deinitialize_library(level) {
        log::error!("{}: {e}", path.display());
    }
}

impl ExtensionManager {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            extensions: IndexMap::new(),
            level: -1,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Highest level initialized so far; -1 before the first.
    pub fn initialization_level(&self) -> i32 {
        self.level
    }

    fn key(path: &Path) -> PathBuf {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }

    pub fn is_extension_loaded(&self, path: &Path) -> bool {
        self.extensions.contains_key(&Self::key(path))
    }

    pub fn loaded_extensions(&self) -> Vec<PathBuf> {
        self.extensions.keys().cloned().collect()
    }

    pub fn get_extension(&self, path: &Path) -> Option<Arc<NativeExtension>> {
        self.extensions.get(&Self::key(path)).cloned()
    }

    fn catch_up(&self, path: &Path, extension: &NativeExtension) {
        for level in 0..=self.level {
            initialize_one(path, extension, level as InitializationLevel);
        }
    }

    /// Load a manifest and bring the extension up to the current level.
    pub fn load_extension(&mut self, path: &Path) -> Result<Arc<NativeExtension>, ExtensionLoadError> {
        let key = Self::key(path);
        if self.extensions.contains_key(&key) {
            return Err(ExtensionLoadError::AlreadyLoaded(key));
        }
        let extension = loader::load(path, &self.config)?;
        self.catch_up(&key, &extension);
        log::info!("loaded extension {}", key.display());
        self.extensions.insert(key, Arc::clone(&extension));
        Ok(extension)
    }

    /// Adopt an extension opened some other way (e.g. `open_static`) under
    /// `label`.
    pub fn add_extension(
        &mut self,
        label: &Path,
        extension: Arc<NativeExtension>,
    ) -> Result<(), ExtensionLoadError> {
        let key = label.to_path_buf();
        if self.extensions.contains_key(&key) {
            return Err(ExtensionLoadError::AlreadyLoaded(key));
        }
        self.catch_up(&key, &extension);
        self.extensions.insert(key, extension);
        Ok(())
    }

    /// Deinitialize an extension down through its minimum level and close
    /// it.
    pub fn unload_extension(&mut self, path: &Path) -> Result<(), ExtensionLoadError> {
        let key = if self.extensions.contains_key(path) {
            path.to_path_buf()
        } else {
            Self::key(path)
        };
        let extension = self
            .extensions
            .shift_remove(&key)
            .ok_or_else(|| ExtensionLoadError::NotLoaded(key.clone()))?;
        for level in (0..=self.level).rev() {
            deinitialize_one(&key, &extension, level as InitializationLevel);
        }
        if let Err(e) = extension.close_library() {
            log::warn!("{}: {e}", key.display());
        }
        log::info!("unloaded extension {}", key.display());
        Ok(())
    }

    pub fn initialize_extensions(&mut self, level: InitializationLevel) {
        if level as i32 <= self.level {
            log::warn!("extensions are already initialized to level {}", self.level);
            return;
        }
        for (path, extension) in &self.extensions {
            initialize_one(path, extension, level);
        }
        self.level = level as i32;
    }

    pub fn deinitialize_extensions(&mut self, level: InitializationLevel) {
        if level as i32 > self.level {
            log::warn!("extensions are not initialized to level {level}");
            return;
        }
        for (path, extension) in self.extensions.iter().rev() {
            deinitialize_one(path, extension, level);
        }
        self.level = level as i32 - 1;
    }

    /// Initialize every level up to the configured one.
    pub fn initialize_all(&mut self) {
        let target = self.config.initialization_level.level() as i32;
        for level in (self.level + 1)..=target {
            self.initialize_extensions(level as InitializationLevel);
        }
    }

    /// Deinitialize every level, highest first.
    pub fn deinitialize_all(&mut self) {
        for level in (0..=self.level).rev() {
            self.deinitialize_extensions(level as InitializationLevel);
        }
    }

    /// Load every manifest listed in the configured `extension_list` file,
    /// one path per line. Failures are logged and skipped. Returns how many
    /// loaded.
    pub fn load_extension_list(&mut self) -> usize {
        let Some(list) = self.config.extension_list.clone() else {
            return 0;
        };
        let text = match std::fs::read_to_string(&list) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("cannot read extension list {}: {e}", list.display());
                return 0;
            }
        };
        let mut loaded = 0;
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let path = match line.strip_prefix("res://") {
                Some(rest) => self.config.project_root.join(rest),
                None => PathBuf::from(line),
            };
            match self.load_extension(&path) {
                Ok(_) => loaded += 1,
                Err(e) => log::error!("{e}"),
            }
        }
        loaded
    }
}

impl Drop for ExtensionManager {
    fn drop(&mut self) {
        self.deinitialize_all();
        let paths = self.loaded_extensions();
        for path in paths.iter().rev() {
            if let Err(e) = self.unload_extension(path) {
                log::warn!("{e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_track_without_extensions() {
        let mut manager = ExtensionManager::new(HostConfig::default());
        manager.initialize_all();
        assert_eq!(manager.initialization_level(), gdhost_sys::INITIALIZATION_EDITOR as i32);
        manager.deinitialize_extensions(gdhost_sys::INITIALIZATION_EDITOR);
        assert_eq!(manager.initialization_level(), gdhost_sys::INITIALIZATION_SCENE as i32);
        manager.deinitialize_all();
        assert_eq!(manager.initialization_level(), -1);
    }

    #[test]
    fn unknown_paths_are_not_loaded() {
        let mut manager = ExtensionManager::new(HostConfig::default());
        assert!(!manager.is_extension_loaded(Path::new("nothing.gdextension")));
        assert!(matches!(
            manager.unload_extension(Path::new("nothing.gdextension")),
            Err(ExtensionLoadError::NotLoaded(_))
        ));
    }

    #[test]
    fn extension_list_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("extension_list.cfg");
        std::fs::write(&list, "missing_a.gdextension\n\nmissing_b.gdextension\n").unwrap();
        let config = HostConfig {
            extension_list: Some(list),
            ..HostConfig::default()
        };
        let mut manager = ExtensionManager::new(config);
        assert_eq!(manager.load_extension_list(), 0);
        assert!(manager.loaded_extensions().is_empty());
    }
}
