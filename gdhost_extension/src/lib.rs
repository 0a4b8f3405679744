// gdhost_extension: the native extension boundary.
//
// Turns `gdhost_core` into something a foreign module can drive: the frozen
// `NativeInterface` function table, the registry that tracks what each
// extension registered, the manifest-driven loader and the manager that
// walks loaded extensions through the initialization levels. The `gdhost`
// binary (`main.rs`) is a thin CLI over these.
//
// Module overview:
// - `interface/`:     the `NativeInterface` table and its `extern "C"`
//                     entry points.
// - `extension.rs`:   `NativeExtension` lifecycle, class arena and the
//                     registration callbacks.
// - `method_bind.rs`: `ExtensionMethodBind`, methods backed by extension
//                     callbacks.
// - `manifest.rs`:    `.gdextension` parsing and library selection.
// - `loader.rs`:      manifest to opened `NativeExtension`.
// - `manager.rs`:     `ExtensionManager` load/unload and level transitions.
// - `config.rs`:      `HostConfig` and feature tags.
// - `api.rs`:         JSON description of the engine surface.
//
// **Critical constraint:** foreign code runs with no engine lock held. Each
// module copies what it needs out of its locks before calling an extension.

pub mod api;
pub mod config;
pub mod extension;
pub mod interface;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod method_bind;

pub use config::{ConfigError, HostConfig};
pub use extension::{ExtensionError, NativeExtension};
pub use interface::{InterfaceBuilder, native_interface};
pub use loader::ExtensionLoadError;
pub use manager::ExtensionManager;
pub use manifest::{ExtensionManifest, ManifestError};
