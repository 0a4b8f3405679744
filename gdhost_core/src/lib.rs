// gdhost_core: the engine side of the native extension boundary.
//
// This crate holds everything the C ABI exposes, as plain Rust: the tagged
// value and its builtin kinds, the containers, objects and the object
// database, the class database, and the diagnostics channel. It has no
// `extern "C"` entry points of its own apart from the ptrcall thunks in
// `variant::ptr`; the function table lives in `gdhost_extension`.
//
// Module overview:
// - `diag.rs`:         `err_print!` / `warn_print!` diagnostics and test capture.
// - `error.rs`:        `CallError` and its ABI flattening.
// - `hashing.rs`:      murmur3 / integer hash primitives.
// - `math.rs`:         Vector, Rect, Transform, Basis, Color, ... value types.
// - `types.rs`:        `InstanceId`, `Rid`, `ForeignPtr`.
// - `string.rs`:       `GString`, interned `StringName`, `NodePath`.
// - `callable.rs`:     `Callable` and `Signal`.
// - `packed.rs`:       copy-on-write packed arrays.
// - `array.rs`:        shared typed/read-only `Array`.
// - `dictionary.rs`:   shared insertion-ordered `Dictionary`.
// - `variant/`:        `Variant`, operators, conversion, builtin methods,
//                      ptrcall thunks, utility functions.
// - `object.rs`:       objects, the object database, singletons.
// - `class_db.rs`:     class database and method binds.
// - `core_classes.rs`: Object, RefCounted, Resource, Engine.
// - `rng.rs`:          PCG32 used by `Array::shuffle` / `pick_random`.
//
// **Critical constraint: no panics across the boundary.** Everything here is
// reachable from `extern "C"` code. Failures are reported through `diag` and
// returned as values; non-test code never unwraps.

#[macro_use]
pub mod diag;

pub mod array;
pub mod callable;
pub mod class_db;
pub mod core_classes;
pub mod dictionary;
pub mod error;
pub mod hashing;
pub mod math;
pub mod object;
pub mod packed;
pub mod rng;
pub mod string;
pub mod types;
pub mod variant;

pub use array::{Array, ArrayError, ContainerType};
pub use callable::{Callable, Signal};
pub use dictionary::Dictionary;
pub use error::CallError;
pub use string::{GString, NodePath, StringName};
pub use types::{ForeignPtr, InstanceId, Rid};
pub use variant::{Variant, VariantType};
