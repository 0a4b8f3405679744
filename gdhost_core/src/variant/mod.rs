// The engine's tagged value.
//
// `Variant` is a closed enum over every builtin kind. Small math kinds are
// stored inline; the large matrix kinds are boxed so a Variant stays three
// words. Heap kinds hold `Arc` handles: String, StringName, NodePath,
// Callable and the packed arrays are copy-on-write values, while Array and
// Dictionary are shared reference handles (two Variants copied from one
// another see each other's mutations, exactly like the engine's containers).
//
// Module overview:
// - `mod.rs`:       `VariantType`, `Variant`, `From` conversions, accessors.
// - `compare.rs`:   hashing, `hash_compare`, recursive equality with the
//                   recursion guard, `PartialEq`.
// - `stringify.rs`: `stringify` (the `str()` text form).
// - `ops.rs`:       `Operator` and `evaluate`, the operator table.
// - `convert.rs`:   `can_convert`, `can_convert_strict`, `convert`.
// - `access.rs`:    get/set by key, name, bracket and index; iteration.
// - `construct.rs`: per-type constructor lists and type constants.
// - `methods.rs`:   builtin method table, dynamic `call`.
// - `utility.rs`:   global utility functions (`abs`, `clamp`, `str`, ...).
// - `native.rs`:    native (ptrcall) representation of each kind.
// - `ptr.rs`:       `extern "C"` ptrcall thunks and their lookups.
//
// **Critical constraint:** the numeric values of `VariantType` are ABI. They
// must match the `VARIANT_TYPE_*` constants in `gdhost_sys`.

mod access;
mod compare;
mod construct;
mod convert;
mod methods;
pub mod native;
mod ops;
pub mod ptr;
mod stringify;
mod utility;

use std::fmt;

use crate::array::Array;
use crate::callable::{Callable, Signal};
use crate::dictionary::Dictionary;
use crate::math::{
    Aabb, Basis, Color, Plane, Projection, Quaternion, Rect2, Rect2i, Transform2D, Transform3D,
    Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i,
};
use crate::object::ObjectRef;
use crate::packed::{
    PackedByteArray, PackedColorArray, PackedFloat32Array, PackedFloat64Array, PackedInt32Array,
    PackedInt64Array, PackedStringArray, PackedVector2Array, PackedVector3Array,
};
use crate::string::{GString, NodePath, StringName};
use crate::types::{InstanceId, Rid};

pub use access::{AccessError, IterState, is_member, member_type, members_of};
pub use compare::{MAX_RECURSION, RecursionGuard};
pub use construct::{ConstructorInfo, constant_value, constants_of, constructors_of};
pub use convert::ConvertError;
pub use methods::{
    BuiltinMethod, builtin_method, builtin_methods_of, call_builtin, call_builtin_static,
};
pub use ops::{Operator, blend, evaluate, interpolate, operator_result_type, sub};
pub use utility::{UtilityFunction, call_utility, utility_function, utility_functions};

/// Builtin kind tag. Values are fixed by the ABI.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantType {
    #[default]
    Nil = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    Vector2 = 5,
    Vector2i = 6,
    Rect2 = 7,
    Rect2i = 8,
    Vector3 = 9,
    Vector3i = 10,
    Transform2D = 11,
    Vector4 = 12,
    Vector4i = 13,
    Plane = 14,
    Quaternion = 15,
    Aabb = 16,
    Basis = 17,
    Transform3D = 18,
    Projection = 19,
    Color = 20,
    StringName = 21,
    NodePath = 22,
    Rid = 23,
    Object = 24,
    Callable = 25,
    Signal = 26,
    Dictionary = 27,
    Array = 28,
    PackedByteArray = 29,
    PackedInt32Array = 30,
    PackedInt64Array = 31,
    PackedFloat32Array = 32,
    PackedFloat64Array = 33,
    PackedStringArray = 34,
    PackedVector2Array = 35,
    PackedVector3Array = 36,
    PackedColorArray = 37,
}

impl VariantType {
    pub const COUNT: u32 = gdhost_sys::VARIANT_TYPE_MAX;

    pub const ALL: [VariantType; 38] = [
        VariantType::Nil,
        VariantType::Bool,
        VariantType::Int,
        VariantType::Float,
        VariantType::String,
        VariantType::Vector2,
        VariantType::Vector2i,
        VariantType::Rect2,
        VariantType::Rect2i,
        VariantType::Vector3,
        VariantType::Vector3i,
        VariantType::Transform2D,
        VariantType::Vector4,
        VariantType::Vector4i,
        VariantType::Plane,
        VariantType::Quaternion,
        VariantType::Aabb,
        VariantType::Basis,
        VariantType::Transform3D,
        VariantType::Projection,
        VariantType::Color,
        VariantType::StringName,
        VariantType::NodePath,
        VariantType::Rid,
        VariantType::Object,
        VariantType::Callable,
        VariantType::Signal,
        VariantType::Dictionary,
        VariantType::Array,
        VariantType::PackedByteArray,
        VariantType::PackedInt32Array,
        VariantType::PackedInt64Array,
        VariantType::PackedFloat32Array,
        VariantType::PackedFloat64Array,
        VariantType::PackedStringArray,
        VariantType::PackedVector2Array,
        VariantType::PackedVector3Array,
        VariantType::PackedColorArray,
    ];

    pub fn from_raw(raw: u32) -> Option<VariantType> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn raw(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            VariantType::Nil => "Nil",
            VariantType::Bool => "bool",
            VariantType::Int => "int",
            VariantType::Float => "float",
            VariantType::String => "String",
            VariantType::Vector2 => "Vector2",
            VariantType::Vector2i => "Vector2i",
            VariantType::Rect2 => "Rect2",
            VariantType::Rect2i => "Rect2i",
            VariantType::Vector3 => "Vector3",
            VariantType::Vector3i => "Vector3i",
            VariantType::Transform2D => "Transform2D",
            VariantType::Vector4 => "Vector4",
            VariantType::Vector4i => "Vector4i",
            VariantType::Plane => "Plane",
            VariantType::Quaternion => "Quaternion",
            VariantType::Aabb => "AABB",
            VariantType::Basis => "Basis",
            VariantType::Transform3D => "Transform3D",
            VariantType::Projection => "Projection",
            VariantType::Color => "Color",
            VariantType::StringName => "StringName",
            VariantType::NodePath => "NodePath",
            VariantType::Rid => "RID",
            VariantType::Object => "Object",
            VariantType::Callable => "Callable",
            VariantType::Signal => "Signal",
            VariantType::Dictionary => "Dictionary",
            VariantType::Array => "Array",
            VariantType::PackedByteArray => "PackedByteArray",
            VariantType::PackedInt32Array => "PackedInt32Array",
            VariantType::PackedInt64Array => "PackedInt64Array",
            VariantType::PackedFloat32Array => "PackedFloat32Array",
            VariantType::PackedFloat64Array => "PackedFloat64Array",
            VariantType::PackedStringArray => "PackedStringArray",
            VariantType::PackedVector2Array => "PackedVector2Array",
            VariantType::PackedVector3Array => "PackedVector3Array",
            VariantType::PackedColorArray => "PackedColorArray",
        }
    }

    pub fn from_name(name: &str) -> Option<VariantType> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn is_packed_array(self) -> bool {
        self >= VariantType::PackedByteArray
    }

    /// Kinds whose copies share mutable storage.
    pub fn is_shared(self) -> bool {
        matches!(self, VariantType::Object | VariantType::Array | VariantType::Dictionary)
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The tagged value.
#[derive(Clone, Default)]
pub enum Variant {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(GString),
    Vector2(Vector2),
    Vector2i(Vector2i),
    Rect2(Rect2),
    Rect2i(Rect2i),
    Vector3(Vector3),
    Vector3i(Vector3i),
    Transform2D(Box<Transform2D>),
    Vector4(Vector4),
    Vector4i(Vector4i),
    Plane(Plane),
    Quaternion(Quaternion),
    Aabb(Box<Aabb>),
    Basis(Box<Basis>),
    Transform3D(Box<Transform3D>),
    Projection(Box<Projection>),
    Color(Color),
    StringName(StringName),
    NodePath(NodePath),
    Rid(Rid),
    Object(ObjectRef),
    Callable(Callable),
    Signal(Signal),
    Dictionary(Dictionary),
    Array(Array),
    PackedByteArray(PackedByteArray),
    PackedInt32Array(PackedInt32Array),
    PackedInt64Array(PackedInt64Array),
    PackedFloat32Array(PackedFloat32Array),
    PackedFloat64Array(PackedFloat64Array),
    PackedStringArray(PackedStringArray),
    PackedVector2Array(PackedVector2Array),
    PackedVector3Array(PackedVector3Array),
    PackedColorArray(PackedColorArray),
}

// Caller-provided storage is sized by this bound.
const _: () = assert!(std::mem::size_of::<Variant>() <= gdhost_sys::VARIANT_STORAGE_SIZE);
const _: () = assert!(std::mem::align_of::<Variant>() <= 8);

impl Variant {
    pub fn get_type(&self) -> VariantType {
        match self {
            Variant::Nil => VariantType::Nil,
            Variant::Bool(_) => VariantType::Bool,
            Variant::Int(_) => VariantType::Int,
            Variant::Float(_) => VariantType::Float,
            Variant::String(_) => VariantType::String,
            Variant::Vector2(_) => VariantType::Vector2,
            Variant::Vector2i(_) => VariantType::Vector2i,
            Variant::Rect2(_) => VariantType::Rect2,
            Variant::Rect2i(_) => VariantType::Rect2i,
            Variant::Vector3(_) => VariantType::Vector3,
            Variant::Vector3i(_) => VariantType::Vector3i,
            Variant::Transform2D(_) => VariantType::Transform2D,
            Variant::Vector4(_) => VariantType::Vector4,
            Variant::Vector4i(_) => VariantType::Vector4i,
            Variant::Plane(_) => VariantType::Plane,
            Variant::Quaternion(_) => VariantType::Quaternion,
            Variant::Aabb(_) => VariantType::Aabb,
            Variant::Basis(_) => VariantType::Basis,
            Variant::Transform3D(_) => VariantType::Transform3D,
            Variant::Projection(_) => VariantType::Projection,
            Variant::Color(_) => VariantType::Color,
            Variant::StringName(_) => VariantType::StringName,
            Variant::NodePath(_) => VariantType::NodePath,
            Variant::Rid(_) => VariantType::Rid,
            Variant::Object(_) => VariantType::Object,
            Variant::Callable(_) => VariantType::Callable,
            Variant::Signal(_) => VariantType::Signal,
            Variant::Dictionary(_) => VariantType::Dictionary,
            Variant::Array(_) => VariantType::Array,
            Variant::PackedByteArray(_) => VariantType::PackedByteArray,
            Variant::PackedInt32Array(_) => VariantType::PackedInt32Array,
            Variant::PackedInt64Array(_) => VariantType::PackedInt64Array,
            Variant::PackedFloat32Array(_) => VariantType::PackedFloat32Array,
            Variant::PackedFloat64Array(_) => VariantType::PackedFloat64Array,
            Variant::PackedStringArray(_) => VariantType::PackedStringArray,
            Variant::PackedVector2Array(_) => VariantType::PackedVector2Array,
            Variant::PackedVector3Array(_) => VariantType::PackedVector3Array,
            Variant::PackedColorArray(_) => VariantType::PackedColorArray,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil)
    }

    /// The value a default-constructed Variant of `ty` holds.
    pub fn default_of(ty: VariantType) -> Variant {
        match ty {
            VariantType::Nil => Variant::Nil,
            VariantType::Bool => Variant::Bool(false),
            VariantType::Int => Variant::Int(0),
            VariantType::Float => Variant::Float(0.0),
            VariantType::String => Variant::String(GString::new()),
            VariantType::Vector2 => Variant::Vector2(Vector2::default()),
            VariantType::Vector2i => Variant::Vector2i(Vector2i::default()),
            VariantType::Rect2 => Variant::Rect2(Rect2::default()),
            VariantType::Rect2i => Variant::Rect2i(Rect2i::default()),
            VariantType::Vector3 => Variant::Vector3(Vector3::default()),
            VariantType::Vector3i => Variant::Vector3i(Vector3i::default()),
            VariantType::Transform2D => Variant::Transform2D(Box::default()),
            VariantType::Vector4 => Variant::Vector4(Vector4::default()),
            VariantType::Vector4i => Variant::Vector4i(Vector4i::default()),
            VariantType::Plane => Variant::Plane(Plane::default()),
            VariantType::Quaternion => Variant::Quaternion(Quaternion::default()),
            VariantType::Aabb => Variant::Aabb(Box::default()),
            VariantType::Basis => Variant::Basis(Box::default()),
            VariantType::Transform3D => Variant::Transform3D(Box::default()),
            VariantType::Projection => Variant::Projection(Box::default()),
            VariantType::Color => Variant::Color(Color::default()),
            VariantType::StringName => Variant::StringName(StringName::default()),
            VariantType::NodePath => Variant::NodePath(NodePath::default()),
            VariantType::Rid => Variant::Rid(Rid::default()),
            VariantType::Object => Variant::Object(ObjectRef::null()),
            VariantType::Callable => Variant::Callable(Callable::default()),
            VariantType::Signal => Variant::Signal(Signal::default()),
            VariantType::Dictionary => Variant::Dictionary(Dictionary::new()),
            VariantType::Array => Variant::Array(Array::new()),
            VariantType::PackedByteArray => Variant::PackedByteArray(Default::default()),
            VariantType::PackedInt32Array => Variant::PackedInt32Array(Default::default()),
            VariantType::PackedInt64Array => Variant::PackedInt64Array(Default::default()),
            VariantType::PackedFloat32Array => Variant::PackedFloat32Array(Default::default()),
            VariantType::PackedFloat64Array => Variant::PackedFloat64Array(Default::default()),
            VariantType::PackedStringArray => Variant::PackedStringArray(Default::default()),
            VariantType::PackedVector2Array => Variant::PackedVector2Array(Default::default()),
            VariantType::PackedVector3Array => Variant::PackedVector3Array(Default::default()),
            VariantType::PackedColorArray => Variant::PackedColorArray(Default::default()),
        }
    }

    /// True for the default value of the kind (and for null objects).
    pub fn is_zero(&self) -> bool {
        match self {
            Variant::Nil => true,
            Variant::Bool(b) => !*b,
            Variant::Int(i) => *i == 0,
            Variant::Float(f) => *f == 0.0,
            Variant::String(s) => s.is_empty(),
            Variant::StringName(s) => s.is_empty(),
            Variant::NodePath(p) => p.is_empty(),
            Variant::Rid(r) => !r.is_valid(),
            Variant::Object(o) => o.get().is_none(),
            Variant::Callable(c) => c.is_null(),
            Variant::Signal(s) => s.is_null(),
            Variant::Dictionary(d) => d.is_empty(),
            Variant::Array(a) => a.is_empty(),
            Variant::PackedByteArray(a) => a.is_empty(),
            Variant::PackedInt32Array(a) => a.is_empty(),
            Variant::PackedInt64Array(a) => a.is_empty(),
            Variant::PackedFloat32Array(a) => a.is_empty(),
            Variant::PackedFloat64Array(a) => a.is_empty(),
            Variant::PackedStringArray(a) => a.is_empty(),
            Variant::PackedVector2Array(a) => a.is_empty(),
            Variant::PackedVector3Array(a) => a.is_empty(),
            Variant::PackedColorArray(a) => a.is_empty(),
            other => other.hash_compare(&Variant::default_of(other.get_type())),
        }
    }

    /// Truthiness used by `if` and the logical operators.
    pub fn booleanize(&self) -> bool {
        !self.is_zero()
    }

    // -- lossy scalar views used by conversions and argument unpacking --

    pub fn to_bool(&self) -> bool {
        self.booleanize()
    }

    pub fn to_int(&self) -> i64 {
        match self {
            Variant::Bool(b) => i64::from(*b),
            Variant::Int(i) => *i,
            #[allow(clippy::cast_possible_truncation)]
            Variant::Float(f) => *f as i64,
            Variant::String(s) => s.to_int(),
            Variant::StringName(s) => GString::from(s).to_int(),
            Variant::Object(o) => o.id.0 as i64,
            _ => 0,
        }
    }

    pub fn to_float(&self) -> f64 {
        match self {
            Variant::Bool(b) => f64::from(u8::from(*b)),
            Variant::Int(i) => *i as f64,
            Variant::Float(f) => *f,
            Variant::String(s) => s.to_float(),
            Variant::StringName(s) => GString::from(s).to_float(),
            _ => 0.0,
        }
    }

    pub fn to_gstring(&self) -> GString {
        match self {
            Variant::String(s) => s.clone(),
            other => GString::from(other.stringify()),
        }
    }

    pub fn to_string_name(&self) -> StringName {
        match self {
            Variant::StringName(s) => s.clone(),
            Variant::String(s) => StringName::from(s),
            other => StringName::new(&other.stringify()),
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Variant::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Variant::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Variant::Callable(c) => Some(c),
            _ => None,
        }
    }

    pub fn object_id(&self) -> InstanceId {
        match self {
            Variant::Object(o) => o.id,
            _ => InstanceId::NULL,
        }
    }

    /// String and StringName as text, for the string-like comparator.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Variant::String(s) => Some(s.to_string()),
            Variant::StringName(s) => Some(s.as_str().to_owned()),
            _ => None,
        }
    }

    /// Copy, recursing into containers when `deep`.
    pub fn duplicate(&self, deep: bool) -> Variant {
        self.recursive_duplicate(deep, 0)
    }

    pub fn recursive_duplicate(&self, deep: bool, recursion_count: i32) -> Variant {
        let mut guard = RecursionGuard::new();
        self.duplicate_guarded(deep, recursion_count, &mut guard)
    }

    pub(crate) fn duplicate_guarded(
        &self,
        deep: bool,
        recursion_count: i32,
        guard: &mut RecursionGuard,
    ) -> Variant {
        match self {
            Variant::Array(a) => Variant::Array(a.duplicate_guarded(deep, recursion_count, guard)),
            Variant::Dictionary(d) => {
                Variant::Dictionary(d.duplicate_guarded(deep, recursion_count, guard))
            }
            Variant::PackedByteArray(a) => Variant::PackedByteArray(a.duplicate()),
            Variant::PackedInt32Array(a) => Variant::PackedInt32Array(a.duplicate()),
            Variant::PackedInt64Array(a) => Variant::PackedInt64Array(a.duplicate()),
            Variant::PackedFloat32Array(a) => Variant::PackedFloat32Array(a.duplicate()),
            Variant::PackedFloat64Array(a) => Variant::PackedFloat64Array(a.duplicate()),
            Variant::PackedStringArray(a) => Variant::PackedStringArray(a.duplicate()),
            Variant::PackedVector2Array(a) => Variant::PackedVector2Array(a.duplicate()),
            Variant::PackedVector3Array(a) => Variant::PackedVector3Array(a.duplicate()),
            Variant::PackedColorArray(a) => Variant::PackedColorArray(a.duplicate()),
            other => other.clone(),
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.get_type().name(), self.stringify())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

// ---------------------------------------------------------------------------
// Conversions into Variant
// ---------------------------------------------------------------------------

macro_rules! from_inline {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(v: $ty) -> Self {
                    Variant::$variant(v)
                }
            }
        )*
    };
}

macro_rules! from_boxed {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(v: $ty) -> Self {
                    Variant::$variant(Box::new(v))
                }
            }
        )*
    };
}

from_inline! {
    bool => Bool,
    i64 => Int,
    f64 => Float,
    GString => String,
    Vector2 => Vector2,
    Vector2i => Vector2i,
    Rect2 => Rect2,
    Rect2i => Rect2i,
    Vector3 => Vector3,
    Vector3i => Vector3i,
    Vector4 => Vector4,
    Vector4i => Vector4i,
    Plane => Plane,
    Quaternion => Quaternion,
    Color => Color,
    StringName => StringName,
    NodePath => NodePath,
    Rid => Rid,
    ObjectRef => Object,
    Callable => Callable,
    Signal => Signal,
    Dictionary => Dictionary,
    Array => Array,
    PackedByteArray => PackedByteArray,
    PackedInt32Array => PackedInt32Array,
    PackedInt64Array => PackedInt64Array,
    PackedFloat32Array => PackedFloat32Array,
    PackedFloat64Array => PackedFloat64Array,
    PackedStringArray => PackedStringArray,
    PackedVector2Array => PackedVector2Array,
    PackedVector3Array => PackedVector3Array,
    PackedColorArray => PackedColorArray,
}

from_boxed! {
    Transform2D => Transform2D,
    Aabb => Aabb,
    Basis => Basis,
    Transform3D => Transform3D,
    Projection => Projection,
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int(i64::from(v))
    }
}

impl From<f32> for Variant {
    fn from(v: f32) -> Self {
        Variant::Float(f64::from(v))
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(GString::from(v))
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::String(GString::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_numbering_matches_the_abi() {
        assert_eq!(VariantType::Nil.raw(), gdhost_sys::VARIANT_TYPE_NIL);
        assert_eq!(VariantType::Object.raw(), gdhost_sys::VARIANT_TYPE_OBJECT);
        assert_eq!(VariantType::Array.raw(), gdhost_sys::VARIANT_TYPE_ARRAY);
        assert_eq!(
            VariantType::PackedColorArray.raw(),
            gdhost_sys::VARIANT_TYPE_PACKED_COLOR_ARRAY
        );
        assert_eq!(VariantType::ALL.len() as u32, VariantType::COUNT);
        for (i, ty) in VariantType::ALL.iter().enumerate() {
            assert_eq!(ty.raw() as usize, i);
        }
        assert_eq!(VariantType::from_raw(VariantType::COUNT), None);
    }

    #[test]
    fn default_values_have_matching_kinds() {
        for ty in VariantType::ALL {
            let v = Variant::default_of(ty);
            assert_eq!(v.get_type(), ty);
            assert!(v.is_zero(), "{ty} default should be zero");
        }
    }

    #[test]
    fn names_round_trip() {
        for ty in VariantType::ALL {
            assert_eq!(VariantType::from_name(ty.name()), Some(ty));
        }
    }

    #[test]
    fn scalar_views() {
        assert_eq!(Variant::from(2.9).to_int(), 2);
        assert_eq!(Variant::from("12").to_int(), 12);
        assert_eq!(Variant::from(true).to_float(), 1.0);
        assert!(!Variant::Nil.booleanize());
        assert!(Variant::from(1).booleanize());
    }
}
