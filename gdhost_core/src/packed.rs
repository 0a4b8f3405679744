// Packed arrays: homogeneous, copy-on-write element vectors.
//
// `PackedArray<T>` wraps an `Arc<Vec<T>>`. Copies share the buffer; the first
// mutation through a shared copy clones it (`Arc::make_mut`). The nine packed
// kinds are aliases over one generic type; the per-element behavior
// (Variant conversion, hashing) comes from `PackedElement`.
//
// Raw element pointers handed across the ABI point into the buffer and stay
// valid until the next mutation or drop of the array that produced them.

use std::fmt;
use std::sync::Arc;

use crate::hashing::{
    HASH_MURMUR3_SEED, hash_fmix32, hash_murmur3_one_32, hash_murmur3_one_64,
    hash_murmur3_one_double, hash_murmur3_one_real,
};
use crate::math::{Color, Vector2, Vector3};
use crate::string::GString;
use crate::variant::{Variant, VariantType};

/// Element type of a packed array.
pub trait PackedElement: Clone + Default + PartialEq + fmt::Display + Send + Sync + 'static {
    const ARRAY_TYPE: VariantType;
    const ELEMENT_TYPE: VariantType;

    fn to_variant(&self) -> Variant;

    /// Element from a Variant, converting numerics; `None` when impossible.
    fn from_variant(v: &Variant) -> Option<Self>;

    fn hash_into(&self, seed: u32) -> u32;

    /// Equality consistent with `hash_into` (NaN equals NaN).
    fn hash_eq(&self, other: &Self) -> bool {
        self == other
    }
}

fn real_hash_eq(a: f32, b: f32) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PackedElement for u8 {
    const ARRAY_TYPE: VariantType = VariantType::PackedByteArray;
    const ELEMENT_TYPE: VariantType = VariantType::Int;

    fn to_variant(&self) -> Variant {
        Variant::Int(i64::from(*self))
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Variant::Int(_) | Variant::Float(_) | Variant::Bool(_) => Some(v.to_int() as u8),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        hash_murmur3_one_32(u32::from(*self), seed)
    }
}

impl PackedElement for i32 {
    const ARRAY_TYPE: VariantType = VariantType::PackedInt32Array;
    const ELEMENT_TYPE: VariantType = VariantType::Int;

    fn to_variant(&self) -> Variant {
        Variant::Int(i64::from(*self))
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            #[allow(clippy::cast_possible_truncation)]
            Variant::Int(_) | Variant::Float(_) | Variant::Bool(_) => Some(v.to_int() as i32),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        hash_murmur3_one_32(*self as u32, seed)
    }
}

impl PackedElement for i64 {
    const ARRAY_TYPE: VariantType = VariantType::PackedInt64Array;
    const ELEMENT_TYPE: VariantType = VariantType::Int;

    fn to_variant(&self) -> Variant {
        Variant::Int(*self)
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            Variant::Int(_) | Variant::Float(_) | Variant::Bool(_) => Some(v.to_int()),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        hash_murmur3_one_64(*self as u64, seed)
    }
}

impl PackedElement for f32 {
    const ARRAY_TYPE: VariantType = VariantType::PackedFloat32Array;
    const ELEMENT_TYPE: VariantType = VariantType::Float;

    fn to_variant(&self) -> Variant {
        Variant::Float(f64::from(*self))
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            #[allow(clippy::cast_possible_truncation)]
            Variant::Int(_) | Variant::Float(_) | Variant::Bool(_) => Some(v.to_float() as f32),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        hash_murmur3_one_real(*self, seed)
    }

    fn hash_eq(&self, other: &Self) -> bool {
        real_hash_eq(*self, *other)
    }
}

impl PackedElement for f64 {
    const ARRAY_TYPE: VariantType = VariantType::PackedFloat64Array;
    const ELEMENT_TYPE: VariantType = VariantType::Float;

    fn to_variant(&self) -> Variant {
        Variant::Float(*self)
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            Variant::Int(_) | Variant::Float(_) | Variant::Bool(_) => Some(v.to_float()),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        hash_murmur3_one_double(*self, seed)
    }

    fn hash_eq(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl PackedElement for GString {
    const ARRAY_TYPE: VariantType = VariantType::PackedStringArray;
    const ELEMENT_TYPE: VariantType = VariantType::String;

    fn to_variant(&self) -> Variant {
        Variant::String(self.clone())
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            Variant::String(s) => Some(s.clone()),
            Variant::StringName(s) => Some(GString::from(s)),
            Variant::NodePath(p) => Some(GString::from(p.to_string())),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        hash_murmur3_one_32(self.hash_value(), seed)
    }
}

impl PackedElement for Vector2 {
    const ARRAY_TYPE: VariantType = VariantType::PackedVector2Array;
    const ELEMENT_TYPE: VariantType = VariantType::Vector2;

    fn to_variant(&self) -> Variant {
        Variant::Vector2(*self)
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            Variant::Vector2(a) => Some(*a),
            Variant::Vector2i(a) => Some(a.to_real()),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        hash_murmur3_one_real(self.y, hash_murmur3_one_real(self.x, seed))
    }

    fn hash_eq(&self, o: &Self) -> bool {
        real_hash_eq(self.x, o.x) && real_hash_eq(self.y, o.y)
    }
}

impl PackedElement for Vector3 {
    const ARRAY_TYPE: VariantType = VariantType::PackedVector3Array;
    const ELEMENT_TYPE: VariantType = VariantType::Vector3;

    fn to_variant(&self) -> Variant {
        Variant::Vector3(*self)
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            Variant::Vector3(a) => Some(*a),
            Variant::Vector3i(a) => Some(a.to_real()),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        let h = hash_murmur3_one_real(self.x, seed);
        let h = hash_murmur3_one_real(self.y, h);
        hash_murmur3_one_real(self.z, h)
    }

    fn hash_eq(&self, o: &Self) -> bool {
        real_hash_eq(self.x, o.x) && real_hash_eq(self.y, o.y) && real_hash_eq(self.z, o.z)
    }
}

impl PackedElement for Color {
    const ARRAY_TYPE: VariantType = VariantType::PackedColorArray;
    const ELEMENT_TYPE: VariantType = VariantType::Color;

    fn to_variant(&self) -> Variant {
        Variant::Color(*self)
    }

    fn from_variant(v: &Variant) -> Option<Self> {
        match v {
            Variant::Color(c) => Some(*c),
            _ => None,
        }
    }

    fn hash_into(&self, seed: u32) -> u32 {
        [self.r, self.g, self.b, self.a]
            .iter()
            .fold(seed, |h, &c| hash_murmur3_one_real(c, h))
    }

    fn hash_eq(&self, o: &Self) -> bool {
        real_hash_eq(self.r, o.r)
            && real_hash_eq(self.g, o.g)
            && real_hash_eq(self.b, o.b)
            && real_hash_eq(self.a, o.a)
    }
}

#[derive(Clone)]
pub struct PackedArray<T> {
    data: Arc<Vec<T>>,
}

pub type PackedByteArray = PackedArray<u8>;
pub type PackedInt32Array = PackedArray<i32>;
pub type PackedInt64Array = PackedArray<i64>;
pub type PackedFloat32Array = PackedArray<f32>;
pub type PackedFloat64Array = PackedArray<f64>;
pub type PackedStringArray = PackedArray<GString>;
pub type PackedVector2Array = PackedArray<Vector2>;
pub type PackedVector3Array = PackedArray<Vector3>;
pub type PackedColorArray = PackedArray<Color>;

impl<T> Default for PackedArray<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(Vec::new()),
        }
    }
}

impl<T: PackedElement> PackedArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(v: Vec<T>) -> Self {
        Self { data: Arc::new(v) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.data.as_ref().clone()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    fn make_mut(&mut self) -> &mut Vec<T> {
        Arc::make_mut(&mut self.data)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.make_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, value: T) {
        self.make_mut().push(value);
    }

    pub fn append_array(&mut self, other: &PackedArray<T>) {
        self.make_mut().extend_from_slice(other.as_slice());
    }

    pub fn insert(&mut self, index: usize, value: T) -> bool {
        if index > self.len() {
            return false;
        }
        self.make_mut().insert(index, value);
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        if index >= self.len() {
            return None;
        }
        Some(self.make_mut().remove(index))
    }

    pub fn resize(&mut self, len: usize) {
        self.make_mut().resize(len, T::default());
    }

    pub fn fill(&mut self, value: T) {
        self.make_mut().fill(value);
    }

    pub fn clear(&mut self) {
        self.make_mut().clear();
    }

    pub fn reverse(&mut self) {
        self.make_mut().reverse();
    }

    pub fn has(&self, value: &T) -> bool {
        self.data.contains(value)
    }

    pub fn find(&self, value: &T) -> Option<usize> {
        self.data.iter().position(|v| v == value)
    }

    pub fn count(&self, value: &T) -> usize {
        self.data.iter().filter(|v| *v == value).count()
    }

    /// Elements `[begin, end)` with negative indices counted from the end.
    pub fn slice(&self, begin: i64, end: i64) -> Self {
        let len = self.len() as i64;
        let fix = |i: i64| if i < 0 { (i + len).max(0) } else { i.min(len) };
        let (b, e) = (fix(begin), fix(end));
        if b >= e {
            return Self::new();
        }
        Self::from_vec(self.data[b as usize..e as usize].to_vec())
    }

    /// Copy with a private buffer.
    pub fn duplicate(&self) -> Self {
        Self::from_vec(self.to_vec())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Pointer to element `index`, null when out of range.
    pub fn element_ptr(&self, index: usize) -> *const T {
        self.data
            .get(index)
            .map_or(std::ptr::null(), |v| v as *const T)
    }

    /// Mutable pointer to element `index` (unshares first), null when out of
    /// range.
    pub fn element_ptr_mut(&mut self, index: usize) -> *mut T {
        if index >= self.len() {
            return std::ptr::null_mut();
        }
        &mut self.make_mut()[index] as *mut T
    }

    pub fn hash_value(&self) -> u32 {
        let h = hash_murmur3_one_32(T::ARRAY_TYPE as u32, HASH_MURMUR3_SEED);
        hash_fmix32(self.data.iter().fold(h, |h, v| v.hash_into(h)))
    }

    pub fn hash_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.hash_eq(b))
    }

    pub fn to_variant_vec(&self) -> Vec<Variant> {
        self.data.iter().map(PackedElement::to_variant).collect()
    }

    /// Build from Variants; `None` if any element does not convert.
    pub fn from_variants<'a>(items: impl IntoIterator<Item = &'a Variant>) -> Option<Self> {
        items
            .into_iter()
            .map(T::from_variant)
            .collect::<Option<Vec<T>>>()
            .map(Self::from_vec)
    }
}

impl<T: PackedElement> PartialEq for PackedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.data == other.data
    }
}

impl<T: PackedElement> From<Vec<T>> for PackedArray<T> {
    fn from(v: Vec<T>) -> Self {
        Self::from_vec(v)
    }
}

impl<T: PackedElement> FromIterator<T> for PackedArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: PackedElement> fmt::Display for PackedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

impl<T: PackedElement> fmt::Debug for PackedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({self})", T::ARRAY_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_share_until_written() {
        let a: PackedInt32Array = vec![1, 2, 3].into();
        let mut b = a.clone();
        assert!(a.ptr_eq(&b));
        b.set(0, 9);
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.as_slice(), &[1, 2, 3]);
        assert_eq!(b.as_slice(), &[9, 2, 3]);
    }

    #[test]
    fn element_pointers_are_null_out_of_range() {
        let mut a: PackedByteArray = vec![7u8].into();
        assert!(a.element_ptr(1).is_null());
        assert!(a.element_ptr_mut(1).is_null());
        let p = a.element_ptr_mut(0);
        unsafe { *p = 8 };
        assert_eq!(a.as_slice(), &[8]);
    }

    #[test]
    fn nan_elements_hash_equal() {
        let a: PackedFloat32Array = vec![f32::NAN].into();
        let b: PackedFloat32Array = vec![f32::NAN].into();
        assert!(a.hash_eq(&b));
        assert_eq!(a.hash_value(), b.hash_value());
        assert_ne!(a, b);
    }

    #[test]
    fn slice_clamps() {
        let a: PackedInt64Array = (0..5).collect();
        assert_eq!(a.slice(1, 3).as_slice(), &[1, 2]);
        assert_eq!(a.slice(-2, 100).as_slice(), &[3, 4]);
        assert!(a.slice(4, 1).is_empty());
    }

    #[test]
    fn variant_conversion_is_all_or_nothing() {
        let ok = PackedVector2Array::from_variants(&[Variant::from(Vector2::ONE)]);
        assert_eq!(ok.map(|a| a.len()), Some(1));
        let bad = PackedVector2Array::from_variants(&[Variant::from(1)]);
        assert!(bad.is_none());
    }
}
