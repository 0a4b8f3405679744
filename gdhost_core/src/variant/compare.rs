// Hashing and structural comparison.
//
// `hash_compare` is the equality that agrees with `hash`: floats compare
// equal when both are NaN, containers compare element-wise. `PartialEq`
// follows the engine's `==` instead: kinds must match and floats use IEEE
// equality at the top level.
//
// Containers can contain themselves, so the recursive forms take a depth and
// a `RecursionGuard`. Past `MAX_RECURSION` levels the guard reports "Max
// recursion reached" once and every further step short-circuits (equal, zero
// hash contribution) for the rest of that top-level call.

use smallvec::SmallVec;

use super::Variant;
use crate::hashing::{
    HASH_MURMUR3_SEED, hash_fmix32, hash_murmur3_one_32, hash_murmur3_one_double,
    hash_murmur3_one_real, hash_one_uint64,
};
use crate::math::Real;

pub const MAX_RECURSION: i32 = 100;

/// State shared by one top-level recursive hash or comparison.
#[derive(Debug, Default)]
pub struct RecursionGuard {
    exceeded: bool,
}

impl RecursionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a container at `depth` may be entered.
    pub fn enter(&mut self, depth: i32) -> bool {
        if self.exceeded {
            return false;
        }
        if depth > MAX_RECURSION {
            err_print!("Max recursion reached");
            self.exceeded = true;
            return false;
        }
        true
    }

    pub fn exceeded(&self) -> bool {
        self.exceeded
    }
}

type Reals = SmallVec<[Real; 16]>;

fn reals_of(v: &Variant) -> Option<Reals> {
    let out: Reals = match v {
        Variant::Vector2(a) => SmallVec::from_slice(&[a.x, a.y]),
        Variant::Vector3(a) => SmallVec::from_slice(&[a.x, a.y, a.z]),
        Variant::Vector4(a) => SmallVec::from_slice(&[a.x, a.y, a.z, a.w]),
        Variant::Rect2(r) => {
            SmallVec::from_slice(&[r.position.x, r.position.y, r.size.x, r.size.y])
        }
        Variant::Plane(p) => SmallVec::from_slice(&[p.normal.x, p.normal.y, p.normal.z, p.d]),
        Variant::Quaternion(q) => SmallVec::from_slice(&[q.x, q.y, q.z, q.w]),
        Variant::Color(c) => SmallVec::from_slice(&[c.r, c.g, c.b, c.a]),
        Variant::Aabb(b) => SmallVec::from_slice(&[
            b.position.x,
            b.position.y,
            b.position.z,
            b.size.x,
            b.size.y,
            b.size.z,
        ]),
        Variant::Transform2D(t) => t.columns.iter().flat_map(|c| [c.x, c.y]).collect(),
        Variant::Basis(b) => b.rows.iter().flat_map(|r| [r.x, r.y, r.z]).collect(),
        Variant::Transform3D(t) => t
            .basis
            .rows
            .iter()
            .flat_map(|r| [r.x, r.y, r.z])
            .chain([t.origin.x, t.origin.y, t.origin.z])
            .collect(),
        Variant::Projection(p) => p.columns.iter().flat_map(|c| [c.x, c.y, c.z, c.w]).collect(),
        _ => return None,
    };
    Some(out)
}

fn ints_of(v: &Variant) -> Option<SmallVec<[i32; 4]>> {
    let out = match v {
        Variant::Vector2i(a) => SmallVec::from_slice(&[a.x, a.y]),
        Variant::Vector3i(a) => SmallVec::from_slice(&[a.x, a.y, a.z]),
        Variant::Vector4i(a) => SmallVec::from_slice(&[a.x, a.y, a.z, a.w]),
        Variant::Rect2i(r) => {
            SmallVec::from_slice(&[r.position.x, r.position.y, r.size.x, r.size.y])
        }
        _ => return None,
    };
    Some(out)
}

fn scalar_hash_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl Variant {
    pub fn hash(&self) -> u32 {
        self.recursive_hash(0)
    }

    /// Hash starting at `depth`, with a fresh guard.
    pub fn recursive_hash(&self, depth: i32) -> u32 {
        let mut guard = RecursionGuard::new();
        self.hash_guarded(depth, &mut guard)
    }

    pub fn hash_guarded(&self, depth: i32, guard: &mut RecursionGuard) -> u32 {
        if let Some(reals) = reals_of(self) {
            let h = reals
                .iter()
                .fold(HASH_MURMUR3_SEED, |h, &r| hash_murmur3_one_real(r, h));
            return hash_fmix32(h);
        }
        if let Some(ints) = ints_of(self) {
            let h = ints
                .iter()
                .fold(HASH_MURMUR3_SEED, |h, &i| hash_murmur3_one_32(i as u32, h));
            return hash_fmix32(h);
        }
        match self {
            Variant::Nil => 0,
            Variant::Bool(b) => u32::from(*b),
            Variant::Int(i) => hash_one_uint64(*i as u64),
            Variant::Float(f) => hash_murmur3_one_double(*f, HASH_MURMUR3_SEED),
            Variant::String(s) => s.hash_value(),
            Variant::StringName(s) => s.hash_value(),
            Variant::NodePath(p) => p.hash_value(),
            Variant::Rid(r) => hash_one_uint64(r.0),
            Variant::Object(o) => hash_one_uint64(o.id.0),
            Variant::Callable(c) => c.hash_value(),
            Variant::Signal(s) => s.hash_value(),
            Variant::Dictionary(d) => d.hash_guarded(depth, guard),
            Variant::Array(a) => a.hash_guarded(depth, guard),
            Variant::PackedByteArray(a) => a.hash_value(),
            Variant::PackedInt32Array(a) => a.hash_value(),
            Variant::PackedInt64Array(a) => a.hash_value(),
            Variant::PackedFloat32Array(a) => a.hash_value(),
            Variant::PackedFloat64Array(a) => a.hash_value(),
            Variant::PackedStringArray(a) => a.hash_value(),
            Variant::PackedVector2Array(a) => a.hash_value(),
            Variant::PackedVector3Array(a) => a.hash_value(),
            Variant::PackedColorArray(a) => a.hash_value(),
            _ => 0,
        }
    }

    /// Equality consistent with `hash`.
    pub fn hash_compare(&self, other: &Variant) -> bool {
        let mut guard = RecursionGuard::new();
        self.hash_compare_guarded(other, 0, &mut guard)
    }

    pub fn hash_compare_guarded(
        &self,
        other: &Variant,
        depth: i32,
        guard: &mut RecursionGuard,
    ) -> bool {
        if self.get_type() != other.get_type() {
            return false;
        }
        if let (Some(a), Some(b)) = (reals_of(self), reals_of(other)) {
            return a
                .iter()
                .zip(b.iter())
                .all(|(x, y)| scalar_hash_eq(f64::from(*x), f64::from(*y)));
        }
        match (self, other) {
            (Variant::Float(a), Variant::Float(b)) => scalar_hash_eq(*a, *b),
            (Variant::Array(a), Variant::Array(b)) => a.equal_guarded(b, depth, guard),
            (Variant::Dictionary(a), Variant::Dictionary(b)) => a.equal_guarded(b, depth, guard),
            (Variant::PackedFloat32Array(a), Variant::PackedFloat32Array(b)) => a.hash_eq(b),
            (Variant::PackedFloat64Array(a), Variant::PackedFloat64Array(b)) => a.hash_eq(b),
            (Variant::PackedVector2Array(a), Variant::PackedVector2Array(b)) => a.hash_eq(b),
            (Variant::PackedVector3Array(a), Variant::PackedVector3Array(b)) => a.hash_eq(b),
            (Variant::PackedColorArray(a), Variant::PackedColorArray(b)) => a.hash_eq(b),
            _ => self.same_kind_eq(other),
        }
    }

    /// `==` for two values already known to share a kind.
    fn same_kind_eq(&self, other: &Variant) -> bool {
        match (self, other) {
            (Variant::Nil, Variant::Nil) => true,
            (Variant::Bool(a), Variant::Bool(b)) => a == b,
            (Variant::Int(a), Variant::Int(b)) => a == b,
            (Variant::Float(a), Variant::Float(b)) => a == b,
            (Variant::String(a), Variant::String(b)) => a == b,
            (Variant::Vector2(a), Variant::Vector2(b)) => a == b,
            (Variant::Vector2i(a), Variant::Vector2i(b)) => a == b,
            (Variant::Rect2(a), Variant::Rect2(b)) => a == b,
            (Variant::Rect2i(a), Variant::Rect2i(b)) => a == b,
            (Variant::Vector3(a), Variant::Vector3(b)) => a == b,
            (Variant::Vector3i(a), Variant::Vector3i(b)) => a == b,
            (Variant::Transform2D(a), Variant::Transform2D(b)) => a == b,
            (Variant::Vector4(a), Variant::Vector4(b)) => a == b,
            (Variant::Vector4i(a), Variant::Vector4i(b)) => a == b,
            (Variant::Plane(a), Variant::Plane(b)) => a == b,
            (Variant::Quaternion(a), Variant::Quaternion(b)) => a == b,
            (Variant::Aabb(a), Variant::Aabb(b)) => a == b,
            (Variant::Basis(a), Variant::Basis(b)) => a == b,
            (Variant::Transform3D(a), Variant::Transform3D(b)) => a == b,
            (Variant::Projection(a), Variant::Projection(b)) => a == b,
            (Variant::Color(a), Variant::Color(b)) => a == b,
            (Variant::StringName(a), Variant::StringName(b)) => a == b,
            (Variant::NodePath(a), Variant::NodePath(b)) => a == b,
            (Variant::Rid(a), Variant::Rid(b)) => a == b,
            (Variant::Object(a), Variant::Object(b)) => a.id == b.id,
            (Variant::Callable(a), Variant::Callable(b)) => a == b,
            (Variant::Signal(a), Variant::Signal(b)) => a == b,
            (Variant::Dictionary(a), Variant::Dictionary(b)) => a == b,
            (Variant::Array(a), Variant::Array(b)) => a == b,
            (Variant::PackedByteArray(a), Variant::PackedByteArray(b)) => a == b,
            (Variant::PackedInt32Array(a), Variant::PackedInt32Array(b)) => a == b,
            (Variant::PackedInt64Array(a), Variant::PackedInt64Array(b)) => a == b,
            (Variant::PackedFloat32Array(a), Variant::PackedFloat32Array(b)) => a == b,
            (Variant::PackedFloat64Array(a), Variant::PackedFloat64Array(b)) => a == b,
            (Variant::PackedStringArray(a), Variant::PackedStringArray(b)) => a == b,
            (Variant::PackedVector2Array(a), Variant::PackedVector2Array(b)) => a == b,
            (Variant::PackedVector3Array(a), Variant::PackedVector3Array(b)) => a == b,
            (Variant::PackedColorArray(a), Variant::PackedColorArray(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.get_type() == other.get_type() && self.same_kind_eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector2;

    #[test]
    fn nan_is_hash_equal_but_not_eq() {
        let a = Variant::Float(f64::NAN);
        let b = Variant::Float(f64::NAN);
        assert!(a.hash_compare(&b));
        assert_ne!(a, b);
        assert_eq!(a.hash(), b.hash());

        let v = Variant::from(Vector2::new(f32::NAN, 1.0));
        assert!(v.hash_compare(&v.clone()));
    }

    #[test]
    fn kinds_must_match() {
        assert_ne!(Variant::from(1), Variant::from(1.0));
        assert!(!Variant::from("a").hash_compare(&Variant::StringName("a".into())));
    }

    #[test]
    fn signed_zero_hashes_alike() {
        assert_eq!(Variant::from(0.0).hash(), Variant::from(-0.0).hash());
        assert!(Variant::from(0.0).hash_compare(&Variant::from(-0.0)));
    }

    #[test]
    fn guard_reports_once() {
        let (_, diags) = crate::diag::capture(|| {
            let mut guard = RecursionGuard::new();
            assert!(guard.enter(MAX_RECURSION));
            assert!(!guard.enter(MAX_RECURSION + 1));
            assert!(!guard.enter(0));
            assert!(guard.exceeded());
        });
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Max recursion reached");
    }
}
