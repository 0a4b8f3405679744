// Member, index and key access, and iteration.
//
// Four access paths, mirroring the ABI:
// - named:   builtin members (`x`, `position`, `r`, ...), Dictionary entries
//            keyed by name, Object properties.
// - indexed: integer subscripts with an out-of-bounds distinction. Strings,
//            Arrays and packed arrays accept negative indices from the end.
// - keyed:   Dictionary keys and Object properties.
// - `get` / `set`: the generic bracket, choosing one of the above.
//
// Iteration keeps its cursor in a caller-owned Variant: an index for
// sequences, the current key for dictionaries, the current number for
// ranges (`Int`, `Float`, `Vector2(i)` as from/to, `Vector3(i)` as
// from/to/step).

use thiserror::Error;

use super::{Variant, VariantType};
use crate::math::{Vector2, Vector3, Vector4};
use crate::packed::{PackedArray, PackedElement};
use crate::string::{GString, StringName};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("invalid access")]
    Invalid,
    #[error("index out of bounds")]
    OutOfBounds,
}

/// Builtin members reachable by name, per kind.
pub fn members_of(ty: VariantType) -> &'static [&'static str] {
    match ty {
        VariantType::Vector2 | VariantType::Vector2i => &["x", "y"],
        VariantType::Vector3 | VariantType::Vector3i => &["x", "y", "z"],
        VariantType::Vector4 | VariantType::Vector4i | VariantType::Quaternion => {
            &["x", "y", "z", "w"]
        }
        VariantType::Rect2 | VariantType::Rect2i | VariantType::Aabb => &["position", "size", "end"],
        VariantType::Plane => &["x", "y", "z", "d", "normal"],
        VariantType::Color => &["r", "g", "b", "a", "r8", "g8", "b8", "a8"],
        VariantType::Transform2D => &["x", "y", "origin"],
        VariantType::Basis => &["x", "y", "z"],
        VariantType::Transform3D => &["basis", "origin"],
        VariantType::Projection => &["x", "y", "z", "w"],
        _ => &[],
    }
}

pub fn is_member(ty: VariantType, name: &str) -> bool {
    members_of(ty).iter().any(|m| *m == name)
}

/// Type of member `name` of `ty`.
pub fn member_type(ty: VariantType, name: &str) -> Option<VariantType> {
    if !is_member(ty, name) {
        return None;
    }
    let sample = Variant::default_of(ty);
    sample.get_member(name).map(|v| v.get_type())
}

fn normalize(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn axis(name: &str) -> Option<i64> {
    match name {
        "x" | "r" => Some(0),
        "y" | "g" => Some(1),
        "z" | "b" => Some(2),
        "w" | "a" => Some(3),
        _ => None,
    }
}

fn real_component(c: Option<f32>) -> Result<Variant, AccessError> {
    c.map(|v| Variant::Float(f64::from(v)))
        .ok_or(AccessError::OutOfBounds)
}

fn int_component(c: Option<i32>) -> Result<Variant, AccessError> {
    c.map(|v| Variant::Int(i64::from(v)))
        .ok_or(AccessError::OutOfBounds)
}

#[allow(clippy::cast_possible_truncation)]
fn real_value(value: &Variant) -> Result<f32, AccessError> {
    match value {
        Variant::Int(_) | Variant::Float(_) => Ok(value.to_float() as f32),
        _ => Err(AccessError::Invalid),
    }
}

fn int_value(value: &Variant) -> Result<i32, AccessError> {
    match value {
        #[allow(clippy::cast_possible_truncation)]
        Variant::Int(_) | Variant::Float(_) => Ok(value.to_int() as i32),
        _ => Err(AccessError::Invalid),
    }
}

fn stored(ok: bool) -> Result<(), AccessError> {
    if ok { Ok(()) } else { Err(AccessError::OutOfBounds) }
}

fn packed_get<T: PackedElement>(a: &PackedArray<T>, index: i64) -> Result<Variant, AccessError> {
    normalize(index, a.len())
        .and_then(|i| a.get(i))
        .map(PackedElement::to_variant)
        .ok_or(AccessError::OutOfBounds)
}

fn packed_set<T: PackedElement>(
    a: &mut PackedArray<T>,
    index: i64,
    value: &Variant,
) -> Result<(), AccessError> {
    let value = T::from_variant(value).ok_or(AccessError::Invalid)?;
    let i = normalize(index, a.len()).ok_or(AccessError::OutOfBounds)?;
    stored(a.set(i, value))
}

fn component<T: Copy>(items: &[T], index: i64) -> Result<T, AccessError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .copied()
        .ok_or(AccessError::OutOfBounds)
}

fn component_mut<T>(items: &mut [T], index: i64) -> Result<&mut T, AccessError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get_mut(i))
        .ok_or(AccessError::OutOfBounds)
}

fn expect_vector2(value: &Variant) -> Result<Vector2, AccessError> {
    match value {
        Variant::Vector2(v) => Ok(*v),
        _ => Err(AccessError::Invalid),
    }
}

fn expect_vector3(value: &Variant) -> Result<Vector3, AccessError> {
    match value {
        Variant::Vector3(v) => Ok(*v),
        _ => Err(AccessError::Invalid),
    }
}

fn expect_vector4(value: &Variant) -> Result<Vector4, AccessError> {
    match value {
        Variant::Vector4(v) => Ok(*v),
        _ => Err(AccessError::Invalid),
    }
}

fn as_index(v: i64) -> Option<usize> {
    usize::try_from(v).ok()
}

impl Variant {
    // -----------------------------------------------------------------------
    // Indexed
    // -----------------------------------------------------------------------

    pub fn get_indexed(&self, index: i64) -> Result<Variant, AccessError> {
        use Variant as V;
        let i = as_index(index);
        match self {
            V::Vector2(v) => real_component(i.and_then(|i| v.get(i))),
            V::Vector3(v) => real_component(i.and_then(|i| v.get(i))),
            V::Vector4(v) => real_component(i.and_then(|i| v.get(i))),
            V::Quaternion(q) => real_component(i.and_then(|i| q.get(i))),
            V::Color(c) => real_component(i.and_then(|i| c.get(i))),
            V::Vector2i(v) => int_component(i.and_then(|i| v.get(i))),
            V::Vector3i(v) => int_component(i.and_then(|i| v.get(i))),
            V::Vector4i(v) => int_component(i.and_then(|i| v.get(i))),
            V::Transform2D(t) => component(&t.columns, index).map(V::Vector2),
            V::Basis(b) => component(&b.rows, index).map(V::Vector3),
            V::Projection(p) => component(&p.columns, index).map(V::Vector4),
            V::String(s) => normalize(index, s.len())
                .and_then(|i| s.get(i))
                .map(|unit| V::String(GString::from_utf32(&[unit])))
                .ok_or(AccessError::OutOfBounds),
            V::Array(a) => normalize(index, a.len())
                .and_then(|i| a.get(i))
                .ok_or(AccessError::OutOfBounds),
            V::Dictionary(d) => d.get(&V::Int(index)).ok_or(AccessError::Invalid),
            V::PackedByteArray(a) => packed_get(a, index),
            V::PackedInt32Array(a) => packed_get(a, index),
            V::PackedInt64Array(a) => packed_get(a, index),
            V::PackedFloat32Array(a) => packed_get(a, index),
            V::PackedFloat64Array(a) => packed_get(a, index),
            V::PackedStringArray(a) => packed_get(a, index),
            V::PackedVector2Array(a) => packed_get(a, index),
            V::PackedVector3Array(a) => packed_get(a, index),
            V::PackedColorArray(a) => packed_get(a, index),
            _ => Err(AccessError::Invalid),
        }
    }

    pub fn set_indexed(&mut self, index: i64, value: &Variant) -> Result<(), AccessError> {
        use Variant as V;
        let i = as_index(index).ok_or(AccessError::OutOfBounds);
        match self {
            V::Vector2(v) => stored(v.set(i?, real_value(value)?)),
            V::Vector3(v) => stored(v.set(i?, real_value(value)?)),
            V::Vector4(v) => stored(v.set(i?, real_value(value)?)),
            V::Quaternion(q) => stored(q.set(i?, real_value(value)?)),
            V::Color(c) => stored(c.set(i?, real_value(value)?)),
            V::Vector2i(v) => stored(v.set(i?, int_value(value)?)),
            V::Vector3i(v) => stored(v.set(i?, int_value(value)?)),
            V::Vector4i(v) => stored(v.set(i?, int_value(value)?)),
            V::Transform2D(t) => {
                let v = expect_vector2(value)?;
                *component_mut(&mut t.columns, index)? = v;
                Ok(())
            }
            V::Basis(b) => {
                let v = expect_vector3(value)?;
                *component_mut(&mut b.rows, index)? = v;
                Ok(())
            }
            V::Projection(p) => {
                let v = expect_vector4(value)?;
                *component_mut(&mut p.columns, index)? = v;
                Ok(())
            }
            V::String(s) => {
                let unit = match value {
                    V::String(text) => text.get(0).ok_or(AccessError::Invalid)?,
                    _ => return Err(AccessError::Invalid),
                };
                let i = normalize(index, s.len()).ok_or(AccessError::OutOfBounds)?;
                stored(s.set(i, unit))
            }
            V::Array(a) => {
                let i = normalize(index, a.len()).ok_or(AccessError::OutOfBounds)?;
                a.set(i, value.clone()).map_err(|_| AccessError::Invalid)
            }
            V::Dictionary(d) => {
                if d.set(V::Int(index), value.clone()) {
                    Ok(())
                } else {
                    Err(AccessError::Invalid)
                }
            }
            V::PackedByteArray(a) => packed_set(a, index, value),
            V::PackedInt32Array(a) => packed_set(a, index, value),
            V::PackedInt64Array(a) => packed_set(a, index, value),
            V::PackedFloat32Array(a) => packed_set(a, index, value),
            V::PackedFloat64Array(a) => packed_set(a, index, value),
            V::PackedStringArray(a) => packed_set(a, index, value),
            V::PackedVector2Array(a) => packed_set(a, index, value),
            V::PackedVector3Array(a) => packed_set(a, index, value),
            V::PackedColorArray(a) => packed_set(a, index, value),
            _ => Err(AccessError::Invalid),
        }
    }

    /// Element count for indexable kinds.
    pub fn indexed_size(&self) -> Option<usize> {
        use Variant as V;
        let n = match self {
            V::Vector2(_) | V::Vector2i(_) => 2,
            V::Vector3(_) | V::Vector3i(_) | V::Transform2D(_) | V::Basis(_) => 3,
            V::Vector4(_) | V::Vector4i(_) | V::Quaternion(_) | V::Color(_) | V::Projection(_) => 4,
            V::String(s) => s.len(),
            V::Array(a) => a.len(),
            V::Dictionary(d) => d.len(),
            V::PackedByteArray(a) => a.len(),
            V::PackedInt32Array(a) => a.len(),
            V::PackedInt64Array(a) => a.len(),
            V::PackedFloat32Array(a) => a.len(),
            V::PackedFloat64Array(a) => a.len(),
            V::PackedStringArray(a) => a.len(),
            V::PackedVector2Array(a) => a.len(),
            V::PackedVector3Array(a) => a.len(),
            V::PackedColorArray(a) => a.len(),
            _ => return None,
        };
        Some(n)
    }

    // -----------------------------------------------------------------------
    // Named
    // -----------------------------------------------------------------------

    fn get_member(&self, name: &str) -> Option<Variant> {
        use Variant as V;
        if !is_member(self.get_type(), name) {
            return None;
        }
        match self {
            V::Rect2(r) => match name {
                "position" => Some(V::Vector2(r.position)),
                "size" => Some(V::Vector2(r.size)),
                _ => Some(V::Vector2(r.end())),
            },
            V::Rect2i(r) => match name {
                "position" => Some(V::Vector2i(r.position)),
                "size" => Some(V::Vector2i(r.size)),
                _ => Some(V::Vector2i(r.end())),
            },
            V::Aabb(r) => match name {
                "position" => Some(V::Vector3(r.position)),
                "size" => Some(V::Vector3(r.size)),
                _ => Some(V::Vector3(r.end())),
            },
            V::Plane(p) => match name {
                "normal" => Some(V::Vector3(p.normal)),
                "d" => Some(V::Float(f64::from(p.d))),
                other => V::Vector3(p.normal).get_indexed(axis(other)?).ok(),
            },
            V::Color(c) if name.ends_with('8') => {
                let channel = c.get(as_index(axis(&name[..1])?)?)?;
                Some(V::Int(crate::math::Color::channel8(channel)))
            }
            V::Basis(b) => Some(V::Vector3(b.column(as_index(axis(name)?)?))),
            V::Transform2D(t) => match name {
                "origin" => Some(V::Vector2(t.columns[2])),
                other => t.columns.get(as_index(axis(other)?)?).copied().map(V::Vector2),
            },
            V::Transform3D(t) => match name {
                "basis" => Some(V::from(t.basis)),
                _ => Some(V::Vector3(t.origin)),
            },
            _ => self.get_indexed(axis(name)?).ok(),
        }
    }

    fn set_member(&mut self, name: &str, value: &Variant) -> bool {
        use Variant as V;
        if !is_member(self.get_type(), name) {
            return false;
        }
        let by_axis = matches!(
            self,
            V::Vector2(_)
                | V::Vector2i(_)
                | V::Vector3(_)
                | V::Vector3i(_)
                | V::Vector4(_)
                | V::Vector4i(_)
                | V::Quaternion(_)
                | V::Projection(_)
                | V::Color(_)
        );
        if by_axis && !name.ends_with('8') {
            return axis(name).is_some_and(|i| self.set_indexed(i, value).is_ok());
        }
        match (&mut *self, value) {
            (V::Rect2(r), V::Vector2(v)) => match name {
                "position" => r.position = *v,
                "size" => r.size = *v,
                _ => r.set_end(*v),
            },
            (V::Rect2i(r), V::Vector2i(v)) => match name {
                "position" => r.position = *v,
                "size" => r.size = *v,
                _ => r.set_end(*v),
            },
            (V::Aabb(r), V::Vector3(v)) => match name {
                "position" => r.position = *v,
                "size" => r.size = *v,
                _ => r.set_end(*v),
            },
            (V::Plane(p), V::Vector3(v)) if name == "normal" => p.normal = *v,
            (V::Plane(p), V::Int(_) | V::Float(_)) if name != "normal" => {
                let Ok(x) = real_value(value) else {
                    return false;
                };
                match axis(name).and_then(as_index) {
                    Some(i) => {
                        p.normal.set(i, x);
                    }
                    None => p.d = x,
                }
            }
            (V::Color(c), V::Int(_) | V::Float(_)) if name.ends_with('8') => {
                let Some(i) = axis(&name[..1]).and_then(as_index) else {
                    return false;
                };
                #[allow(clippy::cast_possible_truncation)]
                let channel = (value.to_float() / 255.0) as f32;
                c.set(i, channel);
            }
            (V::Basis(b), V::Vector3(v)) => {
                let Some(i) = axis(name).and_then(as_index) else {
                    return false;
                };
                b.set_column(i, *v);
            }
            (V::Transform2D(t), V::Vector2(v)) => {
                let i = axis(name).and_then(as_index).unwrap_or(2);
                t.columns[i] = *v;
            }
            (V::Transform3D(t), V::Basis(b)) if name == "basis" => t.basis = **b,
            (V::Transform3D(t), V::Vector3(v)) if name == "origin" => t.origin = *v,
            _ => return false,
        }
        true
    }

    /// Named member, Dictionary entry or Object property.
    pub fn get_named(&self, name: &StringName) -> Option<Variant> {
        match self {
            Variant::Dictionary(d) => d
                .get(&Variant::StringName(name.clone()))
                .or_else(|| d.get(&Variant::String(GString::from(name)))),
            Variant::Object(o) => o.get()?.get(name),
            _ => self.get_member(name.as_str()),
        }
    }

    pub fn set_named(&mut self, name: &StringName, value: &Variant) -> bool {
        match self {
            Variant::Dictionary(d) => d.set(Variant::StringName(name.clone()), value.clone()),
            Variant::Object(o) => o.get().is_some_and(|obj| obj.set(name, value)),
            _ => self.set_member(name.as_str(), value),
        }
    }

    /// Builtin member or Object property with this name exists.
    pub fn has_member(&self, name: &StringName) -> bool {
        match self {
            Variant::Object(o) => o.get().is_some_and(|obj| obj.get(name).is_some()),
            other => is_member(other.get_type(), name.as_str()),
        }
    }

    // -----------------------------------------------------------------------
    // Keyed
    // -----------------------------------------------------------------------

    pub fn get_keyed(&self, key: &Variant) -> Option<Variant> {
        match self {
            Variant::Dictionary(d) => d.get(key),
            Variant::Object(o) if key.as_text().is_some() => o.get()?.get(&key.to_string_name()),
            _ => None,
        }
    }

    pub fn set_keyed(&mut self, key: &Variant, value: &Variant) -> bool {
        match self {
            Variant::Dictionary(d) => d.set(key.clone(), value.clone()),
            Variant::Object(o) if key.as_text().is_some() => o
                .get()
                .is_some_and(|obj| obj.set(&key.to_string_name(), value)),
            _ => false,
        }
    }

    /// `None` when this kind has no keys.
    pub fn has_key(&self, key: &Variant) -> Option<bool> {
        match self {
            Variant::Dictionary(d) => Some(d.has(key)),
            Variant::Object(o) if key.as_text().is_some() => {
                let obj = o.get()?;
                Some(obj.get(&key.to_string_name()).is_some())
            }
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Bracket
    // -----------------------------------------------------------------------

    /// `self[key]`.
    pub fn get(&self, key: &Variant) -> Option<Variant> {
        match (self, key) {
            (Variant::Dictionary(_) | Variant::Object(_), _) => self.get_keyed(key),
            (_, Variant::Int(i)) => self.get_indexed(*i).ok(),
            (_, Variant::String(_) | Variant::StringName(_)) => {
                self.get_named(&key.to_string_name())
            }
            _ => None,
        }
    }

    /// `self[key] = value`.
    pub fn set(&mut self, key: &Variant, value: &Variant) -> bool {
        match key {
            _ if matches!(self, Variant::Dictionary(_) | Variant::Object(_)) => {
                self.set_keyed(key, value)
            }
            Variant::Int(i) => self.set_indexed(*i, value).is_ok(),
            Variant::String(_) | Variant::StringName(_) => {
                self.set_named(&key.to_string_name(), value)
            }
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Iteration
    // -----------------------------------------------------------------------

    /// Start iterating. `Some(false)` when empty, `None` when not iterable.
    pub fn iter_init(&self, iter: &mut Variant) -> Option<bool> {
        if let Some(range) = Range::of(self) {
            if range.step_is_zero() {
                return Some(false);
            }
            *iter = range.begin.clone();
            return Some(range.contains(iter));
        }
        match self {
            Variant::Dictionary(d) => match d.key_at(0) {
                Some(key) => {
                    *iter = key;
                    Some(true)
                }
                None => Some(false),
            },
            other => {
                let len = other.indexed_size().filter(|_| other.is_sequence())?;
                *iter = Variant::Int(0);
                Some(len > 0)
            }
        }
    }

    pub fn iter_next(&self, iter: &mut Variant) -> Option<bool> {
        if let Some(range) = Range::of(self) {
            *iter = super::evaluate(super::Operator::Add, iter, &range.step)?;
            return Some(range.contains(iter));
        }
        match self {
            Variant::Dictionary(d) => {
                let next = d.index_of(iter).and_then(|i| d.key_at(i + 1));
                match next {
                    Some(key) => {
                        *iter = key;
                        Some(true)
                    }
                    None => Some(false),
                }
            }
            other => {
                let len = other.indexed_size().filter(|_| other.is_sequence())?;
                let Variant::Int(i) = iter else {
                    return None;
                };
                *i += 1;
                Some(usize::try_from(*i).is_ok_and(|i| i < len))
            }
        }
    }

    pub fn iter_get(&self, iter: &Variant) -> Option<Variant> {
        if Range::of(self).is_some() || matches!(self, Variant::Dictionary(_)) {
            return Some(iter.clone());
        }
        match iter {
            Variant::Int(i) if self.is_sequence() => self.get_indexed(*i).ok(),
            _ => None,
        }
    }

    fn is_sequence(&self) -> bool {
        matches!(self, Variant::String(_) | Variant::Array(_)) || self.get_type().is_packed_array()
    }

    /// Rust iterator over the same protocol.
    pub fn iter(&self) -> IterState<'_> {
        IterState {
            target: self,
            cursor: Variant::Nil,
            phase: Phase::Start,
        }
    }
}

/// Numeric range described by a scalar or vector.
struct Range {
    begin: Variant,
    end: Variant,
    step: Variant,
}

impl Range {
    fn of(v: &Variant) -> Option<Range> {
        use Variant as V;
        let (begin, end, step) = match v {
            V::Int(n) => (V::Int(0), V::Int(*n), V::Int(1)),
            V::Float(f) => (V::Int(0), V::Float(*f), V::Int(1)),
            V::Vector2(r) => (V::from(r.x), V::from(r.y), V::Int(1)),
            V::Vector2i(r) => (V::from(r.x), V::from(r.y), V::Int(1)),
            V::Vector3(r) => (V::from(r.x), V::from(r.y), V::from(r.z)),
            V::Vector3i(r) => (V::from(r.x), V::from(r.y), V::from(r.z)),
            _ => return None,
        };
        Some(Range { begin, end, step })
    }

    fn step_is_zero(&self) -> bool {
        self.step.is_zero()
    }

    fn contains(&self, at: &Variant) -> bool {
        let descending = self.step.to_float() < 0.0;
        let op = if descending {
            super::Operator::Greater
        } else {
            super::Operator::Less
        };
        super::evaluate(op, at, &self.end).is_some_and(|r| r.booleanize())
    }
}

enum Phase {
    Start,
    Running,
    Done,
}

/// Iterator over a Variant using `iter_init` / `iter_next` / `iter_get`.
pub struct IterState<'a> {
    target: &'a Variant,
    cursor: Variant,
    phase: Phase,
}

impl Iterator for IterState<'_> {
    type Item = Variant;

    fn next(&mut self) -> Option<Variant> {
        let more = match self.phase {
            Phase::Start => self.target.iter_init(&mut self.cursor),
            Phase::Running => self.target.iter_next(&mut self.cursor),
            Phase::Done => return None,
        };
        if more == Some(true) {
            self.phase = Phase::Running;
            self.target.iter_get(&self.cursor)
        } else {
            self.phase = Phase::Done;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::dictionary::Dictionary;
    use crate::math::{Color, Rect2, Vector2i};

    #[test]
    fn vector_components_by_index_and_name() {
        let mut v = Variant::from(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(v.get_indexed(2), Ok(Variant::Float(3.0)));
        assert_eq!(v.get_indexed(3), Err(AccessError::OutOfBounds));
        assert_eq!(v.get_indexed(-1), Err(AccessError::OutOfBounds));
        assert!(v.set_named(&StringName::new("y"), &Variant::from(5)));
        assert_eq!(v.get_named(&StringName::new("y")), Some(Variant::Float(5.0)));
        assert_eq!(v.set_indexed(0, &Variant::from("x")), Err(AccessError::Invalid));
        assert!(v.has_member(&StringName::new("z")));
        assert!(!v.has_member(&StringName::new("w")));
    }

    #[test]
    fn rect_members() {
        let mut r = Variant::from(Rect2::new(Vector2::new(1.0, 1.0), Vector2::new(2.0, 3.0)));
        assert_eq!(
            r.get_named(&StringName::new("end")),
            Some(Variant::from(Vector2::new(3.0, 4.0)))
        );
        assert!(r.set_named(&StringName::new("end"), &Variant::from(Vector2::new(5.0, 5.0))));
        assert_eq!(
            r.get_named(&StringName::new("size")),
            Some(Variant::from(Vector2::new(4.0, 4.0)))
        );
        assert!(!r.set_named(&StringName::new("size"), &Variant::from(1)));
    }

    #[test]
    fn color_channels() {
        let c = Variant::from(Color::RED);
        assert_eq!(c.get_named(&StringName::new("r8")), Some(Variant::Int(255)));
        assert_eq!(c.get_named(&StringName::new("g")), Some(Variant::Float(0.0)));
    }

    #[test]
    fn sequences_accept_negative_indices() {
        let a = Variant::Array(vec![Variant::from(1), Variant::from(2)].into());
        assert_eq!(a.get_indexed(-1), Ok(Variant::Int(2)));
        assert_eq!(a.get_indexed(2), Err(AccessError::OutOfBounds));
        let mut s = Variant::from("abc");
        assert_eq!(s.get_indexed(-3), Ok(Variant::from("a")));
        s.set_indexed(1, &Variant::from("X")).unwrap();
        assert_eq!(s, Variant::from("aXc"));
    }

    #[test]
    fn read_only_array_rejects_indexed_set() {
        let arr = Array::from(vec![Variant::from(1)]);
        arr.set_read_only(true);
        let mut v = Variant::Array(arr);
        assert_eq!(v.set_indexed(0, &Variant::from(2)), Err(AccessError::Invalid));
    }

    #[test]
    fn keyed_access_on_dictionaries() {
        let mut d = Variant::Dictionary(Dictionary::new());
        assert!(d.set(&Variant::from("k"), &Variant::from(1)));
        assert_eq!(d.get(&Variant::from("k")), Some(Variant::Int(1)));
        assert_eq!(d.has_key(&Variant::from("k")), Some(true));
        assert_eq!(d.has_key(&Variant::from("missing")), Some(false));
        assert_eq!(Variant::from(1).has_key(&Variant::from("k")), None);
    }

    #[test]
    fn iterate_ranges() {
        let items: Vec<Variant> = Variant::from(3).iter().collect();
        assert_eq!(items, vec![Variant::Int(0), Variant::Int(1), Variant::Int(2)]);
        let down: Vec<Variant> = Variant::from(crate::math::Vector3i::new(5, 0, -2)).iter().collect();
        assert_eq!(down, vec![Variant::Int(5), Variant::Int(3), Variant::Int(1)]);
        assert_eq!(Variant::from(Vector2i::new(2, 2)).iter().count(), 0);
        assert_eq!(Variant::from(crate::math::Vector3i::new(0, 5, 0)).iter().count(), 0);
    }

    #[test]
    fn iterate_containers() {
        let d = Dictionary::new();
        d.set(Variant::from("a"), Variant::from(1));
        d.set(Variant::from("b"), Variant::from(2));
        let keys: Vec<Variant> = Variant::Dictionary(d).iter().collect();
        assert_eq!(keys, vec![Variant::from("a"), Variant::from("b")]);

        let chars: Vec<Variant> = Variant::from("hi").iter().collect();
        assert_eq!(chars, vec![Variant::from("h"), Variant::from("i")]);

        let mut cursor = Variant::Nil;
        assert_eq!(Variant::from(true).iter_init(&mut cursor), None);
        assert_eq!(Variant::Array(Array::new()).iter_init(&mut cursor), Some(false));
    }
}
