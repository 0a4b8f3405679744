// The operator table.
//
// `evaluate(op, a, b)` returns `None` for combinations the engine does not
// define (including integer division by zero); it never panics. Unary
// operators ignore `b`. Integer arithmetic wraps.
//
// Comparison is built on one helper, `ordering`, which distinguishes
// "these kinds do not compare" (`None`) from "comparable but unordered"
// (`Some(None)`, NaN).

use std::cmp::Ordering;

use super::{Variant, VariantType};
use crate::array::Array;
use crate::math::{Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i};
use crate::string::GString;

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal = 0,
    NotEqual = 1,
    Less = 2,
    LessEqual = 3,
    Greater = 4,
    GreaterEqual = 5,
    Add = 6,
    Subtract = 7,
    Multiply = 8,
    Divide = 9,
    Negate = 10,
    Positive = 11,
    Module = 12,
    Power = 13,
    ShiftLeft = 14,
    ShiftRight = 15,
    BitAnd = 16,
    BitOr = 17,
    BitXor = 18,
    BitNegate = 19,
    And = 20,
    Or = 21,
    Xor = 22,
    Not = 23,
    In = 24,
}

impl Operator {
    pub const ALL: [Operator; 25] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::Less,
        Operator::LessEqual,
        Operator::Greater,
        Operator::GreaterEqual,
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
        Operator::Negate,
        Operator::Positive,
        Operator::Module,
        Operator::Power,
        Operator::ShiftLeft,
        Operator::ShiftRight,
        Operator::BitAnd,
        Operator::BitOr,
        Operator::BitXor,
        Operator::BitNegate,
        Operator::And,
        Operator::Or,
        Operator::Xor,
        Operator::Not,
        Operator::In,
    ];

    pub fn from_raw(raw: u32) -> Option<Operator> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Operator::Negate | Operator::Positive | Operator::BitNegate | Operator::Not
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Negate => "unary-",
            Operator::Positive => "unary+",
            Operator::Module => "%",
            Operator::Power => "**",
            Operator::ShiftLeft => "<<",
            Operator::ShiftRight => ">>",
            Operator::BitAnd => "&",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::BitNegate => "~",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Xor => "xor",
            Operator::Not => "not",
            Operator::In => "in",
        }
    }
}

fn number(v: &Variant) -> Option<f64> {
    match v {
        Variant::Int(i) => Some(*i as f64),
        Variant::Float(f) => Some(*f),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn real(v: &Variant) -> Option<f32> {
    number(v).map(|f| f as f32)
}

fn int_scalar(v: &Variant) -> Option<i32> {
    match v {
        Variant::Int(i) => i32::try_from(*i).ok(),
        _ => None,
    }
}

/// `None`: kinds do not compare. `Some(None)`: unordered (NaN).
fn ordering(a: &Variant, b: &Variant) -> Option<Option<Ordering>> {
    use Variant as V;
    let ord = match (a, b) {
        (V::Int(x), V::Int(y)) => Some(x.cmp(y)),
        (V::Bool(x), V::Bool(y)) => Some(x.cmp(y)),
        (V::Int(_) | V::Float(_), V::Int(_) | V::Float(_)) => {
            number(a)?.partial_cmp(&number(b)?)
        }
        (V::String(_) | V::StringName(_), V::String(_) | V::StringName(_)) => {
            Some(a.as_text()?.cmp(&b.as_text()?))
        }
        (V::Vector2(x), V::Vector2(y)) => x.partial_cmp(y),
        (V::Vector2i(x), V::Vector2i(y)) => x.partial_cmp(y),
        (V::Vector3(x), V::Vector3(y)) => x.partial_cmp(y),
        (V::Vector3i(x), V::Vector3i(y)) => x.partial_cmp(y),
        (V::Vector4(x), V::Vector4(y)) => x.partial_cmp(y),
        (V::Vector4i(x), V::Vector4i(y)) => x.partial_cmp(y),
        (V::Rid(x), V::Rid(y)) => Some(x.cmp(y)),
        (V::Object(x), V::Object(y)) => Some(x.id.cmp(&y.id)),
        (V::Array(x), V::Array(y)) => return array_ordering(x, y),
        _ => return None,
    };
    Some(ord)
}

fn array_ordering(a: &Array, b: &Array) -> Option<Option<Ordering>> {
    let (a, b) = (a.to_vec(), b.to_vec());
    for (x, y) in a.iter().zip(b.iter()) {
        match ordering(x, y)? {
            Some(Ordering::Equal) => continue,
            other => return Some(other),
        }
    }
    Some(Some(a.len().cmp(&b.len())))
}

fn equality(a: &Variant, b: &Variant) -> Option<bool> {
    use Variant as V;
    match (a, b) {
        (V::Nil, V::Nil) => Some(true),
        (V::Nil, V::Object(o)) | (V::Object(o), V::Nil) => Some(o.get().is_none()),
        (V::Nil, _) | (_, V::Nil) => Some(false),
        (V::Int(_) | V::Float(_), V::Int(_) | V::Float(_)) if a.get_type() != b.get_type() => {
            Some(number(a)? == number(b)?)
        }
        (V::String(_) | V::StringName(_), V::String(_) | V::StringName(_)) => {
            Some(a.as_text()? == b.as_text()?)
        }
        _ if a.get_type() == b.get_type() => Some(a == b),
        _ => None,
    }
}

macro_rules! arith_same {
    ($op:tt, $a:expr, $b:expr; $($kind:ident),*) => {
        match ($a, $b) {
            $((Variant::$kind(x), Variant::$kind(y)) => Some(Variant::$kind(*x $op *y)),)*
            _ => None,
        }
    };
}

fn add(a: &Variant, b: &Variant) -> Option<Variant> {
    use Variant as V;
    match (a, b) {
        (V::Int(x), V::Int(y)) => Some(V::Int(x.wrapping_add(*y))),
        (V::Int(_) | V::Float(_), V::Int(_) | V::Float(_)) => {
            Some(V::Float(number(a)? + number(b)?))
        }
        (V::String(_) | V::StringName(_), V::String(_) | V::StringName(_)) => {
            Some(V::String(GString::from(a.as_text()? + &b.as_text()?)))
        }
        (V::Array(x), V::Array(y)) => {
            let mut items = x.to_vec();
            items.extend(y.to_vec());
            Some(V::Array(Array::from(items)))
        }
        (V::PackedByteArray(x), V::PackedByteArray(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedByteArray(out))
        }
        (V::PackedInt32Array(x), V::PackedInt32Array(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedInt32Array(out))
        }
        (V::PackedInt64Array(x), V::PackedInt64Array(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedInt64Array(out))
        }
        (V::PackedFloat32Array(x), V::PackedFloat32Array(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedFloat32Array(out))
        }
        (V::PackedFloat64Array(x), V::PackedFloat64Array(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedFloat64Array(out))
        }
        (V::PackedStringArray(x), V::PackedStringArray(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedStringArray(out))
        }
        (V::PackedVector2Array(x), V::PackedVector2Array(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedVector2Array(out))
        }
        (V::PackedVector3Array(x), V::PackedVector3Array(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedVector3Array(out))
        }
        (V::PackedColorArray(x), V::PackedColorArray(y)) => {
            let mut out = x.clone();
            out.append_array(y);
            Some(V::PackedColorArray(out))
        }
        _ => arith_same!(+, a, b; Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i, Color, Quaternion),
    }
}

fn subtract(a: &Variant, b: &Variant) -> Option<Variant> {
    use Variant as V;
    match (a, b) {
        (V::Int(x), V::Int(y)) => Some(V::Int(x.wrapping_sub(*y))),
        (V::Int(_) | V::Float(_), V::Int(_) | V::Float(_)) => {
            Some(V::Float(number(a)? - number(b)?))
        }
        _ => arith_same!(-, a, b; Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i, Color, Quaternion),
    }
}

fn multiply(a: &Variant, b: &Variant) -> Option<Variant> {
    use Variant as V;
    let out = match (a, b) {
        (V::Int(x), V::Int(y)) => V::Int(x.wrapping_mul(*y)),
        (V::Int(_) | V::Float(_), V::Int(_) | V::Float(_)) => V::Float(number(a)? * number(b)?),
        (V::Vector2(v), s @ (V::Int(_) | V::Float(_))) | (s @ (V::Int(_) | V::Float(_)), V::Vector2(v)) => {
            V::Vector2(*v * real(s)?)
        }
        (V::Vector3(v), s @ (V::Int(_) | V::Float(_))) | (s @ (V::Int(_) | V::Float(_)), V::Vector3(v)) => {
            V::Vector3(*v * real(s)?)
        }
        (V::Vector4(v), s @ (V::Int(_) | V::Float(_))) | (s @ (V::Int(_) | V::Float(_)), V::Vector4(v)) => {
            V::Vector4(*v * real(s)?)
        }
        (V::Vector2i(v), s @ V::Int(_)) | (s @ V::Int(_), V::Vector2i(v)) => V::Vector2i(*v * int_scalar(s)?),
        (V::Vector3i(v), s @ V::Int(_)) | (s @ V::Int(_), V::Vector3i(v)) => V::Vector3i(*v * int_scalar(s)?),
        (V::Vector4i(v), s @ V::Int(_)) | (s @ V::Int(_), V::Vector4i(v)) => V::Vector4i(*v * int_scalar(s)?),
        (V::Color(c), s @ (V::Int(_) | V::Float(_))) | (s @ (V::Int(_) | V::Float(_)), V::Color(c)) => {
            V::Color(*c * real(s)?)
        }
        (V::Quaternion(q), s @ (V::Int(_) | V::Float(_))) => V::Quaternion(*q * real(s)?),
        (V::Quaternion(q), V::Vector3(v)) => V::Vector3(q.xform(*v)),
        (V::Transform2D(x), V::Transform2D(y)) => V::from(**x * **y),
        (V::Transform2D(t), V::Vector2(v)) => V::Vector2(t.xform(*v)),
        (V::Basis(x), V::Basis(y)) => V::from(**x * **y),
        (V::Basis(m), V::Vector3(v)) => V::Vector3(m.xform(*v)),
        (V::Transform3D(x), V::Transform3D(y)) => V::from(**x * **y),
        (V::Transform3D(t), V::Vector3(v)) => V::Vector3(t.xform(*v)),
        (V::Projection(p), V::Vector4(v)) => V::Vector4(p.xform(*v)),
        _ => {
            return arith_same!(*, a, b; Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i, Color, Quaternion);
        }
    };
    Some(out)
}

fn divide(a: &Variant, b: &Variant) -> Option<Variant> {
    use Variant as V;
    let out = match (a, b) {
        (V::Int(x), V::Int(y)) => V::Int(x.checked_div(*y)?),
        (V::Int(_) | V::Float(_), V::Int(_) | V::Float(_)) => V::Float(number(a)? / number(b)?),
        (V::Vector2(v), s @ (V::Int(_) | V::Float(_))) => V::Vector2(*v / real(s)?),
        (V::Vector3(v), s @ (V::Int(_) | V::Float(_))) => V::Vector3(*v / real(s)?),
        (V::Vector4(v), s @ (V::Int(_) | V::Float(_))) => V::Vector4(*v / real(s)?),
        (V::Vector2i(v), s @ V::Int(_)) => V::Vector2i(*v / int_scalar(s)?),
        (V::Vector3i(v), s @ V::Int(_)) => V::Vector3i(*v / int_scalar(s)?),
        (V::Vector4i(v), s @ V::Int(_)) => V::Vector4i(*v / int_scalar(s)?),
        (V::Color(c), s @ (V::Int(_) | V::Float(_))) => V::Color(*c / real(s)?),
        (V::Quaternion(q), s @ (V::Int(_) | V::Float(_))) => V::Quaternion(*q / real(s)?),
        _ => return arith_same!(/, a, b; Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i, Color),
    };
    Some(out)
}

fn module(a: &Variant, b: &Variant) -> Option<Variant> {
    use Variant as V;
    let out = match (a, b) {
        (V::Int(x), V::Int(y)) => V::Int(x.checked_rem(*y)?),
        (V::Vector2i(v), V::Vector2i(w)) => V::Vector2i(*v % *w),
        (V::Vector3i(v), V::Vector3i(w)) => V::Vector3i(*v % *w),
        (V::Vector4i(v), V::Vector4i(w)) => V::Vector4i(*v % *w),
        (V::Vector2i(v), s @ V::Int(_)) => V::Vector2i(*v % int_scalar(s)?),
        (V::Vector3i(v), s @ V::Int(_)) => V::Vector3i(*v % int_scalar(s)?),
        (V::Vector4i(v), s @ V::Int(_)) => V::Vector4i(*v % int_scalar(s)?),
        _ => return None,
    };
    Some(out)
}

fn power(a: &Variant, b: &Variant) -> Option<Variant> {
    use Variant as V;
    match (a, b) {
        (V::Int(x), V::Int(y)) => {
            let exp = u32::try_from(*y).ok()?;
            Some(V::Int(x.wrapping_pow(exp)))
        }
        (V::Int(_) | V::Float(_), V::Int(_) | V::Float(_)) => {
            Some(V::Float(number(a)?.powf(number(b)?)))
        }
        _ => None,
    }
}

fn bitwise(op: Operator, a: &Variant, b: &Variant) -> Option<Variant> {
    let (Variant::Int(x), Variant::Int(y)) = (a, b) else {
        return None;
    };
    let out = match op {
        Operator::ShiftLeft => x.checked_shl(u32::try_from(*y).ok()?)?,
        Operator::ShiftRight => x.checked_shr(u32::try_from(*y).ok()?)?,
        Operator::BitAnd => x & y,
        Operator::BitOr => x | y,
        Operator::BitXor => x ^ y,
        _ => return None,
    };
    Some(Variant::Int(out))
}

fn negate(a: &Variant) -> Option<Variant> {
    use Variant as V;
    let out = match a {
        V::Int(i) => V::Int(i.wrapping_neg()),
        V::Float(f) => V::Float(-f),
        V::Vector2(v) => V::Vector2(-*v),
        V::Vector2i(v) => V::Vector2i(-*v),
        V::Vector3(v) => V::Vector3(-*v),
        V::Vector3i(v) => V::Vector3i(-*v),
        V::Vector4(v) => V::Vector4(-*v),
        V::Vector4i(v) => V::Vector4i(-*v),
        V::Plane(p) => V::Plane(-*p),
        V::Quaternion(q) => V::Quaternion(-*q),
        V::Color(c) => V::Color(-*c),
        _ => return None,
    };
    Some(out)
}

fn positive(a: &Variant) -> Option<Variant> {
    match a.get_type() {
        VariantType::Int
        | VariantType::Float
        | VariantType::Vector2
        | VariantType::Vector2i
        | VariantType::Vector3
        | VariantType::Vector3i
        | VariantType::Vector4
        | VariantType::Vector4i
        | VariantType::Plane
        | VariantType::Quaternion
        | VariantType::Color => Some(a.clone()),
        _ => None,
    }
}

fn contains(needle: &Variant, haystack: &Variant) -> Option<bool> {
    use Variant as V;
    let found = match haystack {
        V::Array(a) => a.to_vec().iter().any(|e| e.hash_compare(needle)),
        V::Dictionary(d) => d.has(needle),
        V::String(_) | V::StringName(_) => {
            let text = needle.as_text()?;
            haystack.as_text()?.contains(&text)
        }
        V::PackedByteArray(_)
        | V::PackedInt32Array(_)
        | V::PackedInt64Array(_)
        | V::PackedFloat32Array(_)
        | V::PackedFloat64Array(_)
        | V::PackedStringArray(_)
        | V::PackedVector2Array(_)
        | V::PackedVector3Array(_)
        | V::PackedColorArray(_) => {
            let items = haystack.convert(VariantType::Array).ok()?;
            items.as_array()?.to_vec().iter().any(|e| e.hash_compare(needle))
        }
        _ => return None,
    };
    Some(found)
}

/// Apply `op`. `None` when the operand kinds do not support it.
pub fn evaluate(op: Operator, a: &Variant, b: &Variant) -> Option<Variant> {
    use Operator as O;
    match op {
        O::Equal => equality(a, b).map(Variant::Bool),
        O::NotEqual => equality(a, b).map(|e| Variant::Bool(!e)),
        O::Less => ordering(a, b).map(|o| Variant::Bool(o == Some(Ordering::Less))),
        O::LessEqual => ordering(a, b)
            .map(|o| Variant::Bool(matches!(o, Some(Ordering::Less | Ordering::Equal)))),
        O::Greater => ordering(a, b).map(|o| Variant::Bool(o == Some(Ordering::Greater))),
        O::GreaterEqual => ordering(a, b)
            .map(|o| Variant::Bool(matches!(o, Some(Ordering::Greater | Ordering::Equal)))),
        O::Add => add(a, b),
        O::Subtract => subtract(a, b),
        O::Multiply => multiply(a, b),
        O::Divide => divide(a, b),
        O::Module => module(a, b),
        O::Power => power(a, b),
        O::ShiftLeft | O::ShiftRight | O::BitAnd | O::BitOr | O::BitXor => bitwise(op, a, b),
        O::Negate => negate(a),
        O::Positive => positive(a),
        O::BitNegate => match a {
            Variant::Int(i) => Some(Variant::Int(!i)),
            _ => None,
        },
        O::And => Some(Variant::Bool(a.booleanize() && b.booleanize())),
        O::Or => Some(Variant::Bool(a.booleanize() || b.booleanize())),
        O::Xor => Some(Variant::Bool(a.booleanize() != b.booleanize())),
        O::Not => Some(Variant::Bool(!a.booleanize())),
        O::In => contains(a, b).map(Variant::Bool),
    }
}

/// A value of `ty` that is a valid right-hand operand for every operator
/// the kind supports (non-zero for division).
fn sample(ty: VariantType) -> Variant {
    match ty {
        VariantType::Int => Variant::Int(1),
        VariantType::Float => Variant::Float(1.0),
        VariantType::Vector2 => Variant::Vector2(Vector2::ONE),
        VariantType::Vector2i => Variant::Vector2i(Vector2i::ONE),
        VariantType::Vector3 => Variant::Vector3(Vector3::ONE),
        VariantType::Vector3i => Variant::Vector3i(Vector3i::ONE),
        VariantType::Vector4 => Variant::Vector4(Vector4::ONE),
        VariantType::Vector4i => Variant::Vector4i(Vector4i::ONE),
        other => Variant::default_of(other),
    }
}

/// Result kind of `a op b`, or `None` when the operator is undefined for
/// these kinds. Unary operators take `b == Nil`.
pub fn operator_result_type(op: Operator, a: VariantType, b: VariantType) -> Option<VariantType> {
    if op.is_unary() && b != VariantType::Nil {
        return None;
    }
    evaluate(op, &sample(a), &sample(b)).map(|v| v.get_type())
}

// ---------------------------------------------------------------------------
// Animation helpers
// ---------------------------------------------------------------------------

/// `a - b` when both have the same kind and subtract; `Nil` otherwise.
pub fn sub(a: &Variant, b: &Variant) -> Variant {
    if a.get_type() != b.get_type() {
        return Variant::Nil;
    }
    evaluate(Operator::Subtract, a, b).unwrap_or_default()
}

fn scaled_sum(a: &Variant, b: &Variant, c: f64) -> Option<Variant> {
    let scaled = evaluate(Operator::Multiply, b, &Variant::Float(c))?;
    let sum = evaluate(Operator::Add, a, &scaled)?;
    sum.convert(a.get_type()).ok()
}

/// `a + b * c`, keeping the kind of `a`. Kinds without arithmetic return `a`.
pub fn blend(a: &Variant, b: &Variant, c: f32) -> Variant {
    let c = f64::from(c);
    match (a, b) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        (Variant::Int(x), Variant::Int(y)) => {
            Variant::Int(x.wrapping_add((*y as f64 * c).round() as i64))
        }
        (Variant::Float(x), Variant::Float(y)) => Variant::Float(x + y * c),
        _ if a.get_type() == b.get_type() => scaled_sum(a, b, c).unwrap_or_else(|| a.clone()),
        _ => a.clone(),
    }
}

/// Interpolate from `a` towards `b` by `c`. Numbers of mixed kinds
/// interpolate as floats; kinds without arithmetic step at `c = 0.5`.
pub fn interpolate(a: &Variant, b: &Variant, c: f64) -> Variant {
    let step = || if c < 0.5 { a.clone() } else { b.clone() };
    match (a, b) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        (Variant::Int(x), Variant::Int(y)) => {
            let delta = y.wrapping_sub(*x) as f64;
            Variant::Int(x.wrapping_add((delta * c).round() as i64))
        }
        (Variant::Int(_) | Variant::Float(_), Variant::Int(_) | Variant::Float(_)) => {
            let (x, y) = (a.to_float(), b.to_float());
            Variant::Float(x + (y - x) * c)
        }
        (Variant::Rect2(x), Variant::Rect2(y)) => {
            #[allow(clippy::cast_possible_truncation)]
            let w = c as f32;
            Variant::Rect2(crate::math::Rect2::new(
                x.position.lerp(y.position, w),
                x.size.lerp(y.size, w),
            ))
        }
        (Variant::Aabb(x), Variant::Aabb(y)) => {
            #[allow(clippy::cast_possible_truncation)]
            let w = c as f32;
            Variant::from(crate::math::Aabb::new(
                x.position.lerp(y.position, w),
                x.size.lerp(y.size, w),
            ))
        }
        (Variant::Bool(_) | Variant::Object(_) | Variant::String(_), _) => step(),
        _ if a.get_type() == b.get_type() => {
            let delta = evaluate(Operator::Subtract, b, a);
            delta
                .and_then(|d| scaled_sum(a, &d, c))
                .unwrap_or_else(step)
        }
        _ => step(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::StringName;

    fn eval(op: Operator, a: impl Into<Variant>, b: impl Into<Variant>) -> Option<Variant> {
        evaluate(op, &a.into(), &b.into())
    }

    #[test]
    fn integer_arithmetic_wraps_and_rejects_zero_division() {
        assert_eq!(eval(Operator::Add, i64::MAX, 1), Some(Variant::Int(i64::MIN)));
        assert_eq!(eval(Operator::Divide, 7, 2), Some(Variant::Int(3)));
        assert_eq!(eval(Operator::Divide, 1, 0), None);
        assert_eq!(eval(Operator::Module, 1, 0), None);
        assert_eq!(eval(Operator::Divide, 1.0, 0), Some(Variant::Float(f64::INFINITY)));
    }

    #[test]
    fn mixed_numeric_promotes_to_float() {
        assert_eq!(eval(Operator::Add, 1, 0.5), Some(Variant::Float(1.5)));
        assert_eq!(eval(Operator::Equal, 1, 1.0), Some(Variant::Bool(true)));
        assert_eq!(eval(Operator::Less, 1, 1.5), Some(Variant::Bool(true)));
    }

    #[test]
    fn invalid_combinations_are_none() {
        assert_eq!(eval(Operator::Add, 1, "a"), None);
        assert_eq!(eval(Operator::Less, 1, "a"), None);
        assert_eq!(eval(Operator::Equal, 1, "a"), None);
        assert_eq!(eval(Operator::ShiftLeft, 1, -1), None);
    }

    #[test]
    fn nan_is_unordered() {
        assert_eq!(eval(Operator::Less, f64::NAN, 1.0), Some(Variant::Bool(false)));
        assert_eq!(eval(Operator::GreaterEqual, f64::NAN, 1.0), Some(Variant::Bool(false)));
        assert_eq!(eval(Operator::Equal, f64::NAN, f64::NAN), Some(Variant::Bool(false)));
    }

    #[test]
    fn strings_and_names_mix() {
        let name = Variant::StringName(StringName::new("ab"));
        assert_eq!(evaluate(Operator::Equal, &Variant::from("ab"), &name), Some(Variant::Bool(true)));
        assert_eq!(
            evaluate(Operator::Add, &Variant::from("a"), &Variant::from("b")),
            Some(Variant::from("ab"))
        );
        assert_eq!(eval(Operator::In, "b", "abc"), Some(Variant::Bool(true)));
    }

    #[test]
    fn nil_compares_equal_only_to_nil_or_null_object() {
        assert_eq!(evaluate(Operator::Equal, &Variant::Nil, &Variant::Nil), Some(Variant::Bool(true)));
        assert_eq!(evaluate(Operator::Equal, &Variant::Nil, &Variant::from(0)), Some(Variant::Bool(false)));
        let null = Variant::default_of(VariantType::Object);
        assert_eq!(evaluate(Operator::Equal, &Variant::Nil, &null), Some(Variant::Bool(true)));
    }

    #[test]
    fn vectors_and_scalars() {
        let v = Variant::from(Vector2::new(1.0, 2.0));
        assert_eq!(
            evaluate(Operator::Multiply, &v, &Variant::from(2)),
            Some(Variant::from(Vector2::new(2.0, 4.0)))
        );
        assert_eq!(
            evaluate(Operator::Negate, &v, &Variant::Nil),
            Some(Variant::from(Vector2::new(-1.0, -2.0)))
        );
    }

    #[test]
    fn arrays_concatenate_and_compare() {
        let a = Variant::Array(vec![Variant::from(1)].into());
        let b = Variant::Array(vec![Variant::from(2)].into());
        let sum = evaluate(Operator::Add, &a, &b).unwrap();
        assert_eq!(sum.as_array().unwrap().len(), 2);
        assert_eq!(evaluate(Operator::Less, &a, &b), Some(Variant::Bool(true)));
        assert_eq!(evaluate(Operator::In, &Variant::from(2), &b), Some(Variant::Bool(true)));
    }

    #[test]
    fn result_types() {
        use VariantType as T;
        assert_eq!(operator_result_type(Operator::Divide, T::Int, T::Int), Some(T::Int));
        assert_eq!(operator_result_type(Operator::Add, T::Int, T::Float), Some(T::Float));
        assert_eq!(operator_result_type(Operator::Less, T::String, T::String), Some(T::Bool));
        assert_eq!(operator_result_type(Operator::Add, T::Int, T::String), None);
        assert_eq!(operator_result_type(Operator::Negate, T::Int, T::Nil), Some(T::Int));
        assert_eq!(operator_result_type(Operator::Negate, T::Int, T::Int), None);
    }

    #[test]
    fn sub_blend_interpolate() {
        assert_eq!(sub(&Variant::from(5), &Variant::from(3)), Variant::Int(2));
        assert_eq!(sub(&Variant::from(5), &Variant::from(3.0)), Variant::Nil);
        assert_eq!(blend(&Variant::from(1), &Variant::from(4), 0.5), Variant::Int(3));
        assert_eq!(
            blend(&Variant::from(Vector2::ZERO), &Variant::from(Vector2::ONE), 0.5),
            Variant::from(Vector2::new(0.5, 0.5))
        );
        assert_eq!(interpolate(&Variant::from(0), &Variant::from(10), 0.25), Variant::Int(3));
        assert_eq!(
            interpolate(&Variant::from(0), &Variant::from(1.0), 0.5),
            Variant::Float(0.5)
        );
        assert_eq!(
            interpolate(&Variant::from("a"), &Variant::from("b"), 0.7),
            Variant::from("b")
        );
    }
}
