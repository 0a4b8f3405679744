// Kind-to-kind conversion.
//
// Two tables answer "may a value of kind A become kind B":
// - `can_convert` is the permissive table used by dynamic calls. Anything
//   but an object can become a String, numbers and strings convert freely.
// - `can_convert_strict` is the table used for typed containers and
//   argument validation. It drops the lossy string-to-number and
//   anything-to-string paths but keeps numeric narrowing (FLOAT to INT) and
//   the string family (String, StringName, NodePath).
//
// `convert` performs the conversion; it succeeds for every pair the
// permissive table allows, except packed arrays built from an Array with
// unconvertible elements.

use thiserror::Error;

use super::{Variant, VariantType};
use crate::array::Array;
use crate::math::{
    Basis, Color, Projection, Quaternion, Rect2, Rect2i, Transform2D, Transform3D, Vector2,
    Vector2i, Vector3, Vector3i, Vector4i,
};
use crate::object::ObjectRef;
use crate::packed::{PackedArray, PackedElement};
use crate::string::{GString, NodePath};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("cannot convert {from} to {to}")]
    Unsupported { from: VariantType, to: VariantType },
    #[error("element {index} cannot be stored in {to}")]
    Element { index: usize, to: VariantType },
}

fn pairs_shared(from: VariantType, to: VariantType) -> bool {
    use VariantType as T;
    match to {
        T::Bool | T::Int | T::Float => matches!(from, T::Bool | T::Int | T::Float),
        T::StringName => matches!(from, T::String),
        T::NodePath => matches!(from, T::String | T::StringName),
        T::String => matches!(from, T::StringName | T::NodePath),
        T::Vector2 => from == T::Vector2i,
        T::Vector2i => from == T::Vector2,
        T::Vector3 => from == T::Vector3i,
        T::Vector3i => from == T::Vector3,
        T::Vector4 => from == T::Vector4i,
        T::Vector4i => from == T::Vector4,
        T::Rect2 => from == T::Rect2i,
        T::Rect2i => from == T::Rect2,
        T::Transform2D => from == T::Transform3D,
        T::Transform3D => matches!(
            from,
            T::Transform2D | T::Quaternion | T::Basis | T::Projection
        ),
        T::Basis => from == T::Quaternion,
        T::Quaternion => from == T::Basis,
        T::Projection => from == T::Transform3D,
        T::Color => matches!(from, T::String | T::Int),
        T::Object => from == T::Nil,
        T::Array => from.is_packed_array(),
        t if t.is_packed_array() => from == T::Array,
        _ => false,
    }
}

impl Variant {
    /// Permissive conversion table.
    pub fn can_convert(from: VariantType, to: VariantType) -> bool {
        use VariantType as T;
        if from == to || to == T::Nil {
            return true;
        }
        if from == T::Nil {
            return to == T::Object;
        }
        match to {
            T::String => from != T::Object,
            T::Bool | T::Int | T::Float => {
                matches!(from, T::Bool | T::Int | T::Float | T::String | T::StringName)
            }
            _ => pairs_shared(from, to),
        }
    }

    /// Strict conversion table: no string/number crossings, no stringify.
    pub fn can_convert_strict(from: VariantType, to: VariantType) -> bool {
        if from == to {
            return true;
        }
        if to == VariantType::Nil {
            return from == VariantType::Nil;
        }
        pairs_shared(from, to)
    }

    /// Convert to `to` following the permissive table.
    pub fn convert(&self, to: VariantType) -> Result<Variant, ConvertError> {
        use VariantType as T;
        let from = self.get_type();
        let unsupported = ConvertError::Unsupported { from, to };
        if from == to {
            return Ok(self.clone());
        }
        if !Self::can_convert(from, to) {
            return Err(unsupported);
        }
        let out = match (to, self) {
            (T::Nil, _) => Variant::Nil,
            (T::Bool, v) => Variant::Bool(v.to_bool()),
            (T::Int, v) => Variant::Int(v.to_int()),
            (T::Float, v) => Variant::Float(v.to_float()),
            (T::String, v) => Variant::String(v.to_gstring()),
            (T::StringName, v) => Variant::StringName(v.to_string_name()),
            (T::NodePath, v) => Variant::NodePath(NodePath::parse(&v.stringify())),
            (T::Vector2, Variant::Vector2i(v)) => Variant::Vector2(v.to_real()),
            (T::Vector2i, Variant::Vector2(v)) => Variant::Vector2i(Vector2i::from_real(*v)),
            (T::Vector3, Variant::Vector3i(v)) => Variant::Vector3(v.to_real()),
            (T::Vector3i, Variant::Vector3(v)) => Variant::Vector3i(Vector3i::from_real(*v)),
            (T::Vector4, Variant::Vector4i(v)) => Variant::Vector4(v.to_real()),
            (T::Vector4i, Variant::Vector4(v)) => Variant::Vector4i(Vector4i::from_real(*v)),
            (T::Rect2, Variant::Rect2i(r)) => {
                Variant::Rect2(Rect2::new(r.position.to_real(), r.size.to_real()))
            }
            (T::Rect2i, Variant::Rect2(r)) => Variant::Rect2i(Rect2i::new(
                Vector2i::from_real(r.position),
                Vector2i::from_real(r.size),
            )),
            (T::Transform2D, Variant::Transform3D(t)) => {
                Variant::from(Transform2D::from_transform3d(t))
            }
            (T::Transform3D, Variant::Transform2D(t)) => {
                Variant::from(Transform3D::from_transform2d(t))
            }
            (T::Transform3D, Variant::Quaternion(q)) => {
                Variant::from(Transform3D::new(Basis::from_quaternion(*q), Vector3::ZERO))
            }
            (T::Transform3D, Variant::Basis(b)) => {
                Variant::from(Transform3D::new(**b, Vector3::ZERO))
            }
            (T::Transform3D, Variant::Projection(p)) => {
                Variant::from(Transform3D::from_projection(p))
            }
            (T::Basis, Variant::Quaternion(q)) => Variant::from(Basis::from_quaternion(*q)),
            (T::Quaternion, Variant::Basis(b)) => Variant::from(Quaternion::from_basis(b)),
            (T::Projection, Variant::Transform3D(t)) => {
                Variant::from(Projection::from_transform3d(t))
            }
            (T::Color, Variant::String(s)) => {
                Variant::Color(Color::from_html(&s.to_string()).ok_or(unsupported)?)
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            (T::Color, Variant::Int(i)) => Variant::Color(Color::from_rgba32(*i as u32)),
            (T::Object, _) => Variant::Object(ObjectRef::null()),
            (T::Array, v) => Variant::Array(packed_to_array(v).ok_or(unsupported)?),
            (t, Variant::Array(a)) => array_to_packed(a, t)?,
            _ => return Err(unsupported),
        };
        Ok(out)
    }

    /// Convert only when the strict table allows it.
    pub fn convert_strict(&self, to: VariantType) -> Result<Variant, ConvertError> {
        if !Self::can_convert_strict(self.get_type(), to) {
            return Err(ConvertError::Unsupported {
                from: self.get_type(),
                to,
            });
        }
        self.convert(to)
    }
}

fn packed_to_array(v: &Variant) -> Option<Array> {
    let items = match v {
        Variant::PackedByteArray(a) => a.to_variant_vec(),
        Variant::PackedInt32Array(a) => a.to_variant_vec(),
        Variant::PackedInt64Array(a) => a.to_variant_vec(),
        Variant::PackedFloat32Array(a) => a.to_variant_vec(),
        Variant::PackedFloat64Array(a) => a.to_variant_vec(),
        Variant::PackedStringArray(a) => a.to_variant_vec(),
        Variant::PackedVector2Array(a) => a.to_variant_vec(),
        Variant::PackedVector3Array(a) => a.to_variant_vec(),
        Variant::PackedColorArray(a) => a.to_variant_vec(),
        _ => return None,
    };
    Some(Array::from(items))
}

fn pack<T: PackedElement>(items: &[Variant]) -> Result<PackedArray<T>, ConvertError> {
    items
        .iter()
        .enumerate()
        .map(|(index, v)| {
            T::from_variant(v).ok_or(ConvertError::Element {
                index,
                to: T::ARRAY_TYPE,
            })
        })
        .collect()
}

fn array_to_packed(array: &Array, to: VariantType) -> Result<Variant, ConvertError> {
    use VariantType as T;
    let items = array.to_vec();
    let out = match to {
        T::PackedByteArray => Variant::PackedByteArray(pack::<u8>(&items)?),
        T::PackedInt32Array => Variant::PackedInt32Array(pack::<i32>(&items)?),
        T::PackedInt64Array => Variant::PackedInt64Array(pack::<i64>(&items)?),
        T::PackedFloat32Array => Variant::PackedFloat32Array(pack::<f32>(&items)?),
        T::PackedFloat64Array => Variant::PackedFloat64Array(pack::<f64>(&items)?),
        T::PackedStringArray => Variant::PackedStringArray(pack::<GString>(&items)?),
        T::PackedVector2Array => Variant::PackedVector2Array(pack::<Vector2>(&items)?),
        T::PackedVector3Array => Variant::PackedVector3Array(pack::<Vector3>(&items)?),
        T::PackedColorArray => Variant::PackedColorArray(pack::<Color>(&items)?),
        _ => {
            return Err(ConvertError::Unsupported {
                from: T::Array,
                to,
            });
        }
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Aabb;
    use crate::string::StringName;

    #[test]
    fn strict_is_a_subset_of_permissive() {
        for from in VariantType::ALL {
            for to in VariantType::ALL {
                if Variant::can_convert_strict(from, to) {
                    assert!(Variant::can_convert(from, to), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn strict_keeps_numeric_narrowing_and_string_family() {
        use VariantType as T;
        assert!(Variant::can_convert_strict(T::Float, T::Int));
        assert!(Variant::can_convert_strict(T::String, T::StringName));
        assert!(Variant::can_convert_strict(T::StringName, T::String));
        assert!(!Variant::can_convert_strict(T::String, T::Int));
        assert!(!Variant::can_convert_strict(T::Int, T::String));
        assert!(Variant::can_convert(T::String, T::Int));
        assert!(Variant::can_convert(T::Int, T::String));
        assert!(!Variant::can_convert(T::Object, T::String));
        assert!(Variant::can_convert(T::Nil, T::Object));
        assert!(!Variant::can_convert(T::Nil, T::Int));
    }

    #[test]
    fn numeric_and_string_conversions() {
        assert_eq!(Variant::from(2.7).convert(VariantType::Int), Ok(Variant::Int(2)));
        assert_eq!(Variant::from("42").convert(VariantType::Int), Ok(Variant::Int(42)));
        assert_eq!(
            Variant::from(3).convert(VariantType::String),
            Ok(Variant::from("3"))
        );
        assert_eq!(
            Variant::from("n").convert(VariantType::StringName),
            Ok(Variant::StringName(StringName::new("n")))
        );
        assert_eq!(
            Variant::from(1).convert(VariantType::Dictionary),
            Err(ConvertError::Unsupported {
                from: VariantType::Int,
                to: VariantType::Dictionary
            })
        );
    }

    #[test]
    fn vectors_and_colors() {
        assert_eq!(
            Variant::from(Vector2::new(1.9, -1.9)).convert(VariantType::Vector2i),
            Ok(Variant::from(Vector2i::new(1, -1)))
        );
        assert_eq!(
            Variant::from("#ff0000").convert(VariantType::Color),
            Ok(Variant::from(Color::RED))
        );
        assert!(Variant::from("nope").convert(VariantType::Color).is_err());
        let aabb = Variant::from(Aabb::default());
        assert!(aabb.convert(VariantType::Vector3).is_err());
    }

    #[test]
    fn arrays_and_packed_arrays() {
        let a: Array = vec![Variant::from(1), Variant::from(2.5)].into();
        let packed = Variant::Array(a).convert(VariantType::PackedFloat64Array).unwrap();
        assert_eq!(packed.get_type(), VariantType::PackedFloat64Array);
        let back = packed.convert(VariantType::Array).unwrap();
        assert_eq!(back.as_array().unwrap().get(1), Some(Variant::Float(2.5)));

        let bad: Array = vec![Variant::from("x")].into();
        assert_eq!(
            Variant::Array(bad).convert(VariantType::PackedInt32Array),
            Err(ConvertError::Element {
                index: 0,
                to: VariantType::PackedInt32Array
            })
        );
    }
}
