// Constructors and type constants.
//
// Every kind has an indexed constructor list. Index 0 is the default
// constructor and index 1 the copy constructor; the rest take components or
// convert from a related kind. The list is what the ptr-constructor lookup
// indexes, so its order is ABI and only ever grows at the end.
//
// `construct` picks the first constructor whose arity matches and whose
// argument kinds match exactly, then the first whose arguments convert
// under the strict table.

use super::{Variant, VariantType};
use crate::array::Array;
use crate::callable::{Callable, Signal};
use crate::error::CallError;
use crate::math::{
    Aabb, Basis, Color, Plane, Projection, Quaternion, Rect2, Rect2i, Transform2D, Transform3D,
    Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstructorInfo {
    pub arguments: &'static [(&'static str, VariantType)],
}

macro_rules! ctor_list {
    ($ty:ident $(, [$($name:literal : $arg:ident),*])* $(,)?) => {
        &[
            ConstructorInfo { arguments: &[] },
            ConstructorInfo { arguments: &[("from", VariantType::$ty)] },
            $(ConstructorInfo { arguments: &[$(($name, VariantType::$arg)),*] },)*
        ]
    };
}

/// Constructor list of `ty`, in ABI order.
pub fn constructors_of(ty: VariantType) -> &'static [ConstructorInfo] {
    use VariantType as T;
    match ty {
        T::Nil => &[ConstructorInfo { arguments: &[] }],
        T::Bool => ctor_list!(Bool, ["from": Int], ["from": Float]),
        T::Int => ctor_list!(Int, ["from": Float], ["from": Bool], ["from": String]),
        T::Float => ctor_list!(Float, ["from": Int], ["from": Bool], ["from": String]),
        T::String => ctor_list!(String, ["from": StringName], ["from": NodePath]),
        T::Vector2 => ctor_list!(Vector2, ["from": Vector2i], ["x": Float, "y": Float]),
        T::Vector2i => ctor_list!(Vector2i, ["from": Vector2], ["x": Int, "y": Int]),
        T::Rect2 => ctor_list!(
            Rect2,
            ["from": Rect2i],
            ["position": Vector2, "size": Vector2],
            ["x": Float, "y": Float, "width": Float, "height": Float],
        ),
        T::Rect2i => ctor_list!(
            Rect2i,
            ["from": Rect2],
            ["position": Vector2i, "size": Vector2i],
            ["x": Int, "y": Int, "width": Int, "height": Int],
        ),
        T::Vector3 => ctor_list!(Vector3, ["from": Vector3i], ["x": Float, "y": Float, "z": Float]),
        T::Vector3i => ctor_list!(Vector3i, ["from": Vector3], ["x": Int, "y": Int, "z": Int]),
        T::Transform2D => ctor_list!(
            Transform2D,
            ["rotation": Float, "position": Vector2],
            ["x_axis": Vector2, "y_axis": Vector2, "origin": Vector2],
        ),
        T::Vector4 => ctor_list!(
            Vector4,
            ["from": Vector4i],
            ["x": Float, "y": Float, "z": Float, "w": Float],
        ),
        T::Vector4i => ctor_list!(Vector4i, ["from": Vector4], ["x": Int, "y": Int, "z": Int, "w": Int]),
        T::Plane => ctor_list!(
            Plane,
            ["normal": Vector3],
            ["normal": Vector3, "d": Float],
            ["a": Float, "b": Float, "c": Float, "d": Float],
        ),
        T::Quaternion => ctor_list!(
            Quaternion,
            ["from": Basis],
            ["x": Float, "y": Float, "z": Float, "w": Float],
        ),
        T::Aabb => ctor_list!(Aabb, ["position": Vector3, "size": Vector3]),
        T::Basis => ctor_list!(
            Basis,
            ["from": Quaternion],
            ["x_axis": Vector3, "y_axis": Vector3, "z_axis": Vector3],
        ),
        T::Transform3D => ctor_list!(
            Transform3D,
            ["basis": Basis, "origin": Vector3],
            ["x_axis": Vector3, "y_axis": Vector3, "z_axis": Vector3, "origin": Vector3],
            ["from": Projection],
        ),
        T::Projection => ctor_list!(
            Projection,
            ["from": Transform3D],
            ["x_axis": Vector4, "y_axis": Vector4, "z_axis": Vector4, "w_axis": Vector4],
        ),
        T::Color => ctor_list!(
            Color,
            ["from": Color, "alpha": Float],
            ["code": String],
            ["r": Float, "g": Float, "b": Float],
            ["r": Float, "g": Float, "b": Float, "a": Float],
        ),
        T::StringName => ctor_list!(StringName, ["from": String]),
        T::NodePath => ctor_list!(NodePath, ["from": String]),
        T::Rid => ctor_list!(Rid),
        T::Object => ctor_list!(Object),
        T::Callable => ctor_list!(Callable, ["object": Object, "method": StringName]),
        T::Signal => ctor_list!(Signal, ["object": Object, "signal": StringName]),
        T::Dictionary => ctor_list!(Dictionary),
        T::Array => ctor_list!(
            Array,
            ["base": Array, "type": Int, "class_name": StringName, "script": Nil],
            ["from": PackedByteArray],
            ["from": PackedInt32Array],
            ["from": PackedInt64Array],
            ["from": PackedFloat32Array],
            ["from": PackedFloat64Array],
            ["from": PackedStringArray],
            ["from": PackedVector2Array],
            ["from": PackedVector3Array],
            ["from": PackedColorArray],
        ),
        T::PackedByteArray => ctor_list!(PackedByteArray, ["from": Array]),
        T::PackedInt32Array => ctor_list!(PackedInt32Array, ["from": Array]),
        T::PackedInt64Array => ctor_list!(PackedInt64Array, ["from": Array]),
        T::PackedFloat32Array => ctor_list!(PackedFloat32Array, ["from": Array]),
        T::PackedFloat64Array => ctor_list!(PackedFloat64Array, ["from": Array]),
        T::PackedStringArray => ctor_list!(PackedStringArray, ["from": Array]),
        T::PackedVector2Array => ctor_list!(PackedVector2Array, ["from": Array]),
        T::PackedVector3Array => ctor_list!(PackedVector3Array, ["from": Array]),
        T::PackedColorArray => ctor_list!(PackedColorArray, ["from": Array]),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn r(v: f64) -> f32 {
    v as f32
}

#[allow(clippy::cast_possible_truncation)]
fn i(v: i64) -> i32 {
    v as i32
}

/// Build a value of `ty` from arguments already of the declared kinds of one
/// of its constructors. `None` when no constructor has this shape.
pub(crate) fn build(ty: VariantType, args: &[Variant]) -> Option<Variant> {
    use Variant as V;
    use VariantType as T;
    let out = match (ty, args) {
        (_, []) => Variant::default_of(ty),
        (t, [a]) if a.get_type() == t => a.clone(),
        (T::Vector2, [V::Float(x), V::Float(y)]) => V::Vector2(Vector2::new(r(*x), r(*y))),
        (T::Vector2i, [V::Int(x), V::Int(y)]) => V::Vector2i(Vector2i::new(i(*x), i(*y))),
        (T::Vector3, [V::Float(x), V::Float(y), V::Float(z)]) => {
            V::Vector3(Vector3::new(r(*x), r(*y), r(*z)))
        }
        (T::Vector3i, [V::Int(x), V::Int(y), V::Int(z)]) => {
            V::Vector3i(Vector3i::new(i(*x), i(*y), i(*z)))
        }
        (T::Vector4, [V::Float(x), V::Float(y), V::Float(z), V::Float(w)]) => {
            V::Vector4(Vector4::new(r(*x), r(*y), r(*z), r(*w)))
        }
        (T::Vector4i, [V::Int(x), V::Int(y), V::Int(z), V::Int(w)]) => {
            V::Vector4i(Vector4i::new(i(*x), i(*y), i(*z), i(*w)))
        }
        (T::Rect2, [V::Vector2(p), V::Vector2(s)]) => V::Rect2(Rect2::new(*p, *s)),
        (T::Rect2, [V::Float(x), V::Float(y), V::Float(w), V::Float(h)]) => V::Rect2(Rect2::new(
            Vector2::new(r(*x), r(*y)),
            Vector2::new(r(*w), r(*h)),
        )),
        (T::Rect2i, [V::Vector2i(p), V::Vector2i(s)]) => V::Rect2i(Rect2i::new(*p, *s)),
        (T::Rect2i, [V::Int(x), V::Int(y), V::Int(w), V::Int(h)]) => V::Rect2i(Rect2i::new(
            Vector2i::new(i(*x), i(*y)),
            Vector2i::new(i(*w), i(*h)),
        )),
        (T::Transform2D, [V::Float(angle), V::Vector2(origin)]) => {
            V::from(Transform2D::from_rotation(r(*angle), *origin))
        }
        (T::Transform2D, [V::Vector2(x), V::Vector2(y), V::Vector2(o)]) => {
            V::from(Transform2D::new(*x, *y, *o))
        }
        (T::Plane, [V::Vector3(n)]) => V::Plane(Plane::new(*n, 0.0)),
        (T::Plane, [V::Vector3(n), V::Float(d)]) => V::Plane(Plane::new(*n, r(*d))),
        (T::Plane, [V::Float(a), V::Float(b), V::Float(c), V::Float(d)]) => {
            V::Plane(Plane::new(Vector3::new(r(*a), r(*b), r(*c)), r(*d)))
        }
        (T::Quaternion, [V::Float(x), V::Float(y), V::Float(z), V::Float(w)]) => {
            V::Quaternion(Quaternion::new(r(*x), r(*y), r(*z), r(*w)))
        }
        (T::Aabb, [V::Vector3(p), V::Vector3(s)]) => V::from(Aabb::new(*p, *s)),
        (T::Basis, [V::Vector3(x), V::Vector3(y), V::Vector3(z)]) => {
            V::from(Basis::from_columns(*x, *y, *z))
        }
        (T::Transform3D, [V::Basis(b), V::Vector3(o)]) => V::from(Transform3D::new(**b, *o)),
        (T::Transform3D, [V::Vector3(x), V::Vector3(y), V::Vector3(z), V::Vector3(o)]) => {
            V::from(Transform3D::new(Basis::from_columns(*x, *y, *z), *o))
        }
        (T::Projection, [V::Vector4(x), V::Vector4(y), V::Vector4(z), V::Vector4(w)]) => {
            V::from(Projection {
                columns: [*x, *y, *z, *w],
            })
        }
        (T::Color, [V::Color(c), V::Float(a)]) => V::Color(Color::new(c.r, c.g, c.b, r(*a))),
        (T::Color, [V::Float(red), V::Float(g), V::Float(b)]) => {
            V::Color(Color::new(r(*red), r(*g), r(*b), 1.0))
        }
        (T::Color, [V::Float(red), V::Float(g), V::Float(b), V::Float(a)]) => {
            V::Color(Color::new(r(*red), r(*g), r(*b), r(*a)))
        }
        (T::Callable, [V::Object(o), V::StringName(method)]) => {
            V::Callable(Callable::from_object_method(o.id, method.clone()))
        }
        (T::Signal, [V::Object(o), V::StringName(signal)]) => {
            V::Signal(Signal::new(o.id, signal.clone()))
        }
        (T::Array, [V::Array(base), V::Int(kind), V::StringName(class_name), script]) => {
            let kind = u32::try_from(*kind).ok().and_then(VariantType::from_raw)?;
            let mut out = Array::new();
            out.set_typed(kind, class_name, script).ok()?;
            out.typed_assign(base).ok()?;
            V::Array(out)
        }
        (t, [a]) => a.convert(t).ok()?,
        _ => return None,
    };
    Some(out)
}

fn exact(info: &ConstructorInfo, args: &[&Variant]) -> bool {
    info.arguments
        .iter()
        .zip(args)
        .all(|((_, ty), a)| *ty == VariantType::Nil || a.get_type() == *ty)
}

fn first_mismatch(info: &ConstructorInfo, args: &[&Variant]) -> Option<(usize, VariantType)> {
    info.arguments
        .iter()
        .zip(args)
        .position(|((_, ty), a)| {
            *ty != VariantType::Nil && !Variant::can_convert_strict(a.get_type(), *ty)
        })
        .map(|i| (i, info.arguments[i].1))
}

impl Variant {
    /// Construct a `ty` from dynamic arguments.
    pub fn construct(ty: VariantType, args: &[&Variant]) -> Result<Variant, CallError> {
        let candidates: Vec<&ConstructorInfo> = constructors_of(ty)
            .iter()
            .filter(|c| c.arguments.len() == args.len())
            .collect();
        if candidates.is_empty() {
            return Err(CallError::InvalidMethod);
        }
        let chosen = candidates
            .iter()
            .find(|c| exact(c, args))
            .or_else(|| candidates.iter().find(|c| first_mismatch(c, args).is_none()));
        let Some(chosen) = chosen else {
            let (argument, expected) = first_mismatch(candidates[0], args).unwrap_or((0, ty));
            return Err(CallError::InvalidArgument {
                argument: i32::try_from(argument).unwrap_or(i32::MAX),
                expected,
            });
        };
        let mut converted = Vec::with_capacity(args.len());
        for (index, ((_, declared), arg)) in chosen.arguments.iter().zip(args).enumerate() {
            let value = if *declared == VariantType::Nil {
                (*arg).clone()
            } else {
                arg.convert_strict(*declared)
                    .map_err(|_| CallError::InvalidArgument {
                        argument: i32::try_from(index).unwrap_or(i32::MAX),
                        expected: *declared,
                    })?
            };
            converted.push(value);
        }
        build(ty, &converted).ok_or(CallError::InvalidArgument {
            argument: 0,
            expected: ty,
        })
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Named constants of `ty`, in declaration order.
pub fn constants_of(ty: VariantType) -> Vec<(&'static str, Variant)> {
    use VariantType as T;
    let v2 = |x: f32, y: f32| Variant::from(Vector2::new(x, y));
    let v2i = |x: i32, y: i32| Variant::from(Vector2i::new(x, y));
    let v3 = |x: f32, y: f32, z: f32| Variant::from(Vector3::new(x, y, z));
    let v3i = |x: i32, y: i32, z: i32| Variant::from(Vector3i::new(x, y, z));
    match ty {
        T::Vector2 => vec![
            ("AXIS_X", Variant::Int(0)),
            ("AXIS_Y", Variant::Int(1)),
            ("ZERO", v2(0.0, 0.0)),
            ("ONE", v2(1.0, 1.0)),
            ("INF", v2(f32::INFINITY, f32::INFINITY)),
            ("LEFT", v2(-1.0, 0.0)),
            ("RIGHT", v2(1.0, 0.0)),
            ("UP", v2(0.0, -1.0)),
            ("DOWN", v2(0.0, 1.0)),
        ],
        T::Vector2i => vec![
            ("AXIS_X", Variant::Int(0)),
            ("AXIS_Y", Variant::Int(1)),
            ("ZERO", v2i(0, 0)),
            ("ONE", v2i(1, 1)),
            ("LEFT", v2i(-1, 0)),
            ("RIGHT", v2i(1, 0)),
            ("UP", v2i(0, -1)),
            ("DOWN", v2i(0, 1)),
        ],
        T::Vector3 => vec![
            ("AXIS_X", Variant::Int(0)),
            ("AXIS_Y", Variant::Int(1)),
            ("AXIS_Z", Variant::Int(2)),
            ("ZERO", Variant::from(Vector3::ZERO)),
            ("ONE", Variant::from(Vector3::ONE)),
            ("INF", v3(f32::INFINITY, f32::INFINITY, f32::INFINITY)),
            ("LEFT", Variant::from(Vector3::LEFT)),
            ("RIGHT", Variant::from(Vector3::RIGHT)),
            ("UP", Variant::from(Vector3::UP)),
            ("DOWN", Variant::from(Vector3::DOWN)),
            ("FORWARD", Variant::from(Vector3::FORWARD)),
            ("BACK", Variant::from(Vector3::BACK)),
        ],
        T::Vector3i => vec![
            ("AXIS_X", Variant::Int(0)),
            ("AXIS_Y", Variant::Int(1)),
            ("AXIS_Z", Variant::Int(2)),
            ("ZERO", v3i(0, 0, 0)),
            ("ONE", v3i(1, 1, 1)),
            ("LEFT", v3i(-1, 0, 0)),
            ("RIGHT", v3i(1, 0, 0)),
            ("UP", v3i(0, 1, 0)),
            ("DOWN", v3i(0, -1, 0)),
            ("FORWARD", v3i(0, 0, -1)),
            ("BACK", v3i(0, 0, 1)),
        ],
        T::Vector4 => vec![
            ("ZERO", Variant::from(Vector4::ZERO)),
            ("ONE", Variant::from(Vector4::ONE)),
        ],
        T::Vector4i => vec![
            ("ZERO", Variant::from(Vector4i::ZERO)),
            ("ONE", Variant::from(Vector4i::ONE)),
        ],
        T::Transform2D => vec![
            ("IDENTITY", Variant::from(Transform2D::IDENTITY)),
            (
                "FLIP_X",
                Variant::from(Transform2D::new(v2f(-1.0, 0.0), v2f(0.0, 1.0), Vector2::ZERO)),
            ),
            (
                "FLIP_Y",
                Variant::from(Transform2D::new(v2f(1.0, 0.0), v2f(0.0, -1.0), Vector2::ZERO)),
            ),
        ],
        T::Plane => vec![
            ("PLANE_YZ", Variant::Plane(Plane::new(Vector3::RIGHT, 0.0))),
            ("PLANE_XZ", Variant::Plane(Plane::new(Vector3::UP, 0.0))),
            ("PLANE_XY", Variant::Plane(Plane::new(Vector3::BACK, 0.0))),
        ],
        T::Quaternion => vec![("IDENTITY", Variant::Quaternion(Quaternion::IDENTITY))],
        T::Basis => vec![
            ("IDENTITY", Variant::from(Basis::IDENTITY)),
            ("FLIP_X", Variant::from(Basis::IDENTITY.scaled(Vector3::new(-1.0, 1.0, 1.0)))),
            ("FLIP_Y", Variant::from(Basis::IDENTITY.scaled(Vector3::new(1.0, -1.0, 1.0)))),
            ("FLIP_Z", Variant::from(Basis::IDENTITY.scaled(Vector3::new(1.0, 1.0, -1.0)))),
        ],
        T::Transform3D => vec![("IDENTITY", Variant::from(Transform3D::IDENTITY))],
        T::Projection => vec![
            ("IDENTITY", Variant::from(Projection::IDENTITY)),
            (
                "ZERO",
                Variant::from(Projection {
                    columns: [Vector4::ZERO; 4],
                }),
            ),
        ],
        T::Color => vec![
            ("BLACK", Variant::Color(Color::BLACK)),
            ("WHITE", Variant::Color(Color::WHITE)),
            ("RED", Variant::Color(Color::RED)),
            ("GREEN", Variant::Color(Color::GREEN)),
            ("BLUE", Variant::Color(Color::BLUE)),
            ("TRANSPARENT", Variant::Color(Color::TRANSPARENT)),
            ("YELLOW", Variant::Color(Color::new(1.0, 1.0, 0.0, 1.0))),
            ("CYAN", Variant::Color(Color::new(0.0, 1.0, 1.0, 1.0))),
            ("MAGENTA", Variant::Color(Color::new(1.0, 0.0, 1.0, 1.0))),
            ("GRAY", Variant::Color(Color::new(0.745_098, 0.745_098, 0.745_098, 1.0))),
        ],
        _ => Vec::new(),
    }
}

fn v2f(x: f32, y: f32) -> Vector2 {
    Vector2::new(x, y)
}

/// `Type.NAME`, e.g. `Vector3.UP`.
pub fn constant_value(ty: VariantType, name: &str) -> Option<Variant> {
    constants_of(ty)
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::StringName;

    #[test]
    fn every_kind_starts_with_default_then_copy() {
        for ty in VariantType::ALL {
            let list = constructors_of(ty);
            assert!(list[0].arguments.is_empty(), "{ty}");
            if ty != VariantType::Nil {
                assert_eq!(list[1].arguments, &[("from", ty)], "{ty}");
            }
        }
    }

    #[test]
    fn construct_from_components_converts_ints() {
        let one = Variant::from(1);
        let two = Variant::from(2.5);
        let v = Variant::construct(VariantType::Vector2, &[&one, &two]).unwrap();
        assert_eq!(v, Variant::from(Vector2::new(1.0, 2.5)));
    }

    #[test]
    fn construct_reports_bad_arguments() {
        let s = Variant::from("x");
        let one = Variant::from(1);
        assert_eq!(
            Variant::construct(VariantType::Vector2, &[&s, &one]),
            Err(CallError::InvalidArgument {
                argument: 0,
                expected: VariantType::Float
            })
        );
        assert_eq!(
            Variant::construct(VariantType::Vector2, &[&one, &one, &one, &one, &one]),
            Err(CallError::InvalidMethod)
        );
    }

    #[test]
    fn copy_constructor_shares_containers() {
        let a = Array::new();
        let v = Variant::Array(a.clone());
        let copy = Variant::construct(VariantType::Array, &[&v]).unwrap();
        assert!(copy.as_array().unwrap().is_same(&a));
    }

    #[test]
    fn typed_array_constructor() {
        let base = Variant::Array(vec![Variant::from(1.0), Variant::from(2)].into());
        let kind = Variant::from(VariantType::Int as i64);
        let class = Variant::StringName(StringName::default());
        let typed = Variant::construct(VariantType::Array, &[&base, &kind, &class, &Variant::Nil])
            .unwrap();
        let typed = typed.as_array().unwrap();
        assert_eq!(typed.get_typed_builtin(), VariantType::Int);
        assert_eq!(typed.to_vec(), vec![Variant::Int(1), Variant::Int(2)]);
    }

    #[test]
    fn color_from_html_string() {
        let code = Variant::from("#ff0000");
        let c = Variant::construct(VariantType::Color, &[&code]).unwrap();
        assert_eq!(c, Variant::Color(Color::RED));
    }

    #[test]
    fn constants() {
        assert_eq!(
            constant_value(VariantType::Vector3, "UP"),
            Some(Variant::from(Vector3::new(0.0, 1.0, 0.0)))
        );
        assert_eq!(
            constant_value(VariantType::Vector2, "ZERO"),
            Some(Variant::from(Vector2::ZERO))
        );
        assert_eq!(constant_value(VariantType::Color, "RED"), Some(Variant::Color(Color::RED)));
        assert_eq!(constant_value(VariantType::Int, "RED"), None);
    }
}
