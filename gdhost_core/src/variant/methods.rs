// Builtin method table.
//
// Each builtin kind carries a list of methods callable on its values, both
// dynamically (`Variant::call`) and through ptrcall thunks looked up by name
// and signature hash. The table is built once on first use.
//
// A method's Rust body receives the receiver as `&mut Variant` and its
// arguments already converted to the declared kinds (defaults filled in).
// Methods marked mutating write the receiver back after a ptrcall; the
// shared containers (Array, Dictionary) mutate through their handle either
// way.
//
// **Critical constraint:** a method's hash is part of the ABI. Changing its
// argument kinds, return kind or const-ness changes the hash and makes old
// extensions fail their lookups cleanly instead of crashing.

use std::sync::OnceLock;

use smallvec::SmallVec;

use super::{Variant, VariantType, native};
use crate::array::{Array, ArrayError};
use crate::error::CallError;
use crate::math::{Color, Rect2, Vector2, Vector2i, Vector3, Vector4};
use crate::packed::{PackedArray, PackedElement};
use crate::string::{GString, StringName};

pub type BuiltinFn = fn(&mut Variant, &[Variant]) -> Result<Variant, CallError>;

/// One builtin method of one kind.
pub struct BuiltinMethod {
    pub owner: VariantType,
    pub name: StringName,
    pub arguments: &'static [(&'static str, VariantType)],
    /// `None` for void; `Some(Nil)` returns any Variant.
    pub return_type: Option<VariantType>,
    pub is_const: bool,
    pub is_static: bool,
    pub is_vararg: bool,
    pub defaults: Vec<Variant>,
    pub hash: u32,
    func: BuiltinFn,
}

impl BuiltinMethod {
    fn mutating(&mut self) -> &mut Self {
        self.is_const = false;
        self
    }

    fn with_defaults(&mut self, defaults: Vec<Variant>) -> &mut Self {
        self.defaults = defaults;
        self
    }

    fn vararg(&mut self) -> &mut Self {
        self.is_vararg = true;
        self
    }

    fn static_method(&mut self) -> &mut Self {
        self.is_static = true;
        self
    }

    fn compute_hash(&self) -> u32 {
        let args: SmallVec<[u32; 8]> = self.arguments.iter().map(|(_, t)| t.raw()).collect();
        gdhost_sys::method_signature_hash(
            self.return_type.map(VariantType::raw),
            &args,
            self.is_const,
            self.is_vararg,
        )
    }

    /// Arity check, default filling and strict conversion.
    fn prepare(&self, args: &[&Variant]) -> Result<SmallVec<[Variant; 8]>, CallError> {
        let declared = self.arguments.len();
        let defaults = &self.defaults;
        if args.len() > declared && !self.is_vararg {
            return Err(CallError::TooManyArguments {
                expected: i32::try_from(declared).unwrap_or(i32::MAX),
            });
        }
        if args.len() + defaults.len() < declared {
            return Err(CallError::TooFewArguments {
                expected: i32::try_from(declared - defaults.len()).unwrap_or(i32::MAX),
            });
        }
        let mut out = SmallVec::with_capacity(declared.max(args.len()));
        for i in 0..declared.max(args.len()) {
            let value = match args.get(i) {
                Some(v) => (*v).clone(),
                None => defaults[defaults.len() - (declared - i)].clone(),
            };
            let Some(&(_, expected)) = self.arguments.get(i) else {
                out.push(value);
                continue;
            };
            let ty = value.get_type();
            if expected == VariantType::Nil || ty == expected {
                out.push(value);
            } else {
                let argument = i32::try_from(i).unwrap_or(i32::MAX);
                let converted = value
                    .convert_strict(expected)
                    .map_err(|_| CallError::InvalidArgument { argument, expected })?;
                out.push(converted);
            }
        }
        Ok(out)
    }

    pub fn call(&self, receiver: &mut Variant, args: &[&Variant]) -> Result<Variant, CallError> {
        if !self.is_static && receiver.get_type() != self.owner {
            return Err(CallError::InvalidMethod);
        }
        let prepared = self.prepare(args)?;
        let result = (self.func)(receiver, &prepared)?;
        Ok(if self.return_type.is_some() {
            result
        } else {
            Variant::Nil
        })
    }

    /// Call with native-typed arguments.
    ///
    /// # Safety
    /// `base` must point to an initialized value of the owner kind (it may be
    /// null for static methods), `args` must hold one pointer per declared
    /// argument of its declared kind (vararg extras point to Variants), and
    /// `ret` must point to initialized storage of the return kind (ignored
    /// for void methods).
    pub unsafe fn ptrcall(
        &self,
        base: gdhost_sys::TypePtr,
        args: *const gdhost_sys::ConstTypePtr,
        ret: gdhost_sys::TypePtr,
        argcount: i32,
    ) {
        let mut receiver = if base.is_null() {
            Variant::default_of(self.owner)
        } else {
            unsafe { native::read(self.owner, base.cast_const()) }
        };
        let declared = self.arguments.len();
        let count = if self.is_vararg {
            declared.max(usize::try_from(argcount).unwrap_or(0))
        } else {
            declared
        };
        let values: SmallVec<[Variant; 8]> = (0..count)
            .map(|i| {
                let ty = self.arguments.get(i).map_or(VariantType::Nil, |(_, t)| *t);
                unsafe { native::read(ty, *args.add(i)) }
            })
            .collect();
        match (self.func)(&mut receiver, &values) {
            Ok(value) => {
                if let Some(rt) = self.return_type
                    && !ret.is_null()
                {
                    unsafe { native::write(rt, ret, value) };
                }
            }
            Err(e) => crate::err_print!(
                "ptrcall to '{}.{}' failed: {e}",
                self.owner,
                self.name
            ),
        }
        if !self.is_const && !base.is_null() {
            unsafe { native::write(self.owner, base, receiver) };
        }
    }
}

struct Builder {
    owner: VariantType,
    methods: Vec<BuiltinMethod>,
}

impl Builder {
    fn add(
        &mut self,
        name: &str,
        arguments: &'static [(&'static str, VariantType)],
        return_type: Option<VariantType>,
        func: BuiltinFn,
    ) -> &mut BuiltinMethod {
        self.methods.push(BuiltinMethod {
            owner: self.owner,
            name: StringName::new(name),
            arguments,
            return_type,
            is_const: true,
            is_static: false,
            is_vararg: false,
            defaults: Vec::new(),
            hash: 0,
            func,
        });
        let last = self.methods.len() - 1;
        &mut self.methods[last]
    }
}

// ---------------------------------------------------------------------------
// Helpers for method bodies
// ---------------------------------------------------------------------------

macro_rules! recv {
    ($s:expr, $kind:ident) => {
        match $s {
            Variant::$kind(v) => v,
            _ => return Err(CallError::InvalidMethod),
        }
    };
}

fn real(x: f32) -> Variant {
    Variant::Float(f64::from(x))
}

#[allow(clippy::cast_possible_truncation)]
fn real_arg(v: &Variant) -> f32 {
    v.to_float() as f32
}

fn index_arg(v: &Variant) -> usize {
    usize::try_from(v.to_int()).unwrap_or(0)
}

fn int(n: usize) -> Variant {
    Variant::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn found(index: Option<usize>) -> Variant {
    index.map_or(Variant::Int(-1), int)
}

fn v2(v: &Variant) -> Vector2 {
    match v {
        Variant::Vector2(v) => *v,
        _ => Vector2::ZERO,
    }
}

fn v3(v: &Variant) -> Vector3 {
    match v {
        Variant::Vector3(v) => *v,
        _ => Vector3::ZERO,
    }
}

fn v4(v: &Variant) -> Vector4 {
    match v {
        Variant::Vector4(v) => *v,
        _ => Vector4::ZERO,
    }
}

fn array_arg(v: &Variant) -> Array {
    v.as_array().cloned().unwrap_or_default()
}

fn callable_arg(v: &Variant) -> crate::callable::Callable {
    v.as_callable().cloned().unwrap_or_default()
}

/// Array errors are already reported where they happen; the dynamic call
/// itself still succeeds, as in the engine.
fn logged<T>(result: Result<T, ArrayError>) -> Option<T> {
    result.ok()
}

fn or_nil(value: Option<Variant>) -> Variant {
    value.unwrap_or_default()
}

const NONE: &[(&str, VariantType)] = &[];

// ---------------------------------------------------------------------------
// Per-kind method lists
// ---------------------------------------------------------------------------

fn string_methods(b: &mut Builder) {
    use VariantType as T;
    b.add("length", NONE, Some(T::Int), |s, _| Ok(int(recv!(s, String).len())));
    b.add("is_empty", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, String).is_empty()))
    });
    b.add("to_upper", NONE, Some(T::String), |s, _| {
        Ok(Variant::String(recv!(s, String).to_upper()))
    });
    b.add("to_lower", NONE, Some(T::String), |s, _| {
        Ok(Variant::String(recv!(s, String).to_lower()))
    });
    b.add("begins_with", &[("text", T::String)], Some(T::Bool), |s, a| {
        Ok(Variant::Bool(recv!(s, String).begins_with(&a[0].to_gstring())))
    });
    b.add("ends_with", &[("text", T::String)], Some(T::Bool), |s, a| {
        Ok(Variant::Bool(recv!(s, String).ends_with(&a[0].to_gstring())))
    });
    b.add("contains", &[("what", T::String)], Some(T::Bool), |s, a| {
        Ok(Variant::Bool(recv!(s, String).contains(&a[0].to_gstring())))
    });
    b.add("find", &[("what", T::String), ("from", T::Int)], Some(T::Int), |s, a| {
        Ok(found(recv!(s, String).find(&a[0].to_gstring(), index_arg(&a[1]))))
    })
    .with_defaults(vec![Variant::Int(0)]);
    b.add("substr", &[("from", T::Int), ("len", T::Int)], Some(T::String), |s, a| {
        let len = usize::try_from(a[1].to_int()).ok();
        Ok(Variant::String(recv!(s, String).substr(index_arg(&a[0]), len)))
    })
    .with_defaults(vec![Variant::Int(-1)]);
    b.add(
        "replace",
        &[("what", T::String), ("forwhat", T::String)],
        Some(T::String),
        |s, a| {
            let out = recv!(s, String).replace(&a[0].to_gstring(), &a[1].to_gstring());
            Ok(Variant::String(out))
        },
    );
    b.add(
        "split",
        &[("delimiter", T::String), ("allow_empty", T::Bool)],
        Some(T::PackedStringArray),
        |s, a| {
            let parts = recv!(s, String).split(&a[0].to_gstring(), a[1].to_bool());
            Ok(Variant::PackedStringArray(parts.into()))
        },
    )
    .with_defaults(vec![Variant::from(""), Variant::Bool(true)]);
    b.add("strip_edges", NONE, Some(T::String), |s, _| {
        Ok(Variant::String(recv!(s, String).strip_edges()))
    });
    b.add("repeat", &[("count", T::Int)], Some(T::String), |s, a| {
        Ok(Variant::String(recv!(s, String).repeat(index_arg(&a[0]))))
    });
    b.add("to_int", NONE, Some(T::Int), |s, _| Ok(Variant::Int(recv!(s, String).to_int())));
    b.add("to_float", NONE, Some(T::Float), |s, _| {
        Ok(Variant::Float(recv!(s, String).to_float()))
    });
    b.add("is_valid_int", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, String).is_valid_int()))
    });
    b.add("is_valid_float", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, String).is_valid_float()))
    });
    b.add("is_valid_identifier", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, String).is_valid_identifier()))
    });
    b.add("unicode_at", &[("at", T::Int)], Some(T::Int), |s, a| {
        let unit = recv!(s, String).get(index_arg(&a[0])).unwrap_or(0);
        Ok(Variant::Int(i64::from(unit)))
    });
    b.add("to_utf8_buffer", NONE, Some(T::PackedByteArray), |s, _| {
        Ok(Variant::PackedByteArray(recv!(s, String).to_utf8().into()))
    });
    b.add("hash", NONE, Some(T::Int), |s, _| {
        Ok(Variant::Int(i64::from(recv!(s, String).hash_value())))
    });
    b.add("chr", &[("char", T::Int)], Some(T::String), |_, a| {
        let unit = u32::try_from(a[0].to_int()).unwrap_or(0);
        Ok(Variant::String(GString::from_utf32(&[unit])))
    })
    .static_method();
}

fn string_name_methods(b: &mut Builder) {
    use VariantType as T;
    b.add("length", NONE, Some(T::Int), |s, _| {
        Ok(int(recv!(s, StringName).as_str().chars().count()))
    });
    b.add("is_empty", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, StringName).is_empty()))
    });
    b.add("begins_with", &[("text", T::String)], Some(T::Bool), |s, a| {
        let text = a[0].to_gstring().to_string();
        Ok(Variant::Bool(recv!(s, StringName).as_str().starts_with(&text)))
    });
    b.add("ends_with", &[("text", T::String)], Some(T::Bool), |s, a| {
        let text = a[0].to_gstring().to_string();
        Ok(Variant::Bool(recv!(s, StringName).as_str().ends_with(&text)))
    });
    b.add("hash", NONE, Some(T::Int), |s, _| {
        Ok(Variant::Int(i64::from(recv!(s, StringName).hash_value())))
    });
}

fn node_path_methods(b: &mut Builder) {
    use VariantType as T;
    b.add("is_absolute", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, NodePath).is_absolute()))
    });
    b.add("is_empty", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, NodePath).is_empty()))
    });
    b.add("get_name_count", NONE, Some(T::Int), |s, _| {
        Ok(int(recv!(s, NodePath).name_count()))
    });
    b.add("get_name", &[("idx", T::Int)], Some(T::StringName), |s, a| {
        let name = recv!(s, NodePath).name(index_arg(&a[0]));
        Ok(Variant::StringName(name.unwrap_or_default()))
    });
    b.add("get_subname_count", NONE, Some(T::Int), |s, _| {
        Ok(int(recv!(s, NodePath).subname_count()))
    });
    b.add("get_concatenated_names", NONE, Some(T::StringName), |s, _| {
        Ok(Variant::StringName(recv!(s, NodePath).concatenated_names()))
    });
}

macro_rules! real_vector_methods {
    ($b:expr, $kind:ident, $conv:ident) => {{
        use VariantType as T;
        $b.add("length", NONE, Some(T::Float), |s, _| Ok(real(recv!(s, $kind).length())));
        $b.add("length_squared", NONE, Some(T::Float), |s, _| {
            Ok(real(recv!(s, $kind).length_squared()))
        });
        $b.add("normalized", NONE, Some(T::$kind), |s, _| {
            Ok(Variant::$kind(recv!(s, $kind).normalized()))
        });
        $b.add("is_normalized", NONE, Some(T::Bool), |s, _| {
            Ok(Variant::Bool(recv!(s, $kind).is_normalized()))
        });
        $b.add("dot", &[("with", T::$kind)], Some(T::Float), |s, a| {
            Ok(real(recv!(s, $kind).dot($conv(&a[0]))))
        });
        $b.add("distance_to", &[("to", T::$kind)], Some(T::Float), |s, a| {
            Ok(real(recv!(s, $kind).distance_to($conv(&a[0]))))
        });
        $b.add(
            "lerp",
            &[("to", T::$kind), ("weight", T::Float)],
            Some(T::$kind),
            |s, a| Ok(Variant::$kind(recv!(s, $kind).lerp($conv(&a[0]), real_arg(&a[1])))),
        );
        $b.add("abs", NONE, Some(T::$kind), |s, _| Ok(Variant::$kind(recv!(s, $kind).abs())));
        $b.add("floor", NONE, Some(T::$kind), |s, _| Ok(Variant::$kind(recv!(s, $kind).floor())));
        $b.add("ceil", NONE, Some(T::$kind), |s, _| Ok(Variant::$kind(recv!(s, $kind).ceil())));
        $b.add("round", NONE, Some(T::$kind), |s, _| Ok(Variant::$kind(recv!(s, $kind).round())));
        $b.add("min", &[("with", T::$kind)], Some(T::$kind), |s, a| {
            Ok(Variant::$kind(recv!(s, $kind).min($conv(&a[0]))))
        });
        $b.add("max", &[("with", T::$kind)], Some(T::$kind), |s, a| {
            Ok(Variant::$kind(recv!(s, $kind).max($conv(&a[0]))))
        });
        $b.add("is_equal_approx", &[("to", T::$kind)], Some(T::Bool), |s, a| {
            Ok(Variant::Bool(recv!(s, $kind).is_equal_approx($conv(&a[0]))))
        });
        $b.add("is_finite", NONE, Some(T::Bool), |s, _| {
            Ok(Variant::Bool(recv!(s, $kind).is_finite()))
        });
    }};
}

macro_rules! int_vector_methods {
    ($b:expr, $kind:ident) => {{
        use VariantType as T;
        $b.add("length", NONE, Some(T::Float), |s, _| {
            Ok(Variant::Float(recv!(s, $kind).length()))
        });
        $b.add("length_squared", NONE, Some(T::Int), |s, _| {
            Ok(Variant::Int(recv!(s, $kind).length_squared()))
        });
        $b.add("abs", NONE, Some(T::$kind), |s, _| Ok(Variant::$kind(recv!(s, $kind).abs())));
        $b.add("min", &[("with", T::$kind)], Some(T::$kind), |s, a| {
            let Variant::$kind(with) = &a[0] else {
                return Err(CallError::InvalidMethod);
            };
            Ok(Variant::$kind(recv!(s, $kind).min(*with)))
        });
        $b.add("max", &[("with", T::$kind)], Some(T::$kind), |s, a| {
            let Variant::$kind(with) = &a[0] else {
                return Err(CallError::InvalidMethod);
            };
            Ok(Variant::$kind(recv!(s, $kind).max(*with)))
        });
    }};
}

fn vector_methods(ty: VariantType, b: &mut Builder) {
    use VariantType as T;
    match ty {
        T::Vector2 => {
            real_vector_methods!(b, Vector2, v2);
            b.add("cross", &[("with", T::Vector2)], Some(T::Float), |s, a| {
                Ok(real(recv!(s, Vector2).cross(v2(&a[0]))))
            });
            b.add("angle", NONE, Some(T::Float), |s, _| Ok(real(recv!(s, Vector2).angle())));
            b.add("aspect", NONE, Some(T::Float), |s, _| Ok(real(recv!(s, Vector2).aspect())));
        }
        T::Vector3 => {
            real_vector_methods!(b, Vector3, v3);
            b.add("cross", &[("with", T::Vector3)], Some(T::Vector3), |s, a| {
                Ok(Variant::Vector3(recv!(s, Vector3).cross(v3(&a[0]))))
            });
        }
        T::Vector4 => real_vector_methods!(b, Vector4, v4),
        T::Vector2i => {
            int_vector_methods!(b, Vector2i);
            b.add("aspect", NONE, Some(T::Float), |s, _| {
                let v: Vector2i = *recv!(s, Vector2i);
                Ok(real(v.to_real().aspect()))
            });
        }
        T::Vector3i => int_vector_methods!(b, Vector3i),
        T::Vector4i => int_vector_methods!(b, Vector4i),
        _ => {}
    }
}

fn geometry_methods(ty: VariantType, b: &mut Builder) {
    use VariantType as T;
    match ty {
        T::Rect2 => {
            b.add("get_area", NONE, Some(T::Float), |s, _| Ok(real(recv!(s, Rect2).area())));
            b.add("get_center", NONE, Some(T::Vector2), |s, _| {
                Ok(Variant::Vector2(recv!(s, Rect2).center()))
            });
            b.add("has_point", &[("point", T::Vector2)], Some(T::Bool), |s, a| {
                Ok(Variant::Bool(recv!(s, Rect2).has_point(v2(&a[0]))))
            });
            b.add("intersects", &[("b", T::Rect2)], Some(T::Bool), |s, a| {
                let Variant::Rect2(other) = &a[0] else {
                    return Ok(Variant::Bool(false));
                };
                Ok(Variant::Bool(recv!(s, Rect2).intersects(other)))
            });
            b.add("is_equal_approx", &[("rect", T::Rect2)], Some(T::Bool), |s, a| {
                let other: Rect2 = match &a[0] {
                    Variant::Rect2(r) => *r,
                    _ => Rect2::default(),
                };
                Ok(Variant::Bool(recv!(s, Rect2).is_equal_approx(&other)))
            });
        }
        T::Rect2i => {
            b.add("get_area", NONE, Some(T::Int), |s, _| Ok(Variant::Int(recv!(s, Rect2i).area())));
            b.add("has_point", &[("point", T::Vector2i)], Some(T::Bool), |s, a| {
                let Variant::Vector2i(p) = &a[0] else {
                    return Ok(Variant::Bool(false));
                };
                Ok(Variant::Bool(recv!(s, Rect2i).has_point(*p)))
            });
        }
        T::Aabb => {
            b.add("get_volume", NONE, Some(T::Float), |s, _| Ok(real(recv!(s, Aabb).volume())));
            b.add("get_center", NONE, Some(T::Vector3), |s, _| {
                Ok(Variant::Vector3(recv!(s, Aabb).center()))
            });
            b.add("has_point", &[("point", T::Vector3)], Some(T::Bool), |s, a| {
                Ok(Variant::Bool(recv!(s, Aabb).has_point(v3(&a[0]))))
            });
        }
        T::Plane => {
            b.add("distance_to", &[("point", T::Vector3)], Some(T::Float), |s, a| {
                Ok(real(recv!(s, Plane).distance_to(v3(&a[0]))))
            });
            b.add("is_point_over", &[("point", T::Vector3)], Some(T::Bool), |s, a| {
                Ok(Variant::Bool(recv!(s, Plane).is_point_over(v3(&a[0]))))
            });
            b.add("normalized", NONE, Some(T::Plane), |s, _| {
                Ok(Variant::Plane(recv!(s, Plane).normalized()))
            });
        }
        T::Quaternion => {
            b.add("length", NONE, Some(T::Float), |s, _| Ok(real(recv!(s, Quaternion).length())));
            b.add("normalized", NONE, Some(T::Quaternion), |s, _| {
                Ok(Variant::Quaternion(recv!(s, Quaternion).normalized()))
            });
            b.add("inverse", NONE, Some(T::Quaternion), |s, _| {
                Ok(Variant::Quaternion(recv!(s, Quaternion).inverse()))
            });
            b.add("dot", &[("with", T::Quaternion)], Some(T::Float), |s, a| {
                let Variant::Quaternion(with) = &a[0] else {
                    return Err(CallError::InvalidMethod);
                };
                Ok(real(recv!(s, Quaternion).dot(*with)))
            });
        }
        T::Transform2D => {
            b.add("affine_inverse", NONE, Some(T::Transform2D), |s, _| {
                Ok(Variant::from(recv!(s, Transform2D).affine_inverse()))
            });
            b.add("determinant", NONE, Some(T::Float), |s, _| {
                Ok(real(recv!(s, Transform2D).determinant()))
            });
        }
        T::Basis => {
            b.add("determinant", NONE, Some(T::Float), |s, _| {
                Ok(real(recv!(s, Basis).determinant()))
            });
            b.add("transposed", NONE, Some(T::Basis), |s, _| {
                Ok(Variant::from(recv!(s, Basis).transposed()))
            });
            b.add("scaled", &[("scale", T::Vector3)], Some(T::Basis), |s, a| {
                Ok(Variant::from(recv!(s, Basis).scaled(v3(&a[0]))))
            });
        }
        T::Transform3D => {
            b.add("translated", &[("offset", T::Vector3)], Some(T::Transform3D), |s, a| {
                Ok(Variant::from(recv!(s, Transform3D).translated(v3(&a[0]))))
            });
        }
        T::Color => {
            b.add("get_luminance", NONE, Some(T::Float), |s, _| {
                Ok(real(recv!(s, Color).luminance()))
            });
            b.add("inverted", NONE, Some(T::Color), |s, _| {
                Ok(Variant::Color(recv!(s, Color).inverted()))
            });
            b.add("lerp", &[("to", T::Color), ("weight", T::Float)], Some(T::Color), |s, a| {
                let to = match &a[0] {
                    Variant::Color(c) => *c,
                    _ => Color::default(),
                };
                Ok(Variant::Color(recv!(s, Color).lerp(to, real_arg(&a[1]))))
            });
            b.add("to_html", &[("with_alpha", T::Bool)], Some(T::String), |s, a| {
                Ok(Variant::from(recv!(s, Color).to_html(a[0].to_bool())))
            })
            .with_defaults(vec![Variant::Bool(true)]);
            b.add("html", &[("rgba", T::String)], Some(T::Color), |_, a| {
                let text = a[0].to_gstring().to_string();
                Ok(Variant::Color(Color::from_html(&text).unwrap_or_default()))
            })
            .static_method();
            b.add("html_is_valid", &[("color", T::String)], Some(T::Bool), |_, a| {
                let text = a[0].to_gstring().to_string();
                Ok(Variant::Bool(Color::from_html(&text).is_some()))
            })
            .static_method();
        }
        T::Rid => {
            #[allow(clippy::cast_possible_wrap)]
            b.add("get_id", NONE, Some(T::Int), |s, _| Ok(Variant::Int(recv!(s, Rid).0 as i64)));
            b.add("is_valid", NONE, Some(T::Bool), |s, _| {
                Ok(Variant::Bool(recv!(s, Rid).is_valid()))
            });
        }
        _ => {}
    }
}

fn callable_methods(b: &mut Builder) {
    use VariantType as T;
    b.add("call", NONE, Some(T::Nil), |s, a| {
        let refs: SmallVec<[&Variant; 8]> = a.iter().collect();
        recv!(s, Callable).call(&refs)
    })
    .vararg();
    b.add("callv", &[("arguments", T::Array)], Some(T::Nil), |s, a| {
        recv!(s, Callable).callv(&array_arg(&a[0]).to_vec())
    });
    b.add("is_null", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, Callable).is_null()))
    });
    b.add("is_valid", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, Callable).is_valid()))
    });
    b.add("is_custom", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, Callable).is_custom()))
    });
    b.add("is_standard", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, Callable).is_standard()))
    });
    b.add("get_method", NONE, Some(T::StringName), |s, _| {
        Ok(Variant::StringName(recv!(s, Callable).method()))
    });
    #[allow(clippy::cast_possible_wrap)]
    b.add("get_object_id", NONE, Some(T::Int), |s, _| {
        Ok(Variant::Int(recv!(s, Callable).object_id().0 as i64))
    });
    b.add("hash", NONE, Some(T::Int), |s, _| {
        Ok(Variant::Int(i64::from(recv!(s, Callable).hash_value())))
    });
}

fn signal_methods(b: &mut Builder) {
    use VariantType as T;
    b.add("is_null", NONE, Some(T::Bool), |s, _| Ok(Variant::Bool(recv!(s, Signal).is_null())));
    b.add("get_name", NONE, Some(T::StringName), |s, _| {
        Ok(Variant::StringName(recv!(s, Signal).name.clone()))
    });
    #[allow(clippy::cast_possible_wrap)]
    b.add("get_object_id", NONE, Some(T::Int), |s, _| {
        Ok(Variant::Int(recv!(s, Signal).object.0 as i64))
    });
}

fn dictionary_methods(b: &mut Builder) {
    use VariantType as T;
    b.add("size", NONE, Some(T::Int), |s, _| Ok(int(recv!(s, Dictionary).len())));
    b.add("is_empty", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, Dictionary).is_empty()))
    });
    b.add("clear", NONE, None, |s, _| {
        recv!(s, Dictionary).clear();
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("has", &[("key", T::Nil)], Some(T::Bool), |s, a| {
        Ok(Variant::Bool(recv!(s, Dictionary).has(&a[0])))
    });
    b.add("has_all", &[("keys", T::Array)], Some(T::Bool), |s, a| {
        Ok(Variant::Bool(recv!(s, Dictionary).has_all(&array_arg(&a[0]))))
    });
    b.add("erase", &[("key", T::Nil)], Some(T::Bool), |s, a| {
        Ok(Variant::Bool(recv!(s, Dictionary).erase(&a[0])))
    })
    .mutating();
    b.add("keys", NONE, Some(T::Array), |s, _| Ok(Variant::Array(recv!(s, Dictionary).keys())));
    b.add("values", NONE, Some(T::Array), |s, _| {
        Ok(Variant::Array(recv!(s, Dictionary).values()))
    });
    b.add("get", &[("key", T::Nil), ("default", T::Nil)], Some(T::Nil), |s, a| {
        Ok(recv!(s, Dictionary).get_or(&a[0], a[1].clone()))
    })
    .with_defaults(vec![Variant::Nil]);
    b.add("find_key", &[("value", T::Nil)], Some(T::Nil), |s, a| {
        Ok(recv!(s, Dictionary).find_key(&a[0]))
    });
    b.add(
        "merge",
        &[("dictionary", T::Dictionary), ("overwrite", T::Bool)],
        None,
        |s, a| {
            if let Some(other) = a[0].as_dictionary() {
                recv!(s, Dictionary).merge(other, a[1].to_bool());
            }
            Ok(Variant::Nil)
        },
    )
    .mutating()
    .with_defaults(vec![Variant::Bool(false)]);
    b.add("duplicate", &[("deep", T::Bool)], Some(T::Dictionary), |s, a| {
        Ok(Variant::Dictionary(recv!(s, Dictionary).duplicate(a[0].to_bool())))
    })
    .with_defaults(vec![Variant::Bool(false)]);
    b.add("hash", NONE, Some(T::Int), |s, _| {
        Ok(Variant::Int(i64::from(recv!(s, Dictionary).hash())))
    });
    b.add("make_read_only", NONE, None, |s, _| {
        recv!(s, Dictionary).make_read_only();
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("is_read_only", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, Dictionary).is_read_only()))
    });
}

fn array_methods(b: &mut Builder) {
    use VariantType as T;
    b.add("size", NONE, Some(T::Int), |s, _| Ok(int(recv!(s, Array).len())));
    b.add("is_empty", NONE, Some(T::Bool), |s, _| Ok(Variant::Bool(recv!(s, Array).is_empty())));
    b.add("clear", NONE, None, |s, _| {
        logged(recv!(s, Array).clear());
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("hash", NONE, Some(T::Int), |s, _| Ok(Variant::Int(i64::from(recv!(s, Array).hash()))));
    b.add("push_back", &[("value", T::Nil)], None, |s, a| {
        logged(recv!(s, Array).push_back(a[0].clone()));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("push_front", &[("value", T::Nil)], None, |s, a| {
        logged(recv!(s, Array).push_front(a[0].clone()));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("append", &[("value", T::Nil)], None, |s, a| {
        logged(recv!(s, Array).append(a[0].clone()));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("append_array", &[("array", T::Array)], None, |s, a| {
        logged(recv!(s, Array).append_array(&array_arg(&a[0])));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("insert", &[("position", T::Int), ("value", T::Nil)], Some(T::Int), |s, a| {
        let ok = logged(recv!(s, Array).insert(a[0].to_int(), a[1].clone())).is_some();
        Ok(Variant::Int(if ok { 0 } else { 1 }))
    })
    .mutating();
    b.add("erase", &[("value", T::Nil)], None, |s, a| {
        logged(recv!(s, Array).erase(&a[0]));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("remove_at", &[("position", T::Int)], None, |s, a| {
        logged(recv!(s, Array).remove_at(a[0].to_int()));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("fill", &[("value", T::Nil)], None, |s, a| {
        logged(recv!(s, Array).fill(a[0].clone()));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("resize", &[("size", T::Int)], Some(T::Int), |s, a| {
        let ok = logged(recv!(s, Array).resize(index_arg(&a[0]))).is_some();
        Ok(Variant::Int(if ok { 0 } else { 1 }))
    })
    .mutating();
    b.add("front", NONE, Some(T::Nil), |s, _| Ok(or_nil(logged(recv!(s, Array).front()))));
    b.add("back", NONE, Some(T::Nil), |s, _| Ok(or_nil(logged(recv!(s, Array).back()))));
    b.add("pop_back", NONE, Some(T::Nil), |s, _| {
        Ok(or_nil(logged(recv!(s, Array).pop_back())))
    })
    .mutating();
    b.add("pop_front", NONE, Some(T::Nil), |s, _| {
        Ok(or_nil(logged(recv!(s, Array).pop_front())))
    })
    .mutating();
    b.add("pop_at", &[("position", T::Int)], Some(T::Nil), |s, a| {
        Ok(or_nil(logged(recv!(s, Array).pop_at(a[0].to_int()))))
    })
    .mutating();
    b.add("find", &[("what", T::Nil), ("from", T::Int)], Some(T::Int), |s, a| {
        Ok(found(recv!(s, Array).find(&a[0], a[1].to_int())))
    })
    .with_defaults(vec![Variant::Int(0)]);
    b.add("rfind", &[("what", T::Nil), ("from", T::Int)], Some(T::Int), |s, a| {
        Ok(found(recv!(s, Array).rfind(&a[0], a[1].to_int())))
    })
    .with_defaults(vec![Variant::Int(-1)]);
    b.add("count", &[("value", T::Nil)], Some(T::Int), |s, a| {
        Ok(int(recv!(s, Array).count(&a[0])))
    });
    b.add("has", &[("value", T::Nil)], Some(T::Bool), |s, a| {
        Ok(Variant::Bool(recv!(s, Array).has(&a[0])))
    });
    b.add("sort", NONE, None, |s, _| {
        logged(recv!(s, Array).sort());
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("sort_custom", &[("func", T::Callable)], None, |s, a| {
        logged(recv!(s, Array).sort_custom(&callable_arg(&a[0])));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("bsearch", &[("value", T::Nil), ("before", T::Bool)], Some(T::Int), |s, a| {
        let at = logged(recv!(s, Array).bsearch(&a[0], a[1].to_bool()));
        Ok(found(at))
    })
    .with_defaults(vec![Variant::Bool(true)]);
    b.add(
        "bsearch_custom",
        &[("value", T::Nil), ("func", T::Callable), ("before", T::Bool)],
        Some(T::Int),
        |s, a| {
            let at = logged(recv!(s, Array).bsearch_custom(
                &a[0],
                &callable_arg(&a[1]),
                a[2].to_bool(),
            ));
            Ok(found(at))
        },
    )
    .with_defaults(vec![Variant::Bool(true)]);
    b.add("reverse", NONE, None, |s, _| {
        logged(recv!(s, Array).reverse());
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("shuffle", NONE, None, |s, _| {
        logged(recv!(s, Array).shuffle());
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("pick_random", NONE, Some(T::Nil), |s, _| {
        Ok(or_nil(logged(recv!(s, Array).pick_random())))
    });
    b.add(
        "slice",
        &[("begin", T::Int), ("end", T::Int), ("step", T::Int), ("deep", T::Bool)],
        Some(T::Array),
        |s, a| {
            let out = logged(recv!(s, Array).slice(
                a[0].to_int(),
                a[1].to_int(),
                a[2].to_int(),
                a[3].to_bool(),
            ));
            Ok(Variant::Array(out.unwrap_or_default()))
        },
    )
    .with_defaults(vec![
        Variant::Int(i64::from(i32::MAX)),
        Variant::Int(1),
        Variant::Bool(false),
    ]);
    b.add("filter", &[("method", T::Callable)], Some(T::Array), |s, a| {
        let out = logged(recv!(s, Array).filter(&callable_arg(&a[0])));
        Ok(Variant::Array(out.unwrap_or_default()))
    });
    b.add("map", &[("method", T::Callable)], Some(T::Array), |s, a| {
        let out = logged(recv!(s, Array).map(&callable_arg(&a[0])));
        Ok(Variant::Array(out.unwrap_or_default()))
    });
    b.add(
        "reduce",
        &[("method", T::Callable), ("accum", T::Nil)],
        Some(T::Nil),
        |s, a| {
            let out = logged(recv!(s, Array).reduce(&callable_arg(&a[0]), a[1].clone()));
            Ok(or_nil(out))
        },
    )
    .with_defaults(vec![Variant::Nil]);
    b.add("any", &[("method", T::Callable)], Some(T::Bool), |s, a| {
        let out = logged(recv!(s, Array).any(&callable_arg(&a[0])));
        Ok(Variant::Bool(out.unwrap_or(false)))
    });
    b.add("all", &[("method", T::Callable)], Some(T::Bool), |s, a| {
        let out = logged(recv!(s, Array).all(&callable_arg(&a[0])));
        Ok(Variant::Bool(out.unwrap_or(false)))
    });
    b.add("max", NONE, Some(T::Nil), |s, _| Ok(recv!(s, Array).max()));
    b.add("min", NONE, Some(T::Nil), |s, _| Ok(recv!(s, Array).min()));
    b.add("duplicate", &[("deep", T::Bool)], Some(T::Array), |s, a| {
        Ok(Variant::Array(recv!(s, Array).duplicate(a[0].to_bool())))
    })
    .with_defaults(vec![Variant::Bool(false)]);
    b.add("is_typed", NONE, Some(T::Bool), |s, _| Ok(Variant::Bool(recv!(s, Array).is_typed())));
    b.add("get_typed_builtin", NONE, Some(T::Int), |s, _| {
        Ok(Variant::Int(i64::from(recv!(s, Array).get_typed_builtin().raw())))
    });
    b.add("get_typed_class_name", NONE, Some(T::StringName), |s, _| {
        Ok(Variant::StringName(recv!(s, Array).get_typed_class_name()))
    });
    b.add("get_typed_script", NONE, Some(T::Nil), |s, _| {
        Ok(recv!(s, Array).get_typed_script())
    });
    b.add("make_read_only", NONE, None, |s, _| {
        recv!(s, Array).set_read_only(true);
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("is_read_only", NONE, Some(T::Bool), |s, _| {
        Ok(Variant::Bool(recv!(s, Array).is_read_only()))
    });
}

/// Access to one packed kind's payload inside a Variant.
trait PackedSlot: PackedElement {
    fn slot(v: &mut Variant) -> Option<&mut PackedArray<Self>>;
}

macro_rules! packed_slot {
    ($($elem:ty => $kind:ident),* $(,)?) => {
        $(
            impl PackedSlot for $elem {
                fn slot(v: &mut Variant) -> Option<&mut PackedArray<$elem>> {
                    match v {
                        Variant::$kind(a) => Some(a),
                        _ => None,
                    }
                }
            }
        )*
    };
}

packed_slot! {
    u8 => PackedByteArray,
    i32 => PackedInt32Array,
    i64 => PackedInt64Array,
    f32 => PackedFloat32Array,
    f64 => PackedFloat64Array,
    GString => PackedStringArray,
    Vector2 => PackedVector2Array,
    Vector3 => PackedVector3Array,
    Color => PackedColorArray,
}

fn packed<T: PackedSlot>(v: &mut Variant) -> Result<&mut PackedArray<T>, CallError> {
    T::slot(v).ok_or(CallError::InvalidMethod)
}

fn element<T: PackedElement>(v: &Variant) -> T {
    T::from_variant(v).unwrap_or_default()
}

fn packed_methods<T: PackedSlot>(b: &mut Builder) {
    use VariantType as T_;
    let value_args: &'static [(&'static str, VariantType)] = match T::ELEMENT_TYPE {
        T_::Int => &[("value", T_::Int)],
        T_::Float => &[("value", T_::Float)],
        T_::String => &[("value", T_::String)],
        T_::Vector2 => &[("value", T_::Vector2)],
        T_::Vector3 => &[("value", T_::Vector3)],
        _ => &[("value", T_::Color)],
    };
    let index_value_args: &'static [(&'static str, VariantType)] = match T::ELEMENT_TYPE {
        T_::Int => &[("index", T_::Int), ("value", T_::Int)],
        T_::Float => &[("index", T_::Int), ("value", T_::Float)],
        T_::String => &[("index", T_::Int), ("value", T_::String)],
        T_::Vector2 => &[("index", T_::Int), ("value", T_::Vector2)],
        T_::Vector3 => &[("index", T_::Int), ("value", T_::Vector3)],
        _ => &[("index", T_::Int), ("value", T_::Color)],
    };
    let array_args: &'static [(&'static str, VariantType)] = match T::ARRAY_TYPE {
        T_::PackedByteArray => &[("array", T_::PackedByteArray)],
        T_::PackedInt32Array => &[("array", T_::PackedInt32Array)],
        T_::PackedInt64Array => &[("array", T_::PackedInt64Array)],
        T_::PackedFloat32Array => &[("array", T_::PackedFloat32Array)],
        T_::PackedFloat64Array => &[("array", T_::PackedFloat64Array)],
        T_::PackedStringArray => &[("array", T_::PackedStringArray)],
        T_::PackedVector2Array => &[("array", T_::PackedVector2Array)],
        T_::PackedVector3Array => &[("array", T_::PackedVector3Array)],
        _ => &[("array", T_::PackedColorArray)],
    };

    b.add("size", NONE, Some(T_::Int), |s, _| Ok(int(packed::<T>(s)?.len())));
    b.add("is_empty", NONE, Some(T_::Bool), |s, _| {
        Ok(Variant::Bool(packed::<T>(s)?.is_empty()))
    });
    b.add("push_back", value_args, Some(T_::Bool), |s, a| {
        packed::<T>(s)?.push(element(&a[0]));
        Ok(Variant::Bool(true))
    })
    .mutating();
    b.add("append", value_args, Some(T_::Bool), |s, a| {
        packed::<T>(s)?.push(element(&a[0]));
        Ok(Variant::Bool(true))
    })
    .mutating();
    b.add("append_array", array_args, None, |s, a| {
        let mut other = a[0].clone();
        let other = packed::<T>(&mut other)?.clone();
        packed::<T>(s)?.append_array(&other);
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("set", index_value_args, None, |s, a| {
        let i = index_arg(&a[0]);
        if !packed::<T>(s)?.set(i, element(&a[1])) {
            crate::err_print!("Index p_index = {i} is out of bounds.");
        }
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("insert", index_value_args, Some(T_::Int), |s, a| {
        let ok = packed::<T>(s)?.insert(index_arg(&a[0]), element(&a[1]));
        Ok(Variant::Int(if ok { 0 } else { 1 }))
    })
    .mutating();
    b.add("remove_at", &[("index", T_::Int)], None, |s, a| {
        packed::<T>(s)?.remove_at(index_arg(&a[0]));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("resize", &[("new_size", T_::Int)], Some(T_::Int), |s, a| {
        packed::<T>(s)?.resize(index_arg(&a[0]));
        Ok(Variant::Int(0))
    })
    .mutating();
    b.add("fill", value_args, None, |s, a| {
        packed::<T>(s)?.fill(element(&a[0]));
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("clear", NONE, None, |s, _| {
        packed::<T>(s)?.clear();
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("reverse", NONE, None, |s, _| {
        packed::<T>(s)?.reverse();
        Ok(Variant::Nil)
    })
    .mutating();
    b.add("has", value_args, Some(T_::Bool), |s, a| {
        Ok(Variant::Bool(packed::<T>(s)?.has(&element(&a[0]))))
    });
    b.add("find", value_args, Some(T_::Int), |s, a| {
        Ok(found(packed::<T>(s)?.find(&element(&a[0]))))
    });
    b.add("count", value_args, Some(T_::Int), |s, a| {
        Ok(int(packed::<T>(s)?.count(&element(&a[0]))))
    });
    b.add("slice", &[("begin", T_::Int), ("end", T_::Int)], Some(T::ARRAY_TYPE), |s, a| {
        let out = packed::<T>(s)?.slice(a[0].to_int(), a[1].to_int());
        let mut v = Variant::default_of(T::ARRAY_TYPE);
        *packed::<T>(&mut v)? = out;
        Ok(v)
    })
    .with_defaults(vec![Variant::Int(i64::from(i32::MAX))]);
    b.add("duplicate", NONE, Some(T::ARRAY_TYPE), |s, _| {
        let out = packed::<T>(s)?.duplicate();
        let mut v = Variant::default_of(T::ARRAY_TYPE);
        *packed::<T>(&mut v)? = out;
        Ok(v)
    });
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

fn build_table() -> Vec<Vec<BuiltinMethod>> {
    VariantType::ALL
        .iter()
        .map(|&ty| {
            let mut b = Builder {
                owner: ty,
                methods: Vec::new(),
            };
            match ty {
                VariantType::String => string_methods(&mut b),
                VariantType::StringName => string_name_methods(&mut b),
                VariantType::NodePath => node_path_methods(&mut b),
                VariantType::Callable => callable_methods(&mut b),
                VariantType::Signal => signal_methods(&mut b),
                VariantType::Dictionary => dictionary_methods(&mut b),
                VariantType::Array => array_methods(&mut b),
                VariantType::PackedByteArray => packed_methods::<u8>(&mut b),
                VariantType::PackedInt32Array => packed_methods::<i32>(&mut b),
                VariantType::PackedInt64Array => packed_methods::<i64>(&mut b),
                VariantType::PackedFloat32Array => packed_methods::<f32>(&mut b),
                VariantType::PackedFloat64Array => packed_methods::<f64>(&mut b),
                VariantType::PackedStringArray => packed_methods::<GString>(&mut b),
                VariantType::PackedVector2Array => packed_methods::<Vector2>(&mut b),
                VariantType::PackedVector3Array => packed_methods::<Vector3>(&mut b),
                VariantType::PackedColorArray => packed_methods::<Color>(&mut b),
                other => {
                    vector_methods(other, &mut b);
                    geometry_methods(other, &mut b);
                }
            }
            for method in &mut b.methods {
                method.hash = method.compute_hash();
            }
            b.methods
        })
        .collect()
}

fn table() -> &'static [Vec<BuiltinMethod>] {
    static TABLE: OnceLock<Vec<Vec<BuiltinMethod>>> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

/// Every builtin method of `ty`, in registration order.
pub fn builtin_methods_of(ty: VariantType) -> &'static [BuiltinMethod] {
    table().get(ty as usize).map_or(&[], Vec::as_slice)
}

pub fn builtin_method(ty: VariantType, name: &str) -> Option<&'static BuiltinMethod> {
    builtin_methods_of(ty).iter().find(|m| m.name == *name)
}

/// Dynamic call of a builtin method on `receiver`.
pub fn call_builtin(
    receiver: &mut Variant,
    method: &StringName,
    args: &[&Variant],
) -> Result<Variant, CallError> {
    let found = builtin_method(receiver.get_type(), method.as_str()).ok_or(CallError::InvalidMethod)?;
    found.call(receiver, args)
}

/// Dynamic call of a static builtin method.
pub fn call_builtin_static(
    ty: VariantType,
    method: &StringName,
    args: &[&Variant],
) -> Result<Variant, CallError> {
    let found = builtin_method(ty, method.as_str())
        .filter(|m| m.is_static)
        .ok_or(CallError::InvalidMethod)?;
    let mut receiver = Variant::Nil;
    found.call(&mut receiver, args)
}

impl Variant {
    /// Call `method` on this value: objects through the class database,
    /// builtin kinds through the builtin table.
    pub fn call(&mut self, method: &StringName, args: &[&Variant]) -> Result<Variant, CallError> {
        match self {
            Variant::Object(o) => {
                let object = o.get().ok_or(CallError::InstanceIsNull)?;
                object.call(method, args)
            }
            _ => call_builtin(self, method, args),
        }
    }

    pub fn call_static(
        ty: VariantType,
        method: &StringName,
        args: &[&Variant],
    ) -> Result<Variant, CallError> {
        call_builtin_static(ty, method, args)
    }

    pub fn has_method(&self, method: &StringName) -> bool {
        match self {
            Variant::Object(o) => o.get().is_some_and(|obj| obj.has_method(method)),
            other => builtin_method(other.get_type(), method.as_str()).is_some(),
        }
    }

    pub fn has_builtin_method(ty: VariantType, method: &StringName) -> bool {
        builtin_method(ty, method.as_str()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::Callable;
    use crate::dictionary::Dictionary;
    use crate::packed::PackedInt32Array;

    fn name(s: &str) -> StringName {
        StringName::new(s)
    }

    #[test]
    fn string_methods_with_defaults() {
        let mut s = Variant::from("hello world");
        assert_eq!(s.call(&name("length"), &[]), Ok(Variant::Int(11)));
        assert_eq!(s.call(&name("find"), &[&Variant::from("o")]), Ok(Variant::Int(4)));
        assert_eq!(
            s.call(&name("find"), &[&Variant::from("o"), &Variant::from(5)]),
            Ok(Variant::Int(7))
        );
        assert_eq!(s.call(&name("substr"), &[&Variant::from(6)]), Ok(Variant::from("world")));
    }

    #[test]
    fn arity_and_argument_errors() {
        let mut s = Variant::from("x");
        assert_eq!(
            s.call(&name("repeat"), &[]),
            Err(CallError::TooFewArguments { expected: 1 })
        );
        assert_eq!(
            s.call(&name("length"), &[&Variant::Nil]),
            Err(CallError::TooManyArguments { expected: 0 })
        );
        assert_eq!(
            s.call(&name("repeat"), &[&Variant::from("3")]),
            Err(CallError::InvalidArgument {
                argument: 0,
                expected: VariantType::Int
            })
        );
        assert_eq!(s.call(&name("nope"), &[]), Err(CallError::InvalidMethod));
    }

    #[test]
    fn vector_methods_convert_int_arguments() {
        let mut v = Variant::from(Vector2::new(3.0, 4.0));
        assert_eq!(v.call(&name("length"), &[]), Ok(Variant::Float(5.0)));
        let to = Variant::from(Vector2::ZERO);
        assert_eq!(
            v.call(&name("lerp"), &[&to, &Variant::from(1)]),
            Ok(Variant::from(Vector2::ZERO))
        );
    }

    #[test]
    fn packed_push_back_mutates_the_receiver_only() {
        let original: PackedInt32Array = vec![1].into();
        let mut v = Variant::PackedInt32Array(original.clone());
        v.call(&name("push_back"), &[&Variant::from(2)]).unwrap();
        assert_eq!(v.call(&name("size"), &[]), Ok(Variant::Int(2)));
        assert_eq!(original.len(), 1);
    }

    #[test]
    fn array_and_dictionary_methods_share_storage() {
        let a = Array::new();
        let mut v = Variant::Array(a.clone());
        v.call(&name("push_back"), &[&Variant::from(7)]).unwrap();
        assert_eq!(a.len(), 1);

        let d = Dictionary::new();
        let mut dv = Variant::Dictionary(d.clone());
        d.set(Variant::from("k"), Variant::from(1));
        assert_eq!(dv.call(&name("get"), &[&Variant::from("k")]), Ok(Variant::Int(1)));
        assert_eq!(
            dv.call(&name("get"), &[&Variant::from("missing"), &Variant::from(9)]),
            Ok(Variant::Int(9))
        );
    }

    #[test]
    fn callable_call_is_vararg() {
        let sum = Callable::from_fn("sum", |args| {
            Ok(Variant::Int(args.iter().map(|a| a.to_int()).sum()))
        });
        let mut v = Variant::Callable(sum);
        assert_eq!(
            v.call(&name("call"), &[&Variant::from(1), &Variant::from(2), &Variant::from(3)]),
            Ok(Variant::Int(6))
        );
    }

    #[test]
    fn static_methods() {
        assert_eq!(
            call_builtin_static(VariantType::String, &name("chr"), &[&Variant::from(65)]),
            Ok(Variant::from("A"))
        );
        assert_eq!(
            call_builtin_static(VariantType::String, &name("length"), &[]),
            Err(CallError::InvalidMethod)
        );
    }

    #[test]
    fn hashes_follow_the_signature() {
        let length = builtin_method(VariantType::String, "length").unwrap();
        assert_eq!(
            length.hash,
            gdhost_sys::method_signature_hash(Some(VariantType::Int.raw()), &[], true, false)
        );
        let push = builtin_method(VariantType::Array, "push_back").unwrap();
        assert!(!push.is_const);
        assert_ne!(push.hash, length.hash);
    }

    #[test]
    fn has_method() {
        assert!(Variant::from("x").has_method(&name("to_upper")));
        assert!(!Variant::from(1).has_method(&name("to_upper")));
    }
}
