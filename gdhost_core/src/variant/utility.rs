// Global utility functions (`abs`, `clamp`, `str`, `print`, ...).
//
// Same shape as the builtin method table: a static list of named functions
// with declared argument kinds and a signature hash, callable dynamically
// through `call_utility` and natively through the ptr thunks. Utility
// functions have no receiver and are never const.

use std::sync::OnceLock;

use smallvec::SmallVec;

use super::ops::{Operator, evaluate, interpolate};
use super::{Variant, VariantType, native};
use crate::class_db;
use crate::error::CallError;
use crate::object::{self, ObjectRef};
use crate::string::StringName;
use crate::types::InstanceId;

pub type UtilityFn = fn(&[Variant]) -> Result<Variant, CallError>;

pub struct UtilityFunction {
    pub name: StringName,
    pub arguments: &'static [(&'static str, VariantType)],
    pub return_type: Option<VariantType>,
    pub is_vararg: bool,
    pub hash: u32,
    func: UtilityFn,
}

impl UtilityFunction {
    fn new(
        name: &str,
        arguments: &'static [(&'static str, VariantType)],
        return_type: Option<VariantType>,
        is_vararg: bool,
        func: UtilityFn,
    ) -> Self {
        let args: SmallVec<[u32; 8]> = arguments.iter().map(|(_, t)| t.raw()).collect();
        let hash = gdhost_sys::method_signature_hash(
            return_type.map(VariantType::raw),
            &args,
            false,
            is_vararg,
        );
        Self {
            name: StringName::new(name),
            arguments,
            return_type,
            is_vararg,
            hash,
            func,
        }
    }

    pub fn call(&self, args: &[&Variant]) -> Result<Variant, CallError> {
        let declared = self.arguments.len();
        if args.len() < declared {
            return Err(CallError::TooFewArguments {
                expected: i32::try_from(declared).unwrap_or(i32::MAX),
            });
        }
        if args.len() > declared && !self.is_vararg {
            return Err(CallError::TooManyArguments {
                expected: i32::try_from(declared).unwrap_or(i32::MAX),
            });
        }
        let mut prepared: SmallVec<[Variant; 8]> = SmallVec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            match self.arguments.get(i) {
                Some(&(_, expected)) if expected != VariantType::Nil && arg.get_type() != expected => {
                    let argument = i32::try_from(i).unwrap_or(i32::MAX);
                    let converted = arg
                        .convert_strict(expected)
                        .map_err(|_| CallError::InvalidArgument { argument, expected })?;
                    prepared.push(converted);
                }
                _ => prepared.push((*arg).clone()),
            }
        }
        let result = (self.func)(&prepared)?;
        Ok(if self.return_type.is_some() {
            result
        } else {
            Variant::Nil
        })
    }

    /// Call with native-typed arguments.
    ///
    /// # Safety
    /// `args` must hold `argcount` pointers (at least one per declared
    /// argument) to values of the declared kinds, vararg extras pointing to
    /// Variants. `ret` must point to initialized storage of the return kind
    /// or be null.
    pub unsafe fn ptrcall(
        &self,
        ret: gdhost_sys::TypePtr,
        args: *const gdhost_sys::ConstTypePtr,
        argcount: i32,
    ) {
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
        match (self.func)(&values) {
            Ok(value) => {
                if let Some(rt) = self.return_type
                    && !ret.is_null()
                {
                    unsafe { native::write(rt, ret, value) };
                }
            }
            Err(e) => crate::err_print!("utility function '{}' failed: {e}", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Function bodies
// ---------------------------------------------------------------------------

fn numeric_argument(argument: i32) -> CallError {
    CallError::InvalidArgument {
        argument,
        expected: VariantType::Float,
    }
}

fn abs(a: &[Variant]) -> Result<Variant, CallError> {
    Ok(match &a[0] {
        Variant::Int(i) => Variant::Int(i.wrapping_abs()),
        Variant::Float(f) => Variant::Float(f.abs()),
        Variant::Vector2(v) => Variant::Vector2(v.abs()),
        Variant::Vector2i(v) => Variant::Vector2i(v.abs()),
        Variant::Vector3(v) => Variant::Vector3(v.abs()),
        Variant::Vector3i(v) => Variant::Vector3i(v.abs()),
        Variant::Vector4(v) => Variant::Vector4(v.abs()),
        Variant::Vector4i(v) => Variant::Vector4i(v.abs()),
        _ => return Err(numeric_argument(0)),
    })
}

fn sign(a: &[Variant]) -> Result<Variant, CallError> {
    let f = |x: f64| {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    };
    Ok(match &a[0] {
        Variant::Int(i) => Variant::Int(i.signum()),
        Variant::Float(x) => Variant::Float(f(*x)),
        _ => return Err(numeric_argument(0)),
    })
}

fn less(a: &Variant, b: &Variant, argument: i32) -> Result<bool, CallError> {
    match evaluate(Operator::Less, a, b) {
        Some(Variant::Bool(less)) => Ok(less),
        _ => Err(numeric_argument(argument)),
    }
}

fn extreme(a: &[Variant], want_less: bool) -> Result<Variant, CallError> {
    if a.len() < 2 {
        return Err(CallError::TooFewArguments { expected: 2 });
    }
    let mut best = &a[0];
    for (i, candidate) in a.iter().enumerate().skip(1) {
        let argument = i32::try_from(i).unwrap_or(i32::MAX);
        let replace = if want_less {
            less(candidate, best, argument)?
        } else {
            less(best, candidate, argument)?
        };
        if replace {
            best = candidate;
        }
    }
    Ok(best.clone())
}

fn clamp(a: &[Variant]) -> Result<Variant, CallError> {
    let (value, min, max) = (&a[0], &a[1], &a[2]);
    if less(value, min, 1)? {
        return Ok(min.clone());
    }
    if less(max, value, 2)? {
        return Ok(max.clone());
    }
    Ok(value.clone())
}

fn lerp(a: &[Variant]) -> Result<Variant, CallError> {
    let (from, to) = (&a[0], &a[1]);
    if from.get_type() != to.get_type()
        && !matches!(
            (from, to),
            (Variant::Int(_) | Variant::Float(_), Variant::Int(_) | Variant::Float(_))
        )
    {
        return Err(CallError::InvalidArgument {
            argument: 1,
            expected: from.get_type(),
        });
    }
    let weight = a[2].to_float();
    Ok(match (from, to) {
        (Variant::Int(_) | Variant::Float(_), _) => {
            let (x, y) = (from.to_float(), to.to_float());
            Variant::Float(x + (y - x) * weight)
        }
        _ => interpolate(from, to, weight),
    })
}

fn rounded(a: &[Variant], f: fn(f64) -> f64) -> Result<Variant, CallError> {
    #[allow(clippy::cast_possible_truncation)]
    let f32_op = |x: f32| f(f64::from(x)) as f32;
    Ok(match &a[0] {
        Variant::Int(i) => Variant::Int(*i),
        Variant::Float(x) => Variant::Float(f(*x)),
        Variant::Vector2(v) => Variant::Vector2(crate::math::Vector2::new(f32_op(v.x), f32_op(v.y))),
        Variant::Vector3(v) => Variant::Vector3(crate::math::Vector3::new(
            f32_op(v.x),
            f32_op(v.y),
            f32_op(v.z),
        )),
        Variant::Vector2i(_) | Variant::Vector3i(_) | Variant::Vector4i(_) => a[0].clone(),
        _ => return Err(numeric_argument(0)),
    })
}

/// Identity for shared kinds, value equality otherwise.
fn same(a: &Variant, b: &Variant) -> bool {
    match (a, b) {
        (Variant::Array(x), Variant::Array(y)) => x.is_same(y),
        (Variant::Dictionary(x), Variant::Dictionary(y)) => x.is_same(y),
        (Variant::Object(x), Variant::Object(y)) => x.id == y.id,
        (Variant::String(x), Variant::String(y)) => x.ptr_eq(y) || x == y,
        _ => a.get_type() == b.get_type() && a.hash_compare(b),
    }
}

fn joined(a: &[Variant]) -> String {
    a.iter().map(Variant::stringify).collect()
}

fn instance_id(v: &Variant) -> InstanceId {
    InstanceId(u64::from_ne_bytes(v.to_int().to_ne_bytes()))
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

fn build_table() -> Vec<UtilityFunction> {
    use VariantType as T;
    const ANY: &[(&str, VariantType)] = &[("x", T::Nil)];
    vec![
        UtilityFunction::new("abs", ANY, Some(T::Nil), false, abs),
        UtilityFunction::new("sign", ANY, Some(T::Nil), false, sign),
        UtilityFunction::new("min", &[], Some(T::Nil), true, |a| extreme(a, true)),
        UtilityFunction::new("max", &[], Some(T::Nil), true, |a| extreme(a, false)),
        UtilityFunction::new(
            "clamp",
            &[("value", T::Nil), ("min", T::Nil), ("max", T::Nil)],
            Some(T::Nil),
            false,
            clamp,
        ),
        UtilityFunction::new(
            "lerp",
            &[("from", T::Nil), ("to", T::Nil), ("weight", T::Nil)],
            Some(T::Nil),
            false,
            lerp,
        ),
        UtilityFunction::new("sqrt", &[("x", T::Float)], Some(T::Float), false, |a| {
            Ok(Variant::Float(a[0].to_float().sqrt()))
        }),
        UtilityFunction::new("floor", ANY, Some(T::Nil), false, |a| rounded(a, f64::floor)),
        UtilityFunction::new("ceil", ANY, Some(T::Nil), false, |a| rounded(a, f64::ceil)),
        UtilityFunction::new("round", ANY, Some(T::Nil), false, |a| rounded(a, f64::round)),
        UtilityFunction::new("str", &[], Some(T::String), true, |a| {
            Ok(Variant::from(joined(a)))
        }),
        UtilityFunction::new("typeof", &[("variable", T::Nil)], Some(T::Int), false, |a| {
            Ok(Variant::Int(i64::from(a[0].get_type().raw())))
        }),
        UtilityFunction::new(
            "type_exists",
            &[("type", T::StringName)],
            Some(T::Bool),
            false,
            |a| Ok(Variant::Bool(class_db::class_exists(&a[0].to_string_name()))),
        ),
        UtilityFunction::new(
            "is_same",
            &[("a", T::Nil), ("b", T::Nil)],
            Some(T::Bool),
            false,
            |a| Ok(Variant::Bool(same(&a[0], &a[1]))),
        ),
        UtilityFunction::new("hash", &[("variable", T::Nil)], Some(T::Int), false, |a| {
            Ok(Variant::Int(i64::from(a[0].hash())))
        }),
        UtilityFunction::new("print", &[], None, true, |a| {
            log::info!("{}", joined(a));
            Ok(Variant::Nil)
        }),
        UtilityFunction::new("push_error", &[], None, true, |a| {
            crate::err_print!("{}", joined(a));
            Ok(Variant::Nil)
        }),
        UtilityFunction::new("push_warning", &[], None, true, |a| {
            crate::warn_print!("{}", joined(a));
            Ok(Variant::Nil)
        }),
        UtilityFunction::new(
            "var_to_str",
            &[("variable", T::Nil)],
            Some(T::String),
            false,
            |a| Ok(Variant::from(a[0].to_code_string())),
        ),
        UtilityFunction::new(
            "instance_from_id",
            &[("instance_id", T::Int)],
            Some(T::Object),
            false,
            |a| Ok(Variant::Object(ObjectRef::from_id(instance_id(&a[0])))),
        ),
        UtilityFunction::new(
            "is_instance_id_valid",
            &[("id", T::Int)],
            Some(T::Bool),
            false,
            |a| Ok(Variant::Bool(object::is_valid(instance_id(&a[0])))),
        ),
    ]
}

/// Every utility function, in registration order.
pub fn utility_functions() -> &'static [UtilityFunction] {
    static TABLE: OnceLock<Vec<UtilityFunction>> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

pub fn utility_function(name: &str) -> Option<&'static UtilityFunction> {
    utility_functions().iter().find(|f| f.name == *name)
}

pub fn call_utility(name: &StringName, args: &[&Variant]) -> Result<Variant, CallError> {
    utility_function(name.as_str())
        .ok_or(CallError::InvalidMethod)?
        .call(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{self, Severity};
    use crate::math::Vector2;

    fn call(name: &str, args: &[Variant]) -> Result<Variant, CallError> {
        let refs: Vec<&Variant> = args.iter().collect();
        call_utility(&StringName::new(name), &refs)
    }

    #[test]
    fn numeric_helpers() {
        assert_eq!(call("abs", &[Variant::from(-3)]), Ok(Variant::Int(3)));
        assert_eq!(call("abs", &[Variant::from(-1.5)]), Ok(Variant::Float(1.5)));
        assert_eq!(
            call("abs", &[Variant::from(Vector2::new(-1.0, 2.0))]),
            Ok(Variant::from(Vector2::new(1.0, 2.0)))
        );
        assert_eq!(call("sign", &[Variant::from(-7)]), Ok(Variant::Int(-1)));
        assert_eq!(call("sqrt", &[Variant::from(9)]), Ok(Variant::Float(3.0)));
        assert_eq!(call("floor", &[Variant::from(2.7)]), Ok(Variant::Float(2.0)));
        assert!(call("abs", &[Variant::from("x")]).is_err());
    }

    #[test]
    fn min_max_clamp() {
        assert_eq!(
            call("min", &[Variant::from(3), Variant::from(1.5), Variant::from(2)]),
            Ok(Variant::Float(1.5))
        );
        assert_eq!(call("max", &[Variant::from(3), Variant::from(9)]), Ok(Variant::Int(9)));
        assert_eq!(
            call("min", &[Variant::from(3)]),
            Err(CallError::TooFewArguments { expected: 2 })
        );
        assert_eq!(
            call("clamp", &[Variant::from(12), Variant::from(0), Variant::from(10)]),
            Ok(Variant::Int(10))
        );
    }

    #[test]
    fn lerp_numbers_and_vectors() {
        assert_eq!(
            call("lerp", &[Variant::from(0), Variant::from(10), Variant::from(0.5)]),
            Ok(Variant::Float(5.0))
        );
        assert_eq!(
            call(
                "lerp",
                &[
                    Variant::from(Vector2::ZERO),
                    Variant::from(Vector2::new(2.0, 4.0)),
                    Variant::from(0.5)
                ]
            ),
            Ok(Variant::from(Vector2::new(1.0, 2.0)))
        );
    }

    #[test]
    fn strings_and_types() {
        assert_eq!(
            call("str", &[Variant::from("a"), Variant::from(1), Variant::Nil]),
            Ok(Variant::from("a1<null>"))
        );
        assert_eq!(
            call("typeof", &[Variant::from(1.0)]),
            Ok(Variant::Int(i64::from(VariantType::Float.raw())))
        );
        assert_eq!(
            call("type_exists", &[Variant::from("Object")]),
            Ok(Variant::Bool(true))
        );
        assert_eq!(call("var_to_str", &[Variant::from("hi")]), Ok(Variant::from("\"hi\"")));
    }

    #[test]
    fn is_same_uses_identity_for_shared_kinds() {
        let a = Variant::Array(crate::array::Array::new());
        let b = Variant::Array(crate::array::Array::new());
        assert_eq!(call("is_same", &[a.clone(), a.clone()]), Ok(Variant::Bool(true)));
        assert_eq!(call("is_same", &[a, b]), Ok(Variant::Bool(false)));
        assert_eq!(call("is_same", &[Variant::from(1), Variant::from(1)]), Ok(Variant::Bool(true)));
    }

    #[test]
    fn push_error_reports_a_diagnostic() {
        let (_, reports) = diag::capture(|| call("push_error", &[Variant::from("boom")]));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].severity, Severity::Error);
        assert_eq!(reports[0].message, "boom");
    }

    #[test]
    fn hashes_are_distinct_per_signature() {
        let sqrt = utility_function("sqrt").unwrap();
        assert_eq!(
            sqrt.hash,
            gdhost_sys::method_signature_hash(
                Some(VariantType::Float.raw()),
                &[VariantType::Float.raw()],
                false,
                false
            )
        );
        assert_ne!(sqrt.hash, utility_function("abs").unwrap().hash);
        assert!(utility_function("nope").is_none());
    }
}
