// `Callable` and `Signal` value types.
//
// A callable is either a bound object method (object id plus method name,
// dispatched through the class database at call time) or a custom Rust
// closure. Both are shared behind an `Arc`, so copying a callable Variant is
// a refcount bump. `Array::filter`/`map`/`reduce`/`any`/`all` and
// `sort_custom`/`bsearch_custom` take callables.
//
// A signal is only a value here (object id plus signal name); connection
// bookkeeping belongs to the scene layer, which is out of scope.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::CallError;
use crate::hashing::{hash_murmur3_one_32, hash_murmur3_one_64, HASH_MURMUR3_SEED};
use crate::object;
use crate::string::StringName;
use crate::types::InstanceId;
use crate::variant::Variant;

/// A callable implemented in Rust.
pub trait CustomCallable: Send + Sync {
    fn call(&self, args: &[&Variant]) -> Result<Variant, CallError>;

    /// Text shown by `str()` on the callable.
    fn text(&self) -> String;

    /// Object the callable is bound to, if any.
    fn object(&self) -> InstanceId {
        InstanceId::NULL
    }
}

struct FnCallable<F> {
    name: String,
    func: F,
}

impl<F> CustomCallable for FnCallable<F>
where
    F: Fn(&[&Variant]) -> Result<Variant, CallError> + Send + Sync,
{
    fn call(&self, args: &[&Variant]) -> Result<Variant, CallError> {
        (self.func)(args)
    }

    fn text(&self) -> String {
        self.name.clone()
    }
}

enum CallableKind {
    Method { object: InstanceId, method: StringName },
    Custom(Box<dyn CustomCallable>),
}

#[derive(Clone, Default)]
pub struct Callable(Option<Arc<CallableKind>>);

impl Callable {
    pub fn from_object_method(object: InstanceId, method: StringName) -> Self {
        Self(Some(Arc::new(CallableKind::Method { object, method })))
    }

    pub fn from_custom(custom: Box<dyn CustomCallable>) -> Self {
        Self(Some(Arc::new(CallableKind::Custom(custom))))
    }

    /// Wrap a closure. `name` is what the callable prints as.
    pub fn from_fn<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[&Variant]) -> Result<Variant, CallError> + Send + Sync + 'static,
    {
        Self::from_custom(Box::new(FnCallable {
            name: name.to_owned(),
            func,
        }))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.0.as_deref(), Some(CallableKind::Custom(_)))
    }

    pub fn is_standard(&self) -> bool {
        matches!(self.0.as_deref(), Some(CallableKind::Method { .. }))
    }

    pub fn object_id(&self) -> InstanceId {
        match self.0.as_deref() {
            Some(CallableKind::Method { object, .. }) => *object,
            Some(CallableKind::Custom(c)) => c.object(),
            None => InstanceId::NULL,
        }
    }

    pub fn method(&self) -> StringName {
        match self.0.as_deref() {
            Some(CallableKind::Method { method, .. }) => method.clone(),
            _ => StringName::default(),
        }
    }

    pub fn call(&self, args: &[&Variant]) -> Result<Variant, CallError> {
        match self.0.as_deref() {
            None => Err(CallError::InstanceIsNull),
            Some(CallableKind::Custom(c)) => c.call(args),
            Some(CallableKind::Method { object, method }) => {
                let target = object::get(*object).ok_or(CallError::InstanceIsNull)?;
                target.call(method, args)
            }
        }
    }

    pub fn callv(&self, args: &[Variant]) -> Result<Variant, CallError> {
        let refs: Vec<&Variant> = args.iter().collect();
        self.call(&refs)
    }

    pub fn is_valid(&self) -> bool {
        match self.0.as_deref() {
            None => false,
            Some(CallableKind::Custom(_)) => true,
            Some(CallableKind::Method { object, method }) => {
                object::get(*object).is_some_and(|o| o.has_method(method))
            }
        }
    }

    pub fn hash_value(&self) -> u32 {
        match self.0.as_deref() {
            None => 0,
            Some(CallableKind::Method { object, method }) => {
                hash_murmur3_one_32(method.hash_value(), hash_murmur3_one_64(object.0, HASH_MURMUR3_SEED))
            }
            Some(CallableKind::Custom(_)) => {
                let addr = self.0.as_ref().map_or(0, |a| Arc::as_ptr(a) as usize);
                hash_murmur3_one_64(addr as u64, HASH_MURMUR3_SEED)
            }
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) if Arc::ptr_eq(a, b) => true,
            (Some(a), Some(b)) => match (a.as_ref(), b.as_ref()) {
                (
                    CallableKind::Method { object: oa, method: ma },
                    CallableKind::Method { object: ob, method: mb },
                ) => oa == ob && ma == mb,
                _ => false,
            },
            _ => false,
        }
    }
}

impl Eq for Callable {}

impl Hash for Callable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash_value());
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_deref() {
            None => f.write_str("null::null"),
            Some(CallableKind::Custom(c)) => f.write_str(&c.text()),
            Some(CallableKind::Method { object, method }) => {
                let class = object::get(*object)
                    .map(|o| o.class_name().to_string())
                    .unwrap_or_else(|| "null".to_owned());
                write!(f, "{class}::{method}")
            }
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({self})")
    }
}

/// An object's named signal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signal {
    pub object: InstanceId,
    pub name: StringName,
}

impl Signal {
    pub fn new(object: InstanceId, name: StringName) -> Self {
        Self { object, name }
    }

    pub fn is_null(&self) -> bool {
        self.object.is_null() && self.name.is_empty()
    }

    pub fn hash_value(&self) -> u32 {
        hash_murmur3_one_32(self.name.hash_value(), hash_murmur3_one_64(self.object.0, HASH_MURMUR3_SEED))
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = object::get(self.object)
            .map(|o| o.class_name().to_string())
            .unwrap_or_else(|| "null".to_owned());
        write!(f, "{class}::[signal]{}", self.name)
    }
}
