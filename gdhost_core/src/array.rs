// Array: the engine's shared, optionally typed, optionally read-only list of
// Variants.
//
// An `Array` is a handle to one `ArrayPrivate` store. Cloning the handle
// shares the store (the engine's reference semantics); `duplicate` makes a
// new one. The store carries:
// - the elements,
// - the element constraint (`ContainerType`), settable once while the array
//   is empty and unshared, permanent afterwards,
// - the read-only shadow slot. `Some(_)` means read-only; element pointers
//   handed out in that state point at the shadow, which is refreshed from the
//   real element on every access, so foreign writes through them never reach
//   the store.
//
// Every mutator returns `Result<_, ArrayError>` and also reports the failure
// through `err_print!`, so callers on the ABI side can ignore the result and
// still leave a diagnostic trail.
//
// **Critical constraint: no lock held across foreign code.** Callables,
// operator evaluation on nested containers and element drops can all re-enter
// this array. Operations that call out work on a snapshot of the elements and
// write back afterwards; removed elements are dropped after the lock is
// released.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::callable::Callable;
use crate::class_db;
use crate::error::CallError;
use crate::hashing::{HASH_MURMUR3_SEED, hash_fmix32, hash_murmur3_one_32};
use crate::object;
use crate::rng;
use crate::string::StringName;
use crate::variant::{Operator, RecursionGuard, Variant, VariantType, evaluate};

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ArrayError {
    #[error("Array is in read-only state.")]
    ReadOnly,
    #[error("Index {index} is out of bounds (size {size}).")]
    IndexOutOfBounds { index: i64, size: usize },
    #[error("Can't take value from empty array.")]
    Empty,
    #[error(
        "Attempted to {action} a variable of type '{found}' into a TypedArray of type '{expected}'."
    )]
    TypeMismatch {
        action: &'static str,
        found: VariantType,
        expected: VariantType,
    },
    #[error(
        "Attempted to {action} an invalid (previously freed?) object instance into a 'TypedArray'."
    )]
    FreedObject { action: &'static str },
    #[error(
        "Attempted to {action} an object of type '{found}' into a TypedArray, which does not inherit from '{expected}'."
    )]
    ClassMismatch {
        action: &'static str,
        found: StringName,
        expected: StringName,
    },
    #[error("Type can only be set once.")]
    AlreadyTyped,
    #[error("Type can only be set when array is empty.")]
    NotEmpty,
    #[error("Type can only be set when array has no more than one user.")]
    Shared,
    #[error("Class names can only be set for type OBJECT")]
    ClassNameNotObject,
    #[error("Script class can only be set together with base class name")]
    ScriptWithoutClass,
    #[error("Slice step cannot be zero.")]
    ZeroStep,
    #[error("Slice is positive, but bounds is decreasing.")]
    PositiveStepDecreasing,
    #[error("Slice is negative, but bounds is increasing.")]
    NegativeStepIncreasing,
    #[error("Error calling method from '{method}': {source}")]
    CallFailed {
        method: &'static str,
        source: CallError,
    },
    #[error("Assignment of arrays of incompatible types.")]
    IncompatibleAssign,
}

fn fail<T>(error: ArrayError) -> Result<T, ArrayError> {
    err_print!("{error}");
    Err(error)
}

// ---------------------------------------------------------------------------
// Element constraint
// ---------------------------------------------------------------------------

/// What a typed array accepts. `kind == Nil` means unconstrained.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerType {
    pub kind: VariantType,
    pub class_name: StringName,
    pub script: Variant,
}

impl ContainerType {
    pub fn is_typed(&self) -> bool {
        self.kind != VariantType::Nil
    }

    /// Check `value` against the constraint, converting it when the strict
    /// conversion table allows.
    pub fn validate(&self, value: Variant, action: &'static str) -> Result<Variant, ArrayError> {
        if self.kind == VariantType::Nil {
            return Ok(value);
        }
        let found = value.get_type();
        if found != self.kind {
            if found == VariantType::Nil && self.kind == VariantType::Object {
                return Ok(value);
            }
            let mismatch = ArrayError::TypeMismatch {
                action,
                found,
                expected: self.kind,
            };
            if self.kind == VariantType::Object
                || !Variant::can_convert_strict(found, self.kind)
            {
                return Err(mismatch);
            }
            return value.convert(self.kind).map_err(|_| mismatch);
        }
        if self.kind != VariantType::Object {
            return Ok(value);
        }
        self.validate_object(&value, action)?;
        Ok(value)
    }

    pub fn validate_object(&self, value: &Variant, action: &'static str) -> Result<(), ArrayError> {
        if self.class_name.is_empty() {
            return Ok(());
        }
        let id = value.object_id();
        if id.is_null() {
            return Ok(());
        }
        let Some(obj) = object::get(id) else {
            return Err(ArrayError::FreedObject { action });
        };
        let class = obj.class_name();
        if !class_db::is_parent_class(&class, &self.class_name) {
            return Err(ArrayError::ClassMismatch {
                action,
                found: class,
                expected: self.class_name.clone(),
            });
        }
        Ok(())
    }

    /// Whether an array with constraint `other` may be shared as one with
    /// this constraint.
    pub fn can_reference(&self, other: &ContainerType) -> bool {
        if self.kind != other.kind {
            return false;
        }
        if self.kind != VariantType::Object || self.class_name.is_empty() {
            return true;
        }
        if other.class_name.is_empty() {
            return false;
        }
        if self.class_name != other.class_name
            && !class_db::is_parent_class(&other.class_name, &self.class_name)
        {
            return false;
        }
        self.script.is_nil() || self.script == other.script
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ArrayData {
    elements: Vec<Variant>,
    read_only: Option<Box<Variant>>,
    typed: ContainerType,
}

#[derive(Default)]
struct ArrayPrivate {
    data: RwLock<ArrayData>,
}

#[derive(Clone, Default)]
pub struct Array {
    inner: Arc<ArrayPrivate>,
}

/// `<` through the operator table; invalid comparisons are "not less".
fn variant_less(a: &Variant, b: &Variant) -> bool {
    evaluate(Operator::Less, a, b).is_some_and(|r| r.booleanize())
}

/// String and StringName compare by content; everything else by
/// `hash_compare`.
fn string_like_eq(a: &Variant, b: &Variant) -> bool {
    if a.hash_compare(b) {
        return true;
    }
    match (a.as_text(), b.as_text()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Stable merge sort that only asks "is right strictly before left", so an
/// inconsistent comparator yields some permutation instead of a panic.
fn merge_sort_by(
    mut items: Vec<Variant>,
    less: &mut impl FnMut(&Variant, &Variant) -> bool,
) -> Vec<Variant> {
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort_by(items, less);
    let right = merge_sort_by(right, less);
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => less(r, l),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
    out
}

fn bisect(
    items: &[Variant],
    value: &Variant,
    before: bool,
    less: &mut impl FnMut(&Variant, &Variant) -> bool,
) -> usize {
    let (mut lo, mut hi) = (0, items.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let go_right = if before {
            less(&items[mid], value)
        } else {
            !less(value, &items[mid])
        };
        if go_right {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn call_predicate(
    callable: &Callable,
    method: &'static str,
    args: &[&Variant],
) -> Result<Variant, ArrayError> {
    callable
        .call(args)
        .or_else(|source| fail(ArrayError::CallFailed { method, source }))
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty array constrained to `kind` (and `class_name` for objects).
    pub fn new_typed(kind: VariantType, class_name: StringName) -> Result<Self, ArrayError> {
        let array = Self::new();
        array.set_typed(kind, &class_name, &Variant::Nil)?;
        Ok(array)
    }

    pub fn len(&self) -> usize {
        self.inner.data.read_recursive().elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Variant> {
        self.inner.data.read_recursive().elements.clone()
    }

    pub fn get(&self, index: usize) -> Option<Variant> {
        self.inner.data.read_recursive().elements.get(index).cloned()
    }

    fn check_writable(&self) -> Result<(), ArrayError> {
        if self.is_read_only() {
            return fail(ArrayError::ReadOnly);
        }
        Ok(())
    }

    fn validate(&self, value: Variant, action: &'static str) -> Result<Variant, ArrayError> {
        let typed = self.inner.data.read_recursive().typed.clone();
        typed.validate(value, action).or_else(fail)
    }

    /// Resolve a possibly negative position against `size`.
    fn normalize(index: i64, size: usize) -> Option<usize> {
        let resolved = if index < 0 {
            index + size as i64
        } else {
            index
        };
        usize::try_from(resolved).ok().filter(|&i| i < size)
    }

    pub fn set(&self, index: usize, value: Variant) -> Result<(), ArrayError> {
        self.check_writable()?;
        let value = self.validate(value, "set")?;
        let old = {
            let mut data = self.inner.data.write();
            let size = data.elements.len();
            if index >= size {
                drop(data);
                return fail(ArrayError::IndexOutOfBounds {
                    index: index as i64,
                    size,
                });
            }
            std::mem::replace(&mut data.elements[index], value)
        };
        drop(old);
        Ok(())
    }

    /// Pointer to element `index`, or null when out of range. On a read-only
    /// array the pointer is the shadow slot holding a fresh copy.
    pub fn element_ptr(&self, index: usize) -> *mut Variant {
        let mut data = self.inner.data.write();
        let ArrayData {
            elements,
            read_only,
            ..
        } = &mut *data;
        let Some(element) = elements.get_mut(index) else {
            return std::ptr::null_mut();
        };
        match read_only {
            Some(shadow) => {
                **shadow = element.clone();
                std::ptr::from_mut(&mut **shadow)
            }
            None => std::ptr::from_mut(element),
        }
    }

    pub fn push_back(&self, value: Variant) -> Result<(), ArrayError> {
        self.check_writable()?;
        let value = self.validate(value, "push_back")?;
        self.inner.data.write().elements.push(value);
        Ok(())
    }

    pub fn append(&self, value: Variant) -> Result<(), ArrayError> {
        self.push_back(value)
    }

    pub fn push_front(&self, value: Variant) -> Result<(), ArrayError> {
        self.check_writable()?;
        let value = self.validate(value, "push_front")?;
        self.inner.data.write().elements.insert(0, value);
        Ok(())
    }

    /// Append every element of `other`. Nothing is appended unless all
    /// elements pass the constraint.
    pub fn append_array(&self, other: &Array) -> Result<(), ArrayError> {
        self.check_writable()?;
        let mut validated = Vec::with_capacity(other.len());
        for value in other.to_vec() {
            validated.push(self.validate(value, "append_array")?);
        }
        self.inner.data.write().elements.extend(validated);
        Ok(())
    }

    /// Insert before `position`; negative positions count from the end, so
    /// -1 inserts before the last element. `position == len()` appends.
    pub fn insert(&self, position: i64, value: Variant) -> Result<(), ArrayError> {
        self.check_writable()?;
        let value = self.validate(value, "insert")?;
        let mut data = self.inner.data.write();
        let size = data.elements.len();
        let resolved = if position < 0 { position + size as i64 } else { position };
        let Some(at) = usize::try_from(resolved).ok().filter(|&i| i <= size) else {
            drop(data);
            return fail(ArrayError::IndexOutOfBounds {
                index: position,
                size,
            });
        };
        data.elements.insert(at, value);
        Ok(())
    }

    /// Remove the first element equal to `value`. Absent values are not an
    /// error.
    pub fn erase(&self, value: &Variant) -> Result<(), ArrayError> {
        self.check_writable()?;
        let value = self.validate(value.clone(), "erase")?;
        let removed = {
            let mut data = self.inner.data.write();
            let pos = data.elements.iter().position(|e| string_like_eq(e, &value));
            pos.map(|i| data.elements.remove(i))
        };
        drop(removed);
        Ok(())
    }

    pub fn remove_at(&self, position: i64) -> Result<(), ArrayError> {
        self.pop_at_checked(position, true).map(drop)
    }

    pub fn fill(&self, value: Variant) -> Result<(), ArrayError> {
        self.check_writable()?;
        let value = self.validate(value, "fill")?;
        let old = {
            let mut data = self.inner.data.write();
            let len = data.elements.len();
            std::mem::replace(&mut data.elements, vec![value; len])
        };
        drop(old);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ArrayError> {
        self.check_writable()?;
        let old = std::mem::take(&mut self.inner.data.write().elements);
        drop(old);
        Ok(())
    }

    /// Grow with the constraint's default value (Nil when untyped or
    /// object-typed) or truncate.
    pub fn resize(&self, size: usize) -> Result<(), ArrayError> {
        self.check_writable()?;
        let removed = {
            let mut data = self.inner.data.write();
            let kind = data.typed.kind;
            let filler = if kind == VariantType::Object {
                Variant::Nil
            } else {
                Variant::default_of(kind)
            };
            if size < data.elements.len() {
                data.elements.split_off(size)
            } else {
                data.elements.resize(size, filler);
                Vec::new()
            }
        };
        drop(removed);
        Ok(())
    }

    pub fn front(&self) -> Result<Variant, ArrayError> {
        match self.get(0) {
            Some(v) => Ok(v),
            None => fail(ArrayError::Empty),
        }
    }

    pub fn back(&self) -> Result<Variant, ArrayError> {
        let last = {
            let data = self.inner.data.read_recursive();
            data.elements.last().cloned()
        };
        match last {
            Some(v) => Ok(v),
            None => fail(ArrayError::Empty),
        }
    }

    /// Remove and return the last element; Nil on an empty array.
    pub fn pop_back(&self) -> Result<Variant, ArrayError> {
        self.check_writable()?;
        Ok(self.inner.data.write().elements.pop().unwrap_or_default())
    }

    /// Remove and return the first element; Nil on an empty array.
    pub fn pop_front(&self) -> Result<Variant, ArrayError> {
        self.check_writable()?;
        let mut data = self.inner.data.write();
        if data.elements.is_empty() {
            return Ok(Variant::Nil);
        }
        Ok(data.elements.remove(0))
    }

    /// Remove and return the element at `position` (negative counts from the
    /// end). Nil without a diagnostic on an empty array.
    pub fn pop_at(&self, position: i64) -> Result<Variant, ArrayError> {
        self.pop_at_checked(position, false)
    }

    fn pop_at_checked(&self, position: i64, empty_is_error: bool) -> Result<Variant, ArrayError> {
        self.check_writable()?;
        let mut data = self.inner.data.write();
        let size = data.elements.len();
        if size == 0 && !empty_is_error {
            return Ok(Variant::Nil);
        }
        match Self::normalize(position, size) {
            Some(i) => Ok(data.elements.remove(i)),
            None => {
                drop(data);
                fail(ArrayError::IndexOutOfBounds {
                    index: position,
                    size,
                })
            }
        }
    }

    /// First index at or after `from` holding `value`. Negative `from`
    /// counts from the end and clamps at 0.
    pub fn find(&self, value: &Variant, from: i64) -> Option<usize> {
        let items = self.to_vec();
        if items.is_empty() {
            return None;
        }
        let value = self.validate(value.clone(), "find").ok()?;
        let start = if from < 0 {
            (items.len() as i64 + from).max(0)
        } else {
            from
        };
        let start = usize::try_from(start).ok()?;
        items
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, e)| string_like_eq(e, &value))
            .map(|(i, _)| i)
    }

    /// Last index at or before `from` holding `value`. Negative `from`
    /// counts from the end; anything out of range starts at the last element.
    pub fn rfind(&self, value: &Variant, from: i64) -> Option<usize> {
        let items = self.to_vec();
        if items.is_empty() {
            return None;
        }
        let value = self.validate(value.clone(), "rfind").ok()?;
        let size = items.len() as i64;
        let mut start = if from < 0 { size + from } else { from };
        if start < 0 || start >= size {
            start = size - 1;
        }
        let start = usize::try_from(start).ok()?;
        (0..=start).rev().find(|&i| string_like_eq(&items[i], &value))
    }

    pub fn count(&self, value: &Variant) -> usize {
        let Ok(value) = self.validate(value.clone(), "count") else {
            return 0;
        };
        self.to_vec()
            .iter()
            .filter(|e| string_like_eq(e, &value))
            .count()
    }

    pub fn has(&self, value: &Variant) -> bool {
        let Ok(value) = self.validate(value.clone(), "use 'has'") else {
            return false;
        };
        self.to_vec().iter().any(|e| string_like_eq(e, &value))
    }

    fn write_back(&self, items: Vec<Variant>) {
        let old = std::mem::replace(&mut self.inner.data.write().elements, items);
        drop(old);
    }

    pub fn sort(&self) -> Result<(), ArrayError> {
        self.check_writable()?;
        let sorted = merge_sort_by(self.to_vec(), &mut variant_less);
        self.write_back(sorted);
        Ok(())
    }

    /// Sort with `callable(a, b)` as "a before b". A failing call leaves the
    /// array unchanged.
    pub fn sort_custom(&self, callable: &Callable) -> Result<(), ArrayError> {
        self.check_writable()?;
        let mut error = None;
        let sorted = merge_sort_by(self.to_vec(), &mut |a, b| {
            if error.is_some() {
                return false;
            }
            match callable.call(&[a, b]) {
                Ok(r) => r.booleanize(),
                Err(e) => {
                    error = Some(e);
                    false
                }
            }
        });
        if let Some(source) = error {
            return fail(ArrayError::CallFailed {
                method: "sort_custom",
                source,
            });
        }
        self.write_back(sorted);
        Ok(())
    }

    /// Insertion point for `value` in a sorted array: the lower bound when
    /// `before`, the upper bound otherwise.
    pub fn bsearch(&self, value: &Variant, before: bool) -> Result<usize, ArrayError> {
        let value = self.validate(value.clone(), "binary search")?;
        Ok(bisect(&self.to_vec(), &value, before, &mut variant_less))
    }

    pub fn bsearch_custom(
        &self,
        value: &Variant,
        callable: &Callable,
        before: bool,
    ) -> Result<usize, ArrayError> {
        let value = self.validate(value.clone(), "custom binary search")?;
        let mut error = None;
        let at = bisect(&self.to_vec(), &value, before, &mut |a, b| {
            if error.is_some() {
                return false;
            }
            match callable.call(&[a, b]) {
                Ok(r) => r.booleanize(),
                Err(e) => {
                    error = Some(e);
                    false
                }
            }
        });
        match error {
            Some(source) => fail(ArrayError::CallFailed {
                method: "bsearch_custom",
                source,
            }),
            None => Ok(at),
        }
    }

    pub fn reverse(&self) -> Result<(), ArrayError> {
        self.check_writable()?;
        self.inner.data.write().elements.reverse();
        Ok(())
    }

    pub fn shuffle(&self) -> Result<(), ArrayError> {
        self.check_writable()?;
        let mut data = self.inner.data.write();
        rng::with_thread_rng(|r| r.shuffle(&mut data.elements));
        Ok(())
    }

    pub fn pick_random(&self) -> Result<Variant, ArrayError> {
        let picked = {
            let data = self.inner.data.read_recursive();
            if data.elements.is_empty() {
                None
            } else {
                let i = rng::with_thread_rng(|r| r.index(data.elements.len()));
                data.elements.get(i).cloned()
            }
        };
        match picked {
            Some(v) => Ok(v),
            None => fail(ArrayError::Empty),
        }
    }

    fn empty_like(&self) -> Array {
        let out = Array::new();
        out.inner.data.write().typed = self.inner.data.read_recursive().typed.clone();
        out
    }

    /// Elements from `begin` towards `end` (exclusive) every `step`.
    /// Negative bounds count from the end.
    pub fn slice(&self, begin: i64, end: i64, step: i64, deep: bool) -> Result<Array, ArrayError> {
        let result = self.empty_like();
        if step == 0 {
            return fail(ArrayError::ZeroStep);
        }
        let items = self.to_vec();
        let s = items.len() as i64;
        if s == 0 || (begin < -s && step < 0) || (begin >= s && step > 0) {
            return Ok(result);
        }
        let mut b = begin.clamp(-s, s - 1);
        if b < 0 {
            b += s;
        }
        let mut e = end.clamp(-s - 1, s);
        if e < 0 {
            e += s;
        }
        if step > 0 && b > e {
            return fail(ArrayError::PositiveStepDecreasing);
        }
        if step < 0 && b < e {
            return fail(ArrayError::NegativeStepIncreasing);
        }
        let span = e - b;
        let count = span / step + i64::from(span % step != 0);
        let mut out = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
        let mut src = b;
        for _ in 0..count {
            let Some(v) = usize::try_from(src).ok().and_then(|i| items.get(i)) else {
                break;
            };
            out.push(if deep { v.duplicate(true) } else { v.clone() });
            src += step;
        }
        result.inner.data.write().elements = out;
        Ok(result)
    }

    /// Elements for which `callable(element)` is truthy. Keeps the
    /// constraint.
    pub fn filter(&self, callable: &Callable) -> Result<Array, ArrayError> {
        let mut out = Vec::new();
        for v in self.to_vec() {
            if call_predicate(callable, "filter", &[&v])?.booleanize() {
                out.push(v);
            }
        }
        let result = self.empty_like();
        result.inner.data.write().elements = out;
        Ok(result)
    }

    /// `callable(element)` for every element, as an untyped array.
    pub fn map(&self, callable: &Callable) -> Result<Array, ArrayError> {
        self.to_vec()
            .iter()
            .map(|v| call_predicate(callable, "map", &[v]))
            .collect()
    }

    /// Fold with `callable(accum, element)`. A Nil `accum` starts from the
    /// first element.
    pub fn reduce(&self, callable: &Callable, accum: Variant) -> Result<Variant, ArrayError> {
        let items = self.to_vec();
        let mut rest = items.iter();
        let mut acc = accum;
        if acc.is_nil()
            && let Some(first) = rest.next()
        {
            acc = first.clone();
        }
        for v in rest {
            acc = call_predicate(callable, "reduce", &[&acc, v])?;
        }
        Ok(acc)
    }

    pub fn any(&self, callable: &Callable) -> Result<bool, ArrayError> {
        for v in self.to_vec() {
            if call_predicate(callable, "any", &[&v])?.booleanize() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn all(&self, callable: &Callable) -> Result<bool, ArrayError> {
        for v in self.to_vec() {
            if !call_predicate(callable, "all", &[&v])?.booleanize() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn extreme(&self, op: Operator) -> Variant {
        let mut items = self.to_vec().into_iter();
        let Some(mut best) = items.next() else {
            return Variant::Nil;
        };
        for v in items {
            match evaluate(op, &v, &best) {
                Some(r) if r.booleanize() => best = v,
                Some(_) => {}
                None => return Variant::Nil,
            }
        }
        best
    }

    /// Largest element by `>`; Nil when empty or when two elements do not
    /// compare.
    pub fn max(&self) -> Variant {
        self.extreme(Operator::Greater)
    }

    pub fn min(&self) -> Variant {
        self.extreme(Operator::Less)
    }

    pub fn duplicate(&self, deep: bool) -> Array {
        self.recursive_duplicate(deep, 0)
    }

    pub fn recursive_duplicate(&self, deep: bool, depth: i32) -> Array {
        let mut guard = RecursionGuard::new();
        self.duplicate_guarded(deep, depth, &mut guard)
    }

    /// Once the guard trips, every nested container comes back empty.
    pub(crate) fn duplicate_guarded(&self, deep: bool, depth: i32, guard: &mut RecursionGuard) -> Array {
        let result = self.empty_like();
        if !guard.enter(depth) {
            return result;
        }
        let items: Vec<Variant> = self
            .to_vec()
            .iter()
            .map(|v| {
                if deep {
                    v.duplicate_guarded(true, depth + 1, guard)
                } else {
                    v.clone()
                }
            })
            .collect();
        result.inner.data.write().elements = items;
        result
    }

    pub fn hash(&self) -> u32 {
        self.recursive_hash(0)
    }

    pub fn recursive_hash(&self, depth: i32) -> u32 {
        let mut guard = RecursionGuard::new();
        self.hash_guarded(depth, &mut guard)
    }

    pub(crate) fn hash_guarded(&self, depth: i32, guard: &mut RecursionGuard) -> u32 {
        if !guard.enter(depth) {
            return 0;
        }
        let mut h = hash_murmur3_one_32(VariantType::Array as u32, HASH_MURMUR3_SEED);
        for v in self.to_vec() {
            h = hash_murmur3_one_32(v.hash_guarded(depth + 1, guard), h);
        }
        hash_fmix32(h)
    }

    pub fn recursive_equal(&self, other: &Array, depth: i32) -> bool {
        let mut guard = RecursionGuard::new();
        self.equal_guarded(other, depth, &mut guard)
    }

    pub(crate) fn equal_guarded(&self, other: &Array, depth: i32, guard: &mut RecursionGuard) -> bool {
        if self.is_same(other) {
            return true;
        }
        let a = self.to_vec();
        let b = other.to_vec();
        if a.len() != b.len() {
            return false;
        }
        if !guard.enter(depth) {
            return true;
        }
        a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.hash_compare_guarded(y, depth + 1, guard))
    }

    /// Constrain the element kind. Allowed once, while the array is empty,
    /// writable and has a single owner.
    pub fn set_typed(
        &self,
        kind: VariantType,
        class_name: &StringName,
        script: &Variant,
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        if !self.is_empty() {
            return fail(ArrayError::NotEmpty);
        }
        if Arc::strong_count(&self.inner) > 1 {
            return fail(ArrayError::Shared);
        }
        let mut data = self.inner.data.write();
        let error = if data.typed.is_typed() {
            Some(ArrayError::AlreadyTyped)
        } else if !class_name.is_empty() && kind != VariantType::Object {
            Some(ArrayError::ClassNameNotObject)
        } else if !script.is_nil() && class_name.is_empty() {
            Some(ArrayError::ScriptWithoutClass)
        } else {
            None
        };
        if let Some(error) = error {
            drop(data);
            return fail(error);
        }
        data.typed = ContainerType {
            kind,
            class_name: class_name.clone(),
            script: script.clone(),
        };
        Ok(())
    }

    pub fn is_typed(&self) -> bool {
        self.inner.data.read_recursive().typed.is_typed()
    }

    pub fn container_type(&self) -> ContainerType {
        self.inner.data.read_recursive().typed.clone()
    }

    pub fn get_typed_builtin(&self) -> VariantType {
        self.inner.data.read_recursive().typed.kind
    }

    pub fn get_typed_class_name(&self) -> StringName {
        self.inner.data.read_recursive().typed.class_name.clone()
    }

    pub fn get_typed_script(&self) -> Variant {
        self.inner.data.read_recursive().typed.script.clone()
    }

    /// Assign `other` into this handle, honouring this handle's constraint:
    /// - same non-object constraint, or a compatible object constraint:
    ///   share `other`'s store (a private copy if `other` is read-only);
    /// - this untyped, `other` typed: copy the elements;
    /// - this typed, `other` untyped (or String/StringName): convert every
    ///   element or fail without changes;
    /// - anything else fails.
    pub fn typed_assign(&mut self, other: &Array) -> Result<(), ArrayError> {
        if self.is_same(other) {
            return Ok(());
        }
        let mine = self.container_type();
        let theirs = other.container_type();
        let share = (mine.kind != VariantType::Object && mine.kind == theirs.kind)
            || (mine.kind == VariantType::Object && mine.can_reference(&theirs));
        if share {
            if other.is_read_only() {
                let copy = other.duplicate(false);
                copy.inner.data.write().typed = mine;
                self.inner = copy.inner;
            } else {
                self.inner = Arc::clone(&other.inner);
            }
            return Ok(());
        }

        let convertible = theirs.kind == VariantType::Nil
            || matches!(
                (mine.kind, theirs.kind),
                (VariantType::String, VariantType::StringName)
                    | (VariantType::StringName, VariantType::String)
            );
        let items = if mine.kind == VariantType::Nil {
            other.to_vec()
        } else if convertible {
            let mut converted = Vec::with_capacity(other.len());
            for v in other.to_vec() {
                if mine.kind == VariantType::Object && v.get_type() != VariantType::Object {
                    return fail(ArrayError::TypeMismatch {
                        action: "assign",
                        found: v.get_type(),
                        expected: mine.kind,
                    });
                }
                converted.push(mine.validate(v, "assign").or_else(fail)?);
            }
            converted
        } else {
            return fail(ArrayError::IncompatibleAssign);
        };
        self.check_writable()?;
        self.write_back(items);
        Ok(())
    }

    pub fn set_read_only(&self, read_only: bool) {
        let mut data = self.inner.data.write();
        if read_only {
            if data.read_only.is_none() {
                data.read_only = Some(Box::default());
            }
        } else {
            data.read_only = None;
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.data.read_recursive().read_only.is_some()
    }

    pub fn is_same(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity of the shared store.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Number of handles sharing the store.
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.recursive_equal(other, 0)
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.data.read_recursive();
        f.debug_struct("Array")
            .field("len", &data.elements.len())
            .field("typed", &data.typed.kind)
            .field("read_only", &data.read_only.is_some())
            .finish()
    }
}

impl From<Vec<Variant>> for Array {
    fn from(elements: Vec<Variant>) -> Self {
        Self {
            inner: Arc::new(ArrayPrivate {
                data: RwLock::new(ArrayData {
                    elements,
                    ..ArrayData::default()
                }),
            }),
        }
    }
}

impl FromIterator<Variant> for Array {
    fn from_iter<I: IntoIterator<Item = Variant>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag;

    fn ints(values: &[i64]) -> Array {
        values.iter().map(|&i| Variant::Int(i)).collect()
    }

    fn as_ints(array: &Array) -> Vec<i64> {
        array.to_vec().iter().map(Variant::to_int).collect()
    }

    #[test]
    fn handles_share_and_duplicates_do_not() {
        let a = ints(&[1, 2]);
        let b = a.clone();
        b.push_back(Variant::Int(3)).unwrap();
        assert_eq!(a.len(), 3);
        assert!(a.is_same(&b));
        assert_eq!(a.id(), b.id());

        let c = a.duplicate(false);
        assert_ne!(c.id(), a.id());
        c.push_back(Variant::Int(4)).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a, ints(&[1, 2, 3]));
    }

    #[test]
    fn typed_array_rejects_and_converts() {
        let a = Array::new_typed(VariantType::Int, StringName::default()).unwrap();
        let (res, diags) = diag::capture(|| a.push_back(Variant::from("x")));
        assert_eq!(
            res,
            Err(ArrayError::TypeMismatch {
                action: "push_back",
                found: VariantType::String,
                expected: VariantType::Int,
            })
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].message,
            "Attempted to push_back a variable of type 'String' into a TypedArray of type 'int'."
        );
        assert!(a.is_empty());

        a.push_back(Variant::Float(2.0)).unwrap();
        assert_eq!(a.get(0), Some(Variant::Int(2)));
    }

    #[test]
    fn set_typed_preconditions() {
        let a = ints(&[1]);
        let (res, _) = diag::capture(|| a.set_typed(VariantType::Int, &StringName::default(), &Variant::Nil));
        assert_eq!(res, Err(ArrayError::NotEmpty));

        let b = Array::new();
        let shared = b.clone();
        let (res, _) = diag::capture(|| b.set_typed(VariantType::Int, &StringName::default(), &Variant::Nil));
        assert_eq!(res, Err(ArrayError::Shared));
        drop(shared);

        let (res, _) = diag::capture(|| b.set_typed(VariantType::Int, &StringName::new("Object"), &Variant::Nil));
        assert_eq!(res, Err(ArrayError::ClassNameNotObject));

        b.set_typed(VariantType::Int, &StringName::default(), &Variant::Nil).unwrap();
        let (res, _) = diag::capture(|| b.set_typed(VariantType::Float, &StringName::default(), &Variant::Nil));
        assert_eq!(res, Err(ArrayError::AlreadyTyped));
        assert_eq!(b.get_typed_builtin(), VariantType::Int);
    }

    #[test]
    fn object_typed_array_checks_inheritance() {
        let a = Array::new_typed(VariantType::Object, StringName::new("RefCounted")).unwrap();
        let counted = class_db::instantiate(&StringName::new("RefCounted")).unwrap();
        let plain = class_db::instantiate(&StringName::new("Object")).unwrap();
        a.push_back(Variant::from(&counted)).unwrap();
        a.push_back(Variant::Nil).unwrap();
        let (res, _) = diag::capture(|| a.push_back(Variant::from(&plain)));
        assert!(matches!(res, Err(ArrayError::ClassMismatch { .. })));
        assert_eq!(a.len(), 2);
        a.clear().unwrap();
        object::destroy(plain.id());
    }

    #[test]
    fn read_only_rejects_mutation_and_shadows_reads() {
        let a = ints(&[10, 20]);
        a.set_read_only(true);
        let (res, diags) = diag::capture(|| a.push_back(Variant::Int(3)));
        assert_eq!(res, Err(ArrayError::ReadOnly));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Array is in read-only state.");

        let p = a.element_ptr(1);
        assert!(!p.is_null());
        unsafe {
            assert_eq!(*p, Variant::Int(20));
            *p = Variant::Int(99);
        }
        assert_eq!(a.get(1), Some(Variant::Int(20)));
        assert!(a.element_ptr(2).is_null());

        a.set_read_only(false);
        a.push_back(Variant::Int(3)).unwrap();
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn pops_on_empty_are_silent() {
        let a = Array::new();
        let (res, diags) = diag::capture(|| {
            (a.pop_back().unwrap(), a.pop_front().unwrap(), a.pop_at(3).unwrap())
        });
        assert_eq!(res, (Variant::Nil, Variant::Nil, Variant::Nil));
        assert!(diags.is_empty());
        let (res, diags) = diag::capture(|| a.front());
        assert_eq!(res, Err(ArrayError::Empty));
        assert_eq!(diags[0].message, "Can't take value from empty array.");
    }

    #[test]
    fn pop_at_and_insert_accept_negative_positions() {
        let a = ints(&[1, 2, 3, 4]);
        assert_eq!(a.pop_at(-1).unwrap(), Variant::Int(4));
        a.insert(-1, Variant::Int(9)).unwrap();
        assert_eq!(as_ints(&a), vec![1, 2, 9, 3]);
        a.insert(4, Variant::Int(7)).unwrap();
        a.insert(-5, Variant::Int(0)).unwrap();
        assert_eq!(as_ints(&a), vec![0, 1, 2, 9, 3, 7]);
        let (res, _) = diag::capture(|| a.pop_at(10));
        assert!(matches!(res, Err(ArrayError::IndexOutOfBounds { .. })));
        let (res, _) = diag::capture(|| a.insert(7, Variant::Int(1)));
        assert!(matches!(res, Err(ArrayError::IndexOutOfBounds { .. })));
        let (res, _) = diag::capture(|| a.insert(-7, Variant::Int(1)));
        assert!(matches!(res, Err(ArrayError::IndexOutOfBounds { .. })));
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn slice_semantics() {
        let a = ints(&[1, 2, 3, 4, 5]);
        assert_eq!(as_ints(&a.slice(0, 5, 2, false).unwrap()), vec![1, 3, 5]);
        assert_eq!(as_ints(&a.slice(4, 0, -1, false).unwrap()), vec![5, 4, 3, 2]);
        assert_eq!(as_ints(&a.slice(-2, 5, 1, false).unwrap()), vec![4, 5]);
        assert_eq!(as_ints(&a.slice(-1, -6, -1, false).unwrap()), vec![5, 4, 3, 2, 1]);
        assert_eq!(as_ints(&a.slice(1, 2, 1, false).unwrap()), vec![2]);
        assert!(a.slice(7, 9, 1, false).unwrap().is_empty());

        let (res, _) = diag::capture(|| a.slice(0, 5, 0, false));
        assert_eq!(res, Err(ArrayError::ZeroStep));
        let (res, _) = diag::capture(|| a.slice(4, 1, 1, false));
        assert_eq!(res, Err(ArrayError::PositiveStepDecreasing));
        let (res, _) = diag::capture(|| a.slice(1, 4, -1, false));
        assert_eq!(res, Err(ArrayError::NegativeStepIncreasing));
    }

    #[test]
    fn bsearch_bounds() {
        let a = ints(&[1, 2, 2, 2, 5]);
        assert_eq!(a.bsearch(&Variant::Int(2), true).unwrap(), 1);
        assert_eq!(a.bsearch(&Variant::Int(2), false).unwrap(), 4);
        assert_eq!(a.bsearch(&Variant::Int(0), true).unwrap(), 0);
        assert_eq!(a.bsearch(&Variant::Int(9), false).unwrap(), 5);
    }

    #[test]
    fn sort_is_stable_and_survives_incomparable_values() {
        let a = ints(&[3, 1, 2]);
        a.sort().unwrap();
        assert_eq!(as_ints(&a), vec![1, 2, 3]);

        let mixed: Array = vec![Variant::Int(2), Variant::from("x"), Variant::Int(1)].into();
        mixed.sort().unwrap();
        assert_eq!(mixed.len(), 3);
        assert!(mixed.has(&Variant::from("x")));
    }

    #[test]
    fn find_uses_string_like_comparison() {
        let a: Array = vec![Variant::from("a"), Variant::from("b"), Variant::from("a")].into();
        let name = Variant::StringName(StringName::new("a"));
        assert_eq!(a.find(&name, 0), Some(0));
        assert_eq!(a.find(&name, 1), Some(2));
        assert_eq!(a.find(&name, -1), Some(2));
        assert_eq!(a.find(&name, -10), Some(0));
        assert_eq!(a.rfind(&name, -2), Some(0));
        assert_eq!(a.rfind(&name, 99), Some(2));
        assert_eq!(a.count(&name), 2);
        assert!(!a.has(&Variant::from("z")));
    }

    #[test]
    fn functional_helpers_call_the_callable() {
        let a = ints(&[1, 2, 3, 4]);
        let even = Callable::from_fn("even", |args: &[&Variant]| Ok(Variant::Bool(args[0].to_int() % 2 == 0)));
        let double = Callable::from_fn("double", |args: &[&Variant]| Ok(Variant::Int(args[0].to_int() * 2)));
        let sum = Callable::from_fn("sum", |args: &[&Variant]| {
            Ok(Variant::Int(args[0].to_int() + args[1].to_int()))
        });
        assert_eq!(as_ints(&a.filter(&even).unwrap()), vec![2, 4]);
        assert_eq!(as_ints(&a.map(&double).unwrap()), vec![2, 4, 6, 8]);
        assert_eq!(a.reduce(&sum, Variant::Nil).unwrap(), Variant::Int(10));
        assert_eq!(a.reduce(&sum, Variant::Int(5)).unwrap(), Variant::Int(15));
        assert!(a.any(&even).unwrap());
        assert!(!a.all(&even).unwrap());
        assert_eq!(a.max(), Variant::Int(4));
        assert_eq!(a.min(), Variant::Int(1));

        let failing = Callable::from_fn("failing", |_: &[&Variant]| Err(CallError::InvalidMethod));
        let (res, diags) = diag::capture(|| a.map(&failing));
        assert!(matches!(res, Err(ArrayError::CallFailed { method: "map", .. })));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn resize_fills_with_typed_default() {
        let a = Array::new_typed(VariantType::Float, StringName::default()).unwrap();
        a.resize(2).unwrap();
        assert_eq!(a.get(1), Some(Variant::Float(0.0)));
        let b = Array::new();
        b.resize(1).unwrap();
        assert_eq!(b.get(0), Some(Variant::Nil));
        b.resize(0).unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn typed_assign_matrix() {
        let untyped = ints(&[1, 2]);
        let mut floats = Array::new_typed(VariantType::Float, StringName::default()).unwrap();
        floats.typed_assign(&untyped).unwrap();
        assert_eq!(floats.get(0), Some(Variant::Float(1.0)));
        assert!(!floats.is_same(&untyped));

        let mut untyped_target = Array::new();
        untyped_target.typed_assign(&floats).unwrap();
        assert!(!untyped_target.is_typed());
        assert!(!untyped_target.is_same(&floats));
        assert_eq!(untyped_target.len(), 2);

        let mut other_floats = Array::new_typed(VariantType::Float, StringName::default()).unwrap();
        other_floats.typed_assign(&floats).unwrap();
        assert!(other_floats.is_same(&floats));

        let strings = Array::new_typed(VariantType::String, StringName::default()).unwrap();
        let mut ints_target = Array::new_typed(VariantType::Int, StringName::default()).unwrap();
        let (res, _) = diag::capture(|| ints_target.typed_assign(&strings));
        assert_eq!(res, Err(ArrayError::IncompatibleAssign));

        let bad: Array = vec![Variant::Int(1), Variant::from("nope")].into();
        let before = ints_target.len();
        let (res, _) = diag::capture(|| ints_target.typed_assign(&bad));
        assert!(res.is_err());
        assert_eq!(ints_target.len(), before);
    }

    #[test]
    fn read_only_source_is_copied_on_assign() {
        let src = ints(&[1]);
        src.set_read_only(true);
        let mut dst = Array::new();
        dst.typed_assign(&src).unwrap();
        assert!(!dst.is_same(&src));
        dst.push_back(Variant::Int(2)).unwrap();
        assert_eq!(src.len(), 1);
    }

    #[test]
    fn self_containing_arrays_terminate_with_one_diagnostic() {
        let a = Array::new();
        a.push_back(Variant::Array(a.clone())).unwrap();
        let b = Array::new();
        b.push_back(Variant::Array(b.clone())).unwrap();

        let (h1, diags) = diag::capture(|| a.hash());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Max recursion reached");
        let (h2, _) = diag::capture(|| a.hash());
        assert_eq!(h1, h2);

        let (eq, diags) = diag::capture(|| a == b);
        assert!(eq);
        assert_eq!(diags.len(), 1);

        a.clear().unwrap();
        b.clear().unwrap();
    }

    #[test]
    fn deep_duplicate_of_branching_cycle_stops_at_the_first_trip() {
        let a = Array::new();
        a.push_back(Variant::Array(a.clone())).unwrap();
        a.push_back(Variant::Array(a.clone())).unwrap();

        let (copy, diags) = diag::capture(|| a.duplicate(true));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Max recursion reached");
        assert_eq!(copy.len(), 2);
        assert!(!copy.is_same(&a));

        a.clear().unwrap();
    }

    #[test]
    fn deep_duplicate_copies_nested_containers() {
        let inner = ints(&[1]);
        let outer: Array = vec![Variant::Array(inner.clone())].into();
        let shallow = outer.duplicate(false);
        let deep = outer.duplicate(true);
        inner.push_back(Variant::Int(2)).unwrap();
        assert_eq!(shallow.get(0).unwrap().as_array().unwrap().len(), 2);
        assert_eq!(deep.get(0).unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn shuffle_and_pick_random_use_the_seeded_generator() {
        rng::seed_thread(5);
        let a = ints(&[1, 2, 3, 4, 5, 6]);
        a.shuffle().unwrap();
        let mut sorted = as_ints(&a);
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5, 6]);
        assert!(a.has(&a.pick_random().unwrap()));
    }
}
