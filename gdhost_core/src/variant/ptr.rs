// `extern "C"` ptrcall thunks and their lookups.
//
// Foreign code asks for a function pointer once (operator evaluator for
// `Int + Int`, builtin method `String.length` with its hash, constructor #3
// of `Vector2`, ...) and then calls it with pointers to native values. A C
// function pointer carries no context, so each thunk must know its target
// statically.
//
// Two strategies:
// - Thunks that depend only on the kind (destructors, indexed/keyed access,
//   to/from-variant converters) are instantiated once per kind through a
//   `const T: u32` parameter.
// - Thunks whose target is a (kind, name) or (operator, kind, kind) pair use
//   slot pools. A pool is a fixed array of `const N: usize` instantiations
//   plus a table binding slot `N` to its target. A lookup reuses the slot
//   already bound to that target or binds the next free one, so each target
//   always maps to the same pointer. Only looked-up targets consume slots.
//
// **Critical constraint:** a bound slot is never rebound or freed, so a
// pointer handed out stays valid for the life of the process. Exhausting a
// pool is reported once and the lookup returns `None`.

use std::sync::LazyLock;

use gdhost_sys::{
    ConstTypePtr, ConstVariantPtr, GdInt, PtrBuiltInMethod, PtrConstructor, PtrDestructor,
    PtrGetter, PtrIndexedGetter, PtrIndexedSetter, PtrKeyedChecker, PtrKeyedGetter,
    PtrKeyedSetter, PtrOperatorEvaluator, PtrSetter, PtrUtilityFunction,
    TypeFromVariantConstructorFunc, TypePtr, VariantFromTypeConstructorFunc, VariantPtr,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::access::{member_type, members_of};
use super::construct::{build, constructors_of};
use super::methods::{BuiltinMethod, builtin_method as find_builtin_method};
use super::ops::{Operator, evaluate, operator_result_type};
use super::utility::{UtilityFunction, utility_function as find_utility_function};
use super::{Variant, VariantType, native};
use crate::string::StringName;

// ---------------------------------------------------------------------------
// Slot pools
// ---------------------------------------------------------------------------

const SLOTS_PER_TABLE: usize = 512;

type SlotTable<F> = [[[F; 8]; 8]; 8];

macro_rules! slots8 {
    ($f:ident, $b:expr) => {
        [
            $f::<{ $b }>,
            $f::<{ $b + 1 }>,
            $f::<{ $b + 2 }>,
            $f::<{ $b + 3 }>,
            $f::<{ $b + 4 }>,
            $f::<{ $b + 5 }>,
            $f::<{ $b + 6 }>,
            $f::<{ $b + 7 }>,
        ]
    };
}

macro_rules! slots64 {
    ($f:ident, $b:expr) => {
        [
            slots8!($f, $b),
            slots8!($f, $b + 8),
            slots8!($f, $b + 16),
            slots8!($f, $b + 24),
            slots8!($f, $b + 32),
            slots8!($f, $b + 40),
            slots8!($f, $b + 48),
            slots8!($f, $b + 56),
        ]
    };
}

macro_rules! slots512 {
    ($f:ident, $b:expr) => {
        [
            slots64!($f, $b),
            slots64!($f, $b + 64),
            slots64!($f, $b + 128),
            slots64!($f, $b + 192),
            slots64!($f, $b + 256),
            slots64!($f, $b + 320),
            slots64!($f, $b + 384),
            slots64!($f, $b + 448),
        ]
    };
}

fn pick<F: Copy>(tables: &[SlotTable<F>], slot: usize) -> Option<F> {
    let table = tables.get(slot / SLOTS_PER_TABLE)?;
    let i = slot % SLOTS_PER_TABLE;
    Some(table[i / 64][(i / 8) % 8][i % 8])
}

struct PoolState<T> {
    slots: Vec<T>,
    index: FxHashMap<u64, usize>,
}

/// Binding of slot numbers to thunk targets for one thunk family.
struct Pool<T> {
    what: &'static str,
    capacity: usize,
    state: RwLock<PoolState<T>>,
}

impl<T: Clone> Pool<T> {
    fn new(what: &'static str, tables: usize) -> Self {
        Self {
            what,
            capacity: tables * SLOTS_PER_TABLE,
            state: RwLock::new(PoolState {
                slots: Vec::new(),
                index: FxHashMap::default(),
            }),
        }
    }

    fn target(&self, slot: usize) -> Option<T> {
        self.state.read_recursive().slots.get(slot).cloned()
    }

    /// Slot bound to `key`, binding `target` to a fresh slot if needed.
    fn acquire(&self, key: u64, target: impl FnOnce() -> T) -> Option<usize> {
        if let Some(&slot) = self.state.read_recursive().index.get(&key) {
            return Some(slot);
        }
        let mut state = self.state.write();
        if let Some(&slot) = state.index.get(&key) {
            return Some(slot);
        }
        if state.slots.len() >= self.capacity {
            drop(state);
            crate::err_print_once!(
                "all {} {} thunk slots are in use",
                self.capacity,
                self.what
            );
            return None;
        }
        let slot = state.slots.len();
        state.slots.push(target());
        state.index.insert(key, slot);
        Some(slot)
    }

    #[cfg(test)]
    fn bound(&self) -> usize {
        self.state.read_recursive().slots.len()
    }
}

fn kind_key(ty: VariantType) -> u64 {
    u64::from(ty.raw())
}

/// Report a hash mismatch the first time a given lookup sees it.
pub fn report_hash_mismatch(what: &str, name: &str, expected: u32, requested: GdInt) {
    static REPORTED: LazyLock<Mutex<FxHashSet<String>>> =
        LazyLock::new(|| Mutex::new(FxHashSet::default()));
    let key = format!("{what} {name}");
    if REPORTED.lock().insert(key) {
        crate::err_print!(
            "{what} '{name}' has hash {expected}, but {requested} was requested; \
             the extension was built against an incompatible engine version"
        );
    }
}

// ---------------------------------------------------------------------------
// Operator evaluators
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct OperatorTarget {
    op: Operator,
    left: VariantType,
    right: VariantType,
    ret: VariantType,
}

static OPERATORS: LazyLock<Pool<OperatorTarget>> =
    LazyLock::new(|| Pool::new("operator evaluator", OPERATOR_THUNKS.len()));

unsafe fn read_operand(ty: VariantType, ptr: ConstTypePtr) -> Variant {
    if ty == VariantType::Nil {
        Variant::Nil
    } else {
        unsafe { native::read(ty, ptr) }
    }
}

unsafe extern "C" fn operator_slot<const N: usize>(
    left: ConstTypePtr,
    right: ConstTypePtr,
    ret: TypePtr,
) {
    let Some(t) = OPERATORS.target(N) else {
        return;
    };
    let a = unsafe { read_operand(t.left, left) };
    let b = if t.op.is_unary() {
        Variant::Nil
    } else {
        unsafe { read_operand(t.right, right) }
    };
    match evaluate(t.op, &a, &b) {
        Some(value) => unsafe { native::write(t.ret, ret, value) },
        None => crate::err_print!(
            "operator '{}' failed on {} and {}",
            t.op.symbol(),
            t.left,
            t.right
        ),
    }
}

static OPERATOR_THUNKS: [SlotTable<PtrOperatorEvaluator>; 8] = [
    slots512!(operator_slot, 0),
    slots512!(operator_slot, 512),
    slots512!(operator_slot, 1024),
    slots512!(operator_slot, 1536),
    slots512!(operator_slot, 2048),
    slots512!(operator_slot, 2560),
    slots512!(operator_slot, 3072),
    slots512!(operator_slot, 3584),
];

/// Evaluator for `left op right`; `None` when the operator is undefined for
/// these kinds. Unary operators take `right == Nil`.
pub fn operator_evaluator(
    op: Operator,
    left: VariantType,
    right: VariantType,
) -> Option<PtrOperatorEvaluator> {
    let ret = operator_result_type(op, left, right)?;
    let key = (u64::from(op as u32) << 16) | (kind_key(left) << 8) | kind_key(right);
    let slot = OPERATORS.acquire(key, || OperatorTarget {
        op,
        left,
        right,
        ret,
    })?;
    pick(&OPERATOR_THUNKS, slot)
}

// ---------------------------------------------------------------------------
// Builtin methods
// ---------------------------------------------------------------------------

static METHODS: LazyLock<Pool<&'static BuiltinMethod>> =
    LazyLock::new(|| Pool::new("builtin method", METHOD_THUNKS.len()));

unsafe extern "C" fn method_slot<const N: usize>(
    base: TypePtr,
    args: *const ConstTypePtr,
    ret: TypePtr,
    argcount: i32,
) {
    if let Some(method) = METHODS.target(N) {
        unsafe { method.ptrcall(base, args, ret, argcount) };
    }
}

static METHOD_THUNKS: [SlotTable<PtrBuiltInMethod>; 2] =
    [slots512!(method_slot, 0), slots512!(method_slot, 512)];

/// Builtin method `name` of `ty`, if it exists with signature hash `hash`.
pub fn builtin_method(ty: VariantType, name: &str, hash: GdInt) -> Option<PtrBuiltInMethod> {
    let method = find_builtin_method(ty, name)?;
    if i64::from(method.hash) != hash {
        report_hash_mismatch(&format!("builtin method {ty}"), name, method.hash, hash);
        return None;
    }
    let key = std::ptr::from_ref(method) as u64;
    let slot = METHODS.acquire(key, || method)?;
    pick(&METHOD_THUNKS, slot)
}

// ---------------------------------------------------------------------------
// Utility functions
// ---------------------------------------------------------------------------

static UTILITIES: LazyLock<Pool<&'static UtilityFunction>> =
    LazyLock::new(|| Pool::new("utility function", UTILITY_THUNKS.len()));

unsafe extern "C" fn utility_slot<const N: usize>(
    ret: TypePtr,
    args: *const ConstTypePtr,
    argcount: i32,
) {
    if let Some(function) = UTILITIES.target(N) {
        unsafe { function.ptrcall(ret, args, argcount) };
    }
}

static UTILITY_THUNKS: [SlotTable<PtrUtilityFunction>; 1] = [slots512!(utility_slot, 0)];

/// Utility function `name`, if it exists with signature hash `hash`.
pub fn utility_function(name: &str, hash: GdInt) -> Option<PtrUtilityFunction> {
    let function = find_utility_function(name)?;
    if i64::from(function.hash) != hash {
        report_hash_mismatch("utility function", name, function.hash, hash);
        return None;
    }
    let key = std::ptr::from_ref(function) as u64;
    let slot = UTILITIES.acquire(key, || function)?;
    pick(&UTILITY_THUNKS, slot)
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

static CONSTRUCTORS: LazyLock<Pool<(VariantType, usize)>> =
    LazyLock::new(|| Pool::new("constructor", CONSTRUCTOR_THUNKS.len()));

unsafe extern "C" fn constructor_slot<const N: usize>(base: TypePtr, args: *const ConstTypePtr) {
    let Some((ty, index)) = CONSTRUCTORS.target(N) else {
        return;
    };
    let Some(info) = constructors_of(ty).get(index) else {
        return;
    };
    let values: SmallVec<[Variant; 4]> = info
        .arguments
        .iter()
        .enumerate()
        .map(|(i, (_, arg))| unsafe { native::read(*arg, *args.add(i)) })
        .collect();
    let value = build(ty, &values).unwrap_or_else(|| {
        crate::err_print!("constructor {index} of {ty} rejected its arguments");
        Variant::default_of(ty)
    });
    unsafe { native::construct(ty, base, value) };
}

static CONSTRUCTOR_THUNKS: [SlotTable<PtrConstructor>; 1] = [slots512!(constructor_slot, 0)];

/// Constructor `index` of `ty`, in the order `constructors_of` lists them.
/// The thunk initializes uninitialized storage.
pub fn constructor(ty: VariantType, index: i32) -> Option<PtrConstructor> {
    let index = usize::try_from(index).ok()?;
    constructors_of(ty).get(index)?;
    let key = (kind_key(ty) << 32) | index as u64;
    let slot = CONSTRUCTORS.acquire(key, || (ty, index))?;
    pick(&CONSTRUCTOR_THUNKS, slot)
}

// ---------------------------------------------------------------------------
// Member getters and setters
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct MemberTarget {
    owner: VariantType,
    name: &'static str,
    ty: VariantType,
}

static GETTERS: LazyLock<Pool<MemberTarget>> =
    LazyLock::new(|| Pool::new("member getter", GETTER_THUNKS.len()));
static SETTERS: LazyLock<Pool<MemberTarget>> =
    LazyLock::new(|| Pool::new("member setter", SETTER_THUNKS.len()));

unsafe extern "C" fn getter_slot<const N: usize>(base: ConstTypePtr, ret: TypePtr) {
    let Some(m) = GETTERS.target(N) else {
        return;
    };
    let owner = unsafe { native::read(m.owner, base) };
    match owner.get_named(&StringName::new(m.name)) {
        Some(value) => unsafe { native::write(m.ty, ret, value) },
        None => crate::err_print!("cannot get member '{}' of {}", m.name, m.owner),
    }
}

unsafe extern "C" fn setter_slot<const N: usize>(base: TypePtr, value: ConstTypePtr) {
    let Some(m) = SETTERS.target(N) else {
        return;
    };
    let mut owner = unsafe { native::read(m.owner, base.cast_const()) };
    let value = unsafe { native::read(m.ty, value) };
    if owner.set_named(&StringName::new(m.name), &value) {
        unsafe { native::write(m.owner, base, owner) };
    } else {
        crate::err_print!("cannot set member '{}' of {}", m.name, m.owner);
    }
}

static GETTER_THUNKS: [SlotTable<PtrGetter>; 1] = [slots512!(getter_slot, 0)];
static SETTER_THUNKS: [SlotTable<PtrSetter>; 1] = [slots512!(setter_slot, 0)];

fn member_target(owner: VariantType, member: &str) -> Option<(u64, MemberTarget)> {
    let index = members_of(owner).iter().position(|m| *m == member)?;
    let target = MemberTarget {
        owner,
        name: members_of(owner)[index],
        ty: member_type(owner, member)?,
    };
    Some(((kind_key(owner) << 32) | index as u64, target))
}

pub fn getter(owner: VariantType, member: &str) -> Option<PtrGetter> {
    let (key, target) = member_target(owner, member)?;
    let slot = GETTERS.acquire(key, || target)?;
    pick(&GETTER_THUNKS, slot)
}

pub fn setter(owner: VariantType, member: &str) -> Option<PtrSetter> {
    let (key, target) = member_target(owner, member)?;
    let slot = SETTERS.acquire(key, || target)?;
    pick(&SETTER_THUNKS, slot)
}

// ---------------------------------------------------------------------------
// Per-kind thunks
// ---------------------------------------------------------------------------

macro_rules! by_kind {
    ($f:ident) => {
        [
            $f::<0>, $f::<1>, $f::<2>, $f::<3>, $f::<4>, $f::<5>, $f::<6>, $f::<7>, $f::<8>,
            $f::<9>, $f::<10>, $f::<11>, $f::<12>, $f::<13>, $f::<14>, $f::<15>, $f::<16>,
            $f::<17>, $f::<18>, $f::<19>, $f::<20>, $f::<21>, $f::<22>, $f::<23>, $f::<24>,
            $f::<25>, $f::<26>, $f::<27>, $f::<28>, $f::<29>, $f::<30>, $f::<31>, $f::<32>,
            $f::<33>, $f::<34>, $f::<35>, $f::<36>, $f::<37>,
        ]
    };
}

fn kind<const T: u32>() -> VariantType {
    VariantType::from_raw(T).unwrap_or_default()
}

fn by_kind<F: Copy>(table: &[F; 38], ty: VariantType) -> Option<F> {
    table.get(ty as usize).copied()
}

/// Kind of the native values `ty`'s indexed accessors read and write.
/// `Nil` means a whole Variant.
pub fn indexed_element_type(ty: VariantType) -> Option<VariantType> {
    use VariantType as T;
    Some(match ty {
        T::Vector2 | T::Vector3 | T::Vector4 | T::Quaternion | T::Color => T::Float,
        T::PackedFloat32Array | T::PackedFloat64Array => T::Float,
        T::Vector2i | T::Vector3i | T::Vector4i => T::Int,
        T::PackedByteArray | T::PackedInt32Array | T::PackedInt64Array => T::Int,
        T::Transform2D | T::PackedVector2Array => T::Vector2,
        T::Basis | T::PackedVector3Array => T::Vector3,
        T::Projection => T::Vector4,
        T::String | T::PackedStringArray => T::String,
        T::PackedColorArray => T::Color,
        T::Array | T::Dictionary => T::Nil,
        _ => return None,
    })
}

unsafe extern "C" fn variant_from_type<const T: u32>(dst: VariantPtr, src: ConstTypePtr) {
    if dst.is_null() {
        return;
    }
    let value = unsafe { read_operand(kind::<T>(), src) };
    unsafe { dst.cast::<Variant>().write(value) };
}

unsafe extern "C" fn type_from_variant<const T: u32>(dst: TypePtr, src: ConstVariantPtr) {
    let Some(value) = (unsafe { src.cast::<Variant>().as_ref() }) else {
        return;
    };
    unsafe { native::construct(kind::<T>(), dst, value.clone()) };
}

unsafe extern "C" fn destructor_thunk<const T: u32>(ptr: TypePtr) {
    unsafe { native::destroy(kind::<T>(), ptr) };
}

unsafe extern "C" fn indexed_get<const T: u32>(base: ConstTypePtr, index: GdInt, ret: TypePtr) {
    let ty = kind::<T>();
    let Some(element) = indexed_element_type(ty) else {
        return;
    };
    let owner = unsafe { native::read(ty, base) };
    match owner.get_indexed(index) {
        Ok(value) => unsafe { native::write(element, ret, value) },
        Err(e) => crate::err_print!("{ty}[{index}]: {e}"),
    }
}

unsafe extern "C" fn indexed_set<const T: u32>(base: TypePtr, index: GdInt, value: ConstTypePtr) {
    let ty = kind::<T>();
    let Some(element) = indexed_element_type(ty) else {
        return;
    };
    let mut owner = unsafe { native::read(ty, base.cast_const()) };
    let value = unsafe { native::read(element, value) };
    match owner.set_indexed(index, &value) {
        Ok(()) => unsafe { native::write(ty, base, owner) },
        Err(e) => crate::err_print!("{ty}[{index}] = ...: {e}"),
    }
}

unsafe fn key_of(key: ConstTypePtr) -> Variant {
    unsafe { key.cast::<Variant>().as_ref() }
        .cloned()
        .unwrap_or_default()
}

unsafe extern "C" fn keyed_get<const T: u32>(base: ConstTypePtr, key: ConstTypePtr, ret: TypePtr) {
    let ty = kind::<T>();
    let owner = unsafe { native::read(ty, base) };
    let key = unsafe { key_of(key) };
    match owner.get_keyed(&key) {
        Some(value) => unsafe { native::write(VariantType::Nil, ret, value) },
        None => crate::err_print!("{ty} has no key {}", key.to_code_string()),
    }
}

unsafe extern "C" fn keyed_set<const T: u32>(base: TypePtr, key: ConstTypePtr, value: ConstTypePtr) {
    let ty = kind::<T>();
    let mut owner = unsafe { native::read(ty, base.cast_const()) };
    let key = unsafe { key_of(key) };
    let value = unsafe { key_of(value) };
    if owner.set_keyed(&key, &value) {
        unsafe { native::write(ty, base, owner) };
    } else {
        crate::err_print!("cannot set key {} on {ty}", key.to_code_string());
    }
}

unsafe extern "C" fn keyed_check<const T: u32>(base: ConstVariantPtr, key: ConstVariantPtr) -> u32 {
    let owner = unsafe { native::read(kind::<T>(), base) };
    let key = unsafe { key_of(key) };
    u32::from(owner.has_key(&key).unwrap_or(false))
}

static FROM_TYPE: [VariantFromTypeConstructorFunc; 38] = by_kind!(variant_from_type);
static TO_TYPE: [TypeFromVariantConstructorFunc; 38] = by_kind!(type_from_variant);
static DESTRUCTORS: [PtrDestructor; 38] = by_kind!(destructor_thunk);
static INDEXED_GETTERS: [PtrIndexedGetter; 38] = by_kind!(indexed_get);
static INDEXED_SETTERS: [PtrIndexedSetter; 38] = by_kind!(indexed_set);
static KEYED_GETTERS: [PtrKeyedGetter; 38] = by_kind!(keyed_get);
static KEYED_SETTERS: [PtrKeyedSetter; 38] = by_kind!(keyed_set);
static KEYED_CHECKERS: [PtrKeyedChecker; 38] = by_kind!(keyed_check);

fn is_keyed(ty: VariantType) -> bool {
    matches!(ty, VariantType::Dictionary | VariantType::Object)
}

/// Writes a native `ty` into an uninitialized Variant.
pub fn variant_from_type_constructor(ty: VariantType) -> Option<VariantFromTypeConstructorFunc> {
    by_kind(&FROM_TYPE, ty)
}

/// Initializes native `ty` storage from a Variant, converting it.
pub fn type_from_variant_constructor(ty: VariantType) -> Option<TypeFromVariantConstructorFunc> {
    by_kind(&TO_TYPE, ty)
}

pub fn destructor(ty: VariantType) -> Option<PtrDestructor> {
    by_kind(&DESTRUCTORS, ty)
}

pub fn indexed_getter(ty: VariantType) -> Option<PtrIndexedGetter> {
    indexed_element_type(ty)?;
    by_kind(&INDEXED_GETTERS, ty)
}

pub fn indexed_setter(ty: VariantType) -> Option<PtrIndexedSetter> {
    indexed_element_type(ty)?;
    by_kind(&INDEXED_SETTERS, ty)
}

pub fn keyed_getter(ty: VariantType) -> Option<PtrKeyedGetter> {
    is_keyed(ty).then(|| by_kind(&KEYED_GETTERS, ty)).flatten()
}

pub fn keyed_setter(ty: VariantType) -> Option<PtrKeyedSetter> {
    is_keyed(ty).then(|| by_kind(&KEYED_SETTERS, ty)).flatten()
}

pub fn keyed_checker(ty: VariantType) -> Option<PtrKeyedChecker> {
    is_keyed(ty).then(|| by_kind(&KEYED_CHECKERS, ty)).flatten()
}

#[cfg(test)]
mod tests {
    use std::mem::MaybeUninit;
    use std::ptr;

    use super::*;
    use crate::array::Array;
    use crate::dictionary::Dictionary;
    use crate::diag;
    use crate::math::Vector2;
    use crate::string::GString;

    #[test]
    fn int_addition_through_an_evaluator() {
        let add = operator_evaluator(Operator::Add, VariantType::Int, VariantType::Int).unwrap();
        let (a, b, mut out) = (40i64, 2i64, 0i64);
        unsafe {
            add(
                (&raw const a).cast(),
                (&raw const b).cast(),
                (&raw mut out).cast(),
            );
        }
        assert_eq!(out, 42);
    }

    #[test]
    fn lookups_are_stable_and_share_slots() {
        let first = operator_evaluator(Operator::Multiply, VariantType::Float, VariantType::Int);
        let bound = OPERATORS.bound();
        let second = operator_evaluator(Operator::Multiply, VariantType::Float, VariantType::Int);
        assert_eq!(first.map(|f| f as usize), second.map(|f| f as usize));
        assert!(OPERATORS.bound() <= bound);
        assert!(operator_evaluator(Operator::Add, VariantType::Int, VariantType::String).is_none());
    }

    #[test]
    fn string_length_via_ptrcall() {
        let hash = find_builtin_method(VariantType::String, "length").unwrap().hash;
        let length = builtin_method(VariantType::String, "length", i64::from(hash)).unwrap();
        let mut s = GString::from("hello");
        let mut out = 0i64;
        unsafe { length((&raw mut s).cast(), ptr::null(), (&raw mut out).cast(), 0) };
        assert_eq!(out, 5);
    }

    #[test]
    fn hash_mismatch_returns_none_and_reports_once() {
        let (first, reports) =
            diag::capture(|| builtin_method(VariantType::String, "to_upper", 12345));
        assert!(first.is_none());
        assert_eq!(reports.len(), 1);
        let (second, reports) =
            diag::capture(|| builtin_method(VariantType::String, "to_upper", 12345));
        assert!(second.is_none());
        assert!(reports.is_empty());
    }

    #[test]
    fn mutating_method_writes_back_the_receiver() {
        let hash = find_builtin_method(VariantType::PackedInt32Array, "push_back").unwrap().hash;
        let push = builtin_method(VariantType::PackedInt32Array, "push_back", i64::from(hash))
            .unwrap();
        let mut packed = crate::packed::PackedInt32Array::new();
        let value = 9i64;
        let mut ok = 0u8;
        let args = [(&raw const value).cast::<std::ffi::c_void>()];
        unsafe { push((&raw mut packed).cast(), args.as_ptr(), (&raw mut ok).cast(), 1) };
        assert_eq!(packed.as_slice(), &[9]);
        assert_eq!(ok, 1);
    }

    #[test]
    fn vector2_component_constructor_and_members() {
        let ctor = constructor(VariantType::Vector2, 3).unwrap();
        let (x, y) = (1.5f64, -2.0f64);
        let args = [(&raw const x).cast::<std::ffi::c_void>(), (&raw const y).cast()];
        let mut v = MaybeUninit::<Vector2>::uninit();
        unsafe { ctor(v.as_mut_ptr().cast(), args.as_ptr()) };
        let mut v = unsafe { v.assume_init() };
        assert_eq!(v, Vector2::new(1.5, -2.0));

        let get_x = getter(VariantType::Vector2, "x").unwrap();
        let mut out = 0.0f64;
        unsafe { get_x((&raw const v).cast(), (&raw mut out).cast()) };
        assert_eq!(out, 1.5);

        let set_y = setter(VariantType::Vector2, "y").unwrap();
        let new_y = 4.0f64;
        unsafe { set_y((&raw mut v).cast(), (&raw const new_y).cast()) };
        assert_eq!(v.y, 4.0);

        assert!(constructor(VariantType::Vector2, 99).is_none());
        assert!(getter(VariantType::Vector2, "w").is_none());
    }

    #[test]
    fn indexed_and_keyed_access() {
        let array: Array = vec![Variant::from(1), Variant::from("two")].into();
        let get = indexed_getter(VariantType::Array).unwrap();
        let mut out = Variant::Nil;
        unsafe { get((&raw const array).cast(), 1, (&raw mut out).cast()) };
        assert_eq!(out, Variant::from("two"));

        let dict = Dictionary::new();
        let set = keyed_setter(VariantType::Dictionary).unwrap();
        let (key, value) = (Variant::from("k"), Variant::from(3));
        unsafe {
            set(
                (&raw const dict).cast_mut().cast(),
                (&raw const key).cast(),
                (&raw const value).cast(),
            );
        }
        assert_eq!(dict.get(&key), Some(Variant::Int(3)));
        let check = keyed_checker(VariantType::Dictionary).unwrap();
        assert_eq!(unsafe { check((&raw const dict).cast(), (&raw const key).cast()) }, 1);

        assert!(keyed_getter(VariantType::Array).is_none());
        assert!(indexed_getter(VariantType::Rid).is_none());
    }

    #[test]
    fn variant_conversion_thunks() {
        let to_variant = variant_from_type_constructor(VariantType::Int).unwrap();
        let n = 7i64;
        let mut v = MaybeUninit::<Variant>::uninit();
        unsafe { to_variant(v.as_mut_ptr().cast(), (&raw const n).cast()) };
        let v = unsafe { v.assume_init() };
        assert_eq!(v, Variant::Int(7));

        let from_variant = type_from_variant_constructor(VariantType::String).unwrap();
        let mut s = MaybeUninit::<GString>::uninit();
        unsafe { from_variant(s.as_mut_ptr().cast(), (&raw const v).cast()) };
        let s = unsafe { s.assume_init() };
        assert_eq!(s.to_string(), "7");
    }

    #[test]
    fn destructor_releases_shared_storage() {
        let array = Array::new();
        let mut copy = MaybeUninit::new(array.clone());
        assert_eq!(array.reference_count(), 2);
        let destroy = destructor(VariantType::Array).unwrap();
        unsafe { destroy(copy.as_mut_ptr().cast()) };
        assert_eq!(array.reference_count(), 1);
    }

    #[test]
    fn sqrt_via_utility_pointer() {
        let hash = find_utility_function("sqrt").unwrap().hash;
        let sqrt = utility_function("sqrt", i64::from(hash)).unwrap();
        let x = 16.0f64;
        let mut out = 0.0f64;
        let args = [(&raw const x).cast::<std::ffi::c_void>()];
        unsafe { sqrt((&raw mut out).cast(), args.as_ptr(), 1) };
        assert_eq!(out, 4.0);
        assert!(utility_function("sqrt", i64::from(hash) + 1).is_none());
    }
}
