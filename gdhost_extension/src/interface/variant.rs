// Variant entry points and ptrcall lookups.
//
// Thin adapters over `gdhost_core::variant`: each validates its pointers,
// runs the Rust operation and writes results into the out-parameters.
// Receivers that a call may mutate are cloned first and assigned back after
// the arguments are released, so an argument aliasing the receiver never
// observes a half-updated value.

use std::ffi::c_char;

use gdhost_core::error::CallError;
use gdhost_core::variant::{self, AccessError, Operator, VariantType, ptr};
use gdhost_core::{GString, Variant};
use gdhost_sys::{
    self as sys, ConstStringNamePtr, ConstVariantPtr, GdBool, GdInt, PtrBuiltInMethod,
    PtrConstructor, PtrDestructor, PtrGetter, PtrIndexedGetter, PtrIndexedSetter,
    PtrKeyedChecker, PtrKeyedGetter, PtrKeyedSetter, PtrOperatorEvaluator, PtrSetter,
    PtrUtilityFunction, StringPtr, TypeFromVariantConstructorFunc, VariantFromTypeConstructorFunc,
    VariantOperator, VariantPtr,
};

use super::{
    c_str, emplace, finish_call, name_arg, set_flag, string_name_ref, variant_args, variant_ref,
};

fn kind(raw: sys::VariantType) -> Option<VariantType> {
    let ty = VariantType::from_raw(raw);
    if ty.is_none() {
        gdhost_core::err_print!("invalid variant type {raw}");
    }
    ty
}

/// Clone the Variant at `base`, let `f` mutate the clone, assign it back.
unsafe fn update<R>(base: VariantPtr, f: impl FnOnce(&mut Variant) -> R) -> Option<R> {
    let mut target = unsafe { variant_ref(base) }?.clone();
    let result = f(&mut target);
    unsafe { *base.cast::<Variant>() = target };
    Some(result)
}

// ---------------------------------------------------------------------------
// Lifetime
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn new_copy(r_dest: VariantPtr, src: ConstVariantPtr) {
    let value = unsafe { variant_ref(src) }.cloned().unwrap_or_default();
    unsafe { emplace(r_dest, value) };
}

pub(super) unsafe extern "C" fn new_nil(r_dest: VariantPtr) {
    unsafe { emplace(r_dest, Variant::Nil) };
}

pub(super) unsafe extern "C" fn destroy(value: VariantPtr) {
    if !value.is_null() {
        unsafe { std::ptr::drop_in_place(value.cast::<Variant>()) };
    }
}

// ---------------------------------------------------------------------------
// Calls and operators
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn call(
    base: VariantPtr,
    method: ConstStringNamePtr,
    args: *const ConstVariantPtr,
    argument_count: GdInt,
    r_return: VariantPtr,
    r_error: *mut sys::CallError,
) {
    let result = (|| {
        let method = unsafe { string_name_ref(method) }.ok_or(CallError::InvalidMethod)?;
        let mut target = unsafe { variant_ref(base) }
            .ok_or(CallError::InstanceIsNull)?
            .clone();
        let result = {
            let args = unsafe { variant_args(args, argument_count) }?;
            target.call(method, &args)
        };
        unsafe { *base.cast::<Variant>() = target };
        result
    })();
    unsafe { finish_call(result, r_return, r_error) };
}

pub(super) unsafe extern "C" fn call_static(
    ty: sys::VariantType,
    method: ConstStringNamePtr,
    args: *const ConstVariantPtr,
    argument_count: GdInt,
    r_return: VariantPtr,
    r_error: *mut sys::CallError,
) {
    let result = (|| {
        let ty = kind(ty).ok_or(CallError::InvalidMethod)?;
        let method = unsafe { string_name_ref(method) }.ok_or(CallError::InvalidMethod)?;
        let args = unsafe { variant_args(args, argument_count) }?;
        Variant::call_static(ty, method, &args)
    })();
    unsafe { finish_call(result, r_return, r_error) };
}

pub(super) unsafe extern "C" fn evaluate(
    op: VariantOperator,
    a: ConstVariantPtr,
    b: ConstVariantPtr,
    r_return: VariantPtr,
    r_valid: *mut GdBool,
) {
    let nil = Variant::Nil;
    let value = match (Operator::from_raw(op), unsafe { variant_ref(a) }) {
        (Some(op), Some(a)) => {
            let b = unsafe { variant_ref(b) }.unwrap_or(&nil);
            variant::evaluate(op, a, b)
        }
        _ => None,
    };
    unsafe {
        set_flag(r_valid, value.is_some());
        emplace(r_return, value.unwrap_or_default());
    }
}

// ---------------------------------------------------------------------------
// Element and member access
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn set(
    base: VariantPtr,
    key: ConstVariantPtr,
    value: ConstVariantPtr,
    r_valid: *mut GdBool,
) {
    let ok = match unsafe { (variant_ref(key), variant_ref(value)) } {
        (Some(key), Some(value)) => {
            let (key, value) = (key.clone(), value.clone());
            unsafe { update(base, |b| b.set(&key, &value)) }.unwrap_or(false)
        }
        _ => false,
    };
    unsafe { set_flag(r_valid, ok) };
}

pub(super) unsafe extern "C" fn set_named(
    base: VariantPtr,
    name: ConstStringNamePtr,
    value: ConstVariantPtr,
    r_valid: *mut GdBool,
) {
    let ok = match unsafe { (string_name_ref(name), variant_ref(value)) } {
        (Some(name), Some(value)) => {
            let value = value.clone();
            unsafe { update(base, |b| b.set_named(name, &value)) }.unwrap_or(false)
        }
        _ => false,
    };
    unsafe { set_flag(r_valid, ok) };
}

pub(super) unsafe extern "C" fn set_keyed(
    base: VariantPtr,
    key: ConstVariantPtr,
    value: ConstVariantPtr,
    r_valid: *mut GdBool,
) {
    let ok = match unsafe { (variant_ref(key), variant_ref(value)) } {
        (Some(key), Some(value)) => {
            let (key, value) = (key.clone(), value.clone());
            unsafe { update(base, |b| b.set_keyed(&key, &value)) }.unwrap_or(false)
        }
        _ => false,
    };
    unsafe { set_flag(r_valid, ok) };
}

pub(super) unsafe extern "C" fn set_indexed(
    base: VariantPtr,
    index: GdInt,
    value: ConstVariantPtr,
    r_valid: *mut GdBool,
    r_oob: *mut GdBool,
) {
    let result = match unsafe { variant_ref(value) } {
        Some(value) => {
            let value = value.clone();
            unsafe { update(base, |b| b.set_indexed(index, &value)) }
                .unwrap_or(Err(AccessError::Invalid))
        }
        None => Err(AccessError::Invalid),
    };
    unsafe {
        set_flag(r_valid, result.is_ok());
        set_flag(r_oob, result == Err(AccessError::OutOfBounds));
    }
}

unsafe fn emplace_found(value: Option<Variant>, r_return: VariantPtr, r_valid: *mut GdBool) {
    unsafe {
        set_flag(r_valid, value.is_some());
        emplace(r_return, value.unwrap_or_default());
    }
}

pub(super) unsafe extern "C" fn get(
    base: ConstVariantPtr,
    key: ConstVariantPtr,
    r_return: VariantPtr,
    r_valid: *mut GdBool,
) {
    let value = match unsafe { (variant_ref(base), variant_ref(key)) } {
        (Some(base), Some(key)) => base.get(key),
        _ => None,
    };
    unsafe { emplace_found(value, r_return, r_valid) };
}

pub(super) unsafe extern "C" fn get_named(
    base: ConstVariantPtr,
    name: ConstStringNamePtr,
    r_return: VariantPtr,
    r_valid: *mut GdBool,
) {
    let value = match unsafe { (variant_ref(base), string_name_ref(name)) } {
        (Some(base), Some(name)) => base.get_named(name),
        _ => None,
    };
    unsafe { emplace_found(value, r_return, r_valid) };
}

pub(super) unsafe extern "C" fn get_keyed(
    base: ConstVariantPtr,
    key: ConstVariantPtr,
    r_return: VariantPtr,
    r_valid: *mut GdBool,
) {
    let value = match unsafe { (variant_ref(base), variant_ref(key)) } {
        (Some(base), Some(key)) => base.get_keyed(key),
        _ => None,
    };
    unsafe { emplace_found(value, r_return, r_valid) };
}

pub(super) unsafe extern "C" fn get_indexed(
    base: ConstVariantPtr,
    index: GdInt,
    r_return: VariantPtr,
    r_valid: *mut GdBool,
    r_oob: *mut GdBool,
) {
    let result = match unsafe { variant_ref(base) } {
        Some(base) => base.get_indexed(index),
        None => Err(AccessError::Invalid),
    };
    unsafe { set_flag(r_oob, matches!(result, Err(AccessError::OutOfBounds))) };
    unsafe { emplace_found(result.ok(), r_return, r_valid) };
}

// ---------------------------------------------------------------------------
// Iteration
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn iter_init(
    base: ConstVariantPtr,
    r_iter: VariantPtr,
    r_valid: *mut GdBool,
) -> GdBool {
    let mut iter = Variant::Nil;
    let more = unsafe { variant_ref(base) }.and_then(|b| b.iter_init(&mut iter));
    unsafe {
        set_flag(r_valid, more.is_some());
        emplace(r_iter, iter);
    }
    GdBool::from(more.unwrap_or(false))
}

pub(super) unsafe extern "C" fn iter_next(
    base: ConstVariantPtr,
    iter: VariantPtr,
    r_valid: *mut GdBool,
) -> GdBool {
    let more = match unsafe { variant_ref(base) } {
        Some(base) => {
            let base = base.clone();
            unsafe { update(iter, |it| base.iter_next(it)) }.flatten()
        }
        None => None,
    };
    unsafe { set_flag(r_valid, more.is_some()) };
    GdBool::from(more.unwrap_or(false))
}

pub(super) unsafe extern "C" fn iter_get(
    base: ConstVariantPtr,
    iter: VariantPtr,
    r_return: VariantPtr,
    r_valid: *mut GdBool,
) {
    let value = match unsafe { (variant_ref(base), variant_ref(iter)) } {
        (Some(base), Some(iter)) => base.iter_get(iter),
        _ => None,
    };
    unsafe { emplace_found(value, r_return, r_valid) };
}

// ---------------------------------------------------------------------------
// Hashing, comparison and value helpers
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn hash(value: ConstVariantPtr) -> GdInt {
    unsafe { variant_ref(value) }.map_or(0, |v| GdInt::from(v.hash()))
}

pub(super) unsafe extern "C" fn recursive_hash(value: ConstVariantPtr, depth: GdInt) -> GdInt {
    let depth = i32::try_from(depth).unwrap_or(i32::MAX);
    unsafe { variant_ref(value) }.map_or(0, |v| GdInt::from(v.recursive_hash(depth)))
}

pub(super) unsafe extern "C" fn hash_compare(a: ConstVariantPtr, b: ConstVariantPtr) -> GdBool {
    match unsafe { (variant_ref(a), variant_ref(b)) } {
        (Some(a), Some(b)) => GdBool::from(a.hash_compare(b)),
        _ => 0,
    }
}

pub(super) unsafe extern "C" fn booleanize(value: ConstVariantPtr) -> GdBool {
    unsafe { variant_ref(value) }.map_or(0, |v| GdBool::from(v.booleanize()))
}

pub(super) unsafe extern "C" fn sub(a: ConstVariantPtr, b: ConstVariantPtr, r_dest: VariantPtr) {
    let value = match unsafe { (variant_ref(a), variant_ref(b)) } {
        (Some(a), Some(b)) => variant::sub(a, b),
        _ => Variant::Nil,
    };
    unsafe { emplace(r_dest, value) };
}

pub(super) unsafe extern "C" fn blend(
    a: ConstVariantPtr,
    b: ConstVariantPtr,
    c: f32,
    r_dest: VariantPtr,
) {
    let value = match unsafe { (variant_ref(a), variant_ref(b)) } {
        (Some(a), Some(b)) => variant::blend(a, b, c),
        _ => Variant::Nil,
    };
    unsafe { emplace(r_dest, value) };
}

pub(super) unsafe extern "C" fn interpolate(
    a: ConstVariantPtr,
    b: ConstVariantPtr,
    c: f32,
    r_dest: VariantPtr,
) {
    let value = match unsafe { (variant_ref(a), variant_ref(b)) } {
        (Some(a), Some(b)) => variant::interpolate(a, b, f64::from(c)),
        _ => Variant::Nil,
    };
    unsafe { emplace(r_dest, value) };
}

pub(super) unsafe extern "C" fn duplicate(value: ConstVariantPtr, r_return: VariantPtr, deep: GdBool) {
    let copy = unsafe { variant_ref(value) }.map_or(Variant::Nil, |v| v.duplicate(deep != 0));
    unsafe { emplace(r_return, copy) };
}

pub(super) unsafe extern "C" fn stringify(value: ConstVariantPtr, r_string: StringPtr) {
    let text = unsafe { variant_ref(value) }.map_or_else(String::new, Variant::stringify);
    unsafe { emplace(r_string, GString::from(text)) };
}

pub(super) unsafe extern "C" fn get_type(value: ConstVariantPtr) -> sys::VariantType {
    unsafe { variant_ref(value) }.map_or(sys::VARIANT_TYPE_NIL, |v| v.get_type().raw())
}

pub(super) unsafe extern "C" fn has_method(
    value: ConstVariantPtr,
    method: ConstStringNamePtr,
) -> GdBool {
    match unsafe { (variant_ref(value), string_name_ref(method)) } {
        (Some(value), Some(method)) => GdBool::from(value.has_method(method)),
        _ => 0,
    }
}

pub(super) unsafe extern "C" fn has_member(
    ty: sys::VariantType,
    member: ConstStringNamePtr,
) -> GdBool {
    match (VariantType::from_raw(ty), unsafe { string_name_ref(member) }) {
        (Some(ty), Some(member)) => GdBool::from(variant::is_member(ty, member.as_str())),
        _ => 0,
    }
}

pub(super) unsafe extern "C" fn has_key(
    value: ConstVariantPtr,
    key: ConstVariantPtr,
    r_valid: *mut GdBool,
) -> GdBool {
    let found = match unsafe { (variant_ref(value), variant_ref(key)) } {
        (Some(value), Some(key)) => value.has_key(key),
        _ => None,
    };
    unsafe { set_flag(r_valid, found.is_some()) };
    GdBool::from(found.unwrap_or(false))
}

pub(super) unsafe extern "C" fn get_type_name(ty: sys::VariantType, r_name: StringPtr) {
    let name = kind(ty).map_or("", VariantType::name);
    unsafe { emplace(r_name, GString::from(name)) };
}

pub(super) unsafe extern "C" fn can_convert(from: sys::VariantType, to: sys::VariantType) -> GdBool {
    match (kind(from), kind(to)) {
        (Some(from), Some(to)) => GdBool::from(Variant::can_convert(from, to)),
        _ => 0,
    }
}

pub(super) unsafe extern "C" fn can_convert_strict(
    from: sys::VariantType,
    to: sys::VariantType,
) -> GdBool {
    match (kind(from), kind(to)) {
        (Some(from), Some(to)) => GdBool::from(Variant::can_convert_strict(from, to)),
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Ptrcall lookups
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn from_type_constructor(
    ty: sys::VariantType,
) -> Option<VariantFromTypeConstructorFunc> {
    ptr::variant_from_type_constructor(kind(ty)?)
}

pub(super) unsafe extern "C" fn to_type_constructor(
    ty: sys::VariantType,
) -> Option<TypeFromVariantConstructorFunc> {
    ptr::type_from_variant_constructor(kind(ty)?)
}

pub(super) unsafe extern "C" fn ptr_operator_evaluator(
    op: VariantOperator,
    a: sys::VariantType,
    b: sys::VariantType,
) -> Option<PtrOperatorEvaluator> {
    let Some(op) = Operator::from_raw(op) else {
        gdhost_core::err_print!("invalid operator {op}");
        return None;
    };
    ptr::operator_evaluator(op, kind(a)?, kind(b)?)
}

pub(super) unsafe extern "C" fn ptr_builtin_method(
    ty: sys::VariantType,
    method: *const c_char,
    hash: GdInt,
) -> Option<PtrBuiltInMethod> {
    let method = unsafe { c_str(method) }?;
    ptr::builtin_method(kind(ty)?, method, hash)
}

pub(super) unsafe extern "C" fn ptr_constructor(
    ty: sys::VariantType,
    index: i32,
) -> Option<PtrConstructor> {
    ptr::constructor(kind(ty)?, index)
}

pub(super) unsafe extern "C" fn ptr_destructor(ty: sys::VariantType) -> Option<PtrDestructor> {
    ptr::destructor(kind(ty)?)
}

pub(super) unsafe extern "C" fn construct(
    ty: sys::VariantType,
    r_base: VariantPtr,
    args: *const ConstVariantPtr,
    argument_count: i32,
    r_error: *mut sys::CallError,
) {
    let result = (|| {
        let ty = kind(ty).ok_or(CallError::InvalidMethod)?;
        let args = unsafe { variant_args(args, GdInt::from(argument_count)) }?;
        Variant::construct(ty, &args)
    })();
    unsafe { finish_call(result, r_base, r_error) };
}

pub(super) unsafe extern "C" fn ptr_setter(
    ty: sys::VariantType,
    member: *const c_char,
) -> Option<PtrSetter> {
    ptr::setter(kind(ty)?, unsafe { c_str(member) }?)
}

pub(super) unsafe extern "C" fn ptr_getter(
    ty: sys::VariantType,
    member: *const c_char,
) -> Option<PtrGetter> {
    ptr::getter(kind(ty)?, unsafe { c_str(member) }?)
}

pub(super) unsafe extern "C" fn ptr_indexed_setter(
    ty: sys::VariantType,
) -> Option<PtrIndexedSetter> {
    ptr::indexed_setter(kind(ty)?)
}

pub(super) unsafe extern "C" fn ptr_indexed_getter(
    ty: sys::VariantType,
) -> Option<PtrIndexedGetter> {
    ptr::indexed_getter(kind(ty)?)
}

pub(super) unsafe extern "C" fn ptr_keyed_setter(ty: sys::VariantType) -> Option<PtrKeyedSetter> {
    ptr::keyed_setter(kind(ty)?)
}

pub(super) unsafe extern "C" fn ptr_keyed_getter(ty: sys::VariantType) -> Option<PtrKeyedGetter> {
    ptr::keyed_getter(kind(ty)?)
}

pub(super) unsafe extern "C" fn ptr_keyed_checker(
    ty: sys::VariantType,
) -> Option<PtrKeyedChecker> {
    ptr::keyed_checker(kind(ty)?)
}

pub(super) unsafe extern "C" fn constant_value(
    ty: sys::VariantType,
    constant: *const c_char,
    r_return: VariantPtr,
) {
    let value = kind(ty).zip(unsafe { name_arg(constant, "constant name") }).and_then(
        |(ty, constant)| {
            let value = variant::constant_value(ty, constant.as_str());
            if value.is_none() {
                gdhost_core::err_print!("{ty} has no constant '{constant}'");
            }
            value
        },
    );
    unsafe { emplace(r_return, value.unwrap_or_default()) };
}

pub(super) unsafe extern "C" fn ptr_utility_function(
    name: *const c_char,
    hash: GdInt,
) -> Option<PtrUtilityFunction> {
    ptr::utility_function(unsafe { c_str(name) }?, hash)
}

#[cfg(test)]
mod tests {
    use std::mem::MaybeUninit;

    use gdhost_core::array::Array;
    use gdhost_core::math::Vector2;
    use gdhost_core::{StringName, diag};

    use super::*;

    fn out() -> MaybeUninit<Variant> {
        MaybeUninit::uninit()
    }

    fn cptr(v: &Variant) -> ConstVariantPtr {
        std::ptr::from_ref(v).cast()
    }

    #[test]
    fn copy_and_destroy() {
        let src = Variant::from("text");
        let mut slot = out();
        unsafe {
            new_copy(slot.as_mut_ptr().cast(), cptr(&src));
            assert_eq!(slot.assume_init_ref(), &src);
            destroy(slot.as_mut_ptr().cast());
        }
    }

    #[test]
    fn copies_of_every_kind_match_and_release_their_payload() {
        use gdhost_core::VariantType;
        use gdhost_core::object::{self, ObjectRef};

        let counted = object::create(StringName::new("RefCounted"), true);
        let held = ObjectRef::new(&counted);
        let array = Array::from(vec![Variant::from(1), Variant::from("two")]);

        for ty in VariantType::ALL {
            let src = match ty {
                VariantType::Object => Variant::Object(held.clone()),
                VariantType::Array => Variant::Array(array.clone()),
                VariantType::String => Variant::from("payload"),
                VariantType::Int => Variant::from(-7),
                _ => Variant::default_of(ty),
            };
            let expected_hash = unsafe { hash(cptr(&src)) };
            for _ in 0..1000 {
                let mut slot = out();
                unsafe {
                    new_copy(slot.as_mut_ptr().cast(), cptr(&src));
                    let copy = slot.as_ptr().cast();
                    assert_eq!(slot.assume_init_ref(), &src, "{ty}");
                    assert_ne!(hash_compare(copy, cptr(&src)), 0, "{ty}");
                    assert_eq!(hash(copy), expected_hash, "{ty}");
                    destroy(slot.as_mut_ptr().cast());
                }
            }
        }

        assert_eq!(array.reference_count(), 1);
        assert_eq!(counted.reference_count(), 1);
        assert!(object::is_valid(counted.id()));
        drop(held);
        assert!(!object::is_valid(counted.id()));
    }

    #[test]
    fn dynamic_call_writes_back_mutations() {
        let mut base = Variant::from(gdhost_core::packed::PackedInt32Array::new());
        let method = StringName::new("push_back");
        let arg = Variant::from(5);
        let args = [cptr(&arg)];
        let mut ret = out();
        let mut error = sys::CallError::OK;
        unsafe {
            call(
                std::ptr::from_mut(&mut base).cast(),
                std::ptr::from_ref(&method).cast(),
                args.as_ptr(),
                1,
                ret.as_mut_ptr().cast(),
                &mut error,
            );
            drop(ret.assume_init());
        }
        assert!(error.is_ok());
        assert_eq!(base.call(&StringName::new("size"), &[]), Ok(Variant::from(1)));
    }

    #[test]
    fn unknown_method_sets_call_error() {
        let mut base = Variant::from(1);
        let method = StringName::new("no_such_method");
        let mut ret = out();
        let mut error = sys::CallError::OK;
        unsafe {
            call(
                std::ptr::from_mut(&mut base).cast(),
                std::ptr::from_ref(&method).cast(),
                std::ptr::null(),
                0,
                ret.as_mut_ptr().cast(),
                &mut error,
            );
            assert_eq!(ret.assume_init(), Variant::Nil);
        }
        assert_eq!(error.error, sys::CALL_ERROR_INVALID_METHOD);
    }

    #[test]
    fn evaluate_reports_validity() {
        let (a, b) = (Variant::from(2), Variant::from(3));
        let mut ret = out();
        let mut valid: GdBool = 0;
        unsafe {
            evaluate(sys::OP_ADD, cptr(&a), cptr(&b), ret.as_mut_ptr().cast(), &mut valid);
            assert_eq!(ret.assume_init(), Variant::from(5));
        }
        assert_eq!(valid, 1);

        let s = Variant::from("x");
        let mut ret = out();
        unsafe {
            evaluate(sys::OP_SUBTRACT, cptr(&s), cptr(&a), ret.as_mut_ptr().cast(), &mut valid);
            assert_eq!(ret.assume_init(), Variant::Nil);
        }
        assert_eq!(valid, 0);
    }

    #[test]
    fn indexed_access_flags_out_of_bounds() {
        let array = Array::from(vec![Variant::from(1)]);
        let mut base = Variant::Array(array.clone());
        let value = Variant::from(9);
        let (mut valid, mut oob) = (0, 0);
        unsafe {
            set_indexed(std::ptr::from_mut(&mut base).cast(), 0, cptr(&value), &mut valid, &mut oob);
        }
        assert_eq!((valid, oob), (1, 0));
        assert_eq!(array.get(0), Some(Variant::from(9)));

        let mut ret = out();
        unsafe {
            get_indexed(cptr(&base), 4, ret.as_mut_ptr().cast(), &mut valid, &mut oob);
            assert_eq!(ret.assume_init(), Variant::Nil);
        }
        assert_eq!((valid, oob), (0, 1));
    }

    #[test]
    fn iteration_over_an_array() {
        let base = Variant::Array(Array::from(vec![Variant::from(1), Variant::from(2)]));
        let mut iter = out();
        let mut valid = 0;
        let mut seen = Vec::new();
        unsafe {
            let mut more = iter_init(cptr(&base), iter.as_mut_ptr().cast(), &mut valid);
            assert_eq!(valid, 1);
            while more != 0 {
                let mut item = out();
                iter_get(cptr(&base), iter.as_mut_ptr().cast(), item.as_mut_ptr().cast(), &mut valid);
                seen.push(item.assume_init());
                more = iter_next(cptr(&base), iter.as_mut_ptr().cast(), &mut valid);
            }
            drop(iter.assume_init());
        }
        assert_eq!(seen, vec![Variant::from(1), Variant::from(2)]);
    }

    #[test]
    fn construct_reports_bad_arguments() {
        let (x, y) = (Variant::from(1.5), Variant::from(2));
        let args = [cptr(&x), cptr(&y)];
        let mut ret = out();
        let mut error = sys::CallError::OK;
        unsafe {
            construct(sys::VARIANT_TYPE_VECTOR2, ret.as_mut_ptr().cast(), args.as_ptr(), 2, &mut error);
            assert_eq!(ret.assume_init(), Variant::from(Vector2::new(1.5, 2.0)));
        }
        assert!(error.is_ok());

        let bad = Variant::from("nope");
        let args = [cptr(&bad), cptr(&y)];
        let mut ret = out();
        unsafe {
            construct(sys::VARIANT_TYPE_VECTOR2, ret.as_mut_ptr().cast(), args.as_ptr(), 2, &mut error);
            drop(ret.assume_init());
        }
        assert_eq!(error.error, sys::CALL_ERROR_INVALID_ARGUMENT);
    }

    #[test]
    fn constants_and_type_names() {
        let mut ret = out();
        unsafe {
            constant_value(sys::VARIANT_TYPE_VECTOR2, c"ZERO".as_ptr(), ret.as_mut_ptr().cast());
            assert_eq!(ret.assume_init(), Variant::from(Vector2::ZERO));
        }
        let mut name = MaybeUninit::<GString>::uninit();
        unsafe {
            get_type_name(sys::VARIANT_TYPE_PACKED_INT32_ARRAY, name.as_mut_ptr().cast());
            assert_eq!(name.assume_init().to_string(), "PackedInt32Array");
        }
        let (_, reports) = diag::capture(|| {
            let mut ret = out();
            unsafe {
                constant_value(sys::VARIANT_TYPE_VECTOR2, c"NOPE".as_ptr(), ret.as_mut_ptr().cast());
                ret.assume_init()
            }
        });
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn invalid_type_ids_are_rejected() {
        let (found, reports) = diag::capture(|| unsafe { ptr_destructor(sys::VARIANT_TYPE_MAX) });
        assert!(found.is_none());
        assert_eq!(reports.len(), 1);
        assert_eq!(unsafe { can_convert(sys::VARIANT_TYPE_INT, 999) }, 0);
    }
}
