// Native (ptrcall) representation of each builtin kind.
//
// Foreign code passes values by pointer to their native form instead of
// wrapping them in a Variant:
// - `Nil` (used for "any Variant" arguments): a whole `Variant`.
// - `Bool`: one byte, `0` or `1`.
// - `Int` / `Float`: `i64` / `f64`.
// - math kinds: the `#[repr(C)]` struct in place (not boxed).
// - `Rid`: `u64`.
// - `Object`: a raw `ObjectPtr`, borrowed; it holds no reference count.
// - every other kind: the Rust handle type in place (`GString`, `Array`,
//   `PackedArray<T>`, ...), whose size `size_of` reports.
//
// `read` clones a value out of native storage. `write` assigns into
// initialized storage, dropping the old value; `construct` initializes raw
// storage. Both convert the incoming Variant to the destination kind first.
//
// **Critical constraint:** every function here trusts its pointer. Callers
// (the ptr thunks and the method binds) guarantee the pointee has the
// declared kind; a mismatch is undefined behavior, not an error.

use std::mem;
use std::ptr;

use gdhost_sys::{ConstTypePtr, GdBool, ObjectPtr, TypePtr};

use super::{Variant, VariantType};
use crate::array::Array;
use crate::callable::{Callable, Signal};
use crate::dictionary::Dictionary;
use crate::math::{
    Aabb, Basis, Color, Plane, Projection, Quaternion, Rect2, Rect2i, Transform2D, Transform3D,
    Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i,
};
use crate::object::{self, ObjectRef};
use crate::packed::{
    PackedByteArray, PackedColorArray, PackedFloat32Array, PackedFloat64Array, PackedInt32Array,
    PackedInt64Array, PackedStringArray, PackedVector2Array, PackedVector3Array,
};
use crate::string::{GString, NodePath, StringName};
use crate::types::Rid;

unsafe fn get<T: Clone>(ptr: ConstTypePtr) -> T {
    unsafe { (*ptr.cast::<T>()).clone() }
}

unsafe fn put<T>(ptr: TypePtr, value: T, init: bool) {
    let slot = ptr.cast::<T>();
    if init {
        unsafe { *slot = value };
    } else {
        unsafe { slot.write(value) };
    }
}

fn object_from_native(raw: ObjectPtr) -> Variant {
    let reference = object::from_ptr(raw.cast_const())
        .map_or_else(ObjectRef::null, |o| ObjectRef::new(&o));
    Variant::Object(reference)
}

fn object_to_native(reference: &ObjectRef) -> ObjectPtr {
    reference.get().map_or(ptr::null_mut(), |o| o.as_ptr())
}

fn coerce(ty: VariantType, value: Variant) -> Variant {
    if ty == VariantType::Nil || value.get_type() == ty {
        return value;
    }
    match value.convert(ty) {
        Ok(converted) => converted,
        Err(e) => {
            crate::err_print!("cannot store value in native {ty} slot: {e}");
            Variant::default_of(ty)
        }
    }
}

macro_rules! native_table {
    (
        plain: [$($plain:ident: $pty:ty),* $(,)?],
        boxed: [$($boxed:ident: $bty:ty),* $(,)?] $(,)?
    ) => {
        /// Byte size of the native form of `ty`.
        pub fn size_of(ty: VariantType) -> usize {
            match ty {
                VariantType::Nil => mem::size_of::<Variant>(),
                VariantType::Bool => mem::size_of::<GdBool>(),
                VariantType::Object => mem::size_of::<ObjectPtr>(),
                $(VariantType::$plain => mem::size_of::<$pty>(),)*
                $(VariantType::$boxed => mem::size_of::<$bty>(),)*
            }
        }

        /// Clone the value of kind `ty` stored at `ptr`. A null pointer reads
        /// as the kind's default.
        ///
        /// # Safety
        /// `ptr` must be null or point to an initialized native value of `ty`.
        pub unsafe fn read(ty: VariantType, ptr: ConstTypePtr) -> Variant {
            if ptr.is_null() {
                return Variant::default_of(ty);
            }
            unsafe {
                match ty {
                    VariantType::Nil => get::<Variant>(ptr),
                    VariantType::Bool => Variant::Bool(get::<GdBool>(ptr) != 0),
                    VariantType::Object => object_from_native(get::<ObjectPtr>(ptr)),
                    $(VariantType::$plain => Variant::$plain(get::<$pty>(ptr)),)*
                    $(VariantType::$boxed => Variant::$boxed(Box::new(get::<$bty>(ptr))),)*
                }
            }
        }

        unsafe fn store(ty: VariantType, ptr: TypePtr, value: Variant, init: bool) {
            if ptr.is_null() {
                return;
            }
            if ty == VariantType::Nil {
                unsafe { put::<Variant>(ptr, value, init) };
                return;
            }
            unsafe {
                match coerce(ty, value) {
                    Variant::Nil => {}
                    Variant::Bool(b) => put::<GdBool>(ptr, GdBool::from(b), init),
                    Variant::Object(o) => put::<ObjectPtr>(ptr, object_to_native(&o), init),
                    $(Variant::$plain(v) => put::<$pty>(ptr, v, init),)*
                    $(Variant::$boxed(v) => put::<$bty>(ptr, *v, init),)*
                }
            }
        }

        /// Drop the native value of kind `ty` at `ptr` in place.
        ///
        /// # Safety
        /// `ptr` must be null or point to an initialized native value of `ty`,
        /// which must not be used afterwards.
        pub unsafe fn destroy(ty: VariantType, ptr: TypePtr) {
            if ptr.is_null() {
                return;
            }
            unsafe {
                match ty {
                    VariantType::Nil => ptr::drop_in_place(ptr.cast::<Variant>()),
                    VariantType::Bool | VariantType::Object => {}
                    $(VariantType::$plain => ptr::drop_in_place(ptr.cast::<$pty>()),)*
                    $(VariantType::$boxed => ptr::drop_in_place(ptr.cast::<$bty>()),)*
                }
            }
        }
    };
}

native_table! {
    plain: [
        Int: i64,
        Float: f64,
        String: GString,
        Vector2: Vector2,
        Vector2i: Vector2i,
        Rect2: Rect2,
        Rect2i: Rect2i,
        Vector3: Vector3,
        Vector3i: Vector3i,
        Vector4: Vector4,
        Vector4i: Vector4i,
        Plane: Plane,
        Quaternion: Quaternion,
        Color: Color,
        StringName: StringName,
        NodePath: NodePath,
        Rid: Rid,
        Callable: Callable,
        Signal: Signal,
        Dictionary: Dictionary,
        Array: Array,
        PackedByteArray: PackedByteArray,
        PackedInt32Array: PackedInt32Array,
        PackedInt64Array: PackedInt64Array,
        PackedFloat32Array: PackedFloat32Array,
        PackedFloat64Array: PackedFloat64Array,
        PackedStringArray: PackedStringArray,
        PackedVector2Array: PackedVector2Array,
        PackedVector3Array: PackedVector3Array,
        PackedColorArray: PackedColorArray,
    ],
    boxed: [
        Transform2D: Transform2D,
        Aabb: Aabb,
        Basis: Basis,
        Transform3D: Transform3D,
        Projection: Projection,
    ],
}

/// Assign `value` (converted to `ty`) into initialized storage, dropping the
/// previous value.
///
/// # Safety
/// `ptr` must be null or point to an initialized native value of `ty`.
pub unsafe fn write(ty: VariantType, ptr: TypePtr, value: Variant) {
    unsafe { store(ty, ptr, value, true) }
}

/// Initialize raw storage with `value` (converted to `ty`).
///
/// # Safety
/// `ptr` must be null or point to writable, suitably aligned storage of at
/// least `size_of(ty)` bytes. Any previous contents are overwritten without
/// being dropped.
pub unsafe fn construct(ty: VariantType, ptr: TypePtr, value: Variant) {
    unsafe { store(ty, ptr, value, false) }
}

#[cfg(test)]
mod tests {
    use std::mem::MaybeUninit;

    use super::*;

    /// Storage big and aligned enough for any native form.
    #[repr(C, align(16))]
    struct Slot(MaybeUninit<[u8; 128]>);

    impl Slot {
        fn new() -> Self {
            Slot(MaybeUninit::uninit())
        }

        fn ptr(&mut self) -> TypePtr {
            self.0.as_mut_ptr().cast()
        }
    }

    #[test]
    fn every_kind_fits_the_test_slot_and_round_trips_its_default() {
        for ty in VariantType::ALL {
            assert!(size_of(ty) <= 128, "{ty}");
            let mut slot = Slot::new();
            unsafe {
                construct(ty, slot.ptr(), Variant::default_of(ty));
                let back = read(ty, slot.ptr().cast_const());
                if ty != VariantType::Nil {
                    assert_eq!(back.get_type(), ty);
                }
                destroy(ty, slot.ptr());
            }
        }
    }

    #[test]
    fn scalars_use_plain_layouts() {
        let mut b: u8 = 7;
        let mut i: i64 = 0;
        unsafe {
            write(VariantType::Bool, (&raw mut b).cast(), Variant::from(true));
            write(VariantType::Int, (&raw mut i).cast(), Variant::from(i64::MIN));
            assert_eq!(read(VariantType::Int, (&raw const i).cast()), Variant::Int(i64::MIN));
        }
        assert_eq!(b, 1);
        assert_eq!(i, i64::MIN);
    }

    #[test]
    fn write_converts_to_the_slot_kind() {
        let mut f: f64 = 0.0;
        unsafe { write(VariantType::Float, (&raw mut f).cast(), Variant::from(3)) };
        assert_eq!(f, 3.0);
    }

    #[test]
    fn strings_are_owned_by_the_slot() {
        let mut slot = Slot::new();
        unsafe {
            construct(VariantType::String, slot.ptr(), Variant::from("abc"));
            write(VariantType::String, slot.ptr(), Variant::from("xyz"));
            assert_eq!(read(VariantType::String, slot.ptr().cast_const()), Variant::from("xyz"));
            destroy(VariantType::String, slot.ptr());
        }
    }

    #[test]
    fn arrays_share_their_store_through_native_slots() {
        let array = Array::new();
        let mut slot = Slot::new();
        unsafe {
            construct(VariantType::Array, slot.ptr(), Variant::Array(array.clone()));
            let back = read(VariantType::Array, slot.ptr().cast_const());
            assert!(back.as_array().is_some_and(|a| a.is_same(&array)));
            destroy(VariantType::Array, slot.ptr());
        }
        assert_eq!(array.reference_count(), 1);
    }

    #[test]
    fn objects_are_raw_pointers() {
        let obj = object::create(StringName::new("Object"), false);
        let mut raw: ObjectPtr = ptr::null_mut();
        unsafe {
            write(VariantType::Object, (&raw mut raw).cast(), Variant::Object(ObjectRef::new(&obj)));
            assert_eq!(raw, obj.as_ptr());
            let back = read(VariantType::Object, (&raw const raw).cast());
            assert_eq!(back.object_id(), obj.id());
        }
        object::destroy(obj.id());
        let back = unsafe { read(VariantType::Object, (&raw const raw).cast()) };
        assert!(back.object_id().is_null());
    }

    #[test]
    fn null_pointers_read_as_defaults() {
        let v = unsafe { read(VariantType::Vector2, ptr::null()) };
        assert_eq!(v, Variant::from(Vector2::ZERO));
    }
}
