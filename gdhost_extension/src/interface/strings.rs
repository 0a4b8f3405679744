// String marshaling and per-element pointers into containers.
//
// String constructors build a `GString` in uninitialized storage from a
// foreign buffer. The `_and_len` forms take an explicit unit count; a
// negative count means "NUL-terminated". Extraction copies at most
// `max_write` units and always returns the full length, so a caller can
// size its buffer with a first call that passes a null buffer.
//
// Element pointers point into the container's own storage and stay valid
// until the container is next resized or unshared. Out-of-range indices
// yield null. On a read-only Array the pointer is its shadow slot, so writes
// through it never reach the array.

use std::ffi::{c_char, c_void};
use std::ptr;

use gdhost_core::array::Array;
use gdhost_core::dictionary::Dictionary;
use gdhost_core::math::{Color, Vector2, Vector3};
use gdhost_core::packed::PackedArray;
use gdhost_core::GString;
use gdhost_sys::{ConstStringPtr, ConstTypePtr, ConstVariantPtr, GdInt, StringPtr, TypePtr, VariantPtr, WChar};

use super::{emplace, variant_ref};

/// View of a foreign buffer: `len` units, or up to the first zero unit when
/// `len` is negative.
unsafe fn units<'a, T: Copy + Default + PartialEq>(ptr: *const T, len: GdInt) -> &'a [T] {
    if ptr.is_null() {
        return &[];
    }
    let count = match usize::try_from(len) {
        Ok(count) => count,
        Err(_) => {
            let mut count = 0;
            while unsafe { *ptr.add(count) } != T::default() {
                count += 1;
            }
            count
        }
    };
    unsafe { std::slice::from_raw_parts(ptr, count) }
}

unsafe fn bytes<'a>(ptr: *const c_char, len: GdInt) -> &'a [u8] {
    unsafe { units(ptr.cast::<u8>(), len) }
}

#[cfg(not(windows))]
fn from_wide(text: &[WChar]) -> GString {
    GString::from_utf32(text)
}

#[cfg(windows)]
fn from_wide(text: &[WChar]) -> GString {
    GString::from_utf16(text)
}

#[cfg(not(windows))]
fn to_wide(text: &GString) -> Vec<WChar> {
    text.to_utf32()
}

#[cfg(windows)]
fn to_wide(text: &GString) -> Vec<WChar> {
    text.to_utf16()
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

pub(super) unsafe extern "C" fn new_with_latin1_chars(r_dest: StringPtr, text: *const c_char) {
    unsafe { emplace(r_dest, GString::from_latin1(bytes(text, -1))) };
}

pub(super) unsafe extern "C" fn new_with_utf8_chars(r_dest: StringPtr, text: *const c_char) {
    unsafe { emplace(r_dest, GString::from_utf8(bytes(text, -1))) };
}

pub(super) unsafe extern "C" fn new_with_utf16_chars(r_dest: StringPtr, text: *const u16) {
    unsafe { emplace(r_dest, GString::from_utf16(units(text, -1))) };
}

pub(super) unsafe extern "C" fn new_with_utf32_chars(r_dest: StringPtr, text: *const u32) {
    unsafe { emplace(r_dest, GString::from_utf32(units(text, -1))) };
}

pub(super) unsafe extern "C" fn new_with_wide_chars(r_dest: StringPtr, text: *const WChar) {
    unsafe { emplace(r_dest, from_wide(units(text, -1))) };
}

pub(super) unsafe extern "C" fn new_with_latin1_chars_and_len(
    r_dest: StringPtr,
    text: *const c_char,
    len: GdInt,
) {
    unsafe { emplace(r_dest, GString::from_latin1(bytes(text, len))) };
}

pub(super) unsafe extern "C" fn new_with_utf8_chars_and_len(
    r_dest: StringPtr,
    text: *const c_char,
    len: GdInt,
) {
    unsafe { emplace(r_dest, GString::from_utf8(bytes(text, len))) };
}

pub(super) unsafe extern "C" fn new_with_utf16_chars_and_len(
    r_dest: StringPtr,
    text: *const u16,
    len: GdInt,
) {
    unsafe { emplace(r_dest, GString::from_utf16(units(text, len))) };
}

pub(super) unsafe extern "C" fn new_with_utf32_chars_and_len(
    r_dest: StringPtr,
    text: *const u32,
    len: GdInt,
) {
    unsafe { emplace(r_dest, GString::from_utf32(units(text, len))) };
}

pub(super) unsafe extern "C" fn new_with_wide_chars_and_len(
    r_dest: StringPtr,
    text: *const WChar,
    len: GdInt,
) {
    unsafe { emplace(r_dest, from_wide(units(text, len))) };
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

unsafe fn string_ref<'a>(ptr: ConstStringPtr) -> Option<&'a GString> {
    unsafe { ptr.cast::<GString>().as_ref() }
}

unsafe fn copy_out<T: Copy>(encoded: &[T], dest: *mut T, max_write: GdInt) -> GdInt {
    if !dest.is_null() {
        let count = encoded.len().min(usize::try_from(max_write).unwrap_or(0));
        unsafe { ptr::copy_nonoverlapping(encoded.as_ptr(), dest, count) };
    }
    GdInt::try_from(encoded.len()).unwrap_or(GdInt::MAX)
}

pub(super) unsafe extern "C" fn to_latin1_chars(
    text: ConstStringPtr,
    r_dest: *mut c_char,
    max_write: GdInt,
) -> GdInt {
    let Some(text) = (unsafe { string_ref(text) }) else {
        return 0;
    };
    unsafe { copy_out(&text.to_latin1(), r_dest.cast::<u8>(), max_write) }
}

pub(super) unsafe extern "C" fn to_utf8_chars(
    text: ConstStringPtr,
    r_dest: *mut c_char,
    max_write: GdInt,
) -> GdInt {
    let Some(text) = (unsafe { string_ref(text) }) else {
        return 0;
    };
    unsafe { copy_out(&text.to_utf8(), r_dest.cast::<u8>(), max_write) }
}

pub(super) unsafe extern "C" fn to_utf16_chars(
    text: ConstStringPtr,
    r_dest: *mut u16,
    max_write: GdInt,
) -> GdInt {
    let Some(text) = (unsafe { string_ref(text) }) else {
        return 0;
    };
    unsafe { copy_out(&text.to_utf16(), r_dest, max_write) }
}

pub(super) unsafe extern "C" fn to_utf32_chars(
    text: ConstStringPtr,
    r_dest: *mut u32,
    max_write: GdInt,
) -> GdInt {
    let Some(text) = (unsafe { string_ref(text) }) else {
        return 0;
    };
    unsafe { copy_out(&text.to_utf32(), r_dest, max_write) }
}

pub(super) unsafe extern "C" fn to_wide_chars(
    text: ConstStringPtr,
    r_dest: *mut WChar,
    max_write: GdInt,
) -> GdInt {
    let Some(text) = (unsafe { string_ref(text) }) else {
        return 0;
    };
    unsafe { copy_out(&to_wide(text), r_dest, max_write) }
}

pub(super) unsafe extern "C" fn string_index(text: StringPtr, index: GdInt) -> *mut u32 {
    match (unsafe { text.cast::<GString>().as_mut() }, usize::try_from(index)) {
        (Some(text), Ok(index)) => text.unit_ptr_mut(index),
        _ => ptr::null_mut(),
    }
}

pub(super) unsafe extern "C" fn string_index_const(text: ConstStringPtr, index: GdInt) -> *const u32 {
    match (unsafe { string_ref(text) }, usize::try_from(index)) {
        (Some(text), Ok(index)) => text.unit_ptr(index),
        _ => ptr::null(),
    }
}

// ---------------------------------------------------------------------------
// Packed arrays, Array, Dictionary
// ---------------------------------------------------------------------------

macro_rules! packed_index {
    ($($elem:ty => $index:ident, $index_const:ident, $out:ty;)*) => {
        $(
            pub(super) unsafe extern "C" fn $index(base: TypePtr, index: GdInt) -> *mut $out {
                match (unsafe { base.cast::<PackedArray<$elem>>().as_mut() }, usize::try_from(index)) {
                    (Some(array), Ok(index)) => array.element_ptr_mut(index).cast(),
                    _ => ptr::null_mut(),
                }
            }

            pub(super) unsafe extern "C" fn $index_const(
                base: ConstTypePtr,
                index: GdInt,
            ) -> *const $out {
                match (unsafe { base.cast::<PackedArray<$elem>>().as_ref() }, usize::try_from(index)) {
                    (Some(array), Ok(index)) => array.element_ptr(index).cast(),
                    _ => ptr::null(),
                }
            }
        )*
    };
}

packed_index! {
    u8 => packed_byte_index, packed_byte_index_const, u8;
    i32 => packed_int32_index, packed_int32_index_const, i32;
    i64 => packed_int64_index, packed_int64_index_const, i64;
    f32 => packed_float32_index, packed_float32_index_const, f32;
    f64 => packed_float64_index, packed_float64_index_const, f64;
    GString => packed_string_index, packed_string_index_const, c_void;
    Vector2 => packed_vector2_index, packed_vector2_index_const, c_void;
    Vector3 => packed_vector3_index, packed_vector3_index_const, c_void;
    Color => packed_color_index, packed_color_index_const, c_void;
}

pub(super) unsafe extern "C" fn array_index(base: TypePtr, index: GdInt) -> VariantPtr {
    match (unsafe { base.cast::<Array>().as_ref() }, usize::try_from(index)) {
        (Some(array), Ok(index)) => array.element_ptr(index).cast(),
        _ => ptr::null_mut(),
    }
}

pub(super) unsafe extern "C" fn array_index_const(base: ConstTypePtr, index: GdInt) -> ConstVariantPtr {
    unsafe { array_index(base.cast_mut(), index) }.cast_const()
}

pub(super) unsafe extern "C" fn dictionary_index(base: TypePtr, key: ConstVariantPtr) -> VariantPtr {
    match unsafe { (base.cast::<Dictionary>().as_ref(), variant_ref(key)) } {
        (Some(dictionary), Some(key)) => dictionary.value_ptr(key).cast(),
        _ => ptr::null_mut(),
    }
}

pub(super) unsafe extern "C" fn dictionary_index_const(
    base: ConstTypePtr,
    key: ConstVariantPtr,
) -> ConstVariantPtr {
    match unsafe { (base.cast::<Dictionary>().as_ref(), variant_ref(key)) } {
        (Some(dictionary), Some(key)) => dictionary.value_ptr_const(key).cast(),
        _ => ptr::null(),
    }
}

#[cfg(test)]
mod tests {
    use std::mem::MaybeUninit;

    use gdhost_core::Variant;
    use gdhost_core::packed::PackedInt64Array;

    use super::*;

    fn built(f: impl FnOnce(StringPtr)) -> GString {
        let mut slot = MaybeUninit::<GString>::uninit();
        f(slot.as_mut_ptr().cast());
        unsafe { slot.assume_init() }
    }

    #[test]
    fn constructors_decode_each_encoding() {
        let utf8 = built(|p| unsafe { new_with_utf8_chars(p, c"héllo".as_ptr()) });
        assert_eq!(utf8.to_string(), "héllo");
        let latin1 = built(|p| unsafe { new_with_latin1_chars(p, c"\xe9t\xe9".as_ptr()) });
        assert_eq!(latin1.to_string(), "été");
        let wide: Vec<u16> = "wide\0".encode_utf16().collect();
        let utf16 = built(|p| unsafe { new_with_utf16_chars(p, wide.as_ptr()) });
        assert_eq!(utf16.to_string(), "wide");
        let utf32: Vec<u32> = "abc".chars().map(u32::from).collect();
        let s = built(|p| unsafe { new_with_utf32_chars_and_len(p, utf32.as_ptr(), 2) });
        assert_eq!(s.to_string(), "ab");
    }

    #[test]
    fn extraction_reports_full_length_and_truncates() {
        let text = GString::from("hello");
        let src: ConstStringPtr = std::ptr::from_ref(&text).cast();
        let needed = unsafe { to_utf8_chars(src, ptr::null_mut(), 0) };
        assert_eq!(needed, 5);
        let mut buf = [0 as c_char; 3];
        let len = unsafe { to_utf8_chars(src, buf.as_mut_ptr(), 3) };
        assert_eq!(len, 5);
        assert_eq!(buf.map(|c| c as u8), *b"hel");
    }

    #[test]
    fn string_index_is_null_out_of_range() {
        let mut text = GString::from("ab");
        let p: StringPtr = std::ptr::from_mut(&mut text).cast();
        unsafe {
            let unit = string_index(p, 1);
            assert!(!unit.is_null());
            *unit = u32::from('z');
            assert!(string_index(p, 2).is_null());
            assert!(string_index(p, -1).is_null());
        }
        assert_eq!(text.to_string(), "az");
    }

    #[test]
    fn packed_pointers_write_through() {
        let mut packed = PackedInt64Array::from(vec![1, 2, 3]);
        let base: TypePtr = std::ptr::from_mut(&mut packed).cast();
        unsafe {
            *packed_int64_index(base, 2) = 30;
            assert!(packed_int64_index(base, 3).is_null());
            assert_eq!(*packed_int64_index_const(base.cast_const(), 2), 30);
        }
        assert_eq!(packed.as_slice(), &[1, 2, 30]);
    }

    #[test]
    fn read_only_array_pointer_is_a_shadow() {
        let array = Array::from(vec![Variant::from(1)]);
        array.set_read_only(true);
        let base: TypePtr = std::ptr::from_ref(&array).cast_mut().cast();
        unsafe {
            let slot = array_index(base, 0).cast::<Variant>();
            assert_eq!(*slot, Variant::from(1));
            *slot = Variant::from(99);
            assert!(array_index(base, 1).is_null());
        }
        assert_eq!(array.get(0), Some(Variant::from(1)));
    }

    #[test]
    fn dictionary_pointer_inserts_missing_keys() {
        let dict = Dictionary::new();
        let base: TypePtr = std::ptr::from_ref(&dict).cast_mut().cast();
        let key = Variant::from("k");
        let kp: ConstVariantPtr = std::ptr::from_ref(&key).cast();
        unsafe {
            assert!(dictionary_index_const(base.cast_const(), kp).is_null());
            *dictionary_index(base, kp).cast::<Variant>() = Variant::from(4);
            assert_eq!(*dictionary_index_const(base.cast_const(), kp).cast::<Variant>(), Variant::from(4));
        }
        assert_eq!(dict.get(&key), Some(Variant::from(4)));
    }
}
