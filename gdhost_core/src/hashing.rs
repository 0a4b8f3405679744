// Hash primitives used by Variant hashing and container hashing.
//
// The 32-bit murmur3 round and finalizer live in `gdhost_sys` because the
// method signature hash is part of the ABI; everything here builds on them.
// Floats hash through a canonical bit pattern so that `0.0` and `-0.0` hash
// alike and every NaN hashes alike, matching `hash_compare` semantics.

pub use gdhost_sys::{HASH_MURMUR3_SEED, hash_fmix32, hash_murmur3_one_32};

pub fn hash_murmur3_one_64(input: u64, seed: u32) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let low = input as u32;
    let high = (input >> 32) as u32;
    hash_murmur3_one_32(high, hash_murmur3_one_32(low, seed))
}

fn canonical_f64(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

pub fn hash_murmur3_one_double(value: f64, seed: u32) -> u32 {
    hash_murmur3_one_64(canonical_f64(value), seed)
}

pub fn hash_murmur3_one_real(value: f32, seed: u32) -> u32 {
    hash_murmur3_one_double(f64::from(value), seed)
}

/// 64-bit integer hash (Thomas Wang's mix), folded to 32 bits.
pub fn hash_one_uint64(input: u64) -> u32 {
    let mut v = input;
    v = (!v).wrapping_add(v << 18);
    v ^= v >> 31;
    v = v.wrapping_mul(21);
    v ^= v >> 11;
    v = v.wrapping_add(v << 6);
    v ^= v >> 22;
    #[allow(clippy::cast_possible_truncation)]
    let folded = v as u32;
    folded
}

/// djb2 over a sequence of code points.
pub fn hash_djb2_chars(chars: impl IntoIterator<Item = u32>) -> u32 {
    let mut hash: u32 = 5381;
    for c in chars {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(c);
    }
    hash
}

pub fn hash_murmur3_reals(values: &[f32], seed: u32) -> u32 {
    values
        .iter()
        .fold(seed, |h, &v| hash_murmur3_one_real(v, h))
}

pub fn hash_murmur3_ints(values: &[i32], seed: u32) -> u32 {
    values
        .iter()
        .fold(seed, |h, &v| hash_murmur3_one_32(v as u32, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_zero_and_nan_are_canonical() {
        assert_eq!(
            hash_murmur3_one_double(0.0, HASH_MURMUR3_SEED),
            hash_murmur3_one_double(-0.0, HASH_MURMUR3_SEED)
        );
        let other_nan = f64::from_bits(f64::NAN.to_bits() | 1);
        assert_eq!(
            hash_murmur3_one_double(f64::NAN, HASH_MURMUR3_SEED),
            hash_murmur3_one_double(other_nan, HASH_MURMUR3_SEED)
        );
    }

    #[test]
    fn djb2_distinguishes_order() {
        assert_ne!(hash_djb2_chars([1, 2]), hash_djb2_chars([2, 1]));
        assert_eq!(hash_djb2_chars([]), 5381);
    }
}
