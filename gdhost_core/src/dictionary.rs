// Dictionary: an insertion-ordered Variant-to-Variant map with shared
// reference semantics.
//
// Copies of a `Dictionary` handle share one store (`Arc`), like the engine's
// containers; `duplicate` makes an independent one. Keys are hashed with
// `Variant::hash` and compared with `hash_compare`, so `1` and `1.0` are
// different keys while two NaN keys are the same.
//
// Pointers returned by `value_ptr` point into the store and stay valid until
// the next structural change to the dictionary.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::array::Array;
use crate::hashing::{hash_fmix32, hash_murmur3_one_32};
use crate::variant::{RecursionGuard, Variant, VariantType};

/// A Variant used as a map key. The hash is computed once on insertion.
#[derive(Clone)]
pub struct VariantKey {
    hash: u32,
    value: Variant,
}

impl VariantKey {
    pub fn new(value: Variant) -> Self {
        Self {
            hash: value.hash(),
            value,
        }
    }

    pub fn value(&self) -> &Variant {
        &self.value
    }
}

impl PartialEq for VariantKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.value.hash_compare(&other.value)
    }
}

impl Eq for VariantKey {}

impl Hash for VariantKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash);
    }
}

type Map = IndexMap<VariantKey, Variant, FxBuildHasher>;

#[derive(Default)]
struct DictionaryData {
    map: Map,
    read_only: bool,
}

#[derive(Clone)]
pub struct Dictionary {
    inner: Arc<RwLock<DictionaryData>>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DictionaryData::default())),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read_recursive().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Variant) -> Option<Variant> {
        let key = VariantKey::new(key.clone());
        self.inner.read_recursive().map.get(&key).cloned()
    }

    pub fn get_or(&self, key: &Variant, default: Variant) -> Variant {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &Variant) -> bool {
        let key = VariantKey::new(key.clone());
        self.inner.read_recursive().map.contains_key(&key)
    }

    pub fn has_all(&self, keys: &Array) -> bool {
        keys.to_vec().iter().all(|k| self.has(k))
    }

    /// Insert or replace. False (and an error report) when read-only.
    pub fn set(&self, key: Variant, value: Variant) -> bool {
        let key = VariantKey::new(key);
        let old = {
            let mut data = self.inner.write();
            if data.read_only {
                drop(data);
                err_print!("Dictionary is in read-only state.");
                return false;
            }
            data.map.insert(key, value)
        };
        drop(old);
        true
    }

    pub fn erase(&self, key: &Variant) -> bool {
        let key = VariantKey::new(key.clone());
        let removed = {
            let mut data = self.inner.write();
            if data.read_only {
                drop(data);
                err_print!("Dictionary is in read-only state.");
                return false;
            }
            data.map.shift_remove_entry(&key)
        };
        removed.is_some()
    }

    pub fn clear(&self) {
        let old = {
            let mut data = self.inner.write();
            if data.read_only {
                drop(data);
                err_print!("Dictionary is in read-only state.");
                return;
            }
            std::mem::take(&mut data.map)
        };
        drop(old);
    }

    /// Snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<(Variant, Variant)> {
        self.inner
            .read_recursive()
            .map
            .iter()
            .map(|(k, v)| (k.value.clone(), v.clone()))
            .collect()
    }

    pub fn keys(&self) -> Array {
        self.inner
            .read_recursive()
            .map
            .keys()
            .map(|k| k.value.clone())
            .collect()
    }

    pub fn values(&self) -> Array {
        self.inner.read_recursive().map.values().cloned().collect()
    }

    pub fn index_of(&self, key: &Variant) -> Option<usize> {
        self.inner
            .read_recursive()
            .map
            .get_index_of(&VariantKey::new(key.clone()))
    }

    pub fn key_at(&self, index: usize) -> Option<Variant> {
        self.inner
            .read_recursive()
            .map
            .get_index(index)
            .map(|(k, _)| k.value.clone())
    }

    /// First key whose value equals `value`, or Nil.
    pub fn find_key(&self, value: &Variant) -> Variant {
        self.inner
            .read_recursive()
            .map
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(k, _)| k.value.clone())
            .unwrap_or_default()
    }

    /// Copy entries of `other` in; existing keys are replaced only when
    /// `overwrite`.
    pub fn merge(&self, other: &Dictionary, overwrite: bool) {
        for (k, v) in other.entries() {
            if overwrite || !self.has(&k) {
                self.set(k, v);
            }
        }
    }

    pub fn make_read_only(&self) {
        self.inner.write().read_only = true;
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_recursive().read_only
    }

    pub fn is_same(&self, other: &Dictionary) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity of the shared store.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Slot for `key`, inserted as Nil when absent. Null when read-only.
    pub fn value_ptr(&self, key: &Variant) -> *mut Variant {
        let key = VariantKey::new(key.clone());
        let mut data = self.inner.write();
        if data.read_only {
            return std::ptr::null_mut();
        }
        let slot = data.map.entry(key).or_insert(Variant::Nil);
        std::ptr::from_mut(slot)
    }

    /// Slot for `key`, null when absent.
    pub fn value_ptr_const(&self, key: &Variant) -> *const Variant {
        let key = VariantKey::new(key.clone());
        let data = self.inner.read_recursive();
        data.map
            .get(&key)
            .map_or(std::ptr::null(), std::ptr::from_ref)
    }

    pub fn duplicate(&self, deep: bool) -> Dictionary {
        self.recursive_duplicate(deep, 0)
    }

    pub fn recursive_duplicate(&self, deep: bool, depth: i32) -> Dictionary {
        let mut guard = RecursionGuard::new();
        self.duplicate_guarded(deep, depth, &mut guard)
    }

    pub(crate) fn duplicate_guarded(
        &self,
        deep: bool,
        depth: i32,
        guard: &mut RecursionGuard,
    ) -> Dictionary {
        let out = Dictionary::new();
        if !guard.enter(depth) {
            return out;
        }
        let entries = self.entries();
        let mut map = Map::default();
        for (k, v) in entries {
            let (k, v) = if deep {
                (
                    k.duplicate_guarded(true, depth + 1, guard),
                    v.duplicate_guarded(true, depth + 1, guard),
                )
            } else {
                (k, v)
            };
            map.insert(VariantKey::new(k), v);
        }
        out.inner.write().map = map;
        out
    }

    pub fn hash(&self) -> u32 {
        let mut guard = RecursionGuard::new();
        self.hash_guarded(0, &mut guard)
    }

    pub fn recursive_hash(&self, depth: i32) -> u32 {
        let mut guard = RecursionGuard::new();
        self.hash_guarded(depth, &mut guard)
    }

    pub(crate) fn hash_guarded(&self, depth: i32, guard: &mut RecursionGuard) -> u32 {
        if !guard.enter(depth) {
            return 0;
        }
        let mut h = hash_murmur3_one_32(VariantType::Dictionary as u32, crate::hashing::HASH_MURMUR3_SEED);
        for (k, v) in self.entries() {
            h = hash_murmur3_one_32(k.hash_guarded(depth + 1, guard), h);
            h = hash_murmur3_one_32(v.hash_guarded(depth + 1, guard), h);
        }
        hash_fmix32(h)
    }

    pub fn recursive_equal(&self, other: &Dictionary, depth: i32) -> bool {
        let mut guard = RecursionGuard::new();
        self.equal_guarded(other, depth, &mut guard)
    }

    pub(crate) fn equal_guarded(
        &self,
        other: &Dictionary,
        depth: i32,
        guard: &mut RecursionGuard,
    ) -> bool {
        if self.is_same(other) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        if !guard.enter(depth) {
            return true;
        }
        for (k, v) in self.entries() {
            match other.get(&k) {
                Some(ov) if v.hash_compare_guarded(&ov, depth + 1, guard) => {}
                _ => return false,
            }
        }
        true
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.recursive_equal(other, 0)
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dictionary(len={}, id={:#x})", self.len(), self.id())
    }
}

impl FromIterator<(Variant, Variant)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (Variant, Variant)>>(iter: I) -> Self {
        let map: Map = iter
            .into_iter()
            .map(|(k, v)| (VariantKey::new(k), v))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(DictionaryData {
                map,
                read_only: false,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag;

    fn v<T: Into<Variant>>(x: T) -> Variant {
        x.into()
    }

    #[test]
    fn copies_share_the_store() {
        let a = Dictionary::new();
        let b = a.clone();
        a.set(v("k"), v(1));
        assert_eq!(b.get(&v("k")), Some(v(1)));
        let c = a.duplicate(false);
        c.set(v("k"), v(2));
        assert_eq!(a.get(&v("k")), Some(v(1)));
    }

    #[test]
    fn int_and_float_keys_differ() {
        let d = Dictionary::new();
        d.set(v(1), v("int"));
        d.set(v(1.0), v("float"));
        assert_eq!(d.len(), 2);
        d.set(v(f64::NAN), v("a"));
        d.set(v(f64::NAN), v("b"));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn insertion_order_survives_erase() {
        let d: Dictionary = [(v("a"), v(1)), (v("b"), v(2)), (v("c"), v(3))]
            .into_iter()
            .collect();
        assert!(d.erase(&v("b")));
        assert_eq!(d.keys().to_vec(), vec![v("a"), v("c")]);
    }

    #[test]
    fn read_only_rejects_writes() {
        let d = Dictionary::new();
        d.set(v("a"), v(1));
        d.make_read_only();
        let (ok, diags) = diag::capture(|| d.set(v("a"), v(2)));
        assert!(!ok);
        assert_eq!(diags.len(), 1);
        assert_eq!(d.get(&v("a")), Some(v(1)));
        assert!(d.value_ptr(&v("a")).is_null());
        assert!(!d.value_ptr_const(&v("a")).is_null());
    }

    #[test]
    fn value_ptr_inserts_nil() {
        let d = Dictionary::new();
        let p = d.value_ptr(&v("x"));
        assert!(!p.is_null());
        unsafe { *p = v(5) };
        assert_eq!(d.get(&v("x")), Some(v(5)));
        assert!(d.value_ptr_const(&v("missing")).is_null());
    }

    #[test]
    fn merge_respects_overwrite() {
        let a: Dictionary = [(v("k"), v(1))].into_iter().collect();
        let b: Dictionary = [(v("k"), v(2)), (v("n"), v(3))].into_iter().collect();
        a.merge(&b, false);
        assert_eq!(a.get(&v("k")), Some(v(1)));
        assert_eq!(a.get(&v("n")), Some(v(3)));
        a.merge(&b, true);
        assert_eq!(a.get(&v("k")), Some(v(2)));
    }

    #[test]
    fn self_containing_dictionary_terminates() {
        let a = Dictionary::new();
        a.set(v("self"), Variant::Dictionary(a.clone()));
        let b = Dictionary::new();
        b.set(v("self"), Variant::Dictionary(b.clone()));
        let (h, diags) = diag::capture(|| a.hash());
        let (h2, _) = diag::capture(|| a.hash());
        assert_eq!(h, h2);
        assert_eq!(diags.len(), 1);
        let (eq, diags) = diag::capture(|| a == b);
        assert!(eq);
        assert_eq!(diags.len(), 1);
        // Break the cycles so the stores are freed.
        a.clear();
        b.clear();
    }

    #[test]
    fn deep_duplicate_of_branching_cycle_reports_once() {
        let a = Dictionary::new();
        a.set(v("left"), Variant::Dictionary(a.clone()));
        a.set(v("right"), Variant::Dictionary(a.clone()));
        let (copy, diags) = diag::capture(|| a.duplicate(true));
        assert_eq!(diags.len(), 1);
        assert_eq!(copy.len(), 2);
        a.clear();
    }
}
