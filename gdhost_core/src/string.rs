// Engine string types: `GString`, `StringName`, `NodePath`.
//
// `GString` stores UTF-32 code units behind an `Arc` with a trailing NUL, so
// the native interface can hand out a pointer to element `len` (the
// terminator) and foreign code sees a C-style `char32_t` string. Copies share
// the buffer; mutation goes through `Arc::make_mut` (copy-on-write). An empty
// string owns no buffer at all.
//
// `StringName` is an interned name: construction looks the text up in a
// global table, after which equality and hashing are pointer-cheap. Interned
// entries are never freed.
//
// `NodePath` is a parsed `a/b/c:sub:sub` path. It only exists here because it
// is a Variant kind; the scene tree that would resolve it is out of scope.
//
// Encodings: Latin-1 maps each byte to a code point and, on the way out,
// replaces code points above 0xFF with '?'. UTF-8 and UTF-16 decode lossily
// (invalid sequences become U+FFFD).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::hashing::hash_djb2_chars;

// ---------------------------------------------------------------------------
// GString
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct GString {
    /// Code units followed by a single NUL. `None` for the empty string.
    buffer: Option<Arc<Vec<u32>>>,
}

impl GString {
    pub const fn new() -> Self {
        Self { buffer: None }
    }

    /// Build from code units, stopping at the first NUL.
    pub fn from_utf32(units: &[u32]) -> Self {
        let end = units.iter().position(|&c| c == 0).unwrap_or(units.len());
        if end == 0 {
            return Self::new();
        }
        let mut buf = Vec::with_capacity(end + 1);
        buf.extend_from_slice(&units[..end]);
        buf.push(0);
        Self {
            buffer: Some(Arc::new(buf)),
        }
    }

    pub fn from_latin1(bytes: &[u8]) -> Self {
        let units: Vec<u32> = bytes.iter().map(|&b| u32::from(b)).collect();
        Self::from_utf32(&units)
    }

    pub fn from_utf8(bytes: &[u8]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = String::from_utf8_lossy(&bytes[..end]);
        Self::from(text.as_ref())
    }

    pub fn from_utf16(units: &[u16]) -> Self {
        let end = units.iter().position(|&c| c == 0).unwrap_or(units.len());
        let decoded: Vec<u32> = char::decode_utf16(units[..end].iter().copied())
            .map(|r| u32::from(r.unwrap_or(char::REPLACEMENT_CHARACTER)))
            .collect();
        Self::from_utf32(&decoded)
    }

    pub fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.len() - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Code units without the terminator.
    pub fn units(&self) -> &[u32] {
        match &self.buffer {
            Some(b) => &b[..b.len() - 1],
            None => &[],
        }
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.units()
            .iter()
            .map(|&u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    pub fn to_latin1(&self) -> Vec<u8> {
        self.units()
            .iter()
            .map(|&u| u8::try_from(u).unwrap_or(b'?'))
            .collect()
    }

    pub fn to_utf8(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    pub fn to_utf16(&self) -> Vec<u16> {
        self.to_string().encode_utf16().collect()
    }

    pub fn to_utf32(&self) -> Vec<u32> {
        self.units().to_vec()
    }

    /// Pointer to unit `index`; `index == len` yields the terminator. Null
    /// for out-of-range indices and for the empty string.
    pub fn unit_ptr(&self, index: usize) -> *const u32 {
        match &self.buffer {
            Some(b) if index < b.len() => &b[index],
            _ => std::ptr::null(),
        }
    }

    /// Mutable pointer to unit `index`, unsharing the buffer first.
    pub fn unit_ptr_mut(&mut self, index: usize) -> *mut u32 {
        match &mut self.buffer {
            Some(b) if index < b.len() => &mut Arc::make_mut(b)[index],
            _ => std::ptr::null_mut(),
        }
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.units().get(index).copied()
    }

    pub fn set(&mut self, index: usize, unit: u32) -> bool {
        if index >= self.len() || unit == 0 {
            return false;
        }
        if let Some(b) = &mut self.buffer {
            Arc::make_mut(b)[index] = unit;
        }
        true
    }

    pub fn hash_value(&self) -> u32 {
        hash_djb2_chars(self.units().iter().copied())
    }

    pub fn ptr_eq(&self, other: &GString) -> bool {
        match (&self.buffer, &other.buffer) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    // -- text operations used by the builtin method table --

    pub fn substr(&self, from: usize, len: Option<usize>) -> GString {
        let units = self.units();
        let from = from.min(units.len());
        let end = len.map_or(units.len(), |l| (from + l).min(units.len()));
        GString::from_utf32(&units[from..end])
    }

    pub fn find(&self, what: &GString, from: usize) -> Option<usize> {
        let (hay, needle) = (self.units(), what.units());
        if needle.is_empty() {
            return None;
        }
        if needle.len() > hay.len() {
            return None;
        }
        (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()] == *needle)
    }

    pub fn contains(&self, what: &GString) -> bool {
        self.find(what, 0).is_some()
    }

    pub fn begins_with(&self, prefix: &GString) -> bool {
        self.units().starts_with(prefix.units())
    }

    pub fn ends_with(&self, suffix: &GString) -> bool {
        self.units().ends_with(suffix.units())
    }

    pub fn to_upper(&self) -> GString {
        GString::from(self.to_string().to_uppercase().as_str())
    }

    pub fn to_lower(&self) -> GString {
        GString::from(self.to_string().to_lowercase().as_str())
    }

    pub fn strip_edges(&self) -> GString {
        GString::from(self.to_string().trim())
    }

    pub fn replace(&self, what: &GString, with: &GString) -> GString {
        if what.is_empty() {
            return self.clone();
        }
        GString::from(
            self.to_string()
                .replace(&what.to_string(), &with.to_string())
                .as_str(),
        )
    }

    pub fn repeat(&self, count: usize) -> GString {
        GString::from(self.to_string().repeat(count).as_str())
    }

    pub fn split(&self, delimiter: &GString, allow_empty: bool) -> Vec<GString> {
        let text = self.to_string();
        let delim = delimiter.to_string();
        let parts: Vec<&str> = if delim.is_empty() {
            vec![text.as_str()]
        } else {
            text.split(delim.as_str()).collect()
        };
        parts
            .into_iter()
            .filter(|p| allow_empty || !p.is_empty())
            .map(GString::from)
            .collect()
    }

    pub fn is_valid_identifier(&self) -> bool {
        let units = self.units();
        if units.is_empty() {
            return false;
        }
        units.iter().enumerate().all(|(i, &u)| {
            let c = char::from_u32(u).unwrap_or('\0');
            if i == 0 && c.is_ascii_digit() {
                return false;
            }
            c.is_ascii_alphanumeric() || c == '_'
        })
    }

    pub fn is_valid_int(&self) -> bool {
        self.to_string().trim().parse::<i64>().is_ok()
    }

    pub fn is_valid_float(&self) -> bool {
        self.to_string().trim().parse::<f64>().is_ok()
    }

    /// Leading integer prefix, 0 when none. Saturates on overflow.
    pub fn to_int(&self) -> i64 {
        let text = self.to_string();
        let trimmed = text.trim();
        let mut value: i64 = 0;
        let mut negative = false;
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '-' if i == 0 => negative = true,
                '+' if i == 0 => {}
                '0'..='9' => {
                    let digit = i64::from(c as u8 - b'0');
                    value = value.saturating_mul(10).saturating_add(digit);
                }
                _ => break,
            }
        }
        if negative { -value } else { value }
    }

    pub fn to_float(&self) -> f64 {
        let text = self.to_string();
        let trimmed = text.trim();
        if let Ok(v) = trimmed.parse::<f64>() {
            return v;
        }
        let end = trimmed
            .char_indices()
            .take_while(|&(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+')))
            .count();
        trimmed[..end].parse::<f64>().unwrap_or(0.0)
    }
}

impl From<&str> for GString {
    fn from(s: &str) -> Self {
        let units: Vec<u32> = s.chars().map(u32::from).collect();
        Self::from_utf32(&units)
    }
}

impl From<String> for GString {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&StringName> for GString {
    fn from(s: &StringName) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: String = self.chars().collect();
        f.write_str(&s)
    }
}

impl fmt::Debug for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

impl PartialEq for GString {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.units() == other.units()
    }
}

impl Eq for GString {}

impl PartialOrd for GString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.units().cmp(other.units())
    }
}

impl Hash for GString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash_value());
    }
}

impl std::ops::Add<&GString> for &GString {
    type Output = GString;
    fn add(self, rhs: &GString) -> GString {
        let mut units = self.units().to_vec();
        units.extend_from_slice(rhs.units());
        GString::from_utf32(&units)
    }
}

// ---------------------------------------------------------------------------
// StringName
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct NameData {
    text: Box<str>,
    hash: u32,
}

static NAME_TABLE: LazyLock<Mutex<FxHashMap<Box<str>, Arc<NameData>>>> =
    LazyLock::new(|| Mutex::new(FxHashMap::default()));

/// Interned name. Cheap to clone, compare and hash.
#[derive(Clone, Default)]
pub struct StringName(Option<Arc<NameData>>);

impl StringName {
    pub fn new(text: &str) -> Self {
        if text.is_empty() {
            return Self(None);
        }
        let mut table = NAME_TABLE.lock();
        if let Some(existing) = table.get(text) {
            return Self(Some(existing.clone()));
        }
        let data = Arc::new(NameData {
            text: text.into(),
            hash: hash_djb2_chars(text.chars().map(u32::from)),
        });
        table.insert(text.into(), data.clone());
        Self(Some(data))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref().map_or("", |d| &d.text)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Same value as the hash of the equivalent `GString`.
    pub fn hash_value(&self) -> u32 {
        self.0.as_ref().map_or(5381, |d| d.hash)
    }
}

impl From<&str> for StringName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&GString> for StringName {
    fn from(s: &GString) -> Self {
        Self::new(&s.to_string())
    }
}

impl PartialEq for StringName {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for StringName {}

impl PartialEq<str> for StringName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for StringName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for StringName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash_value());
    }
}

impl PartialOrd for StringName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StringName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Display for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&{:?}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NodePath
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Hash)]
struct NodePathData {
    absolute: bool,
    names: Vec<StringName>,
    subnames: Vec<StringName>,
}

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Option<Arc<NodePathData>>);

impl NodePath {
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self(None);
        }
        let absolute = path.starts_with('/');
        let body = path.trim_start_matches('/');
        let (names_part, sub_part) = match body.find(':') {
            Some(i) => (&body[..i], Some(&body[i + 1..])),
            None => (body, None),
        };
        let names = names_part
            .split('/')
            .filter(|s| !s.is_empty())
            .map(StringName::new)
            .collect();
        let subnames = sub_part
            .map(|s| s.split(':').filter(|p| !p.is_empty()).map(StringName::new).collect())
            .unwrap_or_default();
        Self(Some(Arc::new(NodePathData {
            absolute,
            names,
            subnames,
        })))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_absolute(&self) -> bool {
        self.0.as_ref().is_some_and(|d| d.absolute)
    }

    pub fn name_count(&self) -> usize {
        self.0.as_ref().map_or(0, |d| d.names.len())
    }

    pub fn name(&self, index: usize) -> Option<StringName> {
        self.0.as_ref().and_then(|d| d.names.get(index).cloned())
    }

    pub fn subname_count(&self) -> usize {
        self.0.as_ref().map_or(0, |d| d.subnames.len())
    }

    pub fn subname(&self, index: usize) -> Option<StringName> {
        self.0.as_ref().and_then(|d| d.subnames.get(index).cloned())
    }

    pub fn concatenated_names(&self) -> StringName {
        let Some(d) = &self.0 else {
            return StringName::default();
        };
        let joined: Vec<&str> = d.names.iter().map(StringName::as_str).collect();
        let prefix = if d.absolute { "/" } else { "" };
        StringName::new(&format!("{prefix}{}", joined.join("/")))
    }

    pub fn hash_value(&self) -> u32 {
        hash_djb2_chars(self.to_string().chars().map(u32::from))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(d) = &self.0 else {
            return Ok(());
        };
        if d.absolute {
            f.write_str("/")?;
        }
        let names: Vec<&str> = d.names.iter().map(StringName::as_str).collect();
        f.write_str(&names.join("/"))?;
        for sub in &d.subnames {
            write!(f, ":{sub}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings_round_trip() {
        let s = GString::from("héllo €");
        assert_eq!(s.len(), 7);
        assert_eq!(GString::from_utf8(&s.to_utf8()), s);
        assert_eq!(GString::from_utf16(&s.to_utf16()), s);
        assert_eq!(GString::from_utf32(&s.to_utf32()), s);
        assert_eq!(s.to_latin1(), b"h\xe9llo ?".to_vec());
    }

    #[test]
    fn construction_stops_at_nul() {
        let s = GString::from_utf8(b"ab\0cd");
        assert_eq!(s.to_string(), "ab");
        assert!(GString::from_utf32(&[0, 65]).is_empty());
    }

    #[test]
    fn terminator_is_addressable() {
        let s = GString::from("ab");
        let p = s.unit_ptr(2);
        assert!(!p.is_null());
        assert_eq!(unsafe { *p }, 0);
        assert!(s.unit_ptr(3).is_null());
        assert!(GString::new().unit_ptr(0).is_null());
    }

    #[test]
    fn copy_on_write() {
        let a = GString::from("abc");
        let mut b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(b.set(0, u32::from('x')));
        assert_eq!(a.to_string(), "abc");
        assert_eq!(b.to_string(), "xbc");
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn string_name_interning() {
        let a = StringName::new("value");
        let b = StringName::from("value");
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), GString::from("value").hash_value());
        assert_ne!(a, StringName::new("other"));
        assert!(StringName::new("").is_empty());
    }

    #[test]
    fn identifiers() {
        assert!(GString::from("Foo_1").is_valid_identifier());
        assert!(!GString::from("1Foo").is_valid_identifier());
        assert!(!GString::from("Foo Bar").is_valid_identifier());
        assert!(!GString::new().is_valid_identifier());
    }

    #[test]
    fn numeric_parsing() {
        assert_eq!(GString::from("42abc").to_int(), 42);
        assert_eq!(GString::from("-7").to_int(), -7);
        assert_eq!(GString::from("2.5x").to_float(), 2.5);
        assert!(GString::from("12").is_valid_int());
        assert!(!GString::from("1.2").is_valid_int());
    }

    #[test]
    fn node_path_parsing() {
        let p = NodePath::parse("/root/Main:position:x");
        assert!(p.is_absolute());
        assert_eq!(p.name_count(), 2);
        assert_eq!(p.subname_count(), 2);
        assert_eq!(p.to_string(), "/root/Main:position:x");
        assert_eq!(p.concatenated_names().as_str(), "/root/Main");
    }

    #[test]
    fn text_operations() {
        let s = GString::from("Hello World");
        assert_eq!(s.find(&GString::from("World"), 0), Some(6));
        assert_eq!(s.substr(6, Some(3)).to_string(), "Wor");
        assert!(s.begins_with(&GString::from("Hell")));
        assert_eq!(s.split(&GString::from(" "), false).len(), 2);
    }
}
