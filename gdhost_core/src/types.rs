// Small shared ID and handle types.
//
// `InstanceId` names an engine object in the object database; `Rid` is an
// opaque resource handle the engine never dereferences; `ForeignPtr` wraps a
// pointer owned by foreign code (extension instance, binding token, class
// userdata) so it can be stored inside engine structures that must be
// `Send + Sync`.

use std::ffi::c_void;
use std::fmt;

/// Stable numeric identity of an engine object. Zero is the null id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InstanceId(pub u64);

impl InstanceId {
    pub const NULL: InstanceId = InstanceId(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn is_valid(self) -> bool {
        !self.is_null()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque resource id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Rid(pub u64);

impl Rid {
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RID({})", self.0)
    }
}

/// A pointer owned by foreign code. The engine only stores it and hands it
/// back; it never dereferences it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ForeignPtr(pub *mut c_void);

// The engine treats the pointer as an opaque token.
unsafe impl Send for ForeignPtr {}
unsafe impl Sync for ForeignPtr {}

impl ForeignPtr {
    pub const NULL: ForeignPtr = ForeignPtr(std::ptr::null_mut());

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    pub fn get(self) -> *mut c_void {
        self.0
    }
}

impl Default for ForeignPtr {
    fn default() -> Self {
        Self::NULL
    }
}
