use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use crate::v4l2;

/// Memory used for buffer exchange with the driver
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    Mmap = 1,
    UserPtr = 2,
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Memory::Mmap => write!(f, "memory-mapped"),
            Memory::UserPtr => write!(f, "user pointer"),
        }
    }
}

/// Memory-mapped region
///
/// The backing memory is owned by the kernel driver and merely mapped into
/// the process address space; only a transient view of the bytes is granted
/// between dequeue and re-queue. The destructor unmaps the region.
pub struct Mmap {
    ptr: *mut u8,
    len: usize,
}

impl Mmap {
    /// Wraps a region previously returned by mmap(2).
    ///
    /// # Safety
    ///
    /// `ptr` must be a mapping of exactly `len` bytes that stays valid for
    /// the lifetime of the returned value, which takes over unmapping.
    pub unsafe fn new(ptr: *mut u8, len: usize) -> Self {
        Mmap { ptr, len }
    }
}

// The mapping is exclusively owned and only ever viewed by one thread at a
// time; the raw pointer alone is what inhibits the auto traits.
unsafe impl Send for Mmap {}

impl Drop for Mmap {
    fn drop(&mut self) {
        unsafe {
            // ignore errors
            let _ = v4l2::munmap(self.ptr as *mut core::ffi::c_void, self.len);
        }
    }
}

impl Deref for Mmap {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl DerefMut for Mmap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

/// Userspace memory
///
/// This memory type can be used to directly make the camera hardware write
/// its data into the user-provided buffer (which lives in userspace).
pub struct UserPtr(pub Vec<u8>);

impl Deref for UserPtr {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for UserPtr {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
