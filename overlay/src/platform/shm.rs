//! Anonymous shared memory for handing frames to the display server

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::ptr::NonNull;

use rustix::fs::{MemfdFlags, ftruncate, memfd_create};
use rustix::mm::{MapFlags, ProtFlags, mmap, munmap};

use super::PlatformError;

/// A memfd mapped read/write into this process, unmapped on drop
pub struct SharedMemory {
    fd: OwnedFd,
    ptr: NonNull<u8>,
    len: usize,
}

impl SharedMemory {
    /// Allocate a zeroed segment of `len` bytes
    pub fn new(name: &std::ffi::CStr, len: usize) -> Result<Self, PlatformError> {
        let fail = |what: &str, e: rustix::io::Errno| {
            PlatformError::BufferError(format!("{} failed: {}", what, e))
        };

        let fd = memfd_create(name, MemfdFlags::CLOEXEC).map_err(|e| fail("memfd_create", e))?;
        ftruncate(&fd, len as u64).map_err(|e| fail("ftruncate", e))?;

        // SAFETY: fresh shared mapping of a memfd we own, exactly `len` bytes long
        let raw = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                fd.as_fd(),
                0,
            )
        }
        .map_err(|e| fail("mmap", e))?;

        let ptr = NonNull::new(raw.cast::<u8>())
            .ok_or_else(|| PlatformError::BufferError("mmap returned null".to_string()))?;
        Ok(Self { fd, ptr, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    /// Duplicate the descriptor for APIs that take ownership of it
    pub fn clone_fd(&self) -> Result<OwnedFd, PlatformError> {
        self.fd
            .try_clone()
            .map_err(|e| PlatformError::BufferError(format!("dup failed: {}", e)))
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the mapping is live and `len` bytes long for as long as self is
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for SharedMemory {
    fn drop(&mut self) {
        // SAFETY: nothing borrows the mapping once self is being dropped
        if let Err(e) = unsafe { munmap(self.ptr.as_ptr().cast(), self.len) } {
            tracing::warn!(error = %e, "munmap failed");
        }
    }
}
