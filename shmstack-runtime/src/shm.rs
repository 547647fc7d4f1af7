//! Byte backings for real memory regions.
//!
//! A [`ByteBacking`] is a fixed-size byte buffer. Two kinds exist: an owned
//! `Vec<u8>` and a [`SharedSegment`] mapped from POSIX shared memory.
//!
//! # Safety
//! `SharedSegment` holds a raw mapping that other processes may write at any
//! time. All access goes through bounds-checked copies; no Rust reference into
//! the mapping is ever handed out.

use crate::error::{Result, RuntimeError};
use std::ffi::CString;
use std::io;
use std::ptr::{self, NonNull};
use tracing::debug;

/// Fixed-size byte storage addressed by offset
pub trait ByteBacking: Send {
    /// Size in bytes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// Panics if the range is outside the backing.
    fn read(&self, offset: usize, buf: &mut [u8]);

    /// Copy `buf` into the backing starting at `offset`.
    ///
    /// Panics if the range is outside the backing.
    fn write(&mut self, offset: usize, buf: &[u8]);
}

impl ByteBacking for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn read(&self, offset: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self[offset..offset + buf.len()]);
    }

    fn write(&mut self, offset: usize, buf: &[u8]) {
        self[offset..offset + buf.len()].copy_from_slice(buf);
    }
}

// =============================================================================
// POSIX shared memory
// =============================================================================

/// An existing POSIX shared-memory segment mapped read-write
pub struct SharedSegment {
    name: String,
    ptr: NonNull<u8>,
    len: usize,
}

// The mapping is process-wide; moving the handle between threads is fine.
unsafe impl Send for SharedSegment {}

impl SharedSegment {
    /// Attach to the segment `name`. The size is taken from the segment itself.
    pub fn open(name: &str) -> Result<Self> {
        let path = if name.starts_with('/') {
            name.to_string()
        } else {
            format!("/{}", name)
        };
        let segment_err = |source: io::Error| RuntimeError::Segment {
            name: name.to_string(),
            source,
        };

        let c_path = CString::new(path)
            .map_err(|e| segment_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let fd = unsafe { libc::shm_open(c_path.as_ptr(), libc::O_RDWR, 0o660 as libc::mode_t) };
        if fd < 0 {
            return Err(segment_err(io::Error::last_os_error()));
        }

        let mapped = Self::map_fd(fd);
        unsafe {
            libc::close(fd);
        }
        let (ptr, len) = mapped.map_err(segment_err)?;

        debug!(segment = name, bytes = len, "attached shared memory");
        Ok(Self {
            name: name.to_string(),
            ptr,
            len,
        })
    }

    fn map_fd(fd: libc::c_int) -> io::Result<(NonNull<u8>, usize)> {
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut stat) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let len = stat.st_size as usize;
        if len == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "segment has size 0"));
        }

        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        NonNull::new(addr as *mut u8)
            .map(|ptr| (ptr, len))
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn check_range(&self, offset: usize, count: usize) {
        let in_range = offset.checked_add(count).map_or(false, |end| end <= self.len);
        assert!(
            in_range,
            "segment '{}' access {}..+{} beyond {} bytes",
            self.name, offset, count, self.len
        );
    }
}

impl ByteBacking for SharedSegment {
    fn len(&self) -> usize {
        self.len
    }

    fn read(&self, offset: usize, buf: &mut [u8]) {
        self.check_range(offset, buf.len());
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr().add(offset), buf.as_mut_ptr(), buf.len());
        }
    }

    fn write(&mut self, offset: usize, buf: &[u8]) {
        self.check_range(offset, buf.len());
        unsafe {
            ptr::copy_nonoverlapping(buf.as_ptr(), self.ptr.as_ptr().add(offset), buf.len());
        }
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len);
        }
    }
}

impl std::fmt::Debug for SharedSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSegment")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish()
    }
}

// =============================================================================
// Segment opening
// =============================================================================

/// Produces the backing for a `shm` region declaration
pub trait SegmentOpener {
    fn open(&self, name: &str) -> Result<Box<dyn ByteBacking>>;
}

/// Opens real POSIX shared-memory segments
#[derive(Debug, Clone, Copy, Default)]
pub struct ShmOpener;

impl SegmentOpener for ShmOpener {
    fn open(&self, name: &str) -> Result<Box<dyn ByteBacking>> {
        Ok(Box::new(SharedSegment::open(name)?))
    }
}

impl ByteBacking for Box<dyn ByteBacking> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: usize, buf: &[u8]) {
        (**self).write(offset, buf)
    }
}
