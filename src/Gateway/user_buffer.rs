// Copy contract between the gateway and caller-owned memory.

use crate::Core::error::QueueError;

/// Caller memory a write copies from.
pub trait UserSource {
    /// Fill `dst` from the first `dst.len()` bytes of the caller buffer.
    /// Fails with `CopyFault` if those bytes cannot be read.
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), QueueError>;
}

/// Caller memory a read copies into.
///
/// Under `ReadPolicy::Lossless` the queue lock is released before
/// `copy_to_user` runs, so an implementation may call back into the device.
/// The message being delivered is hidden from such nested reads until the
/// copy finishes.
pub trait UserSink {
    /// Bytes the caller says it can take.
    fn capacity(&self) -> usize;

    /// Write `src` to the start of the caller buffer.
    /// Fails with `CopyFault` if the destination cannot be written.
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), QueueError>;
}

impl UserSource for [u8] {
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), QueueError> {
        let src = self.get(..dst.len()).ok_or(QueueError::CopyFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserSource for Vec<u8> {
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), QueueError> {
        self.as_slice().copy_from_user(dst)
    }
}

impl UserSink for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), QueueError> {
        let dst = self.get_mut(..src.len()).ok_or(QueueError::CopyFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserSink for Vec<u8> {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), QueueError> {
        self.as_mut_slice().copy_to_user(src)
    }
}

/// A raw caller buffer handed across the C ABI.
///
/// A null pointer is treated as unreachable memory and yields `CopyFault`.
pub struct RawUserBuffer {
    ptr: *mut u8,
    len: usize,
}

impl RawUserBuffer {
    /// # Safety
    /// If `ptr` is non-null it must be valid for reads and writes of `len` bytes
    /// for the lifetime of this value.
    pub unsafe fn new(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }

    /// # Safety
    /// If `ptr` is non-null it must be valid for reads of `len` bytes for the
    /// lifetime of this value. The buffer must only be used as a `UserSource`.
    pub unsafe fn from_const(ptr: *const u8, len: usize) -> Self {
        Self {
            ptr: ptr as *mut u8,
            len,
        }
    }
}

impl UserSource for RawUserBuffer {
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), QueueError> {
        if self.ptr.is_null() || dst.len() > self.len {
            return Err(QueueError::CopyFault);
        }
        // Safety: non-null and in bounds per the constructor contract
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }
}

impl UserSink for RawUserBuffer {
    fn capacity(&self) -> usize {
        self.len
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), QueueError> {
        if self.ptr.is_null() || src.len() > self.len {
            return Err(QueueError::CopyFault);
        }
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr, src.len());
        }
        Ok(())
    }
}
