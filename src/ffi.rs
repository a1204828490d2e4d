use crate::Core::error::QueueError;
use crate::Gateway::{DeviceBuilder, MessageDevice, RawUserBuffer};
use std::ptr;

/// Handle to a device instance (opaque pointer)
pub struct DeviceHandle {
    inner: MessageDevice,
}

const EINVAL_RET: isize = -(libc::EINVAL as isize);

// -----------------------------------------------------------------------------
// Lifecycle
// -----------------------------------------------------------------------------

/// Create a new device.
///
/// # Arguments
/// * `max_message_bytes` - Per-message limit, or 0 for the default (6KB).
/// * `max_aggregate_bytes` - Outstanding-bytes quota, or 0 for the default (4MB).
///
/// # Returns
/// * Pointer to `DeviceHandle`, or NULL if the limits are inconsistent.
#[no_mangle]
pub extern "C" fn msgdev_new(max_message_bytes: usize, max_aggregate_bytes: usize) -> *mut DeviceHandle {
    let mut builder = DeviceBuilder::new();
    if max_message_bytes != 0 {
        builder = builder.with_max_message_bytes(max_message_bytes);
    }
    if max_aggregate_bytes != 0 {
        builder = builder.with_max_aggregate_bytes(max_aggregate_bytes);
    }

    match builder.build() {
        Ok(device) => Box::into_raw(Box::new(DeviceHandle { inner: device })),
        Err(e) => {
            log::error!("msgdev_new: {}", e);
            ptr::null_mut()
        }
    }
}

/// Free a device handle, discarding any queued messages.
#[no_mangle]
pub extern "C" fn msgdev_free(handle: *mut DeviceHandle) {
    if !handle.is_null() {
        unsafe {
            let handle = *Box::from_raw(handle);
            handle.inner.shutdown();
        }
    }
}

/// Register an open session. Returns 0, or -EINVAL for a NULL handle.
#[no_mangle]
pub extern "C" fn msgdev_open(handle: *mut DeviceHandle) -> i32 {
    if handle.is_null() {
        return -libc::EINVAL;
    }
    unsafe { (*handle).inner.on_open() };
    0
}

/// Release an open session. Returns 0, or -EINVAL for a NULL handle.
#[no_mangle]
pub extern "C" fn msgdev_close(handle: *mut DeviceHandle) -> i32 {
    if handle.is_null() {
        return -libc::EINVAL;
    }
    unsafe { (*handle).inner.on_close() };
    0
}

// -----------------------------------------------------------------------------
// Data path
// -----------------------------------------------------------------------------

/// Write one message.
///
/// # Arguments
/// * `handle` - Pointer to `DeviceHandle`.
/// * `data` - Caller buffer; the last of its `len` bytes is the terminator.
/// * `len` - Declared length, terminator included.
///
/// # Returns
/// * `len` on success.
/// * `-EINVAL` if the message exceeds the per-message limit.
/// * `-EAGAIN` if the outstanding-bytes quota would be exceeded.
/// * `-ENOMEM` / `-EFAULT` on allocation or caller-memory failure.
#[no_mangle]
pub extern "C" fn msgdev_write(handle: *mut DeviceHandle, data: *const u8, len: usize) -> isize {
    if handle.is_null() {
        return EINVAL_RET;
    }

    let device = unsafe { &(*handle).inner };
    let source = unsafe { RawUserBuffer::from_const(data, len) };
    to_ret(device.on_write(&source, len))
}

/// Read one message.
///
/// # Arguments
/// * `handle` - Pointer to `DeviceHandle`.
/// * `buf` - Destination buffer.
/// * `capacity` - Size of `buf` in bytes.
///
/// # Returns
/// * Bytes written (payload plus terminator) on success.
/// * `-EAGAIN` if no message is queued.
/// * `-EINVAL` if `capacity` cannot hold the next message.
/// * `-EFAULT` if `buf` is NULL.
#[no_mangle]
pub extern "C" fn msgdev_read(handle: *mut DeviceHandle, buf: *mut u8, capacity: usize) -> isize {
    if handle.is_null() {
        return EINVAL_RET;
    }

    let device = unsafe { &(*handle).inner };
    let mut sink = unsafe { RawUserBuffer::new(buf, capacity) };
    to_ret(device.on_read(&mut sink))
}

fn to_ret(res: Result<usize, QueueError>) -> isize {
    match res {
        Ok(n) => n as isize,
        Err(e) => e.to_errno(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_abi_round_trip() {
        let handle = msgdev_new(10, 100);
        assert!(!handle.is_null());
        assert_eq!(msgdev_open(handle), 0);

        let msg = b"hello\0";
        assert_eq!(msgdev_write(handle, msg.as_ptr(), msg.len()), 6);

        let mut out = [0u8; 32];
        assert_eq!(msgdev_read(handle, out.as_mut_ptr(), out.len()), 6);
        assert_eq!(&out[..6], b"hello\0");
        assert_eq!(
            msgdev_read(handle, out.as_mut_ptr(), out.len()),
            -(libc::EAGAIN as isize)
        );

        assert_eq!(msgdev_close(handle), 0);
        msgdev_free(handle);
    }

    #[test]
    fn c_abi_error_codes() {
        let handle = msgdev_new(4, 8);
        let big = [b'a'; 6];
        assert_eq!(
            msgdev_write(handle, big.as_ptr(), big.len()),
            -(libc::EINVAL as isize)
        );
        assert_eq!(msgdev_write(handle, ptr::null(), 3), -(libc::EFAULT as isize));

        let four = b"abcd\0";
        assert_eq!(msgdev_write(handle, four.as_ptr(), 5), 5);
        assert_eq!(msgdev_write(handle, four.as_ptr(), 5), 5);
        assert_eq!(
            msgdev_write(handle, four.as_ptr(), 5),
            -(libc::EAGAIN as isize)
        );

        assert_eq!(
            msgdev_read(handle, ptr::null_mut(), 16),
            -(libc::EFAULT as isize)
        );
        msgdev_free(handle);
    }

    #[test]
    fn c_abi_rejects_null_handle_and_bad_limits() {
        assert!(msgdev_new(16, 8).is_null());
        assert_eq!(msgdev_open(ptr::null_mut()), -libc::EINVAL);
        assert_eq!(msgdev_write(ptr::null_mut(), ptr::null(), 0), EINVAL_RET);
        msgdev_free(ptr::null_mut());
    }
}
