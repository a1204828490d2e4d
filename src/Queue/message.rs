// A single queued message. Owns its storage from enqueue until it is read or drained.

use crate::Core::error::QueueError;

/// Byte appended after every payload when it is handed back to a reader.
pub const TERMINATOR: u8 = 0;

/// An immutable payload plus its trailing terminator.
///
/// The buffer is allocated in one fallible step, so a `Message` either exists
/// fully initialized or not at all.
pub struct Message {
    /// `payload` followed by `TERMINATOR`. Length is always `len() + 1`.
    framed: Box<[u8]>,
}

impl Message {
    /// Copy `payload` into freshly allocated storage.
    ///
    /// Fails with `AllocationFailed` instead of aborting when the allocator
    /// cannot satisfy the request.
    pub fn try_new(payload: &[u8]) -> Result<Self, QueueError> {
        let framed_len = payload
            .len()
            .checked_add(1)
            .ok_or(QueueError::AllocationFailed { len: payload.len() })?;

        let mut storage: Vec<u8> = Vec::new();
        storage
            .try_reserve_exact(framed_len)
            .map_err(|_| QueueError::AllocationFailed { len: framed_len })?;
        storage.extend_from_slice(payload);
        storage.push(TERMINATOR);

        Ok(Self {
            framed: storage.into_boxed_slice(),
        })
    }

    /// Payload length, terminator excluded. This is what counts against quota.
    #[inline]
    pub fn len(&self) -> usize {
        self.framed.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of what a reader receives.
    #[inline]
    pub fn framed_len(&self) -> usize {
        self.framed.len()
    }

    pub fn payload(&self) -> &[u8] {
        &self.framed[..self.len()]
    }

    /// Payload plus terminator, exactly as copied out to a reader.
    pub fn framed(&self) -> &[u8] {
        &self.framed
    }

    pub fn into_framed(self) -> Vec<u8> {
        self.framed.into_vec()
    }
}
