// The access gateway: open/close/read/write entry points over a QueueStore.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;
use log::{debug, info, trace, warn};

use super::builder::DeviceConfig;
use super::user_buffer::{UserSink, UserSource};
use crate::Core::error::QueueError;
use crate::Core::limits::ReadPolicy;
use crate::Queue::QueueStore;

/// Lifetime counters, readable without taking the queue lock.
#[derive(Default)]
pub(crate) struct DeviceCounters {
    pub(crate) written: CachePadded<AtomicU64>,
    pub(crate) read: CachePadded<AtomicU64>,
    pub(crate) lost: CachePadded<AtomicU64>,
}

/// Point-in-time view of a device, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStats {
    pub open_sessions: usize,
    pub queued_messages: usize,
    pub outstanding_bytes: usize,
    pub messages_written: u64,
    pub messages_read: u64,
    /// Messages popped but never delivered because the copy-out faulted.
    pub messages_lost: u64,
}

/// A message channel with pipe-like read/write semantics and quota enforcement.
///
/// The device is an explicitly owned context: the hosting shell creates it at
/// init and calls [`MessageDevice::shutdown`] (or drops it) at teardown.
/// Every operation returns immediately; nothing ever waits for data or space.
pub struct MessageDevice {
    pub(crate) store: QueueStore,
    pub(crate) read_policy: ReadPolicy,
    pub(crate) counters: DeviceCounters,
}

impl MessageDevice {
    pub fn new(config: DeviceConfig) -> Self {
        info!(
            "message device ready: max_message_bytes={}, max_aggregate_bytes={}, ordering={:?}, read_policy={:?}",
            config.limits.max_message_bytes,
            config.limits.max_aggregate_bytes,
            config.ordering,
            config.read_policy
        );
        Self {
            store: QueueStore::new(config.limits, config.ordering),
            read_policy: config.read_policy,
            counters: DeviceCounters::default(),
        }
    }

    /// Register a caller holding the device open. Never fails.
    pub fn on_open(&self) {
        let sessions = self.store.session_opened();
        trace!("session opened ({} open)", sessions);
    }

    /// Release a session. An unmatched close leaves the counter at zero.
    pub fn on_close(&self) {
        match self.store.session_closed() {
            Some(sessions) => trace!("session closed ({} open)", sessions),
            None => warn!("close without a matching open; session count stays at 0"),
        }
    }

    /// Queue a message from caller memory.
    ///
    /// `declared_length` counts the caller's trailing terminator byte, so the
    /// stored payload is `declared_length - 1` bytes. A declared length of 1
    /// stores an empty payload that costs no quota bytes; set
    /// `DeviceBuilder::with_max_messages` to bound those. Both limits are checked
    /// before anything is copied in. On success the declared length is
    /// returned as the number of bytes consumed.
    pub fn on_write<S>(&self, source: &S, declared_length: usize) -> Result<usize, QueueError>
    where
        S: UserSource + ?Sized,
    {
        let payload_len = declared_length
            .checked_sub(1)
            .ok_or(QueueError::InvalidLength)?;
        self.store.check_admission(payload_len)?;

        let mut staging: Vec<u8> = Vec::new();
        staging
            .try_reserve_exact(declared_length)
            .map_err(|_| QueueError::AllocationFailed {
                len: declared_length,
            })?;
        staging.resize(declared_length, 0);
        source.copy_from_user(&mut staging)?;

        self.store.enqueue(&staging[..payload_len])?;
        self.counters.written.fetch_add(1, Ordering::Relaxed);
        debug!("queued {} byte message", payload_len);
        Ok(declared_length)
    }

    /// Deliver the next message into caller memory.
    ///
    /// The caller receives the payload followed by one terminator byte, and the
    /// returned count includes that byte. Fails with `Empty` immediately when
    /// nothing is queued, and with `BufferTooSmall` (message kept) when the
    /// sink cannot hold the framed message.
    ///
    /// The sink runs without the queue lock held and may use this device,
    /// including reading or writing other messages.
    pub fn on_read<S>(&self, sink: &mut S) -> Result<usize, QueueError>
    where
        S: UserSink + ?Sized,
    {
        let capacity = sink.capacity();
        let delivered = match self.read_policy {
            ReadPolicy::Lossless => self.store.dequeue_with(|framed| {
                if framed.len() > capacity {
                    return Err(QueueError::BufferTooSmall {
                        needed: framed.len(),
                        capacity,
                    });
                }
                sink.copy_to_user(framed)?;
                Ok(framed.len())
            })?,
            ReadPolicy::PopThenCopy => {
                let framed = self.store.dequeue_within(capacity)?;
                if let Err(e) = sink.copy_to_user(&framed) {
                    self.counters.lost.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "dropped {} byte message: copy to caller failed after dequeue",
                        framed.len() - 1
                    );
                    return Err(e);
                }
                framed.len()
            }
        };

        self.counters.read.fetch_add(1, Ordering::Relaxed);
        debug!("delivered {} byte message", delivered - 1);
        Ok(delivered)
    }

    /// Read the next message into a fresh buffer of at most `capacity` bytes.
    pub fn read_to_vec(&self, capacity: usize) -> Result<Vec<u8>, QueueError> {
        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| QueueError::AllocationFailed { len: capacity })?;
        buf.resize(capacity, 0);
        let n = self.on_read(buf.as_mut_slice())?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Write `payload` as one message. The terminator is implied.
    pub fn write_message(&self, payload: &[u8]) -> Result<usize, QueueError> {
        let payload_len = payload.len();
        self.store.enqueue(payload)?;
        self.counters.written.fetch_add(1, Ordering::Relaxed);
        debug!("queued {} byte message", payload_len);
        Ok(payload_len + 1)
    }

    pub fn stats(&self) -> DeviceStats {
        let (open_sessions, queued_messages, outstanding_bytes) = {
            let inner = self.store.inner.lock();
            (
                inner.open_sessions,
                inner.messages.len(),
                inner.outstanding_bytes,
            )
        };
        DeviceStats {
            open_sessions,
            queued_messages,
            outstanding_bytes,
            messages_written: self.counters.written.load(Ordering::Relaxed),
            messages_read: self.counters.read.load(Ordering::Relaxed),
            messages_lost: self.counters.lost.load(Ordering::Relaxed),
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    /// Teardown hook. Frees every queued message and returns how many were discarded.
    pub fn shutdown(self) -> usize {
        let drained = self.store.drain();
        info!("message device shut down, discarded {} queued messages", drained);
        drained
    }
}

impl Default for MessageDevice {
    fn default() -> Self {
        Self::new(DeviceConfig::default())
    }
}

impl Drop for MessageDevice {
    fn drop(&mut self) {
        let drained = self.store.drain();
        if drained > 0 {
            info!("message device dropped with {} queued messages", drained);
        }
    }
}
