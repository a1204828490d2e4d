use std::fmt;
use std::sync::atomic::Ordering;

use crate::Gateway::MessageDevice;
use crate::Queue::QueueStore;

/// Debug function for QueueStore
///
/// Shows limits, ordering and occupancy. Payload bytes are never printed.
pub fn debug_queue_store(store: &QueueStore, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (queued, outstanding, sessions) = {
        let inner = store.inner.lock();
        (inner.messages.len(), inner.outstanding_bytes, inner.open_sessions)
    };
    f.debug_struct("QueueStore")
        .field("limits", &store.limits())
        .field("ordering", &store.ordering())
        .field("queued_messages", &queued)
        .field("outstanding_bytes", &outstanding)
        .field("open_sessions", &sessions)
        .finish()
}

/// Debug function for MessageDevice
///
/// Shows:
/// - Read policy
/// - Underlying QueueStore
/// - Lifetime counters
pub fn debug_message_device(device: &MessageDevice, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MessageDevice")
        .field("read_policy", &device.read_policy)
        .field("store", &device.store)
        .field("written", &device.counters.written.load(Ordering::Relaxed))
        .field("read", &device.counters.read.load(Ordering::Relaxed))
        .field("lost", &device.counters.lost.load(Ordering::Relaxed))
        .finish()
}
