// The quota-enforcing ordered message store.
//
// One parking_lot mutex guards the message sequence, the outstanding byte
// count, and the open-session counter. Every check-then-act sequence runs
// under a single guard, so concurrent writers can never jointly overrun the
// aggregate quota. No caller code ever runs while that guard is held.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::message::Message;
use crate::Core::error::QueueError;
use crate::Core::limits::{OrderingPolicy, QueueLimits};

pub(crate) struct Queued {
    id: u64,
    /// Claimed by a reader that is copying it out. Invisible to other readers.
    in_flight: bool,
    msg: Message,
}

pub(crate) struct StoreInner {
    pub(crate) messages: VecDeque<Queued>,
    /// Always equals the sum of `Message::len` over `messages`, in-flight ones included.
    pub(crate) outstanding_bytes: usize,
    pub(crate) open_sessions: usize,
    next_id: u64,
}

impl StoreInner {
    /// Position of the message the next read should get, skipping claimed ones.
    fn next_index(&self, ordering: OrderingPolicy) -> Option<usize> {
        let mut available = self.messages.iter().map(|q| !q.in_flight);
        match ordering {
            OrderingPolicy::Fifo => available.position(|free| free),
            OrderingPolicy::Lifo => available.rposition(|free| free),
        }
    }

    fn remove_at(&mut self, idx: usize) -> Option<Message> {
        let queued = self.messages.remove(idx)?;
        self.outstanding_bytes -= queued.msg.len();
        Some(queued.msg)
    }

    fn position_of(&self, id: u64) -> Option<usize> {
        self.messages.iter().position(|q| q.id == id)
    }
}

/// Ordered, bounded sequence of messages.
///
/// The store never logs and never retries; each failure is returned to the caller
/// with state left exactly as it was.
pub struct QueueStore {
    pub(crate) inner: Mutex<StoreInner>,
    limits: QueueLimits,
    ordering: OrderingPolicy,
}

impl QueueStore {
    pub fn new(limits: QueueLimits, ordering: OrderingPolicy) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                messages: VecDeque::new(),
                outstanding_bytes: 0,
                open_sessions: 0,
                next_id: 0,
            }),
            limits,
            ordering,
        }
    }

    fn check_len(&self, len: usize) -> Result<(), QueueError> {
        if len > self.limits.max_message_bytes {
            return Err(QueueError::PayloadTooLarge {
                len,
                max: self.limits.max_message_bytes,
            });
        }
        Ok(())
    }

    fn check_quota(&self, inner: &StoreInner, len: usize) -> Result<(), QueueError> {
        if let Some(max) = self.limits.max_messages {
            if inner.messages.len() >= max {
                return Err(QueueError::TooManyMessages { max });
            }
        }
        let outstanding = inner.outstanding_bytes;
        // outstanding <= max always holds, so the subtraction cannot wrap
        if len > self.limits.max_aggregate_bytes - outstanding {
            return Err(QueueError::QueueFull {
                requested: len,
                outstanding,
                max: self.limits.max_aggregate_bytes,
            });
        }
        Ok(())
    }

    /// Report whether a payload of `len` bytes would currently be accepted,
    /// without allocating anything.
    ///
    /// The answer is advisory; `enqueue` repeats both checks under the lock.
    pub fn check_admission(&self, len: usize) -> Result<(), QueueError> {
        self.check_len(len)?;
        let inner = self.inner.lock();
        self.check_quota(&inner, len)
    }

    /// Append a copy of `payload` as the newest message.
    pub fn enqueue(&self, payload: &[u8]) -> Result<(), QueueError> {
        let len = payload.len();
        self.check_len(len)?;

        let mut inner = self.inner.lock();
        self.check_quota(&inner, len)?;

        let msg = Message::try_new(payload)?;
        inner
            .messages
            .try_reserve(1)
            .map_err(|_| QueueError::AllocationFailed { len })?;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.messages.push_back(Queued {
            id,
            in_flight: false,
            msg,
        });
        inner.outstanding_bytes += len;
        Ok(())
    }

    /// Remove the next message and return it framed (payload plus terminator).
    pub fn dequeue(&self) -> Result<Vec<u8>, QueueError> {
        let mut inner = self.inner.lock();
        let idx = inner.next_index(self.ordering).ok_or(QueueError::Empty)?;
        inner
            .remove_at(idx)
            .map(Message::into_framed)
            .ok_or(QueueError::Empty)
    }

    /// Like `dequeue`, but leaves the message queued and fails with
    /// `BufferTooSmall` when its framed length exceeds `capacity`.
    pub fn dequeue_within(&self, capacity: usize) -> Result<Vec<u8>, QueueError> {
        let mut inner = self.inner.lock();
        let idx = inner.next_index(self.ordering).ok_or(QueueError::Empty)?;
        let needed = inner.messages[idx].msg.framed_len();
        if needed > capacity {
            return Err(QueueError::BufferTooSmall { needed, capacity });
        }
        inner
            .remove_at(idx)
            .map(Message::into_framed)
            .ok_or(QueueError::Empty)
    }

    /// Hand the next framed message to `consume`, and remove it only if
    /// `consume` succeeds.
    ///
    /// The message is claimed and copied under the lock, then `consume` runs
    /// with the lock released, so it may call back into this store. While
    /// claimed, the message still counts against quota but no other read sees
    /// it. On failure the claim is dropped and the message keeps its place.
    pub fn dequeue_with<R, F>(&self, consume: F) -> Result<R, QueueError>
    where
        F: FnOnce(&[u8]) -> Result<R, QueueError>,
    {
        let (id, framed) = {
            let mut inner = self.inner.lock();
            let idx = inner.next_index(self.ordering).ok_or(QueueError::Empty)?;
            let queued = &mut inner.messages[idx];
            let framed = copy_framed(queued.msg.framed())?;
            queued.in_flight = true;
            (queued.id, framed)
        };

        let out = consume(&framed);

        let mut inner = self.inner.lock();
        // a concurrent drain may already have freed it
        if let Some(idx) = inner.position_of(id) {
            match &out {
                Ok(_) => {
                    inner.remove_at(idx);
                }
                Err(_) => inner.messages[idx].in_flight = false,
            }
        }
        out
    }

    /// Framed length of the message the next read would return.
    pub fn peek_len(&self) -> Option<usize> {
        let inner = self.inner.lock();
        inner
            .next_index(self.ordering)
            .map(|idx| inner.messages[idx].msg.framed_len())
    }

    /// Free every queued message. Only the owning device calls this, at teardown.
    pub(crate) fn drain(&self) -> usize {
        let mut inner = self.inner.lock();
        let drained = inner.messages.len();
        inner.messages.clear();
        inner.outstanding_bytes = 0;
        drained
    }

    pub(crate) fn session_opened(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.open_sessions += 1;
        inner.open_sessions
    }

    /// Returns `None` if there was no open session to close; the counter stays at zero.
    pub(crate) fn session_closed(&self) -> Option<usize> {
        let mut inner = self.inner.lock();
        inner.open_sessions = inner.open_sessions.checked_sub(1)?;
        Some(inner.open_sessions)
    }

    pub fn open_sessions(&self) -> usize {
        self.inner.lock().open_sessions
    }

    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().messages.is_empty()
    }

    pub fn outstanding_bytes(&self) -> usize {
        self.inner.lock().outstanding_bytes
    }

    pub fn limits(&self) -> QueueLimits {
        self.limits
    }

    pub fn ordering(&self) -> OrderingPolicy {
        self.ordering
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new(QueueLimits::default(), OrderingPolicy::default())
    }
}

fn copy_framed(framed: &[u8]) -> Result<Vec<u8>, QueueError> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(framed.len())
        .map_err(|_| QueueError::AllocationFailed { len: framed.len() })?;
    copy.extend_from_slice(framed);
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_store(max_message: usize, max_aggregate: usize) -> QueueStore {
        QueueStore::new(
            QueueLimits::new(max_message, max_aggregate).unwrap(),
            OrderingPolicy::Fifo,
        )
    }

    #[test]
    fn hello_round_trip_then_empty() {
        let store = small_store(10, 100);
        store.enqueue(b"hello").unwrap();
        assert_eq!(store.outstanding_bytes(), 5);

        assert_eq!(store.dequeue().unwrap(), b"hello\0".to_vec());
        assert_eq!(store.outstanding_bytes(), 0);
        assert_eq!(store.dequeue(), Err(QueueError::Empty));
    }

    #[test]
    fn oversized_message_is_rejected() {
        let store = small_store(10, 100);
        assert_eq!(
            store.enqueue(&[b'x'; 11]),
            Err(QueueError::PayloadTooLarge { len: 11, max: 10 })
        );
        assert_eq!(store.outstanding_bytes(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn quota_rejects_the_write_that_overflows() {
        const MB: usize = 1024 * 1024;
        let store = small_store(MB, 4 * MB);
        let chunk = vec![7u8; MB];
        for i in 1..=4 {
            store.enqueue(&chunk).unwrap();
            assert_eq!(store.outstanding_bytes(), i * MB);
        }
        assert_eq!(
            store.enqueue(&chunk),
            Err(QueueError::QueueFull {
                requested: MB,
                outstanding: 4 * MB,
                max: 4 * MB
            })
        );
        assert_eq!(store.len(), 4);
        assert_eq!(store.outstanding_bytes(), 4 * MB);
    }

    #[test]
    fn fifo_returns_oldest_first() {
        let store = small_store(10, 100);
        for m in [&b"a"[..], b"bb", b"ccc"] {
            store.enqueue(m).unwrap();
        }
        assert_eq!(store.dequeue().unwrap(), b"a\0");
        assert_eq!(store.outstanding_bytes(), 5);
        assert_eq!(store.dequeue().unwrap(), b"bb\0");
        assert_eq!(store.dequeue().unwrap(), b"ccc\0");
    }

    #[test]
    fn lifo_returns_newest_first() {
        let store = QueueStore::new(QueueLimits::new(10, 100).unwrap(), OrderingPolicy::Lifo);
        for m in [&b"a"[..], b"bb", b"ccc"] {
            store.enqueue(m).unwrap();
        }
        assert_eq!(store.peek_len(), Some(4));
        assert_eq!(store.dequeue().unwrap(), b"ccc\0");
        assert_eq!(store.dequeue().unwrap(), b"bb\0");
        assert_eq!(store.dequeue().unwrap(), b"a\0");
        assert_eq!(store.outstanding_bytes(), 0);
    }

    #[test]
    fn dequeue_within_keeps_message_when_too_small() {
        let store = small_store(10, 100);
        store.enqueue(b"hello").unwrap();
        assert_eq!(
            store.dequeue_within(5),
            Err(QueueError::BufferTooSmall {
                needed: 6,
                capacity: 5
            })
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.dequeue_within(6).unwrap(), b"hello\0");
    }

    #[test]
    fn failed_consumer_leaves_message_queued() {
        let store = small_store(10, 100);
        store.enqueue(b"keep").unwrap();

        let res: Result<(), _> = store.dequeue_with(|_| Err(QueueError::CopyFault));
        assert_eq!(res, Err(QueueError::CopyFault));
        assert_eq!(store.outstanding_bytes(), 4);

        let copied = store.dequeue_with(|bytes| Ok(bytes.to_vec())).unwrap();
        assert_eq!(copied, b"keep\0");
        assert!(store.is_empty());
    }

    #[test]
    fn admission_check_does_not_mutate() {
        let store = small_store(4, 6);
        store.enqueue(b"abcd").unwrap();
        assert!(store.check_admission(2).is_ok());
        assert!(matches!(
            store.check_admission(3),
            Err(QueueError::QueueFull { .. })
        ));
        assert!(matches!(
            store.check_admission(5),
            Err(QueueError::PayloadTooLarge { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn drain_frees_everything() {
        let store = small_store(10, 100);
        for _ in 0..5 {
            store.enqueue(b"xyz").unwrap();
        }
        assert_eq!(store.drain(), 5);
        assert!(store.is_empty());
        assert_eq!(store.outstanding_bytes(), 0);
        assert_eq!(store.drain(), 0);
    }

    #[test]
    fn session_counter_never_goes_negative() {
        let store = QueueStore::default();
        assert_eq!(store.session_closed(), None);
        assert_eq!(store.session_opened(), 1);
        assert_eq!(store.session_opened(), 2);
        assert_eq!(store.session_closed(), Some(1));
        assert_eq!(store.session_closed(), Some(0));
        assert_eq!(store.session_closed(), None);
        assert_eq!(store.open_sessions(), 0);
    }

    #[test]
    fn consumer_can_reenter_the_store() {
        let store = small_store(10, 100);
        store.enqueue(b"first").unwrap();
        store.enqueue(b"second").unwrap();

        let inner_read = store
            .dequeue_with(|framed| {
                // the claimed message is hidden, so a nested read gets the next one
                assert_eq!(store.len(), 2);
                assert_eq!(store.outstanding_bytes(), 11);
                let nested = store.dequeue()?;
                Ok((framed.to_vec(), nested))
            })
            .unwrap();
        assert_eq!(inner_read.0, b"first\0");
        assert_eq!(inner_read.1, b"second\0");
        assert!(store.is_empty());
        assert_eq!(store.outstanding_bytes(), 0);
    }

    #[test]
    fn only_claimed_message_left_reads_as_empty() {
        let store = small_store(10, 100);
        store.enqueue(b"solo").unwrap();
        let res: Result<(), _> = store.dequeue_with(|_| {
            assert_eq!(store.dequeue(), Err(QueueError::Empty));
            assert_eq!(store.peek_len(), None);
            Err(QueueError::CopyFault)
        });
        assert_eq!(res, Err(QueueError::CopyFault));
        assert_eq!(store.peek_len(), Some(5));
    }

    #[test]
    fn message_count_limit_bounds_empty_payloads() {
        let store = QueueStore::new(
            QueueLimits::new(10, 10).unwrap().with_max_messages(3),
            OrderingPolicy::Fifo,
        );
        for _ in 0..3 {
            store.enqueue(b"").unwrap();
        }
        assert_eq!(
            store.enqueue(b""),
            Err(QueueError::TooManyMessages { max: 3 })
        );
        assert_eq!(store.len(), 3);
        assert_eq!(store.outstanding_bytes(), 0);

        store.dequeue().unwrap();
        store.enqueue(b"").unwrap();
    }
}
