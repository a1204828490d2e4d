// Error taxonomy for the queue engine and the values surfaced at the boundary

use thiserror::Error;

/// Every way a queue or gateway operation can fail.
///
/// Capacity errors (`PayloadTooLarge`, `QueueFull`) and `Empty` never touch
/// queue state. `CopyFault` is local to a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// No message is queued. Expected steady-state result of a read.
    #[error("queue is empty")]
    Empty,

    /// The message can never fit, no matter how long the caller waits.
    #[error("message too large ({len} > {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// Accepting the message would exceed the aggregate quota.
    #[error("queue full: {outstanding} outstanding + {requested} requested > {max}")]
    QueueFull {
        requested: usize,
        outstanding: usize,
        max: usize,
    },

    /// The queue already holds its configured maximum number of messages.
    #[error("queue full: message count limit {max} reached")]
    TooManyMessages { max: usize },

    /// Backing storage for the message could not be obtained.
    #[error("failed to allocate {len} bytes for message")]
    AllocationFailed { len: usize },

    /// Caller memory could not be read from or written to.
    #[error("fault accessing caller buffer")]
    CopyFault,

    /// The destination cannot hold the framed message. The message stays queued.
    #[error("buffer too small ({capacity} < {needed})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// A write declared zero bytes, leaving no room for the terminator.
    #[error("declared length must include the terminator byte")]
    InvalidLength,
}

/// Result codes seen by whatever shell hosts the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    WouldBlock,
    InvalidArgument,
    ResourceExhausted,
    OutOfMemory,
    FaultAccessingCaller,
}

impl QueueError {
    pub fn code(&self) -> ErrorCode {
        match self {
            QueueError::Empty => ErrorCode::WouldBlock,
            QueueError::PayloadTooLarge { .. }
            | QueueError::BufferTooSmall { .. }
            | QueueError::InvalidLength => ErrorCode::InvalidArgument,
            QueueError::QueueFull { .. } | QueueError::TooManyMessages { .. } => {
                ErrorCode::ResourceExhausted
            }
            QueueError::AllocationFailed { .. } => ErrorCode::OutOfMemory,
            QueueError::CopyFault => ErrorCode::FaultAccessingCaller,
        }
    }

    /// True when the same request may succeed later without being changed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QueueError::Empty | QueueError::QueueFull { .. } | QueueError::TooManyMessages { .. }
        )
    }

    /// Negative errno, as returned across the C ABI.
    pub fn to_errno(&self) -> isize {
        -(self.code().errno() as isize)
    }
}

impl ErrorCode {
    /// Quota exhaustion reports EAGAIN, same as an empty read: both clear up
    /// once a reader drains the queue.
    pub fn errno(self) -> i32 {
        match self {
            ErrorCode::WouldBlock | ErrorCode::ResourceExhausted => libc::EAGAIN,
            ErrorCode::InvalidArgument => libc::EINVAL,
            ErrorCode::OutOfMemory => libc::ENOMEM,
            ErrorCode::FaultAccessingCaller => libc::EFAULT,
        }
    }
}

/// Rejected device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("per-message limit {max_message_bytes} exceeds aggregate limit {max_aggregate_bytes}")]
    MessageExceedsAggregate {
        max_message_bytes: usize,
        max_aggregate_bytes: usize,
    },
}
