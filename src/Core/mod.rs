pub mod error;
pub mod limits;

pub use error::{ConfigError, ErrorCode, QueueError};
pub use limits::{OrderingPolicy, QueueLimits, ReadPolicy, MAX_AGGREGATE_BYTES, MAX_MESSAGE_BYTES};
