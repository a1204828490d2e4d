use super::error::ConfigError;

/// Largest payload a single message may carry (terminator excluded).
pub const MAX_MESSAGE_BYTES: usize = 6 * 1024;

/// Largest total payload that may be outstanding across all queued messages.
pub const MAX_AGGREGATE_BYTES: usize = 4 * 1024 * 1024;

/// Which end of the queue a read takes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// Oldest message first.
    #[default]
    Fifo,
    /// Newest message first. Matches the legacy driver that pushed and
    /// popped at the list head.
    Lifo,
}

/// What happens to a message when copying it out to the caller fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    /// Copy while the message is still queued; remove it only after the copy succeeded.
    #[default]
    Lossless,
    /// Remove first, then copy. A copy fault loses the message.
    PopThenCopy,
}

/// Quota limits enforced by a queue store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueLimits {
    pub max_message_bytes: usize,
    pub max_aggregate_bytes: usize,
    /// Cap on queued message count. Zero-length payloads cost no quota bytes,
    /// so without this cap nothing bounds how many of them pile up.
    pub max_messages: Option<usize>,
}

impl Default for QueueLimits {
    fn default() -> Self {
        Self {
            max_message_bytes: MAX_MESSAGE_BYTES,
            max_aggregate_bytes: MAX_AGGREGATE_BYTES,
            max_messages: None,
        }
    }
}

impl QueueLimits {
    pub fn new(max_message_bytes: usize, max_aggregate_bytes: usize) -> Result<Self, ConfigError> {
        let limits = Self {
            max_message_bytes,
            max_aggregate_bytes,
            max_messages: None,
        };
        limits.validate()?;
        Ok(limits)
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = Some(max_messages);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_bytes == 0 {
            return Err(ConfigError::ZeroLimit("max_message_bytes"));
        }
        if self.max_aggregate_bytes == 0 {
            return Err(ConfigError::ZeroLimit("max_aggregate_bytes"));
        }
        if self.max_messages == Some(0) {
            return Err(ConfigError::ZeroLimit("max_messages"));
        }
        if self.max_message_bytes > self.max_aggregate_bytes {
            return Err(ConfigError::MessageExceedsAggregate {
                max_message_bytes: self.max_message_bytes,
                max_aggregate_bytes: self.max_aggregate_bytes,
            });
        }
        Ok(())
    }
}
