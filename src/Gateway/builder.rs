use super::MessageDevice;
use crate::Core::error::ConfigError;
use crate::Core::limits::{OrderingPolicy, QueueLimits, ReadPolicy};

/// Everything fixed at device creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceConfig {
    pub limits: QueueLimits,
    pub ordering: OrderingPolicy,
    pub read_policy: ReadPolicy,
}

pub struct DeviceBuilder {
    config: DeviceConfig,
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self {
            config: DeviceConfig::default(), // 6KB per message, 4MB outstanding
        }
    }
}

impl DeviceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_bytes(mut self, bytes: usize) -> Self {
        self.config.limits.max_message_bytes = bytes;
        self
    }

    pub fn with_max_aggregate_bytes(mut self, bytes: usize) -> Self {
        self.config.limits.max_aggregate_bytes = bytes;
        self
    }

    /// Cap the number of queued messages, independent of their size.
    pub fn with_max_messages(mut self, count: usize) -> Self {
        self.config.limits.max_messages = Some(count);
        self
    }

    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.config.ordering = ordering;
        self
    }

    pub fn with_read_policy(mut self, policy: ReadPolicy) -> Self {
        self.config.read_policy = policy;
        self
    }

    pub fn config(&self) -> DeviceConfig {
        self.config
    }

    pub fn build(self) -> Result<MessageDevice, ConfigError> {
        self.config.limits.validate()?;
        Ok(MessageDevice::new(self.config))
    }
}
