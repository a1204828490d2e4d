use super::*;
use std::fmt;

impl fmt::Debug for MessageDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_message_device(self, f)
    }
}
