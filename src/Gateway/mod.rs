mod builder;
mod debug;
mod device;
pub mod user_buffer;

pub use builder::{DeviceBuilder, DeviceConfig};
pub use device::{DeviceStats, MessageDevice};
pub use user_buffer::{RawUserBuffer, UserSink, UserSource};
