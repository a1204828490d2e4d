// Module naming follows project convention (Core, Queue, Gateway, Debug)
#[allow(non_snake_case)]
pub mod Core;
#[allow(non_snake_case)]
pub mod Queue;
#[allow(non_snake_case)]
pub mod Gateway;
#[allow(non_snake_case)]
pub mod Debug;

pub mod ffi;

pub use Core::{ErrorCode, OrderingPolicy, QueueError, ReadPolicy};
pub use Gateway::{DeviceBuilder, MessageDevice};
