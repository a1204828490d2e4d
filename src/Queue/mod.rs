mod debug;
pub mod message;
pub mod store;

pub use message::{Message, TERMINATOR};
pub use store::QueueStore;
