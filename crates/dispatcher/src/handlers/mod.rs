//! Delivery handler implementations
//!
//! Contains JsonHandler, LogHandler, QueueHandler, BusHandler, and StreamHandler.

mod bus;
mod json;
mod log;
mod queue;
mod stream;

pub use self::bus::BusHandler;
pub use self::json::JsonHandler;
pub use self::log::LogHandler;
pub use self::queue::QueueHandler;
pub use self::stream::StreamHandler;
