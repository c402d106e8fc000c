//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Delivery model
//! - A [`Record`] is built once and never mutated afterwards
//! - Every transport implements [`DeliveryHandler`]
//! - Failures are reported as [`DeliveryError`], aggregated without loss

mod config;
mod context;
mod error;
mod handler;
mod record;

pub use config::*;
pub use context::DeliveryContext;
pub use error::*;
pub use handler::*;
pub use record::*;
