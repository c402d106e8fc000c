//! Command implementations.

mod info;
mod publish;
mod validate;

pub use info::run_info;
pub use publish::run_publish;
pub use validate::run_validate;
