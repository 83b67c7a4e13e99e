//! Destination resolution module

mod exception;
mod resolver;

pub use exception::ExceptionTable;
pub use resolver::{DestinationResolver, NameResolver, SystemResolver};
