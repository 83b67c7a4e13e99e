//! Common utilities and types

pub mod error;
pub mod metadata;
pub mod net;

pub use error::{Error, Result, SocketStage};
pub use metadata::{Destination, Network};
pub use net::Address;
