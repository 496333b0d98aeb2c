// Drover Core - Domain Logic & Ports
// NO infrastructure dependencies: the durable store and the rate gate are
// reached only through the port traits.

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
