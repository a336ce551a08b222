//! Domain ports (interfaces) for the minion agent core.

pub mod handler;
pub mod stream;

pub use handler::{CommandHandler, CommandOutput};
pub use stream::{CommandStream, StreamConnector, StreamError};
