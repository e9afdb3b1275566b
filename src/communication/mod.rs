pub mod types;
pub mod protocol;
pub mod handler;

pub use types::*;
pub use protocol::JsonProtocol;
pub use handler::{HostActions, MessageHandler, Outbound};
