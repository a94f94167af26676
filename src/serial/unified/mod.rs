pub mod types;
pub mod reader;
pub mod transport;
pub mod session;

pub use reader::{LineFramer, Router};
pub use session::Session;
pub use transport::{ChannelSet, LineQueue, Transport};
pub use types::{format_command, Channel, LineClass, EOL, RESPONSE_ERROR, RESPONSE_EVENT, RESPONSE_OK, RESPONSE_OK_INIT};
