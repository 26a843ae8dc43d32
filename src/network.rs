pub mod connection_handler;
pub mod network_listener;
pub mod types;

pub use connection_handler::{handle_connection, HandlerSettings};
pub use network_listener::NetworkListener;
pub use types::Outcome;
