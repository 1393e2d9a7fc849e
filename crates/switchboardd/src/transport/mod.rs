//! TCP transport for the daemon.
//!
//! The listener accepts connections on a background thread and hands each one
//! to a [`ConnectionHandler`] on its own thread. Every connection carries a
//! single request and at most one response.

mod errors;
mod handler;
mod listener;

pub use self::errors::ListenerError;
pub use self::handler::{
    ConnectionHandler, MAX_REQUEST_BYTES, READ_CHUNK_BYTES, RequestHandler, RpcConnectionHandler,
};
pub use self::listener::{ConnectionListener, ListenerHandle};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
