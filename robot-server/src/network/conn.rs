pub(crate) use client::ClientConnection;
use tokio::{io, time};

mod client;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Message exceeds {0} bytes")]
    MessageTooLong(usize),
    #[error("Malformed UTF-8 message")]
    MalformedString,
    #[error("Recharge violated: {0}")]
    Recharge(String),
    #[error("I/O: {0}")]
    IO(#[from] io::Error),
    #[error("Read timeout")]
    Timeout(#[from] time::error::Elapsed),
    #[error("Connection closed by peer")]
    ConnectionAborted,
}
