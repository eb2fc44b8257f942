use tokio::io;

use crate::config;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] config::Error),
    #[error("I/O: {0}")]
    IO(#[from] io::Error),
}
