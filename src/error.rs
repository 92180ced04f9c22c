use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid channel capacity {capacity}: must be a nonzero power of two")]
    InvalidCapacity { capacity: usize },

    #[error("interface {name} not found")]
    InterfaceNotFound { name: String },

    #[error("event decode error: {0}")]
    Decode(String),

    #[error("sink error: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, Error>;
