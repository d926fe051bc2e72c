//! The crate-wide [`Error`] type.

use std::sync::Arc;
use thiserror::Error;

/// Errors produced while parsing or typing a boot command.
///
/// The type is `Clone` so a driver can keep the first transmission failure
/// and hand the same error back from every later call.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("special {0} not found")]
    UnknownSpecial(String),

    #[error("no scancode for character {0:?}")]
    UnmappedChar(char),

    #[error("scancode group of width {width} does not fit in chunks of {size}")]
    ChunkTooWide { width: usize, size: usize },

    #[error("failed to send keys: {0:#}")]
    Transmit(Arc<anyhow::Error>),

    #[error("boot command cancelled")]
    Cancelled,

    #[error("invalid boot configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn transmit(err: anyhow::Error) -> Self {
        Error::Transmit(Arc::new(err))
    }

    /// The underlying sink error, if this is a transmission failure.
    pub fn transmit_cause(&self) -> Option<&anyhow::Error> {
        match self {
            Error::Transmit(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
