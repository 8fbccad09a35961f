//! Library-wide error and result types.
//!
//! These never cross the `RomData` accessor boundary: parsers use them for
//! their private loaders, log the failure, and degrade to "not available".

use std::io;

use thiserror::Error;

/// Convenience return type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while reading or decoding a format.
#[derive(Error, Debug)]
pub enum Error {
    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Fewer bytes were available than the structure requires.
    #[error("short read: wanted {wanted} bytes, got {got}")]
    TooShort { wanted: usize, got: usize },

    /// A magic/signature field did not match.
    #[error("bad magic")]
    BadMagic,

    /// A structural field holds a value the parser cannot use.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// The parser does not provide the requested data.
    #[error("not supported")]
    NotSupported,

    /// Image encoding or decoding failed.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Check a read length against the expected one.
    pub(crate) fn check_len(wanted: usize, got: usize) -> Result<()> {
        if got < wanted {
            return Err(Error::TooShort { wanted, got });
        }
        Ok(())
    }
}
