//! Error types for quick-transfer.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Main error type for quick-transfer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be bound. Fatal, surfaced before any
    /// listening state is reported.
    #[error("unable to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Socket-level failure while serving the response. Not retried.
    #[error("transfer failed: {0}")]
    Transfer(#[source] hyper::Error),

    /// A URI or QR code could not be produced after a successful bind.
    #[error("unable to create URI or QR code: {message}")]
    Display { message: String },

    /// Invalid glob pattern on the command line.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Failure while building the zip archive.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience result type for quick-transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_display() {
        let err = Error::Bind {
            addr: "127.0.0.1:80".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(err.to_string(), "unable to bind 127.0.0.1:80: address in use");
    }

    #[test]
    fn display_error_display() {
        let err = Error::Display {
            message: "data too long".into(),
        };
        assert_eq!(err.to_string(), "unable to create URI or QR code: data too long");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
