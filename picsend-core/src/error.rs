//! Domain-specific error types for the picsend transfer protocol.
//!
//! All fallible operations return `Result<T, PicsendError>`.
//! Nothing is retried at this layer: every failure reaches the caller,
//! which decides whether to let the user try again.

use thiserror::Error;

/// The canonical error type for picsend.
#[derive(Debug, Error)]
pub enum PicsendError {
    // ── Input Errors ─────────────────────────────────────────────
    /// Host is empty or port is outside `1..=65535`.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A send was requested with nothing captured.
    #[error("no captured image to send")]
    NoCapture,

    // ── Connection Errors ────────────────────────────────────────
    /// TCP connect failed: refused, timed out, or the host did not resolve.
    #[error("connection to {endpoint} failed: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection broke while the frame was being written.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// Generic I/O failure (codec reads, file access).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    // ── Encoding Errors ──────────────────────────────────────────
    /// The source image could not be decoded or compressed.
    #[error("encoding error: {0}")]
    Encode(String),

    // ── Framing Errors ───────────────────────────────────────────
    /// The stream ended before a complete frame was available.
    #[error("truncated frame: expected {expected} bytes, got {received}")]
    TruncatedFrame { expected: usize, received: usize },

    /// A decoded length prefix exceeds the receiver's limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A payload cannot be described by a 32-bit length prefix.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Bytes on the wire violate the framing rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),
}

/// Fieldless classification of [`PicsendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidEndpoint,
    NoCapture,
    Connection,
    Write,
    Io,
    Encode,
    TruncatedFrame,
    FrameTooLarge,
    PayloadTooLarge,
    ProtocolViolation,
}

impl PicsendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PicsendError::InvalidEndpoint(_) => ErrorKind::InvalidEndpoint,
            PicsendError::NoCapture => ErrorKind::NoCapture,
            PicsendError::Connection { .. } => ErrorKind::Connection,
            PicsendError::Write(_) => ErrorKind::Write,
            PicsendError::Io(_) => ErrorKind::Io,
            PicsendError::Encode(_) => ErrorKind::Encode,
            PicsendError::TruncatedFrame { .. } => ErrorKind::TruncatedFrame,
            PicsendError::FrameTooLarge { .. } => ErrorKind::FrameTooLarge,
            PicsendError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            PicsendError::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
        }
    }

    /// Short user-facing reason. Never includes OS error text or
    /// protocol internals.
    pub fn status_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidEndpoint => "invalid server address or port",
            ErrorKind::NoCapture => "no image to send",
            ErrorKind::Connection => "could not connect to server",
            ErrorKind::Write => "connection lost while sending",
            ErrorKind::Io => "i/o error",
            ErrorKind::Encode => "could not encode image",
            ErrorKind::TruncatedFrame => "incomplete image received",
            ErrorKind::FrameTooLarge | ErrorKind::PayloadTooLarge => "image too large",
            ErrorKind::ProtocolViolation => "invalid data received",
        }
    }
}

/// Result type alias using [`PicsendError`].
pub type Result<T> = std::result::Result<T, PicsendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = PicsendError::TruncatedFrame {
            expected: 10,
            received: 4,
        };
        assert!(e.to_string().contains("10"));
        assert!(e.to_string().contains("4"));

        let e = PicsendError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: PicsendError = io_err.into();
        assert_eq!(e.kind(), ErrorKind::Io);
    }

    #[test]
    fn status_message_hides_details() {
        let e = PicsendError::Connection {
            endpoint: "10.0.0.1:5001".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "os error 111"),
        };
        assert_eq!(e.status_message(), "could not connect to server");
        assert!(!e.status_message().contains("111"));
    }
}
