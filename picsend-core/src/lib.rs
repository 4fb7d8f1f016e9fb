//! # picsend-core
//!
//! Core library for the picsend image transfer protocol.
//!
//! This crate contains:
//! - **Payload**: `Payload`, one immutable compressed image
//! - **Encoder**: `ImageEncoder`, downscale + JPEG compression
//! - **Codec**: `FrameCodec` for 4-byte big-endian length-prefixed frames via `tokio_util`
//! - **Network**: `Endpoint` and the one-shot `TransferClient`
//! - **Session**: `CaptureSession`, the capture → encode → send pipeline
//! - **Error**: `PicsendError`, a typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod encoder;
pub mod error;
pub mod network;
pub mod payload;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{FrameCodec, HEADER_SIZE, MAX_FRAME_PAYLOAD, decode_frame, encode_frame, read_frame};
pub use encoder::{DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, ImageEncoder, target_dimensions};
pub use error::{ErrorKind, PicsendError, Result};
pub use network::{Endpoint, TransferClient, TransferReport, TransferResult};
pub use payload::Payload;
pub use session::{CaptureSession, Status};
