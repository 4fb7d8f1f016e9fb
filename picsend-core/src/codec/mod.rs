//! Length-prefixed framing for image payloads.
//!
//! ## Wire format
//!
//! ```text
//! length:  u32 big-endian  (4)
//! payload: [u8]            (length bytes)
//! ```
//!
//! One frame per connection. There is no magic number, version byte,
//! checksum or response frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, Encoder, FramedRead};

use crate::error::PicsendError;

// ── Constants ────────────────────────────────────────────────────

/// Size of the length prefix.
pub const HEADER_SIZE: usize = 4;

/// Largest payload a 32-bit length prefix can describe.
pub const MAX_FRAME_PAYLOAD: usize = u32::MAX as usize;

/// Upper bound on how much the decoder pre-allocates per call while a
/// frame is incomplete. The buffer grows with the data actually received.
const RESERVE_CHUNK: usize = 64 * 1024;

// ── Pure helpers ─────────────────────────────────────────────────

/// Prefix `payload` with its big-endian u32 length.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, PicsendError> {
    let len = checked_len(payload.len())?;
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decode a complete frame held in memory.
///
/// `frame` must contain exactly one frame: short input is
/// [`PicsendError::TruncatedFrame`], trailing bytes are a protocol
/// violation.
pub fn decode_frame(frame: &[u8]) -> Result<Bytes, PicsendError> {
    if frame.len() < HEADER_SIZE {
        return Err(PicsendError::TruncatedFrame {
            expected: HEADER_SIZE,
            received: frame.len(),
        });
    }
    let len = declared_len(frame);
    let expected = HEADER_SIZE + len;
    if frame.len() < expected {
        return Err(PicsendError::TruncatedFrame {
            expected,
            received: frame.len(),
        });
    }
    if frame.len() > expected {
        return Err(PicsendError::ProtocolViolation(
            "trailing bytes after frame payload",
        ));
    }
    Ok(Bytes::copy_from_slice(&frame[HEADER_SIZE..]))
}

fn checked_len(len: usize) -> Result<u32, PicsendError> {
    u32::try_from(len).map_err(|_| PicsendError::PayloadTooLarge {
        size: len,
        max: MAX_FRAME_PAYLOAD,
    })
}

/// Read the length prefix. Caller guarantees at least `HEADER_SIZE` bytes.
fn declared_len(src: &[u8]) -> usize {
    let mut prefix = [0u8; HEADER_SIZE];
    prefix.copy_from_slice(&src[..HEADER_SIZE]);
    u32::from_be_bytes(prefix) as usize
}

// ── FrameCodec ───────────────────────────────────────────────────

/// `tokio_util` codec for length-prefixed image frames.
///
/// The decoder checks the declared length against `max_payload` as soon
/// as the header arrives, before buffering any payload bytes. A declared
/// length alone never allocates more than one chunk ahead of the data.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    max_payload: Option<usize>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject frames that declare more than `max_payload` bytes.
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            max_payload: Some(max_payload),
        }
    }

    pub fn max_payload(&self) -> Option<usize> {
        self.max_payload
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = PicsendError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let len = declared_len(src);
        if let Some(max) = self.max_payload {
            if len > max {
                return Err(PicsendError::FrameTooLarge { size: len, max });
            }
        }

        let total = HEADER_SIZE + len;
        if src.len() < total {
            src.reserve((total - src.len()).min(RESERVE_CHUNK));
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        Ok(Some(src.split_to(len).freeze()))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if buf.is_empty() {
            return Ok(None);
        }

        let expected = if buf.len() < HEADER_SIZE {
            HEADER_SIZE
        } else {
            HEADER_SIZE + declared_len(buf)
        };
        Err(PicsendError::TruncatedFrame {
            expected,
            received: buf.len(),
        })
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = PicsendError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = checked_len(item.len())?;
        dst.reserve(HEADER_SIZE + item.len());
        dst.put_u32(len);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

// ── Stream helper ────────────────────────────────────────────────

/// Read exactly one frame from `reader`.
///
/// A stream that ends before a full frame (including one that ends
/// before sending anything) yields [`PicsendError::TruncatedFrame`].
pub async fn read_frame<R>(reader: R, max_payload: Option<usize>) -> Result<Bytes, PicsendError>
where
    R: AsyncRead + Unpin,
{
    let codec = match max_payload {
        Some(max) => FrameCodec::with_max_payload(max),
        None => FrameCodec::new(),
    };
    let mut frames = FramedRead::new(reader, codec);
    match frames.next().await {
        Some(result) => result,
        None => Err(PicsendError::TruncatedFrame {
            expected: HEADER_SIZE,
            received: 0,
        }),
    }
}

// ── Tests ────────────────────────────────────────────────────────
