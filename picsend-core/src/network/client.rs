use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info};

use crate::codec::{FrameCodec, HEADER_SIZE, MAX_FRAME_PAYLOAD};
use crate::error::PicsendError;
use crate::network::Endpoint;
use crate::payload::Payload;

/// Outcome of one completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub endpoint: Endpoint,
    /// Header plus payload.
    pub bytes_sent: usize,
}

pub type TransferResult = Result<TransferReport, PicsendError>;

/// One-shot sender: one fresh TCP connection per image.
///
/// Holds no state between sends. There are no retries, no keep-alive and
/// no acknowledgment; the transport's default connect and write timeouts
/// apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferClient;

impl TransferClient {
    pub fn new() -> Self {
        Self
    }

    /// Validate `host`/`port` and send. Invalid input fails before any
    /// network activity.
    pub async fn send_to(&self, host: &str, port: u16, payload: Payload) -> TransferResult {
        let endpoint = Endpoint::new(host, port)?;
        self.send(&endpoint, payload).await
    }

    /// Connect to `endpoint`, write one frame, shut down the write side
    /// and close.
    ///
    /// The socket is closed on every exit path, including when the
    /// returned future is dropped mid-send.
    pub async fn send(&self, endpoint: &Endpoint, payload: Payload) -> TransferResult {
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(PicsendError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_FRAME_PAYLOAD,
            });
        }
        let bytes_sent = HEADER_SIZE + payload.len();

        debug!("connecting to {endpoint}");
        let stream = TcpStream::connect((endpoint.host(), endpoint.port()))
            .await
            .map_err(|source| PicsendError::Connection {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let mut sink = FramedWrite::new(stream, FrameCodec::new());

        // `send` keeps writing until the whole frame is flushed.
        debug!("writing {bytes_sent} bytes to {endpoint}");
        sink.send(payload.into_bytes()).await.map_err(write_error)?;

        // Flush and shut down the write side: end of data for the peer.
        sink.close().await.map_err(write_error)?;
        drop(sink);

        info!("sent {bytes_sent} bytes to {endpoint}");
        Ok(TransferReport {
            endpoint: endpoint.clone(),
            bytes_sent,
        })
    }
}

/// I/O failures after connect are write failures.
fn write_error(e: PicsendError) -> PicsendError {
    match e {
        PicsendError::Io(io) => PicsendError::Write(io),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn io_errors_become_write_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(write_error(io.into()).kind(), ErrorKind::Write);

        let other = PicsendError::ProtocolViolation("x");
        assert_eq!(write_error(other).kind(), ErrorKind::ProtocolViolation);
    }

    #[tokio::test]
    async fn invalid_endpoint_fails_before_connecting() {
        let err = TransferClient::new()
            .send_to("", 5001, Payload::new(vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEndpoint);

        let err = TransferClient::new()
            .send_to("127.0.0.1", 0, Payload::new(vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEndpoint);
    }

    #[tokio::test]
    #[ignore = "needs a DNS resolver"]
    async fn unresolvable_host_is_connection_error() {
        let err = TransferClient::new()
            .send_to("host.invalid", 5001, Payload::new(vec![0]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
