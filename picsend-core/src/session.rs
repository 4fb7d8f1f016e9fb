//! Capture → encode → send orchestration.
//!
//! [`CaptureSession`] holds at most one captured image and runs the send
//! pipeline as a single sequential async call. Each outcome is published
//! as a [`Status`] on a `tokio::sync::watch` channel so a UI layer can
//! render the latest state without polling the pipeline.

use std::fmt;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::encoder::ImageEncoder;
use crate::error::PicsendError;
use crate::network::{Endpoint, TransferClient, TransferResult};
use crate::payload::Payload;

// ── Status ───────────────────────────────────────────────────────

/// Human-facing state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    PreviewReady,
    CaptureCancelled,
    Discarded,
    Sending,
    Sent { bytes: usize },
    /// Short reason from [`PicsendError::status_message`].
    Failed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "ready"),
            Status::PreviewReady => write!(f, "preview ready"),
            Status::CaptureCancelled => write!(f, "capture cancelled"),
            Status::Discarded => write!(f, "discarded"),
            Status::Sending => write!(f, "sending"),
            Status::Sent { .. } => write!(f, "sent"),
            Status::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

// ── CaptureSession ───────────────────────────────────────────────

/// Holds the current capture and sends it on request.
///
/// `send` takes `&mut self`, so one session can never run two sends at
/// once. The capture survives a send so the user can retry by hand.
pub struct CaptureSession {
    /// `None` sends the capture bytes unchanged.
    encoder: Option<ImageEncoder>,
    client: TransferClient,
    capture: Option<Bytes>,
    status_tx: watch::Sender<Status>,
    /// Keeps the channel open even when no UI is subscribed.
    status_rx: watch::Receiver<Status>,
}

impl CaptureSession {
    /// Session that re-encodes every capture with `encoder`.
    pub fn new(encoder: ImageEncoder) -> Self {
        Self::build(Some(encoder))
    }

    /// Session that sends capture bytes as-is.
    pub fn passthrough() -> Self {
        Self::build(None)
    }

    fn build(encoder: Option<ImageEncoder>) -> Self {
        let (status_tx, status_rx) = watch::channel(Status::Ready);
        Self {
            encoder,
            client: TransferClient::new(),
            capture: None,
            status_tx,
            status_rx,
        }
    }

    /// Obtain a `watch::Receiver` that yields every status change.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    /// Latest published status.
    pub fn status(&self) -> Status {
        self.status_rx.borrow().clone()
    }

    pub fn has_capture(&self) -> bool {
        self.capture.is_some()
    }

    /// Store a freshly captured image, replacing any previous one.
    pub fn capture(&mut self, image: impl Into<Bytes>) {
        self.capture = Some(image.into());
        self.publish(Status::PreviewReady);
    }

    /// The camera surface reported a cancelled capture.
    pub fn cancel_capture(&mut self) {
        self.capture = None;
        self.publish(Status::CaptureCancelled);
    }

    /// Drop the held capture without sending it.
    pub fn discard(&mut self) {
        self.capture = None;
        self.publish(Status::Discarded);
    }

    /// Encode the held capture and send it to `endpoint`.
    pub async fn send(&mut self, endpoint: &Endpoint) -> TransferResult {
        let result = match self.capture.clone() {
            Some(capture) => {
                self.publish(Status::Sending);
                self.run_pipeline(endpoint, capture).await
            }
            None => Err(PicsendError::NoCapture),
        };

        match &result {
            Ok(report) => {
                info!("capture delivered to {}", report.endpoint);
                self.publish(Status::Sent {
                    bytes: report.bytes_sent,
                });
            }
            Err(e) => {
                warn!("send to {endpoint} failed: {e}");
                self.publish(Status::Failed(e.status_message().to_string()));
            }
        }
        result
    }

    async fn run_pipeline(&self, endpoint: &Endpoint, capture: Bytes) -> TransferResult {
        let payload = match self.encoder {
            Some(encoder) => tokio::task::spawn_blocking(move || encoder.encode(&capture))
                .await
                .map_err(|e| PicsendError::Encode(format!("encoder task failed: {e}")))??,
            None => Payload::new(capture),
        };
        self.client.send(endpoint, payload).await
    }

    fn publish(&self, status: Status) {
        self.status_tx.send_replace(status);
    }
}

// ── Tests ────────────────────────────────────────────────────────
