//! Receiver service core logic.
//!
//! Accepts senders on a TCP listener, reads exactly one frame per
//! connection, and hands the payload to a single store worker through a
//! bounded queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use picsend_core::{PicsendError, read_frame};

use crate::config::ReceiverConfig;
use crate::store::ImageStore;

/// Read one image frame and reject empty or oversized ones.
pub async fn receive_image<R>(reader: R, max_frame_size: usize) -> Result<Bytes, PicsendError>
where
    R: AsyncRead + Unpin,
{
    let payload = read_frame(reader, Some(max_frame_size)).await?;
    if payload.is_empty() {
        return Err(PicsendError::ProtocolViolation("empty image frame"));
    }
    Ok(payload)
}

// ── StoreQueue ───────────────────────────────────────────────────

/// Outcome of [`StoreQueue::push`].
#[derive(Debug)]
enum Push {
    Queued,
    /// The queue was full; the oldest image was removed to make room.
    Evicted(Bytes),
    Closed,
}

#[derive(Default)]
struct QueueState {
    images: VecDeque<Bytes>,
    closed: bool,
}

/// Bounded image queue between sender tasks and the store worker.
///
/// A full queue keeps the newest images: pushing evicts the oldest.
struct StoreQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    ready: Notify,
}

impl StoreQueue {
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity: capacity.max(1),
            ready: Notify::new(),
        }
    }

    fn push(&self, image: Bytes) -> Push {
        let outcome = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                return Push::Closed;
            }
            let evicted = if state.images.len() >= self.capacity {
                state.images.pop_front()
            } else {
                None
            };
            state.images.push_back(image);
            evicted.map_or(Push::Queued, Push::Evicted)
        };
        self.ready.notify_one();
        outcome
    }

    /// Next queued image. After [`close`](Self::close), remaining images
    /// are still returned, then `None`.
    async fn pop(&self) -> Option<Bytes> {
        loop {
            let notified = self.ready.notified();
            {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(image) = state.images.pop_front() {
                    return Some(image);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    fn close(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
        self.ready.notify_waiters();
    }
}

// ── ReceiverService ──────────────────────────────────────────────

/// The top-level receiver service.
pub struct ReceiverService {
    config: ReceiverConfig,
    running: Arc<AtomicBool>,
}

impl ReceiverService {
    /// Create a new receiver service with the given config.
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Bind the configured address and serve until stopped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        info!("receiver listening on {}", listener.local_addr()?);
        self.serve(listener).await;
        Ok(())
    }

    /// Serve on an already-bound listener until stopped.
    ///
    /// 1. Spawns the store worker.
    /// 2. Accepts senders, one task per connection.
    /// 3. On stop, aborts connections still being read, closes the queue
    ///    and waits for queued images to be written.
    pub async fn serve(&self, listener: TcpListener) {
        self.running.store(true, Ordering::SeqCst);

        let queue = Arc::new(StoreQueue::new(self.config.storage.queue_capacity));
        let store = ImageStore::new(self.config.storage.save_root.clone());
        let writer = tokio::spawn(store_worker(store, Arc::clone(&queue)));

        let max_frame_size = self.config.storage.max_frame_size;
        let mut senders = JoinSet::new();

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                accept = listener.accept() => match accept {
                    Ok((stream, peer)) => {
                        senders.spawn(handle_sender(stream, peer, Arc::clone(&queue), max_frame_size));
                    }
                    Err(e) => warn!("accept error: {e}"),
                },
                Some(joined) = senders.join_next(), if !senders.is_empty() => {
                    log_sender_exit(joined);
                }
                _ = Self::wait_for_stop(&self.running) => break,
            }
        }

        if !senders.is_empty() {
            debug!("aborting {} open sender connection(s)", senders.len());
        }
        senders.abort_all();
        while let Some(joined) = senders.join_next().await {
            log_sender_exit(joined);
        }

        queue.close();
        if let Err(e) = writer.await {
            error!("store worker panicked: {e}");
        }
        self.running.store(false, Ordering::SeqCst);
        info!("receiver stopped");
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

fn log_sender_exit(joined: Result<(), JoinError>) {
    match joined {
        Err(e) if e.is_panic() => error!("sender task panicked: {e}"),
        _ => {}
    }
}

/// One connection: one frame. The stream is dropped (closed) on return.
async fn handle_sender(
    stream: TcpStream,
    peer: std::net::SocketAddr,
    queue: Arc<StoreQueue>,
    max_frame_size: usize,
) {
    info!("sender connected: {peer}");
    match receive_image(stream, max_frame_size).await {
        Ok(image) => {
            let len = image.len();
            match queue.push(image) {
                Push::Queued => info!("received {len} bytes from {peer}"),
                Push::Evicted(old) => warn!(
                    "store queue full; dropped oldest image ({} bytes) for {len} bytes from {peer}",
                    old.len()
                ),
                Push::Closed => warn!("store closed; dropping image from {peer}"),
            }
        }
        Err(e) => warn!("{peer}: {e}"),
    }
    info!("sender disconnected: {peer}");
}

async fn store_worker(store: ImageStore, queue: Arc<StoreQueue>) {
    while let Some(image) = queue.pop().await {
        if let Err(e) = store.save(image).await {
            error!("failed to store image under {}: {e}", store.root().display());
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use picsend_core::{Endpoint, ErrorKind, Payload, TransferClient};
    use std::path::{Path, PathBuf};

    fn jpg_files(root: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let Ok(days) = std::fs::read_dir(root) else {
            return out;
        };
        for day in days.flatten() {
            if let Ok(files) = std::fs::read_dir(day.path()) {
                out.extend(files.flatten().map(|f| f.path()));
            }
        }
        out
    }

    #[tokio::test]
    async fn empty_frame_is_rejected() {
        let err = receive_image(&[0u8, 0, 0, 0][..], 1024).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let err = receive_image(&[0u8, 0, 4, 1][..], 1024).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FrameTooLarge);
    }

    #[tokio::test]
    async fn truncated_frame_is_rejected() {
        let err = receive_image(&[0u8, 0, 0, 9, 1, 2][..], 1024)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedFrame);
    }

    #[tokio::test]
    async fn full_queue_evicts_oldest() {
        let queue = StoreQueue::new(2);
        assert!(matches!(queue.push(Bytes::from_static(b"a")), Push::Queued));
        assert!(matches!(queue.push(Bytes::from_static(b"b")), Push::Queued));
        match queue.push(Bytes::from_static(b"c")) {
            Push::Evicted(old) => assert_eq!(&old[..], b"a"),
            other => panic!("expected eviction, got {other:?}"),
        }

        queue.close();
        assert!(matches!(queue.push(Bytes::from_static(b"d")), Push::Closed));
        assert_eq!(queue.pop().await.as_deref(), Some(&b"b"[..]));
        assert_eq!(queue.pop().await.as_deref(), Some(&b"c"[..]));
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = Arc::new(StoreQueue::new(1));
        let consumer = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.pop().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(Bytes::from_static(b"late"));
        let got = tokio::time::timeout(Duration::from_secs(2), consumer)
            .await
            .expect("consumer never woke")
            .unwrap();
        assert_eq!(got.as_deref(), Some(&b"late"[..]));
    }

    #[tokio::test]
    async fn idle_sender_does_not_block_stop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ReceiverConfig::default();
        config.storage.save_root = tmp.path().to_path_buf();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = ReceiverService::new(config);
        let stop = service.stop_handle();
        let handle = tokio::spawn(async move { service.serve(listener).await });

        // Connects and never sends a byte.
        let _idle = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        stop.store(false, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .expect("service did not stop with an idle sender connected")
            .unwrap();
        assert!(jpg_files(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn received_image_is_stored() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ReceiverConfig::default();
        config.storage.save_root = tmp.path().to_path_buf();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = ReceiverService::new(config);
        let stop = service.stop_handle();
        let handle = tokio::spawn(async move { service.serve(listener).await });

        let endpoint = Endpoint::new(addr.ip().to_string(), addr.port()).unwrap();
        TransferClient::new()
            .send(&endpoint, Payload::new(b"\xFF\xD8image".to_vec()))
            .await
            .unwrap();

        let mut files = Vec::new();
        for _ in 0..50 {
            files = jpg_files(tmp.path());
            if !files.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(files.len(), 1);

        // Stopping waits for the store worker to finish its write.
        stop.store(false, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("service did not stop")
            .unwrap();
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"\xFF\xD8image");
    }
}
