use std::path::Path;

use tokio::sync::watch;
use tracing::{debug, warn};

use picsend_core::{CaptureSession, Endpoint, PicsendError, Status, TransferResult};

use crate::config::SenderConfig;

/// Send the image at `path` to `endpoint`.
///
/// With `raw` set the file bytes go out unchanged; otherwise they are
/// re-encoded with the configured width limit and quality. Every status
/// change is forwarded to `on_status`.
pub async fn send_file(
    path: &Path,
    endpoint: &Endpoint,
    config: &SenderConfig,
    raw: bool,
    on_status: impl Fn(&Status) + Send + 'static,
) -> TransferResult {
    let capture = tokio::fs::read(path).await.map_err(PicsendError::Io)?;
    debug!("read {} bytes from {}", capture.len(), path.display());

    let mut session = if raw {
        CaptureSession::passthrough()
    } else {
        CaptureSession::new(config.encoder())
    };

    let watcher = tokio::spawn(watch_status(session.subscribe(), on_status));

    session.capture(capture);
    let result = session.send(endpoint).await;

    // Dropping the session closes the channel and ends the watcher.
    drop(session);
    if let Err(e) = watcher.await {
        warn!("status watcher failed: {e}");
    }
    result
}

async fn watch_status(mut rx: watch::Receiver<Status>, on_status: impl Fn(&Status)) {
    while rx.changed().await.is_ok() {
        on_status(&*rx.borrow_and_update());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use picsend_core::{ErrorKind, read_frame};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn raw_send_forwards_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jpg");
        std::fs::write(&path, b"\xFF\xD8raw").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let endpoint = Endpoint::new(addr.ip().to_string(), addr.port()).unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            read_frame(stream, None).await.unwrap()
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let report = send_file(&path, &endpoint, &SenderConfig::default(), true, move |s| {
            sink.lock().unwrap().push(s.to_string());
        })
        .await
        .unwrap();

        assert_eq!(report.bytes_sent, 9);
        assert_eq!(&server.await.unwrap()[..], b"\xFF\xD8raw");
        assert_eq!(seen.lock().unwrap().last().map(String::as_str), Some("sent"));
    }

    #[tokio::test]
    async fn failing_status_callback_does_not_fail_send() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jpg");
        std::fs::write(&path, b"\xFF\xD8raw").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let endpoint = Endpoint::new(addr.ip().to_string(), addr.port()).unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            read_frame(stream, None).await.unwrap()
        });

        let report = send_file(&path, &endpoint, &SenderConfig::default(), true, |_| {
            panic!("status sink unavailable")
        })
        .await
        .unwrap();

        assert_eq!(report.bytes_sent, 9);
        assert_eq!(&server.await.unwrap()[..], b"\xFF\xD8raw");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let endpoint = Endpoint::new("127.0.0.1", 5001).unwrap();
        let err = send_file(
            Path::new("/nonexistent/capture.jpg"),
            &endpoint,
            &SenderConfig::default(),
            true,
            |_| {},
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
