//! On-disk store for received images.
//!
//! Layout: `<root>/<YYYY-MM-DD>/<HHMMSS>.jpg`, local time. Two images in
//! the same second get `-1`, `-2`, ... suffixes.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Local};
use image::GenericImageView;
use tracing::{info, warn};

pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under the current local time.
    pub async fn save(&self, data: Bytes) -> io::Result<PathBuf> {
        self.save_at(data, Local::now()).await
    }

    /// Write `data` under `when`. The bytes are kept even when they do not
    /// decode as an image.
    pub async fn save_at(&self, data: Bytes, when: DateTime<Local>) -> io::Result<PathBuf> {
        let dir = self.root.join(when.format("%Y-%m-%d").to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let stem = when.format("%H%M%S").to_string();
        let path = unique_path(&dir, &stem).await;
        tokio::fs::write(&path, &data).await?;

        let len = data.len();
        let checked = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&data).map(|img| img.dimensions())
        })
        .await;
        match checked {
            Ok(Ok((w, h))) => info!("saved {} ({w}x{h}, {len} bytes)", path.display()),
            Ok(Err(e)) => warn!("saved {} but it is not a valid image: {e}", path.display()),
            Err(e) => warn!("saved {} but image check failed: {e}", path.display()),
        }
        Ok(path)
    }
}

async fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.jpg"));
    let mut n = 1;
    while tokio::fs::try_exists(&path).await.unwrap_or(false) {
        path = dir.join(format!("{stem}-{n}.jpg"));
        n += 1;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[tokio::test]
    async fn saves_under_date_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path());

        let path = store.save_at(Bytes::from_static(b"not-really-jpeg"), fixed_time()).await.unwrap();
        assert_eq!(path, tmp.path().join("2024-03-09").join("140507.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"not-really-jpeg");
    }

    #[tokio::test]
    async fn same_second_gets_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path());

        let first = store.save_at(Bytes::from_static(b"a"), fixed_time()).await.unwrap();
        let second = store.save_at(Bytes::from_static(b"b"), fixed_time()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "140507-1.jpg");
        assert_eq!(std::fs::read(&first).unwrap(), b"a");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn valid_image_is_checked_off_the_runtime() {
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(image::RgbImage::new(64, 48))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path());
        let path = store
            .save_at(Bytes::from(png.clone()), fixed_time())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), png);
    }
}
