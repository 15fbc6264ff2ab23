use async_trait::async_trait;
use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{FilterError, FilterResult};

/// Output edge length in pixels
pub const OUTPUT_SIZE: u32 = 256;
/// JPEG quality of the filtered output
pub const JPEG_QUALITY: u8 = 60;

/// A filtered image on local disk, removed by [`TempImage::remove`] or when
/// dropped
#[derive(Debug)]
pub struct TempImage {
    path: PathBuf,
    removed: bool,
}

impl TempImage {
    /// Take ownership of the file at `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file into memory
    pub async fn read(&self) -> FilterResult<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            FilterError::ImageProcessing(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Delete the file without blocking the runtime. Failures are logged only.
    pub async fn remove(mut self) {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!("Deleted {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        // Error paths land here
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Deleted {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete {}: {}", self.path.display(), e),
        }
    }
}

/// Produces a filtered local copy of a remote image
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFilter: Send + Sync {
    async fn filter_image_from_url(&self, image_url: &str) -> FilterResult<TempImage>;
}

/// Fetches images over HTTP and writes the filtered result under `tmp_dir`
pub struct HttpImageFilter {
    http: reqwest::Client,
    tmp_dir: PathBuf,
}

impl HttpImageFilter {
    pub fn new(tmp_dir: PathBuf) -> Self {
        Self::with_client(reqwest::Client::new(), tmp_dir)
    }

    pub fn with_client(http: reqwest::Client, tmp_dir: PathBuf) -> Self {
        Self { http, tmp_dir }
    }

    async fn fetch(&self, image_url: &str) -> FilterResult<Vec<u8>> {
        let url = Url::parse(image_url)?;

        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(bytes.to_vec())
    }

    fn output_path(&self) -> PathBuf {
        let suffix = Uuid::new_v4().simple().to_string();
        self.tmp_dir.join(format!(
            "filtered.{}.{}.jpg",
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }
}

#[async_trait]
impl ImageFilter for HttpImageFilter {
    #[instrument(skip(self))]
    async fn filter_image_from_url(&self, image_url: &str) -> FilterResult<TempImage> {
        info!("Fetching image");
        let source = self.fetch(image_url).await?;
        info!("Fetched {} bytes", source.len());

        let filtered = tokio::task::spawn_blocking(move || apply_filter(&source))
            .await
            .map_err(|e| FilterError::ImageProcessing(format!("filter task failed: {e}")))??;

        tokio::fs::create_dir_all(&self.tmp_dir).await.map_err(|e| {
            FilterError::ImageProcessing(format!(
                "failed to create {}: {}",
                self.tmp_dir.display(),
                e
            ))
        })?;

        let path = self.output_path();
        info!("Saving filtered image at {}", path.display());
        // Guard first so a partial write is cleaned up too
        let image = TempImage::new(path);
        tokio::fs::write(image.path(), &filtered).await.map_err(|e| {
            FilterError::ImageProcessing(format!(
                "failed to write {}: {}",
                image.path().display(),
                e
            ))
        })?;

        Ok(image)
    }
}

/// Decode `source`, resize to 256x256, convert to greyscale and encode as JPEG
pub fn apply_filter(source: &[u8]) -> FilterResult<Vec<u8>> {
    let img = image::load_from_memory(source)?;

    // Hard resize: aspect ratio is not preserved
    let grey = img
        .resize_exact(OUTPUT_SIZE, OUTPUT_SIZE, FilterType::Triangle)
        .to_luma8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(&grey)?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_apply_filter_dimensions_and_channels() {
        let output = apply_filter(&png_bytes(512, 300)).unwrap();

        let decoded = image::load_from_memory_with_format(&output, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.width(), OUTPUT_SIZE);
        assert_eq!(decoded.height(), OUTPUT_SIZE);
        assert_eq!(decoded.color(), ColorType::L8);
    }

    #[test]
    fn test_apply_filter_upscales_small_images() {
        let output = apply_filter(&png_bytes(16, 64)).unwrap();

        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (OUTPUT_SIZE, OUTPUT_SIZE));
    }

    #[test]
    fn test_apply_filter_rejects_non_image() {
        let result = apply_filter(b"<html>not an image</html>");
        assert!(matches!(result, Err(FilterError::ImageProcessing(_))));
    }

    #[test]
    fn test_temp_image_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered.test.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let image = TempImage::new(path.clone());
        assert!(image.path().exists());
        drop(image);
        assert!(!path.exists());
    }

    fn encode_reference(source: &[u8], quality: u8) -> Vec<u8> {
        let grey = image::load_from_memory(source)
            .unwrap()
            .resize_exact(256, 256, FilterType::Triangle)
            .to_luma8();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality)
            .encode_image(&grey)
            .unwrap();
        buf
    }

    #[test]
    fn test_apply_filter_encodes_at_quality_60() {
        let source = png_bytes(512, 512);
        let output = apply_filter(&source).unwrap();

        assert_eq!(output, encode_reference(&source, 60));
        assert!(output.len() < encode_reference(&source, 100).len());
    }

    #[tokio::test]
    async fn test_temp_image_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered.test.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        TempImage::new(path.clone()).remove().await;
        assert!(!path.exists());

        // Already gone is not an error
        TempImage::new(path.clone()).remove().await;
    }

    #[test]
    fn test_temp_image_drop_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        drop(TempImage::new(dir.path().join("never-written.jpg")));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let filter = HttpImageFilter::new(dir.path().to_path_buf());

        let result = filter.filter_image_from_url("not-a-url").await;
        assert!(matches!(result, Err(FilterError::ImageProcessing(_))));
    }

    #[test]
    fn test_output_path_is_under_tmp_dir() {
        let filter = HttpImageFilter::new(PathBuf::from("/tmp/filtered"));
        let path = filter.output_path();

        assert!(path.starts_with("/tmp/filtered"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("filtered."));
        assert!(name.ends_with(".jpg"));
        assert_ne!(path, filter.output_path());
    }
}
