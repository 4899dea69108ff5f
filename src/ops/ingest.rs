//! Image ingestion: selected assets become size-bounded JPEG data URIs.
//!
//! Each asset is processed on its own blocking task, with at most
//! `max_parallel` decoding at once. A failure in one asset is recorded and
//! never affects the others; results keep selection order.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

pub const JPEG_MIME: &str = "image/jpeg";
pub const DEFAULT_MAX_WIDTH: u32 = 800;
pub const DEFAULT_QUALITY: u8 = 60;

/// Extensions picked up when a directory is selected.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// A handle to one selected image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub uri: String,
}

impl Asset {
    pub fn new(uri: impl Into<String>) -> Self {
        Asset { uri: uri.into() }
    }
}

/// Failure of the selection step itself.
#[derive(Debug, thiserror::Error)]
pub enum PickError {
    #[error("permission to access photos was denied; allow access in system settings")]
    PermissionDenied,
    #[error("could not open the photo library: {0}")]
    Unavailable(String),
}

/// Failure of a single asset. Recorded and skipped.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("could not read {uri}: {source}")]
    Read { uri: String, source: io::Error },
    #[error("could not decode {uri}: {source}")]
    Decode {
        uri: String,
        source: image::ImageError,
    },
    #[error("could not encode {uri} as JPEG: {source}")]
    Encode {
        uri: String,
        source: image::ImageError,
    },
    #[error("processing {uri} stopped: {reason}")]
    Interrupted { uri: String, reason: String },
}

/// The device capability that yields selected assets.
pub trait MediaPicker {
    fn select(&self) -> Result<Vec<Asset>, PickError>;
}

/// Picks explicit files; directories expand to the images they contain,
/// sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct FilePicker {
    paths: Vec<PathBuf>,
}

impl FilePicker {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        FilePicker {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl MediaPicker for FilePicker {
    fn select(&self) -> Result<Vec<Asset>, PickError> {
        let mut assets = Vec::new();
        for path in &self.paths {
            if !path.is_dir() {
                assets.push(Asset::new(path.to_string_lossy()));
                continue;
            }
            let entries = fs::read_dir(path).map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => PickError::PermissionDenied,
                _ => PickError::Unavailable(format!("{}: {}", path.display(), e)),
            })?;
            let mut found: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && has_image_extension(p))
                .collect();
            found.sort();
            assets.extend(found.iter().map(|p| Asset::new(p.to_string_lossy())));
        }
        Ok(assets)
    }
}

fn has_image_extension(path: &std::path::Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// An asset after resize and re-encode, before it joins a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub source_uri: String,
    /// Base64 of the JPEG bytes
    pub payload: String,
    pub mime: &'static str,
}

impl PendingImage {
    /// `data:image/jpeg;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.payload)
    }
}

/// Resize and compression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePipeline {
    /// Upper bound on output width in pixels
    pub max_width: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
    /// Assets decoded at the same time
    pub max_parallel: usize,
}

impl Default for ImagePipeline {
    fn default() -> Self {
        ImagePipeline {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
            max_parallel: default_parallelism(),
        }
    }
}

/// One decode per available core.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

impl ImagePipeline {
    /// Read, resize, re-encode and base64 one asset.
    pub fn process(&self, asset: &Asset) -> Result<PendingImage, ProcessingError> {
        let bytes = fs::read(&asset.uri).map_err(|e| ProcessingError::Read {
            uri: asset.uri.clone(),
            source: e,
        })?;
        self.process_bytes(&asset.uri, &bytes)
    }

    pub fn process_bytes(&self, uri: &str, bytes: &[u8]) -> Result<PendingImage, ProcessingError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| ProcessingError::Decode {
            uri: uri.to_string(),
            source: e,
        })?;
        let resized = self.bound_width(decoded);

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality.clamp(1, 100))
            .encode_image(&resized.to_rgb8())
            .map_err(|e| ProcessingError::Encode {
                uri: uri.to_string(),
                source: e,
            })?;

        debug!(uri, bytes = jpeg.len(), "encoded image");
        Ok(PendingImage {
            source_uri: uri.to_string(),
            payload: STANDARD.encode(&jpeg),
            mime: JPEG_MIME,
        })
    }

    /// Shrink to `max_width` keeping the aspect ratio. Never upscales.
    fn bound_width(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = (img.width(), img.height());
        if width <= self.max_width || self.max_width == 0 {
            return img;
        }
        let scaled = (u64::from(height) * u64::from(self.max_width) / u64::from(width)).max(1);
        let new_height = u32::try_from(scaled).unwrap_or(u32::MAX);
        img.resize_exact(self.max_width, new_height, FilterType::Lanczos3)
    }
}

/// Result of one ingestion batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Data URIs, in selection order, failed assets skipped
    pub accepted: Vec<String>,
    pub failures: Vec<ProcessingError>,
}

impl IngestReport {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

/// Select assets and process them. A selection failure returns early with
/// nothing processed; per-asset failures land in the report.
pub async fn ingest<P>(picker: &P, pipeline: ImagePipeline) -> Result<IngestReport, PickError>
where
    P: MediaPicker + ?Sized,
{
    let assets = picker.select()?;
    debug!(count = assets.len(), "selected assets");
    Ok(process_assets(assets, pipeline).await)
}

/// Process every asset on the blocking pool, at most
/// `pipeline.max_parallel` at a time, collecting results in input order.
pub async fn process_assets(assets: Vec<Asset>, pipeline: ImagePipeline) -> IngestReport {
    let limit = pipeline.max_parallel;
    process_bounded(assets, limit, move |asset: &Asset| pipeline.process(asset)).await
}

async fn process_bounded<F>(assets: Vec<Asset>, limit: usize, process: F) -> IngestReport
where
    F: Fn(&Asset) -> Result<PendingImage, ProcessingError> + Clone + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = Vec::with_capacity(assets.len());
    for asset in assets {
        let uri = asset.uri.clone();
        // Waits here until a running asset finishes
        let permit = match Arc::clone(&permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                let err = interrupted(&uri, e);
                tasks.push((uri, Err(err)));
                continue;
            }
        };
        let process = process.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            process(&asset)
        });
        tasks.push((uri, Ok(handle)));
    }

    let mut report = IngestReport::default();
    for (uri, task) in tasks {
        let outcome = match task {
            Ok(handle) => handle.await.unwrap_or_else(|e| Err(interrupted(&uri, e))),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(image) => report.accepted.push(image.to_data_uri()),
            Err(err) => {
                warn!(uri = %uri, error = %err, "skipping image");
                report.failures.push(err);
            }
        }
    }
    report
}

fn interrupted(uri: &str, reason: impl std::fmt::Display) -> ProcessingError {
    ProcessingError::Interrupted {
        uri: uri.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> String {
        let path = dir.path().join(name);
        RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]))
            .save(&path)
            .unwrap();
        path.to_string_lossy().into_owned()
    }

    fn decode_data_uri(uri: &str) -> DynamicImage {
        let payload = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap()
    }

    struct DeniedPicker;

    impl MediaPicker for DeniedPicker {
        fn select(&self) -> Result<Vec<Asset>, PickError> {
            Err(PickError::PermissionDenied)
        }
    }

    #[test]
    fn test_wide_images_are_scaled_down() {
        let dir = TempDir::new().unwrap();
        let uri = write_png(&dir, "wide.png", 1600, 400);
        let image = ImagePipeline::default().process(&Asset::new(uri)).unwrap();

        assert_eq!(image.mime, JPEG_MIME);
        let decoded = decode_data_uri(&image.to_data_uri());
        assert_eq!(decoded.dimensions(), (800, 200));
    }

    #[test]
    fn test_small_images_are_not_upscaled() {
        let dir = TempDir::new().unwrap();
        let uri = write_png(&dir, "small.png", 300, 100);
        let image = ImagePipeline::default().process(&Asset::new(uri)).unwrap();
        assert_eq!(decode_data_uri(&image.to_data_uri()).dimensions(), (300, 100));
    }

    #[test]
    fn test_alpha_is_flattened_for_jpeg() {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 128]))
            .write_to(&mut io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let image = ImagePipeline::default().process_bytes("mem.png", &bytes).unwrap();
        assert!(image.to_data_uri().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_corrupt_bytes_fail_with_decode_error() {
        let err = ImagePipeline::default()
            .process_bytes("bad.jpg", b"not an image")
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_one_bad_asset_does_not_sink_the_batch() {
        let dir = TempDir::new().unwrap();
        let first = write_png(&dir, "a.png", 10, 10);
        let corrupt = dir.path().join("b.png");
        fs::write(&corrupt, b"garbage").unwrap();
        let third = write_png(&dir, "c.png", 20, 10);

        let picker = FilePicker::new([
            PathBuf::from(first),
            corrupt,
            PathBuf::from(third),
        ]);
        let report = ingest(&picker, ImagePipeline::default()).await.unwrap();

        assert_eq!(report.accepted.len(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(decode_data_uri(&report.accepted[0]).width(), 10);
        assert_eq!(decode_data_uri(&report.accepted[1]).width(), 20);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_per_asset_failure() {
        let dir = TempDir::new().unwrap();
        let picker = FilePicker::new([dir.path().join("gone.jpg")]);
        let report = ingest(&picker, ImagePipeline::default()).await.unwrap();
        assert!(report.accepted.is_empty());
        assert!(matches!(report.failures[0], ProcessingError::Read { .. }));
    }

    #[tokio::test]
    async fn test_permission_denied_stops_before_processing() {
        let err = ingest(&DeniedPicker, ImagePipeline::default()).await.unwrap_err();
        assert!(matches!(err, PickError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_in_flight_assets_stay_under_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let assets: Vec<Asset> = (0..8).map(|i| Asset::new(format!("asset-{}", i))).collect();

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let report = process_bounded(assets, 2, move |asset: &Asset| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            r.fetch_sub(1, Ordering::SeqCst);
            Ok(PendingImage {
                source_uri: asset.uri.clone(),
                payload: asset.uri.clone(),
                mime: JPEG_MIME,
            })
        })
        .await;

        let max = peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&max), "peak in flight was {}", max);
        assert_eq!(running.load(Ordering::SeqCst), 0);
        let expected: Vec<String> = (0..8)
            .map(|i| format!("data:image/jpeg;base64,asset-{}", i))
            .collect();
        assert_eq!(report.accepted, expected);
    }

    #[tokio::test]
    async fn test_zero_limit_still_makes_progress() {
        let dir = TempDir::new().unwrap();
        let uri = write_png(&dir, "one.png", 8, 8);
        let pipeline = ImagePipeline {
            max_parallel: 0,
            ..ImagePipeline::default()
        };
        let report = process_assets(vec![Asset::new(uri)], pipeline).await;
        assert_eq!(report.accepted.len(), 1);
    }

    #[test]
    fn test_directories_expand_to_sorted_images() {
        let dir = TempDir::new().unwrap();
        write_png(&dir, "b.png", 2, 2);
        write_png(&dir, "a.png", 2, 2);
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let assets = FilePicker::new([dir.path()]).select().unwrap();
        let names: Vec<String> = assets
            .iter()
            .map(|a| PathBuf::from(&a.uri).file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }
}
