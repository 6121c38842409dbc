use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context};
use gradient_gpu::readback::ReadbackFrame;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    /// `quality` is 1..=100.
    Jpeg { quality: u8 },
}

impl ImageFormat {
    pub fn jpeg(quality: u8) -> Self {
        ImageFormat::Jpeg {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg { .. } => "jpg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    /// `png`, `jpeg`, `jpg`, or `jpeg:<quality>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (name, quality) = match s.split_once(':') {
            Some((name, q)) => {
                let q = q
                    .parse::<u8>()
                    .ok()
                    .filter(|q| (1..=100).contains(q))
                    .ok_or_else(|| format!("invalid jpeg quality {q:?}"))?;
                (name, Some(q))
            }
            None => (s.as_str(), None),
        };
        match (name, quality) {
            ("png", None) => Ok(ImageFormat::Png),
            ("jpeg" | "jpg", q) => Ok(ImageFormat::jpeg(q.unwrap_or(DEFAULT_JPEG_QUALITY))),
            _ => Err(format!("unknown image format {s:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    pub format: ImageFormat,
    /// Supersampling factor over the window size, 1..=4.
    pub scale: u32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            scale: 2,
        }
    }
}

impl ImageOptions {
    /// Export size for a window of `size` pixels.
    pub fn export_size(&self, size: (u32, u32)) -> (u32, u32) {
        let scale = self.scale.clamp(1, 4);
        (size.0.max(1) * scale, size.1.max(1) * scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoSettings {
    pub fps: u32,
    pub seconds: f32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            seconds: 5.0,
        }
    }
}

/// Milliseconds since the Unix epoch, for unique file names.
pub fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

pub fn image_file_name(timestamp_ms: u128, format: ImageFormat) -> String {
    format!("gradient-{timestamp_ms}.{}", format.extension())
}

pub fn frame_file_name(index: u32) -> String {
    format!("frame_{index:06}.png")
}

/// Encode RGBA8 `pixels` to `path`.
pub fn write_image(
    path: &Path,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    format: ImageFormat,
) -> anyhow::Result<()> {
    let img = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("pixel buffer does not match {width}×{height}"))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    match format {
        ImageFormat::Png => img
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("writing {}", path.display()))?,
        ImageFormat::Jpeg { quality } => {
            // JPEG has no alpha channel.
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut out = BufWriter::new(file);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
            rgb.write_with_encoder(encoder)
                .with_context(|| format!("encoding {}", path.display()))?;
        }
    }
    Ok(())
}

enum Pixels {
    Rgba8 { width: u32, height: u32, data: Vec<u8> },
    /// Quantised on the export thread.
    Float(ReadbackFrame),
}

struct ExportJob {
    path: PathBuf,
    pixels: Pixels,
    format: ImageFormat,
}

impl ExportJob {
    fn write(self) -> anyhow::Result<()> {
        let (width, height, data) = match self.pixels {
            Pixels::Rgba8 {
                width,
                height,
                data,
            } => (width, height, data),
            Pixels::Float(frame) => (frame.width, frame.height, frame.to_rgba8()),
        };
        write_image(&self.path, width, height, data, self.format)
    }
}

/// Encodes and writes captured frames on a background thread so the render
/// loop never waits on disk.
pub struct ExportWorker {
    tx: Option<Sender<ExportJob>>,
    handle: Option<JoinHandle<()>>,
}

impl ExportWorker {
    pub fn spawn() -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<ExportJob>();
        let handle = std::thread::Builder::new()
            .name("gradient-export".into())
            .spawn(move || {
                for job in rx {
                    let path = job.path.clone();
                    match job.write() {
                        Ok(()) => log::info!("saved {}", path.display()),
                        Err(e) => log::error!("export failed: {e:#}"),
                    }
                }
            })
            .context("spawning export thread")?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn submit(
        &self,
        path: PathBuf,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        format: ImageFormat,
    ) {
        let pixels = Pixels::Rgba8 {
            width,
            height,
            data: pixels,
        };
        self.send(ExportJob {
            path,
            pixels,
            format,
        });
    }

    /// Queues a read-back frame as PNG.
    pub fn submit_frame(&self, path: PathBuf, frame: ReadbackFrame) {
        self.send(ExportJob {
            path,
            pixels: Pixels::Float(frame),
            format: ImageFormat::Png,
        });
    }

    fn send(&self, job: ExportJob) {
        let sent = self.tx.as_ref().is_some_and(|tx| tx.send(job).is_ok());
        if !sent {
            log::error!("export thread is gone, dropping frame");
        }
    }
}

impl Drop for ExportWorker {
    /// Finishes pending writes before exit.
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("export thread panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Frame-sequence recording
// ---------------------------------------------------------------------------

/// Samples the live composite at a fixed rate for a fixed duration.
/// Wall-clock driven; the animation keeps running while recording.
#[derive(Debug, Clone)]
pub struct VideoCapture {
    dir: PathBuf,
    interval: f32,
    total_frames: u32,
    captured: u32,
    since_last: f32,
}

impl VideoCapture {
    pub fn new(dir: PathBuf, settings: VideoSettings) -> Self {
        let fps = settings.fps.max(1);
        let interval = 1.0 / fps as f32;
        Self {
            dir,
            interval,
            total_frames: ((settings.seconds * fps as f32).round() as u32).max(1),
            captured: 0,
            // first sample on the first frame
            since_last: interval,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn captured(&self) -> u32 {
        self.captured
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn is_finished(&self) -> bool {
        self.captured >= self.total_frames
    }

    /// Advance by `dt` seconds of wall time. Returns the path for the next
    /// sample when one is due. At most one sample per rendered frame.
    pub fn advance(&mut self, dt: f32) -> Option<PathBuf> {
        if self.is_finished() {
            return None;
        }
        self.since_last += dt.max(0.0);
        if self.since_last < self.interval {
            return None;
        }
        self.since_last = (self.since_last - self.interval).min(self.interval);
        let path = self.dir.join(frame_file_name(self.captured));
        self.captured += 1;
        Some(path)
    }

    /// Returns the last sample's slot after it could not be captured, so the
    /// next sample reuses its index and file numbering stays contiguous.
    pub fn give_back(&mut self) {
        self.captured = self.captured.saturating_sub(1);
    }
}
