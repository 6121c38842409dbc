use std::path::PathBuf;

use gradient_core::quality::DeviceQuality;

use crate::export::{ImageFormat, ImageOptions, VideoSettings};

pub const ENV_SETTINGS: &str = "GRADIENT_SETTINGS";
pub const ENV_EXPORT_DIR: &str = "GRADIENT_EXPORT_DIR";
pub const ENV_QUALITY: &str = "GRADIENT_QUALITY";
pub const ENV_LOG: &str = "GRADIENT_LOG";
pub const ENV_VIDEO_FPS: &str = "GRADIENT_VIDEO_FPS";
pub const ENV_VIDEO_SECONDS: &str = "GRADIENT_VIDEO_SECONDS";
pub const ENV_EXPORT_FORMAT: &str = "GRADIENT_EXPORT_FORMAT";
pub const ENV_EXPORT_SCALE: &str = "GRADIENT_EXPORT_SCALE";

/// Runtime configuration for the `gradient` binary.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Initial logical window size.
    pub window_size: (u32, u32),
    pub settings_path: PathBuf,
    pub export_dir: PathBuf,
    /// `None` detects from the host.
    pub quality: Option<DeviceQuality>,
    pub log_filter: Option<String>,
    pub image: ImageOptions,
    pub video: VideoSettings,
    /// Share link, query string or bare value to import on startup.
    pub share_link: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_size: (1280, 720),
            settings_path: PathBuf::from("gradient-settings.json"),
            export_dir: PathBuf::from("exports"),
            quality: None,
            log_filter: None,
            image: ImageOptions::default(),
            video: VideoSettings::default(),
            share_link: None,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment and command line.
    pub fn from_env() -> Self {
        Self::from_sources(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }

    /// Builds the config from an environment lookup and the positional
    /// arguments (program name excluded). Invalid values keep the default
    /// and are reported once logging is up via [`AppConfig::warnings`].
    pub fn from_sources(
        env: impl Fn(&str) -> Option<String>,
        args: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut config = Self::default();

        if let Some(path) = non_empty(env(ENV_SETTINGS)) {
            config.settings_path = PathBuf::from(path);
        }
        if let Some(dir) = non_empty(env(ENV_EXPORT_DIR)) {
            config.export_dir = PathBuf::from(dir);
        }
        config.quality = non_empty(env(ENV_QUALITY)).and_then(|q| q.parse().ok());
        config.log_filter = non_empty(env(ENV_LOG));

        if let Some(fps) = non_empty(env(ENV_VIDEO_FPS)).and_then(|v| parse_fps(&v)) {
            config.video.fps = fps;
        }
        if let Some(secs) = non_empty(env(ENV_VIDEO_SECONDS)).and_then(|v| parse_seconds(&v)) {
            config.video.seconds = secs;
        }
        if let Some(format) = non_empty(env(ENV_EXPORT_FORMAT)).and_then(|v| v.parse().ok()) {
            config.image.format = format;
        }
        if let Some(scale) = non_empty(env(ENV_EXPORT_SCALE)).and_then(|v| parse_scale(&v)) {
            config.image.scale = scale;
        }

        config.share_link = args.into_iter().find(|a| !a.trim().is_empty());
        config
    }

    /// Human-readable notes about environment values that were ignored.
    pub fn warnings(env: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut out = Vec::new();
        let mut check = |key: &str, ok: &dyn Fn(&str) -> bool| {
            if let Some(v) = non_empty(env(key)) {
                if !ok(&v) {
                    out.push(format!("ignoring {key}={v:?}"));
                }
            }
        };
        check(ENV_QUALITY, &|v| v.parse::<DeviceQuality>().is_ok());
        check(ENV_VIDEO_FPS, &|v| parse_fps(v).is_some());
        check(ENV_VIDEO_SECONDS, &|v| parse_seconds(v).is_some());
        check(ENV_EXPORT_FORMAT, &|v| v.parse::<ImageFormat>().is_ok());
        check(ENV_EXPORT_SCALE, &|v| parse_scale(v).is_some());
        out
    }

    pub fn device_quality(&self) -> DeviceQuality {
        self.quality.unwrap_or_else(DeviceQuality::detect)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Video frame rate; only 15, 30 and 60 are offered.
pub fn parse_fps(value: &str) -> Option<u32> {
    match value.trim().parse::<u32>().ok()? {
        fps @ (15 | 30 | 60) => Some(fps),
        _ => None,
    }
}

/// Recording length in seconds, 1 to 60.
pub fn parse_seconds(value: &str) -> Option<f32> {
    let secs = value.trim().parse::<f32>().ok()?;
    (secs.is_finite() && (1.0..=60.0).contains(&secs)).then_some(secs)
}

/// Image export supersampling factor, 1 to 4.
pub fn parse_scale(value: &str) -> Option<u32> {
    let scale = value.trim().parse::<u32>().ok()?;
    (1..=4).contains(&scale).then_some(scale)
}
