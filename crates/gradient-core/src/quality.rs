use std::str::FromStr;

use crate::sampler::MAX_OCTAVES;

/// Coarse device performance tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl DeviceQuality {
    /// Tier from the number of logical cores: 8+ high, 4+ medium, else low.
    pub fn from_core_count(cores: usize) -> Self {
        match cores {
            8.. => DeviceQuality::High,
            4..=7 => DeviceQuality::Medium,
            _ => DeviceQuality::Low,
        }
    }

    /// Detect from the host; medium when the core count is unavailable.
    pub fn detect() -> Self {
        match std::thread::available_parallelism() {
            Ok(n) => Self::from_core_count(n.get()),
            Err(e) => {
                log::debug!("core count unavailable ({e}), assuming medium quality");
                DeviceQuality::Medium
            }
        }
    }

    pub fn policy(self) -> FramePolicy {
        match self {
            DeviceQuality::Low => FramePolicy {
                frame_skip: 2,
                complexity_cap: 5,
                pixel_ratio: 1.0,
                speed_scale: 0.8,
            },
            DeviceQuality::Medium => FramePolicy {
                frame_skip: 1,
                complexity_cap: 8,
                pixel_ratio: 1.5,
                speed_scale: 1.0,
            },
            DeviceQuality::High => FramePolicy::default(),
        }
    }
}

impl FromStr for DeviceQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(DeviceQuality::Low),
            "medium" => Ok(DeviceQuality::Medium),
            "high" => Ok(DeviceQuality::High),
            other => Err(format!("unknown quality {other:?} (expected low, medium or high)")),
        }
    }
}

/// Performance knobs the renderer honours each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePolicy {
    /// Frames skipped between rendered frames.
    pub frame_skip: u32,
    /// Upper bound applied to `complexity` before octave counting.
    pub complexity_cap: u32,
    /// Render scale relative to the window's logical size.
    pub pixel_ratio: f32,
    /// Multiplier on clock speed.
    pub speed_scale: f32,
}

impl Default for FramePolicy {
    fn default() -> Self {
        Self {
            frame_skip: 0,
            complexity_cap: MAX_OCTAVES,
            pixel_ratio: 2.0,
            speed_scale: 1.0,
        }
    }
}

impl FramePolicy {
    /// Render target size for a window of `physical` pixels at the given
    /// display `scale_factor`. The effective pixel ratio is capped at
    /// `pixel_ratio`; the result is never larger than the window.
    pub fn render_size(&self, physical: (u32, u32), scale_factor: f64) -> (u32, u32) {
        let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        let factor = (self.pixel_ratio as f64 / scale_factor).min(1.0);
        let scale = |v: u32| ((v as f64 * factor).round() as u32).max(1);
        (scale(physical.0), scale(physical.1))
    }
}

/// Lets one frame in every `frame_skip + 1` through, carrying the deltas of
/// skipped frames so animation speed is unchanged.
#[derive(Debug, Clone, Default)]
pub struct FrameGate {
    counter: u32,
    pending_dt: f32,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the delta to advance by when this frame should render.
    pub fn admit(&mut self, dt: f32, frame_skip: u32) -> Option<f32> {
        self.pending_dt += dt;
        self.counter = (self.counter + 1) % (frame_skip + 1);
        if self.counter != 0 {
            return None;
        }
        Some(std::mem::take(&mut self.pending_dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_from_core_counts() {
        assert_eq!(DeviceQuality::from_core_count(1), DeviceQuality::Low);
        assert_eq!(DeviceQuality::from_core_count(3), DeviceQuality::Low);
        assert_eq!(DeviceQuality::from_core_count(4), DeviceQuality::Medium);
        assert_eq!(DeviceQuality::from_core_count(7), DeviceQuality::Medium);
        assert_eq!(DeviceQuality::from_core_count(8), DeviceQuality::High);
        assert_eq!(DeviceQuality::from_core_count(64), DeviceQuality::High);
    }

    #[test]
    fn policy_knobs_per_tier() {
        let low = DeviceQuality::Low.policy();
        assert_eq!((low.frame_skip, low.complexity_cap), (2, 5));
        assert_eq!(low.speed_scale, 0.8);
        let medium = DeviceQuality::Medium.policy();
        assert_eq!((medium.frame_skip, medium.complexity_cap), (1, 8));
        let high = DeviceQuality::High.policy();
        assert_eq!((high.frame_skip, high.complexity_cap), (0, 10));
        assert_eq!(high.pixel_ratio, 2.0);
    }

    #[test]
    fn render_size_caps_the_pixel_ratio() {
        let low = DeviceQuality::Low.policy();
        // 2x display, low tier renders at 1x.
        assert_eq!(low.render_size((2000, 1000), 2.0), (1000, 500));
        // 1x display is never upscaled.
        assert_eq!(low.render_size((800, 600), 1.0), (800, 600));
        let high = DeviceQuality::High.policy();
        assert_eq!(high.render_size((3000, 1500), 3.0), (2000, 1000));
        assert_eq!(high.render_size((0, 0), 1.0), (1, 1));
    }

    #[test]
    fn parses_quality_names() {
        assert_eq!("LOW".parse::<DeviceQuality>(), Ok(DeviceQuality::Low));
        assert_eq!(" high ".parse::<DeviceQuality>(), Ok(DeviceQuality::High));
        assert!("ultra".parse::<DeviceQuality>().is_err());
    }

    #[test]
    fn gate_without_skip_admits_every_frame() {
        let mut gate = FrameGate::new();
        for _ in 0..5 {
            assert_eq!(gate.admit(0.01, 0), Some(0.01));
        }
    }

    #[test]
    fn gate_carries_skipped_deltas() {
        let mut gate = FrameGate::new();
        assert_eq!(gate.admit(0.01, 2), None);
        assert_eq!(gate.admit(0.01, 2), None);
        let dt = gate.admit(0.01, 2).unwrap();
        assert!((dt - 0.03).abs() < 1e-6);
        assert_eq!(gate.admit(0.01, 2), None);
    }
}
