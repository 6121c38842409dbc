use std::ops::RangeInclusive;

use glam::Vec3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

pub const SPEED_RANGE: RangeInclusive<f32> = 0.1..=3.0;
pub const COMPLEXITY_RANGE: RangeInclusive<u32> = 1..=10;
pub const NOISE_SCALE_RANGE: RangeInclusive<f32> = 0.5..=5.0;
pub const FLOW_INTENSITY_RANGE: RangeInclusive<f32> = 0.1..=1.0;
pub const GRAIN_AMOUNT_RANGE: RangeInclusive<f32> = 0.0..=0.2;
pub const GRAIN_SCALE_RANGE: RangeInclusive<f32> = 1.0..=2000.0;
pub const THRESHOLD_RANGE: RangeInclusive<f32> = 0.1..=0.9;
/// Minimum distance between `threshold_min` and `threshold_max`.
pub const THRESHOLD_GAP: f32 = 0.1;

#[inline]
pub(crate) fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

// ---------------------------------------------------------------------------
// Colours
// ---------------------------------------------------------------------------

/// The two endpoints of the gradient mix. Channels are linear `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPair {
    pub color1: Vec3,
    pub color2: Vec3,
}

impl ColorPair {
    pub const fn new(color1: Vec3, color2: Vec3) -> Self {
        Self { color1, color2 }
    }

    pub fn clamped(self) -> Self {
        let fix = |c: Vec3| {
            let c = Vec3::select(c.cmpeq(c), c, Vec3::ZERO); // NaN → 0
            c.clamp(Vec3::ZERO, Vec3::ONE)
        };
        Self {
            color1: fix(self.color1),
            color2: fix(self.color2),
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.color1, self.color2]
            .iter()
            .all(|c| c.is_finite() && c.min_element() >= 0.0 && c.max_element() <= 1.0)
    }
}

impl Default for ColorPair {
    fn default() -> Self {
        crate::palette::DEFAULT_PAIR
    }
}

/// Where a surface gets its colours: inline, or by key into the palette table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSchemeRef {
    Inline(ColorPair),
    Named(String),
}

impl Default for ColorSchemeRef {
    fn default() -> Self {
        ColorSchemeRef::Named(crate::palette::DEFAULT_SCHEME.to_string())
    }
}

// ---------------------------------------------------------------------------
// GradientParameters
// ---------------------------------------------------------------------------

/// One surface's worth of gradient settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientParameters {
    pub speed: f32,
    pub complexity: u32,
    pub noise_scale: f32,
    pub flow_intensity: f32,
    pub grain_amount: f32,
    pub grain_scale: f32,
    pub threshold_min: f32,
    pub threshold_max: f32,
    pub colors: ColorSchemeRef,
}

impl Default for GradientParameters {
    fn default() -> Self {
        Self {
            speed: 1.0,
            complexity: 3,
            noise_scale: 2.0,
            flow_intensity: 0.3,
            grain_amount: 0.05,
            grain_scale: 500.0,
            threshold_min: 0.3,
            threshold_max: 0.7,
            colors: ColorSchemeRef::default(),
        }
    }
}

impl GradientParameters {
    pub fn set_speed(&mut self, value: f32) {
        self.speed = clamp_to(value, &SPEED_RANGE);
    }

    pub fn set_complexity(&mut self, value: u32) {
        self.complexity = value.clamp(*COMPLEXITY_RANGE.start(), *COMPLEXITY_RANGE.end());
    }

    pub fn set_noise_scale(&mut self, value: f32) {
        self.noise_scale = clamp_to(value, &NOISE_SCALE_RANGE);
    }

    pub fn set_flow_intensity(&mut self, value: f32) {
        self.flow_intensity = clamp_to(value, &FLOW_INTENSITY_RANGE);
    }

    pub fn set_grain_amount(&mut self, value: f32) {
        self.grain_amount = clamp_to(value, &GRAIN_AMOUNT_RANGE);
    }

    pub fn set_grain_scale(&mut self, value: f32) {
        self.grain_scale = clamp_to(value, &GRAIN_SCALE_RANGE);
    }

    /// Moves the lower threshold; pushes the upper one along if the gap
    /// would drop below [`THRESHOLD_GAP`].
    pub fn set_threshold_min(&mut self, value: f32) {
        let hi = *THRESHOLD_RANGE.end() - THRESHOLD_GAP;
        self.threshold_min = clamp_to(value, &(*THRESHOLD_RANGE.start()..=hi));
        if self.threshold_max < self.threshold_min + THRESHOLD_GAP {
            self.threshold_max = self.threshold_min + THRESHOLD_GAP;
        }
    }

    /// Moves the upper threshold; it never goes below `threshold_min + 0.1`.
    pub fn set_threshold_max(&mut self, value: f32) {
        let lo = *THRESHOLD_RANGE.start() + THRESHOLD_GAP;
        let value = clamp_to(value, &(lo..=*THRESHOLD_RANGE.end()));
        self.threshold_max = value.max(self.threshold_min + THRESHOLD_GAP);
    }

    /// Defensive pass over every field, restoring the invariants the core
    /// relies on without rejecting anything.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        out.set_speed(self.speed);
        out.set_complexity(self.complexity);
        out.set_noise_scale(self.noise_scale);
        out.set_flow_intensity(self.flow_intensity);
        out.set_grain_amount(self.grain_amount);
        out.set_grain_scale(self.grain_scale);
        out.threshold_max = *THRESHOLD_RANGE.end();
        out.set_threshold_min(self.threshold_min);
        out.set_threshold_max(self.threshold_max);
        if let ColorSchemeRef::Inline(pair) = &out.colors {
            out.colors = ColorSchemeRef::Inline(pair.clamped());
        }
        out
    }
}
