use glam::{Vec2, Vec3};

use crate::noise::NoiseField;

/// Saturation boost applied after the colour mix.
pub const VIBRANCE: f32 = 0.2;
/// Display gamma; output is raised to `1 / GAMMA`.
pub const GAMMA: f32 = 2.2;

const LUMA: Vec3 = Vec3::new(0.299, 0.587, 0.114);

/// Cubic Hermite step: 0 at or below `edge0`, 1 at or above `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Pushes saturation while keeping Rec.601 luminance fixed.
#[inline]
pub fn apply_vibrance(color: Vec3, vibrance: f32) -> Vec3 {
    let luminance = color.dot(LUMA);
    Vec3::splat(luminance).lerp(color, 1.0 + vibrance)
}

/// Per-channel `pow(c, 1/gamma)`. Negative channels are floored at zero first.
#[inline]
pub fn gamma_correct(color: Vec3, gamma: f32) -> Vec3 {
    color.max(Vec3::ZERO).powf(1.0 / gamma)
}

/// Everything the compositor needs besides the scalar and the coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeSettings {
    pub threshold_min: f32,
    pub threshold_max: f32,
    pub color1: Vec3,
    pub color2: Vec3,
    pub grain_amount: f32,
    pub grain_scale: f32,
}

/// Maps the flow scalar `s` at `uv` to a final colour in `[0, 1]^3`.
pub fn shade<N: NoiseField>(noise: &N, s: f32, uv: Vec2, settings: &ShapeSettings) -> Vec3 {
    let shape = smoothstep(settings.threshold_min, settings.threshold_max, s);
    let mut color = settings.color1.lerp(settings.color2, shape);

    color = apply_vibrance(color, VIBRANCE);

    // One grain value for all three channels: luminance only, no hue shift.
    let grain = noise.sample(uv * settings.grain_scale) * settings.grain_amount;
    color += Vec3::splat(grain);

    gamma_correct(color, GAMMA).clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::Simplex;

    fn settings() -> ShapeSettings {
        ShapeSettings {
            threshold_min: 0.3,
            threshold_max: 0.7,
            color1: Vec3::new(0.9, 0.1, 0.1),
            color2: Vec3::new(0.0, 0.0, 0.9),
            grain_amount: 0.0,
            grain_scale: 500.0,
        }
    }

    // --- smoothstep -----------------------------------------------------------

    #[test]
    fn smoothstep_hits_its_edges() {
        assert_eq!(smoothstep(0.3, 0.7, 0.3), 0.0);
        assert_eq!(smoothstep(0.3, 0.7, 0.7), 1.0);
        assert_eq!(smoothstep(0.3, 0.7, -5.0), 0.0);
        assert_eq!(smoothstep(0.3, 0.7, 5.0), 1.0);
        assert!((smoothstep(0.3, 0.7, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn smoothstep_is_monotonic() {
        let mut prev = smoothstep(0.2, 0.6, -0.1);
        for k in 0..=1200 {
            let x = -0.1 + k as f32 * 0.001;
            let v = smoothstep(0.2, 0.6, x);
            assert!(v >= prev, "decreased at {x}: {prev} → {v}");
            prev = v;
        }
    }

    // --- vibrance / gamma -----------------------------------------------------

    #[test]
    fn vibrance_preserves_luminance() {
        let c = Vec3::new(0.8, 0.3, 0.1);
        let boosted = apply_vibrance(c, VIBRANCE);
        assert!((boosted.dot(LUMA) - c.dot(LUMA)).abs() < 1e-6);
        // Dominant channel moves further from grey.
        assert!(boosted.x > c.x);
    }

    #[test]
    fn vibrance_leaves_grey_alone() {
        let grey = Vec3::splat(0.4);
        assert!((apply_vibrance(grey, VIBRANCE) - grey).abs().max_element() < 1e-6);
    }

    #[test]
    fn gamma_brightens_midtones_and_floors_negatives() {
        let out = gamma_correct(Vec3::new(0.5, -0.2, 1.0), GAMMA);
        assert!((out.x - 0.5f32.powf(1.0 / 2.2)).abs() < 1e-6);
        assert_eq!(out.y, 0.0);
        assert_eq!(out.z, 1.0);
    }

    // --- shade ----------------------------------------------------------------

    #[test]
    fn shade_below_threshold_is_color1_corrected() {
        let s = settings();
        let got = shade(&Simplex, 0.0, Vec2::new(0.5, 0.5), &s);
        let expected = gamma_correct(apply_vibrance(s.color1, VIBRANCE), GAMMA)
            .clamp(Vec3::ZERO, Vec3::ONE);
        assert!((got - expected).abs().max_element() < 1e-6, "{got} vs {expected}");
    }

    #[test]
    fn shade_above_threshold_is_color2_corrected() {
        let s = settings();
        let got = shade(&Simplex, 1.0, Vec2::new(0.5, 0.5), &s);
        let expected = gamma_correct(apply_vibrance(s.color2, VIBRANCE), GAMMA)
            .clamp(Vec3::ZERO, Vec3::ONE);
        assert!((got - expected).abs().max_element() < 1e-6, "{got} vs {expected}");
    }

    #[test]
    fn shade_output_is_clamped_even_for_wild_inputs() {
        let mut s = settings();
        s.grain_amount = 0.2;
        s.color1 = Vec3::ONE;
        for k in 0..100 {
            let uv = Vec2::new(k as f32 * 0.013, k as f32 * 0.007);
            let c = shade(&Simplex, k as f32 * 0.1 - 3.0, uv, &s);
            assert!(c.min_element() >= 0.0 && c.max_element() <= 1.0, "{c}");
            assert!(c.is_finite(), "{c}");
        }
    }

    #[test]
    fn grain_shifts_all_channels_together() {
        // Mid-grey input: vibrance is a no-op, so only grain moves the channels.
        let mut s = settings();
        s.color1 = Vec3::splat(0.5);
        s.color2 = Vec3::splat(0.5);
        s.grain_amount = 0.1;
        let uv = Vec2::new(0.123, 0.456);
        let c = shade(&Simplex, 0.5, uv, &s);
        assert!((c.x - c.y).abs() < 1e-6 && (c.y - c.z).abs() < 1e-6, "{c}");
    }
}
