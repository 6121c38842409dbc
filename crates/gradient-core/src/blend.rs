use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Separable blend modes used when stacking layers.
///
/// Persisted as the camelCase key (`"colorDodge"`); the CSS spelling
/// (`"color-dodge"`) is accepted too. Anything unrecognised reads back as
/// [`BlendMode::Normal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

impl BlendMode {
    pub const ALL: [BlendMode; 12] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
    ];

    pub fn key(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::ColorDodge => "colorDodge",
            BlendMode::ColorBurn => "colorBurn",
            BlendMode::HardLight => "hardLight",
            BlendMode::SoftLight => "softLight",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "Color Dodge",
            BlendMode::ColorBurn => "Color Burn",
            BlendMode::HardLight => "Hard Light",
            BlendMode::SoftLight => "Soft Light",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
        }
    }

    /// Lenient parse; unknown keys fall back to `Normal`.
    pub fn from_key(key: &str) -> Self {
        let folded: String = key
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        BlendMode::ALL
            .into_iter()
            .find(|mode| mode.key().to_ascii_lowercase() == folded)
            .unwrap_or_else(|| {
                log::warn!("unknown blend mode {key:?}, using normal");
                BlendMode::Normal
            })
    }

    /// Shader-side discriminant; must match `composite.wgsl`.
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn next(self) -> Self {
        let i = BlendMode::ALL.iter().position(|&m| m == self).unwrap_or(0);
        BlendMode::ALL[(i + 1) % BlendMode::ALL.len()]
    }

    /// Blend one channel of `src` (the layer) over `dst` (the backdrop).
    #[inline]
    pub fn channel(self, s: f32, d: f32) -> f32 {
        match self {
            BlendMode::Normal => s,
            BlendMode::Multiply => s * d,
            BlendMode::Screen => s + d - s * d,
            BlendMode::Overlay => hard_light(d, s),
            BlendMode::Darken => s.min(d),
            BlendMode::Lighten => s.max(d),
            BlendMode::ColorDodge => {
                if d <= 0.0 {
                    0.0
                } else if s >= 1.0 {
                    1.0
                } else {
                    (d / (1.0 - s)).min(1.0)
                }
            }
            BlendMode::ColorBurn => {
                if d >= 1.0 {
                    1.0
                } else if s <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - d) / s).min(1.0)
                }
            }
            BlendMode::HardLight => hard_light(s, d),
            BlendMode::SoftLight => {
                if s <= 0.5 {
                    d - (1.0 - 2.0 * s) * d * (1.0 - d)
                } else {
                    let g = if d <= 0.25 {
                        ((16.0 * d - 12.0) * d + 4.0) * d
                    } else {
                        d.sqrt()
                    };
                    d + (2.0 * s - 1.0) * (g - d)
                }
            }
            BlendMode::Difference => (d - s).abs(),
            BlendMode::Exclusion => d + s - 2.0 * d * s,
        }
    }

    #[inline]
    pub fn blend(self, src: Vec3, dst: Vec3) -> Vec3 {
        Vec3::new(
            self.channel(src.x, dst.x),
            self.channel(src.y, dst.y),
            self.channel(src.z, dst.z),
        )
    }

    /// Blend `src` onto `dst`, then mix by `opacity` (straight alpha over).
    #[inline]
    pub fn composite(self, src: Vec3, dst: Vec3, opacity: f32) -> Vec3 {
        dst.lerp(self.blend(src, dst), opacity.clamp(0.0, 1.0))
    }
}

#[inline]
fn hard_light(s: f32, d: f32) -> f32 {
    if s <= 0.5 {
        2.0 * s * d
    } else {
        1.0 - 2.0 * (1.0 - s) * (1.0 - d)
    }
}

impl Serialize for BlendMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for BlendMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(BlendMode::from_key(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [f32; 5] = [0.0, 0.2, 0.5, 0.8, 1.0];

    #[test]
    fn keys_round_trip() {
        for mode in BlendMode::ALL {
            assert_eq!(BlendMode::from_key(mode.key()), mode);
        }
    }

    #[test]
    fn css_spelling_is_accepted() {
        assert_eq!(BlendMode::from_key("color-dodge"), BlendMode::ColorDodge);
        assert_eq!(BlendMode::from_key("soft-light"), BlendMode::SoftLight);
        assert_eq!(BlendMode::from_key("HARD-LIGHT"), BlendMode::HardLight);
    }

    #[test]
    fn unknown_key_falls_back_to_normal() {
        assert_eq!(BlendMode::from_key("luminosity"), BlendMode::Normal);
        assert_eq!(BlendMode::from_key(""), BlendMode::Normal);
    }

    #[test]
    fn serde_uses_keys_and_tolerates_unknowns() {
        let json = serde_json::to_string(&BlendMode::ColorBurn).unwrap();
        assert_eq!(json, "\"colorBurn\"");
        let back: BlendMode = serde_json::from_str("\"color-burn\"").unwrap();
        assert_eq!(back, BlendMode::ColorBurn);
        let unknown: BlendMode = serde_json::from_str("\"hue\"").unwrap();
        assert_eq!(unknown, BlendMode::Normal);
    }

    #[test]
    fn indices_are_dense_and_ordered() {
        for (i, mode) in BlendMode::ALL.iter().enumerate() {
            assert_eq!(mode.index() as usize, i);
        }
    }

    #[test]
    fn next_cycles_through_all_modes() {
        let mut mode = BlendMode::Normal;
        for _ in 0..BlendMode::ALL.len() {
            mode = mode.next();
        }
        assert_eq!(mode, BlendMode::Normal);
    }

    #[test]
    fn every_mode_stays_in_unit_range() {
        for mode in BlendMode::ALL {
            for &s in &SAMPLES {
                for &d in &SAMPLES {
                    let v = mode.channel(s, d);
                    assert!((0.0..=1.0).contains(&v), "{mode:?}({s}, {d}) = {v}");
                }
            }
        }
    }

    #[test]
    fn reference_values() {
        assert_eq!(BlendMode::Multiply.channel(0.5, 0.5), 0.25);
        assert_eq!(BlendMode::Screen.channel(0.5, 0.5), 0.75);
        assert_eq!(BlendMode::Darken.channel(0.2, 0.8), 0.2);
        assert_eq!(BlendMode::Lighten.channel(0.2, 0.8), 0.8);
        assert!((BlendMode::Difference.channel(0.2, 0.8) - 0.6).abs() < 1e-6);
        assert_eq!(BlendMode::Exclusion.channel(0.5, 0.5), 0.5);
        assert_eq!(BlendMode::Overlay.channel(1.0, 0.25), 0.5);
        assert_eq!(BlendMode::HardLight.channel(0.25, 1.0), 0.5);
        assert_eq!(BlendMode::ColorDodge.channel(0.5, 0.25), 0.5);
        assert_eq!(BlendMode::ColorBurn.channel(0.5, 0.75), 0.5);
        assert_eq!(BlendMode::SoftLight.channel(0.5, 0.3), 0.3);
    }

    #[test]
    fn composite_respects_opacity() {
        let src = Vec3::new(1.0, 0.0, 0.0);
        let dst = Vec3::new(0.0, 0.0, 1.0);
        assert_eq!(BlendMode::Normal.composite(src, dst, 1.0), src);
        assert_eq!(BlendMode::Normal.composite(src, dst, 0.0), dst);
        let half = BlendMode::Normal.composite(src, dst, 0.5);
        assert!((half - Vec3::new(0.5, 0.0, 0.5)).abs().max_element() < 1e-6);
    }

    #[test]
    fn screen_is_inverse_multiply_of_inverses() {
        for &s in &SAMPLES {
            for &d in &SAMPLES {
                let screen = BlendMode::Screen.channel(s, d);
                let via_multiply = 1.0 - BlendMode::Multiply.channel(1.0 - s, 1.0 - d);
                assert!((screen - via_multiply).abs() < 1e-6);
            }
        }
    }
}
