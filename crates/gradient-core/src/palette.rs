use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::params::{ColorPair, ColorSchemeRef};

/// Key selected on first launch and used for unknown keys.
pub const DEFAULT_SCHEME: &str = "redBlue";

pub const DEFAULT_PAIR: ColorPair = ColorPair::new(Vec3::new(0.9, 0.1, 0.1), Vec3::new(0.0, 0.0, 0.9));

/// A named entry in the palette table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub color1: Vec3,
    pub color2: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ColorScheme {
    pub fn pair(&self) -> ColorPair {
        ColorPair::new(self.color1, self.color2)
    }
}

/// Shared table of colour schemes, keyed by a stable string.
///
/// Ordered by key so cycling through schemes is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    schemes: BTreeMap<String, ColorScheme>,
}

impl Default for Palette {
    fn default() -> Self {
        let builtin = [
            ("redBlue", DEFAULT_PAIR.color1, DEFAULT_PAIR.color2, "Red & Blue"),
            ("greenPurple", Vec3::new(0.1, 0.9, 0.1), Vec3::new(0.7, 0.0, 0.7), "Green & Purple"),
            ("multiColor", Vec3::new(1.0, 0.2, 0.8), Vec3::new(0.1, 0.9, 1.0), "Multi Color"),
            ("neon", Vec3::new(1.0, 0.6, 0.0), Vec3::new(0.0, 1.0, 1.0), "Neon"),
            ("yellowPink", Vec3::new(1.0, 0.9, 0.1), Vec3::new(1.0, 0.1, 0.5), "Yellow & Pink"),
        ];
        let schemes = builtin
            .into_iter()
            .map(|(key, color1, color2, name)| {
                (
                    key.to_string(),
                    ColorScheme {
                        color1,
                        color2,
                        name: Some(name.to_string()),
                    },
                )
            })
            .collect();
        Self { schemes }
    }
}

impl Palette {
    pub fn from_schemes(schemes: BTreeMap<String, ColorScheme>) -> Self {
        Self { schemes }
    }

    pub fn get(&self, key: &str) -> Option<&ColorScheme> {
        self.schemes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.schemes.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, scheme: ColorScheme) {
        self.schemes.insert(key.into(), scheme);
    }

    /// Concrete colours for `key`, or [`DEFAULT_PAIR`] if the key is unknown.
    pub fn resolve(&self, key: &str) -> ColorPair {
        match self.schemes.get(key) {
            Some(scheme) => scheme.pair(),
            None => {
                log::warn!("unknown color scheme {key:?}, using default colors");
                DEFAULT_PAIR
            }
        }
    }

    pub fn resolve_ref(&self, scheme: &ColorSchemeRef) -> ColorPair {
        match scheme {
            ColorSchemeRef::Inline(pair) => pair.clamped(),
            ColorSchemeRef::Named(key) => self.resolve(key),
        }
    }

    /// The key after `key` in table order, wrapping around.
    pub fn next_key(&self, key: &str) -> Option<&str> {
        let mut keys = self.keys();
        let first = self.keys().next()?;
        while let Some(k) = keys.next() {
            if k == key {
                return Some(keys.next().unwrap_or(first));
            }
        }
        Some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_five_schemes() {
        let p = Palette::default();
        assert_eq!(p.len(), 5);
        for key in ["redBlue", "greenPurple", "multiColor", "neon", "yellowPink"] {
            assert!(p.contains(key), "missing {key}");
        }
    }

    #[test]
    fn resolve_known_key() {
        let p = Palette::default();
        let pair = p.resolve("neon");
        assert_eq!(pair.color1, Vec3::new(1.0, 0.6, 0.0));
        assert_eq!(pair.color2, Vec3::new(0.0, 1.0, 1.0));
    }

    #[test]
    fn unknown_key_falls_back_to_default_pair() {
        let p = Palette::default();
        assert_eq!(p.resolve("doesNotExist"), DEFAULT_PAIR);
        assert_eq!(
            p.resolve_ref(&ColorSchemeRef::Named("nope".into())),
            DEFAULT_PAIR
        );
    }

    #[test]
    fn inline_refs_are_clamped() {
        let p = Palette::default();
        let pair = p.resolve_ref(&ColorSchemeRef::Inline(ColorPair::new(
            Vec3::new(1.5, 0.5, -0.5),
            Vec3::ONE,
        )));
        assert_eq!(pair.color1, Vec3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn next_key_wraps_in_key_order() {
        let p = Palette::default();
        // BTreeMap order: greenPurple, multiColor, neon, redBlue, yellowPink
        assert_eq!(p.next_key("greenPurple"), Some("multiColor"));
        assert_eq!(p.next_key("yellowPink"), Some("greenPurple"));
        assert_eq!(p.next_key("unknown"), Some("greenPurple"));
    }

    #[test]
    fn serializes_as_plain_map() {
        let p = Palette::default();
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("neon").is_some());
        assert_eq!(json["neon"]["name"], "Neon");
        let back: Palette = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
