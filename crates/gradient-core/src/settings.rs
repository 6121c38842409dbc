use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SettingsError;
use crate::palette::{ColorScheme, Palette};
use crate::params::{ColorPair, COMPLEXITY_RANGE, GRAIN_SCALE_RANGE, NOISE_SCALE_RANGE, SPEED_RANGE};
use crate::share::MAX_SCHEME_KEY_LEN;

/// The subset of the store that survives a restart.
///
/// Every field is optional: on load each one is validated on its own, and a
/// field that fails is dropped (and logged) so the in-memory default wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_custom_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_colors: Option<ColorPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_schemes: Option<Palette>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grain_scale: Option<f32>,
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str, valid: impl Fn(&T) -> bool) -> Option<T> {
    let raw = obj.get(key)?;
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(v) if valid(&v) => Some(v),
        Ok(_) => {
            log::warn!("persisted {key} out of range, using default");
            None
        }
        Err(e) => {
            log::warn!("persisted {key} invalid ({e}), using default");
            None
        }
    }
}

fn in_range(r: std::ops::RangeInclusive<f32>) -> impl Fn(&f32) -> bool {
    move |v| v.is_finite() && r.contains(v)
}

impl PersistedSettings {
    /// Validates a parsed document field by field. Non-objects yield nothing.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            log::warn!("persisted settings are not a JSON object, using defaults");
            return Self::default();
        };

        Self {
            speed: field(obj, "speed", in_range(SPEED_RANGE)),
            complexity: field(obj, "complexity", |c: &u32| COMPLEXITY_RANGE.contains(c)),
            noise_scale: field(obj, "noiseScale", in_range(NOISE_SCALE_RANGE)),
            color_scheme: field(obj, "colorScheme", |k: &String| {
                !k.is_empty() && k.len() <= MAX_SCHEME_KEY_LEN
            }),
            is_custom_mode: field(obj, "isCustomMode", |_: &bool| true),
            custom_colors: field(obj, "customColors", |p: &ColorPair| p.is_valid()),
            color_schemes: schemes(obj),
            grain_scale: field(obj, "grainScale", in_range(GRAIN_SCALE_RANGE)),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// `Ok(None)` when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>, SettingsError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&text).map(Some)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(io_err)?;
        log::debug!("saved settings to {}", path.display());
        Ok(())
    }
}

/// Keeps each valid scheme; drops invalid ones individually.
fn schemes(obj: &Map<String, Value>) -> Option<Palette> {
    let table = obj.get("colorSchemes")?;
    let Some(table) = table.as_object() else {
        log::warn!("persisted colorSchemes is not an object, using default");
        return None;
    };
    let mut palette = Palette::from_schemes(Default::default());
    for (key, raw) in table {
        match serde_json::from_value::<ColorScheme>(raw.clone()) {
            Ok(scheme) if key.len() <= MAX_SCHEME_KEY_LEN && scheme.pair().is_valid() => {
                palette.insert(key.clone(), scheme);
            }
            _ => log::warn!("dropping invalid persisted color scheme {key:?}"),
        }
    }
    Some(palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn valid_document_loads_every_field() {
        let json = r#"{
            "speed": 2.0, "complexity": 5, "noiseScale": 1.5,
            "colorScheme": "neon", "isCustomMode": true,
            "customColors": {"color1": [1, 0, 0], "color2": [0, 1, 0]},
            "colorSchemes": {"custom_1": {"color1": [0.5, 0.5, 0.5], "color2": [0, 0, 0], "name": "Grey"}},
            "grainScale": 800
        }"#;
        let s = PersistedSettings::from_json(json).unwrap();
        assert_eq!(s.speed, Some(2.0));
        assert_eq!(s.complexity, Some(5));
        assert_eq!(s.noise_scale, Some(1.5));
        assert_eq!(s.color_scheme.as_deref(), Some("neon"));
        assert_eq!(s.is_custom_mode, Some(true));
        assert_eq!(s.custom_colors.unwrap().color2, Vec3::Y);
        assert!(s.color_schemes.unwrap().contains("custom_1"));
        assert_eq!(s.grain_scale, Some(800.0));
    }

    #[test]
    fn invalid_fields_fall_back_individually() {
        let json = r#"{
            "speed": 99, "complexity": 2.5, "noiseScale": "big",
            "colorScheme": "redBlue",
            "customColors": {"color1": [2, 0, 0], "color2": [0, 0, 1]},
            "grainScale": 100
        }"#;
        let s = PersistedSettings::from_json(json).unwrap();
        assert_eq!(s.speed, None);
        assert_eq!(s.complexity, None);
        assert_eq!(s.noise_scale, None);
        assert_eq!(s.custom_colors, None);
        assert_eq!(s.color_scheme.as_deref(), Some("redBlue"));
        assert_eq!(s.grain_scale, Some(100.0));
    }

    #[test]
    fn invalid_schemes_are_dropped_one_by_one() {
        let json = r#"{"colorSchemes": {
            "good": {"color1": [0, 0, 0], "color2": [1, 1, 1]},
            "bad": {"color1": [0, 0, 7], "color2": [1, 1, 1]},
            "worse": 3
        }}"#;
        let palette = PersistedSettings::from_json(json).unwrap().color_schemes.unwrap();
        assert!(palette.contains("good"));
        assert_eq!(palette.len(), 1);
    }

    #[test]
    fn non_object_document_is_empty() {
        assert_eq!(PersistedSettings::from_json("[1,2]").unwrap(), PersistedSettings::default());
        assert!(PersistedSettings::from_json("{oops").is_err());
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("gradient-settings-{}", std::process::id()));
        let path = dir.join("nested").join("settings.json");
        let s = PersistedSettings {
            speed: Some(0.5),
            complexity: Some(2),
            color_scheme: Some("greenPurple".into()),
            ..Default::default()
        };
        s.save(&path).unwrap();
        let back = PersistedSettings::load(&path).unwrap().unwrap();
        assert_eq!(back, s);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("gradient-settings-does-not-exist.json");
        assert!(PersistedSettings::load(&path).unwrap().is_none());
    }
}
