//! Shareable gradient links.
//!
//! Settings travel as JSON, percent-encoded into a `gradient` query
//! parameter. Parsing is total: anything oversized, malformed or out of range
//! yields `None` and a warning in the log.

use serde::{Deserialize, Deserializer, Serialize};

use crate::params::{
    ColorPair, COMPLEXITY_RANGE, FLOW_INTENSITY_RANGE, GRAIN_AMOUNT_RANGE, GRAIN_SCALE_RANGE,
    NOISE_SCALE_RANGE, SPEED_RANGE, THRESHOLD_RANGE,
};

/// Query parameter carrying the payload.
pub const QUERY_KEY: &str = "gradient";
/// Largest accepted payload, before or after decoding.
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024;
/// Longest accepted colour-scheme key.
pub const MAX_SCHEME_KEY_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareableGradient {
    pub speed: f32,
    #[serde(deserialize_with = "rounded_u32")]
    pub complexity: u32,
    pub noise_scale: f32,
    pub color_scheme: String,
    pub is_custom_mode: bool,
    pub custom_colors: ColorPair,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grain_amount: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grain_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_min: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_max: Option<f32>,
}

/// Accepts `3` as well as `3.0` or `2.6`; rejects negatives and non-numbers.
fn rounded_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 || raw > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!("complexity {raw} out of range")));
    }
    Ok(raw.round() as u32)
}

impl ShareableGradient {
    /// The percent-encoded value of the `gradient` parameter.
    pub fn encode(&self) -> String {
        // Serialising plain numbers, strings and bools cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        percent_encode(&json)
    }

    /// `gradient=<encoded>`, ready to append after `?`.
    pub fn to_query(&self) -> String {
        format!("{QUERY_KEY}={}", self.encode())
    }

    /// `base?gradient=<encoded>`, replacing any query already on `base`.
    pub fn share_url(&self, base: &str) -> String {
        let base = base.split(['?', '#']).next().unwrap_or(base);
        format!("{base}?{}", self.to_query())
    }

    /// Reads a full URL, a bare query string or just the encoded value.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.len() > MAX_PAYLOAD_BYTES {
            log::warn!("share payload too large ({} bytes)", input.len());
            return None;
        }

        let raw = extract_value(input)?;
        let decoded = match percent_decode(raw) {
            Some(d) => d,
            None => {
                log::warn!("share payload is not valid percent-encoded UTF-8");
                return None;
            }
        };
        if decoded.len() > MAX_PAYLOAD_BYTES {
            log::warn!("decoded share payload too large ({} bytes)", decoded.len());
            return None;
        }

        let parsed: ShareableGradient = match serde_json::from_str(&decoded) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("malformed share payload: {e}");
                return None;
            }
        };
        if let Err(field) = parsed.validate() {
            log::warn!("share payload rejected: {field} out of range");
            return None;
        }
        Some(parsed)
    }

    /// Names the first field that is missing its range.
    pub fn validate(&self) -> Result<(), &'static str> {
        fn check(v: f32, r: &std::ops::RangeInclusive<f32>) -> bool {
            v.is_finite() && r.contains(&v)
        }
        fn check_opt(v: Option<f32>, r: &std::ops::RangeInclusive<f32>) -> bool {
            v.map_or(true, |v| check(v, r))
        }

        if !check(self.speed, &SPEED_RANGE) {
            return Err("speed");
        }
        if !COMPLEXITY_RANGE.contains(&self.complexity) {
            return Err("complexity");
        }
        if !check(self.noise_scale, &NOISE_SCALE_RANGE) {
            return Err("noiseScale");
        }
        if self.color_scheme.is_empty() || self.color_scheme.len() > MAX_SCHEME_KEY_LEN {
            return Err("colorScheme");
        }
        if !self.custom_colors.is_valid() {
            return Err("customColors");
        }
        if !check_opt(self.flow_intensity, &FLOW_INTENSITY_RANGE) {
            return Err("flowIntensity");
        }
        if !check_opt(self.grain_amount, &GRAIN_AMOUNT_RANGE) {
            return Err("grainAmount");
        }
        if !check_opt(self.grain_scale, &GRAIN_SCALE_RANGE) {
            return Err("grainScale");
        }
        if !check_opt(self.threshold_min, &THRESHOLD_RANGE) {
            return Err("thresholdMin");
        }
        if !check_opt(self.threshold_max, &THRESHOLD_RANGE) {
            return Err("thresholdMax");
        }
        Ok(())
    }
}

/// Finds the raw `gradient` value in a URL or query string. Input that looks
/// like a bare JSON object (encoded or not) is returned as is.
fn extract_value(input: &str) -> Option<&str> {
    if input.starts_with('{') || input.starts_with("%7B") || input.starts_with("%7b") {
        return Some(input);
    }
    let query = match input.split_once('?') {
        Some((_, q)) => q,
        None => input,
    };
    let query = query.split('#').next().unwrap_or(query);
    let value = query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == QUERY_KEY).then_some(value)
    });
    if value.is_none() {
        log::warn!("no {QUERY_KEY:?} parameter in share link");
    }
    value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Percent encoding (URI component rules)
// ---------------------------------------------------------------------------

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&b)
}

pub fn percent_encode(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len() * 3);
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
    }
    out
}

/// Inverse of [`percent_encode`]; `+` reads as a space as in form queries.
pub fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)?;
                let hex = std::str::from_utf8(hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}
