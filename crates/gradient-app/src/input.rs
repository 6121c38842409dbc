use std::ops::RangeInclusive;

use gradient_core::layer::MoveDirection;
use gradient_core::params::GradientParameters;
use gradient_core::presets::Preset;

// ---------------------------------------------------------------------------
// Key: windowing-library-independent key representation
// ---------------------------------------------------------------------------

/// A keyboard key, independent of any windowing library.
///
/// `main.rs` maps `winit::keyboard::PhysicalKey` → `Key`; everything else
/// in the input pipeline works purely with this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Tab,
    Equal,
    Minus,
    BracketRight,
    BracketLeft,
    Period,
    Comma,
    B,
    C,
    F,
    G,
    H,
    K,
    L,
    M,
    N,
    P,
    Q,
    R,
    S,
    V,
    Delete,
    PageUp,
    PageDown,
    F5,
    Escape,
}

// ---------------------------------------------------------------------------
// InputAction: what the app does in response to input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    TogglePlay,
    LoadPreset(Preset),
    CycleNextPreset,
    NextColorScheme,
    ComplexityUp,
    ComplexityDown,
    NoiseScaleUp,
    NoiseScaleDown,
    SpeedUp,
    SpeedDown,
    FlowUp,
    FlowDown,
    ToggleGrain,
    ToggleMultiLayer,
    AddLayer,
    RemoveLayer,
    MoveLayer(MoveDirection),
    NextLayer,
    NextBlendMode,
    ToggleLayerVisibility,
    ExportImage,
    ToggleRecording,
    Share,
    Reset,
    Retry,
    Quit,
}

// ---------------------------------------------------------------------------
// InputState
// ---------------------------------------------------------------------------

pub struct InputState;

impl InputState {
    pub fn new() -> Self {
        Self
    }

    /// Translate a `Key` press into an `InputAction`.
    pub fn on_key(&self, key: Key) -> Option<InputAction> {
        let action = match key {
            Key::Space => InputAction::TogglePlay,
            Key::Digit1 => InputAction::LoadPreset(Preset::ALL[0]),
            Key::Digit2 => InputAction::LoadPreset(Preset::ALL[1]),
            Key::Digit3 => InputAction::LoadPreset(Preset::ALL[2]),
            Key::Digit4 => InputAction::LoadPreset(Preset::ALL[3]),
            Key::Digit5 => InputAction::LoadPreset(Preset::ALL[4]),
            Key::Digit6 => InputAction::LoadPreset(Preset::ALL[5]),
            Key::Digit7 => InputAction::LoadPreset(Preset::ALL[6]),
            Key::Digit8 => InputAction::LoadPreset(Preset::ALL[7]),
            Key::Tab => InputAction::CycleNextPreset,
            Key::C => InputAction::NextColorScheme,
            Key::Equal => InputAction::ComplexityUp,
            Key::Minus => InputAction::ComplexityDown,
            Key::BracketRight => InputAction::NoiseScaleUp,
            Key::BracketLeft => InputAction::NoiseScaleDown,
            Key::Period => InputAction::SpeedUp,
            Key::Comma => InputAction::SpeedDown,
            Key::F => InputAction::FlowUp,
            Key::G => InputAction::FlowDown,
            Key::K => InputAction::ToggleGrain,
            Key::M => InputAction::ToggleMultiLayer,
            Key::N => InputAction::AddLayer,
            Key::Delete => InputAction::RemoveLayer,
            Key::PageUp => InputAction::MoveLayer(MoveDirection::Up),
            Key::PageDown => InputAction::MoveLayer(MoveDirection::Down),
            Key::L => InputAction::NextLayer,
            Key::B => InputAction::NextBlendMode,
            Key::H => InputAction::ToggleLayerVisibility,
            Key::P => InputAction::ExportImage,
            Key::V => InputAction::ToggleRecording,
            Key::S => InputAction::Share,
            Key::R => InputAction::Reset,
            Key::F5 => InputAction::Retry,
            Key::Q | Key::Escape => InputAction::Quit,
        };
        Some(action)
    }
}

// ---------------------------------------------------------------------------
// Parameter nudges (pure, testable)
// ---------------------------------------------------------------------------

pub const SPEED_STEP: f32 = 0.1;
pub const NOISE_SCALE_STEP: f32 = 0.25;
pub const FLOW_STEP: f32 = 0.1;

/// `value + delta`, clamped to `range` and rounded to two decimals so
/// repeated nudges don't drift.
pub fn nudge(value: f32, delta: f32, range: &RangeInclusive<f32>) -> f32 {
    let v = ((value + delta) * 100.0).round() / 100.0;
    v.clamp(*range.start(), *range.end())
}

/// Grain on/off: zero when on, the default amount when off.
pub fn toggled_grain(amount: f32) -> f32 {
    if amount > 0.0 {
        0.0
    } else {
        GradientParameters::default().grain_amount
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gradient_core::params::{FLOW_INTENSITY_RANGE, NOISE_SCALE_RANGE, SPEED_RANGE};

    fn input() -> InputState {
        InputState::new()
    }

    // --- Digit keys load the presets in order ---------------------------------

    #[test]
    fn digit_1_loads_calm() {
        assert_eq!(
            input().on_key(Key::Digit1),
            Some(InputAction::LoadPreset(Preset::Calm))
        );
    }

    #[test]
    fn digit_8_loads_lava() {
        assert_eq!(
            input().on_key(Key::Digit8),
            Some(InputAction::LoadPreset(Preset::Lava))
        );
    }

    #[test]
    fn all_digit_keys_map_to_different_presets() {
        let presets: Vec<_> = [
            Key::Digit1,
            Key::Digit2,
            Key::Digit3,
            Key::Digit4,
            Key::Digit5,
            Key::Digit6,
            Key::Digit7,
            Key::Digit8,
        ]
        .iter()
        .map(|&k| input().on_key(k))
        .collect();

        for i in 0..presets.len() {
            for j in (i + 1)..presets.len() {
                assert_ne!(presets[i], presets[j], "keys {i} and {j} collide");
            }
        }
    }

    // --- Other key mappings ---------------------------------------------------

    #[test]
    fn space_toggles_play() {
        assert_eq!(input().on_key(Key::Space), Some(InputAction::TogglePlay));
    }

    #[test]
    fn tab_cycles_next_preset() {
        assert_eq!(input().on_key(Key::Tab), Some(InputAction::CycleNextPreset));
    }

    #[test]
    fn c_cycles_color_scheme() {
        assert_eq!(input().on_key(Key::C), Some(InputAction::NextColorScheme));
    }

    #[test]
    fn equal_and_minus_change_complexity() {
        assert_eq!(input().on_key(Key::Equal), Some(InputAction::ComplexityUp));
        assert_eq!(input().on_key(Key::Minus), Some(InputAction::ComplexityDown));
    }

    #[test]
    fn brackets_change_noise_scale() {
        assert_eq!(
            input().on_key(Key::BracketRight),
            Some(InputAction::NoiseScaleUp)
        );
        assert_eq!(
            input().on_key(Key::BracketLeft),
            Some(InputAction::NoiseScaleDown)
        );
    }

    #[test]
    fn period_and_comma_change_speed() {
        assert_eq!(input().on_key(Key::Period), Some(InputAction::SpeedUp));
        assert_eq!(input().on_key(Key::Comma), Some(InputAction::SpeedDown));
    }

    #[test]
    fn f_and_g_change_flow() {
        assert_eq!(input().on_key(Key::F), Some(InputAction::FlowUp));
        assert_eq!(input().on_key(Key::G), Some(InputAction::FlowDown));
    }

    #[test]
    fn k_toggles_grain() {
        assert_eq!(input().on_key(Key::K), Some(InputAction::ToggleGrain));
    }

    #[test]
    fn layer_keys() {
        assert_eq!(input().on_key(Key::M), Some(InputAction::ToggleMultiLayer));
        assert_eq!(input().on_key(Key::N), Some(InputAction::AddLayer));
        assert_eq!(input().on_key(Key::Delete), Some(InputAction::RemoveLayer));
        assert_eq!(input().on_key(Key::L), Some(InputAction::NextLayer));
        assert_eq!(input().on_key(Key::B), Some(InputAction::NextBlendMode));
        assert_eq!(
            input().on_key(Key::H),
            Some(InputAction::ToggleLayerVisibility)
        );
    }

    #[test]
    fn page_keys_move_the_active_layer() {
        assert_eq!(
            input().on_key(Key::PageUp),
            Some(InputAction::MoveLayer(MoveDirection::Up))
        );
        assert_eq!(
            input().on_key(Key::PageDown),
            Some(InputAction::MoveLayer(MoveDirection::Down))
        );
    }

    #[test]
    fn capture_and_share_keys() {
        assert_eq!(input().on_key(Key::P), Some(InputAction::ExportImage));
        assert_eq!(input().on_key(Key::V), Some(InputAction::ToggleRecording));
        assert_eq!(input().on_key(Key::S), Some(InputAction::Share));
    }

    #[test]
    fn r_resets() {
        assert_eq!(input().on_key(Key::R), Some(InputAction::Reset));
    }

    #[test]
    fn f5_retries() {
        assert_eq!(input().on_key(Key::F5), Some(InputAction::Retry));
    }

    #[test]
    fn q_quits() {
        assert_eq!(input().on_key(Key::Q), Some(InputAction::Quit));
    }

    #[test]
    fn escape_quits() {
        assert_eq!(input().on_key(Key::Escape), Some(InputAction::Quit));
    }

    // --- Nudges ---------------------------------------------------------------

    #[test]
    fn nudge_clamps_to_range() {
        assert!((nudge(2.95, SPEED_STEP, &SPEED_RANGE) - 3.0).abs() < 1e-6);
        assert!((nudge(0.1, -SPEED_STEP, &SPEED_RANGE) - 0.1).abs() < 1e-6);
        assert!((nudge(5.0, NOISE_SCALE_STEP, &NOISE_SCALE_RANGE) - 5.0).abs() < 1e-6);
        assert!((nudge(0.3, -FLOW_STEP, &FLOW_INTENSITY_RANGE) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn repeated_nudges_do_not_drift() {
        let mut v = 1.0;
        for _ in 0..7 {
            v = nudge(v, SPEED_STEP, &SPEED_RANGE);
        }
        assert_eq!(v, 1.7);
    }

    #[test]
    fn grain_toggle_round_trips_to_default() {
        let default = GradientParameters::default().grain_amount;
        assert_eq!(toggled_grain(default), 0.0);
        assert_eq!(toggled_grain(0.0), default);
        assert_eq!(toggled_grain(0.13), 0.0);
    }
}
