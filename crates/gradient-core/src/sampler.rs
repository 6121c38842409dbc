use glam::Vec2;

use crate::noise::{NoiseField, Simplex};

/// Hard ceiling on the number of octaves, whatever the complexity.
pub const MAX_OCTAVES: u32 = 10;

/// Clock time is halved before it reaches the octave phases.
pub const TIME_SCALE: f32 = 0.5;

/// Number of octaves summed for a given complexity.
///
/// `complexity` is first limited to `complexity_cap` (a device policy knob,
/// itself never above 10), then scaled by 1.5 and rounded.
pub fn octave_count(complexity: u32, complexity_cap: u32) -> u32 {
    let complexity = complexity.clamp(1, complexity_cap.clamp(1, MAX_OCTAVES));
    ((complexity as f32 * 1.5).round() as u32).clamp(1, MAX_OCTAVES)
}

/// The inputs of the layered flow field that stay fixed across a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSettings {
    pub octaves: u32,
    pub noise_scale: f32,
    pub flow_intensity: f32,
}

/// Sums curl-advected octaves of a [`NoiseField`] into one scalar.
#[derive(Debug, Clone, Default)]
pub struct LayeredFlowSampler<N = Simplex> {
    noise: N,
}

impl<N: NoiseField> LayeredFlowSampler<N> {
    pub fn new(noise: N) -> Self {
        Self { noise }
    }

    pub fn noise(&self) -> &N {
        &self.noise
    }

    /// Normalised scalar for `uv` at clock time `time`.
    ///
    /// Roughly in `[0, 1]` but deliberately unclamped: the raw sum can reach
    /// `±Σ 1/i` before the `* 0.5 + 0.5` remap.
    pub fn sample(&self, uv: Vec2, time: f32, settings: &FlowSettings) -> f32 {
        let time = time * TIME_SCALE;
        let octaves = settings.octaves.min(MAX_OCTAVES);
        let mut sum = 0.0;

        for octave in 1..=MAX_OCTAVES {
            if octave > octaves {
                break;
            }
            let i = octave as f32;
            let freq = i * settings.noise_scale;

            let flow = self.noise.curl(uv * freq) * settings.flow_intensity;
            // Each octave drifts with its own phase so they never pulse in step.
            let animated = uv + flow * ((time * i * 0.5).sin() * 0.2);
            let layer = self.noise.sample(animated * freq + Vec2::splat(time * i * 0.3));

            sum += layer * (1.0 / i);
        }

        sum * 0.5 + 0.5
    }
}
