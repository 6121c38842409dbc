use glam::Vec3;

use crate::blend::BlendMode;
use crate::clock::{PlayState, Timeline};
use crate::compositor::ShapeSettings;
use crate::layer::{GradientLayer, LayerStack, LayerUpdate, MoveDirection};
use crate::palette::{ColorScheme, Palette, DEFAULT_PAIR, DEFAULT_SCHEME};
use crate::params::{ColorPair, ColorSchemeRef, GradientParameters};
use crate::presets::Preset;
use crate::quality::FramePolicy;
use crate::sampler::{octave_count, FlowSettings};
use crate::settings::PersistedSettings;
use crate::share::ShareableGradient;

// ---------------------------------------------------------------------------
// Frame snapshot
// ---------------------------------------------------------------------------

/// Everything one surface needs to render a frame, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLayer {
    /// Layer id, or `"main"` in single-layer mode.
    pub id: String,
    pub time: f32,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub flow: FlowSettings,
    pub shape: ShapeSettings,
}

impl RenderLayer {
    /// Resolve `params` against `palette` and the device policy.
    pub fn resolve(
        id: impl Into<String>,
        params: &GradientParameters,
        palette: &Palette,
        policy: &FramePolicy,
        time: f32,
    ) -> Self {
        let params = params.sanitized();
        let colors = palette.resolve_ref(&params.colors);
        Self {
            id: id.into(),
            time,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            flow: FlowSettings {
                octaves: octave_count(params.complexity, policy.complexity_cap),
                noise_scale: params.noise_scale,
                flow_intensity: params.flow_intensity,
            },
            shape: ShapeSettings {
                threshold_min: params.threshold_min,
                threshold_max: params.threshold_max,
                color1: colors.color1,
                color2: colors.color2,
                grain_amount: params.grain_amount,
                grain_scale: params.grain_scale,
            },
        }
    }
}

/// Immutable, versioned view of the store handed to the renderer each tick.
/// Layers are bottom first; invisible layers are already gone.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub revision: u64,
    pub layers: Vec<RenderLayer>,
}

pub const MAIN_SURFACE: &str = "main";

// ---------------------------------------------------------------------------
// GradientStore
// ---------------------------------------------------------------------------

/// Owns every editable value. All mutation goes through here and bumps
/// [`GradientStore::revision`].
#[derive(Debug, Clone)]
pub struct GradientStore {
    revision: u64,
    params: GradientParameters,
    color_scheme: String,
    is_custom_mode: bool,
    custom_colors: ColorPair,
    palette: Palette,
    play_state: PlayState,
    multi_layer: bool,
    layers: LayerStack,
    custom_counter: u64,
}

impl Default for GradientStore {
    fn default() -> Self {
        Self {
            revision: 0,
            params: GradientParameters::default(),
            color_scheme: DEFAULT_SCHEME.to_string(),
            is_custom_mode: false,
            custom_colors: DEFAULT_PAIR,
            palette: Palette::default(),
            play_state: PlayState::Playing,
            multi_layer: false,
            layers: LayerStack::new(),
            custom_counter: 0,
        }
    }
}

impl GradientStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn sync_colors(&mut self) {
        self.params.colors = if self.is_custom_mode {
            ColorSchemeRef::Inline(self.custom_colors)
        } else {
            ColorSchemeRef::Named(self.color_scheme.clone())
        };
    }

    // --- read access -------------------------------------------------------

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The global (single-layer) parameters.
    pub fn params(&self) -> &GradientParameters {
        &self.params
    }

    pub fn color_scheme(&self) -> &str {
        &self.color_scheme
    }

    pub fn is_custom_mode(&self) -> bool {
        self.is_custom_mode
    }

    pub fn custom_colors(&self) -> ColorPair {
        self.custom_colors
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn multi_layer_mode(&self) -> bool {
        self.multi_layer
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// The parameter set keyboard edits apply to: the active layer's in
    /// multi-layer mode, the global one otherwise.
    pub fn focused_params(&self) -> &GradientParameters {
        if self.multi_layer {
            if let Some(layer) = self.layers.active() {
                return &layer.params;
            }
        }
        &self.params
    }

    // --- global parameter actions -----------------------------------------

    pub fn set_speed(&mut self, value: f32) {
        self.params.set_speed(value);
        self.touch();
    }

    pub fn set_complexity(&mut self, value: u32) {
        self.params.set_complexity(value);
        self.touch();
    }

    pub fn set_noise_scale(&mut self, value: f32) {
        self.params.set_noise_scale(value);
        self.touch();
    }

    pub fn set_flow_intensity(&mut self, value: f32) {
        self.params.set_flow_intensity(value);
        self.touch();
    }

    pub fn set_grain_amount(&mut self, value: f32) {
        self.params.set_grain_amount(value);
        self.touch();
    }

    pub fn set_grain_scale(&mut self, value: f32) {
        self.params.set_grain_scale(value);
        self.touch();
    }

    pub fn set_threshold_min(&mut self, value: f32) {
        self.params.set_threshold_min(value);
        self.touch();
    }

    pub fn set_threshold_max(&mut self, value: f32) {
        self.params.set_threshold_max(value);
        self.touch();
    }

    pub fn set_color_scheme(&mut self, key: &str) {
        if !self.palette.contains(key) {
            log::warn!("color scheme {key:?} is not in the palette, default colors will be used");
        }
        log::info!("color scheme: {key}");
        self.color_scheme = key.to_string();
        self.sync_colors();
        self.touch();
    }

    /// Selects the scheme after the current one and leaves custom mode.
    /// In multi-layer mode only the active layer changes.
    pub fn next_color_scheme(&mut self) -> String {
        let current = match self.focused_params().colors {
            ColorSchemeRef::Named(ref key) if self.multi_layer => key.clone(),
            _ => self.color_scheme.clone(),
        };
        let next = self
            .palette
            .next_key(&current)
            .unwrap_or(DEFAULT_SCHEME)
            .to_string();
        if self.multi_layer && self.layers.active().is_some() {
            log::info!("layer {} color scheme: {next}", self.layers.active_id());
            let colors = ColorSchemeRef::Named(next.clone());
            self.edit_active_layer(|layer| layer.params.colors = colors);
            return next;
        }
        self.is_custom_mode = false;
        self.set_color_scheme(&next);
        next
    }

    pub fn set_custom_mode(&mut self, on: bool) {
        self.is_custom_mode = on;
        self.sync_colors();
        self.touch();
    }

    pub fn set_custom_color1(&mut self, color: Vec3) {
        self.custom_colors = ColorPair::new(color, self.custom_colors.color2).clamped();
        self.sync_colors();
        self.touch();
    }

    pub fn set_custom_color2(&mut self, color: Vec3) {
        self.custom_colors = ColorPair::new(self.custom_colors.color1, color).clamped();
        self.sync_colors();
        self.touch();
    }

    /// Stores the custom colours as a new palette entry, selects it and
    /// leaves custom mode. Returns the generated key.
    pub fn save_custom_scheme(&mut self, name: &str) -> String {
        let key = loop {
            self.custom_counter += 1;
            let key = format!("custom_{}", self.custom_counter);
            if !self.palette.contains(&key) {
                break key;
            }
        };
        self.palette.insert(
            key.clone(),
            ColorScheme {
                color1: self.custom_colors.color1,
                color2: self.custom_colors.color2,
                name: Some(name.to_string()),
            },
        );
        log::info!("saved custom scheme {key} ({name})");
        self.color_scheme = key.clone();
        self.is_custom_mode = false;
        self.sync_colors();
        self.touch();
        key
    }

    /// Back to first-launch values. The revision keeps counting up.
    pub fn reset_to_defaults(&mut self) {
        let revision = self.revision;
        *self = Self::default();
        self.revision = revision;
        self.touch();
        log::info!("reset to defaults");
    }

    /// Applies to the active layer in multi-layer mode, to the global
    /// settings otherwise.
    pub fn apply_preset(&mut self, preset: Preset) {
        let v = preset.values();
        if self.multi_layer && self.layers.active().is_some() {
            self.edit_active_layer(|layer| {
                layer.params.set_speed(v.speed);
                layer.params.set_complexity(v.complexity);
                layer.params.set_noise_scale(v.noise_scale);
                layer.params.colors = ColorSchemeRef::Named(v.color_scheme.to_string());
            });
            log::info!("preset {} on layer {}", preset.name(), self.layers.active_id());
            return;
        }
        self.params.set_speed(v.speed);
        self.params.set_complexity(v.complexity);
        self.params.set_noise_scale(v.noise_scale);
        self.color_scheme = v.color_scheme.to_string();
        self.is_custom_mode = false;
        self.sync_colors();
        self.touch();
        log::info!("preset: {}", preset.name());
    }

    /// Unknown keys are a no-op.
    pub fn apply_preset_key(&mut self, key: &str) -> bool {
        match Preset::from_key(key) {
            Some(p) => {
                self.apply_preset(p);
                true
            }
            None => {
                log::warn!("unknown preset {key:?}");
                false
            }
        }
    }

    // --- play state --------------------------------------------------------

    pub fn set_playing(&mut self, playing: bool) {
        self.play_state = if playing { PlayState::Playing } else { PlayState::Paused };
        self.touch();
    }

    pub fn toggle_play(&mut self) -> PlayState {
        self.play_state = self.play_state.toggled();
        self.touch();
        self.play_state
    }

    // --- layers ------------------------------------------------------------

    pub fn set_multi_layer_mode(&mut self, on: bool) {
        self.multi_layer = on;
        self.touch();
        log::info!("multi-layer mode {}", if on { "on" } else { "off" });
    }

    pub fn set_active_layer(&mut self, id: &str) -> bool {
        let ok = self.layers.set_active(id);
        self.touch();
        ok
    }

    pub fn cycle_active_layer(&mut self) -> String {
        let id = self.layers.cycle_active().to_string();
        self.touch();
        id
    }

    pub fn add_layer(&mut self) -> String {
        let id = self.layers.add().to_string();
        self.touch();
        id
    }

    pub fn remove_layer(&mut self, id: &str) -> bool {
        let removed = self.layers.remove(id);
        self.touch();
        removed
    }

    pub fn update_layer(&mut self, id: &str, update: LayerUpdate) -> bool {
        let ok = self.layers.update(id, update);
        self.touch();
        ok
    }

    pub fn move_layer(&mut self, id: &str, direction: MoveDirection) -> bool {
        let moved = self.layers.move_layer(id, direction);
        self.touch();
        moved
    }

    /// Edits the active layer in place, if there is one.
    pub fn edit_active_layer(&mut self, f: impl FnOnce(&mut GradientLayer)) {
        if let Some(layer) = self.layers.active_mut() {
            f(layer);
            layer.set_opacity(layer.opacity);
            layer.params = layer.params.sanitized();
        }
        self.touch();
    }

    /// Applies `f` to [`Self::focused_params`] and re-clamps the result.
    pub fn edit_focused(&mut self, f: impl FnOnce(&mut GradientParameters)) {
        if self.multi_layer && self.layers.active().is_some() {
            self.edit_active_layer(|layer| f(&mut layer.params));
            return;
        }
        f(&mut self.params);
        self.params = self.params.sanitized();
        self.sync_colors();
        self.touch();
    }

    // --- import / export ---------------------------------------------------

    pub fn shareable(&self) -> ShareableGradient {
        ShareableGradient {
            speed: self.params.speed,
            complexity: self.params.complexity,
            noise_scale: self.params.noise_scale,
            color_scheme: self.color_scheme.clone(),
            is_custom_mode: self.is_custom_mode,
            custom_colors: self.custom_colors,
            flow_intensity: Some(self.params.flow_intensity),
            grain_amount: Some(self.params.grain_amount),
            grain_scale: Some(self.params.grain_scale),
            threshold_min: Some(self.params.threshold_min),
            threshold_max: Some(self.params.threshold_max),
        }
    }

    /// Applies shared settings, clamping everything into range.
    pub fn import_settings(&mut self, shared: &ShareableGradient) {
        self.params.set_speed(shared.speed);
        self.params.set_complexity(shared.complexity);
        self.params.set_noise_scale(shared.noise_scale);
        if let Some(v) = shared.flow_intensity {
            self.params.set_flow_intensity(v);
        }
        if let Some(v) = shared.grain_amount {
            self.params.set_grain_amount(v);
        }
        if let Some(v) = shared.grain_scale {
            self.params.set_grain_scale(v);
        }
        if let Some(v) = shared.threshold_min {
            self.params.set_threshold_min(v);
        }
        if let Some(v) = shared.threshold_max {
            self.params.set_threshold_max(v);
        }
        self.color_scheme = shared.color_scheme.clone();
        self.is_custom_mode = shared.is_custom_mode;
        self.custom_colors = shared.custom_colors.clamped();
        self.sync_colors();
        self.touch();
        log::info!("imported shared settings");
    }

    pub fn persisted(&self) -> PersistedSettings {
        PersistedSettings {
            speed: Some(self.params.speed),
            complexity: Some(self.params.complexity),
            noise_scale: Some(self.params.noise_scale),
            color_scheme: Some(self.color_scheme.clone()),
            is_custom_mode: Some(self.is_custom_mode),
            custom_colors: Some(self.custom_colors),
            color_schemes: Some(self.palette.clone()),
            grain_scale: Some(self.params.grain_scale),
        }
    }

    /// Overlays whatever survived validation; the rest keeps its current value.
    pub fn apply_persisted(&mut self, saved: &PersistedSettings) {
        if let Some(v) = saved.speed {
            self.params.set_speed(v);
        }
        if let Some(v) = saved.complexity {
            self.params.set_complexity(v);
        }
        if let Some(v) = saved.noise_scale {
            self.params.set_noise_scale(v);
        }
        if let Some(v) = saved.grain_scale {
            self.params.set_grain_scale(v);
        }
        if let Some(schemes) = &saved.color_schemes {
            for key in schemes.keys() {
                if let Some(scheme) = schemes.get(key) {
                    self.palette.insert(key, scheme.clone());
                }
                if let Some(n) = key.strip_prefix("custom_").and_then(|n| n.parse::<u64>().ok()) {
                    self.custom_counter = self.custom_counter.max(n);
                }
            }
        }
        if let Some(key) = &saved.color_scheme {
            self.color_scheme = key.clone();
        }
        if let Some(v) = saved.is_custom_mode {
            self.is_custom_mode = v;
        }
        if let Some(pair) = saved.custom_colors {
            self.custom_colors = pair.clamped();
        }
        self.sync_colors();
        self.touch();
    }

    // --- per-frame ---------------------------------------------------------

    /// `(surface id, speed)` for every clock the timeline should drive.
    pub fn clock_speeds(&self) -> Vec<(&str, f32)> {
        if self.multi_layer {
            self.layers
                .layers()
                .iter()
                .map(|l| (l.id.as_str(), l.params.speed))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Advances `timeline` by one frame using this store's play state and
    /// speeds.
    pub fn tick(&self, timeline: &mut Timeline, dt: f32, policy: &FramePolicy) {
        timeline.set_state(self.play_state);
        timeline.tick(dt, self.params.speed, policy.speed_scale, self.clock_speeds());
    }

    /// Resolves the current state into an immutable frame description.
    pub fn snapshot(&self, policy: &FramePolicy, timeline: &Timeline) -> FrameSnapshot {
        let layers = if self.multi_layer {
            self.layers
                .layers()
                .iter()
                .filter(|l| l.visible)
                .map(|l| {
                    let mut rl = RenderLayer::resolve(
                        l.id.clone(),
                        &l.params,
                        &self.palette,
                        policy,
                        timeline.layer_time(&l.id),
                    );
                    rl.opacity = l.opacity.clamp(0.0, 1.0);
                    rl.blend_mode = l.blend_mode;
                    rl
                })
                .collect()
        } else {
            vec![RenderLayer::resolve(
                MAIN_SURFACE,
                &self.params,
                &self.palette,
                policy,
                timeline.main().elapsed(),
            )]
        };
        FrameSnapshot {
            revision: self.revision,
            layers,
        }
    }
}
