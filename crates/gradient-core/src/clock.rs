use std::collections::HashMap;

/// The single play/pause signal every clock observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Playing,
    Paused,
}

impl PlayState {
    pub fn is_playing(self) -> bool {
        self == PlayState::Playing
    }

    pub fn toggled(self) -> Self {
        match self {
            PlayState::Playing => PlayState::Paused,
            PlayState::Paused => PlayState::Playing,
        }
    }
}

// ---------------------------------------------------------------------------
// AnimationClock
// ---------------------------------------------------------------------------

/// Accumulated animation time for one surface.
///
/// Time only moves forward, and only while the shared [`PlayState`] says
/// `Playing`. A paused clock keeps reporting its last value so the surface
/// is still re-rendered with live parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClock {
    elapsed: f32,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance by one frame. `speed_scale` is the device policy knob
    /// (1.0 normally, lower on constrained devices).
    pub fn tick(&mut self, dt: f32, speed: f32, speed_scale: f32, state: PlayState) {
        if !state.is_playing() {
            return;
        }
        let step = dt * speed * speed_scale;
        if step.is_finite() && step > 0.0 {
            self.elapsed += step;
        }
    }
}

// ---------------------------------------------------------------------------
// Timeline: one clock per surface, one shared play state
// ---------------------------------------------------------------------------

/// Owns the main clock plus one clock per layer id.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    state: PlayState,
    main: AnimationClock,
    /// Layer clocks, each stamped with the last tick that saw its id.
    layers: HashMap<String, (AnimationClock, u64)>,
    ticks: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn set_state(&mut self, state: PlayState) {
        if self.state != state {
            log::info!("animation {:?}", state);
        }
        self.state = state;
    }

    pub fn toggle(&mut self) -> PlayState {
        self.set_state(self.state.toggled());
        self.state
    }

    pub fn main(&self) -> &AnimationClock {
        &self.main
    }

    pub fn layer_time(&self, id: &str) -> f32 {
        self.layers.get(id).map_or(0.0, |(clock, _)| clock.elapsed())
    }

    /// Advance the main clock and every layer clock in `layers`
    /// (`(id, speed)` pairs). Clocks for ids no longer present are dropped,
    /// new ids start from zero.
    pub fn tick<'a>(
        &mut self,
        dt: f32,
        main_speed: f32,
        speed_scale: f32,
        layers: impl IntoIterator<Item = (&'a str, f32)>,
    ) {
        let state = self.state;
        self.main.tick(dt, main_speed, speed_scale, state);

        self.ticks += 1;
        let tick = self.ticks;
        for (id, speed) in layers {
            if let Some((clock, seen)) = self.layers.get_mut(id) {
                clock.tick(dt, speed, speed_scale, state);
                *seen = tick;
            } else {
                let mut clock = AnimationClock::new();
                clock.tick(dt, speed, speed_scale, state);
                self.layers.insert(id.to_string(), (clock, tick));
            }
        }
        self.layers.retain(|_, (_, seen)| *seen == tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn clock_starts_at_zero_and_playing() {
        let t = Timeline::new();
        assert_eq!(t.main().elapsed(), 0.0);
        assert_eq!(t.state(), PlayState::Playing);
    }

    #[test]
    fn clock_advances_by_dt_times_speed() {
        let mut c = AnimationClock::new();
        c.tick(0.5, 2.0, 1.0, PlayState::Playing);
        assert!((c.elapsed() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn constrained_policy_scales_time() {
        let mut c = AnimationClock::new();
        c.tick(1.0, 1.0, 0.8, PlayState::Playing);
        assert!((c.elapsed() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn paused_clock_is_frozen() {
        let mut c = AnimationClock::new();
        c.tick(DT, 1.0, 1.0, PlayState::Playing);
        let before = c.elapsed();
        for _ in 0..10 {
            c.tick(DT, 1.0, 1.0, PlayState::Paused);
        }
        assert_eq!(c.elapsed().to_bits(), before.to_bits());
    }

    #[test]
    fn time_never_goes_backwards() {
        let mut c = AnimationClock::new();
        c.tick(1.0, 1.0, 1.0, PlayState::Playing);
        c.tick(-5.0, 1.0, 1.0, PlayState::Playing);
        c.tick(f32::NAN, 1.0, 1.0, PlayState::Playing);
        c.tick(f32::INFINITY, 1.0, 1.0, PlayState::Playing);
        assert_eq!(c.elapsed(), 1.0);
    }

    #[test]
    fn toggle_flips_state() {
        let mut t = Timeline::new();
        assert_eq!(t.toggle(), PlayState::Paused);
        assert_eq!(t.toggle(), PlayState::Playing);
    }

    #[test]
    fn layer_clocks_are_independent() {
        let mut t = Timeline::new();
        t.tick(1.0, 1.0, 1.0, [("a", 1.0), ("b", 2.0)]);
        assert!((t.layer_time("a") - 1.0).abs() < 1e-6);
        assert!((t.layer_time("b") - 2.0).abs() < 1e-6);

        // A layer added later starts from zero.
        t.tick(1.0, 1.0, 1.0, [("a", 1.0), ("b", 2.0), ("c", 1.0)]);
        assert!((t.layer_time("a") - 2.0).abs() < 1e-6);
        assert!((t.layer_time("c") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn removed_layers_drop_their_clocks() {
        let mut t = Timeline::new();
        t.tick(1.0, 1.0, 1.0, [("a", 1.0), ("b", 1.0)]);
        t.tick(1.0, 1.0, 1.0, [("a", 1.0)]);
        assert_eq!(t.layer_time("b"), 0.0);
        // Re-adding "b" restarts it.
        t.tick(1.0, 1.0, 1.0, [("a", 1.0), ("b", 1.0)]);
        assert!((t.layer_time("b") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn layer_clocks_are_updated_in_place() {
        let mut t = Timeline::new();
        t.tick(1.0, 1.0, 1.0, [("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        for _ in 0..3 {
            t.tick(1.0, 1.0, 1.0, [("c", 1.0), ("a", 1.0)]);
        }
        assert_eq!(t.layers.len(), 2);
        assert!(!t.layers.contains_key("b"));
        assert!((t.layer_time("a") - 4.0).abs() < 1e-6);
        assert!((t.layer_time("c") - 4.0).abs() < 1e-6);
    }

    #[test]
    fn pause_freezes_every_clock() {
        let mut t = Timeline::new();
        t.tick(1.0, 1.0, 1.0, [("a", 1.0)]);
        t.set_state(PlayState::Paused);
        t.tick(1.0, 1.0, 1.0, [("a", 1.0)]);
        assert!((t.main().elapsed() - 1.0).abs() < 1e-6);
        assert!((t.layer_time("a") - 1.0).abs() < 1e-6);
    }
}
