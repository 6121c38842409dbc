/// Animation presets: speed, complexity, noise scale and a palette key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Calm,
    Energetic,
    Subtle,
    Chaotic,
    Dreamy,
    Cosmic,
    Ocean,
    Lava,
}

/// The values a preset writes into the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetValues {
    pub speed: f32,
    pub complexity: u32,
    pub noise_scale: f32,
    pub color_scheme: &'static str,
}

impl Preset {
    pub const ALL: [Preset; 8] = [
        Preset::Calm,
        Preset::Energetic,
        Preset::Subtle,
        Preset::Chaotic,
        Preset::Dreamy,
        Preset::Cosmic,
        Preset::Ocean,
        Preset::Lava,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Preset::Calm => "calm",
            Preset::Energetic => "energetic",
            Preset::Subtle => "subtle",
            Preset::Chaotic => "chaotic",
            Preset::Dreamy => "dreamy",
            Preset::Cosmic => "cosmic",
            Preset::Ocean => "ocean",
            Preset::Lava => "lava",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::Calm => "Calm",
            Preset::Energetic => "Energetic",
            Preset::Subtle => "Subtle",
            Preset::Chaotic => "Chaotic",
            Preset::Dreamy => "Dreamy",
            Preset::Cosmic => "Cosmic",
            Preset::Ocean => "Ocean",
            Preset::Lava => "Lava",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Preset::Calm => "Slow, soft movement in relaxing colors",
            Preset::Energetic => "Fast, vibrant movement in intense colors",
            Preset::Subtle => "Very gentle movement with delicate transitions",
            Preset::Chaotic => "Fast, complex movement with unpredictable patterns",
            Preset::Dreamy => "Medium pace with fluid patterns and soft colors",
            Preset::Cosmic => "Complex patterns reminiscent of nebulae",
            Preset::Ocean => "Rolling motion like sea waves",
            Preset::Lava => "Slow, heavy motion like molten rock",
        }
    }

    pub fn values(self) -> PresetValues {
        let (speed, complexity, noise_scale, color_scheme) = match self {
            Preset::Calm => (0.5, 2, 1.5, "redBlue"),
            Preset::Energetic => (2.0, 5, 3.0, "neon"),
            Preset::Subtle => (0.3, 1, 1.0, "greenPurple"),
            Preset::Chaotic => (2.5, 8, 4.0, "multiColor"),
            Preset::Dreamy => (1.2, 4, 2.0, "yellowPink"),
            Preset::Cosmic => (1.0, 7, 2.5, "multiColor"),
            Preset::Ocean => (0.8, 3, 2.2, "redBlue"),
            Preset::Lava => (0.6, 4, 1.8, "yellowPink"),
        };
        PresetValues {
            speed,
            complexity,
            noise_scale,
            color_scheme,
        }
    }

    pub fn from_key(key: &str) -> Option<Preset> {
        Preset::ALL.into_iter().find(|p| p.key() == key)
    }

    pub fn next(self) -> Preset {
        let idx = Preset::ALL.iter().position(|&p| p == self).unwrap_or(0);
        Preset::ALL[(idx + 1) % Preset::ALL.len()]
    }
}
