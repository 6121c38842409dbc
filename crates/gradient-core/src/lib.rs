pub mod blend;
pub mod clock;
pub mod compositor;
pub mod error;
pub mod layer;
pub mod noise;
pub mod palette;
pub mod params;
pub mod presets;
pub mod quality;
pub mod raster;
pub mod sampler;
pub mod settings;
pub mod share;
pub mod store;
pub mod viewport;

pub use blend::BlendMode;
pub use clock::{AnimationClock, PlayState, Timeline};
pub use compositor::{shade, ShapeSettings};
pub use layer::{GradientLayer, LayerStack, LayerUpdate, MoveDirection};
pub use noise::{NoiseField, SeededNoise, Simplex};
pub use palette::Palette;
pub use params::{ColorPair, ColorSchemeRef, GradientParameters};
pub use presets::Preset;
pub use quality::{DeviceQuality, FrameGate, FramePolicy};
pub use sampler::{octave_count, FlowSettings, LayeredFlowSampler};
pub use share::ShareableGradient;
pub use store::{FrameSnapshot, GradientStore, RenderLayer};
pub use viewport::UvWindow;
