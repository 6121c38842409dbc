pub mod composite_pipeline;
pub mod context;
pub mod error;
pub mod gradient_pipeline;
pub mod readback;
pub mod renderer;
pub mod stack;

pub use context::{CompositeUniforms, GpuContext, GradientUniforms};
pub use error::GpuError;
pub use renderer::PresentPass;
pub use stack::StackRenderer;
