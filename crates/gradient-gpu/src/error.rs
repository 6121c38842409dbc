use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    /// No adapter at all: the platform cannot render the gradient.
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    #[error("failed to create window surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    #[error("failed to map read-back buffer: {0}")]
    BufferMapping(String),
    /// A validation or out-of-memory error caught by an error scope.
    #[error("GPU rejected the request: {0}")]
    Rejected(String),
}
