// Error types for the viewer.
// Asset and config failures are recovered by the caller; only adapter/device
// failures are fatal, and only in main().

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse asset: {0}")]
    AssetParse(String),

    #[error("unsupported asset format: {0}")]
    UnsupportedFormat(String),

    #[error("asset contains no renderable faces")]
    EmptyAsset,

    #[error("asset loader stopped before reporting a result")]
    LoaderDisconnected,

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid prediction response: {0}")]
    Prediction(#[from] serde_json::Error),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
