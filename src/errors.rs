/// Fatal errors raised while setting up or tearing down the presentation layer.
///
/// Per-frame drawing problems never surface as this type; backends report
/// them through `anyhow` and the dispatcher drops the offending command.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    #[error("Font load failed: {0}")]
    FontLoad(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Present error: {0}")]
    Present(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),
}
