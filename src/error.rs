use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("color tolerance {0} out of range (0, 1]")]
    ColorTolerance(f32),
    #[error("radius tolerance {0} out of range (0, 1]")]
    RadiusTolerance(f32),
    #[error("target radius {0} must be positive")]
    TargetRadius(f32),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("seek to {0:.3}s failed: {1}")]
    Seek(f64, String),
    #[error("decode at {0:.3}s failed: {1}")]
    Decode(f64, String),
    #[error("source metadata unavailable: {0}")]
    Metadata(String),
}

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("encoder closed unexpectedly")]
    Closed,
    #[error("encoder failure: {0}")]
    Fatal(String),
}

#[derive(Debug, Error)]
pub enum MuxerError {
    #[error("chunk rejected: {0}")]
    Chunk(String),
    #[error("container finalize failed: {0}")]
    Finalize(String),
}

#[derive(Debug, Error)]
pub enum TimelapseError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),
    #[error("muxer error: {0}")]
    Muxer(#[from] MuxerError),
    #[error("job cancelled")]
    Cancelled,
    #[error("job is not runnable in its current state")]
    InvalidState,
}
