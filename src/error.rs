use thiserror::Error;

/// Errors raised while fetching or decoding an image source
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),
    #[error("failed to fetch {src}: {reason}")]
    Fetch { src: String, reason: String },
    #[error("malformed data URL")]
    MalformedDataUrl,
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decode worker unavailable: {0}")]
    DecodeWorker(String),
}

/// Failures reported by an external collaborator (upload, generation, persistence)
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("empty response")]
    EmptyResponse,
}

/// Errors surfaced by the engine's export and collaborator entry points.
/// Board state is never modified when one of these is returned.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("canvas has no area to render")]
    EmptyCanvas,
    #[error("failed to encode composite: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
