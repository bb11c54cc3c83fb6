//! Contracts between the board and the outside world.
//!
//! The board never performs network I/O itself. Hosts plug in implementations of these
//! traits; everything they return is validated before it touches board state.

use base64::Engine as _;
use futures::future::BoxFuture;

use crate::error::{CollaboratorError, ImageLoadError};
use crate::persistence::BoardDocument;

/// Receives the saved layer tree after every transition that changed it.
///
/// Called synchronously from dispatch, at most once per transition. Debouncing and
/// storage belong to the implementation.
pub trait PersistenceSink {
    fn persist(&mut self, document: &BoardDocument);
}

impl<F> PersistenceSink for F
where
    F: FnMut(&BoardDocument),
{
    fn persist(&mut self, document: &BoardDocument) {
        self(document)
    }
}

/// Turns a flattened composite plus a prompt into a new image.
pub trait ImageGenerator {
    /// `composite_png` is rendered at pixel density 1. Resolves to the URL of the
    /// generated image.
    fn generate(
        &self,
        composite_png: Vec<u8>,
        prompt: String,
    ) -> BoxFuture<'static, Result<String, CollaboratorError>>;
}

/// Publishes a blob and returns its public URL.
pub trait Uploader {
    fn upload(
        &self,
        blob: Vec<u8>,
        content_type: &'static str,
    ) -> BoxFuture<'static, Result<String, CollaboratorError>>;
}

/// Fetches the raw bytes behind an image source. Decoding happens in the renderer.
pub trait ImageFetcher {
    fn fetch(&self, src: &str) -> BoxFuture<'static, Result<Vec<u8>, ImageLoadError>>;
}

/// Resolves `data:` URLs inline and, on native targets, plain file paths.
/// Remote URLs need a host-provided fetcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl ImageFetcher for LocalFetcher {
    fn fetch(&self, src: &str) -> BoxFuture<'static, Result<Vec<u8>, ImageLoadError>> {
        let result = fetch_local(src);
        Box::pin(async move { result })
    }
}

fn fetch_local(src: &str) -> Result<Vec<u8>, ImageLoadError> {
    if src.starts_with("data:") {
        return decode_data_url(src);
    }
    if src.starts_with("http://") || src.starts_with("https://") || src.starts_with("blob:") {
        return Err(ImageLoadError::UnsupportedSource(src.to_string()));
    }
    read_file(src)
}

#[cfg(not(target_arch = "wasm32"))]
fn read_file(src: &str) -> Result<Vec<u8>, ImageLoadError> {
    let path = src.strip_prefix("file://").unwrap_or(src);
    std::fs::read(path).map_err(|err| ImageLoadError::Fetch {
        src: src.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(target_arch = "wasm32")]
fn read_file(src: &str) -> Result<Vec<u8>, ImageLoadError> {
    Err(ImageLoadError::UnsupportedSource(src.to_string()))
}

/// Decodes the payload of a base64 `data:` URL.
pub fn decode_data_url(src: &str) -> Result<Vec<u8>, ImageLoadError> {
    let (header, payload) = src
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(ImageLoadError::MalformedDataUrl)?;
    if !header.ends_with(";base64") {
        return Err(ImageLoadError::MalformedDataUrl);
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| ImageLoadError::MalformedDataUrl)
}

/// Wraps `bytes` as a `data:` URL.
pub fn encode_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{content_type};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
