#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod collaborators;
pub mod color;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod id_generator;
pub mod input;
pub mod layer;
pub mod panels;
pub mod persistence;
pub mod renderer;
pub mod state;
pub mod stroke;
pub mod util;

pub use app::BoardApp;
pub use collaborators::{ImageFetcher, ImageGenerator, LocalFetcher, PersistenceSink, Uploader};
pub use config::BoardConfig;
pub use engine::BoardEngine;
pub use error::{CollaboratorError, ConfigError, EngineError, ImageLoadError};
pub use input::{InputResponse, PointerController, PointerInput};
pub use layer::{Layer, LayerContent, LayerId};
pub use persistence::BoardDocument;
pub use renderer::Renderer;
pub use state::{Action, BoardState, Mode, Store};
pub use stroke::Stroke;
