//! One board: state, renderer and pointer controller wired together.

use egui::{Key, Modifiers, Vec2};
use futures::future::BoxFuture;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::rc::Rc;

use crate::collaborators::{ImageFetcher, ImageGenerator, LocalFetcher, PersistenceSink, Uploader, encode_data_url};
use crate::config::BoardConfig;
use crate::error::{CollaboratorError, EngineError};
use crate::input::{InputResponse, PointerController, PointerInput, Repaint};
use crate::layer::LayerId;
use crate::persistence::{self, BoardDocument};
use crate::renderer::{ImageStatus, RasterSurface, Renderer};
use crate::state::{Action, BoardState, Store};
use crate::util::time;

const GENERATED_IMAGE_NAME: &str = "Generated";
const PNG: &str = "image/png";

/// Owns everything one board needs. Engines share nothing, so any number of boards
/// can live side by side.
#[derive(Debug)]
pub struct BoardEngine {
    config: BoardConfig,
    store: Store,
    renderer: Renderer,
    controller: PointerController,
}

impl Default for BoardEngine {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl BoardEngine {
    /// An engine that resolves `data:` URLs and local files on its own.
    pub fn new(config: BoardConfig) -> Self {
        Self::with_fetcher(config, Rc::new(LocalFetcher))
    }

    pub fn with_fetcher(config: BoardConfig, fetcher: Rc<dyn ImageFetcher>) -> Self {
        Self {
            store: Store::new(BoardState::new(&config)),
            renderer: Renderer::new(&config, fetcher),
            controller: PointerController::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn state(&self) -> &BoardState {
        self.store.state()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Registers a sink that receives the saved board after each layer change.
    pub fn subscribe(&mut self, sink: Box<dyn PersistenceSink>) {
        self.store.subscribe(sink);
    }

    /// Applies `action` and schedules a repaint. Returns whether the layer list changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let changed = self.store.dispatch(action);
        self.renderer.request_render();
        changed
    }

    /// Replaces the board with persisted text. Malformed input yields a blank board.
    pub fn load_json(&mut self, text: &str) {
        let layers = persistence::load(text);
        self.dispatch(Action::LoadLayers { layers });
    }

    pub fn save(&self) -> BoardDocument {
        persistence::save(&self.state().layers)
    }

    pub fn save_json(&self) -> String {
        self.save().to_json()
    }

    pub fn resize(&mut self, css_size: Vec2, density: f32) {
        self.renderer.resize(css_size, density);
    }

    /// Display callback; see [`Renderer::on_animation_frame`].
    pub fn frame(&mut self, now: f64) -> bool {
        let preview = self.controller.preview();
        self.renderer.on_animation_frame(now, self.store.state(), preview.as_ref())
    }

    /// Whether the host should keep scheduling display callbacks.
    pub fn needs_frame(&self) -> bool {
        self.renderer.render_pending() || self.renderer.images_loading()
    }

    pub fn onscreen(&self) -> &RasterSurface {
        self.renderer.onscreen()
    }

    pub fn reload_image(&mut self, src: &str) {
        self.renderer.reload_image(src);
    }

    pub fn image_status(&self, src: &str) -> Option<ImageStatus> {
        self.renderer.image_status(src)
    }

    pub fn pointer_down(&mut self, input: &PointerInput) -> InputResponse {
        let density = self.renderer.density();
        let response = self
            .controller
            .pointer_down(input, &mut self.store, &self.renderer, density);
        self.apply(response)
    }

    pub fn pointer_move(&mut self, input: &PointerInput) -> InputResponse {
        let response = self.controller.pointer_move(input, &mut self.store);
        self.apply(response)
    }

    pub fn pointer_up(&mut self, input: &PointerInput) -> InputResponse {
        let response = self.controller.pointer_up(input, &mut self.store);
        self.apply(response)
    }

    pub fn pointer_cancel(&mut self, pointer_id: u64) -> InputResponse {
        let response = self.controller.pointer_cancel(pointer_id, &mut self.store);
        self.apply(response)
    }

    pub fn lost_capture(&mut self, pointer_id: u64) -> InputResponse {
        let response = self.controller.lost_capture(pointer_id, &mut self.store);
        self.apply(response)
    }

    pub fn context_menu(&self) -> InputResponse {
        self.controller.context_menu()
    }

    pub fn key_down(&mut self, key: Key, modifiers: Modifiers) -> InputResponse {
        let density = self.renderer.density();
        let response = self
            .controller
            .key_down(key, modifiers, &mut self.store, &self.renderer, density);
        self.apply(response)
    }

    pub fn is_gesture_active(&self) -> bool {
        self.controller.is_active()
    }

    fn apply(&mut self, response: InputResponse) -> InputResponse {
        match response.repaint {
            Repaint::None => {}
            Repaint::Request => {
                self.renderer.request_render();
            }
            Repaint::Force => {
                let preview = self.controller.preview();
                self.renderer
                    .force_render(time::now_secs(), self.store.state(), preview.as_ref());
            }
        }
        response
    }

    /// Flattened board at pixel density 1.
    pub fn composite_image(&mut self) -> Result<RgbaImage, EngineError> {
        self.renderer.render_composite(self.store.state())
    }

    pub fn composite_png(&mut self) -> Result<Vec<u8>, EngineError> {
        encode_png(self.composite_image()?)
    }

    /// Renders the composite, caches it as a `data:` URL on the board and returns it.
    pub fn refresh_composite_data_url(&mut self) -> Result<String, EngineError> {
        let url = encode_data_url(PNG, &self.composite_png()?);
        self.store.dispatch(Action::SetCompositeDataUrl(Some(url.clone())));
        Ok(url)
    }

    /// Composite scaled down to fit the configured thumbnail edge.
    pub fn thumbnail_png(&mut self) -> Result<Vec<u8>, EngineError> {
        let composite = self.composite_image()?;
        let edge = self.config.thumbnail_edge;
        let (width, height) = composite.dimensions();
        let longest = width.max(height);
        let thumbnail = if longest <= edge {
            composite
        } else {
            let scale = edge as f64 / longest as f64;
            let fit = |v: u32| ((v as f64 * scale).round() as u32).max(1);
            image::imageops::thumbnail(&composite, fit(width), fit(height))
        };
        encode_png(thumbnail)
    }

    /// Renders the composite and hands it to `generator`. The returned future resolves
    /// to the generated image URL; pass it to [`BoardEngine::insert_generated_image`].
    pub fn start_generation(
        &mut self,
        generator: &dyn ImageGenerator,
        prompt: &str,
    ) -> Result<BoxFuture<'static, Result<String, CollaboratorError>>, EngineError> {
        let png = self.composite_png()?;
        log::info!("requesting generation ({} byte composite)", png.len());
        Ok(generator.generate(png, prompt.to_string()))
    }

    /// Puts a generated image on top of the stack with a fresh drawing layer above it.
    /// Returns the id of the image layer.
    pub fn insert_generated_image(&mut self, url: &str) -> Result<LayerId, EngineError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CollaboratorError::EmptyResponse.into());
        }
        self.dispatch(Action::InsertImageLayer {
            src: url.to_string(),
            name: Some(GENERATED_IMAGE_NAME.to_string()),
            banana: true,
        });
        let image_id = self.state().active_layer_id.clone();
        self.dispatch(Action::AddLayer { name: None });
        Ok(image_id)
    }

    /// Full generation round trip. On failure the board is left untouched.
    pub async fn generate_from_prompt(
        &mut self,
        generator: &dyn ImageGenerator,
        prompt: &str,
    ) -> Result<LayerId, EngineError> {
        let request = self.start_generation(generator, prompt)?;
        match request.await {
            Ok(url) => self.insert_generated_image(&url),
            Err(err) => {
                log::warn!("image generation failed: {err}");
                Err(err.into())
            }
        }
    }

    /// Uploads a thumbnail of the board. Resolves to its public URL.
    pub fn upload_thumbnail(
        &mut self,
        uploader: &dyn Uploader,
    ) -> Result<BoxFuture<'static, Result<String, CollaboratorError>>, EngineError> {
        let png = self.thumbnail_png()?;
        Ok(uploader.upload(png, PNG))
    }

    /// Uploads a user image and inserts it as a new top layer.
    pub async fn upload_image(
        &mut self,
        uploader: &dyn Uploader,
        blob: Vec<u8>,
        content_type: &'static str,
        name: Option<String>,
    ) -> Result<LayerId, EngineError> {
        let url = uploader.upload(blob, content_type).await.map_err(|err| {
            log::warn!("image upload failed: {err}");
            err
        })?;
        self.insert_image(&url, name)
            .ok_or(EngineError::Collaborator(CollaboratorError::EmptyResponse))
    }

    /// Inserts `src` as an aspect-fit image layer on top. Returns the new layer's id,
    /// or `None` for an empty source.
    pub fn insert_image(&mut self, src: &str, name: Option<String>) -> Option<LayerId> {
        let changed = self.dispatch(Action::InsertImageLayer {
            src: src.to_string(),
            name,
            banana: false,
        });
        changed.then(|| self.state().active_layer_id.clone())
    }
}

fn encode_png(image: RgbaImage) -> Result<Vec<u8>, EngineError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
