mod image_cache;
mod overlay;
pub mod placement;
mod scheduler;
mod surface;

pub use image_cache::{ImageCache, ImageStatus};
pub use overlay::{Corner, draw_move_overlay};
pub use scheduler::FrameScheduler;
pub use surface::{PaintMode, RasterSurface};

use egui::{Rect, Vec2};
use image::RgbaImage;
use std::rc::Rc;

use crate::collaborators::ImageFetcher;
use crate::color::parse_css_color;
use crate::config::BoardConfig;
use crate::error::EngineError;
use crate::input::LayerBounds;
use crate::layer::{Layer, LayerContent};
use crate::state::{BoardState, Mode};
use crate::stroke::Stroke;

/// Layer compositor for one board.
///
/// Paints into an onscreen surface through a single reusable offscreen buffer: each
/// visible layer is painted alone into the buffer, then composited. Erase strokes
/// therefore only remove pixels of their own layer.
pub struct Renderer {
    onscreen: RasterSurface,
    offscreen: RasterSurface,
    css_size: Vec2,
    scheduler: FrameScheduler,
    images: ImageCache,
    frames_painted: u64,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("css_size", &self.css_size)
            .field("density", &self.onscreen.density())
            .field("frames_painted", &self.frames_painted)
            .field("images", &self.images)
            .finish()
    }
}

impl Renderer {
    /// Creates a renderer with empty surfaces; call [`Renderer::resize`] before painting.
    ///
    /// Args:
    ///     config (BoardConfig): frame rate and image cache capacity
    ///     fetcher (ImageFetcher): resolves image layer sources to bytes
    pub fn new(config: &BoardConfig, fetcher: Rc<dyn ImageFetcher>) -> Self {
        Self {
            onscreen: RasterSurface::new(Vec2::ZERO, 1.0),
            offscreen: RasterSurface::new(Vec2::ZERO, 1.0),
            css_size: Vec2::ZERO,
            scheduler: FrameScheduler::new(config.target_fps),
            images: ImageCache::new(fetcher, config.image_cache_capacity),
            frames_painted: 0,
        }
    }

    /// Matches both buffers to the canvas size and pixel density, asking for a repaint
    /// when anything changed. Returns whether the buffers were reallocated.
    pub fn resize(&mut self, css_size: Vec2, density: f32) -> bool {
        let css_changed = self.css_size != css_size;
        self.css_size = css_size;
        let reallocated = self.onscreen.resize(css_size, density);
        self.offscreen.resize(css_size, density);
        if reallocated {
            log::debug!(
                "canvas resized to {}x{} css px at density {}",
                css_size.x,
                css_size.y,
                self.onscreen.density()
            );
        }
        if reallocated || css_changed {
            self.request_render();
        }
        reallocated
    }

    pub fn css_size(&self) -> Vec2 {
        self.css_size
    }

    pub fn density(&self) -> f32 {
        self.onscreen.density()
    }

    /// The surface holding the last painted frame.
    pub fn onscreen(&self) -> &RasterSurface {
        &self.onscreen
    }

    pub fn frames_painted(&self) -> u64 {
        self.frames_painted
    }

    /// Asks for a repaint on the next eligible frame. Returns `true` when the host has
    /// to schedule a display callback.
    pub fn request_render(&mut self) -> bool {
        self.scheduler.request()
    }

    pub fn render_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Seconds until a pending repaint may run.
    pub fn time_until_next_frame(&self, now: f64) -> Option<f64> {
        self.scheduler.time_until_next(now)
    }

    /// Drains finished image loads. A finished load schedules a repaint.
    pub fn poll_images(&mut self) -> bool {
        let loaded = self.images.poll();
        if loaded {
            self.request_render();
        }
        loaded
    }

    pub fn images_loading(&self) -> bool {
        self.images.has_pending()
    }

    pub fn reload_image(&mut self, src: &str) {
        self.images.reload(src);
        self.request_render();
    }

    pub fn image_status(&self, src: &str) -> Option<ImageStatus> {
        self.images.status(src)
    }

    /// Display callback. Paints when a repaint is pending and the frame interval has
    /// elapsed.
    ///
    /// Args:
    ///     now (f64): monotonic time in seconds
    ///     state (BoardState): the board to paint
    ///     preview (Stroke): the in-progress stroke, in canvas coordinates
    ///
    /// Returns:
    ///     bool: whether a frame was painted
    pub fn on_animation_frame(&mut self, now: f64, state: &BoardState, preview: Option<&Stroke>) -> bool {
        self.poll_images();
        if !self.scheduler.on_frame(now) {
            return false;
        }
        self.paint(state, preview);
        true
    }

    /// Paints immediately, ignoring the frame limit.
    pub fn force_render(&mut self, now: f64, state: &BoardState, preview: Option<&Stroke>) {
        self.poll_images();
        self.scheduler.forced(now);
        self.paint(state, preview);
    }

    fn paint(&mut self, state: &BoardState, preview: Option<&Stroke>) {
        self.images.begin_frame();
        paint_layers(
            &mut self.onscreen,
            &mut self.offscreen,
            &mut self.images,
            self.css_size,
            state,
            preview,
        );
        if state.mode == Mode::Move {
            if let Some(bounds) = state
                .active_layer()
                .filter(|layer| layer.visible)
                .and_then(|layer| self.layer_bounds(layer))
            {
                draw_move_overlay(&mut self.onscreen, bounds);
            }
        }
        self.frames_painted += 1;
    }

    /// Flattens every visible layer at pixel density 1, without the overlay or any
    /// in-progress stroke.
    pub fn render_composite(&mut self, state: &BoardState) -> Result<RgbaImage, EngineError> {
        let mut target = RasterSurface::new(self.css_size, 1.0);
        if target.is_empty() {
            return Err(EngineError::EmptyCanvas);
        }
        let mut scratch = RasterSurface::new(self.css_size, 1.0);
        paint_layers(&mut target, &mut scratch, &mut self.images, self.css_size, state, None);
        Ok(target.into_image())
    }
}

impl LayerBounds for Renderer {
    fn layer_bounds(&self, layer: &Layer) -> Option<Rect> {
        match &layer.content {
            LayerContent::Vector { strokes, offset } => placement::vector_bounds(strokes, *offset),
            LayerContent::Image { src, banana, bounds } => {
                placement::image_rect(*bounds, *banana, self.css_size, self.images.natural_size(src))
            }
            LayerContent::Background { .. } => None,
        }
    }
}

fn paint_layers(
    target: &mut RasterSurface,
    scratch: &mut RasterSurface,
    images: &mut ImageCache,
    canvas: Vec2,
    state: &BoardState,
    preview: Option<&Stroke>,
) {
    target.clear();
    for layer in state.layers.iter().filter(|layer| layer.visible) {
        scratch.clear();
        let preview = preview.filter(|_| layer.id == state.active_layer_id);
        paint_layer(scratch, images, canvas, layer, preview);
        target.composite(scratch);
    }
}

fn paint_layer(
    surface: &mut RasterSurface,
    images: &mut ImageCache,
    canvas: Vec2,
    layer: &Layer,
    preview: Option<&Stroke>,
) {
    match &layer.content {
        LayerContent::Background { color } => surface.fill(parse_css_color(color)),
        LayerContent::Image { src, banana, bounds } => {
            // Not loaded yet, or failed: leave the layer blank.
            let Some(image) = images.get(src) else {
                return;
            };
            let natural = Vec2::new(image.width() as f32, image.height() as f32);
            if let Some(rect) = placement::image_rect(*bounds, *banana, canvas, Some(natural)) {
                surface.draw_image(&image, rect);
            }
        }
        LayerContent::Vector { strokes, offset } => {
            for stroke in strokes {
                paint_stroke(surface, stroke, *offset);
            }
            if let Some(stroke) = preview {
                paint_stroke(surface, stroke, Vec2::ZERO);
            }
        }
    }
}

fn paint_stroke(surface: &mut RasterSurface, stroke: &Stroke, offset: Vec2) {
    let points: Vec<_> = stroke.iter_points().map(|p| p + offset).collect();
    let mode = if stroke.erase {
        PaintMode::DestinationOut
    } else {
        PaintMode::SourceOver
    };
    surface.stroke_polyline(&points, stroke.size, parse_css_color(&stroke.color), mode);
}
