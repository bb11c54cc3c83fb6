use std::cell::RefCell;
use std::rc::Rc;

use crate::config::BoardConfig;
use crate::engine::BoardEngine;
use crate::panels::{central_panel, layers_panel, tools_panel};
use crate::persistence::BoardDocument;
use crate::util::time;

const STORAGE_KEY: &str = "layerboard";

/// Desktop and web host for a single board.
pub struct BoardApp {
    pub(crate) engine: BoardEngine,
    texture: Option<egui::TextureHandle>,
    shown_frame: u64,
    /// Latest saved board, written to eframe storage on the next `save`.
    pending_save: Rc<RefCell<Option<String>>>,
    /// Pointer the canvas is currently tracking outside of its bounds.
    pub(crate) captured: Option<u64>,
    pub(crate) rename_buffer: String,
    pub(crate) image_source: String,
}

impl Default for BoardApp {
    fn default() -> Self {
        Self::with_engine(BoardEngine::default())
    }
}

impl BoardApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut engine = BoardEngine::new(BoardConfig::default());
        if let Some(text) = cc.storage.and_then(|storage| storage.get_string(STORAGE_KEY)) {
            log::info!("restoring board ({} bytes)", text.len());
            engine.load_json(&text);
        }
        Self::with_engine(engine)
    }

    fn with_engine(mut engine: BoardEngine) -> Self {
        let pending_save: Rc<RefCell<Option<String>>> = Rc::default();
        let slot = pending_save.clone();
        engine.subscribe(Box::new(move |document: &BoardDocument| {
            *slot.borrow_mut() = Some(document.to_json());
        }));
        Self {
            engine,
            texture: None,
            shown_frame: 0,
            pending_save,
            captured: None,
            rename_buffer: String::new(),
            image_source: String::new(),
        }
    }

    /// Runs the display callback and shows the latest frame in `rect`.
    pub(crate) fn paint_canvas(&mut self, ctx: &egui::Context, painter: &egui::Painter, rect: egui::Rect) {
        let now = time::now_secs();
        self.engine.frame(now);

        let frames = self.engine.renderer().frames_painted();
        let surface = self.engine.onscreen();
        if !surface.is_empty() && (frames != self.shown_frame || self.texture.is_none()) {
            let size = [surface.image().width() as usize, surface.image().height() as usize];
            let image = egui::ColorImage::from_rgba_unmultiplied(size, surface.image().as_raw());
            match &mut self.texture {
                Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture = Some(ctx.load_texture("board", image, egui::TextureOptions::LINEAR));
                }
            }
            self.shown_frame = frames;
        }

        if let Some(texture) = &self.texture {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(texture.id(), rect, uv, egui::Color32::WHITE);
        }

        if self.engine.needs_frame() {
            let delay = self.engine.renderer().time_until_next_frame(now).unwrap_or(0.0);
            ctx.request_repaint_after(std::time::Duration::from_secs_f64(delay));
        }
    }
}

impl eframe::App for BoardApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Some(text) = self.pending_save.borrow_mut().take() {
            storage.set_string(STORAGE_KEY, text);
        }
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        tools_panel(self, ctx);
        layers_panel(self, ctx);
        central_panel(self, ctx);
    }
}
