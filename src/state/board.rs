use serde::{Deserialize, Serialize};

use super::history::History;
use crate::config::BoardConfig;
use crate::layer::{create_background_layer, create_layer, Layer, LayerId};

/// Active pointer tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Draw,
    Erase,
    Move,
}

/// Immutable copy of the undoable part of the board.
///
/// Strokes are reference counted, so a snapshot copies layer headers and stroke
/// pointers, never point data.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub layers: Vec<Layer>,
    pub active_layer_id: LayerId,
}

/// Complete board state. Owned by a [`super::Store`]; everything else reads it and
/// requests changes through [`super::Action`]s.
#[derive(Debug, Clone)]
pub struct BoardState {
    /// Bottom-most first.
    pub layers: Vec<Layer>,
    pub active_layer_id: LayerId,
    pub mode: Mode,
    pub stroke_color: String,
    pub brush_size: f32,
    pub composite_data_url: Option<String>,
    pub(crate) history: History,
    /// Colour used when a background layer has to be synthesised.
    pub(crate) default_background: String,
    revision: u64,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new(&BoardConfig::default())
    }
}

impl BoardState {
    /// A background layer plus one empty vector layer, which is active.
    pub fn new(config: &BoardConfig) -> Self {
        let layer = create_layer("Layer 1");
        let active_layer_id = layer.id.clone();
        Self {
            layers: vec![create_background_layer(&config.background_color), layer],
            active_layer_id,
            mode: Mode::default(),
            stroke_color: config.stroke_color.clone(),
            brush_size: config.brush_size,
            composite_data_url: None,
            history: History::new(config.history_limit),
            default_background: config.background_color.clone(),
            revision: 0,
        }
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layer(&self.active_layer_id)
    }

    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            layers: self.layers.clone(),
            active_layer_id: self.active_layer_id.clone(),
        }
    }

    /// Swaps in `snapshot`, returning what was there before.
    pub(crate) fn replace_snapshot(&mut self, snapshot: Snapshot) -> Snapshot {
        Snapshot {
            layers: std::mem::replace(&mut self.layers, snapshot.layers),
            active_layer_id: std::mem::replace(&mut self.active_layer_id, snapshot.active_layer_id),
        }
    }

    pub fn past(&self) -> &[Snapshot] {
        self.history.past()
    }

    pub fn future(&self) -> &[Snapshot] {
        self.history.future()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.past().is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.future().is_empty()
    }

    pub fn gesture_open(&self) -> bool {
        self.history.gesture_open()
    }

    /// Bumped on every transition that changes the layer list.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
