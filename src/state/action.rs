use egui::{Rect, Vec2};

use super::board::Mode;
use crate::layer::{Layer, LayerId};
use crate::stroke::Stroke;

/// Everything that can change a [`super::BoardState`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Adds an empty vector layer on top and makes it active.
    AddLayer { name: Option<String> },
    RemoveLayer { id: LayerId },
    SelectLayer { id: LayerId },
    ToggleLayerVisibility { id: LayerId },
    /// Empties a vector layer.
    ClearLayer { id: LayerId },
    /// Empties every vector layer.
    ClearAll,
    RenameLayer { id: LayerId, name: String },
    /// Desired top-to-bottom order of non-background layers. Partial or stale lists
    /// are completed with the layers they leave out.
    ReorderLayers { top_to_bottom: Vec<LayerId> },
    /// Appends a layer-local stroke to the active layer.
    CommitStroke { stroke: Stroke },
    /// Adds an image layer on top and makes it active.
    InsertImageLayer {
        src: String,
        name: Option<String>,
        banana: bool,
    },
    MoveLayer { id: LayerId, delta: Vec2 },
    SetImageBounds { id: LayerId, bounds: Rect },
    SetBackgroundColor { color: String },
    /// Adds a vector layer on top when the active layer cannot take strokes.
    EnsureVectorLayer,
    SetMode(Mode),
    SetStrokeColor(String),
    SetBrushSize(f32),
    /// Replaces the whole layer list and starts a fresh history.
    LoadLayers { layers: Vec<Layer> },
    SetCompositeDataUrl(Option<String>),
    /// Groups the following edits into a single undo step.
    BeginGesture,
    EndGesture,
    /// Drops the open gesture and restores the board to its state before it began.
    CancelGesture,
    Undo,
    Redo,
}

/// How an action relates to the undo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Touches layers or the active layer; snapshotted before it applies.
    Undoable,
    /// Tool preferences and caches.
    Preference,
    /// Rewrites the history itself.
    History,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::AddLayer { .. }
            | Action::RemoveLayer { .. }
            | Action::SelectLayer { .. }
            | Action::ToggleLayerVisibility { .. }
            | Action::ClearLayer { .. }
            | Action::ClearAll
            | Action::RenameLayer { .. }
            | Action::ReorderLayers { .. }
            | Action::CommitStroke { .. }
            | Action::InsertImageLayer { .. }
            | Action::MoveLayer { .. }
            | Action::SetImageBounds { .. }
            | Action::SetBackgroundColor { .. }
            | Action::EnsureVectorLayer => ActionKind::Undoable,
            Action::SetMode(_)
            | Action::SetStrokeColor(_)
            | Action::SetBrushSize(_)
            | Action::SetCompositeDataUrl(_) => ActionKind::Preference,
            Action::LoadLayers { .. }
            | Action::BeginGesture
            | Action::EndGesture
            | Action::CancelGesture
            | Action::Undo
            | Action::Redo => ActionKind::History,
        }
    }

    pub fn is_undoable(&self) -> bool {
        self.kind() == ActionKind::Undoable
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::AddLayer { .. } => "ADD_LAYER",
            Action::RemoveLayer { .. } => "REMOVE_LAYER",
            Action::SelectLayer { .. } => "SELECT_LAYER",
            Action::ToggleLayerVisibility { .. } => "TOGGLE_LAYER_VISIBILITY",
            Action::ClearLayer { .. } => "CLEAR_LAYER",
            Action::ClearAll => "CLEAR_ALL",
            Action::RenameLayer { .. } => "RENAME_LAYER",
            Action::ReorderLayers { .. } => "REORDER_LAYERS",
            Action::CommitStroke { .. } => "COMMIT_STROKE",
            Action::InsertImageLayer { .. } => "INSERT_IMAGE_LAYER",
            Action::MoveLayer { .. } => "MOVE_LAYER",
            Action::SetImageBounds { .. } => "SET_IMAGE_BOUNDS",
            Action::SetBackgroundColor { .. } => "SET_BACKGROUND_COLOR",
            Action::EnsureVectorLayer => "ENSURE_VECTOR_LAYER",
            Action::SetMode(_) => "SET_MODE",
            Action::SetStrokeColor(_) => "SET_STROKE_COLOR",
            Action::SetBrushSize(_) => "SET_BRUSH_SIZE",
            Action::LoadLayers { .. } => "LOAD_FROM_DATA",
            Action::SetCompositeDataUrl(_) => "SET_COMPOSITE_DATA_URL",
            Action::BeginGesture => "BEGIN_GESTURE",
            Action::EndGesture => "END_GESTURE",
            Action::CancelGesture => "CANCEL_GESTURE",
            Action::Undo => "UNDO",
            Action::Redo => "REDO",
        }
    }
}
