use egui::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id_generator::generate_layer_id;
use crate::stroke::{Stroke, StrokeRef};

pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";
pub const DEFAULT_BACKGROUND_NAME: &str = "Background";
pub const DEFAULT_IMAGE_NAME: &str = "Image";

/// A unique identifier for a layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a layer paints.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    /// Freehand strokes in paint order, panned by `offset`.
    Vector { strokes: Vec<StrokeRef>, offset: Vec2 },
    /// A remote or inline bitmap. Without explicit `bounds` the image is placed
    /// aspect-fit, or aspect-fill when `banana` is set.
    Image {
        src: String,
        banana: bool,
        bounds: Option<Rect>,
    },
    /// Flat colour fill, always kept below every other layer.
    Background { color: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Unique identifier for the layer
    pub id: LayerId,
    /// Display name of the layer
    pub name: String,
    /// Whether the layer is currently visible
    pub visible: bool,
    /// Content of the layer
    pub content: LayerContent,
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self {
            id: generate_layer_id(),
            name: name.to_string(),
            visible: true,
            content: LayerContent::Vector {
                strokes: Vec::new(),
                offset: Vec2::ZERO,
            },
        }
    }

    pub fn new_image(name: &str, src: &str, banana: bool) -> Self {
        Self {
            id: generate_layer_id(),
            name: name.to_string(),
            visible: true,
            content: LayerContent::Image {
                src: src.to_string(),
                banana,
                bounds: None,
            },
        }
    }

    pub fn new_background(color: &str) -> Self {
        Self {
            id: generate_layer_id(),
            name: DEFAULT_BACKGROUND_NAME.to_string(),
            visible: true,
            content: LayerContent::Background {
                color: color.to_string(),
            },
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self.content, LayerContent::Background { .. })
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.content, LayerContent::Vector { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self.content, LayerContent::Image { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self.content {
            LayerContent::Vector { .. } => "vector",
            LayerContent::Image { .. } => "image",
            LayerContent::Background { .. } => "background",
        }
    }

    pub fn strokes(&self) -> &[StrokeRef] {
        match &self.content {
            LayerContent::Vector { strokes, .. } => strokes,
            _ => &[],
        }
    }

    /// Pan offset of a vector layer; zero for everything else.
    pub fn offset(&self) -> Vec2 {
        match self.content {
            LayerContent::Vector { offset, .. } => offset,
            _ => Vec2::ZERO,
        }
    }

    /// Appends a stroke. Only vector layers accept strokes.
    pub fn add_stroke(&mut self, stroke: Stroke) -> bool {
        match &mut self.content {
            LayerContent::Vector { strokes, .. } => {
                strokes.push(StrokeRef::new(stroke));
                true
            }
            _ => false,
        }
    }

    /// Removes every stroke and resets the pan. Returns whether anything changed.
    pub fn clear(&mut self) -> bool {
        match &mut self.content {
            LayerContent::Vector { strokes, offset } => {
                let changed = !strokes.is_empty() || *offset != Vec2::ZERO;
                strokes.clear();
                *offset = Vec2::ZERO;
                changed
            }
            _ => false,
        }
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Creates a visible, empty vector layer with a fresh id.
pub fn create_layer(name: &str) -> Layer {
    Layer::new(name)
}

/// Creates a visible background layer with a fresh id.
pub fn create_background_layer(color: &str) -> Layer {
    Layer::new_background(color)
}

/// Creates a visible image layer with a fresh id and computed placement.
pub fn create_image_layer(name: &str, src: &str, banana: bool) -> Layer {
    Layer::new_image(name, src, banana)
}

/// Name for the next vector layer, counting only non-background layers.
pub fn next_layer_name(layers: &[Layer]) -> String {
    let count = layers.iter().filter(|l| !l.is_background()).count();
    format!("Layer {}", count + 1)
}

/// Resolves `candidate` against `layers`.
///
/// Returns the candidate when it names a member, otherwise the first non-background
/// layer, otherwise the first layer. `None` only when `layers` is empty.
pub fn ensure_active_layer_id(layers: &[Layer], candidate: Option<&LayerId>) -> Option<LayerId> {
    if let Some(id) = candidate {
        if layers.iter().any(|l| &l.id == id) {
            return Some(id.clone());
        }
    }
    layers
        .iter()
        .find(|l| !l.is_background())
        .or_else(|| layers.first())
        .map(|l| l.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_produce_fresh_visible_layers() {
        let a = create_layer("A");
        let b = create_layer("A");
        assert_ne!(a.id, b.id);
        assert!(a.visible && a.is_vector());
        assert!(a.strokes().is_empty());

        let bg = create_background_layer("#123456");
        assert!(bg.visible && bg.is_background());
        assert_eq!(
            bg.content,
            LayerContent::Background {
                color: "#123456".into()
            }
        );
    }

    #[test]
    fn test_ensure_active_layer_id() {
        let bg = create_background_layer("#fff");
        let a = create_layer("A");
        let layers = vec![bg.clone(), a.clone()];

        assert_eq!(ensure_active_layer_id(&layers, Some(&bg.id)), Some(bg.id.clone()));
        let missing = LayerId::from("gone");
        assert_eq!(ensure_active_layer_id(&layers, Some(&missing)), Some(a.id.clone()));
        assert_eq!(ensure_active_layer_id(&layers[..1], None), Some(bg.id));
        assert_eq!(ensure_active_layer_id(&[], None), None);
    }

    #[test]
    fn test_clear_resets_strokes_and_offset() {
        let mut layer = create_layer("A");
        assert!(!layer.clear());
        layer.add_stroke(Stroke::new("#000", 2.0, false, vec![0.0, 0.0, 1.0, 1.0]));
        assert!(layer.clear());
        assert!(layer.strokes().is_empty());
    }
}
