use egui::{Pos2, Rect};

use crate::layer::Layer;

/// Supplies the on-canvas bounding box of a layer.
///
/// Implemented by the renderer, which knows decoded image sizes and the canvas size.
pub trait LayerBounds {
    fn layer_bounds(&self, layer: &Layer) -> Option<Rect>;
}

impl<F> LayerBounds for F
where
    F: Fn(&Layer) -> Option<Rect>,
{
    fn layer_bounds(&self, layer: &Layer) -> Option<Rect> {
        self(layer)
    }
}

/// Point-in-rect with the edges excluded.
pub fn strictly_contains(rect: Rect, pos: Pos2) -> bool {
    rect.min.x < pos.x && pos.x < rect.max.x && rect.min.y < pos.y && pos.y < rect.max.y
}

/// Topmost visible, non-background layer whose bounding box contains `pos`.
pub fn hit_test<'a>(layers: &'a [Layer], pos: Pos2, bounds: &dyn LayerBounds) -> Option<&'a Layer> {
    layers
        .iter()
        .rev()
        .filter(|layer| layer.visible && !layer.is_background())
        .find(|layer| {
            bounds
                .layer_bounds(layer)
                .is_some_and(|rect| strictly_contains(rect, pos))
        })
}
