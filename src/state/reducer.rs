use egui::{Rect, Vec2};
use std::collections::HashSet;

use super::action::Action;
use super::board::{BoardState, Snapshot};
use crate::color::{MIN_BRUSH_SIZE, sanitize_color, sanitize_size};
use crate::layer::{
    create_background_layer, create_image_layer, create_layer, ensure_active_layer_id, next_layer_name,
    Layer, LayerContent, LayerId, DEFAULT_IMAGE_NAME,
};
use crate::stroke::Stroke;

/// What an edit touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Unchanged,
    ActiveOnly,
    Layers,
}

/// Pure transition: `(state, action) -> state'`.
///
/// Never fails. Undoable actions that do not apply to the current state leave the layers
/// unchanged but still take an undo step, so every undoable action is matched by
/// exactly one UNDO.
pub fn reduce(mut state: BoardState, action: Action) -> BoardState {
    apply(&mut state, action);
    state
}

/// In-place form of [`reduce`], used by the store to avoid moving the state around.
pub fn apply(state: &mut BoardState, action: Action) {
    match action {
        Action::Undo => {
            if state.can_undo() {
                let current = state.snapshot();
                if let Some(previous) = state.history.undo(current) {
                    state.replace_snapshot(previous);
                    state.bump_revision();
                }
            } else {
                log::debug!("UNDO on empty history ignored");
            }
        }
        Action::Redo => {
            if state.can_redo() {
                let current = state.snapshot();
                if let Some(next) = state.history.redo(current) {
                    state.replace_snapshot(next);
                    state.bump_revision();
                }
            } else {
                log::debug!("REDO on empty history ignored");
            }
        }
        Action::BeginGesture => state.history.begin_gesture(),
        Action::EndGesture => state.history.end_gesture(),
        Action::CancelGesture => {
            if let Some(origin) = state.history.cancel_gesture() {
                state.replace_snapshot(origin);
                state.bump_revision();
            }
        }
        Action::LoadLayers { layers } => load_layers(state, layers),
        Action::SetMode(mode) => state.mode = mode,
        Action::SetStrokeColor(color) => state.stroke_color = sanitize_color(color),
        Action::SetBrushSize(size) => state.brush_size = sanitize_size(size, state.brush_size),
        Action::SetCompositeDataUrl(url) => state.composite_data_url = url,
        action @ (Action::AddLayer { .. }
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
        | Action::EnsureVectorLayer) => apply_undoable(state, action),
    }
}

fn apply_undoable(state: &mut BoardState, action: Action) {
    let name = action.name();
    let mut next = state.snapshot();
    let outcome = edit(&mut next, action);
    if outcome == Edit::Unchanged {
        log::debug!("{name} did not apply, layers unchanged");
        let before = state.snapshot();
        state.history.record(before);
        return;
    }
    heal(&mut next);
    let before = state.replace_snapshot(next);
    state.history.record(before);
    if outcome == Edit::Layers {
        state.bump_revision();
    }
}

fn edit(snapshot: &mut Snapshot, action: Action) -> Edit {
    let Snapshot { layers, active_layer_id } = snapshot;
    let action_name = action.name();
    match action {
        Action::AddLayer { name } => {
            let name = name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| next_layer_name(layers));
            let layer = create_layer(&name);
            *active_layer_id = layer.id.clone();
            layers.push(layer);
            Edit::Layers
        }
        Action::RemoveLayer { id } => {
            let Some(index) = position(layers, &id) else {
                return Edit::Unchanged;
            };
            layers.remove(index);
            if layers.is_empty() {
                let name = next_layer_name(layers);
                layers.push(create_layer(&name));
            }
            Edit::Layers
        }
        Action::SelectLayer { id } => {
            if *active_layer_id == id || position(layers, &id).is_none() {
                return Edit::Unchanged;
            }
            *active_layer_id = id;
            Edit::ActiveOnly
        }
        Action::ToggleLayerVisibility { id } => match find_mut(layers, &id) {
            Some(layer) => {
                layer.visible = !layer.visible;
                Edit::Layers
            }
            None => Edit::Unchanged,
        },
        Action::ClearLayer { id } => match find_mut(layers, &id) {
            Some(layer) => {
                if layer.clear() { Edit::Layers } else { Edit::Unchanged }
            }
            None => Edit::Unchanged,
        },
        Action::ClearAll => {
            let mut changed = false;
            for layer in layers.iter_mut() {
                changed |= layer.clear();
            }
            if changed { Edit::Layers } else { Edit::Unchanged }
        }
        Action::RenameLayer { id, name } => {
            let name = name.trim();
            match find_mut(layers, &id) {
                Some(layer) if !name.is_empty() && layer.name != name => {
                    layer.set_name(name.to_string());
                    Edit::Layers
                }
                _ => Edit::Unchanged,
            }
        }
        Action::ReorderLayers { top_to_bottom } => {
            let (changed, reordered) = reorder(std::mem::take(layers), &top_to_bottom);
            *layers = reordered;
            if changed { Edit::Layers } else { Edit::Unchanged }
        }
        Action::CommitStroke { stroke } => {
            if !is_committable(&stroke) {
                return Edit::Unchanged;
            }
            match find_mut(layers, active_layer_id) {
                Some(layer) => {
                    if layer.add_stroke(stroke.sanitized(MIN_BRUSH_SIZE)) {
                        Edit::Layers
                    } else {
                        Edit::Unchanged
                    }
                }
                None => Edit::Unchanged,
            }
        }
        Action::InsertImageLayer { src, name, banana } => {
            let src = src.trim();
            if src.is_empty() {
                return Edit::Unchanged;
            }
            let name = name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string());
            let layer = create_image_layer(&name, src, banana);
            *active_layer_id = layer.id.clone();
            layers.push(layer);
            Edit::Layers
        }
        Action::MoveLayer { id, delta } => {
            if !(delta.x.is_finite() && delta.y.is_finite()) || delta == Vec2::ZERO {
                return Edit::Unchanged;
            }
            let Some(layer) = find_mut(layers, &id) else {
                return Edit::Unchanged;
            };
            match &mut layer.content {
                LayerContent::Vector { offset, .. } => {
                    *offset += delta;
                    Edit::Layers
                }
                LayerContent::Image {
                    bounds: Some(bounds), ..
                } => {
                    *bounds = bounds.translate(delta);
                    Edit::Layers
                }
                // Computed placement has to be frozen into explicit bounds first.
                LayerContent::Image { bounds: None, .. } => Edit::Unchanged,
                LayerContent::Background { .. } => Edit::Unchanged,
            }
        }
        Action::SetImageBounds { id, bounds } => {
            if !is_valid_bounds(&bounds) {
                return Edit::Unchanged;
            }
            match find_mut(layers, &id).map(|l| &mut l.content) {
                Some(LayerContent::Image { bounds: current, .. }) if *current != Some(bounds) => {
                    *current = Some(bounds);
                    Edit::Layers
                }
                _ => Edit::Unchanged,
            }
        }
        Action::SetBackgroundColor { color } => {
            let color = sanitize_color(color);
            let mut found = false;
            let mut changed = false;
            for layer in layers.iter_mut() {
                if let LayerContent::Background { color: current } = &mut layer.content {
                    found = true;
                    if *current != color {
                        *current = color.clone();
                        changed = true;
                    }
                }
            }
            if !found {
                layers.insert(0, create_background_layer(&color));
                changed = true;
            }
            if changed { Edit::Layers } else { Edit::Unchanged }
        }
        Action::EnsureVectorLayer => {
            let active_is_vector = layers
                .iter()
                .find(|l| &l.id == active_layer_id)
                .is_some_and(Layer::is_vector);
            if active_is_vector {
                return Edit::Unchanged;
            }
            let layer = create_layer(&next_layer_name(layers));
            *active_layer_id = layer.id.clone();
            layers.push(layer);
            Edit::Layers
        }
        Action::SetMode(_)
        | Action::SetStrokeColor(_)
        | Action::SetBrushSize(_)
        | Action::LoadLayers { .. }
        | Action::SetCompositeDataUrl(_)
        | Action::BeginGesture
        | Action::EndGesture
        | Action::CancelGesture
        | Action::Undo
        | Action::Redo => {
            log::warn!("{} is not a layer edit", action_name);
            Edit::Unchanged
        }
    }
}

fn load_layers(state: &mut BoardState, mut layers: Vec<Layer>) {
    if !layers.iter().any(Layer::is_background) {
        layers.insert(0, create_background_layer(&state.default_background));
    }
    pin_backgrounds(&mut layers);
    let active = ensure_active_layer_id(&layers, None);
    state.layers = layers;
    if let Some(active) = active {
        state.active_layer_id = active;
    }
    state.history.reset();
    state.bump_revision();
    log::info!("loaded {} layer(s)", state.layers.len());
}

/// Restores the layer invariants after an edit: never empty, backgrounds at the
/// bottom, active id resolvable.
fn heal(snapshot: &mut Snapshot) {
    if snapshot.layers.is_empty() {
        let name = next_layer_name(&snapshot.layers);
        snapshot.layers.push(create_layer(&name));
    }
    pin_backgrounds(&mut snapshot.layers);
    if let Some(active) = ensure_active_layer_id(&snapshot.layers, Some(&snapshot.active_layer_id)) {
        snapshot.active_layer_id = active;
    }
}

/// Stable partition: background layers first, everything else after, each group in
/// its existing relative order.
fn pin_backgrounds(layers: &mut Vec<Layer>) {
    if layers
        .iter()
        .skip_while(|l| l.is_background())
        .any(Layer::is_background)
    {
        let (mut backgrounds, rest): (Vec<Layer>, Vec<Layer>) = std::mem::take(layers)
            .into_iter()
            .partition(Layer::is_background);
        backgrounds.extend(rest);
        *layers = backgrounds;
    }
}

/// Rebuilds the bottom-to-top order from a top-to-bottom id list.
///
/// Backgrounds stay pinned at the bottom in their original order; listed ids follow
/// in the requested order; unlisted layers are placed beneath the listed ones in
/// their original relative order. Unknown and duplicate ids are ignored, so the
/// result is always a permutation of the input. Returns whether the order changed.
fn reorder(layers: Vec<Layer>, top_to_bottom: &[LayerId]) -> (bool, Vec<Layer>) {
    let original: Vec<LayerId> = layers.iter().map(|l| l.id.clone()).collect();
    let (backgrounds, mut others): (Vec<Layer>, Vec<Layer>) =
        layers.into_iter().partition(Layer::is_background);

    let mut seen = HashSet::new();
    let mut listed = Vec::with_capacity(others.len());
    for id in top_to_bottom {
        if !seen.insert(id) {
            continue;
        }
        if let Some(index) = others.iter().position(|l| &l.id == id) {
            listed.push(others.remove(index));
        }
    }

    // `others` now holds the leftovers bottom-to-top; `listed` is top-to-bottom.
    let mut result = backgrounds;
    result.extend(others);
    result.extend(listed.into_iter().rev());

    let changed = result.iter().map(|l| &l.id).ne(original.iter());
    (changed, result)
}

fn is_committable(stroke: &Stroke) -> bool {
    stroke.point_count() >= 2
        && stroke.points.iter().all(|v| v.is_finite())
        && stroke.size.is_finite()
        && stroke.size > 0.0
}

fn is_valid_bounds(bounds: &Rect) -> bool {
    bounds.min.x.is_finite()
        && bounds.min.y.is_finite()
        && bounds.max.x.is_finite()
        && bounds.max.y.is_finite()
        && bounds.width() > 0.0
        && bounds.height() > 0.0
}

fn position(layers: &[Layer], id: &LayerId) -> Option<usize> {
    layers.iter().position(|l| &l.id == id)
}

fn find_mut<'a>(layers: &'a mut [Layer], id: &LayerId) -> Option<&'a mut Layer> {
    layers.iter_mut().find(|l| &l.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::create_layer;

    fn ids(layers: &[Layer]) -> Vec<String> {
        layers.iter().map(|l| l.name.clone()).collect()
    }

    fn named(names: &[&str]) -> Vec<Layer> {
        names
            .iter()
            .map(|n| {
                let mut layer = if n.starts_with("bg") {
                    create_background_layer("#fff")
                } else {
                    create_layer(n)
                };
                layer.id = LayerId::from(*n);
                layer.name = n.to_string();
                layer
            })
            .collect()
    }

    fn order(names: &[&str]) -> Vec<LayerId> {
        names.iter().map(|n| LayerId::from(*n)).collect()
    }

    #[test]
    fn test_reorder_pins_backgrounds_and_keeps_leftovers() {
        let layers = named(&["bg", "a", "b", "c", "d"]);
        let (changed, result) = reorder(layers, &order(&["b", "zz", "d", "b"]));
        assert!(changed);
        // top-to-bottom: b, d, then leftovers c, a
        assert_eq!(ids(&result), ["bg", "a", "c", "d", "b"]);
    }

    #[test]
    fn test_reorder_identity_reports_unchanged() {
        let layers = named(&["bg", "a", "b"]);
        let (changed, result) = reorder(layers, &order(&["b", "a"]));
        assert!(!changed);
        assert_eq!(ids(&result), ["bg", "a", "b"]);
    }

    #[test]
    fn test_pin_backgrounds_is_stable() {
        let mut layers = named(&["a", "bg1", "b", "bg2"]);
        pin_backgrounds(&mut layers);
        assert_eq!(ids(&layers), ["bg1", "bg2", "a", "b"]);
    }

    #[test]
    fn test_noop_keeps_layers_but_takes_an_undo_step() {
        let state = BoardState::default();
        let before = state.snapshot();
        let bg = state.layers[0].id.clone();
        let state = reduce(state, Action::MoveLayer { id: bg, delta: Vec2::new(1.0, 1.0) });
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.past().len(), 1);
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn test_undo_on_empty_history_keeps_gesture_open() {
        let state = reduce(BoardState::default(), Action::BeginGesture);
        let state = reduce(state, Action::Undo);
        assert!(state.gesture_open());
        let state = reduce(state, Action::Redo);
        assert!(state.gesture_open());
    }

    #[test]
    fn test_commit_sanitizes_the_stroke() {
        let long = "rgba(12.5000, 100.0000, 200.0000, 0.5)".to_string();
        let stroke = Stroke::new(long, 0.5, false, vec![1.0, 1.0, 4.0, 4.0, 9.0]);
        let state = reduce(BoardState::default(), Action::CommitStroke { stroke });
        let committed = &state.active_layer().unwrap().strokes()[0];
        assert_eq!(committed.size, MIN_BRUSH_SIZE);
        assert_eq!(committed.color, "rgba(12.5000, 100.0000, 200.0000");
        assert_eq!(committed.points, vec![1.0, 1.0, 4.0, 4.0]);
    }

    #[test]
    fn test_select_is_undoable_but_keeps_revision() {
        let state = BoardState::default();
        let bg = state.layers[0].id.clone();
        let state = reduce(state, Action::SelectLayer { id: bg.clone() });
        assert_eq!(state.active_layer_id, bg);
        assert!(state.can_undo());
        assert_eq!(state.revision(), 0);
    }
}
