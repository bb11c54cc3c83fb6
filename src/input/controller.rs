use egui::{Key, Modifiers, PointerButton, Pos2, Vec2};

use super::hit_testing::{LayerBounds, hit_test};
use super::{CaptureChange, InputResponse, PointerInput, PointerKind, Repaint};
use crate::config::BoardConfig;
use crate::layer::{Layer, LayerContent, LayerId};
use crate::state::{Action, Mode, Store};
use crate::stroke::{MutableStroke, Stroke};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone)]
enum Gesture {
    Stroke {
        pointer_id: u64,
        stroke: MutableStroke,
    },
    Drag {
        pointer_id: u64,
        layer: LayerId,
        last: Pos2,
        lock: Option<Axis>,
    },
}

impl Gesture {
    fn pointer_id(&self) -> u64 {
        match self {
            Gesture::Stroke { pointer_id, .. } | Gesture::Drag { pointer_id, .. } => *pointer_id,
        }
    }
}

/// Turns pointer and key events into board actions.
///
/// Follows a single pointer at a time. Every stroke or drag runs inside a gesture
/// transaction on the store, so it undoes as one step and a cancel leaves no trace.
#[derive(Debug, Clone)]
pub struct PointerController {
    gesture: Option<Gesture>,
    min_sample_distance: f32,
    nudge_step: f32,
    nudge_step_large: f32,
}

impl PointerController {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            gesture: None,
            min_sample_distance: config.min_sample_distance,
            nudge_step: config.nudge_step,
            nudge_step_large: config.nudge_step_large,
        }
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// The stroke being drawn, in canvas coordinates.
    pub fn preview(&self) -> Option<Stroke> {
        match &self.gesture {
            Some(Gesture::Stroke { stroke, .. }) => Some(stroke.to_stroke()),
            _ => None,
        }
    }

    /// Starts a stroke or a drag depending on the current mode.
    ///
    /// `density` converts the device-pixel sampling distance to canvas units.
    pub fn pointer_down(
        &mut self,
        input: &PointerInput,
        store: &mut Store,
        bounds: &dyn LayerBounds,
        density: f32,
    ) -> InputResponse {
        if self.gesture.is_some() || !input.is_primary {
            return InputResponse::ignored();
        }
        if input.kind == PointerKind::Mouse && input.button != Some(PointerButton::Primary) {
            return InputResponse::ignored();
        }

        let state = store.state();
        match state.mode {
            Mode::Draw | Mode::Erase => {
                let erase = state.mode == Mode::Erase;
                let color = state.stroke_color.clone();
                let size = state.brush_size;
                store.dispatch(Action::BeginGesture);
                store.dispatch(Action::EnsureVectorLayer);

                let spacing = to_canvas_units(self.min_sample_distance, density);
                let stroke = MutableStroke::begin(input.pos, color, size, erase, spacing);
                self.gesture = Some(Gesture::Stroke {
                    pointer_id: input.pointer_id,
                    stroke,
                });
            }
            Mode::Move => {
                let Some(layer) = hit_test(&state.layers, input.pos, bounds) else {
                    return InputResponse::consumed(Repaint::None);
                };
                let id = layer.id.clone();
                let frozen = match &layer.content {
                    LayerContent::Image { bounds: None, .. } => bounds.layer_bounds(layer),
                    _ => None,
                };
                store.dispatch(Action::BeginGesture);
                store.dispatch(Action::SelectLayer { id: id.clone() });
                if let Some(rect) = frozen {
                    store.dispatch(Action::SetImageBounds { id: id.clone(), bounds: rect });
                }
                self.gesture = Some(Gesture::Drag {
                    pointer_id: input.pointer_id,
                    layer: id,
                    last: input.pos,
                    lock: None,
                });
            }
        }
        InputResponse::consumed(Repaint::Request).with_capture(CaptureChange::Acquire(input.pointer_id))
    }

    pub fn pointer_move(&mut self, input: &PointerInput, store: &mut Store) -> InputResponse {
        match &mut self.gesture {
            Some(Gesture::Stroke { pointer_id, stroke }) if *pointer_id == input.pointer_id => {
                let mut added = false;
                for &sample in input.samples() {
                    added |= stroke.add_point(sample);
                }
                InputResponse::consumed(if added { Repaint::Request } else { Repaint::None })
            }
            Some(Gesture::Drag {
                pointer_id,
                layer,
                last,
                lock,
            }) if *pointer_id == input.pointer_id => {
                let mut delta = input.pos - *last;
                *last = input.pos;
                if lock.is_none() && input.modifiers.shift && delta != Vec2::ZERO {
                    *lock = Some(if delta.x.abs() >= delta.y.abs() { Axis::X } else { Axis::Y });
                }
                match lock {
                    Some(Axis::X) => delta.y = 0.0,
                    Some(Axis::Y) => delta.x = 0.0,
                    None => {}
                }
                if delta == Vec2::ZERO {
                    return InputResponse::consumed(Repaint::None);
                }
                store.dispatch(Action::MoveLayer {
                    id: layer.clone(),
                    delta,
                });
                InputResponse::consumed(Repaint::Request)
            }
            _ => InputResponse::ignored(),
        }
    }

    /// Commits the stroke or ends the drag.
    pub fn pointer_up(&mut self, input: &PointerInput, store: &mut Store) -> InputResponse {
        if !self.owns(input.pointer_id) {
            return InputResponse::ignored();
        }
        if let Some(Gesture::Stroke { stroke, .. }) = &mut self.gesture {
            stroke.add_point(input.pos);
        }
        self.finish(store)
    }

    /// Aborts the in-flight gesture; the board returns to its state before it began.
    pub fn pointer_cancel(&mut self, pointer_id: u64, store: &mut Store) -> InputResponse {
        if !self.owns(pointer_id) {
            return InputResponse::ignored();
        }
        self.gesture = None;
        store.dispatch(Action::CancelGesture);
        log::debug!("pointer {pointer_id} cancelled, gesture rolled back");
        InputResponse::consumed(Repaint::Request).with_capture(CaptureChange::Release(pointer_id))
    }

    /// Capture was taken away by the platform. The gesture is kept as if released.
    pub fn lost_capture(&mut self, pointer_id: u64, store: &mut Store) -> InputResponse {
        if !self.owns(pointer_id) {
            return InputResponse::ignored();
        }
        let mut response = self.finish(store);
        response.capture = None;
        response
    }

    /// Suppresses the platform context menu over the board.
    pub fn context_menu(&self) -> InputResponse {
        InputResponse::consumed(Repaint::None)
    }

    /// Arrow keys nudge the active layer by whole device pixels; `density` converts the
    /// step to canvas units.
    pub fn key_down(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        store: &mut Store,
        bounds: &dyn LayerBounds,
        density: f32,
    ) -> InputResponse {
        if modifiers.command {
            let action = match key {
                Key::Z if modifiers.shift => Action::Redo,
                Key::Z => Action::Undo,
                Key::Y => Action::Redo,
                _ => return InputResponse::ignored(),
            };
            // History jumps mid-gesture would tear the open transaction apart.
            if self.gesture.is_some() {
                return InputResponse::consumed(Repaint::None);
            }
            store.dispatch(action);
            return InputResponse::consumed(Repaint::Request);
        }

        if key == Key::Escape {
            return match self.gesture.as_ref().map(Gesture::pointer_id) {
                Some(pointer_id) => self.pointer_cancel(pointer_id, store),
                None => InputResponse::ignored(),
            };
        }

        let direction = match key {
            Key::ArrowLeft => Vec2::new(-1.0, 0.0),
            Key::ArrowRight => Vec2::new(1.0, 0.0),
            Key::ArrowUp => Vec2::new(0.0, -1.0),
            Key::ArrowDown => Vec2::new(0.0, 1.0),
            _ => return InputResponse::ignored(),
        };
        if store.state().mode != Mode::Move || self.gesture.is_some() {
            return InputResponse::ignored();
        }
        let step = if modifiers.shift {
            self.nudge_step_large
        } else {
            self.nudge_step
        };
        if self.nudge(direction * to_canvas_units(step, density), store, bounds) {
            InputResponse::consumed(Repaint::Request)
        } else {
            InputResponse::consumed(Repaint::None)
        }
    }

    fn nudge(&self, delta: Vec2, store: &mut Store, bounds: &dyn LayerBounds) -> bool {
        let Some(layer) = store.state().active_layer() else {
            return false;
        };
        let id = layer.id.clone();
        let frozen = match &layer.content {
            LayerContent::Background { .. } => return false,
            LayerContent::Image { bounds: None, .. } => match bounds.layer_bounds(layer) {
                Some(rect) => Some(rect),
                // Placement is unknown until the image decodes.
                None => return false,
            },
            _ => None,
        };
        store.dispatch(Action::BeginGesture);
        if let Some(rect) = frozen {
            store.dispatch(Action::SetImageBounds { id: id.clone(), bounds: rect });
        }
        let moved = store.dispatch(Action::MoveLayer { id, delta });
        store.dispatch(Action::EndGesture);
        moved
    }

    fn owns(&self, pointer_id: u64) -> bool {
        self.gesture.as_ref().is_some_and(|g| g.pointer_id() == pointer_id)
    }

    fn finish(&mut self, store: &mut Store) -> InputResponse {
        match self.gesture.take() {
            Some(Gesture::Stroke { pointer_id, stroke }) => {
                let repaint = if stroke.point_count() >= 2 {
                    let offset = store.state().active_layer().map_or(Vec2::ZERO, Layer::offset);
                    store.dispatch(Action::CommitStroke {
                        stroke: stroke.finish(offset),
                    });
                    Repaint::Force
                } else {
                    Repaint::Request
                };
                store.dispatch(Action::EndGesture);
                InputResponse::consumed(repaint).with_capture(CaptureChange::Release(pointer_id))
            }
            Some(Gesture::Drag { pointer_id, .. }) => {
                store.dispatch(Action::EndGesture);
                InputResponse::consumed(Repaint::Request).with_capture(CaptureChange::Release(pointer_id))
            }
            None => InputResponse::ignored(),
        }
    }
}

fn to_canvas_units(device_pixels: f32, density: f32) -> f32 {
    let density = if density.is_finite() && density > 0.0 { density } else { 1.0 };
    device_pixels / density
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Rect, pos2, vec2};

    fn no_bounds(_: &Layer) -> Option<Rect> {
        None
    }

    fn whole_canvas(_: &Layer) -> Option<Rect> {
        Some(Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0)))
    }

    fn shift() -> Modifiers {
        Modifiers {
            shift: true,
            ..Modifiers::NONE
        }
    }

    #[test]
    fn test_secondary_mouse_button_is_ignored() {
        let mut store = Store::default();
        let mut controller = PointerController::new(&BoardConfig::default());
        let down = PointerInput::mouse(pos2(5.0, 5.0)).with_button(Some(PointerButton::Secondary));
        assert!(!controller.pointer_down(&down, &mut store, &no_bounds, 1.0).consumed);
        assert!(!controller.is_active());
    }

    #[test]
    fn test_axis_lock_holds_for_rest_of_drag() {
        let mut store = Store::default();
        store.dispatch(Action::SetMode(Mode::Move));
        let active = store.state().active_layer_id.clone();
        store.dispatch(Action::CommitStroke {
            stroke: Stroke::new("#000", 2.0, false, vec![10.0, 10.0, 20.0, 20.0]),
        });
        let mut controller = PointerController::new(&BoardConfig::default());

        controller.pointer_down(&PointerInput::mouse(pos2(15.0, 15.0)), &mut store, &whole_canvas, 1.0);
        let step = |p| PointerInput::mouse(p).with_button(None).with_modifiers(shift());
        controller.pointer_move(&step(pos2(25.0, 17.0)), &mut store);
        controller.pointer_move(&step(pos2(27.0, 40.0)), &mut store);
        controller.pointer_move(&PointerInput::mouse(pos2(30.0, 60.0)).with_button(None), &mut store);
        controller.pointer_up(&PointerInput::mouse(pos2(30.0, 60.0)), &mut store);

        assert_eq!(store.state().layer(&active).unwrap().offset(), vec2(15.0, 0.0));
        // The whole drag, selection included, is one undo step.
        assert_eq!(store.state().past().len(), 2);
    }

    #[test]
    fn test_coalesced_samples_are_thinned() {
        let mut store = Store::default();
        let mut controller = PointerController::new(&BoardConfig::default());
        controller.pointer_down(&PointerInput::mouse(pos2(0.0, 0.0)), &mut store, &no_bounds, 2.0);
        let batch = vec![pos2(0.2, 0.0), pos2(0.6, 0.0), pos2(0.7, 0.0), pos2(3.0, 0.0)];
        controller.pointer_move(&PointerInput::mouse(pos2(3.0, 0.0)).with_coalesced(batch), &mut store);
        // 2 start points, then 0.6 and 3.0 survive the half-pixel spacing
        assert_eq!(controller.preview().unwrap().point_count(), 4);
    }

    #[test]
    fn test_nudge_is_one_device_pixel() {
        let mut store = Store::default();
        store.dispatch(Action::SetMode(Mode::Move));
        let active = store.state().active_layer_id.clone();
        let mut controller = PointerController::new(&BoardConfig::default());

        controller.key_down(Key::ArrowRight, Modifiers::NONE, &mut store, &no_bounds, 2.0);
        controller.key_down(Key::ArrowDown, shift(), &mut store, &no_bounds, 2.0);

        assert_eq!(store.state().layer(&active).unwrap().offset(), vec2(0.5, 5.0));
    }
}
