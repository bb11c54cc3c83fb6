use super::board::Snapshot;

/// Undo/redo stacks of full board snapshots.
///
/// History is linear: recording a new edit discards the redo stack. `past` is capped
/// at `limit` entries (0 means unbounded); while a gesture is open the cap waits until
/// the gesture closes, so a cancel can always put the stacks back as they were.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: Vec<Snapshot>,
    future: Vec<Snapshot>,
    limit: usize,
    gesture: Option<Gesture>,
}

/// An open interactive gesture. All edits inside it share one snapshot, taken on the
/// first edit.
#[derive(Debug, Clone, Default)]
struct Gesture {
    recorded: bool,
    stashed_future: Vec<Snapshot>,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn past(&self) -> &[Snapshot] {
        &self.past
    }

    pub fn future(&self) -> &[Snapshot] {
        &self.future
    }

    pub fn gesture_open(&self) -> bool {
        self.gesture.is_some()
    }

    /// Records `before` ahead of an edit that is about to change the board.
    pub fn record(&mut self, before: Snapshot) {
        match &mut self.gesture {
            Some(gesture) if gesture.recorded => {}
            Some(gesture) => {
                gesture.recorded = true;
                gesture.stashed_future = std::mem::take(&mut self.future);
                self.past.push(before);
            }
            None => {
                self.future.clear();
                self.push_past(before);
            }
        }
    }

    pub fn begin_gesture(&mut self) {
        if self.gesture.is_some() {
            log::debug!("gesture already open, folding into the new one");
            self.end_gesture();
        }
        self.gesture = Some(Gesture::default());
    }

    pub fn end_gesture(&mut self) {
        if self.gesture.take().is_some() {
            self.trim();
        }
    }

    /// Closes the open gesture without keeping it. Returns the snapshot to restore
    /// when the gesture had changed anything.
    pub fn cancel_gesture(&mut self) -> Option<Snapshot> {
        let gesture = self.gesture.take()?;
        if !gesture.recorded {
            return None;
        }
        self.future = gesture.stashed_future;
        self.past.pop()
    }

    /// Pops the previous snapshot, parking `current` on the redo stack. An empty stack
    /// leaves everything, including an open gesture, untouched.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        if self.past.is_empty() {
            return None;
        }
        self.end_gesture();
        let previous = self.past.pop()?;
        self.future.push(current);
        Some(previous)
    }

    /// Pops the next snapshot, parking `current` on the undo stack.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        if self.future.is_empty() {
            return None;
        }
        self.end_gesture();
        let next = self.future.pop()?;
        self.push_past(current);
        Some(next)
    }

    /// Forgets everything, e.g. after a bulk load.
    pub fn reset(&mut self) {
        self.past.clear();
        self.future.clear();
        self.gesture = None;
    }

    fn push_past(&mut self, snapshot: Snapshot) {
        self.past.push(snapshot);
        self.trim();
    }

    fn trim(&mut self) {
        if self.limit > 0 && self.past.len() > self.limit {
            let excess = self.past.len() - self.limit;
            self.past.drain(..excess);
            log::debug!("history limit {} reached, dropped {} snapshot(s)", self.limit, excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{create_layer, LayerId};

    fn snap(tag: &str) -> Snapshot {
        let layer = create_layer(tag);
        Snapshot {
            active_layer_id: layer.id.clone(),
            layers: vec![layer],
        }
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(2);
        let (a, b, c) = (snap("a"), snap("b"), snap("c"));
        history.record(a);
        history.record(b.clone());
        history.record(c.clone());
        assert_eq!(history.past(), &[b, c]);
    }

    #[test]
    fn test_gesture_records_once_and_cancel_restores_future() {
        let mut history = History::new(0);
        let parked = snap("parked");
        history.record(snap("old"));
        history.undo(parked.clone());
        assert_eq!(history.future().len(), 1);

        history.begin_gesture();
        let origin = snap("origin");
        history.record(origin.clone());
        history.record(snap("ignored"));
        assert_eq!(history.past().len(), 1);
        assert!(history.future().is_empty());

        assert_eq!(history.cancel_gesture(), Some(origin));
        assert_eq!(history.future(), &[parked]);
        assert!(history.past().is_empty());
    }

    #[test]
    fn test_cancel_at_the_limit_keeps_the_oldest() {
        let mut history = History::new(2);
        let (a, b) = (snap("a"), snap("b"));
        history.record(a.clone());
        history.record(b.clone());

        history.begin_gesture();
        history.record(snap("during"));
        assert_eq!(history.past().len(), 3);
        history.cancel_gesture();

        assert_eq!(history.past(), &[a, b]);
    }

    #[test]
    fn test_ended_gesture_is_capped() {
        let mut history = History::new(2);
        let (b, c) = (snap("b"), snap("c"));
        history.record(snap("a"));
        history.record(b.clone());

        history.begin_gesture();
        history.record(c.clone());
        history.end_gesture();

        assert_eq!(history.past(), &[b, c]);
    }

    #[test]
    fn test_cancel_without_edits_is_noop() {
        let mut history = History::new(0);
        history.begin_gesture();
        assert_eq!(history.cancel_gesture(), None);
        assert!(!history.gesture_open());
    }

    #[test]
    fn test_undo_on_empty_is_none() {
        let mut history = History::new(0);
        let current = Snapshot {
            layers: vec![],
            active_layer_id: LayerId::from("x"),
        };
        assert_eq!(history.undo(current.clone()), None);
        history.begin_gesture();
        assert_eq!(history.redo(current), None);
        assert!(history.future().is_empty());
        assert!(history.gesture_open());
    }
}
