mod action;
mod board;
mod history;
mod reducer;

pub use action::{Action, ActionKind};
pub use board::{BoardState, Mode, Snapshot};
pub use history::History;
pub use reducer::{apply, reduce};

use crate::collaborators::PersistenceSink;
use crate::persistence;

/// Owns the board state and is the only place it is mutated.
///
/// Every dispatch runs the reducer synchronously; when the transition changed the layer
/// list, each registered persistence sink receives the saved document exactly once.
pub struct Store {
    state: BoardState,
    sinks: Vec<Box<dyn PersistenceSink>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("sinks", &format!("<{} sinks>", self.sinks.len()))
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(BoardState::default())
    }
}

impl Store {
    pub fn new(state: BoardState) -> Self {
        Self {
            state,
            sinks: Vec::new(),
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn subscribe(&mut self, sink: Box<dyn PersistenceSink>) {
        self.sinks.push(sink);
    }

    /// Applies `action`. Returns whether the layer list changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let before = self.state.revision();
        apply(&mut self.state, action);
        let changed = self.state.revision() != before;
        if changed && !self.sinks.is_empty() {
            let document = persistence::save(&self.state.layers);
            for sink in &mut self.sinks {
                sink.persist(&document);
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::BoardDocument;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_sink_fires_once_per_layer_change() {
        let saved: Rc<RefCell<Vec<BoardDocument>>> = Rc::default();
        let mut store = Store::default();
        let log = saved.clone();
        store.subscribe(Box::new(move |doc: &BoardDocument| log.borrow_mut().push(doc.clone())));

        store.dispatch(Action::SetMode(Mode::Erase));
        assert!(saved.borrow().is_empty());

        assert!(store.dispatch(Action::AddLayer { name: None }));
        assert_eq!(saved.borrow().len(), 1);
        assert_eq!(saved.borrow()[0].layers.len(), 3);

        store.dispatch(Action::Undo);
        assert_eq!(saved.borrow().len(), 2);
        store.dispatch(Action::Undo);
        assert_eq!(saved.borrow().len(), 2);
    }
}
