use egui::{Modifiers, PointerButton, Pos2};

mod controller;
mod hit_testing;

pub use controller::PointerController;
pub use hit_testing::{LayerBounds, hit_test, strictly_contains};

/// Device that produced a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerKind {
    #[default]
    Mouse,
    Pen,
    Touch,
}

/// One pointer event, already converted to canvas (CSS pixel) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInput {
    pub pointer_id: u64,
    pub kind: PointerKind,
    /// Whether this is the primary pointer of its kind (first finger, the mouse, …).
    pub is_primary: bool,
    /// Button that changed state; `None` for moves.
    pub button: Option<PointerButton>,
    pub pos: Pos2,
    pub modifiers: Modifiers,
    /// High-frequency sub-samples batched into this event, oldest first. When present
    /// they replace `pos` as the sampled path.
    pub coalesced: Vec<Pos2>,
}

impl PointerInput {
    pub fn mouse(pos: Pos2) -> Self {
        Self {
            pointer_id: 1,
            kind: PointerKind::Mouse,
            is_primary: true,
            button: Some(PointerButton::Primary),
            pos,
            modifiers: Modifiers::NONE,
            coalesced: Vec::new(),
        }
    }

    pub fn with_button(mut self, button: Option<PointerButton>) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_coalesced(mut self, samples: Vec<Pos2>) -> Self {
        self.coalesced = samples;
        self
    }

    /// The sampled path of this event.
    pub fn samples(&self) -> &[Pos2] {
        if self.coalesced.is_empty() {
            std::slice::from_ref(&self.pos)
        } else {
            &self.coalesced
        }
    }
}

/// Pointer capture the host should acquire or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureChange {
    Acquire(u64),
    Release(u64),
}

/// How urgently the host should repaint after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Repaint {
    #[default]
    None,
    /// Through the frame limiter.
    Request,
    /// Immediately, e.g. right after a stroke is committed.
    Force,
}

/// What the host has to do after the controller handled an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputResponse {
    pub capture: Option<CaptureChange>,
    pub repaint: Repaint,
    /// The event was meant for the board and should not reach anything else
    /// (including the platform context menu).
    pub consumed: bool,
}

impl InputResponse {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn consumed(repaint: Repaint) -> Self {
        Self {
            capture: None,
            repaint,
            consumed: true,
        }
    }

    pub fn with_capture(mut self, capture: CaptureChange) -> Self {
        self.capture = Some(capture);
        self
    }
}
