use ticklist_shared::{EditRequest, Outbound};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::StateCache;
use crate::handlers::Outcome;
use crate::platform::{WindowFactory, WindowHandle, WindowKind};

/// The editor opens at `y / 2.8` so it sits high on screen, like a
/// launcher prompt.
pub const VERTICAL_OFFSET_DIVISOR: f64 = 2.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    OpenAdd,
    OpenEdit(Uuid),
}

/// Owns the single add/edit popup. The window is created on first use and
/// only ever hidden afterwards.
pub struct EditorController {
    window: Option<Box<dyn WindowHandle>>,
    state: EditorState,
}

impl Default for EditorController {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorController {
    pub fn new() -> Self {
        Self {
            window: None,
            state: EditorState::Closed,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }

    pub fn open_add(&mut self, factory: &mut dyn WindowFactory) {
        self.acquire(factory);
        if self.state == EditorState::Closed {
            self.state = EditorState::OpenAdd;
        }
        debug!(state = ?self.state, "editor opened for add");
    }

    /// Pushes the task's text as it is right now; a task that has vanished
    /// since the menu was built is ignored.
    pub fn open_edit(
        &mut self,
        factory: &mut dyn WindowFactory,
        cache: &StateCache,
        id: Uuid,
    ) -> Outcome {
        let Some((index, task)) = cache.find_task(id) else {
            debug!(%id, "edit requested for a task that no longer exists");
            return Outcome::Ignored("task not found");
        };
        let request = EditRequest {
            index,
            id,
            text: task.text.clone(),
        };

        let window = self.acquire(factory);
        window.send(Outbound::EditTask(request));
        self.state = EditorState::OpenEdit(id);
        debug!(%id, index, "editor opened for edit");
        Outcome::Applied
    }

    /// Blur, Escape, and submit all end here. The form goes back to add
    /// mode whichever state it was in.
    pub fn close(&mut self) {
        if let Some(window) = self.window.as_mut() {
            window.hide();
            window.send(Outbound::ResetWin);
        }
        if self.state != EditorState::Closed {
            debug!(from = ?self.state, "editor closed");
        }
        self.state = EditorState::Closed;
    }

    fn acquire(&mut self, factory: &mut dyn WindowFactory) -> &mut Box<dyn WindowHandle> {
        let created = self.window.is_none();
        let window = self
            .window
            .get_or_insert_with(|| factory.create(WindowKind::Editor));

        window.show();
        if created {
            let (x, y) = window.position();
            let lifted = (f64::from(y) / VERTICAL_OFFSET_DIVISOR).floor() as i32;
            window.set_position(x, lifted);
            info!(x, y = lifted, "created editor window");
        }
        window.focus();
        window
    }
}
