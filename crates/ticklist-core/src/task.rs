use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticklist_shared::TaskDraft;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Records written before ids existed get one on load; the store
    /// writes them back once so the id sticks.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub title: String,

    pub text: String,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Task {
    pub fn new(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            text: draft.text,
            created: now,
        }
    }

    /// Overwrites the visible content, keeping identity and creation time.
    pub fn apply(&mut self, draft: TaskDraft) {
        self.title = draft.title;
        self.text = draft.text;
    }
}

/// Which of the two persisted lists a task lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskList {
    Pending,
    Completed,
}

pub fn position_of(tasks: &[Task], id: Uuid) -> Option<usize> {
    tasks.iter().position(|task| task.id == id)
}

/// Resolves a positional index from a window message. Negative and
/// out-of-range indices resolve to nothing.
pub fn id_at(tasks: &[Task], index: i64) -> Option<Uuid> {
    let index = usize::try_from(index).ok()?;
    tasks.get(index).map(|task| task.id)
}
