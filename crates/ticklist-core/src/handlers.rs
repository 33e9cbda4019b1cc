//! Task and preference mutations. Each handler reads the cached lists,
//! derives the next value, and writes it through the store; the cache only
//! catches up once the store's change notifications are processed.

use chrono::{DateTime, Utc};
use serde_json::Value;
use ticklist_shared::TaskDraft;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cache::StateCache;
use crate::prefs::Preference;
use crate::store::{Store, StoreKey};
use crate::task::{Task, TaskList, position_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(&'static str),
}

impl Outcome {
    pub fn applied(self) -> bool {
        self == Outcome::Applied
    }
}

#[instrument(skip(store, cache, draft, now), fields(text_len = draft.text.len()))]
pub fn add_task(
    store: &mut Store,
    cache: &StateCache,
    draft: TaskDraft,
    now: DateTime<Utc>,
) -> anyhow::Result<Outcome> {
    // The title shown in the menu is always derived from the text.
    let Some(draft) = TaskDraft::from_input(&draft.text) else {
        return Ok(Outcome::Ignored("empty task"));
    };

    let task = Task::new(draft, now);
    let mut tasks = cache.tasks().to_vec();
    tasks.insert(0, task);
    store.set(StoreKey::Tasks, &tasks)?;

    info!(count = tasks.len(), "task added");
    Ok(Outcome::Applied)
}

#[instrument(skip(store, cache, draft))]
pub fn update_task(
    store: &mut Store,
    cache: &StateCache,
    id: Uuid,
    draft: TaskDraft,
) -> anyhow::Result<Outcome> {
    // The title shown in the menu is always derived from the text.
    let Some(draft) = TaskDraft::from_input(&draft.text) else {
        return Ok(Outcome::Ignored("empty task"));
    };

    let mut tasks = cache.tasks().to_vec();
    let Some(index) = position_of(&tasks, id) else {
        debug!("update for a task that no longer exists");
        return Ok(Outcome::Ignored("task not found"));
    };

    tasks[index].apply(draft);
    store.set(StoreKey::Tasks, &tasks)?;

    info!(index, "task updated");
    Ok(Outcome::Applied)
}

/// Moves the task to the head of the completed list. Both lists are
/// written together.
#[instrument(skip(store, cache))]
pub fn complete_task(store: &mut Store, cache: &StateCache, id: Uuid) -> anyhow::Result<Outcome> {
    let mut tasks = cache.tasks().to_vec();
    let Some(index) = position_of(&tasks, id) else {
        debug!("completion for a task that no longer exists");
        return Ok(Outcome::Ignored("task not found"));
    };

    let task = tasks.remove(index);
    let mut completed = cache.completed().to_vec();
    completed.insert(0, task);

    store.set_many(vec![
        (StoreKey::Completed, serde_json::to_value(&completed)?),
        (StoreKey::Tasks, serde_json::to_value(&tasks)?),
    ])?;

    info!(
        pending = tasks.len(),
        completed = completed.len(),
        "task completed"
    );
    Ok(Outcome::Applied)
}

#[instrument(skip(store, cache))]
pub fn delete_task(
    store: &mut Store,
    cache: &StateCache,
    list: TaskList,
    id: Uuid,
) -> anyhow::Result<Outcome> {
    let (key, source) = match list {
        TaskList::Pending => (StoreKey::Tasks, cache.tasks()),
        TaskList::Completed => (StoreKey::Completed, cache.completed()),
    };

    let mut tasks = source.to_vec();
    let Some(index) = position_of(&tasks, id) else {
        debug!("delete for a task that no longer exists");
        return Ok(Outcome::Ignored("task not found"));
    };

    tasks.remove(index);
    store.set(key, &tasks)?;

    info!(index, remaining = tasks.len(), "task deleted");
    Ok(Outcome::Applied)
}

#[instrument(skip(store))]
pub fn clear_completed(store: &mut Store) -> anyhow::Result<Outcome> {
    store.set(StoreKey::Completed, &Vec::<Task>::new())?;
    info!("completed tasks cleared");
    Ok(Outcome::Applied)
}

/// Whether a clear-all would change anything; the caller asks for
/// confirmation only when it would.
pub fn has_any_tasks(cache: &StateCache) -> bool {
    !cache.tasks().is_empty() || !cache.completed().is_empty()
}

/// Empties both lists. Confirmation happens before this is called.
#[instrument(skip(store, cache))]
pub fn clear_all(store: &mut Store, cache: &StateCache) -> anyhow::Result<Outcome> {
    if !has_any_tasks(cache) {
        return Ok(Outcome::Ignored("nothing to clear"));
    }

    let empty = Value::Array(vec![]);
    store.set_many(vec![
        (StoreKey::Tasks, empty.clone()),
        (StoreKey::Completed, empty),
    ])?;

    info!("all tasks cleared");
    Ok(Outcome::Applied)
}

#[instrument(skip(store, value))]
pub fn update_preference(store: &mut Store, key: &str, value: &Value) -> anyhow::Result<Outcome> {
    let Some(pref) = Preference::from_key(key) else {
        debug!("unknown preference key");
        return Ok(Outcome::Ignored("unknown preference"));
    };
    let Some(flag) = value.as_bool() else {
        debug!(?value, "non-boolean preference value");
        return Ok(Outcome::Ignored("preference values are booleans"));
    };

    store.set(StoreKey::Pref(pref), &flag)?;
    info!(%pref, value = flag, "preference updated");
    Ok(Outcome::Applied)
}
