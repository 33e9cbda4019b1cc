use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use crate::prefs::Preference;
use crate::store::Store;
use crate::task::{Task, position_of};

/// In-process mirror of the store keys the tray reads. Only ever refreshed
/// from the store; nothing writes to it directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateCache {
    tasks: Vec<Task>,
    completed: Vec<Task>,
    prefs: BTreeMap<Preference, bool>,
}

impl StateCache {
    pub fn load(store: &Store) -> anyhow::Result<Self> {
        let mut cache = Self::default();
        cache.refresh(store)?;
        Ok(cache)
    }

    #[tracing::instrument(skip_all)]
    pub fn refresh(&mut self, store: &Store) -> anyhow::Result<()> {
        self.tasks = store.tasks()?;
        self.completed = store.completed()?;
        self.prefs = Preference::ALL
            .into_iter()
            .map(|pref| (pref, store.pref(pref)))
            .collect();

        debug!(
            tasks = self.tasks.len(),
            completed = self.completed.len(),
            "state cache refreshed"
        );
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn pref(&self, pref: Preference) -> bool {
        self.prefs
            .get(&pref)
            .copied()
            .unwrap_or_else(|| pref.default_value())
    }

    /// Preference map as pushed to the settings windows.
    pub fn preferences(&self) -> BTreeMap<String, bool> {
        Preference::ALL
            .into_iter()
            .map(|pref| (pref.key().to_string(), self.pref(pref)))
            .collect()
    }

    pub fn find_task(&self, id: Uuid) -> Option<(usize, &Task)> {
        let index = position_of(&self.tasks, id)?;
        Some((index, &self.tasks[index]))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ticklist_shared::TaskDraft;

    use super::*;
    use crate::store::StoreKey;

    #[test]
    fn reflects_store_after_refresh() {
        let mut store = Store::in_memory().expect("store");
        let mut cache = StateCache::load(&store).expect("cache");
        assert!(cache.tasks().is_empty());
        assert!(cache.pref(Preference::LeftClick));

        let task = Task::new(
            TaskDraft::from_input("stretch").expect("draft"),
            Utc::now(),
        );
        store
            .set(StoreKey::Tasks, &vec![task.clone()])
            .expect("set tasks");
        store
            .set(StoreKey::Pref(Preference::LeftClick), &false)
            .expect("set left click");

        assert!(cache.tasks().is_empty(), "cache only moves on refresh");
        cache.refresh(&store).expect("refresh");
        assert_eq!(cache.tasks(), &[task.clone()]);
        assert!(!cache.pref(Preference::LeftClick));
        assert_eq!(cache.find_task(task.id).map(|(i, _)| i), Some(0));
        assert_eq!(cache.preferences().get("pref_left_click"), Some(&false));
    }
}
