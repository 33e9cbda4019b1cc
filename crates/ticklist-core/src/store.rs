use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::prefs::Preference;
use crate::task::Task;

pub const STORE_FILE: &str = "store.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreKey {
    Tasks,
    Completed,
    Pref(Preference),
}

impl StoreKey {
    pub fn all() -> impl Iterator<Item = StoreKey> {
        [StoreKey::Tasks, StoreKey::Completed]
            .into_iter()
            .chain(Preference::ALL.into_iter().map(StoreKey::Pref))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Tasks => "tasks",
            StoreKey::Completed => "completed",
            StoreKey::Pref(pref) => pref.key(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "tasks" => Some(StoreKey::Tasks),
            "completed" => Some(StoreKey::Completed),
            other => Preference::from_key(other).map(StoreKey::Pref),
        }
    }

    pub fn default_value(self) -> Value {
        match self {
            StoreKey::Tasks | StoreKey::Completed => Value::Array(vec![]),
            StoreKey::Pref(pref) => Value::Bool(pref.default_value()),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value transition observed on one key.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub key: StoreKey,
    pub old: Value,
    pub new: Value,
}

/// Where the key-value map lives between runs.
pub trait StoreBackend {
    fn load(&self) -> anyhow::Result<Map<String, Value>>;
    fn save(&self, values: &Map<String, Value>) -> anyhow::Result<()>;
    fn describe(&self) -> String;
}

#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreBackend for JsonFileBackend {
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    fn load(&self) -> anyhow::Result<Map<String, Value>> {
        if !self.path.exists() {
            debug!("store file missing; starting from defaults");
            return Ok(Map::new());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(anyhow!(
                "{} must hold a JSON object, found {}",
                self.path.display(),
                kind_of(&other)
            )),
        }
    }

    #[tracing::instrument(skip(self, values), fields(file = %self.path.display()))]
    fn save(&self, values: &Map<String, Value>) -> anyhow::Result<()> {
        debug!(keys = values.len(), "saving store atomically");

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string_pretty(values)?;
        writeln!(temp, "{serialized}")?;
        temp.flush()?;

        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps everything in process; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<Map<String, Value>>,
}

impl MemoryBackend {
    pub fn with_values(values: Map<String, Value>) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> anyhow::Result<Map<String, Value>> {
        Ok(self.values.lock().clone())
    }

    fn save(&self, values: &Map<String, Value>) -> anyhow::Result<()> {
        *self.values.lock() = values.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Typed view over the persisted key-value map. Every write is persisted
/// before it is acknowledged and queues a [`Change`] for each key whose
/// value actually moved.
pub struct Store {
    backend: Box<dyn StoreBackend>,
    values: Map<String, Value>,
    pending: Vec<Change>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend.describe())
            .field("keys", &self.values.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Store {
    #[tracing::instrument(skip(backend))]
    pub fn open(backend: Box<dyn StoreBackend>) -> anyhow::Result<Self> {
        let values = backend.load()?;
        let mut store = Self {
            backend,
            values,
            pending: vec![],
        };
        store.assign_missing_ids()?;

        info!(
            backend = %store.backend.describe(),
            keys = store.values.len(),
            "opened store"
        );
        Ok(store)
    }

    #[tracing::instrument(skip(data_dir))]
    pub fn open_dir(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let backend = JsonFileBackend::new(data_dir.join(STORE_FILE));
        Self::open(Box::new(backend))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Self::open(Box::new(MemoryBackend::default()))
    }

    /// Current value, falling back to the key's default.
    pub fn raw(&self, key: StoreKey) -> Value {
        self.values
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| key.default_value())
    }

    pub fn get<T: DeserializeOwned>(&self, key: StoreKey) -> anyhow::Result<T> {
        serde_json::from_value(self.raw(key))
            .with_context(|| format!("stored value for `{key}` has an unexpected shape"))
    }

    pub fn tasks(&self) -> anyhow::Result<Vec<Task>> {
        self.get(StoreKey::Tasks)
    }

    pub fn completed(&self) -> anyhow::Result<Vec<Task>> {
        self.get(StoreKey::Completed)
    }

    pub fn pref(&self, pref: Preference) -> bool {
        match self.get::<bool>(StoreKey::Pref(pref)) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %pref, error = %err, "non-boolean preference; using default");
                pref.default_value()
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: StoreKey, value: &T) -> anyhow::Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize value for `{key}`"))?;
        self.set_many(vec![(key, value)])
    }

    /// Writes several keys in one persisted step. Observers see either none
    /// or all of them.
    #[tracing::instrument(skip(self, writes), fields(count = writes.len()))]
    pub fn set_many(&mut self, writes: Vec<(StoreKey, Value)>) -> anyhow::Result<()> {
        let mut next = self.values.clone();
        let mut changes = Vec::new();

        for (key, value) in writes {
            let old = self.raw(key);
            if old == value {
                continue;
            }
            next.insert(key.as_str().to_string(), value.clone());
            changes.push(Change {
                key,
                old,
                new: value,
            });
        }

        if changes.is_empty() {
            debug!("write left every key unchanged");
            return Ok(());
        }

        self.backend
            .save(&next)
            .with_context(|| format!("failed to persist store to {}", self.backend.describe()))?;
        self.values = next;

        for change in &changes {
            debug!(key = %change.key, "store key changed");
        }
        self.pending.extend(changes);
        Ok(())
    }

    /// Re-reads the backend and queues a change for every known key that
    /// was modified outside this process.
    #[tracing::instrument(skip(self))]
    pub fn reload(&mut self) -> anyhow::Result<()> {
        let fresh = self.backend.load()?;
        let previous = std::mem::replace(&mut self.values, fresh);

        let mut changed = 0_usize;
        for key in StoreKey::all() {
            let old = previous
                .get(key.as_str())
                .cloned()
                .unwrap_or_else(|| key.default_value());
            let new = self.raw(key);
            if old != new {
                changed += 1;
                self.pending.push(Change { key, old, new });
            }
        }
        self.assign_missing_ids()?;

        info!(changed, "reloaded store");
        Ok(())
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn drain_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.pending)
    }

    /// Gives every stored task an id and writes the lists back once.
    /// Runs silently: it is a storage migration, not a user change.
    fn assign_missing_ids(&mut self) -> anyhow::Result<()> {
        let mut migrated = false;

        for key in [StoreKey::Tasks, StoreKey::Completed] {
            let Some(Value::Array(items)) = self.values.get(key.as_str()) else {
                continue;
            };
            if items
                .iter()
                .all(|item| item.get("id").is_some_and(|id| !id.is_null()))
            {
                continue;
            }

            let tasks: Vec<Task> = self.get(key)?;
            self.values
                .insert(key.as_str().to_string(), serde_json::to_value(&tasks)?);
            info!(key = %key, count = tasks.len(), "assigned ids to stored tasks");
            migrated = true;
        }

        if migrated {
            self.backend.save(&self.values)?;
        }
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn defaults_when_empty() {
        let store = Store::in_memory().expect("open store");
        assert!(store.tasks().expect("tasks").is_empty());
        assert!(store.pref(Preference::Sounds));
        assert!(!store.pref(Preference::AutomaticallyClear));
        assert!(store.pref(Preference::FirstLaunch));
    }

    #[test]
    fn set_queues_change_only_when_value_moves() {
        let mut store = Store::in_memory().expect("open store");

        store
            .set(StoreKey::Pref(Preference::Sounds), &true)
            .expect("set sounds");
        assert!(!store.has_pending_changes());

        store
            .set(StoreKey::Pref(Preference::Sounds), &false)
            .expect("set sounds");
        let changes = store.drain_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].key, StoreKey::Pref(Preference::Sounds));
        assert_eq!(changes[0].old, json!(true));
        assert_eq!(changes[0].new, json!(false));
        assert!(store.drain_changes().is_empty());
    }

    #[test]
    fn set_many_is_one_write() {
        let mut store = Store::in_memory().expect("open store");
        store
            .set_many(vec![
                (StoreKey::Tasks, json!([{"title": "a", "text": "a"}])),
                (StoreKey::Completed, json!([{"title": "b", "text": "b"}])),
            ])
            .expect("set both");

        let keys: Vec<StoreKey> = store.drain_changes().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec![StoreKey::Tasks, StoreKey::Completed]);
    }

    #[test]
    fn file_backend_persists_and_keeps_unknown_keys() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(STORE_FILE);
        fs::write(&path, r#"{"window_bounds": {"x": 1}, "pref_sounds": false}"#)
            .expect("seed store");

        let mut store = Store::open_dir(temp.path()).expect("open store");
        assert!(!store.pref(Preference::Sounds));
        store
            .set(StoreKey::Pref(Preference::ShowCount), &false)
            .expect("set show count");

        let reopened = Store::open_dir(temp.path()).expect("reopen store");
        assert!(!reopened.pref(Preference::ShowCount));

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read store")).expect("json");
        assert_eq!(raw["window_bounds"], json!({"x": 1}));
    }

    #[test]
    fn legacy_tasks_are_migrated_once() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join(STORE_FILE),
            r#"{"tasks": [{"title": "old", "text": "old"}]}"#,
        )
        .expect("seed store");

        let first = Store::open_dir(temp.path()).expect("open store");
        let id = first.tasks().expect("tasks")[0].id;
        assert!(!first.has_pending_changes());

        let second = Store::open_dir(temp.path()).expect("reopen store");
        assert_eq!(second.tasks().expect("tasks")[0].id, id);
    }

    #[test]
    fn reload_reports_external_edits() {
        let temp = tempdir().expect("tempdir");
        let mut store = Store::open_dir(temp.path()).expect("open store");

        let mut other = Store::open_dir(temp.path()).expect("second handle");
        other
            .set(StoreKey::Pref(Preference::LeftClick), &false)
            .expect("external write");

        store.reload().expect("reload");
        let changes = store.drain_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].key, StoreKey::Pref(Preference::LeftClick));
        assert!(!store.pref(Preference::LeftClick));
    }

    #[test]
    fn non_object_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join(STORE_FILE), "[1, 2]").expect("seed store");
        let err = Store::open_dir(temp.path()).expect_err("array root must fail");
        assert!(format!("{err:#}").contains("JSON object"));
    }
}
