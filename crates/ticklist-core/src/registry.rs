use tracing::trace;

use crate::prefs::Preference;
use crate::store::{Change, StoreKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    AnyKey,
    Key(StoreKey),
}

impl Topic {
    fn matches(self, change: &Change) -> bool {
        match self {
            Topic::AnyKey => true,
            Topic::Key(key) => key == change.key,
        }
    }
}

/// What the application does in response to a store change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    RefreshCache,
    RebuildMenu,
    RefreshTitle,
    SyncLoginItem,
}

/// Store change subscriptions, dispatched in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    routes: Vec<(Topic, Reaction)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: Topic, reaction: Reaction) -> &mut Self {
        self.routes.push((topic, reaction));
        self
    }

    /// The tray's wiring. The cache is registered first so every later
    /// reaction reads refreshed state.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .subscribe(Topic::AnyKey, Reaction::RefreshCache)
            .subscribe(Topic::Key(StoreKey::Tasks), Reaction::RebuildMenu)
            .subscribe(Topic::Key(StoreKey::Completed), Reaction::RebuildMenu)
            .subscribe(
                Topic::Key(StoreKey::Pref(Preference::LeftClick)),
                Reaction::RebuildMenu,
            )
            .subscribe(
                Topic::Key(StoreKey::Pref(Preference::AutomaticallyClear)),
                Reaction::RebuildMenu,
            )
            .subscribe(
                Topic::Key(StoreKey::Pref(Preference::ShowCount)),
                Reaction::RefreshTitle,
            )
            .subscribe(
                Topic::Key(StoreKey::Pref(Preference::OpenAtLogin)),
                Reaction::SyncLoginItem,
            );
        registry
    }

    /// Reactions triggered by a batch of changes, each at most once, in the
    /// order they were registered.
    pub fn reactions(&self, changes: &[Change]) -> Vec<Reaction> {
        let mut out: Vec<Reaction> = Vec::new();
        for (topic, reaction) in &self.routes {
            if out.contains(reaction) {
                continue;
            }
            if changes.iter().any(|change| topic.matches(change)) {
                trace!(?topic, ?reaction, "subscription matched");
                out.push(*reaction);
            }
        }
        out
    }
}
