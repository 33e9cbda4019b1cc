use chrono::Utc;
use serde::Deserialize;
use ticklist_shared::{ButtonId, Inbound, TaskUpdate, WindowState};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::StateCache;
use crate::editor::{EditorController, EditorState};
use crate::handlers::{self, Outcome};
use crate::menu::{Menu, MenuAction, MenuInput, Modifiers, build_menu};
use crate::platform::{ConfirmPrompt, Shell, WindowKind};
use crate::prefs::Preference;
use crate::registry::{Reaction, Registry};
use crate::store::{Store, StoreKey};
use crate::task::{TaskList, id_at};
use crate::title::refresh_title;
use crate::windows::{SecondaryWindows, accent_rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowEvent {
    Focus,
    Blur,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    MenuClick {
        item: String,
        modifiers: Modifiers,
    },
    Message {
        window: WindowKind,
        message: Inbound,
    },
    Window {
        window: WindowKind,
        event: WindowEvent,
    },
    /// Fired once the theme-change debounce has elapsed, carrying the
    /// newest colour the host reported, if any.
    AccentColorChanged {
        accent: Option<String>,
    },
    ConfirmationAnswered {
        accepted: bool,
    },
    StoreReloadRequested,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Process root: owns the store, the cache derived from it, and every
/// surface the tray drives.
pub struct App {
    store: Store,
    cache: StateCache,
    registry: Registry,
    shell: Shell,
    editor: EditorController,
    secondary: SecondaryWindows,
    menu: Menu,
    awaiting_clear_all: Option<Option<WindowKind>>,
}

impl App {
    #[instrument(skip_all)]
    pub fn start(store: Store, shell: Shell) -> anyhow::Result<Self> {
        let cache = StateCache::load(&store)?;
        let mut app = Self {
            store,
            cache,
            registry: Registry::standard(),
            shell,
            editor: EditorController::new(),
            secondary: SecondaryWindows::new(),
            menu: Menu::default(),
            awaiting_clear_all: None,
        };

        app.rebuild_menu();
        app.sync_login_item_at_startup();
        app.show_welcome_if_needed()?;
        app.pump()?;

        info!(
            tasks = app.cache.tasks().len(),
            completed = app.cache.completed().len(),
            "tray started"
        );
        Ok(app)
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn editor_state(&self) -> EditorState {
        self.editor.state()
    }

    pub fn is_window_open(&self, kind: WindowKind) -> bool {
        match kind {
            WindowKind::Editor => self.editor.has_window(),
            other => self.secondary.is_open(other),
        }
    }

    /// Handles one event to completion, then delivers the store changes it
    /// caused.
    #[instrument(skip(self))]
    pub fn handle(&mut self, event: AppEvent) -> anyhow::Result<Flow> {
        let flow = self.dispatch(event)?;
        self.pump()?;
        Ok(flow)
    }

    fn dispatch(&mut self, event: AppEvent) -> anyhow::Result<Flow> {
        match event {
            AppEvent::MenuClick { item, modifiers } => {
                match self.menu.resolve_click(&item, modifiers) {
                    Some(action) => return self.perform(action),
                    None => warn!(%item, "click on unknown or inert menu item"),
                }
            }
            AppEvent::Message { window, message } => self.on_message(window, message)?,
            AppEvent::Window { window, event } => self.on_window_event(window, event),
            AppEvent::AccentColorChanged { accent } => {
                if let Some(rgba) = accent {
                    self.shell.desktop.set_accent_color(rgba);
                }
                let color = accent_rgb(self.shell.desktop.accent_color());
                self.secondary.broadcast_accent(color);
            }
            AppEvent::ConfirmationAnswered { accepted } => self.on_confirmation(accepted)?,
            AppEvent::StoreReloadRequested => self.store.reload()?,
            AppEvent::Quit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    fn perform(&mut self, action: MenuAction) -> anyhow::Result<Flow> {
        debug!(?action, "menu action");
        match action {
            MenuAction::AddTask => self.editor.open_add(self.shell.windows.as_mut()),
            MenuAction::EditTask(id) => {
                self.editor
                    .open_edit(self.shell.windows.as_mut(), &self.cache, id);
            }
            MenuAction::CompleteTask(id) => {
                let outcome = handlers::complete_task(&mut self.store, &self.cache, id)?;
                self.play_sound_if(outcome);
            }
            MenuAction::DeleteTask(id) => {
                handlers::delete_task(&mut self.store, &self.cache, TaskList::Pending, id)?;
            }
            MenuAction::ClearCompleted => {
                handlers::clear_completed(&mut self.store)?;
            }
            MenuAction::ShowPreferences => {
                self.secondary.show_preferences(
                    self.shell.windows.as_mut(),
                    self.shell.desktop.as_ref(),
                    self.cache.preferences(),
                );
            }
            MenuAction::Quit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    fn on_message(&mut self, window: WindowKind, message: Inbound) -> anyhow::Result<()> {
        match message {
            Inbound::AddTask(draft) => {
                let outcome = handlers::add_task(&mut self.store, &self.cache, draft, Utc::now())?;
                self.play_sound_if(outcome);
            }
            Inbound::UpdateTask(update) => {
                let Some(id) = self.update_target(&update) else {
                    debug!(index = update.index, "update addressed no current task");
                    return Ok(());
                };
                handlers::update_task(&mut self.store, &self.cache, id, update.task)?;
            }
            Inbound::UpdatePreferences(update) => {
                handlers::update_preference(&mut self.store, &update.key, &update.value)?;
            }
            Inbound::CloseWindow => self.editor.close(),
            Inbound::RendererButtonClicked(ButtonId::ClearAll) => self.request_clear_all(window),
            Inbound::RendererButtonClicked(ButtonId::CloseWelcomeWindow) => {
                self.secondary.close_welcome();
            }
        }
        Ok(())
    }

    /// Id-addressed updates win; index-only messages from older windows are
    /// resolved against the current list and dropped when out of range.
    fn update_target(&self, update: &TaskUpdate) -> Option<Uuid> {
        if let Some(id) = update.id {
            return Some(id);
        }
        if let EditorState::OpenEdit(id) = self.editor.state() {
            return Some(id);
        }
        id_at(self.cache.tasks(), update.index)
    }

    fn on_window_event(&mut self, window: WindowKind, event: WindowEvent) {
        match (window, event) {
            (WindowKind::Editor, WindowEvent::Blur) => self.editor.close(),
            (WindowKind::Editor, _) => {}
            (kind, WindowEvent::Focus) => self.secondary.focus_changed(kind, WindowState::Focus),
            (kind, WindowEvent::Blur) => self.secondary.focus_changed(kind, WindowState::Blur),
            (kind, WindowEvent::Closed) => self.secondary.forget(kind),
        }
    }

    fn request_clear_all(&mut self, parent: WindowKind) {
        if self.awaiting_clear_all.is_some() {
            debug!("clear all already awaiting an answer");
            return;
        }
        if !handlers::has_any_tasks(&self.cache) {
            debug!("clear all requested with nothing to clear");
            return;
        }
        let parent = Some(parent).filter(|kind| self.is_window_open(*kind));
        self.shell
            .desktop
            .confirm(&ConfirmPrompt::clear_all(), parent);
        self.awaiting_clear_all = Some(parent);
    }

    fn on_confirmation(&mut self, accepted: bool) -> anyhow::Result<()> {
        let Some(parent) = self.awaiting_clear_all.take() else {
            warn!("confirmation answer with no question pending");
            return Ok(());
        };

        if !accepted {
            info!(?parent, "clear all declined");
            return Ok(());
        }

        let outcome = handlers::clear_all(&mut self.store, &self.cache)?;
        self.play_sound_if(outcome);
        Ok(())
    }

    fn play_sound_if(&mut self, outcome: Outcome) {
        if outcome.applied() && self.cache.pref(Preference::Sounds) {
            self.shell.desktop.beep();
        }
    }

    /// Delivers queued store changes to their subscribers until the store
    /// is quiet.
    fn pump(&mut self) -> anyhow::Result<()> {
        loop {
            let changes = self.store.drain_changes();
            if changes.is_empty() {
                return Ok(());
            }

            for reaction in self.registry.reactions(&changes) {
                match reaction {
                    Reaction::RefreshCache => self.cache.refresh(&self.store)?,
                    Reaction::RebuildMenu => self.rebuild_menu(),
                    Reaction::RefreshTitle => refresh_title(&self.cache, self.shell.tray.as_mut()),
                    Reaction::SyncLoginItem => {
                        let enabled = self.cache.pref(Preference::OpenAtLogin);
                        self.shell.desktop.set_login_item(enabled);
                    }
                }
            }
        }
    }

    fn rebuild_menu(&mut self) {
        let menu = build_menu(&MenuInput::from_cache(&self.cache));
        self.shell.tray.set_menu(&menu);
        self.menu = menu;
        refresh_title(&self.cache, self.shell.tray.as_mut());
        debug!(items = self.menu.items.len(), "menu rebuilt");
    }

    fn sync_login_item_at_startup(&mut self) {
        let wanted = self.cache.pref(Preference::OpenAtLogin);
        if self.shell.desktop.login_item_enabled() != wanted {
            info!(wanted, "aligning login item with preference");
            self.shell.desktop.set_login_item(wanted);
        }
    }

    fn show_welcome_if_needed(&mut self) -> anyhow::Result<()> {
        if !self.cache.pref(Preference::FirstLaunch) {
            return Ok(());
        }

        self.store
            .set(StoreKey::Pref(Preference::FirstLaunch), &false)?;
        self.pump()?;
        self.secondary.show_welcome(
            self.shell.windows.as_mut(),
            self.shell.desktop.as_ref(),
            self.cache.preferences(),
        );
        Ok(())
    }
}
