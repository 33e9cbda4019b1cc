use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::StateCache;
use crate::prefs::Preference;
use crate::task::Task;

pub mod labels {
    pub const ADD_TASK: &str = "Add Task";
    pub const COMPLETED_HEADER: &str = "Completed Tasks";
    pub const CLEAR_COMPLETED: &str = "Clear Completed";
    pub const PREFERENCES: &str = "Preferences…";
    pub const QUIT: &str = "Quit";
    pub const MARK_COMPLETE: &str = "Mark Complete";
    pub const EDIT: &str = "Edit";
    pub const DELETE: &str = "Delete";
}

pub mod accelerators {
    pub const ADD_TASK: &str = "Command+N";
    pub const CLEAR_COMPLETED: &str = "Command+Backspace";
    pub const PREFERENCES: &str = "Command+,";
    pub const QUIT: &str = "Command+Q";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    CheckboxUnchecked,
    CheckboxChecked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    AddTask,
    CompleteTask(Uuid),
    EditTask(Uuid),
    DeleteTask(Uuid),
    ClearCompleted,
    ShowPreferences,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickHandler {
    Fixed(MenuAction),
    /// Left-click task entry: meta edits, shift deletes, a plain click runs
    /// `primary`.
    Task { id: Uuid, primary: MenuAction },
}

impl ClickHandler {
    pub fn resolve(self, modifiers: Modifiers) -> MenuAction {
        match self {
            ClickHandler::Fixed(action) => action,
            ClickHandler::Task { id, primary } => {
                if modifiers.meta {
                    MenuAction::EditTask(id)
                } else if modifiers.shift {
                    MenuAction::DeleteTask(id)
                } else {
                    primary
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    pub enabled: bool,
    #[serde(skip)]
    pub click: Option<ClickHandler>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submenu: Option<Vec<MenuItem>>,
}

impl MenuEntry {
    fn action(id: &str, label: &str, accelerator: &'static str, action: MenuAction) -> Self {
        Self {
            id: Some(id.to_string()),
            label: label.to_string(),
            accelerator: Some(accelerator),
            tooltip: None,
            icon: None,
            enabled: true,
            click: Some(ClickHandler::Fixed(action)),
            submenu: None,
        }
    }

    fn disabled(label: &str) -> Self {
        Self {
            id: None,
            label: label.to_string(),
            accelerator: None,
            tooltip: None,
            icon: None,
            enabled: false,
            click: None,
            submenu: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MenuItem {
    Separator,
    Entry(MenuEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Menu {
    pub items: Vec<MenuItem>,
}

impl Menu {
    /// Finds a clickable entry by id, searching submenus.
    pub fn find(&self, id: &str) -> Option<&MenuEntry> {
        find_in(&self.items, id)
    }

    pub fn resolve_click(&self, id: &str, modifiers: Modifiers) -> Option<MenuAction> {
        let entry = self.find(id)?;
        if !entry.enabled {
            return None;
        }
        entry.click.map(|click| click.resolve(modifiers))
    }

    pub fn entries(&self) -> impl Iterator<Item = &MenuEntry> {
        self.items.iter().filter_map(|item| match item {
            MenuItem::Entry(entry) => Some(entry),
            MenuItem::Separator => None,
        })
    }
}

fn find_in<'a>(items: &'a [MenuItem], id: &str) -> Option<&'a MenuEntry> {
    for item in items {
        let MenuItem::Entry(entry) = item else {
            continue;
        };
        if entry.id.as_deref() == Some(id) {
            return Some(entry);
        }
        if let Some(found) = entry.submenu.as_deref().and_then(|sub| find_in(sub, id)) {
            return Some(found);
        }
    }
    None
}

pub fn task_item_id(id: Uuid) -> String {
    format!("task:{id}")
}

#[derive(Debug, Clone, Copy)]
pub struct MenuInput<'a> {
    pub tasks: &'a [Task],
    pub completed: &'a [Task],
    pub left_click: bool,
    pub auto_clear: bool,
}

impl<'a> MenuInput<'a> {
    pub fn from_cache(cache: &'a StateCache) -> Self {
        Self {
            tasks: cache.tasks(),
            completed: cache.completed(),
            left_click: cache.pref(Preference::LeftClick),
            auto_clear: cache.pref(Preference::AutomaticallyClear),
        }
    }
}

pub fn build_menu(input: &MenuInput<'_>) -> Menu {
    let mut items = vec![
        MenuItem::Entry(MenuEntry::action(
            "add_task",
            labels::ADD_TASK,
            accelerators::ADD_TASK,
            MenuAction::AddTask,
        )),
        MenuItem::Separator,
    ];

    if !input.tasks.is_empty() {
        items.extend(
            input
                .tasks
                .iter()
                .map(|task| MenuItem::Entry(task_entry(task, input))),
        );
        items.push(MenuItem::Separator);
    }

    if input.completed.is_empty() {
        items.push(MenuItem::Separator);
    } else {
        items.push(MenuItem::Entry(MenuEntry::disabled(labels::COMPLETED_HEADER)));
        items.extend(
            input
                .completed
                .iter()
                .map(|task| MenuItem::Entry(completed_entry(task))),
        );
        items.push(MenuItem::Separator);
        items.push(MenuItem::Entry(MenuEntry::action(
            "clear_completed",
            labels::CLEAR_COMPLETED,
            accelerators::CLEAR_COMPLETED,
            MenuAction::ClearCompleted,
        )));
    }

    items.push(MenuItem::Entry(MenuEntry::action(
        "preferences",
        labels::PREFERENCES,
        accelerators::PREFERENCES,
        MenuAction::ShowPreferences,
    )));
    items.push(MenuItem::Separator);
    items.push(MenuItem::Entry(MenuEntry::action(
        "quit",
        labels::QUIT,
        accelerators::QUIT,
        MenuAction::Quit,
    )));

    Menu { items }
}

fn task_entry(task: &Task, input: &MenuInput<'_>) -> MenuEntry {
    let item_id = task_item_id(task.id);
    let primary = if input.auto_clear {
        MenuAction::DeleteTask(task.id)
    } else {
        MenuAction::CompleteTask(task.id)
    };

    let mut entry = MenuEntry {
        id: Some(item_id.clone()),
        label: task.title.clone(),
        accelerator: None,
        tooltip: Some(task.text.clone()),
        icon: Some(Icon::CheckboxUnchecked),
        enabled: true,
        click: None,
        submenu: None,
    };

    if input.left_click {
        entry.click = Some(ClickHandler::Task {
            id: task.id,
            primary,
        });
    } else {
        let sub_action = |suffix: &str, label: &str, action: MenuAction| {
            MenuItem::Entry(MenuEntry {
                id: Some(format!("{item_id}:{suffix}")),
                label: label.to_string(),
                accelerator: None,
                tooltip: None,
                icon: None,
                enabled: true,
                click: Some(ClickHandler::Fixed(action)),
                submenu: None,
            })
        };
        entry.submenu = Some(vec![
            sub_action("complete", labels::MARK_COMPLETE, primary),
            MenuItem::Separator,
            sub_action("edit", labels::EDIT, MenuAction::EditTask(task.id)),
            sub_action("delete", labels::DELETE, MenuAction::DeleteTask(task.id)),
        ]);
    }

    entry
}

fn completed_entry(task: &Task) -> MenuEntry {
    MenuEntry {
        tooltip: Some(task.text.clone()),
        icon: Some(Icon::CheckboxChecked),
        ..MenuEntry::disabled(&task.title)
    }
}
