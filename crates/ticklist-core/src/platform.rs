//! Seams to the native shell: tray, windows, and desktop services. The core
//! never renders anything itself.

use serde::{Deserialize, Serialize};
use ticklist_shared::Outbound;

use crate::menu::Menu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Editor,
    Welcome,
    Preferences,
}

/// Creation options a shell needs to draw each window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowSpec {
    pub width: u32,
    pub height: u32,
    pub frameless: bool,
    pub always_on_top: bool,
    pub skip_taskbar: bool,
}

impl WindowKind {
    pub fn spec(self) -> WindowSpec {
        match self {
            WindowKind::Editor => WindowSpec {
                width: 680,
                height: 52,
                frameless: true,
                always_on_top: true,
                skip_taskbar: true,
            },
            WindowKind::Welcome => WindowSpec {
                width: 380,
                height: 500,
                frameless: true,
                always_on_top: true,
                skip_taskbar: false,
            },
            WindowKind::Preferences => WindowSpec {
                width: 400,
                height: 313,
                frameless: false,
                always_on_top: true,
                skip_taskbar: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmPrompt {
    pub message: String,
    pub detail: String,
    pub accept: String,
    pub reject: String,
}

impl ConfirmPrompt {
    pub fn clear_all() -> Self {
        Self {
            message: "Clear all tasks?".to_string(),
            detail: "Every pending and completed task will be removed. This cannot be undone."
                .to_string(),
            accept: "Clear All".to_string(),
            reject: "Cancel".to_string(),
        }
    }
}

pub trait TraySurface {
    fn set_menu(&mut self, menu: &Menu);
    fn title(&self) -> &str;
    fn set_title(&mut self, title: &str);
}

pub trait WindowHandle {
    fn kind(&self) -> WindowKind;
    fn show(&mut self);
    fn hide(&mut self);
    fn focus(&mut self);
    fn close(&mut self);
    fn position(&self) -> (i32, i32);
    fn set_position(&mut self, x: i32, y: i32);
    fn send(&mut self, message: Outbound);
}

pub trait WindowFactory {
    fn create(&mut self, kind: WindowKind) -> Box<dyn WindowHandle>;
}

pub trait Desktop {
    fn login_item_enabled(&self) -> bool;
    fn set_login_item(&mut self, enabled: bool);
    /// Accent colour as `RRGGBBAA`, if the platform has one.
    fn accent_color(&self) -> Option<String>;
    /// Records the colour the platform reported after a theme change.
    fn set_accent_color(&mut self, rgba: String);
    fn beep(&mut self);
    /// Shows a confirmation; the answer arrives later as an event.
    fn confirm(&mut self, prompt: &ConfirmPrompt, parent: Option<WindowKind>);
}

/// Everything the application drives.
pub struct Shell {
    pub tray: Box<dyn TraySurface>,
    pub windows: Box<dyn WindowFactory>,
    pub desktop: Box<dyn Desktop>,
}
