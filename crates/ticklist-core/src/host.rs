//! JSON-lines bridge to an external shell process. The shell draws the tray
//! and windows; this side sends it what to draw and reads back what the user
//! did.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ticklist_shared::{Inbound, Outbound};
use tracing::{debug, warn};

use crate::app::{AppEvent, WindowEvent};
use crate::config::HostSettings;
use crate::menu::{Menu, Modifiers};
use crate::platform::{
    ConfirmPrompt, Desktop, Shell, TraySurface, WindowFactory, WindowHandle, WindowKind,
    WindowSpec,
};

/// One line read from the shell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostInput {
    MenuClick {
        item: String,
        #[serde(default)]
        meta: bool,
        #[serde(default)]
        shift: bool,
    },
    Message {
        window: WindowKind,
        message: Inbound,
    },
    WindowEvent {
        window: WindowKind,
        event: WindowEvent,
    },
    /// `accent` is the new `RRGGBBAA` colour; hosts that cannot read it
    /// leave it out and the last known colour is kept.
    ThemeChanged {
        #[serde(default)]
        accent: Option<String>,
    },
    Confirmation {
        accepted: bool,
    },
    Reload,
    Quit,
}

impl HostInput {
    /// `None` for inputs the runtime handles itself (theme changes are
    /// debounced before they reach the app).
    pub fn into_event(self) -> Option<AppEvent> {
        let event = match self {
            HostInput::MenuClick { item, meta, shift } => AppEvent::MenuClick {
                item,
                modifiers: Modifiers { meta, shift },
            },
            HostInput::Message { window, message } => AppEvent::Message { window, message },
            HostInput::WindowEvent { window, event } => AppEvent::Window { window, event },
            HostInput::ThemeChanged { .. } => return None,
            HostInput::Confirmation { accepted } => AppEvent::ConfirmationAnswered { accepted },
            HostInput::Reload => AppEvent::StoreReloadRequested,
            HostInput::Quit => AppEvent::Quit,
        };
        Some(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowOp {
    Create,
    Show,
    Hide,
    Focus,
    Close,
}

/// One line written to the shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostOutput {
    Menu {
        menu: Menu,
    },
    Title {
        title: String,
    },
    Window {
        window: WindowKind,
        op: WindowOp,
        #[serde(skip_serializing_if = "Option::is_none")]
        spec: Option<WindowSpec>,
    },
    Position {
        window: WindowKind,
        x: i32,
        y: i32,
    },
    Send {
        window: WindowKind,
        message: Outbound,
    },
    LoginItem {
        enabled: bool,
    },
    Beep,
    Confirm {
        prompt: ConfirmPrompt,
        parent: Option<WindowKind>,
    },
}

pub struct HostSink {
    out: Box<dyn Write + Send>,
}

pub type SharedSink = Arc<Mutex<HostSink>>;

impl HostSink {
    pub fn new(out: Box<dyn Write + Send>) -> SharedSink {
        Arc::new(Mutex::new(Self { out }))
    }

    pub fn stdout() -> SharedSink {
        Self::new(Box::new(io::stdout()))
    }

    pub fn emit(&mut self, output: &HostOutput) {
        let line = match serde_json::to_string(output) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to encode host output");
                return;
            }
        };
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!(error = %err, "failed to write host output");
        }
    }
}

fn emit(sink: &SharedSink, output: HostOutput) {
    sink.lock().emit(&output);
}

pub struct StdioTray {
    sink: SharedSink,
    title: String,
}

impl TraySurface for StdioTray {
    fn set_menu(&mut self, menu: &Menu) {
        emit(&self.sink, HostOutput::Menu { menu: menu.clone() });
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        emit(
            &self.sink,
            HostOutput::Title {
                title: self.title.clone(),
            },
        );
    }
}

pub struct StdioWindow {
    sink: SharedSink,
    kind: WindowKind,
    position: (i32, i32),
}

impl StdioWindow {
    fn op(&self, op: WindowOp) {
        emit(
            &self.sink,
            HostOutput::Window {
                window: self.kind,
                op,
                spec: None,
            },
        );
    }
}

impl WindowHandle for StdioWindow {
    fn kind(&self) -> WindowKind {
        self.kind
    }

    fn show(&mut self) {
        self.op(WindowOp::Show);
    }

    fn hide(&mut self) {
        self.op(WindowOp::Hide);
    }

    fn focus(&mut self) {
        self.op(WindowOp::Focus);
    }

    fn close(&mut self) {
        self.op(WindowOp::Close);
    }

    fn position(&self) -> (i32, i32) {
        self.position
    }

    fn set_position(&mut self, x: i32, y: i32) {
        self.position = (x, y);
        emit(
            &self.sink,
            HostOutput::Position {
                window: self.kind,
                x,
                y,
            },
        );
    }

    fn send(&mut self, message: Outbound) {
        emit(
            &self.sink,
            HostOutput::Send {
                window: self.kind,
                message,
            },
        );
    }
}

pub struct StdioWindows {
    sink: SharedSink,
    origin: (i32, i32),
}

impl WindowFactory for StdioWindows {
    fn create(&mut self, kind: WindowKind) -> Box<dyn WindowHandle> {
        debug!(?kind, "asking shell to create window");
        emit(
            &self.sink,
            HostOutput::Window {
                window: kind,
                op: WindowOp::Create,
                spec: Some(kind.spec()),
            },
        );
        Box::new(StdioWindow {
            sink: self.sink.clone(),
            kind,
            position: self.origin,
        })
    }
}

pub struct StdioDesktop {
    sink: SharedSink,
    login_enabled: bool,
    accent: Option<String>,
}

impl Desktop for StdioDesktop {
    fn login_item_enabled(&self) -> bool {
        self.login_enabled
    }

    fn set_login_item(&mut self, enabled: bool) {
        self.login_enabled = enabled;
        emit(&self.sink, HostOutput::LoginItem { enabled });
    }

    fn accent_color(&self) -> Option<String> {
        self.accent.clone()
    }

    fn set_accent_color(&mut self, rgba: String) {
        self.accent = Some(rgba);
    }

    fn beep(&mut self) {
        emit(&self.sink, HostOutput::Beep);
    }

    fn confirm(&mut self, prompt: &ConfirmPrompt, parent: Option<WindowKind>) {
        emit(
            &self.sink,
            HostOutput::Confirm {
                prompt: prompt.clone(),
                parent,
            },
        );
    }
}

pub fn stdio_shell(sink: SharedSink, settings: &HostSettings) -> Shell {
    Shell {
        tray: Box::new(StdioTray {
            sink: sink.clone(),
            title: String::new(),
        }),
        windows: Box::new(StdioWindows {
            sink: sink.clone(),
            origin: settings.editor_origin,
        }),
        desktop: Box::new(StdioDesktop {
            sink,
            login_enabled: settings.login_enabled,
            accent: settings.accent_color.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use ticklist_shared::{ButtonId, Inbound};

    use super::*;

    #[test]
    fn parses_menu_clicks_with_default_modifiers() {
        let input: HostInput =
            serde_json::from_str(r#"{"type":"menu_click","item":"add_task"}"#).expect("parse");
        assert_eq!(
            input.into_event(),
            Some(AppEvent::MenuClick {
                item: "add_task".to_string(),
                modifiers: Modifiers::default(),
            })
        );
    }

    #[test]
    fn parses_window_messages() {
        let input: HostInput = serde_json::from_value(json!({
            "type": "message",
            "window": "preferences",
            "message": { "channel": "rendererButtonClicked", "data": "clear_all" }
        }))
        .expect("parse");
        assert_eq!(
            input,
            HostInput::Message {
                window: WindowKind::Preferences,
                message: Inbound::RendererButtonClicked(ButtonId::ClearAll),
            }
        );

        let theme: HostInput =
            serde_json::from_str(r#"{"type":"theme_changed"}"#).expect("parse theme");
        assert_eq!(theme, HostInput::ThemeChanged { accent: None });
        assert_eq!(theme.into_event(), None);

        let theme: HostInput =
            serde_json::from_str(r#"{"type":"theme_changed","accent":"ff2d55ff"}"#)
                .expect("parse theme with accent");
        assert_eq!(
            theme,
            HostInput::ThemeChanged {
                accent: Some("ff2d55ff".to_string())
            }
        );
    }

    #[test]
    fn output_lines_are_tagged() {
        let value = serde_json::to_value(HostOutput::Send {
            window: WindowKind::Editor,
            message: Outbound::ResetWin,
        })
        .expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "send",
                "window": "editor",
                "message": { "channel": "resetWin" }
            })
        );
    }
}
