use std::collections::BTreeMap;

use ticklist_shared::{Outbound, WindowState};
use tracing::{debug, info};

use crate::platform::{Desktop, WindowFactory, WindowHandle, WindowKind};

/// Drops the alpha byte from an `RRGGBBAA` accent colour.
pub fn accent_rgb(rgba: Option<String>) -> Option<String> {
    let rgba = rgba?;
    let trimmed = rgba.trim();
    if trimmed.len() <= 2 || !trimmed.is_ascii() {
        return None;
    }
    Some(trimmed[..trimmed.len() - 2].to_string())
}

/// Welcome and preferences windows. Unlike the editor these are destroyed
/// when closed and rebuilt on demand.
#[derive(Default)]
pub struct SecondaryWindows {
    welcome: Option<Box<dyn WindowHandle>>,
    preferences: Option<Box<dyn WindowHandle>>,
}

impl SecondaryWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, kind: WindowKind) -> bool {
        self.slot(kind).is_some_and(|slot| slot.is_some())
    }

    pub fn show_welcome(
        &mut self,
        factory: &mut dyn WindowFactory,
        desktop: &dyn Desktop,
        prefs: BTreeMap<String, bool>,
    ) {
        self.open(WindowKind::Welcome, factory, desktop, prefs);
    }

    pub fn show_preferences(
        &mut self,
        factory: &mut dyn WindowFactory,
        desktop: &dyn Desktop,
        prefs: BTreeMap<String, bool>,
    ) {
        self.open(WindowKind::Preferences, factory, desktop, prefs);
    }

    pub fn close_welcome(&mut self) {
        if let Some(mut window) = self.welcome.take() {
            window.close();
            info!("closed welcome window");
        }
    }

    /// The shell destroyed a window on its own.
    pub fn forget(&mut self, kind: WindowKind) {
        if let Some(slot) = self.slot_mut(kind)
            && slot.take().is_some()
        {
            debug!(?kind, "window handle released");
        }
    }

    pub fn focus_changed(&mut self, kind: WindowKind, state: WindowState) {
        if let Some(window) = self.slot_mut(kind).and_then(|slot| slot.as_mut()) {
            window.send(Outbound::StateChange(state));
        }
    }

    pub fn broadcast_accent(&mut self, color: Option<String>) {
        for window in [self.welcome.as_mut(), self.preferences.as_mut()]
            .into_iter()
            .flatten()
        {
            window.send(Outbound::UpdateAccentColor(color.clone()));
        }
        debug!(?color, "accent colour broadcast");
    }

    fn open(
        &mut self,
        kind: WindowKind,
        factory: &mut dyn WindowFactory,
        desktop: &dyn Desktop,
        prefs: BTreeMap<String, bool>,
    ) {
        let Some(slot) = self.slot_mut(kind) else {
            return;
        };

        if let Some(window) = slot.as_mut() {
            window.show();
            return;
        }

        let mut window = factory.create(kind);
        if let Some(color) = accent_rgb(desktop.accent_color()) {
            window.send(Outbound::UpdateAccentColor(Some(color)));
        }
        window.send(Outbound::LoadPreferences(prefs));
        window.show();
        info!(?kind, "opened window");
        *slot = Some(window);
    }

    fn slot(&self, kind: WindowKind) -> Option<&Option<Box<dyn WindowHandle>>> {
        match kind {
            WindowKind::Welcome => Some(&self.welcome),
            WindowKind::Preferences => Some(&self.preferences),
            WindowKind::Editor => None,
        }
    }

    fn slot_mut(&mut self, kind: WindowKind) -> Option<&mut Option<Box<dyn WindowHandle>>> {
        match kind {
            WindowKind::Welcome => Some(&mut self.welcome),
            WindowKind::Preferences => Some(&mut self.preferences),
            WindowKind::Editor => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::accent_rgb;

    #[test]
    fn accent_strips_alpha() {
        assert_eq!(accent_rgb(Some("0a84ffff".to_string())).as_deref(), Some("0a84ff"));
        assert_eq!(accent_rgb(None), None);
        assert_eq!(accent_rgb(Some(String::new())), None);
    }
}
