use tracing::debug;

use crate::cache::StateCache;
use crate::platform::TraySurface;
use crate::prefs::Preference;

/// Text shown next to the tray icon.
pub fn badge(show_count: bool, task_count: usize) -> String {
    if show_count && task_count > 0 {
        task_count.to_string()
    } else {
        String::new()
    }
}

pub fn refresh_title(cache: &StateCache, tray: &mut dyn TraySurface) {
    let show_count = cache.pref(Preference::ShowCount);
    if show_count {
        let title = badge(true, cache.tasks().len());
        debug!(%title, "updating tray title");
        tray.set_title(&title);
    } else if !tray.title().is_empty() {
        debug!("clearing tray title");
        tray.set_title("");
    }
}
