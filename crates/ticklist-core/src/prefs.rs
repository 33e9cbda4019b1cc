use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Preference {
    /// Completing a task deletes it instead of archiving it.
    AutomaticallyClear,
    Sounds,
    ShowCount,
    /// Plain click on a task completes it; no per-task submenu.
    LeftClick,
    OpenAtLogin,
    FirstLaunch,
}

impl Preference {
    pub const ALL: [Preference; 6] = [
        Preference::AutomaticallyClear,
        Preference::Sounds,
        Preference::ShowCount,
        Preference::LeftClick,
        Preference::OpenAtLogin,
        Preference::FirstLaunch,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Preference::AutomaticallyClear => "pref_automatically_clear",
            Preference::Sounds => "pref_sounds",
            Preference::ShowCount => "pref_show_count",
            Preference::LeftClick => "pref_left_click",
            Preference::OpenAtLogin => "pref_open_at_login",
            Preference::FirstLaunch => "flag_first_launch",
        }
    }

    pub fn default_value(self) -> bool {
        match self {
            Preference::AutomaticallyClear => false,
            Preference::Sounds => true,
            Preference::ShowCount => true,
            Preference::LeftClick => true,
            Preference::OpenAtLogin => false,
            Preference::FirstLaunch => true,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pref| pref.key() == key)
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::Preference;

    #[test]
    fn keys_round_trip() {
        for pref in Preference::ALL {
            assert_eq!(Preference::from_key(pref.key()), Some(pref));
        }
        assert_eq!(Preference::from_key("tasks"), None);
    }
}
