use serde::{Deserialize, Serialize};

use crate::store::{Change, Outcome, Store};

/// Two-valued colour scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Theme controller operations. They share the store's persist-then-notify
/// path because the theme lives in the same persisted blob as the tasks.
impl Store {
    pub fn theme(&self) -> Theme {
        self.state().theme
    }

    pub fn toggle_theme(&mut self) -> Outcome {
        let next = self.theme().toggled();
        self.set_theme(next)
    }

    /// Setting the current theme again is a no-op.
    pub fn set_theme(&mut self, theme: Theme) -> Outcome {
        if self.theme() == theme {
            return Outcome::Unchanged;
        }
        self.state_mut().theme = theme;
        log::info!("Theme updated to {}", theme.as_str());
        self.commit(Change::ThemeChanged(theme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Persistence};

    fn store() -> Store {
        Store::open(Persistence::new(Box::new(MemoryStore::new()))).0
    }

    #[test]
    fn toggle_flips_and_persists() {
        let mut store = store();
        assert_eq!(store.theme(), Theme::Light);
        assert!(store.toggle_theme().is_saved());
        assert_eq!(store.theme(), Theme::Dark);

        let (reloaded, _) = store.persistence().load();
        assert_eq!(reloaded.theme, Theme::Dark);

        store.toggle_theme();
        assert_eq!(store.theme(), Theme::Light);
    }

    #[test]
    fn set_is_idempotent() {
        let mut store = store();
        assert!(store.set_theme(Theme::Dark).changed());
        assert!(!store.set_theme(Theme::Dark).changed());
        assert_eq!(store.theme(), Theme::Dark);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
        let theme: Theme = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(theme, Theme::Light);
        assert!(serde_json::from_str::<Theme>("\"sepia\"").is_err());
    }
}
