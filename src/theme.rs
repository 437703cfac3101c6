//! Light/dark theme preference over a string key-value store.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Key the preference is stored under.
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Icon shown on the theme switch.
    pub fn icon_class(self) -> &'static str {
        match self {
            Theme::Dark => "fas fa-moon",
            Theme::Light => "fas fa-sun",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme {other:?}")),
        }
    }
}

/// A persistent string store, such as browser local storage.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// The stored theme, or `fallback` when none (or an unknown one) is stored.
pub fn load_theme<S: PreferenceStore + ?Sized>(store: &S, fallback: Theme) -> Theme {
    store
        .get(THEME_KEY)
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

/// Flip the stored theme and persist it. Returns the new theme.
pub fn toggle_theme<S: PreferenceStore + ?Sized>(store: &mut S, fallback: Theme) -> Theme {
    let next = load_theme(store, fallback).toggled();
    store.set(THEME_KEY, next.as_str());
    next
}
