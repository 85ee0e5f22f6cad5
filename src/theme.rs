//! Light/dark theme preference, persisted under its own key.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
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
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(Error::InvalidArgument(format!(
                "unknown theme '{other}' (expected dark|light)"
            ))),
        }
    }
}

/// Guess the terminal background from `COLORFGBG` ("fg;bg", bg 0-6 or 8 is dark).
pub fn detect_ambient() -> Option<Theme> {
    let raw = std::env::var("COLORFGBG").ok()?;
    ambient_from_colorfgbg(&raw)
}

fn ambient_from_colorfgbg(raw: &str) -> Option<Theme> {
    let background: u8 = raw.rsplit(';').next()?.trim().parse().ok()?;
    match background {
        0..=6 | 8 => Some(Theme::Dark),
        _ => Some(Theme::Light),
    }
}

/// The persisted theme choice.
pub struct ThemePreference {
    backend: Arc<dyn Backend>,
    key: String,
    theme: Theme,
}

impl fmt::Debug for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemePreference")
            .field("key", &self.key)
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}

impl ThemePreference {
    /// Read the saved theme. When none is saved (or it is unreadable), use
    /// `ambient` (falling back to `fallback`) and persist that choice.
    pub fn load_or_init(
        backend: Arc<dyn Backend>,
        key: impl Into<String>,
        ambient: Option<Theme>,
        fallback: Theme,
    ) -> Self {
        let key = key.into();
        let saved = match backend.get(&key) {
            Ok(raw) => raw.and_then(|raw| parse_saved(&raw)),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to read theme preference");
                None
            }
        };

        let mut preference = Self {
            backend,
            key,
            theme: saved.unwrap_or(fallback),
        };
        if saved.is_none() {
            preference.set(ambient.unwrap_or(fallback));
        }
        preference
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(err) = self.backend.set(&self.key, theme.as_str()) {
            tracing::error!(key = %self.key, error = %err, "failed to save theme preference");
        }
    }

    pub fn toggle(&mut self) -> Theme {
        let next = self.theme.toggled();
        self.set(next);
        next
    }
}

/// Accepts the bare word (`dark`) and the older quoted JSON form (`"dark"`).
fn parse_saved(raw: &str) -> Option<Theme> {
    serde_json::from_str::<Theme>(raw)
        .ok()
        .or_else(|| raw.parse().ok())
}
