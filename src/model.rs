use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_VOLUME: u8 = 100;
pub const MAX_VOLUME: u8 = 100;

/// Session-stable handle for a library entry. Assigned by the controller the
/// first time a file name is seen and kept across rescans while the name
/// stays in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier the backend hands out for each download submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerPhase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

impl PlayerPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Ended => "Ended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default, rename = "isShuffling")]
    pub is_shuffling: bool,
}

fn default_volume() -> u8 {
    DEFAULT_VOLUME
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            is_shuffling: false,
        }
    }
}

impl Settings {
    pub fn clamped(self) -> Self {
        Self {
            volume: self.volume.min(MAX_VOLUME),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_use_camel_case_shuffle_key() {
        let json = serde_json::to_string(&Settings {
            volume: 40,
            is_shuffling: true,
        })
        .expect("serialize");
        assert_eq!(json, r#"{"volume":40,"isShuffling":true}"#);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").expect("parse");
        assert_eq!(settings, Settings::default());

        let settings: Settings = serde_json::from_str(r#"{"isShuffling":true}"#).expect("parse");
        assert_eq!(settings.volume, 100);
        assert!(settings.is_shuffling);
    }
}
