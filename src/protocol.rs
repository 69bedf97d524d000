//! Messages crossing the UI/backend boundary.
//!
//! Every message travels inside an [`Envelope`] carrying the schema version and
//! is validated when opened, so malformed payloads never reach the playback
//! controller. On the wire an envelope is one JSON object:
//! `{"version":1,"channel":"set-volume","payload":57}`.

use crate::error::ProtocolError;
use crate::library::is_plain_file_name;
use crate::model::{JobId, MAX_VOLUME};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

pub const PROTOCOL_VERSION: u16 = 1;

pub trait Validate: Sized {
    /// Drops parts of the payload that can be discarded without rejecting the
    /// whole message.
    fn sanitize(self) -> Self {
        self
    }

    fn validate(&self) -> Result<(), ProtocolError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u16,
    #[serde(flatten)]
    pub message: T,
}

impl<T: Validate> Envelope<T> {
    pub fn new(message: T) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            message,
        }
    }

    pub fn open(self) -> Result<T, ProtocolError> {
        if self.version != PROTOCOL_VERSION {
            return Err(ProtocolError::Version {
                found: self.version,
                expected: PROTOCOL_VERSION,
            });
        }
        let message = self.message.sanitize();
        message.validate()?;
        Ok(message)
    }
}

/// Requests from the UI to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum UiRequest {
    GetVolume,
    SetVolume(u8),
    GetShuffle,
    SetShuffle(bool),
    GetPlaylistPath,
    ScanLibrary,
    #[serde(rename = "download-youtube-audio")]
    DownloadAudio(String),
    DeleteFile(String),
    Shutdown,
}

/// Triggers from an external control surface, mapped to transport actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "kebab-case")]
pub enum TransportCommand {
    PlayPauseAudio,
    NextSong,
    PrevSong,
}

impl TransportCommand {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "play-pause" | "play-pause-audio" | "toggle" => Some(Self::PlayPauseAudio),
            "next" | "next-song" => Some(Self::NextSong),
            "prev" | "previous" | "prev-song" => Some(Self::PrevSong),
            _ => None,
        }
    }
}

/// Responses and notifications from the backend to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum BackendEvent {
    LoadPlaylist(Vec<String>),
    Volume(u8),
    Shuffle(bool),
    PlaylistPath(PathBuf),
    DownloadStarted { job: JobId, link: String },
    DownloadComplete { job: JobId, path: PathBuf },
    DownloadFailed { job: JobId, reason: String },
    FileDeleted(String),
    DeleteFailed { name: String, reason: String },
    Transport(TransportCommand),
}

impl Validate for UiRequest {
    fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::SetVolume(volume) => check_volume(*volume),
            Self::DownloadAudio(link) if link.trim().is_empty() => Err(ProtocolError::EmptyLink),
            Self::DeleteFile(name) => check_file_name(name),
            _ => Ok(()),
        }
    }
}

impl Validate for TransportCommand {
    fn validate(&self) -> Result<(), ProtocolError> {
        Ok(())
    }
}

impl Validate for BackendEvent {
    fn sanitize(self) -> Self {
        match self {
            Self::LoadPlaylist(names) => Self::LoadPlaylist(
                names
                    .into_iter()
                    .filter(|name| {
                        let plain = is_plain_file_name(name);
                        if !plain {
                            warn!(name = %name, "skipping library entry that is not a plain file name");
                        }
                        plain
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Volume(volume) => check_volume(*volume),
            Self::PlaylistPath(path) if path.as_os_str().is_empty() => {
                Err(ProtocolError::EmptyPath("playlist-path"))
            }
            Self::DownloadComplete { path, .. } if path.as_os_str().is_empty() => {
                Err(ProtocolError::EmptyPath("download-complete"))
            }
            Self::FileDeleted(name) | Self::DeleteFailed { name, .. } => check_file_name(name),
            _ => Ok(()),
        }
    }
}

fn check_volume(volume: u8) -> Result<(), ProtocolError> {
    if volume > MAX_VOLUME {
        return Err(ProtocolError::Volume(volume));
    }
    Ok(())
}

fn check_file_name(name: &str) -> Result<(), ProtocolError> {
    if !is_plain_file_name(name) {
        return Err(ProtocolError::FileName(name.to_string()));
    }
    Ok(())
}

pub fn encode<T: Serialize>(envelope: &Envelope<T>) -> Result<String, ProtocolError> {
    serde_json::to_string(envelope).map_err(|err| ProtocolError::Malformed(err.to_string()))
}

/// Parses and validates one JSON envelope. The version is checked before the
/// message body so a future schema fails with a version error.
pub fn decode<T>(raw: &str) -> Result<T, ProtocolError>
where
    T: DeserializeOwned + Validate,
{
    let value: serde_json::Value =
        serde_json::from_str(raw.trim()).map_err(|err| ProtocolError::Malformed(err.to_string()))?;
    let found = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| ProtocolError::Malformed(String::from("missing version")))?;
    if found != u64::from(PROTOCOL_VERSION) {
        return Err(ProtocolError::Version {
            found: u16::try_from(found).unwrap_or(u16::MAX),
            expected: PROTOCOL_VERSION,
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_value(value).map_err(|err| ProtocolError::Malformed(err.to_string()))?;
    envelope.open()
}
