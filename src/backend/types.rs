//! Wire types of the queue backend.
//!
//! Field names follow the backend's camelCase JSON. Optional parts of a window are
//! tolerant: missing, `null` and unknown enum values all deserialize.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Window identifier, normalized to a string whether the backend sends
/// `"w-1"` or `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for WindowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => WindowId(s),
            RawId::Int(n) => WindowId(n.to_string()),
        })
    }
}

/// One service window as seen on the public monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub id: WindowId,
    pub label: String,
    #[serde(default)]
    pub staff: Option<Staff>,
    #[serde(default)]
    pub current_serving: Option<ServingClient>,
}

impl WindowState {
    /// Queue number currently served, if any (blank numbers count as none).
    pub fn serving_number(&self) -> Option<&str> {
        self.current_serving
            .as_ref()
            .and_then(|c| c.queue_number.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub name: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// The client a window is currently serving.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServingClient {
    #[serde(default)]
    pub queue_number: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_type: Option<ClientType>,
    #[serde(default)]
    pub category: Option<Labeled>,
    #[serde(default)]
    pub sub_category: Option<Labeled>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientType {
    Regular,
    SeniorCitizen,
    Pwd,
    Pregnant,
    #[serde(other)]
    Unknown,
}

impl ClientType {
    /// Short label shown on the board.
    pub fn label(self) -> &'static str {
        match self {
            ClientType::Regular | ClientType::Unknown => "Regular",
            ClientType::SeniorCitizen => "Senior",
            ClientType::Pwd => "PWD",
            ClientType::Pregnant => "Pregnant",
        }
    }
}

/// A category reference: the backend sends either a bare name or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Labeled {
    Name(String),
    Object { name: String },
}

impl Labeled {
    pub fn name(&self) -> &str {
        match self {
            Labeled::Name(name) | Labeled::Object { name } => name,
        }
    }
}

/// `GET /queue/public/windows`
#[derive(Debug, Clone, Deserialize)]
pub struct WindowsResponse {
    pub windows: Vec<WindowState>,
}

/// `GET /videos`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideosResponse {
    #[serde(default)]
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub url: String,
}

/// `GET /admin/settings/ding-sound`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DingSoundResponse {
    #[serde(default)]
    pub ding_sound_url: Option<String>,
}

/// `POST /tts` body.
#[derive(Debug, Clone, Serialize)]
pub struct TtsRequest<'a> {
    pub text: &'a str,
}

/// What `POST /tts` answered.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechPayload {
    /// An `audio/*` body.
    Audio {
        bytes: Vec<u8>,
        content_type: String,
    },
    /// Anything else: the server asks the kiosk to speak locally.
    NotAudio { content_type: Option<String> },
}

impl SpeechPayload {
    /// Classify a response body by its content type.
    pub fn classify(content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        match content_type {
            Some(ct) if is_audio_content_type(ct) && !bytes.is_empty() => SpeechPayload::Audio {
                bytes,
                content_type: ct.to_string(),
            },
            other => SpeechPayload::NotAudio {
                content_type: other.map(str::to_string),
            },
        }
    }
}

fn is_audio_content_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("audio/")
}
