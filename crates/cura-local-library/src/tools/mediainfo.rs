use std::{collections::HashMap, path::Path, str::FromStr};

use async_trait::async_trait;
use cura_core::{RawTrack, RawTrackKind};
use serde::Deserialize;
use serde_json::Value;
use tracing::{Level, instrument};

use super::{ToolCommand, ToolError, ToolsConfig};
use crate::traits::MediaInspector;

/// Salida de `mediainfo --Output=JSON`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfoDocument {
    #[serde(default)]
    pub media: Option<MediaInfoMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfoMedia {
    #[serde(rename = "@ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub track: Vec<MediaInfoTrack>,
}

/// Una pista con sus campos tal cual; casi todos llegan como cadenas.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfoTrack {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl MediaInfoTrack {
    pub fn raw_kind(&self) -> RawTrackKind {
        RawTrackKind::parse(&self.kind)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// Campo numérico; ausente o no parseable es `None`.
    pub fn number<T: FromStr>(&self, key: &str) -> Option<T> {
        match self.fields.get(key)? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.to_string().parse().ok(),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.text(key).is_some_and(|v| v.eq_ignore_ascii_case("yes"))
    }

    /// UID de la pista; si falta, el número de pista; si falta, la posición.
    pub fn track_id(&self, position: usize) -> String {
        self.text("UniqueID")
            .or_else(|| self.text("ID"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{position}"))
    }

    pub fn to_raw_track(&self, position: usize) -> RawTrack {
        RawTrack {
            id: self.track_id(position),
            kind: self.raw_kind(),
            language: self.text("Language").map(str::to_string),
            title: self.text("Title").map(str::to_string),
            format: self.text("Format").map(str::to_string),
            channels: self.number("Channels"),
            default: self.flag("Default"),
            forced: self.flag("Forced"),
        }
    }
}

impl MediaInfoDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ToolError> {
        serde_json::from_slice(bytes).map_err(|e| ToolError::Parse {
            tool: "mediainfo".into(),
            message: e.to_string(),
        })
    }

    pub fn tracks(&self) -> &[MediaInfoTrack] {
        self.media.as_ref().map(|m| m.track.as_slice()).unwrap_or_default()
    }

    pub fn first_of(&self, kind: RawTrackKind) -> Option<&MediaInfoTrack> {
        self.tracks().iter().find(|t| t.raw_kind() == kind)
    }

    pub fn general(&self) -> Option<&MediaInfoTrack> {
        self.first_of(RawTrackKind::General)
    }

    pub fn video(&self) -> Option<&MediaInfoTrack> {
        self.first_of(RawTrackKind::Video)
    }

    pub fn raw_tracks(&self) -> Vec<RawTrack> {
        self.tracks()
            .iter()
            .enumerate()
            .map(|(position, track)| track.to_raw_track(position))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}

fn parse_ffprobe_duration(bytes: &[u8]) -> Result<Option<f64>, ToolError> {
    let out: FfprobeOutput = serde_json::from_slice(bytes).map_err(|e| ToolError::Parse {
        tool: "ffprobe".into(),
        message: e.to_string(),
    })?;

    Ok(out
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0))
}

/// Inspector basado en `mediainfo` y `ffprobe`.
#[derive(Debug, Clone)]
pub struct MediaInfoCli {
    config: ToolsConfig,
}

impl MediaInfoCli {
    pub fn new(config: ToolsConfig) -> Self {
        MediaInfoCli { config }
    }
}

#[async_trait]
impl MediaInspector for MediaInfoCli {
    #[instrument(level = Level::DEBUG, skip(self))]
    async fn inspect(&self, path: &Path) -> Result<MediaInfoDocument, ToolError> {
        let output = ToolCommand::new(&self.config.mediainfo, self.config.timeout)
            .arg("--Output=JSON")
            .arg(path)
            .execute()
            .await?;

        MediaInfoDocument::from_slice(&output.stdout)
    }

    #[instrument(level = Level::DEBUG, skip(self))]
    async fn probe_duration(&self, path: &Path) -> Result<Option<f64>, ToolError> {
        let output = ToolCommand::new(&self.config.ffprobe, self.config.timeout)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
            .arg(path)
            .execute()
            .await?;

        parse_ffprobe_duration(&output.stdout)
    }
}
