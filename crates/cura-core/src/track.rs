use std::fmt;

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Identificador opaco de una pista, estable dentro de una inspección.
pub type TrackId = String;

/// Tipos de pista sobre los que decide la curación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Subtitle,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Subtitle => "subtitle",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de pista tal como lo reporta la herramienta de inspección (`@type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawTrackKind {
    General,
    Video,
    Audio,
    Text,
    Menu,
    #[default]
    Other,
}

impl RawTrackKind {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "General" => RawTrackKind::General,
            "Video" => RawTrackKind::Video,
            "Audio" => RawTrackKind::Audio,
            "Text" => RawTrackKind::Text,
            "Menu" => RawTrackKind::Menu,
            _ => RawTrackKind::Other,
        }
    }

    /// Audio y Text son las únicas pistas "de comunicación" que se curan.
    pub fn communication_kind(self) -> Option<TrackKind> {
        match self {
            RawTrackKind::Audio => Some(TrackKind::Audio),
            RawTrackKind::Text => Some(TrackKind::Subtitle),
            _ => None,
        }
    }
}

/// Registro crudo de una pista, antes de clasificar.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTrack {
    pub id: TrackId,
    pub kind: RawTrackKind,
    pub language: Option<String>,
    pub title: Option<String>,
    pub format: Option<String>,
    pub channels: Option<u32>,
    pub default: bool,
    pub forced: bool,
}

impl RawTrack {
    pub fn new(id: impl Into<TrackId>, kind: RawTrackKind) -> Self {
        RawTrack {
            id: id.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn video(id: impl Into<TrackId>) -> Self {
        Self::new(id, RawTrackKind::Video)
    }

    pub fn audio(id: impl Into<TrackId>, language: &str, title: &str) -> Self {
        Self::new(id, RawTrackKind::Audio).with_language(language).with_title(title)
    }

    pub fn subtitle(id: impl Into<TrackId>, language: &str, title: &str) -> Self {
        Self::new(id, RawTrackKind::Text).with_language(language).with_title(title)
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
}

/// Pista clasificada: idioma normalizado, título calculado y estado de
/// descarte. `tombstoned` lo marca el resolutor de duplicados.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    /// Posición en la inspección original; ordena el plan de edición.
    pub position: usize,
    pub raw_language: Option<String>,
    pub raw_title: Option<String>,
    pub language: Language,
    pub language_code: &'static str,
    pub is_forced: bool,
    pub new_title: String,
    pub tombstoned: bool,
}

/// Clave de agrupación: (tipo, idioma canónico).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub kind: TrackKind,
    pub language: Language,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.language)
    }
}
