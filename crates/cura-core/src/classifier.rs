use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::CurationError,
    language::{Language, normalize_language},
    track::{GroupKey, RawTrack, RawTrackKind, Track, TrackId, TrackKind},
};

pub const FORCED_SUFFIX: &str = " (Forced)";
pub const UNKNOWN_PLACEHOLDER: &str = "unknown";

/// Grafías de "forced" que aparecen en títulos de subtítulos.
const FORCED_KEYWORDS: &[&str] = &[
    "forced",
    "forcednarrative",
    "forçada",
    "forçado",
    "forcada",
    "forcado",
    "forzada",
    "forzado",
    "forcé",
    "forcée",
    "erzwungen",
];

/// Qué hacer con una pista cuyo idioma no se pudo resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLanguagePolicy {
    /// La pista sigue como `unknown` y la política termina descartándola.
    #[default]
    SoftFailTrack,
    /// El archivo entero se rechaza.
    FailFile,
}

/// Pistas de audio/subtítulo agrupadas por (tipo, idioma).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedTracks {
    pub groups: BTreeMap<GroupKey, Vec<Track>>,
    pub has_video: bool,
    /// Pistas sin título o sin idioma; se procesan igual, pero se avisan.
    pub needs_review: Vec<TrackId>,
}

impl ClassifiedTracks {
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.groups.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn is_forced_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    FORCED_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Agrupa las pistas por tipo e idioma canónico.
///
/// Rechaza el archivo si no hay pistas o si ninguna es de audio/texto.
pub fn classify(
    raw_tracks: &[RawTrack],
    unknown_policy: UnknownLanguagePolicy,
) -> Result<ClassifiedTracks, CurationError> {
    if raw_tracks.is_empty() {
        return Err(CurationError::NoTracks);
    }

    let mut classified = ClassifiedTracks::default();

    for (position, raw) in raw_tracks.iter().enumerate() {
        if raw.kind == RawTrackKind::Video {
            classified.has_video = true;
        }

        let Some(kind) = raw.kind.communication_kind() else {
            continue;
        };

        let raw_language = non_blank(raw.language.as_deref());
        let raw_title = non_blank(raw.title.as_deref());

        if raw_language.is_none() || raw_title.is_none() {
            warn!(track = %raw.id, "pista sin título o idioma, queda marcada para revisión");
            classified.needs_review.push(raw.id.clone());
        }

        let track = build_track(raw, kind, position, raw_language, raw_title);

        if track.language == Language::Unknown && unknown_policy == UnknownLanguagePolicy::FailFile {
            return Err(CurationError::UnresolvedLanguage {
                track_id: track.id,
                raw: raw_language.unwrap_or(UNKNOWN_PLACEHOLDER).to_string(),
            });
        }

        let key = GroupKey {
            kind,
            language: track.language,
        };
        classified.groups.entry(key).or_default().push(track);
    }

    if classified.is_empty() {
        return Err(CurationError::NoCommunicationTracks);
    }

    Ok(classified)
}

fn build_track(
    raw: &RawTrack,
    kind: TrackKind,
    position: usize,
    raw_language: Option<&str>,
    raw_title: Option<&str>,
) -> Track {
    let (language, language_code) = normalize_language(raw_language.unwrap_or(UNKNOWN_PLACEHOLDER));
    let title = raw_title.unwrap_or(UNKNOWN_PLACEHOLDER);

    let is_forced = kind == TrackKind::Subtitle && is_forced_title(title);
    let mut new_title = language.display_name().to_string();
    if is_forced {
        new_title.push_str(FORCED_SUFFIX);
    }

    debug!(
        track = %raw.id,
        %kind,
        raw_language = raw_language.unwrap_or(UNKNOWN_PLACEHOLDER),
        %language_code,
        raw_title = title,
        new_title = %new_title,
        "pista mapeada"
    );

    Track {
        id: raw.id.clone(),
        kind,
        position,
        raw_language: raw_language.map(str::to_string),
        raw_title: raw_title.map(str::to_string),
        language,
        language_code,
        is_forced,
        new_title,
        tombstoned: false,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
