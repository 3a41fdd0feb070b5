use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    category::ContentCategory,
    classifier::ClassifiedTracks,
    error::CurationError,
    language::Language,
    plan::{EditAction, EditDecision, EditPlan},
    track::{Track, TrackId, TrackKind},
};

use Language::{Chinese, English, Japanese, Portuguese};

/// Versiones de la tabla de idiomas permitidos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyVersion {
    /// Anime sólo con audio japonés o chino.
    V1,
    /// Anime admite además audio en inglés y portugués.
    #[default]
    V2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyTable {
    pub version: PolicyVersion,
}

impl PolicyTable {
    pub fn new(version: PolicyVersion) -> Self {
        PolicyTable { version }
    }

    pub fn allowed(&self, category: ContentCategory, kind: TrackKind) -> &'static [Language] {
        match (category, kind, self.version) {
            (ContentCategory::Anime, TrackKind::Audio, PolicyVersion::V1) => &[Japanese, Chinese],
            (ContentCategory::Anime, TrackKind::Audio, PolicyVersion::V2) => &[Japanese, English, Portuguese, Chinese],
            (ContentCategory::General, TrackKind::Audio, _) => &[English, Portuguese],
            (_, TrackKind::Subtitle, _) => &[Portuguese, English],
        }
    }

    /// Orden de preferencia para la pista por defecto.
    pub fn default_preference(&self, category: ContentCategory, kind: TrackKind) -> &'static [Language] {
        match (category, kind) {
            (ContentCategory::Anime, TrackKind::Audio) => &[Japanese, Chinese, English, Portuguese],
            (ContentCategory::General, TrackKind::Audio) => &[Portuguese, English],
            (ContentCategory::Anime, TrackKind::Subtitle) => &[Portuguese],
            (ContentCategory::General, TrackKind::Subtitle) => &[],
        }
    }

    /// Idiomas "originales": si ninguno sobrevive, se rescata el audio.
    pub fn original_audio(&self, category: ContentCategory) -> &'static [Language] {
        match category {
            ContentCategory::Anime => &[Japanese, Chinese],
            ContentCategory::General => &[],
        }
    }

    /// Idiomas de audio que pueden rescatarse contra la inanición.
    pub fn fallback_audio(&self, category: ContentCategory) -> &'static [Language] {
        match category {
            ContentCategory::Anime => &[Japanese, English, Portuguese, Chinese],
            ContentCategory::General => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    RemoveDuplicate,
    RemoveLanguage,
}

struct Judged<'a> {
    track: &'a Track,
    verdict: Verdict,
}

impl Judged<'_> {
    fn kept(&self) -> bool {
        self.verdict == Verdict::Keep
    }
}

/// Decide, pista por pista, qué se conserva, qué se renombra y qué flags
/// lleva. Devuelve el plan en el orden de la inspección.
pub fn decide(
    category: ContentCategory,
    classified: &ClassifiedTracks,
    table: &PolicyTable,
) -> Result<EditPlan, CurationError> {
    if !classified.has_video {
        return Err(CurationError::NoVideoTrack);
    }

    let mut judged: Vec<Judged> = classified
        .tracks()
        .map(|track| Judged {
            track,
            verdict: initial_verdict(track, category, table),
        })
        .collect();
    judged.sort_by_key(|j| j.track.position);

    rescue_starved_audio(category, table, &mut judged);

    let had_audio = judged.iter().any(|j| j.track.kind == TrackKind::Audio);
    let kept_audio = judged.iter().any(|j| j.track.kind == TrackKind::Audio && j.kept());
    if had_audio && !kept_audio {
        return Err(CurationError::AudioStarvation);
    }

    let default_audio = pick_default(&judged, TrackKind::Audio, table.default_preference(category, TrackKind::Audio));
    let default_subtitle = pick_default(
        &judged,
        TrackKind::Subtitle,
        table.default_preference(category, TrackKind::Subtitle),
    );

    let decisions = judged
        .iter()
        .map(|j| {
            let track = j.track;
            if !j.kept() {
                debug!(track = %track.id, verdict = ?j.verdict, "pista descartada");
                return EditDecision::remove(track.id.clone(), track.kind);
            }

            let is_default = Some(&track.id) == default_audio.as_ref() || Some(&track.id) == default_subtitle.as_ref();
            let action = if is_default {
                EditAction::KeepFlagDefault
            } else if track.is_forced {
                EditAction::KeepFlagForced
            } else {
                EditAction::KeepRename
            };

            EditDecision::keep(
                track.id.clone(),
                track.kind,
                action,
                track.new_title.clone(),
                track.language_code,
            )
        })
        .collect();

    Ok(EditPlan::new(decisions))
}

fn initial_verdict(track: &Track, category: ContentCategory, table: &PolicyTable) -> Verdict {
    if track.tombstoned {
        Verdict::RemoveDuplicate
    } else if table.allowed(category, track.kind).contains(&track.language) {
        Verdict::Keep
    } else {
        Verdict::RemoveLanguage
    }
}

/// Si no queda ningún audio en idioma original, se revierte el descarte por
/// idioma de las pistas de audio del conjunto de rescate. Las descartadas
/// como duplicado no vuelven nunca.
fn rescue_starved_audio(category: ContentCategory, table: &PolicyTable, judged: &mut [Judged]) {
    let originals = table.original_audio(category);
    if originals.is_empty() {
        return;
    }

    let original_survives = judged
        .iter()
        .any(|j| j.track.kind == TrackKind::Audio && j.kept() && originals.contains(&j.track.language));
    if original_survives {
        return;
    }

    let fallback = table.fallback_audio(category);
    for j in judged.iter_mut() {
        if j.track.kind == TrackKind::Audio
            && j.verdict == Verdict::RemoveLanguage
            && fallback.contains(&j.track.language)
        {
            info!(track = %j.track.id, language = %j.track.language, "audio rescatado para no dejar el archivo sin audio original");
            j.verdict = Verdict::Keep;
        }
    }
}

/// El audio siempre recibe una pista por defecto si queda alguna; los
/// subtítulos sólo cuando hay un idioma preferido disponible.
fn pick_default(judged: &[Judged], kind: TrackKind, preference: &[Language]) -> Option<TrackId> {
    let candidates: Vec<&Track> = judged
        .iter()
        .filter(|j| j.kept() && j.track.kind == kind && !j.track.is_forced)
        .map(|j| j.track)
        .collect();

    let preferred = preference
        .iter()
        .find_map(|language| candidates.iter().find(|t| t.language == *language));

    match (preferred, kind) {
        (Some(track), _) => Some(track.id.clone()),
        (None, TrackKind::Audio) => candidates.first().map(|t| t.id.clone()),
        (None, TrackKind::Subtitle) => None,
    }
}
