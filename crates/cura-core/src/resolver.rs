use std::{collections::HashMap, fmt};

use tracing::info;

use crate::{
    classifier::ClassifiedTracks,
    error::{ArbiterError, CurationError},
    language::Language,
    track::{Track, TrackId, TrackKind},
};

/// Un archivo puede tener, por idioma, una pista normal y otra forzada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Normal,
    Forced,
}

impl Variant {
    fn of(track: &Track) -> Self {
        if track.is_forced { Variant::Forced } else { Variant::Normal }
    }
}

/// Candidata a sobrevivir dentro de un grupo de duplicados.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: TrackId,
    pub raw_title: Option<String>,
    pub raw_language: Option<String>,
    pub new_title: String,
}

/// Pistas que comparten (tipo, idioma, variante); hay que quedarse con una.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSet {
    pub kind: TrackKind,
    pub language: Language,
    pub variant: Variant,
    pub candidates: Vec<Candidate>,
}

impl DuplicateSet {
    /// Clave estable del grupo, p. ej. `audio:portuguese` o `subtitle:english:forced`.
    pub fn key(&self) -> String {
        match self.variant {
            Variant::Normal => format!("{}:{}", self.kind, self.language),
            Variant::Forced => format!("{}:{}:forced", self.kind, self.language),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.candidates.iter().any(|c| c.id == id)
    }
}

impl fmt::Display for DuplicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} candidates)", self.key(), self.candidates.len())
    }
}

/// Puerto de decisión: recibe el grupo y devuelve el id que se conserva.
///
/// La llamada puede bloquear (un operador respondiendo), pero nunca debe
/// elegir al azar: si no hay respuesta, devuelve error.
pub trait DuplicateArbiter {
    fn choose(&self, set: &DuplicateSet) -> Result<TrackId, ArbiterError>;
}

impl<F> DuplicateArbiter for F
where
    F: Fn(&DuplicateSet) -> Result<TrackId, ArbiterError>,
{
    fn choose(&self, set: &DuplicateSet) -> Result<TrackId, ArbiterError> {
        self(set)
    }
}

/// Árbitro con respuestas preparadas por clave de grupo.
#[derive(Debug, Clone, Default)]
pub struct ScriptedArbiter {
    answers: HashMap<String, TrackId>,
}

impl ScriptedArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, keep: impl Into<TrackId>) -> Self {
        self.answers.insert(key.into(), keep.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, keep: impl Into<TrackId>) {
        self.answers.insert(key.into(), keep.into());
    }

    pub fn answer_for(&self, set: &DuplicateSet) -> Option<&TrackId> {
        self.answers.get(&set.key())
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl DuplicateArbiter for ScriptedArbiter {
    fn choose(&self, set: &DuplicateSet) -> Result<TrackId, ArbiterError> {
        self.answer_for(set)
            .cloned()
            .ok_or_else(|| ArbiterError::Unanswered(set.key()))
    }
}

/// Deja exactamente una pista por (tipo, idioma, variante); el resto queda
/// marcado como descartado. Los grupos de una sola pista no se tocan.
pub fn resolve(
    mut classified: ClassifiedTracks,
    arbiter: &dyn DuplicateArbiter,
) -> Result<ClassifiedTracks, CurationError> {
    for (key, tracks) in classified.groups.iter_mut() {
        for variant in [Variant::Normal, Variant::Forced] {
            let members: Vec<usize> = tracks
                .iter()
                .enumerate()
                .filter(|(_, t)| Variant::of(t) == variant)
                .map(|(i, _)| i)
                .collect();

            if members.len() <= 1 {
                continue;
            }

            let set = DuplicateSet {
                kind: key.kind,
                language: key.language,
                variant,
                candidates: members
                    .iter()
                    .map(|&i| Candidate {
                        id: tracks[i].id.clone(),
                        raw_title: tracks[i].raw_title.clone(),
                        raw_language: tracks[i].raw_language.clone(),
                        new_title: tracks[i].new_title.clone(),
                    })
                    .collect(),
            };

            info!(group = %set, "pistas duplicadas, esperando decisión");

            let keep = arbiter
                .choose(&set)
                .map_err(|source| CurationError::Arbiter { key: set.key(), source })?;

            if !set.contains(&keep) {
                return Err(CurationError::InvalidChoice {
                    key: set.key(),
                    choice: keep,
                });
            }

            for &i in &members {
                if tracks[i].id != keep {
                    tracks[i].tombstoned = true;
                }
            }

            info!(group = %set.key(), %keep, "duplicado resuelto");
        }
    }

    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifier::{UnknownLanguagePolicy, classify},
        track::RawTrack,
    };

    fn classified(raw: &[RawTrack]) -> ClassifiedTracks {
        classify(raw, UnknownLanguagePolicy::default()).unwrap()
    }

    fn survivors(c: &ClassifiedTracks) -> Vec<&str> {
        c.tracks().filter(|t| !t.tombstoned).map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn operator_choice_keeps_one_track() {
        let raw = vec![
            RawTrack::audio("1", "por", "Portugues 2.0"),
            RawTrack::audio("2", "por", "Portugues 5.1"),
        ];
        let arbiter = ScriptedArbiter::new().with("audio:portuguese", "2");

        let resolved = resolve(classified(&raw), &arbiter).unwrap();

        assert_eq!(survivors(&resolved), vec!["2"]);
        let dropped: Vec<_> = resolved.tracks().filter(|t| t.tombstoned).map(|t| t.id.as_str()).collect();
        assert_eq!(dropped, vec!["1"]);
    }

    #[test]
    fn forced_and_normal_are_separate_subgroups() {
        let raw = vec![
            RawTrack::subtitle("3", "eng", "English"),
            RawTrack::subtitle("4", "eng", "English Forced"),
        ];
        let arbiter = |_: &DuplicateSet| -> Result<TrackId, ArbiterError> { panic!("no debería preguntar") };

        let resolved = resolve(classified(&raw), &arbiter).unwrap();
        assert_eq!(survivors(&resolved), vec!["3", "4"]);
    }

    #[test]
    fn each_duplicated_subgroup_is_asked_separately() {
        let raw = vec![
            RawTrack::subtitle("3", "eng", "English"),
            RawTrack::subtitle("4", "eng", "English SDH"),
            RawTrack::subtitle("5", "eng", "Forced"),
            RawTrack::subtitle("6", "eng", "Signs (Forced)"),
        ];
        let arbiter = ScriptedArbiter::new()
            .with("subtitle:english", "4")
            .with("subtitle:english:forced", "5");

        let resolved = resolve(classified(&raw), &arbiter).unwrap();
        assert_eq!(survivors(&resolved), vec!["4", "5"]);
    }

    #[test]
    fn missing_answer_never_picks_arbitrarily() {
        let raw = vec![RawTrack::audio("1", "jpn", "A"), RawTrack::audio("2", "jpn", "B")];
        let err = resolve(classified(&raw), &ScriptedArbiter::new()).unwrap_err();

        assert!(matches!(
            err,
            CurationError::Arbiter { ref key, source: ArbiterError::Unanswered(_) } if key == "audio:japanese"
        ));
    }

    #[test]
    fn choice_outside_group_is_rejected() {
        let raw = vec![RawTrack::audio("1", "jpn", "A"), RawTrack::audio("2", "jpn", "B")];
        let arbiter = ScriptedArbiter::new().with("audio:japanese", "99");

        let err = resolve(classified(&raw), &arbiter).unwrap_err();
        assert!(matches!(err, CurationError::InvalidChoice { ref choice, .. } if choice == "99"));
    }
}
