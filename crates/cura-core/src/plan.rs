use serde::{Deserialize, Serialize};

use crate::track::{TrackId, TrackKind};

/// Acción final sobre una pista.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    KeepRename,
    KeepFlagDefault,
    KeepFlagForced,
    Remove,
}

impl EditAction {
    pub fn is_kept(self) -> bool {
        self != EditAction::Remove
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDecision {
    pub track_id: TrackId,
    pub kind: TrackKind,
    pub action: EditAction,
    /// Sólo para pistas que se conservan.
    pub new_title: Option<String>,
    pub language_code: Option<&'static str>,
}

impl EditDecision {
    pub fn keep(track_id: TrackId, kind: TrackKind, action: EditAction, title: String, code: &'static str) -> Self {
        EditDecision {
            track_id,
            kind,
            action,
            new_title: Some(title),
            language_code: Some(code),
        }
    }

    pub fn remove(track_id: TrackId, kind: TrackKind) -> Self {
        EditDecision {
            track_id,
            kind,
            action: EditAction::Remove,
            new_title: None,
            language_code: None,
        }
    }

    pub fn is_default(&self) -> bool {
        self.action == EditAction::KeepFlagDefault
    }

    pub fn is_forced(&self) -> bool {
        self.action == EditAction::KeepFlagForced
    }
}

/// Propiedades de pista que entiende la herramienta de reescritura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    Name,
    Language,
    FlagDefault,
    FlagForced,
}

impl TrackProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackProperty::Name => "name",
            TrackProperty::Language => "language",
            TrackProperty::FlagDefault => "flag-default",
            TrackProperty::FlagForced => "flag-forced",
        }
    }
}

/// Un par (pista, atributo=valor) del plan de reescritura.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEdit {
    pub track_id: TrackId,
    pub property: TrackProperty,
    pub value: String,
}

impl PropertyEdit {
    fn new(track_id: &TrackId, property: TrackProperty, value: impl Into<String>) -> Self {
        PropertyEdit {
            track_id: track_id.clone(),
            property,
            value: value.into(),
        }
    }
}

/// Conjuntos de pistas que sobreviven; el vídeo siempre se conserva.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeptTracks {
    pub audio: Vec<TrackId>,
    pub subtitles: Vec<TrackId>,
}

impl KeptTracks {
    pub fn keeps(&self, kind: TrackKind, id: &str) -> bool {
        match kind {
            TrackKind::Audio => self.audio.iter().any(|a| a == id),
            TrackKind::Subtitle => self.subtitles.iter().any(|s| s == id),
        }
    }
}

/// Plan de edición de un archivo, en el orden de la inspección.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    decisions: Vec<EditDecision>,
}

impl EditPlan {
    pub fn new(decisions: Vec<EditDecision>) -> Self {
        EditPlan { decisions }
    }

    pub fn decisions(&self) -> &[EditDecision] {
        &self.decisions
    }

    pub fn decision(&self, track_id: &str) -> Option<&EditDecision> {
        self.decisions.iter().find(|d| d.track_id == track_id)
    }

    pub fn kept(&self, kind: TrackKind) -> impl Iterator<Item = &EditDecision> {
        self.decisions
            .iter()
            .filter(move |d| d.kind == kind && d.action.is_kept())
    }

    pub fn removed(&self) -> impl Iterator<Item = &EditDecision> {
        self.decisions.iter().filter(|d| !d.action.is_kept())
    }

    pub fn has_removals(&self) -> bool {
        self.removed().next().is_some()
    }

    pub fn default_for(&self, kind: TrackKind) -> Option<&EditDecision> {
        self.kept(kind).find(|d| d.is_default())
    }

    pub fn kept_tracks(&self) -> KeptTracks {
        KeptTracks {
            audio: self.kept(TrackKind::Audio).map(|d| d.track_id.clone()).collect(),
            subtitles: self.kept(TrackKind::Subtitle).map(|d| d.track_id.clone()).collect(),
        }
    }

    /// Ediciones de nombre, idioma y flags para las pistas conservadas.
    ///
    /// Las pistas descartadas no aparecen: las elimina la remux posterior.
    pub fn property_edits(&self) -> Vec<PropertyEdit> {
        let mut edits = Vec::new();

        for decision in self.decisions.iter().filter(|d| d.action.is_kept()) {
            let id = &decision.track_id;
            if let Some(title) = &decision.new_title {
                edits.push(PropertyEdit::new(id, TrackProperty::Name, title.as_str()));
            }
            if let Some(code) = decision.language_code {
                edits.push(PropertyEdit::new(id, TrackProperty::Language, code));
            }
            edits.push(PropertyEdit::new(id, TrackProperty::FlagDefault, flag(decision.is_default())));
            edits.push(PropertyEdit::new(id, TrackProperty::FlagForced, flag(decision.is_forced())));
        }

        edits
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
