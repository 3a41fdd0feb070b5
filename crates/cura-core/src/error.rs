use thiserror::Error;

use crate::track::TrackId;

/// Fallos de la curación. Todos abortan el archivo en curso sin efectos
/// secundarios; el siguiente archivo se procesa igual.
#[derive(Error, Debug)]
pub enum CurationError {
    #[error("the inspection returned no tracks")]
    NoTracks,

    #[error("the container has no audio or subtitle tracks")]
    NoCommunicationTracks,

    #[error("the container has no video track")]
    NoVideoTrack,

    #[error("track {track_id} has an unresolved language tag `{raw}`")]
    UnresolvedLanguage { track_id: TrackId, raw: String },

    #[error("no decision for duplicate group {key}: {source}")]
    Arbiter {
        key: String,
        #[source]
        source: ArbiterError,
    },

    #[error("track `{choice}` does not belong to duplicate group {key}")]
    InvalidChoice { key: String, choice: TrackId },

    #[error("no audio track would survive curation")]
    AudioStarvation,
}

/// Errores del puerto de decisión de duplicados.
#[derive(Error, Debug)]
pub enum ArbiterError {
    #[error("no answer available for {0}")]
    Unanswered(String),

    #[error("the operator aborted the decision")]
    Aborted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown content category `{0}`")]
    Category(String),

    #[error("unknown media type `{0}`")]
    MediaType(String),
}
