pub mod category;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod language;
pub mod plan;
pub mod policy;
pub mod resolver;
pub mod track;

pub use category::{ContentCategory, MediaType};
pub use classifier::{ClassifiedTracks, UnknownLanguagePolicy, classify};
pub use engine::{Curation, Curator};
pub use error::{ArbiterError, CurationError, ParseError};
pub use language::{Language, normalize_language};
pub use plan::{EditAction, EditDecision, EditPlan, KeptTracks, PropertyEdit, TrackProperty};
pub use policy::{PolicyTable, PolicyVersion, decide};
pub use resolver::{Candidate, DuplicateArbiter, DuplicateSet, ScriptedArbiter, Variant, resolve};
pub use track::{RawTrack, RawTrackKind, Track, TrackId, TrackKind};
