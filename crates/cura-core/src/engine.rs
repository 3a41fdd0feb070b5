use tracing::{Level, info, instrument};

use crate::{
    category::ContentCategory,
    classifier::{UnknownLanguagePolicy, classify},
    error::CurationError,
    plan::EditPlan,
    policy::{PolicyTable, decide},
    resolver::{DuplicateArbiter, resolve},
    track::{RawTrack, TrackId},
};

/// Resultado de curar un archivo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curation {
    pub plan: EditPlan,
    /// Pistas a las que les faltaba título o idioma.
    pub needs_review: Vec<TrackId>,
}

/// Clasificar, resolver duplicados y aplicar la política, en ese orden.
#[derive(Debug, Clone, Copy, Default)]
pub struct Curator {
    pub policy: PolicyTable,
    pub unknown_language: UnknownLanguagePolicy,
}

impl Curator {
    pub fn new(policy: PolicyTable, unknown_language: UnknownLanguagePolicy) -> Self {
        Curator {
            policy,
            unknown_language,
        }
    }

    #[instrument(level = Level::INFO, skip(self, raw_tracks, arbiter), fields(tracks = raw_tracks.len()))]
    pub fn curate(
        &self,
        category: ContentCategory,
        raw_tracks: &[RawTrack],
        arbiter: &dyn DuplicateArbiter,
    ) -> Result<Curation, CurationError> {
        let classified = classify(raw_tracks, self.unknown_language)?;

        // Antes de preguntar por duplicados.
        if !classified.has_video {
            return Err(CurationError::NoVideoTrack);
        }

        let needs_review = classified.needs_review.clone();
        let resolved = resolve(classified, arbiter)?;
        let plan = decide(category, &resolved, &self.policy)?;

        info!(
            kept = plan.decisions().len() - plan.removed().count(),
            removed = plan.removed().count(),
            "plan de edición listo"
        );

        Ok(Curation { plan, needs_review })
    }
}
