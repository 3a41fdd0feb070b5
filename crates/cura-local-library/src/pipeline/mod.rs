pub mod attributes;
pub mod relocate;

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use cura_core::{ContentCategory, Curator, DuplicateArbiter, EditPlan};
use serde::{Deserialize, Serialize};
use tracing::{Level, info, instrument, warn};

use crate::{
    error::{FileFailure, PipelineError},
    identity::MediaIdentity,
    scanning::{ExtensionConfig, MediaFile},
    storage::{CatalogReport, LocalStorage},
    tools::ToolError,
    traits::{MediaInspector, RemovalOutcome, TrackRewriter},
};

pub type SharedArbiter = Arc<dyn DuplicateArbiter + Send + Sync>;

/// Etapas de un archivo. Las tres primeras viven en la carpeta de entrada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Intake,
    Curated,
    Cataloged,
    Published,
    Distributed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Curated => "curated",
            Stage::Cataloged => "cataloged",
            Stage::Published => "published",
            Stage::Distributed => "distributed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nombres de las carpetas de cada etapa dentro del árbol de medios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    pub intake: String,
    pub published: String,
    pub distribution: String,
}

impl Default for StagesConfig {
    fn default() -> Self {
        StagesConfig {
            intake: "Processing".into(),
            published: "Jellyfin".into(),
            distribution: "Plex".into(),
        }
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    Published {
        from: PathBuf,
        to: PathBuf,
        report: CatalogReport,
    },
    Promoted {
        from: PathBuf,
        to: PathBuf,
    },
    Failed(FileFailure),
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed(_))
    }
}

/// Lo que sale de la curación y necesita la catalogación.
struct Curated {
    identity: MediaIdentity,
    plan: EditPlan,
}

pub struct Pipeline {
    inspector: Arc<dyn MediaInspector>,
    rewriter: Arc<dyn TrackRewriter>,
    storage: LocalStorage,
    curator: Curator,
    stages: StagesConfig,
}

impl Pipeline {
    pub fn new(
        inspector: Arc<dyn MediaInspector>,
        rewriter: Arc<dyn TrackRewriter>,
        storage: LocalStorage,
        curator: Curator,
        stages: StagesConfig,
    ) -> Self {
        Pipeline {
            inspector,
            rewriter,
            storage,
            curator,
            stages,
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn stages(&self) -> &StagesConfig {
        &self.stages
    }

    /// Lleva un archivo de la entrada hasta la etapa publicada. Un fallo deja
    /// el archivo en su carpeta y se informa con la etapa alcanzada.
    #[instrument(level = Level::INFO, skip_all, fields(file = %file.path.display()))]
    pub async fn process(
        &self,
        file: &MediaFile,
        category: ContentCategory,
        limits: &ExtensionConfig,
        arbiter: SharedArbiter,
    ) -> FileOutcome {
        let curated = match self.curate(file, category, limits, arbiter).await {
            Ok(curated) => curated,
            Err(error) => return failed(&file.path, Stage::Intake, error),
        };
        transition(Stage::Intake, Stage::Curated);

        let report = match self.catalog(&file.path, &curated).await {
            Ok(report) => report,
            Err(error) => return failed(&file.path, Stage::Curated, error),
        };
        transition(Stage::Curated, Stage::Cataloged);

        match relocate::relocate(&file.path, &self.stages.intake, &self.stages.published).await {
            Ok(to) => {
                transition(Stage::Cataloged, Stage::Published);
                FileOutcome::Published {
                    from: file.path.clone(),
                    to,
                    report,
                }
            }
            Err(error) => failed(&file.path, Stage::Cataloged, error),
        }
    }

    async fn curate(
        &self,
        file: &MediaFile,
        category: ContentCategory,
        limits: &ExtensionConfig,
        arbiter: SharedArbiter,
    ) -> Result<Curated, PipelineError> {
        let path = file.path.as_path();
        if relocate::swap_stage(path, &self.stages.intake, &self.stages.published).is_none() {
            return Err(PipelineError::NotInStage {
                path: path.to_path_buf(),
                stage: self.stages.intake.clone(),
            });
        }

        let identity =
            MediaIdentity::derive(path, category).ok_or_else(|| PipelineError::InvalidFileName(path.to_path_buf()))?;

        if !file.extension.is_rewritable() {
            return Err(ToolError::UnsupportedContainer(path.to_path_buf()).into());
        }

        let doc = self.inspector.inspect(path).await?;

        if let Some(actual) = attributes::reported_duration(&doc) {
            let minimum = limits.min_duration.as_secs();
            if actual < limits.min_duration.as_secs_f64() {
                return Err(PipelineError::TooShort { actual, minimum });
            }
        }

        let raw_tracks = doc.raw_tracks();
        let curator = self.curator;
        let curation = tokio::task::spawn_blocking(move || curator.curate(category, &raw_tracks, arbiter.as_ref()))
            .await??;

        if !curation.needs_review.is_empty() {
            warn!(tracks = ?curation.needs_review, "pistas sin título o idioma, conviene revisarlas");
        }

        self.rewriter.apply_edits(path, &curation.plan.property_edits()).await?;

        match self.rewriter.remove_tracks(path, &curation.plan.kept_tracks()).await? {
            RemovalOutcome::Unchanged => info!("sin pistas descartadas"),
            RemovalOutcome::Rewritten { removed } => info!(removed, "pistas descartadas"),
        }

        Ok(Curated {
            identity,
            plan: curation.plan,
        })
    }

    async fn catalog(&self, path: &Path, curated: &Curated) -> Result<CatalogReport, PipelineError> {
        let doc = self.inspector.inspect(path).await?;

        let probed = if attributes::needs_probe(&doc) {
            warn!("metadatos de duración o framerate incompletos, se consulta ffprobe");
            self.inspector.probe_duration(path).await?
        } else {
            None
        };

        let entry = attributes::catalog_entry(&doc, &curated.identity, probed)?;
        info!(
            content = %entry.content_name,
            decisions = curated.plan.decisions().len(),
            "catalogando"
        );

        let storage = self.storage.clone();
        let report = tokio::task::spawn_blocking(move || storage.catalog_file(&entry)).await??;
        Ok(report)
    }

    /// Publicado → distribución, sólo si el archivo ya está catalogado.
    #[instrument(level = Level::INFO, skip(self))]
    pub async fn promote(&self, path: &Path) -> FileOutcome {
        match self.try_promote(path).await {
            Ok(to) => FileOutcome::Promoted {
                from: path.to_path_buf(),
                to,
            },
            Err(error) => failed(path, Stage::Published, error),
        }
    }

    async fn try_promote(&self, path: &Path) -> Result<PathBuf, PipelineError> {
        if relocate::swap_stage(path, &self.stages.published, &self.stages.distribution).is_none() {
            return Err(PipelineError::NotInStage {
                path: path.to_path_buf(),
                stage: self.stages.published.clone(),
            });
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::InvalidFileName(path.to_path_buf()))?;

        if !self.storage.is_cataloged(file_name)? {
            return Err(PipelineError::NotCataloged(file_name.to_string()));
        }

        relocate::relocate(path, &self.stages.published, &self.stages.distribution).await
    }
}

fn transition(from: Stage, to: Stage) {
    info!(%from, %to, "transición");
}

fn failed(path: &Path, stage: Stage, error: PipelineError) -> FileOutcome {
    warn!(%stage, %error, "el archivo queda en su etapa");
    FileOutcome::Failed(FileFailure {
        path: path.to_path_buf(),
        stage,
        error,
    })
}
