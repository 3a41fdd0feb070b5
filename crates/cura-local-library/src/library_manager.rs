use std::{fmt, path::PathBuf, sync::Arc, time::Instant};

use cura_core::ContentCategory;
use tracing::{Level, debug, error, info, instrument, warn};

use crate::{
    config_manager::ConfigManager,
    error::StorageError,
    identity::IntakeConfig,
    pipeline::{FileOutcome, Pipeline, SharedArbiter, relocate::swap_stage},
    scanning::{LocalScanner, MediaFile},
    storage::{CatalogCounts, LocalStorage},
    tools::{MediaInfoCli, MkvToolNix},
    traits::{MediaInspector, TrackRewriter},
};

/// Resumen de una pasada sobre las carpetas configuradas.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
    /// Archivos que ya estaban catalogados (o pendientes de catalogar en la promoción).
    pub skipped: usize,
    pub intake_errors: Vec<(PathBuf, String)>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|&o| pred(o)).count()
    }

    pub fn published(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Published { .. }))
    }

    pub fn promoted(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Promoted { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(FileOutcome::is_failure)
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.intake_errors.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} published, {} promoted, {} failed, {} skipped, {} intake errors",
            self.published(),
            self.promoted(),
            self.failed(),
            self.skipped,
            self.intake_errors.len()
        )
    }
}

pub struct LibraryManager {
    scanner: Arc<LocalScanner>,
    pipeline: Arc<Pipeline>,
    intakes: Vec<IntakeConfig>,
}

impl LibraryManager {
    /// Usa `mediainfo`/`ffprobe` y MKVToolNix según `config.tools`.
    pub fn new(config: ConfigManager) -> Result<Self, StorageError> {
        let inspector = Arc::new(MediaInfoCli::new(config.tools.clone()));
        let rewriter = Arc::new(MkvToolNix::new(config.tools.clone()));
        Self::with_tools(config, inspector, rewriter)
    }

    pub fn with_tools(
        config: ConfigManager,
        inspector: Arc<dyn MediaInspector>,
        rewriter: Arc<dyn TrackRewriter>,
    ) -> Result<Self, StorageError> {
        let storage = LocalStorage::new(&config.storage)?;
        let pipeline = Pipeline::new(inspector, rewriter, storage, config.curator, config.stages);

        Ok(LibraryManager {
            scanner: Arc::new(LocalScanner::new(config.scanner)),
            pipeline: Arc::new(pipeline),
            intakes: config.intakes,
        })
    }

    pub fn storage(&self) -> &LocalStorage {
        self.pipeline.storage()
    }

    /// Procesa todas las carpetas de entrada, un archivo detrás de otro.
    #[instrument(level = Level::INFO, skip_all, fields(intakes = self.intakes.len()))]
    pub async fn run(&self, arbiter: SharedArbiter) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        for intake in &self.intakes {
            let files = match self.scanner.scan(&intake.path).await {
                Ok(files) => files,
                Err(e) => {
                    error!(intake = %intake.path.display(), error = %e, "no se pudo escanear la carpeta");
                    summary.intake_errors.push((intake.path.clone(), format!("{e:#}")));
                    continue;
                }
            };
            info!(intake = %intake.path.display(), files = files.len(), "carpeta escaneada");

            for file in files {
                match self.already_cataloged(&file) {
                    Ok(true) => {
                        debug!(path = %file.path.display(), "ya catalogado, se omite");
                        summary.skipped += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => warn!(path = %file.path.display(), error = %e, "no se pudo consultar el catálogo"),
                }

                let outcome = self.process(&file, intake.category, arbiter.clone()).await;
                summary.outcomes.push(outcome);
            }
        }

        info!(%summary, elapsed_ms = start.elapsed().as_millis() as u64, "pasada terminada");
        summary
    }

    async fn process(&self, file: &MediaFile, category: ContentCategory, arbiter: SharedArbiter) -> FileOutcome {
        let limits = self.scanner.extension_config(file.extension);
        self.pipeline.process(file, category, limits, arbiter).await
    }

    fn already_cataloged(&self, file: &MediaFile) -> Result<bool, StorageError> {
        match file.file_name() {
            Some(name) => self.storage().is_cataloged(name),
            None => Ok(false),
        }
    }

    /// Mueve a distribución lo que ya está publicado y catalogado.
    #[instrument(level = Level::INFO, skip_all)]
    pub async fn promote(&self) -> RunSummary {
        let stages = self.pipeline.stages();
        let mut summary = RunSummary::default();

        for intake in &self.intakes {
            let Some(root) = swap_stage(&intake.path, &stages.intake, &stages.published) else {
                warn!(intake = %intake.path.display(), stage = %stages.intake, "la carpeta no está en la etapa de entrada");
                summary
                    .intake_errors
                    .push((intake.path.clone(), format!("not inside the `{}` stage", stages.intake)));
                continue;
            };

            if !tokio::fs::try_exists(&root).await.unwrap_or(false) {
                debug!(root = %root.display(), "nada publicado todavía");
                continue;
            }

            let files = match self.scanner.scan(&root).await {
                Ok(files) => files,
                Err(e) => {
                    error!(root = %root.display(), error = %e, "no se pudo escanear la carpeta publicada");
                    summary.intake_errors.push((root, format!("{e:#}")));
                    continue;
                }
            };

            for file in files {
                match self.already_cataloged(&file) {
                    Ok(true) => summary.outcomes.push(self.pipeline.promote(&file.path).await),
                    Ok(false) => {
                        debug!(path = %file.path.display(), "sin catalogar, no se promociona");
                        summary.skipped += 1;
                    }
                    Err(e) => warn!(path = %file.path.display(), error = %e, "no se pudo consultar el catálogo"),
                }
            }
        }

        info!(%summary, "promoción terminada");
        summary
    }

    pub fn status(&self) -> Result<CatalogCounts, StorageError> {
        self.storage().counts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        library_config::LibraryConfigBuilder,
        pipeline::tests::{FakeInspector, RecordingRewriter},
        scanning::{ExtensionConfig, SupportedExtension},
        storage::LocalStorageConfig,
        tools::mediainfo::tests::EPISODE_JSON,
    };
    use cura_core::{ArbiterError, DuplicateSet, TrackId};
    use std::{collections::HashMap, path::Path, time::Duration};
    use tempfile::tempdir;

    fn manager(root: &Path) -> LibraryManager {
        let tiny = ExtensionConfig {
            min_file_size: bytesize::ByteSize::b(1),
            min_duration: Duration::from_secs(30),
        };
        let extensions: HashMap<_, _> = SupportedExtension::ALL.iter().map(|e| (*e, tiny.clone())).collect();

        let cfg = LibraryConfigBuilder::default()
            .catalog(LocalStorageConfig::memory())
            .intakes(vec![IntakeConfig {
                path: root.join("Processing/Anime"),
                category: ContentCategory::Anime,
            }])
            .extension_config(extensions)
            .build()
            .unwrap();

        LibraryManager::with_tools(
            cfg.into(),
            Arc::new(FakeInspector {
                json: EPISODE_JSON.into(),
                probed: None,
            }),
            Arc::new(RecordingRewriter::default()),
        )
        .unwrap()
    }

    fn drop_episode(root: &Path, name: &str) -> PathBuf {
        let path = root.join("Processing/Anime/Show/Season 01").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"matroska").unwrap();
        path
    }

    fn no_questions() -> SharedArbiter {
        Arc::new(|set: &DuplicateSet| -> Result<TrackId, ArbiterError> { Err(ArbiterError::Unanswered(set.key())) })
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let tmp = tempdir().unwrap();
        let root = dunce::canonicalize(tmp.path()).unwrap();
        let manager = manager(&root);
        drop_episode(&root, "[Grp] Show - 01.mkv");
        drop_episode(&root, "[Grp] Show - 02.mkv");

        let first = manager.run(no_questions()).await;
        assert_eq!(first.published(), 2, "{first}");
        assert!(first.is_clean());
        let counts = manager.status().unwrap();
        assert_eq!(counts.content, 1);
        assert_eq!(counts.media, 2);

        let second = manager.run(no_questions()).await;
        assert!(second.outcomes.is_empty());
        assert_eq!(manager.status().unwrap(), counts);
    }

    #[tokio::test]
    async fn cataloged_names_are_skipped() {
        let tmp = tempdir().unwrap();
        let root = dunce::canonicalize(tmp.path()).unwrap();
        let manager = manager(&root);
        drop_episode(&root, "[Grp] Show - 01.mkv");
        manager.run(no_questions()).await;

        let again = drop_episode(&root, "[Grp] Show - 01.mkv");
        let summary = manager.run(no_questions()).await;

        assert_eq!(summary.skipped, 1);
        assert!(summary.outcomes.is_empty());
        assert!(again.exists());
    }

    #[tokio::test]
    async fn missing_intake_is_reported_and_run_continues() {
        let tmp = tempdir().unwrap();
        let manager = manager(&tmp.path().join("nowhere"));

        let summary = manager.run(no_questions()).await;

        assert_eq!(summary.intake_errors.len(), 1);
        assert!(!summary.is_clean());
    }

    #[tokio::test]
    async fn promote_moves_published_files_to_distribution() {
        let tmp = tempdir().unwrap();
        let root = dunce::canonicalize(tmp.path()).unwrap();
        let manager = manager(&root);
        drop_episode(&root, "[Grp] Show - 01.mkv");
        manager.run(no_questions()).await;

        let stray = root.join("Jellyfin/Anime/Show/Season 01/[Grp] Show - 99.mkv");
        std::fs::write(&stray, b"x").unwrap();

        let summary = manager.promote().await;

        assert_eq!(summary.promoted(), 1, "{summary}");
        assert_eq!(summary.skipped, 1);
        assert!(root.join("Plex/Anime/Show/Season 01/[Grp] Show - 01.mkv").exists());
        assert!(stray.exists());
    }
}
