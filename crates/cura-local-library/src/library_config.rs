use config::{Config, Environment, File, FileFormat};
use cura_core::{Curator, PolicyTable, PolicyVersion, UnknownLanguagePolicy};
use cura_paths::CuraPaths;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::{
    error::ConfigError,
    identity::IntakeConfig,
    pipeline::StagesConfig,
    scanning::{ExtensionConfig, SupportedExtension, default_extension_config},
    storage::LocalStorageConfig,
    tools::ToolsConfig,
};

/// Prefijo de las variables de entorno que sobrescriben el fichero.
pub const ENV_PREFIX: &str = "CURA";

/// Tabla de idiomas y tratamiento de idiomas irreconocibles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub version: PolicyVersion,
    pub unknown_language: UnknownLanguagePolicy,
}

impl PolicyConfig {
    pub fn curator(&self) -> Curator {
        Curator::new(PolicyTable::new(self.version), self.unknown_language)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct LibraryConfig {
    pub catalog: LocalStorageConfig,
    pub intakes: Vec<IntakeConfig>,
    pub exclude_paths: Vec<PathBuf>,
    pub extension_config: HashMap<SupportedExtension, ExtensionConfig>,
    pub stages: StagesConfig,
    pub tools: ToolsConfig,
    pub policy: PolicyConfig,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            catalog: LocalStorageConfig::default(),
            intakes: Vec::new(),
            exclude_paths: Vec::new(),
            extension_config: default_extension_config(),
            stages: StagesConfig::default(),
            tools: ToolsConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl LibraryConfig {
    /// Sólo el fichero, sin variables de entorno.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let cfg = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml))
            .build()
            .map_err(ConfigError::Parse)?;
        let lc = cfg.try_deserialize::<LibraryConfig>().map_err(ConfigError::Parse)?;
        lc.validate()?;
        Ok(lc)
    }

    /// Fichero (opcional si `required` es falso) más variables `CURA_*`,
    /// p. ej. `CURA_CATALOG__SCHEMA=dev`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let file = path.to_string_lossy().into_owned();
        debug!(path = %file, required, "cargando configuración");

        let cfg = Config::builder()
            .add_source(File::new(&file, FileFormat::Toml).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let lc: LibraryConfig = cfg.try_deserialize()?;
        lc.validate()?;
        Ok(lc)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        CuraPaths::catalog_file_name(&self.catalog.schema)?;

        for (ext, cfg) in &self.extension_config {
            cfg.validate(*ext)?;
        }

        let stages = [&self.stages.intake, &self.stages.published, &self.stages.distribution];
        if stages.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("stage directory names must not be empty".into()));
        }
        if stages.iter().collect::<HashSet<_>>().len() != stages.len() {
            return Err(ConfigError::Invalid("stage directory names must be distinct".into()));
        }

        if self.tools.timeout.is_zero() {
            return Err(ConfigError::Invalid("tools.timeout must be greater than zero".into()));
        }

        let mut seen = HashSet::new();
        for intake in &self.intakes {
            if !seen.insert(&intake.path) {
                return Err(ConfigError::Invalid(format!(
                    "intake {} is configured twice",
                    intake.path.display()
                )));
            }
        }

        Ok(())
    }

    /// Escribe la configuración por defecto. No pisa un fichero existente
    /// salvo con `force`.
    pub fn write_default(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::Invalid(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let text = toml::to_string_pretty(&LibraryConfig::default())?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "configuración por defecto escrita");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DatabaseBackend;
    use cura_core::ContentCategory;
    use indoc::indoc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn parses_full_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("cura.toml");
        std::fs::write(
            &path,
            indoc! {r#"
                exclude_paths = ["/media/Processing/tmp"]

                [catalog]
                schema = "dev"

                [catalog.backend]
                type = "sqlite"
                directory = "/var/lib/cura"

                [[intakes]]
                path = "/media/Processing/Anime"
                category = "anime"

                [[intakes]]
                path = "/media/Processing/Series"
                category = "general"

                [stages]
                published = "Library"

                [tools]
                mkvmerge = "/opt/mkvtoolnix/mkvmerge"
                timeout = "90s"

                [policy]
                version = "v1"
                unknown_language = "fail_file"
            "#},
        )
        .unwrap();

        let cfg = LibraryConfig::from_file(&path).unwrap();

        assert_eq!(cfg.catalog.schema, "dev");
        assert_eq!(
            cfg.catalog.backend,
            DatabaseBackend::Sqlite {
                directory: Some("/var/lib/cura".into())
            }
        );
        assert_eq!(cfg.intakes.len(), 2);
        assert_eq!(cfg.intakes[0].category, ContentCategory::Anime);
        assert_eq!(cfg.stages.intake, "Processing");
        assert_eq!(cfg.stages.published, "Library");
        assert_eq!(cfg.tools.mkvmerge, PathBuf::from("/opt/mkvtoolnix/mkvmerge"));
        assert_eq!(cfg.tools.mediainfo, PathBuf::from("mediainfo"));
        assert_eq!(cfg.tools.timeout, Duration::from_secs(90));
        assert_eq!(cfg.policy.version, PolicyVersion::V1);
        assert_eq!(cfg.policy.unknown_language, UnknownLanguagePolicy::FailFile);
        assert_eq!(cfg.extension_config, default_extension_config());
    }

    #[test]
    fn missing_optional_file_gives_defaults() {
        let tmp = tempdir().unwrap();
        let cfg = LibraryConfig::load(&tmp.path().join("absent.toml"), false).unwrap();
        assert_eq!(cfg.stages, StagesConfig::default());
        assert!(cfg.intakes.is_empty());
    }

    #[test]
    fn missing_required_file_fails() {
        let tmp = tempdir().unwrap();
        assert!(matches!(
            LibraryConfig::load(&tmp.path().join("absent.toml"), true),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_bad_schema_and_duplicate_stages() {
        let mut cfg = LibraryConfig::default();
        cfg.catalog.schema = "../prod".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Paths(_))));

        let mut cfg = LibraryConfig::default();
        cfg.stages.published = cfg.stages.intake.clone();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn default_file_round_trips() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("conf/cura.toml");

        LibraryConfig::write_default(&path, false).unwrap();
        assert_eq!(LibraryConfig::from_file(&path).unwrap(), LibraryConfig::default());

        assert!(LibraryConfig::write_default(&path, false).is_err());
        LibraryConfig::write_default(&path, true).unwrap();
    }

    #[test]
    fn builder_fills_the_rest_with_defaults() {
        let cfg = LibraryConfigBuilder::default()
            .intakes(vec![IntakeConfig {
                path: "/media/Processing/Anime".into(),
                category: ContentCategory::Anime,
            }])
            .catalog(LocalStorageConfig::memory())
            .build()
            .unwrap();

        assert_eq!(cfg.intakes.len(), 1);
        assert_eq!(cfg.catalog.backend, DatabaseBackend::Memory);
        assert_eq!(cfg.tools, ToolsConfig::default());
    }
}
