use cura_core::Curator;

use crate::{
    identity::IntakeConfig, library_config::LibraryConfig, pipeline::StagesConfig, scanning::LocalScannerConfig,
    storage::LocalStorageConfig, tools::ToolsConfig,
};

/// Configuración ya repartida por componente.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub scanner: LocalScannerConfig,
    pub storage: LocalStorageConfig,
    pub tools: ToolsConfig,
    pub stages: StagesConfig,
    pub curator: Curator,
    pub intakes: Vec<IntakeConfig>,
}

impl ConfigManager {
    pub fn new() -> Self {
        LibraryConfig::default().into()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl From<LibraryConfig> for ConfigManager {
    fn from(cfg: LibraryConfig) -> Self {
        ConfigManager {
            scanner: LocalScannerConfig {
                exclude: cfg.exclude_paths,
                extensions: cfg.extension_config,
            },
            storage: cfg.catalog,
            tools: cfg.tools,
            stages: cfg.stages,
            curator: cfg.policy.curator(),
            intakes: cfg.intakes,
        }
    }
}
