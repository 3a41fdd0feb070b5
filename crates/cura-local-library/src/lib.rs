pub mod config_manager;
pub mod error;
pub mod identity;
pub mod library_config;
pub mod library_manager;
pub mod pipeline;
pub mod scanning;
pub mod storage;
pub mod tools;
pub mod traits;

pub use config_manager::ConfigManager;
pub use library_config::{LibraryConfig, LibraryConfigBuilder, PolicyConfig};
pub use library_manager::{LibraryManager, RunSummary};
pub use pipeline::{FileOutcome, SharedArbiter, Stage};
