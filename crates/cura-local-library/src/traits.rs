use std::path::Path;

use async_trait::async_trait;
use cura_core::{KeptTracks, PropertyEdit};

use crate::tools::{MediaInfoDocument, ToolError};

/// Lectura de pistas y atributos de un contenedor.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn inspect(&self, path: &Path) -> Result<MediaInfoDocument, ToolError>;

    /// Duración en segundos según una segunda herramienta, si la conoce.
    async fn probe_duration(&self, path: &Path) -> Result<Option<f64>, ToolError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Unchanged,
    Rewritten { removed: usize },
}

/// Edición de metadatos y selección de pistas en el sitio.
#[async_trait]
pub trait TrackRewriter: Send + Sync {
    async fn apply_edits(&self, path: &Path, edits: &[PropertyEdit]) -> Result<(), ToolError>;

    /// El vídeo se conserva siempre; audio y subtítulos sólo si están en `kept`.
    async fn remove_tracks(&self, path: &Path, kept: &KeptTracks) -> Result<RemovalOutcome, ToolError>;
}
