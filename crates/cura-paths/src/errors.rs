use std::{io, path::PathBuf};

/// Errores genéricos del crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No se pudo determinar el directorio base (HOME, XDG, etc)
    #[error(
        "Could not determine the project directory, the call to ProjectDirs failed, \
         the system probably does not provide a valid $HOME path."
    )]
    NoHome,

    /// Nombre de catálogo vacío o con caracteres fuera de [A-Za-z0-9_-]
    #[error("Invalid catalog schema name: `{0}`. Use letters, digits, '-' or '_'.")]
    InvalidSchema(String),

    /// Otro proceso ya tiene el lock
    #[error("Another cura process holds the lock at {0}")]
    Locked(PathBuf),

    /// Error de IO al crear dirs, ficheros, locks...
    #[error(transparent)]
    Io(#[from] io::Error),
}
