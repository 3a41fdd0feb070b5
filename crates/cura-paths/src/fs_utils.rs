use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
};

use tracing::{Level, debug, instrument};

use crate::errors::Error;

/// Fichero de prueba que se crea y borra para comprobar permisos.
const WRITE_PROBE: &str = ".cura-write-probe";

#[instrument(level = Level::TRACE, err)]
pub fn ensure_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Abre (o crea) `path` y toma un lock exclusivo sin esperar.
/// El lock dura lo que viva el `File` devuelto.
#[instrument(level = Level::TRACE, err)]
pub fn try_lock_file(path: &Path) -> Result<File, Error> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?;

    match file.try_lock_exclusive() {
        Ok(()) => {
            debug!(path = %path.display(), "lock de proceso tomado");
            Ok(file)
        }
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(Error::Locked(path.to_path_buf())),
        Err(e) => Err(e.into()),
    }
}

/// Comprueba que se puede escribir en el directorio `dir` creando y
/// borrando un fichero de prueba.
#[instrument(level = Level::TRACE, err)]
pub fn check_writable(dir: &Path) -> Result<(), Error> {
    let probe = dir.join(WRITE_PROBE);

    File::create(&probe).map_err(|e| {
        io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("No write permission for {}: {e}", dir.display()),
        )
    })?;

    match fs::remove_file(&probe) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
