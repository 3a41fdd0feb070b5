use std::{
    ffi::OsStr,
    io,
    path::{Component, Path, PathBuf},
};

use tracing::{debug, info};

use crate::error::PipelineError;

/// Sustituye el primer componente igual a `from` por `to`.
pub fn swap_stage(path: &Path, from: &str, to: &str) -> Option<PathBuf> {
    let mut swapped = false;
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(name) if !swapped && name == OsStr::new(from) => {
                out.push(to);
                swapped = true;
            }
            other => out.push(other.as_os_str()),
        }
    }

    swapped.then_some(out)
}

/// Mueve `path` de la etapa `from` a la etapa `to`, creando carpetas.
/// Nunca sobrescribe un archivo existente en el destino.
pub async fn relocate(path: &Path, from: &str, to: &str) -> Result<PathBuf, PipelineError> {
    let target = swap_stage(path, from, to).ok_or_else(|| PipelineError::NotInStage {
        path: path.to_path_buf(),
        stage: from.to_string(),
    })?;

    let fail = |source: io::Error| PipelineError::Relocation {
        path: path.to_path_buf(),
        source,
    };

    if tokio::fs::try_exists(&target).await.map_err(fail)? {
        return Err(fail(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        )));
    }

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    match tokio::fs::rename(path, &target).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %path.display(), to = %target.display(), "rename entre dispositivos, se copia");
            tokio::fs::copy(path, &target).await.map_err(fail)?;
            tokio::fs::remove_file(path).await.map_err(fail)?;
        }
        Err(e) => return Err(fail(e)),
    }

    info!(from = %path.display(), to = %target.display(), "archivo movido");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn swaps_only_the_first_matching_component() {
        let path = Path::new("/media/Processing/Anime/Processing/ep.mkv");
        assert_eq!(
            swap_stage(path, "Processing", "Jellyfin"),
            Some(PathBuf::from("/media/Jellyfin/Anime/Processing/ep.mkv"))
        );
    }

    #[test]
    fn partial_names_do_not_match() {
        let path = Path::new("/media/Processing-old/ep.mkv");
        assert_eq!(swap_stage(path, "Processing", "Jellyfin"), None);
    }

    #[tokio::test]
    async fn moves_into_new_tree() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("Processing/Show/Season 01/ep.mkv");
        std::fs::create_dir_all(src.parent().unwrap()).unwrap();
        std::fs::write(&src, b"data").unwrap();

        let target = relocate(&src, "Processing", "Jellyfin").await.unwrap();

        assert_eq!(target, tmp.path().join("Jellyfin/Show/Season 01/ep.mkv"));
        assert!(!src.exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"data");
    }

    #[tokio::test]
    async fn refuses_to_overwrite() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("Processing/ep.mkv");
        let dst = tmp.path().join("Jellyfin/ep.mkv");
        for p in [&src, &dst] {
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(p, b"x").unwrap();
        }

        let err = relocate(&src, "Processing", "Jellyfin").await.unwrap_err();
        assert!(matches!(err, PipelineError::Relocation { .. }));
        assert!(src.exists());
    }

    #[tokio::test]
    async fn outside_stage_is_rejected() {
        let err = relocate(Path::new("/media/Other/ep.mkv"), "Processing", "Jellyfin")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotInStage { .. }));
    }
}
