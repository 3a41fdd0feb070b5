mod extensions;

use std::{
    collections::{HashMap, HashSet},
    ffi::OsStr,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use anyhow::{Context, Result};
use async_walkdir::{DirEntry, WalkDir};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, instrument, warn};

pub use extensions::{ExtensionConfig, SupportedExtension, default_extension_config};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub extension: SupportedExtension,
    pub file_size: u64,
    pub last_modified: u64,
}

impl MediaFile {
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(OsStr::to_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FileId(u64, u64);

#[cfg(unix)]
fn file_id(path: &Path) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| FileId(m.dev(), m.ino()))
}

#[cfg(not(unix))]
fn file_id(_path: &Path) -> Option<FileId> {
    None
}

fn normalize_paths(p: &[PathBuf]) -> Vec<PathBuf> {
    p.iter().filter_map(|pb| dunce::canonicalize(pb).ok()).collect()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with('.'))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalScannerConfig {
    pub exclude: Vec<PathBuf>,
    pub extensions: HashMap<SupportedExtension, ExtensionConfig>,
}

#[derive(Debug, Clone)]
pub struct LocalScanner {
    pub config: LocalScannerConfig,
}

impl LocalScanner {
    pub fn new(config: LocalScannerConfig) -> Self {
        Self { config }
    }

    pub fn extension_config(&self, ext: SupportedExtension) -> &ExtensionConfig {
        self.config.extensions.get(&ext).unwrap_or(ext.config())
    }

    /// Recorre `root` y devuelve los contenedores candidatos ordenados por ruta.
    #[instrument(level = Level::INFO, skip(self))]
    pub async fn scan(&self, root: &Path) -> Result<Vec<MediaFile>> {
        let root = dunce::canonicalize(root).with_context(|| format!("intake {}", root.display()))?;
        let excluded = normalize_paths(&self.config.exclude);

        let mut seen = HashSet::<FileId>::new();
        let mut walker = WalkDir::new(&root).into_stream();
        let mut found = Vec::new();

        while let Some(next) = walker.next().await {
            match next {
                Ok(de) => {
                    let path = de.path();
                    if excluded.iter().any(|p| path.starts_with(p)) || is_hidden(&path) {
                        continue;
                    }

                    if let Some(file) = self.should_process_file(&de).await {
                        if let Some(id) = file_id(&file.path) {
                            if !seen.insert(id) {
                                debug!(path = %file.path.display(), "enlace duro repetido, se omite");
                                continue;
                            }
                        }
                        found.push(file);
                    }
                }
                Err(e) => warn!(?e, "walkdir error"),
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    async fn should_process_file(&self, de: &DirEntry) -> Option<MediaFile> {
        if !de.file_type().await.ok()?.is_file() {
            return None;
        }

        let path = de.path();
        let variant = SupportedExtension::from_path(&path)?;
        let ext_cfg = self.extension_config(variant);

        let md = tokio::fs::metadata(&path).await.ok()?;
        if md.len() < ext_cfg.min_file_size.as_u64() {
            debug!(path = %path.display(), size = md.len(), "archivo demasiado pequeño");
            return None;
        }

        let last_modified = md
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())?;

        Some(MediaFile {
            path,
            extension: variant,
            file_size: md.len(),
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytesize::ByteSize;
    use std::{fs, time::Duration};
    use tempfile::tempdir;

    fn small_limits() -> LocalScannerConfig {
        let tiny = ExtensionConfig {
            min_file_size: ByteSize::b(4),
            min_duration: Duration::from_secs(1),
        };
        LocalScannerConfig {
            exclude: Vec::new(),
            extensions: SupportedExtension::ALL.iter().map(|e| (*e, tiny.clone())).collect(),
        }
    }

    fn write(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[tokio::test]
    async fn finds_containers_sorted_and_filtered() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("Processing");
        write(&root.join("Show/Season 01/[Grp] Show - 02.mkv"), b"12345678");
        write(&root.join("Show/Season 01/[Grp] Show - 01.MKV"), b"12345678");
        write(&root.join("Movies/Film.mp4"), b"12345678");
        write(&root.join("Movies/notes.txt"), b"12345678");
        write(&root.join("Movies/tiny.mkv"), b"1");
        write(&root.join("Movies/.Film.cura-tmp.mkv"), b"12345678");

        let scanner = LocalScanner::new(small_limits());
        let files = scanner.scan(&root).await.unwrap();

        let names: Vec<_> = files.iter().filter_map(MediaFile::file_name).collect();
        assert_eq!(names, vec!["Film.mp4", "[Grp] Show - 01.MKV", "[Grp] Show - 02.mkv"]);
        assert_eq!(files[1].extension, SupportedExtension::Mkv);
    }

    #[tokio::test]
    async fn excluded_paths_are_skipped() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("Processing");
        write(&root.join("keep/a.mkv"), b"12345678");
        write(&root.join("skip/b.mkv"), b"12345678");

        let mut config = small_limits();
        config.exclude = vec![root.join("skip")];

        let files = LocalScanner::new(config).scan(&root).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), Some("a.mkv"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hard_links_are_reported_once() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("Processing");
        write(&root.join("a.mkv"), b"12345678");
        fs::hard_link(root.join("a.mkv"), root.join("b.mkv")).unwrap();

        let files = LocalScanner::new(small_limits()).scan(&root).await.unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let tmp = tempdir().unwrap();
        let scanner = LocalScanner::new(LocalScannerConfig::default());
        assert!(scanner.scan(&tmp.path().join("nope")).await.is_err());
    }
}
