use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use cura_core::{KeptTracks, PropertyEdit, TrackKind};
use serde::Deserialize;
use tracing::{Level, info, instrument, warn};

use super::{ToolCommand, ToolError, ToolsConfig, is_matroska};
use crate::traits::{RemovalOutcome, TrackRewriter};

/// Códigos de salida aceptados por mkvmerge/mkvpropedit (1 = advertencias).
const MKV_SUCCESS: &[i32] = &[0, 1];

#[derive(Debug, Clone, Default, Deserialize)]
struct Identification {
    #[serde(default)]
    tracks: Vec<MkvTrack>,
}

/// Pista según `mkvmerge -J`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MkvTrack {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: MkvTrackProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MkvTrackProperties {
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default)]
    pub number: Option<u64>,
}

impl MkvTrack {
    fn track_kind(&self) -> Option<TrackKind> {
        match self.kind.as_str() {
            "audio" => Some(TrackKind::Audio),
            "subtitles" => Some(TrackKind::Subtitle),
            _ => None,
        }
    }

    /// Los ids de la inspección son el UID o, si no hay, el número de pista.
    fn matches(&self, track_id: &str) -> bool {
        let Ok(value) = track_id.parse::<u64>() else {
            return false;
        };
        self.properties.uid == Some(value) || self.properties.number == Some(value)
    }

    /// Selector de mkvpropedit para esta pista.
    fn selector(&self, track_id: &str) -> String {
        match self.properties.uid {
            Some(uid) if uid.to_string() == track_id => format!("track:={uid}"),
            _ => format!("track:{track_id}"),
        }
    }
}

fn find_track<'a>(tracks: &'a [MkvTrack], track_id: &str) -> Result<&'a MkvTrack, ToolError> {
    tracks
        .iter()
        .find(|t| t.matches(track_id))
        .ok_or_else(|| ToolError::UnknownTrack(track_id.to_string()))
}

/// Argumentos de mkvpropedit: un `--edit` por pista, seguido de sus `--set`.
fn propedit_args(path: &Path, edits: &[PropertyEdit], tracks: &[MkvTrack]) -> Result<Vec<OsString>, ToolError> {
    let mut args = vec![path.as_os_str().to_os_string()];
    let mut current: Option<&str> = None;

    for edit in edits {
        if current != Some(edit.track_id.as_str()) {
            let track = find_track(tracks, &edit.track_id)?;
            args.push("--edit".into());
            args.push(track.selector(&edit.track_id).into());
            current = Some(edit.track_id.as_str());
        }
        args.push("--set".into());
        args.push(format!("{}={}", edit.property.as_str(), edit.value).into());
    }

    Ok(args)
}

/// Qué pistas (ids de mkvmerge) sobreviven a la remux.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    audio: Vec<u64>,
    subtitles: Vec<u64>,
    removed: usize,
}

impl Selection {
    /// `None` si no hay nada que quitar.
    fn compute(tracks: &[MkvTrack], kept: &KeptTracks) -> Result<Option<Self>, ToolError> {
        for id in kept.audio.iter().chain(&kept.subtitles) {
            find_track(tracks, id)?;
        }

        let mut selection = Selection {
            audio: Vec::new(),
            subtitles: Vec::new(),
            removed: 0,
        };

        for track in tracks {
            let Some(kind) = track.track_kind() else {
                continue;
            };

            let ids = match kind {
                TrackKind::Audio => &kept.audio,
                TrackKind::Subtitle => &kept.subtitles,
            };

            if ids.iter().any(|id| track.matches(id)) {
                match kind {
                    TrackKind::Audio => selection.audio.push(track.id),
                    TrackKind::Subtitle => selection.subtitles.push(track.id),
                }
            } else {
                selection.removed += 1;
            }
        }

        Ok((selection.removed > 0).then_some(selection))
    }

    fn merge_args(&self, output: &Path, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-o".into(), output.as_os_str().to_os_string()];

        if self.audio.is_empty() {
            args.push("--no-audio".into());
        } else {
            args.push("-a".into());
            args.push(join_ids(&self.audio).into());
        }

        if self.subtitles.is_empty() {
            args.push("--no-subtitles".into());
        } else {
            args.push("-s".into());
            args.push(join_ids(&self.subtitles).into());
        }

        args.push(input.as_os_str().to_os_string());
        args
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

/// Fichero temporal oculto junto al original: `.<stem>.cura-tmp.mkv`.
fn temp_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or(OsStr::new("media")).to_string_lossy();
    path.with_file_name(format!(".{stem}.cura-tmp.mkv"))
}

/// Reescritura de Matroska con `mkvpropedit` y `mkvmerge`.
#[derive(Debug, Clone)]
pub struct MkvToolNix {
    config: ToolsConfig,
}

impl MkvToolNix {
    pub fn new(config: ToolsConfig) -> Self {
        MkvToolNix { config }
    }

    async fn identify(&self, path: &Path) -> Result<Vec<MkvTrack>, ToolError> {
        let output = ToolCommand::new(&self.config.mkvmerge, self.config.timeout)
            .arg("-J")
            .arg(path)
            .accept_codes(MKV_SUCCESS)
            .execute()
            .await?;

        let identification: Identification = serde_json::from_slice(&output.stdout).map_err(|e| ToolError::Parse {
            tool: "mkvmerge".into(),
            message: e.to_string(),
        })?;

        Ok(identification.tracks)
    }
}

#[async_trait]
impl TrackRewriter for MkvToolNix {
    #[instrument(level = Level::INFO, skip(self, edits), fields(edits = edits.len()))]
    async fn apply_edits(&self, path: &Path, edits: &[PropertyEdit]) -> Result<(), ToolError> {
        if !is_matroska(path) {
            return Err(ToolError::UnsupportedContainer(path.to_path_buf()));
        }
        if edits.is_empty() {
            return Ok(());
        }

        let tracks = self.identify(path).await?;
        let args = propedit_args(path, edits, &tracks)?;

        ToolCommand::new(&self.config.mkvpropedit, self.config.timeout)
            .args(args)
            .accept_codes(MKV_SUCCESS)
            .execute()
            .await?;

        info!("propiedades de pistas actualizadas");
        Ok(())
    }

    #[instrument(level = Level::INFO, skip(self, kept))]
    async fn remove_tracks(&self, path: &Path, kept: &KeptTracks) -> Result<RemovalOutcome, ToolError> {
        if !is_matroska(path) {
            return Err(ToolError::UnsupportedContainer(path.to_path_buf()));
        }

        let tracks = self.identify(path).await?;
        let Some(selection) = Selection::compute(&tracks, kept)? else {
            info!("no hay pistas que quitar");
            return Ok(RemovalOutcome::Unchanged);
        };

        let tmp = temp_path(path);
        let result = ToolCommand::new(&self.config.mkvmerge, self.config.timeout)
            .args(selection.merge_args(&tmp, path))
            .accept_codes(MKV_SUCCESS)
            .execute()
            .await;

        if let Err(e) = result {
            match tokio::fs::remove_file(&tmp).await {
                Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                    warn!(tmp = %tmp.display(), %cleanup, "no se pudo borrar el temporal");
                }
                _ => {}
            }
            return Err(e);
        }

        tokio::fs::rename(&tmp, path).await?;

        info!(removed = selection.removed, "pistas eliminadas");
        Ok(RemovalOutcome::Rewritten {
            removed: selection.removed,
        })
    }
}
