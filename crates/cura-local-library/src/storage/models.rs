use std::fmt;

use cura_core::{ContentCategory, Language, MediaType};

pub type ContentId = i64;
pub type MediaId = i64;
pub type TrackRecordId = i64;

/// Resultado de una escritura idempotente.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert<T> {
    Inserted(T),
    Existing(T),
}

impl<T> Upsert<T> {
    pub(crate) fn from_changes(changes: usize, record: T) -> Self {
        if changes > 0 { Upsert::Inserted(record) } else { Upsert::Existing(record) }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Upsert::Inserted(_))
    }

    pub fn record(&self) -> &T {
        match self {
            Upsert::Inserted(r) | Upsert::Existing(r) => r,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Upsert::Inserted(r) | Upsert::Existing(r) => r,
        }
    }
}

/// Códec de vídeo normalizado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    H264,
    H265,
    Av1,
    Unknown,
}

impl VideoCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoCodec::H264 => "H264",
            VideoCodec::H265 => "H265",
            VideoCodec::Av1 => "AV1",
            VideoCodec::Unknown => "Unknown",
        }
    }

    /// `Format` de la inspección (`AVC`, `HEVC`, `h.264`...) a la forma canónica.
    pub fn normalize(format: Option<&str>) -> Self {
        match format.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
            Some("avc" | "h264" | "h.264" | "x264") => VideoCodec::H264,
            Some("hevc" | "h265" | "h.265" | "x265") => VideoCodec::H265,
            Some("av1") => VideoCodec::Av1,
            _ => VideoCodec::Unknown,
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    pub id: ContentId,
    pub name: String,
    pub category: ContentCategory,
    pub created_at: String,
}

/// Atributos físicos de un archivo, tal como se catalogan.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAttributes {
    pub source: String,
    pub media_type: MediaType,
    pub codec: VideoCodec,
    pub duration_seconds: i64,
    pub bitrate_mode: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub framerate_mode: Option<String>,
    pub framerate: f64,
    pub bit_depth: Option<u32>,
    pub file_size: Option<i64>,
    pub file_extension: Option<String>,
    pub overall_bitrate: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaRecord {
    pub id: MediaId,
    pub content_id: ContentId,
    pub name: String,
    pub attributes: MediaAttributes,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAttributes {
    pub format: Option<String>,
    pub channels: Option<u32>,
    pub title: String,
    pub language_tag: String,
    pub language: Language,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleAttributes {
    pub title: String,
    pub language_tag: String,
    pub language: Language,
    pub is_default: bool,
    pub is_forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRecord {
    pub id: TrackRecordId,
    pub media_id: MediaId,
    pub attributes: AudioAttributes,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleRecord {
    pub id: TrackRecordId,
    pub media_id: MediaId,
    pub attributes: SubtitleAttributes,
    pub created_at: String,
}

/// Todo lo que se cataloga de un archivo curado.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub content_name: String,
    pub category: ContentCategory,
    pub file_name: String,
    pub media: MediaAttributes,
    pub audio: Vec<AudioAttributes>,
    pub subtitles: Vec<SubtitleAttributes>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogReport {
    pub content: Upsert<ContentRecord>,
    pub media: Upsert<MediaRecord>,
    pub audio_inserted: usize,
    pub subtitles_inserted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub content: u64,
    pub media: u64,
    pub audio: u64,
    pub subtitles: u64,
}

impl fmt::Display for CatalogCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} content, {} media, {} audio tracks, {} subtitle tracks",
            self.content, self.media, self.audio, self.subtitles
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_synonyms_collapse() {
        assert_eq!(VideoCodec::normalize(Some("AVC")), VideoCodec::H264);
        assert_eq!(VideoCodec::normalize(Some(" h.265 ")), VideoCodec::H265);
        assert_eq!(VideoCodec::normalize(Some("HEVC")), VideoCodec::H265);
        assert_eq!(VideoCodec::normalize(Some("AV1")), VideoCodec::Av1);
        assert_eq!(VideoCodec::normalize(Some("VP9")), VideoCodec::Unknown);
        assert_eq!(VideoCodec::normalize(None), VideoCodec::Unknown);
    }

    #[test]
    fn upsert_reports_origin() {
        assert!(Upsert::from_changes(1, ()).is_inserted());
        assert!(!Upsert::from_changes(0, ()).is_inserted());
        assert_eq!(Upsert::Existing(7).into_inner(), 7);
    }
}
