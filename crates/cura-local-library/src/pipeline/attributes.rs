use cura_core::{RawTrackKind, classifier::UNKNOWN_PLACEHOLDER, normalize_language};

use crate::{
    error::PipelineError,
    identity::MediaIdentity,
    storage::{AudioAttributes, CatalogEntry, MediaAttributes, SubtitleAttributes, VideoCodec},
    tools::{MediaInfoDocument, MediaInfoTrack},
};

/// Cuadros por segundo que se asumen cuando la duración hubo que recuperarla.
pub const FALLBACK_FRAMERATE: f64 = 25.0;

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Duración en segundos: la del vídeo o, si falta, la del contenedor.
pub fn reported_duration(doc: &MediaInfoDocument) -> Option<f64> {
    positive(doc.video().and_then(|v| v.number("Duration")))
        .or_else(|| positive(doc.general().and_then(|g| g.number("Duration"))))
}

fn reported_framerate(doc: &MediaInfoDocument) -> Option<f64> {
    positive(doc.video().and_then(|v| v.number("FrameRate")))
}

/// Archivos sin metadatos fiables: hace falta preguntar a ffprobe.
pub fn needs_probe(doc: &MediaInfoDocument) -> bool {
    reported_duration(doc).is_none() || reported_framerate(doc).is_none()
}

pub fn media_attributes(
    doc: &MediaInfoDocument,
    identity: &MediaIdentity,
    probed_duration: Option<f64>,
) -> Result<MediaAttributes, PipelineError> {
    let video = doc.video().ok_or(PipelineError::MissingAttribute("video track"))?;
    let general = doc.general();

    let mut duration = reported_duration(doc);
    let mut framerate = reported_framerate(doc);

    if duration.is_none() || framerate.is_none() {
        duration = duration.or(positive(probed_duration));
        framerate = framerate.or(Some(FALLBACK_FRAMERATE));
    }

    let duration = duration.ok_or(PipelineError::MissingAttribute("duration"))?;
    let framerate = framerate.ok_or(PipelineError::MissingAttribute("framerate"))?;

    Ok(MediaAttributes {
        source: identity.source.clone(),
        media_type: identity.media_type,
        codec: VideoCodec::normalize(video.text("Format")),
        duration_seconds: duration.trunc() as i64,
        bitrate_mode: video.text("BitRate_Mode").map(str::to_string),
        width: video.number("Width"),
        height: video.number("Height"),
        framerate_mode: video.text("FrameRate_Mode").map(str::to_string),
        framerate,
        bit_depth: video.number("BitDepth"),
        file_size: general.and_then(|g| g.number("FileSize")),
        file_extension: general.and_then(|g| g.text("FileExtension")).map(str::to_string),
        overall_bitrate: general.and_then(|g| g.number("OverallBitRate")),
    })
}

fn title_and_tag(track: &MediaInfoTrack) -> (String, String) {
    (
        track.text("Title").unwrap_or(UNKNOWN_PLACEHOLDER).to_string(),
        track.text("Language").unwrap_or(UNKNOWN_PLACEHOLDER).to_string(),
    )
}

/// Entrada de catálogo a partir de la inspección del archivo ya reescrito.
pub fn catalog_entry(
    doc: &MediaInfoDocument,
    identity: &MediaIdentity,
    probed_duration: Option<f64>,
) -> Result<CatalogEntry, PipelineError> {
    let media = media_attributes(doc, identity, probed_duration)?;

    let mut audio = Vec::new();
    let mut subtitles = Vec::new();

    for track in doc.tracks() {
        match track.raw_kind() {
            RawTrackKind::Audio => {
                let (title, language_tag) = title_and_tag(track);
                audio.push(AudioAttributes {
                    format: track.text("Format").map(str::to_string),
                    channels: track.number("Channels"),
                    language: normalize_language(&language_tag).0,
                    title,
                    language_tag,
                    is_default: track.flag("Default"),
                });
            }
            RawTrackKind::Text => {
                let (title, language_tag) = title_and_tag(track);
                subtitles.push(SubtitleAttributes {
                    language: normalize_language(&language_tag).0,
                    title,
                    language_tag,
                    is_default: track.flag("Default"),
                    is_forced: track.flag("Forced"),
                });
            }
            _ => {}
        }
    }

    Ok(CatalogEntry {
        content_name: identity.content_name.clone(),
        category: identity.category,
        file_name: identity.file_name.clone(),
        media,
        audio,
        subtitles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::mediainfo::tests::EPISODE_JSON;
    use cura_core::{ContentCategory, Language, MediaType};
    use std::path::Path;

    fn identity() -> MediaIdentity {
        MediaIdentity::derive(
            Path::new("/media/Processing/Anime/Show/Season 01/[Grp] Show - 01.mkv"),
            ContentCategory::Anime,
        )
        .unwrap()
    }

    fn doc(json: &str) -> MediaInfoDocument {
        MediaInfoDocument::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn builds_entry_from_inspection() {
        let doc = doc(EPISODE_JSON);
        assert!(!needs_probe(&doc));

        let entry = catalog_entry(&doc, &identity(), None).unwrap();

        assert_eq!(entry.content_name, "Show");
        assert_eq!(entry.file_name, "[Grp] Show - 01.mkv");
        assert_eq!(entry.media.source, "Grp");
        assert_eq!(entry.media.media_type, MediaType::SeasonEpisode);
        assert_eq!(entry.media.codec, VideoCodec::H265);
        assert_eq!(entry.media.duration_seconds, 1420);
        assert_eq!(entry.media.width, Some(1920));
        assert_eq!(entry.media.bit_depth, Some(10));
        assert_eq!(entry.media.file_size, Some(734_003_200));
        assert_eq!(entry.media.framerate, 23.976);

        assert_eq!(entry.audio.len(), 2);
        assert_eq!(entry.audio[0].language, Language::Japanese);
        assert_eq!(entry.audio[0].language_tag, "ja");
        assert!(entry.audio[0].is_default);
        assert_eq!(entry.audio[1].channels, Some(6));

        assert_eq!(entry.subtitles.len(), 2);
        assert!(entry.subtitles[1].is_forced);
    }

    #[test]
    fn missing_timing_uses_probe_and_fallback_framerate() {
        let doc = doc(r#"{"media": {"track": [
            {"@type": "General"},
            {"@type": "Video", "Format": "AVC"},
            {"@type": "Audio", "Language": "en"}
        ]}}"#);
        assert!(needs_probe(&doc));

        let attrs = media_attributes(&doc, &identity(), Some(61.9)).unwrap();
        assert_eq!(attrs.duration_seconds, 61);
        assert_eq!(attrs.framerate, FALLBACK_FRAMERATE);
        assert_eq!(attrs.codec, VideoCodec::H264);

        let entry = catalog_entry(&doc, &identity(), Some(61.9)).unwrap();
        assert_eq!(entry.audio[0].title, UNKNOWN_PLACEHOLDER);
    }

    #[test]
    fn unrecoverable_duration_is_an_error() {
        let doc = doc(r#"{"media": {"track": [{"@type": "Video", "FrameRate": "24"}]}}"#);
        assert!(matches!(
            media_attributes(&doc, &identity(), None),
            Err(PipelineError::MissingAttribute("duration"))
        ));
    }

    #[test]
    fn no_video_track_is_an_error() {
        let doc = doc(r#"{"media": {"track": [{"@type": "General", "Duration": "100"}]}}"#);
        assert!(matches!(
            media_attributes(&doc, &identity(), Some(100.0)),
            Err(PipelineError::MissingAttribute("video track"))
        ));
    }
}
