use std::{ffi::OsStr, path::Path};

use cura_core::{ContentCategory, MediaType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const UNKNOWN_SOURCE: &str = "Unknown";

static SOURCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\s").unwrap());

/// Carpeta de entrada y la categoría de todo lo que contiene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntakeConfig {
    pub path: PathBuf,
    pub category: ContentCategory,
}

/// Identidad de un archivo, derivada sólo de su ruta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaIdentity {
    pub file_name: String,
    pub source: String,
    pub media_type: MediaType,
    pub content_name: String,
    pub category: ContentCategory,
}

impl MediaIdentity {
    /// `None` si el nombre del archivo no es UTF-8.
    pub fn derive(path: &Path, category: ContentCategory) -> Option<Self> {
        let file_name = path.file_name().and_then(OsStr::to_str)?.to_string();
        let stem = path.file_stem().and_then(OsStr::to_str).unwrap_or(&file_name);

        let parent = path.parent();
        let parent_name = parent
            .and_then(Path::file_name)
            .and_then(OsStr::to_str)
            .unwrap_or_default();

        let media_type = media_type_for(parent_name, category);

        let content_name = if media_type.is_episode() {
            parent
                .and_then(Path::parent)
                .and_then(Path::file_name)
                .and_then(OsStr::to_str)
                .map(str::to_string)
        } else {
            movie_title(stem)
        }
        .unwrap_or_else(|| stem.to_string());

        Some(MediaIdentity {
            source: source_label(&file_name),
            file_name,
            media_type,
            content_name,
            category,
        })
    }
}

/// Texto dentro del `[...]` inicial del nombre, p. ej. el grupo que lo publicó.
pub fn source_label(file_name: &str) -> String {
    SOURCE_REGEX
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

fn media_type_for(parent_name: &str, category: ContentCategory) -> MediaType {
    if parent_name.contains("Season") {
        MediaType::SeasonEpisode
    } else if parent_name.contains("Specials") {
        MediaType::SpecialEpisode
    } else if category == ContentCategory::Anime {
        MediaType::AnimeMovie
    } else {
        MediaType::Movie
    }
}

/// `"[Grp] 2001 - Title"` → `"Title"`.
fn movie_title(stem: &str) -> Option<String> {
    stem.split_once(" - ")
        .map(|(_, title)| title.trim())
        .filter(|title| !title.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_episode_takes_show_folder() {
        let path = Path::new("/media/Processing/Anime/Frieren/Season 01/[SubsPlease] Frieren - 01 (1080p).mkv");
        let id = MediaIdentity::derive(path, ContentCategory::Anime).unwrap();

        assert_eq!(id.source, "SubsPlease");
        assert_eq!(id.media_type, MediaType::SeasonEpisode);
        assert_eq!(id.content_name, "Frieren");
        assert_eq!(id.file_name, "[SubsPlease] Frieren - 01 (1080p).mkv");
    }

    #[test]
    fn specials_are_episodes_too() {
        let path = Path::new("/media/Processing/TV/The Office/Specials/The Office - S00E01.mkv");
        let id = MediaIdentity::derive(path, ContentCategory::General).unwrap();

        assert_eq!(id.media_type, MediaType::SpecialEpisode);
        assert_eq!(id.content_name, "The Office");
        assert_eq!(id.source, UNKNOWN_SOURCE);
    }

    #[test]
    fn movie_name_comes_from_file_name() {
        let path = Path::new("/media/Processing/Movies/[BluRay] 2019 - Parasite.mkv");

        let general = MediaIdentity::derive(path, ContentCategory::General).unwrap();
        assert_eq!(general.media_type, MediaType::Movie);
        assert_eq!(general.content_name, "Parasite");

        let anime = MediaIdentity::derive(path, ContentCategory::Anime).unwrap();
        assert_eq!(anime.media_type, MediaType::AnimeMovie);
    }

    #[test]
    fn movie_without_separator_falls_back_to_stem() {
        let path = Path::new("/media/Processing/Movies/Heat.mkv");
        let id = MediaIdentity::derive(path, ContentCategory::General).unwrap();
        assert_eq!(id.content_name, "Heat");
    }

    #[test]
    fn source_requires_leading_bracket_and_space() {
        assert_eq!(source_label("[Erai-raws] Show - 01.mkv"), "Erai-raws");
        assert_eq!(source_label("Show [1080p].mkv"), UNKNOWN_SOURCE);
        assert_eq!(source_label("[NoSpace]Show.mkv"), UNKNOWN_SOURCE);
    }
}
