use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Categoría de contenido; decide la tabla de idiomas permitidos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Anime,
    #[default]
    General,
}

impl ContentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentCategory::Anime => "anime",
            ContentCategory::General => "general",
        }
    }
}

impl FromStr for ContentCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anime" => Ok(ContentCategory::Anime),
            "general" | "movie" | "tv show" | "show" => Ok(ContentCategory::General),
            _ => Err(ParseError::Category(s.to_string())),
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de medio de un archivo físico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    SeasonEpisode,
    SpecialEpisode,
    AnimeMovie,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Movie => "Movie",
            MediaType::SeasonEpisode => "Season Episode",
            MediaType::SpecialEpisode => "Special Episode",
            MediaType::AnimeMovie => "Anime Movie",
        }
    }

    pub fn is_episode(self) -> bool {
        matches!(self, MediaType::SeasonEpisode | MediaType::SpecialEpisode)
    }
}

impl FromStr for MediaType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();

        match normalized.as_str() {
            "movie" => Ok(MediaType::Movie),
            "seasonepisode" => Ok(MediaType::SeasonEpisode),
            "specialepisode" => Ok(MediaType::SpecialEpisode),
            "animemovie" => Ok(MediaType::AnimeMovie),
            _ => Err(ParseError::MediaType(s.to_string())),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_parses_its_own_labels() {
        for ty in [
            MediaType::Movie,
            MediaType::SeasonEpisode,
            MediaType::SpecialEpisode,
            MediaType::AnimeMovie,
        ] {
            assert_eq!(ty.as_str().parse::<MediaType>().unwrap(), ty);
        }
        assert!("trailer".parse::<MediaType>().is_err());
    }

    #[test]
    fn category_accepts_legacy_labels() {
        assert_eq!("Anime".parse::<ContentCategory>().unwrap(), ContentCategory::Anime);
        assert_eq!("TV Show".parse::<ContentCategory>().unwrap(), ContentCategory::General);
        assert!("cartoon".parse::<ContentCategory>().is_err());
    }
}
