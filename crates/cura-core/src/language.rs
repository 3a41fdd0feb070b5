use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Código ISO 639-2 para idiomas sin resolver.
pub const UNDETERMINED_CODE: &str = "und";

/// Idiomas canónicos que la biblioteca sabe reconocer.
///
/// `Unknown` es el centinela para cualquier etiqueta fuera de la tabla de
/// alias. No confundir con el descarte de una pista: eso lo decide la
/// política, nunca el normalizador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Portuguese,
    Japanese,
    Chinese,
    Spanish,
    French,
    German,
    Italian,
    Korean,
    Russian,
    Unknown,
}

impl Language {
    /// Todos los idiomas conocidos (sin `Unknown`).
    pub const KNOWN: &'static [Language] = &[
        Language::English,
        Language::Portuguese,
        Language::Japanese,
        Language::Chinese,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Korean,
        Language::Russian,
    ];

    /// Nombre canónico en minúsculas, tal como se guarda en el catálogo.
    pub fn name(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Portuguese => "portuguese",
            Language::Japanese => "japanese",
            Language::Chinese => "chinese",
            Language::Spanish => "spanish",
            Language::French => "french",
            Language::German => "german",
            Language::Italian => "italian",
            Language::Korean => "korean",
            Language::Russian => "russian",
            Language::Unknown => "unknown",
        }
    }

    /// Nombre para mostrar; es el título que recibe la pista.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Portuguese => "Portuguese",
            Language::Japanese => "Japanese",
            Language::Chinese => "Chinese",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Korean => "Korean",
            Language::Russian => "Russian",
            Language::Unknown => "Unknown",
        }
    }

    /// Código ISO 639-2/B (el que guarda Matroska).
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "eng",
            Language::Portuguese => "por",
            Language::Japanese => "jpn",
            Language::Chinese => "chi",
            Language::Spanish => "spa",
            Language::French => "fre",
            Language::German => "ger",
            Language::Italian => "ita",
            Language::Korean => "kor",
            Language::Russian => "rus",
            Language::Unknown => UNDETERMINED_CODE,
        }
    }

    pub fn is_known(self) -> bool {
        self != Language::Unknown
    }

    /// Resuelve una etiqueta arbitraria (locale, ISO 639-1/2, nombre nativo o
    /// errata habitual). Nunca falla: lo que no está en la tabla es `Unknown`.
    pub fn from_alias(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace('_', "-");

        match normalized.as_str() {
            "english" | "ingles" | "inglês" | "inglés" | "ingles-us" | "en" | "eng" | "en-us" | "en-gb"
            | "en-au" | "en-ca" | "englsh" | "enlish" | "anglais" | "englisch" => Language::English,

            "portuguese" | "portugues" | "português" | "portugués" | "portugese" | "pt" | "pt-br" | "pt-pt"
            | "ptbr" | "br" | "por" | "portugues-br" | "brazilian portuguese" | "portuguese (brazil)" => {
                Language::Portuguese
            }

            "japanese" | "japones" | "japonês" | "japonés" | "japanse" | "jp" | "ja" | "jpn" | "ja-jp"
            | "日本語" => Language::Japanese,

            "chinese" | "chinese (mainland china)" | "chines" | "chinês" | "zh" | "zho" | "chi" | "zh-cn"
            | "zh-tw" | "zh-hk" | "zh-hans" | "zh-hant" | "mandarin" | "cmn" | "cantonese" | "yue" | "中文" => {
                Language::Chinese
            }

            "spanish" | "espanol" | "español" | "espanhol" | "castellano" | "latino" | "es" | "spa"
            | "es-es" | "es-mx" | "es-419" => Language::Spanish,

            "french" | "francais" | "français" | "frances" | "francês" | "fr" | "fre" | "fra" | "fr-fr"
            | "fr-ca" => Language::French,

            "german" | "deutsch" | "alemao" | "alemão" | "aleman" | "alemán" | "de" | "ger" | "deu"
            | "de-de" => Language::German,

            "italian" | "italiano" | "it" | "ita" | "it-it" => Language::Italian,

            "korean" | "coreano" | "ko" | "kor" | "ko-kr" | "한국어" => Language::Korean,

            "russian" | "russo" | "ruso" | "ru" | "rus" | "ru-ru" | "русский" => Language::Russian,

            _ => Language::Unknown,
        }
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Language::from_alias(s))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normaliza una etiqueta de idioma a `(idioma canónico, código de 3 letras)`.
pub fn normalize_language(raw_tag: &str) -> (Language, &'static str) {
    let language = Language::from_alias(raw_tag);
    (language, language.code())
}
