use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, ffi::OsStr, fmt, path::Path, str::FromStr, time::Duration};

use crate::error::ConfigError;

/// Umbrales por contenedor: por debajo de ellos el archivo no se procesa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtensionConfig {
    pub min_file_size: ByteSize,
    #[serde(with = "humantime_serde")]
    pub min_duration: Duration,
}

impl ExtensionConfig {
    pub const fn new(min_file_size: ByteSize, min_duration: Duration) -> Self {
        ExtensionConfig {
            min_file_size,
            min_duration,
        }
    }

    /// Mínimos comunes a todos los contenedores.
    pub const VIDEO: ExtensionConfig = ExtensionConfig::new(ByteSize::mib(1), Duration::from_secs(30));

    pub fn validate(&self, ext: SupportedExtension) -> Result<(), ConfigError> {
        let problem = if self.min_file_size.as_u64() == 0 {
            "min_file_size"
        } else if self.min_duration.is_zero() {
            "min_duration"
        } else {
            return Ok(());
        };

        Err(ConfigError::Invalid(format!(
            "extension_config.{ext}.{problem} must be greater than zero"
        )))
    }
}

/// Contenedores de vídeo que reconoce el escaneo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SupportedExtension {
    Mkv,
    Mp4,
}

impl SupportedExtension {
    pub const ALL: &'static [SupportedExtension] = &[SupportedExtension::Mkv, SupportedExtension::Mp4];

    pub fn as_str(self) -> &'static str {
        match self {
            SupportedExtension::Mkv => "mkv",
            SupportedExtension::Mp4 => "mp4",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(OsStr::to_str)?.parse().ok()
    }

    pub fn config(self) -> &'static ExtensionConfig {
        &ExtensionConfig::VIDEO
    }

    /// Sólo Matroska admite edición de pistas en el sitio.
    pub fn is_rewritable(self) -> bool {
        self == SupportedExtension::Mkv
    }
}

pub fn default_extension_config() -> HashMap<SupportedExtension, ExtensionConfig> {
    SupportedExtension::ALL
        .iter()
        .map(|&ext| (ext, ext.config().clone()))
        .collect()
}

impl FromStr for SupportedExtension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mkv" => Ok(SupportedExtension::Mkv),
            "mp4" => Ok(SupportedExtension::Mp4),
            _ => Err(format!("unsupported container extension `{s}`")),
        }
    }
}

impl fmt::Display for SupportedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_containers_by_path() {
        assert_eq!(
            SupportedExtension::from_path(Path::new("/m/Show - 01.MKV")),
            Some(SupportedExtension::Mkv)
        );
        assert_eq!(SupportedExtension::from_path(Path::new("a.mp4")), Some(SupportedExtension::Mp4));
        assert_eq!(SupportedExtension::from_path(Path::new("a.avi")), None);
        assert_eq!(SupportedExtension::from_path(Path::new("mkv")), None);
    }

    #[test]
    fn only_matroska_is_rewritable() {
        assert!(SupportedExtension::Mkv.is_rewritable());
        assert!(!SupportedExtension::Mp4.is_rewritable());
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        for (ext, cfg) in default_extension_config() {
            cfg.validate(ext).unwrap();
        }

        let zero = ExtensionConfig::new(ByteSize::b(0), Duration::from_secs(1));
        let err = zero.validate(SupportedExtension::Mp4).unwrap_err();
        assert!(err.to_string().contains("extension_config.mp4.min_file_size"));
    }
}
