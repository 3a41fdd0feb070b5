use std::{env, fs::File, path::PathBuf};

use directories::ProjectDirs;

use crate::{errors::Error, fs_utils};

/// Nombre de la ENV var para override de ruta base (modo “portable”)
const ENV_BASE_DIR: &str = "CURA_BASE_DIR";

/// Extensión de los ficheros de catálogo
const CATALOG_EXT: &str = "db";

/// Rutas y ficheros que usa cura
#[derive(Debug, Clone)]
pub struct CuraPaths {
    // config_dir
    pub config_dir: PathBuf,
    pub config_file: PathBuf,

    // data_dir
    pub data_dir: PathBuf,
    pub catalogs_dir: PathBuf,
    pub logs_dir: PathBuf,

    // lock_file
    pub lock_file: PathBuf,
}

impl CuraPaths {
    pub fn new() -> Result<Self, Error> {
        let (config_dir, data_dir) = if let Ok(base) = env::var(ENV_BASE_DIR) {
            let b = PathBuf::from(base);
            (b.join("config"), b.join("data"))
        } else {
            let proj = ProjectDirs::from("org", "Cura", "cura").ok_or(Error::NoHome)?;
            (proj.config_dir().to_path_buf(), proj.data_dir().to_path_buf())
        };

        let paths = CuraPaths {
            config_dir: config_dir.clone(),
            config_file: config_dir.join("cura.toml"),

            data_dir: data_dir.clone(),
            catalogs_dir: data_dir.join("catalogs"),
            logs_dir: data_dir.join("logs"),

            lock_file: data_dir.join("cura.lock"),
        };

        paths.ensure_structure()?;
        paths.validate_structure()?;

        Ok(paths)
    }

    /// Devuelve true si nunca se tomó el lock (primer arranque)
    pub fn is_first_run(&self) -> bool {
        !self.lock_file.exists()
    }

    /// Toma el lock de proceso; falla con `Error::Locked` si otro `cura` corre.
    /// Mantén vivo el File retornado para conservar el lock.
    pub fn lock(&self) -> Result<File, Error> {
        fs_utils::try_lock_file(&self.lock_file)
    }
}

impl CuraPaths {
    /// Nombre del fichero de un catálogo: `<schema>.db`.
    pub fn catalog_file_name(schema: &str) -> Result<String, Error> {
        let valid = !schema.is_empty()
            && schema
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(Error::InvalidSchema(schema.to_string()));
        }

        Ok(format!("{schema}.{CATALOG_EXT}"))
    }

    /// Ruta completa del catálogo `schema` dentro de `catalogs_dir`.
    pub fn catalog_path(&self, schema: &str) -> Result<PathBuf, Error> {
        Ok(self.catalogs_dir.join(Self::catalog_file_name(schema)?))
    }
}

impl CuraPaths {
    /// Se asegura de que todos los dirs básicos existen.
    pub fn ensure_structure(&self) -> Result<(), Error> {
        fs_utils::ensure_dir(&self.config_dir)?;
        fs_utils::ensure_dir(&self.data_dir)?;
        fs_utils::ensure_dir(&self.catalogs_dir)?;
        fs_utils::ensure_dir(&self.logs_dir)?;

        Ok(())
    }

    /// Valida que cada ruta existe Y es escribible. Si falta, la intenta crear.
    pub fn validate_structure(&self) -> Result<(), Error> {
        let all_paths = [&self.config_dir, &self.data_dir, &self.catalogs_dir, &self.logs_dir];

        for dir in all_paths {
            if !dir.exists() {
                fs_utils::ensure_dir(dir)?;
            }
            fs_utils::check_writable(dir)?;
        }

        Ok(())
    }
}
