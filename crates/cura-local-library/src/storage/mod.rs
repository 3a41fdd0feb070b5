mod embedded;
pub mod models;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use cura_core::ContentCategory;
use cura_paths::CuraPaths;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, info, instrument, trace};

use embedded::migrations::runner;

use crate::error::StorageError;
pub use models::{
    AudioAttributes, AudioRecord, CatalogCounts, CatalogEntry, CatalogReport, ContentId, ContentRecord,
    MediaAttributes, MediaId, MediaRecord, SubtitleAttributes, SubtitleRecord, Upsert, VideoCodec,
};

pub const DEFAULT_SCHEMA: &str = "library";

/// Backends de base de datos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// `<directory>/<schema>.db`; sin directorio, el de datos del usuario.
    Sqlite {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directory: Option<PathBuf>,
    },
    Memory,
}

impl Default for DatabaseBackend {
    fn default() -> Self {
        DatabaseBackend::Sqlite { directory: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStorageConfig {
    pub backend: DatabaseBackend,
    /// Nombre del catálogo; separa p. ej. `dev` de `prod`.
    pub schema: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        LocalStorageConfig {
            backend: DatabaseBackend::default(),
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl LocalStorageConfig {
    pub fn memory() -> Self {
        LocalStorageConfig {
            backend: DatabaseBackend::Memory,
            ..Default::default()
        }
    }

    /// Ruta del fichero de catálogo, `None` para el backend en memoria.
    pub fn database_path(&self) -> Result<Option<PathBuf>, StorageError> {
        match &self.backend {
            DatabaseBackend::Memory => Ok(None),
            DatabaseBackend::Sqlite { directory: Some(dir) } => {
                Ok(Some(dir.join(CuraPaths::catalog_file_name(&self.schema)?)))
            }
            DatabaseBackend::Sqlite { directory: None } => Ok(Some(CuraPaths::new()?.catalog_path(&self.schema)?)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStorage {
    pub fn new(config: &LocalStorageConfig) -> Result<Self, StorageError> {
        let mut conn = match config.database_path()? {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(cura_paths::Error::from)?;
                }
                info!("Abriendo conexión con la base de datos en {}", path.display());
                Connection::open(path)?
            }
            None => {
                info!("Abriendo base de datos en memoria");
                Connection::open_in_memory()?
            }
        };

        Self::initialize_connection(&mut conn)?;

        Ok(LocalStorage {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::new(&LocalStorageConfig::memory())
    }

    fn initialize_connection(conn: &mut Connection) -> Result<(), StorageError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let journal: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        trace!(%journal, "journal_mode");
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;

        info!("Ejecutando migraciones de la base de datos...");

        let report = runner().run(conn)?;
        for migration in report.applied_migrations() {
            trace!("Migración aplicada: {:?}", migration);
        }

        info!("Migraciones completadas exitosamente.");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl LocalStorage {
    pub fn upsert_content(&self, name: &str, category: ContentCategory) -> Result<Upsert<ContentRecord>, StorageError> {
        let conn = self.lock()?;
        queries::upsert_content(&conn, name, category)
    }

    pub fn upsert_media(
        &self,
        content_id: ContentId,
        file_name: &str,
        attributes: &MediaAttributes,
    ) -> Result<Upsert<MediaRecord>, StorageError> {
        let conn = self.lock()?;
        queries::upsert_media(&conn, content_id, file_name, attributes)
    }

    pub fn upsert_audio(&self, media_id: MediaId, attributes: &AudioAttributes) -> Result<Upsert<AudioRecord>, StorageError> {
        let conn = self.lock()?;
        queries::upsert_audio(&conn, media_id, attributes)
    }

    pub fn upsert_subtitle(
        &self,
        media_id: MediaId,
        attributes: &SubtitleAttributes,
    ) -> Result<Upsert<SubtitleRecord>, StorageError> {
        let conn = self.lock()?;
        queries::upsert_subtitle(&conn, media_id, attributes)
    }

    /// Contenido, medio y pistas de un archivo en una sola transacción.
    #[instrument(level = Level::INFO, skip(self, entry), fields(file = %entry.file_name))]
    pub fn catalog_file(&self, entry: &CatalogEntry) -> Result<CatalogReport, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let content = queries::upsert_content(&tx, &entry.content_name, entry.category)?;
        let media = queries::upsert_media(&tx, content.record().id, &entry.file_name, &entry.media)?;
        let media_id = media.record().id;

        let mut audio_inserted = 0;
        for audio in &entry.audio {
            if queries::upsert_audio(&tx, media_id, audio)?.is_inserted() {
                audio_inserted += 1;
            }
        }

        let mut subtitles_inserted = 0;
        for subtitle in &entry.subtitles {
            if queries::upsert_subtitle(&tx, media_id, subtitle)?.is_inserted() {
                subtitles_inserted += 1;
            }
        }

        tx.commit()?;

        debug!(
            content_new = content.is_inserted(),
            media_new = media.is_inserted(),
            audio_inserted,
            subtitles_inserted,
            "archivo catalogado"
        );

        Ok(CatalogReport {
            content,
            media,
            audio_inserted,
            subtitles_inserted,
        })
    }
}

impl LocalStorage {
    pub fn is_cataloged(&self, file_name: &str) -> Result<bool, StorageError> {
        Ok(self.find_media(file_name)?.is_some())
    }

    pub fn find_content(&self, name: &str) -> Result<Option<ContentRecord>, StorageError> {
        let conn = self.lock()?;
        queries::find_content(&conn, name)
    }

    pub fn find_media(&self, file_name: &str) -> Result<Option<MediaRecord>, StorageError> {
        let conn = self.lock()?;
        queries::find_media(&conn, file_name)
    }

    pub fn audio_for_media(&self, media_id: MediaId) -> Result<Vec<AudioRecord>, StorageError> {
        let conn = self.lock()?;
        queries::audio_for_media(&conn, media_id)
    }

    pub fn subtitles_for_media(&self, media_id: MediaId) -> Result<Vec<SubtitleRecord>, StorageError> {
        let conn = self.lock()?;
        queries::subtitles_for_media(&conn, media_id)
    }

    pub fn counts(&self) -> Result<CatalogCounts, StorageError> {
        let conn = self.lock()?;
        queries::counts(&conn)
    }
}

mod queries {
    use std::str::FromStr;

    use cura_core::{Language, MediaType};
    use rusqlite::{OptionalExtension, Row, params, types::Type};

    use super::*;

    const MEDIA_COLUMNS: &str = "id, content_id, name, source, media_type, codec, duration_seconds, bitrate_mode, \
         width, height, framerate_mode, framerate, bit_depth, file_size, file_extension, overall_bitrate, created_at";

    fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw: String = row.get(idx)?;
        raw.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn language_column(row: &Row, idx: usize) -> rusqlite::Result<Language> {
        Ok(Language::from_alias(&row.get::<_, String>(idx)?))
    }

    fn content_from_row(row: &Row) -> rusqlite::Result<ContentRecord> {
        Ok(ContentRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            category: parse_column(row, 2)?,
            created_at: row.get(3)?,
        })
    }

    fn media_from_row(row: &Row) -> rusqlite::Result<MediaRecord> {
        Ok(MediaRecord {
            id: row.get(0)?,
            content_id: row.get(1)?,
            name: row.get(2)?,
            attributes: MediaAttributes {
                source: row.get(3)?,
                media_type: parse_column::<MediaType>(row, 4)?,
                codec: VideoCodec::normalize(row.get::<_, Option<String>>(5)?.as_deref()),
                duration_seconds: row.get(6)?,
                bitrate_mode: row.get(7)?,
                width: row.get(8)?,
                height: row.get(9)?,
                framerate_mode: row.get(10)?,
                framerate: row.get(11)?,
                bit_depth: row.get(12)?,
                file_size: row.get(13)?,
                file_extension: row.get(14)?,
                overall_bitrate: row.get(15)?,
            },
            created_at: row.get(16)?,
        })
    }

    fn audio_from_row(row: &Row) -> rusqlite::Result<AudioRecord> {
        Ok(AudioRecord {
            id: row.get(0)?,
            media_id: row.get(1)?,
            attributes: AudioAttributes {
                format: row.get(2)?,
                channels: row.get(3)?,
                title: row.get(4)?,
                language_tag: row.get(5)?,
                language: language_column(row, 6)?,
                is_default: row.get(7)?,
            },
            created_at: row.get(8)?,
        })
    }

    fn subtitle_from_row(row: &Row) -> rusqlite::Result<SubtitleRecord> {
        Ok(SubtitleRecord {
            id: row.get(0)?,
            media_id: row.get(1)?,
            attributes: SubtitleAttributes {
                title: row.get(2)?,
                language_tag: row.get(3)?,
                language: language_column(row, 4)?,
                is_default: row.get(5)?,
                is_forced: row.get(6)?,
            },
            created_at: row.get(7)?,
        })
    }

    pub fn find_content(conn: &Connection, name: &str) -> Result<Option<ContentRecord>, StorageError> {
        let record = conn
            .query_row(
                "SELECT id, name, category, created_at FROM content WHERE name = ?1",
                [name],
                content_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn upsert_content(
        conn: &Connection,
        name: &str,
        category: ContentCategory,
    ) -> Result<Upsert<ContentRecord>, StorageError> {
        let changes = conn.execute(
            "INSERT INTO content (name, category) VALUES (?1, ?2) ON CONFLICT (name) DO NOTHING",
            params![name, category.as_str()],
        )?;

        let record = find_content(conn, name)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(Upsert::from_changes(changes, record))
    }

    pub fn find_media(conn: &Connection, file_name: &str) -> Result<Option<MediaRecord>, StorageError> {
        let record = conn
            .query_row(
                &format!("SELECT {MEDIA_COLUMNS} FROM media WHERE name = ?1"),
                [file_name],
                media_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn upsert_media(
        conn: &Connection,
        content_id: ContentId,
        file_name: &str,
        attrs: &MediaAttributes,
    ) -> Result<Upsert<MediaRecord>, StorageError> {
        let changes = conn.execute(
            "INSERT INTO media (content_id, name, source, media_type, codec, duration_seconds, bitrate_mode, width, \
             height, framerate_mode, framerate, bit_depth, file_size, file_extension, overall_bitrate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT (name) DO NOTHING",
            params![
                content_id,
                file_name,
                attrs.source,
                attrs.media_type.as_str(),
                attrs.codec.as_str(),
                attrs.duration_seconds,
                attrs.bitrate_mode,
                attrs.width,
                attrs.height,
                attrs.framerate_mode,
                attrs.framerate,
                attrs.bit_depth,
                attrs.file_size,
                attrs.file_extension,
                attrs.overall_bitrate,
            ],
        )?;

        let record = find_media(conn, file_name)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(Upsert::from_changes(changes, record))
    }

    pub fn upsert_audio(conn: &Connection, media_id: MediaId, attrs: &AudioAttributes) -> Result<Upsert<AudioRecord>, StorageError> {
        let changes = conn.execute(
            "INSERT INTO audio (media_id, format, channels, title, language_tag, language, is_default)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (media_id, title, language_tag) DO NOTHING",
            params![
                media_id,
                attrs.format,
                attrs.channels,
                attrs.title,
                attrs.language_tag,
                attrs.language.name(),
                attrs.is_default,
            ],
        )?;

        let record = conn.query_row(
            "SELECT id, media_id, format, channels, title, language_tag, language, is_default, created_at
               FROM audio
              WHERE media_id = ?1 AND title = ?2 AND language_tag = ?3",
            params![media_id, attrs.title, attrs.language_tag],
            audio_from_row,
        )?;
        Ok(Upsert::from_changes(changes, record))
    }

    pub fn upsert_subtitle(
        conn: &Connection,
        media_id: MediaId,
        attrs: &SubtitleAttributes,
    ) -> Result<Upsert<SubtitleRecord>, StorageError> {
        let changes = conn.execute(
            "INSERT INTO subtitle (media_id, title, language_tag, language, is_default, is_forced)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (media_id, title, language_tag) DO NOTHING",
            params![
                media_id,
                attrs.title,
                attrs.language_tag,
                attrs.language.name(),
                attrs.is_default,
                attrs.is_forced,
            ],
        )?;

        let record = conn.query_row(
            "SELECT id, media_id, title, language_tag, language, is_default, is_forced, created_at
               FROM subtitle
              WHERE media_id = ?1 AND title = ?2 AND language_tag = ?3",
            params![media_id, attrs.title, attrs.language_tag],
            subtitle_from_row,
        )?;
        Ok(Upsert::from_changes(changes, record))
    }

    pub fn audio_for_media(conn: &Connection, media_id: MediaId) -> Result<Vec<AudioRecord>, StorageError> {
        let mut stmt = conn.prepare(
            "SELECT id, media_id, format, channels, title, language_tag, language, is_default, created_at
               FROM audio WHERE media_id = ?1 ORDER BY id",
        )?;
        let records = stmt
            .query_map([media_id], audio_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn subtitles_for_media(conn: &Connection, media_id: MediaId) -> Result<Vec<SubtitleRecord>, StorageError> {
        let mut stmt = conn.prepare(
            "SELECT id, media_id, title, language_tag, language, is_default, is_forced, created_at
               FROM subtitle WHERE media_id = ?1 ORDER BY id",
        )?;
        let records = stmt
            .query_map([media_id], subtitle_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn counts(conn: &Connection) -> Result<CatalogCounts, StorageError> {
        let counts = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM content),
                    (SELECT COUNT(*) FROM media),
                    (SELECT COUNT(*) FROM audio),
                    (SELECT COUNT(*) FROM subtitle)",
            [],
            |row| {
                Ok(CatalogCounts {
                    content: row.get(0)?,
                    media: row.get(1)?,
                    audio: row.get(2)?,
                    subtitles: row.get(3)?,
                })
            },
        )?;
        Ok(counts)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cura_core::{Language, MediaType};
    use tempfile::tempdir;

    pub(crate) fn media_attributes() -> MediaAttributes {
        MediaAttributes {
            source: "SubsPlease".into(),
            media_type: MediaType::SeasonEpisode,
            codec: VideoCodec::H265,
            duration_seconds: 1420,
            bitrate_mode: Some("VBR".into()),
            width: Some(1920),
            height: Some(1080),
            framerate_mode: Some("CFR".into()),
            framerate: 23.976,
            bit_depth: Some(10),
            file_size: Some(734_003_200),
            file_extension: Some("mkv".into()),
            overall_bitrate: Some(4_134_000),
        }
    }

    fn entry(file_name: &str) -> CatalogEntry {
        CatalogEntry {
            content_name: "Frieren".into(),
            category: ContentCategory::Anime,
            file_name: file_name.into(),
            media: media_attributes(),
            audio: vec![AudioAttributes {
                format: Some("AAC".into()),
                channels: Some(2),
                title: "Japanese".into(),
                language_tag: "jpn".into(),
                language: Language::Japanese,
                is_default: true,
            }],
            subtitles: vec![SubtitleAttributes {
                title: "English (Forced)".into(),
                language_tag: "eng".into(),
                language: Language::English,
                is_default: false,
                is_forced: true,
            }],
        }
    }

    #[test]
    fn catalog_file_is_idempotent() {
        let storage = LocalStorage::in_memory().unwrap();

        let first = storage.catalog_file(&entry("ep01.mkv")).unwrap();
        assert!(first.content.is_inserted());
        assert!(first.media.is_inserted());
        assert_eq!((first.audio_inserted, first.subtitles_inserted), (1, 1));

        let second = storage.catalog_file(&entry("ep01.mkv")).unwrap();
        assert!(!second.content.is_inserted());
        assert!(!second.media.is_inserted());
        assert_eq!((second.audio_inserted, second.subtitles_inserted), (0, 0));
        assert_eq!(second.media.record().id, first.media.record().id);

        let counts = storage.counts().unwrap();
        assert_eq!(
            counts,
            CatalogCounts {
                content: 1,
                media: 1,
                audio: 1,
                subtitles: 1
            }
        );
    }

    #[test]
    fn episodes_share_content() {
        let storage = LocalStorage::in_memory().unwrap();
        storage.catalog_file(&entry("ep01.mkv")).unwrap();
        let report = storage.catalog_file(&entry("ep02.mkv")).unwrap();

        assert!(!report.content.is_inserted());
        assert!(report.media.is_inserted());
        assert_eq!(storage.counts().unwrap().media, 2);
    }

    #[test]
    fn records_round_trip_through_sqlite() {
        let storage = LocalStorage::in_memory().unwrap();
        storage.catalog_file(&entry("ep01.mkv")).unwrap();

        assert!(storage.is_cataloged("ep01.mkv").unwrap());
        assert!(!storage.is_cataloged("ep02.mkv").unwrap());

        let content = storage.find_content("Frieren").unwrap().unwrap();
        assert_eq!(content.category, ContentCategory::Anime);

        let media = storage.find_media("ep01.mkv").unwrap().unwrap();
        assert_eq!(media.content_id, content.id);
        assert_eq!(media.attributes, media_attributes());

        let audio = storage.audio_for_media(media.id).unwrap();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].attributes.language, Language::Japanese);
        assert!(audio[0].attributes.is_default);

        let subs = storage.subtitles_for_media(media.id).unwrap();
        assert!(subs[0].attributes.is_forced);
        assert_eq!(subs[0].attributes.title, "English (Forced)");
    }

    #[test]
    fn same_title_different_tag_is_a_new_track() {
        let storage = LocalStorage::in_memory().unwrap();
        let media_id = storage.catalog_file(&entry("ep01.mkv")).unwrap().media.record().id;

        let mut other = entry("ep01.mkv").audio.remove(0);
        other.language_tag = "ja".into();

        assert!(storage.upsert_audio(media_id, &other).unwrap().is_inserted());
        assert!(!storage.upsert_audio(media_id, &other).unwrap().is_inserted());
        assert_eq!(storage.audio_for_media(media_id).unwrap().len(), 2);
    }

    #[test]
    fn schema_selects_the_database_file() {
        let tmp = tempdir().unwrap();
        let config = |schema: &str| LocalStorageConfig {
            backend: DatabaseBackend::Sqlite {
                directory: Some(tmp.path().to_path_buf()),
            },
            schema: schema.into(),
        };

        let dev = LocalStorage::new(&config("dev")).unwrap();
        dev.catalog_file(&entry("ep01.mkv")).unwrap();
        drop(dev);

        let prod = LocalStorage::new(&config("prod")).unwrap();
        assert!(!prod.is_cataloged("ep01.mkv").unwrap());
        assert!(tmp.path().join("dev.db").exists());
        assert!(tmp.path().join("prod.db").exists());

        let reopened = LocalStorage::new(&config("dev")).unwrap();
        assert!(reopened.is_cataloged("ep01.mkv").unwrap());

        assert!(matches!(
            LocalStorage::new(&config("../escape")),
            Err(StorageError::Paths(cura_paths::Error::InvalidSchema(_)))
        ));
    }
}
