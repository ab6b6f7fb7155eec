//! SQLite store with vector search via `sqlite-vec`.

use std::mem::transmute;
use std::os::raw::c_char;
use std::sync::Once;

use async_trait::async_trait;
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::{Connection, ffi};
use tracing::debug;

use crate::config::StoreConfig;
use crate::types::DocloomError;

use super::{ChunkRecord, VectorStore};

/// Vector store persisted in a single SQLite database file.
///
/// The collection name becomes a table pair: `{collection}` for chunk rows
/// and `{collection}_embeddings` for their vectors, created on open when
/// absent. Cosine distance is evaluated by the `sqlite-vec` extension.
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Connection,
    collection: String,
    target: String,
}

impl SqliteVectorStore {
    /// Opens (or creates) the database at `config.connection_target` and
    /// ensures the collection's tables exist.
    ///
    /// An unreachable or unwritable target surfaces as
    /// [`DocloomError::Connectivity`] before any row is written.
    pub async fn open(config: &StoreConfig) -> Result<Self, DocloomError> {
        let collection = validate_collection_name(&config.collection_name)?;
        register_sqlite_vec()?;

        let target = config.connection_target.clone();
        let conn = Connection::open(&target)
            .await
            .map_err(|err| DocloomError::Connectivity {
                target: target.clone(),
                reason: err.to_string(),
            })?;

        let store = Self {
            conn,
            collection,
            target,
        };
        store.ping().await?;
        store.ensure_schema().await?;
        Ok(store)
    }

    /// The collection this handle reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_schema(&self) -> Result<(), DocloomError> {
        let chunks = self.collection.clone();
        let embeddings = self.embeddings_table();
        self.conn
            .call(move |conn| {
                conn.execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS {chunks} (
                         id TEXT PRIMARY KEY,
                         source TEXT NOT NULL,
                         chunk_index INTEGER NOT NULL,
                         start_index INTEGER NOT NULL,
                         content TEXT NOT NULL,
                         metadata TEXT NOT NULL
                     );
                     CREATE INDEX IF NOT EXISTS {chunks}_source_idx
                         ON {chunks}(source);
                     CREATE TABLE IF NOT EXISTS {embeddings} (
                         id TEXT PRIMARY KEY,
                         embedding BLOB
                     );"
                ))
                ?;
                Ok(())
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| DocloomError::Storage(err.to_string()))
    }

    fn embeddings_table(&self) -> String {
        format!("{}_embeddings", self.collection)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn ping(&self) -> Result<(), DocloomError> {
        let target = self.target.clone();
        self.conn
            .call(|conn| {
                conn.query_row("SELECT vec_version()", [], |row| row.get::<_, String>(0))
                    ?;
                Ok(())
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| DocloomError::Connectivity {
                target,
                reason: err.to_string(),
            })
    }

    async fn insert_chunks(&self, records: Vec<ChunkRecord>) -> Result<(), DocloomError> {
        if records.is_empty() {
            return Ok(());
        }
        let chunks = self.collection.clone();
        let embeddings = self.embeddings_table();
        let inserted = records.len();

        // Pre-encode vectors so the database closure deals only in SQL.
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let encoded = match record.embedding.as_ref() {
                Some(vector) => Some(
                    serde_json::to_string(vector)
                        .map_err(|err| DocloomError::Storage(err.to_string()))?,
                ),
                None => None,
            };
            rows.push((record, encoded));
        }

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (record, encoded) in rows {
                    tx.execute(
                        &format!(
                            "INSERT INTO {chunks}
                                 (id, source, chunk_index, start_index, content, metadata)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                        ),
                        (
                            &record.id,
                            &record.source,
                            record.chunk_index as i64,
                            record.start_index as i64,
                            &record.content,
                            record.metadata.to_string(),
                        ),
                    )
                    ?;

                    if let Some(encoded) = encoded {
                        tx.execute(
                            &format!(
                                "INSERT INTO {embeddings} (id, embedding)
                                 VALUES (?1, vec_f32(?2))"
                            ),
                            (&record.id, &encoded),
                        )
                        ?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| DocloomError::Storage(err.to_string()))?;

        debug!(inserted, collection = %self.collection, "sqlite store insert");
        Ok(())
    }

    async fn get_chunks_by_source(&self, source: &str) -> Result<Vec<ChunkRecord>, DocloomError> {
        let chunks = self.collection.clone();
        let source = source.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT id, source, chunk_index, start_index, content, metadata
                         FROM {chunks} WHERE source = ?1 ORDER BY chunk_index"
                    ))
                    ?;
                let rows = stmt
                    .query_map([&source], |row| {
                        Ok(ChunkRecord {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            chunk_index: row.get::<_, i64>(2)? as usize,
                            start_index: row.get::<_, i64>(3)? as usize,
                            content: row.get(4)?,
                            metadata: row
                                .get::<_, String>(5)
                                .map(|raw| serde_json::from_str(&raw).unwrap_or_default())
                                .unwrap_or_default(),
                            embedding: None,
                        })
                    })
                    ?;

                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }
                Ok(records)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| DocloomError::Storage(err.to_string()))
    }

    async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, DocloomError> {
        let chunks = self.collection.clone();
        let embeddings = self.embeddings_table();
        let source = source.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "DELETE FROM {embeddings} WHERE id IN
                             (SELECT id FROM {chunks} WHERE source = ?1)"
                    ),
                    [&source],
                )
                ?;
                let deleted = conn
                    .execute(&format!("DELETE FROM {chunks} WHERE source = ?1"), [&source])
                    ?;
                Ok(deleted)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| DocloomError::Storage(err.to_string()))
    }

    async fn search_similar(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkRecord, f32)>, DocloomError> {
        let chunks = self.collection.clone();
        let embeddings = self.embeddings_table();
        let encoded =
            serde_json::to_string(query).map_err(|err| DocloomError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT c.id, c.source, c.chunk_index, c.start_index,
                                c.content, c.metadata,
                                vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance
                         FROM {chunks} c
                         JOIN {embeddings} e ON c.id = e.id
                         ORDER BY distance ASC
                         LIMIT {top_k}"
                    ))
                    ?;
                let rows = stmt
                    .query_map([&encoded], |row| {
                        let record = ChunkRecord {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            chunk_index: row.get::<_, i64>(2)? as usize,
                            start_index: row.get::<_, i64>(3)? as usize,
                            content: row.get(4)?,
                            metadata: row
                                .get::<_, String>(5)
                                .map(|raw| serde_json::from_str(&raw).unwrap_or_default())
                                .unwrap_or_default(),
                            embedding: None,
                        };
                        let distance: f32 = row.get(6)?;
                        Ok((record, 1.0 - distance))
                    })
                    ?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| DocloomError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, DocloomError> {
        let chunks = self.collection.clone();
        self.conn
            .call(move |conn| {
                let count: i64 = conn
                    .query_row(&format!("SELECT COUNT(*) FROM {chunks}"), [], |row| {
                        row.get(0)
                    })
                    ?;
                Ok(count as usize)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| DocloomError::Storage(err.to_string()))
    }
}

/// Collection names become table names, so only identifier characters pass.
fn validate_collection_name(name: &str) -> Result<String, DocloomError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(DocloomError::Config(format!(
            "collection name '{name}' must be a bare identifier \
             (ascii letters, digits, underscores; not starting with a digit)"
        )))
    }
}

/// Registers the `sqlite-vec` extension for every connection opened after
/// this call. SQLite's auto-extension hook is process-global, hence the
/// `Once`.
fn register_sqlite_vec() -> Result<(), DocloomError> {
    use std::sync::Mutex;

    static INIT: Once = Once::new();
    static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

    INIT.call_once(|| {
        let result = unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != 0 {
                Err(format!(
                    "failed to register sqlite-vec extension (code {rc})"
                ))
            } else {
                Ok(())
            }
        };
        *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
    });

    INIT_RESULT
        .lock()
        .expect("init result mutex poisoned")
        .clone()
        .expect("init was called but result not set")
        .map_err(DocloomError::Storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_collection_names_pass() {
        assert!(validate_collection_name("documents").is_ok());
        assert!(validate_collection_name("corpus_2024").is_ok());
    }

    #[test]
    fn hostile_collection_names_are_rejected() {
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("9lives").is_err());
        assert!(validate_collection_name("docs; DROP TABLE docs").is_err());
        assert!(validate_collection_name("docs-2024").is_err());
    }
}
