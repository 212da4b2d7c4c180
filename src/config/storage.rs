use crate::error::{ChatbotError, Result};
use crate::vector::{Document, IndexedEntry, Metadata};
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything read back from a persisted index file.
#[derive(Debug)]
pub struct StoredIndex {
    pub embedding_model: String,
    pub dimensions: usize,
    pub entries: Vec<IndexedEntry>,
}

/// Persists a similarity index to a single SQLite file.
///
/// `index_meta` holds one row naming the embedding model and the vector
/// dimensionality. `indexed_documents` holds one row per entry in index
/// order, with the vector as a little-endian `f32` blob.
pub struct IndexStore {
    db_path: PathBuf,
}

impl IndexStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { db_path: db_path.to_path_buf() })
    }

    fn get_conn(&self) -> Result<Connection> {
        Connection::open(&self.db_path).map_err(Into::into)
    }

    fn initialize_db(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS index_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                embedding_model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS indexed_documents (
                position INTEGER PRIMARY KEY,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL,
                vector BLOB NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Replaces the stored index with `entries` in one transaction.
    pub fn write(&self, embedding_model: &str, dimensions: usize, entries: &[IndexedEntry]) -> Result<()> {
        let mut conn = self.get_conn()?;
        Self::initialize_db(&conn)?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM indexed_documents", [])?;
        tx.execute("DELETE FROM index_meta", [])?;
        tx.execute(
            "INSERT INTO index_meta (id, embedding_model, dimensions, created_at) VALUES (1, ?1, ?2, ?3)",
            params![embedding_model, dimensions as i64, Utc::now().to_rfc3339()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO indexed_documents (position, text, metadata, vector) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, entry) in entries.iter().enumerate() {
                let metadata = serde_json::to_string(&entry.document.metadata)?;
                stmt.execute(params![
                    position as i64,
                    entry.document.text,
                    metadata,
                    encode_vector(&entry.vector)
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Reads the index at `db_path`. A missing file, or one without index
    /// metadata, is `IndexNotFound`.
    pub fn read(db_path: &Path) -> Result<StoredIndex> {
        if !db_path.is_file() {
            return Err(ChatbotError::IndexNotFound(db_path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        let (embedding_model, dimensions) = conn
            .query_row(
                "SELECT embedding_model, dimensions FROM index_meta WHERE id = 1",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .map_err(|_| ChatbotError::IndexNotFound(db_path.to_path_buf()))?;

        let mut stmt = conn.prepare(
            "SELECT text, metadata, vector FROM indexed_documents ORDER BY position ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for (position, row) in rows.enumerate() {
            let (text, metadata, blob) = row?;
            let metadata: Metadata = serde_json::from_str(&metadata).map_err(|e| {
                ChatbotError::Index(format!(
                    "Corrupt metadata for document {} in {}: {}",
                    position,
                    db_path.display(),
                    e
                ))
            })?;
            entries.push(IndexedEntry {
                vector: decode_vector(&blob)?,
                document: Document { text, metadata },
            });
        }

        Ok(StoredIndex {
            embedding_model,
            dimensions: dimensions.max(0) as usize,
            entries,
        })
    }

    /// Non-failing check that `db_path` is a readable index file.
    pub fn exists(db_path: &Path) -> bool {
        if !db_path.is_file() {
            return false;
        }
        Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .and_then(|conn| {
                conn.query_row("SELECT COUNT(*) FROM index_meta", [], |row| row.get::<_, i64>(0))
            })
            .map(|count| count == 1)
            .unwrap_or(false)
    }

    /// Deletes the index file. Consumes the store.
    pub fn delete(self) -> Result<()> {
        if self.db_path.exists() {
            fs::remove_file(&self.db_path)?;
        }
        Ok(())
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(ChatbotError::Index(format!(
            "Stored vector blob has invalid length {}",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(chunk);
            f32::from_le_bytes(bytes)
        })
        .collect())
}
