use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::config::storage::{IndexStore, StoredIndex};
use crate::embed::EmbeddingModel;
use crate::error::{ChatbotError, Result};

/// Free-form document metadata. `source`, `category` and `priority` are the
/// conventional keys.
pub type Metadata = Map<String, JsonValue>;

/// A knowledge-base record. Identity is positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Convenience constructor for the common `source`/`category`/`priority` triple.
    pub fn with_source(text: impl Into<String>, source: &str, category: &str, priority: &str) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), JsonValue::from(source));
        metadata.insert("category".into(), JsonValue::from(category));
        metadata.insert("priority".into(), JsonValue::from(priority));
        Self::new(text, metadata)
    }
}

/// Reads a string metadata field, falling back to `default`.
pub fn metadata_str<'a>(metadata: &'a Metadata, key: &str, default: &'a str) -> &'a str {
    metadata.get(key).and_then(JsonValue::as_str).unwrap_or(default)
}

/// A vector together with the document it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub vector: Vec<f32>,
    pub document: Document,
}

/// One hit from [`SimilarityIndex::search`]. Higher `similarity` is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub metadata: Metadata,
    pub similarity: f32,
}

impl SearchResult {
    pub fn source(&self) -> &str {
        metadata_str(&self.metadata, "source", "Unknown source")
    }

    pub fn category(&self) -> &str {
        metadata_str(&self.metadata, "category", "General")
    }
}

/// Summary reported by `stats()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub status: String,
    pub total_documents: usize,
    pub embedding_dimension: usize,
    pub embedding_model: String,
}

/// Squared Euclidean distance.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Maps a distance onto `(0, 1]`; identical vectors score 1.0.
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Exact nearest-neighbour index over embedded documents.
///
/// Every entry has the dimensionality fixed at creation by the embedding
/// model. The index is bound to that model; loading an index persisted by a
/// different model is rejected.
pub struct SimilarityIndex {
    embedder: Arc<dyn EmbeddingModel>,
    entries: Vec<IndexedEntry>,
    dimensions: usize,
    path: Option<PathBuf>,
}

impl fmt::Debug for SimilarityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityIndex")
            .field("embedding_model", &self.embedder.model_name())
            .field("entries", &self.entries.len())
            .field("dimensions", &self.dimensions)
            .field("path", &self.path)
            .finish()
    }
}

impl SimilarityIndex {
    /// Embeds every document and builds a new index.
    pub async fn create(embedder: Arc<dyn EmbeddingModel>, documents: Vec<Document>) -> Result<Self> {
        if documents.is_empty() {
            return Err(ChatbotError::EmptyInput);
        }

        let mut index = Self {
            embedder,
            entries: Vec::with_capacity(documents.len()),
            dimensions: 0,
            path: None,
        };
        index.add_documents(documents).await?;
        info!(
            "Created similarity index with {} documents ({} dimensions)",
            index.entries.len(),
            index.dimensions
        );
        Ok(index)
    }

    /// Embeds and appends documents. Returns how many were added.
    pub async fn add_documents(&mut self, documents: Vec<Document>) -> Result<usize> {
        let (staged, dimensions) = self.embed_entries(documents).await?;
        let added = staged.len();
        self.dimensions = dimensions;
        self.entries.extend(staged);
        Ok(added)
    }

    /// Like [`add_documents`](Self::add_documents), but writes the grown index
    /// to `path` first. On any error the index is left unchanged.
    pub async fn add_documents_and_save(&mut self, documents: Vec<Document>, path: &Path) -> Result<usize> {
        let (staged, dimensions) = self.embed_entries(documents).await?;
        let added = staged.len();
        if added == 0 {
            return Ok(0);
        }

        let mut entries = Vec::with_capacity(self.entries.len() + added);
        entries.extend_from_slice(&self.entries);
        entries.extend(staged);
        IndexStore::new(path)?.write(self.embedder.model_name(), dimensions, &entries)?;

        self.entries = entries;
        self.dimensions = dimensions;
        self.path = Some(path.to_path_buf());
        info!("Saved index with {} documents to {}", self.entries.len(), path.display());
        Ok(added)
    }

    /// Embeds `documents` without touching the index. Returns the new entries
    /// and the dimensionality they share with the existing ones.
    async fn embed_entries(&self, documents: Vec<Document>) -> Result<(Vec<IndexedEntry>, usize)> {
        if documents.is_empty() {
            return Ok((Vec::new(), self.dimensions));
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(ChatbotError::Index(format!(
                "Embedding service returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let mut dimensions = self.dimensions;
        for vector in &vectors {
            if vector.is_empty() {
                return Err(ChatbotError::Index("Embedding vector is empty".to_string()));
            }
            if dimensions == 0 {
                dimensions = vector.len();
            } else if vector.len() != dimensions {
                return Err(ChatbotError::Index(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    dimensions,
                    vector.len()
                )));
            }
        }

        let staged = vectors
            .into_iter()
            .zip(documents)
            .map(|(vector, document)| IndexedEntry { vector, document })
            .collect();
        Ok((staged, dimensions))
    }

    /// Returns up to `k` documents whose similarity to `query` is at least
    /// `score_threshold`, most similar first. An empty result is not an error.
    pub async fn search(&self, query: &str, k: usize, score_threshold: f32) -> Result<Vec<SearchResult>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        if query_vector.len() != self.dimensions {
            return Err(ChatbotError::Index(format!(
                "Query embedding has {} dimensions, index has {}",
                query_vector.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(f32, &IndexedEntry)> = self
            .entries
            .iter()
            .map(|entry| (squared_l2(&query_vector, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        let results: Vec<SearchResult> = scored
            .into_iter()
            .take(k)
            .map(|(distance, entry)| SearchResult {
                text: entry.document.text.clone(),
                metadata: entry.document.metadata.clone(),
                similarity: distance_to_similarity(distance),
            })
            .filter(|hit| hit.similarity >= score_threshold)
            .collect();

        debug!(
            "Search kept {} of {} candidates at threshold {}",
            results.len(),
            k.min(self.entries.len()),
            score_threshold
        );
        Ok(results)
    }

    /// Persists the index and remembers `path` for later saves.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        IndexStore::new(path)?.write(self.embedder.model_name(), self.dimensions, &self.entries)?;
        self.path = Some(path.to_path_buf());
        info!("Saved index with {} documents to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Restores an index saved by [`save`](Self::save).
    pub fn load(path: &Path, embedder: Arc<dyn EmbeddingModel>) -> Result<Self> {
        let StoredIndex {
            embedding_model,
            dimensions,
            entries,
        } = IndexStore::read(path)?;

        if embedding_model != embedder.model_name() {
            return Err(ChatbotError::Index(format!(
                "Index at {} was built with '{}', not '{}'",
                path.display(),
                embedding_model,
                embedder.model_name()
            )));
        }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimensions) {
            return Err(ChatbotError::Index(format!(
                "Stored vector has {} dimensions, index declares {}",
                bad.vector.len(),
                dimensions
            )));
        }

        info!("Loaded index with {} documents from {}", entries.len(), path.display());
        Ok(Self {
            embedder,
            entries,
            dimensions,
            path: Some(path.to_path_buf()),
        })
    }

    /// Whether `path` holds a loadable index. Never fails.
    pub fn exists(path: &Path) -> bool {
        IndexStore::exists(path)
    }

    /// Loads the index at `path` when present, otherwise creates it from
    /// `documents` and saves it there.
    pub async fn open_or_create(
        path: &Path,
        embedder: Arc<dyn EmbeddingModel>,
        documents: Vec<Document>,
    ) -> Result<Self> {
        if Self::exists(path) {
            return Self::load(path, embedder);
        }
        let mut index = Self::create(embedder, documents).await?;
        index.save(path)?;
        Ok(index)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            status: if self.entries.is_empty() { "empty" } else { "ready" }.to_string(),
            total_documents: self.entries.len(),
            embedding_dimension: self.dimensions,
            embedding_model: self.embedder.model_name().to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[IndexedEntry] {
        &self.entries
    }
}
