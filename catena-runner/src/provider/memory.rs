//! In-process vector store
//!
//! Collections live in a registry shared by every store opened from it, so an
//! embedding job and later document searches see the same data for the
//! lifetime of the process. Search is exhaustive cosine similarity.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{EmbeddingModel, VectorStore, VectorStoreMode};
use crate::error::{ConstructionError, StepError};

/// Provider name of the in-process store
pub const MEMORY_VECTOR_STORE: &str = "memory";

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    vector: Vec<f32>,
}

type Collection = Arc<RwLock<Vec<Entry>>>;

/// Named collections of embedded texts
#[derive(Default)]
pub struct MemoryVectorRegistry {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `name` according to `mode`
    pub fn open(
        &self,
        name: &str,
        embedding: Arc<dyn EmbeddingModel>,
        mode: VectorStoreMode,
    ) -> Result<MemoryVectorStore, ConstructionError> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let entries = match mode {
            VectorStoreMode::Read => collections
                .get(name)
                .cloned()
                .ok_or_else(|| ConstructionError::MissingCollection(name.to_string()))?,
            VectorStoreMode::Create => {
                if collections.contains_key(name) {
                    return Err(ConstructionError::CollectionExists(name.to_string()));
                }
                let entries = Collection::default();
                collections.insert(name.to_string(), entries.clone());
                entries
            }
            VectorStoreMode::Overwrite => {
                let entries = Collection::default();
                collections.insert(name.to_string(), entries.clone());
                entries
            }
        };

        Ok(MemoryVectorStore {
            collection: name.to_string(),
            entries,
            embedding,
        })
    }

    /// Number of texts stored in `name`, if it exists
    pub fn len(&self, name: &str) -> Option<usize> {
        let collections = self.collections.read().ok()?;
        let entries = collections.get(name)?;
        entries.read().ok().map(|e| e.len())
    }
}

/// Handle on one collection of a `MemoryVectorRegistry`
pub struct MemoryVectorStore {
    collection: String,
    entries: Collection,
    embedding: Arc<dyn EmbeddingModel>,
}

impl MemoryVectorStore {
    fn poisoned(&self) -> StepError {
        StepError::VectorStore(format!("collection {} is poisoned", self.collection))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, StepError> {
        let query_vector = self.embedding.embed(query).await?;

        let entries = self.entries.read().map_err(|_| self.poisoned())?;
        let mut scored: Vec<(f32, &str)> = entries
            .iter()
            .map(|e| (cosine_similarity(&query_vector, &e.vector), e.text.as_str()))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, text)| text.to_string())
            .collect())
    }

    async fn add_text(&self, text: &str) -> Result<(), StepError> {
        let vector = self.embedding.embed(text).await?;

        let mut entries = self.entries.write().map_err(|_| self.poisoned())?;
        entries.push(Entry {
            text: text.to_string(),
            vector,
        });
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
