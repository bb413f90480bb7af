//! Query-time retrieval.
//!
//! Embeds the query with the same [`Embedder`] used at indexing time and
//! asks the [`VectorIndex`] for the nearest chunks. Results are ordered by
//! ascending cosine distance and deduplicated by chunk id.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::embedding::{embed_one, Embedder};
use crate::error::{Error, Result};
use crate::models::RetrievedPassage;
use crate::store::VectorIndex;

pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    /// Return up to `k` passages closest to `query`.
    ///
    /// A blank query or an empty index yields an empty result. Hits indexed
    /// with a different embedding model than the current one are not
    /// comparable, so they fail the whole query with
    /// [`Error::ModelMismatch`].
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if k == 0 {
            return Err(Error::Configuration("k must be >= 1".to_string()));
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = embed_one(self.embedder.as_ref(), query)
            .await
            .map_err(|e| Error::Embedding(format!("{:#}", e)))?;

        let hits = self
            .index
            .query(&vector, k)
            .await
            .map_err(|e| Error::Index {
                document: None,
                message: format!("query: {:#}", e),
                deindexed: false,
            })?;

        let current = self.embedder.model_name();
        let mut seen = HashSet::new();
        let mut passages = Vec::with_capacity(hits.len());
        for hit in hits {
            if !seen.insert(hit.id) {
                continue;
            }
            if hit.payload.model != current {
                warn!(
                    document = %hit.payload.document,
                    indexed = %hit.payload.model,
                    current,
                    "hit from a different embedding model"
                );
                return Err(Error::ModelMismatch {
                    indexed: hit.payload.model,
                    current: current.to_string(),
                });
            }
            passages.push(RetrievedPassage {
                text: hit.payload.text,
                document: hit.payload.document,
                chunk_index: hit.payload.chunk_index,
                distance: hit.distance,
            });
        }

        passages.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(k);
        debug!(k, returned = passages.len(), "retrieved passages");
        Ok(passages)
    }
}
