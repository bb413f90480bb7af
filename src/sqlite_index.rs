//! SQLite-backed [`VectorIndex`].
//!
//! Vectors are stored as little-endian f32 BLOBs next to their payload in
//! the `chunk_vectors` table. Nearest-neighbour search is brute-force
//! cosine distance in Rust over every stored row, which is fine at the
//! document counts an upload folder holds.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use docqa_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use docqa_core::models::ChunkPayload;
use docqa_core::store::{IndexHit, IndexRecord, IndexedDocument, VectorIndex};

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Total number of stored chunk records.
    pub async fn total(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO chunk_vectors (id, document, chunk_index, text, model, fingerprint,
                               dims, embedding, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        document = excluded.document,
        chunk_index = excluded.chunk_index,
        text = excluded.text,
        model = excluded.model,
        fingerprint = excluded.fingerprint,
        dims = excluded.dims,
        embedding = excluded.embedding,
        updated_at = excluded.updated_at
"#;

async fn insert_record<'e, E>(executor: E, record: &IndexRecord, now: i64) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(UPSERT_SQL)
        .bind(&record.id)
        .bind(&record.payload.document)
        .bind(record.payload.chunk_index as i64)
        .bind(&record.payload.text)
        .bind(&record.payload.model)
        .bind(&record.payload.fingerprint)
        .bind(record.vector.len() as i64)
        .bind(vec_to_blob(&record.vector))
        .bind(now)
        .execute(executor)
        .await?;
    Ok(())
}

fn payload_from_row(row: &SqliteRow) -> ChunkPayload {
    let chunk_index: i64 = row.get("chunk_index");
    ChunkPayload {
        document: row.get("document"),
        chunk_index: chunk_index as usize,
        text: row.get("text"),
        model: row.get("model"),
        fingerprint: row.get("fingerprint"),
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for record in records {
            insert_record(&mut *tx, record, now).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0u64;
        for id in ids {
            deleted += sqlx::query("DELETE FROM chunk_vectors WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(deleted as usize)
    }

    async fn delete_document(&self, document: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM chunk_vectors WHERE document = ?")
            .bind(document)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn chunk_ids(&self, document: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM chunk_vectors WHERE document = ? ORDER BY chunk_index ASC",
        )
        .bind(document)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn describe(&self, document: &str) -> Result<Option<IndexedDocument>> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n, MIN(model) AS model, MIN(fingerprint) AS fingerprint
            FROM chunk_vectors
            WHERE document = ?
            "#,
        )
        .bind(document)
        .fetch_one(&self.pool)
        .await?;

        let n: i64 = row.get("n");
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(IndexedDocument {
            document: document.to_string(),
            chunk_count: n as usize,
            model: row.get("model"),
            fingerprint: row.get("fingerprint"),
        }))
    }

    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<IndexHit>> {
        let rows = sqlx::query(
            "SELECT id, document, chunk_index, text, model, fingerprint, embedding FROM chunk_vectors",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hits: Vec<IndexHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                IndexHit {
                    id: row.get("id"),
                    payload: payload_from_row(row),
                    distance: cosine_distance(vector, &blob_to_vec(&blob)),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.payload.document.cmp(&b.payload.document))
                .then_with(|| a.payload.chunk_index.cmp(&b.payload.chunk_index))
        });
        hits.truncate(limit);
        debug!(scanned = rows.len(), returned = hits.len(), "vector query");
        Ok(hits)
    }

    /// Delete and insert in one transaction, so a failed insert rolls the
    /// document back to its previous chunks.
    async fn replace_document(&self, document: &str, records: &[IndexRecord]) -> Result<usize> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM chunk_vectors WHERE document = ?")
            .bind(document)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for record in records {
            insert_record(&mut *tx, record, now).await?;
        }

        tx.commit().await?;
        debug!(document, removed, inserted = records.len(), "replaced chunks");
        Ok(removed as usize)
    }
}
