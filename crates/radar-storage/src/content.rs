//! Physical storage of file bytes.
//!
//! Both backends operate on the caller's connection so that content
//! writes share the transaction wrapping the metadata insert; a failed
//! store rolls the whole file back.

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::PgConnection;
use tracing::debug;

use radar_common::{RadarError, RadarResult};

use crate::db::map_db_err;

/// Backend for stored file bytes.
///
/// `store` returns an opaque reference recorded on the file row and
/// handed back to `read`/`remove`.
#[async_trait]
pub trait ContentStorage: std::fmt::Debug + Send + Sync {
    async fn store(
        &self,
        conn: &mut PgConnection,
        file_id: i64,
        data: &[u8],
    ) -> RadarResult<i64>;

    async fn read(
        &self,
        conn: &mut PgConnection,
        file_id: i64,
        content_ref: i64,
    ) -> RadarResult<Bytes>;

    async fn remove(
        &self,
        conn: &mut PgConnection,
        file_id: i64,
        content_ref: i64,
    ) -> RadarResult<()>;
}

/// Bytes as a `bytea` row in `file_content`, keyed by file id.
#[derive(Debug, Default)]
pub struct BlobStorage;

#[async_trait]
impl ContentStorage for BlobStorage {
    async fn store(
        &self,
        conn: &mut PgConnection,
        file_id: i64,
        data: &[u8],
    ) -> RadarResult<i64> {
        debug!(file_id, size = data.len(), "Storing blob content");
        sqlx::query("INSERT INTO file_content (file_id, data) VALUES ($1, $2)")
            .bind(file_id)
            .bind(data)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_db_err("Failed to store blob content", e))?;
        Ok(file_id)
    }

    async fn read(
        &self,
        conn: &mut PgConnection,
        file_id: i64,
        _content_ref: i64,
    ) -> RadarResult<Bytes> {
        let data: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT data FROM file_content WHERE file_id = $1")
                .bind(file_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| map_db_err("Failed to read blob content", e))?;
        data.map(Bytes::from)
            .ok_or_else(|| RadarError::Storage(format!("no content for file {}", file_id)))
    }

    async fn remove(
        &self,
        conn: &mut PgConnection,
        file_id: i64,
        _content_ref: i64,
    ) -> RadarResult<()> {
        sqlx::query("DELETE FROM file_content WHERE file_id = $1")
            .bind(file_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_db_err("Failed to remove blob content", e))?;
        Ok(())
    }
}

/// Bytes as PostgreSQL large objects; the content reference is the oid.
#[derive(Debug, Default)]
pub struct LargeObjectStorage;

#[async_trait]
impl ContentStorage for LargeObjectStorage {
    async fn store(
        &self,
        conn: &mut PgConnection,
        file_id: i64,
        data: &[u8],
    ) -> RadarResult<i64> {
        debug!(file_id, size = data.len(), "Storing large object");
        let oid: i64 = sqlx::query_scalar("SELECT lo_from_bytea(0, $1)::int8")
            .bind(data)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_db_err("Failed to create large object", e))?;
        Ok(oid)
    }

    async fn read(
        &self,
        conn: &mut PgConnection,
        _file_id: i64,
        content_ref: i64,
    ) -> RadarResult<Bytes> {
        let data: Vec<u8> = sqlx::query_scalar("SELECT lo_get($1::oid)")
            .bind(content_ref)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_db_err("Failed to read large object", e))?;
        Ok(Bytes::from(data))
    }

    async fn remove(
        &self,
        conn: &mut PgConnection,
        _file_id: i64,
        content_ref: i64,
    ) -> RadarResult<()> {
        sqlx::query("SELECT lo_unlink($1::oid)")
            .bind(content_ref)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_db_err("Failed to unlink large object", e))?;
        Ok(())
    }
}
