//! Store, remove, retention and query entry points.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{NaiveDateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use radar_common::{RadarError, RadarResult};
use radar_metadata::MetadataHasher;
use radar_query::{AttributeQuery, FileQuery};
use radar_storage::{
    execute_attribute_query, execute_file_query, files, Catalog, ContentStorage, FileEntry,
    FilterManager, NewFileEntry, ResultRow, SourceManager,
};

use crate::extractor::MetadataExtractor;

/// The metadata database backend.
///
/// One instance per process; every operation acquires its own pooled
/// connection and multi-step mutations run in one transaction, so
/// concurrent callers are serialized only by the database itself.
pub struct Backend {
    pool: PgPool,
    content: Arc<dyn ContentStorage>,
    extractor: Arc<dyn MetadataExtractor>,
    sources: SourceManager,
    filters: FilterManager,
    hasher: MetadataHasher,
}

impl Backend {
    pub fn new(
        catalog: &Catalog,
        content: Arc<dyn ContentStorage>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        let pool = catalog.pool().clone();
        Self {
            sources: SourceManager::new(pool.clone()),
            filters: FilterManager::new(pool.clone()),
            pool,
            content,
            extractor,
            hasher: MetadataHasher::new(),
        }
    }

    pub fn sources(&self) -> &SourceManager {
        &self.sources
    }

    pub fn filters(&self) -> &FilterManager {
        &self.filters
    }

    /// Store a file: extract metadata, deduplicate by content hash per
    /// source, persist the node tree and the bytes in one transaction.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn store_file(&self, path: impl AsRef<Path>) -> RadarResult<FileEntry> {
        let path = path.as_ref();
        let mut metadata = self.extractor.extract(path)?;

        // Hash before any bookkeeping is stamped; the reserved subtree is
        // excluded either way.
        let hash = self.hasher.hash(&metadata);

        let source_attr = metadata
            .what_source()
            .ok_or_else(|| RadarError::Lookup("file carries no /what/source".into()))?
            .to_string();
        let (source_id, source_name) =
            self.sources.locate(&source_attr).await?.ok_or_else(|| {
                RadarError::Lookup(format!("no source matching {:?}", source_attr))
            })?;

        let uuid = Uuid::new_v4();
        let stored_at = Utc::now().naive_utc();
        let data = Bytes::from(tokio::fs::read(path).await?);
        let size = data.len() as i64;

        metadata.set_bdb_uuid(&uuid.to_string())?;
        metadata.set_bdb_metadata_hash(&hash)?;
        metadata.set_bdb_file_size(size)?;
        metadata.set_bdb_source_name(&source_name)?;
        metadata.set_bdb_stored_date(stored_at.date())?;
        metadata.set_bdb_stored_time(stored_at.time())?;

        let entry = NewFileEntry {
            uuid,
            source_id,
            hash,
            stored_date: stored_at.date(),
            stored_time: stored_at.time(),
            what_object: metadata.what_object().map(str::to_string),
            what_date: metadata.what_date(),
            what_time: metadata.what_time(),
            size,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to begin transaction: {}", e)))?;

        let file_id = files::insert_file(&mut tx, &entry).await?;
        files::insert_metadata(&mut tx, file_id, &metadata).await?;
        let content_ref = self.content.store(&mut tx, file_id, &data).await?;
        files::set_content_ref(&mut tx, file_id, content_ref).await?;

        tx.commit()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to commit store: {}", e)))?;

        info!(uuid = %uuid, source = %source_name, size, "Stored file");

        Ok(FileEntry {
            uuid,
            source_name,
            hash: entry.hash,
            stored_date: entry.stored_date,
            stored_time: entry.stored_time,
            what_object: entry.what_object,
            what_date: entry.what_date,
            what_time: entry.what_time,
            size,
        })
    }

    /// Remove a stored file and its bytes. Returns false when the uuid
    /// is unknown.
    #[instrument(skip(self))]
    pub async fn remove_file(&self, uuid: Uuid) -> RadarResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to begin transaction: {}", e)))?;

        let row = match files::file_row(&mut tx, uuid).await? {
            None => return Ok(false),
            Some(row) => row,
        };

        if let Some(content_ref) = row.content_ref {
            self.content.remove(&mut tx, row.id, content_ref).await?;
        } else {
            warn!(uuid = %uuid, "File row has no content reference");
        }
        files::delete_file(&mut tx, row.id).await?;

        tx.commit()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to commit removal: {}", e)))?;

        info!(uuid = %uuid, "Removed file");
        Ok(true)
    }

    /// Remove the oldest files beyond `limit`, at most `max_to_remove`
    /// per call. Returns the number actually removed; repeated calls make
    /// idempotent progress until the count stabilizes at `limit`.
    #[instrument(skip(self))]
    pub async fn remove_files_by_count(
        &self,
        limit: i64,
        max_to_remove: i64,
    ) -> RadarResult<usize> {
        let mut conn = self.acquire().await?;
        let count = files::file_count(&mut conn).await?;
        let excess = excess_to_remove(count, limit, max_to_remove);
        if excess == 0 {
            return Ok(0);
        }
        let uuids = files::oldest_files(&mut conn, excess).await?;
        drop(conn);

        let mut removed = 0;
        for uuid in uuids {
            if self.remove_file(uuid).await? {
                removed += 1;
            }
        }
        info!(removed, limit, "Pruned files by count");
        Ok(removed)
    }

    /// Remove up to `max_to_remove` of the oldest files stored before
    /// `cutoff`.
    #[instrument(skip(self))]
    pub async fn remove_files_by_age(
        &self,
        cutoff: NaiveDateTime,
        max_to_remove: i64,
    ) -> RadarResult<usize> {
        if max_to_remove <= 0 {
            return Ok(0);
        }
        let mut conn = self.acquire().await?;
        let uuids = files::files_stored_before(&mut conn, cutoff, max_to_remove).await?;
        drop(conn);

        let mut removed = 0;
        for uuid in uuids {
            if self.remove_file(uuid).await? {
                removed += 1;
            }
        }
        info!(removed, cutoff = %cutoff, "Pruned files by age");
        Ok(removed)
    }

    /// Run a file query, returning one entry per matching file.
    pub async fn query_files(&self, query: &FileQuery) -> RadarResult<Vec<FileEntry>> {
        let uuids = execute_file_query(&self.pool, query).await?;
        let mut conn = self.acquire().await?;
        let mut entries = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            if let Some(entry) = files::entry_by_uuid(&mut conn, uuid).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Run an attribute query, returning rows keyed by fetch labels.
    pub async fn query_attributes(&self, query: &AttributeQuery) -> RadarResult<Vec<ResultRow>> {
        execute_attribute_query(&self.pool, query).await
    }

    /// Look up one stored file.
    pub async fn file_entry(&self, uuid: Uuid) -> RadarResult<Option<FileEntry>> {
        let mut conn = self.acquire().await?;
        files::entry_by_uuid(&mut conn, uuid).await
    }

    /// Read back the stored bytes of a file.
    pub async fn file_content(&self, uuid: Uuid) -> RadarResult<Bytes> {
        let mut conn = self.acquire().await?;
        let row = files::file_row(&mut conn, uuid)
            .await?
            .ok_or_else(|| RadarError::Lookup(format!("no file with uuid {}", uuid)))?;
        let content_ref = row
            .content_ref
            .ok_or_else(|| RadarError::Storage(format!("file {} has no stored content", uuid)))?;
        self.content.read(&mut conn, row.id, content_ref).await
    }

    async fn acquire(&self) -> RadarResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to acquire connection: {}", e)))
    }
}

/// How many files a count-bounded prune should remove right now.
fn excess_to_remove(count: i64, limit: i64, max_to_remove: i64) -> i64 {
    (count - limit).max(0).min(max_to_remove.max(0))
}
