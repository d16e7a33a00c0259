//! File row and metadata-node persistence.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{FromRow, PgConnection, Row};
use uuid::Uuid;

use radar_common::{RadarError, RadarResult, Value};
use radar_metadata::{Metadata, NodeKind};

use crate::db::map_db_err;

/// Node kind discriminators in the `nodes` table.
const KIND_GROUP: i16 = 1;
const KIND_ATTRIBUTE: i16 = 2;
const KIND_DATASET: i16 = 3;

/// A stored file, as returned to callers.
#[derive(Debug, Clone, FromRow)]
pub struct FileEntry {
    pub uuid: Uuid,
    pub source_name: String,
    pub hash: String,
    pub stored_date: NaiveDate,
    pub stored_time: NaiveTime,
    pub what_object: Option<String>,
    pub what_date: Option<NaiveDate>,
    pub what_time: Option<NaiveTime>,
    pub size: i64,
}

/// Column values for a new file row.
#[derive(Debug, Clone)]
pub struct NewFileEntry {
    pub uuid: Uuid,
    pub source_id: i64,
    pub hash: String,
    pub stored_date: NaiveDate,
    pub stored_time: NaiveTime,
    pub what_object: Option<String>,
    pub what_date: Option<NaiveDate>,
    pub what_time: Option<NaiveTime>,
    pub size: i64,
}

/// Internal row for removal bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct FileRow {
    pub id: i64,
    pub content_ref: Option<i64>,
}

/// Insert the file row, translating the `(hash, source_id)` unique
/// violation into a duplicate-entry error.
pub async fn insert_file(conn: &mut PgConnection, entry: &NewFileEntry) -> RadarResult<i64> {
    let row = sqlx::query(
        "INSERT INTO files ( \
             uuid, source_id, hash, stored_date, stored_time, \
             what_object, what_date, what_time, size \
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id",
    )
    .bind(entry.uuid)
    .bind(entry.source_id)
    .bind(&entry.hash)
    .bind(entry.stored_date)
    .bind(entry.stored_time)
    .bind(&entry.what_object)
    .bind(entry.what_date)
    .bind(entry.what_time)
    .bind(entry.size)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_db_err("Failed to insert file", e))?;

    row.try_get("id")
        .map_err(|e| RadarError::Database(format!("Failed to read file id: {}", e)))
}

/// Persist the whole node tree for a file.
///
/// Walks the tree in pre-order so every parent row exists before its
/// children; attribute nodes also get their typed value row.
pub async fn insert_metadata(
    conn: &mut PgConnection,
    file_id: i64,
    metadata: &Metadata,
) -> RadarResult<()> {
    let mut row_ids: HashMap<radar_metadata::NodeId, i64> = HashMap::new();

    for node in metadata.iternodes() {
        let parent_row = metadata.parent(node).map(|p| row_ids[&p]);
        let kind = match metadata.kind(node) {
            NodeKind::Group => KIND_GROUP,
            NodeKind::Attribute(_) => KIND_ATTRIBUTE,
            NodeKind::Dataset => KIND_DATASET,
        };

        let row = sqlx::query(
            "INSERT INTO nodes (file_id, parent_id, name, kind) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(file_id)
        .bind(parent_row)
        .bind(metadata.name(node))
        .bind(kind)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_db_err("Failed to insert node", e))?;

        let node_row: i64 = row
            .try_get("id")
            .map_err(|e| RadarError::Database(format!("Failed to read node id: {}", e)))?;
        row_ids.insert(node, node_row);

        if let NodeKind::Attribute(value) = metadata.kind(node) {
            insert_attribute_value(conn, node_row, value, &metadata.path(node)).await?;
        }
    }

    Ok(())
}

async fn insert_attribute_value(
    conn: &mut PgConnection,
    node_row: i64,
    value: &Value,
    path: &str,
) -> RadarResult<()> {
    let query = match value {
        Value::Long(v) => {
            sqlx::query("INSERT INTO attribute_values (node_id, value_long) VALUES ($1, $2)")
                .bind(node_row)
                .bind(*v)
        }
        Value::Double(v) => {
            sqlx::query("INSERT INTO attribute_values (node_id, value_double) VALUES ($1, $2)")
                .bind(node_row)
                .bind(*v)
        }
        Value::Str(v) => {
            sqlx::query("INSERT INTO attribute_values (node_id, value_string) VALUES ($1, $2)")
                .bind(node_row)
                .bind(v.clone())
        }
        Value::Bool(v) => {
            sqlx::query("INSERT INTO attribute_values (node_id, value_bool) VALUES ($1, $2)")
                .bind(node_row)
                .bind(*v)
        }
        Value::Date(v) => {
            sqlx::query("INSERT INTO attribute_values (node_id, value_date) VALUES ($1, $2)")
                .bind(node_row)
                .bind(*v)
        }
        Value::Time(v) => {
            sqlx::query("INSERT INTO attribute_values (node_id, value_time) VALUES ($1, $2)")
                .bind(node_row)
                .bind(*v)
        }
        other => {
            return Err(RadarError::Value(format!(
                "attribute {} has non-persistable kind {}",
                path,
                other.type_name()
            )))
        }
    };

    query
        .execute(&mut *conn)
        .await
        .map_err(|e| map_db_err("Failed to insert attribute value", e))?;
    Ok(())
}

/// Record the physical content reference on the file row.
pub async fn set_content_ref(
    conn: &mut PgConnection,
    file_id: i64,
    content_ref: i64,
) -> RadarResult<()> {
    sqlx::query("UPDATE files SET content_ref = $1 WHERE id = $2")
        .bind(content_ref)
        .bind(file_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_db_err("Failed to set content reference", e))?;
    Ok(())
}

/// Internal id and content reference for a uuid, if stored.
pub async fn file_row(conn: &mut PgConnection, uuid: Uuid) -> RadarResult<Option<FileRow>> {
    let row = sqlx::query("SELECT id, content_ref FROM files WHERE uuid = $1")
        .bind(uuid)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_db_err("Failed to look up file", e))?;

    match row {
        None => Ok(None),
        Some(row) => Ok(Some(FileRow {
            id: row
                .try_get("id")
                .map_err(|e| RadarError::Database(format!("Failed to read file id: {}", e)))?,
            content_ref: row.try_get("content_ref").map_err(|e| {
                RadarError::Database(format!("Failed to read content reference: {}", e))
            })?,
        })),
    }
}

/// Delete a file row; nodes, values and blob content cascade.
pub async fn delete_file(conn: &mut PgConnection, file_id: i64) -> RadarResult<()> {
    sqlx::query("DELETE FROM files WHERE id = $1")
        .bind(file_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_db_err("Failed to delete file", e))?;
    Ok(())
}

pub async fn entry_by_uuid(
    conn: &mut PgConnection,
    uuid: Uuid,
) -> RadarResult<Option<FileEntry>> {
    sqlx::query_as::<_, FileEntry>(
        "SELECT f.uuid, s.name AS source_name, f.hash, f.stored_date, f.stored_time, \
         f.what_object, f.what_date, f.what_time, f.size \
         FROM files f JOIN sources s ON s.id = f.source_id \
         WHERE f.uuid = $1",
    )
    .bind(uuid)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_db_err("Failed to load file entry", e))
}

pub async fn file_count(conn: &mut PgConnection) -> RadarResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM files")
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_db_err("Failed to count files", e))
}

/// The `n` oldest files by insertion order.
pub async fn oldest_files(conn: &mut PgConnection, n: i64) -> RadarResult<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>("SELECT uuid FROM files ORDER BY id ASC LIMIT $1")
        .bind(n)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_db_err("Failed to list oldest files", e))
}

/// Up to `n` oldest files stored before `cutoff`.
pub async fn files_stored_before(
    conn: &mut PgConnection,
    cutoff: NaiveDateTime,
    n: i64,
) -> RadarResult<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT uuid FROM files \
         WHERE (stored_date + stored_time) < $1 \
         ORDER BY id ASC LIMIT $2",
    )
    .bind(cutoff)
    .bind(n)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_db_err("Failed to list files by age", e))
}
