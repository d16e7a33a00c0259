//! Source records: radar/station identities with key/value attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::instrument;

use radar_common::{RadarError, RadarResult};

use crate::db::map_db_err;

/// A named source with descriptive key/value pairs and an optional
/// grouping parent (typically a country code source).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub values: BTreeMap<String, String>,
    pub parent: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    /// Parse an ODIM `what/source` string (`KEY:value,KEY:value`) into
    /// its pairs, preserving order. Segments without a colon are skipped.
    pub fn parse_pairs(source: &str) -> Vec<(String, String)> {
        source
            .split(',')
            .filter_map(|segment| {
                segment
                    .split_once(':')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            })
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect()
    }
}

/// CRUD over the `sources`/`source_kvs` tables.
pub struct SourceManager {
    pool: PgPool,
}

impl SourceManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a new source; duplicate names are rejected.
    #[instrument(skip(self, source), fields(name = %source.name))]
    pub async fn add_source(&self, source: &Source) -> RadarResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to begin transaction: {}", e)))?;

        let row = sqlx::query("INSERT INTO sources (name, parent) VALUES ($1, $2) RETURNING id")
            .bind(&source.name)
            .bind(&source.parent)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_db_err("Failed to insert source", e))?;
        let id: i64 = row
            .try_get("id")
            .map_err(|e| RadarError::Database(format!("Failed to read source id: {}", e)))?;

        insert_kvs(&mut tx, id, source).await?;

        tx.commit()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to commit: {}", e)))?;
        Ok(())
    }

    /// Replace the source stored under `name`, possibly renaming it.
    #[instrument(skip(self, source), fields(name = %name, new_name = %source.name))]
    pub async fn update_source(&self, name: &str, source: &Source) -> RadarResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to begin transaction: {}", e)))?;

        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM sources WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_db_err("Failed to look up source", e))?;
        let id = id.ok_or_else(|| RadarError::Lookup(format!("no source named {:?}", name)))?;

        sqlx::query("UPDATE sources SET name = $1, parent = $2 WHERE id = $3")
            .bind(&source.name)
            .bind(&source.parent)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_err("Failed to update source", e))?;

        sqlx::query("DELETE FROM source_kvs WHERE source_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_err("Failed to clear source attributes", e))?;
        insert_kvs(&mut tx, id, source).await?;

        tx.commit()
            .await
            .map_err(|e| RadarError::Database(format!("Failed to commit: {}", e)))?;
        Ok(())
    }

    /// Remove a source by name.
    ///
    /// Returns false when no such source exists; fails with an integrity
    /// error while files still reference it.
    #[instrument(skip(self))]
    pub async fn remove_source(&self, name: &str) -> RadarResult<bool> {
        let result = sqlx::query("DELETE FROM sources WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to remove source", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_source(&self, name: &str) -> RadarResult<Option<Source>> {
        let row = sqlx::query("SELECT id, name, parent FROM sources WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to load source", e))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let id: i64 = row
                    .try_get("id")
                    .map_err(|e| RadarError::Database(format!("Failed to read source id: {}", e)))?;
                Ok(Some(self.load_source_values(row, id).await?))
            }
        }
    }

    /// All sources, ordered by name.
    pub async fn get_sources(&self) -> RadarResult<Vec<Source>> {
        let rows = sqlx::query("SELECT id, name, parent FROM sources ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to list sources", e))?;

        let mut sources = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row
                .try_get("id")
                .map_err(|e| RadarError::Database(format!("Failed to read source id: {}", e)))?;
            sources.push(self.load_source_values(row, id).await?);
        }
        Ok(sources)
    }

    /// Sources acting as a grouping node, i.e. named as some other
    /// source's parent. Ordered by name.
    pub async fn get_parent_sources(&self) -> RadarResult<Vec<Source>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT parent FROM sources WHERE parent IS NOT NULL ORDER BY parent",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_err("Failed to list parent sources", e))?;

        let mut sources = Vec::with_capacity(names.len());
        for name in names {
            if let Some(source) = self.get_source(&name).await? {
                sources.push(source);
            }
        }
        Ok(sources)
    }

    /// Sources whose parent is exactly `parent`, ordered by name.
    pub async fn get_sources_with_parent(&self, parent: &str) -> RadarResult<Vec<Source>> {
        let rows = sqlx::query("SELECT id, name, parent FROM sources WHERE parent = $1 ORDER BY name")
            .bind(parent)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to list sources by parent", e))?;

        let mut sources = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row
                .try_get("id")
                .map_err(|e| RadarError::Database(format!("Failed to read source id: {}", e)))?;
            sources.push(self.load_source_values(row, id).await?);
        }
        Ok(sources)
    }

    /// Resolve an ODIM `what/source` attribute string to a stored source.
    ///
    /// Pairs are tried in their order of appearance; the first key/value
    /// match wins. Returns the source row id and name.
    pub async fn locate(&self, source: &str) -> RadarResult<Option<(i64, String)>> {
        for (key, value) in Source::parse_pairs(source) {
            let row = sqlx::query(
                "SELECT s.id, s.name FROM sources s \
                 JOIN source_kvs k ON k.source_id = s.id \
                 WHERE k.key = $1 AND k.value = $2 \
                 ORDER BY s.name LIMIT 1",
            )
            .bind(&key)
            .bind(&value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to locate source", e))?;

            if let Some(row) = row {
                let id: i64 = row
                    .try_get("id")
                    .map_err(|e| RadarError::Database(format!("Failed to read source id: {}", e)))?;
                let name: String = row
                    .try_get("name")
                    .map_err(|e| RadarError::Database(format!("Failed to read source name: {}", e)))?;
                return Ok(Some((id, name)));
            }
        }
        Ok(None)
    }

    async fn load_source_values(&self, row: sqlx::postgres::PgRow, id: i64) -> RadarResult<Source> {
        let name: String = row
            .try_get("name")
            .map_err(|e| RadarError::Database(format!("Failed to read source name: {}", e)))?;
        let parent: Option<String> = row
            .try_get("parent")
            .map_err(|e| RadarError::Database(format!("Failed to read source parent: {}", e)))?;

        let kvs: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM source_kvs WHERE source_id = $1 ORDER BY key",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_err("Failed to load source attributes", e))?;

        Ok(Source {
            name,
            values: kvs.into_iter().collect(),
            parent,
        })
    }
}

async fn insert_kvs(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    source_id: i64,
    source: &Source,
) -> RadarResult<()> {
    for (key, value) in &source.values {
        sqlx::query("INSERT INTO source_kvs (source_id, key, value) VALUES ($1, $2, $3)")
            .bind(source_id)
            .bind(key)
            .bind(value)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_db_err("Failed to insert source attribute", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        assert_eq!(
            Source::parse_pairs("NOD:seang,WMO:02606"),
            vec![
                ("NOD".to_string(), "seang".to_string()),
                ("WMO".to_string(), "02606".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_pairs_skips_malformed_segments() {
        assert_eq!(
            Source::parse_pairs("NOD:seang,garbage,PLC:"),
            vec![("NOD".to_string(), "seang".to_string())]
        );
        assert!(Source::parse_pairs("").is_empty());
    }

    #[test]
    fn test_structural_equality() {
        let a = Source::new("seang").with("NOD", "seang").with_parent("se");
        let b = Source::new("seang").with("NOD", "seang").with_parent("se");
        let c = Source::new("seang").with("NOD", "seang");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
