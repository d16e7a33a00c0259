//! Persisted, named filter expressions.

use sqlx::PgPool;
use tracing::instrument;

use radar_common::{RadarError, RadarResult};
use radar_expr::{unwrap_json, wrap_json, Expression};

use crate::db::map_db_err;

/// CRUD over the `filters` table.
///
/// A filter is just a named, persisted AST fragment in the JSON wire
/// format; it has no coupling to file or source lifecycles.
pub struct FilterManager {
    pool: PgPool,
}

impl FilterManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, expression))]
    pub async fn add_filter(&self, name: &str, expression: &Expression) -> RadarResult<()> {
        let json = serde_json::to_string(&wrap_json(expression))?;
        sqlx::query("INSERT INTO filters (name, expression) VALUES ($1, $2)")
            .bind(name)
            .bind(json)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to insert filter", e))?;
        Ok(())
    }

    /// The stored filter, or `None` when absent.
    pub async fn get_filter(&self, name: &str) -> RadarResult<Option<Expression>> {
        let json: Option<String> =
            sqlx::query_scalar("SELECT expression FROM filters WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_db_err("Failed to load filter", e))?;

        match json {
            None => Ok(None),
            Some(json) => {
                let value: serde_json::Value = serde_json::from_str(&json)?;
                Ok(Some(unwrap_json(&value)?))
            }
        }
    }

    /// Replace a stored filter; absent names are a lookup error.
    #[instrument(skip(self, expression))]
    pub async fn update_filter(&self, name: &str, expression: &Expression) -> RadarResult<()> {
        let json = serde_json::to_string(&wrap_json(expression))?;
        let result = sqlx::query("UPDATE filters SET expression = $1 WHERE name = $2")
            .bind(json)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to update filter", e))?;

        if result.rows_affected() == 0 {
            return Err(RadarError::Lookup(format!("no filter named {:?}", name)));
        }
        Ok(())
    }

    /// Remove a stored filter, reporting whether it existed.
    #[instrument(skip(self))]
    pub async fn remove_filter(&self, name: &str) -> RadarResult<bool> {
        let result = sqlx::query("DELETE FROM filters WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to remove filter", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Names of all stored filters, ordered.
    pub async fn get_filter_names(&self) -> RadarResult<Vec<String>> {
        sqlx::query_scalar("SELECT name FROM filters ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err("Failed to list filters", e))
    }
}
