//! Execution of translated select statements.
//!
//! The translator emits SQL with typed bind values; this module binds
//! them onto a sqlx query and decodes result rows dynamically, mapping
//! SQL NULLs and column types back into [`Value`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo, ValueRef};
use tracing::debug;
use uuid::Uuid;

use radar_common::{RadarError, RadarResult, Value};
use radar_query::{
    transform_attribute_query, transform_file_query, AttributeQuery, FileQuery, SelectStatement,
};

use crate::db::map_db_err;

/// One decoded result row, keyed by the query's fetch labels in select
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, Value)>,
}

impl ResultRow {
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }
}

/// Run a file query, returning the matching uuids.
pub async fn execute_file_query(pool: &PgPool, query: &FileQuery) -> RadarResult<Vec<Uuid>> {
    let statement = transform_file_query(query)?;
    let (sql, params) = statement.to_sql();
    debug!(sql = %sql, "Executing file query");

    let mut q = sqlx::query(&sql);
    for param in &params {
        q = bind_value(q, param)?;
    }
    let rows = q
        .fetch_all(pool)
        .await
        .map_err(|e| map_db_err("File query failed", e))?;

    rows.iter()
        .map(|row| {
            row.try_get::<Uuid, _>("uuid")
                .map_err(|e| RadarError::Database(format!("Failed to decode uuid: {}", e)))
        })
        .collect()
}

/// Run an attribute query, returning decoded rows.
pub async fn execute_attribute_query(
    pool: &PgPool,
    query: &AttributeQuery,
) -> RadarResult<Vec<ResultRow>> {
    let statement = transform_attribute_query(query)?;
    fetch_rows(pool, &statement).await
}

/// Run an arbitrary translated statement.
pub async fn fetch_rows(pool: &PgPool, statement: &SelectStatement) -> RadarResult<Vec<ResultRow>> {
    let (sql, params) = statement.to_sql();
    debug!(sql = %sql, "Executing attribute query");

    let mut q = sqlx::query(&sql);
    for param in &params {
        q = bind_value(q, param)?;
    }
    let rows = q
        .fetch_all(pool)
        .await
        .map_err(|e| map_db_err("Attribute query failed", e))?;

    rows.iter().map(decode_row).collect()
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> RadarResult<Query<'q, Postgres, PgArguments>> {
    Ok(match value {
        Value::Null => query.bind(None::<String>),
        Value::Long(v) => query.bind(*v),
        Value::Double(v) => query.bind(*v),
        Value::Str(s) => query.bind(s.clone()),
        Value::Bool(b) => query.bind(*b),
        Value::Date(d) => query.bind(*d),
        Value::Time(t) => query.bind(*t),
        Value::DateTime(dt) => query.bind(*dt),
        Value::Interval(duration) => {
            let days = duration.num_days();
            let microseconds = (*duration - chrono::Duration::days(days))
                .num_microseconds()
                .unwrap_or(0);
            query.bind(PgInterval {
                months: 0,
                days: days as i32,
                microseconds,
            })
        }
        Value::List(_) => {
            return Err(RadarError::Value(
                "list values cannot be bound as parameters".into(),
            ))
        }
    })
}

fn decode_row(row: &PgRow) -> RadarResult<ResultRow> {
    let mut columns = Vec::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        columns.push((column.name().to_string(), decode_column(row, idx)?));
    }
    Ok(ResultRow { columns })
}

/// Decode one column by its reported type; SQL NULL becomes
/// [`Value::Null`] whatever the type.
fn decode_column(row: &PgRow, idx: usize) -> RadarResult<Value> {
    let raw = row
        .try_get_raw(idx)
        .map_err(|e| RadarError::Database(format!("Failed to read column {}: {}", idx, e)))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = row.columns()[idx].type_info().name().to_string();
    let db_err =
        |e: sqlx::Error| RadarError::Database(format!("Failed to decode {}: {}", type_name, e));

    match type_name.as_str() {
        "INT2" => Ok(Value::Long(row.try_get::<i16, _>(idx).map_err(db_err)? as i64)),
        "INT4" => Ok(Value::Long(row.try_get::<i32, _>(idx).map_err(db_err)? as i64)),
        "INT8" => Ok(Value::Long(row.try_get::<i64, _>(idx).map_err(db_err)?)),
        "FLOAT4" => Ok(Value::Double(
            row.try_get::<f32, _>(idx).map_err(db_err)? as f64
        )),
        "FLOAT8" => Ok(Value::Double(row.try_get::<f64, _>(idx).map_err(db_err)?)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            Ok(Value::Str(row.try_get::<String, _>(idx).map_err(db_err)?))
        }
        "BOOL" => Ok(Value::Bool(row.try_get::<bool, _>(idx).map_err(db_err)?)),
        "DATE" => Ok(Value::Date(
            row.try_get::<NaiveDate, _>(idx).map_err(db_err)?,
        )),
        "TIME" => Ok(Value::Time(
            row.try_get::<NaiveTime, _>(idx).map_err(db_err)?,
        )),
        "TIMESTAMP" => Ok(Value::DateTime(
            row.try_get::<NaiveDateTime, _>(idx).map_err(db_err)?,
        )),
        "TIMESTAMPTZ" => Ok(Value::DateTime(
            row.try_get::<DateTime<Utc>, _>(idx)
                .map_err(db_err)?
                .naive_utc(),
        )),
        "UUID" => Ok(Value::Str(
            row.try_get::<Uuid, _>(idx).map_err(db_err)?.to_string(),
        )),
        other => Err(RadarError::Database(format!(
            "unsupported result column type: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_row_lookup() {
        let row = ResultRow {
            columns: vec![
                ("uuid".to_string(), Value::Str("abc".into())),
                ("xsize".to_string(), Value::Long(240)),
                ("missing".to_string(), Value::Null),
            ],
        };
        assert_eq!(row.get("xsize"), Some(&Value::Long(240)));
        assert_eq!(row.get("missing"), Some(&Value::Null));
        assert_eq!(row.get("nope"), None);
        assert_eq!(row.columns().len(), 3);
    }
}
