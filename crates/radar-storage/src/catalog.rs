//! Metadata catalog using PostgreSQL.

use sqlx::{postgres::PgPoolOptions, PgPool};

use radar_common::{RadarError, RadarResult};

/// Database connection pool and schema management.
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    /// Create a new catalog connection from database URL.
    pub async fn connect(database_url: &str) -> RadarResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| RadarError::Database(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the schema, idempotently.
    pub async fn migrate(&self) -> RadarResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| RadarError::Database(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }
}

/// Database schema SQL.
///
/// `files` denormalizes the indexed `what` triple; the full attribute
/// tree lives in `nodes`/`attribute_values`. `(hash, source_id)` is the
/// duplicate-detection constraint.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(128) NOT NULL UNIQUE,
    parent VARCHAR(128)
);

CREATE TABLE IF NOT EXISTS source_kvs (
    source_id BIGINT NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    key VARCHAR(64) NOT NULL,
    value TEXT NOT NULL,

    UNIQUE(source_id, key)
);

CREATE TABLE IF NOT EXISTS files (
    id BIGSERIAL PRIMARY KEY,
    uuid UUID NOT NULL UNIQUE,
    source_id BIGINT NOT NULL REFERENCES sources(id),
    hash VARCHAR(40) NOT NULL,
    stored_date DATE NOT NULL,
    stored_time TIME NOT NULL,
    what_object VARCHAR(64),
    what_date DATE,
    what_time TIME,
    size BIGINT NOT NULL,
    content_ref BIGINT,

    UNIQUE(hash, source_id)
);

CREATE INDEX IF NOT EXISTS idx_files_stored ON files(stored_date, stored_time);
CREATE INDEX IF NOT EXISTS idx_files_what_object ON files(what_object);
CREATE INDEX IF NOT EXISTS idx_files_what_date ON files(what_date);

CREATE TABLE IF NOT EXISTS nodes (
    id BIGSERIAL PRIMARY KEY,
    file_id BIGINT NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    parent_id BIGINT REFERENCES nodes(id) ON DELETE CASCADE,
    name VARCHAR(256) NOT NULL,
    kind SMALLINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_file ON nodes(file_id);
CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name);
CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);

CREATE TABLE IF NOT EXISTS attribute_values (
    node_id BIGINT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    value_long BIGINT,
    value_double DOUBLE PRECISION,
    value_string TEXT,
    value_bool BOOLEAN,
    value_date DATE,
    value_time TIME
);

CREATE INDEX IF NOT EXISTS idx_attribute_values_node ON attribute_values(node_id);

CREATE TABLE IF NOT EXISTS filters (
    name VARCHAR(128) PRIMARY KEY,
    expression TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS file_content (
    file_id BIGINT PRIMARY KEY REFERENCES files(id) ON DELETE CASCADE,
    data BYTEA NOT NULL
);
"#;
