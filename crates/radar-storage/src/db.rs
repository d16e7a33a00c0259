//! Translation of database errors into the domain taxonomy.

use radar_common::RadarError;

/// PostgreSQL SQLSTATE for a unique-constraint violation.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for a foreign-key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map a sqlx error to the domain error kinds.
///
/// Constraint violations become `DuplicateEntry`/`Integrity` so callers
/// never see raw database errors for the contracts they rely on.
pub fn map_db_err(context: &str, err: sqlx::Error) -> RadarError {
    if let Some(db_err) = err.as_database_error() {
        if let Some(code) = db_err.code() {
            match code.as_ref() {
                UNIQUE_VIOLATION => {
                    return RadarError::DuplicateEntry(format!(
                        "{}: {}",
                        context,
                        db_err.message()
                    ))
                }
                FOREIGN_KEY_VIOLATION => {
                    return RadarError::Integrity(format!("{}: {}", context, db_err.message()))
                }
                _ => {}
            }
        }
    }
    RadarError::Database(format!("{}: {}", context, err))
}
