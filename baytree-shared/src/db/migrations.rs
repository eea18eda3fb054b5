/// Schema migrations
///
/// Migrations are embedded at compile time from `migrations/` at the
/// workspace root as reversible `{timestamp}_{name}.up.sql` /
/// `.down.sql` pairs.
///
/// # Schema
///
/// ```text
/// users ─┐                   ┌─ mentees ── questionnaires
///        └── associations ───┘                   │
///              (goals JSONB,        questionnaire_templates
///               questionnaire_id)
/// ```
///
/// # Example
///
/// ```no_run
/// use baytree_shared::db::migrations::{run_migrations, schema_status};
/// use baytree_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/baytree")).await?;
/// run_migrations(&pool).await?;
///
/// let status = schema_status(&pool).await?;
/// assert!(status.is_current());
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::{postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Tables the services read and write
pub const BAYTREE_TABLES: [&str; 5] = [
    "users",
    "mentees",
    "associations",
    "questionnaire_templates",
    "questionnaires",
];

/// Where the database stands relative to the embedded migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatus {
    /// Versions that have been applied successfully, ascending
    pub applied: Vec<i64>,

    /// Embedded versions not yet applied, ascending
    pub pending: Vec<i64>,

    /// Entries of [`BAYTREE_TABLES`] absent from the `public` schema
    pub missing_tables: Vec<String>,
}

impl SchemaStatus {
    /// True when nothing is pending and every table exists
    pub fn is_current(&self) -> bool {
        self.pending.is_empty() && self.missing_tables.is_empty()
    }

    /// Most recent applied version
    pub fn latest_version(&self) -> Option<i64> {
        self.applied.last().copied()
    }
}

/// Versions of the embedded up migrations, ascending
pub fn embedded_versions() -> Vec<i64> {
    let mut versions: Vec<i64> = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
        .collect();
    versions.sort_unstable();
    versions.dedup();
    versions
}

/// Applies all pending migrations
///
/// # Errors
///
/// Returns an error if a migration fails; that migration is rolled back
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(embedded = embedded_versions().len(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Compares the database with the embedded migrations and table list
pub async fn schema_status(pool: &PgPool) -> Result<SchemaStatus, sqlx::Error> {
    let present: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::TEXT FROM information_schema.tables
         WHERE table_schema = 'public'",
    )
    .fetch_all(pool)
    .await?;

    let applied: Vec<i64> = if present.iter().any(|t| t == "_sqlx_migrations") {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let pending = embedded_versions()
        .into_iter()
        .filter(|v| !applied.contains(v))
        .collect();

    let missing_tables = BAYTREE_TABLES
        .iter()
        .filter(|table| !present.iter().any(|p| p == *table))
        .map(|table| table.to_string())
        .collect();

    let status = SchemaStatus {
        applied,
        pending,
        missing_tables,
    };
    debug!(?status, "Schema status retrieved");

    Ok(status)
}

/// Creates the database if it is missing
///
/// Only needs `CREATEDB` when the database does not exist yet.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        return Ok(());
    }

    info!("Creating missing database");
    Postgres::create_database(database_url).await
}
