/// Database layer for Baytree
///
/// Connection pooling and the migration runner. The schema itself lives in
/// `migrations/` at the workspace root; models are in [`crate::models`].
///
/// # Example
///
/// ```no_run
/// use baytree_shared::db::migrations::run_migrations;
/// use baytree_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::from_url(std::env::var("DATABASE_URL")?)).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
