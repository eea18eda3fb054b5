/// Service wiring
///
/// Builds the store and the Views client from configuration and bundles the
/// services that share them.
///
/// # Example
///
/// ```no_run
/// use baytree_worker::{app, config::Config};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let report = app::run(config, CancellationToken::new()).await?;
/// println!("{} created, {} skipped", report.created, report.skipped);
/// # Ok(())
/// # }
/// ```

use crate::associations::AssociationManager;
use crate::config::{Config, JwtConfig, SyncConfig};
use crate::directory::DirectoryClient;
use crate::error::{Error, Result};
use crate::questionnaire::QuestionnaireBridge;
use crate::sync::{SyncEngine, SyncReport};
use baytree_shared::auth::{login, reset};
use baytree_shared::db::{migrations, pool};
use baytree_shared::models::user::User;
use baytree_shared::store::{PgStore, Store};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Services sharing one store and one Views client
pub struct Services {
    pub sync: SyncEngine,
    pub associations: AssociationManager,
    pub questionnaires: QuestionnaireBridge,
    store: Arc<dyn Store>,
    jwt: Option<JwtConfig>,
}

impl Services {
    /// Bundles services over an existing store and client
    pub fn new(
        store: Arc<dyn Store>,
        client: Arc<DirectoryClient>,
        sync_config: SyncConfig,
        jwt: Option<JwtConfig>,
    ) -> Self {
        Self {
            sync: SyncEngine::new(client.clone(), store.clone(), sync_config),
            associations: AssociationManager::new(store.clone()),
            questionnaires: QuestionnaireBridge::new(client, store.clone()),
            store,
            jwt,
        }
    }

    /// Connects to Postgres, applies migrations and builds the Views client
    ///
    /// The database is created first if the server does not have it yet.
    pub async fn connect(config: &Config) -> Result<Self> {
        migrations::ensure_database_exists(&config.database.url).await?;

        let db_config = pool::DatabaseConfig {
            max_connections: config.database.max_connections,
            ..pool::DatabaseConfig::from_url(config.database.url.clone())
        }
        .with_headroom_for(config.sync.concurrency);
        let pool = pool::create_pool(db_config).await?;
        migrations::run_migrations(&pool).await?;

        let schema = migrations::schema_status(&pool).await?;
        if !schema.is_current() {
            tracing::warn!(?schema, "Database schema differs from the embedded migrations");
        }

        let client = DirectoryClient::new(&config.views)?;

        Ok(Self::new(
            Arc::new(PgStore::new(pool)),
            Arc::new(client),
            config.sync.clone(),
            config.jwt.clone(),
        ))
    }

    /// Checks an email and password; `None` if they do not match a user
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        Ok(login::authenticate(&*self.store, email, password).await?)
    }

    /// Issues a password-reset token for the user with this email
    pub async fn issue_password_reset(&self, email: &str) -> Result<String> {
        let secret = self.reset_secret()?;
        Ok(reset::issue_reset_token(&*self.store, email, secret).await?)
    }

    /// Redeems a password-reset token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User> {
        let secret = self.reset_secret()?;
        Ok(reset::reset_password(&*self.store, token, new_password, secret).await?)
    }

    fn reset_secret(&self) -> Result<&str> {
        self.jwt
            .as_ref()
            .map(|jwt| jwt.secret.as_str())
            .ok_or(Error::ResetDisabled)
    }
}

/// Runs one full directory sync against the configured database
pub async fn run(config: Config, cancel: CancellationToken) -> Result<SyncReport> {
    let services = Services::connect(&config).await?;

    tracing::info!(base_url = %config.views.base_url, "Starting directory sync");
    let report = services.sync.sync_all(cancel).await?;

    Ok(report)
}
