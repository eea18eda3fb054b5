/// Top-level worker error
///
/// Every service error converts into [`Error`] with `?`, so code that drives
/// several services (the binary, integration tests) can use one result type.

use crate::associations::AssociationError;
use crate::directory::DirectoryError;
use crate::questionnaire::BridgeError;
use crate::sync::SyncError;
use baytree_shared::auth::login::LoginError;
use baytree_shared::auth::reset::ResetError;
use baytree_shared::store::StoreError;

/// Worker result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Unified worker error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Association error: {0}")]
    Association(#[from] AssociationError),

    #[error("Questionnaire error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Login error: {0}")]
    Login(#[from] LoginError),

    #[error("Password reset error: {0}")]
    Reset(#[from] ResetError),

    /// Password resets need `JWT_SECRET`
    #[error("Password resets are disabled: JWT_SECRET is not set")]
    ResetDisabled,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
