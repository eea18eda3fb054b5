/// Email and password checks
///
/// Unknown emails and wrong passwords are indistinguishable to the caller:
/// both yield `Ok(None)`. Users imported without an email share the
/// placeholder address and can never sign in with it.

use super::password::{verify_password, PasswordError};
use crate::models::user::{User, NO_EMAIL};
use crate::store::{Store, StoreError};

/// Error type for credential checks
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Returns the user owning `email` if `password` matches their hash
///
/// # Errors
///
/// Fails if the store is unreachable or the stored hash is malformed
pub async fn authenticate(
    store: &dyn Store,
    email: &str,
    password: &str,
) -> Result<Option<User>, LoginError> {
    if email.trim().eq_ignore_ascii_case(NO_EMAIL) {
        return Ok(None);
    }

    let Some(user) = store.find_user_by_email(email).await? else {
        tracing::debug!("Login attempt for unknown email");
        return Ok(None);
    };

    let password = password.to_string();
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::VerifyError(format!("Verification task failed: {}", e)))??;

    if !valid {
        tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
        return Ok(None);
    }

    Ok(Some(user))
}
