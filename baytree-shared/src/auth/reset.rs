/// Password-reset tokens
///
/// A reset token is a short-lived HS256 JWT naming the user. The token is
/// also stored on the user row, so it can only be redeemed once: redeeming
/// it replaces the password hash and clears the stored token in the same
/// write.
///
/// Delivering the token to the user (email) is not handled here.
///
/// # Claims
///
/// - `sub`: user ID
/// - `iss`: always "baytree"
/// - `iat` / `nbf` / `exp`: validity window (20 minutes)
/// - `jti`: random token ID
/// - `purpose`: always "password_reset"
///
/// # Example
///
/// ```no_run
/// use baytree_shared::auth::reset::{issue_reset_token, reset_password};
/// use baytree_shared::store::MemoryStore;
///
/// # async fn example(store: MemoryStore) -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "reset-secret-at-least-32-bytes-long";
/// let token = issue_reset_token(&store, "mentor@example.org", secret).await?;
/// reset_password(&store, &token, "new-password", secret).await?;
/// # Ok(())
/// # }
/// ```

use super::password::{hash_password, PasswordError};
use crate::models::user::{User, NO_EMAIL};
use crate::store::{Store, StoreError};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token issuer
pub const ISSUER: &str = "baytree";

/// Value of the `purpose` claim
pub const RESET_PURPOSE: &str = "password_reset";

/// How long a reset token stays valid
pub fn reset_token_lifetime() -> Duration {
    Duration::minutes(20)
}

/// Error type for password-reset operations
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// No user has this email
    #[error("No user with email {0}")]
    UnknownEmail(String),

    /// Token failed signature, issuer or purpose checks
    #[error("Invalid reset token: {0}")]
    InvalidToken(String),

    /// Token is past its expiry
    #[error("Reset token has expired")]
    Expired,

    /// Token is valid but no longer stored on any user
    #[error("Reset token has already been used")]
    AlreadyUsed,

    /// Token could not be signed
    #[error("Failed to create reset token: {0}")]
    Signing(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reset-token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub purpose: String,
}

impl ResetClaims {
    /// Claims for a user, valid from now for the standard lifetime
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + reset_token_lifetime()).timestamp(),
            jti: Uuid::new_v4(),
            purpose: RESET_PURPOSE.to_string(),
        }
    }
}

/// Signs reset claims
pub fn create_reset_token(claims: &ResetClaims, secret: &str) -> Result<String, ResetError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ResetError::Signing(e.to_string()))
}

/// Verifies signature, issuer, validity window and purpose
pub fn validate_reset_token(token: &str, secret: &str) -> Result<ResetClaims, ResetError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let data = decode::<ResetClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ResetError::Expired,
            _ => ResetError::InvalidToken(e.to_string()),
        })?;

    if data.claims.purpose != RESET_PURPOSE {
        return Err(ResetError::InvalidToken(format!(
            "unexpected purpose {}",
            data.claims.purpose
        )));
    }

    Ok(data.claims)
}

/// Issues a reset token for the user with this email and stores it on the user
///
/// Any previously issued token for the user stops working. The placeholder
/// address given to imported users without an email never matches.
pub async fn issue_reset_token<S>(store: &S, email: &str, secret: &str) -> Result<String, ResetError>
where
    S: Store + ?Sized,
{
    if email.trim().eq_ignore_ascii_case(NO_EMAIL) {
        return Err(ResetError::UnknownEmail(email.to_string()));
    }

    let user = store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ResetError::UnknownEmail(email.to_string()))?;

    let token = create_reset_token(&ResetClaims::new(user.id), secret)?;
    store.set_reset_token(user.id, Some(&token)).await?;

    tracing::info!(user_id = %user.id, "Issued password reset token");
    Ok(token)
}

/// Redeems a reset token, replacing the user's password
///
/// The new hash is written and the token cleared in one conditional store
/// call, so of two concurrent redemptions only one succeeds.
pub async fn reset_password<S>(
    store: &S,
    token: &str,
    new_password: &str,
    secret: &str,
) -> Result<User, ResetError>
where
    S: Store + ?Sized,
{
    let claims = validate_reset_token(token, secret)?;

    let user = store
        .find_user_by_reset_token(token)
        .await?
        .filter(|u| u.id == claims.sub)
        .ok_or(ResetError::AlreadyUsed)?;

    let password = new_password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))??;

    let updated = store
        .replace_credentials(user.id, token, &password_hash)
        .await?
        .ok_or(ResetError::AlreadyUsed)?;

    tracing::info!(user_id = %updated.id, "Password reset completed");
    Ok(updated)
}
