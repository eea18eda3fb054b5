/// Credential handling for Baytree users
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`login`]: Email and password checks against the store
/// - [`reset`]: Single-use password-reset tokens (HS256 JWT)
///
/// # Example
///
/// ```
/// use baytree_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("admin123")?;
/// assert!(verify_password("admin123", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod login;
pub mod password;
pub mod reset;
