//! # Baytree Shared Library
//!
//! Storage layer and domain data shared by the Baytree services.
//!
//! ## Module Organization
//!
//! - `models`: Users, mentees, associations and questionnaires with their Postgres CRUD
//! - `store`: The `Store` persistence trait with Postgres and in-memory backends
//! - `db`: Connection pool and migrations
//! - `auth`: Password hashing and password-reset tokens

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the Baytree shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
