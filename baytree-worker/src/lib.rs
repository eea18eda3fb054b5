//! # Baytree Worker Library
//!
//! Keeps the Baytree mentoring database in step with the Views directory
//! and exchanges questionnaires with it.
//!
//! ## Modules
//!
//! - `directory`: Views REST client (contact searches, questionnaire posts)
//! - `sync`: Imports Views contacts as users and mentees
//! - `associations`: Mentor–mentee pairings and their goals
//! - `questionnaire`: XML questionnaire assignment and answer submission
//! - `app`: Wires the services to Postgres and Views
//!
//! ## Example
//!
//! ```no_run
//! use baytree_shared::store::MemoryStore;
//! use baytree_worker::associations::AssociationManager;
//! use std::sync::Arc;
//!
//! let manager = AssociationManager::new(Arc::new(MemoryStore::new()));
//! ```

pub mod app;
pub mod associations;
pub mod config;
pub mod directory;
pub mod error;
pub mod questionnaire;
pub mod sync;
