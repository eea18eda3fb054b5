/// Database models for Baytree
///
/// This module contains the domain records and their Postgres CRUD operations.
///
/// # Models
///
/// - `user`: Staff and volunteer accounts imported from Views
/// - `mentee`: Participants imported from Views
/// - `association`: Mentor–mentee pairings with goals and questionnaire linkage
/// - `questionnaire`: Questionnaire templates and locally recorded answers
///
/// Most callers go through [`crate::store::Store`] rather than these
/// functions directly.

pub mod association;
pub mod mentee;
pub mod questionnaire;
pub mod user;
