/// Persistence seam for the sync engine and the domain services
///
/// Everything above the storage layer talks to a [`Store`]. Two backends are
/// provided:
///
/// - [`PgStore`]: Postgres, delegating to the model CRUD in [`crate::models`]
/// - [`MemoryStore`]: in-process, enforcing the same uniqueness rules; used
///   by tests and dry runs
///
/// # Uniqueness
///
/// Callers check for existing rows before inserting, but those checks are
/// not atomic with the insert. The store's constraints are what actually
/// keep the data consistent:
///
/// - `users.external_id` and `mentees.external_id` are unique when present
/// - at most one active association exists per `(mentor_id, mentee_id)`
///
/// A violated uniqueness constraint surfaces as [`StoreError::Duplicate`];
/// a dangling reference as [`StoreError::Constraint`].

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::association::{Association, CreateAssociation, Goal};
use crate::models::mentee::{CreateMentee, Mentee};
use crate::models::questionnaire::{
    CreateQuestionnaire, CreateQuestionnaireTemplate, Questionnaire, QuestionnaireTemplate,
};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Duplicate record violates {constraint}")]
    Duplicate { constraint: String },

    /// The row to update does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Any other constraint violation (e.g. a dangling foreign key)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    /// Returns true if the error is a uniqueness violation
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }

    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                if db_err.is_unique_violation() {
                    StoreError::Duplicate { constraint }
                } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    StoreError::Constraint(constraint)
                } else {
                    StoreError::Database(sqlx::Error::Database(db_err))
                }
            }
            other => StoreError::Database(other),
        }
    }
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Backend-agnostic persistence for users, mentees, associations and
/// questionnaires
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Finds a user by local ID
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Finds a user by Views `PersonID`
    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>>;

    /// Finds a user by email (oldest match)
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds the user holding a reset token
    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>>;

    /// Inserts a user; `Duplicate` if the external ID is taken
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User>;

    /// Stores or clears a user's reset token
    async fn set_reset_token(&self, user_id: Uuid, token: Option<&str>) -> StoreResult<User>;

    /// Writes a new password hash and clears the reset token, provided the
    /// user still holds `expected_token`; `None` otherwise
    async fn replace_credentials(
        &self,
        user_id: Uuid,
        expected_token: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>>;

    // Mentees

    /// Finds a mentee by local ID
    async fn find_mentee(&self, id: Uuid) -> StoreResult<Option<Mentee>>;

    /// Finds a mentee by Views `PersonID`
    async fn find_mentee_by_external_id(&self, external_id: &str) -> StoreResult<Option<Mentee>>;

    /// Inserts a mentee; `Duplicate` if the external ID is taken
    async fn insert_mentee(&self, data: CreateMentee) -> StoreResult<Mentee>;

    // Associations

    /// Finds an association by ID
    async fn find_association(&self, id: Uuid) -> StoreResult<Option<Association>>;

    /// Finds the active association of a pair
    async fn find_active_association(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> StoreResult<Option<Association>>;

    /// Finds the association of a pair, preferring the active one
    async fn find_association_for_pair(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> StoreResult<Option<Association>>;

    /// Inserts an active association; `Duplicate` if the pair is already active
    async fn insert_association(&self, data: CreateAssociation) -> StoreResult<Association>;

    /// Lists a mentor's associations, oldest first
    async fn list_associations_for_mentor(&self, mentor_id: Uuid) -> StoreResult<Vec<Association>>;

    /// Appends a goal to the end of an association's goal list
    async fn append_goal(&self, association_id: Uuid, goal: Goal) -> StoreResult<Association>;

    /// Records the Views questionnaire-instance ID on an association
    async fn set_questionnaire_id(
        &self,
        association_id: Uuid,
        questionnaire_id: &str,
    ) -> StoreResult<Association>;

    // Questionnaires

    /// Registers a questionnaire template
    async fn insert_questionnaire_template(
        &self,
        data: CreateQuestionnaireTemplate,
    ) -> StoreResult<QuestionnaireTemplate>;

    /// Finds a template by its Views ID
    async fn find_questionnaire_template(
        &self,
        external_template_id: &str,
    ) -> StoreResult<Option<QuestionnaireTemplate>>;

    /// Records a mentee's answers
    async fn insert_questionnaire(&self, data: CreateQuestionnaire) -> StoreResult<Questionnaire>;

    /// Lists a mentee's questionnaires, newest first
    async fn list_questionnaires_for_mentee(&self, mentee_id: Uuid)
        -> StoreResult<Vec<Questionnaire>>;
}
