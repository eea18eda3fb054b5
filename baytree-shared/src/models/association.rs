/// Association model and database operations
///
/// An association is a mentor–mentee pairing. It carries the pair's goals
/// (an ordered, append-only list) and, once a questionnaire has been assigned
/// in Views, the external questionnaire-instance ID.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE associations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     mentor_id UUID NOT NULL REFERENCES users(id),
///     mentee_id UUID NOT NULL REFERENCES mentees(id),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     goals JSONB NOT NULL DEFAULT '[]'::jsonb,
///     questionnaire_id VARCHAR(64),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX associations_active_pair_key
///     ON associations (mentor_id, mentee_id) WHERE is_active;
/// ```
///
/// Goals are appended with `goals || $2::jsonb`, so the array order in the
/// database is always insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const ASSOCIATION_COLUMNS: &str =
    "id, mentor_id, mentee_id, is_active, goals, questionnaire_id, created_at, updated_at";

/// Name of the index enforcing one active association per pair
pub const ACTIVE_PAIR_CONSTRAINT: &str = "associations_active_pair_key";

/// Width of the `questionnaire_id` column
pub const QUESTIONNAIRE_ID_MAX_LEN: usize = 64;

/// A goal tracked for a mentor–mentee pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Goal description
    pub name: String,

    /// Whether the goal has been completed
    pub is_complete: bool,
}

impl Goal {
    /// Creates a new, incomplete goal
    pub fn new(name: impl Into<String>) -> Self {
        Goal {
            name: name.into(),
            is_complete: false,
        }
    }
}

/// Questionnaire linkage of an association
///
/// There is no transition back to `Unassigned`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionnaireState<'a> {
    /// No questionnaire has been assigned in Views yet
    Unassigned,

    /// A questionnaire instance was created in Views
    Assigned(&'a str),
}

/// Association model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Association {
    /// Unique association ID (UUID v4)
    pub id: Uuid,

    /// Mentor (user) ID
    pub mentor_id: Uuid,

    /// Mentee ID
    pub mentee_id: Uuid,

    /// Whether the pairing is active
    pub is_active: bool,

    /// Goals in insertion order
    #[sqlx(json)]
    pub goals: Vec<Goal>,

    /// Views questionnaire-instance ID, once assigned
    pub questionnaire_id: Option<String>,

    /// When the association was created
    pub created_at: DateTime<Utc>,

    /// When the association was last updated
    pub updated_at: DateTime<Utc>,
}

impl Association {
    /// Current questionnaire linkage
    pub fn questionnaire_state(&self) -> QuestionnaireState<'_> {
        match self.questionnaire_id.as_deref() {
            Some(id) => QuestionnaireState::Assigned(id),
            None => QuestionnaireState::Unassigned,
        }
    }
}

/// Input for creating a new association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssociation {
    /// Mentor (user) ID
    pub mentor_id: Uuid,

    /// Mentee ID
    pub mentee_id: Uuid,
}

impl Association {
    /// Creates a new active association with no goals
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An active association already exists for the pair
    ///   (`associations_active_pair_key` violation)
    /// - Mentor or mentee doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateAssociation) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO associations (mentor_id, mentee_id, is_active)
             VALUES ($1, $2, TRUE)
             RETURNING {ASSOCIATION_COLUMNS}"
        );

        sqlx::query_as::<_, Association>(&query)
            .bind(data.mentor_id)
            .bind(data.mentee_id)
            .fetch_one(pool)
            .await
    }

    /// Finds an association by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ASSOCIATION_COLUMNS} FROM associations WHERE id = $1");

        sqlx::query_as::<_, Association>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the active association for a pair
    pub async fn find_active_for_pair(
        pool: &PgPool,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSOCIATION_COLUMNS} FROM associations
             WHERE mentor_id = $1 AND mentee_id = $2 AND is_active"
        );

        sqlx::query_as::<_, Association>(&query)
            .bind(mentor_id)
            .bind(mentee_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the association for a pair, preferring the active one
    ///
    /// Falls back to the most recently created inactive association.
    pub async fn find_for_pair(
        pool: &PgPool,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSOCIATION_COLUMNS} FROM associations
             WHERE mentor_id = $1 AND mentee_id = $2
             ORDER BY is_active DESC, created_at DESC
             LIMIT 1"
        );

        sqlx::query_as::<_, Association>(&query)
            .bind(mentor_id)
            .bind(mentee_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists all associations of a mentor, oldest first
    pub async fn list_for_mentor(pool: &PgPool, mentor_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSOCIATION_COLUMNS} FROM associations
             WHERE mentor_id = $1
             ORDER BY created_at ASC"
        );

        sqlx::query_as::<_, Association>(&query)
            .bind(mentor_id)
            .fetch_all(pool)
            .await
    }

    /// Appends a goal to the end of the goal list in a single statement
    ///
    /// # Returns
    ///
    /// The updated association, None if it doesn't exist
    pub async fn append_goal(
        pool: &PgPool,
        id: Uuid,
        goal: Goal,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE associations
             SET goals = goals || $2::jsonb, updated_at = NOW()
             WHERE id = $1
             RETURNING {ASSOCIATION_COLUMNS}"
        );

        sqlx::query_as::<_, Association>(&query)
            .bind(id)
            .bind(Json(vec![goal]))
            .fetch_optional(pool)
            .await
    }

    /// Records the Views questionnaire-instance ID
    pub async fn set_questionnaire_id(
        pool: &PgPool,
        id: Uuid,
        questionnaire_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE associations
             SET questionnaire_id = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {ASSOCIATION_COLUMNS}"
        );

        sqlx::query_as::<_, Association>(&query)
            .bind(id)
            .bind(questionnaire_id)
            .fetch_optional(pool)
            .await
    }
}
