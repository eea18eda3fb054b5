/// Questionnaire and questionnaire-template models
///
/// A template describes the fields of a Views questionnaire; a questionnaire
/// holds one mentee's answers to a template, keyed by field ID.
///
/// The Views answer-submission path does not write these records; they are
/// kept for locally captured answers.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE questionnaire_templates (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     external_template_id VARCHAR(64) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     fields JSONB NOT NULL DEFAULT '[]'::jsonb,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE questionnaires (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     mentee_id UUID NOT NULL REFERENCES mentees(id),
///     template_id VARCHAR(64) NOT NULL,
///     answers JSONB NOT NULL DEFAULT '[]'::jsonb,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// A field definition on a questionnaire template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    /// Views field ID
    pub field_id: i32,

    /// Question text
    pub label: String,
}

/// Questionnaire template
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuestionnaireTemplate {
    pub id: Uuid,

    /// Views questionnaire template ID
    pub external_template_id: String,

    pub name: String,

    #[sqlx(json)]
    pub fields: Vec<TemplateField>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestionnaireTemplate {
    pub external_template_id: String,
    pub name: String,
    pub fields: Vec<TemplateField>,
}

/// One answered field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerValue {
    /// Views field ID
    pub field_id: i32,

    /// Answer text (empty when unanswered)
    #[serde(default)]
    pub value: String,
}

/// A mentee's answers to one questionnaire template
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Questionnaire {
    pub id: Uuid,

    /// Mentee whose profile the answers belong to
    pub mentee_id: Uuid,

    /// Views questionnaire template ID
    pub template_id: String,

    #[sqlx(json)]
    pub answers: Vec<AnswerValue>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Questionnaire {
    /// Looks up the answer to a field
    pub fn answer(&self, field_id: i32) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.field_id == field_id)
            .map(|a| a.value.as_str())
    }
}

/// Input for recording questionnaire answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestionnaire {
    pub mentee_id: Uuid,
    pub template_id: String,
    pub answers: Vec<AnswerValue>,
}

impl QuestionnaireTemplate {
    /// Creates a new template
    ///
    /// # Errors
    ///
    /// Returns an error if the Views template ID is already registered
    pub async fn create(
        pool: &PgPool,
        data: CreateQuestionnaireTemplate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, QuestionnaireTemplate>(
            r#"
            INSERT INTO questionnaire_templates (external_template_id, name, fields)
            VALUES ($1, $2, $3)
            RETURNING id, external_template_id, name, fields, created_at
            "#,
        )
        .bind(data.external_template_id)
        .bind(data.name)
        .bind(Json(data.fields))
        .fetch_one(pool)
        .await
    }

    /// Finds a template by its Views ID
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_template_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, QuestionnaireTemplate>(
            r#"
            SELECT id, external_template_id, name, fields, created_at
            FROM questionnaire_templates
            WHERE external_template_id = $1
            "#,
        )
        .bind(external_template_id)
        .fetch_optional(pool)
        .await
    }
}

impl Questionnaire {
    /// Records a set of answers
    pub async fn create(pool: &PgPool, data: CreateQuestionnaire) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Questionnaire>(
            r#"
            INSERT INTO questionnaires (mentee_id, template_id, answers)
            VALUES ($1, $2, $3)
            RETURNING id, mentee_id, template_id, answers, created_at, updated_at
            "#,
        )
        .bind(data.mentee_id)
        .bind(data.template_id)
        .bind(Json(data.answers))
        .fetch_one(pool)
        .await
    }

    /// Lists a mentee's questionnaires, newest first
    pub async fn list_for_mentee(
        pool: &PgPool,
        mentee_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Questionnaire>(
            r#"
            SELECT id, mentee_id, template_id, answers, created_at, updated_at
            FROM questionnaires
            WHERE mentee_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(mentee_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_lookup() {
        let questionnaire = Questionnaire {
            id: Uuid::new_v4(),
            mentee_id: Uuid::new_v4(),
            template_id: "12".to_string(),
            answers: vec![
                AnswerValue { field_id: 1, value: "Yes".to_string() },
                AnswerValue { field_id: 2, value: String::new() },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(questionnaire.answer(1), Some("Yes"));
        assert_eq!(questionnaire.answer(2), Some(""));
        assert_eq!(questionnaire.answer(3), None);
    }

    #[test]
    fn test_answer_value_defaults_to_empty() {
        let value: AnswerValue = serde_json::from_str(r#"{"field_id": 4}"#).unwrap();
        assert_eq!(value.value, "");
    }
}
