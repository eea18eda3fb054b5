/// In-process [`Store`] for tests and dry runs
///
/// Mirrors the Postgres constraints: unique external IDs for users and
/// mentees, one active association per pair, associations may only
/// reference existing users and mentees, and questionnaire IDs fit their
/// column.
///
/// Writes for selected external IDs can be made to fail, which lets tests
/// exercise the per-record error handling of the directory sync.
///
/// # Example
///
/// ```
/// use baytree_shared::store::{MemoryStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// assert!(store.find_user_by_external_id("1").await?.is_none());
/// # Ok(())
/// # }
/// ```

use super::{Store, StoreError, StoreResult};
use crate::models::association::{
    Association, CreateAssociation, Goal, ACTIVE_PAIR_CONSTRAINT, QUESTIONNAIRE_ID_MAX_LEN,
};
use crate::models::mentee::{CreateMentee, Mentee};
use crate::models::questionnaire::{
    CreateQuestionnaire, CreateQuestionnaireTemplate, Questionnaire, QuestionnaireTemplate,
};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    mentees: Vec<Mentee>,
    associations: Vec<Association>,
    templates: Vec<QuestionnaireTemplate>,
    questionnaires: Vec<Questionnaire>,
    failing_external_ids: HashSet<String>,
}

impl Tables {
    fn check_writable(&self, external_id: Option<&str>) -> StoreResult<()> {
        match external_id {
            Some(id) if self.failing_external_ids.contains(id) => Err(StoreError::Database(
                sqlx::Error::Protocol(format!("simulated write failure for {id}")),
            )),
            _ => Ok(()),
        }
    }

    fn association_mut(&mut self, id: Uuid) -> StoreResult<&mut Association> {
        self.associations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::not_found("Association", id))
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert carrying this external ID fail
    pub async fn fail_writes_for(&self, external_id: impl Into<String>) {
        self.tables
            .lock()
            .await
            .failing_external_ids
            .insert(external_id.into());
    }

    /// Snapshot of all users, in insertion order
    pub async fn users(&self) -> Vec<User> {
        self.tables.lock().await.users.clone()
    }

    /// Snapshot of all mentees, in insertion order
    pub async fn mentees(&self) -> Vec<Mentee> {
        self.tables.lock().await.mentees.clone()
    }

    /// Snapshot of all associations, in insertion order
    pub async fn associations(&self) -> Vec<Association> {
        self.tables.lock().await.associations.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        tables.check_writable(data.external_id.as_deref())?;

        if let Some(external_id) = data.external_id.as_deref() {
            if tables
                .users
                .iter()
                .any(|u| u.external_id.as_deref() == Some(external_id))
            {
                return Err(StoreError::Duplicate {
                    constraint: "users_external_id_key".to_string(),
                });
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            external_id: data.external_id,
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            activity_status: data.activity_status,
            reset_token: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn set_reset_token(&self, user_id: Uuid, token: Option<&str>) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::not_found("User", user_id))?;

        user.reset_token = token.map(str::to_string);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn replace_credentials(
        &self,
        user_id: Uuid,
        expected_token: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.reset_token.as_deref() == Some(expected_token))
        else {
            return Ok(None);
        };

        user.password_hash = password_hash.to_string();
        user.reset_token = None;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn find_mentee(&self, id: Uuid) -> StoreResult<Option<Mentee>> {
        let tables = self.tables.lock().await;
        Ok(tables.mentees.iter().find(|m| m.id == id).cloned())
    }

    async fn find_mentee_by_external_id(&self, external_id: &str) -> StoreResult<Option<Mentee>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .mentees
            .iter()
            .find(|m| m.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert_mentee(&self, data: CreateMentee) -> StoreResult<Mentee> {
        let mut tables = self.tables.lock().await;
        tables.check_writable(data.external_id.as_deref())?;

        if let Some(external_id) = data.external_id.as_deref() {
            if tables
                .mentees
                .iter()
                .any(|m| m.external_id.as_deref() == Some(external_id))
            {
                return Err(StoreError::Duplicate {
                    constraint: "mentees_external_id_key".to_string(),
                });
            }
        }

        let mentee = Mentee {
            id: Uuid::new_v4(),
            external_id: data.external_id,
            first_name: data.first_name,
            last_name: data.last_name,
            date_of_birth: data.date_of_birth,
            age: data.age,
            created_at: Utc::now(),
        };
        tables.mentees.push(mentee.clone());
        Ok(mentee)
    }

    async fn find_association(&self, id: Uuid) -> StoreResult<Option<Association>> {
        let tables = self.tables.lock().await;
        Ok(tables.associations.iter().find(|a| a.id == id).cloned())
    }

    async fn find_active_association(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> StoreResult<Option<Association>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .associations
            .iter()
            .find(|a| a.is_active && a.mentor_id == mentor_id && a.mentee_id == mentee_id)
            .cloned())
    }

    async fn find_association_for_pair(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> StoreResult<Option<Association>> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<&Association> = tables
            .associations
            .iter()
            .filter(|a| a.mentor_id == mentor_id && a.mentee_id == mentee_id)
            .collect();

        // Active first, then newest
        matching.sort_by(|a, b| {
            b.is_active
                .cmp(&a.is_active)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(matching.first().map(|a| (*a).clone()))
    }

    async fn insert_association(&self, data: CreateAssociation) -> StoreResult<Association> {
        let mut tables = self.tables.lock().await;

        if !tables.users.iter().any(|u| u.id == data.mentor_id) {
            return Err(StoreError::Constraint("associations_mentor_id_fkey".to_string()));
        }
        if !tables.mentees.iter().any(|m| m.id == data.mentee_id) {
            return Err(StoreError::Constraint("associations_mentee_id_fkey".to_string()));
        }
        if tables
            .associations
            .iter()
            .any(|a| a.is_active && a.mentor_id == data.mentor_id && a.mentee_id == data.mentee_id)
        {
            return Err(StoreError::Duplicate {
                constraint: ACTIVE_PAIR_CONSTRAINT.to_string(),
            });
        }

        let now = Utc::now();
        let association = Association {
            id: Uuid::new_v4(),
            mentor_id: data.mentor_id,
            mentee_id: data.mentee_id,
            is_active: true,
            goals: Vec::new(),
            questionnaire_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.associations.push(association.clone());
        Ok(association)
    }

    async fn list_associations_for_mentor(&self, mentor_id: Uuid) -> StoreResult<Vec<Association>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .associations
            .iter()
            .filter(|a| a.mentor_id == mentor_id)
            .cloned()
            .collect())
    }

    async fn append_goal(&self, association_id: Uuid, goal: Goal) -> StoreResult<Association> {
        let mut tables = self.tables.lock().await;
        let association = tables.association_mut(association_id)?;

        association.goals.push(goal);
        association.updated_at = Utc::now();
        Ok(association.clone())
    }

    async fn set_questionnaire_id(
        &self,
        association_id: Uuid,
        questionnaire_id: &str,
    ) -> StoreResult<Association> {
        if questionnaire_id.chars().count() > QUESTIONNAIRE_ID_MAX_LEN {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "value too long for type character varying({QUESTIONNAIRE_ID_MAX_LEN})"
            ))));
        }

        let mut tables = self.tables.lock().await;
        let association = tables.association_mut(association_id)?;

        association.questionnaire_id = Some(questionnaire_id.to_string());
        association.updated_at = Utc::now();
        Ok(association.clone())
    }

    async fn insert_questionnaire_template(
        &self,
        data: CreateQuestionnaireTemplate,
    ) -> StoreResult<QuestionnaireTemplate> {
        let mut tables = self.tables.lock().await;

        if tables
            .templates
            .iter()
            .any(|t| t.external_template_id == data.external_template_id)
        {
            return Err(StoreError::Duplicate {
                constraint: "questionnaire_templates_external_template_id_key".to_string(),
            });
        }

        let template = QuestionnaireTemplate {
            id: Uuid::new_v4(),
            external_template_id: data.external_template_id,
            name: data.name,
            fields: data.fields,
            created_at: Utc::now(),
        };
        tables.templates.push(template.clone());
        Ok(template)
    }

    async fn find_questionnaire_template(
        &self,
        external_template_id: &str,
    ) -> StoreResult<Option<QuestionnaireTemplate>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .templates
            .iter()
            .find(|t| t.external_template_id == external_template_id)
            .cloned())
    }

    async fn insert_questionnaire(&self, data: CreateQuestionnaire) -> StoreResult<Questionnaire> {
        let mut tables = self.tables.lock().await;

        if !tables.mentees.iter().any(|m| m.id == data.mentee_id) {
            return Err(StoreError::Constraint("questionnaires_mentee_id_fkey".to_string()));
        }

        let now = Utc::now();
        let questionnaire = Questionnaire {
            id: Uuid::new_v4(),
            mentee_id: data.mentee_id,
            template_id: data.template_id,
            answers: data.answers,
            created_at: now,
            updated_at: now,
        };
        tables.questionnaires.push(questionnaire.clone());
        Ok(questionnaire)
    }

    async fn list_questionnaires_for_mentee(
        &self,
        mentee_id: Uuid,
    ) -> StoreResult<Vec<Questionnaire>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questionnaires
            .iter()
            .rev()
            .filter(|q| q.mentee_id == mentee_id)
            .cloned()
            .collect())
    }
}
