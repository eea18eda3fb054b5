/// Postgres-backed [`Store`]
///
/// A thin adapter over the model CRUD functions. Uniqueness is enforced by
/// the indexes created in the initial migration.
///
/// # Example
///
/// ```no_run
/// use baytree_shared::db::pool::{create_pool, DatabaseConfig};
/// use baytree_shared::store::{PgStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgStore::new(pool);
///
/// if let Some(user) = store.find_user_by_external_id("1042").await? {
///     println!("Already imported: {}", user.id);
/// }
/// # Ok(())
/// # }
/// ```

use super::{Store, StoreError, StoreResult};
use crate::models::association::{Association, CreateAssociation, Goal};
use crate::models::mentee::{CreateMentee, Mentee};
use crate::models::questionnaire::{
    CreateQuestionnaire, CreateQuestionnaireTemplate, Questionnaire, QuestionnaireTemplate,
};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps a connection pool
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_external_id(&self.pool, external_id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_reset_token(&self.pool, token).await?)
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn set_reset_token(&self, user_id: Uuid, token: Option<&str>) -> StoreResult<User> {
        User::set_reset_token(&self.pool, user_id, token)
            .await?
            .ok_or_else(|| StoreError::not_found("User", user_id))
    }

    async fn replace_credentials(
        &self,
        user_id: Uuid,
        expected_token: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        Ok(User::replace_credentials(&self.pool, user_id, expected_token, password_hash).await?)
    }

    async fn find_mentee(&self, id: Uuid) -> StoreResult<Option<Mentee>> {
        Ok(Mentee::find_by_id(&self.pool, id).await?)
    }

    async fn find_mentee_by_external_id(&self, external_id: &str) -> StoreResult<Option<Mentee>> {
        Ok(Mentee::find_by_external_id(&self.pool, external_id).await?)
    }

    async fn insert_mentee(&self, data: CreateMentee) -> StoreResult<Mentee> {
        Ok(Mentee::create(&self.pool, data).await?)
    }

    async fn find_association(&self, id: Uuid) -> StoreResult<Option<Association>> {
        Ok(Association::find_by_id(&self.pool, id).await?)
    }

    async fn find_active_association(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> StoreResult<Option<Association>> {
        Ok(Association::find_active_for_pair(&self.pool, mentor_id, mentee_id).await?)
    }

    async fn find_association_for_pair(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> StoreResult<Option<Association>> {
        Ok(Association::find_for_pair(&self.pool, mentor_id, mentee_id).await?)
    }

    async fn insert_association(&self, data: CreateAssociation) -> StoreResult<Association> {
        Ok(Association::create(&self.pool, data).await?)
    }

    async fn list_associations_for_mentor(&self, mentor_id: Uuid) -> StoreResult<Vec<Association>> {
        Ok(Association::list_for_mentor(&self.pool, mentor_id).await?)
    }

    async fn append_goal(&self, association_id: Uuid, goal: Goal) -> StoreResult<Association> {
        Association::append_goal(&self.pool, association_id, goal)
            .await?
            .ok_or_else(|| StoreError::not_found("Association", association_id))
    }

    async fn set_questionnaire_id(
        &self,
        association_id: Uuid,
        questionnaire_id: &str,
    ) -> StoreResult<Association> {
        Association::set_questionnaire_id(&self.pool, association_id, questionnaire_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Association", association_id))
    }

    async fn insert_questionnaire_template(
        &self,
        data: CreateQuestionnaireTemplate,
    ) -> StoreResult<QuestionnaireTemplate> {
        Ok(QuestionnaireTemplate::create(&self.pool, data).await?)
    }

    async fn find_questionnaire_template(
        &self,
        external_template_id: &str,
    ) -> StoreResult<Option<QuestionnaireTemplate>> {
        Ok(QuestionnaireTemplate::find_by_external_id(&self.pool, external_template_id).await?)
    }

    async fn insert_questionnaire(&self, data: CreateQuestionnaire) -> StoreResult<Questionnaire> {
        Ok(Questionnaire::create(&self.pool, data).await?)
    }

    async fn list_questionnaires_for_mentee(
        &self,
        mentee_id: Uuid,
    ) -> StoreResult<Vec<Questionnaire>> {
        Ok(Questionnaire::list_for_mentee(&self.pool, mentee_id).await?)
    }
}
