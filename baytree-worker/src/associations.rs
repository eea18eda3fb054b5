/// Association Manager
///
/// Pairs mentors with mentees and keeps each pairing's goal list. A pair
/// has at most one active association; goals are only ever appended.
///
/// # Example
///
/// ```no_run
/// use baytree_shared::store::MemoryStore;
/// use baytree_worker::associations::AssociationManager;
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// # async fn example(mentor_id: Uuid, mentee_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let manager = AssociationManager::new(Arc::new(MemoryStore::new()));
///
/// manager.create_association(mentor_id, mentee_id).await?;
/// manager.add_goal(mentor_id, mentee_id, "Apply to college").await?;
///
/// for goal in manager.list_goals(mentor_id, mentee_id).await? {
///     println!("{} (done: {})", goal.name, goal.is_complete);
/// }
/// # Ok(())
/// # }
/// ```

use baytree_shared::models::association::{Association, CreateAssociation, Goal};
use baytree_shared::store::{Store, StoreError};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Association error types
#[derive(Debug, thiserror::Error)]
pub enum AssociationError {
    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The pair has no association
    #[error("No association between mentor {mentor_id} and mentee {mentee_id}")]
    NoAssociation { mentor_id: Uuid, mentee_id: Uuid },

    /// The pair already has an active association
    #[error("Mentor {mentor_id} and mentee {mentee_id} are already paired")]
    Conflict { mentor_id: Uuid, mentee_id: Uuid },

    /// Input failed validation
    #[error("Invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Validate)]
struct GoalInput {
    #[validate(length(min = 1, max = 200))]
    name: String,
}

/// Mentor–mentee pairing service
pub struct AssociationManager {
    store: Arc<dyn Store>,
}

impl AssociationManager {
    /// Creates a manager over a store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Pairs a mentor with a mentee
    ///
    /// # Errors
    ///
    /// - `NotFound` if either party does not exist
    /// - `Conflict` if the pair already has an active association
    pub async fn create_association(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> Result<Association, AssociationError> {
        if self.store.find_user(mentor_id).await?.is_none() {
            return Err(AssociationError::NotFound {
                entity: "User",
                id: mentor_id,
            });
        }
        if self.store.find_mentee(mentee_id).await?.is_none() {
            return Err(AssociationError::NotFound {
                entity: "Mentee",
                id: mentee_id,
            });
        }
        if self
            .store
            .find_active_association(mentor_id, mentee_id)
            .await?
            .is_some()
        {
            return Err(AssociationError::Conflict { mentor_id, mentee_id });
        }

        let association = self
            .store
            .insert_association(CreateAssociation { mentor_id, mentee_id })
            .await
            .map_err(|e| match e {
                e if e.is_duplicate() => AssociationError::Conflict { mentor_id, mentee_id },
                e => AssociationError::Store(e),
            })?;

        tracing::info!(
            association_id = %association.id,
            %mentor_id,
            %mentee_id,
            "Association created"
        );
        Ok(association)
    }

    /// Appends an incomplete goal to the pair's association
    ///
    /// The name is trimmed and must be 1 to 200 characters. The active
    /// association is used when the pair has more than one.
    pub async fn add_goal(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
        goal_name: &str,
    ) -> Result<Association, AssociationError> {
        let input = GoalInput {
            name: goal_name.trim().to_string(),
        };
        input.validate()?;

        let association = self.find_for_pair(mentor_id, mentee_id).await?;
        let updated = self
            .store
            .append_goal(association.id, Goal::new(input.name))
            .await?;

        tracing::info!(
            association_id = %updated.id,
            goal_count = updated.goals.len(),
            "Goal added"
        );
        Ok(updated)
    }

    /// All associations of a mentor, oldest first
    pub async fn list_associations_for_mentor(
        &self,
        mentor_id: Uuid,
    ) -> Result<Vec<Association>, AssociationError> {
        Ok(self.store.list_associations_for_mentor(mentor_id).await?)
    }

    /// Goals of the pair's association in the order they were added
    pub async fn list_goals(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> Result<Vec<Goal>, AssociationError> {
        Ok(self.find_for_pair(mentor_id, mentee_id).await?.goals)
    }

    /// Looks up an association by ID
    pub async fn get_association(&self, id: Uuid) -> Result<Association, AssociationError> {
        self.store
            .find_association(id)
            .await?
            .ok_or(AssociationError::NotFound {
                entity: "Association",
                id,
            })
    }

    async fn find_for_pair(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
    ) -> Result<Association, AssociationError> {
        self.store
            .find_association_for_pair(mentor_id, mentee_id)
            .await?
            .ok_or(AssociationError::NoAssociation { mentor_id, mentee_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baytree_shared::models::mentee::CreateMentee;
    use baytree_shared::models::user::{CreateUser, UserRole};
    use baytree_shared::store::MemoryStore;

    async fn setup() -> (AssociationManager, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let mentor = store
            .insert_user(CreateUser {
                external_id: Some("100".to_string()),
                first_name: "Mo".to_string(),
                last_name: "Mentor".to_string(),
                email: "mo@example.org".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::Mentor,
                activity_status: "Active".to_string(),
            })
            .await
            .unwrap();
        let mentee = store
            .insert_mentee(CreateMentee {
                external_id: Some("200".to_string()),
                first_name: "Tee".to_string(),
                last_name: "Mentee".to_string(),
                date_of_birth: None,
                age: None,
            })
            .await
            .unwrap();

        (AssociationManager::new(store), mentor.id, mentee.id)
    }

    #[tokio::test]
    async fn test_create_association() {
        let (manager, mentor_id, mentee_id) = setup().await;

        let association = manager.create_association(mentor_id, mentee_id).await.unwrap();
        assert!(association.is_active);
        assert!(association.goals.is_empty());
        assert!(association.questionnaire_id.is_none());

        let fetched = manager.get_association(association.id).await.unwrap();
        assert_eq!(fetched.id, association.id);
    }

    #[tokio::test]
    async fn test_second_create_conflicts() {
        let (manager, mentor_id, mentee_id) = setup().await;

        manager.create_association(mentor_id, mentee_id).await.unwrap();
        let err = manager.create_association(mentor_id, mentee_id).await.unwrap_err();

        assert!(matches!(err, AssociationError::Conflict { .. }));
        assert_eq!(manager.list_associations_for_mentor(mentor_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_parties() {
        let (manager, mentor_id, mentee_id) = setup().await;

        let err = manager.create_association(Uuid::new_v4(), mentee_id).await.unwrap_err();
        assert!(matches!(err, AssociationError::NotFound { entity: "User", .. }));

        let err = manager.create_association(mentor_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AssociationError::NotFound { entity: "Mentee", .. }));
    }

    #[tokio::test]
    async fn test_goals_keep_insertion_order() {
        let (manager, mentor_id, mentee_id) = setup().await;
        manager.create_association(mentor_id, mentee_id).await.unwrap();

        for name in ["Open a bank account", "Finish CV", "Join football club"] {
            manager.add_goal(mentor_id, mentee_id, name).await.unwrap();
        }

        let goals = manager.list_goals(mentor_id, mentee_id).await.unwrap();
        let names: Vec<&str> = goals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Open a bank account", "Finish CV", "Join football club"]);
        assert!(goals.iter().all(|g| !g.is_complete));
    }

    #[tokio::test]
    async fn test_goal_validation() {
        let (manager, mentor_id, mentee_id) = setup().await;
        manager.create_association(mentor_id, mentee_id).await.unwrap();

        let err = manager.add_goal(mentor_id, mentee_id, "   ").await.unwrap_err();
        assert!(matches!(err, AssociationError::Validation(_)));

        let too_long = "x".repeat(201);
        let err = manager.add_goal(mentor_id, mentee_id, &too_long).await.unwrap_err();
        assert!(matches!(err, AssociationError::Validation(_)));

        let longest = "y".repeat(200);
        assert!(manager.add_goal(mentor_id, mentee_id, &longest).await.is_ok());
    }

    #[tokio::test]
    async fn test_goal_without_association() {
        let (manager, mentor_id, mentee_id) = setup().await;

        let err = manager.add_goal(mentor_id, mentee_id, "Anything").await.unwrap_err();
        assert!(matches!(err, AssociationError::NoAssociation { .. }));

        let err = manager.list_goals(mentor_id, mentee_id).await.unwrap_err();
        assert!(matches!(err, AssociationError::NoAssociation { .. }));
    }

    #[tokio::test]
    async fn test_get_missing_association() {
        let (manager, _, _) = setup().await;
        let err = manager.get_association(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AssociationError::NotFound { entity: "Association", .. }));
    }
}
