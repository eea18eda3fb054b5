/// Questionnaire Bridge
///
/// Sends questionnaire assignments and answers to Views as XML and records
/// the answer-set identifier Views generates back onto the association.
///
/// # Assignment
///
/// ```text
/// association ──> mentor ──> mentor's Views PersonID
///      │                           │
///      │                 POST <answers> document
///      │                           │
///      └──< questionnaire_id <── parse answerset id
/// ```
///
/// Once Views has accepted the post, the call succeeds: a response that
/// cannot be parsed, or an ID that cannot be recorded, is reported inside
/// the returned [`Assignment`] alongside the raw response.

pub mod xml;

use crate::directory::{DirectoryError, QuestionnaireGateway};
use baytree_shared::models::association::QuestionnaireState;
use baytree_shared::store::{Store, StoreError};
use std::sync::Arc;
use uuid::Uuid;
use xml::{answers_document, assignment_document, parse_instance_id, XmlError};

/// Bridge error types
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The association's mentor was never imported from Views
    #[error("Mentor {user_id} has no Views PersonID")]
    MentorNotLinked { user_id: Uuid },

    /// Caller input cannot be sent
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Transport(#[from] DirectoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of assigning a questionnaire
///
/// Returned whenever Views accepted the post, even if the answer-set ID
/// could not be read or recorded.
#[derive(Debug)]
pub struct Assignment {
    /// Views response body, verbatim
    pub raw_response: String,

    /// Answer-set ID, when the response could be parsed
    pub instance_id: Option<String>,

    /// Why no ID could be read from the response
    pub parse_error: Option<XmlError>,

    /// Why the parsed ID was not recorded on the association
    pub store_error: Option<StoreError>,
}

/// Views questionnaire bridge
pub struct QuestionnaireBridge {
    gateway: Arc<dyn QuestionnaireGateway>,
    store: Arc<dyn Store>,
}

fn validate_template_id(template_id: &str) -> Result<(), BridgeError> {
    if template_id.is_empty() || !template_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BridgeError::InvalidPayload(format!(
            "template id must be alphanumeric, got {:?}",
            template_id
        )));
    }
    Ok(())
}

impl QuestionnaireBridge {
    /// Creates a bridge
    pub fn new(gateway: Arc<dyn QuestionnaireGateway>, store: Arc<dyn Store>) -> Self {
        Self { gateway, store }
    }

    /// Assigns a questionnaire template to an association's mentor
    ///
    /// On success the generated answer-set ID is stored as the
    /// association's `questionnaire_id`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the association or its mentor is missing
    /// - `MentorNotLinked` if the mentor has no Views PersonID
    /// - `Transport` if the post fails; nothing is stored
    pub async fn assign_questionnaire(
        &self,
        association_id: Uuid,
        template_id: &str,
    ) -> Result<Assignment, BridgeError> {
        validate_template_id(template_id)?;

        let association = self
            .store
            .find_association(association_id)
            .await?
            .ok_or(BridgeError::NotFound {
                entity: "Association",
                id: association_id,
            })?;

        let mentor = self
            .store
            .find_user(association.mentor_id)
            .await?
            .ok_or(BridgeError::NotFound {
                entity: "User",
                id: association.mentor_id,
            })?;

        let entity_id = mentor
            .external_id
            .as_deref()
            .ok_or(BridgeError::MentorNotLinked { user_id: mentor.id })?;

        if let QuestionnaireState::Assigned(previous) = association.questionnaire_state() {
            tracing::warn!(
                %association_id,
                previous,
                template_id,
                "Association already has a questionnaire; it will be replaced"
            );
        }

        let raw_response = self
            .gateway
            .post_answers(template_id, assignment_document(entity_id))
            .await?;

        match parse_instance_id(&raw_response) {
            Ok(instance_id) => {
                let store_error = match self
                    .store
                    .set_questionnaire_id(association.id, &instance_id)
                    .await
                {
                    Ok(_) => {
                        tracing::info!(%association_id, %instance_id, template_id, "Questionnaire assigned");
                        None
                    }
                    Err(e) => {
                        tracing::error!(
                            %association_id,
                            %instance_id,
                            template_id,
                            error = %e,
                            "Views created the answer set but it could not be recorded"
                        );
                        Some(e)
                    }
                };

                Ok(Assignment {
                    raw_response,
                    instance_id: Some(instance_id),
                    parse_error: None,
                    store_error,
                })
            }
            Err(e) => {
                tracing::warn!(
                    %association_id,
                    template_id,
                    error = %e,
                    "Could not read answer set id from Views response"
                );

                Ok(Assignment {
                    raw_response,
                    instance_id: None,
                    parse_error: Some(e),
                    store_error: None,
                })
            }
        }
    }

    /// Submits answers for a Views person and returns the raw response
    ///
    /// `answers` are `(field, value)` pairs, sent in order. Local
    /// questionnaire records are not touched.
    pub async fn submit_answers(
        &self,
        template_id: &str,
        entity_id: &str,
        answers: &[(String, String)],
    ) -> Result<String, BridgeError> {
        validate_template_id(template_id)?;
        if entity_id.trim().is_empty() {
            return Err(BridgeError::InvalidPayload("entity id is empty".to_string()));
        }

        let document = answers_document(entity_id.trim(), answers)
            .map_err(|e| BridgeError::InvalidPayload(e.to_string()))?;

        let response = self.gateway.post_answers(template_id, document).await?;
        tracing::info!(template_id, entity_id, fields = answers.len(), "Questionnaire answers submitted");

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use baytree_shared::models::association::{CreateAssociation, QUESTIONNAIRE_ID_MAX_LEN};
    use baytree_shared::models::mentee::CreateMentee;
    use baytree_shared::models::user::{CreateUser, UserRole};
    use baytree_shared::store::MemoryStore;
    use std::sync::Mutex;

    /// Gateway answering every post with a canned response
    struct FakeGateway {
        response: Result<String, u16>,
        posts: Mutex<Vec<(String, String)>>,
    }

    impl FakeGateway {
        fn replying(body: &str) -> Self {
            Self {
                response: Ok(body.to_string()),
                posts: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                response: Err(status),
                posts: Mutex::new(Vec::new()),
            }
        }

        fn posts(&self) -> Vec<(String, String)> {
            self.posts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuestionnaireGateway for FakeGateway {
        async fn post_answers(
            &self,
            template_id: &str,
            xml_body: String,
        ) -> Result<String, DirectoryError> {
            self.posts
                .lock()
                .unwrap()
                .push((template_id.to_string(), xml_body));
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(status) => Err(DirectoryError::Status {
                    status: *status,
                    body: String::new(),
                }),
            }
        }
    }

    async fn association(store: &MemoryStore, mentor_external_id: Option<&str>) -> Uuid {
        let mentor = store
            .insert_user(CreateUser {
                external_id: mentor_external_id.map(str::to_string),
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
                external_id: Some("300".to_string()),
                first_name: "Tee".to_string(),
                last_name: "Mentee".to_string(),
                date_of_birth: None,
                age: None,
            })
            .await
            .unwrap();

        store
            .insert_association(CreateAssociation {
                mentor_id: mentor.id,
                mentee_id: mentee.id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_assignment_records_instance_id() {
        let store = Arc::new(MemoryStore::new());
        let association_id = association(&store, Some("1042")).await;
        let gateway = Arc::new(FakeGateway::replying(r#"<answerset id="8812"/>"#));
        let bridge = QuestionnaireBridge::new(gateway.clone(), store.clone());

        let assignment = bridge.assign_questionnaire(association_id, "27").await.unwrap();

        assert_eq!(assignment.instance_id.as_deref(), Some("8812"));
        assert!(assignment.parse_error.is_none());
        assert!(assignment.store_error.is_none());
        assert_eq!(assignment.raw_response, r#"<answerset id="8812"/>"#);

        let stored = store.find_association(association_id).await.unwrap().unwrap();
        assert_eq!(stored.questionnaire_state(), QuestionnaireState::Assigned("8812"));

        let posts = gateway.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "27");
        assert!(posts[0].1.contains("<EntityID>1042</EntityID>"));
    }

    #[tokio::test]
    async fn test_unparseable_response_leaves_association_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let association_id = association(&store, Some("1042")).await;
        let bridge = QuestionnaireBridge::new(
            Arc::new(FakeGateway::replying("<html>oops</html>")),
            store.clone(),
        );

        let assignment = bridge.assign_questionnaire(association_id, "27").await.unwrap();

        assert!(assignment.instance_id.is_none());
        assert!(matches!(assignment.parse_error, Some(XmlError::UnexpectedRoot(_))));
        assert_eq!(assignment.raw_response, "<html>oops</html>");

        let stored = store.find_association(association_id).await.unwrap().unwrap();
        assert_eq!(stored.questionnaire_state(), QuestionnaireState::Unassigned);
    }

    #[tokio::test]
    async fn test_unrecorded_instance_id_still_returned() {
        let store = Arc::new(MemoryStore::new());
        let association_id = association(&store, Some("1042")).await;
        let oversized = "7".repeat(QUESTIONNAIRE_ID_MAX_LEN + 1);
        let reply = format!(r#"<answerset id="{}"/>"#, oversized);
        let gateway = Arc::new(FakeGateway::replying(&reply));
        let bridge = QuestionnaireBridge::new(gateway.clone(), store.clone());

        let assignment = bridge.assign_questionnaire(association_id, "27").await.unwrap();

        assert_eq!(gateway.posts().len(), 1);
        assert_eq!(assignment.raw_response, reply);
        assert_eq!(assignment.instance_id.as_deref(), Some(oversized.as_str()));
        assert!(assignment.parse_error.is_none());
        assert!(matches!(assignment.store_error, Some(StoreError::Database(_))));

        let stored = store.find_association(association_id).await.unwrap().unwrap();
        assert_eq!(stored.questionnaire_state(), QuestionnaireState::Unassigned);
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let association_id = association(&store, Some("1042")).await;
        let bridge = QuestionnaireBridge::new(Arc::new(FakeGateway::failing(500)), store.clone());

        let err = bridge.assign_questionnaire(association_id, "27").await.unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));

        let stored = store.find_association(association_id).await.unwrap().unwrap();
        assert!(stored.questionnaire_id.is_none());
    }

    #[tokio::test]
    async fn test_unlinked_mentor() {
        let store = Arc::new(MemoryStore::new());
        let association_id = association(&store, None).await;
        let gateway = Arc::new(FakeGateway::replying(r#"<answerset id="1"/>"#));
        let bridge = QuestionnaireBridge::new(gateway.clone(), store);

        let err = bridge.assign_questionnaire(association_id, "27").await.unwrap_err();
        assert!(matches!(err, BridgeError::MentorNotLinked { .. }));
        assert!(gateway.posts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_association() {
        let bridge = QuestionnaireBridge::new(
            Arc::new(FakeGateway::replying("")),
            Arc::new(MemoryStore::new()),
        );

        let err = bridge.assign_questionnaire(Uuid::new_v4(), "27").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound { entity: "Association", .. }));
    }

    #[tokio::test]
    async fn test_reassignment_replaces_instance_id() {
        let store = Arc::new(MemoryStore::new());
        let association_id = association(&store, Some("1042")).await;

        for id in ["100", "200"] {
            let body = format!(r#"<answerset id="{}"/>"#, id);
            let bridge = QuestionnaireBridge::new(Arc::new(FakeGateway::replying(&body)), store.clone());
            bridge.assign_questionnaire(association_id, "27").await.unwrap();
        }

        let stored = store.find_association(association_id).await.unwrap().unwrap();
        assert_eq!(stored.questionnaire_id.as_deref(), Some("200"));
    }

    #[tokio::test]
    async fn test_submit_answers_returns_raw_response() {
        let gateway = Arc::new(FakeGateway::replying("<answerset id=\"9\"/>"));
        let bridge = QuestionnaireBridge::new(gateway.clone(), Arc::new(MemoryStore::new()));

        let response = bridge
            .submit_answers("27", "1042", &[("Q1".to_string(), "Yes & no".to_string())])
            .await
            .unwrap();

        assert_eq!(response, "<answerset id=\"9\"/>");
        let posts = gateway.posts();
        assert!(posts[0].1.contains("<answer><Q1>Yes &amp; no</Q1></answer>"));
    }

    #[tokio::test]
    async fn test_submit_answers_rejects_bad_input() {
        let gateway = Arc::new(FakeGateway::replying(""));
        let bridge = QuestionnaireBridge::new(gateway.clone(), Arc::new(MemoryStore::new()));

        let err = bridge
            .submit_answers("27", "1042", &[("bad name".to_string(), "x".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPayload(_)));

        let err = bridge.submit_answers("../27", "1042", &[]).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPayload(_)));

        assert!(gateway.posts().is_empty());
    }
}
