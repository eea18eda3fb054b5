/// reqwest-backed Views client
///
/// Every request uses HTTP basic auth with the service credentials and the
/// configured per-request timeout. Contact searches are retried on
/// transient failures; answer posts are sent once.

use super::error::DirectoryError;
use super::http::check_response;
use super::records::{parse_contacts_body, RawContact};
use super::retry::{with_retry, RetryConfig};
use super::{ContactKind, ContactSource, QuestionnaireGateway};
use crate::config::ViewsConfig;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// Views REST client
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    retry: RetryConfig,
}

impl DirectoryClient {
    /// Builds a client from the Views settings
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised
    pub fn new(config: &ViewsConfig) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("baytree-worker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            retry: RetryConfig::with_max_retries(config.max_retries),
        })
    }

    /// Replaces the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn contacts_url(&self, kind: ContactKind) -> String {
        format!("{}/contacts/{}/search?q=", self.base_url, kind.as_str())
    }

    fn answers_url(&self, template_id: &str) -> String {
        format!(
            "{}/evidence/questionnaires/{}/answers",
            self.base_url, template_id
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, DirectoryError> {
        let resp = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Ok(check_response(resp).await?.text().await?)
    }
}

#[async_trait]
impl ContactSource for DirectoryClient {
    async fn fetch_contacts(&self, kind: ContactKind) -> Result<Vec<RawContact>, DirectoryError> {
        let url = self.contacts_url(kind);
        tracing::debug!(%kind, "Fetching contacts from Views");

        let body = with_retry(&self.retry, kind.as_str(), || self.get_text(&url)).await?;
        let contacts = parse_contacts_body(&body)?;

        tracing::info!(%kind, count = contacts.len(), "Fetched contacts from Views");
        Ok(contacts)
    }
}

#[async_trait]
impl QuestionnaireGateway for DirectoryClient {
    async fn post_answers(
        &self,
        template_id: &str,
        xml_body: String,
    ) -> Result<String, DirectoryError> {
        tracing::debug!(template_id, "Posting questionnaire answers to Views");

        let resp = self
            .http
            .post(self.answers_url(template_id))
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "text/xml")
            .header(ACCEPT, "text/xml")
            .body(xml_body)
            .send()
            .await?;

        Ok(check_response(resp).await?.text().await?)
    }
}
