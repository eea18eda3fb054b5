/// External Directory Client
///
/// Talks to the Views REST API: contact searches for the sync engine and
/// questionnaire-answer posts for the questionnaire bridge.
///
/// # Modules
///
/// - `client`: [`DirectoryClient`], the reqwest-backed implementation
/// - `records`: raw contact parsing
/// - `retry`: backoff policy for reads
/// - `http`: response status checks
/// - `error`: [`DirectoryError`]
///
/// Both capabilities sit behind traits ([`ContactSource`],
/// [`QuestionnaireGateway`]) so services can be driven by test doubles.
///
/// # Example
///
/// ```no_run
/// use baytree_worker::config::ViewsConfig;
/// use baytree_worker::directory::{ContactKind, ContactSource, DirectoryClient};
///
/// # async fn example(views: ViewsConfig) -> Result<(), Box<dyn std::error::Error>> {
/// let client = DirectoryClient::new(&views)?;
/// let volunteers = client.fetch_contacts(ContactKind::Volunteers).await?;
/// println!("{} volunteers in Views", volunteers.len());
/// # Ok(())
/// # }
/// ```

pub mod client;
pub mod error;
pub mod http;
pub mod records;
pub mod retry;

pub use client::DirectoryClient;
pub use error::DirectoryError;
pub use records::RawContact;
pub use retry::RetryConfig;

use async_trait::async_trait;
use std::fmt;

/// Views contact collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// Staff; imported as admins
    Staff,

    /// Volunteers; imported as mentors
    Volunteers,

    /// Participants; imported as mentees
    Participants,
}

impl ContactKind {
    /// Path segment in `/contacts/{kind}/search`
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactKind::Staff => "staff",
            ContactKind::Volunteers => "volunteers",
            ContactKind::Participants => "participants",
        }
    }
}

impl fmt::Display for ContactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of directory contacts
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Fetches every contact of one kind
    async fn fetch_contacts(&self, kind: ContactKind) -> Result<Vec<RawContact>, DirectoryError>;
}

/// Sink for questionnaire answer documents
#[async_trait]
pub trait QuestionnaireGateway: Send + Sync {
    /// Posts an XML answers document for a template and returns the raw
    /// response body
    ///
    /// Sent exactly once, never retried.
    async fn post_answers(&self, template_id: &str, xml_body: String)
        -> Result<String, DirectoryError>;
}
