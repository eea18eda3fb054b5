/// Synchronization Engine
///
/// Imports Views contacts into the local store. Records are matched on their
/// Views `PersonID`: a contact with no local counterpart is created, one
/// that already exists is skipped. Nothing is ever updated or deleted.
///
/// # Batches
///
/// - `staff` and `volunteers` become [`User`]s, each with a hash of the
///   configured temporary password. A `TypeName` of exactly "volunteer"
///   makes a mentor; anything else makes an admin.
/// - `participants` become [`Mentee`]s with an age computed at import time
///
/// Per-record failures are logged and counted; they never abort a batch.
/// Only a failed fetch does.
///
/// # Concurrency
///
/// Records are imported by a bounded pool of `concurrency` in-flight
/// futures. Cancelling the token stops new records from starting; imports
/// already running finish and the report is marked `cancelled`.
///
/// # Example
///
/// ```no_run
/// use baytree_shared::store::MemoryStore;
/// use baytree_worker::config::{SyncConfig, ViewsConfig};
/// use baytree_worker::directory::DirectoryClient;
/// use baytree_worker::sync::SyncEngine;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(views: ViewsConfig) -> Result<(), Box<dyn std::error::Error>> {
/// let engine = SyncEngine::new(
///     Arc::new(DirectoryClient::new(&views)?),
///     Arc::new(MemoryStore::new()),
///     SyncConfig::default(),
/// );
///
/// let report = engine.sync_all(CancellationToken::new()).await?;
/// println!("created {} records", report.created);
/// # Ok(())
/// # }
/// ```

use crate::config::SyncConfig;
use crate::directory::{ContactKind, ContactSource, DirectoryError, RawContact};
use baytree_shared::auth::password::{hash_password, PasswordError};
use baytree_shared::models::mentee::{compute_age, CreateMentee, Mentee};
use baytree_shared::models::user::{CreateUser, User, UserRole};
use baytree_shared::store::Store;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use baytree_shared::models::user::NO_EMAIL;

/// Activity status stored for contacts without one
pub const DEFAULT_ACTIVITY_STATUS: &str = "Active";

/// Sync error types
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A contact collection could not be fetched
    #[error("Failed to fetch {kind} contacts: {source}")]
    Transport {
        kind: ContactKind,
        #[source]
        source: DirectoryError,
    },

    /// The temporary password could not be hashed
    #[error("Failed to prepare temporary credential: {0}")]
    Credential(#[from] PasswordError),
}

/// Counts for one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records returned by Views
    pub fetched: usize,

    /// Records imported
    pub created: usize,

    /// Records that already existed locally
    pub skipped: usize,

    /// Records without a usable `PersonID`
    pub invalid: usize,

    /// Records whose lookup or insert failed
    pub failed: usize,

    /// Whether cancellation left records unprocessed
    pub cancelled: bool,
}

impl SyncReport {
    /// Records that were looked at
    pub fn processed(&self) -> usize {
        self.created + self.skipped + self.invalid + self.failed
    }

    /// Adds another run's counts to this one
    pub fn merge(&mut self, other: &SyncReport) {
        self.fetched += other.fetched;
        self.created += other.created;
        self.skipped += other.skipped;
        self.invalid += other.invalid;
        self.failed += other.failed;
        self.cancelled |= other.cancelled;
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Invalid => self.invalid += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created,
    Skipped,
    Invalid,
    Failed,
}

/// Parses a Views `DateOfBirth`
///
/// Accepts plain dates (`1998-05-14`, `14/05/1998`), RFC 3339 timestamps and
/// `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date_of_birth(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok())
}

/// Directory-to-store importer
pub struct SyncEngine {
    source: Arc<dyn ContactSource>,
    store: Arc<dyn Store>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Creates an engine
    pub fn new(source: Arc<dyn ContactSource>, store: Arc<dyn Store>, config: SyncConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Imports the staff and volunteer collections as users
    ///
    /// # Errors
    ///
    /// Fails if either collection cannot be fetched or the temporary
    /// password cannot be hashed
    pub async fn sync_staff_and_mentors(
        &self,
        cancel: CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let mut password_hash: Option<String> = None;

        for kind in [ContactKind::Staff, ContactKind::Volunteers] {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let contacts = self.fetch(kind).await?;

            let hash = match &password_hash {
                Some(hash) => hash.clone(),
                None => {
                    let hash = self.temporary_password_hash().await?;
                    password_hash = Some(hash.clone());
                    hash
                }
            };

            let batch = self
                .run_batch(contacts, &cancel, |contact| self.import_user(contact, &hash))
                .await;
            tracing::info!(%kind, ?batch, "Contact batch imported");
            report.merge(&batch);
        }

        Ok(report)
    }

    /// Imports participants as mentees
    ///
    /// # Errors
    ///
    /// Fails if the collection cannot be fetched
    pub async fn sync_mentees(&self, cancel: CancellationToken) -> Result<SyncReport, SyncError> {
        if cancel.is_cancelled() {
            return Ok(SyncReport {
                cancelled: true,
                ..Default::default()
            });
        }

        let contacts = self.fetch(ContactKind::Participants).await?;
        let now = Utc::now();

        let report = self
            .run_batch(contacts, &cancel, |contact| self.import_mentee(contact, now))
            .await;
        tracing::info!(kind = %ContactKind::Participants, ?report, "Contact batch imported");

        Ok(report)
    }

    /// Imports users, then mentees
    pub async fn sync_all(&self, cancel: CancellationToken) -> Result<SyncReport, SyncError> {
        let mut report = self.sync_staff_and_mentors(cancel.clone()).await?;
        report.merge(&self.sync_mentees(cancel).await?);

        tracing::info!(
            fetched = report.fetched,
            created = report.created,
            skipped = report.skipped,
            invalid = report.invalid,
            failed = report.failed,
            cancelled = report.cancelled,
            "Directory sync finished"
        );
        Ok(report)
    }

    async fn fetch(&self, kind: ContactKind) -> Result<Vec<RawContact>, SyncError> {
        self.source.fetch_contacts(kind).await.map_err(|source| {
            tracing::error!(%kind, error = %source, "Failed to fetch contacts");
            SyncError::Transport { kind, source }
        })
    }

    async fn temporary_password_hash(&self) -> Result<String, SyncError> {
        let password = self.config.temporary_password.clone();

        tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))?
            .map_err(SyncError::from)
    }

    async fn run_batch<F, Fut>(
        &self,
        contacts: Vec<RawContact>,
        cancel: &CancellationToken,
        import: F,
    ) -> SyncReport
    where
        F: FnMut(RawContact) -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let mut report = SyncReport {
            fetched: contacts.len(),
            ..Default::default()
        };

        let outcomes: Vec<Outcome> = stream::iter(contacts)
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(import)
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }
        report.cancelled = report.processed() < report.fetched;

        if report.cancelled {
            tracing::warn!(
                processed = report.processed(),
                fetched = report.fetched,
                "Sync cancelled before all records were processed"
            );
        }
        report
    }

    async fn import_user(&self, contact: RawContact, password_hash: &str) -> Outcome {
        let Some(external_id) = contact.person_id.clone() else {
            tracing::warn!(forename = ?contact.forename, "Skipping contact without PersonID");
            return Outcome::Invalid;
        };

        match self.store.find_user_by_external_id(&external_id).await {
            Ok(Some(_)) => {
                tracing::debug!(%external_id, "User already exists");
                return Outcome::Skipped;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(%external_id, error = %e, "Failed to look up user");
                return Outcome::Failed;
            }
        }

        let data = CreateUser {
            external_id: Some(external_id.clone()),
            first_name: contact.forename.unwrap_or_default(),
            last_name: contact.surname.unwrap_or_default(),
            email: contact.email.unwrap_or_else(|| NO_EMAIL.to_string()),
            password_hash: password_hash.to_string(),
            role: UserRole::from_directory_type(contact.type_name.as_deref()),
            activity_status: contact
                .volunteer_status
                .unwrap_or_else(|| DEFAULT_ACTIVITY_STATUS.to_string()),
        };

        match self.store.insert_user(data).await {
            Ok(user) => {
                log_created_user(&user);
                Outcome::Created
            }
            Err(e) if e.is_duplicate() => {
                tracing::debug!(%external_id, "User created concurrently");
                Outcome::Skipped
            }
            Err(e) => {
                tracing::error!(%external_id, error = %e, "Failed to create user");
                Outcome::Failed
            }
        }
    }

    async fn import_mentee(&self, contact: RawContact, now: DateTime<Utc>) -> Outcome {
        let Some(external_id) = contact.person_id.clone() else {
            tracing::warn!(forename = ?contact.forename, "Skipping participant without PersonID");
            return Outcome::Invalid;
        };

        match self.store.find_mentee_by_external_id(&external_id).await {
            Ok(Some(_)) => {
                tracing::debug!(%external_id, "Mentee already exists");
                return Outcome::Skipped;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(%external_id, error = %e, "Failed to look up mentee");
                return Outcome::Failed;
            }
        }

        let date_of_birth = contact.date_of_birth.as_deref().and_then(parse_date_of_birth);
        if date_of_birth.is_none() {
            tracing::warn!(
                %external_id,
                raw = ?contact.date_of_birth,
                "Participant has no usable date of birth"
            );
        }

        let data = CreateMentee {
            external_id: Some(external_id.clone()),
            first_name: contact.forename.unwrap_or_default(),
            last_name: contact.surname.unwrap_or_default(),
            date_of_birth,
            age: date_of_birth.map(|dob| compute_age(dob, now)),
        };

        match self.store.insert_mentee(data).await {
            Ok(mentee) => {
                log_created_mentee(&mentee);
                Outcome::Created
            }
            Err(e) if e.is_duplicate() => {
                tracing::debug!(%external_id, "Mentee created concurrently");
                Outcome::Skipped
            }
            Err(e) => {
                tracing::error!(%external_id, error = %e, "Failed to create mentee");
                Outcome::Failed
            }
        }
    }
}

fn log_created_user(user: &User) {
    tracing::info!(
        user_id = %user.id,
        external_id = ?user.external_id,
        role = %user.role,
        "Created user from directory"
    );
}

fn log_created_mentee(mentee: &Mentee) {
    tracing::info!(
        mentee_id = %mentee.id,
        external_id = ?mentee.external_id,
        age = ?mentee.age,
        "Created mentee from directory"
    );
}
