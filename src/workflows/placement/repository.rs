use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::application::{Application, ApplicationStatus};
use super::domain::{ApplicationId, DriveId, OfferId, StudentId, StudentSnapshot};
use super::drive::Drive;
use super::offer::{Offer, OfferStatus};

/// Storage abstraction so the lifecycle engine can be exercised without any
/// particular database. The `expected_prior` parameters are the
/// compare-and-swap preconditions that serialize concurrent transitions: a
/// save succeeds only when the stored status still matches.
pub trait PlacementRepository: Send + Sync {
    fn find_student(&self, id: &StudentId) -> Result<Option<StudentSnapshot>, RepositoryError>;
    fn upsert_student(&self, snapshot: StudentSnapshot) -> Result<(), RepositoryError>;

    fn find_drive(&self, id: &DriveId) -> Result<Option<Drive>, RepositoryError>;
    fn insert_drive(&self, drive: Drive) -> Result<(), RepositoryError>;
    fn save_drive(&self, drive: Drive) -> Result<(), RepositoryError>;

    fn find_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    /// Insert a new application. Fails with `Conflict` when the id is taken
    /// or the student already holds an application for the drive.
    fn insert_application(&self, application: Application) -> Result<(), RepositoryError>;
    /// Atomic transition persistence: rejects with `PreconditionFailed` when
    /// the stored status no longer matches `expected_prior`.
    fn save_application(
        &self,
        application: Application,
        expected_prior: ApplicationStatus,
    ) -> Result<(), RepositoryError>;
    fn application_for(
        &self,
        drive: &DriveId,
        student: &StudentId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn applications_for_drive(&self, drive: &DriveId)
        -> Result<Vec<Application>, RepositoryError>;

    fn find_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError>;
    fn insert_offer(&self, offer: Offer) -> Result<(), RepositoryError>;
    fn save_offer(&self, offer: Offer, expected_prior: OfferStatus)
        -> Result<(), RepositoryError>;
    /// The at-most-one-pending-offer-per-application invariant is enforced
    /// against this lookup at write time, never by post-hoc filtering.
    fn pending_offer_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Option<Offer>, RepositoryError>;
    fn offers_for_application(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<Offer>, RepositoryError>;
    fn offers_for_drive(&self, drive: &DriveId) -> Result<Vec<Offer>, RepositoryError>;

    /// Collaborator side effect of an accepted offer: the student aggregate
    /// records its placement.
    fn mark_placed(&self, student: &StudentId, drive: &DriveId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored status no longer matches expected {expected}")]
    PreconditionFailed { expected: &'static str },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Events the notification dispatcher subscribes to. Dispatch is best-effort
/// and happens only after the owning transition has been persisted; a failed
/// dispatch never rolls the transition back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlacementEvent {
    ApplicationStatusChanged {
        application: ApplicationId,
        drive: DriveId,
        student: StudentId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        at: DateTime<Utc>,
    },
    OfferStatusChanged {
        offer: OfferId,
        application: ApplicationId,
        student: StudentId,
        from: OfferStatus,
        to: OfferStatus,
        at: DateTime<Utc>,
    },
}

/// Trait describing the outbound notification hook (e-mail dispatcher or
/// similar adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, event: PlacementEvent) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
