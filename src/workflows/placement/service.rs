use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::application::{Application, ApplicationStatus, RoundResult};
use super::domain::{
    Actor, ActorRole, ApplicationId, DriveId, OfferId, PlacementError, StudentId, StudentSnapshot,
};
use super::drive::{Drive, FitAnnotation};
use super::eligibility;
use super::offer::{Offer, OfferStatus};
use super::report::{
    ApplicationStatusView, DriveReport, OfferView, ScreeningEntry, ScreeningReport,
};
use super::repository::{
    NotificationPublisher, PlacementEvent, PlacementRepository, RepositoryError,
};

/// Offer issuance policy. The validity window applies whenever the caller
/// does not supply an explicit expiry.
#[derive(Debug, Clone, Copy)]
pub struct OfferPolicy {
    pub default_validity_hours: i64,
}

impl Default for OfferPolicy {
    fn default() -> Self {
        Self {
            default_validity_hours: 72,
        }
    }
}

impl OfferPolicy {
    pub fn default_expiry(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + Duration::hours(self.default_validity_hours)
    }
}

/// A student's answer to a pending offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum OfferResponse {
    Accept {
        #[serde(default)]
        message: Option<String>,
    },
    Reject {
        #[serde(default)]
        message: Option<String>,
    },
    Counter {
        compensation: u64,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Drive definition as supplied by the caller; the service assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDrive {
    pub title: String,
    pub company: String,
    pub university: String,
    pub criteria: super::domain::DriveCriteria,
    pub timeline: super::domain::DriveTimeline,
    #[serde(default)]
    pub selection_rounds: Vec<super::drive::SelectionRound>,
}

static DRIVE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static OFFER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_drive_id() -> DriveId {
    let id = DRIVE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DriveId(format!("drive-{id:06}"))
}

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_offer_id() -> OfferId {
    let id = OFFER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OfferId(format!("offer-{id:06}"))
}

/// Service facade composing the repository, the notification dispatcher, and
/// the lifecycle entities. One logical operation per call; every transition
/// is persisted through the repository's compare-and-swap saves so two
/// concurrent attempts on the same entity cannot both win.
pub struct PlacementService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    offer_policy: OfferPolicy,
}

impl<R, N> PlacementService<R, N>
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, offer_policy: OfferPolicy) -> Self {
        Self {
            repository,
            notifier,
            offer_policy,
        }
    }

    pub fn create_drive(&self, definition: NewDrive) -> Result<Drive, PlacementServiceError> {
        let drive = Drive::new(
            next_drive_id(),
            definition.title,
            definition.company,
            definition.university,
            definition.criteria,
            definition.timeline,
            definition.selection_rounds,
        );
        self.repository.insert_drive(drive.clone())?;
        Ok(drive)
    }

    pub fn publish_drive(&self, id: &DriveId) -> Result<Drive, PlacementServiceError> {
        let mut drive = self.require_drive(id)?;
        drive.publish()?;
        self.repository.save_drive(drive.clone())?;
        Ok(drive)
    }

    pub fn close_drive(&self, id: &DriveId) -> Result<Drive, PlacementServiceError> {
        let mut drive = self.require_drive(id)?;
        drive.close()?;
        self.repository.save_drive(drive.clone())?;
        Ok(drive)
    }

    pub fn complete_drive(
        &self,
        id: &DriveId,
        now: DateTime<Utc>,
    ) -> Result<Drive, PlacementServiceError> {
        let mut drive = self.require_drive(id)?;
        drive.complete(now)?;
        self.repository.save_drive(drive.clone())?;
        Ok(drive)
    }

    pub fn cancel_drive(&self, id: &DriveId) -> Result<Drive, PlacementServiceError> {
        let mut drive = self.require_drive(id)?;
        drive.cancel()?;
        self.repository.save_drive(drive.clone())?;
        Ok(drive)
    }

    /// Screen a roster against the drive's criteria. Passing students land
    /// on the candidate register; every snapshot is persisted so later
    /// applications evaluate against the same data.
    pub fn screen(
        &self,
        drive_id: &DriveId,
        roster: &[StudentSnapshot],
    ) -> Result<ScreeningReport, PlacementServiceError> {
        let mut drive = self.require_drive(drive_id)?;
        let mut entries = Vec::with_capacity(roster.len());
        let mut eligible = 0;

        for snapshot in roster {
            self.repository.upsert_student(snapshot.clone())?;
            let report = eligibility::evaluate(snapshot, &drive.criteria);
            if report.eligible {
                eligible += 1;
                drive.register_candidate(snapshot.student.clone(), report.clone(), false);
            }
            entries.push(ScreeningEntry {
                student: snapshot.student.clone(),
                eligible: report.eligible,
                failed_rules: report.failed_rules,
            });
        }

        self.repository.save_drive(drive)?;
        Ok(ScreeningReport {
            drive: drive_id.clone(),
            screened: roster.len(),
            eligible,
            entries,
        })
    }

    /// Invite a registered candidate to the drive.
    pub fn invite(
        &self,
        drive_id: &DriveId,
        student: &StudentId,
        now: DateTime<Utc>,
    ) -> Result<(), PlacementServiceError> {
        let mut drive = self.require_drive(drive_id)?;
        if !drive.invite(student, now) {
            return Err(RepositoryError::NotFound.into());
        }
        self.repository.save_drive(drive)?;
        Ok(())
    }

    /// Store advisory AI metadata against a candidate entry. The annotation
    /// never participates in eligibility or lifecycle decisions.
    pub fn annotate_fit(
        &self,
        drive_id: &DriveId,
        student: &StudentId,
        fit: FitAnnotation,
    ) -> Result<(), PlacementServiceError> {
        let mut drive = self.require_drive(drive_id)?;
        if !drive.annotate_fit(student, fit) {
            return Err(RepositoryError::NotFound.into());
        }
        self.repository.save_drive(drive)?;
        Ok(())
    }

    /// Open an application for a student. The drive must be accepting
    /// registrations and the student must pass every eligibility rule.
    pub fn apply(
        &self,
        drive_id: &DriveId,
        student_id: &StudentId,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Application, PlacementServiceError> {
        let drive = self.require_drive(drive_id)?;
        let student = self
            .repository
            .find_student(student_id)?
            .ok_or(RepositoryError::NotFound)?;

        let application = Application::open(next_application_id(), &drive, &student, actor, now)?;
        self.repository.insert_application(application.clone())?;
        Ok(application)
    }

    /// Move an application through the review pipeline. Transitions that
    /// imply side effects (offers, withdrawal) are only reachable through
    /// their owning operations and are refused here.
    pub fn advance(
        &self,
        application_id: &ApplicationId,
        next: ApplicationStatus,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Application, PlacementServiceError> {
        let mut application = self.require_application(application_id)?;

        let review_status = matches!(
            next,
            ApplicationStatus::UnderReview
                | ApplicationStatus::Shortlisted
                | ApplicationStatus::Rejected
                | ApplicationStatus::Selected
        );
        if !review_status {
            return Err(PlacementError::InvalidTransition {
                from: application.status.label(),
                to: next.label(),
            }
            .into());
        }

        let prior = application.status;
        application.transition(next, actor, now)?;
        self.saved_application(application.clone(), prior)?;

        if next == ApplicationStatus::Rejected {
            self.notify(application_event(&application, prior, now));
        }

        Ok(application)
    }

    pub fn withdraw(
        &self,
        application_id: &ApplicationId,
        reason: impl Into<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Application, PlacementServiceError> {
        let mut application = self.require_application(application_id)?;
        let prior = application.status;
        application.withdraw(reason, actor, now)?;
        self.saved_application(application.clone(), prior)?;
        Ok(application)
    }

    pub fn record_round(
        &self,
        application_id: &ApplicationId,
        order: u8,
        result: RoundResult,
    ) -> Result<Application, PlacementServiceError> {
        let mut application = self.require_application(application_id)?;
        let prior = application.status;
        application.record_round(order, result)?;
        self.saved_application(application.clone(), prior)?;
        Ok(application)
    }

    /// Issue an offer against a selected application, or a replacement offer
    /// once a prior one was countered or lapsed. At most one pending offer
    /// may exist per application.
    pub fn issue_offer(
        &self,
        application_id: &ApplicationId,
        compensation: u64,
        expires_at: Option<DateTime<Utc>>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Offer, PlacementServiceError> {
        let mut application = self.require_application(application_id)?;

        if let Some(mut pending) = self.repository.pending_offer_for(application_id)? {
            if pending.expire_if_due(now) {
                self.saved_offer(pending.clone(), OfferStatus::Pending)?;
                self.notify(offer_event(&pending, OfferStatus::Pending, now));
            } else {
                return Err(PlacementError::DuplicatePendingOffer.into());
            }
        }

        let expires_at = expires_at.unwrap_or_else(|| self.offer_policy.default_expiry(now));

        let offer = match application.status {
            ApplicationStatus::Selected => {
                let offer =
                    Offer::issue(next_offer_id(), &application, compensation, now, expires_at)?;
                let prior = application.status;
                application.transition(ApplicationStatus::OfferIssued, actor, now)?;
                self.saved_application(application.clone(), prior)?;
                self.repository.insert_offer(offer.clone())?;
                self.notify(application_event(&application, prior, now));
                offer
            }
            ApplicationStatus::OfferIssued => {
                let resolved_prior = self
                    .repository
                    .offers_for_application(application_id)?
                    .iter()
                    .any(|existing| {
                        matches!(existing.status, OfferStatus::Countered | OfferStatus::Expired)
                    });
                if !resolved_prior {
                    return Err(PlacementError::ApplicationNotSelected {
                        status: application.status.label(),
                    }
                    .into());
                }
                let offer =
                    Offer::reissue(next_offer_id(), &application, compensation, now, expires_at)?;
                self.repository.insert_offer(offer.clone())?;
                offer
            }
            other => {
                return Err(PlacementError::ApplicationNotSelected {
                    status: other.label(),
                }
                .into())
            }
        };

        Ok(offer)
    }

    /// Apply a student's response to a pending offer. The history actor is
    /// always the offer's student. A lapsed deadline is resolved to
    /// `expired` and persisted before the failure surfaces; acceptance
    /// transitions the application and marks the student placed.
    pub fn respond_to_offer(
        &self,
        offer_id: &OfferId,
        response: OfferResponse,
        now: DateTime<Utc>,
    ) -> Result<Offer, PlacementServiceError> {
        let mut offer = self.require_offer(offer_id)?;
        let prior = offer.status;
        let actor = Actor::new(offer.student.0.clone(), ActorRole::Student);

        let outcome = match &response {
            OfferResponse::Accept { message } => offer.accept(message.clone(), now),
            OfferResponse::Reject { message } => offer.reject(message.clone(), now),
            OfferResponse::Counter {
                compensation,
                message,
            } => offer.counter(*compensation, message.clone(), now),
        };

        if let Err(error) = outcome {
            if offer.status == OfferStatus::Expired && prior == OfferStatus::Pending {
                self.saved_offer(offer.clone(), OfferStatus::Pending)?;
                self.notify(offer_event(&offer, prior, now));
            }
            return Err(error.into());
        }

        self.saved_offer(offer.clone(), prior)?;
        self.notify(offer_event(&offer, prior, now));

        match offer.status {
            OfferStatus::Accepted => {
                let mut application = self.require_application(&offer.application)?;
                let app_prior = application.status;
                application.transition(ApplicationStatus::OfferAccepted, &actor, now)?;
                self.saved_application(application.clone(), app_prior)?;
                self.repository.mark_placed(&offer.student, &offer.drive)?;
                self.notify(application_event(&application, app_prior, now));
            }
            OfferStatus::Rejected => {
                let mut application = self.require_application(&offer.application)?;
                let app_prior = application.status;
                application.transition(ApplicationStatus::OfferDeclined, &actor, now)?;
                self.saved_application(application.clone(), app_prior)?;
            }
            _ => {}
        }

        Ok(offer)
    }

    pub fn application_view(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationStatusView, PlacementServiceError> {
        let application = self.require_application(application_id)?;
        Ok(ApplicationStatusView::from_application(&application))
    }

    /// Current offer state. Reading past the deadline resolves the offer to
    /// `expired` and persists it, keeping the lazy-expiry contract without a
    /// background sweep.
    pub fn offer_view(
        &self,
        offer_id: &OfferId,
        now: DateTime<Utc>,
    ) -> Result<OfferView, PlacementServiceError> {
        let mut offer = self.require_offer(offer_id)?;
        if offer.expire_if_due(now) {
            self.saved_offer(offer.clone(), OfferStatus::Pending)?;
            self.notify(offer_event(&offer, OfferStatus::Pending, now));
        }
        Ok(OfferView::from_offer(&offer))
    }

    pub fn drive_report(
        &self,
        drive_id: &DriveId,
        now: DateTime<Utc>,
    ) -> Result<DriveReport, PlacementServiceError> {
        let drive = self.require_drive(drive_id)?;
        let applications = self.repository.applications_for_drive(drive_id)?;
        let offers = self.repository.offers_for_drive(drive_id)?;
        Ok(DriveReport::build(&drive, &applications, &offers, now))
    }

    fn require_drive(&self, id: &DriveId) -> Result<Drive, PlacementServiceError> {
        Ok(self
            .repository
            .find_drive(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn require_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Application, PlacementServiceError> {
        Ok(self
            .repository
            .find_application(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn require_offer(&self, id: &OfferId) -> Result<Offer, PlacementServiceError> {
        Ok(self
            .repository
            .find_offer(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    /// CAS persistence for applications: a stale precondition becomes the
    /// caller-facing `ConcurrentModification`, never an automatic retry.
    fn saved_application(
        &self,
        application: Application,
        expected: ApplicationStatus,
    ) -> Result<(), PlacementServiceError> {
        match self.repository.save_application(application, expected) {
            Err(RepositoryError::PreconditionFailed { expected }) => {
                Err(PlacementError::ConcurrentModification { expected }.into())
            }
            other => Ok(other?),
        }
    }

    fn saved_offer(
        &self,
        offer: Offer,
        expected: OfferStatus,
    ) -> Result<(), PlacementServiceError> {
        match self.repository.save_offer(offer, expected) {
            Err(RepositoryError::PreconditionFailed { expected }) => {
                Err(PlacementError::ConcurrentModification { expected }.into())
            }
            other => Ok(other?),
        }
    }

    /// Notification dispatch is best-effort: a committed transition is never
    /// rolled back because the dispatcher failed.
    fn notify(&self, event: PlacementEvent) {
        if let Err(error) = self.notifier.publish(event) {
            tracing::warn!(%error, "notification dispatch failed");
        }
    }
}

fn application_event(
    application: &Application,
    from: ApplicationStatus,
    at: DateTime<Utc>,
) -> PlacementEvent {
    PlacementEvent::ApplicationStatusChanged {
        application: application.id.clone(),
        drive: application.drive.clone(),
        student: application.student.clone(),
        from,
        to: application.status,
        at,
    }
}

fn offer_event(offer: &Offer, from: OfferStatus, at: DateTime<Utc>) -> PlacementEvent {
    PlacementEvent::OfferStatusChanged {
        offer: offer.id.clone(),
        application: offer.application.clone(),
        student: offer.student.clone(),
        from,
        to: offer.status,
        at,
    }
}

/// Error raised by the placement service.
#[derive(Debug, thiserror::Error)]
pub enum PlacementServiceError {
    #[error(transparent)]
    Lifecycle(#[from] PlacementError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
