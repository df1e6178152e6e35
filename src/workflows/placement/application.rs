use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Actor, ActorRole, ApplicationId, DriveId, PlacementError, StudentId, StudentSnapshot,
};
use super::drive::Drive;
use super::eligibility;

/// Selection-process progress of a single application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    UnderReview,
    Shortlisted,
    Rejected,
    Selected,
    OfferIssued,
    OfferAccepted,
    OfferDeclined,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Selected => "selected",
            ApplicationStatus::OfferIssued => "offer_issued",
            ApplicationStatus::OfferAccepted => "offer_accepted",
            ApplicationStatus::OfferDeclined => "offer_declined",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// The transition table. Anything outside it is rejected; an application
    /// never moves backward, and withdrawal stops being available once an
    /// offer is on the table.
    pub const fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Applied, UnderReview)
                | (Applied, Rejected)
                | (Applied, Withdrawn)
                | (UnderReview, Shortlisted)
                | (UnderReview, Rejected)
                | (UnderReview, Withdrawn)
                | (Shortlisted, Selected)
                | (Shortlisted, Rejected)
                | (Shortlisted, Withdrawn)
                | (Selected, OfferIssued)
                | (Selected, Withdrawn)
                | (OfferIssued, OfferAccepted)
                | (OfferIssued, OfferDeclined)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected
                | ApplicationStatus::OfferAccepted
                | ApplicationStatus::OfferDeclined
                | ApplicationStatus::Withdrawn
        )
    }
}

/// Append-only audit entry written for every transition, creation included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    pub at: DateTime<Utc>,
    pub actor: Actor,
}

/// Captured when an application is withdrawn; terminal and immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub reason: String,
    pub at: DateTime<Utc>,
    pub initiator: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundResult {
    Scheduled,
    Cleared,
    Eliminated,
}

impl RoundResult {
    pub const fn label(self) -> &'static str {
        match self {
            RoundResult::Scheduled => "scheduled",
            RoundResult::Cleared => "cleared",
            RoundResult::Eliminated => "eliminated",
        }
    }
}

/// Outcome slot for one round of the drive's selection process, seeded at
/// application time in drive order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: String,
    pub order: u8,
    pub result: RoundResult,
}

/// A student's formal entry into a drive's selection process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student: StudentId,
    pub drive: DriveId,
    pub status: ApplicationStatus,
    pub rounds: Vec<RoundOutcome>,
    pub history: Vec<StatusChange>,
    pub withdrawal: Option<WithdrawalRecord>,
    pub applied_at: DateTime<Utc>,
}

impl Application {
    /// Open an application for a drive. Requires the drive's derived
    /// registration phase to be open and the student to pass every
    /// eligibility rule; the two causes fail distinctly so callers can
    /// message them apart.
    pub fn open(
        id: ApplicationId,
        drive: &Drive,
        student: &StudentSnapshot,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Self, PlacementError> {
        if !drive.registration_open(now) {
            return Err(PlacementError::RegistrationClosed);
        }

        let report = eligibility::evaluate(student, &drive.criteria);
        if !report.eligible {
            return Err(PlacementError::NotEligible {
                failed_rules: report.failed_rules,
            });
        }

        let rounds = drive
            .selection_rounds
            .iter()
            .map(|round| RoundOutcome {
                round: round.name.clone(),
                order: round.order,
                result: RoundResult::Scheduled,
            })
            .collect();

        Ok(Self {
            id,
            student: student.student.clone(),
            drive: drive.id.clone(),
            status: ApplicationStatus::Applied,
            rounds,
            history: vec![StatusChange {
                status: ApplicationStatus::Applied,
                at: now,
                actor: actor.clone(),
            }],
            withdrawal: None,
            applied_at: now,
        })
    }

    /// Move the application along the transition table, appending a history
    /// entry. History is never rewritten.
    pub fn transition(
        &mut self,
        next: ApplicationStatus,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), PlacementError> {
        if !self.status.can_transition_to(next) {
            return Err(PlacementError::InvalidTransition {
                from: self.status.label(),
                to: next.label(),
            });
        }

        self.status = next;
        self.history.push(StatusChange {
            status: next,
            at: now,
            actor: actor.clone(),
        });
        Ok(())
    }

    /// Withdraw the application, recording who pulled it and why. Follows
    /// the same table as any other transition, so withdrawal after offer
    /// issuance is refused.
    pub fn withdraw(
        &mut self,
        reason: impl Into<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), PlacementError> {
        self.transition(ApplicationStatus::Withdrawn, actor, now)?;
        self.withdrawal = Some(WithdrawalRecord {
            reason: reason.into(),
            at: now,
            initiator: actor.role,
        });
        Ok(())
    }

    /// Record the outcome of one selection round by its drive order.
    pub fn record_round(
        &mut self,
        order: u8,
        result: RoundResult,
    ) -> Result<(), PlacementError> {
        let slot = self
            .rounds
            .iter_mut()
            .find(|outcome| outcome.order == order)
            .ok_or(PlacementError::RoundNotFound { order })?;
        slot.result = result;
        Ok(())
    }

    /// Whether the application's audit trail ever touched `status`. Used by
    /// the drive aggregate so roll-up counts survive later transitions.
    pub fn has_reached(&self, status: ApplicationStatus) -> bool {
        self.history.iter().any(|entry| entry.status == status)
    }
}
