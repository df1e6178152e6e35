use chrono::{DateTime, Utc};
use serde::Serialize;

use super::application::{Application, ApplicationStatus, RoundResult, WithdrawalRecord};
use super::domain::{
    ApplicationId, DriveId, DrivePhase, DriveStatus, OfferId, RegistrationPhase, StudentId,
};
use super::drive::{CandidateEntry, Drive, DriveStatistics};
use super::eligibility::EligibilityRule;
use super::offer::{CounterProposal, Offer, OfferStatus};

/// Sanitized representation of an application's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub student: StudentId,
    pub drive: DriveId,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub rounds: Vec<RoundView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal: Option<WithdrawalRecord>,
    pub last_change_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    pub round: String,
    pub order: u8,
    pub result: RoundResult,
    pub result_label: &'static str,
}

impl ApplicationStatusView {
    pub fn from_application(application: &Application) -> Self {
        let last_change_at = application
            .history
            .last()
            .map(|entry| entry.at)
            .unwrap_or(application.applied_at);

        Self {
            application_id: application.id.clone(),
            student: application.student.clone(),
            drive: application.drive.clone(),
            status: application.status,
            status_label: application.status.label(),
            rounds: application
                .rounds
                .iter()
                .map(|outcome| RoundView {
                    round: outcome.round.clone(),
                    order: outcome.order,
                    result: outcome.result,
                    result_label: outcome.result.label(),
                })
                .collect(),
            withdrawal: application.withdrawal.clone(),
            last_change_at,
        }
    }
}

/// Offer state exposed to callers, expiry already resolved for `now`.
#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    pub offer_id: OfferId,
    pub application_id: ApplicationId,
    pub status: OfferStatus,
    pub status_label: &'static str,
    pub compensation: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter: Option<CounterProposal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_message: Option<String>,
}

impl OfferView {
    pub fn from_offer(offer: &Offer) -> Self {
        Self {
            offer_id: offer.id.clone(),
            application_id: offer.application.clone(),
            status: offer.status,
            status_label: offer.status.label(),
            compensation: offer.compensation,
            issued_at: offer.issued_at,
            expires_at: offer.expires_at,
            counter: offer.counter.clone(),
            response_message: offer.response_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    pub student: StudentId,
    pub eligible: bool,
    pub failed_rules: Vec<EligibilityRule>,
    pub invited: bool,
    pub manually_added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_score: Option<u8>,
}

impl CandidateView {
    fn from_entry(entry: &CandidateEntry) -> Self {
        Self {
            student: entry.student.clone(),
            eligible: entry.report.eligible,
            failed_rules: entry.report.failed_rules.clone(),
            invited: entry.invited,
            manually_added: entry.manually_added,
            fit_score: entry.fit.as_ref().map(|fit| fit.score),
        }
    }
}

/// Point-in-time roll-up of a drive: derived phase, recomputed statistics,
/// and the candidate register.
#[derive(Debug, Clone, Serialize)]
pub struct DriveReport {
    pub drive: DriveId,
    pub title: String,
    pub company: String,
    pub status: DriveStatus,
    pub status_label: &'static str,
    pub phase: DrivePhase,
    pub phase_label: &'static str,
    pub registration: RegistrationPhase,
    pub registration_label: &'static str,
    pub days_until_drive: i64,
    pub statistics: DriveStatistics,
    pub candidates: Vec<CandidateView>,
}

impl DriveReport {
    pub fn build(
        drive: &Drive,
        applications: &[Application],
        offers: &[Offer],
        now: DateTime<Utc>,
    ) -> Self {
        let phase = drive.phase(now);
        let registration = drive.registration_phase(now);

        Self {
            drive: drive.id.clone(),
            title: drive.title.clone(),
            company: drive.company.clone(),
            status: drive.status,
            status_label: drive.status.label(),
            phase,
            phase_label: phase.label(),
            registration,
            registration_label: registration.label(),
            days_until_drive: drive.days_until_drive(now),
            statistics: drive.statistics(applications, offers),
            candidates: drive.candidates.iter().map(CandidateView::from_entry).collect(),
        }
    }
}

/// Result of screening a roster against one drive's criteria.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningReport {
    pub drive: DriveId,
    pub screened: usize,
    pub eligible: usize,
    pub entries: Vec<ScreeningEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningEntry {
    pub student: StudentId,
    pub eligible: bool,
    pub failed_rules: Vec<EligibilityRule>,
}
