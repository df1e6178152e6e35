use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::application::{Application, ApplicationStatus};
use super::domain::{
    DriveCriteria, DriveId, DrivePhase, DriveStatus, DriveTimeline, PlacementError,
    RegistrationPhase, StudentId,
};
use super::eligibility::EligibilityReport;
use super::offer::{Offer, OfferStatus};

/// One round of a drive's selection process, in company-defined order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRound {
    pub name: String,
    pub order: u8,
    pub elimination: bool,
}

/// Advisory score supplied by the AI assistance collaborator. Opaque
/// metadata only: it never feeds the evaluator and can never move a
/// lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitAnnotation {
    pub score: u8,
    pub reasons: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Per-student entry on the drive's candidate register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub student: StudentId,
    pub report: EligibilityReport,
    pub invited: bool,
    pub invited_at: Option<DateTime<Utc>>,
    pub manually_added: bool,
    pub fit: Option<FitAnnotation>,
}

/// Roll-up counts for a drive, always recomputed from the authoritative
/// collections. A cache, not a source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveStatistics {
    pub eligible: usize,
    pub invited: usize,
    pub applied: usize,
    pub shortlisted: usize,
    pub selected: usize,
    pub offers_issued: usize,
    pub offers_accepted: usize,
}

/// A company's recruitment event at a university. Owns the criteria, the
/// timeline, and the candidate register; applications and offers live in the
/// repository and are aggregated by read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drive {
    pub id: DriveId,
    pub title: String,
    pub company: String,
    pub university: String,
    pub criteria: DriveCriteria,
    pub timeline: DriveTimeline,
    pub selection_rounds: Vec<SelectionRound>,
    pub status: DriveStatus,
    pub candidates: Vec<CandidateEntry>,
}

impl Drive {
    pub fn new(
        id: DriveId,
        title: impl Into<String>,
        company: impl Into<String>,
        university: impl Into<String>,
        criteria: DriveCriteria,
        timeline: DriveTimeline,
        selection_rounds: Vec<SelectionRound>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            company: company.into(),
            university: university.into(),
            criteria,
            timeline,
            selection_rounds,
            status: DriveStatus::Draft,
            candidates: Vec::new(),
        }
    }

    /// Timeline phase at `now`. Recomputed on every read so it can never go
    /// stale; drive day spans 24 hours from the drive date.
    pub fn phase(&self, now: DateTime<Utc>) -> DrivePhase {
        let timeline = &self.timeline;
        if now < timeline.registration_start {
            DrivePhase::Upcoming
        } else if now <= timeline.registration_end {
            DrivePhase::Registration
        } else if now < timeline.drive_date {
            DrivePhase::PreDrive
        } else if now <= timeline.drive_date + Duration::hours(24) {
            DrivePhase::DriveDay
        } else if matches!(timeline.result_date, Some(result) if now < result) {
            DrivePhase::Evaluation
        } else {
            DrivePhase::Completed
        }
    }

    pub fn registration_phase(&self, now: DateTime<Utc>) -> RegistrationPhase {
        if now < self.timeline.registration_start {
            RegistrationPhase::NotStarted
        } else if now <= self.timeline.registration_end {
            RegistrationPhase::Open
        } else {
            RegistrationPhase::Closed
        }
    }

    /// Applications are accepted only from a published drive whose
    /// registration window is currently open.
    pub fn registration_open(&self, now: DateTime<Utc>) -> bool {
        self.status == DriveStatus::Active
            && self.registration_phase(now) == RegistrationPhase::Open
    }

    pub fn days_until_drive(&self, now: DateTime<Utc>) -> i64 {
        (self.timeline.drive_date - now).num_days()
    }

    pub fn publish(&mut self) -> Result<(), PlacementError> {
        match self.status {
            DriveStatus::Draft => {
                self.status = DriveStatus::Active;
                Ok(())
            }
            other => Err(PlacementError::InvalidTransition {
                from: other.label(),
                to: DriveStatus::Active.label(),
            }),
        }
    }

    /// Manually close registration ahead of the window's end.
    pub fn close(&mut self) -> Result<(), PlacementError> {
        match self.status {
            DriveStatus::Active => {
                self.status = DriveStatus::Closed;
                Ok(())
            }
            other => Err(PlacementError::InvalidTransition {
                from: other.label(),
                to: DriveStatus::Closed.label(),
            }),
        }
    }

    /// Completion is only reachable once the timeline itself has run out.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), PlacementError> {
        let from = self.status.label();
        if !matches!(self.status, DriveStatus::Active | DriveStatus::Closed)
            || self.phase(now) != DrivePhase::Completed
        {
            return Err(PlacementError::InvalidTransition {
                from,
                to: DriveStatus::Completed.label(),
            });
        }

        self.status = DriveStatus::Completed;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), PlacementError> {
        match self.status {
            DriveStatus::Draft | DriveStatus::Active | DriveStatus::Closed => {
                self.status = DriveStatus::Cancelled;
                Ok(())
            }
            other => Err(PlacementError::InvalidTransition {
                from: other.label(),
                to: DriveStatus::Cancelled.label(),
            }),
        }
    }

    /// Add a student to the candidate register, at most once per student.
    /// Returns false when the student already holds an entry.
    pub fn register_candidate(
        &mut self,
        student: StudentId,
        report: EligibilityReport,
        manually_added: bool,
    ) -> bool {
        if self.candidate(&student).is_some() {
            return false;
        }

        self.candidates.push(CandidateEntry {
            student,
            report,
            invited: false,
            invited_at: None,
            manually_added,
            fit: None,
        });
        true
    }

    pub fn candidate(&self, student: &StudentId) -> Option<&CandidateEntry> {
        self.candidates
            .iter()
            .find(|entry| &entry.student == student)
    }

    /// Mark a registered candidate as invited. Returns false for students
    /// not on the register.
    pub fn invite(&mut self, student: &StudentId, now: DateTime<Utc>) -> bool {
        match self
            .candidates
            .iter_mut()
            .find(|entry| &entry.student == student)
        {
            Some(entry) => {
                if !entry.invited {
                    entry.invited = true;
                    entry.invited_at = Some(now);
                }
                true
            }
            None => false,
        }
    }

    /// Attach advisory AI metadata to a registered candidate. Returns false
    /// for students not on the register.
    pub fn annotate_fit(&mut self, student: &StudentId, fit: FitAnnotation) -> bool {
        match self
            .candidates
            .iter_mut()
            .find(|entry| &entry.student == student)
        {
            Some(entry) => {
                entry.fit = Some(fit);
                true
            }
            None => false,
        }
    }

    /// Recompute the roll-up counts from the authoritative collections.
    /// Idempotent: same inputs, same output, no stored counters involved.
    /// "Reached" counts walk each application's history so a candidate who
    /// moved on from `shortlisted` still counts as shortlisted.
    pub fn statistics(&self, applications: &[Application], offers: &[Offer]) -> DriveStatistics {
        DriveStatistics {
            eligible: self.candidates.len(),
            invited: self.candidates.iter().filter(|entry| entry.invited).count(),
            applied: applications.len(),
            shortlisted: applications
                .iter()
                .filter(|application| application.has_reached(ApplicationStatus::Shortlisted))
                .count(),
            selected: applications
                .iter()
                .filter(|application| application.has_reached(ApplicationStatus::Selected))
                .count(),
            offers_issued: offers.len(),
            offers_accepted: offers
                .iter()
                .filter(|offer| offer.status == OfferStatus::Accepted)
                .count(),
        }
    }
}
