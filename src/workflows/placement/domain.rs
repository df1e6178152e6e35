use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::eligibility::EligibilityRule;

/// Identifier wrapper for enrolled students.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for placement drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriveId(pub String);

/// Identifier wrapper for drive applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for compensation offers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Gender restriction attached to a drive's criteria. `Any` admits everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPreference {
    Any,
    Male,
    Female,
}

impl GenderPreference {
    pub const fn admits(self, gender: Gender) -> bool {
        match self {
            GenderPreference::Any => true,
            GenderPreference::Male => matches!(gender, Gender::Male),
            GenderPreference::Female => matches!(gender, Gender::Female),
        }
    }

    const fn any() -> Self {
        GenderPreference::Any
    }
}

/// Current and historical backlog counts carried on a student record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogRecord {
    pub current: u8,
    pub history: u8,
}

/// Backlog allowance a drive is willing to tolerate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogAllowance {
    pub current: u8,
    pub history: u8,
}

/// Read-only academic snapshot taken from the student aggregate at decision
/// time. The lifecycle engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub student: StudentId,
    pub university: String,
    pub department: String,
    pub course: String,
    pub batch: String,
    pub cgpa: f32,
    pub backlogs: BacklogRecord,
    pub gender: Gender,
    pub verified: bool,
}

/// Eligibility predicates a drive imposes on applicants. Empty set-typed
/// fields mean "no restriction", never "excludes everyone".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveCriteria {
    pub minimum_cgpa: f32,
    #[serde(default)]
    pub allowed_backlogs: BacklogAllowance,
    #[serde(default)]
    pub courses: BTreeSet<String>,
    #[serde(default)]
    pub departments: BTreeSet<String>,
    #[serde(default)]
    pub batches: BTreeSet<String>,
    #[serde(default = "GenderPreference::any")]
    pub gender_preference: GenderPreference,
}

/// The four instants that drive every derived phase computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveTimeline {
    pub registration_start: DateTime<Utc>,
    pub registration_end: DateTime<Utc>,
    pub drive_date: DateTime<Utc>,
    pub result_date: Option<DateTime<Utc>>,
}

/// Stored administrative status of a drive. Phase is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStatus {
    Draft,
    Active,
    Closed,
    Completed,
    Cancelled,
}

impl DriveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DriveStatus::Draft => "draft",
            DriveStatus::Active => "active",
            DriveStatus::Closed => "closed",
            DriveStatus::Completed => "completed",
            DriveStatus::Cancelled => "cancelled",
        }
    }
}

/// Where a drive sits on its timeline, recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivePhase {
    Upcoming,
    Registration,
    PreDrive,
    DriveDay,
    Evaluation,
    Completed,
}

impl DrivePhase {
    pub const fn label(self) -> &'static str {
        match self {
            DrivePhase::Upcoming => "upcoming",
            DrivePhase::Registration => "registration",
            DrivePhase::PreDrive => "pre_drive",
            DrivePhase::DriveDay => "drive_day",
            DrivePhase::Evaluation => "evaluation",
            DrivePhase::Completed => "completed",
        }
    }
}

/// Derived registration window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPhase {
    NotStarted,
    Open,
    Closed,
}

impl RegistrationPhase {
    pub const fn label(self) -> &'static str {
        match self {
            RegistrationPhase::NotStarted => "not_started",
            RegistrationPhase::Open => "open",
            RegistrationPhase::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Student,
    University,
    Company,
    Admin,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Student => "student",
            ActorRole::University => "university",
            ActorRole::Company => "company",
            ActorRole::Admin => "admin",
        }
    }
}

/// Capability-tagged actor recorded against every transition. Authorization
/// happens at the transport boundary; the core only keeps the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Failure taxonomy for lifecycle operations. Each kind is a deterministic,
/// single-operation failure the caller can translate directly into a
/// user-facing message; none are retried internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error("student does not satisfy the drive criteria ({})", format_rules(.failed_rules))]
    NotEligible { failed_rules: Vec<EligibilityRule> },
    #[error("drive registration is not open")]
    RegistrationClosed,
    #[error("transition from {from} to {to} is not permitted")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("offer requires a selected application, found {status}")]
    ApplicationNotSelected { status: &'static str },
    #[error("a pending offer already exists for this application")]
    DuplicatePendingOffer,
    #[error("offer expired at {expired_at}")]
    OfferExpired { expired_at: DateTime<Utc> },
    #[error("entity changed concurrently, expected status {expected}")]
    ConcurrentModification { expected: &'static str },
    #[error("selection round {order} does not exist for this application")]
    RoundNotFound { order: u8 },
}

fn format_rules(rules: &[EligibilityRule]) -> String {
    rules
        .iter()
        .map(|rule| rule.label())
        .collect::<Vec<_>>()
        .join(", ")
}
