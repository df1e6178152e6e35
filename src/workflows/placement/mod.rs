//! Placement drive lifecycle: eligibility screening, the application and
//! offer state machines, and the drive aggregate with derived phase and
//! recomputed statistics.
//!
//! The engine is transport- and storage-agnostic: persistence goes through
//! [`PlacementRepository`] and outbound notifications through
//! [`NotificationPublisher`], so the same lifecycle rules hold behind the
//! HTTP router, the CLI, and the test suites.

pub mod application;
pub mod domain;
pub mod drive;
pub mod eligibility;
pub mod memory;
pub mod offer;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use application::{
    Application, ApplicationStatus, RoundOutcome, RoundResult, StatusChange, WithdrawalRecord,
};
pub use domain::{
    Actor, ActorRole, ApplicationId, BacklogAllowance, BacklogRecord, DriveCriteria, DriveId,
    DrivePhase, DriveStatus, DriveTimeline, Gender, GenderPreference, OfferId, PlacementError,
    RegistrationPhase, StudentId, StudentSnapshot,
};
pub use drive::{CandidateEntry, Drive, DriveStatistics, FitAnnotation, SelectionRound};
pub use eligibility::{evaluate, EligibilityReport, EligibilityRule};
pub use memory::{InMemoryPlacementRepository, TracingNotifier};
pub use offer::{CounterProposal, Offer, OfferStatus};
pub use report::{
    ApplicationStatusView, CandidateView, DriveReport, OfferView, ScreeningEntry, ScreeningReport,
};
pub use repository::{
    NotificationPublisher, NotifyError, PlacementEvent, PlacementRepository, RepositoryError,
};
pub use router::placement_router;
pub use service::{
    NewDrive, OfferPolicy, OfferResponse, PlacementService, PlacementServiceError,
};
