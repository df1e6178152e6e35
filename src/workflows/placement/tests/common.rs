use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::placement::application::{Application, ApplicationStatus};
use crate::workflows::placement::domain::{
    Actor, ActorRole, ApplicationId, BacklogAllowance, BacklogRecord, DriveCriteria, DriveId,
    DriveTimeline, Gender, GenderPreference, OfferId, StudentId, StudentSnapshot,
};
use crate::workflows::placement::drive::{Drive, SelectionRound};
use crate::workflows::placement::memory::InMemoryPlacementRepository;
use crate::workflows::placement::offer::{Offer, OfferStatus};
use crate::workflows::placement::repository::{
    NotificationPublisher, NotifyError, PlacementEvent, PlacementRepository, RepositoryError,
};
use crate::workflows::placement::service::{OfferPolicy, PlacementService};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn timeline_around(reference: DateTime<Utc>) -> DriveTimeline {
    DriveTimeline {
        registration_start: reference - Duration::days(1),
        registration_end: reference + Duration::days(5),
        drive_date: reference + Duration::days(10),
        result_date: Some(reference + Duration::days(15)),
    }
}

pub(super) fn criteria() -> DriveCriteria {
    DriveCriteria {
        minimum_cgpa: 7.0,
        allowed_backlogs: BacklogAllowance {
            current: 0,
            history: 1,
        },
        courses: BTreeSet::from(["B.Tech".to_string()]),
        departments: BTreeSet::from(["Computer Science".to_string()]),
        batches: BTreeSet::from(["2026".to_string()]),
        gender_preference: GenderPreference::Any,
    }
}

pub(super) fn open_criteria() -> DriveCriteria {
    DriveCriteria {
        minimum_cgpa: 0.0,
        allowed_backlogs: BacklogAllowance {
            current: u8::MAX,
            history: u8::MAX,
        },
        courses: BTreeSet::new(),
        departments: BTreeSet::new(),
        batches: BTreeSet::new(),
        gender_preference: GenderPreference::Any,
    }
}

pub(super) fn student(id: &str) -> StudentSnapshot {
    StudentSnapshot {
        student: StudentId(id.to_string()),
        university: "Metro State".to_string(),
        department: "Computer Science".to_string(),
        course: "B.Tech".to_string(),
        batch: "2026".to_string(),
        cgpa: 8.2,
        backlogs: BacklogRecord {
            current: 0,
            history: 0,
        },
        gender: Gender::Female,
        verified: true,
    }
}

pub(super) fn selection_rounds() -> Vec<SelectionRound> {
    vec![
        SelectionRound {
            name: "Online Test".to_string(),
            order: 1,
            elimination: true,
        },
        SelectionRound {
            name: "Technical Interview".to_string(),
            order: 2,
            elimination: true,
        },
        SelectionRound {
            name: "HR Interview".to_string(),
            order: 3,
            elimination: false,
        },
    ]
}

pub(super) fn draft_drive(id: &str, reference: DateTime<Utc>) -> Drive {
    Drive::new(
        DriveId(id.to_string()),
        "Graduate Engineer 2026",
        "Skyline Systems",
        "Metro State",
        criteria(),
        timeline_around(reference),
        selection_rounds(),
    )
}

pub(super) fn active_drive(id: &str, reference: DateTime<Utc>) -> Drive {
    let mut drive = draft_drive(id, reference);
    drive.publish().expect("draft drive publishes");
    drive
}

pub(super) fn student_actor(id: &str) -> Actor {
    Actor::new(id, ActorRole::Student)
}

pub(super) fn company_actor() -> Actor {
    Actor::new("skyline-hr", ActorRole::Company)
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<PlacementEvent>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<PlacementEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, event: PlacementEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Dispatcher that always fails, for asserting best-effort semantics.
pub(super) struct FailingNotifier;

impl NotificationPublisher for FailingNotifier {
    fn publish(&self, _event: PlacementEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    PlacementService<InMemoryPlacementRepository, MemoryNotifier>,
    Arc<InMemoryPlacementRepository>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(InMemoryPlacementRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = PlacementService::new(
        repository.clone(),
        notifier.clone(),
        OfferPolicy::default(),
    );
    (service, repository, notifier)
}

/// Seed a published drive plus one eligible student and return the pieces
/// most scenarios start from.
pub(super) fn seeded_service(
    drive_id: &str,
    student_id: &str,
    reference: DateTime<Utc>,
) -> (
    PlacementService<InMemoryPlacementRepository, MemoryNotifier>,
    Arc<InMemoryPlacementRepository>,
    Arc<MemoryNotifier>,
    DriveId,
    StudentId,
) {
    let (service, repository, notifier) = build_service();
    repository
        .insert_drive(active_drive(drive_id, reference))
        .expect("drive seeds");
    repository
        .upsert_student(student(student_id))
        .expect("student seeds");
    (
        service,
        repository,
        notifier,
        DriveId(drive_id.to_string()),
        StudentId(student_id.to_string()),
    )
}

/// Walk an application up to `selected` through the service facade.
pub(super) fn select_application(
    service: &PlacementService<InMemoryPlacementRepository, MemoryNotifier>,
    drive: &DriveId,
    student: &StudentId,
    reference: DateTime<Utc>,
) -> Application {
    let applicant = student_actor(&student.0);
    let reviewer = company_actor();
    let application = service
        .apply(drive, student, &applicant, reference)
        .expect("application opens");
    service
        .advance(
            &application.id,
            ApplicationStatus::UnderReview,
            &reviewer,
            reference + Duration::hours(1),
        )
        .expect("moves under review");
    service
        .advance(
            &application.id,
            ApplicationStatus::Shortlisted,
            &reviewer,
            reference + Duration::hours(2),
        )
        .expect("shortlists");
    service
        .advance(
            &application.id,
            ApplicationStatus::Selected,
            &reviewer,
            reference + Duration::hours(3),
        )
        .expect("selects")
}

/// Repository simulating a competing writer: reads observe a pending offer,
/// but every offer save loses the compare-and-swap.
pub(super) struct RacedOfferRepository {
    pub(super) offer: Offer,
    pub(super) application: Application,
}

impl PlacementRepository for RacedOfferRepository {
    fn find_student(&self, _id: &StudentId) -> Result<Option<StudentSnapshot>, RepositoryError> {
        Ok(None)
    }

    fn upsert_student(&self, _snapshot: StudentSnapshot) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn find_drive(&self, _id: &DriveId) -> Result<Option<Drive>, RepositoryError> {
        Ok(None)
    }

    fn insert_drive(&self, _drive: Drive) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn save_drive(&self, _drive: Drive) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn find_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(Some(self.application.clone()))
    }

    fn insert_application(&self, _application: Application) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn save_application(
        &self,
        _application: Application,
        expected_prior: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::PreconditionFailed {
            expected: expected_prior.label(),
        })
    }

    fn application_for(
        &self,
        _drive: &DriveId,
        _student: &StudentId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(None)
    }

    fn applications_for_drive(
        &self,
        _drive: &DriveId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(Vec::new())
    }

    fn find_offer(&self, _id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Ok(Some(self.offer.clone()))
    }

    fn insert_offer(&self, _offer: Offer) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn save_offer(
        &self,
        _offer: Offer,
        expected_prior: OfferStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::PreconditionFailed {
            expected: expected_prior.label(),
        })
    }

    fn pending_offer_for(
        &self,
        _application: &ApplicationId,
    ) -> Result<Option<Offer>, RepositoryError> {
        Ok(None)
    }

    fn offers_for_application(
        &self,
        _application: &ApplicationId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        Ok(Vec::new())
    }

    fn offers_for_drive(&self, _drive: &DriveId) -> Result<Vec<Offer>, RepositoryError> {
        Ok(Vec::new())
    }

    fn mark_placed(&self, _student: &StudentId, _drive: &DriveId) -> Result<(), RepositoryError> {
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
