use chrono::Duration;

use super::common::*;
use crate::workflows::placement::application::{
    Application, ApplicationStatus, RoundResult,
};
use crate::workflows::placement::domain::{ApplicationId, DriveStatus, PlacementError};
use crate::workflows::placement::eligibility::EligibilityRule;

fn open_application(suffix: &str) -> Application {
    let reference = now();
    let drive = active_drive("drive-app", reference);
    Application::open(
        ApplicationId(format!("app-{suffix}")),
        &drive,
        &student(&format!("stu-{suffix}")),
        &student_actor(&format!("stu-{suffix}")),
        reference,
    )
    .expect("eligible student applies inside the window")
}

#[test]
fn open_seeds_status_history_and_rounds() {
    let application = open_application("001");

    assert_eq!(application.status, ApplicationStatus::Applied);
    assert_eq!(application.history.len(), 1);
    assert_eq!(application.history[0].status, ApplicationStatus::Applied);
    assert_eq!(application.rounds.len(), 3);
    assert_eq!(application.rounds[0].round, "Online Test");
    assert!(application
        .rounds
        .iter()
        .all(|outcome| outcome.result == RoundResult::Scheduled));
}

#[test]
fn open_requires_an_open_registration_window() {
    let reference = now();

    let unpublished = draft_drive("drive-draft", reference);
    match Application::open(
        ApplicationId("app-draft".to_string()),
        &unpublished,
        &student("stu-020"),
        &student_actor("stu-020"),
        reference,
    ) {
        Err(PlacementError::RegistrationClosed) => {}
        other => panic!("expected registration closed, got {other:?}"),
    }

    let drive = active_drive("drive-late", reference);
    assert_eq!(drive.status, DriveStatus::Active);
    let too_late = reference + Duration::days(6);
    match Application::open(
        ApplicationId("app-late".to_string()),
        &drive,
        &student("stu-021"),
        &student_actor("stu-021"),
        too_late,
    ) {
        Err(PlacementError::RegistrationClosed) => {}
        other => panic!("expected registration closed, got {other:?}"),
    }
}

#[test]
fn open_surfaces_the_failed_rules() {
    let reference = now();
    let drive = active_drive("drive-rules", reference);

    let mut snapshot = student("stu-022");
    snapshot.cgpa = 6.0;
    snapshot.batch = "2024".to_string();

    match Application::open(
        ApplicationId("app-rules".to_string()),
        &drive,
        &snapshot,
        &student_actor("stu-022"),
        reference,
    ) {
        Err(PlacementError::NotEligible { failed_rules }) => {
            assert_eq!(
                failed_rules,
                vec![EligibilityRule::MinimumCgpa, EligibilityRule::Batch]
            );
        }
        other => panic!("expected not eligible, got {other:?}"),
    }
}

#[test]
fn full_walk_to_acceptance_records_every_step() {
    let mut application = open_application("002");
    let reviewer = company_actor();
    let steps = [
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Selected,
        ApplicationStatus::OfferIssued,
        ApplicationStatus::OfferAccepted,
    ];

    for (hours, step) in steps.iter().enumerate() {
        application
            .transition(*step, &reviewer, now() + Duration::hours(hours as i64 + 1))
            .expect("walk follows the table");
    }

    assert_eq!(application.status, ApplicationStatus::OfferAccepted);
    assert_eq!(application.history.len(), 6);

    // Every consecutive pair in the recorded history must be a legal edge.
    for window in application.history.windows(2) {
        assert!(
            window[0].status.can_transition_to(window[1].status),
            "history contains illegal edge {:?} -> {:?}",
            window[0].status,
            window[1].status
        );
    }
}

#[test]
fn illegal_transitions_fail_without_partial_mutation() {
    let mut application = open_application("003");

    match application.transition(ApplicationStatus::Selected, &company_actor(), now()) {
        Err(PlacementError::InvalidTransition { from, to }) => {
            assert_eq!(from, "applied");
            assert_eq!(to, "selected");
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }

    assert_eq!(application.status, ApplicationStatus::Applied);
    assert_eq!(application.history.len(), 1, "no history entry on failure");
}

#[test]
fn terminal_states_accept_nothing_further() {
    let mut application = open_application("004");
    application
        .transition(ApplicationStatus::Rejected, &company_actor(), now())
        .expect("applied can be rejected");

    for next in [
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Selected,
        ApplicationStatus::OfferIssued,
        ApplicationStatus::Withdrawn,
    ] {
        assert!(matches!(
            application.transition(next, &company_actor(), now()),
            Err(PlacementError::InvalidTransition { .. })
        ));
    }
}

#[test]
fn withdrawal_records_reason_and_initiator() {
    let mut application = open_application("005");
    let actor = student_actor("stu-005");

    application
        .withdraw("accepted another offer", &actor, now() + Duration::hours(1))
        .expect("applied application withdraws");

    assert_eq!(application.status, ApplicationStatus::Withdrawn);
    let record = application.withdrawal.expect("withdrawal recorded");
    assert_eq!(record.reason, "accepted another offer");
    assert_eq!(record.initiator, actor.role);
}

#[test]
fn withdrawal_is_refused_once_an_offer_is_issued() {
    let mut application = open_application("006");
    let reviewer = company_actor();
    for step in [
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Selected,
        ApplicationStatus::OfferIssued,
    ] {
        application
            .transition(step, &reviewer, now())
            .expect("walk to offer issuance");
    }

    match application.withdraw("changed my mind", &student_actor("stu-006"), now()) {
        Err(PlacementError::InvalidTransition { from, to }) => {
            assert_eq!(from, "offer_issued");
            assert_eq!(to, "withdrawn");
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    assert!(application.withdrawal.is_none());
}

#[test]
fn round_outcomes_update_by_order() {
    let mut application = open_application("007");

    application
        .record_round(1, RoundResult::Cleared)
        .expect("first round records");
    application
        .record_round(2, RoundResult::Eliminated)
        .expect("second round records");

    assert_eq!(application.rounds[0].result, RoundResult::Cleared);
    assert_eq!(application.rounds[1].result, RoundResult::Eliminated);
    assert_eq!(application.rounds[2].result, RoundResult::Scheduled);

    match application.record_round(9, RoundResult::Cleared) {
        Err(PlacementError::RoundNotFound { order }) => assert_eq!(order, 9),
        other => panic!("expected round not found, got {other:?}"),
    }
}

#[test]
fn has_reached_tracks_the_full_trail() {
    let mut application = open_application("008");
    let reviewer = company_actor();
    application
        .transition(ApplicationStatus::UnderReview, &reviewer, now())
        .expect("under review");
    application
        .transition(ApplicationStatus::Shortlisted, &reviewer, now())
        .expect("shortlisted");
    application
        .transition(ApplicationStatus::Selected, &reviewer, now())
        .expect("selected");

    assert!(application.has_reached(ApplicationStatus::Applied));
    assert!(application.has_reached(ApplicationStatus::Shortlisted));
    assert!(application.has_reached(ApplicationStatus::Selected));
    assert!(!application.has_reached(ApplicationStatus::OfferIssued));
}
