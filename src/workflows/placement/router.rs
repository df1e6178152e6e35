use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::application::{ApplicationStatus, RoundResult};
use super::domain::{
    Actor, ActorRole, ApplicationId, DriveId, OfferId, PlacementError, StudentId, StudentSnapshot,
};
use super::drive::FitAnnotation;
use super::repository::{NotificationPublisher, PlacementRepository, RepositoryError};
use super::service::{NewDrive, OfferResponse, PlacementService, PlacementServiceError};

/// Router builder exposing the placement workflow over HTTP. Each error kind
/// maps to one stable status code so transport callers can branch on it.
pub fn placement_router<R, N>(service: Arc<PlacementService<R, N>>) -> Router
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/placement/drives", post(create_drive_handler::<R, N>))
        .route(
            "/api/v1/placement/drives/:drive_id/publish",
            put(publish_drive_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/drives/:drive_id/cancel",
            put(cancel_drive_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/drives/:drive_id/complete",
            put(complete_drive_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/drives/:drive_id/screen",
            post(screen_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/drives/:drive_id/invite",
            post(invite_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/drives/:drive_id/fit",
            post(annotate_fit_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/drives/:drive_id/report",
            get(drive_report_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/drives/:drive_id/applications",
            post(apply_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/applications/:application_id",
            get(application_status_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/applications/:application_id/status",
            put(advance_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/applications/:application_id/withdraw",
            put(withdraw_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/applications/:application_id/rounds",
            put(record_round_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/applications/:application_id/offers",
            post(issue_offer_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/offers/:offer_id",
            get(offer_status_handler::<R, N>),
        )
        .route(
            "/api/v1/placement/offers/:offer_id/respond",
            put(respond_offer_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorPayload {
    id: String,
    role: ActorRole,
}

impl ActorPayload {
    fn into_actor(self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    student: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdvanceRequest {
    status: ApplicationStatus,
    actor: ActorPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WithdrawRequest {
    reason: String,
    actor: ActorPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordRoundRequest {
    order: u8,
    result: RoundResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueOfferRequest {
    compensation: u64,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    actor: ActorPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InviteRequest {
    student: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FitRequest {
    student: String,
    score: u8,
    #[serde(default)]
    reasons: Vec<String>,
}

pub(crate) async fn create_drive_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    axum::Json(definition): axum::Json<NewDrive>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.create_drive(definition) {
        Ok(drive) => (StatusCode::CREATED, axum::Json(drive)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn publish_drive_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(drive_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.publish_drive(&DriveId(drive_id)) {
        Ok(drive) => (StatusCode::OK, axum::Json(drive)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_drive_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(drive_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.cancel_drive(&DriveId(drive_id)) {
        Ok(drive) => (StatusCode::OK, axum::Json(drive)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_drive_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(drive_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.complete_drive(&DriveId(drive_id), Utc::now()) {
        Ok(drive) => (StatusCode::OK, axum::Json(drive)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn screen_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(drive_id): Path<String>,
    axum::Json(roster): axum::Json<Vec<StudentSnapshot>>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.screen(&DriveId(drive_id), &roster) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn invite_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(drive_id): Path<String>,
    axum::Json(request): axum::Json<InviteRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.invite(
        &DriveId(drive_id),
        &StudentId(request.student),
        Utc::now(),
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn annotate_fit_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(drive_id): Path<String>,
    axum::Json(request): axum::Json<FitRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let fit = FitAnnotation {
        score: request.score,
        reasons: request.reasons,
        generated_at: Utc::now(),
    };
    match service.annotate_fit(&DriveId(drive_id), &StudentId(request.student), fit) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn drive_report_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(drive_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.drive_report(&DriveId(drive_id), Utc::now()) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn apply_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(drive_id): Path<String>,
    axum::Json(request): axum::Json<ApplyRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let student = StudentId(request.student);
    let actor = Actor::new(student.0.clone(), ActorRole::Student);
    match service.apply(&DriveId(drive_id), &student, &actor, Utc::now()) {
        Ok(application) => (
            StatusCode::CREATED,
            axum::Json(super::report::ApplicationStatusView::from_application(
                &application,
            )),
        )
            .into_response(),
        Err(PlacementServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({
                "error": "student already applied to this drive",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_status_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.application_view(&ApplicationId(application_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<AdvanceRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = request.actor.into_actor();
    match service.advance(
        &ApplicationId(application_id),
        request.status,
        &actor,
        Utc::now(),
    ) {
        Ok(application) => (
            StatusCode::OK,
            axum::Json(super::report::ApplicationStatusView::from_application(
                &application,
            )),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdraw_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<WithdrawRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = request.actor.into_actor();
    match service.withdraw(
        &ApplicationId(application_id),
        request.reason,
        &actor,
        Utc::now(),
    ) {
        Ok(application) => (
            StatusCode::OK,
            axum::Json(super::report::ApplicationStatusView::from_application(
                &application,
            )),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_round_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<RecordRoundRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.record_round(&ApplicationId(application_id), request.order, request.result) {
        Ok(application) => (
            StatusCode::OK,
            axum::Json(super::report::ApplicationStatusView::from_application(
                &application,
            )),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn issue_offer_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<IssueOfferRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = request.actor.into_actor();
    match service.issue_offer(
        &ApplicationId(application_id),
        request.compensation,
        request.expires_at,
        &actor,
        Utc::now(),
    ) {
        Ok(offer) => (
            StatusCode::CREATED,
            axum::Json(super::report::OfferView::from_offer(&offer)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn offer_status_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.offer_view(&OfferId(offer_id), Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn respond_offer_handler<R, N>(
    State(service): State<Arc<PlacementService<R, N>>>,
    Path(offer_id): Path<String>,
    axum::Json(response): axum::Json<OfferResponse>,
) -> Response
where
    R: PlacementRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.respond_to_offer(&OfferId(offer_id), response, Utc::now()) {
        Ok(offer) => (
            StatusCode::OK,
            axum::Json(super::report::OfferView::from_offer(&offer)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

/// One stable status code per error kind so callers can branch without
/// parsing messages.
fn error_response(error: PlacementServiceError) -> Response {
    let status = match &error {
        PlacementServiceError::Lifecycle(lifecycle) => match lifecycle {
            PlacementError::NotEligible { failed_rules } => {
                let payload = json!({
                    "error": error.to_string(),
                    "failed_rules": failed_rules
                        .iter()
                        .map(|rule| rule.label())
                        .collect::<Vec<_>>(),
                });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
            }
            PlacementError::RegistrationClosed => StatusCode::UNPROCESSABLE_ENTITY,
            PlacementError::InvalidTransition { .. }
            | PlacementError::ApplicationNotSelected { .. }
            | PlacementError::DuplicatePendingOffer
            | PlacementError::ConcurrentModification { .. } => StatusCode::CONFLICT,
            PlacementError::OfferExpired { .. } => StatusCode::GONE,
            PlacementError::RoundNotFound { .. } => StatusCode::NOT_FOUND,
        },
        PlacementServiceError::Repository(repository) => match repository {
            RepositoryError::NotFound => StatusCode::NOT_FOUND,
            RepositoryError::Conflict | RepositoryError::PreconditionFailed { .. } => {
                StatusCode::CONFLICT
            }
            RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
