use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{ApplicationId, InternshipId, StudentProfile};
use super::lifecycle::ApplicationStatus;
use super::matching::MatchConfig;
use super::ranking::RecommendationFilters;
use super::repository::{
    ApplicationRepository, InternshipCatalog, OfferRepository, RepositoryError,
};
use super::service::{PlacementError, PlacementService};

const DEFAULT_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub student: StudentProfile,
    #[serde(default)]
    pub filters: RecommendationFilters,
    #[serde(default)]
    pub config: Option<MatchConfig>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub student: StudentProfile,
    pub internship_id: InternshipId,
    #[serde(default)]
    pub form_data: Value,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
}

type Shared<A, O, C> = Arc<PlacementService<A, O, C>>;

/// Router builder exposing recommendation, application, and offer endpoints.
pub fn placement_router<A, O, C>(service: Shared<A, O, C>) -> Router
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    Router::new()
        .route(
            "/api/v1/recommendations",
            post(recommendations_handler::<A, O, C>),
        )
        .route("/api/v1/applications", post(apply_handler::<A, O, C>))
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<A, O, C>),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler::<A, O, C>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(update_status_handler::<A, O, C>),
        )
        .route(
            "/api/v1/applications/:application_id/offer",
            post(issue_offer_handler::<A, O, C>),
        )
        .route(
            "/api/v1/applications/:application_id/offer/accept",
            post(accept_offer_handler::<A, O, C>),
        )
        .route(
            "/api/v1/applications/:application_id/offer/decline",
            post(decline_offer_handler::<A, O, C>),
        )
        .route("/api/v1/offers/expire", post(expire_handler::<A, O, C>))
        .with_state(service)
}

impl IntoResponse for PlacementError {
    fn into_response(self) -> Response {
        let status = match &self {
            PlacementError::ApplicationNotFound(_)
            | PlacementError::InternshipNotFound(_)
            | PlacementError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            PlacementError::InvalidTransition(_)
            | PlacementError::OfferPending(_)
            | PlacementError::NoLiveOffer(_)
            | PlacementError::CapacityExceeded { .. }
            | PlacementError::DuplicateApplication { .. }
            | PlacementError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            PlacementError::OfferExpired { .. } | PlacementError::InternshipClosed { .. } => {
                StatusCode::GONE
            }
            PlacementError::Match(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlacementError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let payload = json!({ "error": self.to_string() });
        (status, axum::Json(payload)).into_response()
    }
}

pub(crate) async fn recommendations_handler<A, O, C>(
    State(service): State<Shared<A, O, C>>,
    axum::Json(request): axum::Json<RecommendationRequest>,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    // Scoring fans out on the rayon pool; keep it off the async workers.
    let ranked = tokio::task::spawn_blocking(move || {
        service.recommendations(
            &request.student,
            &request.filters,
            request.config.as_ref(),
            request.limit,
        )
    })
    .await;

    match ranked {
        Ok(Ok(recommendations)) => (StatusCode::OK, axum::Json(recommendations)).into_response(),
        Ok(Err(err)) => err.into_response(),
        Err(join_error) => {
            let payload = json!({ "error": join_error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn apply_handler<A, O, C>(
    State(service): State<Shared<A, O, C>>,
    axum::Json(request): axum::Json<ApplyRequest>,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    match service.apply(&request.student, &request.internship_id, request.form_data) {
        Ok(application) => {
            let view = application.status_view(None);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler<A, O, C>(
    State(service): State<Shared<A, O, C>>,
    Path(application_id): Path<String>,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    view_response(&service, &ApplicationId(application_id), StatusCode::OK)
}

pub(crate) async fn withdraw_handler<A, O, C>(
    State(service): State<Shared<A, O, C>>,
    Path(application_id): Path<String>,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    let id = ApplicationId(application_id);
    match service.withdraw(&id) {
        Ok(_) => view_response(&service, &id, StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_status_handler<A, O, C>(
    State(service): State<Shared<A, O, C>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<StatusUpdateRequest>,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    let id = ApplicationId(application_id);
    match service.update_status(&id, request.status) {
        Ok(_) => view_response(&service, &id, StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn issue_offer_handler<A, O, C>(
    State(service): State<Shared<A, O, C>>,
    Path(application_id): Path<String>,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    let id = ApplicationId(application_id);
    match service.issue_offer(&id) {
        Ok(_) => view_response(&service, &id, StatusCode::CREATED),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn accept_offer_handler<A, O, C>(
    State(service): State<Shared<A, O, C>>,
    Path(application_id): Path<String>,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    let id = ApplicationId(application_id);
    match service.accept_offer(&id) {
        Ok(_) => view_response(&service, &id, StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn decline_offer_handler<A, O, C>(
    State(service): State<Shared<A, O, C>>,
    Path(application_id): Path<String>,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    let id = ApplicationId(application_id);
    match service.decline_offer(&id) {
        Ok(_) => view_response(&service, &id, StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn expire_handler<A, O, C>(State(service): State<Shared<A, O, C>>) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    match service.expire_offers() {
        Ok(expired) => {
            let payload = json!({ "expired": expired });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

fn view_response<A, O, C>(
    service: &PlacementService<A, O, C>,
    id: &ApplicationId,
    status: StatusCode,
) -> Response
where
    A: ApplicationRepository + 'static,
    O: OfferRepository + 'static,
    C: InternshipCatalog + 'static,
{
    match service.status_view(id) {
        Ok(view) => (status, axum::Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}
