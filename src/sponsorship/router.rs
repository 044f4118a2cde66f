use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::booth::decisions_from_form;
use super::directory::{PlanAvailabilityOracle, SponsorshipDirectory, StoreError};
use super::domain::{SponsorshipId, StaffId};
use super::history::HistoryProcessor;
use super::service::{
    SponsorshipApplication, SponsorshipError, SponsorshipPatch, SponsorshipService,
};

/// Router builder exposing the sponsor and admin HTTP surfaces.
pub fn sponsorship_router<D, O, P>(service: Arc<SponsorshipService<D, O, P>>) -> Router
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    Router::new()
        .route(
            "/api/v1/conferences/:slug/sponsorship",
            post(apply_handler::<D, O, P>),
        )
        .route(
            "/api/v1/conferences/:slug/sponsorship/:id",
            get(show_handler::<D, O, P>)
                .put(amend_handler::<D, O, P>)
                .delete(withdraw_handler::<D, O, P>),
        )
        .route(
            "/api/v1/admin/conferences/:slug/booth_assignments",
            patch(booth_assignments_handler::<D, O, P>),
        )
        .route(
            "/api/v1/admin/sponsorships/:id",
            patch(staff_amend_handler::<D, O, P>),
        )
        .route(
            "/api/v1/admin/sponsorships/:id/editing_history",
            get(editing_history_handler::<D, O, P>),
        )
        .route(
            "/api/v1/admin/sponsorships/:id/asset",
            get(download_asset_handler::<D, O, P>),
        )
        .with_state(service)
}

/// Staff booth-assignment form: `"1"` assigns, any other value unassigns,
/// unlisted sponsorships stay untouched.
#[derive(Debug, Deserialize)]
pub(crate) struct BoothAssignmentForm {
    pub(crate) staff_id: String,
    pub(crate) assignments: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffAmendForm {
    pub(crate) staff_id: String,
    pub(crate) sponsorship: SponsorshipPatch,
}

pub(crate) async fn apply_handler<D, O, P>(
    State(service): State<Arc<SponsorshipService<D, O, P>>>,
    Path(slug): Path<String>,
    axum::Json(application): axum::Json<SponsorshipApplication>,
) -> Response
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    let conference = match service.conference_by_slug(&slug) {
        Ok(conference) => conference,
        Err(err) => return error_response(err),
    };

    match service
        .apply(&conference.id, application)
        .and_then(|sponsorship| service.summarize(&sponsorship))
    {
        Ok(summary) => (StatusCode::ACCEPTED, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn show_handler<D, O, P>(
    State(service): State<Arc<SponsorshipService<D, O, P>>>,
    Path((slug, id)): Path<(String, String)>,
) -> Response
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    match fetch_in_conference(&service, &slug, &id).and_then(|sponsorship| {
        service.summarize(&sponsorship)
    }) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn amend_handler<D, O, P>(
    State(service): State<Arc<SponsorshipService<D, O, P>>>,
    Path((slug, id)): Path<(String, String)>,
    axum::Json(patch): axum::Json<SponsorshipPatch>,
) -> Response
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    match fetch_in_conference(&service, &slug, &id)
        .and_then(|sponsorship| service.amend(&sponsorship.id, patch))
        .and_then(|sponsorship| service.summarize(&sponsorship))
    {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn withdraw_handler<D, O, P>(
    State(service): State<Arc<SponsorshipService<D, O, P>>>,
    Path((slug, id)): Path<(String, String)>,
) -> Response
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    match fetch_in_conference(&service, &slug, &id)
        .and_then(|sponsorship| service.withdraw(&sponsorship.id))
        .and_then(|sponsorship| service.summarize(&sponsorship))
    {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn booth_assignments_handler<D, O, P>(
    State(service): State<Arc<SponsorshipService<D, O, P>>>,
    Path(slug): Path<String>,
    axum::Json(form): axum::Json<BoothAssignmentForm>,
) -> Response
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    let conference = match service.conference_by_slug(&slug) {
        Ok(conference) => conference,
        Err(err) => return error_response(err),
    };

    let decisions = decisions_from_form(&form.assignments);
    let staff = StaffId(form.staff_id);
    match service.assign_booths(&conference.id, &decisions, &staff) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn staff_amend_handler<D, O, P>(
    State(service): State<Arc<SponsorshipService<D, O, P>>>,
    Path(id): Path<String>,
    axum::Json(form): axum::Json<StaffAmendForm>,
) -> Response
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    let staff = StaffId(form.staff_id);
    match service
        .staff_amend(&SponsorshipId(id), form.sponsorship, &staff)
        .and_then(|sponsorship| service.summarize(&sponsorship))
    {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn editing_history_handler<D, O, P>(
    State(service): State<Arc<SponsorshipService<D, O, P>>>,
    Path(id): Path<String>,
) -> Response
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    match service.editing_histories(&SponsorshipId(id)) {
        Ok(histories) => (StatusCode::OK, axum::Json(histories)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn download_asset_handler<D, O, P>(
    State(service): State<Arc<SponsorshipService<D, O, P>>>,
    Path(id): Path<String>,
) -> Response
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    match service.asset_download_url(&SponsorshipId(id)) {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(err) => error_response(err),
    }
}

fn fetch_in_conference<D, O, P>(
    service: &SponsorshipService<D, O, P>,
    slug: &str,
    id: &str,
) -> Result<super::domain::Sponsorship, SponsorshipError>
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    let conference = service.conference_by_slug(slug)?;
    let sponsorship = service.get(&SponsorshipId(id.to_string()))?;
    if sponsorship.conference_id != conference.id {
        return Err(SponsorshipError::NotFound);
    }
    Ok(sponsorship)
}

fn error_response(err: SponsorshipError) -> Response {
    match err {
        SponsorshipError::Invalid(violations) => {
            let payload = json!({ "violations": violations });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        SponsorshipError::NotFound => {
            let payload = json!({ "error": "not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        SponsorshipError::Withdrawn => {
            let payload = json!({ "error": "sponsorship has been withdrawn" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        SponsorshipError::Store(StoreError::Conflict) => {
            let payload = json!({ "error": "record already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        SponsorshipError::Store(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
