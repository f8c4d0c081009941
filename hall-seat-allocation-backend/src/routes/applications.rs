use axum::extract::State;
use hall_seat_allocation_core::{
    Allocation, Application, ApplicationId, ApplicationStatus, ApprovedFilter, NewApplication,
    StatusChange,
};
use http::StatusCode;
use serde::Deserialize;

use crate::error::AppError;
use crate::extract::{Json, Path, Query};
use crate::retry::{with_retry, with_write_retry};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<ApplicationStatus>,
}

#[derive(Deserialize)]
pub struct ApprovedQuery {
    department: Option<String>,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(application): Json<NewApplication>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let allocations = &state.allocations;
    let application = with_write_retry(state.retry, "submit", || {
        allocations.submit(application.clone())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Application>>, AppError> {
    let allocations = &state.allocations;
    Ok(Json(
        with_retry(state.retry, "list_applications", || {
            allocations.applications(query.status)
        })
        .await?,
    ))
}

pub async fn approved(
    State(state): State<AppState>,
    Query(query): Query<ApprovedQuery>,
) -> Result<Json<Vec<Application>>, AppError> {
    let allocations = &state.allocations;
    let filter = ApprovedFilter {
        department: query.department.filter(|department| !department.trim().is_empty()),
    };
    Ok(Json(
        with_retry(state.retry, "approved_unallocated", || {
            allocations.approved_unallocated(&filter)
        })
        .await?,
    ))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<ApplicationId>,
) -> Result<Json<Application>, AppError> {
    let allocations = &state.allocations;
    Ok(Json(
        with_retry(state.retry, "get_application", || allocations.application(id)).await?,
    ))
}

pub async fn allocation(
    State(state): State<AppState>,
    Path(id): Path<ApplicationId>,
) -> Result<Json<Allocation>, AppError> {
    let allocations = &state.allocations;
    Ok(Json(
        with_retry(state.retry, "allocation_for_application", || {
            allocations.allocation_for_application(id)
        })
        .await?,
    ))
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<ApplicationId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Application>, AppError> {
    let allocations = &state.allocations;
    Ok(Json(
        with_write_retry(state.retry, "set_status", || {
            allocations.set_status(id, change)
        })
        .await?,
    ))
}
