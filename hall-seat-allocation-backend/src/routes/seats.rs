use axum::extract::State;
use hall_seat_allocation_core::{Allocation, ApplicationId, FloorMap, SeatAddress};
use http::StatusCode;
use serde::Deserialize;

use crate::error::AppError;
use crate::extract::{Json, Path};
use crate::retry::{with_retry, with_write_retry};
use crate::AppState;

// out-of-range coordinates are invalid addresses, not malformed requests
#[derive(Deserialize)]
pub struct SeatPath {
    floor: i64,
    room: i64,
    seat: i64,
}

#[derive(Deserialize)]
pub struct AssignSeat {
    floor: i64,
    room: i64,
    seat: i64,
    application_id: ApplicationId,
}

#[derive(Deserialize)]
pub struct ReassignSeat {
    application_id: ApplicationId,
}

impl AppState {
    fn seat_address(&self, floor: i64, room: i64, seat: i64) -> Result<SeatAddress, AppError> {
        Ok(self.allocations.layout().address(floor, room, seat)?)
    }
}

pub async fn floor_map(
    State(state): State<AppState>,
    Path(floor): Path<i64>,
) -> Result<Json<FloorMap>, AppError> {
    let floor = state.allocations.layout().floor(floor)?;
    let allocations = &state.allocations;
    Ok(Json(
        with_retry(state.retry, "floor_map", || allocations.floor_map(floor)).await?,
    ))
}

pub async fn assign(
    State(state): State<AppState>,
    Json(request): Json<AssignSeat>,
) -> Result<(StatusCode, Json<Allocation>), AppError> {
    let address = state.seat_address(request.floor, request.room, request.seat)?;
    let allocations = &state.allocations;
    let allocation = with_write_retry(state.retry, "assign_seat", || {
        allocations.assign_seat(address, request.application_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

pub async fn reassign(
    State(state): State<AppState>,
    Path(seat): Path<SeatPath>,
    Json(request): Json<ReassignSeat>,
) -> Result<Json<Allocation>, AppError> {
    let address = state.seat_address(seat.floor, seat.room, seat.seat)?;
    let allocations = &state.allocations;
    Ok(Json(
        with_write_retry(state.retry, "reassign_seat", || {
            allocations.reassign_seat(address, request.application_id)
        })
        .await?,
    ))
}

pub async fn unassign(
    State(state): State<AppState>,
    Path(seat): Path<SeatPath>,
) -> Result<Json<Allocation>, AppError> {
    let address = state.seat_address(seat.floor, seat.room, seat.seat)?;
    let allocations = &state.allocations;
    Ok(Json(
        with_write_retry(state.retry, "unassign_seat", || {
            allocations.unassign_seat(address)
        })
        .await?,
    ))
}
