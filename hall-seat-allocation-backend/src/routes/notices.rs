use axum::extract::State;
use hall_seat_allocation_core::{NewNotice, Notice, NoticeId};
use http::StatusCode;

use crate::error::AppError;
use crate::extract::{Json, Path};
use crate::retry::{with_retry, with_write_retry};
use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Notice>>, AppError> {
    let notices = &state.notices;
    Ok(Json(
        with_retry(state.retry, "list_notices", || notices.list()).await?,
    ))
}

pub async fn publish(
    State(state): State<AppState>,
    Json(notice): Json<NewNotice>,
) -> Result<(StatusCode, Json<Notice>), AppError> {
    let notices = &state.notices;
    let notice = with_write_retry(state.retry, "publish_notice", || {
        notices.publish(notice.clone())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(notice)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<NoticeId>,
) -> Result<Json<Notice>, AppError> {
    let notices = &state.notices;
    Ok(Json(
        with_retry(state.retry, "get_notice", || notices.get(id)).await?,
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<NoticeId>,
) -> Result<Json<Notice>, AppError> {
    let notices = &state.notices;
    Ok(Json(
        with_write_retry(state.retry, "remove_notice", || notices.remove(id)).await?,
    ))
}
