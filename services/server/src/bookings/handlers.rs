//! 预约处理函数。

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use cd_shared_protocol::{
    BOOKINGS_COLLECTION, DeleteResult, InsertOneResult, RecordId, UpdateResult,
};
use serde_json::Value;
use tracing::info;

use crate::{
    api::{error::ApiError, types::BookingsQuery},
    auth::middleware::{Authenticated, authorize_scope},
    bookings::validate::{NewBooking, StatusUpdate},
    state::AppState,
    store::{Document, Filter},
};

/// `GET /bookings?email=`：仅返回凭证身份本人的预约。
pub(crate) async fn list_bookings_handler(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    query: Result<Query<BookingsQuery>, QueryRejection>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let Query(query) = query?;
    let email = authorize_scope(&identity, query.email.as_deref())?;
    let bookings = state
        .store
        .find(BOOKINGS_COLLECTION, &Filter::all().eq("email", email))
        .await?;
    info!(email, count = bookings.len(), "bookings listed");
    Ok(Json(bookings))
}

/// `POST /bookings`：校验后插入，重复提交会得到新的记录。
pub(crate) async fn create_booking_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<InsertOneResult>, ApiError> {
    let Json(body) = payload?;
    let booking = NewBooking::parse(body)
        .map_err(|err| ApiError::bad_request("INVALID_BOOKING", format!("预约信息无效: {err}")))?;
    info!(email = booking.email(), "booking received");
    let result = state
        .store
        .insert_one(BOOKINGS_COLLECTION, booking.into_document())
        .await?;
    Ok(Json(result))
}

/// `PATCH /bookings/{id}`：只更新 `status` 字段。
pub(crate) async fn update_booking_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UpdateResult>, ApiError> {
    let id: RecordId = id.parse()?;
    let Json(body) = payload?;
    let update = StatusUpdate::parse(body)
        .map_err(|err| ApiError::bad_request("INVALID_STATUS", format!("状态无效: {err}")))?;
    info!(%id, status = %update.status, "booking status update");
    let result = state
        .store
        .update_one(BOOKINGS_COLLECTION, &Filter::by_id(id), update.into_set())
        .await?;
    Ok(Json(result))
}

/// `DELETE /bookings/{id}`：记录不存在时 `deletedCount` 为 0。
pub(crate) async fn delete_booking_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let id: RecordId = id.parse()?;
    let result = state
        .store
        .delete_one(BOOKINGS_COLLECTION, &Filter::by_id(id))
        .await?;
    info!(%id, deleted = result.deleted_count, "booking delete");
    Ok(Json(result))
}
