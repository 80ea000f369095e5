//! 服务项目查询处理函数。

use axum::{
    Json,
    extract::{Path, State},
};
use cd_shared_protocol::{RecordId, SERVICES_COLLECTION};

use crate::{
    api::error::ApiError,
    state::AppState,
    store::{Document, Filter, Projection},
};

/// 单个服务项目详情只返回展示字段。
const SERVICE_DETAIL_PROJECTION: Projection =
    Projection::new(&["title", "price", "service_id", "img"]);

/// `GET /services`：全部服务项目。
pub(crate) async fn list_services_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let services = state.store.find(SERVICES_COLLECTION, &Filter::all()).await?;
    Ok(Json(services))
}

/// `GET /services/{id}`：按 ID 查询，未命中返回 `null`。
pub(crate) async fn get_service_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id: RecordId = id.parse()?;
    let service = state
        .store
        .find_one(
            SERVICES_COLLECTION,
            &Filter::by_id(id),
            Some(&SERVICE_DETAIL_PROJECTION),
        )
        .await?;
    Ok(Json(service))
}
