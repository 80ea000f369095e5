//! 应用装配：路由、CORS、请求追踪与监听。

use anyhow::Context;
use axum::{
    Router,
    handler::Handler,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    auth::{
        handlers::{issue_credential_handler, logout_handler},
        middleware::require_credential,
    },
    bookings::{
        create_booking_handler, delete_booking_handler, list_bookings_handler,
        update_booking_status_handler,
    },
    catalog::{get_service_handler, list_services_handler},
    config::Config,
    state::AppState,
    store::DocumentStore,
};

/// 服务入口：打开存储、装配路由并开始监听。
pub(crate) async fn run(config: Config) -> anyhow::Result<()> {
    let store = DocumentStore::open(&config.data_path)
        .with_context(|| format!("open document store {}", config.data_path.display()))?;
    let counts = store.ping().await;
    info!(path = %config.data_path.display(), ?counts, "document store ready");

    let cors = cors_layer(&config.cors_origins)?;
    let state = AppState::new(&config, store);
    let app = build_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    info!("car-doctor server listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// 构造路由；`GET /bookings` 前置凭证校验中间件。
pub(crate) fn build_router(state: AppState) -> Router {
    let credential_gate = middleware::from_fn_with_state(state.clone(), require_credential);

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/jwt", post(issue_credential_handler))
        .route("/logout", post(logout_handler))
        .route("/services", get(list_services_handler))
        .route("/services/{id}", get(get_service_handler))
        .route(
            "/bookings",
            get(list_bookings_handler.layer(credential_gate)).post(create_booking_handler),
        )
        .route(
            "/bookings/{id}",
            patch(update_booking_status_handler).delete(delete_booking_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 允许携带凭证的跨域来源白名单。
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin: {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]))
}

/// 存活探测。
async fn root() -> &'static str {
    "doctor is running"
}

/// 健康检查接口。
async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests;
