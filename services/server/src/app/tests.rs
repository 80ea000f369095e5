//! 路由级测试：凭证签发/校验、归属检查与预约/服务项目接口行为。

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
    response::Response,
};
use cd_shared_protocol::{IdentityClaim, SERVICES_COLLECTION, unix_now};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::build_router;
use crate::{
    auth::token::{CREDENTIAL_TTL_SEC, issue_credential},
    state::AppState,
    store::{Document, DocumentStore},
};

const SECRET: &str = "router-test-secret-0123";

fn test_state() -> AppState {
    AppState {
        store: Arc::new(DocumentStore::in_memory()),
        signing_secret: Arc::from(SECRET),
        cookie_secure: true,
    }
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn body_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn credential_cookie_for(email: &str, issued_at: u64, secret: &str) -> String {
    let claim = IdentityClaim::new(email).unwrap();
    format!("token={}", issue_credential(secret, &claim, issued_at).unwrap())
}

fn set_cookie(resp: &Response) -> String {
    resp.headers()
        .get(SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .unwrap()
        .to_string()
}

async fn create_booking(app: &Router, body: Value) -> String {
    let resp = send(app, json_request("POST", "/bookings", body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["acknowledged"], true);
    json["insertedId"].as_str().unwrap().to_string()
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[tokio::test]
async fn root_reports_liveness() {
    let app = build_router(test_state());
    let resp = send(&app, get_request("/", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "doctor is running");
}

#[tokio::test]
async fn login_sets_cookie_and_owner_lists_only_own_bookings() {
    let app = build_router(test_state());

    let resp = send(&app, json_request("POST", "/jwt", json!({"email": "a@x.com"}))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let header = set_cookie(&resp);
    assert!(header.starts_with("token="));
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Secure"));
    let cookie = header.split(';').next().unwrap().to_string();
    let token = cookie.trim_start_matches("token=").to_string();
    let body = body_text(resp).await;
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"success": true}));
    assert!(!body.contains(&token));

    create_booking(&app, json!({"email": "a@x.com", "service": "Oil change"})).await;
    create_booking(&app, json!({"email": "b@x.com", "service": "Brakes"})).await;
    create_booking(&app, json!({"email": "a@x.com", "service": "Engine"})).await;

    let resp = send(&app, get_request("/bookings?email=a@x.com", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list = body_json(resp).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|booking| booking["email"] == "a@x.com"));
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let app = build_router(test_state());
    let resp = send(&app, get_request("/bookings?email=a@x.com", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn expired_credential_is_treated_like_missing() {
    let app = build_router(test_state());
    let issued_at = unix_now() - CREDENTIAL_TTL_SEC - 1;
    let cookie = credential_cookie_for("a@x.com", issued_at, SECRET);

    let expired = send(&app, get_request("/bookings?email=a@x.com", Some(&cookie))).await;
    let missing = send(&app, get_request("/bookings?email=a@x.com", None)).await;
    assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(expired).await, body_json(missing).await);
}

#[tokio::test]
async fn forged_or_malformed_credentials_are_unauthorized() {
    let app = build_router(test_state());
    let wrong_secret = credential_cookie_for("a@x.com", unix_now(), "some-other-secret-456789");
    for cookie in [wrong_secret.as_str(), "token=garbage", "token=a.b.c"] {
        let resp = send(&app, get_request("/bookings?email=a@x.com", Some(cookie))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "cookie {cookie}");
    }
}

#[tokio::test]
async fn listing_another_users_bookings_is_forbidden() {
    let app = build_router(test_state());
    create_booking(&app, json!({"email": "a@x.com"})).await;
    let cookie = credential_cookie_for("b@x.com", unix_now(), SECRET);

    let resp = send(&app, get_request("/bookings?email=a@x.com", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["code"], "FORBIDDEN");

    let resp = send(&app, get_request("/bookings?email=nobody@x.com", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_without_scope_fails_closed() {
    let app = build_router(test_state());
    create_booking(&app, json!({"email": "a@x.com"})).await;
    let cookie = credential_cookie_for("a@x.com", unix_now(), SECRET);

    for uri in ["/bookings", "/bookings?email="] {
        let resp = send(&app, get_request(uri, Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "uri {uri}");
    }
}

#[tokio::test]
async fn malformed_booking_query_uses_error_envelope() {
    let app = build_router(test_state());
    let cookie = credential_cookie_for("a@x.com", unix_now(), SECRET);

    let resp = send(
        &app,
        get_request("/bookings?email=a@x.com&email=b@x.com", Some(&cookie)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["code"], "INVALID_BODY");
}

#[tokio::test]
async fn creating_bookings_leaves_services_untouched() {
    let state = test_state();
    let store = state.store.clone();
    store
        .insert_many_if_absent(
            SERVICES_COLLECTION,
            vec![doc(json!({
                "_id": "65a1b2c3d4e5f6a7b8c9d0e1",
                "title": "Oil change",
                "price": "20.00",
                "service_id": "01",
                "img": "https://img.test/oil.png",
                "description": "Full synthetic"
            }))],
        )
        .await
        .unwrap();
    let app = build_router(state);

    let before = body_json(send(&app, get_request("/services/65a1b2c3d4e5f6a7b8c9d0e1", None)).await).await;
    create_booking(
        &app,
        json!({"email": "a@x.com", "service_id": "01", "service": "Oil change"}),
    )
    .await;
    let after = body_json(send(&app, get_request("/services/65a1b2c3d4e5f6a7b8c9d0e1", None)).await).await;

    assert_eq!(before, after);
    assert_eq!(after["title"], "Oil change");
    assert!(after.get("description").is_none());

    let all = body_json(send(&app, get_request("/services", None)).await).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["description"], "Full synthetic");
}

#[tokio::test]
async fn unknown_service_returns_null_and_bad_id_is_rejected() {
    let app = build_router(test_state());
    let resp = send(&app, get_request("/services/65a1b2c3d4e5f6a7b8c9d0e1", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_json(resp).await.is_null());

    let resp = send(&app, get_request("/services/not-an-id", None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "INVALID_ID");
}

#[tokio::test]
async fn patch_updates_only_status() {
    let state = test_state();
    let store = state.store.clone();
    let app = build_router(state);
    let id = create_booking(
        &app,
        json!({"email": "a@x.com", "date": "2024-05-01", "price": 120, "status": "pending"}),
    )
    .await;

    let resp = send(
        &app,
        json_request(
            "PATCH",
            &format!("/bookings/{id}"),
            json!({"status": "confirmed", "email": "evil@x.com"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let result = body_json(resp).await;
    assert_eq!(result["matchedCount"], 1);
    assert_eq!(result["modifiedCount"], 1);

    let filter = crate::store::Filter::by_id(id.parse().unwrap());
    let stored = store
        .find_one("bookings", &filter, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["status"], "confirmed");
    assert_eq!(stored["email"], "a@x.com");
    assert_eq!(stored["date"], "2024-05-01");
    assert_eq!(stored["price"], 120);
}

#[tokio::test]
async fn patch_rejects_invalid_status() {
    let app = build_router(test_state());
    let id = create_booking(&app, json!({"email": "a@x.com"})).await;
    let resp = send(
        &app,
        json_request("PATCH", &format!("/bookings/{id}"), json!({"status": ""})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "INVALID_STATUS");
}

#[tokio::test]
async fn delete_missing_booking_reports_zero() {
    let app = build_router(test_state());
    let req = Request::builder()
        .method("DELETE")
        .uri("/bookings/65a1b2c3d4e5f6a7b8c9d0e1")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let result = body_json(resp).await;
    assert_eq!(result["acknowledged"], true);
    assert_eq!(result["deletedCount"], 0);
}

#[tokio::test]
async fn delete_existing_booking_removes_it() {
    let app = build_router(test_state());
    let id = create_booking(&app, json!({"email": "a@x.com"})).await;
    let uri = format!("/bookings/{id}");
    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri(uri.as_str())
            .body(Body::empty())
            .unwrap()
    };
    assert_eq!(body_json(send(&app, delete()).await).await["deletedCount"], 1);
    assert_eq!(body_json(send(&app, delete()).await).await["deletedCount"], 0);
}

#[tokio::test]
async fn logout_without_credential_still_clears_cookie() {
    let app = build_router(test_state());
    let req = Request::builder()
        .method("POST")
        .uri("/logout")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let header = set_cookie(&resp);
    assert!(header.starts_with("token=;"));
    assert!(header.contains("Max-Age=0"));
    assert_eq!(body_json(resp).await, json!({"success": true}));
}

#[tokio::test]
async fn login_rejects_invalid_identity() {
    let app = build_router(test_state());
    for body in [json!({}), json!({"email": "not-an-email"}), json!({"email": "  "})] {
        let resp = send(&app, json_request("POST", "/jwt", body.clone())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert!(resp.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_json(resp).await["code"], "INVALID_IDENTITY");
    }
}

#[tokio::test]
async fn malformed_booking_payloads_are_rejected() {
    let state = test_state();
    let store = state.store.clone();
    let app = build_router(state);

    let resp = send(&app, json_request("POST", "/bookings", json!({"service": "Oil"}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "INVALID_BOOKING");

    let req = Request::builder()
        .method("POST")
        .uri("/bookings")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "INVALID_BODY");

    assert!(store.ping().await.get("bookings").is_none());
}
