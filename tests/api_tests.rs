//! HTTP surface tests: the full router over the in-memory store

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Harness;
use lectern_server::{
    api,
    config::AppConfig,
    models::user::{Role, UserClaims},
    AppState,
};

struct TestApp {
    router: Router,
    secret: String,
}

impl TestApp {
    fn new(h: Harness) -> Self {
        let config = AppConfig::default();
        let secret = config.auth.jwt_secret.clone();
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(h.services),
        };
        Self {
            router: api::create_router(state),
            secret,
        }
    }

    fn token(&self, user_id: i32, role: Role) -> String {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: format!("user-{}", user_id),
            user_id,
            role,
            exp: now + 3600,
            iat: now,
        }
        .create_token(&self.secret)
        .unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new(Harness::new());
    let (status, body) = app.call(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_authentication_required() {
    let app = TestApp::new(Harness::new());
    let (status, body) = app.call(Method::GET, "/api/v1/borrowings/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication");

    let (status, _) = app
        .call(Method::GET, "/api/v1/borrowings/mine", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reader_cannot_register_books() {
    let app = TestApp::new(Harness::new());
    let reader = app.token(1, Role::Reader);
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/books",
            Some(&reader),
            Some(json!({ "title": "Dune", "total_quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_borrow_and_return_over_http() {
    let app = TestApp::new(Harness::new());
    let librarian = app.token(900, Role::Librarian);
    let reader = app.token(1, Role::Reader);

    let (status, book) = app
        .call(
            Method::POST,
            "/api/v1/books",
            Some(&librarian),
            Some(json!({ "title": "Dune", "author": "Frank Herbert", "total_quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let book_id = book["id"].as_i64().unwrap();

    let (status, report) = app
        .call(Method::GET, &format!("/api/v1/books/{}/eligibility", book_id), Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["eligible"], true);

    let (status, borrowing) = app
        .call(
            Method::POST,
            "/api/v1/borrowings",
            Some(&reader),
            Some(json!({ "book_id": book_id, "borrow_days": 21 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(borrowing["state"], "pending");
    let borrowing_id = borrowing["id"].as_i64().unwrap();

    let (status, confirmed) = app
        .call(Method::POST, &format!("/api/v1/borrowings/{}/confirm", borrowing_id), Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["state"], "borrowed");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/borrowings",
            Some(&app.token(2, Role::Reader)),
            Some(json!({ "book_id": book_id })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "PolicyViolation");

    let (status, request) = app
        .call(
            Method::POST,
            &format!("/api/v1/borrowings/{}/return-request", borrowing_id),
            Some(&reader),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_i64().unwrap();

    let (status, outcome) = app
        .call(
            Method::POST,
            &format!("/api/v1/return-requests/{}/settle", request_id),
            Some(&librarian),
            Some(json!({ "book_condition": "normal" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["borrowing"]["state"], "returned");
    assert_eq!(outcome["fines"].as_array().unwrap().len(), 0);
    assert_eq!(outcome["return_request"]["status"], "confirmed");

    let (_, book) = app
        .call(Method::GET, &format!("/api/v1/books/{}", book_id), Some(&reader), None)
        .await;
    assert_eq!(book["available_quantity"], 1);
    assert_eq!(book["borrowed_quantity"], 0);
}

#[tokio::test]
async fn test_invalid_transitions_over_http() {
    let app = TestApp::new(Harness::new());
    let librarian = app.token(900, Role::Librarian);
    let reader = app.token(1, Role::Reader);

    let (_, book) = app
        .call(
            Method::POST,
            "/api/v1/books",
            Some(&librarian),
            Some(json!({ "title": "Emma", "total_quantity": 2 })),
        )
        .await;
    let (_, borrowing) = app
        .call(
            Method::POST,
            "/api/v1/borrowings",
            Some(&reader),
            Some(json!({ "book_id": book["id"] })),
        )
        .await;
    let id = borrowing["id"].as_i64().unwrap();

    let (status, body) = app
        .call(Method::POST, &format!("/api/v1/borrowings/{}/extend", id), Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidState");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/borrowings",
            Some(&reader),
            Some(json!({ "book_id": book["id"], "borrow_days": 45 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/borrowings/{}", id), Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/borrowings/{}", id), Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_fine_levels_over_http() {
    let app = TestApp::new(Harness::new());
    let admin = app.token(1, Role::Admin);

    let (status, level) = app
        .call(
            Method::POST,
            "/api/v1/fine-levels",
            Some(&admin),
            Some(json!({ "name": "Late", "amount": "2.50" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/fine-levels",
            Some(&admin),
            Some(json!({ "name": "Late", "amount": "3.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, levels) = app.call(Method::GET, "/api/v1/fine-levels", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(levels.as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/fine-levels/{}", level["id"]), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
