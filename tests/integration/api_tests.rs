//! API integration tests
//!
//! Each test drives the full router in-process over an in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use edusys_server::{
    api,
    clock::ManualClock,
    config::{AppConfig, StorageBackend, StorageConfig},
    models::{book::CreateBook, Role},
    repository::Repository,
    services::{auth::RegisterUser, Services},
    storage::Storage,
    AppState,
};

struct TestApp {
    router: Router,
    services: Arc<Services>,
    clock: ManualClock,
}

async fn test_app() -> TestApp {
    let config = AppConfig {
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            latency_ms: 0,
            seed: false,
            ..StorageConfig::default()
        },
        ..AppConfig::default()
    };

    let clock = ManualClock::new(Utc::now());
    let repository =
        Repository::new(Storage::in_memory(), &config.storage).with_clock(Arc::new(clock.clone()));
    let services = Arc::new(Services::new(repository, &config));

    for (name, email, password, role) in [
        ("Alice Admin", "admin@edusys.com", "admin123", Role::Admin),
        ("Lina Librarian", "librarian@edusys.com", "librarian123", Role::Librarian),
        ("Sara Student", "student@edusys.com", "student123", Role::Student),
        ("Bob Learner", "bob@edusys.com", "student123", Role::Student),
    ] {
        services
            .auth
            .register_user(
                RegisterUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                    role,
                    school_id: Some("s1".to_string()),
                    branch_id: Some("b1".to_string()),
                },
                None,
            )
            .await
            .expect("Failed to register user");
    }

    services
        .catalog
        .add_book(
            CreateBook {
                title: "Algebra Basics".to_string(),
                author: "J. Doe".to_string(),
                copies: 1,
                isbn: Some("978-0-00-000001-1".to_string()),
                barcode: None,
            },
            None,
        )
        .await
        .expect("Failed to add book");

    let state = AppState {
        config: Arc::new(config),
        services: services.clone(),
    };

    TestApp {
        router: api::router(state),
        services,
        clock,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Failed to parse response")
        };
        (status, body)
    }

    async fn login(&self, email: &str, password: &str, role: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().expect("No token in response").to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "healthy");
}

#[tokio::test]
async fn test_login() {
    let app = test_app().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "librarian@edusys.com", "password": "librarian123", "role": "librarian" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "Librarian");

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.send(Method::GET, "/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "librarian@edusys.com");
}

#[tokio::test]
async fn test_login_failures() {
    let app = test_app().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "librarian@edusys.com", "password": "librarian123", "role": "Teacher" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access Denied: This user is not a Teacher");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "librarian@edusys.com", "password": "wrong", "role": "Librarian" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["code"].is_number());
}

#[tokio::test]
async fn test_unauthorized_access() {
    let app = test_app().await;

    let (status, _) = app.send(Method::GET, "/library/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::GET, "/library/books", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let student = app.login("student@edusys.com", "student123", "Student").await;
    let (status, _) = app
        .send(
            Method::POST,
            "/library/issue",
            Some(&student),
            Some(json!({ "bookQuery": "algebra", "borrowerQuery": "sara" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let librarian = app.login("librarian@edusys.com", "librarian123", "Librarian").await;
    let (status, _) = app.send(Method::GET, "/records/books", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::GET, "/audit-logs", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_circulation_flow() {
    let app = test_app().await;
    let librarian = app.login("librarian@edusys.com", "librarian123", "Librarian").await;

    let (status, borrow) = app
        .send(
            Method::POST,
            "/library/issue",
            Some(&librarian),
            Some(json!({ "bookQuery": "978-0-00-000001-1", "borrowerQuery": "student@edusys.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(borrow["returnDate"].is_null());

    // The only copy is out
    let (status, body) = app
        .send(
            Method::POST,
            "/library/issue",
            Some(&librarian),
            Some(json!({ "bookQuery": "algebra", "borrowerQuery": "bob" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "No copies available");

    let (status, availability) = app
        .send(Method::GET, "/library/availability", Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(availability[0]["available"], 0);

    app.clock.advance(Duration::days(17));

    let (status, outcome) = app
        .send(
            Method::POST,
            "/library/return",
            Some(&librarian),
            Some(json!({ "borrowId": borrow["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["daysLate"], 3);
    assert_eq!(outcome["fine"]["amount"], "3");
    assert_eq!(outcome["fine"]["status"], "unpaid");

    let (_, availability) = app
        .send(Method::GET, "/library/availability", Some(&librarian), None)
        .await;
    assert_eq!(availability[0]["available"], 1);

    let (status, fines) = app
        .send(Method::GET, "/library/fines?status=unpaid", Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fines.as_array().unwrap().len(), 1);

    let fine_id = fines[0]["id"].as_str().unwrap();
    let (status, paid) = app
        .send(Method::POST, &format!("/library/fines/{}/pay", fine_id), Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert!(paid["paidAt"].is_string());

    let (status, _) = app
        .send(Method::POST, &format!("/library/fines/{}/pay", fine_id), Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_catalog_copies() {
    let app = test_app().await;
    let librarian = app.login("librarian@edusys.com", "librarian123", "Librarian").await;

    let (status, book) = app
        .send(
            Method::POST,
            "/library/books",
            Some(&librarian),
            Some(json!({ "title": "Physics 101", "author": "M. Curie", "copies": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = book["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::POST, &format!("/library/books/{}/copies/decrease", id), Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Cannot remove last copy");

    let (status, body) = app
        .send(Method::POST, &format!("/library/books/{}/copies/increase", id), Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["copies"], 2);

    let (status, _) = app
        .send(Method::POST, "/library/books", Some(&librarian), Some(json!({ "title": "", "author": "x", "copies": 1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::DELETE, &format!("/library/books/{}", id), Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let books = app.services.catalog.list_books().await.unwrap();
    assert_eq!(books.len(), 1);
}

#[tokio::test]
async fn test_records_and_audit() {
    let app = test_app().await;
    let admin = app.login("admin@edusys.com", "admin123", "Admin").await;

    let (status, task) = app
        .send(
            Method::POST,
            "/records/tasks",
            Some(&admin),
            Some(json!({ "id": "forced", "title": "Clean Lab 1", "status": "open" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(task["id"], "forced");
    assert!(task["createdAt"].is_string());
    let id = task["id"].as_str().unwrap().to_string();

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/records/tasks/{}", id),
            Some(&admin),
            Some(json!({ "status": "done" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Clean Lab 1");
    assert_eq!(updated["status"], "done");

    let (status, _) = app
        .send(Method::PUT, "/records/tasks/ghost", Some(&admin), Some(json!({ "status": "done" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, hits) = app
        .send(Method::GET, "/records/tasks?status=done", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::DELETE, &format!("/records/tasks/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::POST, "/records/auditLogs", Some(&admin), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, logs) = app
        .send(Method::GET, "/audit-logs?resource=tasks", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<_> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["delete", "update", "create"]);
    assert_eq!(logs[0]["actor"], "admin@edusys.com");
}

#[tokio::test]
async fn test_permissions_table() {
    let app = test_app().await;
    let librarian = app.login("librarian@edusys.com", "librarian123", "Librarian").await;

    let (status, body) = app.send(Method::GET, "/permissions", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Librarian");
    assert_eq!(
        body["capabilities"],
        json!(["issue:books", "manage:fines", "manage:library", "return:books"])
    );
    assert_eq!(body["table"]["Admin"], json!(["*"]));
}

#[tokio::test]
async fn test_user_management() {
    let app = test_app().await;
    let admin = app.login("admin@edusys.com", "admin123", "Admin").await;
    let librarian = app.login("librarian@edusys.com", "librarian123", "Librarian").await;

    let new_user = json!({
        "name": "Tom Teacher",
        "email": "teacher@edusys.com",
        "password": "teacher123",
        "role": "Teacher",
        "schoolId": "s1"
    });

    let (status, _) = app
        .send(Method::POST, "/users", Some(&librarian), Some(new_user.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app
        .send(Method::POST, "/users", Some(&admin), Some(new_user.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "Teacher");
    assert_eq!(created["active"], true);
    assert!(created.get("passwordHash").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::POST, "/users", Some(&admin), Some(new_user))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.login("teacher@edusys.com", "teacher123", "Teacher").await;

    let (status, disabled) = app
        .send(
            Method::PUT,
            &format!("/users/{}/active", id),
            Some(&admin),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(disabled["active"], false);

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "teacher@edusys.com", "password": "teacher123", "role": "Teacher" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is disabled");

    let (status, users) = app.send(Method::GET, "/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 5);

    let (status, _) = app
        .send(
            Method::PUT,
            "/users/ghost/active",
            Some(&admin),
            Some(json!({ "active": true })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_users_created_as_records_can_log_in() {
    let app = test_app().await;
    let admin = app.login("admin@edusys.com", "admin123", "Admin").await;

    let (status, user) = app
        .send(
            Method::POST,
            "/records/users",
            Some(&admin),
            Some(json!({
                "name": "Nina Clerk",
                "email": "nina@edusys.com",
                "password": "nina1234",
                "role": "librarian"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(user.get("password").is_none());
    assert!(user["passwordHash"].as_str().unwrap().starts_with("$argon2"));

    app.login("nina@edusys.com", "nina1234", "Librarian").await;
    let librarian = app.login("librarian@edusys.com", "librarian123", "Librarian").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/library/issue",
            Some(&librarian),
            Some(json!({ "bookQuery": "algebra", "borrowerQuery": "nina" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_malformed_record_fields_are_bad_requests() {
    let app = test_app().await;
    let admin = app.login("admin@edusys.com", "admin123", "Admin").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/records/books",
            Some(&admin),
            Some(json!({ "createdAt": "yesterday" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = app
        .send(
            Method::POST,
            "/records/users",
            Some(&admin),
            Some(json!({ "name": "X", "password": 12 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, books) = app.send(Method::GET, "/library/books", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().unwrap().len(), 1);
}
