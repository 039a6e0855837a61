//! Integration tests for the PetTouch Server API
//!
//! These tests drive the complete router, request to response, against a
//! throwaway database.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use pettouch_server::{
    i18n::{I18nOptions, Translator},
    open_database, router, AppState, Config,
};

const ADMIN_EMAIL: &str = "admin@pettouch.test";
const PASSWORD: &str = "correct-horse";

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a test configuration
fn test_config(database_path: String) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_path,
        allowed_origins: vec!["http://localhost:5173".to_string()],
        environment: "test".to_string(),
        locales_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/locales").to_string(),
        default_locale: "en".to_string(),
        i18n_debug: true,
        password_pepper: "test-pepper".to_string(),
        session_ttl_secs: 3600,
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        retry_max_attempts: 1,
    }
}

/// Create a test app backed by a database in a temporary directory
fn create_test_app(temp_dir: &TempDir) -> Router {
    let db_path = temp_dir.path().join("test.db");
    let db = open_database(&db_path).expect("Failed to create test database");
    let config = test_config(db_path.to_string_lossy().into_owned());
    let i18n = Translator::load_dir(
        &config.locales_dir,
        I18nOptions {
            default_locale: config.default_locale.clone(),
            production: false,
            debug: config.i18n_debug,
        },
    )
    .expect("Failed to load locales");

    router(AppState::new(db, config, i18n))
}

/// Send one request and return the status with the JSON body
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Sign up an account and return (user_id, token)
async fn signup(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "signup failed: {}", body);
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

async fn create_pet(app: &Router, token: &str, name: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/pets",
        Some(token),
        Some(json!({ "name": name, "type": "dog" })),
    )
    .await
}

/// Register a tag as admin and link it to a new pet of the owner
async fn setup_linked_tag(app: &Router, admin: &str, owner: &str, code: &str) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/admin/tags",
        Some(admin),
        Some(json!({ "codes": [code] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, pet) = create_pet(app, owner, "Rex").await;
    assert_eq!(status, StatusCode::OK);
    let pet_id = pet["id"].as_str().unwrap().to_string();

    let (status, tag) = send(
        app,
        Method::PUT,
        &format!("/api/tags/{}/link", code),
        Some(owner),
        Some(json!({ "petId": pet_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tag["petId"], pet_id.as_str());
    pet_id
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["locales"], json!(["en", "es"]));
    assert!(body["version"].as_str().is_some());
}

// =============================================================================
// Auth Tests
// =============================================================================

#[tokio::test]
async fn test_signup_signin_and_signout() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let (user_id, _) = signup(&app, "Owner@PetTouch.test").await;

    // Duplicate e-mail (case-insensitive)
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "owner@pettouch.test", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Wrong password
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "owner@pettouch.test", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "owner@pettouch.test", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["user"]["plan"], "free");
    assert_eq!(body["user"]["role"], "user");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAuthenticated"], true);
    assert_eq!(body["isAdmin"], false);
    assert_eq!(body["loading"], false);

    let (status, _) = send(&app, Method::POST, "/api/auth/signout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/api/auth/session", Some(&token), None).await;
    assert_eq!(body["isAuthenticated"], false);
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn test_protected_route_without_session_redirects_to_login() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let (status, body) = send(&app, Method::GET, "/api/pets", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["redirect"], "/login");
    assert_eq!(body["from"], "/api/pets");

    let (status, _) = send(&app, Method::GET, "/api/pets", Some("bogus-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_route_rejects_regular_user() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, token) = signup(&app, "owner@pettouch.test").await;
    let (_, admin) = signup(&app, ADMIN_EMAIL).await;

    let (status, body) = send(&app, Method::GET, "/api/admin/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let (status, body) = send(&app, Method::GET, "/api/admin/dashboard", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userCount"], 2);
    assert_eq!(body["petCount"], 0);
}

#[tokio::test]
async fn test_preferences_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, token) = signup(&app, "owner@pettouch.test").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/me/preferences",
        Some(&token),
        Some(json!({ "language": "es", "theme": "dark" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "language": "es", "theme": "dark" }));

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/me/preferences",
        Some(&token),
        Some(json!({ "language": "fr" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::GET, "/api/me/preferences", Some(&token), None).await;
    assert_eq!(body["language"], "es");
}

// =============================================================================
// Pet Quota Tests
// =============================================================================

#[tokio::test]
async fn test_free_plan_allows_exactly_one_pet() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, token) = signup(&app, "owner@pettouch.test").await;

    let (status, pet) = create_pet(&app, &token, "Rex").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pet["name"], "Rex");
    assert_eq!(pet["type"], "dog");

    let (status, body) = create_pet(&app, &token, "Max").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("free"));

    let (status, quota) = send(&app, Method::GET, "/api/pets/quota", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        quota,
        json!({ "plan": "free", "limit": 1, "used": 1, "remaining": 0 })
    );

    // Deleting frees the slot
    let pet_id = pet["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/pets/{}", pet_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = create_pet(&app, &token, "Max").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_pets_are_private_to_their_owner() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, owner) = signup(&app, "owner@pettouch.test").await;
    let (_, other) = signup(&app, "other@pettouch.test").await;

    let (_, pet) = create_pet(&app, &owner, "Rex").await;
    let uri = format!("/api/pets/{}", pet["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&owner),
        Some(json!({ "color": "brown", "medical": { "allergies": ["chicken"] } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["color"], "brown");
    assert_eq!(body["medical"]["allergies"], json!(["chicken"]));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/pets",
        Some(&owner),
        Some(json!({ "type": "dog" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Serverless Function Tests
// =============================================================================

#[tokio::test]
async fn test_create_subscription_status_codes() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (user_id, _) = signup(&app, "owner@pettouch.test").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/functions/create-subscription",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");

    let (status, body) = send(
        &app,
        Method::POST,
        "/functions/create-subscription",
        None,
        Some(json!({ "userId": user_id, "plan": "premium" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, _) = send(
        &app,
        Method::POST,
        "/functions/create-subscription",
        None,
        Some(json!({
            "userId": user_id,
            "plan": "gold",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/functions/create-subscription",
        None,
        Some(json!({
            "userId": "no-such-user",
            "plan": "premium",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/functions/create-subscription",
        None,
        Some(json!({
            "userId": user_id,
            "plan": "premium",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().is_some());
    assert!(body["subscriptionId"].as_str().is_some());
}

#[tokio::test]
async fn test_subscription_approval_raises_pet_limit() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (user_id, token) = signup(&app, "owner@pettouch.test").await;
    let (_, admin) = signup(&app, ADMIN_EMAIL).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/functions/create-subscription",
        None,
        Some(json!({
            "userId": user_id,
            "plan": "premium",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31"
        })),
    )
    .await;
    let subscription_id = body["subscriptionId"].as_str().unwrap().to_string();

    // Admins are told about the request
    let (_, notifications) = send(
        &app,
        Method::GET,
        "/api/admin/notifications",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(notifications[0]["kind"], "subscription_request");
    assert_eq!(
        notifications[0]["message"],
        "owner@pettouch.test requested the Premium plan (2025-01-01 to 2025-12-31)."
    );

    let (_, pending) = send(
        &app,
        Method::GET,
        "/api/admin/subscriptions?status=pending",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/subscriptions/{}/approve", subscription_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    // Deciding twice is a conflict
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/subscriptions/{}/reject", subscription_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, me) = send(&app, Method::GET, "/api/me", Some(&token), None).await;
    assert_eq!(me["plan"], "premium");

    let (_, notifications) =
        send(&app, Method::GET, "/api/notifications", Some(&token), None).await;
    assert_eq!(notifications[0]["title"], "Your Premium plan is active");
    assert_eq!(
        notifications[0]["details"]["subscription"]["status"],
        "active"
    );

    for i in 0..5 {
        let (status, _) = create_pet(&app, &token, &format!("Pet {}", i)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = create_pet(&app, &token, "One too many").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("premium"));
}

#[tokio::test]
async fn test_scan_and_report_notify_owner() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, owner) = signup(&app, "owner@pettouch.test").await;
    let (_, admin) = signup(&app, ADMIN_EMAIL).await;
    let pet_id = setup_linked_tag(&app, &admin, &owner, "PT-0001").await;

    // Public lookup
    let (status, body) = send(&app, Method::GET, "/api/tags/pt-0001", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], true);
    assert_eq!(body["pet"]["name"], "Rex");

    let (status, body) = send(
        &app,
        Method::POST,
        "/functions/record-scan",
        None,
        Some(json!({
            "tagCode": "PT-0001",
            "location": { "latitude": 48.8566, "longitude": 2.3522 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        "/functions/submit-report",
        None,
        Some(json!({ "nfcId": "PT-0001", "details": "Found near the park" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ownerNotified"], true);

    let (status, _) = send(
        &app,
        Method::POST,
        "/functions/submit-report",
        None,
        Some(json!({ "nfcId": "PT-9999", "details": "Found" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/functions/submit-report",
        None,
        Some(json!({ "nfcId": "PT-0001" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, notifications) =
        send(&app, Method::GET, "/api/notifications", Some(&owner), None).await;
    let titles: Vec<&str> = notifications
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"Rex's tag was scanned"));
    assert!(titles.contains(&"New report about Rex"));

    let (_, unread) = send(
        &app,
        Method::GET,
        "/api/notifications/unread-count",
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(unread["unread"], 2);

    let (_, scans) = send(
        &app,
        Method::GET,
        &format!("/api/pets/{}/scans", pet_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(scans.as_array().unwrap().len(), 1);
    assert_eq!(scans[0]["location"]["latitude"], 48.8566);

    let (_, reports) = send(
        &app,
        Method::GET,
        &format!("/api/pets/{}/reports", pet_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(reports[0]["details"], "Found near the park");

    // Unlinking leaves a registered but anonymous tag
    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/tags/PT-0001/link",
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, "/api/tags/PT-0001", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], false);

    let (status, _) = send(&app, Method::GET, "/api/tags/PT-0404", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tag_cannot_be_linked_to_two_pets() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, owner) = signup(&app, "owner@pettouch.test").await;
    let (_, other) = signup(&app, "other@pettouch.test").await;
    let (_, admin) = signup(&app, ADMIN_EMAIL).await;
    setup_linked_tag(&app, &admin, &owner, "PT-0002").await;

    let (_, pet) = create_pet(&app, &other, "Mia").await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/tags/PT-0002/link",
        Some(&other),
        Some(json!({ "petId": pet["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// Lost & Found Tests
// =============================================================================

#[tokio::test]
async fn test_interaction_notifies_post_author() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, author) = signup(&app, "owner@pettouch.test").await;
    let (_, helper) = signup(&app, "helper@pettouch.test").await;

    let (status, post) = send(
        &app,
        Method::POST,
        "/api/lost-found",
        Some(&author),
        Some(json!({
            "kind": "lost",
            "petName": "Rex",
            "type": "dog",
            "description": "Brown terrier, red collar"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let post_id = post["id"].as_str().unwrap().to_string();

    let (_, posts) = send(&app, Method::GET, "/api/lost-found?kind=found", None, None).await;
    assert!(posts.as_array().unwrap().is_empty());
    let (_, posts) = send(&app, Method::GET, "/api/lost-found?kind=lost", None, None).await;
    assert_eq!(posts.as_array().unwrap().len(), 1);

    let interactions_uri = format!("/api/lost-found/{}/interactions", post_id);
    let (status, _) = send(
        &app,
        Method::POST,
        &interactions_uri,
        Some(&helper),
        Some(json!({ "kind": "sighting", "message": "Saw him by the station" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &interactions_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, interactions) =
        send(&app, Method::GET, &interactions_uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(interactions[0]["kind"], "sighting");

    let (_, notifications) =
        send(&app, Method::GET, "/api/notifications", Some(&author), None).await;
    assert_eq!(notifications[0]["title"], "New sighting on your post");
    assert_eq!(notifications[0]["message"], "Saw him by the station");

    // Resolved posts take no more interactions and leave the public list
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/lost-found/{}", post_id),
        Some(&author),
        Some(json!({ "status": "resolved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::POST,
        &interactions_uri,
        Some(&helper),
        Some(json!({ "kind": "tip", "message": "Try the park" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, posts) = send(&app, Method::GET, "/api/lost-found", None, None).await;
    assert!(posts.as_array().unwrap().is_empty());
}

// =============================================================================
// Store Tests
// =============================================================================

#[tokio::test]
async fn test_order_decrements_stock_and_notifies_admins() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, buyer) = signup(&app, "owner@pettouch.test").await;
    let (_, admin) = signup(&app, ADMIN_EMAIL).await;

    let (status, product) = send(
        &app,
        Method::POST,
        "/api/admin/products",
        Some(&admin),
        Some(json!({ "name": "NFC Tag", "priceCents": 1999, "stock": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let product_id = product["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/store/orders",
        Some(&buyer),
        Some(json!({
            "items": [{ "productId": product_id, "quantity": 3 }],
            "shippingAddress": "1 Main St"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only 2 left of NFC Tag");

    let (status, order) = send(
        &app,
        Method::POST,
        "/api/store/orders",
        Some(&buyer),
        Some(json!({
            "items": [{ "productId": product_id, "quantity": 2 }],
            "shippingAddress": "1 Main St"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["totalCents"], 3998);
    assert_eq!(order["status"], "pending");

    let (_, product) = send(
        &app,
        Method::GET,
        &format!("/api/store/products/{}", product_id),
        None,
        None,
    )
    .await;
    assert_eq!(product["stock"], 0);

    let (_, notifications) = send(
        &app,
        Method::GET,
        "/api/admin/notifications",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(notifications[0]["kind"], "new_order");
    assert_eq!(notifications[0]["details"]["order"]["total_cents"], 3998);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/orders/{}/status", order["id"].as_str().unwrap()),
        Some(&admin),
        Some(json!({ "status": "shipped" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/orders/{}/status", order["id"].as_str().unwrap()),
        Some(&admin),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("cannot move from shipped to pending"));

    let (_, notifications) =
        send(&app, Method::GET, "/api/notifications", Some(&buyer), None).await;
    assert_eq!(notifications[0]["title"], "Order update");

    let (_, dashboard) = send(
        &app,
        Method::GET,
        "/api/admin/dashboard",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(dashboard["orderCount"], 1);
    assert_eq!(dashboard["revenueCents"], 3998);
}

// =============================================================================
// Article Tests
// =============================================================================

#[tokio::test]
async fn test_articles_slugs_and_publication() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let (_, admin) = signup(&app, ADMIN_EMAIL).await;

    let (status, article) = send(
        &app,
        Method::POST,
        "/api/admin/articles",
        Some(&admin),
        Some(json!({
            "title": "Caring for Senior Dogs!",
            "body": "Gentle walks.",
            "published": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(article["slug"], "caring-for-senior-dogs");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/articles",
        Some(&admin),
        Some(json!({ "title": "Caring for senior dogs", "body": "Again." })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/articles",
        Some(&admin),
        Some(json!({ "title": "Draft", "body": "Not yet." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, published) = send(&app, Method::GET, "/api/articles", None, None).await;
    assert_eq!(published.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/articles/caring-for-senior-dogs",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["body"], "Gentle walks.");

    let (status, _) = send(&app, Method::GET, "/api/articles/draft", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Translation Tests
// =============================================================================

#[tokio::test]
async fn test_i18n_catalogues() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let (status, body) = send(&app, Method::GET, "/api/i18n", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default"], "en");

    let (status, body) = send(&app, Method::GET, "/api/i18n/es", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["notifications.tag_scanned.title"].as_str().is_some());

    let (status, _) = send(&app, Method::GET, "/api/i18n/xx", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
