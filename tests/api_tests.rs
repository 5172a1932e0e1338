use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use demobank::api::{self, AppState};
use demobank::config::Config;
use demobank::storage::{JsonFileStorage, MemoryStorage, StorageBackend};
use demobank::telemetry;
use demobank_core::{NewUser, Role};

fn app_with(storage: Arc<dyn StorageBackend>, config_toml: &str) -> Router {
    let config = Config::from_toml(config_toml).expect("test config");
    api::router(AppState::new(storage, &config, telemetry::detached_metrics()))
}

fn open_app() -> (Arc<MemoryStorage>, Router) {
    let storage = Arc::new(MemoryStorage::new());
    let app = app_with(storage.clone(), "[otp]\nexpose_code = true\n");
    (storage, app)
}

const SECURED: &str = r#"
[auth]
enabled = true
api_keys = [{ name = "ops", key = "ops-key", role = "admin" }]

[otp]
expose_code = true
"#;

fn secured_app() -> (Arc<MemoryStorage>, Router) {
    let storage = Arc::new(MemoryStorage::new());
    let app = app_with(storage.clone(), SECURED);
    (storage, app)
}

fn add_user(storage: &MemoryStorage, email: &str, password: &str, role: Role) -> u64 {
    storage
        .create_user(NewUser {
            id: None,
            email: email.to_string(),
            password: password.to_string(),
            name: "Test User".to_string(),
            role,
            phone: "(555) 010-2233".to_string(),
        })
        .unwrap()
        .id
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn get(app: &Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, headers).await
}

async fn post(
    app: &Router,
    uri: &str,
    body: Value,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body), headers).await
}

/// Runs login + OTP and returns the session token.
async fn sign_in(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = post(
        app,
        "/api/auth/login",
        json!({ "email": email, "password": password }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let challenge = body["data"]["challengeId"].as_str().unwrap().to_string();
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, body) = post(
        app,
        "/api/auth/otp/verify",
        json!({ "challengeId": challenge, "code": code }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["token"].as_str().unwrap().to_string()
}

fn wrong(code: &str) -> String {
    let n: u16 = code.parse().unwrap();
    format!("{:04}", (n + 1) % 10_000)
}

fn names(body: &Value) -> Vec<&str> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect()
}

fn account_body(name: &str, balance: f64, kind: &str) -> Value {
    json!({
        "name": name,
        "number": "****1234",
        "balance": balance,
        "interestRate": 0.015,
        "routing": "021000021",
        "openedDate": "2020-05-01",
        "type": kind
    })
}

#[tokio::test]
async fn test_health() {
    let (_, app) = open_app();
    let (status, body) = get(&app, "/health", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint_is_open() {
    let (_, app) = secured_app();
    let (status, _) = get(&app, "/metrics", &[]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_signup_login_otp_session() {
    let (_, app) = secured_app();

    let (status, body) = post(
        &app,
        "/api/auth/signup",
        json!({
            "email": "jane@example.com",
            "password": "pw1",
            "name": "Jane",
            "phone": "555-123-4567"
        }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("password").is_none());

    let (status, body) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "JANE@example.com", "password": "pw1" }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["maskedPhone"], "***-***-4567");
    assert_eq!(body["data"]["code"].as_str().unwrap().len(), 4);

    let token = sign_in(&app, "jane@example.com", "pw1").await;
    let bearer = format!("Bearer {}", token);

    let (status, body) = get(&app, "/api/auth/me", &[("authorization", &bearer)]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "jane@example.com");

    let (status, body) = post(
        &app,
        "/api/auth/logout",
        json!({}),
        &[("authorization", &bearer)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["loggedOut"], true);

    let (status, body) = get(&app, "/api/auth/me", &[("authorization", &bearer)]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_duplicate_signup_rejected() {
    let (_, app) = open_app();
    let user = json!({ "email": "dup@example.com", "password": "pw", "name": "Dup" });
    let (status, _) = post(&app, "/api/auth/signup", user.clone(), &[]).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post(&app, "/api/auth/signup", user, &[]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("dup@example.com"));
}

#[tokio::test]
async fn test_duplicate_user_id_rejected() {
    let (_, app) = open_app();
    let (status, _) = post(
        &app,
        "/api/admin/users",
        json!({ "id": 10, "email": "a@example.com", "password": "pw", "name": "A" }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(
        &app,
        "/api/admin/users",
        json!({ "id": 10, "email": "b@example.com", "password": "pw", "name": "B" }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation() {
    let (_, app) = open_app();
    let (status, body) = post(
        &app,
        "/api/auth/signup",
        json!({ "email": "nope", "password": "pw", "name": "X" }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_bad_credentials() {
    let (storage, app) = open_app();
    add_user(&storage, "sam@example.com", "right", Role::User);

    let (status, wrong_pw) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "sam@example.com", "password": "wrong" }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, no_user) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "who@example.com", "password": "right" }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw["error"], no_user["error"]);
}

#[tokio::test]
async fn test_otp_locks_after_three_failures() {
    let (storage, app) = open_app();
    add_user(&storage, "sam@example.com", "pw", Role::User);

    let (_, body) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "sam@example.com", "password": "pw" }),
        &[],
    )
    .await;
    let challenge = body["data"]["challengeId"].as_str().unwrap().to_string();
    let code = body["data"]["code"].as_str().unwrap().to_string();
    let bad = wrong(&code);

    let attempt = |c: String| json!({ "challengeId": challenge.clone(), "code": c });
    let (status, body) = post(&app, "/api/auth/otp/verify", attempt(bad.clone()), &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("2 attempt"));
    let (status, _) = post(&app, "/api/auth/otp/verify", attempt(bad.clone()), &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = post(&app, "/api/auth/otp/verify", attempt(bad), &[]).await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, _) = post(&app, "/api/auth/otp/verify", attempt(code), &[]).await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, _) = post(
        &app,
        "/api/auth/otp/resend",
        json!({ "challengeId": challenge }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
}

#[tokio::test]
async fn test_otp_resend_issues_new_code() {
    let (storage, app) = open_app();
    add_user(&storage, "sam@example.com", "pw", Role::User);

    let (_, body) = post(
        &app,
        "/api/auth/login",
        json!({ "email": "sam@example.com", "password": "pw" }),
        &[],
    )
    .await;
    let challenge = body["data"]["challengeId"].as_str().unwrap().to_string();

    let (status, body) = post(
        &app,
        "/api/auth/otp/resend",
        json!({ "challengeId": challenge }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["challengeId"], challenge.as_str());
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, body) = post(
        &app,
        "/api/auth/otp/verify",
        json!({ "challengeId": challenge, "code": code }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].is_string());
}

#[tokio::test]
async fn test_unknown_challenge() {
    let (_, app) = open_app();
    let (status, _) = post(
        &app,
        "/api/auth/otp/verify",
        json!({ "challengeId": "nope", "code": "1234" }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_secured_routes_need_credentials() {
    let (storage, app) = secured_app();
    add_user(&storage, "user@example.com", "pw", Role::User);
    add_user(&storage, "admin@example.com", "pw", Role::Admin);

    let (status, body) = get(&app, "/api/transactions", &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = get(
        &app,
        "/api/transactions",
        &[("authorization", "Bearer not-a-session")],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&app, "/api/admin/users", &[("x-api-key", "wrong")]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user_bearer = format!("Bearer {}", sign_in(&app, "user@example.com", "pw").await);
    let (status, _) = get(&app, "/api/transactions", &[("authorization", &user_bearer)]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = get(&app, "/api/admin/users", &[("authorization", &user_bearer)]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let admin_bearer = format!("Bearer {}", sign_in(&app, "admin@example.com", "pw").await);
    let (status, body) = get(&app, "/api/admin/users", &[("authorization", &admin_bearer)]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert!(body["data"][0].get("password").is_none());

    let (status, _) = get(&app, "/api/admin/backup", &[("x-api-key", "ops-key")]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deleting_user_ends_sessions() {
    let (storage, app) = secured_app();
    let id = add_user(&storage, "gone@example.com", "pw", Role::User);
    let bearer = format!("Bearer {}", sign_in(&app, "gone@example.com", "pw").await);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/users/{}", id),
        None,
        &[("x-api-key", "ops-key")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/api/transactions", &[("authorization", &bearer)]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_transaction_crud_and_sorting() {
    let (_, app) = open_app();

    let rows = [
        ("Rent", "2024-03-01", "09:00"),
        ("Coffee", "Mar 5, 2024", "8:15 AM"),
        ("Salary", "2024-03-05", "17:30"),
        ("Mystery", "sometime", ""),
    ];
    let mut ids = Vec::new();
    for (name, date, time) in rows {
        let (status, body) = post(
            &app,
            "/api/transactions",
            json!({
                "name": name, "amount": 10.5, "date": date, "time": time,
                "category": "General", "status": "completed", "merchant": "Shop", "type": "debit"
            }),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        ids.push(body["data"]["id"].as_u64().unwrap());
    }
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let (status, body) = get(&app, "/api/transactions/2", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Coffee");
    assert_eq!(body["data"]["amount"], json!(10.5));

    let (_, body) = get(&app, "/api/transactions", &[]).await;
    assert_eq!(names(&body), vec!["Salary", "Coffee", "Rent", "Mystery"]);

    let (_, body) = get(&app, "/api/transactions?order=oldest&limit=2", &[]).await;
    assert_eq!(names(&body), vec!["Rent", "Coffee"]);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/transactions/2",
        Some(json!({ "status": "failed" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "failed");
    assert_eq!(body["data"]["name"], "Coffee");

    let (status, _) = send(&app, Method::DELETE, "/api/transactions/2", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = get(&app, "/api/transactions/2", &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    let (_, body) = get(&app, "/api/transactions", &[]).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_malformed_requests_use_envelope() {
    let (_, app) = open_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/transactions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ nope"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);

    let (status, body) = get(&app, "/api/transactions/abc", &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = get(&app, "/api/transactions?status=bogus", &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_account_crud() {
    let (_, app) = open_app();

    let (status, body) = post(
        &app,
        "/api/admin/accounts",
        account_body("Everyday", 1200.5, "checking"),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_u64().unwrap();

    let (status, body) = get(&app, &format!("/api/accounts/{}", id), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], json!(1200.5));
    assert_eq!(body["data"]["interestRate"], json!(0.015));

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/accounts/{}", id),
        Some(json!({ "name": "Main Checking" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Main Checking");
    assert_eq!(body["data"]["type"], "checking");

    let (status, _) = post(
        &app,
        "/api/admin/accounts",
        account_body("", 1.0, "savings"),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/accounts/{}", id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/accounts/{}", id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transfer_between_accounts() {
    let (_, app) = open_app();
    post(&app, "/api/admin/accounts", account_body("Checking", 500.0, "checking"), &[]).await;
    post(&app, "/api/admin/accounts", account_body("Savings", 100.0, "savings"), &[]).await;

    let (status, body) = post(
        &app,
        "/api/transfers",
        json!({ "fromAccountId": 1, "toAccountId": 2, "amount": 125.25, "memo": "Monthly saving" }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["from"]["balance"], json!(374.75));
    assert_eq!(body["data"]["to"]["balance"], json!(225.25));
    assert_eq!(body["data"]["debit"]["amount"], json!(-125.25));

    let (_, body) = get(&app, "/api/accounts/2/transactions", &[]).await;
    let txns = body["data"].as_array().unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0]["name"], "Monthly saving");
    assert_eq!(txns[0]["type"], "credit");

    let (status, body) = post(
        &app,
        "/api/transfers",
        json!({ "fromAccountId": 2, "toAccountId": 1, "amount": 1000 }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("insufficient funds"));

    let (status, _) = post(
        &app,
        "/api/transfers",
        json!({ "fromAccountId": 1, "toAccountId": 2, "amount": 0 }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/api/transfers",
        json!({ "fromAccountId": 1, "toAccountId": 99, "amount": 1 }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "/api/accounts/1", &[]).await;
    assert_eq!(body["data"]["balance"], json!(374.75));
}

#[tokio::test]
async fn test_backup_and_restore() {
    let (_, app) = open_app();
    post(&app, "/api/admin/accounts", account_body("Keep", 10.0, "checking"), &[]).await;

    let (status, body) = post(&app, "/api/admin/backup", json!({}), &[]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["accounts"], 1);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    post(&app, "/api/admin/accounts", account_body("Temporary", 20.0, "savings"), &[]).await;
    let (_, body) = get(&app, "/api/admin/accounts", &[]).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = get(&app, &format!("/api/admin/backup/{}", id), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accounts"][0]["name"], "Keep");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/backup/{}", id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = get(&app, "/api/admin/accounts", &[]).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = get(&app, "/api/admin/backup", &[]).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/backup/{}", id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/backup/{}", id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_json_storage_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = Arc::new(JsonFileStorage::open(dir.path()).unwrap());
    let app = app_with(storage, "");

    let (status, _) = post(
        &app,
        "/api/admin/accounts",
        account_body("On Disk", 42.0, "investment"),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let contents = std::fs::read_to_string(dir.path().join("accounts.json")).unwrap();
    let raw: Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(raw[0]["name"], "On Disk");
    assert_eq!(raw[0]["type"], "investment");

    let reopened = Arc::new(JsonFileStorage::open(dir.path()).unwrap());
    let app = app_with(reopened, "");
    let (_, body) = get(&app, "/api/accounts", &[]).await;
    assert_eq!(body["data"][0]["balance"], json!(42.0));
}

#[tokio::test]
async fn test_restore_ends_existing_sessions() {
    let (storage, app) = secured_app();
    let id = add_user(&storage, "x@example.com", "pw", Role::User);
    let ops = [("x-api-key", "ops-key")];

    let (status, body) = post(&app, "/api/admin/backup", json!({}), &ops).await;
    assert_eq!(status, StatusCode::CREATED);
    let backup_id = body["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/admin/users/{}", id);
    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "role": "admin" })), &ops).await;
    assert_eq!(status, StatusCode::OK);

    let bearer = format!("Bearer {}", sign_in(&app, "x@example.com", "pw").await);
    let (status, _) = get(&app, "/api/admin/users", &[("authorization", &bearer)]).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/admin/backup/{}", backup_id);
    let (status, _) = send(&app, Method::PUT, &uri, None, &ops).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/api/admin/users", &[("authorization", &bearer)]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bearer = format!("Bearer {}", sign_in(&app, "x@example.com", "pw").await);
    let (status, _) = get(&app, "/api/admin/users", &[("authorization", &bearer)]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_exhausted_user_ids_keep_store_usable() {
    let (_, app) = open_app();
    let top = json!({
        "id": u64::MAX,
        "email": "top@example.com",
        "password": "pw",
        "name": "Top"
    });
    let (status, _) = post(&app, "/api/admin/users", top, &[]).await;
    assert_eq!(status, StatusCode::CREATED);

    let next = json!({ "email": "next@example.com", "password": "pw", "name": "Next" });
    let (status, body) = post(&app, "/api/auth/signup", next, &[]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = get(&app, "/api/admin/users", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (status, _) = post(
        &app,
        "/api/admin/accounts",
        account_body("Still", 1.0, "checking"),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_overflowing_transfer_keeps_store_usable() {
    let (_, app) = open_app();
    let huge = 7.0e28;
    post(&app, "/api/admin/accounts", account_body("A", huge, "checking"), &[]).await;
    post(&app, "/api/admin/accounts", account_body("B", huge, "checking"), &[]).await;

    let transfer = json!({ "fromAccountId": 1, "toAccountId": 2, "amount": 1.0e28 });
    let (status, body) = post(&app, "/api/transfers", transfer, &[]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (status, body) = get(&app, "/api/accounts", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = get(&app, "/api/transactions", &[]).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
