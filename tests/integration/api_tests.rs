//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8088/api/v1";

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_books_without_token_are_unauthorized() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_borrow_with_forged_token_is_unauthorized() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books/borrow/1", BASE_URL))
        .bearer_auth("forged.token.value")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_register_reports_every_invalid_field() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "firstname": " ",
            "lastname": "Reader",
            "email": "not-an-email",
            "password": "short"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    let errors = body["validation_errors"].as_array().expect("No validation errors");
    assert_eq!(errors.len(), 3);
}

#[tokio::test]
#[ignore]
async fn test_authenticate_unknown_user() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/authenticate", BASE_URL))
        .json(&json!({
            "email": "nobody@book-network.org",
            "password": "wrong-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Login and / or password is incorrect");
}

#[tokio::test]
#[ignore]
async fn test_activate_with_unknown_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/auth/activate-account", BASE_URL))
        .query(&[("token", "000000x")])
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
#[ignore]
async fn test_openapi_document_is_served() {
    let client = Client::new();

    let response = client
        .get("http://localhost:8088/api-docs/openapi.json")
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["paths"]["/books/borrow/{id}"].is_object());
}
