//! API integration tests
//!
//! Require a running server started with
//! `BIBLIOTHEEK_AUTH__ADMIN_EMAIL=admin@bibliotheek.local` and
//! `BIBLIOTHEEK_AUTH__ADMIN_PASSWORD=change-me-admin` so the administrator
//! account below is seeded.

use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const ADMIN_EMAIL: &str = "admin@bibliotheek.local";
const ADMIN_PASSWORD: &str = "change-me-admin";

/// Helper to get an authenticated client
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Per-run suffix so repeated runs do not collide on unique columns
fn unique_suffix() -> String {
    format!("{:010}", Utc::now().timestamp_nanos_opt().unwrap_or_default() % 10_000_000_000)
}

async fn create_book(client: &Client, token: &str) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "De avonden",
            "author": "Gerard Reve",
            "isbn": format!("978{}", unique_suffix())
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book ID")
}

async fn create_member(client: &Client, token: &str) -> i64 {
    let response = client
        .post(format!("{}/members", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "first_name": "Anna",
            "last_name": "Jansen",
            "email": format!("anna.{}@example.org", unique_suffix())
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No member ID")
}

async fn lend(client: &Client, token: &str, book_id: i64, member_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_id": book_id, "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request")
}

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
async fn test_readiness_check() {
    let response = Client::new()
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["user"]["password_hash"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": ADMIN_EMAIL,
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_get_current_user() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert_eq!(body["is_admin"], true);
}

#[tokio::test]
#[ignore]
async fn test_registered_reader_cannot_list_members() {
    let client = Client::new();
    let email = format!("reader.{}@example.org", unique_suffix());

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "email": email, "password": "long-enough-pw" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "long-enough-pw" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let token = body["token"].as_str().expect("No token").to_string();

    let response = client
        .get(format!("{}/members", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    // Catalog reads stay open to readers
    let response = client
        .get(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/books?available=true&per_page=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_create_and_delete_book() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token).await;

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_second_open_loan_for_same_book_returns_409() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token).await;
    let first_member = create_member(&client, &token).await;
    let second_member = create_member(&client, &token).await;

    let response = lend(&client, &token, book_id, first_member).await;
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loan["id"].as_i64().expect("No loan ID");
    assert!(loan["returned_at"].is_null());

    let response = lend(&client, &token, book_id, second_member).await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BookAlreadyLoaned");

    // Once returned, the book can be lent again
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let response = lend(&client, &token, book_id, second_member).await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_return_twice_returns_409() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token).await;
    let member_id = create_member(&client, &token).await;
    let loan: Value = lend(&client, &token, book_id, member_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let loan_id = loan["id"].as_i64().expect("No loan ID");

    let url = format!("{}/loans/{}/return", BASE_URL, loan_id);
    let first = client.post(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(first.status(), 200);

    let second = client.post(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_extend_loan_moves_due_date() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token).await;
    let member_id = create_member(&client, &token).await;
    let loan: Value = lend(&client, &token, book_id, member_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let loan_id = loan["id"].as_i64().expect("No loan ID");
    let due_date = loan["due_date"].as_str().expect("No due date").to_string();

    let response = client
        .post(format!("{}/loans/{}/extend", BASE_URL, loan_id))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let extended: Value = response.json().await.expect("Failed to parse response");
    assert!(extended["due_date"].as_str().unwrap() > due_date.as_str());
}

#[tokio::test]
#[ignore]
async fn test_member_with_open_loan_cannot_be_deleted() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token).await;
    let member_id = create_member(&client, &token).await;
    assert_eq!(lend(&client, &token, book_id, member_id).await.status(), 201);

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, member_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/members/{}/loans?open=true", BASE_URL, member_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let loans: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loans.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore]
async fn test_get_stats() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["books"]["total"].is_number());
    assert!(body["loans"]["open"].is_number());
}
