//! Live-server API tests
//!
//! Expect a server on localhost:3000 started with
//! `PUSTAKA_AUTH__AUTH_BYPASS=true`. Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:3000/api";

async fn create_book(client: &Client, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/buku", BASE_URL))
        .json(&json!({
            "title": "Gadis Kretek",
            "author": "Ratih Kumala",
            "publish_date": "2012-03-01",
            "genre": "Novel",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"]["id"].as_i64().expect("No book id in response")
}

async fn create_member(client: &Client) -> i64 {
    let email = format!("live-{}@example.com", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let response = client
        .post(format!("{}/anggota", BASE_URL))
        .json(&json!({
            "name": "Live Test",
            "email": email,
            "password": "rahasia",
            "membership_date": "2024-01-01"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"]["id"].as_i64().expect("No member id in response")
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
async fn test_loan_and_return() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;
    let member_id = create_member(&client).await;

    let response = client
        .post(format!("{}/peminjaman", BASE_URL))
        .json(&json!({
            "book_id": book_id,
            "member_id": member_id,
            "loan_date": "2024-01-01",
            "due_date": "2024-01-15"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["data"]["id"].as_i64().expect("No loan id in response");

    // Only copy is out now.
    let response = client
        .post(format!("{}/peminjaman", BASE_URL))
        .json(&json!({
            "book_id": book_id,
            "member_id": member_id,
            "loan_date": "2024-01-02",
            "due_date": "2024-01-16"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .post(format!("{}/pengembalian", BASE_URL))
        .json(&json!({
            "loan_id": loan_id,
            "return_date": "2024-01-10",
            "condition_note": "good"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .get(format!("{}/buku/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["available_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_loans_on_last_copy() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;
    let member_id = create_member(&client).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(format!("{}/peminjaman", BASE_URL))
                .json(&json!({
                    "book_id": book_id,
                    "member_id": member_id,
                    "loan_date": "2024-01-01",
                    "due_date": "2024-01-15"
                }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
                .as_u16()
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.expect("Task panicked"));
    }
    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 9);
}

#[tokio::test]
#[ignore]
async fn test_not_found() {
    let client = Client::new();

    let response = client
        .get(format!("{}/peminjaman/999999", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}
