//! HTTP surface driven in-process through the router

use axum::http::{Method, StatusCode};
use serde_json::json;

use pustaka_server::models::member::CreateMember;

use crate::common::{app, date, send, state};

#[tokio::test]
async fn test_health_is_public() {
    let app = app(&state(false));

    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = app(&state(false));

    let (status, body) = send(&app, Method::GET, "/api/peminjaman", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = send(&app, Method::GET, "/api/buku", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_profile() {
    let state = state(false);
    state
        .services
        .members
        .create_member(CreateMember {
            name: "Rina".into(),
            email: "rina@example.com".into(),
            password: "rahasia".into(),
            membership_date: date(2024, 1, 1),
        })
        .await
        .unwrap();
    let app = app(&state);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "rina@example.com", "password": "salah"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "RINA@example.com", "password": "rahasia"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/auth/profil", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "rina@example.com");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_lending_flow_over_http() {
    let app = app(&state(true));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/buku",
        None,
        Some(json!({
            "judul": "Laskar Pelangi",
            "penulis": "Andrea Hirata",
            "tanggal_terbit": "2005-09-01",
            "genre": "Novel",
            "salinan_tersedia": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["available_copies"], 2);
    let book_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/anggota",
        None,
        Some(json!({
            "nama": "Budi",
            "email": "budi@example.com",
            "password": "rahasia",
            "tanggal_keanggotaan": "2023-01-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"].get("password_hash").is_none());
    let member_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/peminjaman",
        None,
        Some(json!({
            "id_buku": book_id,
            "id_anggota": member_id,
            "tanggal_peminjaman": "2024-01-01",
            "tanggal_jatuh_tempo": "2024-01-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "open");
    let loan_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = send(&app, Method::GET, &format!("/api/buku/{}", book_id), None, None).await;
    assert_eq!(body["data"]["available_copies"], 1);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pengembalian",
        None,
        Some(json!({
            "id_peminjaman": loan_id,
            "tanggal_pengembalian": "2024-01-10",
            "kondisi_buku": "good"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["condition_note"], "good");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pengembalian",
        None,
        Some(json!({
            "loan_id": loan_id,
            "return_date": "2024-01-11",
            "condition_note": "again"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (_, body) = send(&app, Method::GET, &format!("/api/peminjaman/{}", loan_id), None, None).await;
    assert_eq!(body["data"]["status"], "returned");
    let (_, body) = send(&app, Method::GET, &format!("/api/buku/{}", book_id), None, None).await;
    assert_eq!(body["data"]["available_copies"], 2);
}

#[tokio::test]
async fn test_request_validation() {
    let app = app(&state(true));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/peminjaman",
        None,
        Some(json!({
            "book_id": 0,
            "member_id": 1,
            "loan_date": "2024-01-01",
            "due_date": "2024-01-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "book_id");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/peminjaman",
        None,
        Some(json!({
            "book_id": 1,
            "member_id": 1,
            "loan_date": "01/01/2024",
            "due_date": "2024-01-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/peminjaman",
        None,
        Some(json!({
            "book_id": 1,
            "member_id": 1,
            "loan_date": "2024-02-01",
            "due_date": "2024-01-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::PUT, "/api/peminjaman/1", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/api/peminjaman/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
}

#[tokio::test]
async fn test_missing_resources_and_routes() {
    let app = app(&state(true));

    let (status, body) = send(&app, Method::GET, "/api/peminjaman/77", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/pengembalian",
        None,
        Some(json!({
            "loan_id": 77,
            "return_date": "2024-01-10",
            "condition_note": "good"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/api/tidak-ada", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_duplicate_member_email_is_conflict() {
    let app = app(&state(true));
    let member = json!({
        "name": "Citra",
        "email": "citra@example.com",
        "password": "rahasia",
        "membership_date": "2024-01-01"
    });

    let (status, _) = send(&app, Method::POST, "/api/anggota", None, Some(member)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/anggota",
        None,
        Some(json!({
            "name": "Citra Lain",
            "email": "Citra@Example.com",
            "password": "rahasia",
            "membership_date": "2024-01-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
