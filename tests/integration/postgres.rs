//! Lending rules against a real PostgreSQL database
//!
//! Need `DATABASE_URL` pointing at a scratch database; migrations are applied
//! on connect. Run with: cargo test -- --ignored

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use pustaka_server::{
    config::AppConfig,
    error::AppError,
    models::{
        book::{Book, CreateBook},
        loan::{CreateLoan, LoanPatch, LoanQuery, LoanStatus},
        loan_return::{CreateReturn, ReturnPatch},
        member::{CreateMember, Member, UpdateMember},
    },
    repository::Repository,
    services::Services,
    AppState,
};

use crate::common::date;

static NEXT_EMAIL: AtomicU32 = AtomicU32::new(0);

struct Db {
    pool: PgPool,
    repository: Repository,
    services: Arc<Services>,
}

async fn connect() -> Db {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let repository = Repository::new(pool.clone());
    let state = AppState::new(AppConfig::default(), repository.clone());
    Db {
        pool,
        repository,
        services: state.services,
    }
}

/// Seed a fresh book and member; tables are shared, so nothing is assumed empty
async fn seed(db: &Db, copies: i32) -> (Book, Member) {
    let book = db
        .services
        .catalog
        .create_book(CreateBook {
            title: "Cantik Itu Luka".into(),
            author: "Eka Kurniawan".into(),
            publish_date: date(2002, 1, 1),
            genre: "Novel".into(),
            total_copies: copies,
        })
        .await
        .unwrap();
    let email = format!(
        "pg-{}-{}@example.com",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        NEXT_EMAIL.fetch_add(1, Ordering::Relaxed)
    );
    let member = db
        .services
        .members
        .create_member(CreateMember {
            name: "Sari".into(),
            email,
            password: "rahasia".into(),
            membership_date: date(2023, 1, 1),
        })
        .await
        .unwrap();
    (book, member)
}

fn loan_for(book: &Book, member: &Member) -> CreateLoan {
    CreateLoan {
        book_id: book.id,
        member_id: member.id,
        loan_date: date(2024, 1, 1),
        due_date: date(2024, 1, 15),
    }
}

fn return_for(loan_id: i32) -> CreateReturn {
    CreateReturn {
        loan_id,
        return_date: date(2024, 1, 10),
        condition_note: "good".into(),
    }
}

async fn available(db: &Db, id: i32) -> i32 {
    db.services.catalog.get_book(id).await.unwrap().available_copies
}

#[tokio::test]
#[ignore]
async fn test_loan_and_return_lifecycle() {
    let db = connect().await;
    let (book, member) = seed(&db, 2).await;

    let loan = db.services.loans.create_loan(loan_for(&book, &member)).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Open);
    assert_eq!(available(&db, book.id).await, 1);

    let record = db.services.loans.create_return(return_for(loan.id)).await.unwrap();
    assert_eq!(record.condition_note, "good");
    let loan = db.services.loans.get_loan(loan.id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Returned);
    assert_eq!(available(&db, book.id).await, 2);

    let err = db.services.loans.create_return(return_for(loan.id)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(available(&db, book.id).await, 2);

    let err = db.services.loans.create_return(return_for(i32::MAX)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_failed_loan_rolls_back() {
    let db = connect().await;
    let (book, member) = seed(&db, 0).await;

    let err = db.services.loans.create_loan(loan_for(&book, &member)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let mut request = loan_for(&book, &member);
    request.member_id = i32::MAX;
    let err = db.services.loans.create_loan(request).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let loans = db
        .services
        .loans
        .list_loans(&LoanQuery {
            book_id: Some(book.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(loans.is_empty());
    assert_eq!(available(&db, book.id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_loans_on_last_copy() {
    let db = connect().await;
    let (book, member) = seed(&db, 1).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let services = db.services.clone();
        let request = loan_for(&book, &member);
        handles.push(tokio::spawn(async move { services.loans.create_loan(request).await }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!((created, conflicts), (1, 15));
    assert_eq!(available(&db, book.id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_adjust_availability_bounds() {
    let db = connect().await;
    let (book, _) = seed(&db, 1).await;
    let books = &db.repository.books;

    let err = books.adjust_availability(book.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let book = books.adjust_availability(book.id, -1).await.unwrap();
    assert_eq!(book.available_copies, 0);
    let err = books.adjust_availability(book.id, -1).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = books.adjust_availability(i32::MAX, 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_conflict() {
    let db = connect().await;
    let (_, member) = seed(&db, 1).await;

    let err = db
        .services
        .members
        .create_member(CreateMember {
            name: "Sari Lain".into(),
            email: member.email.to_uppercase(),
            password: "rahasia".into(),
            membership_date: date(2023, 1, 1),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[ignore]
async fn test_book_delete_waits_for_loan_in_flight() {
    let db = connect().await;
    let (book, member) = seed(&db, 1).await;

    // Take the copy the way a loan does and keep the transaction open.
    let mut tx = db.pool.begin().await.unwrap();
    sqlx::query(
        "UPDATE books SET available_copies = available_copies - 1 WHERE id = $1 AND available_copies > 0",
    )
    .bind(book.id)
    .execute(&mut *tx)
    .await
    .unwrap();

    let deleting = {
        let services = db.services.clone();
        let book_id = book.id;
        tokio::spawn(async move { services.catalog.delete_book(book_id).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    sqlx::query(
        "INSERT INTO loans (book_id, member_id, loan_date, due_date, status) VALUES ($1, $2, $3, $4, 'open')",
    )
    .bind(book.id)
    .bind(member.id)
    .bind(date(2024, 1, 1))
    .bind(date(2024, 1, 15))
    .execute(&mut *tx)
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let result = deleting.await.unwrap();
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let loans = db
        .services
        .loans
        .list_loans(&LoanQuery {
            book_id: Some(book.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].status, LoanStatus::Open);
}

#[tokio::test]
#[ignore]
async fn test_member_delete_waits_for_loan_in_flight() {
    let db = connect().await;
    let (book, member) = seed(&db, 1).await;

    // Hold the member the way a loan does while it is being opened.
    let mut tx = db.pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM members WHERE id = $1 FOR SHARE")
        .bind(member.id)
        .execute(&mut *tx)
        .await
        .unwrap();

    let deleting = {
        let services = db.services.clone();
        let member_id = member.id;
        tokio::spawn(async move { services.members.delete_member(member_id).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    sqlx::query(
        "INSERT INTO loans (book_id, member_id, loan_date, due_date, status) VALUES ($1, $2, $3, $4, 'open')",
    )
    .bind(book.id)
    .bind(member.id)
    .bind(date(2024, 1, 1))
    .bind(date(2024, 1, 15))
    .execute(&mut *tx)
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let result = deleting.await.unwrap();
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(db.services.members.get_member(member.id).await.is_ok());
}

#[tokio::test]
#[ignore]
async fn test_moving_return_onto_open_loan_is_conflict() {
    let db = connect().await;
    let (book, member) = seed(&db, 2).await;
    let a = db.services.loans.create_loan(loan_for(&book, &member)).await.unwrap();
    let b = db.services.loans.create_loan(loan_for(&book, &member)).await.unwrap();
    let record = db.services.loans.create_return(return_for(a.id)).await.unwrap();

    let patch = ReturnPatch {
        loan_id: Some(b.id),
        ..Default::default()
    };
    let err = db.services.loans.update_return(record.id, patch).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Loan b can still be closed normally.
    db.services.loans.create_return(return_for(b.id)).await.unwrap();
    assert_eq!(available(&db, book.id).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_partial_updates_bind_in_order() {
    let db = connect().await;
    let (book, member) = seed(&db, 1).await;

    let updated = db
        .services
        .members
        .update_member(
            member.id,
            UpdateMember {
                name: Some("Sari Dewi".into()),
                membership_date: Some(date(2022, 6, 1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Sari Dewi");
    assert_eq!(updated.membership_date, date(2022, 6, 1));
    assert_eq!(updated.email, member.email);

    let loan = db.services.loans.create_loan(loan_for(&book, &member)).await.unwrap();
    let loan = db
        .services
        .loans
        .update_loan(
            loan.id,
            LoanPatch {
                loan_date: Some(date(2024, 1, 2)),
                due_date: Some(date(2024, 2, 2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!((loan.loan_date, loan.due_date), (date(2024, 1, 2), date(2024, 2, 2)));
    assert_eq!(loan.status, LoanStatus::Open);
}
