//! Books repository (catalog store)

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Book>;

    async fn create(&self, data: &CreateBook) -> AppResult<Book>;

    /// Apply a partial update. A new `total_copies` shifts `available_copies`
    /// by the same delta; fails with Conflict if more copies are on loan than
    /// the new total.
    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book>;

    /// Delete a title. Rejected with Conflict while open loans reference it.
    async fn delete(&self, id: i32) -> AppResult<()>;

    /// Atomically move `available_copies` by `delta`, keeping it within
    /// `0..=total_copies`.
    async fn adjust_availability(&self, id: i32, delta: i32) -> AppResult<Book>;
}

pub(crate) fn book_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

pub(crate) fn availability_conflict(id: i32, delta: i32) -> AppError {
    if delta < 0 {
        AppError::Conflict(format!("No copies of book {} are available", id))
    } else {
        AppError::Conflict(format!("All copies of book {} are already available", id))
    }
}

/// Conditional availability update on an existing connection or transaction.
///
/// The bound check lives in the `WHERE` clause, so concurrent callers are
/// serialized by the row lock and an exhausted counter shows up as zero
/// affected rows rather than a negative value.
pub(crate) async fn adjust_availability_in(
    conn: &mut PgConnection,
    id: i32,
    delta: i32,
) -> AppResult<Book> {
    let updated = sqlx::query_as::<_, Book>(
        r#"
        UPDATE books
        SET available_copies = available_copies + $2
        WHERE id = $1
          AND available_copies + $2 >= 0
          AND available_copies + $2 <= total_copies
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(delta)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(book) => Ok(book),
        None => {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
            if exists {
                Err(availability_conflict(id, delta))
            } else {
                Err(book_not_found(id))
            }
        }
    }
}

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BooksRepository for PgBooksRepository {
    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| book_not_found(id))
    }

    async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, publish_date, genre, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.author)
        .bind(data.publish_date)
        .bind(&data.genre)
        .bind(data.total_copies)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                publish_date = COALESCE($4, publish_date),
                genre = COALESCE($5, genre),
                available_copies = available_copies + (COALESCE($6, total_copies) - total_copies),
                total_copies = COALESCE($6, total_copies)
            WHERE id = $1
              AND available_copies + (COALESCE($6, total_copies) - total_copies) >= 0
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.author)
        .bind(data.publish_date)
        .bind(&data.genre)
        .bind(data.total_copies)
        .fetch_optional(&mut *tx)
        .await?;

        let book = match updated {
            Some(book) => book,
            None => {
                let current = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| book_not_found(id))?;
                return Err(AppError::Conflict(format!(
                    "Book {} has {} copies on loan, more than the requested total",
                    id,
                    current.on_loan()
                )));
            }
        };

        tx.commit().await?;
        Ok(book)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // The row lock waits out any loan that is taking a copy right now, so
        // the open-loan check below sees it once it has committed.
        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(book_not_found(id));
        }

        let open_loans: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND status = 'open')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if open_loans {
            return Err(AppError::Conflict(format!("Book {} still has open loans", id)));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn adjust_availability(&self, id: i32, delta: i32) -> AppResult<Book> {
        let mut conn = self.pool.acquire().await?;
        adjust_availability_in(&mut conn, id, delta).await
    }
}
