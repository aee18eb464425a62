//! Returns repository (return processor)

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::books::adjust_availability_in;
use super::loans::loan_not_found;
use super::unique_violation_or;
use crate::{
    error::{AppError, AppResult},
    models::{
        loan::LoanStatus,
        loan_return::{CreateReturn, LoanReturn, ReturnPatch},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReturnsRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<LoanReturn>>;

    async fn get_by_id(&self, id: i32) -> AppResult<LoanReturn>;

    /// Close an open loan: flip it to `returned`, record the return and give
    /// the copy back to the catalog, all or nothing.
    async fn create(&self, data: &CreateReturn) -> AppResult<LoanReturn>;

    /// Overwrite the supplied columns of the return record only. A new
    /// `loan_id` must name a returned loan without a record of its own.
    async fn update(&self, id: i32, data: &ReturnPatch) -> AppResult<LoanReturn>;

    /// Remove the return record only
    async fn delete(&self, id: i32) -> AppResult<()>;
}

pub(crate) fn return_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Return with id {} not found", id))
}

pub(crate) fn already_returned(loan_id: i32) -> AppError {
    AppError::Conflict(format!("Loan {} has already been returned", loan_id))
}

pub(crate) fn return_exists(loan_id: i32) -> AppError {
    AppError::Conflict(format!("Loan {} already has a return record", loan_id))
}

pub(crate) fn loan_still_open(loan_id: i32) -> AppError {
    AppError::Conflict(format!(
        "Loan {} is still open; a return record can only belong to a returned loan",
        loan_id
    ))
}

#[derive(Clone)]
pub struct PgReturnsRepository {
    pool: Pool<Postgres>,
}

impl PgReturnsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReturnsRepository for PgReturnsRepository {
    async fn list(&self) -> AppResult<Vec<LoanReturn>> {
        let returns = sqlx::query_as::<_, LoanReturn>("SELECT * FROM returns ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(returns)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<LoanReturn> {
        sqlx::query_as::<_, LoanReturn>("SELECT * FROM returns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| return_not_found(id))
    }

    async fn create(&self, data: &CreateReturn) -> AppResult<LoanReturn> {
        let mut tx = self.pool.begin().await?;

        // Conditional status flip: only one concurrent return can win it.
        let book_id: Option<i32> = sqlx::query_scalar(
            "UPDATE loans SET status = 'returned' WHERE id = $1 AND status = 'open' RETURNING book_id",
        )
        .bind(data.loan_id)
        .fetch_optional(&mut *tx)
        .await?;

        let book_id = match book_id {
            Some(book_id) => book_id,
            None => {
                let status: Option<LoanStatus> =
                    sqlx::query_scalar("SELECT status FROM loans WHERE id = $1")
                        .bind(data.loan_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match status {
                    Some(_) => already_returned(data.loan_id),
                    None => loan_not_found(data.loan_id),
                });
            }
        };

        let record = sqlx::query_as::<_, LoanReturn>(
            r#"
            INSERT INTO returns (loan_id, return_date, condition_note)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(data.loan_id)
        .bind(data.return_date)
        .bind(&data.condition_note)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation_or(e, || return_exists(data.loan_id)))?;

        adjust_availability_in(&mut tx, book_id, 1).await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn update(&self, id: i32, data: &ReturnPatch) -> AppResult<LoanReturn> {
        let mut tx = self.pool.begin().await?;

        if let Some(loan_id) = data.loan_id {
            // Share lock keeps the target loan in place until commit.
            let status: Option<LoanStatus> =
                sqlx::query_scalar("SELECT status FROM loans WHERE id = $1 FOR SHARE")
                    .bind(loan_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            match status {
                None => return Err(loan_not_found(loan_id)),
                Some(LoanStatus::Open) => return Err(loan_still_open(loan_id)),
                Some(LoanStatus::Returned) => {}
            }
        }

        let updated = sqlx::query_as::<_, LoanReturn>(
            r#"
            UPDATE returns
            SET loan_id = COALESCE($2, loan_id),
                return_date = COALESCE($3, return_date),
                condition_note = COALESCE($4, condition_note)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.loan_id)
        .bind(data.return_date)
        .bind(&data.condition_note)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| unique_violation_or(e, || return_exists(data.loan_id.unwrap_or_default())))?
        .ok_or_else(|| return_not_found(id))?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM returns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(return_not_found(id));
        }
        Ok(())
    }
}
