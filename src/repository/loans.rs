//! Loans repository (loan ledger)

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::books::adjust_availability_in;
use super::members::member_not_found;
use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, Loan, LoanPatch, LoanQuery},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoansRepository: Send + Sync {
    /// List loans matching the status/member/book filters of `query`
    async fn list(&self, query: &LoanQuery) -> AppResult<Vec<Loan>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Loan>;

    /// Open a loan: take one available copy of the book and insert the loan
    /// with status `open`, all or nothing.
    async fn create(&self, data: &CreateLoan) -> AppResult<Loan>;

    /// Overwrite the supplied columns only. Availability is not touched.
    async fn update(&self, id: i32, data: &LoanPatch) -> AppResult<Loan>;

    /// Hard delete. Availability is not restored.
    async fn delete(&self, id: i32) -> AppResult<()>;
}

pub(crate) fn loan_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Loan with id {} not found", id))
}

#[derive(Clone)]
pub struct PgLoansRepository {
    pool: Pool<Postgres>,
}

impl PgLoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoansRepository for PgLoansRepository {
    async fn list(&self, query: &LoanQuery) -> AppResult<Vec<Loan>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM loans WHERE 1=1");

        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(member_id) = query.member_id {
            builder.push(" AND member_id = ").push_bind(member_id);
        }
        if let Some(book_id) = query.book_id {
            builder.push(" AND book_id = ").push_bind(book_id);
        }
        builder.push(" ORDER BY id");

        let loans = builder
            .build_query_as::<Loan>()
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| loan_not_found(id))
    }

    async fn create(&self, data: &CreateLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Held until commit so a concurrent member delete waits for this loan.
        let member: Option<i32> =
            sqlx::query_scalar("SELECT id FROM members WHERE id = $1 FOR SHARE")
                .bind(data.member_id)
                .fetch_optional(&mut *tx)
                .await?;
        if member.is_none() {
            return Err(member_not_found(data.member_id));
        }

        // Dropping `tx` on any error below rolls the decrement back.
        adjust_availability_in(&mut tx, data.book_id, -1).await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, member_id, loan_date, due_date, status)
            VALUES ($1, $2, $3, $4, 'open')
            RETURNING *
            "#,
        )
        .bind(data.book_id)
        .bind(data.member_id)
        .bind(data.loan_date)
        .bind(data.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    async fn update(&self, id: i32, data: &LoanPatch) -> AppResult<Loan> {
        let mut sets: Vec<String> = Vec::new();

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, sets.len() + 2));
                }
            };
        }

        add_field!(data.book_id, "book_id");
        add_field!(data.member_id, "member_id");
        add_field!(data.loan_date, "loan_date");
        add_field!(data.due_date, "due_date");

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!(
            "UPDATE loans SET {} WHERE id = $1 RETURNING *",
            sets.join(", ")
        );
        let mut builder = sqlx::query_as::<_, Loan>(&query).bind(id);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.book_id);
        bind_field!(data.member_id);
        bind_field!(data.loan_date);
        bind_field!(data.due_date);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| loan_not_found(id))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(loan_not_found(id));
        }
        Ok(())
    }
}
