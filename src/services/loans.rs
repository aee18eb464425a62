//! Lending service: loan and return workflow

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult, FieldError},
    models::{
        loan::{CreateLoan, LoanDetails, LoanPatch, LoanQuery},
        loan_return::{CreateReturn, LoanReturn, ReturnPatch},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn check_loan_period(loan_date: NaiveDate, due_date: NaiveDate) -> AppResult<()> {
    if loan_date > due_date {
        return Err(AppError::Validation {
            message: "Invalid input".to_string(),
            errors: vec![FieldError {
                field: "due_date".to_string(),
                message: "Due date must not be before the loan date".to_string(),
            }],
        });
    }
    Ok(())
}

fn log_rejection<T>(result: &AppResult<T>, action: &str) {
    if let Err(e @ (AppError::NotFound(_) | AppError::Conflict(_) | AppError::Validation { .. })) = result {
        tracing::warn!("{} rejected: {}", action, e);
    }
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Open a loan for one copy of a book
    pub async fn create_loan(&self, loan: CreateLoan) -> AppResult<LoanDetails> {
        check_loan_period(loan.loan_date, loan.due_date)?;

        let result = self.repository.loans.create(&loan).await;
        log_rejection(&result, "Loan");
        let created = result?;

        tracing::info!(
            "Loan {} opened: book={} member={} due={}",
            created.id,
            created.book_id,
            created.member_id,
            created.due_date
        );
        Ok(LoanDetails::new(created, today()))
    }

    pub async fn get_loan(&self, id: i32) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(id).await?;
        Ok(LoanDetails::new(loan, today()))
    }

    pub async fn list_loans(&self, query: &LoanQuery) -> AppResult<Vec<LoanDetails>> {
        self.list_loans_at(query, today()).await
    }

    /// List loans, evaluating the overdue flag against `today`
    pub async fn list_loans_at(&self, query: &LoanQuery, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans.list(query).await?;
        Ok(loans
            .into_iter()
            .map(|loan| LoanDetails::new(loan, today))
            .filter(|loan| query.overdue.map_or(true, |wanted| loan.is_overdue == wanted))
            .collect())
    }

    /// Correct loan metadata. Book availability is left as it is.
    pub async fn update_loan(&self, id: i32, patch: LoanPatch) -> AppResult<LoanDetails> {
        if patch.is_empty() {
            return Err(AppError::validation("At least one field must be provided"));
        }

        let current = self.repository.loans.get_by_id(id).await?;
        let merged = patch.apply(&current);
        check_loan_period(merged.loan_date, merged.due_date)?;

        if let Some(book_id) = patch.book_id {
            self.repository.books.get_by_id(book_id).await?;
            if book_id != current.book_id && current.is_open() {
                tracing::warn!(
                    "Loan {} moved from book {} to book {} while open; availability not adjusted",
                    id,
                    current.book_id,
                    book_id
                );
            }
        }
        if let Some(member_id) = patch.member_id {
            self.repository.members.get_by_id(member_id).await?;
        }

        let updated = self.repository.loans.update(id, &patch).await?;
        tracing::info!("Loan {} updated", id);
        Ok(LoanDetails::new(updated, today()))
    }

    /// Remove a loan record. Availability is not restored.
    pub async fn delete_loan(&self, id: i32) -> AppResult<()> {
        self.repository.loans.delete(id).await?;
        tracing::info!("Loan {} deleted", id);
        Ok(())
    }

    /// Close an open loan and give the copy back to the catalog
    pub async fn create_return(&self, data: CreateReturn) -> AppResult<LoanReturn> {
        let result = self.repository.returns.create(&data).await;
        log_rejection(&result, "Return");
        let record = result?;

        tracing::info!(
            "Loan {} returned on {} (return {})",
            record.loan_id,
            record.return_date,
            record.id
        );
        Ok(record)
    }

    pub async fn get_return(&self, id: i32) -> AppResult<LoanReturn> {
        self.repository.returns.get_by_id(id).await
    }

    pub async fn list_returns(&self) -> AppResult<Vec<LoanReturn>> {
        self.repository.returns.list().await
    }

    /// Edit a return record only; the loan stays returned
    pub async fn update_return(&self, id: i32, patch: ReturnPatch) -> AppResult<LoanReturn> {
        if patch.is_empty() {
            return Err(AppError::validation("At least one field must be provided"));
        }
        let updated = self.repository.returns.update(id, &patch).await?;
        tracing::info!("Return {} updated", id);
        Ok(updated)
    }

    pub async fn delete_return(&self, id: i32) -> AppResult<()> {
        self.repository.returns.delete(id).await?;
        tracing::info!("Return {} deleted", id);
        Ok(())
    }
}
