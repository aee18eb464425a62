//! Return (loan closing event) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Closing event of a loan. At most one exists per loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanReturn {
    pub id: i32,
    pub loan_id: i32,
    pub return_date: NaiveDate,
    pub condition_note: String,
}

/// Create return request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReturn {
    #[serde(alias = "id_peminjaman")]
    #[validate(range(min = 1, message = "Loan id must be a positive integer"))]
    pub loan_id: i32,
    /// ISO calendar date (YYYY-MM-DD)
    #[serde(alias = "tanggal_pengembalian")]
    pub return_date: NaiveDate,
    /// Free-text condition of the copy on return
    #[serde(alias = "kondisi_buku")]
    pub condition_note: String,
}

/// Partial return update. Only the return record changes: loan status and
/// book availability are left as they are.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ReturnPatch {
    #[serde(alias = "id_peminjaman")]
    #[validate(range(min = 1, message = "Loan id must be a positive integer"))]
    pub loan_id: Option<i32>,
    #[serde(alias = "tanggal_pengembalian")]
    pub return_date: Option<NaiveDate>,
    #[serde(alias = "kondisi_buku")]
    pub condition_note: Option<String>,
}

impl ReturnPatch {
    pub fn is_empty(&self) -> bool {
        self.loan_id.is_none() && self.return_date.is_none() && self.condition_note.is_none()
    }
}
