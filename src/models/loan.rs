//! Loan (checkout) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Loan lifecycle state. `Open` is the only state a loan is created in and
/// `Returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Open,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Open => "open",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(LoanStatus::Open),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus (stored as TEXT)
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Open
    }

    /// Overdue is derived, never stored
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && today > self.due_date
    }
}

/// Loan as returned by the API, with derived overdue flag
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn new(loan: Loan, today: NaiveDate) -> Self {
        let is_overdue = loan.is_overdue(today);
        Self {
            id: loan.id,
            book_id: loan.book_id,
            member_id: loan.member_id,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            status: loan.status,
            is_overdue,
        }
    }
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    #[serde(alias = "id_buku")]
    #[validate(range(min = 1, message = "Book id must be a positive integer"))]
    pub book_id: i32,
    #[serde(alias = "id_anggota")]
    #[validate(range(min = 1, message = "Member id must be a positive integer"))]
    pub member_id: i32,
    /// ISO calendar date (YYYY-MM-DD)
    #[serde(alias = "tanggal_peminjaman")]
    pub loan_date: NaiveDate,
    /// ISO calendar date (YYYY-MM-DD), not before `loan_date`
    #[serde(alias = "tanggal_jatuh_tempo")]
    pub due_date: NaiveDate,
}

/// Partial loan update. Metadata correction only: no availability bookkeeping
/// is performed, even when `book_id` changes.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct LoanPatch {
    #[serde(alias = "id_buku")]
    #[validate(range(min = 1, message = "Book id must be a positive integer"))]
    pub book_id: Option<i32>,
    #[serde(alias = "id_anggota")]
    #[validate(range(min = 1, message = "Member id must be a positive integer"))]
    pub member_id: Option<i32>,
    #[serde(alias = "tanggal_peminjaman")]
    pub loan_date: Option<NaiveDate>,
    #[serde(alias = "tanggal_jatuh_tempo")]
    pub due_date: Option<NaiveDate>,
}

impl LoanPatch {
    pub fn is_empty(&self) -> bool {
        self.book_id.is_none()
            && self.member_id.is_none()
            && self.loan_date.is_none()
            && self.due_date.is_none()
    }

    /// Apply the patch on top of an existing loan
    pub fn apply(&self, loan: &Loan) -> Loan {
        Loan {
            id: loan.id,
            book_id: self.book_id.unwrap_or(loan.book_id),
            member_id: self.member_id.unwrap_or(loan.member_id),
            loan_date: self.loan_date.unwrap_or(loan.loan_date),
            due_date: self.due_date.unwrap_or(loan.due_date),
            status: loan.status,
        }
    }
}

/// Loan list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    pub status: Option<LoanStatus>,
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Only loans that are open and past their due date
    pub overdue: Option<bool>,
}

impl LoanQuery {
    pub fn matches(&self, loan: &Loan) -> bool {
        self.status.map_or(true, |s| loan.status == s)
            && self.member_id.map_or(true, |id| loan.member_id == id)
            && self.book_id.map_or(true, |id| loan.book_id == id)
    }
}
