//! Data models for Pustaka

pub mod auth;
pub mod book;
pub mod loan;
pub mod loan_return;
pub mod member;

// Re-export commonly used types
pub use auth::{CallerIdentity, Claims};
pub use book::Book;
pub use loan::{Loan, LoanDetails, LoanStatus};
pub use loan_return::LoanReturn;
pub use member::Member;
