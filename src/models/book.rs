//! Book (catalog title) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Catalog title with its copy counters.
///
/// `available_copies` never leaves `0..=total_copies`; the difference between
/// the two is the number of copies currently held by open loans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub publish_date: NaiveDate,
    pub genre: String,
    pub total_copies: i32,
    pub available_copies: i32,
}

impl Book {
    /// Copies currently checked out
    pub fn on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    /// Availability after applying `delta`, if it stays within bounds
    pub fn shifted_availability(&self, delta: i32) -> Option<i32> {
        let next = self.available_copies.checked_add(delta)?;
        (0..=self.total_copies).contains(&next).then_some(next)
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[serde(alias = "judul")]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(alias = "penulis")]
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    /// ISO calendar date (YYYY-MM-DD)
    #[serde(alias = "tanggal_terbit")]
    pub publish_date: NaiveDate,
    #[validate(length(min = 1, message = "Genre is required"))]
    pub genre: String,
    /// Number of physical copies; all of them start available
    #[serde(alias = "salinan_tersedia")]
    #[validate(range(min = 0, message = "Total copies must be at least 0"))]
    pub total_copies: i32,
}

/// Update book request. Absent fields are left untouched.
///
/// Changing `total_copies` moves `available_copies` by the same amount so the
/// number of copies on loan is preserved.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[serde(alias = "judul")]
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[serde(alias = "penulis")]
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[serde(alias = "tanggal_terbit")]
    pub publish_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "Genre cannot be empty"))]
    pub genre: Option<String>,
    #[validate(range(min = 0, message = "Total copies must be at least 0"))]
    pub total_copies: Option<i32>,
}

impl UpdateBook {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.publish_date.is_none()
            && self.genre.is_none()
            && self.total_copies.is_none()
    }
}
