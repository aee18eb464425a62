//! Repository layer for database operations

pub mod books;
pub mod loans;
pub mod members;
pub mod memory;
pub mod returns;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::error::{AppError, AppResult};

pub use books::BooksRepository;
pub use loans::LoansRepository;
pub use members::MembersRepository;
pub use returns::ReturnsRepository;

/// Main repository struct holding one store per table
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BooksRepository>,
    pub members: Arc<dyn MembersRepository>,
    pub loans: Arc<dyn LoansRepository>,
    pub returns: Arc<dyn ReturnsRepository>,
    /// Connection pool, absent for the in-memory backend
    pub pool: Option<Pool<Postgres>>,
}

impl Repository {
    /// Create a repository backed by the given PostgreSQL pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            members: Arc::new(members::PgMembersRepository::new(pool.clone())),
            loans: Arc::new(loans::PgLoansRepository::new(pool.clone())),
            returns: Arc::new(returns::PgReturnsRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();
        Self {
            books: Arc::new(store.clone()),
            members: Arc::new(store.clone()),
            loans: Arc::new(store.clone()),
            returns: Arc::new(store),
            pool: None,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(ref pool) = self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Map a unique-constraint violation to the given domain error
pub(crate) fn unique_violation_or(err: sqlx::Error, conflict: impl FnOnce() -> AppError) -> AppError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return conflict();
        }
    }
    AppError::Database(err)
}
