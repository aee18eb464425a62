//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Add a title; every copy starts available
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        let created = self.repository.books.create(&book).await?;
        tracing::info!("Book {} created with {} copies", created.id, created.total_copies);
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, changes: UpdateBook) -> AppResult<Book> {
        if changes.is_empty() {
            return Err(AppError::validation("At least one field must be provided"));
        }
        let updated = self.repository.books.update(id, &changes).await?;
        tracing::info!(
            "Book {} updated ({}/{} available)",
            id,
            updated.available_copies,
            updated.total_copies
        );
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }
}
