//! Catalog management service

use serde::Serialize;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook},
        Filter,
    },
    repository::Repository,
    services::circulation::{CirculationLock, CirculationService},
};

#[derive(Serialize)]
struct CopiesPatch {
    copies: u32,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    circulation: CirculationService,
    lock: CirculationLock,
}

impl CatalogService {
    pub fn new(
        repository: Repository,
        circulation: CirculationService,
        lock: CirculationLock,
    ) -> Self {
        Self {
            repository,
            circulation,
            lock,
        }
    }

    /// All books, newest first
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.list_as(&Filter::new()).await
    }

    pub async fn get_book(&self, id: &str) -> AppResult<Book> {
        self.repository
            .get_as(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Add a title to the catalog with its initial copy count
    pub async fn add_book(&self, book: CreateBook, actor: Option<&str>) -> AppResult<Book> {
        book.validate()?;
        let created: Book = self.repository.create_as(&book, actor).await?;
        tracing::info!(book_id = %created.id, copies = created.copies, "Book added");
        Ok(created)
    }

    pub async fn increase_copies(&self, id: &str, actor: Option<&str>) -> AppResult<Book> {
        let _guard = self.lock.lock().await;
        let book = self.get_book(id).await?;
        self.set_copies(&book, book.copies.saturating_add(1), actor).await
    }

    /// Remove one copy; the last copy and copies out on loan cannot be removed
    pub async fn decrease_copies(&self, id: &str, actor: Option<&str>) -> AppResult<Book> {
        let _guard = self.lock.lock().await;
        let book = self.get_book(id).await?;

        if book.copies <= 1 {
            return Err(AppError::BusinessRule("Cannot remove last copy".to_string()));
        }
        if self.circulation.available(&book).await? < 1 {
            return Err(AppError::BusinessRule(
                "Cannot remove a copy that is out on loan".to_string(),
            ));
        }

        self.set_copies(&book, book.copies - 1, actor).await
    }

    /// Delete a book; deleting an unknown id is not an error
    pub async fn delete_book(&self, id: &str, actor: Option<&str>) -> AppResult<()> {
        let removed = self.repository.remove("books", id, actor).await?;
        if removed.is_some() {
            tracing::info!(book_id = id, "Book deleted");
        }
        Ok(())
    }

    async fn set_copies(&self, book: &Book, copies: u32, actor: Option<&str>) -> AppResult<Book> {
        self.repository
            .update_as(book.id.as_str(), &CopiesPatch { copies }, actor)
            .await
    }
}
