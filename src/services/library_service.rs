use log::debug;
use std::sync::Arc;

use crate::db::Repository;
use crate::error::{AppError, AppResult};
use crate::models::{Author, AuthorInput, Book, BookInput, Review, ReviewInput, ShelfEntry};

fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

fn author_not_found() -> AppError {
    AppError::NotFound("Author not found".to_string())
}

/// Catalog operations: books, authors, reviews and per-user shelves.
#[derive(Clone)]
pub struct LibraryService {
    repository: Arc<dyn Repository>,
}

impl LibraryService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    // Books

    pub async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        self.repository.create_book(input).await
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.list_books().await
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository.get_book(id).await?.ok_or_else(book_not_found)
    }

    pub async fn update_book(&self, id: i64, input: BookInput) -> AppResult<Book> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        self.repository
            .update_book(id, input)
            .await?
            .ok_or_else(book_not_found)
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        if !self.repository.delete_book(id).await? {
            return Err(book_not_found());
        }
        debug!("Book {} deleted", id);
        Ok(())
    }

    pub async fn get_book_content(&self, id: i64) -> AppResult<String> {
        Ok(self.get_book(id).await?.content)
    }

    pub async fn list_books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        self.repository.list_books_by_author(author_id).await
    }

    // Authors

    pub async fn create_author(&self, input: AuthorInput) -> AppResult<Author> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        self.repository.create_author(input).await
    }

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.list_authors().await
    }

    /// Author with their books attached.
    pub async fn get_author(&self, id: i64) -> AppResult<Author> {
        let mut author = self
            .repository
            .get_author(id)
            .await?
            .ok_or_else(author_not_found)?;
        author.books = self.repository.list_books_by_author(id).await?;
        Ok(author)
    }

    pub async fn update_author(&self, id: i64, input: AuthorInput) -> AppResult<Author> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        self.repository
            .update_author(id, input)
            .await?
            .ok_or_else(author_not_found)
    }

    pub async fn delete_author(&self, id: i64) -> AppResult<()> {
        if !self.repository.delete_author(id).await? {
            return Err(author_not_found());
        }
        Ok(())
    }

    // Reviews

    pub async fn add_review(&self, book_id: i64, user_id: i64, input: ReviewInput) -> AppResult<Review> {
        self.get_book(book_id).await?;
        self.repository.create_review(book_id, user_id, input).await
    }

    pub async fn list_reviews(&self, book_id: i64) -> AppResult<Vec<Review>> {
        self.repository.list_reviews_for_book(book_id).await
    }

    /// Only the review's author can delete it; anyone else sees a 404.
    pub async fn delete_review(&self, id: i64, user_id: i64) -> AppResult<()> {
        if !self.repository.delete_review(id, user_id).await? {
            return Err(AppError::NotFound("Review not found".to_string()));
        }
        Ok(())
    }

    // Shelf

    pub async fn set_shelf_status(&self, user_id: i64, book_id: i64, status: &str) -> AppResult<()> {
        self.get_book(book_id).await?;
        self.repository
            .upsert_shelf_entry(user_id, book_id, status)
            .await
    }

    pub async fn get_shelf(&self, user_id: i64) -> AppResult<Vec<ShelfEntry>> {
        self.repository.list_shelf(user_id).await
    }

    pub async fn remove_from_shelf(&self, user_id: i64, book_id: i64) -> AppResult<()> {
        if !self.repository.remove_shelf_entry(user_id, book_id).await? {
            return Err(AppError::NotFound("Shelf entry not found".to_string()));
        }
        Ok(())
    }
}
