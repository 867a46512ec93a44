use async_trait::async_trait;
use log::debug;

use super::PgRepository;
use crate::error::{AppError, AppResult};
use crate::models::{Author, Book, BookInput};

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn create_book(&self, input: BookInput) -> AppResult<Book>;
    /// All books, each with its author attached.
    async fn list_books(&self) -> AppResult<Vec<Book>>;
    async fn get_book(&self, id: i64) -> AppResult<Option<Book>>;
    async fn update_book(&self, id: i64, input: BookInput) -> AppResult<Option<Book>>;
    async fn delete_book(&self, id: i64) -> AppResult<bool>;
    async fn list_books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>>;
}

/// Book joined with its (optional) author.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub author_bio: Option<String>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        let author = match (row.author_id, row.author_name) {
            (Some(id), Some(name)) => Some(Author {
                id,
                name,
                bio: row.author_bio.unwrap_or_default(),
                books: Vec::new(),
            }),
            _ => None,
        };

        Book {
            id: row.id,
            title: row.title,
            description: row.description,
            content: row.content,
            author_id: row.author_id,
            author,
        }
    }
}

pub(crate) const BOOK_WITH_AUTHOR_SELECT: &str = r#"
    SELECT b.id, b.title, b.description, b.content, b.author_id,
           a.name AS author_name, a.bio AS author_bio
    FROM books b
    LEFT JOIN authors a ON a.id = b.author_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct PlainBookRow {
    id: i64,
    title: String,
    description: String,
    content: String,
    author_id: Option<i64>,
}

impl From<PlainBookRow> for Book {
    fn from(row: PlainBookRow) -> Self {
        Book {
            id: row.id,
            title: row.title,
            description: row.description,
            content: row.content,
            author_id: row.author_id,
            author: None,
        }
    }
}

#[async_trait]
impl BookRepository for PgRepository {
    async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        debug!("Creating book '{}'", input.title);

        let row = sqlx::query_as::<_, PlainBookRow>(
            r#"
            INSERT INTO books (title, description, content, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, content, author_id
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.content)
        .bind(input.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to create book", e))?;

        Ok(row.into())
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!("{} ORDER BY b.id", BOOK_WITH_AUTHOR_SELECT))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx("Failed to list books", e))?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{} WHERE b.id = $1", BOOK_WITH_AUTHOR_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx("Failed to fetch book", e))?;

        Ok(row.map(Book::from))
    }

    async fn update_book(&self, id: i64, input: BookInput) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, PlainBookRow>(
            r#"
            UPDATE books
            SET title = $1, description = $2, content = $3, author_id = $4
            WHERE id = $5
            RETURNING id, title, description, content, author_id
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.content)
        .bind(input.author_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to update book", e))?;

        Ok(row.map(Book::from))
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx("Failed to delete book", e))?;

        debug!("Deleted {} book row(s) for id {}", result.rows_affected(), id);
        Ok(result.rows_affected() > 0)
    }

    async fn list_books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, PlainBookRow>(
            "SELECT id, title, description, content, author_id FROM books WHERE author_id = $1 ORDER BY id",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to list books by author", e))?;

        Ok(rows.into_iter().map(Book::from).collect())
    }
}
