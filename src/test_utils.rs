//! Test doubles for the counter store and the persistence layer.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::db::{AuthorRepository, BookRepository, ReviewRepository, ShelfRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::middleware::rate_limiting::{CounterStore, CounterStoreError};
use crate::models::{
    Author, AuthorInput, Book, BookInput, NewUser, Review, ReviewInput, ShelfEntry, User,
    UserChanges, UserCredentials,
};

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: i64,
    expires_at: Option<Instant>,
}

/// Counter store with Redis `INCR`/`EXPIRE` semantics and a clock that tests
/// can move forward.
pub struct MemoryCounterStore {
    entries: DashMap<String, CounterEntry>,
    clock_offset: Mutex<Duration>,
    expire_calls: AtomicUsize,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            clock_offset: Mutex::new(Duration::ZERO),
            expire_calls: AtomicUsize::new(0),
        }
    }

    fn now(&self) -> Instant {
        Instant::now() + *self.clock_offset.lock().unwrap()
    }

    pub fn advance(&self, by: Duration) {
        *self.clock_offset.lock().unwrap() += by;
    }

    /// Remaining time-to-live, `None` when the key is absent, expired or has no TTL.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.now();
        let entry = self.entries.get(key)?;
        let expires_at = entry.expires_at?;
        (expires_at > now).then(|| expires_at - now)
    }

    pub fn count(&self, key: &str) -> Option<i64> {
        let now = self.now();
        self.entries
            .get(key)
            .filter(|entry| entry.expires_at.is_none_or(|at| at > now))
            .map(|entry| entry.count)
    }

    /// Writes a counter with no TTL, as an interrupted `INCR`/`EXPIRE` pair leaves it.
    pub fn insert_without_ttl(&self, key: &str, count: i64) {
        self.entries.insert(
            key.to_string(),
            CounterEntry {
                count,
                expires_at: None,
            },
        );
    }

    /// Number of times a TTL was armed.
    pub fn expire_calls(&self) -> usize {
        self.expire_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64, CounterStoreError> {
        let now = self.now();
        let mut entry = self.entries.entry(key.to_string()).or_insert(CounterEntry {
            count: 0,
            expires_at: None,
        });
        if entry.expires_at.is_some_and(|at| at <= now) {
            entry.count = 0;
            entry.expires_at = None;
        }
        entry.count += 1;
        if entry.expires_at.is_none() {
            self.expire_calls.fetch_add(1, Ordering::SeqCst);
            entry.expires_at = Some(now + window);
        }
        Ok(entry.count)
    }
}

/// Store whose every call fails.
pub struct FailingCounterStore;

#[async_trait]
impl CounterStore for FailingCounterStore {
    async fn incr_in_window(&self, _key: &str, _window: Duration) -> Result<i64, CounterStoreError> {
        Err(CounterStoreError::Backend("connection refused".to_string()))
    }
}

/// Store whose calls never complete.
pub struct HangingCounterStore;

#[async_trait]
impl CounterStore for HangingCounterStore {
    async fn incr_in_window(&self, _key: &str, _window: Duration) -> Result<i64, CounterStoreError> {
        std::future::pending().await
    }
}

#[derive(Default)]
struct CatalogState {
    next_id: i64,
    users: Vec<(User, String)>,
    authors: Vec<Author>,
    books: Vec<Book>,
    reviews: Vec<Review>,
    shelves: HashMap<(i64, i64), (String, chrono::DateTime<Utc>)>,
}

impl CatalogState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn author(&self, id: i64) -> Option<Author> {
        self.authors.iter().find(|a| a.id == id).cloned()
    }

    fn with_author(&self, book: &Book) -> Book {
        let mut book = book.clone();
        book.author = book.author_id.and_then(|id| self.author(id));
        book
    }

    fn check_author(&self, author_id: Option<i64>) -> AppResult<()> {
        match author_id {
            Some(id) if self.author(id).is_none() => Err(AppError::BadRequest(
                "Failed to save book: referenced record does not exist".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Repository backed by plain collections, mirroring the Postgres constraints
/// the services rely on.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<CatalogState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|(u, _)| u.email == new_user.email) {
            return Err(AppError::BadRequest(
                "Failed to create user: record already exists".to_string(),
            ));
        }
        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            email: new_user.email,
            name: new_user.name,
            created_at: now,
            updated_at: now,
        };
        state.users.push((user.clone(), new_user.password_hash));
        Ok(user)
    }

    async fn get_user_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                id: u.id,
                email: u.email.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn get_user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|(u, _)| u.id == id).map(|(u, _)| u.clone()))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut state = self.state.lock().unwrap();
        let Some((user, _)) = state.users.iter_mut().find(|(u, _)| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl BookRepository for InMemoryRepository {
    async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        let mut state = self.state.lock().unwrap();
        state.check_author(input.author_id)?;
        let book = Book {
            id: state.next_id(),
            title: input.title,
            description: input.description,
            content: input.content,
            author_id: input.author_id,
            author: None,
        };
        state.books.push(book.clone());
        Ok(book)
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let state = self.state.lock().unwrap();
        Ok(state.books.iter().map(|b| state.with_author(b)).collect())
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        let state = self.state.lock().unwrap();
        Ok(state.books.iter().find(|b| b.id == id).map(|b| state.with_author(b)))
    }

    async fn update_book(&self, id: i64, input: BookInput) -> AppResult<Option<Book>> {
        let mut state = self.state.lock().unwrap();
        state.check_author(input.author_id)?;
        let Some(book) = state.books.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        book.title = input.title;
        book.description = input.description;
        book.content = input.content;
        book.author_id = input.author_id;
        Ok(Some(book.clone()))
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.books.len();
        state.books.retain(|b| b.id != id);
        state.reviews.retain(|r| r.book_id != id);
        state.shelves.retain(|(_, book_id), _| *book_id != id);
        Ok(state.books.len() < before)
    }

    async fn list_books_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .books
            .iter()
            .filter(|b| b.author_id == Some(author_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuthorRepository for InMemoryRepository {
    async fn create_author(&self, input: AuthorInput) -> AppResult<Author> {
        let mut state = self.state.lock().unwrap();
        let author = Author {
            id: state.next_id(),
            name: input.name,
            bio: input.bio,
            books: Vec::new(),
        };
        state.authors.push(author.clone());
        Ok(author)
    }

    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        Ok(self.state.lock().unwrap().authors.clone())
    }

    async fn get_author(&self, id: i64) -> AppResult<Option<Author>> {
        Ok(self.state.lock().unwrap().author(id))
    }

    async fn update_author(&self, id: i64, input: AuthorInput) -> AppResult<Option<Author>> {
        let mut state = self.state.lock().unwrap();
        let Some(author) = state.authors.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        author.name = input.name;
        author.bio = input.bio;
        Ok(Some(author.clone()))
    }

    async fn delete_author(&self, id: i64) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.authors.len();
        state.authors.retain(|a| a.id != id);
        for book in state.books.iter_mut().filter(|b| b.author_id == Some(id)) {
            book.author_id = None;
        }
        Ok(state.authors.len() < before)
    }
}

#[async_trait]
impl ReviewRepository for InMemoryRepository {
    async fn create_review(&self, book_id: i64, user_id: i64, input: ReviewInput) -> AppResult<Review> {
        let mut state = self.state.lock().unwrap();
        if !state.books.iter().any(|b| b.id == book_id) {
            return Err(AppError::BadRequest(
                "Failed to create review: referenced record does not exist".to_string(),
            ));
        }
        let review = Review {
            id: state.next_id(),
            book_id,
            user_id,
            rating: input.rating,
            comment: input.comment,
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    async fn list_reviews_for_book(&self, book_id: i64) -> AppResult<Vec<Review>> {
        let state = self.state.lock().unwrap();
        Ok(state.reviews.iter().filter(|r| r.book_id == book_id).cloned().collect())
    }

    async fn delete_review(&self, id: i64, user_id: i64) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.reviews.len();
        state.reviews.retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(state.reviews.len() < before)
    }
}

#[async_trait]
impl ShelfRepository for InMemoryRepository {
    async fn upsert_shelf_entry(&self, user_id: i64, book_id: i64, status: &str) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.books.iter().any(|b| b.id == book_id) {
            return Err(AppError::BadRequest(
                "Failed to update shelf: referenced record does not exist".to_string(),
            ));
        }
        state
            .shelves
            .insert((user_id, book_id), (status.to_string(), Utc::now()));
        Ok(())
    }

    async fn list_shelf(&self, user_id: i64) -> AppResult<Vec<ShelfEntry>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<ShelfEntry> = state
            .shelves
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .filter_map(|((owner, book_id), (status, updated_at))| {
                let book = state.books.iter().find(|b| b.id == *book_id)?;
                Some(ShelfEntry {
                    user_id: *owner,
                    book_id: *book_id,
                    status: status.clone(),
                    updated_at: *updated_at,
                    book: state.with_author(book),
                })
            })
            .collect();
        entries.sort_by_key(|entry| entry.book_id);
        Ok(entries)
    }

    async fn remove_shelf_entry(&self, user_id: i64, book_id: i64) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(state.shelves.remove(&(user_id, book_id)).is_some())
    }
}
