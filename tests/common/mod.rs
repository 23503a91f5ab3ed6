//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

use books_api::application::service::BookService;
use books_api::config::RunMode;
use books_api::domain::model::book::{Book, BookDraft};
use books_api::domain::model::id::BookId;
use books_api::domain::model::price::Price;
use books_api::domain::repository::BookRepository;
use books_api::infra::sqlite_store::SqliteBookRepository;
use books_api::interface::http::router;

// =============================================================================
// InMemoryRepo — テスト用リポジトリ
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("in-memory store error")]
pub struct InMemoryError;

#[derive(Default)]
struct Store {
    last_id: i64,
    books: BTreeMap<BookId, Book>,
}

/// DB不要のインメモリリポジトリ。IDは再利用しない。
#[derive(Default)]
pub struct InMemoryRepo {
    store: Mutex<Store>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookRepository for InMemoryRepo {
    type Error = InMemoryError;

    async fn create(&self, draft: &BookDraft) -> Result<Book, Self::Error> {
        let mut store = self.store.lock().map_err(|_| InMemoryError)?;
        store.last_id += 1;
        let book = Book::from_draft(BookId::new(store.last_id), draft.clone());
        store.books.insert(book.id(), book.clone());
        Ok(book)
    }

    async fn find(&self, id: BookId) -> Result<Option<Book>, Self::Error> {
        let store = self.store.lock().map_err(|_| InMemoryError)?;
        Ok(store.books.get(&id).cloned())
    }

    async fn list_range(&self, offset: u64, limit: u64) -> Result<Vec<Book>, Self::Error> {
        let store = self.store.lock().map_err(|_| InMemoryError)?;
        Ok(store
            .books
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update(&self, book: &Book) -> Result<bool, Self::Error> {
        let mut store = self.store.lock().map_err(|_| InMemoryError)?;
        match store.books.get_mut(&book.id()) {
            Some(slot) => {
                *slot = book.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: BookId) -> Result<bool, Self::Error> {
        let mut store = self.store.lock().map_err(|_| InMemoryError)?;
        Ok(store.books.remove(&id).is_some())
    }

    async fn count(&self) -> Result<u64, Self::Error> {
        let store = self.store.lock().map_err(|_| InMemoryError)?;
        Ok(store.books.len() as u64)
    }

    async fn search(&self, query: &str) -> Result<Vec<Book>, Self::Error> {
        let store = self.store.lock().map_err(|_| InMemoryError)?;
        Ok(store
            .books
            .values()
            .filter(|b| b.matches_query(query))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// =============================================================================
// FailingRepo — 全操作が失敗するリポジトリ
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub enum Breakage {
    /// 500 になる想定
    TimedOut,
    /// 400 (invalid operation state)
    Closed,
    Panic,
}

pub struct FailingRepo {
    breakage: Breakage,
}

impl FailingRepo {
    pub fn new(breakage: Breakage) -> Self {
        Self { breakage }
    }

    fn fail<T>(&self) -> Result<T, sqlx::Error> {
        match self.breakage {
            Breakage::TimedOut => Err(sqlx::Error::PoolTimedOut),
            Breakage::Closed => Err(sqlx::Error::PoolClosed),
            Breakage::Panic => panic!("storage exploded"),
        }
    }
}

impl BookRepository for FailingRepo {
    type Error = sqlx::Error;

    async fn create(&self, _draft: &BookDraft) -> Result<Book, Self::Error> {
        self.fail()
    }

    async fn find(&self, _id: BookId) -> Result<Option<Book>, Self::Error> {
        self.fail()
    }

    async fn list_range(&self, _offset: u64, _limit: u64) -> Result<Vec<Book>, Self::Error> {
        self.fail()
    }

    async fn update(&self, _book: &Book) -> Result<bool, Self::Error> {
        self.fail()
    }

    async fn delete(&self, _id: BookId) -> Result<bool, Self::Error> {
        self.fail()
    }

    async fn count(&self) -> Result<u64, Self::Error> {
        self.fail()
    }

    async fn search(&self, _query: &str) -> Result<Vec<Book>, Self::Error> {
        self.fail()
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        self.fail()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// "Test Book N" / "Test Author N" を3冊（ID 1,2,3）。
pub fn standard_drafts() -> Vec<BookDraft> {
    (1..=3)
        .map(|n| {
            BookDraft::new(
                format!("Test Book {n}"),
                format!("Test Author {n}"),
                NaiveDate::from_ymd_opt(2020, n, 1),
                Price::from_cents(1000 + n as i64),
            )
        })
        .collect()
}

pub fn orwell() -> BookDraft {
    BookDraft::new(
        "1984",
        "George Orwell",
        NaiveDate::from_ymd_opt(1949, 6, 8),
        Price::from_cents(1199),
    )
}

pub async fn seed<R: BookRepository>(repo: &R) -> Vec<Book> {
    let mut books = Vec::new();
    for draft in standard_drafts() {
        books.push(repo.create(&draft).await.unwrap());
    }
    books
}

/// 標準3冊を入れたインメモリのService。
pub async fn seeded_service() -> BookService<InMemoryRepo> {
    let repo = InMemoryRepo::new();
    seed(&repo).await;
    BookService::new(repo)
}

pub async fn sqlite_repo() -> SqliteBookRepository {
    SqliteBookRepository::connect("sqlite::memory:", 1)
        .await
        .unwrap()
}

/// 標準3冊を入れたSQLite（インメモリ）のRouter。
pub async fn seeded_app(run_mode: RunMode) -> Router {
    let repo = sqlite_repo().await;
    seed(&repo).await;
    router(BookService::new(repo), run_mode)
}

pub fn failing_app(breakage: Breakage, run_mode: RunMode) -> Router {
    router(BookService::new(FailingRepo::new(breakage)), run_mode)
}

// =============================================================================
// HTTP helpers
// =============================================================================

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    send_request(app, builder.body(body).unwrap()).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let raw = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    let body = if raw.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&raw).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        headers,
        body,
        raw,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, None).await
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}

pub fn titles(books: &[Book]) -> Vec<&str> {
    books.iter().map(|b| b.title()).collect()
}
