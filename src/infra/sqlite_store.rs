use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::domain::model::book::{Book, BookDraft};
use crate::domain::model::id::BookId;
use crate::domain::model::price::Price;
use crate::domain::repository::BookRepository;

#[derive(Debug, thiserror::Error)]
pub enum SqliteStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    author: String,
    publication_date: Option<NaiveDate>,
    price_cents: i64,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book::new(
            BookId::new(row.id),
            row.title,
            row.author,
            row.publication_date,
            Price::from_cents(row.price_cents),
        )
    }
}

const SELECT_BOOK: &str = "SELECT id, title, author, publication_date, price_cents FROM books";

/// SQLiteによるBookRepository実装。スキーマは `migrations/` で管理する。
#[derive(Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 接続プールを作成しマイグレーションを適用する。ファイルがなければ作る。
    ///
    /// In-memory databases live and die with their connection, so they get a
    /// single connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SqliteStoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(3));
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn migrate(&self) -> Result<(), SqliteStoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl BookRepository for SqliteBookRepository {
    type Error = SqliteStoreError;

    async fn create(&self, draft: &BookDraft) -> Result<Book, Self::Error> {
        let result = sqlx::query(
            "INSERT INTO books (title, author, publication_date, price_cents) VALUES (?, ?, ?, ?)",
        )
        .bind(draft.title.as_str())
        .bind(draft.author.as_str())
        .bind(draft.publication_date)
        .bind(draft.price.cents())
        .execute(&self.pool)
        .await?;

        Ok(Book::from_draft(
            BookId::new(result.last_insert_rowid()),
            draft.clone(),
        ))
    }

    async fn find(&self, id: BookId) -> Result<Option<Book>, Self::Error> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{SELECT_BOOK} WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Book::from))
    }

    async fn list_range(&self, offset: u64, limit: u64) -> Result<Vec<Book>, Self::Error> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{SELECT_BOOK} ORDER BY id ASC LIMIT ? OFFSET ?"
        ))
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn update(&self, book: &Book) -> Result<bool, Self::Error> {
        let result = sqlx::query(
            "UPDATE books SET title = ?, author = ?, publication_date = ?, price_cents = ? WHERE id = ?",
        )
        .bind(book.title())
        .bind(book.author())
        .bind(book.publication_date())
        .bind(book.price().cents())
        .bind(book.id().get())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: BookId) -> Result<bool, Self::Error> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, Self::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }

    async fn search(&self, query: &str) -> Result<Vec<Book>, Self::Error> {
        // SQLiteのlower()はASCIIしか畳み込まないので、照合はRust側で行う
        let rows = sqlx::query_as::<_, BookRow>(&format!("{SELECT_BOOK} ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(Book::from)
            .filter(|book| book.matches_query(query))
            .collect())
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
