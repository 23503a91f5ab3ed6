use std::future::Future;

use super::model::book::{Book, BookDraft};
use super::model::id::BookId;

/// 永続化の抽象。Infra層が実装する。
pub trait BookRepository: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// IDを採番して保存し、保存後のBookを返す。
    fn create(&self, draft: &BookDraft) -> impl Future<Output = Result<Book, Self::Error>> + Send;

    fn find(&self, id: BookId) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send;

    /// ID昇順で `offset` から最大 `limit` 件。
    fn list_range(
        &self,
        offset: u64,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    /// 全フィールドを上書きする。対象がなければ `false`。
    fn update(&self, book: &Book) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// 対象がなければ `false`。
    fn delete(&self, id: BookId) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// タイトルまたは著者の部分一致（大文字小文字を区別しない）、ID昇順。
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    /// 疎通確認。
    fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
