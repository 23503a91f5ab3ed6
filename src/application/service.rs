use crate::domain::error::DomainError;
use crate::domain::model::book::{Book, BookDraft};
use crate::domain::model::id::BookId;
use crate::domain::model::page::PageRequest;
use crate::domain::repository::BookRepository;
use crate::domain::validation::validate_draft;

use super::error::AppError;

/// Book リソースに対するユースケース。状態はすべてリポジトリ側にある。
pub struct BookService<R: BookRepository> {
    repo: R,
}

impl<R: BookRepository> BookService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// ページ単位で一覧を返す。
    pub async fn list(&self, page: PageRequest) -> Result<Vec<Book>, AppError> {
        let total = self.repo.count().await.map_err(AppError::storage)?;
        let Some(window) = page.window(total)? else {
            return Ok(Vec::new());
        };
        tracing::debug!(
            total,
            offset = window.offset,
            limit = window.limit,
            "listing books"
        );
        self.repo
            .list_range(window.offset, window.limit)
            .await
            .map_err(AppError::storage)
    }

    pub async fn get(&self, id: BookId) -> Result<Book, AppError> {
        self.repo
            .find(id)
            .await
            .map_err(AppError::storage)?
            .ok_or(AppError::Domain(DomainError::NotFound(id)))
    }

    /// 検証してから保存する。ペイロードの `id` は無視される。
    pub async fn create(&self, draft: BookDraft) -> Result<Book, AppError> {
        validate_draft(&draft)?;
        let book = self.repo.create(&draft).await.map_err(AppError::storage)?;
        tracing::debug!(id = %book.id(), "book created");
        Ok(book)
    }

    /// 既存レコードを上書きする。検証 → ID一致 → 存在確認の順。
    pub async fn update(&self, id: BookId, draft: BookDraft) -> Result<(), AppError> {
        validate_draft(&draft)?;
        if draft.id != Some(id) {
            return Err(DomainError::InvalidArgument(format!(
                "book id in body does not match path id {id}"
            ))
            .into());
        }

        let mut book = self.get(id).await?;
        book.apply(draft);
        let updated = self.repo.update(&book).await.map_err(AppError::storage)?;
        if !updated {
            // 取得から更新までの間に削除された
            return Err(DomainError::NotFound(id).into());
        }
        tracing::debug!(%id, "book updated");
        Ok(())
    }

    pub async fn delete(&self, id: BookId) -> Result<(), AppError> {
        let deleted = self.repo.delete(id).await.map_err(AppError::storage)?;
        if !deleted {
            return Err(DomainError::NotFound(id).into());
        }
        tracing::debug!(%id, "book deleted");
        Ok(())
    }

    /// タイトル・著者を部分一致で検索する。空白のみのクエリは不正。
    pub async fn search(&self, query: &str) -> Result<Vec<Book>, AppError> {
        if query.trim().is_empty() {
            return Err(
                DomainError::InvalidArgument("search query must not be empty".to_string()).into(),
            );
        }
        self.repo.search(query).await.map_err(AppError::storage)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.repo.ping().await.map_err(AppError::storage)
    }
}
