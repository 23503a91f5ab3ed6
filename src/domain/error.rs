use super::model::id::BookId;
use super::validation::Violation;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("book not found: {0}")]
    NotFound(BookId),

    #[error("page {page} exceeds total pages {total_pages}")]
    PageOutOfRange { page: u64, total_pages: u64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("validation failed: {}", Violation::summary(.0))]
    Validation(Vec<Violation>),
}
