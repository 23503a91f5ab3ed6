use serde::Serialize;

use super::error::DomainError;
use super::model::book::BookDraft;
use super::model::price::Price;

pub const TITLE_MAX_LEN: usize = 100;
pub const AUTHOR_MAX_LEN: usize = 50;

/// フィールド単位の検証エラー。`field` はワイヤ上の名前（camelCase）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl Violation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn summary(violations: &[Violation]) -> String {
        violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// 永続化の前に全ルールを検証し、違反をすべて返す。
pub fn validate_draft(draft: &BookDraft) -> Result<(), DomainError> {
    let mut violations = Vec::new();
    check_text(&mut violations, "title", "Title", &draft.title, TITLE_MAX_LEN);
    check_text(&mut violations, "author", "Author", &draft.author, AUTHOR_MAX_LEN);
    if !draft.price.in_range() {
        violations.push(Violation::new(
            "price",
            format!("The field Price must be between {} and {}.", Price::MIN, Price::MAX),
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Validation(violations))
    }
}

fn check_text(
    violations: &mut Vec<Violation>,
    field: &'static str,
    label: &str,
    value: &str,
    max_len: usize,
) {
    if value.trim().is_empty() {
        violations.push(Violation::new(field, format!("The {label} field is required.")));
    } else if value.chars().count() > max_len {
        violations.push(Violation::new(
            field,
            format!("The field {label} must be a string with a maximum length of {max_len}."),
        ));
    }
}
