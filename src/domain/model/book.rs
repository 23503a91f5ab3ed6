use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::BookId;
use super::price::Price;

/// 作成・更新リクエストのペイロード。
/// `id` は作成時は無視され、更新時はパスのIDと一致する必要がある。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    #[serde(default)]
    pub id: Option<BookId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub author: String,
    #[serde(default, with = "wire_date")]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub price: Price,
}

impl BookDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        publication_date: Option<NaiveDate>,
        price: Price,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            publication_date,
            price,
        }
    }

    pub fn with_id(mut self, id: BookId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Book — 唯一のエンティティ。IDはストレージが採番する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    #[serde(default, with = "wire_date")]
    publication_date: Option<NaiveDate>,
    price: Price,
}

impl Book {
    pub fn new(
        id: BookId,
        title: impl Into<String>,
        author: impl Into<String>,
        publication_date: Option<NaiveDate>,
        price: Price,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            publication_date,
            price,
        }
    }

    /// 採番済みIDとペイロードからBookを組み立てる。ペイロードの `id` は使わない。
    pub fn from_draft(id: BookId, draft: BookDraft) -> Self {
        Self::new(
            id,
            draft.title,
            draft.author,
            draft.publication_date,
            draft.price,
        )
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn publication_date(&self) -> Option<NaiveDate> {
        self.publication_date
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// 既存レコードのフィールドを上書きする。IDは変わらない。
    pub fn apply(&mut self, draft: BookDraft) {
        self.title = draft.title;
        self.author = draft.author;
        self.publication_date = draft.publication_date;
        self.price = draft.price;
    }

    /// タイトルまたは著者に部分一致するか（大文字小文字を区別しない）。
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.author.to_lowercase().contains(&needle)
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `publicationDate` の入出力形式。
///
/// Accepts `YYYY-MM-DD`, a naive date-time, or an RFC 3339 timestamp; the time
/// of day is dropped. Always written back as `YYYY-MM-DDT00:00:00`.
mod wire_date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&d.format("%Y-%m-%dT00:00:00").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid publicationDate: '{raw}'"))),
            None => Ok(None),
        }
    }

    pub(super) fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|dt| dt.date())
    }
}
