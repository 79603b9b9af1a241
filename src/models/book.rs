//! Library catalog book

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::record::{Entity, Id};

pub type BookId = Id<Book>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[schema(value_type = String)]
    pub id: BookId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    /// Total copies owned; never decremented by circulation
    #[serde(default)]
    pub copies: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Book {
    const RESOURCE: &'static str = "books";
}

impl Book {
    /// Case-insensitive match on id, barcode, ISBN, or a title substring
    ///
    /// `query` must already be trimmed and lowercased.
    pub fn matches_query(&self, query: &str) -> bool {
        self.id.as_str().to_lowercase() == query
            || self
                .barcode
                .as_deref()
                .is_some_and(|b| b.to_lowercase() == query)
            || self.isbn.as_deref().is_some_and(|i| i.to_lowercase() == query)
            || self.title.to_lowercase().contains(query)
    }
}

/// Add book request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(range(min = 1, message = "At least one copy is required"))]
    pub copies: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

/// Book with its live availability
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookAvailability {
    #[schema(value_type = String)]
    pub book_id: BookId,
    pub title: String,
    pub copies: u32,
    pub active_borrows: u32,
    pub available: i64,
}
