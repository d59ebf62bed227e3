use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque book identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Wraps an identifier produced by a backing store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BookId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A book as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<u32>,
}

impl Book {
    /// Builds a stored book from its id and creation fields.
    pub fn from_new(id: BookId, new_book: NewBook) -> Self {
        Self {
            id,
            title: new_book.title,
            author: new_book.author,
            published_year: new_book.published_year,
        }
    }

    /// Applies the provided fields of a patch, leaving the rest untouched.
    pub fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(year) = patch.published_year {
            self.published_year = Some(year);
        }
    }
}

/// Fields for creating a book. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<u32>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            published_year: None,
        }
    }

    pub fn with_published_year(mut self, year: u32) -> Self {
        self.published_year = Some(year);
        self
    }
}

/// Partial update of a book. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<u32>,
}

impl BookPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_published_year(mut self, year: u32) -> Self {
        self.published_year = Some(year);
        self
    }

    /// Returns true when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.published_year.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Book {
        Book::from_new(
            BookId::new("X"),
            NewBook::new("Dune", "Herbert").with_published_year(1965),
        )
    }

    #[test]
    fn test_book_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(dune()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": "X",
                "title": "Dune",
                "author": "Herbert",
                "publishedYear": 1965
            })
        );
    }

    #[test]
    fn test_book_without_year_omits_field() {
        let book = Book::from_new(BookId::new("Y"), NewBook::new("Emma", "Austen"));
        let json = serde_json::to_value(&book).unwrap();

        assert!(json.get("publishedYear").is_none());
    }

    #[test]
    fn test_apply_patch_only_touches_provided_fields() {
        let mut book = dune();
        book.apply(BookPatch::new().with_title("Dune Messiah"));

        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.author, "Herbert");
        assert_eq!(book.published_year, Some(1965));
    }

    #[test]
    fn test_empty_patch() {
        assert!(BookPatch::new().is_empty());
        assert!(!BookPatch::new().with_published_year(1969).is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique_and_non_empty() {
        let a = BookId::generate();
        let b = BookId::generate();

        assert!(!a.is_empty());
        assert_ne!(a, b);
    }
}
