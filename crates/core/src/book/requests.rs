//! API request types for book operations.
//!
//! Pure data types with validation. Conversion into domain types fails with a
//! [`BookError`] instead of letting invalid input reach the store.

use serde::{Deserialize, Serialize};

use super::error::BookError;
use super::types::{BookPatch, NewBook};

/// Request payload for creating a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i64>,
}

impl CreateBookRequest {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            published_year: None,
        }
    }

    pub fn with_published_year(mut self, year: i64) -> Self {
        self.published_year = Some(year);
        self
    }

    /// Validates the request and converts it into creation fields.
    pub fn into_new_book(self) -> Result<NewBook, BookError> {
        validate_title(&self.title)?;
        validate_author(&self.author)?;
        let published_year = self.published_year.map(validate_year).transpose()?;

        Ok(NewBook {
            title: self.title,
            author: self.author,
            published_year,
        })
    }
}

/// Request payload for updating a book. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i64>,
}

impl UpdateBookRequest {
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

    pub fn with_published_year(mut self, year: i64) -> Self {
        self.published_year = Some(year);
        self
    }

    /// Validates the provided fields and converts them into a patch.
    pub fn into_patch(self) -> Result<BookPatch, BookError> {
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(ref author) = self.author {
            validate_author(author)?;
        }
        let published_year = self.published_year.map(validate_year).transpose()?;

        Ok(BookPatch {
            title: self.title,
            author: self.author,
            published_year,
        })
    }
}

fn validate_title(title: &str) -> Result<(), BookError> {
    if title.trim().is_empty() {
        return Err(BookError::EmptyTitle);
    }
    Ok(())
}

fn validate_author(author: &str) -> Result<(), BookError> {
    if author.trim().is_empty() {
        return Err(BookError::EmptyAuthor);
    }
    Ok(())
}

fn validate_year(year: i64) -> Result<u32, BookError> {
    if year < 0 {
        return Err(BookError::NegativePublishedYear(year));
    }
    u32::try_from(year).map_err(|_| BookError::PublishedYearOutOfRange(year))
}
