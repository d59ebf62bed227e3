use thiserror::Error;

/// Errors that can occur when validating book requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("Book title cannot be empty")]
    EmptyTitle,
    #[error("Book author cannot be empty")]
    EmptyAuthor,
    #[error("Published year must be greater than or equal to 0, got {0}")]
    NegativePublishedYear(i64),
    #[error("Published year is out of range: {0}")]
    PublishedYearOutOfRange(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_error_display() {
        assert_eq!(BookError::EmptyTitle.to_string(), "Book title cannot be empty");
        assert_eq!(
            BookError::EmptyAuthor.to_string(),
            "Book author cannot be empty"
        );
        assert_eq!(
            BookError::NegativePublishedYear(-3).to_string(),
            "Published year must be greater than or equal to 0, got -3"
        );
    }
}
