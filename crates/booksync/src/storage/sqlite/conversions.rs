//! SQLite row conversion functions.
//!
//! Every book query selects `id, title, author, published_year` in that order.

use booksync_core::book::{Book, BookId};
use rusqlite::Row;

/// Convert a SQLite row to a Book.
pub fn row_to_book(row: &Row) -> rusqlite::Result<Book> {
    let id: String = row.get(0)?;
    let title: String = row.get(1)?;
    let author: String = row.get(2)?;
    let published_year: Option<i64> = row.get(3)?;

    Ok(Book {
        id: BookId::new(id),
        title,
        author,
        published_year: published_year.map(parse_year).transpose()?,
    })
}

/// Converts a stored year back to the domain type.
fn parse_year(year: i64) -> rusqlite::Result<u32> {
    u32::try_from(year).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Integer, Box::new(e))
    })
}

/// Converts a domain year to its column value.
pub fn year_to_sql(year: Option<u32>) -> Option<i64> {
    year.map(i64::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_accepts_valid_years() {
        assert_eq!(parse_year(0).unwrap(), 0);
        assert_eq!(parse_year(1965).unwrap(), 1965);
    }

    #[test]
    fn test_parse_year_rejects_negative() {
        assert!(matches!(
            parse_year(-1),
            Err(rusqlite::Error::FromSqlConversionFailure(3, _, _))
        ));
    }

    #[test]
    fn test_year_to_sql() {
        assert_eq!(year_to_sql(Some(1965)), Some(1965));
        assert_eq!(year_to_sql(None), None);
    }
}
