//! SQLite schema definitions and SQL query constants.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    published_year INTEGER
);
"#;

pub const INSERT_BOOK: &str = r#"
INSERT INTO books (id, title, author, published_year)
VALUES (?1, ?2, ?3, ?4)
"#;

pub const SELECT_BOOK_BY_ID: &str = r#"
SELECT id, title, author, published_year
FROM books
WHERE id = ?1
"#;

/// Rowids grow with each insert, so this is creation order.
pub const SELECT_ALL_BOOKS: &str = r#"
SELECT id, title, author, published_year
FROM books
ORDER BY rowid ASC
"#;

/// Partial update: NULL parameters keep the current column value.
pub const UPDATE_BOOK: &str = r#"
UPDATE books
SET title = COALESCE(?2, title),
    author = COALESCE(?3, author),
    published_year = COALESCE(?4, published_year)
WHERE id = ?1
RETURNING id, title, author, published_year
"#;

pub const DELETE_BOOK: &str = r#"
DELETE FROM books
WHERE id = ?1
RETURNING id, title, author, published_year
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_valid_sql() {
        assert!(CREATE_TABLES.contains("CREATE TABLE IF NOT EXISTS books"));
    }

    #[test]
    fn test_mutations_return_the_row() {
        assert!(UPDATE_BOOK.contains("COALESCE"));
        assert!(UPDATE_BOOK.contains("RETURNING"));
        assert!(DELETE_BOOK.contains("RETURNING"));
        assert!(SELECT_ALL_BOOKS.contains("ORDER BY rowid"));
    }
}
