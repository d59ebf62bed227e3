//! SQLite repository implementation.

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use booksync_core::book::{Book, BookId, BookPatch, NewBook};
use booksync_core::storage::{BookRepository, RepositoryError, Result};

use super::conversions::{row_to_book, year_to_sql};
use super::error::map_tokio_rusqlite_error;
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-based book repository.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl BookRepository for SqliteRepository {
    async fn create(&self, new_book: NewBook) -> Result<Book> {
        let book = Book::from_new(BookId::generate(), new_book);
        let id = book.id.to_string();
        let title = book.title.clone();
        let author = book.author.clone();
        let published_year = year_to_sql(book.published_year);

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_BOOK,
                    rusqlite::params![id, title, author, published_year],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Book", book.id.to_string()))?;

        Ok(book)
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_BOOK_BY_ID).map_err(wrap_err)?;
                stmt.query_row([&id_str], row_to_book)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Book", id.to_string()))
    }

    async fn find_all(&self) -> Result<Vec<Book>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(schema::SELECT_ALL_BOOKS).map_err(wrap_err)?;
                let rows = stmt.query_map([], row_to_book).map_err(wrap_err)?;

                let mut books = Vec::new();
                for row_result in rows {
                    books.push(row_result.map_err(wrap_err)?);
                }
                Ok(books)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Book", ""))
    }

    async fn update(&self, id: &BookId, patch: BookPatch) -> Result<Option<Book>> {
        let id_str = id.to_string();
        let published_year = year_to_sql(patch.published_year);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::UPDATE_BOOK).map_err(wrap_err)?;
                stmt.query_row(
                    rusqlite::params![id_str, patch.title, patch.author, published_year],
                    row_to_book,
                )
                .optional()
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Book", id.to_string()))
    }

    async fn delete(&self, id: &BookId) -> Result<Option<Book>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::DELETE_BOOK).map_err(wrap_err)?;
                stmt.query_row([&id_str], row_to_book)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Book", id.to_string()))
    }
}
