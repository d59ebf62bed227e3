//! In-memory repository implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use booksync_core::book::{Book, BookId, BookPatch, NewBook};
use booksync_core::storage::{BookRepository, RepositoryError, Result};

#[derive(Debug)]
struct StoredBook {
    /// Insertion sequence, keeps `find_all` in creation order.
    seq: u64,
    book: Book,
}

#[derive(Debug, Default)]
struct BookTable {
    rows: HashMap<BookId, StoredBook>,
    next_seq: u64,
}

/// In-memory storage backend.
///
/// Data is not persisted and is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    table: Arc<RwLock<BookTable>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for InMemoryRepository {
    async fn create(&self, new_book: NewBook) -> Result<Book> {
        let mut table = self.table.write().await;

        let id = BookId::generate();
        if table.rows.contains_key(&id) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Book",
                id: id.to_string(),
            });
        }

        let book = Book::from_new(id.clone(), new_book);
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(
            id,
            StoredBook {
                seq,
                book: book.clone(),
            },
        );

        Ok(book)
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>> {
        let table = self.table.read().await;
        Ok(table.rows.get(id).map(|row| row.book.clone()))
    }

    async fn find_all(&self) -> Result<Vec<Book>> {
        let table = self.table.read().await;
        let mut rows: Vec<&StoredBook> = table.rows.values().collect();
        rows.sort_by_key(|row| row.seq);
        Ok(rows.into_iter().map(|row| row.book.clone()).collect())
    }

    async fn update(&self, id: &BookId, patch: BookPatch) -> Result<Option<Book>> {
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(id).map(|row| {
            row.book.apply(patch);
            row.book.clone()
        }))
    }

    async fn delete(&self, id: &BookId) -> Result<Option<Book>> {
        let mut table = self.table.write().await;
        Ok(table.rows.remove(id).map(|row| row.book))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> NewBook {
        NewBook::new("Dune", "Herbert").with_published_year(1965)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_keeps_fields() {
        let repo = InMemoryRepository::new();

        let book = repo.create(dune()).await.unwrap();

        assert!(!book.id.is_empty());
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Herbert");
        assert_eq!(book.published_year, Some(1965));
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let repo = InMemoryRepository::new();
        let book = repo.create(dune()).await.unwrap();

        let found = repo.find_by_id(&book.id).await.unwrap();

        assert_eq!(found, Some(book));
    }

    #[tokio::test]
    async fn test_find_by_id_missing() {
        let repo = InMemoryRepository::new();
        let found = repo.find_by_id(&BookId::new("missing")).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_find_all_in_creation_order() {
        let repo = InMemoryRepository::new();
        let titles = ["Dune", "Emma", "Ulysses", "Beloved"];
        for title in titles {
            repo.create(NewBook::new(title, "Someone")).await.unwrap();
        }

        let all = repo.find_all().await.unwrap();

        let got: Vec<&str> = all.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(got, titles);
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let repo = InMemoryRepository::new();
        let book = repo.create(dune()).await.unwrap();

        let updated = repo
            .update(&book.id, BookPatch::new().with_title("Dune Messiah"))
            .await
            .unwrap()
            .expect("book should exist");

        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.published_year, Some(1965));
        assert_eq!(repo.find_by_id(&book.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let repo = InMemoryRepository::new();
        let result = repo
            .update(&BookId::new("missing"), BookPatch::new().with_title("X"))
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_book() {
        let repo = InMemoryRepository::new();
        let book = repo.create(dune()).await.unwrap();

        let deleted = repo.delete(&book.id).await.unwrap();

        assert_eq!(deleted, Some(book.clone()));
        assert_eq!(repo.find_by_id(&book.id).await.unwrap(), None);
        assert_eq!(repo.delete(&book.id).await.unwrap(), None);
    }
}
