//! Catalog service: categories and books

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookDetails, BookInput, BookQuery},
        category::{Category, CategoryInput},
    },
    repository::Repository,
};
use validator::Validate;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Categories

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create_category(&self, mut data: CategoryInput) -> AppResult<Category> {
        data.name = data.name.trim().to_string();
        data.validate()?;

        if self.repository.categories.name_exists(&data.name, None).await? {
            return Err(AppError::Conflict(format!("Category \"{}\" already exists", data.name)));
        }

        let category = self.repository.categories.create(&data).await?;
        tracing::info!(category_id = category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn update_category(&self, id: i32, mut data: CategoryInput) -> AppResult<Category> {
        data.name = data.name.trim().to_string();
        data.validate()?;

        if self.repository.categories.name_exists(&data.name, Some(id)).await? {
            return Err(AppError::Conflict(format!("Category \"{}\" already exists", data.name)));
        }

        self.repository.categories.update(id, &data).await
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.repository.categories.delete(id).await?;
        tracing::info!(category_id = id, "category deleted");
        Ok(())
    }

    // Books

    /// Search books
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    pub async fn create_book(&self, mut data: BookInput) -> AppResult<BookDetails> {
        data.title = data.title.trim().to_string();
        data.check()?;
        self.check_references(&data).await?;

        if self.repository.books.isbn_exists(&data.isbn, None).await? {
            return Err(AppError::Conflict(format!("ISBN {} already exists", data.isbn)));
        }

        let book = self.repository.books.create(&data).await?;
        tracing::info!(book_id = book.id, isbn = %book.isbn, stock = book.stock, "book created");
        self.repository.books.get_details(book.id).await
    }

    pub async fn update_book(&self, id: i32, mut data: BookInput) -> AppResult<BookDetails> {
        data.title = data.title.trim().to_string();
        data.check()?;
        self.check_references(&data).await?;

        if self.repository.books.isbn_exists(&data.isbn, Some(id)).await? {
            return Err(AppError::Conflict(format!("ISBN {} already exists", data.isbn)));
        }

        self.repository.books.update(id, &data).await?;
        self.repository.books.get_details(id).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    /// Add (positive delta) or withdraw (negative delta) copies of a book
    pub async fn adjust_stock(&self, book_id: i32, delta: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.adjust_stock(book_id, delta).await?;
        tracing::info!(book_id, delta, stock = book.stock, "stock adjusted");
        self.repository.books.get_details(book_id).await
    }

    /// Referenced author and category must exist
    async fn check_references(&self, data: &BookInput) -> AppResult<()> {
        self.repository.authors.get_by_id(data.author_id).await.map_err(|e| match e {
            AppError::NotFound(msg) => AppError::Validation(format!("author_id: {}", msg)),
            other => other,
        })?;
        if let Some(category_id) = data.category_id {
            self.repository.categories.get_by_id(category_id).await.map_err(|e| match e {
                AppError::NotFound(msg) => AppError::Validation(format!("category_id: {}", msg)),
                other => other,
            })?;
        }
        Ok(())
    }
}
