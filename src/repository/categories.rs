//! Categories repository

use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use super::{books::BOOK_DETAILS_SELECT, on_unique_violation};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookDetails, BookDetailsRow},
        category::{Category, CategoryInput, CategoryWithBooks},
    },
};

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    pub async fn name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE LOWER(name) = LOWER($1) AND ($2::INT IS NULL OR id != $2))",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, data: &CategoryInput) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await
        .map_err(on_unique_violation("A category with this name already exists"))
    }

    pub async fn update(&self, id: i32, data: &CategoryInput) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $1, description = $2 WHERE id = $3 RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(on_unique_violation("A category with this name already exists"))?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    /// Delete a category; its books stay in the catalog uncategorized
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }
        Ok(())
    }

    /// Every category with its books, ordered by category then title
    pub async fn list_with_books(&self) -> AppResult<Vec<CategoryWithBooks>> {
        let categories = self.list().await?;

        let query = format!(
            "{} WHERE b.category_id IS NOT NULL ORDER BY b.title",
            BOOK_DETAILS_SELECT
        );
        let rows = sqlx::query_as::<_, BookDetailsRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        let mut by_category: HashMap<i32, Vec<BookDetails>> = HashMap::new();
        for book in rows.into_iter().map(BookDetails::from) {
            if let Some(category) = &book.category {
                by_category.entry(category.id).or_default().push(book);
            }
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryWithBooks {
                books: by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }
}
