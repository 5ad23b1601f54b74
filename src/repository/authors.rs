//! Authors repository

use sqlx::{Pool, Postgres};

use super::on_unique_violation;
use crate::{
    error::{AppError, AppResult},
    models::author::{Author, AuthorInput},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>("SELECT * FROM authors ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(authors)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
    }

    /// Case-insensitive name check, optionally ignoring the author being updated
    pub async fn name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM authors WHERE LOWER(name) = LOWER($1) AND ($2::INT IS NULL OR id != $2))",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, data: &AuthorInput) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            "INSERT INTO authors (name, nationality, biography) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.nationality)
        .bind(&data.biography)
        .fetch_one(&self.pool)
        .await
        .map_err(on_unique_violation("An author with this name already exists"))
    }

    pub async fn update(&self, id: i32, data: &AuthorInput) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            "UPDATE authors SET name = $1, nationality = $2, biography = $3 WHERE id = $4 RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.nationality)
        .bind(&data.biography)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(on_unique_violation("An author with this name already exists"))?
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
    }

    /// Delete an author. Authors still referenced by books are kept.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let book_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE author_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if book_count > 0 {
            return Err(AppError::Conflict(format!(
                "Author {} still has {} book(s) in the catalog",
                id, book_count
            )));
        }

        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author {} not found", id)));
        }
        Ok(())
    }
}
