//! Books repository

use sqlx::{Pool, Postgres};

use super::on_unique_violation;
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookDetails, BookDetailsRow, BookInput, BookQuery},
};

/// Books joined with their author and (optional) category
pub(crate) const BOOK_DETAILS_SELECT: &str = r#"
    SELECT b.*,
           a.name AS author_name,
           a.nationality AS author_nationality,
           a.biography AS author_biography,
           c.name AS category_name,
           c.description AS category_description
    FROM books b
    JOIN authors a ON a.id = b.author_id
    LEFT JOIN categories c ON c.id = b.category_id
"#;

const DUPLICATE_ISBN: &str = "A book with this ISBN already exists";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search books with optional filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        let per_page = query.per_page();
        let offset = query.offset()?;
        let search = query.search_term().map(|q| format!("%{}%", q));

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.available.is_some() {
            conditions.push(format!("b.available = ${}", idx));
            idx += 1;
        }
        if query.category_id.is_some() {
            conditions.push(format!("b.category_id = ${}", idx));
            idx += 1;
        }
        if query.author_id.is_some() {
            conditions.push(format!("b.author_id = ${}", idx));
            idx += 1;
        }
        if search.is_some() {
            conditions.push(format!(
                "(b.title ILIKE ${0} OR b.isbn ILIKE ${0} OR a.name ILIKE ${0})",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!(
            "SELECT COUNT(*) FROM books b JOIN authors a ON a.id = b.author_id {}",
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(available) = query.available { count_builder = count_builder.bind(available); }
        if let Some(category_id) = query.category_id { count_builder = count_builder.bind(category_id); }
        if let Some(author_id) = query.author_id { count_builder = count_builder.bind(author_id); }
        if let Some(ref pattern) = search { count_builder = count_builder.bind(pattern); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY {} LIMIT {} OFFSET {}",
            BOOK_DETAILS_SELECT,
            where_clause,
            query.ordering.unwrap_or_default().sql(),
            per_page,
            offset
        );
        let mut builder = sqlx::query_as::<_, BookDetailsRow>(&select_q);
        if let Some(available) = query.available { builder = builder.bind(available); }
        if let Some(category_id) = query.category_id { builder = builder.bind(category_id); }
        if let Some(author_id) = query.author_id { builder = builder.bind(author_id); }
        if let Some(ref pattern) = search { builder = builder.bind(pattern); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows.into_iter().map(BookDetails::from).collect(), total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    pub async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let query = format!("{} WHERE b.id = $1", BOOK_DETAILS_SELECT);
        sqlx::query_as::<_, BookDetailsRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(BookDetails::from)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Details for several books at once, in no particular order
    pub async fn get_details_many(&self, ids: &[i32]) -> AppResult<Vec<BookDetails>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("{} WHERE b.id = ANY($1)", BOOK_DETAILS_SELECT);
        let rows = sqlx::query_as::<_, BookDetailsRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BookDetails::from).collect())
    }

    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::INT IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, data: &BookInput) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author_id, category_id, isbn, publication_date,
                description, pages, rating, image_url, stock
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(data.author_id)
        .bind(data.category_id)
        .bind(&data.isbn)
        .bind(data.publication_date)
        .bind(&data.description)
        .bind(data.pages)
        .bind(data.rating)
        .bind(&data.image_url)
        .bind(data.stock_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(on_unique_violation(DUPLICATE_ISBN))
    }

    /// Replace a book. Stock is kept unless the input carries one.
    pub async fn update(&self, id: i32, data: &BookInput) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = $1, author_id = $2, category_id = $3, isbn = $4,
                publication_date = $5, description = $6, pages = $7,
                rating = $8, image_url = $9, stock = COALESCE($10, stock)
            WHERE id = $11
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(data.author_id)
        .bind(data.category_id)
        .bind(&data.isbn)
        .bind(data.publication_date)
        .bind(&data.description)
        .bind(data.pages)
        .bind(data.rating)
        .bind(&data.image_url)
        .bind(data.stock)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(on_unique_violation(DUPLICATE_ISBN))?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Delete a book and its loan history. Books currently on loan are kept.
    /// Delete a book and its loan history. The book row is locked so no
    /// borrow can commit between the active-loan check and the delete.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND returned_on IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if active > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} active loan(s)",
                id, active
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Add or remove copies. The book row is locked for the duration.
    pub async fn adjust_stock(&self, id: i32, delta: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        let stock = book.adjusted_stock(delta)?;

        let updated = sqlx::query_as::<_, Book>(
            "UPDATE books SET stock = $1 WHERE id = $2 RETURNING *",
        )
        .bind(stock)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn count_all(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_available(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE available")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
