//! Author management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::author::{Author, AuthorInput},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
}

impl AuthorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create(&self, data: AuthorInput) -> AppResult<Author> {
        let data = data.normalized();
        data.validate()?;

        if self.repository.authors.name_exists(&data.name, None).await? {
            return Err(AppError::Conflict(format!("Author \"{}\" already exists", data.name)));
        }

        let author = self.repository.authors.create(&data).await?;
        tracing::info!(author_id = author.id, name = %author.name, "author created");
        Ok(author)
    }

    pub async fn update(&self, id: i32, data: AuthorInput) -> AppResult<Author> {
        let data = data.normalized();
        data.validate()?;

        if self.repository.authors.name_exists(&data.name, Some(id)).await? {
            return Err(AppError::Conflict(format!("Author \"{}\" already exists", data.name)));
        }

        self.repository.authors.update(id, &data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!(author_id = id, "author deleted");
        Ok(())
    }
}
