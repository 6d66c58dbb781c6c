//! Languages repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::language::{CreateLanguage, Language},
};

#[derive(Clone)]
pub struct LanguagesRepository {
    pool: Pool<Postgres>,
}

impl LanguagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Language>> {
        let languages = sqlx::query_as::<_, Language>(
            "SELECT id, code, name FROM languages WHERE is_deleted = FALSE ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(languages)
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM languages WHERE id = $1 AND is_deleted = FALSE)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, language: &CreateLanguage) -> AppResult<Language> {
        sqlx::query_as::<_, Language>(
            "INSERT INTO languages (code, name) VALUES (LOWER($1), $2) RETURNING id, code, name",
        )
        .bind(&language.code)
        .bind(&language.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err, "ux_languages_code") {
                AppError::Conflict(format!("Language '{}' already exists", language.code))
            } else {
                AppError::Database(err)
            }
        })
    }

    /// Mark a language as deleted
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE languages SET is_deleted = TRUE WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Language with id {} not found", id)));
        }
        Ok(())
    }
}
