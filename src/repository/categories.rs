//! Categories repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::category::Category,
};

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.name,
           (SELECT COUNT(*) FROM books b WHERE b.category_id = c.id AND b.is_deleted = FALSE) AS nb_books
    FROM categories c
"#;

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List non-deleted categories by name
    pub async fn list(&self) -> AppResult<Vec<Category>> {
        let query = format!("{} WHERE c.is_deleted = FALSE ORDER BY c.name", CATEGORY_SELECT);
        let categories = sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    /// Get a non-deleted category by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        let query = format!("{} WHERE c.id = $1 AND c.is_deleted = FALSE", CATEGORY_SELECT);
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    pub async fn create(&self, name: &str) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, 0::bigint AS nb_books",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_name_conflict)
    }

    pub async fn rename(&self, id: i32, name: &str) -> AppResult<Category> {
        let updated = sqlx::query_scalar::<_, i32>(
            "UPDATE categories SET name = $2 WHERE id = $1 AND is_deleted = FALSE RETURNING id",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_name_conflict)?;

        match updated {
            Some(id) => self.get_by_id(id).await,
            None => Err(AppError::NotFound(format!("Category with id {} not found", id))),
        }
    }

    /// Mark a category as deleted
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE categories SET is_deleted = TRUE WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }
        Ok(())
    }
}

fn map_name_conflict(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err, "ux_categories_name") {
        AppError::Conflict("A category with this name already exists".to_string())
    } else {
        AppError::Database(err)
    }
}
