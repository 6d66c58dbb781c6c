//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{is_foreign_key_violation, AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookShort, CreateBook, UpdateBook},
        Page,
    },
};

const BOOK_SHORT_COLUMNS: &str = r#"
    b.id, b.title, b.author, b.isbn, b.category_id, c.name AS category_name, b.language_id,
    NOT EXISTS (
        SELECT 1 FROM loans l WHERE l.book_id = b.id AND l.returned_at IS NULL
    ) AS is_available
"#;

const BOOK_FILTER: &str = r#"
    WHERE b.is_deleted = FALSE
      AND ($1::text IS NULL OR b.title ILIKE '%' || $1 || '%')
      AND ($2::text IS NULL OR b.author ILIKE '%' || $2 || '%')
      AND ($3::text IS NULL OR b.isbn = $3)
      AND ($4::int IS NULL OR b.category_id = $4)
      AND ($5::int IS NULL OR b.language_id = $5)
      AND ($6::bool IS NULL OR (NOT EXISTS (
          SELECT 1 FROM loans l WHERE l.book_id = b.id AND l.returned_at IS NULL
      )) = $6)
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a non-deleted book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery, page: Page) -> AppResult<(Vec<BookShort>, i64)> {
        let isbn = query.isbn.as_deref().map(crate::models::book::normalize_isbn);

        let count_query = format!("SELECT COUNT(*) FROM books b {}", BOOK_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&query.title)
            .bind(&query.author)
            .bind(&isbn)
            .bind(query.category_id)
            .bind(query.language_id)
            .bind(query.available)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            r#"
            SELECT {}
            FROM books b
            LEFT JOIN categories c ON c.id = b.category_id
            {}
            ORDER BY b.title, b.id
            LIMIT $7 OFFSET $8
            "#,
            BOOK_SHORT_COLUMNS, BOOK_FILTER
        );

        let books = sqlx::query_as::<_, BookShort>(&select_query)
            .bind(&query.title)
            .bind(&query.author)
            .bind(&isbn)
            .bind(query.category_id)
            .bind(query.language_id)
            .bind(query.available)
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    /// List the non-deleted books of a category
    pub async fn get_by_category(&self, category_id: i32) -> AppResult<Vec<BookShort>> {
        let query = format!(
            r#"
            SELECT {}
            FROM books b
            LEFT JOIN categories c ON c.id = b.category_id
            WHERE b.category_id = $1 AND b.is_deleted = FALSE
            ORDER BY b.title, b.id
            "#,
            BOOK_SHORT_COLUMNS
        );

        let books = sqlx::query_as::<_, BookShort>(&query)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    /// Create a new book; `isbn` must already be normalized
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, category_id, language_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.category_id)
        .bind(book.language_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_reference_error)
    }

    /// Update a book, keeping the stored value of absent fields
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                category_id = COALESCE($5, category_id),
                language_id = COALESCE($6, language_id),
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.category_id)
        .bind(book.language_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_reference_error)?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Mark a book as deleted
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE books SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Whether the book currently has an open loan
    pub async fn has_open_loan(&self, id: i32) -> AppResult<bool> {
        let open: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND returned_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(open)
    }

    /// Count non-deleted books
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE is_deleted = FALSE")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_reference_error(err: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&err, "books_category_id_fkey") {
        AppError::BadRequest("Unknown category".to_string())
    } else if is_foreign_key_violation(&err, "books_language_id_fkey") {
        AppError::BadRequest("Unknown language".to_string())
    } else {
        AppError::Database(err)
    }
}
