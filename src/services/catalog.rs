//! Catalog service: books, categories and languages

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{normalize_isbn, Book, BookQuery, BookShort, CreateBook, UpdateBook},
        category::{Category, CategoryInput},
        language::{CreateLanguage, Language},
        Page,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64, Page)> {
        let page = Page::new(query.page, query.per_page);
        let (books, total) = self.repository.books.search(query, page).await?;
        Ok((books, total, page))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book with a normalized ISBN
    pub async fn create_book(&self, mut book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        book.isbn = normalize_isbn(&book.isbn);
        self.check_references(book.category_id, book.language_id).await?;

        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, isbn = %created.isbn, "Book created");
        Ok(created)
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, mut book: UpdateBook) -> AppResult<Book> {
        book.validate()?;
        book.isbn = book.isbn.as_deref().map(normalize_isbn);
        self.check_references(book.category_id, book.language_id).await?;

        self.repository.books.update(id, &book).await
    }

    /// Soft delete a book that is not on loan
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.get_by_id(id).await?;
        if self.repository.books.has_open_loan(id).await? {
            return Err(AppError::HasOpenLoans(format!(
                "Book {} is on loan; return it before deleting",
                id
            )));
        }

        self.repository.books.soft_delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    /// Books of a category
    pub async fn get_category_books(&self, id: i32) -> AppResult<Vec<BookShort>> {
        self.repository.categories.get_by_id(id).await?;
        self.repository.books.get_by_category(id).await
    }

    pub async fn create_category(&self, input: CategoryInput) -> AppResult<Category> {
        let input = input.trimmed();
        input.validate()?;
        self.repository.categories.create(&input.name).await
    }

    pub async fn rename_category(&self, id: i32, input: CategoryInput) -> AppResult<Category> {
        let input = input.trimmed();
        input.validate()?;
        self.repository.categories.rename(id, &input.name).await
    }

    /// Soft delete a category no live book refers to
    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        let category = self.repository.categories.get_by_id(id).await?;
        if category.nb_books > 0 {
            return Err(AppError::Conflict(format!(
                "Category '{}' still holds {} book(s)",
                category.name, category.nb_books
            )));
        }
        self.repository.categories.soft_delete(id).await
    }

    pub async fn list_languages(&self) -> AppResult<Vec<Language>> {
        self.repository.languages.list().await
    }

    pub async fn create_language(&self, language: CreateLanguage) -> AppResult<Language> {
        language.validate()?;
        self.repository.languages.create(&language).await
    }

    pub async fn delete_language(&self, id: i32) -> AppResult<()> {
        self.repository.languages.soft_delete(id).await
    }

    /// Soft-deleted categories and languages still satisfy the foreign keys,
    /// so they are rejected here.
    async fn check_references(&self, category_id: Option<i32>, language_id: Option<i32>) -> AppResult<()> {
        if let Some(category_id) = category_id {
            match self.repository.categories.get_by_id(category_id).await {
                Ok(_) => {}
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::BadRequest(format!("Unknown category {}", category_id)))
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(language_id) = language_id {
            if !self.repository.languages.exists(language_id).await? {
                return Err(AppError::BadRequest(format!("Unknown language {}", language_id)));
            }
        }
        Ok(())
    }
}
