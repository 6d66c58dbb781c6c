//! Loans repository for database operations
//!
//! The "one open loan per book" rule lives in the `ux_loans_book_open` unique
//! index; inserts here never check for an existing open loan first and instead
//! translate the index violation into [`AppError::BookAlreadyLoaned`].

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult},
    models::{
        loan::{Loan, LoanDetails, LoanQuery, NewLoan},
        Page,
    },
};

/// Name of the filtered unique index guarding open loans
pub const OPEN_LOAN_INDEX: &str = "ux_loans_book_open";

const LOAN_DETAILS_SELECT: &str = r#"
    SELECT l.id, l.book_id, b.title AS book_title, b.isbn AS book_isbn,
           l.member_id, m.first_name || ' ' || m.last_name AS member_name,
           l.start_date, l.due_date, l.returned_at,
           (l.returned_at IS NULL AND l.due_date < CURRENT_DATE) AS is_overdue
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN members m ON m.id = l.member_id
"#;

const LOAN_FILTER: &str = r#"
    WHERE l.is_deleted = FALSE
      AND ($1::int IS NULL OR l.member_id = $1)
      AND ($2::int IS NULL OR l.book_id = $2)
      AND ($3::bool IS NULL OR (l.returned_at IS NULL) = $3)
      AND ($4::bool IS NULL OR (l.returned_at IS NULL AND l.due_date < CURRENT_DATE) = $4)
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a non-deleted loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get a loan joined with its book and member
    pub async fn get_details(&self, id: i32) -> AppResult<LoanDetails> {
        let query = format!("{} WHERE l.id = $1 AND l.is_deleted = FALSE", LOAN_DETAILS_SELECT);
        sqlx::query_as::<_, LoanDetails>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Search loans with pagination, newest first
    pub async fn search(&self, query: &LoanQuery, page: Page) -> AppResult<(Vec<LoanDetails>, i64)> {
        let count_query = format!("SELECT COUNT(*) FROM loans l {}", LOAN_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(query.member_id)
            .bind(query.book_id)
            .bind(query.open)
            .bind(query.overdue)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "{} {} ORDER BY l.start_date DESC, l.id DESC LIMIT $5 OFFSET $6",
            LOAN_DETAILS_SELECT, LOAN_FILTER
        );

        let loans = sqlx::query_as::<_, LoanDetails>(&select_query)
            .bind(query.member_id)
            .bind(query.book_id)
            .bind(query.open)
            .bind(query.overdue)
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((loans, total))
    }

    /// Insert an open loan
    pub async fn create(&self, loan: &NewLoan) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, member_id, start_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.member_id)
        .bind(loan.start_date)
        .bind(loan.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err, OPEN_LOAN_INDEX) {
                AppError::BookAlreadyLoaned(format!(
                    "Book {} already has an open loan",
                    loan.book_id
                ))
            } else if is_foreign_key_violation(&err, "loans_book_id_fkey") {
                AppError::NotFound(format!("Book with id {} not found", loan.book_id))
            } else if is_foreign_key_violation(&err, "loans_member_id_fkey") {
                AppError::NotFound(format!("Member with id {} not found", loan.member_id))
            } else {
                AppError::Database(err)
            }
        })
    }

    /// Close an open loan by setting its return timestamp
    pub async fn mark_returned(&self, id: i32) -> AppResult<Loan> {
        let returned = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET returned_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE AND returned_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match returned {
            Some(loan) => Ok(loan),
            None => {
                // Either missing or closed already
                let loan = self.get_by_id(id).await?;
                Err(AppError::LoanAlreadyReturned(format!(
                    "Loan {} was already returned on {}",
                    id,
                    loan.returned_at
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default()
                )))
            }
        }
    }

    /// Move the due date of an open loan
    pub async fn update_due_date(&self, id: i32, due_date: NaiveDate) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET due_date = $2
            WHERE id = $1 AND is_deleted = FALSE AND returned_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(due_date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::BusinessRule(format!("Loan {} is not open", id)))
    }

    /// Mark a closed loan as deleted
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE loans SET is_deleted = TRUE
            WHERE id = $1 AND is_deleted = FALSE AND returned_at IS NOT NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing loan from an open one
            self.get_by_id(id).await?;
            return Err(AppError::BusinessRule(format!(
                "Loan {} is still open; return it before deleting",
                id
            )));
        }
        Ok(())
    }

    /// Count open loans
    pub async fn count_open(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE returned_at IS NULL AND is_deleted = FALSE",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count overdue loans
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM loans
            WHERE returned_at IS NULL AND is_deleted = FALSE AND due_date < CURRENT_DATE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
