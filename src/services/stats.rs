//! Statistics service

use crate::{
    api::stats::{BookStats, LoanStats, MemberStats, StatEntry, StatsResponse},
    error::AppResult,
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get library statistics
    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        let pool = &self.repository.pool;

        let by_category = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT COALESCE(c.name, '') AS label, COUNT(*) AS value
            FROM books b
            LEFT JOIN categories c ON c.id = b.category_id
            WHERE b.is_deleted = FALSE
            GROUP BY c.name
            ORDER BY value DESC, label
            "#,
        )
        .fetch_all(pool)
        .await?;

        let returned_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE returned_at::date = CURRENT_DATE AND is_deleted = FALSE",
        )
        .fetch_one(pool)
        .await?;

        Ok(StatsResponse {
            books: BookStats {
                total: self.repository.books.count().await?,
                by_category,
            },
            members: MemberStats {
                total: self.repository.members.count().await?,
            },
            loans: LoanStats {
                open: self.repository.loans.count_open().await?,
                overdue: self.repository.loans.count_overdue().await?,
                returned_today,
            },
        })
    }
}
