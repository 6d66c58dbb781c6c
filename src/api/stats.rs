//! Statistics endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{error::AppResult, AppState};

use super::AuthenticatedUser;

/// Statistics response
#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    /// Book statistics
    pub books: BookStats,
    /// Member statistics
    pub members: MemberStats,
    /// Loan statistics
    pub loans: LoanStats,
}

#[derive(Serialize, ToSchema)]
pub struct BookStats {
    /// Total number of books in the catalog
    pub total: i64,
    /// Books by category (empty label for uncategorized books)
    pub by_category: Vec<StatEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct MemberStats {
    /// Total number of members
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct LoanStats {
    /// Open loans
    pub open: i64,
    /// Open loans past their due date
    pub overdue: i64,
    /// Books returned today
    pub returned_today: i64,
}

#[derive(Serialize, FromRow, ToSchema)]
pub struct StatEntry {
    /// Label
    pub label: String,
    /// Value
    pub value: i64,
}

/// Get library statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = StatsResponse),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatsResponse>> {
    claims.require_staff()?;

    let stats = state.services.stats.get_stats().await?;
    Ok(Json(stats))
}
