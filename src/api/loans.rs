//! Loan management endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, ExtendLoan, LoanDetails, LoanQuery},
    AppState,
};

use super::{AuthenticatedUser, LoanPage, PaginatedResponse};

/// Search loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "List of loans", body = LoanPage),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_staff()?;

    let (loans, total, page) = state.services.loans.search_loans(&query).await?;

    Ok(Json(PaginatedResponse {
        items: loans,
        total,
        page: page.page,
        per_page: page.per_page,
    }))
}

/// Get loan details
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;

    let loan = state.services.loans.get_loan(id).await?;
    Ok(Json(loan))
}

/// Lend a book to a member
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Due date before start date"),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "Book already has an open loan")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    claims.require_staff()?;

    let loan = state.services.loans.create_loan(request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Register the return of a loaned book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan closed", body = LoanDetails),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;

    let loan = state.services.loans.return_loan(id).await?;
    Ok(Json(loan))
}

/// Push back the due date of an open loan
#[utoipa::path(
    post,
    path = "/loans/{id}/extend",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ExtendLoan,
    responses(
        (status = 200, description = "Loan extended", body = LoanDetails),
        (status = 400, description = "New due date is not after the current one"),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan is already closed")
    )
)]
pub async fn extend_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    body: Bytes,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;

    let request = parse_extend_request(&body)?;
    let loan = state.services.loans.extend_loan(id, request).await?;
    Ok(Json(loan))
}

/// Remove a closed loan from history
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Open loans cannot be deleted")
    )
)]
pub async fn delete_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.loans.delete_loan(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// An empty body asks for the default extension; anything else must be a
/// well-formed `ExtendLoan`.
fn parse_extend_request(body: &[u8]) -> AppResult<ExtendLoan> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExtendLoan::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid extension request: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_body_uses_default_extension() {
        assert!(parse_extend_request(b"").unwrap().due_date.is_none());
        assert!(parse_extend_request(b"  \n").unwrap().due_date.is_none());
        assert!(parse_extend_request(b"{}").unwrap().due_date.is_none());
    }

    #[test]
    fn explicit_due_date_is_kept() {
        let request = parse_extend_request(br#"{"due_date":"2026-05-01"}"#).unwrap();
        assert_eq!(request.due_date, NaiveDate::from_ymd_opt(2026, 5, 1));
    }

    #[test]
    fn malformed_due_date_is_rejected() {
        let err = parse_extend_request(br#"{"due_date":"2026-13-45"}"#).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(parse_extend_request(b"not json").is_err());
    }
}
