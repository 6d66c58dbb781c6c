//! Loan management service

use chrono::{Duration, NaiveDate, Utc};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{CreateLoan, ExtendLoan, Loan, LoanDetails, LoanQuery, NewLoan},
        Page,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Lend a book to a member.
    ///
    /// The book and member must exist and not be deleted. A second open loan
    /// for the same book is rejected by the database index.
    pub async fn create_loan(&self, request: CreateLoan) -> AppResult<LoanDetails> {
        let today = Utc::now().date_naive();
        let (start_date, due_date) = resolve_dates(
            request.start_date,
            request.due_date,
            today,
            self.config.duration_days,
        )?;

        self.repository.books.get_by_id(request.book_id).await?;
        self.repository.members.get_by_id(request.member_id).await?;

        let loan = self
            .repository
            .loans
            .create(&NewLoan {
                book_id: request.book_id,
                member_id: request.member_id,
                start_date,
                due_date,
            })
            .await
            .inspect_err(|e| {
                if matches!(e, AppError::BookAlreadyLoaned(_)) {
                    tracing::warn!(book_id = request.book_id, "Book already has an open loan");
                }
            })?;

        tracing::info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            member_id = loan.member_id,
            %due_date,
            "Loan created"
        );
        self.repository.loans.get_details(loan.id).await
    }

    /// Close a loan
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.mark_returned(loan_id).await?;
        tracing::info!(loan_id, book_id = loan.book_id, "Loan returned");
        self.repository.loans.get_details(loan_id).await
    }

    /// Push back the due date of an open loan
    pub async fn extend_loan(&self, loan_id: i32, request: ExtendLoan) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        let due_date = extended_due_date(&loan, request.due_date, self.config.extension_days)?;

        self.repository.loans.update_due_date(loan_id, due_date).await?;
        tracing::info!(loan_id, %due_date, "Loan extended");
        self.repository.loans.get_details(loan_id).await
    }

    pub async fn get_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        self.repository.loans.get_details(loan_id).await
    }

    pub async fn search_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64, Page)> {
        let page = Page::new(query.page, query.per_page);
        let (loans, total) = self.repository.loans.search(query, page).await?;
        Ok((loans, total, page))
    }

    /// Loans of a member, optionally only the open ones
    pub async fn get_member_loans(&self, member_id: i32, open: Option<bool>) -> AppResult<Vec<LoanDetails>> {
        self.repository.members.get_by_id(member_id).await?;
        self.all_loans(LoanQuery {
            member_id: Some(member_id),
            open,
            ..Default::default()
        })
        .await
    }

    /// Loan history of a book, newest first
    pub async fn get_book_loans(&self, book_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.books.get_by_id(book_id).await?;
        self.all_loans(LoanQuery {
            book_id: Some(book_id),
            ..Default::default()
        })
        .await
    }

    /// Soft delete a closed loan
    pub async fn delete_loan(&self, loan_id: i32) -> AppResult<()> {
        self.repository.loans.soft_delete(loan_id).await?;
        tracing::info!(loan_id, "Loan deleted");
        Ok(())
    }

    async fn all_loans(&self, query: LoanQuery) -> AppResult<Vec<LoanDetails>> {
        let mut page = Page::new(Some(1), Some(crate::models::MAX_PER_PAGE));
        let mut result = Vec::new();
        loop {
            let (loans, total) = self.repository.loans.search(&query, page).await?;
            let fetched = loans.len();
            result.extend(loans);
            if fetched == 0 || result.len() as i64 >= total {
                return Ok(result);
            }
            page.page += 1;
        }
    }
}

/// Resolve the start and due dates of a new loan
pub fn resolve_dates(
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
    duration_days: i64,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = start_date.unwrap_or(today);
    let due = match due_date {
        Some(due) => due,
        None => add_days(start, duration_days)?,
    };

    if due < start {
        return Err(AppError::BadRequest(format!(
            "Due date {} is before start date {}",
            due, start
        )));
    }
    Ok((start, due))
}

/// New due date for an extension of `loan`
pub fn extended_due_date(
    loan: &Loan,
    requested: Option<NaiveDate>,
    extension_days: i64,
) -> AppResult<NaiveDate> {
    if !loan.is_open() {
        return Err(AppError::BusinessRule(format!(
            "Loan {} is already returned",
            loan.id
        )));
    }

    let due = match requested {
        Some(due) => due,
        None => add_days(loan.due_date, extension_days)?,
    };
    if due <= loan.due_date {
        return Err(AppError::BadRequest(format!(
            "New due date {} must be after the current due date {}",
            due, loan.due_date
        )));
    }
    Ok(due)
}

fn add_days(date: NaiveDate, days: i64) -> AppResult<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| AppError::BadRequest(format!("Date {} is out of range", date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_loan(due: NaiveDate) -> Loan {
        Loan {
            id: 4,
            book_id: 1,
            member_id: 2,
            start_date: date(2026, 3, 1),
            due_date: due,
            returned_at: None,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dates_default_to_today_plus_duration() {
        let (start, due) = resolve_dates(None, None, date(2026, 3, 1), 21).unwrap();
        assert_eq!(start, date(2026, 3, 1));
        assert_eq!(due, date(2026, 3, 22));
    }

    #[test]
    fn explicit_start_shifts_default_due_date() {
        let (start, due) = resolve_dates(Some(date(2026, 2, 20)), None, date(2026, 3, 1), 14).unwrap();
        assert_eq!(start, date(2026, 2, 20));
        assert_eq!(due, date(2026, 3, 6));
    }

    #[test]
    fn same_day_loan_is_allowed() {
        let (start, due) =
            resolve_dates(None, Some(date(2026, 3, 1)), date(2026, 3, 1), 21).unwrap();
        assert_eq!(start, due);
    }

    #[test]
    fn due_before_start_is_rejected() {
        let err = resolve_dates(Some(date(2026, 3, 10)), Some(date(2026, 3, 9)), date(2026, 3, 1), 21)
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn extension_adds_configured_days_to_current_due_date() {
        let loan = open_loan(date(2026, 3, 22));
        assert_eq!(extended_due_date(&loan, None, 14).unwrap(), date(2026, 4, 5));
        assert_eq!(
            extended_due_date(&loan, Some(date(2026, 4, 1)), 14).unwrap(),
            date(2026, 4, 1)
        );
    }

    #[test]
    fn extension_must_move_due_date_forward() {
        let loan = open_loan(date(2026, 3, 22));
        let err = extended_due_date(&loan, Some(date(2026, 3, 22)), 14).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn returned_loan_cannot_be_extended() {
        let mut loan = open_loan(date(2026, 3, 22));
        loan.returned_at = Some(Utc::now());
        let err = extended_due_date(&loan, None, 14).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[test]
    fn far_future_start_date_is_a_bad_request() {
        let err = resolve_dates(Some(NaiveDate::MAX), None, date(2026, 3, 1), 21).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn explicit_due_date_skips_default_computation() {
        let (start, due) =
            resolve_dates(Some(NaiveDate::MAX), Some(NaiveDate::MAX), date(2026, 3, 1), 21).unwrap();
        assert_eq!(start, due);
    }

    #[test]
    fn extending_a_loan_due_at_the_end_of_time_is_a_bad_request() {
        let loan = open_loan(NaiveDate::MAX);
        let err = extended_due_date(&loan, None, 14).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
