//! Loan model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Set when the book is brought back; open while null
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date < today
    }
}

/// Loan joined with book and member for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_isbn: String,
    pub member_id: i32,
    pub member_name: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_overdue: bool,
}

/// Loan query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Only loans without a return date
    pub open: Option<bool>,
    /// Only open loans past their due date
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub book_id: i32,
    pub member_id: i32,
    /// Defaults to today
    pub start_date: Option<NaiveDate>,
    /// Defaults to start date plus the configured loan duration
    pub due_date: Option<NaiveDate>,
}

/// Extend loan request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ExtendLoan {
    /// Explicit new due date; defaults to the current one plus the configured extension
    pub due_date: Option<NaiveDate>,
}

/// Loan values ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_id: i32,
    pub member_id: i32,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(due: NaiveDate, returned_at: Option<DateTime<Utc>>) -> Loan {
        Loan {
            id: 1,
            book_id: 1,
            member_id: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            due_date: due,
            returned_at,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn open_loan_past_due_date_is_overdue() {
        let due = NaiveDate::from_ymd_opt(2026, 1, 22).unwrap();
        let l = loan(due, None);
        assert!(l.is_open());
        assert!(!l.is_overdue(due));
        assert!(l.is_overdue(due.succ_opt().unwrap()));
    }

    #[test]
    fn returned_loan_is_never_overdue() {
        let due = NaiveDate::from_ymd_opt(2026, 1, 22).unwrap();
        let l = loan(due, Some(Utc::now()));
        assert!(!l.is_open());
        assert!(!l.is_overdue(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()));
    }
}
