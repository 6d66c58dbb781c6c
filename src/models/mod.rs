//! Data models for Bibliotheek

pub mod book;
pub mod category;
pub mod language;
pub mod loan;
pub mod member;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookShort};
pub use category::Category;
pub use language::Language;
pub use loan::{Loan, LoanDetails};
pub use member::{Member, MemberShort};
pub use user::{Role, User, UserClaims};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Resolved page window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    /// Clamp user-supplied paging to `page >= 1` and `1..=MAX_PER_PAGE`
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Row offset; saturates so a huge page number yields an empty page
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page() {
        let page = Page::new(None, None);
        assert_eq!(page, Page { page: 1, per_page: 20 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Page::new(Some(0), Some(0)), Page { page: 1, per_page: 1 });
        assert_eq!(Page::new(Some(-4), Some(5000)).per_page, MAX_PER_PAGE);
        assert_eq!(Page::new(Some(3), Some(25)).offset(), 50);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let page = Page::new(Some(i64::MAX), Some(100));
        assert_eq!(page.offset(), i64::MAX);
        assert!(page.offset() >= 0);
    }
}
