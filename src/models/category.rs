//! Book category model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book category
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    /// Number of non-deleted books in this category
    #[sqlx(default)]
    #[serde(default)]
    pub nb_books: i64,
}

/// Create or rename a category
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
}

impl CategoryInput {
    /// Input with surrounding whitespace removed from the name
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_fails_once_trimmed() {
        let input = CategoryInput { name: "   ".into() }.trimmed();
        assert!(input.validate().is_err());
    }

    #[test]
    fn trimmed_name_is_kept() {
        let input = CategoryInput { name: "  Poëzie ".into() }.trimmed();
        assert!(input.validate().is_ok());
        assert_eq!(input.name, "Poëzie");
    }
}
