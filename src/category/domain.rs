//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserID, kind::Kind};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty after
    /// trimming.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a category.
pub type CategoryId = i64;

/// A user's bucket for either income or expense transactions, e.g. "Продукты".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserID,
    pub name: CategoryName,
    pub kind: Kind,
}

/// Form data for category creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewCategoryFormData {
    pub name: String,
    pub kind: Kind,
}

/// Form data for renaming a category.
#[derive(Debug, Serialize, Deserialize)]
pub struct RenameCategoryFormData {
    pub name: String,
}

/// The expense categories every new user starts with.
pub const DEFAULT_EXPENSE_CATEGORIES: [&str; 6] =
    ["Продукты", "Кафе", "Жилье", "Транспорт", "Подарки", "Другое"];

/// The income categories every new user starts with.
pub const DEFAULT_INCOME_CATEGORIES: [&str; 4] = ["Зарплата", "Подработка", "Подарки", "Другое"];
