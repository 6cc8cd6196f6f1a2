//! The income/expense discriminator shared by categories and transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Whether money comes in or goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Income,
    Expense,
}

impl Kind {
    /// The value stored in the database and used in forms and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Income => "income",
            Kind::Expense => "expense",
        }
    }

    /// The singular label shown to users, also used in CSV exports.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Income => "Доход",
            Kind::Expense => "Расход",
        }
    }

    /// The plural label used for headings and tabs.
    pub fn plural_label(&self) -> &'static str {
        match self {
            Kind::Income => "Доходы",
            Kind::Expense => "Расходы",
        }
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Kind::Income),
            "expense" => Ok(Kind::Expense),
            other => Err(Error::InvalidKind(other.to_owned())),
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Kind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Kind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// Parse an optional filter value where an empty string or "all" means no filter.
pub fn parse_kind_filter(raw: Option<&str>) -> Option<Kind> {
    match raw {
        None | Some("") | Some("all") => None,
        Some(raw) => raw.parse().ok(),
    }
}
