//! Calendar months used to filter transactions and to key budgets.

use std::{fmt::Display, str::FromStr};

use time::{Date, Duration};

use crate::Error;

const MONTH_NAMES: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль", "Август", "Сентябрь",
    "Октябрь", "Ноябрь", "Декабрь",
];

/// A calendar month, represented by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(Date);

impl Month {
    /// The month that contains `date`.
    pub fn containing(date: Date) -> Self {
        Self(date - Duration::days(i64::from(date.day()) - 1))
    }

    /// The first day of the month, which is how budgets store their month.
    pub fn first_day(&self) -> Date {
        self.0
    }

    /// The last day of the month, accounting for leap years.
    pub fn last_day(&self) -> Date {
        let length = self.0.month().length(self.0.year());

        self.0 + Duration::days(i64::from(length) - 1)
    }

    /// The month before this one, or `None` before the earliest representable date.
    pub fn previous(&self) -> Option<Self> {
        self.0.previous_day().map(Self::containing)
    }

    /// The month after this one, or `None` past the latest representable date.
    pub fn next(&self) -> Option<Self> {
        self.last_day().next_day().map(Self)
    }

    /// A human readable name such as "Февраль 2024".
    pub fn label(&self) -> String {
        let index = usize::from(u8::from(self.0.month())) - 1;

        format!("{} {}", MONTH_NAMES[index], self.0.year())
    }

    /// `count` months ending with (and including) this month, newest first.
    pub fn recent(self, count: usize) -> Vec<Month> {
        let mut months = Vec::with_capacity(count);
        let mut month = Some(self);

        while let Some(current) = month {
            if months.len() == count {
                break;
            }

            months.push(current);
            month = current.previous();
        }

        months
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Parse "YYYY-MM" as produced by `<input type="month">`, or a full "YYYY-MM-DD"
    /// date which is normalised to its month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMonth(s.to_owned());
        let mut parts = s.trim().split('-');

        let year: i32 = parts
            .next()
            .and_then(|year| year.parse().ok())
            .ok_or_else(invalid)?;
        let month: u8 = parts
            .next()
            .and_then(|month| month.parse().ok())
            .ok_or_else(invalid)?;
        let day: u8 = match parts.next() {
            Some(day) => day.parse().map_err(|_| invalid())?,
            None => 1,
        };

        if parts.next().is_some() {
            return Err(invalid());
        }

        let month = time::Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;

        Ok(Self::containing(date))
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), u8::from(self.0.month()))
    }
}
