//! Monthly filtering and totals for financial records.
//!
//! [compute_totals] and [list_records] build their `WHERE` clause from the
//! same [RecordFilter], so the totals always add up the listed records.

use std::fmt::Display;

use rusqlite::{Connection, ToSql};
use serde::Deserialize;
use time::{Date, Month};

use crate::{
    Error,
    record::core::{FinancialRecord, RECORD_COLUMNS, RecordType, map_row_to_record},
    user::UserID,
};

/// A calendar month, displayed and parsed as labels such as "January 2024".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthYear {
    pub month: Month,
    pub year: i32,
}

impl MonthYear {
    pub fn from_date(date: Date) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }

    /// Parse a label such as "January 2024".
    ///
    /// Month names are matched case-insensitively.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonthLabel] if `label` is not a month name followed by a year.
    pub fn parse(label: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidMonthLabel(label.to_owned());

        let (month_name, year) = label.trim().split_once(' ').ok_or_else(invalid)?;
        let year: i32 = year.trim().parse().map_err(|_| invalid())?;
        let month = (1u8..=12)
            .filter_map(|number| Month::try_from(number).ok())
            .find(|month| month.to_string().eq_ignore_ascii_case(month_name))
            .ok_or_else(invalid)?;

        Ok(Self { month, year })
    }

    pub fn previous(self) -> Self {
        match self.month {
            Month::January => Self {
                month: Month::December,
                year: self.year - 1,
            },
            month => Self {
                month: month.previous(),
                year: self.year,
            },
        }
    }

    /// `count` months ending with `latest`, newest first.
    pub fn recent(latest: Self, count: usize) -> Vec<Self> {
        std::iter::successors(Some(latest), |month| Some(month.previous()))
            .take(count)
            .collect()
    }
}

impl Display for MonthYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.month, self.year)
    }
}

/// The query string accepted by the pages that show a month of records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordQuery {
    /// A month label such as "January 2024", defaults to the current month.
    pub selected_month: Option<String>,
    /// Only include income when set to "true".
    #[serde(rename = "pemasukanOnly")]
    pub income_only: Option<String>,
    /// Only include expenses when set to "true".
    #[serde(rename = "pengeluaranOnly")]
    pub expense_only: Option<String>,
}

impl RecordQuery {
    pub fn income_only(&self) -> bool {
        self.income_only.as_deref() == Some("true")
    }

    pub fn expense_only(&self) -> bool {
        self.expense_only.as_deref() == Some("true")
    }

    /// The selected month label, or `default` if none was selected.
    pub fn month_label(&self, default: MonthYear) -> String {
        match self.selected_month.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_owned(),
            _ => default.to_string(),
        }
    }
}

/// Selects one user's records for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    pub user_id: UserID,
    pub period: MonthYear,
    /// Restrict to income records.
    pub income_only: bool,
    /// Restrict to expense records.
    ///
    /// Setting both flags selects no records, since a record cannot be both.
    pub expense_only: bool,
    month_number: u8,
}

impl RecordFilter {
    /// Create a filter for `month_label`, e.g. "January 2024".
    ///
    /// # Errors
    /// Returns [Error::InvalidMonthLabel] if the label cannot be parsed.
    pub fn new(
        user_id: UserID,
        month_label: &str,
        income_only: bool,
        expense_only: bool,
    ) -> Result<Self, Error> {
        let period = MonthYear::parse(month_label)?;

        Ok(Self {
            user_id,
            period,
            income_only,
            expense_only,
            month_number: period.month.into(),
        })
    }

    /// The query string that selects this filter, e.g. for links to the download page.
    pub fn query_string(&self) -> String {
        let label = self.period.to_string();
        let mut params = vec![("selected_month", label.as_str())];

        if self.income_only {
            params.push(("pemasukanOnly", "true"));
        }

        if self.expense_only {
            params.push(("pengeluaranOnly", "true"));
        }

        serde_urlencoded::to_string(params).unwrap_or_default()
    }

    fn where_clause(&self) -> String {
        let mut clause = "user_id = :user_id \
            AND CAST(strftime('%m', date) AS INTEGER) = :month \
            AND CAST(strftime('%Y', date) AS INTEGER) = :year"
            .to_owned();

        if self.income_only {
            clause.push_str(&format!(" AND type = '{}'", RecordType::Income.as_str()));
        }

        if self.expense_only {
            clause.push_str(&format!(" AND type = '{}'", RecordType::Expense.as_str()));
        }

        clause
    }

    fn params(&self) -> [(&'static str, &dyn ToSql); 3] {
        [
            (":user_id", &self.user_id),
            (":month", &self.month_number),
            (":year", &self.period.year),
        ]
    }
}

/// The summed income and expenses of a set of records.
///
/// The sums are wider than a single nominal so that a month of large amounts
/// cannot overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub income: i128,
    pub expense: i128,
}

impl Totals {
    /// Income minus expenses.
    pub fn balance(&self) -> i128 {
        self.income - self.expense
    }

    fn add(mut self, record_type: RecordType, nominal: i64) -> Self {
        match record_type {
            RecordType::Income => self.income += i128::from(nominal),
            RecordType::Expense => self.expense += i128::from(nominal),
        }

        self
    }
}

/// Sum the income and expenses of the records selected by `filter`.
///
/// The rows are summed here rather than with SQL `SUM`, which fails once the
/// total no longer fits in an `i64`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn compute_totals(filter: &RecordFilter, connection: &Connection) -> Result<Totals, Error> {
    let params = filter.params();

    connection
        .prepare(&format!(
            "SELECT type, nominal FROM record WHERE {}",
            filter.where_clause()
        ))?
        .query_map(params.as_slice(), |row| {
            Ok((row.get::<_, RecordType>(0)?, row.get::<_, i64>(1)?))
        })?
        .try_fold(Totals::default(), |totals, row| {
            let (record_type, nominal) = row?;
            Ok::<_, Error>(totals.add(record_type, nominal))
        })
}

/// Get the records selected by `filter`.
///
/// The rows are returned in the order the database yields them.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_records(
    filter: &RecordFilter,
    connection: &Connection,
) -> Result<Vec<FinancialRecord>, Error> {
    let params = filter.params();

    connection
        .prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM record WHERE {}",
            filter.where_clause()
        ))?
        .query_map(params.as_slice(), map_row_to_record)?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}
