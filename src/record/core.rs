//! The financial record model and its database functions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql, named_params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{RecordID, RowsAffected},
    user::UserID,
};

/// Whether a record is money coming in or going out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// Money received, stored as "pemasukan".
    Income,
    /// Money spent, stored as "pengeluaran".
    Expense,
}

impl RecordType {
    /// The stored names of every record type.
    pub const VALUES: &'static [&'static str] = &["pemasukan", "pengeluaran"];

    /// The name stored in the database and submitted by forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Income => "pemasukan",
            RecordType::Expense => "pengeluaran",
        }
    }

    /// The name shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            RecordType::Income => "Pemasukan",
            RecordType::Expense => "Pengeluaran",
        }
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pemasukan" => Ok(RecordType::Income),
            "pengeluaran" => Ok(RecordType::Expense),
            other => Err(Error::InvalidRecordType(other.to_owned())),
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for RecordType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RecordType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An income or expense entry owned by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRecord {
    pub id: RecordID,
    pub user_id: UserID,
    pub date: Date,
    pub record_type: RecordType,
    /// Free text, e.g. "gaji" or "makan".
    pub category: String,
    /// The amount in minor currency units.
    pub nominal: i64,
    pub description: Option<String>,
    pub attachment: Option<String>,
}

/// The data needed to create a record, or to replace the fields of an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// The user that owns the record.
    pub user_id: UserID,
    /// When the money came in or went out.
    pub date: Date,
    /// Whether the record is income or an expense.
    pub record_type: RecordType,
    /// Free text, e.g. "gaji" or "makan".
    pub category: String,
    /// The amount in minor currency units.
    pub nominal: i64,
    /// Optional notes.
    pub description: Option<String>,
    /// Optional reference to a receipt or other proof.
    pub attachment: Option<String>,
}

pub const RECORD_COLUMNS: &str =
    "id, user_id, date, type, category, nominal, description, attachment";

pub fn create_record_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS record (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            type TEXT NOT NULL,
            category TEXT NOT NULL,
            nominal INTEGER NOT NULL,
            description TEXT,
            attachment TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_record_user_date ON record(user_id, date);",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_record(row: &Row) -> Result<FinancialRecord, rusqlite::Error> {
    Ok(FinancialRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        record_type: row.get(3)?,
        category: row.get(4)?,
        nominal: row.get(5)?,
        description: row.get(6)?,
        attachment: row.get(7)?,
    })
}

/// Insert `record` into the database.
///
/// # Errors
/// Returns a:
/// - [Error::InvalidUser] if the owner does not exist,
/// - [Error::SqlError] if some other SQL error occurred.
pub fn create_record(record: &NewRecord, connection: &Connection) -> Result<FinancialRecord, Error> {
    let now = OffsetDateTime::now_utc();

    let id = connection
        .prepare(
            "INSERT INTO record
                (user_id, date, type, category, nominal, description, attachment, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING id",
        )?
        .query_row(
            (
                record.user_id,
                record.date,
                record.record_type,
                &record.category,
                record.nominal,
                &record.description,
                &record.attachment,
                now,
            ),
            |row| row.get(0),
        )?;

    Ok(FinancialRecord {
        id,
        user_id: record.user_id,
        date: record.date,
        record_type: record.record_type,
        category: record.category.clone(),
        nominal: record.nominal,
        description: record.description.clone(),
        attachment: record.attachment.clone(),
    })
}

/// Get the record `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the record does not exist or belongs to another user.
pub fn get_record(
    id: RecordID,
    user_id: UserID,
    connection: &Connection,
) -> Result<FinancialRecord, Error> {
    let record = connection
        .prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM record WHERE id = :id AND user_id = :user_id"
        ))?
        .query_one(named_params! {":id": id, ":user_id": user_id}, map_row_to_record)?;

    Ok(record)
}

/// Replace the fields of record `id` with `record`.
///
/// Only a record owned by `record.user_id` is changed.
pub fn update_record(
    id: RecordID,
    record: &NewRecord,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE record SET
                date = ?1, type = ?2, category = ?3, nominal = ?4,
                description = ?5, attachment = ?6, updated_at = ?7
            WHERE id = ?8 AND user_id = ?9",
            (
                record.date,
                record.record_type,
                &record.category,
                record.nominal,
                &record.description,
                &record.attachment,
                OffsetDateTime::now_utc(),
                id,
                record.user_id,
            ),
        )
        .map_err(Error::from)
}

/// Delete record `id` if it is owned by `user_id`.
pub fn delete_record(
    id: RecordID,
    user_id: UserID,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM record WHERE id = :id AND user_id = :user_id",
            named_params! {":id": id, ":user_id": user_id},
        )
        .map_err(Error::from)
}



#[cfg(test)]
mod record_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, PasswordHash,
        db::initialize,
        user::{NewUser, UserID, create_user},
    };

    use super::{
        NewRecord, RecordType, create_record, delete_record, get_record, update_record,
    };

    fn get_test_connection() -> (Connection, UserID, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let [user_id, other_user] = ["budi@example.com", "siti@example.com"].map(|email| {
            create_user(
                &NewUser {
                    name: "Test".to_owned(),
                    email: email.to_owned(),
                    password_hash: PasswordHash::new_unchecked("hash"),
                },
                &connection,
            )
            .unwrap()
            .id
        });

        (connection, user_id, other_user)
    }

    fn salary(user_id: UserID) -> NewRecord {
        NewRecord {
            user_id,
            date: date!(2024 - 01 - 05),
            record_type: RecordType::Income,
            category: "salary".to_owned(),
            nominal: 150_000,
            description: Some("January pay".to_owned()),
            attachment: None,
        }
    }

    #[test]
    fn create_and_get_record() {
        let (connection, user_id, _) = get_test_connection();

        let created = create_record(&salary(user_id), &connection).unwrap();
        let got = get_record(created.id, user_id, &connection).unwrap();

        assert_eq!(got, created);
        assert_eq!(got.nominal, 150_000);
        assert_eq!(got.record_type, RecordType::Income);
    }

    #[test]
    fn create_record_fails_for_missing_user() {
        let (connection, _, _) = get_test_connection();

        let result = create_record(&salary(UserID::new(999)), &connection);

        assert_eq!(result, Err(Error::InvalidUser));
    }

    #[test]
    fn get_record_of_other_user_is_not_found() {
        let (connection, user_id, other_user) = get_test_connection();
        let created = create_record(&salary(user_id), &connection).unwrap();

        assert_eq!(
            get_record(created.id, other_user, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn update_record_replaces_fields() {
        let (connection, user_id, _) = get_test_connection();
        let created = create_record(&salary(user_id), &connection).unwrap();
        let replacement = NewRecord {
            date: date!(2024 - 01 - 06),
            record_type: RecordType::Expense,
            category: "makan".to_owned(),
            nominal: 25_000,
            description: None,
            attachment: Some("struk.jpg".to_owned()),
            user_id,
        };

        let rows_affected = update_record(created.id, &replacement, &connection).unwrap();
        let got = get_record(created.id, user_id, &connection).unwrap();

        assert_eq!(rows_affected, 1);
        assert_eq!(got.date, date!(2024 - 01 - 06));
        assert_eq!(got.record_type, RecordType::Expense);
        assert_eq!(got.category, "makan");
        assert_eq!(got.nominal, 25_000);
        assert_eq!(got.description, None);
        assert_eq!(got.attachment.as_deref(), Some("struk.jpg"));
    }

    #[test]
    fn update_record_of_other_user_changes_nothing() {
        let (connection, user_id, other_user) = get_test_connection();
        let created = create_record(&salary(user_id), &connection).unwrap();

        let rows_affected =
            update_record(created.id, &salary(other_user), &connection).unwrap();

        assert_eq!(rows_affected, 0);
    }

    #[test]
    fn delete_removes_exactly_one_row() {
        let (connection, user_id, _) = get_test_connection();
        let created = create_record(&salary(user_id), &connection).unwrap();
        let kept = create_record(&salary(user_id), &connection).unwrap();

        let rows_affected = delete_record(created.id, user_id, &connection).unwrap();

        assert_eq!(rows_affected, 1);
        assert_eq!(
            get_record(created.id, user_id, &connection),
            Err(Error::NotFound)
        );
        assert!(get_record(kept.id, user_id, &connection).is_ok());
    }

    #[test]
    fn delete_missing_record_affects_no_rows() {
        let (connection, user_id, other_user) = get_test_connection();
        let created = create_record(&salary(user_id), &connection).unwrap();

        assert_eq!(delete_record(12345, user_id, &connection), Ok(0));
        assert_eq!(delete_record(created.id, other_user, &connection), Ok(0));
    }
}
