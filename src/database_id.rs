//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseID = i64;

/// The ID of a financial record.
pub type RecordID = DatabaseID;

/// The number of rows changed by an `UPDATE` or `DELETE` statement.
pub type RowsAffected = usize;
