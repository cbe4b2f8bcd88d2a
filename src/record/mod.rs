//! Financial records: the model, monthly totals, and the pages for managing records.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod download;
mod edit_endpoint;
mod filter;
mod form;
mod view;

pub use core::{FinancialRecord, NewRecord, RecordType, create_record, create_record_table};
pub use create_endpoint::{create_record_endpoint, get_create_record_page};
pub use delete_endpoint::delete_record_endpoint;
pub use download::download_records_endpoint;
pub use edit_endpoint::{edit_record_endpoint, get_edit_record_page};
pub use filter::{MonthYear, RecordFilter, RecordQuery, Totals, compute_totals, list_records};
pub use view::{records_table, totals_view};
