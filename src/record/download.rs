//! Defines the endpoint for downloading a month of records as a report or CSV file.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, endpoints,
    html::{ERROR_TEXT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    record::{
        core::FinancialRecord,
        filter::{MonthYear, RecordFilter, RecordQuery, Totals, compute_totals, list_records},
        view::{records_table, totals_view},
    },
    timezone::local_today,
    user::UserID,
};

/// The state needed to download records.
#[derive(Debug, Clone)]
pub struct DownloadState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Jakarta".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DownloadState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Selects the download format, a printable HTML report unless `format=csv`.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadFormat {
    pub format: Option<String>,
}

impl DownloadFormat {
    fn is_csv(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("csv"))
    }
}

const CSV_HEADER: [&str; 7] = [
    "No",
    "Tanggal",
    "Tipe",
    "Kategori",
    "Nominal",
    "Deskripsi",
    "Lampiran",
];

/// Quote free text that a spreadsheet would otherwise run as a formula.
fn spreadsheet_text(text: &str) -> String {
    match text.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{text}"),
        _ => text.to_owned(),
    }
}

fn write_csv(records: &[FinancialRecord]) -> Result<Vec<u8>, Error> {
    let csv_error = |error: csv::Error| Error::CsvError(error.to_string());
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(csv_error)?;

    for (index, record) in records.iter().enumerate() {
        writer
            .write_record([
                (index + 1).to_string(),
                record.date.to_string(),
                record.record_type.as_str().to_owned(),
                spreadsheet_text(&record.category),
                record.nominal.to_string(),
                spreadsheet_text(record.description.as_deref().unwrap_or_default()),
                spreadsheet_text(record.attachment.as_deref().unwrap_or_default()),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

fn csv_response(filter: &RecordFilter, records: &[FinancialRecord]) -> Response {
    let body = match write_csv(records) {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("could not write records as CSV: {error}");
            return error.into_response();
        }
    };

    let file_name = format!(
        "laporan_keuangan_{}.csv",
        filter.period.to_string().replace(' ', "_")
    );

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

enum Report<'a> {
    Loaded {
        filter: &'a RecordFilter,
        totals: Totals,
        records: &'a [FinancialRecord],
    },
    Failed {
        month_label: &'a str,
        message: &'a str,
    },
}

fn report_view(report: &Report<'_>) -> Markup {
    let month_label = match report {
        Report::Loaded { filter, .. } => filter.period.to_string(),
        Report::Failed { month_label, .. } => (*month_label).to_owned(),
    };

    let content = html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-2xl font-bold" { "Laporan Keuangan " (month_label) }

            @match report {
                Report::Loaded { filter, totals, records } => {
                    @if filter.income_only {
                        p class="text-sm" { "Hanya pemasukan" }
                    }
                    @if filter.expense_only {
                        p class="text-sm" { "Hanya pengeluaran" }
                    }

                    (totals_view(totals))
                    (records_table(records, false))

                    a
                        href={ (endpoints::DOWNLOAD_RECORD) "?" (filter.query_string()) "&format=csv" }
                        class={ (LINK_STYLE) " my-4" }
                    {
                        "Unduh CSV"
                    }
                }
                Report::Failed { message, .. } => {
                    p class=(ERROR_TEXT_STYLE) { (message) }
                }
            }

            a href=(endpoints::HOME) class=(LINK_STYLE) { "Kembali" }
        }
    };

    base("Laporan Keuangan", &content)
}

/// Download the user's records for the selected month.
///
/// Takes the same query parameters as the home page, plus `format=csv` for a CSV file.
pub async fn download_records_endpoint(
    State(state): State<DownloadState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<RecordQuery>,
    Query(format): Query<DownloadFormat>,
) -> Response {
    let Some(today) = local_today(&state.local_timezone) else {
        tracing::error!("could not get today's date for timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let month_label = query.month_label(MonthYear::from_date(today));

    let filter = match RecordFilter::new(
        user_id,
        &month_label,
        query.income_only(),
        query.expense_only(),
    ) {
        Ok(filter) => filter,
        Err(error) => {
            tracing::warn!("invalid download query {query:?}: {error}");
            let page = report_view(&Report::Failed {
                month_label: &month_label,
                message: &format!("Bulan tidak valid: {month_label}"),
            });
            return (StatusCode::BAD_REQUEST, page).into_response();
        }
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => compute_totals(&filter, &connection)
            .and_then(|totals| Ok((totals, list_records(&filter, &connection)?))),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    let (totals, records) = match result {
        Ok(loaded) => loaded,
        Err(error) => {
            tracing::error!("could not get records for user {user_id}: {error}");
            let page = report_view(&Report::Failed {
                month_label: &month_label,
                message: &format!("Gagal mendapatkan data keuangan, {error}"),
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, page).into_response();
        }
    };

    if format.is_csv() {
        return csv_response(&filter, &records);
    }

    report_view(&Report::Loaded {
        filter: &filter,
        totals,
        records: &records,
    })
    .into_response()
}
