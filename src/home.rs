//! The home page: a month of the user's records with their totals.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, ERROR_TEXT_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, PAGE_CONTAINER_STYLE, base, flash_messages,
    },
    navigation::NavBar,
    record::{
        FinancialRecord, MonthYear, RecordFilter, RecordQuery, Totals, compute_totals,
        list_records, records_table, totals_view,
    },
    session::{FlashCategory, SESSION_NAME, SessionStore},
    timezone::local_today,
    user::UserID,
};

/// How many months, ending with the current one, the month dropdown offers.
const MONTH_CHOICES: usize = 6;

/// The state needed for the home page.
#[derive(Debug, Clone)]
pub struct HomeState {
    pub sessions: SessionStore,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Jakarta".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for HomeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            sessions: state.sessions.clone(),
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

enum HomeData {
    Loaded {
        filter: RecordFilter,
        totals: Totals,
        records: Vec<FinancialRecord>,
    },
    Failed {
        message: String,
    },
}

struct HomeView<'a> {
    flashes: &'a [(FlashCategory, String)],
    months: &'a [MonthYear],
    selected_month: &'a str,
    income_only: bool,
    expense_only: bool,
    data: &'a HomeData,
}

fn filter_form(view: &HomeView<'_>) -> Markup {
    let selected_is_listed = view
        .months
        .iter()
        .any(|month| month.to_string() == view.selected_month);

    html! {
        form method="get" action=(endpoints::HOME) class="flex flex-wrap items-end gap-4 w-full max-w-4xl"
        {
            div
            {
                label for="selected_month" class=(FORM_LABEL_STYLE) { "Bulan" }

                select name="selected_month" id="selected_month" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @if !selected_is_listed {
                        option value=(view.selected_month) selected { (view.selected_month) }
                    }

                    @for month in view.months {
                        @let label = month.to_string();
                        option value=(label) selected[label == view.selected_month] { (label) }
                    }
                }
            }

            div class="flex items-center gap-x-2"
            {
                input type="checkbox" name="pemasukanOnly" id="pemasukanOnly" value="true" checked[view.income_only];
                label for="pemasukanOnly" class="text-sm" { "Pemasukan" }
            }

            div class="flex items-center gap-x-2"
            {
                input type="checkbox" name="pengeluaranOnly" id="pengeluaranOnly" value="true" checked[view.expense_only];
                label for="pengeluaranOnly" class="text-sm" { "Pengeluaran" }
            }

            div
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Tampilkan" }
            }
        }
    }
}

fn home_view(view: &HomeView<'_>) -> Markup {
    let nav_bar = NavBar::new(endpoints::HOME).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl" { (flash_messages(view.flashes)) }

            div class="flex justify-between items-center w-full max-w-4xl mb-4"
            {
                h1 class="text-2xl font-bold" { "Data Keuangan" }

                a href=(endpoints::ADD_RECORD) class=(LINK_STYLE) { "Tambah Data" }
            }

            (filter_form(view))

            @match view.data {
                HomeData::Loaded { filter, totals, records } => {
                    (totals_view(totals))
                    (records_table(records, true))

                    a
                        href={ (endpoints::DOWNLOAD_RECORD) "?" (filter.query_string()) }
                        class={ (LINK_STYLE) " my-4" }
                    {
                        "Unduh Laporan"
                    }
                }
                HomeData::Failed { message } => {
                    p class=(ERROR_TEXT_STYLE) { (message) }
                }
            }
        }
    };

    base("Home", &content)
}

fn load(filter: &RecordFilter, connection: &Connection) -> Result<(Totals, Vec<FinancialRecord>), Error> {
    let totals = compute_totals(filter, connection)?;
    let records = list_records(filter, connection)?;

    Ok((totals, records))
}

/// Display the user's records and totals for the selected month, the current month by default.
///
/// Pending flash messages are shown once and then cleared from the session.
pub async fn get_home_page(
    State(state): State<HomeState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
    Query(query): Query<RecordQuery>,
) -> Response {
    let Some(today) = local_today(&state.local_timezone) else {
        tracing::error!("could not get today's date for timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let current_month = MonthYear::from_date(today);
    let months = MonthYear::recent(current_month, MONTH_CHOICES);
    let selected_month = query.month_label(current_month);

    let data = match RecordFilter::new(
        user_id,
        &selected_month,
        query.income_only(),
        query.expense_only(),
    ) {
        Ok(filter) => {
            let result = match state.db_connection.lock() {
                Ok(connection) => load(&filter, &connection),
                Err(error) => {
                    tracing::error!("could not acquire database lock: {error}");
                    Err(Error::DatabaseLockError)
                }
            };

            match result {
                Ok((totals, records)) => HomeData::Loaded {
                    filter,
                    totals,
                    records,
                },
                Err(error) => {
                    tracing::error!("could not get records for user {user_id}: {error}");
                    HomeData::Failed {
                        message: format!("Gagal mendapatkan data keuangan, {error}"),
                    }
                }
            }
        }
        Err(error) => {
            tracing::warn!("invalid home query {query:?}: {error}");
            HomeData::Failed {
                message: format!("Bulan tidak valid: {selected_month}"),
            }
        }
    };

    let mut session = state.sessions.get(&jar, SESSION_NAME);
    let flashes = session.take_flashes();

    let page = home_view(&HomeView {
        flashes: &flashes,
        months: &months,
        selected_month: &selected_month,
        income_only: query.income_only(),
        expense_only: query.expense_only(),
        data: &data,
    });

    if flashes.is_empty() {
        page.into_response()
    } else {
        (state.sessions.save(jar, &session), page).into_response()
    }
}
