//! The monthly report: totals and transactions for a chosen month.

use std::{ops::Range, sync::Arc};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::{Date, Month};

use crate::{
    AppState, Error,
    auth::Session,
    backend::{DataApi, TransactionQuery},
    endpoints,
    html::{
        CARD_STYLE, EXPENSE_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, INCOME_STYLE,
        format_currency,
    },
    layout::protected_page,
    profile::ProfileState,
    summary::MonthSummary,
    timezone::local_today,
    transaction::{Transaction, view::transaction_item},
};

/// How many years, counting the current one, the year selector offers.
const SELECTABLE_YEARS: i32 = 5;

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// The state needed for the report page.
#[derive(Clone)]
pub struct ReportState {
    pub data: Arc<dyn DataApi>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            data: state.data.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The month to report on. Missing fields default to the current local month.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub month: Option<u8>,
    pub year: Option<i32>,
}

/// The dates of `month`, from its first day up to but excluding the first day
/// of the next month.
pub fn month_range(year: i32, month: Month) -> Result<Range<Date>, Error> {
    let start =
        Date::from_calendar_date(year, month, 1).map_err(|_| Error::InvalidYear(year))?;
    let end = match month {
        Month::December => Date::from_calendar_date(year + 1, Month::January, 1),
        month => Date::from_calendar_date(year, month.next(), 1),
    }
    .map_err(|_| Error::InvalidYear(year))?;

    Ok(start..end)
}

/// The years offered by the selector, newest first.
fn selectable_years(today: Date) -> impl Iterator<Item = i32> {
    let current_year = today.year();
    (0..SELECTABLE_YEARS).map(move |offset| current_year - offset)
}

/// Resolve the requested month, falling back to the month of `today`.
fn resolve_month(query: &ReportQuery, today: Date) -> Result<(i32, Month), Error> {
    let month = match query.month {
        Some(month) => Month::try_from(month).map_err(|_| Error::InvalidMonth(month))?,
        None => today.month(),
    };

    let year = query.year.unwrap_or(today.year());
    if !selectable_years(today).any(|selectable| selectable == year) {
        return Err(Error::InvalidYear(year));
    }

    Ok((year, month))
}

/// What the report shows below the selectors.
enum ReportData {
    Loaded {
        summary: MonthSummary,
        transactions: Vec<Transaction>,
    },
    Failed(String),
}

/// Display the totals and transactions of one month.
///
/// Issues one summary request and one transaction request. If either fails
/// the report shows an error message instead of partial data.
pub async fn get_report_page(
    State(state): State<ReportState>,
    State(profile_state): State<ProfileState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_response(),
    };

    let (status_code, year, month, data) = match resolve_month(&query, today)
        .and_then(|(year, month)| Ok((year, month, month_range(year, month)?)))
    {
        Ok((year, month, range)) => {
            let data = load_report(state.data.as_ref(), &session, year, month, range).await;
            (StatusCode::OK, year, month, data)
        }
        Err(error) => {
            tracing::warn!("Rejected report query {query:?}: {error}");
            (
                StatusCode::BAD_REQUEST,
                today.year(),
                today.month(),
                ReportData::Failed(error.to_string()),
            )
        }
    };

    let content = report_view(year, month, today, &data);
    let page = protected_page(
        &profile_state,
        &session,
        "Relatório Mensal",
        endpoints::REPORT_VIEW,
        &[],
        &content,
    )
    .await;

    (status_code, page).into_response()
}

async fn load_report(
    data: &dyn DataApi,
    session: &Session,
    year: i32,
    month: Month,
    range: Range<Date>,
) -> ReportData {
    let query = TransactionQuery::between(range);
    let (summary, transactions) = tokio::join!(
        data.month_summary(session, year, month),
        data.list_transactions(session, &query),
    );

    let mut errors = Vec::new();
    let summary = summary
        .inspect_err(|error| {
            tracing::error!("Could not load the summary for {month} {year}: {error}");
            errors.push("Não foi possível carregar o resumo.");
        })
        .ok();
    let transactions = transactions
        .inspect_err(|error| {
            tracing::error!("Could not load the transactions for {month} {year}: {error}");
            errors.push("Não foi possível carregar as transações.");
        })
        .ok();

    match (summary, transactions) {
        (Some(summary), Some(transactions)) => ReportData::Loaded {
            summary,
            transactions,
        },
        _ => ReportData::Failed(errors.join(" ")),
    }
}

fn report_view(year: i32, month: Month, today: Date, data: &ReportData) -> Markup {
    let selected_month = u8::from(month);

    html! {
        div
            id="report-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            h1 class="w-full text-2xl font-bold mb-4" { "Relatório Mensal" }

            form
                id="report-selectors"
                hx-get=(endpoints::REPORT_VIEW)
                hx-trigger="change"
                hx-target="#report-content"
                hx-select="#report-content"
                hx-swap="outerHTML"
                hx-push-url="true"
                class="w-full grid grid-cols-2 gap-4 mb-6"
            {
                div
                {
                    label for="month" class=(FORM_LABEL_STYLE) { "Mês" }
                    select id="month" name="month" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for (index, name) in MONTH_NAMES.iter().enumerate() {
                            @let value = index as u8 + 1;
                            option value=(value) selected[value == selected_month] { (name) }
                        }
                    }
                }

                div
                {
                    label for="year" class=(FORM_LABEL_STYLE) { "Ano" }
                    select id="year" name="year" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for option_year in selectable_years(today) {
                            option value=(option_year) selected[option_year == year] { (option_year) }
                        }
                    }
                }
            }

            @match data {
                ReportData::Loaded { summary, transactions } => {
                    (month_summary_view(summary))
                    (month_transactions_view(transactions))
                }
                ReportData::Failed(message) => {
                    p id="report-error" class="w-full text-red-600 dark:text-red-400" { (message) }
                }
            }
        }
    }
}

fn month_summary_view(summary: &MonthSummary) -> Markup {
    let balance = summary.balance();
    let balance_style = if balance >= 0.0 {
        INCOME_STYLE
    } else {
        EXPENSE_STYLE
    };

    html! {
        section id="report-summary" class="w-full grid grid-cols-1 md:grid-cols-3 gap-4 mb-6"
        {
            div id="report-income" class=(CARD_STYLE)
            {
                h3 class="text-sm font-medium" { "Receitas" }
                p class={ "text-2xl font-bold " (INCOME_STYLE) } { "+ " (format_currency(summary.total_income)) }
            }
            div id="report-expense" class=(CARD_STYLE)
            {
                h3 class="text-sm font-medium" { "Despesas" }
                p class={ "text-2xl font-bold " (EXPENSE_STYLE) } { "- " (format_currency(summary.total_expense)) }
            }
            div id="report-balance" class=(CARD_STYLE)
            {
                h3 class="text-sm font-medium" { "Saldo" }
                p class={ "text-2xl font-bold " (balance_style) } { (format_currency(balance)) }
            }
        }
    }
}

fn month_transactions_view(transactions: &[Transaction]) -> Markup {
    html! {
        section id="report-transactions" class=(CARD_STYLE)
        {
            h2 class="text-xl font-semibold mb-2" { "Transações do Mês" }

            @if transactions.is_empty() {
                p class="text-gray-500 dark:text-gray-400"
                {
                    "Nenhuma transação encontrada para este período."
                }
            } @else {
                ul class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for transaction in transactions {
                        (transaction_item(transaction))
                    }
                }
            }
        }
    }
}
