//! Dashboard HTTP handler and view rendering.
//!
//! The dashboard shows the current month's totals, the monthly income and
//! expense series and the most recent transactions. Every aggregate comes
//! from the backend as is.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState,
    auth::Session,
    backend::{BackendError, DataApi, TransactionQuery},
    dashboard::{
        cards::summary_cards_view,
        charts::{DashboardChart, charts_script, charts_view, month_chart, monthly_chart},
    },
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE, HeadElement},
    layout::protected_page,
    profile::ProfileState,
    summary::{MonthlySummary, MonthlyTotals},
    transaction::{Transaction, view::transaction_item},
};

/// How many transactions the dashboard lists.
const RECENT_TRANSACTIONS: usize = 5;

/// The state needed for displaying the dashboard page.
#[derive(Clone)]
pub struct DashboardState {
    pub data: Arc<dyn DataApi>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            data: state.data.clone(),
        }
    }
}

/// The backend aggregates shown in the summary area.
struct Aggregates {
    summary: MonthlySummary,
    monthly_totals: Vec<MonthlyTotals>,
}

/// Display a page with an overview of the user's finances.
///
/// The two aggregates and the recent transactions are requested at the same
/// time. If either aggregate fails the summary area shows an error; a failed
/// transaction list is logged and shown as empty.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    State(profile_state): State<ProfileState>,
    Extension(session): Extension<Session>,
) -> Response {
    let recent_query = TransactionQuery::recent(RECENT_TRANSACTIONS);
    let (summary, monthly_totals, recent) = tokio::join!(
        state.data.monthly_summary(&session),
        state.data.income_expense_by_month(&session),
        state.data.list_transactions(&session, &recent_query),
    );

    let aggregates = collect_aggregates(summary, monthly_totals);
    let recent = recent.unwrap_or_else(|error| {
        tracing::error!("Could not load recent transactions: {error}");
        Vec::new()
    });

    let charts = aggregates.as_ref().map(build_dashboard_charts).ok();
    let mut head_elements = Vec::new();
    if let Some(charts) = &charts {
        head_elements.push(HeadElement::ScriptLink(
            "/static/echarts.6.0.0.min.js".to_owned(),
        ));
        head_elements.push(charts_script(charts));
    }

    let content = dashboard_view(
        &aggregates,
        charts.as_ref().map(|charts| charts.as_slice()),
        &recent,
    );

    protected_page(
        &profile_state,
        &session,
        "Dashboard",
        endpoints::ROOT,
        &head_elements,
        &content,
    )
    .await
    .into_response()
}

fn collect_aggregates(
    summary: Result<MonthlySummary, BackendError>,
    monthly_totals: Result<Vec<MonthlyTotals>, BackendError>,
) -> Result<Aggregates, BackendError> {
    let summary = summary
        .inspect_err(|error| tracing::error!("Could not load the monthly summary: {error}"))?;
    let monthly_totals = monthly_totals.inspect_err(|error| {
        tracing::error!("Could not load income and expense by month: {error}")
    })?;

    Ok(Aggregates {
        summary,
        monthly_totals,
    })
}

fn build_dashboard_charts(aggregates: &Aggregates) -> [DashboardChart; 2] {
    [
        DashboardChart {
            id: "monthly-chart",
            options: monthly_chart(&aggregates.monthly_totals).to_string(),
        },
        DashboardChart {
            id: "month-chart",
            options: month_chart(&aggregates.summary).to_string(),
        },
    ]
}

fn summary_error_view(error: &BackendError) -> Markup {
    html! {
        div
            id="summary-error"
            role="alert"
            class="w-full p-4 mb-6 text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400"
        {
            p class="font-medium" { "Não foi possível carregar o resumo financeiro." }
            p class="text-sm" { (error.message) }
        }
    }
}

fn dashboard_view(
    aggregates: &Result<Aggregates, BackendError>,
    charts: Option<&[DashboardChart]>,
    recent: &[Transaction],
) -> Markup {
    html! {
        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            h1 class="w-full text-2xl font-bold mb-4" { "Dashboard" }

            @match aggregates {
                Ok(aggregates) => { (summary_cards_view(&aggregates.summary)) }
                Err(error) => { (summary_error_view(error)) }
            }

            @if let Some(charts) = charts {
                (charts_view(charts))
            }

            div class="w-full grid grid-cols-1 lg:grid-cols-3 gap-4"
            {
                section id="recent-transactions" class={ (CARD_STYLE) " lg:col-span-2" }
                {
                    h2 class="text-xl font-semibold mb-2" { "Últimas Transações" }

                    @if recent.is_empty() {
                        p class="text-gray-500 dark:text-gray-400" { "Nenhuma transação ainda." }
                    } @else {
                        ul class="divide-y divide-gray-200 dark:divide-gray-700"
                        {
                            @for transaction in recent {
                                (transaction_item(transaction))
                            }
                        }
                    }
                }

                nav id="quick-links" class={ (CARD_STYLE) " flex flex-col gap-2" }
                {
                    a href=(endpoints::TRANSACTIONS_VIEW) class=(BUTTON_PRIMARY_STYLE)
                    {
                        "Adicionar Nova Transação"
                    }
                    a href=(endpoints::REPORT_VIEW) class=(BUTTON_SECONDARY_STYLE)
                    {
                        "Ver Relatórios Mensais"
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod dashboard_tests {
    use std::sync::Arc;

    use axum::{Extension, extract::State, http::StatusCode, response::Response};
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        auth::{SessionContext, UserId},
        backend::{Call, FakeBackend, Operation, TransactionQuery, test_session},
        endpoints,
        profile::{ProfileCache, ProfileState},
        summary::{MonthlySummary, MonthlyTotals},
        test_utils::{assert_valid_html, parse_html_document},
        transaction::{Transaction, TransactionType},
    };

    use super::{DashboardState, get_dashboard_page};

    fn transaction(id: i64, description: &str, day: u8) -> Transaction {
        Transaction {
            id,
            description: description.to_owned(),
            amount: 10.0,
            transaction_type: TransactionType::Expense,
            date: date!(2024 - 03 - 01)
                .replace_day(day)
                .expect("valid day in March"),
            category_id: None,
            user_id: UserId::new("user-1"),
            category_name: None,
        }
    }

    async fn render(backend: FakeBackend) -> (Arc<FakeBackend>, Response) {
        let backend = Arc::new(backend.with_session(test_session()));
        let session = SessionContext::resolved(Some(test_session()));
        let profile_state = ProfileState {
            auth: backend.clone(),
            data: backend.clone(),
            profiles: Arc::new(ProfileCache::new(&session)),
        };

        let response = get_dashboard_page(
            State(DashboardState {
                data: backend.clone(),
            }),
            State(profile_state),
            Extension(test_session()),
        )
        .await;

        (backend, response)
    }

    fn select_text(html: &Html, selector: &str) -> Option<String> {
        html.select(&Selector::parse(selector).unwrap())
            .next()
            .map(|element| element.text().collect())
    }

    #[tokio::test]
    async fn dashboard_requests_aggregates_and_five_recent_transactions() {
        let (backend, response) = render(FakeBackend::new()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let calls = backend.calls();
        assert!(calls.contains(&Call::MonthlySummary));
        assert!(calls.contains(&Call::IncomeExpenseByMonth));
        assert!(calls.contains(&Call::ListTransactions(TransactionQuery::recent(5))));
    }

    #[tokio::test]
    async fn dashboard_shows_cards_charts_and_links() {
        let (_, response) = render(
            FakeBackend::new()
                .with_monthly_summary(MonthlySummary {
                    total_income: 5000.0,
                    total_expense: 1250.5,
                })
                .with_monthly_totals(vec![MonthlyTotals {
                    month: "2024-03".to_owned(),
                    income: 5000.0,
                    expense: 1250.5,
                }]),
        )
        .await;

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert!(
            select_text(&html, "#balance-card")
                .unwrap()
                .contains("R$ 3.749,50")
        );
        for id in ["#monthly-chart", "#month-chart"] {
            assert!(
                html.select(&Selector::parse(id).unwrap()).next().is_some(),
                "missing chart {id}"
            );
        }
        let links: Vec<_> = html
            .select(&Selector::parse("#quick-links a").unwrap())
            .filter_map(|link| link.value().attr("href"))
            .collect();
        assert_eq!(
            links,
            vec![endpoints::TRANSACTIONS_VIEW, endpoints::REPORT_VIEW]
        );
    }

    #[tokio::test]
    async fn aggregate_failure_renders_inline_error() {
        let (_, response) = render(
            FakeBackend::new()
                .failing(Operation::MonthlySummary)
                .with_transactions(vec![transaction(1, "Padaria", 2)]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert!(
            select_text(&html, "#summary-error")
                .unwrap()
                .contains("simulated MonthlySummary failure")
        );
        assert!(select_text(&html, "#summary-cards").is_none());
        assert!(select_text(&html, "#charts").is_none());
        assert!(
            select_text(&html, "#recent-transactions")
                .unwrap()
                .contains("Padaria")
        );
    }

    #[tokio::test]
    async fn recent_transactions_failure_shows_empty_list() {
        let (_, response) = render(FakeBackend::new().failing(Operation::ListTransactions)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert!(select_text(&html, "#summary-cards").is_some());
        assert!(
            select_text(&html, "#recent-transactions")
                .unwrap()
                .contains("Nenhuma transação ainda.")
        );
    }

    #[tokio::test]
    async fn recent_transactions_are_limited_to_five_newest() {
        let transactions = (1..=7)
            .map(|day| transaction(day as i64, &format!("Compra {day}"), day))
            .collect();

        let (_, response) = render(FakeBackend::new().with_transactions(transactions)).await;

        let html = parse_html_document(response).await;
        let items: Vec<String> = html
            .select(&Selector::parse("#recent-transactions li").unwrap())
            .map(|item| item.text().collect())
            .collect();
        assert_eq!(items.len(), 5);
        assert!(items[0].contains("Compra 7"));
        assert!(items[4].contains("Compra 3"));
    }
}
