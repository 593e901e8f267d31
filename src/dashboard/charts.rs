//! Chart generation and rendering for the dashboard.
//!
//! This module creates interactive ECharts visualizations from the totals
//! computed by the backend:
//! - **Monthly Chart**: income and expense per month
//! - **Month Chart**: income against expense for the current month
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, ItemStyle, JsFunction, Tooltip, Trigger,
    },
    series::{Line, bar::Bar},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    html::HeadElement,
    summary::{MonthlySummary, MonthlyTotals},
};

const INCOME_COLOR: &str = "#34d399";
const EXPENSE_COLOR: &str = "#f87171";

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            h2 class="text-xl font-semibold mb-4" { "Análise Financeira" }

            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// Income and expense lines over the months returned by the backend.
pub(super) fn monthly_chart(monthly_totals: &[MonthlyTotals]) -> Chart {
    let labels: Vec<String> = monthly_totals
        .iter()
        .map(|totals| totals.month.clone())
        .collect();
    let income: Vec<f64> = monthly_totals.iter().map(|totals| totals.income).collect();
    let expense: Vec<f64> = monthly_totals.iter().map(|totals| totals.expense).collect();

    Chart::new()
        .title(Title::new().text("Receitas e despesas").subtext("Por mês"))
        .tooltip(currency_tooltip())
        .legend(Legend::new().left("center"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Line::new()
                .name("Receitas")
                .item_style(ItemStyle::new().color(INCOME_COLOR))
                .data(income),
        )
        .series(
            Line::new()
                .name("Despesas")
                .item_style(ItemStyle::new().color(EXPENSE_COLOR))
                .data(expense),
        )
}

/// Income against expense for the current month.
pub(super) fn month_chart(summary: &MonthlySummary) -> Chart {
    Chart::new()
        .title(Title::new().text("Mês atual").subtext("Receitas x despesas"))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(vec!["Receitas", "Despesas"]),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Bar::new()
                .name("Valor")
                .item_style(ItemStyle::new().color("#3498db"))
                .data(vec![summary.total_income, summary.total_expense]),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('pt-BR', {
              style: 'currency',
              currency: 'BRL'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod chart_tests {
    use crate::summary::{MonthlySummary, MonthlyTotals};

    use super::{DashboardChart, charts_script, month_chart, monthly_chart};

    #[test]
    fn monthly_chart_uses_backend_month_labels() {
        let totals = vec![
            MonthlyTotals {
                month: "2024-02".to_owned(),
                income: 5000.0,
                expense: 3200.0,
            },
            MonthlyTotals {
                month: "2024-03".to_owned(),
                income: 5100.0,
                expense: 2900.5,
            },
        ];

        let options = monthly_chart(&totals).to_string();

        assert!(options.contains("2024-02"));
        assert!(options.contains("2024-03"));
        assert!(options.contains("Receitas"));
        assert!(options.contains("Despesas"));
        assert!(options.contains("2900.5"));
    }

    #[test]
    fn month_chart_shows_both_totals() {
        let options = month_chart(&MonthlySummary {
            total_income: 5000.0,
            total_expense: 1250.5,
        })
        .to_string();

        assert!(options.contains("1250.5"));
    }

    #[test]
    fn script_initialises_every_chart() {
        let charts = [
            DashboardChart {
                id: "first-chart",
                options: "{}".to_owned(),
            },
            DashboardChart {
                id: "second-chart",
                options: "{}".to_owned(),
            },
        ];

        let crate::html::HeadElement::ScriptSource(script) = charts_script(&charts) else {
            panic!("expected an inline script");
        };

        assert!(script.0.contains("getElementById(\"first-chart\")"));
        assert!(script.0.contains("getElementById(\"second-chart\")"));
    }
}
