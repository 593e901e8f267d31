//! Summary cards for the current month: income, expense and balance.

use maud::{Markup, html};

use crate::{
    html::{CARD_STYLE, EXPENSE_STYLE, INCOME_STYLE, format_currency},
    summary::MonthlySummary,
};

fn summary_card(id: &str, title: &str, value: Markup) -> Markup {
    html! {
        div id=(id) class=(CARD_STYLE)
        {
            h3 class="text-sm font-medium text-gray-500 dark:text-gray-400" { (title) }
            p class="mt-2 text-2xl font-bold tabular-nums" { (value) }
        }
    }
}

/// Renders the income, expense and balance cards.
pub(super) fn summary_cards_view(summary: &MonthlySummary) -> Markup {
    let balance = summary.balance();
    let balance_style = if balance >= 0.0 {
        INCOME_STYLE
    } else {
        EXPENSE_STYLE
    };

    html! {
        section id="summary-cards" class="w-full grid grid-cols-1 md:grid-cols-3 gap-4 mb-6"
        {
            (summary_card(
                "income-card",
                "Receitas (Mês)",
                html! { span class=(INCOME_STYLE) { "+ " (format_currency(summary.total_income)) } },
            ))
            (summary_card(
                "expense-card",
                "Despesas (Mês)",
                html! { span class=(EXPENSE_STYLE) { "- " (format_currency(summary.total_expense)) } },
            ))
            (summary_card(
                "balance-card",
                "Saldo (Mês)",
                html! { span class=(balance_style) { (format_currency(balance)) } },
            ))
        }
    }
}
