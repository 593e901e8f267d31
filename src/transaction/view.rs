//! HTML rendering for the transactions page.
//!
//! Every wizard and category request re-renders the whole
//! `#transactions-content` section so the wizard, the category choices and
//! the transaction list always agree.

use maud::{Markup, html};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    backend::wire,
    category::Category,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE,
        CATEGORY_BADGE_STYLE, EXPENSE_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE,
        FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, INCOME_STYLE, PAGE_CONTAINER_STYLE, format_currency, format_date,
    },
    transaction::{
        Transaction, TransactionType, TransactionsPage, WizardError, WizardStep,
        wizard::parse_amount,
    },
};

/// The id of the element replaced by every wizard and category response.
pub const TRANSACTIONS_CONTENT_ID: &str = "transactions-content";

/// The max number of graphemes to display in the transaction list before
/// truncating and displaying ellipses.
const MAX_DESCRIPTION_GRAPHEMES: usize = 32;

/// Messages shown inline next to the form that caused them.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormErrors<'a> {
    pub wizard: Option<&'a WizardError>,
    pub category: Option<&'a str>,
}

/// The wizard, the category manager and the transaction list.
pub fn transactions_content(page: &TransactionsPage, errors: FormErrors) -> Markup {
    html! {
        section id=(TRANSACTIONS_CONTENT_ID) class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl grid gap-6 lg:grid-cols-2"
            {
                div class="flex flex-col gap-6"
                {
                    (wizard_view(page, errors.wizard))
                    (category_manager_view(page, errors.category))
                }

                (transaction_list_view(&page.transactions))
            }
        }
    }
}

fn step_title(step: WizardStep) -> &'static str {
    match step {
        WizardStep::DescriptionAndAmount => "Descrição e valor",
        WizardStep::Type => "Tipo",
        WizardStep::CategoryAndDate => "Categoria e data",
        WizardStep::Confirm => "Confirmação",
    }
}

fn step_indicator(current: WizardStep) -> Markup {
    html! {
        ol id="wizard-steps" class="flex items-center w-full mb-4 text-xs font-medium text-gray-500 dark:text-gray-400"
        {
            @for step in WizardStep::ALL {
                @let is_current = step == current;
                @let border_style = if is_current {
                    "border-blue-600 text-blue-600 dark:text-blue-500"
                } else {
                    "border-gray-200 dark:border-gray-700"
                };
                li
                    class={ "flex-1 text-center pb-2 border-b-2 " (border_style) }
                    aria-current=[is_current.then_some("step")]
                {
                    (step.number()) ". " (step_title(step))
                }
            }
        }
    }
}

fn wizard_view(page: &TransactionsPage, error: Option<&WizardError>) -> Markup {
    let step = page.wizard.step();

    html! {
        div class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { "Nova transação" }

            (step_indicator(step))

            form
                id="wizard-form"
                hx-post=(endpoints::WIZARD)
                hx-target={ "#" (TRANSACTIONS_CONTENT_ID) }
                hx-swap="outerHTML"
                hx-target-error="#alert-container"
                class="space-y-4"
            {
                @match step {
                    WizardStep::DescriptionAndAmount => (description_and_amount_fields(page)),
                    WizardStep::Type => (type_fields(page.wizard.draft().transaction_type)),
                    WizardStep::CategoryAndDate => (category_and_date_fields(page)),
                    WizardStep::Confirm => (confirmation_summary(page)),
                }

                @if let Some(error) = error {
                    p id="wizard-error" class=(FORM_ERROR_STYLE) { (error) }
                }

                (wizard_buttons(step))
            }
        }
    }
}

fn description_and_amount_fields(page: &TransactionsPage) -> Markup {
    let draft = page.wizard.draft();

    html! {
        div
        {
            label for="description" class=(FORM_LABEL_STYLE) { "Descrição" }
            input
                type="text"
                name="description"
                id="description"
                placeholder="Descrição (ex: Supermercado)"
                class=(FORM_TEXT_INPUT_STYLE)
                value=(draft.description)
                required
                autofocus;
        }

        div
        {
            label for="amount" class=(FORM_LABEL_STYLE) { "Valor" }
            input
                type="text"
                inputmode="decimal"
                name="amount"
                id="amount"
                placeholder="Valor (ex: 150,75)"
                class=(FORM_TEXT_INPUT_STYLE)
                value=(draft.amount)
                required;
        }
    }
}

fn type_fields(selected: TransactionType) -> Markup {
    html! {
        fieldset class=(FORM_RADIO_GROUP_STYLE)
        {
            legend class=(FORM_LABEL_STYLE) { "Tipo da transação" }

            @for transaction_type in [TransactionType::Expense, TransactionType::Income] {
                @let id = format!("type-{}", transaction_type.as_str());
                label for=(id) class="flex items-center gap-3"
                {
                    input
                        type="radio"
                        name="transaction_type"
                        id=(id)
                        value=(transaction_type.as_str())
                        class=(FORM_RADIO_INPUT_STYLE)
                        checked[transaction_type == selected];
                    span class=(FORM_RADIO_LABEL_STYLE) { (transaction_type.label()) }
                }
            }
        }
    }
}

fn category_and_date_fields(page: &TransactionsPage) -> Markup {
    let draft = page.wizard.draft();
    let date = draft.date.map(wire::format_date).unwrap_or_default();

    html! {
        div
        {
            label for="category_id" class=(FORM_LABEL_STYLE) { "Categoria" }
            select
                name="category_id"
                id="category_id"
                class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" disabled selected[draft.category_id.is_none()]
                {
                    "Selecione uma categoria"
                }

                @for category in page.categories_for_draft() {
                    option
                        value=(category.id)
                        selected[draft.category_id == Some(category.id)]
                    {
                        (category.name)
                    }
                }
            }
        }

        div
        {
            label for="date" class=(FORM_LABEL_STYLE) { "Data" }
            input
                type="date"
                name="date"
                id="date"
                class=(FORM_TEXT_INPUT_STYLE)
                value=(date);
        }
    }
}

fn confirmation_summary(page: &TransactionsPage) -> Markup {
    let draft = page.wizard.draft();
    let amount = parse_amount(&draft.amount).unwrap_or_default();
    let category_name = draft
        .category_id
        .and_then(|id| page.categories.iter().find(|category| category.id == id))
        .map(|category| category.name.to_string())
        .unwrap_or_else(|| "-".to_owned());
    let date = draft
        .date
        .map(format_date)
        .unwrap_or_else(|| "-".to_owned());

    html! {
        div id="wizard-summary" class="rounded border border-gray-200 dark:border-gray-700 p-4"
        {
            h3 class="font-semibold mb-2" { "Confirme os dados" }

            dl class="grid grid-cols-2 gap-y-1 text-sm"
            {
                dt { "Descrição:" } dd class="font-bold" { (draft.description.trim()) }
                dt { "Valor:" } dd class="font-bold" { (format_currency(amount)) }
                dt { "Tipo:" } dd class="font-bold" { (draft.transaction_type.label()) }
                dt { "Categoria:" } dd class="font-bold" { (category_name) }
                dt { "Data:" } dd class="font-bold" { (date) }
            }
        }
    }
}

fn wizard_buttons(step: WizardStep) -> Markup {
    html! {
        div class="flex justify-between gap-2"
        {
            @if step != WizardStep::DescriptionAndAmount {
                button
                    type="submit"
                    name="action"
                    value="back"
                    formnovalidate
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Voltar"
                }
            }

            @if step == WizardStep::Confirm {
                button
                    type="button"
                    id="submit-transaction"
                    hx-post=(endpoints::TRANSACTIONS_API)
                    hx-disabled-elt="this"
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    "Adicionar"
                }
            } @else {
                button
                    type="submit"
                    name="action"
                    value="next"
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    "Próximo"
                }
            }
        }
    }
}

fn category_manager_view(page: &TransactionsPage, error: Option<&str>) -> Markup {
    let transaction_type = page.wizard.draft().transaction_type;
    let heading = match transaction_type {
        TransactionType::Income => "Categorias de receita",
        TransactionType::Expense => "Categorias de despesa",
    };

    html! {
        div id="category-manager" class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { (heading) }

            form
                id="category-form"
                hx-post=(endpoints::CATEGORIES_API)
                hx-target={ "#" (TRANSACTIONS_CONTENT_ID) }
                hx-swap="outerHTML"
                hx-target-error="#alert-container"
                class="flex flex-col gap-2 mb-4"
            {
                label for="category-name" class=(FORM_LABEL_STYLE) { "Nova categoria" }

                div class="flex gap-2"
                {
                    input
                        type="text"
                        name="name"
                        id="category-name"
                        placeholder="Nome da categoria"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;

                    button type="submit" class="px-4 py-2 bg-blue-500 hover:bg-blue-600 text-white rounded"
                    {
                        "Criar"
                    }
                }

                @if let Some(error) = error {
                    p id="category-error" class=(FORM_ERROR_STYLE) { (error) }
                }
            }

            @let categories: Vec<&Category> = page.categories_for_draft().collect();

            @if categories.is_empty() {
                p class="text-sm text-gray-500 dark:text-gray-400" { "Nenhuma categoria cadastrada." }
            } @else {
                ul id="category-list" class="flex flex-col gap-2"
                {
                    @for category in categories {
                        (category_row(category))
                    }
                }
            }
        }
    }
}

fn category_row(category: &Category) -> Markup {
    let confirm_message = format!(
        "Tem certeza que quer apagar a categoria \"{}\"?",
        category.name
    );

    html! {
        li class="flex items-center justify-between" data-category-id=(category.id)
        {
            span class=(CATEGORY_BADGE_STYLE) { (category.name) }

            button
                type="button"
                hx-delete=(format_endpoint(endpoints::DELETE_CATEGORY, category.id))
                hx-confirm=(confirm_message)
                hx-vals=r#"{"confirmed": "true"}"#
                hx-target={ "#" (TRANSACTIONS_CONTENT_ID) }
                hx-swap="outerHTML"
                hx-target-error="#alert-container"
                class=(BUTTON_DELETE_STYLE)
            {
                "Apagar"
            }
        }
    }
}

fn transaction_list_view(transactions: &[Transaction]) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { "Histórico de Transações" }

            @if transactions.is_empty() {
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Nenhuma transação registrada."
                }
            } @else {
                ul id="transaction-list" class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for transaction in transactions {
                        (transaction_item(transaction))
                    }
                }
            }
        }
    }
}

/// One transaction with its category and date. Shared with the dashboard and
/// the report.
pub fn transaction_item(transaction: &Transaction) -> Markup {
    let (description, tooltip) = format_description(&transaction.description);
    let amount_style = match transaction.transaction_type {
        TransactionType::Income => INCOME_STYLE,
        TransactionType::Expense => EXPENSE_STYLE,
    };
    let category_name = transaction
        .category_name
        .as_deref()
        .unwrap_or("Sem Categoria");

    html! {
        li class="flex items-center justify-between py-3" data-transaction-id=(transaction.id)
        {
            span class="min-w-0"
            {
                strong class="block truncate" title=[tooltip] { (description) }
                small class="text-gray-500 dark:text-gray-400"
                {
                    (category_name) " - "
                    time datetime=(wire::format_date(transaction.date)) { (format_date(transaction.date)) }
                }
            }

            strong class={ "shrink-0 tabular-nums " (amount_style) }
            {
                @if transaction.transaction_type == TransactionType::Expense { "- " }
                (format_currency(transaction.amount))
            }
        }
    }
}

fn format_description(description: &str) -> (String, Option<&str>) {
    let description_length = description.graphemes(true).count();

    if description_length <= MAX_DESCRIPTION_GRAPHEMES {
        (description.to_owned(), None)
    } else {
        let truncated: String = description
            .graphemes(true)
            .take(MAX_DESCRIPTION_GRAPHEMES - 3)
            .collect();
        let truncated = truncated + "...";
        (truncated, Some(description))
    }
}
