//! The route handlers behind the transactions page: loading the page, moving
//! the wizard between steps and submitting the new transaction.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::Session,
    backend::{DataApi, TransactionQuery},
    category::CategoryId,
    endpoints,
    layout::protected_page,
    profile::ProfileState,
    timezone::local_today,
    transaction::{
        TransactionType, TransactionsPage, TransactionsPageSlot, Wizard, WizardStep,
        view::{FormErrors, transactions_content},
    },
};

/// The state needed by the transactions page and its endpoints.
#[derive(Clone)]
pub struct TransactionsState {
    pub data: Arc<dyn DataApi>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
    pub page: Arc<TransactionsPageSlot>,
}

impl FromRef<AppState> for TransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            data: state.data.clone(),
            local_timezone: state.local_timezone.clone(),
            page: state.transactions_page.clone(),
        }
    }
}

/// Send the client back to the transactions page so that it is mounted again.
pub(crate) fn reload_transactions_page() -> Response {
    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::OK,
    )
        .into_response()
}

/// Display the transactions page.
///
/// Loads the categories and every transaction at the same time. A list that
/// fails to load is logged and shown as empty.
pub async fn get_transactions_page(
    State(state): State<TransactionsState>,
    State(profile_state): State<ProfileState>,
    Extension(session): Extension<Session>,
) -> Response {
    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_response(),
    };

    let mount_id = state.page.begin_mount();
    tracing::debug!("Mounting transactions page {mount_id}");

    let query = TransactionQuery::all();
    let (categories, transactions) = tokio::join!(
        state.data.list_categories(&session),
        state.data.list_transactions(&session, &query),
    );

    let categories = categories.unwrap_or_else(|error| {
        tracing::error!("Could not load categories: {error}");
        Vec::new()
    });
    let transactions = transactions.unwrap_or_else(|error| {
        tracing::error!("Could not load transactions: {error}");
        Vec::new()
    });

    let page = TransactionsPage::new(
        mount_id,
        session.user_id().clone(),
        Wizard::new(today),
        categories,
        transactions,
    );
    let mut content = transactions_content(&page, FormErrors::default());

    if let Err(stale) = state.page.finish_mount(page) {
        tracing::warn!("{stale}");

        match state
            .page
            .with_current(|page| transactions_content(page, FormErrors::default()))
        {
            Some(current) => content = current,
            None => return Redirect::to(endpoints::TRANSACTIONS_VIEW).into_response(),
        }
    }

    protected_page(
        &profile_state,
        &session,
        "Transações",
        endpoints::TRANSACTIONS_VIEW,
        &[],
        &content,
    )
    .await
    .into_response()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardAction {
    Next,
    Back,
}

/// The fields of the wizard's current step and the button that was pressed.
#[derive(Debug, Deserialize)]
pub struct WizardForm {
    pub action: WizardAction,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub date: Option<Date>,
}

impl WizardForm {
    /// Copy the fields shown on the current step into the draft.
    fn apply(self, page: &mut TransactionsPage) {
        match page.wizard.step() {
            WizardStep::DescriptionAndAmount => {
                page.wizard
                    .set_description(self.description.as_deref().unwrap_or_default());
                page.wizard
                    .set_amount(self.amount.as_deref().unwrap_or_default());
            }
            WizardStep::Type => {
                if let Some(transaction_type) = self.transaction_type {
                    page.wizard.set_type(transaction_type);
                }
            }
            WizardStep::CategoryAndDate => {
                page.wizard
                    .select_category(self.category_id, &page.categories);
                page.wizard.set_date(self.date);
            }
            WizardStep::Confirm => {}
        }
    }
}

/// Move the wizard forward or back, keeping what the user typed.
pub async fn post_wizard(
    State(state): State<TransactionsState>,
    Form(form): Form<WizardForm>,
) -> Response {
    let action = form.action;

    let content = state.page.with_current(|page| {
        form.apply(page);

        let error = match action {
            WizardAction::Next => page.wizard.next().err(),
            WizardAction::Back => {
                page.wizard.back();
                None
            }
        };

        transactions_content(
            page,
            FormErrors {
                wizard: error.as_ref(),
                category: None,
            },
        )
    });

    match content {
        Some(content) => content.into_response(),
        None => reload_transactions_page(),
    }
}

/// Insert the confirmed draft as a new transaction.
///
/// An invalid draft sends the wizard back to the step with the problem and
/// nothing is sent to the backend. A backend failure is shown as an alert
/// and the draft is kept.
pub async fn post_transaction(
    State(state): State<TransactionsState>,
    Extension(session): Extension<Session>,
) -> Response {
    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    let prepared = state.page.with_current(|page| {
        match page.wizard.prepare_submission(&page.user_id) {
            Ok(transaction) => Ok((page.mount_id, transaction)),
            Err(error) => Err(transactions_content(
                page,
                FormErrors {
                    wizard: Some(&error),
                    category: None,
                },
            )),
        }
    });

    let (mount_id, new_transaction) = match prepared {
        Some(Ok(prepared)) => prepared,
        Some(Err(content)) => return content.into_response(),
        None => return reload_transactions_page(),
    };

    let transaction = match state
        .data
        .insert_transaction(&session, &new_transaction)
        .await
    {
        Ok(transaction) => transaction,
        Err(error) => {
            tracing::error!("Could not insert transaction: {error}");
            return Error::from(error).into_alert_response();
        }
    };

    tracing::info!("Inserted transaction {}", transaction.id);

    let content = state.page.update(mount_id, |page| {
        page.record_transaction(transaction, today);
        transactions_content(page, FormErrors::default())
    });

    match content {
        Ok(content) => html! {
            (content)
            (Alert::SuccessSimple {
                message: "Transação adicionada com sucesso!".to_owned(),
            }
            .into_oob_html())
        }
        .into_response(),
        Err(stale) => {
            tracing::warn!("{stale}");
            reload_transactions_page()
        }
    }
}

#[cfg(test)]
mod transactions_endpoint_tests {
    use std::sync::Arc;

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Form;
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        auth::{SessionContext, UserId},
        backend::{Call, FakeBackend, Operation, TransactionQuery, test_session},
        category::{Category, CategoryName},
        endpoints,
        profile::{ProfileCache, ProfileState},
        test_utils::{assert_hx_redirect, parse_html_document, parse_html_fragment},
        transaction::{NewTransaction, TransactionType, TransactionsPageSlot, WizardStep},
    };

    use super::{
        TransactionsState, WizardAction, WizardForm, get_transactions_page, post_transaction,
        post_wizard,
    };

    fn mercado() -> Category {
        Category {
            id: 7,
            name: CategoryName::new_unchecked("Mercado"),
            transaction_type: TransactionType::Expense,
            user_id: UserId::new("user-1"),
        }
    }

    struct Fixture {
        backend: Arc<FakeBackend>,
        state: TransactionsState,
        profile_state: ProfileState,
        /// Keeps the session observed by the page slot alive.
        _session: SessionContext,
    }

    fn fixture(backend: FakeBackend) -> Fixture {
        let backend = Arc::new(backend.with_session(test_session()));
        let session = SessionContext::resolved(Some(test_session()));

        Fixture {
            state: TransactionsState {
                data: backend.clone(),
                local_timezone: "Etc/UTC".to_owned(),
                page: Arc::new(TransactionsPageSlot::new(&session)),
            },
            profile_state: ProfileState {
                auth: backend.clone(),
                data: backend.clone(),
                profiles: Arc::new(ProfileCache::new(&session)),
            },
            backend,
            _session: session,
        }
    }

    async fn mount(fixture: &Fixture) -> axum::response::Response {
        get_transactions_page(
            State(fixture.state.clone()),
            State(fixture.profile_state.clone()),
            Extension(test_session()),
        )
        .await
    }

    fn step_form(action: WizardAction) -> WizardForm {
        WizardForm {
            action,
            description: None,
            amount: None,
            transaction_type: None,
            category_id: None,
            date: None,
        }
    }

    async fn wizard(fixture: &Fixture, form: WizardForm) -> axum::response::Response {
        post_wizard(State(fixture.state.clone()), Form(form)).await
    }

    /// Fill in every step up to the confirmation.
    async fn fill_wizard(fixture: &Fixture) {
        wizard(
            fixture,
            WizardForm {
                description: Some("Mercado".to_owned()),
                amount: Some("150,75".to_owned()),
                ..step_form(WizardAction::Next)
            },
        )
        .await;
        wizard(
            fixture,
            WizardForm {
                transaction_type: Some(TransactionType::Expense),
                ..step_form(WizardAction::Next)
            },
        )
        .await;
        wizard(
            fixture,
            WizardForm {
                category_id: Some(7),
                date: Some(date!(2024 - 03 - 10)),
                ..step_form(WizardAction::Next)
            },
        )
        .await;
    }

    fn current_step(fixture: &Fixture) -> Option<WizardStep> {
        fixture.state.page.with_current(|page| page.wizard.step())
    }

    #[tokio::test]
    async fn page_loads_categories_and_all_transactions() {
        let fixture = fixture(FakeBackend::new().with_categories(vec![mercado()]));

        let response = mount(&fixture).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert!(
            document
                .select(&Selector::parse("#transactions-content").unwrap())
                .next()
                .is_some()
        );
        assert_eq!(fixture.backend.count(Operation::ListCategories), 1);
        assert!(
            fixture
                .backend
                .calls()
                .contains(&Call::ListTransactions(TransactionQuery::all()))
        );
    }

    #[tokio::test]
    async fn page_renders_when_lists_fail_to_load() {
        let fixture = fixture(
            FakeBackend::new()
                .failing(Operation::ListCategories)
                .failing(Operation::ListTransactions),
        );

        let response = mount(&fixture).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            fixture.state.page.with_current(|page| page.categories.len()),
            Some(0)
        );
    }

    #[tokio::test]
    async fn wizard_without_mounted_page_reloads() {
        let fixture = fixture(FakeBackend::new());

        let response = wizard(&fixture, step_form(WizardAction::Next)).await;

        assert_hx_redirect(&response, endpoints::TRANSACTIONS_VIEW);
    }

    #[tokio::test]
    async fn next_with_missing_description_stays_on_first_step() {
        let fixture = fixture(FakeBackend::new());
        mount(&fixture).await;

        let response = wizard(
            &fixture,
            WizardForm {
                description: Some("  ".to_owned()),
                amount: Some("10".to_owned()),
                ..step_form(WizardAction::Next)
            },
        )
        .await;

        let html = parse_html_fragment(response).await;
        let error = html
            .select(&Selector::parse("#wizard-error").unwrap())
            .next()
            .expect("missing wizard error");
        assert_eq!(error.text().collect::<String>(), "Informe a descrição.");
        assert_eq!(current_step(&fixture), Some(WizardStep::DescriptionAndAmount));
    }

    #[tokio::test]
    async fn back_keeps_the_draft() {
        let fixture = fixture(FakeBackend::new().with_categories(vec![mercado()]));
        mount(&fixture).await;
        fill_wizard(&fixture).await;
        assert_eq!(current_step(&fixture), Some(WizardStep::Confirm));

        wizard(&fixture, step_form(WizardAction::Back)).await;

        assert_eq!(current_step(&fixture), Some(WizardStep::CategoryAndDate));
        assert_eq!(
            fixture
                .state
                .page
                .with_current(|page| page.wizard.draft().category_id),
            Some(Some(7))
        );
    }

    #[tokio::test]
    async fn submitting_inserts_prepends_and_resets() {
        let fixture = fixture(FakeBackend::new().with_categories(vec![mercado()]));
        mount(&fixture).await;
        fill_wizard(&fixture).await;

        let response = post_transaction(State(fixture.state.clone()), Extension(test_session())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(fixture.backend.calls().contains(&Call::InsertTransaction(NewTransaction {
            description: "Mercado".to_owned(),
            amount: 150.75,
            transaction_type: TransactionType::Expense,
            category_id: 7,
            date: date!(2024 - 03 - 10),
            user_id: UserId::new("user-1"),
        })));
        let html = parse_html_fragment(response).await;
        let first = html
            .select(&Selector::parse("#transaction-list li").unwrap())
            .next()
            .expect("missing transaction");
        assert!(first.text().collect::<String>().contains("Mercado"));
        assert!(
            html.select(&Selector::parse("[hx-swap-oob]").unwrap())
                .next()
                .is_some()
        );
        assert_eq!(current_step(&fixture), Some(WizardStep::DescriptionAndAmount));
    }

    #[tokio::test]
    async fn failed_insert_keeps_the_draft_on_confirm() {
        let fixture = fixture(
            FakeBackend::new()
                .with_categories(vec![mercado()])
                .failing(Operation::InsertTransaction),
        );
        mount(&fixture).await;
        fill_wizard(&fixture).await;

        let response = post_transaction(State(fixture.state.clone()), Extension(test_session())).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = parse_html_fragment(response).await;
        assert!(
            html.root_element()
                .text()
                .collect::<String>()
                .contains("simulated InsertTransaction failure")
        );
        assert_eq!(current_step(&fixture), Some(WizardStep::Confirm));
        assert_eq!(
            fixture
                .state
                .page
                .with_current(|page| page.transactions.len()),
            Some(0)
        );
    }

    #[tokio::test]
    async fn category_removed_before_submit_returns_to_category_step() {
        let fixture = fixture(FakeBackend::new().with_categories(vec![mercado()]));
        mount(&fixture).await;
        fill_wizard(&fixture).await;
        fixture
            .state
            .page
            .with_current(|page| page.remove_category(7));

        let response = post_transaction(State(fixture.state.clone()), Extension(test_session())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(current_step(&fixture), Some(WizardStep::CategoryAndDate));
        assert_eq!(fixture.backend.count(Operation::InsertTransaction), 0);
    }

    #[test]
    fn wizard_form_reads_blank_fields_as_missing() {
        let form: WizardForm = serde_html_form::from_str(
            "action=next&transaction_type=expense&category_id=&date=2024-03-10",
        )
        .unwrap();

        assert_eq!(form.action, WizardAction::Next);
        assert_eq!(form.transaction_type, Some(TransactionType::Expense));
        assert_eq!(form.category_id, None);
        assert_eq!(form.date, Some(date!(2024 - 03 - 10)));
    }
}
