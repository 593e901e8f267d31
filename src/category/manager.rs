//! Creating and deleting categories from the transactions page.

use axum::{
    Extension,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use maud::html;
use serde::Deserialize;

use crate::{
    Error,
    alert::Alert,
    auth::Session,
    category::{CategoryId, CategoryName, NewCategory},
    transaction::{
        TransactionsState, reload_transactions_page,
        view::{FormErrors, transactions_content},
    },
};

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

/// Create a category of the wizard's current type and select it.
///
/// A blank name is reported on the form without contacting the backend.
pub async fn post_category(
    State(state): State<TransactionsState>,
    Extension(session): Extension<Session>,
    Form(form): Form<CategoryForm>,
) -> Response {
    let name = match CategoryName::new(&form.name) {
        Ok(name) => name,
        Err(error) => {
            let message = error.to_string();
            return match state.page.with_current(|page| {
                transactions_content(
                    page,
                    FormErrors {
                        wizard: None,
                        category: Some(&message),
                    },
                )
            }) {
                Some(content) => content.into_response(),
                None => reload_transactions_page(),
            };
        }
    };

    let Some((mount_id, new_category)) = state.page.with_current(|page| {
        (
            page.mount_id,
            NewCategory {
                name,
                transaction_type: page.wizard.draft().transaction_type,
                user_id: page.user_id.clone(),
            },
        )
    }) else {
        return reload_transactions_page();
    };

    let category = match state.data.insert_category(&session, &new_category).await {
        Ok(category) => category,
        Err(error) => {
            tracing::error!("Could not create category {}: {error}", new_category.name);
            return Error::from(error).into_alert_response();
        }
    };

    tracing::info!("Created category {} ({})", category.name, category.id);
    let message = format!("Categoria \"{}\" criada!", category.name);

    match state.page.update(mount_id, |page| {
        page.add_category(category);
        transactions_content(page, FormErrors::default())
    }) {
        Ok(content) => html! {
            (content)
            (Alert::SuccessSimple { message }.into_oob_html())
        }
        .into_response(),
        Err(stale) => {
            tracing::warn!("{stale}");
            reload_transactions_page()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteCategoryQuery {
    /// Set by the page once the user has confirmed the delete.
    #[serde(default)]
    pub confirmed: bool,
}

/// Delete a category after the user confirmed it.
///
/// If the deleted category was selected in the wizard, the selection is
/// cleared.
pub async fn delete_category(
    State(state): State<TransactionsState>,
    Extension(session): Extension<Session>,
    Path(category_id): Path<CategoryId>,
    Query(query): Query<DeleteCategoryQuery>,
) -> Response {
    if !query.confirmed {
        tracing::warn!("Declined to delete category {category_id} without confirmation");
        return Error::DeleteNotConfirmed.into_alert_response();
    }

    let Some(mount_id) = state.page.with_current(|page| page.mount_id) else {
        return reload_transactions_page();
    };

    if let Err(error) = state.data.delete_category(&session, category_id).await {
        tracing::error!("Could not delete category {category_id}: {error}");
        return Error::from(error).into_alert_response();
    }

    tracing::info!("Deleted category {category_id}");

    match state.page.update(mount_id, |page| {
        page.remove_category(category_id);
        transactions_content(page, FormErrors::default())
    }) {
        Ok(content) => html! {
            (content)
            (Alert::SuccessSimple {
                message: "Categoria apagada com sucesso!".to_owned(),
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
