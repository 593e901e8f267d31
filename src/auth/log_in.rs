//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! Checking the credentials is left to the auth provider.

use std::{sync::Arc, time::Duration};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    alert::Alert,
    auth::{SessionContext, redirect::normalize_redirect_url},
    backend::{AuthProvider, Credentials},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, auth_card, base, link,
        loading_spinner, password_input,
    },
};

/// How long to wait for the session context to see a new session before
/// redirecting anyway.
const SIGN_IN_WAIT: Duration = Duration::from_secs(5);

pub(super) fn email_input(email: &str) -> Markup {
    html! {
        div
        {
            label for="email" class=(FORM_LABEL_STYLE) { "Email" }

            input
                type="email"
                name="email"
                id="email"
                placeholder="voce@exemplo.com"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                autofocus
                value=(email);
        }
    }
}

fn log_in_form(email: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (email_input(email))
            (password_input("", 0, error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Entrar"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Ainda não tem uma conta? "
                (link(endpoints::SIGN_UP_VIEW, "Cadastre-se"))
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

#[derive(Deserialize)]
pub struct LogInQuery {
    pub redirect_url: Option<String>,
    /// Set after a successful sign up.
    #[serde(default)]
    pub signed_up: bool,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<LogInQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let form = log_in_form("", None, redirect_url.as_deref());
    let form = html! {
        @if query.signed_up {
            (Alert::Success {
                message: "Cadastro realizado!".to_owned(),
                details: "Verifique seu email para confirmar a conta e depois entre.".to_owned(),
            }.into_html())
        }

        (form)
    };
    let content = auth_card("Entre na sua conta", &form);

    base("Entrar", &[], &content).into_response()
}

/// The state needed to perform a log in.
#[derive(Clone)]
pub struct LogInState {
    pub auth: Arc<dyn AuthProvider>,
    pub session: SessionContext,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            auth: state.auth.clone(),
            session: state.session.clone(),
        }
    }
}

/// The raw data entered by the user in the log-in form.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInForm {
    pub email: String,
    pub password: String,
    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}

/// Handler for log-in requests via the POST method.
///
/// On success the client is redirected to the page it originally asked for,
/// or the dashboard. Otherwise, the form is returned with the auth provider's
/// message.
pub async fn post_log_in(State(state): State<LogInState>, Form(form): Form<LogInForm>) -> Response {
    let redirect_url = parse_redirect_url(form.redirect_url.as_deref(), "log-in form");
    let credentials = Credentials {
        email: form.email.trim().to_owned(),
        password: form.password,
    };

    let session = match state.auth.sign_in_with_password(&credentials).await {
        Ok(session) => session,
        Err(error) => {
            tracing::warn!("Log in failed for {}: {error}", credentials.email);
            return log_in_form(
                &credentials.email,
                Some(&error.message),
                redirect_url.as_deref(),
            )
            .into_response();
        }
    };

    if !state.session.wait_for_sign_in(&session, SIGN_IN_WAIT).await {
        tracing::warn!(
            "The session context did not see user {} sign in within {SIGN_IN_WAIT:?}",
            session.user_id()
        );
    }

    let redirect_url = redirect_url.unwrap_or_else(|| endpoints::ROOT.to_owned());

    (HxRedirect(redirect_url), StatusCode::OK).into_response()
}
