//! The sign up page for creating an account with the auth provider.

use std::sync::Arc;

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    alert::Alert,
    auth::log_in::email_input,
    backend::{AuthProvider, SignUpRequest},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, auth_card, base, link,
        loading_spinner, password_input,
    },
};

/// The auth provider rejects shorter passwords, so they are caught before
/// making the request.
pub const PASSWORD_MIN_LENGTH: usize = 6;

fn sign_up_form(form: &SignUpForm, password_error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::SIGN_UP_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                label for="full_name" class=(FORM_LABEL_STYLE) { "Nome completo" }

                input
                    type="text"
                    name="full_name"
                    id="full_name"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    value=(form.full_name);
            }

            div
            {
                label for="phone" class=(FORM_LABEL_STYLE) { "Telefone (opcional)" }

                input
                    type="tel"
                    name="phone"
                    id="phone"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(form.phone);
            }

            (email_input(&form.email))
            (password_input("", PASSWORD_MIN_LENGTH as u8, password_error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Criar conta"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Já tem uma conta? "
                (link(endpoints::LOG_IN_VIEW, "Entre aqui"))
            }
        }
    }
}

/// Display the sign up page.
pub async fn get_sign_up_page() -> Response {
    let form = sign_up_form(&SignUpForm::default(), None);
    let content = auth_card("Crie sua conta", &form);

    base("Cadastro", &[], &content).into_response()
}

/// The state needed to create an account.
#[derive(Clone)]
pub struct SignUpState {
    pub auth: Arc<dyn AuthProvider>,
}

impl FromRef<AppState> for SignUpState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            auth: state.auth.clone(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SignUpForm {
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    pub email: String,
    pub password: String,
}

impl SignUpForm {
    fn validate(&self) -> Result<SignUpRequest, Error> {
        if self.password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(Error::PasswordTooShort(PASSWORD_MIN_LENGTH));
        }

        let phone = self.phone.trim();

        Ok(SignUpRequest {
            email: self.email.trim().to_owned(),
            password: self.password.clone(),
            full_name: self.full_name.trim().to_owned(),
            phone: (!phone.is_empty()).then(|| phone.to_owned()),
        })
    }
}

/// Create an account and send the user to the log-in page.
///
/// A password that is too short is reported on the form without contacting
/// the auth provider. Failures from the auth provider are shown as an alert.
pub async fn post_sign_up(State(state): State<SignUpState>, Form(form): Form<SignUpForm>) -> Response {
    let request = match form.validate() {
        Ok(request) => request,
        Err(error) => {
            return sign_up_form(&form, Some(&error.to_string())).into_response();
        }
    };

    match state.auth.sign_up(&request).await {
        Ok(()) => {
            tracing::info!("Created an account for {}", request.email);
            let log_in_url = format!("{}?signed_up=true", endpoints::LOG_IN_VIEW);

            (HxRedirect(log_in_url), StatusCode::OK).into_response()
        }
        Err(error) => {
            tracing::warn!("Sign up failed for {}: {error}", request.email);

            (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Não foi possível criar a conta".to_owned(),
                    details: error.message,
                },
            )
                .into_response()
        }
    }
}
