//! Alert system for displaying success and error messages to users.
//!
//! Alerts are swapped into the `#alert-container` element that every page
//! has. Error responses reach it through `hx-target-error`, successful
//! responses that also update the page carry the alert out-of-band.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

const SUCCESS_STYLE: &str = "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
    border border-green-300 dark:bg-gray-800 dark:text-green-400 dark:border-green-800";

const ERROR_STYLE: &str = "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
    border border-red-300 dark:bg-gray-800 dark:text-red-400 dark:border-red-800";

/// A message shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Success { message: String, details: String },
    SuccessSimple { message: String },
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (style, message, details) = match self {
            Alert::Success { message, details } => (SUCCESS_STYLE, message, Some(details)),
            Alert::SuccessSimple { message } => (SUCCESS_STYLE, message, None),
            Alert::Error { message, details } => (ERROR_STYLE, message, Some(details)),
            Alert::ErrorSimple { message } => (ERROR_STYLE, message, None),
        };

        html! {
            div role="alert" class=(style)
            {
                div class="flex items-start justify-between gap-4"
                {
                    p class="font-medium" { (message) }

                    button
                        type="button"
                        aria-label="Fechar"
                        class="font-bold"
                        onclick="this.closest('#alert-container').classList.add('hidden')"
                    {
                        "×"
                    }
                }

                @if let Some(details) = details.filter(|details| !details.is_empty())
                {
                    p class="mt-1" { (details) }
                }
            }
        }
    }

    /// Render the alert so that htmx swaps it into the alert container
    /// regardless of the request's target.
    pub fn into_oob_html(self) -> Markup {
        html! {
            div hx-swap-oob="innerHTML:#alert-container"
            {
                (self.into_html())
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}
