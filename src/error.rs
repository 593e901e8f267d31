//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{alert::Alert, backend::BackendError, internal_server_error::InternalServerError};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A request to the remote backend failed.
    ///
    /// The message comes from the backend and is safe to show to the user.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// An empty string was used to create a category name.
    #[error("O nome da categoria não pode ficar vazio.")]
    EmptyCategoryName,

    /// The password given at sign up is shorter than the minimum length.
    #[error("A senha deve ter pelo menos {0} caracteres.")]
    PasswordTooShort(usize),

    /// A month outside of 1 to 12 was requested.
    #[error("Mês inválido: {0}")]
    InvalidMonth(u8),

    /// A year outside of the supported range was requested.
    #[error("Ano inválido: {0}")]
    InvalidYear(i32),

    /// A delete request arrived without the user's confirmation.
    #[error("the delete was not confirmed")]
    DeleteNotConfirmed,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Fuso horário inválido",
                fix: &format!(
                    "Não foi possível obter o fuso horário \"{timezone}\". Verifique as \
                    configurações do servidor e use um nome de fuso horário canônico."
                ),
            }
            .into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::Backend(error) => (
                StatusCode::BAD_GATEWAY,
                Alert::Error {
                    message: "Erro do servidor remoto".to_owned(),
                    details: error.message,
                },
            ),
            Error::EmptyCategoryName => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Alert::ErrorSimple {
                    message: "O nome da categoria não pode ficar vazio.".to_owned(),
                },
            ),
            Error::PasswordTooShort(min_length) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Alert::ErrorSimple {
                    message: format!("A senha deve ter pelo menos {min_length} caracteres."),
                },
            ),
            Error::InvalidMonth(month) => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: format!("Mês inválido: {month}"),
                },
            ),
            Error::InvalidYear(year) => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: format!("Ano inválido: {year}"),
                },
            ),
            Error::DeleteNotConfirmed => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "A exclusão não foi confirmada.".to_owned(),
                },
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Fuso horário inválido".to_owned(),
                    details: format!(
                        "Não foi possível obter o fuso horário \"{timezone}\". Verifique as \
                        configurações do servidor."
                    ),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}
