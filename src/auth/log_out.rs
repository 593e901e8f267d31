//! Log-out route handler that ends the session with the auth provider and redirects users.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;

use crate::{
    AppState,
    alert::Alert,
    auth::SessionContext,
    backend::AuthProvider,
    endpoints,
};

const SIGN_OUT_WAIT: Duration = Duration::from_secs(5);

/// The state needed to log out.
#[derive(Clone)]
pub struct LogOutState {
    pub auth: Arc<dyn AuthProvider>,
    pub session: SessionContext,
}

impl FromRef<AppState> for LogOutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            auth: state.auth.clone(),
            session: state.session.clone(),
        }
    }
}

/// Sign out with the auth provider and redirect the client to the log-in page.
pub async fn post_log_out(State(state): State<LogOutState>) -> Response {
    if let Err(error) = state.auth.sign_out().await {
        tracing::error!("Could not sign out: {error}");

        return (
            StatusCode::BAD_GATEWAY,
            Alert::Error {
                message: "Não foi possível sair".to_owned(),
                details: error.message,
            },
        )
            .into_response();
    }

    if !state.session.wait_for_sign_out(SIGN_OUT_WAIT).await {
        tracing::warn!("The session context did not see the sign out within {SIGN_OUT_WAIT:?}");
    }

    (HxRedirect(endpoints::LOG_IN_VIEW.to_owned()), StatusCode::OK).into_response()
}
