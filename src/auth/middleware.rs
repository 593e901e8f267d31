//! The route guard: decides from the session whether a request is served,
//! redirected or held back while the session is still being resolved.

use axum::{
    extract::{FromRef, Request, State},
    http::{StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_htmx::HxRedirect;
use maud::{PreEscaped, html};

use crate::{
    AppState,
    auth::{
        CurrentSession, Session, SessionContext,
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
    html::{HeadElement, PAGE_CONTAINER_STYLE, base, loading_spinner},
};

/// The state needed for the route guard.
#[derive(Clone)]
pub struct GuardState {
    pub session: SessionContext,
}

impl FromRef<AppState> for GuardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            session: state.session.clone(),
        }
    }
}

/// What to do with a request for a path.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// The session is still being resolved, show a placeholder.
    Loading,
    /// Serve the public page.
    Render,
    /// Serve the page inside the signed-in layout.
    RenderProtected(Session),
    RedirectToLogIn,
    RedirectToHome,
}

/// Pages that are only for signed out users.
pub fn is_public_path(path: &str) -> bool {
    matches!(
        path,
        endpoints::LOG_IN_VIEW
            | endpoints::SIGN_UP_VIEW
            | endpoints::LOG_IN_API
            | endpoints::SIGN_UP_API
    )
}

/// Decide how to handle a request for `path` given the current session.
pub fn route_decision(path: &str, session: &CurrentSession) -> RouteDecision {
    match (is_public_path(path), session) {
        (_, CurrentSession::Resolving) => RouteDecision::Loading,
        (true, CurrentSession::SignedOut) => RouteDecision::Render,
        (true, CurrentSession::SignedIn(_)) => RouteDecision::RedirectToHome,
        (false, CurrentSession::SignedOut) => RouteDecision::RedirectToLogIn,
        (false, CurrentSession::SignedIn(session)) => {
            RouteDecision::RenderProtected(session.clone())
        }
    }
}

/// Applies the routing decision to a request.
///
/// Protected handlers can use the function argument
/// `Extension(session): Extension<Session>` to receive the session.
#[inline]
async fn session_guard_internal(
    state: GuardState,
    mut request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    match route_decision(request.uri().path(), &state.session.current()) {
        RouteDecision::Loading => loading_response(),
        RouteDecision::Render => next.run(request).await,
        RouteDecision::RenderProtected(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        RouteDecision::RedirectToLogIn => {
            let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
                tracing::warn!("Could not build a redirect URL from the request. Falling back to the dashboard.");

                build_log_in_redirect_url_from_target(endpoints::ROOT)
                    .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
            });

            get_redirect(&log_in_redirect_url)
        }
        RouteDecision::RedirectToHome => get_redirect(endpoints::ROOT),
    }
}

/// Route guard for full page requests, redirects with HTTP 303.
pub async fn session_guard(
    State(state): State<GuardState>,
    request: Request,
    next: Next,
) -> Response {
    session_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Route guard for htmx requests, redirects with the HX-Redirect header.
pub async fn session_guard_hx(
    State(state): State<GuardState>,
    request: Request,
    next: Next,
) -> Response {
    session_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// A placeholder page that reloads itself until the session is known.
fn loading_response() -> Response {
    let content = html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            p class="text-lg" { (loading_spinner()) "Carregando..." }
        }
    };

    let reload = HeadElement::ScriptSource(PreEscaped(
        "setTimeout(() => window.location.reload(), 1000);".to_owned(),
    ));

    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(RETRY_AFTER, "1")],
        base("Carregando", &[reload], &content),
    )
        .into_response()
}


#[cfg(test)]
mod session_guard_tests {
    use axum::{
        Extension, Router,
        http::StatusCode,
        middleware,
        response::Html,
        routing::{get, post},
    };
    use axum_test::TestServer;

    use crate::{
        auth::{Session, SessionContext},
        backend::test_session,
        endpoints,
    };

    use super::{GuardState, session_guard, session_guard_hx};

    async fn protected_handler(Extension(session): Extension<Session>) -> Html<String> {
        Html(format!("<h1>Hello, {}!</h1>", session.user_id()))
    }

    async fn public_handler() -> Html<&'static str> {
        Html("<h1>Log in</h1>")
    }

    const TEST_PROTECTED_ROUTE: &str = "/protected";
    const TEST_API_ROUTE: &str = "/api/protected";

    fn get_test_server(session: SessionContext) -> TestServer {
        let state = GuardState { session };

        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(protected_handler))
            .route(endpoints::LOG_IN_VIEW, get(public_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), session_guard))
            .merge(
                Router::new()
                    .route(TEST_API_ROUTE, post(protected_handler))
                    .route_layer(middleware::from_fn_with_state(
                        state.clone(),
                        session_guard_hx,
                    )),
            )
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn signed_in_user_gets_protected_page() {
        let server = get_test_server(SessionContext::resolved(Some(test_session())));

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_ok();
        response.assert_text("<h1>Hello, user-1!</h1>");
    }

    #[tokio::test]
    async fn signed_out_user_is_redirected_to_log_in() {
        let server = get_test_server(SessionContext::resolved(None));

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        let expected_query =
            serde_urlencoded::to_string([("redirect_url", TEST_PROTECTED_ROUTE)]).unwrap();
        let expected_location = format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query);
        assert_eq!(response.header("location"), expected_location);
    }

    #[tokio::test]
    async fn signed_in_user_is_redirected_away_from_log_in() {
        let server = get_test_server(SessionContext::resolved(Some(test_session())));

        let response = server.get(endpoints::LOG_IN_VIEW).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::ROOT);
    }

    #[tokio::test]
    async fn resolving_session_shows_placeholder() {
        let server = get_test_server(SessionContext::resolving());

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.header("retry-after"), "1");
    }

    #[tokio::test]
    async fn api_route_uses_hx_current_url_for_redirect() {
        let server = get_test_server(SessionContext::resolved(None));
        let current_url = "/report?month=3&year=2024";

        let response = server
            .post(TEST_API_ROUTE)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", current_url)
            .await;

        response.assert_status_ok();
        let expected_query = serde_urlencoded::to_string([("redirect_url", current_url)]).unwrap();
        let expected_location = format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query);
        assert_eq!(response.header("hx-redirect"), expected_location);
    }
}
