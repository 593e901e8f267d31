//! Application router configuration with the page and htmx API route definitions.

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        get_log_in_page, get_sign_up_page, post_log_in, post_log_out, post_sign_up,
        session_guard, session_guard_hx,
    },
    category::{delete_category, post_category},
    dashboard::get_dashboard_page,
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    report::get_report_page,
    transaction::{get_transactions_page, post_transaction, post_wizard},
};

/// Return a router with all the app's routes.
///
/// Every page and API route goes through the session guard. The log-in and
/// sign-up routes are public, the guard sends signed-in users home from them.
pub fn build_router(state: AppState) -> Router {
    let views = Router::new()
        .route(endpoints::ROOT, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::REPORT_VIEW, get(get_report_page))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::SIGN_UP_VIEW, get(get_sign_up_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), session_guard));

    // These routes are requested by htmx, so auth redirects must use the
    // HX-Redirect header.
    let api = Router::new()
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::SIGN_UP_API, post(post_sign_up))
        .route(endpoints::LOG_OUT, post(post_log_out))
        .route(endpoints::WIZARD, post(post_wizard))
        .route(endpoints::TRANSACTIONS_API, post(post_transaction))
        .route(endpoints::CATEGORIES_API, post(post_category))
        .route(endpoints::DELETE_CATEGORY, delete(delete_category))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_guard_hx,
        ));

    views
        .merge(api)
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        )
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}
