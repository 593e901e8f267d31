use std::{
    fs::OpenOptions,
    net::SocketAddr,
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use dindin::{
    AppState, SessionContext, SupabaseClient, SupabaseConfig, build_router, graceful_shutdown,
    logging_middleware,
};

/// The web server for DinDin.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The URL of the backend project, e.g. "https://abc.supabase.co".
    #[arg(long, env = "BACKEND_URL")]
    backend_url: String,

    /// The backend project's public anonymous key.
    #[arg(long, env = "BACKEND_ANON_KEY")]
    anon_key: String,

    /// The canonical name of the local timezone, e.g. "America/Sao_Paulo".
    #[arg(long, env = "LOCAL_TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// How many seconds to wait for a backend request before giving up.
    #[arg(long, default_value_t = 15)]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = setup_logging() {
        eprintln!("Could not set up logging: {error}");
        return ExitCode::FAILURE;
    }

    let client = match SupabaseClient::new(SupabaseConfig {
        url: args.backend_url,
        anon_key: args.anon_key,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    }) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            tracing::error!("Could not create the backend client: {error}");
            return ExitCode::FAILURE;
        }
    };

    let (session, session_subscription) = SessionContext::mount(client.clone());

    let state = match AppState::new(client.clone(), client, session, &args.timezone) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Could not create the app state: {error}");
            return ExitCode::FAILURE;
        }
    };

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    tracing::info!("HTTP server listening on {}", addr);

    let result = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await;

    session_subscription.unsubscribe();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("Server error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() -> std::io::Result<()> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
