use std::{
    env::{self},
    fs::OpenOptions,
    net::SocketAddr,
    process::exit,
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
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use finance_tracker::{
    AppState, PasswordHash, SQLiteIdentityProvider, build_router, get_local_offset,
    graceful_shutdown, logging_middleware,
};

/// The web server for finance_tracker.
///
/// Serves plain HTTP and is meant to run behind a reverse proxy that terminates TLS.
/// The secret used to derive the cookie key is read from the `SECRET` environment variable.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The canonical name of the timezone used for "today" and "this month".
    #[arg(long, default_value = "Europe/Moscow")]
    timezone: String,

    /// Requests that take longer than this many seconds are cancelled.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Log the head and body of every request and response.
    #[arg(long)]
    log_bodies: bool,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    if get_local_offset(&args.timezone).is_none() {
        tracing::error!(
            "\"{}\" is not a canonical timezone name, e.g. \"Europe/Moscow\".",
            args.timezone
        );
        exit(1);
    }

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let connection = Connection::open(&args.db_path).unwrap_or_else(|error| {
        panic!("Could not open the database at {}: {error}", args.db_path)
    });
    let provider_connection = Connection::open(&args.db_path).unwrap_or_else(|error| {
        panic!("Could not open the database at {}: {error}", args.db_path)
    });
    provider_connection
        .busy_timeout(Duration::from_secs(5))
        .expect("Could not set the busy timeout");
    let identity_provider =
        SQLiteIdentityProvider::new(provider_connection, PasswordHash::DEFAULT_COST)
            .expect("Could not create the identity provider");

    let state = AppState::new(
        connection,
        &secret,
        &args.timezone,
        Arc::new(identity_provider),
    )
    .expect("Could not initialize the database");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state, Duration::from_secs(args.request_timeout_secs));
    let router = if args.log_bodies {
        router.layer(middleware::from_fn(logging_middleware))
    } else {
        router
    };
    let router = add_tracing_layer(router);

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

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
