//! Gadget Shop Storefront - catalog, cart and checkout JSON API.
//!
//! # Architecture
//!
//! - Axum web framework serving JSON
//! - In-memory catalog read model, loaded from `PostgreSQL` when configured
//!   or from a YAML seed file otherwise
//! - Customers, carts and orders held by the shop service and written
//!   through to `PostgreSQL` when configured
//!
//! Migrations are not run on startup; use `gs-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::ServiceExt;
use axum::extract::Request;
use sentry::integrations::tracing as sentry_tracing;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gadget_shop_core::Catalog;
use gadget_shop_storefront::{
    app,
    config::StorefrontConfig,
    db::{self, AccountRepository, CatalogRepository, StoredAccounts},
    seed::{CatalogSeed, SeedSummary},
    state::AppState,
};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gadget_shop_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            Some(pool)
        }
        None => None,
    };

    let catalog = load_catalog(&config, pool.as_ref()).await;
    let summary = SeedSummary::of(&catalog);
    tracing::info!(
        categories = summary.categories,
        features = summary.features,
        validators = summary.validators,
        products = summary.products,
        "Catalog loaded"
    );

    let accounts = match &pool {
        Some(pool) => AccountRepository::new(pool)
            .load()
            .await
            .expect("Failed to load accounts from database"),
        None => StoredAccounts::default(),
    };
    tracing::info!(
        customers = accounts.customers.len(),
        carts = accounts.carts.len(),
        orders = accounts.orders.len(),
        "Accounts loaded"
    );

    let state = AppState::restore(config.clone(), catalog, pool, accounts);

    let router = app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());
    let service = NormalizePathLayer::trim_trailing_slash().layer(router);

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Load the catalog from the database, else from the seed file, else start
/// empty.
async fn load_catalog(config: &StorefrontConfig, pool: Option<&sqlx::PgPool>) -> Catalog {
    if let Some(pool) = pool {
        return CatalogRepository::new(pool)
            .load()
            .await
            .expect("Failed to load catalog from database");
    }
    if let Some(path) = &config.catalog_path {
        tracing::info!(path = %path.display(), "Loading catalog seed");
        return CatalogSeed::read(path)
            .await
            .and_then(CatalogSeed::build)
            .expect("Failed to load catalog seed");
    }
    tracing::warn!("No database or catalog seed configured; starting with an empty catalog");
    Catalog::new()
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
