use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::time::Duration;

use storefront::config::Config;
use storefront::handlers;
use storefront::orders::reconcile;
use storefront::payments::StripeClient;
use storefront::state::AppState;
use storefront::store::StoreClient;

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "Payment and order backend for a headless CMS shop")]
struct Cli {
    /// Run a single reconciliation sweep and exit instead of serving
    #[arg(long)]
    reconcile: bool,
}

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    // One shared HTTP client with the configured request timeout
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .expect("Failed to build HTTP client");

    let state = AppState {
        stripe: StripeClient::new(http_client.clone(), &config.stripe),
        store: StoreClient::new(http_client, &config.store),
        checkout_success_url: config.checkout_success_url.clone(),
        checkout_cancel_url: config.checkout_cancel_url.clone(),
        reconcile: config.reconcile,
    };

    // One-shot maintenance mode (don't start the server)
    if cli.reconcile {
        match reconcile::reconcile_orders(&state).await {
            Ok(outcome) => {
                tracing::info!(
                    "Reconciliation complete: {} listed, {} created, {} skipped, {} failed",
                    outcome.listed,
                    outcome.created,
                    outcome.skipped,
                    outcome.failed
                );
                if outcome.failed > 0 {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                tracing::error!("Reconciliation failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Start the periodic reconciliation sweep
    reconcile::spawn_reconcile_task(state.clone());

    // Build the application router
    let app = Router::new()
        // Catalog passthrough (read-only)
        .merge(handlers::catalog::router())
        // Checkout session creation
        .merge(handlers::checkout::router())
        // Webhook endpoint (signature auth)
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Storefront server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
