//! Keygate Auth Server
//!
//! Key-ownership authentication over HTTP: clients request a challenge,
//! sign it with the key behind their identity, and trade the signature for
//! an opaque session id.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use keygate_server::auth::{
    run_sweeper, AuthService, EvmAddress, EvmPersonalSignOracle, IdentityScheme,
    SignatureOracle, StellarAddress, StellarEd25519Oracle, SystemClock,
};
use keygate_server::config::{Config, IdentitySchemeKind};
use keygate_server::routes::create_router;
use keygate_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        domain = %config.auth_domain,
        scheme = ?config.identity_scheme,
        "Starting Keygate"
    );

    let (scheme, oracle): (Arc<dyn IdentityScheme>, Arc<dyn SignatureOracle>) =
        match config.identity_scheme {
            IdentitySchemeKind::Evm => (Arc::new(EvmAddress), Arc::new(EvmPersonalSignOracle)),
            IdentitySchemeKind::Stellar => {
                (Arc::new(StellarAddress), Arc::new(StellarEd25519Oracle))
            }
        };

    let auth_service = Arc::new(AuthService::new(
        config.auth_settings(),
        scheme,
        oracle,
        Arc::new(SystemClock),
    ));

    // Start expiry sweeper in background
    let sweeper_service = auth_service.clone();
    let sweep_interval = config.sweep_interval();
    tokio::spawn(async move {
        run_sweeper(sweeper_service, sweep_interval).await;
        tracing::error!("Expiry sweeper exited unexpectedly");
    });

    let app_state = AppState::new(auth_service, config.environment);
    let app = create_router(app_state).layer(configure_cors(&config));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins_str.trim().is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
