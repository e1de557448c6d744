use mcpguard_oauth::{JwksClient, JwksClientConfig, TokenValidator, TokenValidatorConfig};
use mcpguard_protocol::{Dispatcher, ResourceRegistry, ServerInfo, ToolRegistry};
use mcpguard_server::app::{AppState, build_router};
use mcpguard_server::auth::AuthState;
use mcpguard_server::config::{Config, LogFormat};
use std::sync::Arc;
use tokio::net::TcpListener;

const PROTOCOL_VERSION: &str = "2024-11-05";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let http = reqwest::Client::builder().timeout(config.read_timeout).build()?;

    let jwks = JwksClient::new(
        http,
        JwksClientConfig {
            authorization_servers: config.authorization_servers.clone(),
            cache_ttl: config.jwks_cache_ttl,
        },
    );
    let validator = TokenValidator::new(
        TokenValidatorConfig { audience: config.audience.clone(), clock_skew: config.clock_skew },
        jwks,
    );

    let auth_state = Arc::new(AuthState {
        validator,
        metadata_url: config.protected_resource_metadata_url(),
        // No scope-configuration env var is defined in this service's configuration envelope;
        // tool-level scope requirements are left to providers registered into the dispatcher.
        default_required_scopes: Vec::new(),
    });

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(ToolRegistry::new()),
        Arc::new(ResourceRegistry::new()),
        ServerInfo {
            name: "mcpguard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
        },
    ));

    let app_state = Arc::new(AppState {
        dispatcher,
        resource_uri: config.resource_uri(),
        authorization_servers: config.authorization_servers.clone(),
    });

    let router = build_router(app_state, auth_state, config.read_timeout, config.write_timeout);

    let listener = TcpListener::bind(config.server_addr).await?;
    tracing::info!(addr = %config.server_addr, "listening");

    let shutdown_notify = Arc::new(tokio::sync::Notify::new());
    let notify_for_signal = shutdown_notify.clone();

    let server_task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                wait_for_os_signal().await;
                notify_for_signal.notify_one();
            })
            .await
    });

    shutdown_notify.notified().await;
    tracing::info!(idle_timeout = ?config.idle_timeout, "waiting for in-flight requests to finish");

    match tokio::time::timeout(config.idle_timeout, server_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => return Err(err.into()),
        Ok(Err(join_err)) => return Err(join_err.into()),
        Err(_) => tracing::warn!("idle timeout elapsed before in-flight requests finished; exiting anyway"),
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

/// Waits for `SIGINT`/`SIGTERM`, then returns so `axum::serve` stops accepting new connections.
/// How long in-flight requests then get to finish is bounded separately, in `main`, by racing
/// the server task against `config.idle_timeout`.
async fn wait_for_os_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
