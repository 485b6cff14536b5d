//! Server Assembly
//!
//! Builds the full middleware stack around the API routes and runs the
//! listener with graceful shutdown.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::Router;
use tokio::signal;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use mcpress_core::config::{get_config, get_config_bool, get_config_int};

use crate::routes::api_router;
use crate::state::SharedState;

/// Outer bound on one API request, long enough for a full provider
/// round trip including tool execution.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per minute per IP
    pub requests_per_minute: u64,
    /// Burst size (additional requests allowed)
    pub burst_size: u32,
    /// Enable rate limiting
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 100,
            burst_size: 20,
            enabled: true,
        }
    }
}

/// Web server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Settings from the environment, `MCPRESS_PORT` falling back to the
    /// conventional `PORT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let raw_port = get_config_int(
            "MCPRESS_PORT",
            get_config_int("PORT", i64::from(defaults.port)),
        );
        Self {
            host: get_config("MCPRESS_HOST", &defaults.host),
            port: narrow("MCPRESS_PORT", raw_port, defaults.port),
            cors_enabled: get_config_bool("MCPRESS_CORS", defaults.cors_enabled),
            rate_limit: RateLimitConfig {
                requests_per_minute: narrow(
                    "MCPRESS_RATE_LIMIT_PER_MINUTE",
                    get_config_int("MCPRESS_RATE_LIMIT_PER_MINUTE", 100),
                    100,
                ),
                burst_size: narrow(
                    "MCPRESS_RATE_LIMIT_BURST",
                    get_config_int("MCPRESS_RATE_LIMIT_BURST", 20),
                    20,
                ),
                enabled: get_config_bool("MCPRESS_RATE_LIMIT", true),
            },
        }
    }

    pub fn addr(&self) -> SocketAddr {
        let ip: IpAddr = self
            .host
            .parse()
            .unwrap_or_else(|_| IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        SocketAddr::from((ip, self.port))
    }
}

/// Narrow a raw integer setting to its target type. An out-of-range value
/// keeps the default instead of wrapping through a cast.
fn narrow<T>(key: &str, raw: i64, default: T) -> T
where
    T: TryFrom<i64> + Copy + std::fmt::Display,
{
    match T::try_from(raw) {
        Ok(value) => value,
        Err(_) => {
            warn!("{} value {} is out of range, using {}", key, raw, default);
            default
        }
    }
}

/// Web server
pub struct WebServer {
    config: ServerConfig,
    state: SharedState,
}

impl WebServer {
    pub fn new(config: ServerConfig, state: SharedState) -> Self {
        Self { config, state }
    }

    /// Build the router with the middleware stack.
    pub fn router(&self) -> Router {
        let app = Router::new()
            .nest("/api", api_router())
            .with_state(self.state.clone());

        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)));
        let app = app.layer(middleware);

        let app = if self.config.rate_limit.enabled {
            let per_second = (self.config.rate_limit.requests_per_minute / 60).max(1);
            info!(
                "rate limiting enabled: {} requests/second, burst {}",
                per_second, self.config.rate_limit.burst_size
            );
            let governor_conf = GovernorConfigBuilder::default()
                .per_second(per_second)
                .burst_size(self.config.rate_limit.burst_size)
                .finish()
                .unwrap();
            app.layer(GovernorLayer {
                config: governor_conf.into(),
            })
        } else {
            app
        };

        if self.config.cors_enabled {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app.layer(cors)
        } else {
            app
        }
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.config.addr();
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("listening on http://{}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("received terminate signal, shutting down");
        },
    }
}
