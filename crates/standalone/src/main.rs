mod config;
mod render;
mod repo;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use http::HeaderMap;
use tower_http::trace::TraceLayer;

use webrcon::pubsub::InProcessPubSub;
use webrcon::repo::{ServerRepository, UserRepository};
use webrcon::services::{HeartbeatPublisher, RconService, ServerStatusService, ServiceSupervisor};
use webrcon_client_api::renderer::HtmlRenderer;
use webrcon_client_api::{routes, ConsoleCtx};

use config::Config;
use render::FragmentRenderer;
use repo::{InMemoryServerRepository, InMemoryUserRepository};

#[derive(Debug, Parser)]
#[command(name = "webrcon-standalone", about = "A web console for game server RCON")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "webrcon.toml")]
    config: PathBuf,
    /// Overrides the configured bind address.
    #[arg(long)]
    listen: Option<SocketAddr>,
}

struct StandaloneCtx {
    pubsub: Arc<InProcessPubSub>,
    renderer: Arc<dyn HtmlRenderer>,
    servers: Arc<dyn ServerRepository>,
    users: Arc<dyn UserRepository>,
}

impl ConsoleCtx for StandaloneCtx {
    fn pubsub(&self) -> Arc<InProcessPubSub> {
        Arc::clone(&self.pubsub)
    }

    fn renderer(&self) -> Arc<dyn HtmlRenderer> {
        Arc::clone(&self.renderer)
    }

    fn servers(&self) -> Arc<dyn ServerRepository> {
        Arc::clone(&self.servers)
    }

    fn users(&self) -> Arc<dyn UserRepository> {
        Arc::clone(&self.users)
    }

    /// The standalone build trusts the `token` cookie as the username claim.
    /// Anything stronger (JWT validation, sessions) belongs to the embedding
    /// deployment.
    fn current_user(&self, headers: &HeaderMap) -> Option<String> {
        let cookies = headers.get(http::header::COOKIE)?.to_str().ok()?;
        cookies.split(';').find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == "token" && !value.is_empty()).then(|| value.to_owned())
        })
    }
}

#[derive(Clone)]
struct StatusState {
    status: Arc<ServerStatusService>,
    servers: Arc<dyn ServerRepository>,
}

/// Aggregate connection state as JSON, for scripts and liveness checks. The
/// HTML pages of a full deployment read the same aggregator.
async fn server_statuses(State(state): State<StatusState>) -> Json<serde_json::Value> {
    let uids = match state.servers.get_all().await {
        Ok(servers) => servers.into_iter().map(|s| s.uid).collect::<Vec<_>>(),
        Err(err) => {
            log::error!("listing servers failed: {err:#}");
            Vec::new()
        }
    };
    let statuses = state
        .status
        .get_states(uids)
        .into_iter()
        .map(|(uid, status)| (uid.to_string(), serde_json::json!({ "rcon_connected": status.rcon_connected })))
        .collect::<serde_json::Map<_, _>>();
    Json(serde_json::Value::Object(statuses))
}

fn init_tracing(log_filter: &str) -> anyhow::Result<()> {
    // The libraries log through the `log` facade; without this bridge none
    // of their records would reach the subscriber.
    tracing_log::LogTracer::init().context("installing log bridge")?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_filter))
        .context("invalid log filter")?;
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("cannot listen for shutdown signal: {err}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default(&args.config)?;
    init_tracing(&config.log_filter)?;

    let pubsub = Arc::new(InProcessPubSub::new());
    let supervisor = ServiceSupervisor::new();
    let retry = config.retry.to_retry_config();
    let heartbeat_interval = config.heartbeat_interval();

    let servers: Vec<_> = config.servers.into_iter().map(|s| s.into_server()).collect();
    let users: Vec<_> = config.users.into_iter().map(|u| u.into_user()).collect();
    if users.is_empty() {
        log::warn!("no users configured, every websocket will be rejected");
    }

    let server_repo: Arc<dyn ServerRepository> =
        Arc::new(InMemoryServerRepository::new(servers.clone()));
    let user_repo: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new(users));

    let status_service = Arc::new(ServerStatusService::new(Arc::clone(&pubsub)));
    let status_actor: Arc<dyn webrcon::services::Service> = status_service.clone();
    supervisor.launch(status_actor, true).await;
    supervisor
        .launch(
            Arc::new(HeartbeatPublisher::new(
                Arc::clone(&pubsub),
                heartbeat_interval,
            )),
            true,
        )
        .await;
    for server in &servers {
        log::info!("starting rcon service for `{}` ({})", server.name, server.uid);
        supervisor
            .launch(
                Arc::new(RconService::new(
                    Arc::clone(&pubsub),
                    server.uid,
                    Arc::clone(&server_repo),
                    retry.clone(),
                )),
                true,
            )
            .await;
    }

    let ctx: Arc<dyn ConsoleCtx> = Arc::new(StandaloneCtx {
        pubsub,
        renderer: Arc::new(FragmentRenderer),
        servers: Arc::clone(&server_repo),
        users: user_repo,
    });
    let app = Router::new()
        .route("/servers/status", get(server_statuses))
        .with_state(StatusState {
            status: status_service,
            servers: server_repo,
        })
        .merge(routes::router(ctx))
        .layer(TraceLayer::new_for_http());

    let bind = args.listen.unwrap_or(config.bind);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    log::info!("listening on {bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    supervisor.stop_all().await;
    Ok(())
}
