pub mod alias;
pub mod channels;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod relay;
pub mod responder;
pub mod session;
pub mod shutdown;
pub mod store;
pub mod types;

pub use config::Config;

use self::alias::AliasTable;
use self::channels::whatsapp::SidecarClient;
use self::channels::ProtocolClient;
use self::config::{load_config, resolve_alias_path, resolve_database_url};
use self::error::SessionError;
use self::relay::RelayEngine;
use self::responder::HttpResponder;
use self::session::{SessionManager, SessionState, SessionStatus, TerminalQrRenderer};
use self::types::{PairingEvent, ProtocolEvent};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: Arc<SidecarClient>,
    pub status: SessionStatus,
    pub aliases: Arc<AliasTable>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session: SessionState,
    pub account_id: String,
    pub paired: bool,
    pub aliases: usize,
}

/// Opens the device store, builds the sidecar client and the webhook router.
/// A store that cannot be opened is a fatal startup error.
pub async fn create_app(config: Config, aliases: Arc<AliasTable>) -> anyhow::Result<(AppState, Router)> {
    let db_url = resolve_database_url(&config);
    let (pool, db_kind) = store::connect(&db_url).await?;
    let client = Arc::new(SidecarClient::new(&config.whatsapp, pool, db_kind)?);

    let state = AppState {
        config: config.clone(),
        client,
        status: SessionStatus::default(),
        aliases,
    };

    let webhook_routes = Router::new()
        .route(&config.whatsapp.inbound_path, post(whatsapp_inbound))
        .route(&config.whatsapp.pairing_path, post(whatsapp_pairing))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public_routes = Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status));

    let app = Router::new()
        .merge(webhook_routes)
        .merge(public_routes)
        .with_state(state.clone());

    Ok((state, app))
}

async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> impl IntoResponse {
    if let Some(token) = state.config.auth.token.as_ref() {
        let header = headers.get("X-Relay-Token").and_then(|v| v.to_str().ok());
        if header != Some(token.as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    next.run(req).await
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let paired = state.client.has_session().await.unwrap_or(false);
    Json(StatusResponse {
        session: state.status.get(),
        account_id: state.client.account_id().to_string(),
        paired,
        aliases: state.aliases.len(),
    })
}

async fn whatsapp_inbound(
    State(state): State<AppState>,
    Json(event): Json<ProtocolEvent>,
) -> impl IntoResponse {
    if let Err(err) = state.client.dispatch_event(event).await {
        error!("whatsapp inbound error: {err:?}");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": err.to_string()})),
        )
            .into_response();
    }
    Json(json!({"status": "accepted"})).into_response()
}

async fn whatsapp_pairing(
    State(state): State<AppState>,
    Json(event): Json<PairingEvent>,
) -> impl IntoResponse {
    if let Err(err) = state.client.dispatch_pairing(event).await {
        error!("whatsapp pairing error: {err:?}");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": err.to_string()})),
        )
            .into_response();
    }
    Json(json!({"status": "accepted"})).into_response()
}

/// Runs the bridge until `cancel` fires or a fatal startup error occurs.
///
/// The event sink is registered before the session connects so no message is
/// lost between connect and subscribe. On shutdown the relay drains first and
/// the session disconnects after, so drained replies can still be sent.
pub async fn run(cancel: CancellationToken) -> anyhow::Result<()> {
    let config = load_config();
    let aliases = Arc::new(AliasTable::load(&resolve_alias_path(&config)));
    let (state, app) = create_app(config.clone(), Arc::clone(&aliases)).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening for sidecar webhooks");
    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    let client: Arc<dyn ProtocolClient> = state.client.clone();
    let (tx, rx) = mpsc::channel(config.relay.queue_capacity.max(1));
    client.subscribe_events(tx);

    let responder = Arc::new(HttpResponder::new(&config.responder)?);
    let engine = Arc::new(RelayEngine::new(
        &config.relay,
        aliases,
        responder,
        Arc::clone(&client),
        state.status.clone(),
    ));
    let relay = tokio::spawn(engine.run(rx, cancel.clone()));

    let mut session = SessionManager::new(client, Arc::new(TerminalQrRenderer), state.status.clone());
    let started = session.start(&cancel).await;
    match started {
        Ok(()) => cancel.cancelled().await,
        Err(SessionError::Interrupted) => info!("interrupted before the session was established"),
        Err(_) => cancel.cancel(),
    }

    if let Err(err) = relay.await {
        error!(error = %err, "relay task failed");
    }
    session.shutdown().await;
    match server.await {
        Ok(Err(err)) => error!(error = %err, "http server failed"),
        Err(err) => error!(error = %err, "http server task failed"),
        Ok(Ok(())) => {}
    }

    match started {
        Ok(()) | Err(SessionError::Interrupted) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
