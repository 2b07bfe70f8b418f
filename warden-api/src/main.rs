//! warden-api — read-only HTTP facade over a shared RCon pool.
//!
//! Routes (GET only): `/players`, `/players/{name}`, `/teams`,
//! `/server`. Errors come back as `{"message": "…"}`.

mod view;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden_core::v1::{self, Connection};
use warden_core::{ConnectionPool, Deadline, RconConfig, RconError};

#[derive(Clone)]
struct AppState {
    pool: ConnectionPool<Connection>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("warden.toml"));
    let config = RconConfig::load(&config_path);

    info!("warden-api v{}", env!("CARGO_PKG_VERSION"));
    info!("rcon target: {}:{}", config.server.host, config.server.port);

    let pool = v1::connection_pool_with(
        config.server.host.clone(),
        config.server.port,
        config.server.password.clone(),
        config.pool_options(),
    );

    let app = Router::new()
        .route("/players", get(list_players))
        .route("/players/{name}", get(show_player))
        .route("/teams", get(show_teams))
        .route("/server", get(show_server))
        .with_state(AppState { pool });

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────

async fn list_players(State(state): State<AppState>) -> Result<Response, ApiError> {
    let players = state
        .pool
        .with_connection(request_deadline(), |mut conn| async move {
            conn.player_ids().await
        })
        .await?;
    Ok(Json(json!({ "player_ids": players })).into_response())
}

async fn show_player(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let info = state
        .pool
        .with_connection(request_deadline(), |mut conn| async move {
            conn.player_info(&name).await
        })
        .await
        .map_err(|e| match e {
            // An unknown player is a rejection, not a server fault.
            RconError::CommandFailed => ApiError::not_found("no such player"),
            other => other.into(),
        })?;
    Ok(Json(info).into_response())
}

async fn show_teams(State(state): State<AppState>) -> Result<Response, ApiError> {
    let teams = view::team_view(&state.pool).await?;
    Ok(Json(teams).into_response())
}

async fn show_server(State(state): State<AppState>) -> Result<Response, ApiError> {
    let pool = &state.pool;

    // Three parallel sub-fetches, each on its own pooled socket.
    let name = pool.with_connection(request_deadline(), |mut conn| async move {
        conn.server_name().await
    });
    let slots = pool.with_connection(request_deadline(), |mut conn| async move {
        conn.slots().await
    });
    let game_state = pool.with_connection(request_deadline(), |mut conn| async move {
        conn.game_state().await
    });
    let (name, slots, game_state) = tokio::try_join!(name, slots, game_state)?;

    let info = view::ServerInfo {
        name,
        map: game_state.map,
        next_map: game_state.next_map,
        player_count: slots.0,
        max_players: slots.1,
        players: game_state.players,
        game_score: game_state.score,
        remaining_time_secs: game_state.remaining_time.as_secs(),
    };
    Ok(Json(info).into_response())
}

fn request_deadline() -> Deadline {
    Deadline::after(Duration::from_secs(10))
}

// ── Errors ───────────────────────────────────────────────────────

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.to_string(),
        }
    }
}

impl From<RconError> for ApiError {
    fn from(e: RconError) -> Self {
        let status = match &e {
            RconError::PoolTimeout => StatusCode::GATEWAY_TIMEOUT,
            RconError::InvalidCredentials => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}
