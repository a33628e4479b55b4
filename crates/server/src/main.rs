use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, Redirect},
    routing::{get, post},
    Json, Router,
};
use server_api::{BindingError, SessionGameBinding};
use shared::{
    domain::Player,
    error::ApiError,
    protocol::{game_route, player1_scores_route, player2_scores_route, score_route, ScoreView},
    score::ScoreState,
};
use storage::{MemorySessionStore, SessionStore, Storage};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod session;

use app_state::AppState;
use config::{load_settings, normalize_database_url, SessionBackend, Settings};
use session::{resolve_session, CurrentSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let store = open_session_store(&settings).await?;
    let state = AppState {
        games: SessionGameBinding::new(store),
        session_cookie: settings.session_cookie.clone(),
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, backend = ?settings.session_backend, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn open_session_store(settings: &Settings) -> anyhow::Result<Arc<dyn SessionStore>> {
    match settings.session_backend {
        SessionBackend::Memory => {
            warn!("using in-memory session store; games are lost on restart");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        SessionBackend::Sqlite => {
            let database_url = normalize_database_url(&settings.database_url);
            let storage = Storage::new(&database_url).await.map_err(|error| {
                error!(
                    %database_url,
                    %error,
                    "failed to open SQLite session store; verify parent directory exists and permissions are correct"
                );
                error
            })?;
            Ok(Arc::new(storage))
        }
    }
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(game_route()) }))
        .route("/game", get(show_game))
        .route(game_route(), get(show_game))
        .route(score_route(), get(http_score))
        .route(player1_scores_route(), post(player1_scores))
        .route(player2_scores_route(), post(player2_scores))
        .route_layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .route("/healthz", get(healthz))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.games.store().health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            warn!(%error, "session store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn show_game(
    State(state): State<Arc<AppState>>,
    CurrentSession(session_id): CurrentSession,
) -> Result<Html<String>, (StatusCode, Json<ApiError>)> {
    let game = state
        .games
        .get_or_create_game(session_id)
        .await
        .map_err(binding_failure)?;
    Ok(Html(render_game_page(&game)))
}

async fn http_score(
    State(state): State<Arc<AppState>>,
    CurrentSession(session_id): CurrentSession,
) -> Result<Json<ScoreView>, (StatusCode, Json<ApiError>)> {
    let game = state
        .games
        .get_or_create_game(session_id)
        .await
        .map_err(binding_failure)?;
    Ok(Json(ScoreView::from(&game)))
}

async fn player1_scores(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> Result<Redirect, (StatusCode, Json<ApiError>)> {
    score_point(&state, session, Player::One).await
}

async fn player2_scores(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> Result<Redirect, (StatusCode, Json<ApiError>)> {
    score_point(&state, session, Player::Two).await
}

/// Both outcomes land back on the game page; a missing game is started there.
async fn score_point(
    state: &AppState,
    CurrentSession(session_id): CurrentSession,
    player: Player,
) -> Result<Redirect, (StatusCode, Json<ApiError>)> {
    match state.games.apply_point_and_persist(session_id, player).await {
        Ok(_) => Ok(Redirect::to(game_route())),
        Err(BindingError::GameNotFound(_)) => {
            info!(%session_id, %player, "no game for session; redirecting to start one");
            Ok(Redirect::to(game_route()))
        }
        Err(err) => Err(binding_failure(err)),
    }
}

fn binding_failure(err: BindingError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        BindingError::SessionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        BindingError::GameNotFound(_) => StatusCode::NOT_FOUND,
    };
    error!(error = %err, "game request failed");
    (status, Json(ApiError::from(&err)))
}

fn render_game_page(game: &ScoreState) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Tennis Game</title>
</head>
<body>
  <h1>Tennis Game</h1>
  <p id="score">{label}</p>
  <form method="post" action="{p1}"><button type="submit">Player 1 scores</button></form>
  <form method="post" action="{p2}"><button type="submit">Player 2 scores</button></form>
</body>
</html>
"#,
        label = game.render_label(),
        p1 = player1_scores_route(),
        p2 = player2_scores_route(),
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
