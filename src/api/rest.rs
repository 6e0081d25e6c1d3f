// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`.  Account endpoints (register, login,
// logout, session) and the chart parameters are public.  The chart itself
// requires an `Authenticated` session checked via the `RequireLogin`
// extractor.
//
// Credential store calls are blocking SQLite work and run on the blocking
// pool.  CORS is configured permissively for development.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::QueryRejection, Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::{cleared_session_cookie, session_cookie, RequireLogin, SessionCookie};
use crate::api::error::ApiError;
use crate::app_state::AppState;
use crate::dashboard::{build_dashboard, ChartRequest, DashboardOutcome};
use crate::session::{GateEvent, GateState};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .route("/api/v1/logout", post(logout))
        .route("/api/v1/session", get(session))
        .route("/api/v1/chart/params", get(chart_params))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/chart", get(chart))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    users: u64,
    active_sessions: usize,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let st = state.clone();
    let users = tokio::task::spawn_blocking(move || st.credentials.user_count())
        .await
        .context("user count task failed")??;

    Ok(Json(HealthResponse {
        status: "ok",
        users,
        active_sessions: state.sessions.len(),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    }))
}

// =============================================================================
// Account endpoints (public)
// =============================================================================

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(creds): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let username = creds.username.clone();
    let created = tokio::task::spawn_blocking(move || {
        st.credentials.register(&creds.username, &creds.password)
    })
    .await
    .context("register task failed")??;

    if !created {
        warn!(username = %username, "registration rejected: username taken");
        return Err(ApiError::Conflict(
            "Username already exists. Please choose another username.".into(),
        ));
    }

    info!(username = %username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful! Please log in.",
        }),
    ))
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    session: GateState,
}

async fn login(
    State(state): State<Arc<AppState>>,
    SessionCookie(existing): SessionCookie,
    Json(creds): Json<Credentials>,
) -> Result<Response, ApiError> {
    let st = state.clone();
    let username = creds.username.clone();
    let ok = tokio::task::spawn_blocking(move || {
        st.credentials.authenticate(&creds.username, &creds.password)
    })
    .await
    .context("login task failed")??;

    if !ok {
        if let Some(id) = existing.as_deref() {
            state.sessions.apply(id, GateEvent::LoginFailed);
        }
        warn!(username = %username, "login failed");
        return Err(ApiError::Unauthorized("Invalid username or password.".into()));
    }

    // A successful login always starts a fresh session.
    if let Some(old) = existing.as_deref() {
        state.sessions.apply(old, GateEvent::Logout);
    }
    let pruned = state.sessions.prune_expired();
    let id = state.sessions.create();
    let gate = state.sessions.apply(&id, GateEvent::LoginSucceeded { username });
    let cookie = session_cookie(&id)
        .ok_or_else(|| ApiError::Internal("Could not create a session.".into()))?;

    info!(session = %id, pruned, "login succeeded");
    let mut response = Json(LoginResponse {
        message: "Login successful!",
        session: gate,
    })
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

async fn logout(
    State(state): State<Arc<AppState>>,
    SessionCookie(existing): SessionCookie,
) -> Response {
    if let Some(id) = existing.as_deref() {
        state.sessions.apply(id, GateEvent::Logout);
    }

    let mut response = Json(MessageResponse {
        message: "You have logged out.",
    })
    .into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, cleared_session_cookie());
    response
}

async fn session(
    State(state): State<Arc<AppState>>,
    SessionCookie(existing): SessionCookie,
) -> Json<GateState> {
    let gate = match existing.as_deref() {
        Some(id) => state.sessions.state(id),
        None => GateState::Anonymous,
    };
    Json(gate)
}

// =============================================================================
// Chart (authenticated)
// =============================================================================

async fn chart_params(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let defaults = &state.config.chart;
    Json(serde_json::json!({
        "ticker": defaults.ticker,
        "start_date": defaults.start_date,
        "end_date": chrono::Utc::now().date_naive(),
        "ma_window": defaults.ma_window,
        "bb_window": defaults.bb_window,
        "rsi_period": defaults.rsi_period,
        "band_multiplier": defaults.band_multiplier,
    }))
}

/// Query string of `GET /api/v1/chart`.  Anything omitted takes the
/// configured default.
#[derive(Debug, Default, Deserialize)]
struct ChartQuery {
    ticker: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    ma_window: Option<usize>,
    bb_window: Option<usize>,
    rsi_period: Option<usize>,
    show_volume: Option<bool>,
    show_table: Option<bool>,
}

impl ChartQuery {
    fn resolve(self, state: &AppState) -> ChartRequest {
        let d = &state.config.chart;
        ChartRequest {
            ticker: self.ticker.unwrap_or_else(|| d.ticker.clone()),
            start: self.start.unwrap_or(d.start_date),
            end: self.end.unwrap_or_else(|| chrono::Utc::now().date_naive()),
            ma_window: self.ma_window.unwrap_or(d.ma_window.default),
            bb_window: self.bb_window.unwrap_or(d.bb_window.default),
            rsi_period: self.rsi_period.unwrap_or(d.rsi_period.default),
            show_volume: self.show_volume.unwrap_or(false),
            show_table: self.show_table.unwrap_or(false),
        }
    }
}

async fn chart(
    login: RequireLogin,
    State(state): State<Arc<AppState>>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = query.resolve(&state);
    info!(
        user = %login.username,
        session = %login.session_id,
        ticker = %request.ticker,
        start = %request.start,
        end = %request.end,
        "chart requested"
    );

    let outcome = build_dashboard(state.market_data.as_ref(), &state.config.chart, &request).await?;

    let body = match outcome {
        DashboardOutcome::Chart(spec) => serde_json::json!({
            "status": "ok",
            "chart": spec,
        }),
        DashboardOutcome::NoData { ticker, warning } => serde_json::json!({
            "status": "no_data",
            "ticker": ticker,
            "warning": warning,
        }),
    };
    Ok(Json(body).into_response())
}

// =============================================================================
// Tests
// =============================================================================
