//! HTTP adapter over [`Household`].
//!
//! Liveness probe plus JSON routes carrying typed request bodies. Ledger
//! calls block on SQLite, so every handler hops onto the blocking pool.
//! Mutating routes require `Authorization: Bearer <token>` when a token is
//! configured.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::{FairflatError, Result};
use crate::household::Household;

#[derive(Clone)]
struct GatewayState {
    household: Arc<Household>,
    bearer_token: Option<String>,
}

#[derive(Deserialize)]
struct ClaimBody {
    task: String,
    actor: String,
}

#[derive(Deserialize)]
struct CookingBody {
    actor: String,
}

#[derive(Deserialize)]
struct DishesBody {
    actor: String,
    #[serde(default)]
    after_cooking: Option<i64>,
}

#[derive(Deserialize)]
struct PenaltyBody {
    reporter: String,
    target: String,
    penalty: String,
}

#[derive(Deserialize)]
struct ConfirmBody {
    confirmer: String,
}

#[derive(Deserialize)]
struct PresenceBody {
    home: bool,
}

#[derive(Deserialize)]
struct ResetBody {
    by: String,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct Created {
    record_id: i64,
}

/// Build the router. Exposed separately from [`run_gateway`] so callers can
/// bind their own listener.
pub fn router(household: Arc<Household>, bearer_token: Option<String>) -> Router {
    let state = GatewayState {
        household,
        bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
    };

    Router::new()
        .route("/health", get(gateway_health))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{task}", get(task_status))
        .route("/penalties", get(list_penalties).post(penalize))
        .route("/claims", get(pending_claims).post(claim_task))
        .route("/cooking", post(record_cooking))
        .route("/dishes", post(record_dishes))
        .route("/actions/{id}", get(action).delete(retract))
        .route("/actions/{id}/confirm", post(confirm))
        .route("/actions/{id}/confirmers", get(eligible_confirmers))
        .route("/members", get(members))
        .route("/members/{identity}/presence", put(set_presence))
        .route("/members/{identity}/balance", get(balance))
        .route("/members/{identity}/history", get(history))
        .route("/stats", get(weekly_summary))
        .route("/admin/reset", post(reset_all))
        .with_state(state)
}

pub async fn run_gateway(config: GatewayConfig, household: Arc<Household>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let app = router(household, config.bearer_token);

    tracing::info!("fairflat gateway listening on http://{local_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn gateway_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

fn bearer_is_valid(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected_token) = expected else {
        return true;
    };
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let candidate = header_value
        .strip_prefix("Bearer ")
        .unwrap_or_default()
        .trim();
    !expected_token.is_empty() && candidate == expected_token
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "unauthorized"})),
    )
        .into_response()
}

fn status_for(err: &FairflatError) -> StatusCode {
    match err {
        FairflatError::NotFound(_) => StatusCode::NOT_FOUND,
        FairflatError::InvalidState(_) => StatusCode::CONFLICT,
        FairflatError::IdentityViolation(_) => StatusCode::FORBIDDEN,
        FairflatError::Ledger(_) | FairflatError::Config(_) | FairflatError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: &FairflatError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::error!(error = %err, "gateway request failed");
    }
    (
        status,
        Json(serde_json::json!({
            "error": err.code(),
            "reason": err.to_string(),
        })),
    )
        .into_response()
}

/// Run `f` against the household on the blocking pool and render the result.
async fn with_household<T, F>(state: &GatewayState, success: StatusCode, f: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&Household) -> Result<T> + Send + 'static,
{
    let household = Arc::clone(&state.household);
    match tokio::task::spawn_blocking(move || f(&household)).await {
        Ok(Ok(value)) => (success, Json(value)).into_response(),
        Ok(Err(err)) => error_response(&err),
        Err(join_err) => {
            tracing::error!(error = %join_err, "gateway worker panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal"})),
            )
                .into_response()
        }
    }
}

async fn list_tasks(State(state): State<GatewayState>) -> Response {
    with_household(&state, StatusCode::OK, |h| Ok(h.list_tasks().to_vec())).await
}

async fn list_penalties(State(state): State<GatewayState>) -> Response {
    with_household(&state, StatusCode::OK, |h| Ok(h.list_penalties().to_vec())).await
}

async fn task_status(State(state): State<GatewayState>, Path(task): Path<String>) -> Response {
    with_household(&state, StatusCode::OK, move |h| h.task_status(&task)).await
}

async fn pending_claims(State(state): State<GatewayState>) -> Response {
    with_household(&state, StatusCode::OK, Household::pending_claims).await
}

async fn claim_task(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<ClaimBody>,
) -> Response {
    if !bearer_is_valid(&headers, state.bearer_token.as_deref()) {
        return unauthorized();
    }
    with_household(&state, StatusCode::CREATED, move |h| {
        h.claim_task(&body.task, &body.actor)
            .map(|record_id| Created { record_id })
    })
    .await
}

async fn record_cooking(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<CookingBody>,
) -> Response {
    if !bearer_is_valid(&headers, state.bearer_token.as_deref()) {
        return unauthorized();
    }
    with_household(&state, StatusCode::CREATED, move |h| {
        h.record_cooking(&body.actor)
            .map(|record_id| Created { record_id })
    })
    .await
}

async fn record_dishes(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<DishesBody>,
) -> Response {
    if !bearer_is_valid(&headers, state.bearer_token.as_deref()) {
        return unauthorized();
    }
    with_household(&state, StatusCode::CREATED, move |h| {
        h.record_dishes(&body.actor, body.after_cooking)
            .map(|record_id| Created { record_id })
    })
    .await
}

async fn penalize(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<PenaltyBody>,
) -> Response {
    if !bearer_is_valid(&headers, state.bearer_token.as_deref()) {
        return unauthorized();
    }
    with_household(&state, StatusCode::CREATED, move |h| {
        h.penalize(&body.reporter, &body.target, &body.penalty)
            .map(|record_id| Created { record_id })
    })
    .await
}

async fn action(State(state): State<GatewayState>, Path(id): Path<i64>) -> Response {
    with_household(&state, StatusCode::OK, move |h| h.action(id)).await
}

async fn confirm(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<ConfirmBody>,
) -> Response {
    if !bearer_is_valid(&headers, state.bearer_token.as_deref()) {
        return unauthorized();
    }
    with_household(&state, StatusCode::OK, move |h| h.confirm(id, &body.confirmer)).await
}

async fn retract(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !bearer_is_valid(&headers, state.bearer_token.as_deref()) {
        return unauthorized();
    }
    with_household(&state, StatusCode::OK, move |h| h.retract(id)).await
}

async fn eligible_confirmers(State(state): State<GatewayState>, Path(id): Path<i64>) -> Response {
    with_household(&state, StatusCode::OK, move |h| h.eligible_confirmers(id)).await
}

async fn members(State(state): State<GatewayState>) -> Response {
    with_household(&state, StatusCode::OK, Household::members).await
}

async fn set_presence(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(identity): Path<String>,
    Json(body): Json<PresenceBody>,
) -> Response {
    if !bearer_is_valid(&headers, state.bearer_token.as_deref()) {
        return unauthorized();
    }
    with_household(&state, StatusCode::OK, move |h| {
        h.set_presence(&identity, body.home)?;
        h.member(&identity)
    })
    .await
}

async fn balance(State(state): State<GatewayState>, Path(identity): Path<String>) -> Response {
    with_household(&state, StatusCode::OK, move |h| {
        let balance = h.balance_of(&identity)?;
        Ok(serde_json::json!({"identity": identity, "balance": balance}))
    })
    .await
}

async fn history(
    State(state): State<GatewayState>,
    Path(identity): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    with_household(&state, StatusCode::OK, move |h| {
        let limit = query.limit.unwrap_or(h.config().ledger.history_limit);
        h.history_of(&identity, limit)
    })
    .await
}

async fn weekly_summary(State(state): State<GatewayState>) -> Response {
    with_household(&state, StatusCode::OK, Household::weekly_summary).await
}

async fn reset_all(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<ResetBody>,
) -> Response {
    if !bearer_is_valid(&headers, state.bearer_token.as_deref()) {
        return unauthorized();
    }
    with_household(&state, StatusCode::OK, move |h| h.reset_all(&body.by)).await
}
