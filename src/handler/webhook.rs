use crate::app::AppState;
use crate::call::app::TurnRequest;
use axum::{
    extract::{Form, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ivr/turn", get(turn_query).post(turn_form))
        .route("/ivr/calls", get(list_calls))
        .route("/ivr/calls/kill/{id}", post(kill_call))
}

/// Gateways that send the turn as query parameters.
async fn turn_query(State(state): State<AppState>, Query(request): Query<TurnRequest>) -> Response {
    handle_turn(state, request).await
}

/// Gateways that post the turn as a form body.
async fn turn_form(State(state): State<AppState>, Form(request): Form<TurnRequest>) -> Response {
    handle_turn(state, request).await
}

async fn handle_turn(state: AppState, request: TurnRequest) -> Response {
    debug!(
        call_id = %request.call_id,
        digits = ?request.digits,
        hangup = request.hangup,
        "turn received"
    );
    let reply = state.sessions.handle_turn(request).await;
    Json(reply).into_response()
}

async fn list_calls(State(state): State<AppState>) -> Response {
    let calls = state.sessions.list_sessions().await;
    Json(serde_json::json!({ "calls": calls })).into_response()
}

async fn kill_call(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let killed = state.sessions.kill(&id).await;
    if killed {
        info!("Call {} killed", id);
    }
    Json(killed).into_response()
}
