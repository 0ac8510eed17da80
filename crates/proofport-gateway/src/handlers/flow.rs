//! `/api/flow/*` — the coordinator's own surface, plus the server-sent
//! events stream backed by C1 pub/sub (§4.12).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, StreamExt};
use proofport_flow::ProveExtras;
use proofport_types::Flow;
use serde::Deserialize;
use std::convert::Infallible;

#[derive(Deserialize, Default)]
pub struct GenerateRequest {
    pub country_list: Option<Vec<String>>,
    pub is_included: Option<bool>,
}

pub async fn generate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<Flow>, ApiError> {
    let flow = state
        .flow
        .generate_proof(
            &id,
            ProveExtras {
                country_list: body.country_list,
                is_included: body.is_included,
            },
        )
        .await?;
    Ok(Json(flow))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Flow>, ApiError> {
    let flow = state.flow.get_flow(&id).await?;
    Ok(Json(flow))
}

/// Each `FlowEvent` the subscription yields becomes one SSE message. A
/// subscribe failure (flow already gone, store unavailable) surfaces as
/// a single error event rather than a dangling connection.
pub async fn events(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.subscriber.subscribe(&id).await {
        Ok(event_stream) => {
            let mapped = stream::unfold(event_stream, |mut es| async move {
                let event = es.next().await?;
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some((Ok::<Event, Infallible>(Event::default().data(data)), es))
            });
            Sse::new(mapped).keep_alive(KeepAlive::default()).into_response()
        }
        Err(err) => {
            let data = serde_json::json!({ "error": err.to_string() }).to_string();
            let single = stream::once(async move {
                Ok::<Event, Infallible>(Event::default().event("error").data(data))
            });
            Sse::new(single).keep_alive(KeepAlive::default()).into_response()
        }
    }
}
