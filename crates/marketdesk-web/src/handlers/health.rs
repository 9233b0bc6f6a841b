use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let providers = state
        .orchestrator()
        .provider_statuses()
        .into_iter()
        .map(|status| {
            json!({
                "provider": status.provider,
                "name": status.provider.display_name(),
                "available": status.available,
                "capabilities": status.capabilities,
            })
        })
        .collect::<Vec<_>>();

    Json(json!({
        "status": "ok",
        "startedAt": state.started_at,
        "providers": providers,
    }))
}
