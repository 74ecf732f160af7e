use crate::error::AppResult;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Health/introspection endpoint.
///
/// Endpoint: GET /health
pub async fn health(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let backlog = state.store.recent().await;
    let cache_connected = state.store.cache_connected().await;
    let active_connections = state.registry.count().await;

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "cache_connected": cache_connected,
        "backlog_len": backlog.len(),
        "active_connections": active_connections,
    })))
}
