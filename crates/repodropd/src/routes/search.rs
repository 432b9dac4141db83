//! `GET /api/search`: loopback-only record search.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use repodrop_core::run_search;

use crate::app::AppState;
use crate::error::SearchError;

const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub debug: Option<String>,
    pub filter: Option<String>,
}

fn is_loopback_name(client: &str) -> bool {
    client.eq_ignore_ascii_case("localhost")
        || client
            .parse::<IpAddr>()
            .map(|ip| ip.to_canonical().is_loopback())
            .unwrap_or(false)
}

/// The address the loopback gate judges: a non-empty `X-Forwarded-For`
/// value when present, otherwise the connecting peer.
pub fn client_address(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

pub async fn search(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Value>>, SearchError> {
    let debug_enabled = params
        .debug
        .as_deref()
        .is_some_and(|flag| flag.eq_ignore_ascii_case("true"));
    if !debug_enabled {
        return Err(SearchError::DebugRequired);
    }

    let client = client_address(&headers, peer);
    debug!(client = %client, peer = %peer, "search gate");
    if !is_loopback_name(&client) {
        warn!(event = "search.denied", client = %client);
        return Err(SearchError::LocalOnly { client });
    }

    let raw = params
        .filter
        .filter(|f| !f.is_empty())
        .ok_or(SearchError::MissingFilter)?;
    let filter: Value =
        serde_json::from_str(&raw).map_err(|e| SearchError::InvalidJson(e.to_string()))?;

    let results = run_search(state.records.as_ref(), &filter, &state.filter_policy).await?;
    Ok(Json(results))
}
