use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use eyre::Result;
use rusqlite::Connection;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::error;

use crate::client::EtherscanClient;
use crate::db;
use crate::error::StatsError;
use crate::models::{self, SortOrder};
use crate::normalize::{FixedRates, StableTokens};
use crate::pipeline::{self, ReportRequest};

#[derive(Clone)]
pub struct AppState {
    pub conn: Arc<Mutex<Connection>>,
    pub client: Arc<EtherscanClient>,
    pub rates: FixedRates,
    pub tokens: StableTokens,
}

/// Query flags for `GET /address/:address`.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    include_internal: bool,
    #[serde(default = "default_true")]
    include_tokens: bool,
    #[serde(default)]
    exclude_zero_eth: bool,
    #[serde(default)]
    unified: bool,
    #[serde(default)]
    startblock: u64,
    #[serde(default = "default_endblock")]
    endblock: u64,
    #[serde(default = "default_sort")]
    sort: SortOrder,
}

fn default_true() -> bool {
    true
}

fn default_endblock() -> u64 {
    99_999_999
}

fn default_sort() -> SortOrder {
    SortOrder::Asc
}

pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let app = Router::new()
        .route("/address/:address", get(address_stats))
        .route("/history", get(history))
        .with_state(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!(%addr, "HTTP API listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

async fn address_stats(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<models::Report>, ApiError> {
    models::parse_address(&address)
        .map_err(|e| ApiError(StatusCode::BAD_REQUEST, e.to_string()))?;

    {
        let conn = state.conn.lock().await;
        db::record_query(&conn, &address)
            .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    }

    let request = ReportRequest {
        address,
        include_internal: query.include_internal,
        include_tokens: query.include_tokens,
        exclude_zero_eth: query.exclude_zero_eth,
        unified: query.unified,
        startblock: query.startblock,
        endblock: query.endblock,
        sort: query.sort,
    };
    let report = pipeline::compute_report(
        state.client.as_ref(),
        &state.rates,
        &state.tokens,
        &request,
    )
    .await?;
    Ok(Json(report))
}

async fn history(State(state): State<AppState>) -> Result<Json<Vec<models::AddressQuery>>, ApiError> {
    let conn = state.conn.lock().await;
    let rows = db::recent_queries(&conn, 50)
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(rows))
}

struct ApiError(StatusCode, String);

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        let code = match err {
            StatsError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StatsError::Source { .. } | StatsError::Transport(_) | StatsError::Validation(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        ApiError(code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(status = %self.0, message = %self.1, "request failed");
        (self.0, self.1).into_response()
    }
}
