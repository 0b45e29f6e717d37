use crate::display;
use crate::errors::{PricingError, PricingResult};
use crate::grid::{PnlGrid, SampleAxis, ValueGrid};
use crate::models::{ContractParams, MarketQuote, OptionPricer, OptionValues};
use crate::state::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

/// Upper bound on samples per axis for a single request.
const MAX_GRID_POINTS: usize = 100;

/// Lowest axis bound the default ranges will produce.
const MIN_AXIS_VALUE: f64 = 0.01;

/// Contract inputs; any missing field falls back to the configured default.
/// `ticker` resolves the spot through the spot source when `spot` is absent.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ContractQuery {
    pub spot: Option<f64>,
    pub ticker: Option<String>,
    pub vol: Option<f64>,
    pub rate: Option<f64>,
    pub strike: Option<f64>,
    pub ttm: Option<f64>,
}

/// Repeats the contract fields; serde_urlencoded cannot parse numbers through `flatten`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct HeatmapQuery {
    pub spot: Option<f64>,
    pub ticker: Option<String>,
    pub vol: Option<f64>,
    pub rate: Option<f64>,
    pub strike: Option<f64>,
    pub ttm: Option<f64>,
    pub spot_min: Option<f64>,
    pub spot_max: Option<f64>,
    pub vol_min: Option<f64>,
    pub vol_max: Option<f64>,
    pub points: Option<usize>,
    pub market_call: Option<f64>,
    pub market_put: Option<f64>,
}

impl HeatmapQuery {
    fn contract(&self) -> ContractQuery {
        ContractQuery {
            spot: self.spot,
            ticker: self.ticker.clone(),
            vol: self.vol,
            rate: self.rate,
            strike: self.strike,
            ttm: self.ttm,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PriceResponse {
    pub model: &'static str,
    pub params: ContractParams,
    #[serde(flatten)]
    pub values: OptionValues,
    pub call_display: String,
    pub put_display: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HeatmapResponse<G> {
    pub params: ContractParams,
    pub vol_labels: Vec<String>,
    pub spot_labels: Vec<String>,
    #[serde(flatten)]
    pub grid: G,
}

/// Error body: `{ "error": "...", "kind": "..." }`.
pub struct ApiError(pub PricingError);

impl From<PricingError> for ApiError {
    fn from(e: PricingError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        (status, Json(body)).into_response()
    }
}

/// GET /api/price -- call/put value for one contract
pub async fn get_price(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ContractQuery>, QueryRejection>,
) -> Result<Json<PriceResponse>, ApiError> {
    let query = parsed(&state, query)?;
    let result = resolve_contract(&state, &query).and_then(|params| {
        let values = state.evaluator.pricer().price(&params)?;
        Ok((params, values))
    });
    let (params, values) = rejected(&state, result)?;
    state.counters.prices_computed.fetch_add(1, Relaxed);

    Ok(Json(PriceResponse {
        model: state.evaluator.pricer().name(),
        params,
        values,
        call_display: display::currency(values.call),
        put_display: display::currency(values.put),
    }))
}

/// GET /api/heatmap -- call/put value grids over spot x volatility
pub async fn get_heatmap(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HeatmapQuery>, QueryRejection>,
) -> Result<Json<HeatmapResponse<ValueGrid>>, ApiError> {
    let query = parsed(&state, query)?;
    let (params, vol_axis, spot_axis) = rejected(&state, resolve_axes(&state, &query))?;

    let worker = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        worker.evaluator.evaluate_grid(
            params.rate,
            params.time_to_maturity,
            params.strike,
            &vol_axis,
            &spot_axis,
        )
    })
    .await
    .map_err(PricingError::from)
    .and_then(|r| r);
    let grid = rejected(&state, result)?;
    state.counters.record_grid(grid.vol_axis.len() * grid.spot_axis.len());

    Ok(Json(HeatmapResponse {
        params,
        vol_labels: grid.vol_axis.labels(),
        spot_labels: grid.spot_axis.labels(),
        grid,
    }))
}

/// GET /api/pnl -- model value minus market quote over spot x volatility
pub async fn get_pnl(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HeatmapQuery>, QueryRejection>,
) -> Result<Json<HeatmapResponse<PnlGrid>>, ApiError> {
    let query = parsed(&state, query)?;
    let (params, vol_axis, spot_axis) = rejected(&state, resolve_axes(&state, &query))?;
    let quote = MarketQuote {
        call: query.market_call.unwrap_or(state.config.default_quote.call),
        put: query.market_put.unwrap_or(state.config.default_quote.put),
    };

    let worker = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        worker.evaluator.evaluate_pnl_grid(
            params.rate,
            params.time_to_maturity,
            params.strike,
            &vol_axis,
            &spot_axis,
            quote,
        )
    })
    .await
    .map_err(PricingError::from)
    .and_then(|r| r);
    let grid = rejected(&state, result)?;
    state.counters.record_grid(grid.vol_axis.len() * grid.spot_axis.len());

    Ok(Json(HeatmapResponse {
        params,
        vol_labels: grid.vol_axis.labels(),
        spot_labels: grid.spot_axis.labels(),
        grid,
    }))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "prices_computed": state.counters.prices_computed.load(Relaxed),
        "grids_evaluated": state.counters.grids_evaluated.load(Relaxed),
        "cells_evaluated": state.counters.cells_evaluated.load(Relaxed),
        "requests_rejected": state.counters.requests_rejected.load(Relaxed),
    }))
}

/// Counts and logs a failed request before handing the error to axum.
fn rejected<T>(state: &AppState, result: PricingResult<T>) -> Result<T, ApiError> {
    result.map_err(|e| {
        state.counters.requests_rejected.fetch_add(1, Relaxed);
        tracing::warn!(error = %e, kind = e.kind(), "request rejected");
        ApiError(e)
    })
}

/// Unparseable query strings go through the same JSON error path as pricing errors.
fn parsed<T>(state: &AppState, query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    let result = query
        .map(|Query(q)| q)
        .map_err(|e| PricingError::Request(e.body_text()));
    rejected(state, result)
}

fn resolve_contract(state: &AppState, query: &ContractQuery) -> PricingResult<ContractParams> {
    let defaults = state.config.default_contract;
    let spot = match (query.spot, query.ticker.as_deref()) {
        (Some(spot), _) => spot,
        (None, Some(ticker)) => state.spots.spot(ticker)?,
        (None, None) => defaults.spot,
    };

    let params = ContractParams {
        spot,
        volatility: query.vol.unwrap_or(defaults.volatility),
        rate: query.rate.unwrap_or(defaults.rate),
        strike: query.strike.unwrap_or(defaults.strike),
        time_to_maturity: query.ttm.unwrap_or(defaults.time_to_maturity),
    };
    params.validate()?;
    Ok(params)
}

/// Contract plus (vol_axis, spot_axis). Default ranges are centred on the
/// contract's spot and volatility, with the lower bound floored at 0.01.
fn resolve_axes(
    state: &AppState,
    query: &HeatmapQuery,
) -> PricingResult<(ContractParams, SampleAxis, SampleAxis)> {
    let params = resolve_contract(state, &query.contract())?;
    let cfg = &state.config;

    let points = query.points.unwrap_or(cfg.grid_points);
    if points > MAX_GRID_POINTS {
        return Err(PricingError::Axis(format!(
            "points {points} exceeds limit {MAX_GRID_POINTS}"
        )));
    }

    let spot_min = query
        .spot_min
        .unwrap_or((params.spot * (1.0 - cfg.spot_band)).max(MIN_AXIS_VALUE));
    let spot_max = query.spot_max.unwrap_or(params.spot * (1.0 + cfg.spot_band));
    let vol_min = query
        .vol_min
        .unwrap_or((params.volatility * (1.0 - cfg.vol_band)).max(MIN_AXIS_VALUE));
    let vol_max = query
        .vol_max
        .unwrap_or(params.volatility * (1.0 + cfg.vol_band));

    let vol_axis = SampleAxis::linspace(vol_min, vol_max, points)?;
    let spot_axis = SampleAxis::linspace(spot_min, spot_max, points)?;
    Ok((params, vol_axis, spot_axis))
}
