// Aggregator facade and HTTP API implementation
// Ties the quoting and executing planes together and exposes the quote,
// swap, and transitional operations over HTTP
//
// Numan Thabit 2026 Aug

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::control::{AdmissionControl, CircuitBreakers};
use crate::errors::SwapError;
use crate::ledger::{parse_amount, WorldState, WrappedNative};
use crate::mask::CapabilityMask;
use crate::registry::{SourceRegistry, Token, MASK_LAYOUT_VERSION};
use crate::router::execution::{ExecutionStats, Executor, SwapOutcome};
use crate::router::optimizer::{self, OptimizeResult};
use crate::router::quotes::QuoteEngine;
use crate::router::transitional::{HopPenalties, TransitionalQuote, TransitionalRouter};

/// High-level aggregator that ties source filtering, quoting, optimization,
/// and execution together.
pub struct Aggregator {
    config: Arc<AppConfig>,
    registry: Arc<SourceRegistry>,
    engine: Arc<QuoteEngine>,
    executor: Arc<Executor>,
    transitional: TransitionalRouter,
}

impl Aggregator {
    pub fn new(
        config: Arc<AppConfig>,
        registry: Arc<SourceRegistry>,
        world: Arc<RwLock<WorldState>>,
    ) -> Self {
        let admission = AdmissionControl::new(
            config
                .max_concurrent_quotes
                .unwrap_or_else(|| registry.len().max(1)),
        );
        let breakers = CircuitBreakers::new();
        let engine = Arc::new(QuoteEngine::new(
            Arc::clone(&registry),
            Arc::clone(&world),
            admission,
            breakers,
            config.quote_timeout(),
        ));
        let wrapper = Arc::new(WrappedNative::new(registry.wrapped_native().clone()));
        let executor = Arc::new(Executor::new(
            Arc::clone(&registry),
            world,
            wrapper,
            config.max_parts(),
        ));
        let transitional = TransitionalRouter::new(Arc::clone(&engine), Arc::clone(&executor));
        Self { config, registry, engine, executor, transitional }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn engine(&self) -> &Arc<QuoteEngine> {
        &self.engine
    }

    /// Quoting form: returns the optimizer's estimate and distribution
    /// without executing anything. No liquidity is a zero result here.
    pub async fn quote(
        &self,
        from: &Token,
        to: &Token,
        amount: u128,
        parts: u32,
        mask: &CapabilityMask,
        gas_price: Option<u128>,
    ) -> Result<OptimizeResult, SwapError> {
        self.check_parts(parts)?;
        if from == to {
            return Err(SwapError::invalid_request("from and to tokens are identical"));
        }
        let curves = self.engine.return_curves(from, to, amount, parts, mask).await?;
        let result = match gas_price {
            Some(gas_price) => {
                let penalties =
                    optimizer::venue_penalties(&curves, &self.registry, &self.config, gas_price);
                optimizer::find_best_distribution_with_gas(
                    self.registry.len(),
                    parts,
                    &curves,
                    &penalties,
                )
            }
            None => optimizer::find_best_distribution(self.registry.len(), parts, &curves),
        };
        Ok(result)
    }

    /// Executing form: applies a previously quoted distribution with a
    /// minimum-return floor.
    pub async fn swap(
        &self,
        from: &Token,
        to: &Token,
        amount: u128,
        min_return: u128,
        distribution: &[u64],
        mask: &CapabilityMask,
    ) -> Result<SwapOutcome, SwapError> {
        self.executor
            .execute(from, to, amount, distribution, mask, min_return)
            .await
    }

    pub async fn quote_transitional(
        &self,
        path: &[Token],
        amount: u128,
        parts_per_hop: &[u32],
        masks: &[CapabilityMask],
        gas_price: Option<u128>,
    ) -> Result<TransitionalQuote, SwapError> {
        for parts in parts_per_hop {
            self.check_parts(*parts)?;
        }
        let penalties = gas_price.map(|gas_price| HopPenalties {
            config: self.config.as_ref(),
            gas_price,
        });
        self.transitional
            .quote_transitional(path, amount, parts_per_hop, masks, penalties.as_ref())
            .await
    }

    pub async fn swap_transitional(
        &self,
        path: &[Token],
        amount: u128,
        min_return: u128,
        distributions: &[Vec<u64>],
        masks: &[CapabilityMask],
    ) -> Result<u128, SwapError> {
        self.transitional
            .swap_transitional(path, amount, min_return, distributions, masks)
            .await
    }

    fn check_parts(&self, parts: u32) -> Result<(), SwapError> {
        let max_parts = self.config.max_parts();
        if parts > max_parts {
            return Err(SwapError::invalid_request(format!(
                "parts {parts} above the configured bound {max_parts}"
            )));
        }
        Ok(())
    }
}

/// Decode the mask fields a request may carry: an integer mask string, a
/// list of named flags, or both (unioned).
fn decode_mask(
    mask: Option<&str>,
    flags: Option<&[String]>,
    registry: &SourceRegistry,
) -> Result<CapabilityMask, SwapError> {
    let mut decoded = match mask {
        Some(raw) => CapabilityMask::parse(raw)?,
        None => CapabilityMask::none(),
    };
    if let Some(flags) = flags {
        decoded = decoded.union(&CapabilityMask::from_flags(flags, registry)?);
    }
    Ok(decoded)
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub from_token: String,
    pub to_token: String,
    pub amount: String,
    pub parts: u32,
    pub disable_mask: Option<String>,
    pub disable_flags: Option<Vec<String>>,
    /// Dest-token price of one gas unit; enables gas-aware selection.
    pub gas_price: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub out_amount: String,
    pub distribution: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub from_token: String,
    pub to_token: String,
    pub amount: String,
    pub min_return: String,
    pub distribution: Vec<u64>,
    pub disable_mask: Option<String>,
    pub disable_flags: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SwapResponse {
    pub out_amount: String,
    pub distribution: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionalQuoteRequest {
    pub path: Vec<String>,
    pub amount: String,
    pub parts_per_hop: Vec<u32>,
    pub disable_masks: Option<Vec<String>>,
    pub gas_price: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionalQuoteResponse {
    pub out_amounts: Vec<String>,
    pub distributions: Vec<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionalSwapRequest {
    pub path: Vec<String>,
    pub amount: String,
    pub min_return: String,
    pub distributions: Vec<Vec<u64>>,
    pub disable_masks: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct TransitionalSwapResponse {
    pub out_amount: String,
}

#[derive(Debug, Serialize)]
pub struct SourceInfo {
    pub id: String,
    pub family: String,
    pub token0: String,
    pub token1: String,
    pub capability_bits: [u32; 3],
}

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub mask_layout_version: u32,
    pub wrapped_native: String,
    pub sources: Vec<SourceInfo>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub execution: ExecutionStats,
    pub open_breakers: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: SwapError) -> ApiError {
    let status = match &err {
        SwapError::InvalidRequest(_) | SwapError::InvalidDistribution(_) => {
            StatusCode::BAD_REQUEST
        }
        SwapError::NoLiquidity | SwapError::SlippageExceeded { .. } => StatusCode::CONFLICT,
        SwapError::VenueFailure { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

/// Create the HTTP router with API endpoints.
pub fn create_api_router(aggregator: Arc<Aggregator>) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/api/v1/quote", post(quote_route))
        .route("/api/v1/swap", post(swap_route))
        .route("/api/v1/quote/transitional", post(quote_transitional_route))
        .route("/api/v1/swap/transitional", post(swap_transitional_route))
        .route("/api/v1/sources", get(list_sources))
        .route("/api/v1/stats", get(get_stats))
        .route("/metrics", get(export_metrics))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(aggregator)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn export_metrics() -> String {
    prometheus::TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}

fn decode_hop_masks(
    masks: Option<&[String]>,
    hops: usize,
) -> Result<Vec<CapabilityMask>, SwapError> {
    match masks {
        None => Ok(vec![CapabilityMask::none(); hops]),
        Some(raw) => raw.iter().map(|mask| CapabilityMask::parse(mask)).collect(),
    }
}

fn parse_gas_price(gas_price: Option<&str>) -> Result<Option<u128>, SwapError> {
    gas_price.map(parse_amount).transpose()
}

async fn quote_route(
    State(aggregator): State<Arc<Aggregator>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let handle = async {
        let amount = parse_amount(&req.amount)?;
        let mask = decode_mask(
            req.disable_mask.as_deref(),
            req.disable_flags.as_deref(),
            aggregator.registry(),
        )?;
        let gas_price = parse_gas_price(req.gas_price.as_deref())?;
        aggregator
            .quote(
                &Token::new(req.from_token),
                &Token::new(req.to_token),
                amount,
                req.parts,
                &mask,
                gas_price,
            )
            .await
    };
    let result = handle.await.map_err(api_error)?;
    Ok(Json(QuoteResponse {
        out_amount: result.out_amount.to_string(),
        distribution: result.distribution,
    }))
}

async fn swap_route(
    State(aggregator): State<Arc<Aggregator>>,
    Json(req): Json<SwapRequest>,
) -> Result<Json<SwapResponse>, ApiError> {
    let handle = async {
        let amount = parse_amount(&req.amount)?;
        let min_return = parse_amount(&req.min_return)?;
        let mask = decode_mask(
            req.disable_mask.as_deref(),
            req.disable_flags.as_deref(),
            aggregator.registry(),
        )?;
        aggregator
            .swap(
                &Token::new(req.from_token),
                &Token::new(req.to_token),
                amount,
                min_return,
                &req.distribution,
                &mask,
            )
            .await
    };
    let outcome = handle.await.map_err(api_error)?;
    Ok(Json(SwapResponse {
        out_amount: outcome.out_amount.to_string(),
        distribution: outcome.distribution,
    }))
}

async fn quote_transitional_route(
    State(aggregator): State<Arc<Aggregator>>,
    Json(req): Json<TransitionalQuoteRequest>,
) -> Result<Json<TransitionalQuoteResponse>, ApiError> {
    let handle = async {
        let amount = parse_amount(&req.amount)?;
        let path: Vec<Token> = req.path.iter().map(|t| Token::new(t.clone())).collect();
        let masks =
            decode_hop_masks(req.disable_masks.as_deref(), path.len().saturating_sub(1))?;
        let gas_price = parse_gas_price(req.gas_price.as_deref())?;
        aggregator
            .quote_transitional(&path, amount, &req.parts_per_hop, &masks, gas_price)
            .await
    };
    let result = handle.await.map_err(api_error)?;
    Ok(Json(TransitionalQuoteResponse {
        out_amounts: result.out_amounts.iter().map(|a| a.to_string()).collect(),
        distributions: result.distributions,
    }))
}

async fn swap_transitional_route(
    State(aggregator): State<Arc<Aggregator>>,
    Json(req): Json<TransitionalSwapRequest>,
) -> Result<Json<TransitionalSwapResponse>, ApiError> {
    let handle = async {
        let amount = parse_amount(&req.amount)?;
        let min_return = parse_amount(&req.min_return)?;
        let path: Vec<Token> = req.path.iter().map(|t| Token::new(t.clone())).collect();
        let masks =
            decode_hop_masks(req.disable_masks.as_deref(), path.len().saturating_sub(1))?;
        aggregator
            .swap_transitional(&path, amount, min_return, &req.distributions, &masks)
            .await
    };
    let out_amount = handle.await.map_err(api_error)?;
    Ok(Json(TransitionalSwapResponse { out_amount: out_amount.to_string() }))
}

/// Registry listing: the auditable source order and bit layout callers
/// build persistent masks against.
async fn list_sources(State(aggregator): State<Arc<Aggregator>>) -> Json<SourcesResponse> {
    let registry = aggregator.registry();
    let sources = registry
        .sources()
        .iter()
        .map(|source| SourceInfo {
            id: source.id.to_string(),
            family: source.family.as_str().to_string(),
            token0: source.pair.token0.to_string(),
            token1: source.pair.token1.to_string(),
            capability_bits: source.capability_bits(),
        })
        .collect();
    Json(SourcesResponse {
        mask_layout_version: MASK_LAYOUT_VERSION,
        wrapped_native: registry.wrapped_native().to_string(),
        sources,
    })
}

async fn get_stats(State(aggregator): State<Arc<Aggregator>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        execution: aggregator.executor().get_stats(),
        open_breakers: aggregator.engine().breakers().open_count().await,
    })
}
