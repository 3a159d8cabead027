// Quote engine - builds per-venue return curves for the optimizer
// Curve evaluations for distinct venues are independent pure computations
// and run concurrently, bounded by admission control and a per-venue
// timeout; the adapter boundary converts every venue failure to a zero
// quote rather than propagating it
//
// Numan Thabit 2026 Aug

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::control::{AdmissionControl, CircuitBreakers};
use crate::errors::SwapError;
use crate::ledger::WorldState;
use crate::mask::CapabilityMask;
use crate::metrics::{QUOTE_ERRORS, QUOTE_LATENCY};
use crate::registry::{LiquiditySource, SourceRegistry, Token};

/// Return curve of one eligible source: `points[k]` is the estimated
/// output for routing `amount * k / parts` through it, `points[0] = 0`.
#[derive(Debug, Clone)]
pub struct ReturnCurve {
    /// Canonical registry index of the source this curve belongs to.
    pub source_index: usize,
    pub points: Vec<u128>,
}

pub struct QuoteEngine {
    registry: Arc<SourceRegistry>,
    world: Arc<RwLock<WorldState>>,
    admission: AdmissionControl,
    breakers: CircuitBreakers,
    quote_timeout: Duration,
}

impl QuoteEngine {
    pub fn new(
        registry: Arc<SourceRegistry>,
        world: Arc<RwLock<WorldState>>,
        admission: AdmissionControl,
        breakers: CircuitBreakers,
        quote_timeout: Duration,
    ) -> Self {
        Self { registry, world, admission, breakers, quote_timeout }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn breakers(&self) -> &CircuitBreakers {
        &self.breakers
    }

    /// Build return curves for every eligible source able to serve the
    /// pair. Sources the mask disables, sources not carrying the pair, and
    /// sources that fail or time out are simply absent from the result.
    #[tracing::instrument(skip_all, fields(from = %from, to = %to, amount = amount, parts = parts))]
    pub async fn return_curves(
        &self,
        from: &Token,
        to: &Token,
        amount: u128,
        parts: u32,
        mask: &CapabilityMask,
    ) -> Result<Vec<ReturnCurve>, SwapError> {
        if parts == 0 || amount == 0 {
            return Ok(Vec::new());
        }
        // validated once so the per-point products below cannot overflow
        amount.checked_mul(parts as u128).ok_or_else(|| {
            SwapError::invalid_request("amount too large to quantize into parts")
        })?;

        let from = self.registry.venue_token(from);
        let to = self.registry.venue_token(to);
        if from == to {
            return Ok(Vec::new());
        }

        // one consistent snapshot for the whole evaluation
        let snapshot = self.world.read().await.clone();
        let snapshot = Arc::new(snapshot);

        let eligible = mask.filter(self.registry.sources());
        let evaluations = eligible.into_iter().map(|(index, source)| {
            let snapshot = Arc::clone(&snapshot);
            let from = from.clone();
            let to = to.clone();
            async move {
                if !source.pair.links(&from, &to) {
                    return None;
                }
                if self.breakers.is_open(source.id.as_str()).await {
                    debug!(source = %source.id, "venue breaker open; skipping quote");
                    return None;
                }
                let _permit = self.admission.acquire().await;
                let timer = QUOTE_LATENCY
                    .with_label_values(&[source.family.as_str()])
                    .start_timer();
                let result = tokio::time::timeout(
                    self.quote_timeout,
                    curve_for_source(&snapshot, source, index, &from, amount, parts),
                )
                .await;
                timer.observe_duration();
                match result {
                    Ok(Ok(curve)) => {
                        self.breakers.record_success(source.id.as_str()).await;
                        Some(curve)
                    }
                    Ok(Err(err)) => {
                        warn!(source = %source.id, error = %err, "venue quote failed; treating as zero");
                        QUOTE_ERRORS
                            .with_label_values(&[source.id.as_str(), "error"])
                            .inc();
                        self.breakers.record_failure(source.id.as_str()).await;
                        None
                    }
                    Err(_elapsed) => {
                        warn!(source = %source.id, "venue quote timed out; treating as zero");
                        QUOTE_ERRORS
                            .with_label_values(&[source.id.as_str(), "timeout"])
                            .inc();
                        self.breakers.record_failure(source.id.as_str()).await;
                        None
                    }
                }
            }
        });

        let curves = futures::future::join_all(evaluations).await;
        Ok(curves.into_iter().flatten().collect())
    }
}

async fn curve_for_source(
    snapshot: &WorldState,
    source: &LiquiditySource,
    index: usize,
    from: &Token,
    amount: u128,
    parts: u32,
) -> anyhow::Result<ReturnCurve> {
    let pool = snapshot
        .pool(&source.id)
        .ok_or_else(|| anyhow::anyhow!("no pool state for source {}", source.id))?;
    let mut points = Vec::with_capacity(parts as usize + 1);
    points.push(0);
    for k in 1..=parts {
        let point_amount = amount * k as u128 / parts as u128;
        points.push(source.adapter.quote(pool, &source.pair, from, point_amount).await?);
    }
    Ok(ReturnCurve { source_index: index, points })
}
