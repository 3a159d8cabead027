// Transitional router - chains the quote/execute pipeline across hops
// Each hop carries its own part count and capability mask; the realized
// output of hop i feeds hop i+1. All hops settle against one scratch world
// with a single commit, so a late-hop failure leaves nothing applied
//
// Numan Thabit 2026 Aug

use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::SwapError;
use crate::mask::CapabilityMask;
use crate::registry::Token;
use crate::router::execution::{Executor, SwapOutcome};
use crate::router::optimizer::{self, OptimizeResult};
use crate::router::quotes::QuoteEngine;

/// Progress of a transitional swap through its hop chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopPhase {
    Pending(usize),
    Executed(usize),
    Complete,
    Failed,
}

/// Per-hop quote results for a token path.
#[derive(Debug, Clone)]
pub struct TransitionalQuote {
    pub out_amounts: Vec<u128>,
    pub distributions: Vec<Vec<u64>>,
}

pub struct TransitionalRouter {
    engine: Arc<QuoteEngine>,
    executor: Arc<Executor>,
}

impl TransitionalRouter {
    pub fn new(engine: Arc<QuoteEngine>, executor: Arc<Executor>) -> Self {
        Self { engine, executor }
    }

    /// Quote every hop of the path, feeding each hop's estimate into the
    /// next. A hop with no liquidity zeroes the rest of the chain instead
    /// of failing; the caller reads a zero final estimate.
    #[tracing::instrument(skip_all, fields(hops = path.len().saturating_sub(1), amount = amount))]
    pub async fn quote_transitional(
        &self,
        path: &[Token],
        amount: u128,
        parts_per_hop: &[u32],
        masks: &[CapabilityMask],
        penalties: Option<&HopPenalties<'_>>,
    ) -> Result<TransitionalQuote, SwapError> {
        validate_path(path, parts_per_hop.len(), masks.len())?;

        let source_count = self.engine.registry().len();
        let mut out_amounts = Vec::with_capacity(parts_per_hop.len());
        let mut distributions = Vec::with_capacity(parts_per_hop.len());
        let mut hop_amount = amount;
        for (hop, window) in path.windows(2).enumerate() {
            let curves = self
                .engine
                .return_curves(&window[0], &window[1], hop_amount, parts_per_hop[hop], &masks[hop])
                .await?;
            let result: OptimizeResult = match penalties {
                Some(model) => optimizer::find_best_distribution_with_gas(
                    source_count,
                    parts_per_hop[hop],
                    &curves,
                    &optimizer::venue_penalties(
                        &curves,
                        self.engine.registry(),
                        model.config,
                        model.gas_price,
                    ),
                ),
                None => optimizer::find_best_distribution(source_count, parts_per_hop[hop], &curves),
            };
            debug!(hop = hop, estimate = result.out_amount, "hop quoted");
            hop_amount = result.out_amount;
            out_amounts.push(result.out_amount);
            distributions.push(result.distribution);
        }
        Ok(TransitionalQuote { out_amounts, distributions })
    }

    /// Execute a multi-hop swap atomically. `min_return` binds the final
    /// hop's realized output; an intermediate hop realizing zero aborts as
    /// `NoLiquidity`. No partial multi-hop settlement is ever committed.
    #[tracing::instrument(skip_all, fields(hops = path.len().saturating_sub(1), amount = amount, min_return = min_return))]
    pub async fn swap_transitional(
        &self,
        path: &[Token],
        amount: u128,
        min_return: u128,
        distributions: &[Vec<u64>],
        masks: &[CapabilityMask],
    ) -> Result<u128, SwapError> {
        validate_path(path, distributions.len(), masks.len())?;
        let hops = distributions.len();

        let world = self.executor.world();
        let mut guard = world.write().await;
        let mut scratch = guard.clone();

        let mut hop_amount = amount;
        for (hop, window) in path.windows(2).enumerate() {
            let phase = HopPhase::Pending(hop);
            let hop_min = if hop == hops - 1 { min_return } else { 0 };
            let outcome: SwapOutcome = self
                .executor
                .execute_on(
                    &mut scratch,
                    &window[0],
                    &window[1],
                    hop_amount,
                    &distributions[hop],
                    &masks[hop],
                    hop_min,
                )
                .await
                .map_err(|err| {
                    info!(
                        failed_at = ?phase,
                        phase = ?HopPhase::Failed,
                        error = %err,
                        "transitional swap failed; nothing committed"
                    );
                    self.executor.record_outcome(false);
                    err
                })?;
            debug!(phase = ?HopPhase::Executed(hop), realized = outcome.out_amount, "hop executed");
            hop_amount = outcome.out_amount;
        }

        *guard = scratch;
        self.executor.record_outcome(true);
        info!(phase = ?HopPhase::Complete, out_amount = hop_amount, "transitional swap committed");
        Ok(hop_amount)
    }
}

/// Configuration handle for gas-aware transitional quoting.
pub struct HopPenalties<'a> {
    pub config: &'a crate::config::AppConfig,
    pub gas_price: u128,
}

fn validate_path(path: &[Token], hop_args: usize, mask_args: usize) -> Result<(), SwapError> {
    if path.len() < 2 {
        return Err(SwapError::invalid_request("token path needs at least two tokens"));
    }
    let hops = path.len() - 1;
    if hop_args != hops || mask_args != hops {
        return Err(SwapError::invalid_request(format!(
            "expected {hops} per-hop arguments for a {}-token path",
            path.len()
        )));
    }
    Ok(())
}
