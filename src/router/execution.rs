// Execution engine - applies a finalized distribution against live venues
// Splits the input with exact conservation, sequences native wrap/unwrap
// around the venue legs, enforces the minimum-return floor, and commits
// all-or-nothing via a scratch copy of the world state
//
// Numan Thabit 2026 Aug

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::SwapError;
use crate::ledger::{NativeWrapper, WorldState};
use crate::mask::CapabilityMask;
use crate::metrics::SWAPS;
use crate::registry::{SourceRegistry, Token};
use crate::router::validation::validate_distribution;

/// Execution statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionStats {
    pub total_swaps: u64,
    pub successful_swaps: u64,
    pub failed_swaps: u64,
    pub success_rate: f64,
}

/// Realized result of one executed distribution.
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub out_amount: u128,
    pub distribution: Vec<u64>,
}

pub struct Executor {
    registry: Arc<SourceRegistry>,
    world: Arc<RwLock<WorldState>>,
    wrapper: Arc<dyn NativeWrapper>,
    max_parts: u32,
    total_swaps: AtomicU64,
    successful_swaps: AtomicU64,
    failed_swaps: AtomicU64,
}

impl Executor {
    pub fn new(
        registry: Arc<SourceRegistry>,
        world: Arc<RwLock<WorldState>>,
        wrapper: Arc<dyn NativeWrapper>,
        max_parts: u32,
    ) -> Self {
        Self {
            registry,
            world,
            wrapper,
            max_parts,
            total_swaps: AtomicU64::new(0),
            successful_swaps: AtomicU64::new(0),
            failed_swaps: AtomicU64::new(0),
        }
    }

    /// Shared world handle; the transitional router locks it across a
    /// whole hop chain.
    pub(crate) fn world(&self) -> &Arc<RwLock<WorldState>> {
        &self.world
    }

    pub fn get_stats(&self) -> ExecutionStats {
        let total = self.total_swaps.load(Ordering::Relaxed);
        let successful = self.successful_swaps.load(Ordering::Relaxed);
        ExecutionStats {
            total_swaps: total,
            successful_swaps: successful,
            failed_swaps: self.failed_swaps.load(Ordering::Relaxed),
            success_rate: if total > 0 {
                successful as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Execute a distribution as one atomic operation. The write lock is
    /// held for the whole call (one logical transaction); mutations land in
    /// a scratch copy that replaces the shared state only on success, so a
    /// failed swap is indistinguishable from one that never ran.
    #[tracing::instrument(skip_all, fields(from = %from, to = %to, amount = amount, min_return = min_return))]
    pub async fn execute(
        &self,
        from: &Token,
        to: &Token,
        amount: u128,
        distribution: &[u64],
        mask: &CapabilityMask,
        min_return: u128,
    ) -> Result<SwapOutcome, SwapError> {
        let mut guard = self.world.write().await;
        let mut scratch = guard.clone();
        match self
            .execute_on(&mut scratch, from, to, amount, distribution, mask, min_return)
            .await
        {
            Ok(outcome) => {
                *guard = scratch;
                self.record_outcome(true);
                info!(out_amount = outcome.out_amount, "swap executed");
                Ok(outcome)
            }
            Err(err) => {
                self.record_outcome(false);
                Err(err)
            }
        }
    }

    /// Core execution against a caller-owned scratch world; the caller
    /// decides when (whether) the scratch commits. The transitional router
    /// chains hops through this before committing once.
    pub(crate) async fn execute_on(
        &self,
        world: &mut WorldState,
        from: &Token,
        to: &Token,
        amount: u128,
        distribution: &[u64],
        mask: &CapabilityMask,
        min_return: u128,
    ) -> Result<SwapOutcome, SwapError> {
        if from == to {
            return Err(SwapError::invalid_request("from and to tokens are identical"));
        }
        validate_distribution(&self.registry, mask, distribution, self.max_parts)?;
        if amount == 0 {
            return Err(SwapError::NoLiquidity);
        }

        let from_venue = self.registry.venue_token(from);
        let to_venue = self.registry.venue_token(to);
        if from_venue == to_venue {
            return Err(SwapError::invalid_request(
                "wrapping the native asset is not a swap",
            ));
        }
        for (source, units) in self.registry.sources().iter().zip(distribution) {
            if *units > 0 && !source.pair.links(&from_venue, &to_venue) {
                return Err(SwapError::InvalidDistribution(format!(
                    "source {} does not serve {from_venue}/{to_venue}",
                    source.id
                )));
            }
        }

        // native input is wrapped before touching venues
        if from.is_native() {
            self.wrapper.wrap(world, amount)?;
        }
        world.debit(&from_venue, amount)?;

        let mut realized: u128 = 0;
        for (index, input) in split_amounts(amount, distribution)? {
            let source = &self.registry.sources()[index];
            let pool = world.pool_mut(&source.id).ok_or_else(|| SwapError::VenueFailure {
                venue: source.id.to_string(),
                reason: "no pool state registered".to_string(),
            })?;
            let out = source
                .adapter
                .swap(pool, &source.pair, &from_venue, input)
                .await
                .map_err(|err| SwapError::VenueFailure {
                    venue: source.id.to_string(),
                    reason: err.to_string(),
                })?;
            debug!(source = %source.id, input = input, out = out, "venue leg filled");
            realized += out;
        }

        if realized == 0 {
            return Err(SwapError::NoLiquidity);
        }
        if realized < min_return {
            return Err(SwapError::SlippageExceeded { realized, min_return });
        }

        world.credit(&to_venue, realized);
        if to.is_native() {
            self.wrapper.unwrap(world, realized)?;
        }

        Ok(SwapOutcome { out_amount: realized, distribution: distribution.to_vec() })
    }

    pub(crate) fn record_outcome(&self, success: bool) {
        self.total_swaps.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_swaps.fetch_add(1, Ordering::Relaxed);
            SWAPS.with_label_values(&["ok"]).inc();
        } else {
            self.failed_swaps.fetch_add(1, Ordering::Relaxed);
            SWAPS.with_label_values(&["failed"]).inc();
        }
    }
}

/// Literal per-source input amounts for a distribution. The unit sum is
/// the denominator, so the whole amount is always routed; the last nonzero
/// source absorbs the integer remainder and the legs sum to `amount`
/// exactly.
fn split_amounts(amount: u128, distribution: &[u64]) -> Result<Vec<(usize, u128)>, SwapError> {
    let total_units: u128 = distribution.iter().map(|units| *units as u128).sum();
    let last_nonzero = distribution
        .iter()
        .rposition(|units| *units > 0)
        .expect("validated: at least one nonzero entry");

    let mut legs = Vec::new();
    let mut allocated: u128 = 0;
    for (index, units) in distribution.iter().enumerate() {
        if *units == 0 {
            continue;
        }
        let input = if index == last_nonzero {
            amount - allocated
        } else {
            amount
                .checked_mul(*units as u128)
                .ok_or_else(|| SwapError::invalid_request("amount too large to split"))?
                / total_units
        };
        allocated += input;
        legs.push((index, input));
    }
    Ok(legs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_conserves_the_input_exactly() {
        let amount = 1_000_000_000_000_000_001u128; // indivisible by 7
        let distribution = vec![0, 3, 0, 2, 2];
        let legs = split_amounts(amount, &distribution).unwrap();
        assert_eq!(legs.len(), 3);
        assert_eq!(legs.iter().map(|(_, input)| input).sum::<u128>(), amount);
        // remainder lands on the last nonzero source
        assert_eq!(legs[0].1, amount * 3 / 7);
        assert_eq!(legs[1].1, amount * 2 / 7);
        assert_eq!(legs[2].1, amount - amount * 3 / 7 - amount * 2 / 7);
    }

    #[test]
    fn split_is_proportional_for_single_source() {
        let legs = split_amounts(10u128.pow(18), &[0, 10, 0]).unwrap();
        assert_eq!(legs, vec![(1, 10u128.pow(18))]);
    }

    #[test]
    fn split_handles_parts_of_one() {
        let legs = split_amounts(999, &[1]).unwrap();
        assert_eq!(legs, vec![(0, 999)]);
    }
}
