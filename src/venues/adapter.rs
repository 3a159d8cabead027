// Venue adapter boundary
// The one polymorphic capability the core depends on: estimate an output
// for an input, and apply the swap against mutable pool state. Quote
// implementations must be pure, monotone, and concave in the input; the
// quoting plane converts adapter errors to zero quotes at its boundary
//
// Numan Thabit 2026 Aug

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::ledger::PoolState;
use crate::registry::{SourceFamily, Token, TokenPair};

#[async_trait]
pub trait VenueAdapter: Send + Sync {
    fn family(&self) -> SourceFamily;

    /// Estimated output of swapping `amount_in` of `from` through the pool.
    /// Unknown pairs, empty pools, and drained reserves quote zero; hard
    /// errors are swallowed to zero one layer up.
    async fn quote(
        &self,
        pool: &PoolState,
        pair: &TokenPair,
        from: &Token,
        amount_in: u128,
    ) -> Result<u128>;

    /// Apply the swap, mutating `pool`, and return the realized output.
    /// Must realize exactly what `quote` promised for the same state.
    async fn swap(
        &self,
        pool: &mut PoolState,
        pair: &TokenPair,
        from: &Token,
        amount_in: u128,
    ) -> Result<u128>;
}

/// True when swapping token0 into token1.
pub(crate) fn direction(pair: &TokenPair, from: &Token) -> Result<bool> {
    if from == &pair.token0 {
        Ok(true)
    } else if from == &pair.token1 {
        Ok(false)
    } else {
        bail!("token {from} is not part of pair {}/{}", pair.token0, pair.token1)
    }
}

/// Oriented reserve view of a reserve-shaped pool.
pub(crate) fn oriented_reserves(
    pool: &PoolState,
    zero_for_one: bool,
) -> Result<(u128, u128)> {
    match pool {
        PoolState::Reserves { reserve0, reserve1 } => {
            if zero_for_one {
                Ok((*reserve0, *reserve1))
            } else {
                Ok((*reserve1, *reserve0))
            }
        }
        PoolState::Book { .. } => bail!("expected reserve pool, found order book"),
    }
}

pub(crate) fn store_reserves(
    pool: &mut PoolState,
    zero_for_one: bool,
    reserve_in: u128,
    reserve_out: u128,
) -> Result<()> {
    match pool {
        PoolState::Reserves { reserve0, reserve1 } => {
            if zero_for_one {
                *reserve0 = reserve_in;
                *reserve1 = reserve_out;
            } else {
                *reserve0 = reserve_out;
                *reserve1 = reserve_in;
            }
            Ok(())
        }
        PoolState::Book { .. } => bail!("expected reserve pool, found order book"),
    }
}

const AMOUNT_SCALE: u32 = 18;

/// Raw base units -> token units for pool math. Amounts are fixed at
/// 18 decimals across the system.
pub(crate) fn to_units(raw: u128) -> Result<Decimal> {
    let raw = i128::try_from(raw).context("amount too large for pool math")?;
    Ok(Decimal::from_i128_with_scale(raw, AMOUNT_SCALE))
}

/// Token units -> raw base units, truncating dust below one base unit.
pub(crate) fn from_units(units: Decimal) -> u128 {
    if units <= Decimal::ZERO {
        return 0;
    }
    let one_raw = Decimal::from_i128_with_scale(1_000_000_000_000_000_000, 0);
    match units.checked_mul(one_raw) {
        Some(scaled) => scaled.trunc().to_u128().unwrap_or(0),
        None => 0,
    }
}

/// Deduct a basis-point fee from an input amount.
pub(crate) fn apply_fee(amount: Decimal, fee_bps: u32) -> Decimal {
    amount * Decimal::from(10_000 - fee_bps) / Decimal::from(10_000u32)
}
