// Stableswap venue: two-asset Curve-style invariant with amplification
// Newton iterations for the invariant D and the post-trade balance y run
// over unit-normalized reserves
//
// Numan Thabit 2026 Aug

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::adapter::{
    apply_fee, direction, from_units, oriented_reserves, store_reserves, to_units, VenueAdapter,
};
use crate::ledger::PoolState;
use crate::registry::{SourceFamily, Token, TokenPair};

const MAX_ITERATIONS: usize = 64;

pub struct StableswapVenue {
    amp: u64,
    fee_bps: u32,
}

impl StableswapVenue {
    pub fn new(amp: u64, fee_bps: u32) -> Self {
        Self { amp, fee_bps }
    }

    /// Ann = A * n with n = 2 coins.
    fn ann(&self) -> Decimal {
        Decimal::from(self.amp) * dec!(2)
    }

    /// Invariant D for balances (x0, x1), by Newton iteration.
    fn invariant(&self, x0: Decimal, x1: Decimal) -> Decimal {
        let s = x0 + x1;
        if s.is_zero() || x0 <= Decimal::ZERO || x1 <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let ann = self.ann();
        let mut d = s;
        for _ in 0..MAX_ITERATIONS {
            let d_p = d * d * d / (dec!(4) * x0 * x1);
            let previous = d;
            d = (ann * s + dec!(2) * d_p) * d / ((ann - Decimal::ONE) * d + dec!(3) * d_p);
            if (d - previous).abs() < dec!(0.000000000001) {
                break;
            }
        }
        d
    }

    /// Post-trade opposite balance for a new in-side balance `x`, holding
    /// the invariant at `d`.
    fn balance_out(&self, x: Decimal, d: Decimal) -> Decimal {
        if x <= Decimal::ZERO || d <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let ann = self.ann();
        let c = d * d * d / (dec!(4) * x * ann);
        let b = x + d / ann;
        let mut y = d;
        for _ in 0..MAX_ITERATIONS {
            let previous = y;
            let denominator = dec!(2) * y + b - d;
            if denominator.is_zero() {
                return Decimal::ZERO;
            }
            y = (y * y + c) / denominator;
            if (y - previous).abs() < dec!(0.000000000001) {
                break;
            }
        }
        y
    }

    fn out_given_in(&self, amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<u128> {
        if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
            return Ok(0);
        }
        let x_in = to_units(reserve_in)?;
        let x_out = to_units(reserve_out)?;
        let dx = apply_fee(to_units(amount_in)?, self.fee_bps);
        let d = self.invariant(x_in, x_out);
        if d.is_zero() {
            return Ok(0);
        }
        let y_new = self.balance_out(x_in + dx, d);
        let dy = x_out - y_new;
        if dy <= Decimal::ZERO {
            return Ok(0);
        }
        Ok(from_units(dy).min(reserve_out))
    }
}

#[async_trait]
impl VenueAdapter for StableswapVenue {
    fn family(&self) -> SourceFamily {
        SourceFamily::Stableswap
    }

    async fn quote(
        &self,
        pool: &PoolState,
        pair: &TokenPair,
        from: &Token,
        amount_in: u128,
    ) -> Result<u128> {
        let zero_for_one = direction(pair, from)?;
        let (reserve_in, reserve_out) = oriented_reserves(pool, zero_for_one)?;
        self.out_given_in(amount_in, reserve_in, reserve_out)
    }

    async fn swap(
        &self,
        pool: &mut PoolState,
        pair: &TokenPair,
        from: &Token,
        amount_in: u128,
    ) -> Result<u128> {
        let zero_for_one = direction(pair, from)?;
        let (reserve_in, reserve_out) = oriented_reserves(pool, zero_for_one)?;
        let out = self.out_given_in(amount_in, reserve_in, reserve_out)?;
        store_reserves(
            pool,
            zero_for_one,
            reserve_in + amount_in,
            reserve_out - out,
        )?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn pool(r0: u128, r1: u128) -> PoolState {
        PoolState::Reserves { reserve0: r0, reserve1: r1 }
    }

    fn pair() -> TokenPair {
        TokenPair::new(Token::new("USDC"), Token::new("USDT"))
    }

    #[tokio::test]
    async fn balanced_pool_trades_near_parity() {
        let venue = StableswapVenue::new(200, 0);
        let out = venue
            .quote(&pool(1_000_000 * E18, 1_000_000 * E18), &pair(), &Token::new("USDC"), 1_000 * E18)
            .await
            .unwrap();
        assert!(out <= 1_000 * E18, "stable pool may not beat parity, got {out}");
        assert!(out > 999 * E18, "high-amp pool should stay near parity, got {out}");
    }

    #[tokio::test]
    async fn higher_amplification_tightens_the_peg() {
        let loose = StableswapVenue::new(10, 0);
        let tight = StableswapVenue::new(1_000, 0);
        // selling the abundant side pushes the pool further off balance;
        // the low-amp curve punishes that much harder
        let state = pool(200_000 * E18, 800_000 * E18);
        let a = loose.quote(&state, &pair(), &Token::new("USDT"), 10_000 * E18).await.unwrap();
        let b = tight.quote(&state, &pair(), &Token::new("USDT"), 10_000 * E18).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn quote_is_monotone_and_concave() {
        let venue = StableswapVenue::new(100, 4);
        let state = pool(500_000 * E18, 500_000 * E18);
        let mut previous = 0u128;
        let mut previous_marginal = u128::MAX;
        for step in 1..=20u128 {
            let out = venue
                .quote(&state, &pair(), &Token::new("USDC"), step * 20_000 * E18)
                .await
                .unwrap();
            assert!(out >= previous, "monotonicity violated at step {step}");
            let marginal = out - previous;
            assert!(marginal <= previous_marginal, "concavity violated at step {step}");
            previous = out;
            previous_marginal = marginal;
        }
    }

    #[tokio::test]
    async fn swap_realizes_quote_and_moves_reserves() {
        let venue = StableswapVenue::new(100, 4);
        let mut state = pool(1_000_000 * E18, 1_000_000 * E18);
        let quoted = venue
            .quote(&state, &pair(), &Token::new("USDT"), 5_000 * E18)
            .await
            .unwrap();
        let realized = venue
            .swap(&mut state, &pair(), &Token::new("USDT"), 5_000 * E18)
            .await
            .unwrap();
        assert_eq!(quoted, realized);
        match state {
            PoolState::Reserves { reserve0, reserve1 } => {
                assert_eq!(reserve1, 1_005_000 * E18);
                assert_eq!(reserve0, 1_000_000 * E18 - realized);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn empty_pool_quotes_zero() {
        let venue = StableswapVenue::new(100, 4);
        assert_eq!(
            venue.quote(&pool(0, 0), &pair(), &Token::new("USDC"), E18).await.unwrap(),
            0
        );
    }
}
