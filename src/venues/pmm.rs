// Proactive market maker venue
// One-sided PMM curve: trades start at an external reference price and
// degrade with consumed depth, controlled by the slope parameter k
// (k = 0 is a flat price feed, k = 1 is maximally depth-sensitive)
//
// Numan Thabit 2026 Aug

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use super::adapter::{
    apply_fee, direction, from_units, oriented_reserves, store_reserves, to_units, VenueAdapter,
};
use crate::ledger::PoolState;
use crate::registry::{SourceFamily, Token, TokenPair};

pub struct PmmVenue {
    /// Reference price, quote units per base unit.
    base_price: Decimal,
    /// Depth sensitivity in [0, 1].
    k: Decimal,
    fee_bps: u32,
}

impl PmmVenue {
    pub fn new(base_price: Decimal, k: Decimal, fee_bps: u32) -> Self {
        Self { base_price, k, fee_bps }
    }

    /// Average-price factor for consuming `delta` against a side holding
    /// `target` units: (1 - k) + k * target / (target + delta).
    fn depth_factor(&self, target: Decimal, delta: Decimal) -> Decimal {
        if delta <= Decimal::ZERO {
            return Decimal::ONE;
        }
        let denominator = target + delta;
        if denominator <= Decimal::ZERO {
            return Decimal::ONE - self.k;
        }
        (Decimal::ONE - self.k) + self.k * target / denominator
    }

    fn out_given_in(
        &self,
        amount_in: u128,
        reserve_in: u128,
        reserve_out: u128,
        zero_for_one: bool,
    ) -> Result<u128> {
        if amount_in == 0 || reserve_out == 0 {
            return Ok(0);
        }
        let delta = apply_fee(to_units(amount_in)?, self.fee_bps);
        let target = to_units(reserve_in)?;
        let factor = self.depth_factor(target, delta);
        let out = if zero_for_one {
            // selling base for quote at the reference price
            self.base_price * delta * factor
        } else {
            // selling quote for base at the inverse price
            delta / self.base_price * factor
        };
        Ok(from_units(out).min(reserve_out))
    }
}

#[async_trait]
impl VenueAdapter for PmmVenue {
    fn family(&self) -> SourceFamily {
        SourceFamily::Pmm
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
        self.out_given_in(amount_in, reserve_in, reserve_out, zero_for_one)
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
        let out = self.out_given_in(amount_in, reserve_in, reserve_out, zero_for_one)?;
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
    use rust_decimal_macros::dec;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn pool(base: u128, quote: u128) -> PoolState {
        PoolState::Reserves { reserve0: base, reserve1: quote }
    }

    fn pair() -> TokenPair {
        TokenPair::new(Token::new("BASE"), Token::new("QUOTE"))
    }

    #[tokio::test]
    async fn flat_curve_trades_at_reference_price() {
        let venue = PmmVenue::new(dec!(2), dec!(0), 0);
        let out = venue
            .quote(&pool(100 * E18, 1_000 * E18), &pair(), &Token::new("BASE"), 10 * E18)
            .await
            .unwrap();
        assert_eq!(out, 20 * E18);
    }

    #[tokio::test]
    async fn slope_degrades_the_price_with_depth() {
        let venue = PmmVenue::new(dec!(2), dec!(1), 0);
        // factor = 100 / 110, out = 2 * 10 * 100/110
        let out = venue
            .quote(&pool(100 * E18, 1_000 * E18), &pair(), &Token::new("BASE"), 10 * E18)
            .await
            .unwrap();
        assert_eq!(out, 18_181_818_181_818_181_818);
    }

    #[tokio::test]
    async fn reverse_direction_uses_inverse_price() {
        let venue = PmmVenue::new(dec!(2), dec!(0), 0);
        let out = venue
            .quote(&pool(100 * E18, 1_000 * E18), &pair(), &Token::new("QUOTE"), 10 * E18)
            .await
            .unwrap();
        assert_eq!(out, 5 * E18);
    }

    #[tokio::test]
    async fn output_capped_by_opposite_reserve() {
        let venue = PmmVenue::new(dec!(2), dec!(0), 0);
        let out = venue
            .quote(&pool(100 * E18, 5 * E18), &pair(), &Token::new("BASE"), 10 * E18)
            .await
            .unwrap();
        assert_eq!(out, 5 * E18);
    }

    #[tokio::test]
    async fn quote_is_monotone_and_concave() {
        let venue = PmmVenue::new(dec!(3), dec!(0.7), 20);
        let state = pool(1_000 * E18, 100_000 * E18);
        let mut previous = 0u128;
        let mut previous_marginal = u128::MAX;
        for step in 1..=20u128 {
            let out = venue
                .quote(&state, &pair(), &Token::new("BASE"), step * 50 * E18)
                .await
                .unwrap();
            assert!(out >= previous);
            let marginal = out - previous;
            assert!(marginal <= previous_marginal);
            previous = out;
            previous_marginal = marginal;
        }
    }

    #[tokio::test]
    async fn swap_realizes_quote_and_moves_reserves() {
        let venue = PmmVenue::new(dec!(2), dec!(0.5), 10);
        let mut state = pool(100 * E18, 1_000 * E18);
        let quoted = venue.quote(&state, &pair(), &Token::new("BASE"), 10 * E18).await.unwrap();
        let realized = venue.swap(&mut state, &pair(), &Token::new("BASE"), 10 * E18).await.unwrap();
        assert_eq!(quoted, realized);
        match state {
            PoolState::Reserves { reserve0, reserve1 } => {
                assert_eq!(reserve0, 110 * E18);
                assert_eq!(reserve1, 1_000 * E18 - realized);
            }
            _ => unreachable!(),
        }
    }
}
