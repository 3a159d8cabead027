// Constant-product venue: x*y=k with a basis-point fee on input
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

pub struct ConstantProductVenue {
    fee_bps: u32,
}

impl ConstantProductVenue {
    pub fn new(fee_bps: u32) -> Self {
        Self { fee_bps }
    }

    fn out_given_in(&self, amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<u128> {
        if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
            return Ok(0);
        }
        let amount_in = apply_fee(to_units(amount_in)?, self.fee_bps);
        let reserve_in = to_units(reserve_in)?;
        let reserve_out = to_units(reserve_out)?;
        let denominator = reserve_in + amount_in;
        if denominator <= Decimal::ZERO {
            return Ok(0);
        }
        Ok(from_units(amount_in * reserve_out / denominator))
    }
}

#[async_trait]
impl VenueAdapter for ConstantProductVenue {
    fn family(&self) -> SourceFamily {
        SourceFamily::ConstantProduct
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
        TokenPair::new(Token::new("A"), Token::new("B"))
    }

    #[tokio::test]
    async fn feeless_quote_matches_closed_form() {
        let venue = ConstantProductVenue::new(0);
        // 100 into 1000/1000 -> 100*1000/1100
        let out = venue
            .quote(&pool(1000 * E18, 1000 * E18), &pair(), &Token::new("A"), 100 * E18)
            .await
            .unwrap();
        assert_eq!(out, 90_909_090_909_090_909_090);
    }

    #[tokio::test]
    async fn fee_reduces_output() {
        let free = ConstantProductVenue::new(0);
        let taxed = ConstantProductVenue::new(30);
        let state = pool(1000 * E18, 1000 * E18);
        let a = free.quote(&state, &pair(), &Token::new("A"), 10 * E18).await.unwrap();
        let b = taxed.quote(&state, &pair(), &Token::new("A"), 10 * E18).await.unwrap();
        assert!(b < a);
    }

    #[tokio::test]
    async fn quote_is_monotone_and_concave() {
        let venue = ConstantProductVenue::new(30);
        let state = pool(1000 * E18, 2000 * E18);
        let mut previous = 0u128;
        let mut previous_marginal = u128::MAX;
        for step in 1..=20u128 {
            let out = venue
                .quote(&state, &pair(), &Token::new("A"), step * 10 * E18)
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
        let venue = ConstantProductVenue::new(30);
        let mut state = pool(1000 * E18, 1000 * E18);
        let quoted = venue.quote(&state, &pair(), &Token::new("A"), 50 * E18).await.unwrap();
        let realized = venue
            .swap(&mut state, &pair(), &Token::new("A"), 50 * E18)
            .await
            .unwrap();
        assert_eq!(quoted, realized);
        match state {
            PoolState::Reserves { reserve0, reserve1 } => {
                assert_eq!(reserve0, 1050 * E18);
                assert_eq!(reserve1, 1000 * E18 - realized);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn reverse_direction_uses_opposite_reserves() {
        let venue = ConstantProductVenue::new(0);
        let state = pool(1000 * E18, 4000 * E18);
        let forward = venue.quote(&state, &pair(), &Token::new("A"), E18).await.unwrap();
        let backward = venue.quote(&state, &pair(), &Token::new("B"), E18).await.unwrap();
        // A is scarce: selling A earns ~4 B, selling B earns ~0.25 A
        assert!(forward > 3 * E18 && forward < 4 * E18);
        assert!(backward < E18 / 3);
    }

    #[tokio::test]
    async fn drained_pool_quotes_zero() {
        let venue = ConstantProductVenue::new(30);
        assert_eq!(
            venue.quote(&pool(0, 1000 * E18), &pair(), &Token::new("A"), E18).await.unwrap(),
            0
        );
        assert_eq!(
            venue.quote(&pool(1000 * E18, 0), &pair(), &Token::new("A"), E18).await.unwrap(),
            0
        );
    }
}
