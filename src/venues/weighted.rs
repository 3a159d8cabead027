// Weighted pool venue: Balancer-style value function with two weights
// out = b_out * (1 - (b_in / (b_in + a_in))^(w_in / w_out))
//
// Numan Thabit 2026 Aug

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::adapter::{
    apply_fee, direction, from_units, oriented_reserves, store_reserves, to_units, VenueAdapter,
};
use crate::ledger::PoolState;
use crate::registry::{SourceFamily, Token, TokenPair};

pub struct WeightedVenue {
    weight0: u32,
    weight1: u32,
    fee_bps: u32,
}

impl WeightedVenue {
    pub fn new(weight0: u32, weight1: u32, fee_bps: u32) -> Self {
        Self { weight0, weight1, fee_bps }
    }

    fn out_given_in(
        &self,
        amount_in: u128,
        reserve_in: u128,
        reserve_out: u128,
        zero_for_one: bool,
    ) -> Result<u128> {
        if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
            return Ok(0);
        }
        let (weight_in, weight_out) = if zero_for_one {
            (self.weight0, self.weight1)
        } else {
            (self.weight1, self.weight0)
        };
        let amount_in = apply_fee(to_units(amount_in)?, self.fee_bps);
        let balance_in = to_units(reserve_in)?;
        let balance_out = to_units(reserve_out)?;

        let base = balance_in / (balance_in + amount_in);
        let exponent = f64::from(weight_in) / f64::from(weight_out);
        // fractional power has no closed Decimal form; the f64 round trip
        // is deterministic and quote/swap share it
        let Some(ratio) = base.to_f64() else { return Ok(0) };
        let Some(scaled) = Decimal::from_f64(ratio.powf(exponent)) else {
            return Ok(0);
        };
        let scaled = scaled.clamp(Decimal::ZERO, Decimal::ONE);
        Ok(from_units(balance_out * (Decimal::ONE - scaled)).min(reserve_out))
    }
}

#[async_trait]
impl VenueAdapter for WeightedVenue {
    fn family(&self) -> SourceFamily {
        SourceFamily::Weighted
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
