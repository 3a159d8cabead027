// Venue adapter module tree
// One small polymorphic capability (quote/swap) with a leaf implementation
// per protocol family, selected by the registry
//
// Numan Thabit 2026 Aug

pub mod adapter;
pub mod constant_product;
pub mod orderbook;
pub mod pmm;
pub mod stableswap;
pub mod weighted;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::config::VenueSpec;
use crate::ledger::{Level, PoolState};
use crate::registry::{LiquiditySource, SourceFamily, SourceId, Token, TokenPair};

pub use adapter::VenueAdapter;
pub use constant_product::ConstantProductVenue;
pub use orderbook::OrderBookVenue;
pub use pmm::PmmVenue;
pub use stableswap::StableswapVenue;
pub use weighted::WeightedVenue;

/// Construct a source and its initial pool state from one venue-book entry.
pub fn build_venue(spec: &VenueSpec) -> Result<(LiquiditySource, PoolState)> {
    let fee_bps = spec.fee_bps.unwrap_or(30);
    if fee_bps >= 10_000 {
        bail!("fee {fee_bps} bps is not below 100%");
    }

    let adapter: Arc<dyn VenueAdapter> = match spec.family {
        SourceFamily::ConstantProduct => Arc::new(ConstantProductVenue::new(fee_bps)),
        SourceFamily::Stableswap => {
            let amp = spec.amp.unwrap_or(100);
            if amp == 0 {
                bail!("stableswap amplification must be positive");
            }
            Arc::new(StableswapVenue::new(amp, spec.fee_bps.unwrap_or(4)))
        }
        SourceFamily::Weighted => {
            let weight0 = spec.weight0.unwrap_or(50);
            let weight1 = spec.weight1.unwrap_or(50);
            if weight0 == 0 || weight1 == 0 {
                bail!("weighted pool weights must be positive");
            }
            Arc::new(WeightedVenue::new(weight0, weight1, fee_bps))
        }
        SourceFamily::OrderBook => Arc::new(OrderBookVenue::new()),
        SourceFamily::Pmm => {
            let base_price = spec
                .base_price
                .context("pmm venue requires base_price")?;
            if base_price <= Decimal::ZERO {
                bail!("pmm base price must be positive");
            }
            let slope = spec.slope.unwrap_or(dec!(0.5));
            if slope < Decimal::ZERO || slope > Decimal::ONE {
                bail!("pmm slope must lie in [0, 1]");
            }
            Arc::new(PmmVenue::new(base_price, slope, fee_bps))
        }
    };

    let pool = match spec.family {
        SourceFamily::OrderBook => {
            let mut bids = parse_levels(spec.bids.as_deref().unwrap_or_default())?;
            let mut asks = parse_levels(spec.asks.as_deref().unwrap_or_default())?;
            // best bid first, best ask first
            bids.sort_by(|a, b| b.price.cmp(&a.price));
            asks.sort_by(|a, b| a.price.cmp(&b.price));
            PoolState::Book { bids, asks }
        }
        _ => {
            let reserve0 = parse_reserve(spec.reserve0.as_deref(), "reserve0")?;
            let reserve1 = parse_reserve(spec.reserve1.as_deref(), "reserve1")?;
            PoolState::Reserves { reserve0, reserve1 }
        }
    };

    let source = LiquiditySource {
        id: SourceId::new(spec.id.clone()),
        family: spec.family,
        pair: TokenPair::new(Token::new(spec.token0.clone()), Token::new(spec.token1.clone())),
        disable_bit: spec.disable_bit,
        adapter,
    };
    Ok((source, pool))
}

fn parse_reserve(value: Option<&str>, field: &str) -> Result<u128> {
    let value = value.with_context(|| format!("missing {field}"))?;
    crate::ledger::parse_amount(value).map_err(|err| anyhow::anyhow!("{field}: {err}"))
}

fn parse_levels(specs: &[crate::config::LevelSpec]) -> Result<Vec<Level>> {
    specs
        .iter()
        .map(|level| {
            if level.price <= Decimal::ZERO {
                bail!("book level price must be positive");
            }
            Ok(Level {
                price: level.price,
                quantity: crate::ledger::parse_amount(&level.quantity)
                    .map_err(|err| anyhow::anyhow!("book level quantity: {err}"))?,
            })
        })
        .collect()
}
