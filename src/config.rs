// Configuration management module
// Runtime settings load from the environment; the venue book (registered
// sources, their parameters, and capability bits) loads from a YAML file
//
// Numan Thabit 2026 Aug

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::registry::SourceFamily;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Path to the venue book YAML file.
    pub venue_book: String,
    /// HTTP API bind address (defaults to 0.0.0.0:8080).
    pub api_addr: Option<String>,
    /// Upper bound on a partition plan's part count.
    pub max_parts: Option<u32>,
    /// Concurrency bound for quote fan-out (defaults to the venue count).
    pub max_concurrent_quotes: Option<usize>,
    /// Wall-time cap for one venue's return-curve evaluation.
    pub quote_timeout_ms: Option<u64>,
    /// Per-family gas units for gas-aware quoting; multiplied by the
    /// caller's dest-token gas price. Tunable, not a law.
    pub gas_units: Option<HashMap<String, u64>>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn api_addr(&self) -> &str {
        self.api_addr.as_deref().unwrap_or("0.0.0.0:8080")
    }

    pub fn max_parts(&self) -> u32 {
        self.max_parts.unwrap_or(100).max(1)
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms.unwrap_or(2_000))
    }

    /// Gas units charged for routing through one venue of the family.
    pub fn gas_units_for(&self, family: SourceFamily) -> u64 {
        self.gas_units
            .as_ref()
            .and_then(|units| units.get(family.as_str()).copied())
            .unwrap_or_else(|| default_gas_units(family))
    }

    pub fn load_venue_book(&self) -> Result<VenueBook> {
        let raw = std::fs::read_to_string(&self.venue_book)
            .with_context(|| format!("read venue book {}", self.venue_book))?;
        serde_yaml::from_str(&raw).context("parse venue book YAML")
    }
}

fn default_gas_units(family: SourceFamily) -> u64 {
    match family {
        SourceFamily::ConstantProduct => 90_000,
        SourceFamily::Stableswap => 150_000,
        SourceFamily::Weighted => 130_000,
        SourceFamily::OrderBook => 110_000,
        SourceFamily::Pmm => 100_000,
    }
}

/// Registered venues and the initial world state. Source order here is the
/// canonical registry order; disable bits are an append-only contract.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueBook {
    pub wrapped_native: String,
    /// Caller balances by token id, decimal strings in base units.
    #[serde(default)]
    pub balances: HashMap<String, String>,
    pub sources: Vec<VenueSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueSpec {
    pub id: String,
    pub family: SourceFamily,
    pub token0: String,
    pub token1: String,
    pub disable_bit: u32,
    pub fee_bps: Option<u32>,
    /// Stableswap amplification coefficient.
    pub amp: Option<u64>,
    /// Weighted pool weights (any positive scale).
    pub weight0: Option<u32>,
    pub weight1: Option<u32>,
    /// PMM reference price (quote per base) and slope in [0, 1].
    pub base_price: Option<Decimal>,
    pub slope: Option<Decimal>,
    pub reserve0: Option<String>,
    pub reserve1: Option<String>,
    /// Order-book depth ladders.
    pub bids: Option<Vec<LevelSpec>>,
    pub asks: Option<Vec<LevelSpec>>,
}

impl Default for VenueSpec {
    fn default() -> Self {
        Self {
            id: String::new(),
            family: SourceFamily::ConstantProduct,
            token0: String::new(),
            token1: String::new(),
            disable_bit: crate::registry::FIRST_SOURCE_BIT,
            fee_bps: None,
            amp: None,
            weight0: None,
            weight1: None,
            base_price: None,
            slope: None,
            reserve0: None,
            reserve1: None,
            bids: None,
            asks: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelSpec {
    pub price: Decimal,
    pub quantity: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_book_parses_every_family() {
        let yaml = r#"
wrapped_native: WNAT
balances:
  WNAT: "1000000000000000000000"
sources:
  - id: cp-main
    family: constant_product
    token0: WNAT
    token1: USDC
    disable_bit: 8
    fee_bps: 30
    reserve0: "1000000000000000000000"
    reserve1: "3000000000000000000000"
  - id: stable-main
    family: stableswap
    token0: USDC
    token1: USDT
    disable_bit: 9
    amp: 200
    reserve0: "5000000000000000000000"
    reserve1: "5000000000000000000000"
  - id: weighted-8020
    family: weighted
    token0: WNAT
    token1: USDC
    disable_bit: 10
    weight0: 80
    weight1: 20
    reserve0: "1000000000000000000000"
    reserve1: "800000000000000000000"
  - id: book-main
    family: order_book
    token0: WNAT
    token1: USDC
    disable_bit: 11
    bids:
      - price: "2.9"
        quantity: "50000000000000000000"
    asks:
      - price: "3.1"
        quantity: "50000000000000000000"
  - id: pmm-main
    family: pmm
    token0: WNAT
    token1: USDC
    disable_bit: 12
    base_price: "3.0"
    slope: "0.4"
    reserve0: "200000000000000000000"
    reserve1: "600000000000000000000"
"#;
        let book: VenueBook = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(book.sources.len(), 5);
        assert_eq!(book.sources[1].family, SourceFamily::Stableswap);
        assert_eq!(book.sources[3].bids.as_ref().unwrap().len(), 1);
    }
}
