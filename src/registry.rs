// Liquidity source registry
// This file defines tokens, source families, the versioned capability-bit
// layout, and the canonical process-wide source registry
//
// Numan Thabit 2026 Aug

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::VenueBook;
use crate::ledger::WorldState;
use crate::venues::adapter::VenueAdapter;
use crate::venues::build_venue;

/// Sentinel id for the chain's base currency. Venues only ever carry the
/// wrapped form; the executor wraps/unwraps at the boundary.
const NATIVE_ID: &str = "native";

/// Version of the bit-layout contract below. Callers persist masks across
/// calls, so new venues append bits; existing positions are never reused
/// or shifted.
pub const MASK_LAYOUT_VERSION: u32 = 1;

/// Bit 0 disables every source at once.
pub const GLOBAL_KILL_BIT: u32 = 0;

/// Per-source bits declared in the venue book start here; bits below this
/// are reserved for the global kill and the family tier.
pub const FIRST_SOURCE_BIT: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(id: impl Into<String>) -> Self {
        Token(id.into())
    }

    pub fn native() -> Self {
        Token(NATIVE_ID.to_string())
    }

    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(id: &str) -> Self {
        Token::new(id)
    }
}

/// Unordered pair of venue-side tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token0: Token,
    pub token1: Token,
}

impl TokenPair {
    pub fn new(token0: Token, token1: Token) -> Self {
        Self { token0, token1 }
    }

    /// True when this pair can convert `from` into `to` in either direction.
    pub fn links(&self, from: &Token, to: &Token) -> bool {
        (&self.token0 == from && &self.token1 == to)
            || (&self.token1 == from && &self.token0 == to)
    }
}

/// Protocol family of a liquidity source. The discriminant order is the
/// family-tier bit assignment: bit 1 through bit 5, directly after the
/// global kill bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFamily {
    ConstantProduct,
    Stableswap,
    Weighted,
    OrderBook,
    Pmm,
}

impl SourceFamily {
    /// Family-tier disable bit. Appending a new family takes the next free
    /// position below `FIRST_SOURCE_BIT`.
    pub fn bit(self) -> u32 {
        match self {
            SourceFamily::ConstantProduct => 1,
            SourceFamily::Stableswap => 2,
            SourceFamily::Weighted => 3,
            SourceFamily::OrderBook => 4,
            SourceFamily::Pmm => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceFamily::ConstantProduct => "constant_product",
            SourceFamily::Stableswap => "stableswap",
            SourceFamily::Weighted => "weighted",
            SourceFamily::OrderBook => "order_book",
            SourceFamily::Pmm => "pmm",
        }
    }

    pub fn all() -> [SourceFamily; 5] {
        [
            SourceFamily::ConstantProduct,
            SourceFamily::Stableswap,
            SourceFamily::Weighted,
            SourceFamily::OrderBook,
            SourceFamily::Pmm,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        SourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One registered liquidity venue. Immutable after startup.
#[derive(Clone)]
pub struct LiquiditySource {
    pub id: SourceId,
    pub family: SourceFamily,
    pub pair: TokenPair,
    /// Source-tier disable bit, declared append-only in the venue book.
    pub disable_bit: u32,
    pub adapter: Arc<dyn VenueAdapter>,
}

impl LiquiditySource {
    /// All capability bits gating this source. A source is eligible for a
    /// call iff none of these is set in the caller's mask.
    pub fn capability_bits(&self) -> [u32; 3] {
        [GLOBAL_KILL_BIT, self.family.bit(), self.disable_bit]
    }
}

impl fmt::Debug for LiquiditySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiquiditySource")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("pair", &self.pair)
            .field("disable_bit", &self.disable_bit)
            .finish()
    }
}

/// Canonical, deterministic, fixed-order list of all known sources.
/// Position `i` refers to the same source for the process lifetime; the
/// executor interprets distribution vectors positionally against it.
#[derive(Debug)]
pub struct SourceRegistry {
    sources: Vec<LiquiditySource>,
    wrapped_native: Token,
}

impl SourceRegistry {
    /// Build the registry and the initial world state from a venue book.
    /// Registry order is venue-book order.
    pub fn from_book(book: &VenueBook) -> Result<(SourceRegistry, WorldState)> {
        if book.wrapped_native.is_empty() {
            bail!("venue book must name the wrapped native token");
        }
        let wrapped_native = Token::new(book.wrapped_native.clone());
        if wrapped_native.is_native() {
            bail!("wrapped native token may not reuse the `{NATIVE_ID}` sentinel");
        }

        let mut world = WorldState::default();
        for (token, amount) in &book.balances {
            let amount = crate::ledger::parse_amount(amount)
                .with_context(|| format!("balance for token {token}"))?;
            world.credit(&Token::new(token.clone()), amount);
        }

        let mut sources = Vec::with_capacity(book.sources.len());
        let mut seen_ids: HashSet<&str> = HashSet::new();
        let mut seen_bits: HashSet<u32> = HashSet::new();
        for spec in &book.sources {
            if !seen_ids.insert(spec.id.as_str()) {
                bail!("duplicate source id {}", spec.id);
            }
            if spec.disable_bit < FIRST_SOURCE_BIT {
                bail!(
                    "source {}: disable bit {} collides with the reserved range (< {FIRST_SOURCE_BIT})",
                    spec.id,
                    spec.disable_bit
                );
            }
            if !seen_bits.insert(spec.disable_bit) {
                bail!("source {}: disable bit {} already assigned", spec.id, spec.disable_bit);
            }
            if spec.token0 == spec.token1 {
                bail!("source {}: pair tokens are identical", spec.id);
            }
            for token in [&spec.token0, &spec.token1] {
                if token == NATIVE_ID {
                    bail!(
                        "source {}: venues carry the wrapped form, not the `{NATIVE_ID}` sentinel",
                        spec.id
                    );
                }
            }

            let (source, pool) = build_venue(spec)
                .with_context(|| format!("build venue {}", spec.id))?;
            world.install_pool(source.id.clone(), pool);
            sources.push(source);
        }

        Ok((SourceRegistry { sources, wrapped_native }, world))
    }

    pub fn sources(&self) -> &[LiquiditySource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn wrapped_native(&self) -> &Token {
        &self.wrapped_native
    }

    /// Map a caller-facing token to the form venues actually carry.
    pub fn venue_token(&self, token: &Token) -> Token {
        if token.is_native() {
            self.wrapped_native.clone()
        } else {
            token.clone()
        }
    }

    pub fn source_by_id(&self, id: &SourceId) -> Option<&LiquiditySource> {
        self.sources.iter().find(|s| &s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{VenueBook, VenueSpec};

    fn cp_spec(id: &str, bit: u32) -> VenueSpec {
        VenueSpec {
            id: id.to_string(),
            family: SourceFamily::ConstantProduct,
            token0: "WNAT".to_string(),
            token1: "USDC".to_string(),
            disable_bit: bit,
            fee_bps: Some(30),
            reserve0: Some("1000000000000000000000".to_string()),
            reserve1: Some("3000000000000000000000".to_string()),
            ..VenueSpec::default()
        }
    }

    fn book(specs: Vec<VenueSpec>) -> VenueBook {
        VenueBook {
            wrapped_native: "WNAT".to_string(),
            balances: Default::default(),
            sources: specs,
        }
    }

    #[test]
    fn registry_order_follows_book_order() {
        let (registry, _) =
            SourceRegistry::from_book(&book(vec![cp_spec("b", 9), cp_spec("a", 8)])).unwrap();
        let ids: Vec<_> = registry.sources().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_bits_rejected() {
        let err = SourceRegistry::from_book(&book(vec![cp_spec("a", 8), cp_spec("b", 8)]))
            .unwrap_err();
        assert!(err.to_string().contains("already assigned"));
    }

    #[test]
    fn reserved_bits_rejected() {
        let err = SourceRegistry::from_book(&book(vec![cp_spec("a", 3)])).unwrap_err();
        assert!(err.to_string().contains("reserved range"));
    }

    #[test]
    fn family_bits_are_stable() {
        // Persisted masks depend on these exact positions.
        assert_eq!(SourceFamily::ConstantProduct.bit(), 1);
        assert_eq!(SourceFamily::Stableswap.bit(), 2);
        assert_eq!(SourceFamily::Weighted.bit(), 3);
        assert_eq!(SourceFamily::OrderBook.bit(), 4);
        assert_eq!(SourceFamily::Pmm.bit(), 5);
    }

    #[test]
    fn native_token_is_translated() {
        let (registry, _) = SourceRegistry::from_book(&book(vec![cp_spec("a", 8)])).unwrap();
        assert_eq!(registry.venue_token(&Token::native()).as_str(), "WNAT");
        assert_eq!(registry.venue_token(&Token::new("USDC")).as_str(), "USDC");
    }
}
