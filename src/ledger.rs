// World state: caller balances and per-pool venue state
// One logical transaction works on a scratch clone and commits by swapping
// the clone back in; a dropped clone leaves no observable effect
//
// Numan Thabit 2026 Aug

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::SwapError;
use crate::registry::{SourceId, Token};

/// One price level of an order-book venue. `price` is quote units per base
/// unit; `quantity` is base units still offered at that price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub quantity: u128,
}

/// Mutable per-venue pool state, tagged by shape. Constant-product,
/// stableswap, weighted, and PMM pools all reduce to a reserve pair; order
/// books carry explicit depth ladders.
#[derive(Debug, Clone)]
pub enum PoolState {
    Reserves { reserve0: u128, reserve1: u128 },
    Book { bids: Vec<Level>, asks: Vec<Level> },
}

/// In-memory stand-in for on-chain state: the caller's balances plus every
/// registered pool, keyed by source id.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    balances: HashMap<Token, u128>,
    pools: HashMap<SourceId, PoolState>,
}

impl WorldState {
    pub fn balance(&self, token: &Token) -> u128 {
        self.balances.get(token).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, token: &Token, amount: u128) {
        if amount == 0 {
            return;
        }
        *self.balances.entry(token.clone()).or_insert(0) += amount;
    }

    pub fn debit(&mut self, token: &Token, amount: u128) -> Result<(), SwapError> {
        let balance = self.balances.entry(token.clone()).or_insert(0);
        if *balance < amount {
            return Err(SwapError::invalid_request(format!(
                "insufficient {token} balance: have {balance}, need {amount}"
            )));
        }
        *balance -= amount;
        Ok(())
    }

    pub fn install_pool(&mut self, id: SourceId, pool: PoolState) {
        self.pools.insert(id, pool);
    }

    pub fn pool(&self, id: &SourceId) -> Option<&PoolState> {
        self.pools.get(id)
    }

    pub fn pool_mut(&mut self, id: &SourceId) -> Option<&mut PoolState> {
        self.pools.get_mut(id)
    }
}

/// Wrapping of the native asset into its venue-tradable form. Delegated to
/// an adapter so the executor only sequences it.
pub trait NativeWrapper: Send + Sync {
    fn wrapped(&self) -> &Token;
    fn wrap(&self, world: &mut WorldState, amount: u128) -> Result<(), SwapError>;
    fn unwrap(&self, world: &mut WorldState, amount: u128) -> Result<(), SwapError>;
}

/// 1:1 wrapper between the native sentinel and the configured wrapped token.
pub struct WrappedNative {
    wrapped: Token,
}

impl WrappedNative {
    pub fn new(wrapped: Token) -> Self {
        Self { wrapped }
    }
}

impl NativeWrapper for WrappedNative {
    fn wrapped(&self) -> &Token {
        &self.wrapped
    }

    fn wrap(&self, world: &mut WorldState, amount: u128) -> Result<(), SwapError> {
        world.debit(&Token::native(), amount)?;
        world.credit(&self.wrapped, amount);
        Ok(())
    }

    fn unwrap(&self, world: &mut WorldState, amount: u128) -> Result<(), SwapError> {
        world.debit(&self.wrapped, amount)?;
        world.credit(&Token::native(), amount);
        Ok(())
    }
}

/// Parse a non-negative base-unit amount from its decimal string form.
pub fn parse_amount(input: &str) -> Result<u128, SwapError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SwapError::invalid_request("empty amount"));
    }
    input
        .parse::<u128>()
        .map_err(|_| SwapError::invalid_request(format!("bad amount `{input}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_refuses_overdraft() {
        let mut world = WorldState::default();
        world.credit(&Token::new("USDC"), 100);
        assert!(world.debit(&Token::new("USDC"), 101).is_err());
        assert_eq!(world.balance(&Token::new("USDC")), 100);
        world.debit(&Token::new("USDC"), 100).unwrap();
        assert_eq!(world.balance(&Token::new("USDC")), 0);
    }

    #[test]
    fn wrap_and_unwrap_conserve_value() {
        let wrapper = WrappedNative::new(Token::new("WNAT"));
        let mut world = WorldState::default();
        world.credit(&Token::native(), 1_000);

        wrapper.wrap(&mut world, 400).unwrap();
        assert_eq!(world.balance(&Token::native()), 600);
        assert_eq!(world.balance(&Token::new("WNAT")), 400);

        wrapper.unwrap(&mut world, 400).unwrap();
        assert_eq!(world.balance(&Token::native()), 1_000);
        assert_eq!(world.balance(&Token::new("WNAT")), 0);
    }

    #[test]
    fn wrap_requires_native_funds() {
        let wrapper = WrappedNative::new(Token::new("WNAT"));
        let mut world = WorldState::default();
        assert!(wrapper.wrap(&mut world, 1).is_err());
    }

    #[test]
    fn scratch_clone_isolates_mutations() {
        let mut world = WorldState::default();
        world.credit(&Token::new("USDC"), 50);
        let mut scratch = world.clone();
        scratch.debit(&Token::new("USDC"), 50).unwrap();
        assert_eq!(world.balance(&Token::new("USDC")), 50);
        assert_eq!(scratch.balance(&Token::new("USDC")), 0);
    }

    #[test]
    fn amounts_parse_from_decimal_strings() {
        assert_eq!(parse_amount("1000000000000000000").unwrap(), 10u128.pow(18));
        assert!(parse_amount("").is_err());
        assert!(parse_amount("-4").is_err());
        assert!(parse_amount("1.5").is_err());
    }
}
