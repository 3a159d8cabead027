// Order-book venue: fills against an explicit depth ladder
// Selling base walks the bids from the top of book; selling quote walks the
// asks. Input beyond the posted depth earns nothing, so the optimizer's
// marginal for this venue drops to zero once the ladder is consumed
//
// Numan Thabit 2026 Aug

use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use super::adapter::{direction, from_units, to_units, VenueAdapter};
use crate::ledger::{Level, PoolState};
use crate::registry::{SourceFamily, Token, TokenPair};

pub struct OrderBookVenue;

impl OrderBookVenue {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrderBookVenue {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill `amount_base` of base against the bids, consuming levels in place.
/// Returns realized quote units, raw.
fn fill_bids(bids: &mut Vec<Level>, amount_base: u128) -> Result<u128> {
    let mut remaining = amount_base;
    let mut out = Decimal::ZERO;
    while remaining > 0 {
        let Some(level) = bids.first_mut() else { break };
        let take = remaining.min(level.quantity);
        out += to_units(take)? * level.price;
        remaining -= take;
        level.quantity -= take;
        if level.quantity == 0 {
            bids.remove(0);
        }
    }
    Ok(from_units(out))
}

/// Spend `amount_quote` of quote against the asks, consuming levels in
/// place. Returns realized base units, raw.
fn fill_asks(asks: &mut Vec<Level>, amount_quote: u128) -> Result<u128> {
    let mut remaining = to_units(amount_quote)?;
    let mut out: u128 = 0;
    while remaining > Decimal::ZERO {
        let Some(level) = asks.first_mut() else { break };
        let level_base = to_units(level.quantity)?;
        let level_cost = level_base * level.price;
        if remaining >= level_cost {
            out += level.quantity;
            remaining -= level_cost;
            asks.remove(0);
        } else {
            let base_raw = from_units(remaining / level.price);
            let base_raw = base_raw.min(level.quantity);
            out += base_raw;
            level.quantity -= base_raw;
            remaining = Decimal::ZERO;
        }
    }
    Ok(out)
}

fn fill(pool: &mut PoolState, zero_for_one: bool, amount_in: u128) -> Result<u128> {
    match pool {
        PoolState::Book { bids, asks } => {
            if zero_for_one {
                fill_bids(bids, amount_in)
            } else {
                fill_asks(asks, amount_in)
            }
        }
        PoolState::Reserves { .. } => bail!("expected order book, found reserve pool"),
    }
}

#[async_trait]
impl VenueAdapter for OrderBookVenue {
    fn family(&self) -> SourceFamily {
        SourceFamily::OrderBook
    }

    async fn quote(
        &self,
        pool: &PoolState,
        pair: &TokenPair,
        from: &Token,
        amount_in: u128,
    ) -> Result<u128> {
        let zero_for_one = direction(pair, from)?;
        // walk a throwaway copy of the ladder so quote and swap share code
        let mut scratch = pool.clone();
        fill(&mut scratch, zero_for_one, amount_in)
    }

    async fn swap(
        &self,
        pool: &mut PoolState,
        pair: &TokenPair,
        from: &Token,
        amount_in: u128,
    ) -> Result<u128> {
        let zero_for_one = direction(pair, from)?;
        fill(pool, zero_for_one, amount_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn book() -> PoolState {
        PoolState::Book {
            bids: vec![
                Level { price: dec!(2), quantity: 10 * E18 },
                Level { price: dec!(1), quantity: 10 * E18 },
            ],
            asks: vec![
                Level { price: dec!(2.5), quantity: 10 * E18 },
                Level { price: dec!(3), quantity: 10 * E18 },
            ],
        }
    }

    fn pair() -> TokenPair {
        TokenPair::new(Token::new("BASE"), Token::new("QUOTE"))
    }

    #[tokio::test]
    async fn selling_base_walks_bids_top_down() {
        let venue = OrderBookVenue::new();
        // 15 base: 10 at 2.0, 5 at 1.0
        let out = venue
            .quote(&book(), &pair(), &Token::new("BASE"), 15 * E18)
            .await
            .unwrap();
        assert_eq!(out, 25 * E18);
    }

    #[tokio::test]
    async fn output_stops_at_posted_depth() {
        let venue = OrderBookVenue::new();
        let full = venue.quote(&book(), &pair(), &Token::new("BASE"), 20 * E18).await.unwrap();
        let over = venue.quote(&book(), &pair(), &Token::new("BASE"), 50 * E18).await.unwrap();
        assert_eq!(full, 30 * E18);
        assert_eq!(over, full);
    }

    #[tokio::test]
    async fn selling_quote_walks_asks_bottom_up() {
        let venue = OrderBookVenue::new();
        // 25 quote buys the whole 2.5 level (10 base for 25)
        let out = venue
            .quote(&book(), &pair(), &Token::new("QUOTE"), 25 * E18)
            .await
            .unwrap();
        assert_eq!(out, 10 * E18);
        // 31 quote: 10 base at 2.5, then 2 base at 3.0
        let out = venue
            .quote(&book(), &pair(), &Token::new("QUOTE"), 31 * E18)
            .await
            .unwrap();
        assert_eq!(out, 12 * E18);
    }

    #[tokio::test]
    async fn quote_is_monotone_and_concave() {
        let venue = OrderBookVenue::new();
        let state = book();
        let mut previous = 0u128;
        let mut previous_marginal = u128::MAX;
        for step in 1..=25u128 {
            let out = venue
                .quote(&state, &pair(), &Token::new("BASE"), step * E18)
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
    async fn swap_consumes_levels() {
        let venue = OrderBookVenue::new();
        let mut state = book();
        let quoted = venue.quote(&state, &pair(), &Token::new("BASE"), 12 * E18).await.unwrap();
        let realized = venue.swap(&mut state, &pair(), &Token::new("BASE"), 12 * E18).await.unwrap();
        assert_eq!(quoted, realized);
        match &state {
            PoolState::Book { bids, .. } => {
                // top level fully consumed, second reduced to 8
                assert_eq!(bids.len(), 1);
                assert_eq!(bids[0].quantity, 8 * E18);
            }
            _ => unreachable!(),
        }
        // the book remembers: a second identical swap earns less
        let second = venue.swap(&mut state, &pair(), &Token::new("BASE"), 12 * E18).await.unwrap();
        assert!(second < realized);
    }

    #[tokio::test]
    async fn empty_book_quotes_zero() {
        let venue = OrderBookVenue::new();
        let state = PoolState::Book { bids: vec![], asks: vec![] };
        assert_eq!(
            venue.quote(&state, &pair(), &Token::new("BASE"), E18).await.unwrap(),
            0
        );
    }
}
