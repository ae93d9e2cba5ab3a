//! Profitable trade matching and greedy cargo allocation.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::entities::{CommodityId, CommodityOffer};
use crate::util::cancel::{CancelToken, Cancelled};

/// Poll the cancel flag this often while scanning for candidates, so
/// cancellation latency stays bounded even on large markets without any I/O.
const SCAN_POLL_INTERVAL: usize = 50;

/// The allocation loop polls more tightly than the scan.
const FILL_POLL_INTERVAL: usize = 20;

/// One matched commodity between a source and a destination station. Strictly
/// profitable by construction and never larger than stock, demand, or the
/// cargo space left when it was allocated.
#[derive(Clone, Debug, PartialEq)]
pub struct Trade {
    pub commodity_id: CommodityId,
    pub display_name: String,
    pub quantity: u32,
    pub buy_price: f64,
    pub sell_price: f64,
    pub profit_per_unit: f64,
    pub total_profit: f64,
}

struct Candidate<'a> {
    buy: &'a CommodityOffer,
    sell_price: f64,
    profit_per_unit: f64,
    demand_at_dest: u32,
}

/// Match the source's export offers against the destination's import offers
/// and greedily fill cargo with the most profitable commodities first.
///
/// Candidates are allocated in descending `profit_per_unit` order; equal
/// profits break the tie on ascending `commodity_id` so the result is
/// deterministic regardless of input order. This is a greedy heuristic, not a
/// global optimum: it never holds back a high-per-unit commodity to make room
/// for one with a higher total.
pub fn match_trades(
    buy_offers_at_source: &[CommodityOffer],
    sell_offers_at_dest: &[CommodityOffer],
    cargo_capacity: u32,
    cancel: &CancelToken,
) -> Result<Vec<Trade>, Cancelled> {
    if buy_offers_at_source.is_empty() || sell_offers_at_dest.is_empty() || cargo_capacity == 0 {
        return Ok(Vec::new());
    }
    cancel.checkpoint()?;

    // Destination side: price is what the station pays us, quantity is demand.
    let dest_by_commodity: HashMap<&str, &CommodityOffer> = sell_offers_at_dest
        .iter()
        .map(|offer| (offer.commodity_id.as_str(), offer))
        .collect();

    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    for (idx, buy) in buy_offers_at_source.iter().enumerate() {
        if idx % SCAN_POLL_INTERVAL == 0 {
            cancel.checkpoint()?;
        }
        let Some(dest) = dest_by_commodity.get(buy.commodity_id.as_str()) else {
            continue;
        };
        // Profit must be strictly positive to qualify.
        if dest.unit_price <= buy.unit_price {
            continue;
        }
        candidates.push(Candidate {
            buy,
            sell_price: dest.unit_price,
            profit_per_unit: dest.unit_price - buy.unit_price,
            demand_at_dest: dest.quantity,
        });
    }

    candidates.sort_by(|a, b| {
        b.profit_per_unit
            .partial_cmp(&a.profit_per_unit)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.buy.commodity_id.cmp(&b.buy.commodity_id))
    });

    let mut trades = Vec::new();
    let mut remaining_cargo = cargo_capacity;
    for (idx, candidate) in candidates.iter().enumerate() {
        if idx % FILL_POLL_INTERVAL == 0 {
            cancel.checkpoint()?;
        }
        if remaining_cargo == 0 {
            break;
        }
        let quantity = candidate
            .buy
            .quantity
            .min(candidate.demand_at_dest)
            .min(remaining_cargo);
        if quantity == 0 {
            continue;
        }
        trades.push(Trade {
            commodity_id: candidate.buy.commodity_id.clone(),
            display_name: candidate.buy.display_name.clone(),
            quantity,
            buy_price: candidate.buy.unit_price,
            sell_price: candidate.sell_price,
            profit_per_unit: candidate.profit_per_unit,
            total_profit: f64::from(quantity) * candidate.profit_per_unit,
        });
        remaining_cargo -= quantity;
    }

    Ok(trades)
}
