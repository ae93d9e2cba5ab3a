//! Trade-matching and multi-hop route planning core for a space-sim trading
//! companion.
//!
//! The [`domain`] module holds the pure planning logic: offer matching, station
//! filtering, single-hop destination ranking, the general two-sided route
//! search, and the hop-by-hop [`domain::PlanningSession`]. The [`infra`]
//! module supplies market data from the Ardent Insight API behind the
//! [`domain::MarketDataProvider`] seam, with an on-disk snapshot cache.

pub mod domain;
pub mod infra;
pub mod util;

pub use domain::{
    find_best_outbound_trades, find_general_trades, match_trades, DestinationSuggestion,
    MarketDataProvider, PlanError, PlanState, PlanningSession, ProviderError, RankedRoute,
    SearchSettings, StationFilters, Trade, TradeDirection,
};
pub use infra::ArdentClient;
pub use util::{CancelToken, Cancelled, RouteStore};
