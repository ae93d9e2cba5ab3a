//! Seam between the planning core and whatever serves market data.

use async_trait::async_trait;
use thiserror::Error;

use super::entities::{StationMarket, SystemMarketGroup};
use crate::util::cancel::{CancelToken, Cancelled};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// Fetch or decode failure. Batch searches log this and skip the
    /// candidate; it is never fatal on its own. A station unknown to the data
    /// source is `Ok(None)` from [`MarketDataProvider::market_snapshot`], not
    /// an error.
    #[error("market data source error: {0}")]
    Source(String),
}

/// Serves station markets, either from a local cache or a live fetch.
///
/// Implementations decide staleness and caching; callers only see parsed,
/// validated domain data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Market for one specific station, or `None` if the station is unknown
    /// to the data source.
    async fn market_snapshot(
        &self,
        system: &str,
        station: &str,
        cancel: &CancelToken,
    ) -> Result<Option<StationMarket>, ProviderError>;

    /// All station markets within `radius_ly` of `system`, grouped per
    /// system. Individual systems that fail to fetch are omitted rather than
    /// failing the whole radius.
    async fn markets_in_radius(
        &self,
        system: &str,
        radius_ly: f64,
        cancel: &CancelToken,
    ) -> Result<Vec<SystemMarketGroup>, ProviderError>;
}
