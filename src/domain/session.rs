//! Multi-hop route planning session: hop-by-hop state machine, leg
//! accumulation, and summary persistence.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::entities::PlayerSnapshot;
use super::filters::StationFilters;
use super::provider::{MarketDataProvider, ProviderError};
use super::route_finder::{find_best_outbound_trades, DestinationSuggestion};
use super::settings::SearchSettings;
use crate::util::cancel::{CancelToken, Cancelled};
use crate::util::persistence::RouteStore;

pub const MIN_HOPS: u32 = 1;
pub const MAX_HOPS: u32 = 10;

/// Where the session currently is. Hop numbers are 1-based.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanState {
    Idle,
    PlanningHop {
        hop_number: u32,
        suggestions: Vec<DestinationSuggestion>,
    },
    Summary,
}

/// One committed hop of a planned route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub from_system: String,
    pub from_station: String,
    pub to_system: String,
    pub to_station: String,
    pub commodity_id: String,
    pub display_name: String,
    /// Committed load. The planner always commits a full cargo hold.
    pub quantity: u32,
    pub profit_per_unit: f64,
    /// `quantity * profit_per_unit` for the committed full load; live stock
    /// and demand are not re-checked at commit time.
    pub leg_profit: f64,
    pub distance_ly: f64,
}

/// Completed route as persisted between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedRoute {
    pub legs: Vec<RouteLeg>,
    pub total_hops: u32,
    pub max_ly_per_hop: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
    pub total_profit: f64,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("hop count must be between {MIN_HOPS} and {MAX_HOPS}, got {0}")]
    InvalidHopCount(u32),
    #[error("jump radius must be positive, got {0}")]
    InvalidRadius(f64),
    #[error("cargo capacity must be positive")]
    InvalidCargoCapacity,
    #[error("no hop is currently being planned")]
    NotPlanning,
    #[error("a hop request is already in flight")]
    Busy,
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("no market data for {system} / {station}")]
    SourceMarketUnavailable { system: String, station: String },
    #[error("no suggestion with id {0}")]
    UnknownSuggestion(Uuid),
    #[error(transparent)]
    Provider(ProviderError),
    #[error("route persistence failed: {0}")]
    Persistence(String),
}

impl From<ProviderError> for PlanError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Cancelled(c) => Self::Cancelled(c),
            other => Self::Provider(other),
        }
    }
}

struct PlanParams {
    total_hops: u32,
    max_ly_per_hop: f64,
    cargo_capacity: u32,
}

/// Drives one route plan from start to summary.
///
/// The session owns its cancel token; callers that want to abort a running
/// `plan_hop` keep a clone from [`PlanningSession::cancel_token`]. A cancelled
/// hop stays in `PlanningHop` so the player can retry without losing already
/// committed legs.
pub struct PlanningSession {
    state: PlanState,
    params: Option<PlanParams>,
    current_system: String,
    current_station: String,
    filters: StationFilters,
    settings: SearchSettings,
    legs: Vec<RouteLeg>,
    completed: Option<SavedRoute>,
    cancel: CancelToken,
    fetching: bool,
}

impl PlanningSession {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            state: PlanState::Idle,
            params: None,
            current_system: String::new(),
            current_station: String::new(),
            filters: StationFilters::from_settings(&settings, None),
            settings,
            legs: Vec::new(),
            completed: None,
            cancel: CancelToken::new(),
            fetching: false,
        }
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    pub fn legs(&self) -> &[RouteLeg] {
        &self.legs
    }

    /// Ranked candidates of the hop currently being planned, if any.
    pub fn suggestions(&self) -> &[DestinationSuggestion] {
        match &self.state {
            PlanState::PlanningHop { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Route of the most recently completed or resumed plan.
    pub fn completed_route(&self) -> Option<&SavedRoute> {
        self.completed.as_ref()
    }

    /// Token cancelling the in-flight hop, if any. Cloning is cheap.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Validate parameters and enter planning for hop 1.
    pub fn start(
        &mut self,
        player: &PlayerSnapshot,
        total_hops: u32,
        max_ly_per_hop: f64,
    ) -> Result<(), PlanError> {
        if !(MIN_HOPS..=MAX_HOPS).contains(&total_hops) {
            return Err(PlanError::InvalidHopCount(total_hops));
        }
        if !(max_ly_per_hop > 0.0) {
            return Err(PlanError::InvalidRadius(max_ly_per_hop));
        }
        if player.cargo_capacity == 0 {
            return Err(PlanError::InvalidCargoCapacity);
        }

        self.params = Some(PlanParams {
            total_hops,
            max_ly_per_hop,
            cargo_capacity: player.cargo_capacity,
        });
        self.current_system = player.system.clone();
        self.current_station = player.station.clone();
        self.filters = StationFilters::from_settings(&self.settings, player.pad_size);
        self.legs.clear();
        self.completed = None;
        self.cancel.reset();
        self.state = PlanState::PlanningHop {
            hop_number: 1,
            suggestions: Vec::new(),
        };
        info!(total_hops, max_ly_per_hop, "multi-hop planning started");
        Ok(())
    }

    /// Fetch candidates around the current station and rank the hop's
    /// destination suggestions.
    ///
    /// Only one request may be in flight per session. Cancellation leaves the
    /// session in `PlanningHop` with the previous suggestions intact.
    pub async fn plan_hop(
        &mut self,
        provider: &dyn MarketDataProvider,
    ) -> Result<&[DestinationSuggestion], PlanError> {
        let hop_number = match &self.state {
            PlanState::PlanningHop { hop_number, .. } => *hop_number,
            _ => return Err(PlanError::NotPlanning),
        };
        if self.fetching {
            return Err(PlanError::Busy);
        }
        self.fetching = true;
        self.cancel.reset();
        let result = self.plan_hop_inner(provider).await;
        self.fetching = false;

        let suggestions = result?;
        info!(hop_number, count = suggestions.len(), "hop suggestions ready");
        self.state = PlanState::PlanningHop {
            hop_number,
            suggestions,
        };
        Ok(self.suggestions())
    }

    async fn plan_hop_inner(
        &self,
        provider: &dyn MarketDataProvider,
    ) -> Result<Vec<DestinationSuggestion>, PlanError> {
        let params = self.params.as_ref().ok_or(PlanError::NotPlanning)?;

        let source = provider
            .market_snapshot(&self.current_system, &self.current_station, &self.cancel)
            .await?
            .ok_or_else(|| PlanError::SourceMarketUnavailable {
                system: self.current_system.clone(),
                station: self.current_station.clone(),
            })?;

        let candidates = provider
            .markets_in_radius(&self.current_system, params.max_ly_per_hop, &self.cancel)
            .await?;

        let suggestions = find_best_outbound_trades(
            &self.current_system,
            &self.current_station,
            &source.sells_to_player,
            &candidates,
            params.cargo_capacity,
            &self.filters,
            params.max_ly_per_hop,
            &self.cancel,
        )?;
        Ok(suggestions)
    }

    /// Commit one suggestion as the next leg and advance. Completing the last
    /// hop moves to `Summary` and persists the route; a persistence failure
    /// is logged but never blocks the summary.
    pub fn select(
        &mut self,
        suggestion_id: Uuid,
        store: &RouteStore,
    ) -> Result<RouteLeg, PlanError> {
        let (hop_number, suggestions) = match &self.state {
            PlanState::PlanningHop {
                hop_number,
                suggestions,
            } => (*hop_number, suggestions),
            _ => return Err(PlanError::NotPlanning),
        };
        let params = self.params.as_ref().ok_or(PlanError::NotPlanning)?;
        let chosen = suggestions
            .iter()
            .find(|s| s.id == suggestion_id)
            .cloned()
            .ok_or(PlanError::UnknownSuggestion(suggestion_id))?;

        // The committed profit assumes the full hold is filled and sold,
        // regardless of the stock/demand cap baked into the suggestion's
        // estimate.
        let quantity = params.cargo_capacity;
        let leg = RouteLeg {
            from_system: self.current_system.clone(),
            from_station: self.current_station.clone(),
            to_system: chosen.dest_system.clone(),
            to_station: chosen.dest_station.clone(),
            commodity_id: chosen.commodity_id,
            display_name: chosen.display_name,
            quantity,
            profit_per_unit: chosen.profit_per_unit,
            leg_profit: f64::from(quantity) * chosen.profit_per_unit,
            distance_ly: chosen.distance_ly,
        };
        self.legs.push(leg.clone());
        self.current_system = chosen.dest_system;
        self.current_station = chosen.dest_station;

        if hop_number >= params.total_hops {
            let route = SavedRoute {
                legs: self.legs.clone(),
                total_hops: params.total_hops,
                max_ly_per_hop: params.max_ly_per_hop,
                saved_at: OffsetDateTime::now_utc(),
                total_profit: self.legs.iter().map(|l| l.leg_profit).sum(),
            };
            if let Err(error) = store.save(&route) {
                warn!(%error, "failed to persist planned route");
            }
            info!(total_profit = route.total_profit, "route plan complete");
            self.completed = Some(route);
            self.state = PlanState::Summary;
        } else {
            self.state = PlanState::PlanningHop {
                hop_number: hop_number + 1,
                suggestions: Vec::new(),
            };
        }
        Ok(leg)
    }

    /// Abandon the current plan and return to `Idle`. Any persisted route
    /// stays on disk.
    pub fn restart(&mut self) {
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        self.fetching = false;
        self.params = None;
        self.legs.clear();
        self.state = PlanState::Idle;
    }

    /// Forget the completed route, in memory and on disk.
    pub fn clear(&mut self, store: &RouteStore) -> Result<(), PlanError> {
        self.completed = None;
        if self.state == PlanState::Summary {
            self.state = PlanState::Idle;
        }
        store.clear().map_err(|e| PlanError::Persistence(e.to_string()))
    }

    /// Restore a previously persisted route into `Summary`. Only possible
    /// from `Idle`; returns whether anything was restored.
    pub fn resume(&mut self, store: &RouteStore) -> bool {
        if self.state != PlanState::Idle {
            return false;
        }
        match store.load() {
            Some(route) => {
                self.legs = route.legs.clone();
                self.completed = Some(route);
                self.state = PlanState::Summary;
                true
            }
            None => false,
        }
    }
}
