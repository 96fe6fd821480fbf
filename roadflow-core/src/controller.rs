use crate::state::{AppState, SelectionState};
use roadflow_gateway::error::Result as GatewayResult;
use roadflow_gateway::{Authority, FlowQuery, TrafficDataGateway, TrafficDataset, TrafficPoint};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a refresh did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Selection incomplete, no request was made
    Skipped,
    /// Dataset and fit bounds were replaced
    Applied { points: usize },
    /// The gateway failed, previous state kept
    Failed,
    /// The gateway returned no points, previous state kept
    Empty,
}

/// Single owner of the application state.
///
/// Gateway failures are logged and otherwise ignored: the last good state stays
/// on screen and nothing is retried.
pub struct AppController<G: ?Sized = dyn TrafficDataGateway> {
    gateway: Arc<G>,
    state: AppState,
}

impl<G: TrafficDataGateway + ?Sized> AppController<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_state(gateway, AppState::default())
    }

    pub fn with_state(gateway: Arc<G>, state: AppState) -> Self {
        Self { gateway, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn gateway(&self) -> Arc<G> {
        self.gateway.clone()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.state.selection
    }

    /// Load the authority list.
    pub async fn initialize(&mut self) {
        let result = self.gateway.list_local_authorities().await;
        self.apply_authorities(result);
    }

    /// Store a fetched authority list. Empty lists and errors leave the current one alone.
    pub fn apply_authorities(&mut self, result: GatewayResult<Vec<Authority>>) {
        match result {
            Ok(authorities) if !authorities.is_empty() => {
                info!("Stored {} authorities", authorities.len());
                self.state.authorities = authorities;
            }
            Ok(_) => warn!("Authority list came back empty, keeping previous list"),
            Err(e) => warn!("Failed to load authorities: {}", e),
        }
    }

    pub fn select_authority(&mut self, id: impl Into<String>) {
        let id = id.into();
        debug!("Selected authority {}", id);
        self.state.selection.selected_authority_id = Some(id);
    }

    pub fn select_year(&mut self, year: u16) {
        debug!("Selected year {}", year);
        self.state.selection.selected_year = Some(year);
    }

    /// The query a refresh would send right now.
    pub fn pending_query(&self) -> Option<FlowQuery> {
        self.state.selection.query()
    }

    /// Fetch flows for the current selection and apply them.
    ///
    /// Nothing is requested unless both an authority and a year are selected.
    pub async fn refresh_traffic_data(&mut self) -> RefreshOutcome {
        let Some(query) = self.pending_query() else {
            debug!("Refresh skipped, selection incomplete");
            return RefreshOutcome::Skipped;
        };

        let result = self.gateway.fetch(&query).await;
        self.apply_traffic_data(result)
    }

    /// Replace dataset and fit bounds in one step, or do nothing.
    pub fn apply_traffic_data(&mut self, result: GatewayResult<TrafficDataset>) -> RefreshOutcome {
        match result {
            Ok(dataset) if dataset.is_empty() => {
                warn!(
                    "No count points for authority {} in {}, keeping previous dataset",
                    dataset.authority_id, dataset.year
                );
                RefreshOutcome::Empty
            }
            Ok(dataset) => {
                let points = dataset.points.len();
                info!(
                    "Applied {} count points for authority {} in {}",
                    points, dataset.authority_id, dataset.year
                );
                self.state.viewport.fit_bounds = dataset.bounds;
                self.state.dataset = Some(dataset);
                RefreshOutcome::Applied { points }
            }
            Err(e) => {
                warn!("Failed to load traffic data: {}", e);
                RefreshOutcome::Failed
            }
        }
    }

    pub fn open_detail(&mut self, point: TrafficPoint) {
        debug!("Opening detail for count point {}", point.id);
        self.state.detail.is_open = true;
        self.state.detail.selected_point = Some(point);
    }

    pub fn close_detail(&mut self) {
        self.state.detail.is_open = false;
    }
}
