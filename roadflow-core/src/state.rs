// Client-side state owned by the app controller

use roadflow_gateway::{Authority, Bounds, FlowQuery, Position, TrafficDataset, TrafficPoint};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POSITION: Position = Position {
    lon: -2.1,
    lat: 53.6138,
};
pub const DEFAULT_ZOOM: f64 = 7.0;
pub const DEFAULT_YEAR: u16 = 2018;

/// The authority and year the user has picked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_authority_id: Option<String>,
    pub selected_year: Option<u16>,
}

impl SelectionState {
    /// The query this selection describes, if both halves are present.
    pub fn query(&self) -> Option<FlowQuery> {
        let authority_id = self
            .selected_authority_id
            .as_deref()
            .filter(|id| !id.is_empty())?;
        let year = self.selected_year?;
        Some(FlowQuery::new(authority_id, year))
    }
}

/// Map camera parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub position: Position,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub fit_bounds: Option<Bounds>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            zoom: DEFAULT_ZOOM,
            pitch: 0.0,
            bearing: 0.0,
            fit_bounds: None,
        }
    }
}

/// Detail popup for a single point.
///
/// Closing keeps `selected_point` so the view can still render it while it
/// goes away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailOverlay {
    pub is_open: bool,
    pub selected_point: Option<TrafficPoint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub authorities: Vec<Authority>,
    pub selection: SelectionState,
    pub viewport: ViewportState,
    pub dataset: Option<TrafficDataset>,
    pub detail: DetailOverlay,
}

impl AppState {
    pub fn new(viewport: ViewportState, default_year: Option<u16>) -> Self {
        Self {
            selection: SelectionState {
                selected_authority_id: None,
                selected_year: default_year,
            },
            viewport,
            ..Default::default()
        }
    }

    /// Points of the current dataset, empty before the first successful query.
    pub fn points(&self) -> &[TrafficPoint] {
        self.dataset
            .as_ref()
            .map(|d| d.points.as_slice())
            .unwrap_or_default()
    }

    pub fn authority(&self, id: &str) -> Option<&Authority> {
        self.authorities.iter().find(|a| a.id == id)
    }

    pub fn selected_authority(&self) -> Option<&Authority> {
        self.selection
            .selected_authority_id
            .as_deref()
            .and_then(|id| self.authority(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_query_requires_both_fields() {
        let mut selection = SelectionState::default();
        assert!(selection.query().is_none());

        selection.selected_year = Some(2018);
        assert!(selection.query().is_none());

        selection.selected_authority_id = Some(String::new());
        assert!(selection.query().is_none());

        selection.selected_authority_id = Some("A1".to_string());
        assert_eq!(selection.query(), Some(FlowQuery::new("A1", 2018)));

        selection.selected_year = None;
        assert!(selection.query().is_none());
    }

    #[test]
    fn test_selection_query_only_rejects_empty_id() {
        let selection = SelectionState {
            selected_authority_id: Some(" ".to_string()),
            selected_year: Some(2018),
        };
        assert_eq!(selection.query(), Some(FlowQuery::new(" ", 2018)));
    }

    #[test]
    fn test_viewport_defaults() {
        let viewport = ViewportState::default();
        assert_eq!(viewport.position, Position::new(-2.1, 53.6138));
        assert_eq!(viewport.zoom, 7.0);
        assert_eq!(viewport.pitch, 0.0);
        assert_eq!(viewport.bearing, 0.0);
        assert!(viewport.fit_bounds.is_none());
    }

    #[test]
    fn test_app_state_starts_empty() {
        let state = AppState::new(ViewportState::default(), Some(DEFAULT_YEAR));
        assert!(state.authorities.is_empty());
        assert!(state.points().is_empty());
        assert_eq!(state.selection.selected_year, Some(2018));
        assert!(state.selection.selected_authority_id.is_none());
        assert!(!state.detail.is_open);
        assert!(state.selected_authority().is_none());
    }
}
