// Projection between lon/lat and map panel cells

use ratatui::layout::Rect;
use roadflow_core::ViewportState;
use roadflow_gateway::{Bounds, Position, TrafficPoint};

/// Fraction of the fitted span added on each side so edge points stay visible.
const FIT_PADDING: f64 = 0.05;
/// Smallest span in degrees; a single point still gets a usable window.
const MIN_SPAN: f64 = 0.01;
/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;
/// How far from a point (in cell widths) a click still selects it.
pub const PICK_RADIUS: f64 = 2.0;

/// Lon/lat window currently shown in the map panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapProjection {
    pub window: Bounds,
}

impl MapProjection {
    /// Window for the viewport: the padded fit bounds when present, otherwise a
    /// box around the camera position sized by zoom.
    pub fn from_viewport(viewport: &ViewportState) -> Self {
        let window = match viewport.fit_bounds {
            Some(bounds) => {
                let pad_lon = (bounds.width() * FIT_PADDING).max(MIN_SPAN / 2.0);
                let pad_lat = (bounds.height() * FIT_PADDING).max(MIN_SPAN / 2.0);
                Bounds::new(
                    Position::new(bounds.min.lon - pad_lon, bounds.min.lat - pad_lat),
                    Position::new(bounds.max.lon + pad_lon, bounds.max.lat + pad_lat),
                )
            }
            None => {
                let span_lon = (360.0 / 2f64.powf(viewport.zoom)).max(MIN_SPAN);
                let span_lat = span_lon / 2.0;
                let c = viewport.position;
                Bounds::new(
                    Position::new(c.lon - span_lon / 2.0, c.lat - span_lat / 2.0),
                    Position::new(c.lon + span_lon / 2.0, c.lat + span_lat / 2.0),
                )
            }
        };
        Self { window }
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        [self.window.min.lon, self.window.max.lon]
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        [self.window.min.lat, self.window.max.lat]
    }

    /// Fractional cell coordinates of a position inside `area`, origin top-left.
    pub fn to_cell(&self, area: Rect, p: &Position) -> (f64, f64) {
        let x = (p.lon - self.window.min.lon) / self.window.width() * area.width as f64;
        let y = (self.window.max.lat - p.lat) / self.window.height() * area.height as f64;
        (x, y)
    }

    /// Index of the point nearest to a click, if one lies within `PICK_RADIUS`.
    pub fn pick(&self, area: Rect, points: &[TrafficPoint], column: u16, row: u16) -> Option<usize> {
        if !area.contains(ratatui::layout::Position::new(column, row)) {
            return None;
        }
        let cx = (column - area.x) as f64 + 0.5;
        let cy = (row - area.y) as f64 + 0.5;

        points
            .iter()
            .enumerate()
            .filter(|(_, p)| self.window.contains(&p.position))
            .map(|(idx, p)| {
                let (px, py) = self.to_cell(area, &p.position);
                let dx = px - cx;
                let dy = (py - cy) * CELL_ASPECT;
                (idx, (dx * dx + dy * dy).sqrt())
            })
            .filter(|(_, d)| *d <= PICK_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(idx, _)| idx)
    }
}
