use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category name -> share of the total flow, in percent.
pub type Percentages = BTreeMap<String, f64>;

/// An administrative region whose traffic counts can be queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ons_code: Option<String>,
}

impl Authority {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region_id: None,
            ons_code: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Axis-aligned lon/lat box used to fit the map camera.
///
/// Serialized as `[[min_lon, min_lat], [max_lon, max_lat]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every position, or `None` for an empty input.
    pub fn enclosing<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::new(first, first);
        for p in iter {
            bounds.min.lon = bounds.min.lon.min(p.lon);
            bounds.min.lat = bounds.min.lat.min(p.lat);
            bounds.max.lon = bounds.max.lon.max(p.lon);
            bounds.max.lat = bounds.max.lat.max(p.lat);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min.lon + self.max.lon) / 2.0,
            (self.min.lat + self.max.lat) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max.lon - self.min.lon
    }

    pub fn height(&self) -> f64 {
        self.max.lat - self.min.lat
    }

    pub fn contains(&self, p: &Position) -> bool {
        p.lon >= self.min.lon && p.lon <= self.max.lon && p.lat >= self.min.lat && p.lat <= self.max.lat
    }
}

impl From<[[f64; 2]; 2]> for Bounds {
    fn from(raw: [[f64; 2]; 2]) -> Self {
        Self::new(
            Position::new(raw[0][0], raw[0][1]),
            Position::new(raw[1][0], raw[1][1]),
        )
    }
}

impl From<Bounds> for [[f64; 2]; 2] {
    fn from(b: Bounds) -> Self {
        [[b.min.lon, b.min.lat], [b.max.lon, b.max.lat]]
    }
}

/// Annual average daily flow per vehicle class at one count point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowMetrics {
    pub pedal_cycles: u64,
    pub two_wheeled_motor_vehicles: u64,
    pub cars_and_taxis: u64,
    pub buses_and_coaches: u64,
    pub lgvs: u64,
    pub all_hgvs: u64,
    pub all_motor_vehicles: u64,
}

impl FlowMetrics {
    /// `(category, value)` pairs in the order the sidebar shows them.
    pub fn categories(&self) -> [(&'static str, u64); 6] {
        [
            ("pedal_cycles", self.pedal_cycles),
            ("motorcycles", self.two_wheeled_motor_vehicles),
            ("cars", self.cars_and_taxis),
            ("buses", self.buses_and_coaches),
            ("lgvs", self.lgvs),
            ("hgvs", self.all_hgvs),
        ]
    }
}

/// A single geocoded count point with its flow statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficPoint {
    pub id: u64,
    pub position: Position,
    pub flows: FlowMetrics,
    /// Remaining descriptive fields from the API record (road name, road type, ...).
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl TrafficPoint {
    pub fn new(id: u64, position: Position) -> Self {
        Self {
            id,
            position,
            flows: FlowMetrics::default(),
            properties: serde_json::Map::new(),
        }
    }

    /// Road name if the API supplied one.
    pub fn road_name(&self) -> Option<&str> {
        self.properties.get("road_name").and_then(|v| v.as_str())
    }
}

/// Result of one authority + year query, replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficDataset {
    pub authority_id: String,
    pub year: u16,
    pub points: Vec<TrafficPoint>,
    pub bounds: Option<Bounds>,
    pub percentages: Percentages,
    pub fetched_at: DateTime<Utc>,
}

impl TrafficDataset {
    pub fn new(authority_id: impl Into<String>, year: u16) -> Self {
        Self {
            authority_id: authority_id.into(),
            year,
            points: Vec::new(),
            bounds: None,
            percentages: Percentages::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_motor_vehicles(&self) -> u64 {
        self.points
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.flows.all_motor_vehicles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_serializes_as_nested_array() {
        let bounds = Bounds::new(Position::new(0.0, 0.0), Position::new(1.0, 1.0));
        let json = serde_json::to_string(&bounds).unwrap();
        assert_eq!(json, "[[0.0,0.0],[1.0,1.0]]");

        let parsed: Bounds = serde_json::from_str("[[-2.5,53.1],[-1.9,53.8]]").unwrap();
        assert_eq!(parsed.min, Position::new(-2.5, 53.1));
        assert_eq!(parsed.max, Position::new(-1.9, 53.8));
    }

    #[test]
    fn test_bounds_enclosing() {
        let positions = [
            Position::new(-2.0, 53.5),
            Position::new(-2.4, 53.9),
            Position::new(-1.8, 53.2),
        ];
        let bounds = Bounds::enclosing(&positions).unwrap();
        assert_eq!(bounds.min, Position::new(-2.4, 53.2));
        assert_eq!(bounds.max, Position::new(-1.8, 53.9));
        assert!(bounds.contains(&Position::new(-2.0, 53.5)));
        assert!(!bounds.contains(&Position::new(0.0, 53.5)));
    }

    #[test]
    fn test_bounds_enclosing_empty() {
        let none: &[Position] = &[];
        assert!(Bounds::enclosing(none).is_none());
    }

    #[test]
    fn test_road_name_from_properties() {
        let mut point = TrafficPoint::new(7, Position::new(0.0, 0.0));
        assert_eq!(point.road_name(), None);
        point
            .properties
            .insert("road_name".to_string(), serde_json::json!("A58"));
        assert_eq!(point.road_name(), Some("A58"));
    }
}
