// Turns raw API records into map-ready points, bounds and percentages

use crate::model::{Authority, Bounds, FlowMetrics, Percentages, Position, TrafficDataset, TrafficPoint};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

pub type RawRecord = Map<String, Value>;

/// The API wraps lists in `{"data": [...]}`; plain arrays are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> Vec<T> {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(items) => items,
        }
    }
}

/// Convert raw local authority records, skipping any without an id or name.
pub fn shape_authorities(records: Vec<RawRecord>) -> Vec<Authority> {
    records
        .into_iter()
        .filter_map(|mut record| {
            let id = take_id(&mut record, &["id", "local_authority_id"])?;
            let name = take_string(&mut record, &["name", "local_authority_name"])?;
            Some(Authority {
                id,
                name,
                region_id: take_id(&mut record, &["region_id"]),
                ons_code: take_string(&mut record, &["ons_code", "local_authority_code"]),
            })
        })
        .collect()
}

/// Build a dataset from raw count point records.
///
/// Records without a usable id or coordinates are dropped. Bounds enclose the
/// kept points; percentages are each vehicle class' share of the combined flow.
pub fn shape_dataset(authority_id: &str, year: u16, records: Vec<RawRecord>) -> TrafficDataset {
    let total_records = records.len();
    let points: Vec<TrafficPoint> = records.into_iter().filter_map(shape_point).collect();

    if points.len() < total_records {
        debug!(
            "Dropped {} of {} records without id or coordinates",
            total_records - points.len(),
            total_records
        );
    }

    let mut dataset = TrafficDataset::new(authority_id, year);
    dataset.bounds = Bounds::enclosing(points.iter().map(|p| &p.position));
    dataset.percentages = percentages(points.iter().map(|p| &p.flows));
    dataset.points = points;
    dataset
}

fn shape_point(mut record: RawRecord) -> Option<TrafficPoint> {
    let id = take_u64(&mut record, "count_point_id").or_else(|| take_u64(&mut record, "id"))?;
    let lat = take_f64(&mut record, "latitude")?;
    let lon = take_f64(&mut record, "longitude")?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    let flows = FlowMetrics {
        pedal_cycles: take_u64(&mut record, "pedal_cycles").unwrap_or(0),
        two_wheeled_motor_vehicles: take_u64(&mut record, "two_wheeled_motor_vehicles")
            .unwrap_or(0),
        cars_and_taxis: take_u64(&mut record, "cars_and_taxis").unwrap_or(0),
        buses_and_coaches: take_u64(&mut record, "buses_and_coaches").unwrap_or(0),
        lgvs: take_u64(&mut record, "lgvs").unwrap_or(0),
        all_hgvs: take_u64(&mut record, "all_hgvs").unwrap_or(0),
        all_motor_vehicles: take_u64(&mut record, "all_motor_vehicles").unwrap_or(0),
    };

    // Redundant with the fields above
    record.remove("lat");
    record.remove("lon");

    Some(TrafficPoint {
        id,
        position: Position::new(lon, lat),
        flows,
        properties: record,
    })
}

/// Share of each category in the summed flow, rounded to one decimal place.
pub fn percentages<'a>(flows: impl IntoIterator<Item = &'a FlowMetrics>) -> Percentages {
    let mut totals = FlowMetrics::default().categories().map(|(name, _)| (name, 0u64));
    for f in flows {
        for (slot, (_, value)) in totals.iter_mut().zip(f.categories()) {
            slot.1 = slot.1.saturating_add(value);
        }
    }

    let grand_total = totals.iter().fold(0u64, |acc, (_, v)| acc.saturating_add(*v));
    totals
        .into_iter()
        .map(|(name, value)| {
            let pct = if grand_total == 0 {
                0.0
            } else {
                (value as f64 * 1000.0 / grand_total as f64).round() / 10.0
            };
            (name.to_string(), pct)
        })
        .collect()
}

fn take_u64(record: &mut RawRecord, key: &str) -> Option<u64> {
    match record.remove(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn take_f64(record: &mut RawRecord, key: &str) -> Option<f64> {
    let value = match record.remove(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn take_id(record: &mut RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.remove(*key)? {
        Value::Number(n) => Some(number_id(&n)),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

// 85.0 and 85 must name the same authority
fn number_id(n: &serde_json::Number) -> String {
    if let Some(id) = n.as_u64() {
        return id.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 => (f as u64).to_string(),
        _ => n.to_string(),
    }
}

fn take_string(record: &mut RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.remove(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}
