// Plain-text summaries of a traffic dataset

use roadflow_gateway::{Authority, TrafficDataset, TrafficPoint};
use serde::{Deserialize, Serialize};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Render a dataset in the requested format.
pub fn render_dataset(
    dataset: &TrafficDataset,
    authority: Option<&Authority>,
    format: ReportFormat,
    top: Option<usize>,
) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_flow_report(dataset, authority, top)),
        ReportFormat::Json => serde_json::to_string_pretty(dataset),
    }
}

/// Render the authority list in the requested format.
pub fn render_authorities(
    authorities: &[Authority],
    format: ReportFormat,
) -> serde_json::Result<String> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(authorities),
        ReportFormat::Text => {
            let width = authorities.iter().map(|a| a.id.len()).max().unwrap_or(2);
            let mut out = String::new();
            for authority in authorities {
                out.push_str(&format!("  {:>width$}  {}\n", authority.id, authority.name, width = width));
            }
            out.push_str(&format!("\n  {} local authorities\n", authorities.len()));
            Ok(out)
        }
    }
}

/// Human-readable label for a percentage category key.
pub fn category_label(key: &str) -> &str {
    match key {
        "pedal_cycles" => "Pedal cycles",
        "motorcycles" => "Motorcycles",
        "cars" => "Cars & taxis",
        "buses" => "Buses & coaches",
        "lgvs" => "LGVs",
        "hgvs" => "HGVs",
        other => other,
    }
}

/// Horizontal bar for a 0-100 percentage.
pub fn percentage_bar(pct: f64, width: usize) -> String {
    let filled = ((pct.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Label shown for a point in lists: road name when known, else the id.
pub fn point_label(point: &TrafficPoint) -> String {
    match point.road_name() {
        Some(road) => format!("{} (#{})", road, point.id),
        None => format!("#{}", point.id),
    }
}

/// Group digits in thousands: 12345 -> "12,345".
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Summary plus the busiest points, in the style of the terminal output.
///
/// `top` limits how many points are listed; `None` lists them all.
pub fn generate_flow_report(
    dataset: &TrafficDataset,
    authority: Option<&Authority>,
    top: Option<usize>,
) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n");

    let name = authority
        .map(|a| a.name.clone())
        .unwrap_or_else(|| format!("Authority {}", dataset.authority_id));
    report.push_str(&format!("# {} ({})\n", name, dataset.year));
    report.push_str(&format!("  Count points: {}\n", dataset.points.len()));
    report.push_str(&format!(
        "  Total motor vehicles (AADF): {}\n",
        format_count(dataset.total_motor_vehicles())
    ));
    if let Some(bounds) = dataset.bounds {
        report.push_str(&format!(
            "  Bounds: [{:.4}, {:.4}] – [{:.4}, {:.4}]\n",
            bounds.min.lon, bounds.min.lat, bounds.max.lon, bounds.max.lat
        ));
    }
    report.push_str(&format!(
        "  Fetched: {}\n",
        dataset.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    report.push_str("\n## Vehicle mix\n");
    for (key, pct) in &dataset.percentages {
        report.push_str(&format!(
            "  {:<16} {} {:>5.1}%\n",
            category_label(key),
            percentage_bar(*pct, BAR_WIDTH),
            pct
        ));
    }

    let mut points: Vec<&TrafficPoint> = dataset.points.iter().collect();
    points.sort_by(|a, b| {
        b.flows
            .all_motor_vehicles
            .cmp(&a.flows.all_motor_vehicles)
            .then(a.id.cmp(&b.id))
    });
    let shown = top.unwrap_or(points.len()).min(points.len());

    report.push_str(&format!("\n{}\n\n", RULE));
    report.push_str(&format!("## Busiest count points ({} of {})\n", shown, points.len()));
    for point in points.into_iter().take(shown) {
        // green < 5k, yellow < 20k, red above
        let volume = point.flows.all_motor_vehicles;
        let volume_str = match volume {
            0..=4_999 => format!("\x1b[32m{:>8}\x1b[0m", format_count(volume)),
            5_000..=19_999 => format!("\x1b[33m{:>8}\x1b[0m", format_count(volume)),
            _ => format!("\x1b[31m{:>8}\x1b[0m", format_count(volume)),
        };
        report.push_str(&format!(
            "  {} {} \x1b[90m{:.5}, {:.5}\x1b[0m\n",
            volume_str,
            point_label(point),
            point.position.lat,
            point.position.lon
        ));
    }
    report
}
