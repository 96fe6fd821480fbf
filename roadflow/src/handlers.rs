use anyhow::{Context, Result, bail};
use colored::Colorize;
use roadflow_core::Config;
use roadflow_core::report::{ReportFormat, render_authorities, render_dataset};
use roadflow_gateway::{Authority, FlowQuery, TrafficDataGateway};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Load the config file and apply command-line overrides.
pub fn load_config(config_path: Option<&PathBuf>, base_url: Option<&Url>) -> Result<Config> {
    let mut config = Config::load_from(config_path.cloned()).context("Failed to load configuration")?;

    if let Some(url) = base_url {
        config.api.base_url = url.as_str().to_string();
        config.validate().context("Invalid --base-url")?;
    }
    Ok(config)
}

/// Authorities whose id or name contains `filter`, ignoring case.
pub fn filter_authorities(authorities: &[Authority], filter: Option<&str>) -> Vec<Authority> {
    let Some(needle) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return authorities.to_vec();
    };
    let needle = needle.to_lowercase();

    authorities
        .iter()
        .filter(|a| a.id.to_lowercase().contains(&needle) || a.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

pub fn parse_format(value: Option<&String>) -> ReportFormat {
    value
        .and_then(|v| ReportFormat::from_str(v))
        .unwrap_or(ReportFormat::Text)
}

/// Fetch and render the authority list.
pub async fn handle_authorities(
    gateway: &dyn TrafficDataGateway,
    filter: Option<&str>,
    format: ReportFormat,
) -> Result<String> {
    let authorities = gateway
        .list_local_authorities()
        .await
        .context("Failed to load local authorities")?;

    let matching = filter_authorities(&authorities, filter);
    if matching.is_empty() && format == ReportFormat::Text {
        bail!(
            "No local authorities match '{}'",
            filter.unwrap_or_default()
        );
    }

    Ok(render_authorities(&matching, format)?)
}

/// Fetch and render flows for one authority and year.
///
/// The authority name is looked up for the report heading; if that lookup
/// fails the id is used instead.
pub async fn handle_flows(
    gateway: &dyn TrafficDataGateway,
    query: &FlowQuery,
    format: ReportFormat,
    top: Option<usize>,
) -> Result<String> {
    let dataset = gateway
        .fetch(query)
        .await
        .with_context(|| format!("Failed to load traffic data for {}", query))?;

    if dataset.is_empty() {
        bail!(
            "No count points for authority {} in {}",
            query.authority_id,
            query.year
        );
    }

    let authority = match format {
        ReportFormat::Text => match gateway.list_local_authorities().await {
            Ok(list) => list.into_iter().find(|a| a.id == query.authority_id),
            Err(e) => {
                debug!("Authority lookup failed, reporting by id: {}", e);
                None
            }
        },
        ReportFormat::Json => None,
    };

    Ok(render_dataset(&dataset, authority.as_ref(), format, top)?)
}

/// Write a rendered report to `path`, creating parent directories.
pub fn save_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "✗".red().bold(), err);
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}
