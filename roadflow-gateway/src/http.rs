use crate::error::{GatewayError, Result};
use crate::gateway::TrafficDataGateway;
use crate::model::{Authority, TrafficDataset};
use crate::shape::{self, Envelope, RawRecord};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://roadtraffic.dft.gov.uk/api";
pub const DEFAULT_USER_AGENT: &str = "Roadflow/0.1 (https://github.com/trapdoorsec/roadflow)";

const AUTHORITIES_PATH: &str = "local-authorities";
const AADF_PATH: &str = "average-annual-daily-flow";

/// Gateway speaking to the traffic counts JSON API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, 10, DEFAULT_USER_AGENT)
    }

    pub fn with_options(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            base_url: Self::normalize_base(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Parse the base URL and make sure relative joins stay under its path.
    fn normalize_base(base_url: &str) -> Result<Url> {
        let mut url = Url::parse(base_url)
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(base_url.to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn get_records(&self, url: Url) -> Result<Vec<RawRecord>> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        debug!("{} returned {} bytes in {:?}", url, body.len(), start.elapsed());

        let envelope: Envelope<RawRecord> =
            serde_json::from_slice(&body).map_err(|source| GatewayError::Decode {
                url: url.to_string(),
                source,
            })?;
        Ok(envelope.into_inner())
    }
}

#[async_trait]
impl TrafficDataGateway for HttpGateway {
    async fn list_local_authorities(&self) -> Result<Vec<Authority>> {
        let url = self.endpoint(AUTHORITIES_PATH)?;
        let authorities = shape::shape_authorities(self.get_records(url).await?);
        info!("Loaded {} local authorities", authorities.len());
        Ok(authorities)
    }

    async fn get_annual_average_daily_flow(
        &self,
        authority_id: &str,
        year: u16,
    ) -> Result<TrafficDataset> {
        let mut url = self.endpoint(AADF_PATH)?;
        url.query_pairs_mut()
            .append_pair("filter[local_authority_id]", authority_id)
            .append_pair("filter[year]", &year.to_string());

        let records = self.get_records(url).await?;
        let dataset = shape::shape_dataset(authority_id, year, records);
        info!(
            "Loaded {} count points for authority {} in {}",
            dataset.points.len(),
            authority_id,
            year
        );
        Ok(dataset)
    }
}
