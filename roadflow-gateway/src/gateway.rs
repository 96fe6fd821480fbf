use crate::error::Result;
use crate::model::{Authority, TrafficDataset};
use async_trait::async_trait;
use std::fmt;

/// Authority + year pair identifying one flow query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowQuery {
    pub authority_id: String,
    pub year: u16,
}

impl FlowQuery {
    pub fn new(authority_id: impl Into<String>, year: u16) -> Self {
        Self {
            authority_id: authority_id.into(),
            year,
        }
    }
}

impl fmt::Display for FlowQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authority {} / {}", self.authority_id, self.year)
    }
}

/// Boundary to the remote traffic counts service.
#[async_trait]
pub trait TrafficDataGateway: Send + Sync {
    async fn list_local_authorities(&self) -> Result<Vec<Authority>>;

    async fn get_annual_average_daily_flow(
        &self,
        authority_id: &str,
        year: u16,
    ) -> Result<TrafficDataset>;

    async fn fetch(&self, query: &FlowQuery) -> Result<TrafficDataset> {
        self.get_annual_average_daily_flow(&query.authority_id, query.year)
            .await
    }
}
