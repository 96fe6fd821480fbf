pub mod error;
pub mod gateway;
pub mod http;
pub mod model;
pub mod shape;

pub use error::GatewayError;
pub use gateway::{FlowQuery, TrafficDataGateway};
pub use http::HttpGateway;
pub use model::{Authority, Bounds, FlowMetrics, Percentages, Position, TrafficDataset, TrafficPoint};
