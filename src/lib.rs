//! Connector for the NowCapital Canadian retirement-planning API.
//!
//! Rows of form parameters are normalized into calculation requests, sent to
//! the service, and for Monte Carlo simulations resolved through the job
//! status endpoints.

pub mod api;
pub mod client;
pub mod connector;
pub mod core;
pub mod error;

pub use connector::{Connector, ConnectorConfig, ErrorMode, prepare_request, row_operation};
pub use error::ConnectorError;
