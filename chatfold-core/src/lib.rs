pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod provider;
pub mod provider_factory;
pub mod router;
pub mod stream;
pub mod telemetry;
pub mod usage;
#[cfg(test)]
pub mod test_util;
