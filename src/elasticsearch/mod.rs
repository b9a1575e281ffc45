//! Elasticsearch-backed place store.

mod client;
pub mod query;
mod store;

pub use client::EsClient;
pub use store::ElasticStore;
