//! Elasticsearch client wrapper.

use anyhow::Result;
use elasticsearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch, SearchParts,
};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::store::{StoreError, StoreResult};

/// Elasticsearch client wrapper with the two indices the geocoder reads
#[derive(Clone)]
pub struct EsClient {
    client: Elasticsearch,
    pub places_index: String,
    pub address_index: String,
}

impl EsClient {
    /// Create a new Elasticsearch client
    pub fn new(es_url: &str, places_index: &str, address_index: &str) -> Result<Self> {
        let url = Url::parse(es_url)?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool).disable_proxy().build()?;

        let client = Elasticsearch::new(transport);

        Ok(Self {
            client,
            places_index: places_index.to_string(),
            address_index: address_index.to_string(),
        })
    }

    /// Check if cluster is healthy
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .cluster()
            .health(elasticsearch::cluster::ClusterHealthParts::None)
            .send()
            .await?;

        Ok(response.status_code().is_success())
    }

    /// Get document count in the places index
    pub async fn doc_count(&self) -> Result<u64> {
        let response = self
            .client
            .count(elasticsearch::CountParts::Index(&[&self.places_index]))
            .send()
            .await?;

        let body = response.json::<Value>().await?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }

    /// Run a search and return the raw `hits.hits` array.
    ///
    /// 4xx responses mean the body was rejected; everything else that is not
    /// a success is treated as the backend being unavailable.
    pub async fn search(&self, index: &str, body: Value) -> StoreResult<Vec<Value>> {
        debug!("Search on {}: {}", index, body);

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(if status.is_client_error() {
                StoreError::MalformedQuery(format!("{status}: {text}"))
            } else {
                StoreError::Unavailable(format!("{status}: {text}"))
            });
        }

        let mut response_body = response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let hits = response_body
            .get_mut("hits")
            .and_then(|h| h.get_mut("hits"))
            .map(Value::take);
        Ok(match hits {
            Some(Value::Array(hits)) => hits,
            _ => Vec::new(),
        })
    }
}
