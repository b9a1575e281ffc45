//! [`PlaceStore`] implementation over Elasticsearch.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::query::{
    address_rows_body, external_refs_body, nearest_body, parse_address_hit, parse_place_hit,
    search_body,
};
use super::EsClient;
use crate::models::{AddressRow, PlaceMatch};
use crate::predicate::{dedupe, sort_matches, ExternalRefs, GeometryRequest, QuerySpec};
use crate::store::{PlaceStore, StoreResult};

pub struct ElasticStore {
    client: EsClient,
}

impl ElasticStore {
    pub fn new(client: EsClient) -> Self {
        Self { client }
    }

    async fn search_places(
        &self,
        body: serde_json::Value,
        geometry: GeometryRequest,
    ) -> StoreResult<Vec<PlaceMatch>> {
        let hits = self.client.search(&self.client.places_index, body).await?;
        let total = hits.len();
        let matches: Vec<PlaceMatch> = hits
            .iter()
            .filter_map(|hit| parse_place_hit(hit, geometry))
            .collect();
        if matches.len() < total {
            warn!(
                "Skipped {} unparsable hits from {}",
                total - matches.len(),
                self.client.places_index
            );
        }
        Ok(matches)
    }
}

#[async_trait]
impl PlaceStore for ElasticStore {
    async fn find_matches(&self, spec: &QuerySpec) -> StoreResult<Vec<PlaceMatch>> {
        let mut matches = self.search_places(search_body(spec), spec.geometry).await?;
        debug!("Elasticsearch returned {} matches", matches.len());

        if spec.dedupe {
            matches = dedupe(matches);
            sort_matches(&mut matches, &spec.order);
            matches = matches
                .into_iter()
                .skip(spec.page.offset)
                .take(spec.page.limit)
                .collect();
        }
        Ok(matches)
    }

    async fn find_nearest(
        &self,
        lat: f64,
        lon: f64,
        spec: &QuerySpec,
    ) -> StoreResult<Option<PlaceMatch>> {
        let matches = self
            .search_places(nearest_body(lat, lon, spec), spec.geometry)
            .await?;
        Ok(matches.into_iter().next())
    }

    async fn find_by_external_refs(
        &self,
        refs: &ExternalRefs,
        geometry: GeometryRequest,
    ) -> StoreResult<Vec<PlaceMatch>> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }
        self.search_places(external_refs_body(refs, geometry), geometry)
            .await
    }

    async fn fetch_address_rows(&self, place_id: i64) -> StoreResult<Vec<AddressRow>> {
        let hits = self
            .client
            .search(&self.client.address_index, address_rows_body(place_id))
            .await?;
        Ok(hits.iter().filter_map(parse_address_hit).collect())
    }

    async fn ping(&self) -> bool {
        match self.client.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Elasticsearch health check failed: {}", e);
                false
            }
        }
    }
}
