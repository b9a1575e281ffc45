//! The place store boundary.
//!
//! The service never talks to a backend directly; it hands a [`QuerySpec`]
//! to a [`PlaceStore`] and gets [`PlaceMatch`] records back.

mod memory;

pub use memory::{MemoryStore, StoredPlace};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AddressRow, PlaceMatch};
use crate::predicate::{ExternalRefs, GeometryRequest, QuerySpec};

#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure or timeout talking to the backend
    #[error("place store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the translated query
    #[error("malformed store query: {0}")]
    MalformedQuery(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait PlaceStore: Send + Sync {
    /// Filtered, deduplicated, ordered and paginated matches for a search
    async fn find_matches(&self, spec: &QuerySpec) -> StoreResult<Vec<PlaceMatch>>;

    /// Nearest place by centroid that satisfies the query's filters
    async fn find_nearest(
        &self,
        lat: f64,
        lon: f64,
        spec: &QuerySpec,
    ) -> StoreResult<Option<PlaceMatch>>;

    /// Places for the given OSM ids, importance desc
    async fn find_by_external_refs(
        &self,
        refs: &ExternalRefs,
        geometry: GeometryRequest,
    ) -> StoreResult<Vec<PlaceMatch>>;

    /// Address hierarchy of a place, ascending by rank
    async fn fetch_address_rows(&self, place_id: i64) -> StoreResult<Vec<AddressRow>>;

    /// Cheap liveness check for `/status`
    async fn ping(&self) -> bool {
        true
    }
}
