//! Geocoding service: builds query specs, calls the place store and shapes
//! the matches into canonical [`Place`] records.

mod context;

pub use context::RequestContext;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::locale::{parse_accept_language, resolve_display_name};
use crate::models::{Place, PlaceMatch};
use crate::predicate::{
    build_lookup_refs, build_reverse_spec, build_search_spec, reverse_anchor, DetailOptions,
    GeometryRequest, LookupParams, ReverseParams, SearchParams,
};
use crate::store::PlaceStore;

pub const DEFAULT_LICENCE: &str = "Data © OpenStreetMap contributors";

/// Deployment-level values threaded into every response
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub licence: String,
    pub version: String,
    pub enable_details: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            licence: DEFAULT_LICENCE.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            enable_details: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub version: String,
    /// `ok` or `unavailable`
    pub db_status: String,
    pub uptime: String,
}

/// `1h2m3s` style duration, as `/status` reports it
pub fn format_uptime(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

pub struct GeocodeService {
    store: Arc<dyn PlaceStore>,
    settings: ServiceSettings,
    started_at: DateTime<Utc>,
}

impl GeocodeService {
    pub fn new(store: Arc<dyn PlaceStore>, settings: ServiceSettings) -> Self {
        Self {
            store,
            settings,
            started_at: Utc::now(),
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Forward search
    pub async fn search(&self, params: &SearchParams, ctx: &RequestContext) -> Result<Vec<Place>> {
        info!("Search q={}", params.query);
        let spec = build_search_spec(params);
        let matches = ctx.run(self.store.find_matches(&spec)).await?;
        debug!("Search q={} returned {} matches", params.query, matches.len());
        self.finish(matches, &params.details, ctx).await
    }

    /// Reverse geocode to the single nearest place, if any
    pub async fn reverse(
        &self,
        params: &ReverseParams,
        ctx: &RequestContext,
    ) -> Result<Option<Place>> {
        let anchor = reverse_anchor(params);
        info!("Reverse lat={} lon={} zoom={:?}", anchor.lat, anchor.lon, params.zoom);
        let spec = build_reverse_spec(params);

        let nearest = ctx
            .run(self.store.find_nearest(anchor.lat, anchor.lon, &spec))
            .await?;
        let places = self
            .finish(nearest.into_iter().collect(), &params.details, ctx)
            .await?;
        Ok(places.into_iter().next())
    }

    /// Fetch places by OSM id. Malformed ids are dropped; none left means no store call.
    pub async fn lookup(&self, params: &LookupParams, ctx: &RequestContext) -> Result<Vec<Place>> {
        let refs = build_lookup_refs(&params.osm_ids);
        if refs.is_empty() {
            debug!("Lookup with no usable ids: {:?}", params.osm_ids);
            return Ok(Vec::new());
        }
        info!("Lookup {} ids", refs.len());

        let geometry = GeometryRequest::from_flags(
            params.details.polygon_geojson,
            params.details.polygon_threshold,
        );
        let matches = ctx
            .run(self.store.find_by_external_refs(&refs, geometry))
            .await?;
        self.finish(matches, &params.details, ctx).await
    }

    /// Everything known about a single place: full geometry, tags and names.
    ///
    /// Returns `None` when disabled or when the id does not resolve.
    pub async fn details(
        &self,
        osm_id: &str,
        address_details: bool,
        accept_language: &str,
        ctx: &RequestContext,
    ) -> Result<Option<Place>> {
        if !self.settings.enable_details || osm_id.trim().is_empty() {
            return Ok(None);
        }

        let params = LookupParams {
            osm_ids: vec![osm_id.trim().to_string()],
            details: DetailOptions {
                address_details,
                extra_tags: true,
                name_details: true,
                polygon_geojson: true,
                polygon_threshold: 0.0,
                accept_language: accept_language.to_string(),
            },
        };
        let places = self.lookup(&params, ctx).await?;
        Ok(places.into_iter().next())
    }

    pub async fn status(&self) -> StatusReport {
        let db_status = if self.store.ping().await {
            "ok"
        } else {
            "unavailable"
        };
        StatusReport {
            version: self.settings.version.clone(),
            db_status: db_status.to_string(),
            uptime: format_uptime((Utc::now() - self.started_at).num_seconds()),
        }
    }

    /// Attach address rows if requested, then resolve names
    async fn finish(
        &self,
        mut matches: Vec<PlaceMatch>,
        details: &DetailOptions,
        ctx: &RequestContext,
    ) -> Result<Vec<Place>> {
        if details.address_details && !matches.is_empty() {
            let rows = try_join_all(
                matches
                    .iter()
                    .map(|m| ctx.run(self.store.fetch_address_rows(m.place_id))),
            )
            .await?;
            for (m, rows) in matches.iter_mut().zip(rows) {
                m.address_rows = rows;
            }
        }

        let prefs = parse_accept_language(&details.accept_language);
        Ok(matches
            .into_iter()
            .map(|m| self.to_place(m, details, &prefs))
            .collect())
    }

    fn to_place(&self, m: PlaceMatch, details: &DetailOptions, prefs: &[String]) -> Place {
        let display_name = resolve_display_name(&m.name_variants, &m.base_name, prefs);
        Place {
            licence: self.settings.licence.clone(),
            place_id: m.place_id,
            osm_type: m.osm.kind,
            osm_id: m.osm.id,
            category: m.category,
            subtype: m.subtype,
            display_name,
            importance: m.importance,
            centroid: m.centroid,
            bbox: m.bbox,
            address_rows: m.address_rows,
            polygon_geojson: m.polygon_geojson,
            extratags: if details.extra_tags {
                m.extra_tags
            } else {
                BTreeMap::new()
            },
            namedetails: if details.name_details {
                m.name_variants
            } else {
                BTreeMap::new()
            },
        }
    }
}
