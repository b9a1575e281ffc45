//! In-process place store backed by R-trees over place centroids and extents.

use async_trait::async_trait;
use hashbrown::HashMap;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::{PlaceStore, StoreResult};
use crate::error::{GeocodeError, Result};
use crate::geometry::render_geometry;
use crate::models::{AddressRow, BoundingBox, GeoPoint, OsmRef, OsmType, PlaceMatch};
use crate::predicate::{
    dedupe, sort_matches, ExternalRefs, FeatureFilter, GeometryRequest, QuerySpec, SortOrder,
};

/// One place record as held by the store (and as written in fixture files)
#[derive(Debug, Clone, Deserialize)]
pub struct StoredPlace {
    pub place_id: i64,
    pub osm_type: OsmType,
    pub osm_id: i64,
    #[serde(rename = "class")]
    pub category: String,
    #[serde(rename = "type", default)]
    pub subtype: String,
    #[serde(default)]
    pub names: BTreeMap<String, String>,
    pub lat: f64,
    pub lon: f64,
    /// `[south, north, west, east]`
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub rank_address: u32,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub extratags: BTreeMap<String, String>,
    /// GeoJSON geometry object
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub address: Vec<AddressRow>,
}

impl StoredPlace {
    /// The place's bbox, or its centroid as a degenerate box when it has none
    fn extent(&self) -> BoundingBox {
        self.bbox
            .map(|[south, north, west, east]| BoundingBox::new(south, north, west, east))
            .filter(|b| !b.is_zero())
            .unwrap_or_else(|| BoundingBox::new(self.lat, self.lat, self.lon, self.lon))
    }

    fn generic_name(&self) -> Option<&str> {
        self.names.get("name").map(String::as_str)
    }

    fn to_match(&self, geometry: GeometryRequest) -> PlaceMatch {
        let mut m = PlaceMatch::new(
            self.place_id,
            OsmRef::new(self.osm_type, self.osm_id),
            &self.category,
            &self.subtype,
            GeoPoint::new(self.lat, self.lon),
        );
        for (key, name) in &self.names {
            m.add_name(key, name);
        }
        if let Some([south, north, west, east]) = self.bbox {
            m.bbox = BoundingBox::new(south, north, west, east);
        }
        m.importance = self.importance.unwrap_or(0.0).max(0.0);
        m.extra_tags = self.extratags.clone();
        m.polygon_geojson = render_geometry(self.geometry.as_ref(), geometry);
        m
    }

    /// Every non-spatial filter of the query
    fn satisfies(&self, spec: &QuerySpec) -> bool {
        if let Some(text) = &spec.text {
            let Some(name) = self.generic_name() else {
                return false;
            };
            if !name.to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }

        if !spec.country_codes.is_empty() {
            let cc = self.country_code.as_deref().unwrap_or("").to_lowercase();
            if !spec.country_codes.contains(&cc) {
                return false;
            }
        }

        match &spec.feature {
            Some(FeatureFilter::ClassType { category, subtype }) => {
                if &self.category != category || &self.subtype != subtype {
                    return false;
                }
            }
            Some(FeatureFilter::Rank(range)) => {
                if !range.contains(self.rank_address) {
                    return false;
                }
            }
            Some(FeatureFilter::ClassOrType(value)) => {
                if &self.category != value && &self.subtype != value {
                    return false;
                }
            }
            None => {}
        }

        if !spec.categories.is_empty() && !spec.categories.contains(&self.category) {
            return false;
        }
        if spec.exclude_place_ids.contains(&self.place_id) {
            return false;
        }
        if let Some(max_rank) = spec.max_rank {
            if self.rank_address > max_rank {
                return false;
            }
        }
        if let Some(bounds) = &spec.bounds {
            if !bounds.intersects(&self.extent()) {
                return false;
            }
        }
        true
    }
}

#[derive(Deserialize)]
struct Fixture {
    places: Vec<StoredPlace>,
}

/// R-tree entry: a centroid and the index of its place
#[derive(Debug, Clone, Copy)]
struct IndexedPlace {
    idx: usize,
    point: [f64; 2],
}

impl RTreeObject for IndexedPlace {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IndexedPlace {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree entry for bounded searches: a place extent and the index of its place
type IndexedExtent = GeomWithData<Rectangle<[f64; 2]>, usize>;

pub struct MemoryStore {
    places: Vec<StoredPlace>,
    tree: RTree<IndexedPlace>,
    extents: RTree<IndexedExtent>,
    by_id: HashMap<i64, usize>,
}

impl MemoryStore {
    pub fn new(mut places: Vec<StoredPlace>) -> Self {
        for place in &mut places {
            place.address.sort_by_key(|row| row.rank);
        }

        let indexed: Vec<IndexedPlace> = places
            .iter()
            .enumerate()
            .map(|(idx, p)| IndexedPlace {
                idx,
                point: [p.lon, p.lat],
            })
            .collect();
        let extents: Vec<IndexedExtent> = places
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let e = p.extent();
                let corners = Rectangle::from_corners([e.west, e.south], [e.east, e.north]);
                IndexedExtent::new(corners, idx)
            })
            .collect();
        let by_id = places
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.place_id, idx))
            .collect();

        let tree = RTree::bulk_load(indexed);
        let extents = RTree::bulk_load(extents);
        info!("Memory store indexed {} places", tree.size());

        Self {
            places,
            tree,
            extents,
            by_id,
        }
    }

    /// Parse a fixture document: `{"places": [...]}`
    pub fn from_json(raw: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(raw)
            .map_err(|e| GeocodeError::Config(format!("invalid place fixture: {e}")))?;
        Ok(Self::new(fixture.places))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GeocodeError::Config(format!("cannot read fixture {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Candidates for a query, using the extent tree when a bounding filter is set
    fn candidates<'a>(&'a self, spec: &'a QuerySpec) -> Box<dyn Iterator<Item = &'a StoredPlace> + 'a> {
        match &spec.bounds {
            Some(b) => {
                let envelope = AABB::from_corners([b.west, b.south], [b.east, b.north]);
                Box::new(
                    self.extents
                        .locate_in_envelope_intersecting(&envelope)
                        .map(move |e| &self.places[e.data]),
                )
            }
            None => Box::new(self.places.iter()),
        }
    }
}

#[async_trait]
impl PlaceStore for MemoryStore {
    async fn find_matches(&self, spec: &QuerySpec) -> StoreResult<Vec<PlaceMatch>> {
        let mut matches: Vec<PlaceMatch> = self
            .candidates(spec)
            .filter(|p| p.satisfies(spec))
            .map(|p| p.to_match(GeometryRequest::None))
            .collect();
        debug!("Memory store: {} raw matches", matches.len());

        if spec.dedupe {
            matches = dedupe(matches);
        }
        sort_matches(&mut matches, &spec.order);

        let page: Vec<PlaceMatch> = matches
            .into_iter()
            .skip(spec.page.offset)
            .take(spec.page.limit)
            .map(|m| self.with_geometry(m, spec.geometry))
            .collect();
        Ok(page)
    }

    async fn find_nearest(
        &self,
        lat: f64,
        lon: f64,
        spec: &QuerySpec,
    ) -> StoreResult<Option<PlaceMatch>> {
        let anchor = [lon, lat];
        let mut best: Option<(f64, &StoredPlace)> = None;

        for ip in self.tree.nearest_neighbor_iter(&anchor) {
            let place = &self.places[ip.idx];
            if !place.satisfies(spec) {
                continue;
            }
            let dist = ip.distance_2(&anchor);
            match best {
                None => best = Some((dist, place)),
                Some((best_dist, _)) if dist > best_dist => break,
                // equidistant: highest place_id wins
                Some((_, current)) if place.place_id > current.place_id => {
                    best = Some((dist, place))
                }
                Some(_) => {}
            }
        }

        Ok(best.map(|(_, p)| p.to_match(spec.geometry)))
    }

    async fn find_by_external_refs(
        &self,
        refs: &ExternalRefs,
        geometry: GeometryRequest,
    ) -> StoreResult<Vec<PlaceMatch>> {
        let mut matches: Vec<PlaceMatch> = self
            .places
            .iter()
            .filter(|p| refs.contains(p.osm_type, p.osm_id))
            .map(|p| p.to_match(geometry))
            .collect();
        sort_matches(&mut matches, &SortOrder::Importance);
        Ok(matches)
    }

    async fn fetch_address_rows(&self, place_id: i64) -> StoreResult<Vec<AddressRow>> {
        Ok(self
            .by_id
            .get(&place_id)
            .map(|&idx| self.places[idx].address.clone())
            .unwrap_or_default())
    }
}

impl MemoryStore {
    fn with_geometry(&self, mut m: PlaceMatch, geometry: GeometryRequest) -> PlaceMatch {
        if geometry.wants_geometry() {
            if let Some(&idx) = self.by_id.get(&m.place_id) {
                m.polygon_geojson = render_geometry(self.places[idx].geometry.as_ref(), geometry);
            }
        }
        m
    }
}
