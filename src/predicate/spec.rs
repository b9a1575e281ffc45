//! Typed, store-agnostic description of a place query.
//!
//! Stores receive a [`QuerySpec`] and are responsible for turning it into
//! their own parameterized query language. Filter values never get
//! concatenated into query text on this side.

use std::collections::BTreeSet;

use crate::models::{BoundingBox, GeoPoint, OsmType};
use crate::tables::RankRange;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

/// Pagination window, always within `limit ∈ [1, 50]`, `offset ≥ 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// Clamp raw client values. A non-positive limit means "use the default".
    pub fn new(limit: i64, offset: i64) -> Self {
        let limit = if limit <= 0 {
            DEFAULT_LIMIT
        } else {
            (limit as u64).min(MAX_LIMIT as u64) as usize
        };
        let offset = offset.max(0) as usize;
        Self { limit, offset }
    }

    pub fn single() -> Self {
        Self {
            limit: 1,
            offset: 0,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Feature type restriction
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureFilter {
    /// `class = category AND type = subtype`
    ClassType { category: String, subtype: String },
    /// `rank_address BETWEEN min AND max`
    Rank(RankRange),
    /// `class = value OR type = value`
    ClassOrType(String),
}

/// Result ordering. `place_id desc` is always the final tie-break.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortOrder {
    /// importance desc, place_id desc
    Importance,
    /// importance desc, distance to viewbox center asc, place_id desc
    ViewboxProximity(GeoPoint),
    /// distance to anchor asc, place_id desc
    Distance(GeoPoint),
}

/// What geometry the store should attach to each match
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GeometryRequest {
    #[default]
    None,
    Full,
    /// Simplify with the given tolerance (degrees) before returning
    Simplified(f64),
}

impl GeometryRequest {
    pub fn from_flags(polygon_geojson: bool, threshold: f64) -> Self {
        if !polygon_geojson {
            GeometryRequest::None
        } else if threshold.is_finite() && threshold > 0.0 {
            GeometryRequest::Simplified(threshold)
        } else {
            GeometryRequest::Full
        }
    }

    pub fn wants_geometry(&self) -> bool {
        !matches!(self, GeometryRequest::None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// Case-insensitive substring matched against the generic name; empty
    /// matches every named place. `None` places no name requirement at all.
    pub text: Option<String>,
    /// Lowercase ISO codes; empty means any country
    pub country_codes: Vec<String>,
    /// Only set when bounding was requested and the box is usable
    pub bounds: Option<BoundingBox>,
    pub feature: Option<FeatureFilter>,
    /// Allowed classes; empty means no class restriction
    pub categories: BTreeSet<String>,
    pub exclude_place_ids: BTreeSet<i64>,
    pub dedupe: bool,
    /// Upper rank_address bound (reverse geocoding)
    pub max_rank: Option<u32>,
    pub order: SortOrder,
    pub page: Page,
    pub geometry: GeometryRequest,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            text: None,
            country_codes: Vec::new(),
            bounds: None,
            feature: None,
            categories: BTreeSet::new(),
            exclude_place_ids: BTreeSet::new(),
            dedupe: false,
            max_rank: None,
            order: SortOrder::Importance,
            page: Page::default(),
            geometry: GeometryRequest::None,
        }
    }
}

/// OSM ids to fetch, partitioned by object type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalRefs {
    pub nodes: BTreeSet<i64>,
    pub ways: BTreeSet<i64>,
    pub relations: BTreeSet<i64>,
}

impl ExternalRefs {
    pub fn insert(&mut self, kind: OsmType, id: i64) {
        match kind {
            OsmType::Node => self.nodes.insert(id),
            OsmType::Way => self.ways.insert(id),
            OsmType::Relation => self.relations.insert(id),
        };
    }

    pub fn contains(&self, kind: OsmType, id: i64) -> bool {
        match kind {
            OsmType::Node => self.nodes.contains(&id),
            OsmType::Way => self.ways.contains(&id),
            OsmType::Relation => self.relations.contains(&id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.relations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    /// Non-empty partitions, in node/way/relation order
    pub fn partitions(&self) -> impl Iterator<Item = (OsmType, &BTreeSet<i64>)> {
        [
            (OsmType::Node, &self.nodes),
            (OsmType::Way, &self.ways),
            (OsmType::Relation, &self.relations),
        ]
        .into_iter()
        .filter(|(_, ids)| !ids.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamp() {
        assert_eq!(Page::new(0, 0).limit, 10);
        assert_eq!(Page::new(-4, 0).limit, 10);
        assert_eq!(Page::new(500, 0).limit, 50);
        assert_eq!(Page::new(7, 0).limit, 7);
        assert_eq!(Page::new(10, -5).offset, 0);
        assert_eq!(Page::new(10, 20).offset, 20);
    }

    #[test]
    fn test_geometry_request_from_flags() {
        assert_eq!(GeometryRequest::from_flags(false, 0.5), GeometryRequest::None);
        assert_eq!(GeometryRequest::from_flags(true, 0.0), GeometryRequest::Full);
        assert_eq!(GeometryRequest::from_flags(true, -1.0), GeometryRequest::Full);
        assert_eq!(
            GeometryRequest::from_flags(true, 0.01),
            GeometryRequest::Simplified(0.01)
        );
    }

    #[test]
    fn test_external_refs_partitions() {
        let mut refs = ExternalRefs::default();
        refs.insert(OsmType::Relation, 3);
        refs.insert(OsmType::Node, 1);
        refs.insert(OsmType::Node, 1);
        let parts: Vec<OsmType> = refs.partitions().map(|(k, _)| k).collect();
        assert_eq!(parts, vec![OsmType::Node, OsmType::Relation]);
        assert_eq!(refs.len(), 2);
    }
}
