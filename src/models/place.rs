//! Place records as returned by the place store and as served to clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of OSM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl OsmType {
    /// Parse the single-letter form used in lookup ids and store rows ("N", "w", ...).
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'N' => Some(OsmType::Node),
            'W' => Some(OsmType::Way),
            'R' => Some(OsmType::Relation),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            OsmType::Node => 'N',
            OsmType::Way => 'W',
            OsmType::Relation => 'R',
        }
    }
}

impl std::fmt::Display for OsmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsmType::Node => write!(f, "node"),
            OsmType::Way => write!(f, "way"),
            OsmType::Relation => write!(f, "relation"),
        }
    }
}

/// Reference to the OSM object a place was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OsmRef {
    pub kind: OsmType,
    pub id: i64,
}

impl OsmRef {
    pub fn new(kind: OsmType, id: i64) -> Self {
        Self { kind, id }
    }
}

impl std::fmt::Display for OsmRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.letter(), self.id)
    }
}

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Planar distance in degrees. The store ranks neighbours the same way.
    pub fn planar_distance(&self, other: &GeoPoint) -> f64 {
        let dx = self.lon - other.lon;
        let dy = self.lat - other.lat;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Bounding box in degrees. All zero means the store had no box for the place.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.south == 0.0 && self.north == 0.0 && self.west == 0.0 && self.east == 0.0
    }

    /// True when the box can be used as a spatial filter: properly ordered and
    /// not the all-zero placeholder.
    pub fn is_usable_filter(&self) -> bool {
        !self.is_zero() && self.west < self.east && self.south < self.north
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }
}

/// One level of the containing address hierarchy (country, state, city, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRow {
    #[serde(rename = "type")]
    pub component: String,
    pub name: String,
    /// 0 when the level has no admin_level tag
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub admin_level: u32,
    pub rank: u32,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// A place as returned by the place store, before any locale handling.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceMatch {
    pub place_id: i64,
    pub osm: OsmRef,
    /// OSM class, never empty
    pub category: String,
    /// OSM type, may be empty
    pub subtype: String,
    /// Fallback display name when no name variant matches
    pub base_name: String,
    /// Name tags keyed as in OSM: "name", "name:fr", "int_name", ...
    pub name_variants: BTreeMap<String, String>,
    pub centroid: GeoPoint,
    pub bbox: BoundingBox,
    pub importance: f64,
    pub extra_tags: BTreeMap<String, String>,
    pub address_rows: Vec<AddressRow>,
    /// Raw GeoJSON geometry text, empty when not requested or not available
    pub polygon_geojson: String,
}

impl PlaceMatch {
    /// Create a match with the fields every store row carries
    pub fn new(place_id: i64, osm: OsmRef, category: &str, subtype: &str, centroid: GeoPoint) -> Self {
        Self {
            place_id,
            osm,
            category: category.to_string(),
            subtype: subtype.to_string(),
            base_name: String::new(),
            name_variants: BTreeMap::new(),
            centroid,
            bbox: BoundingBox::default(),
            importance: 0.0,
            extra_tags: BTreeMap::new(),
            address_rows: Vec::new(),
            polygon_geojson: String::new(),
        }
    }

    /// Add a name variant; the generic "name" key also becomes the base name
    pub fn add_name(&mut self, key: &str, name: &str) {
        if key == "name" {
            self.base_name = name.to_string();
        }
        self.name_variants.insert(key.to_string(), name.to_string());
    }
}

/// Place as served to clients, after display-name resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub licence: String,
    pub place_id: i64,
    pub osm_type: OsmType,
    pub osm_id: i64,
    pub category: String,
    #[serde(rename = "type")]
    pub subtype: String,
    pub display_name: String,
    pub importance: f64,
    pub centroid: GeoPoint,
    #[serde(rename = "boundingbox")]
    pub bbox: BoundingBox,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub address_rows: Vec<AddressRow>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub polygon_geojson: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extratags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub namedetails: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osm_type_letters() {
        assert_eq!(OsmType::from_letter('n'), Some(OsmType::Node));
        assert_eq!(OsmType::from_letter('W'), Some(OsmType::Way));
        assert_eq!(OsmType::from_letter('r'), Some(OsmType::Relation));
        assert_eq!(OsmType::from_letter('x'), None);
        assert_eq!(OsmRef::new(OsmType::Way, 42).to_string(), "W42");
    }

    #[test]
    fn test_bbox_filter_conditions() {
        assert!(BoundingBox::new(0.0, 1.0, 0.0, 1.0).is_usable_filter());
        assert!(!BoundingBox::default().is_usable_filter());
        // west == east
        assert!(!BoundingBox::new(0.0, 1.0, 5.0, 5.0).is_usable_filter());
        // south > north
        assert!(!BoundingBox::new(2.0, 1.0, 0.0, 1.0).is_usable_filter());
    }

    #[test]
    fn test_bbox_overlap() {
        let viewbox = BoundingBox::new(10.1, 10.9, 10.5, 12.0);
        assert!(viewbox.intersects(&BoundingBox::new(9.0, 11.0, 9.0, 11.0)));
        // Touching edges count as overlap
        assert!(viewbox.intersects(&BoundingBox::new(10.9, 10.9, 12.0, 12.0)));
        assert!(!viewbox.intersects(&BoundingBox::new(10.0, 10.0, 10.0, 10.0)));
    }

    #[test]
    fn test_address_row_serialization() {
        let row = AddressRow {
            component: "city".to_string(),
            name: "Bern".to_string(),
            admin_level: 0,
            rank: 16,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "city");
        assert!(json.get("admin_level").is_none());
    }
}
