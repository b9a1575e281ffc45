//! Request parameters as handed over by the transport layer.
//!
//! Values are taken as-is; clamping and validation happen in the builders.

use crate::models::BoundingBox;

/// Client viewbox: `left,top,right,bottom` in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewbox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Viewbox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn to_bbox(&self) -> BoundingBox {
        BoundingBox::new(self.bottom, self.top, self.left, self.right)
    }
}

/// Options controlling how much of each place is returned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailOptions {
    pub address_details: bool,
    pub extra_tags: bool,
    pub name_details: bool,
    pub polygon_geojson: bool,
    pub polygon_threshold: f64,
    /// Accept-Language style preference string
    pub accept_language: String,
}

/// Forward search parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub query: String,
    /// Comma separated ISO country codes
    pub country_codes: String,
    pub limit: i64,
    pub offset: i64,
    /// Either `class:type`, a settlement keyword, or a bare class/type value
    pub feature_type: String,
    pub layers: Vec<String>,
    pub dedupe: bool,
    pub bounded: bool,
    pub viewbox: Option<Viewbox>,
    pub exclude_place_ids: Vec<i64>,
    pub details: DetailOptions,
}

/// Reverse geocoding parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReverseParams {
    pub lat: f64,
    pub lon: f64,
    /// Defaults to 18 (most detailed) when absent
    pub zoom: Option<i32>,
    pub layers: Vec<String>,
    pub details: DetailOptions,
}

/// OSM id lookup parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupParams {
    /// Tokens such as `N123`, `w456`, `R789`
    pub osm_ids: Vec<String>,
    pub details: DetailOptions,
}
