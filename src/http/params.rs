//! Lenient query-string parsing.
//!
//! Nothing here rejects a request: unparsable values fall back to their
//! defaults and malformed list entries are dropped.

use axum::http::{header::ACCEPT_LANGUAGE, HeaderMap};
use url::form_urlencoded;

use crate::encode::{EncodeOptions, OutputFormat, PolygonExports};
use crate::predicate::{DetailOptions, LookupParams, ReverseParams, SearchParams, Viewbox};

/// Decoded query pairs in request order
#[derive(Debug, Clone, Default)]
pub struct RawParams {
    pairs: Vec<(String, String)>,
}

impl RawParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// First value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value among several accepted spellings of a key
    fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or("").trim().to_string()
    }

    /// `1`, `true`, `yes` and `on` (any case) are true; anything else is false
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key)?.trim().parse().ok()
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        parse_finite(self.get(key)?)
    }

    /// Comma separated values across all occurrences of a key
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get_all(key)
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `left,top,right,bottom`; anything other than four numbers is ignored
pub fn parse_viewbox(raw: &str) -> Option<Viewbox> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(parse_finite)
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [left, top, right, bottom] => Some(Viewbox::new(*left, *top, *right, *bottom)),
        _ => None,
    }
}

/// Query parameter first, `Accept-Language` header second
pub fn accept_language(raw: &RawParams, headers: &HeaderMap) -> String {
    if let Some(v) = raw.get_any(&["accept-language", "accept_language"]) {
        return v.to_string();
    }
    headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

pub fn detail_options(raw: &RawParams, headers: &HeaderMap) -> DetailOptions {
    DetailOptions {
        address_details: raw.flag("addressdetails"),
        extra_tags: raw.flag("extratags"),
        name_details: raw.flag("namedetails"),
        polygon_geojson: raw.flag("polygon_geojson"),
        polygon_threshold: raw.float("polygon_threshold").unwrap_or(0.0),
        accept_language: accept_language(raw, headers),
    }
}

pub fn search_params(raw: &RawParams, headers: &HeaderMap) -> SearchParams {
    SearchParams {
        query: raw.text("q"),
        country_codes: raw.text("countrycodes"),
        limit: raw.int("limit").unwrap_or(0),
        offset: raw.int("offset").unwrap_or(0),
        feature_type: raw
            .get_any(&["featureType", "featuretype"])
            .unwrap_or("")
            .to_string(),
        layers: raw.list("layer"),
        dedupe: raw.flag("dedupe"),
        bounded: raw.flag("bounded"),
        viewbox: raw.get("viewbox").and_then(parse_viewbox),
        exclude_place_ids: raw
            .list("exclude_place_ids")
            .iter()
            .filter_map(|id| id.parse().ok())
            .collect(),
        details: detail_options(raw, headers),
    }
}

pub fn reverse_params(raw: &RawParams, headers: &HeaderMap) -> ReverseParams {
    ReverseParams {
        lat: raw.float("lat").unwrap_or(0.0),
        lon: raw.float("lon").unwrap_or(0.0),
        zoom: raw
            .int("zoom")
            .map(|z| z.clamp(i32::MIN as i64, i32::MAX as i64) as i32),
        layers: raw.list("layer"),
        details: detail_options(raw, headers),
    }
}

pub fn lookup_params(raw: &RawParams, headers: &HeaderMap) -> LookupParams {
    LookupParams {
        osm_ids: raw.list("osm_ids"),
        details: detail_options(raw, headers),
    }
}

pub fn encode_options(raw: &RawParams, licence: &str) -> EncodeOptions {
    EncodeOptions {
        format: OutputFormat::parse(raw.get("format").unwrap_or("")),
        exports: PolygonExports {
            text: raw.flag("polygon_text"),
            svg: raw.flag("polygon_svg"),
            kml: raw.flag("polygon_kml"),
        },
        json_callback: raw
            .get("json_callback")
            .map(str::trim)
            .filter(|cb| !cb.is_empty())
            .map(str::to_string),
        licence: licence.to_string(),
        request_query: raw.pairs().to_vec(),
    }
}
