//! Result encoding: canonical [`Place`] lists to wire bodies.

mod geocodejson;
mod geojson;
mod polygon;
mod xml;

pub use geocodejson::encode_geocodejson;
pub use geojson::encode_geojson;
pub use polygon::{attach_exports, first_outer_ring, polygon_kml, polygon_svg, polygon_text};
pub use xml::{build_more_url, encode_xml, escape_attr, MORE_URL_PARAMS};

use serde_json::{json, Value};

use crate::models::Place;

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_JSONP: &str = "application/javascript; charset=utf-8";
pub const CONTENT_TYPE_XML: &str = "application/xml; charset=utf-8";

/// Body returned by reverse lookups with no match
pub const NO_MATCH_MESSAGE: &str = "Unable to geocode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `json`, `jsonv2` and anything unrecognised
    #[default]
    Default,
    GeoJson,
    GeocodeJson,
    Xml,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "geojson" => OutputFormat::GeoJson,
            "geocodejson" => OutputFormat::GeocodeJson,
            "xml" => OutputFormat::Xml,
            _ => OutputFormat::Default,
        }
    }
}

/// Which derived polygon representations to attach to features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolygonExports {
    pub text: bool,
    pub svg: bool,
    pub kml: bool,
}

impl PolygonExports {
    pub fn any(&self) -> bool {
        self.text || self.svg || self.kml
    }
}

/// Per-request encoding settings
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub format: OutputFormat,
    pub exports: PolygonExports,
    pub json_callback: Option<String>,
    pub licence: String,
    /// Decoded inbound query pairs, in request order. Used for `more_url`.
    pub request_query: Vec<(String, String)>,
}

/// The result of one endpoint, before encoding
#[derive(Debug, Clone, Copy)]
pub enum ResultSet<'a> {
    Search(&'a [Place]),
    Lookup(&'a [Place]),
    Reverse(Option<&'a Place>),
}

impl<'a> ResultSet<'a> {
    pub fn places(&self) -> &'a [Place] {
        match *self {
            ResultSet::Search(places) | ResultSet::Lookup(places) => places,
            ResultSet::Reverse(Some(place)) => std::slice::from_ref(place),
            ResultSet::Reverse(None) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub content_type: &'static str,
    pub body: String,
}

/// JSONP callback names are restricted to identifier-ish characters
pub fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
}

/// Wrap a JSON body in `callback(...)` when a usable callback was given
fn finish_json(body: Value, callback: Option<&str>) -> Encoded {
    match callback.filter(|cb| is_valid_callback(cb)) {
        Some(cb) => Encoded {
            content_type: CONTENT_TYPE_JSONP,
            body: format!("{cb}({body})"),
        },
        None => Encoded {
            content_type: CONTENT_TYPE_JSON,
            body: body.to_string(),
        },
    }
}

fn encode_default(results: &ResultSet<'_>) -> serde_json::Result<Value> {
    match results {
        ResultSet::Search(places) | ResultSet::Lookup(places) => serde_json::to_value(places),
        ResultSet::Reverse(Some(place)) => serde_json::to_value(place),
        ResultSet::Reverse(None) => Ok(json!({ "error": NO_MATCH_MESSAGE })),
    }
}

const GEOJSON_GEOMETRY_TYPES: &[&str] = &[
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

fn is_geojson_geometry(value: &Value) -> bool {
    value
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| GEOJSON_GEOMETRY_TYPES.contains(&t))
}

/// A GeoJSON geometry object from stored text; Feature wrappers are unwrapped
fn parse_geojson_geometry(raw: &str) -> Option<Value> {
    let mut parsed: Value = serde_json::from_str(raw).ok()?;
    if parsed.get("type").and_then(Value::as_str) == Some("Feature") {
        parsed = parsed.get_mut("geometry")?.take();
    }
    is_geojson_geometry(&parsed).then_some(parsed)
}

/// Geometry for a feature: the stored GeoJSON geometry when it is one, else the centroid
pub(crate) fn feature_geometry(place: &Place) -> Value {
    if !place.polygon_geojson.is_empty() {
        if let Some(geometry) = parse_geojson_geometry(&place.polygon_geojson) {
            return geometry;
        }
    }
    json!({
        "type": "Point",
        "coordinates": [place.centroid.lon, place.centroid.lat]
    })
}

/// Encode a result set in the requested format
pub fn encode(results: &ResultSet<'_>, opts: &EncodeOptions) -> serde_json::Result<Encoded> {
    let callback = opts.json_callback.as_deref();
    let encoded = match opts.format {
        OutputFormat::Default => finish_json(encode_default(results)?, callback),
        OutputFormat::GeoJson => finish_json(encode_geojson(results.places(), opts)?, callback),
        OutputFormat::GeocodeJson => {
            finish_json(encode_geocodejson(results.places(), opts)?, callback)
        }
        OutputFormat::Xml => Encoded {
            content_type: CONTENT_TYPE_XML,
            body: encode_xml(results, opts),
        },
    };
    Ok(encoded)
}
