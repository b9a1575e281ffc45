//! Translation of [`QuerySpec`] values into Elasticsearch query bodies, and
//! of search hits back into [`PlaceMatch`] records.
//!
//! Expected `placex` document:
//! `{place_id, osm_type: "N"|"W"|"R", osm_id, class, type, name: {name, name:de, ...},
//!   centroid: geo_point, bbox: [s, n, w, e], extent: geo_shape envelope of bbox,
//!   importance, rank_address, country_code, extratags: {...}, geometry: GeoJSON}`
//!
//! `extent` is absent for places without a bbox.
//!
//! Expected `place_addressline` document:
//! `{place_id, addresstype, address, admin_level, cached_rank_address}`

use serde_json::{json, Value};

use crate::geometry::render_geometry;
use crate::models::{AddressRow, BoundingBox, GeoPoint, OsmRef, OsmType, PlaceMatch};
use crate::predicate::{ExternalRefs, FeatureFilter, GeometryRequest, QuerySpec, SortOrder};

/// Hits fetched per requested row when dedup has to run client side
const DEDUPE_OVERFETCH: usize = 5;
/// Upper bound on the dedup window
const DEDUPE_WINDOW_MAX: usize = 1000;
/// placex rows fetched per requested OSM object; one object can yield several rows
const LOOKUP_ROWS_PER_REF: usize = 4;
/// Upper bound on rows returned by a lookup
const LOOKUP_ROWS_MAX: usize = 1000;
/// Upper bound on address rows per place
const ADDRESS_ROWS_MAX: usize = 100;

/// Escape the wildcard metacharacters of a user term
fn escape_wildcard(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '*' | '?' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn filter_clauses(spec: &QuerySpec) -> Vec<Value> {
    let mut filters = Vec::new();

    match spec.text.as_deref() {
        Some("") => filters.push(json!({ "exists": { "field": "name.name" } })),
        Some(text) => filters.push(json!({
            "wildcard": {
                "name.name": {
                    "value": format!("*{}*", escape_wildcard(text)),
                    "case_insensitive": true
                }
            }
        })),
        None => {}
    }

    if !spec.country_codes.is_empty() {
        filters.push(json!({ "terms": { "country_code": spec.country_codes } }));
    }

    // Extent overlaps the box; places without an extent fall back to their centroid
    if let Some(b) = &spec.bounds {
        filters.push(json!({
            "bool": {
                "should": [
                    {
                        "geo_shape": {
                            "extent": {
                                "shape": {
                                    "type": "envelope",
                                    "coordinates": [[b.west, b.north], [b.east, b.south]]
                                },
                                "relation": "intersects"
                            }
                        }
                    },
                    {
                        "bool": {
                            "must_not": [{ "exists": { "field": "extent" } }],
                            "filter": [{
                                "geo_bounding_box": {
                                    "centroid": {
                                        "top_left": { "lat": b.north, "lon": b.west },
                                        "bottom_right": { "lat": b.south, "lon": b.east }
                                    }
                                }
                            }]
                        }
                    }
                ],
                "minimum_should_match": 1
            }
        }));
    }

    match &spec.feature {
        Some(FeatureFilter::ClassType { category, subtype }) => {
            filters.push(json!({ "term": { "class": category } }));
            filters.push(json!({ "term": { "type": subtype } }));
        }
        Some(FeatureFilter::Rank(range)) => {
            filters.push(json!({
                "range": { "rank_address": { "gte": range.min, "lte": range.max } }
            }));
        }
        Some(FeatureFilter::ClassOrType(value)) => {
            filters.push(json!({
                "bool": {
                    "should": [
                        { "term": { "class": value } },
                        { "term": { "type": value } }
                    ],
                    "minimum_should_match": 1
                }
            }));
        }
        None => {}
    }

    if !spec.categories.is_empty() {
        filters.push(json!({ "terms": { "class": spec.categories } }));
    }

    if let Some(max_rank) = spec.max_rank {
        filters.push(json!({ "range": { "rank_address": { "lte": max_rank } } }));
    }

    filters
}

fn bool_query(spec: &QuerySpec) -> Value {
    let mut query = json!({ "filter": filter_clauses(spec) });
    if !spec.exclude_place_ids.is_empty() {
        query["must_not"] = json!([{ "terms": { "place_id": spec.exclude_place_ids } }]);
    }
    json!({ "bool": query })
}

fn geo_distance_sort(p: &GeoPoint) -> Value {
    json!({
        "_geo_distance": {
            "centroid": { "lat": p.lat, "lon": p.lon },
            "order": "asc",
            "unit": "m",
            "distance_type": "plane"
        }
    })
}

fn sort_clauses(order: &SortOrder) -> Value {
    let importance = json!({ "importance": { "order": "desc", "missing": 0 } });
    let place_id = json!({ "place_id": { "order": "desc" } });
    match order {
        SortOrder::Importance => json!([importance, place_id]),
        SortOrder::ViewboxProximity(center) => {
            json!([importance, geo_distance_sort(center), place_id])
        }
        SortOrder::Distance(anchor) => json!([geo_distance_sort(anchor), place_id]),
    }
}

fn source_filter(geometry: GeometryRequest) -> Value {
    if geometry.wants_geometry() {
        json!(true)
    } else {
        json!({ "excludes": ["geometry"] })
    }
}

/// Body for `find_matches`.
///
/// With dedup enabled the store fetches a wider window from the top and
/// collapses, orders and pages it in process.
pub fn search_body(spec: &QuerySpec) -> Value {
    let (from, size) = if spec.dedupe {
        let window = spec
            .page
            .offset
            .saturating_add(spec.page.limit)
            .saturating_mul(DEDUPE_OVERFETCH);
        (0, window.min(DEDUPE_WINDOW_MAX))
    } else {
        (spec.page.offset, spec.page.limit)
    };

    json!({
        "query": bool_query(spec),
        "sort": sort_clauses(&spec.order),
        "from": from,
        "size": size,
        "_source": source_filter(spec.geometry),
        "track_total_hits": false
    })
}

/// Body for `find_nearest`: filters from the spec, nearest centroid first
pub fn nearest_body(lat: f64, lon: f64, spec: &QuerySpec) -> Value {
    json!({
        "query": bool_query(spec),
        "sort": sort_clauses(&SortOrder::Distance(GeoPoint::new(lat, lon))),
        "size": 1,
        "_source": source_filter(spec.geometry),
        "track_total_hits": false
    })
}

/// Body for `find_by_external_refs`: one clause per non-empty osm type partition
pub fn external_refs_body(refs: &ExternalRefs, geometry: GeometryRequest) -> Value {
    let partitions: Vec<Value> = refs
        .partitions()
        .map(|(kind, ids)| {
            json!({
                "bool": {
                    "filter": [
                        { "term": { "osm_type": kind.letter().to_string() } },
                        { "terms": { "osm_id": ids } }
                    ]
                }
            })
        })
        .collect();

    json!({
        "query": { "bool": { "should": partitions, "minimum_should_match": 1 } },
        "sort": sort_clauses(&SortOrder::Importance),
        "size": refs.len().saturating_mul(LOOKUP_ROWS_PER_REF).min(LOOKUP_ROWS_MAX),
        "_source": source_filter(geometry),
        "track_total_hits": false
    })
}

pub fn address_rows_body(place_id: i64) -> Value {
    json!({
        "query": { "term": { "place_id": place_id } },
        "sort": [{ "cached_rank_address": { "order": "asc" } }],
        "size": ADDRESS_ROWS_MAX,
        "track_total_hits": false
    })
}

fn string_map(value: &Value) -> impl Iterator<Item = (&String, &str)> {
    value
        .as_object()
        .into_iter()
        .flatten()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s)))
}

fn parse_osm_type(value: &Value) -> Option<OsmType> {
    let raw = value.as_str()?;
    match raw.to_ascii_lowercase().as_str() {
        "node" => Some(OsmType::Node),
        "way" => Some(OsmType::Way),
        "relation" => Some(OsmType::Relation),
        _ => OsmType::from_letter(raw.chars().next()?),
    }
}

/// Centroid as stored: `{lat, lon}`, `[lon, lat]` or `"lat,lon"`
fn parse_centroid(value: &Value) -> Option<GeoPoint> {
    match value {
        Value::Object(_) => Some(GeoPoint::new(
            value.get("lat")?.as_f64()?,
            value.get("lon")?.as_f64()?,
        )),
        Value::Array(pair) => Some(GeoPoint::new(pair.get(1)?.as_f64()?, pair.first()?.as_f64()?)),
        Value::String(s) => {
            let (lat, lon) = s.split_once(',')?;
            Some(GeoPoint::new(
                lat.trim().parse().ok()?,
                lon.trim().parse().ok()?,
            ))
        }
        _ => None,
    }
}

fn parse_bbox(value: &Value) -> BoundingBox {
    let coords: Vec<f64> = value
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default();
    match coords.as_slice() {
        [south, north, west, east] => BoundingBox::new(*south, *north, *west, *east),
        _ => BoundingBox::default(),
    }
}

/// Parse a `placex` hit. Hits missing identity or position are skipped.
pub fn parse_place_hit(hit: &Value, geometry: GeometryRequest) -> Option<PlaceMatch> {
    let source = hit.get("_source")?;

    let place_id = source.get("place_id")?.as_i64()?;
    let kind = parse_osm_type(source.get("osm_type")?)?;
    let osm_id = source.get("osm_id")?.as_i64()?;
    let category = source.get("class")?.as_str()?;
    let subtype = source.get("type").and_then(Value::as_str).unwrap_or("");
    let centroid = parse_centroid(source.get("centroid")?)?;

    let mut m = PlaceMatch::new(place_id, OsmRef::new(kind, osm_id), category, subtype, centroid);
    if let Some(names) = source.get("name") {
        for (key, name) in string_map(names) {
            m.add_name(key, name);
        }
    }
    if let Some(tags) = source.get("extratags") {
        m.extra_tags = string_map(tags)
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
    }
    m.bbox = source.get("bbox").map(parse_bbox).unwrap_or_default();
    m.importance = source
        .get("importance")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .max(0.0);
    m.polygon_geojson = render_geometry(source.get("geometry"), geometry);
    Some(m)
}

pub fn parse_address_hit(hit: &Value) -> Option<AddressRow> {
    let source = hit.get("_source")?;
    let as_u32 = |key: &str| {
        source
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    };

    Some(AddressRow {
        component: source.get("addresstype")?.as_str()?.to_string(),
        name: source.get("address")?.as_str()?.to_string(),
        admin_level: as_u32("admin_level"),
        rank: as_u32("cached_rank_address"),
    })
}
