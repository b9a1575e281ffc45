//! Compact XML output, written directly into a `String`.

use std::collections::BTreeMap;

use url::form_urlencoded;

use super::{EncodeOptions, ResultSet, NO_MATCH_MESSAGE};
use crate::models::Place;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Inbound parameters carried over into the continuation URL
pub const MORE_URL_PARAMS: &[&str] = &[
    "q",
    "amenity",
    "street",
    "city",
    "county",
    "state",
    "country",
    "postalcode",
    "countrycodes",
    "viewbox",
    "bounded",
    "featureType",
    "layer",
    "addressdetails",
    "extratags",
    "namedetails",
    "entrances",
    "polygon_geojson",
    "polygon_kml",
    "polygon_svg",
    "polygon_text",
    "polygon_threshold",
    "limit",
    "offset",
    "dedupe",
    "accept-language",
];

/// Escape text for use inside a double-quoted attribute or element body
pub fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}

/// Continuation URL for the next page of a search.
///
/// Keys are sorted, values within a key keep request order, empty values
/// are dropped. `exclude_place_ids` and `format` are always overwritten.
pub fn build_more_url(request_query: &[(String, String)], exclude_place_ids: &str) -> String {
    let mut kept: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (key, value) in request_query {
        if value.is_empty() || !MORE_URL_PARAMS.contains(&key.as_str()) {
            continue;
        }
        kept.entry(key.as_str()).or_default().push(value.as_str());
    }
    kept.insert("exclude_place_ids", vec![exclude_place_ids]);
    kept.insert("format", vec!["xml"]);

    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, values) in &kept {
        for value in values {
            query.append_pair(key, value);
        }
    }
    format!("/search?{}", query.finish())
}

fn write_place(out: &mut String, element: &str, place: &Place) {
    out.push_str(&format!(
        "<{element} place_id=\"{}\" osm_type=\"{}\" osm_id=\"{}\" display_name=\"{}\" class=\"{}\" type=\"{}\" importance=\"{}\" lat=\"{}\" lon=\"{}\"",
        place.place_id,
        place.osm_type,
        place.osm_id,
        escape_attr(&place.display_name),
        escape_attr(&place.category),
        escape_attr(&place.subtype),
        place.importance,
        place.centroid.lat,
        place.centroid.lon,
    ));
    if !place.bbox.is_zero() {
        let b = &place.bbox;
        out.push_str(&format!(
            " boundingbox=\"{},{},{},{}\"",
            b.south, b.north, b.west, b.east
        ));
    }
    out.push_str("/>\n");
}

fn write_searchresults(out: &mut String, places: &[Place], opts: &EncodeOptions, continuation: bool) {
    out.push_str("<searchresults");
    if !opts.licence.is_empty() {
        out.push_str(&format!(" attribution=\"{}\"", escape_attr(&opts.licence)));
    }
    if continuation && !places.is_empty() {
        let ids = places
            .iter()
            .map(|p| p.place_id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let more_url = build_more_url(&opts.request_query, &ids);
        out.push_str(&format!(
            " exclude_place_ids=\"{}\" more_url=\"{}\"",
            escape_attr(&ids),
            escape_attr(&more_url)
        ));
    }
    out.push_str(">\n");
    for place in places {
        out.push_str("  ");
        write_place(out, "place", place);
    }
    out.push_str("</searchresults>\n");
}

pub fn encode_xml(results: &ResultSet<'_>, opts: &EncodeOptions) -> String {
    let mut out = String::from(XML_DECLARATION);
    match results {
        ResultSet::Search(places) => write_searchresults(&mut out, places, opts, true),
        ResultSet::Lookup(places) => write_searchresults(&mut out, places, opts, false),
        ResultSet::Reverse(place) => {
            out.push_str("<reversegeocode");
            if !opts.licence.is_empty() {
                out.push_str(&format!(" attribution=\"{}\"", escape_attr(&opts.licence)));
            }
            out.push_str(">\n  ");
            match place {
                Some(place) => write_place(&mut out, "result", place),
                None => out.push_str(&format!("<error>{NO_MATCH_MESSAGE}</error>\n")),
            }
            out.push_str("</reversegeocode>\n");
        }
    }
    out
}
