use serde_json::{json, Map, Value};

use super::{attach_exports, feature_geometry, EncodeOptions};
use crate::models::Place;

pub const GEOCODEJSON_VERSION: &str = "0.1.0";

fn feature(place: &Place, opts: &EncodeOptions) -> Value {
    let geocoding = json!({
        "place_id": place.place_id,
        "osm_type": place.osm_type,
        "osm_id": place.osm_id,
        "osm_key": place.category,
        "osm_value": place.subtype,
        "type": place.subtype,
        "label": place.display_name,
        "name": place.display_name,
    });

    let mut props = Map::new();
    props.insert("geocoding".into(), geocoding);
    attach_exports(&mut props, &place.polygon_geojson, &opts.exports);

    json!({
        "type": "Feature",
        "properties": props,
        "geometry": feature_geometry(place),
    })
}

/// GeocodeJSON `FeatureCollection`
pub fn encode_geocodejson(places: &[Place], opts: &EncodeOptions) -> serde_json::Result<Value> {
    let features: Vec<Value> = places.iter().map(|p| feature(p, opts)).collect();
    Ok(json!({
        "type": "FeatureCollection",
        "geocoding": {
            "version": GEOCODEJSON_VERSION,
            "licence": opts.licence,
        },
        "features": features,
    }))
}
