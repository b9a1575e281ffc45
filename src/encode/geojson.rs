use serde_json::{json, Map, Value};

use super::{attach_exports, feature_geometry, EncodeOptions};
use crate::models::Place;

fn feature(place: &Place, opts: &EncodeOptions) -> serde_json::Result<Value> {
    let mut props = Map::new();
    props.insert("place_id".into(), json!(place.place_id));
    props.insert("osm_type".into(), json!(place.osm_type));
    props.insert("osm_id".into(), json!(place.osm_id));
    props.insert("category".into(), json!(place.category));
    props.insert("type".into(), json!(place.subtype));
    props.insert("display_name".into(), json!(place.display_name));
    props.insert("importance".into(), json!(place.importance));

    if !place.address_rows.is_empty() {
        props.insert("address".into(), serde_json::to_value(&place.address_rows)?);
    }
    if !place.extratags.is_empty() {
        props.insert("extratags".into(), serde_json::to_value(&place.extratags)?);
    }
    if !place.namedetails.is_empty() {
        props.insert("namedetails".into(), serde_json::to_value(&place.namedetails)?);
    }
    attach_exports(&mut props, &place.polygon_geojson, &opts.exports);

    let mut feature = Map::new();
    feature.insert("type".into(), json!("Feature"));
    feature.insert("properties".into(), Value::Object(props));
    if !place.bbox.is_zero() {
        let b = &place.bbox;
        feature.insert("bbox".into(), json!([b.west, b.south, b.east, b.north]));
    }
    feature.insert("geometry".into(), feature_geometry(place));
    Ok(Value::Object(feature))
}

/// GeoJSON `FeatureCollection`, one feature per place
pub fn encode_geojson(places: &[Place], opts: &EncodeOptions) -> serde_json::Result<Value> {
    let features = places
        .iter()
        .map(|p| feature(p, opts))
        .collect::<serde_json::Result<Vec<_>>>()?;

    Ok(json!({
        "type": "FeatureCollection",
        "licence": opts.licence,
        "features": features,
    }))
}
