//! Derived polygon exports (text, SVG path, KML fragment).
//!
//! Only the first ring of the first polygon is exported, for both Polygon
//! and MultiPolygon inputs.

use serde_json::{Map, Value};

use super::PolygonExports;

/// Outer ring of the first polygon as `(lon, lat)` pairs
pub fn first_outer_ring(geojson: &str) -> Option<Vec<(f64, f64)>> {
    let parsed: Value = serde_json::from_str(geojson).ok()?;
    let geom = match parsed.get("type").and_then(Value::as_str) {
        Some("Feature") => parsed.get("geometry")?,
        _ => &parsed,
    };

    let kind = geom.get("type")?.as_str()?.to_ascii_lowercase();
    let coords = geom.get("coordinates")?.as_array()?;
    let ring = match kind.as_str() {
        "polygon" => coords.first()?,
        "multipolygon" => coords.first()?.as_array()?.first()?,
        _ => return None,
    };

    let points: Vec<(f64, f64)> = ring
        .as_array()?
        .iter()
        .filter_map(|pt| {
            let pair = pt.as_array()?;
            Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
        })
        .collect();

    if points.is_empty() {
        None
    } else {
        Some(points)
    }
}

/// `"lon lat"` pairs joined by commas
pub fn polygon_text(ring: &[(f64, f64)]) -> String {
    ring.iter()
        .map(|(lon, lat)| format!("{lon} {lat}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// SVG path data: `M x y L x y ... Z`
pub fn polygon_svg(ring: &[(f64, f64)]) -> String {
    let mut path = String::new();
    for (i, (lon, lat)) in ring.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        path.push_str(&format!("{cmd} {lon} {lat} "));
    }
    path.push('Z');
    path
}

pub fn polygon_kml(ring: &[(f64, f64)]) -> String {
    let coords = ring
        .iter()
        .map(|(lon, lat)| format!("{lon},{lat}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "<Polygon><outerBoundaryIs><LinearRing><coordinates>{coords}</coordinates></LinearRing></outerBoundaryIs></Polygon>"
    )
}

/// Add the requested exports to a feature's properties.
///
/// Nothing is added when the geometry is missing, unparsable, or not polygonal.
pub fn attach_exports(props: &mut Map<String, Value>, polygon_geojson: &str, exports: &PolygonExports) {
    if !exports.any() || polygon_geojson.is_empty() {
        return;
    }
    let Some(ring) = first_outer_ring(polygon_geojson) else {
        return;
    };

    if exports.text {
        props.insert("polygon".to_string(), Value::String(polygon_text(&ring)));
    }
    if exports.svg {
        props.insert("svg".to_string(), Value::String(polygon_svg(&ring)));
    }
    if exports.kml {
        props.insert("kml".to_string(), Value::String(polygon_kml(&ring)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str =
        r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]],[[0.2,0.2],[0.3,0.2],[0.2,0.2]]]}"#;

    #[test]
    fn test_polygon_text_uses_first_ring() {
        let ring = first_outer_ring(SQUARE).unwrap();
        assert_eq!(polygon_text(&ring), "0 0,1 0,1 1,0 0");
    }

    #[test]
    fn test_svg_and_kml() {
        let ring = first_outer_ring(SQUARE).unwrap();
        assert_eq!(polygon_svg(&ring), "M 0 0 L 1 0 L 1 1 L 0 0 Z");
        assert_eq!(
            polygon_kml(&ring),
            "<Polygon><outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1 0,0</coordinates></LinearRing></outerBoundaryIs></Polygon>"
        );
    }

    #[test]
    fn test_multipolygon_and_feature_wrapper() {
        let multi = r#"{"type":"Feature","geometry":{"type":"MultiPolygon","coordinates":[[[[5,5],[6,5],[5,6],[5,5]]],[[[9,9],[9,8],[9,9]]]]}}"#;
        let ring = first_outer_ring(multi).unwrap();
        assert_eq!(ring[0], (5.0, 5.0));
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_non_polygon_produces_nothing() {
        assert!(first_outer_ring(r#"{"type":"Point","coordinates":[1,2]}"#).is_none());
        assert!(first_outer_ring("not json").is_none());
        assert!(first_outer_ring(r#"{"type":"Polygon","coordinates":[]}"#).is_none());

        let mut props = Map::new();
        let all = PolygonExports {
            text: true,
            svg: true,
            kml: true,
        };
        attach_exports(&mut props, r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#, &all);
        assert!(props.is_empty());

        attach_exports(&mut props, SQUARE, &all);
        assert_eq!(props.len(), 3);
    }
}
