//! GeoJSON geometry handling for the store adapters.
//!
//! Stores keep geometry as GeoJSON objects; these helpers move between that
//! form and `geo` types so a simplified outline can be produced on request.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon, Simplify};
use serde_json::{json, Value};

use crate::predicate::GeometryRequest;

/// Decimal places kept when writing coordinates
const COORD_PRECISION: f64 = 1e6;

fn round_coord(v: f64) -> f64 {
    (v * COORD_PRECISION).round() / COORD_PRECISION
}

fn parse_position(value: &Value) -> Option<Coord<f64>> {
    let pair = value.as_array()?;
    let x = pair.first()?.as_f64()?;
    let y = pair.get(1)?.as_f64()?;
    Some(Coord { x, y })
}

fn parse_line(value: &Value) -> Option<LineString<f64>> {
    let coords = value
        .as_array()?
        .iter()
        .map(parse_position)
        .collect::<Option<Vec<_>>>()?;
    Some(LineString::new(coords))
}

fn parse_polygon(value: &Value) -> Option<Polygon<f64>> {
    let mut rings = value
        .as_array()?
        .iter()
        .map(parse_line)
        .collect::<Option<Vec<_>>>()?
        .into_iter();
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

/// Parse a GeoJSON geometry (or Feature wrapping one) into a `geo` geometry
pub fn geometry_from_geojson(value: &Value) -> Option<Geometry<f64>> {
    let kind = value.get("type")?.as_str()?;
    if kind == "Feature" {
        return geometry_from_geojson(value.get("geometry")?);
    }

    let coords = value.get("coordinates")?;
    match kind {
        "Point" => parse_position(coords).map(|c| Geometry::Point(Point::from(c))),
        "LineString" => parse_line(coords).map(Geometry::LineString),
        "MultiLineString" => coords
            .as_array()?
            .iter()
            .map(parse_line)
            .collect::<Option<Vec<_>>>()
            .map(|lines| Geometry::MultiLineString(MultiLineString::new(lines))),
        "Polygon" => parse_polygon(coords).map(Geometry::Polygon),
        "MultiPolygon" => coords
            .as_array()?
            .iter()
            .map(parse_polygon)
            .collect::<Option<Vec<_>>>()
            .map(|polys| Geometry::MultiPolygon(MultiPolygon::new(polys))),
        _ => None,
    }
}

fn position_json(c: &Coord<f64>) -> Value {
    json!([round_coord(c.x), round_coord(c.y)])
}

fn line_json(line: &LineString<f64>) -> Value {
    Value::Array(line.coords().map(position_json).collect())
}

fn polygon_json(poly: &Polygon<f64>) -> Value {
    let mut rings = vec![line_json(poly.exterior())];
    rings.extend(poly.interiors().iter().map(line_json));
    Value::Array(rings)
}

/// Write a `geo` geometry as a GeoJSON geometry object.
///
/// Returns `None` for geometry kinds the API never serves.
pub fn geometry_to_geojson(geom: &Geometry<f64>) -> Option<Value> {
    let value = match geom {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": position_json(&p.0)}),
        Geometry::LineString(l) => json!({"type": "LineString", "coordinates": line_json(l)}),
        Geometry::MultiLineString(ml) => json!({
            "type": "MultiLineString",
            "coordinates": ml.0.iter().map(line_json).collect::<Vec<_>>()
        }),
        Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": polygon_json(p)}),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.0.iter().map(polygon_json).collect::<Vec<_>>()
        }),
        _ => return None,
    };
    Some(value)
}

/// Ramer-Douglas-Peucker simplification; points pass through unchanged
pub fn simplify_geometry(geom: Geometry<f64>, epsilon: f64) -> Geometry<f64> {
    match geom {
        Geometry::LineString(l) => Geometry::LineString(l.simplify(epsilon)),
        Geometry::MultiLineString(ml) => Geometry::MultiLineString(ml.simplify(epsilon)),
        Geometry::Polygon(p) => Geometry::Polygon(p.simplify(epsilon)),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp.simplify(epsilon)),
        other => other,
    }
}

/// Produce the `polygon_geojson` text a store returns for a stored geometry.
///
/// Empty when no geometry was requested or the stored value is unusable.
pub fn render_geometry(stored: Option<&Value>, request: GeometryRequest) -> String {
    let Some(stored) = stored else {
        return String::new();
    };

    let geom = match request {
        GeometryRequest::None => return String::new(),
        GeometryRequest::Full => geometry_from_geojson(stored),
        GeometryRequest::Simplified(eps) => {
            geometry_from_geojson(stored).map(|g| simplify_geometry(g, eps))
        }
    };

    geom.as_ref()
        .and_then(geometry_to_geojson)
        .map(|v| v.to_string())
        .unwrap_or_default()
}
