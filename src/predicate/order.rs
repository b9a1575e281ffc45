//! Deterministic result ordering shared by all store adapters.

use std::cmp::Ordering;

use super::SortOrder;
use crate::models::PlaceMatch;

fn importance_desc(a: &PlaceMatch, b: &PlaceMatch) -> Ordering {
    b.importance.total_cmp(&a.importance)
}

fn place_id_desc(a: &PlaceMatch, b: &PlaceMatch) -> Ordering {
    b.place_id.cmp(&a.place_id)
}

/// Compare two matches under the given ordering
pub fn compare_matches(a: &PlaceMatch, b: &PlaceMatch, order: &SortOrder) -> Ordering {
    match order {
        SortOrder::Importance => importance_desc(a, b).then_with(|| place_id_desc(a, b)),
        SortOrder::ViewboxProximity(center) => importance_desc(a, b)
            .then_with(|| {
                a.centroid
                    .planar_distance(center)
                    .total_cmp(&b.centroid.planar_distance(center))
            })
            .then_with(|| place_id_desc(a, b)),
        SortOrder::Distance(anchor) => a
            .centroid
            .planar_distance(anchor)
            .total_cmp(&b.centroid.planar_distance(anchor))
            .then_with(|| place_id_desc(a, b)),
    }
}

pub fn sort_matches(matches: &mut [PlaceMatch], order: &SortOrder) {
    matches.sort_by(|a, b| compare_matches(a, b, order));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, OsmRef, OsmType};

    fn place(id: i64, importance: f64, lat: f64, lon: f64) -> PlaceMatch {
        let mut p = PlaceMatch::new(
            id,
            OsmRef::new(OsmType::Node, id),
            "place",
            "town",
            GeoPoint::new(lat, lon),
        );
        p.importance = importance;
        p
    }

    fn ids(matches: &[PlaceMatch]) -> Vec<i64> {
        matches.iter().map(|m| m.place_id).collect()
    }

    #[test]
    fn test_importance_then_place_id() {
        let mut v = vec![place(1, 0.5, 0.0, 0.0), place(3, 0.5, 0.0, 0.0), place(2, 0.9, 0.0, 0.0)];
        sort_matches(&mut v, &SortOrder::Importance);
        assert_eq!(ids(&v), vec![2, 3, 1]);
    }

    #[test]
    fn test_viewbox_proximity_breaks_importance_ties() {
        let center = GeoPoint::new(10.0, 10.0);
        let mut v = vec![
            place(1, 0.5, 0.0, 0.0),
            place(2, 0.5, 10.0, 10.1),
            place(3, 0.7, 50.0, 50.0),
        ];
        sort_matches(&mut v, &SortOrder::ViewboxProximity(center));
        assert_eq!(ids(&v), vec![3, 2, 1]);
    }

    #[test]
    fn test_distance_ignores_importance() {
        let anchor = GeoPoint::new(0.0, 0.0);
        let mut v = vec![place(1, 0.9, 1.0, 1.0), place(2, 0.1, 0.1, 0.1)];
        sort_matches(&mut v, &SortOrder::Distance(anchor));
        assert_eq!(ids(&v), vec![2, 1]);
    }
}
