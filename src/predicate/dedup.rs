//! Near-duplicate collapsing.
//!
//! Matches sharing class, type and a snapped centroid are treated as the same
//! feature; only the most important one survives.

use crate::models::PlaceMatch;

/// Grid size in degrees used to snap centroids (roughly 50 m at the equator)
pub const DEDUP_GRID: f64 = 0.0005;

/// Stable group key for dedup: `(class, type, snapped centroid)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub category: String,
    pub subtype: String,
    pub cell_x: i64,
    pub cell_y: i64,
}

fn snap(v: f64) -> i64 {
    (v / DEDUP_GRID).round() as i64
}

pub fn dedup_key(m: &PlaceMatch) -> DedupKey {
    DedupKey {
        category: m.category.clone(),
        subtype: m.subtype.clone(),
        cell_x: snap(m.centroid.lon),
        cell_y: snap(m.centroid.lat),
    }
}

/// Keep the best member of each dedup group.
///
/// Sorts by `(key, importance desc, place_id desc)` and keeps the first of
/// each run, so the output is grouped by key and the function is idempotent.
/// Callers re-apply their result ordering afterwards.
pub fn dedupe(matches: Vec<PlaceMatch>) -> Vec<PlaceMatch> {
    let mut keyed: Vec<(DedupKey, PlaceMatch)> =
        matches.into_iter().map(|m| (dedup_key(&m), m)).collect();

    keyed.sort_by(|(ka, a), (kb, b)| {
        ka.cmp(kb)
            .then_with(|| b.importance.total_cmp(&a.importance))
            .then_with(|| b.place_id.cmp(&a.place_id))
    });

    let mut out: Vec<PlaceMatch> = Vec::with_capacity(keyed.len());
    let mut last: Option<DedupKey> = None;
    for (key, m) in keyed {
        if last.as_ref() == Some(&key) {
            continue;
        }
        last = Some(key);
        out.push(m);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, OsmRef, OsmType};

    fn city(id: i64, importance: f64, lat: f64, lon: f64) -> PlaceMatch {
        let mut p = PlaceMatch::new(
            id,
            OsmRef::new(OsmType::Node, id),
            "place",
            "city",
            GeoPoint::new(lat, lon),
        );
        p.importance = importance;
        p
    }

    #[test]
    fn test_same_cell_collapses_to_most_important() {
        let out = dedupe(vec![
            city(1, 0.3, 39.78, -89.65),
            city(2, 0.6, 39.78001, -89.65001),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].place_id, 2);
    }

    #[test]
    fn test_importance_tie_keeps_highest_place_id() {
        let out = dedupe(vec![city(5, 0.3, 1.0, 1.0), city(9, 0.3, 1.0, 1.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].place_id, 9);
    }

    #[test]
    fn test_different_type_or_cell_kept() {
        let mut town = city(3, 0.1, 1.0, 1.0);
        town.subtype = "town".to_string();
        let out = dedupe(vec![city(1, 0.5, 1.0, 1.0), town, city(2, 0.5, 2.0, 2.0)]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_idempotent() {
        let once = dedupe(vec![
            city(1, 0.3, 1.0, 1.0),
            city(2, 0.9, 1.0, 1.0),
            city(3, 0.2, 5.0, 5.0),
        ]);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }
}
