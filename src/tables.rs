//! Static lookup tables translating user-facing concepts (zoom, feature type,
//! layer) into the store's rank ranges and class sets.
//!
//! These mirror the class taxonomy of the `placex` table; if the importer's
//! taxonomy changes they have to change with it.

use std::collections::BTreeSet;

/// Highest rank_address the store assigns.
pub const MAX_RANK: u32 = u32::MAX;

/// rank_address ceiling per zoom level 0..=18
const ZOOM_MAX_RANK: [u32; 19] = [
    2, 3, 4, 6, 8, 10, 12, 14, 15, 16, 18, 20, 22, 24, 26, 27, 28, 29, 30,
];

/// Map a reverse-geocoding zoom level to the coarsest rank allowed.
///
/// Out-of-range zooms are clamped to `0..=18`.
pub fn zoom_to_max_rank(zoom: i32) -> u32 {
    let idx = zoom.clamp(0, 18) as usize;
    ZOOM_MAX_RANK[idx]
}

/// Inclusive rank_address range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankRange {
    pub min: u32,
    pub max: u32,
}

impl RankRange {
    pub const UNRESTRICTED: RankRange = RankRange {
        min: 0,
        max: MAX_RANK,
    };

    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn is_unrestricted(&self) -> bool {
        *self == Self::UNRESTRICTED
    }

    pub fn contains(&self, rank: u32) -> bool {
        rank >= self.min && rank <= self.max
    }
}

/// Map a settlement keyword to its rank range.
///
/// Unknown names give [`RankRange::UNRESTRICTED`], which tells the caller to
/// fall back to plain class/type matching.
pub fn feature_type_to_rank_range(name: &str) -> RankRange {
    match name.trim().to_lowercase().as_str() {
        "country" => RankRange::new(4, 4),
        "state" => RankRange::new(8, 8),
        "city" => RankRange::new(14, 16),
        "town" => RankRange::new(16, 18),
        "village" => RankRange::new(18, 20),
        "hamlet" => RankRange::new(20, 22),
        "suburb" => RankRange::new(20, 22),
        "neighbourhood" | "neighborhood" => RankRange::new(22, 26),
        "settlement" => RankRange::new(8, 20),
        _ => RankRange::UNRESTRICTED,
    }
}

const ADDRESS_CLASSES: &[&str] = &["place", "boundary", "highway", "administrative"];
const POI_CLASSES: &[&str] = &[
    "amenity",
    "shop",
    "tourism",
    "leisure",
    "craft",
    "office",
    "aeroway",
    "aerialway",
    "sport",
    "healthcare",
];
const RAILWAY_CLASSES: &[&str] = &["railway", "public_transport"];
const NATURAL_CLASSES: &[&str] = &["natural", "waterway", "landuse", "geological"];
const MANMADE_CLASSES: &[&str] = &["man_made", "power", "industrial"];
const TRANSPORT_CLASSES: &[&str] = &[
    "aeroway",
    "aerialway",
    "highway",
    "railway",
    "public_transport",
];
const BOUNDARY_CLASSES: &[&str] = &["boundary"];

fn layer_classes(layer: &str) -> &'static [&'static str] {
    match layer.trim().to_lowercase().as_str() {
        "address" => ADDRESS_CLASSES,
        "poi" => POI_CLASSES,
        "railway" => RAILWAY_CLASSES,
        "natural" => NATURAL_CLASSES,
        "manmade" | "man_made" => MANMADE_CLASSES,
        "transport" => TRANSPORT_CLASSES,
        "boundary" | "boundaries" => BOUNDARY_CLASSES,
        _ => &[],
    }
}

/// Expand layer keywords into the union of their store classes
pub fn layers_to_categories<S: AsRef<str>>(layers: &[S]) -> BTreeSet<String> {
    layers
        .iter()
        .flat_map(|l| layer_classes(l.as_ref()).iter())
        .map(|c| c.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_clamped() {
        assert_eq!(zoom_to_max_rank(-3), 2);
        assert_eq!(zoom_to_max_rank(0), 2);
        assert_eq!(zoom_to_max_rank(10), 18);
        assert_eq!(zoom_to_max_rank(18), 30);
        assert_eq!(zoom_to_max_rank(99), 30);
    }

    #[test]
    fn test_zoom_table_monotonic() {
        for z in 0..18 {
            assert!(zoom_to_max_rank(z) <= zoom_to_max_rank(z + 1));
        }
    }

    #[test]
    fn test_feature_type_ranges() {
        assert_eq!(feature_type_to_rank_range("City"), RankRange::new(14, 16));
        assert_eq!(
            feature_type_to_rank_range("neighborhood"),
            RankRange::new(22, 26)
        );
        assert!(feature_type_to_rank_range("restaurant").is_unrestricted());
    }

    #[test]
    fn test_layers_union() {
        let cats = layers_to_categories(&["railway", "TRANSPORT", "bogus"]);
        let expected: BTreeSet<String> = ["aeroway", "aerialway", "highway", "railway", "public_transport"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(cats, expected);
        assert!(layers_to_categories(&["nothing"]).is_empty());
    }
}
