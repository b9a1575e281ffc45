//! Translation of request parameters into [`QuerySpec`] values.

use std::collections::BTreeSet;

use tracing::debug;

use super::{
    FeatureFilter, GeometryRequest, Page, QuerySpec, ReverseParams, SearchParams, SortOrder,
    Viewbox,
};
use crate::models::{BoundingBox, GeoPoint};
use crate::tables::{feature_type_to_rank_range, layers_to_categories, zoom_to_max_rank};

/// Zoom used by reverse lookups that do not specify one
pub const DEFAULT_REVERSE_ZOOM: i32 = 18;

/// Split, trim and lowercase a comma separated country list
pub fn normalize_country_codes(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.split(',')
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

/// Resolve the `featureType` parameter.
///
/// `class:type` pins both values, a settlement keyword becomes a rank range,
/// anything else matches class or type.
pub fn resolve_feature_filter(raw: &str) -> Option<FeatureFilter> {
    let ft = raw.trim();
    if ft.is_empty() {
        return None;
    }

    if let Some((category, subtype)) = ft.split_once(':') {
        return Some(FeatureFilter::ClassType {
            category: category.trim().to_string(),
            subtype: subtype.trim().to_string(),
        });
    }

    let range = feature_type_to_rank_range(ft);
    if range.is_unrestricted() {
        Some(FeatureFilter::ClassOrType(ft.to_string()))
    } else {
        Some(FeatureFilter::Rank(range))
    }
}

/// The viewbox as a box, if it is non-degenerate
fn usable_viewbox(viewbox: Option<&Viewbox>) -> Option<BoundingBox> {
    viewbox
        .map(Viewbox::to_bbox)
        .filter(BoundingBox::is_usable_filter)
}

pub fn build_search_spec(params: &SearchParams) -> QuerySpec {
    let viewbox = usable_viewbox(params.viewbox.as_ref());

    let bounds = if params.bounded { viewbox } else { None };
    if params.bounded && bounds.is_none() {
        debug!("Ignoring bounded=1 with unusable viewbox {:?}", params.viewbox);
    }

    let order = match viewbox {
        Some(b) => SortOrder::ViewboxProximity(b.center()),
        None => SortOrder::Importance,
    };

    QuerySpec {
        text: Some(params.query.trim().to_string()),
        country_codes: normalize_country_codes(&params.country_codes),
        bounds,
        feature: resolve_feature_filter(&params.feature_type),
        categories: layers_to_categories(&params.layers),
        exclude_place_ids: params.exclude_place_ids.iter().copied().collect(),
        dedupe: params.dedupe,
        max_rank: None,
        order,
        page: Page::new(params.limit, params.offset),
        geometry: GeometryRequest::from_flags(
            params.details.polygon_geojson,
            params.details.polygon_threshold,
        ),
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Anchor point for a reverse lookup, clamped to valid coordinates
pub fn reverse_anchor(params: &ReverseParams) -> GeoPoint {
    GeoPoint::new(
        finite_or_zero(params.lat).clamp(-90.0, 90.0),
        finite_or_zero(params.lon).clamp(-180.0, 180.0),
    )
}

pub fn build_reverse_spec(params: &ReverseParams) -> QuerySpec {
    let anchor = reverse_anchor(params);
    let zoom = params.zoom.unwrap_or(DEFAULT_REVERSE_ZOOM);

    QuerySpec {
        text: None,
        categories: layers_to_categories(&params.layers),
        max_rank: Some(zoom_to_max_rank(zoom)),
        order: SortOrder::Distance(anchor),
        page: Page::single(),
        geometry: GeometryRequest::from_flags(
            params.details.polygon_geojson,
            params.details.polygon_threshold,
        ),
        ..QuerySpec::default()
    }
}
