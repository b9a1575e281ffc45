//! Query predicate building: request parameters in, typed [`QuerySpec`] out.

mod builder;
mod dedup;
mod lookup;
mod order;
mod params;
mod spec;

pub use builder::{
    build_reverse_spec, build_search_spec, normalize_country_codes, resolve_feature_filter,
    reverse_anchor, DEFAULT_REVERSE_ZOOM,
};
pub use dedup::{dedup_key, dedupe, DedupKey, DEDUP_GRID};
pub use lookup::{build_lookup_refs, parse_osm_ref};
pub use order::{compare_matches, sort_matches};
pub use params::{DetailOptions, LookupParams, ReverseParams, SearchParams, Viewbox};
pub use spec::{
    ExternalRefs, FeatureFilter, GeometryRequest, Page, QuerySpec, SortOrder, DEFAULT_LIMIT,
    MAX_LIMIT,
};
