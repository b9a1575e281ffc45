//! Parsing of `N123` / `W456` / `R789` lookup tokens.

use super::ExternalRefs;
use crate::models::{OsmRef, OsmType};

/// Parse a single lookup token. The type letter is case-insensitive and the
/// id must be plain ASCII digits.
pub fn parse_osm_ref(token: &str) -> Option<OsmRef> {
    let token = token.trim();
    let mut chars = token.chars();
    let kind = OsmType::from_letter(chars.next()?)?;
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok().map(|id| OsmRef::new(kind, id))
}

/// Partition tokens by OSM type, silently dropping malformed ones
pub fn build_lookup_refs<S: AsRef<str>>(tokens: &[S]) -> ExternalRefs {
    let mut refs = ExternalRefs::default();
    for osm in tokens.iter().filter_map(|t| parse_osm_ref(t.as_ref())) {
        refs.insert(osm.kind, osm.id);
    }
    refs
}
