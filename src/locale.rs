//! Display-name selection from multilingual name tags.

use std::collections::BTreeMap;

/// Parse an Accept-Language style list into language tags.
///
/// Weights (`;q=...`) are stripped but not used for sorting: the order of
/// appearance is the order of preference.
pub fn parse_accept_language(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.split(';').next().unwrap_or("").trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn lookup<'a>(variants: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    variants
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// Pick the display name for a place.
///
/// Order: exact `name:<lang-REGION>`, then `name:<lang>` for each preference,
/// then `int_name`, `name`, and finally `base_name`.
pub fn resolve_display_name(
    variants: &BTreeMap<String, String>,
    base_name: &str,
    preferences: &[String],
) -> String {
    let regional = preferences
        .iter()
        .filter(|tag| tag.contains('-'))
        .find_map(|tag| lookup(variants, &format!("name:{tag}")));

    let primary = || {
        preferences.iter().find_map(|tag| {
            let lang = tag.split('-').next().unwrap_or(tag);
            lookup(variants, &format!("name:{lang}"))
        })
    };

    regional
        .or_else(primary)
        .or_else(|| lookup(variants, "int_name"))
        .or_else(|| lookup(variants, "name"))
        .unwrap_or(base_name)
        .to_string()
}
