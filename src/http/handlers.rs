//! Route handlers.

use axum::{
    extract::{RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::{IntoResponse, Json, Response},
};
use tracing::debug;

use super::error::{ApiError, ApiResult};
use super::params::{
    accept_language, encode_options, lookup_params, reverse_params, search_params, RawParams,
};
use super::AppState;
use crate::encode::{encode, EncodeOptions, Encoded, OutputFormat, ResultSet};
use crate::service::StatusReport;

fn respond(results: ResultSet<'_>, opts: &EncodeOptions) -> ApiResult<Response> {
    let Encoded { content_type, body } = encode(&results, opts)
        .map_err(|e| ApiError::internal(format!("failed to encode response: {e}")))?;
    Ok(([(CONTENT_TYPE, content_type)], body).into_response())
}

/// Forward geocoding
pub async fn search(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let raw = RawParams::parse(query.as_deref());
    let params = search_params(&raw, &headers);
    let places = state
        .service
        .search(&params, &state.request_context())
        .await?;

    let opts = encode_options(&raw, &state.service.settings().licence);
    respond(ResultSet::Search(&places), &opts)
}

/// Reverse geocoding
pub async fn reverse(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let raw = RawParams::parse(query.as_deref());
    let params = reverse_params(&raw, &headers);
    let place = state
        .service
        .reverse(&params, &state.request_context())
        .await?;

    let opts = encode_options(&raw, &state.service.settings().licence);
    respond(ResultSet::Reverse(place.as_ref()), &opts)
}

/// OSM id lookup
pub async fn lookup(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let raw = RawParams::parse(query.as_deref());
    let params = lookup_params(&raw, &headers);
    let places = state
        .service
        .lookup(&params, &state.request_context())
        .await?;

    let opts = encode_options(&raw, &state.service.settings().licence);
    respond(ResultSet::Lookup(&places), &opts)
}

/// Single place details, addressed by `osm_id=N123` or `osmtype=N&osmid=123`
pub async fn details(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if !state.service.settings().enable_details {
        return Err(ApiError::not_found("details endpoint is disabled"));
    }

    let raw = RawParams::parse(query.as_deref());
    let osm_id = match raw.get("osm_id") {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => format!("{}{}", raw.text("osmtype"), raw.text("osmid")),
    };
    debug!("Details for {:?}", osm_id);

    let place = state
        .service
        .details(
            &osm_id,
            raw.flag("addressdetails"),
            &accept_language(&raw, &headers),
            &state.request_context(),
        )
        .await?;

    let mut opts = encode_options(&raw, &state.service.settings().licence);
    if opts.format == OutputFormat::Xml {
        opts.format = OutputFormat::Default;
    }
    respond(ResultSet::Reverse(place.as_ref()), &opts)
}

/// Service status
pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.service.status().await)
}
