use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use larch::http::{create_router, AppState};
use larch::ratelimit::RouteLimiters;
use larch::service::{GeocodeService, ServiceSettings};
use larch::store::MemoryStore;

const FIXTURE: &str = include_str!("fixtures/places.json");

fn service(settings: ServiceSettings) -> Arc<GeocodeService> {
    let store = MemoryStore::from_json(FIXTURE).unwrap();
    Arc::new(GeocodeService::new(Arc::new(store), settings))
}

fn app() -> Router {
    create_router(AppState::new(service(ServiceSettings::default())), None)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String, String) {
    get_with(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn get_with(app: Router, request: Request<Body>) -> (StatusCode, String, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

fn place_ids(body: &str) -> Vec<i64> {
    let json: Value = serde_json::from_str(body).unwrap();
    json.as_array()
        .unwrap()
        .iter()
        .map(|p| p["place_id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_search_orders_by_importance() {
    let (status, content_type, body) = get(app(), "/search?q=springfield").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/json; charset=utf-8");
    assert_eq!(place_ids(&body), vec![20, 30, 10]);
}

#[tokio::test]
async fn test_search_dedupe_keeps_most_important_in_cell() {
    let (_, _, body) = get(app(), "/search?q=Springfield&dedupe=1").await;
    assert_eq!(place_ids(&body), vec![20, 30]);
}

#[tokio::test]
async fn test_search_filters_and_paging() {
    let (_, _, body) = get(app(), "/search?q=Springfield&limit=1&offset=1").await;
    assert_eq!(place_ids(&body), vec![30]);

    let (_, _, body) = get(app(), "/search?q=Springfield&exclude_place_ids=20,30").await;
    assert_eq!(place_ids(&body), vec![10]);

    let (_, _, body) = get(app(), "/search?q=&countrycodes=CH&layer=poi").await;
    assert_eq!(place_ids(&body), vec![50]);

    // Bounded to a box around Bern
    let (_, _, body) = get(app(), "/search?q=&viewbox=7.3,47.0,7.5,46.9&bounded=1").await;
    assert_eq!(place_ids(&body), vec![40, 60, 50]);
}

#[tokio::test]
async fn test_search_xml_more_url() {
    let (status, content_type, body) =
        get(app(), "/search?q=Springfield&dedupe=1&format=xml&bogus=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/xml; charset=utf-8");
    assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(body.contains("exclude_place_ids=\"20,30\""));
    assert!(body.contains(
        "more_url=\"/search?dedupe=1&amp;exclude_place_ids=20%2C30&amp;format=xml&amp;q=Springfield\""
    ));
    assert!(!body.contains("bogus"));
}

#[tokio::test]
async fn test_search_geojson_with_polygon_text() {
    let (_, _, body) = get(
        app(),
        "/search?q=Bern&format=geojson&polygon_geojson=1&polygon_text=1",
    )
    .await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["type"], "FeatureCollection");

    let feature = &json["features"][0];
    assert_eq!(feature["properties"]["place_id"], 40);
    assert_eq!(feature["geometry"]["type"], "Polygon");
    assert_eq!(
        feature["properties"]["polygon"],
        "7.294 46.919,7.495 46.919,7.495 46.99,7.294 46.99,7.294 46.919"
    );
}

#[tokio::test]
async fn test_search_jsonp() {
    let (_, content_type, body) = get(app(), "/search?q=Bundesplatz&json_callback=cb").await;
    assert_eq!(content_type, "application/javascript; charset=utf-8");
    assert!(body.starts_with("cb(["));
    assert!(body.ends_with("])"));

    // Unusable callback names fall back to plain JSON
    let (_, content_type, _) = get(app(), "/search?q=Bundesplatz&json_callback=alert(1)").await;
    assert_eq!(content_type, "application/json; charset=utf-8");
}

#[tokio::test]
async fn test_accept_language_header_and_param() {
    let request = Request::builder()
        .uri("/search?q=Bern")
        .header(header::ACCEPT_LANGUAGE, "fr-CH, fr;q=0.9")
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = get_with(app(), request).await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json[0]["display_name"], "Berne");

    let request = Request::builder()
        .uri("/search?q=Bern&accept-language=it")
        .header(header::ACCEPT_LANGUAGE, "fr")
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = get_with(app(), request).await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json[0]["display_name"], "Berna");
}

#[tokio::test]
async fn test_reverse_zoom_limits_rank() {
    let (_, _, body) = get(app(), "/reverse?lat=46.9467&lon=7.4440").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["place_id"], 50);

    let (_, _, body) = get(app(), "/reverse?lat=46.9467&lon=7.4440&zoom=9").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["place_id"], 40);
}

#[tokio::test]
async fn test_reverse_without_match() {
    let (status, _, body) = get(app(), "/reverse?lat=46.9467&lon=7.4440&layer=railway").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"error":"Unable to geocode"}"#);

    let (_, _, body) = get(app(), "/reverse?lat=1&lon=2&layer=railway&format=xml").await;
    assert!(body.contains("<error>Unable to geocode</error>"));
}

#[tokio::test]
async fn test_reverse_address_details() {
    let (_, _, body) = get(app(), "/reverse?lat=46.948&lon=7.4474&zoom=9&addressdetails=1").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    let rows = json["address_rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Coarsest level first
    assert_eq!(rows[0]["name"], "Schweiz");
}

#[tokio::test]
async fn test_lookup_skips_bad_tokens() {
    let (_, _, body) = get(app(), "/lookup?osm_ids=R1682248,X1,N,w24640290,n12a").await;
    assert_eq!(place_ids(&body), vec![40, 60]);

    let (status, _, body) = get(app(), "/lookup?osm_ids=bogus").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn test_details() {
    let (_, _, body) = get(app(), "/details?osm_id=R1682248").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["place_id"], 40);
    assert_eq!(json["extratags"]["wikidata"], "Q70");
    assert_eq!(json["namedetails"]["name:fr"], "Berne");
    assert!(json["polygon_geojson"].as_str().unwrap().contains("Polygon"));

    let (_, _, body) = get(app(), "/details?osmtype=N&osmid=3017291").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["place_id"], 50);

    let (_, _, body) = get(app(), "/details?osm_id=N1").await;
    assert_eq!(body, r#"{"error":"Unable to geocode"}"#);
}

#[tokio::test]
async fn test_details_disabled() {
    let settings = ServiceSettings {
        enable_details: false,
        ..ServiceSettings::default()
    };
    let app = create_router(AppState::new(service(settings)), None);

    let (status, _, body) = get(app, "/details?osm_id=R1682248").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_rate_limit_rejects_when_exhausted() {
    let app = create_router(
        AppState::new(service(ServiceSettings::default())),
        Some(RouteLimiters::new(1.0)),
    );

    // Burst capacity is two requests
    for _ in 0..2 {
        let (status, _, _) = get(app.clone(), "/search?q=Bern").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, body) = get(app.clone(), "/search?q=Bern").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["code"], "RATE_LIMIT");

    // Buckets are per route
    let (status, _, _) = get(app.clone(), "/reverse?lat=1&lon=2").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = get(app, "/status").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_status() {
    let settings = ServiceSettings {
        version: "9.9.9".to_string(),
        ..ServiceSettings::default()
    };
    let app = create_router(AppState::new(service(settings)), None);

    let (status, _, body) = get(app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["version"], "9.9.9");
    assert_eq!(json["db_status"], "ok");
    assert!(json["uptime"].as_str().unwrap().ends_with('s'));
}
