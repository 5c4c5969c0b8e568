use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use coffee_gateway::state::AppState;
use core_config::AppInfo;
use domain_api_keys::{ApiKeyAuthenticator, Credential, InMemoryCredentialStore, KeyHasher};
use domain_coffee::{
    Coffee, CoffeeMethodRouter, InMemoryCoffeeRepository, Roaster, SearchConfig,
    SearchOrchestrator,
};
use http_body_util::BodyExt;
use jsonrpc::{RpcSettings, RpcState};
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, Value as DbValue};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

const SALT: &str = "integration-salt";
const SEARCH_KEY: &str = "ck_search_only";
const FULL_KEY: &str = "ck_full_access";

struct Fixture {
    app: Router,
    roaster_id: Uuid,
}

fn one_row() -> Vec<BTreeMap<&'static str, DbValue>> {
    vec![BTreeMap::from([("?column?", DbValue::from(1i32))])]
}

fn healthy_db() -> sea_orm::DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([one_row(), one_row()])
        .into_connection()
}

async fn fixture_with(db: sea_orm::DatabaseConnection, settings: RpcSettings) -> Fixture {
    let roaster_id = Uuid::new_v4();
    let repo = InMemoryCoffeeRepository::new();
    repo.insert_roaster(Roaster {
        id: roaster_id,
        name: "Nordic Roast".into(),
        description: Some("Light roasts".into()),
        website: None,
        city: Some("Oslo".into()),
        country: Some("Norway".into()),
        latitude: Some(59.91),
        longitude: Some(10.75),
        is_featured: true,
    })
    .await;
    repo.insert_coffee(
        Coffee {
            id: Uuid::new_v4(),
            name: "Ethiopia Sidamo".into(),
            roaster_id,
            roaster_name: Some("Nordic Roast".into()),
            flavor_tags: vec!["chocolate".into(), "berry".into()],
            roast_level: Some("light".into()),
            process_method: Some("natural".into()),
            price: Some(19.5),
            is_featured: false,
            description: Some("Sweet and fruity".into()),
        },
        None,
    )
    .await;

    let hasher = KeyHasher::new(SALT);
    let store = InMemoryCredentialStore::new();
    store
        .insert(Credential::new("search-only", hasher.hash(SEARCH_KEY), ["search"]))
        .await;
    store
        .insert(Credential::new(
            "full",
            hasher.hash(FULL_KEY),
            ["search", "roasters:read"],
        ))
        .await;

    let orchestrator = SearchOrchestrator::new(Arc::new(repo), None, SearchConfig::default());
    let methods = Arc::new(CoffeeMethodRouter::new(Arc::new(orchestrator)));
    let authenticator = Arc::new(ApiKeyAuthenticator::new(Arc::new(store), hasher));

    let state = AppState {
        app: AppInfo {
            name: "coffee_gateway",
            version: "0.1.0",
        },
        rpc_path: "/rpc".into(),
        rpc: RpcState::new(methods, authenticator, settings),
        db: Arc::new(db),
    };

    Fixture {
        app: coffee_gateway::app(&state, CorsLayer::permissive()),
        roaster_id,
    }
}

async fn fixture() -> Fixture {
    fixture_with(healthy_db(), RpcSettings::default()).await
}

fn rpc(body: Value, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/rpc")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_reports_name_and_version() {
    let f = fixture().await;
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&f.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "coffee_gateway");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_checks_database_and_vector_extension() {
    let f = fixture().await;
    let request = Request::get("/ready").body(Body::empty()).unwrap();
    let (status, body) = send(&f.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
    assert_eq!(body["vector"], "connected");
}

#[tokio::test]
async fn test_ready_is_503_when_database_is_down() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([
            DbErr::Custom("connection refused".into()),
            DbErr::Custom("connection refused".into()),
        ])
        .into_connection();
    let f = fixture_with(db, RpcSettings::default()).await;

    let request = Request::get("/ready").body(Body::empty()).unwrap();
    let (status, body) = send(&f.app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not ready");
}

#[tokio::test]
async fn test_manifest_lists_methods() {
    let f = fixture().await;
    let request = Request::get("/manifest").body(Body::empty()).unwrap();
    let (status, body) = send(&f.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["protocolVersion"], "2.0");
    assert_eq!(body["endpoint"], "/rpc");
    let methods = body["methods"].as_array().unwrap();
    assert_eq!(methods.len(), 4);
    assert!(
        methods
            .iter()
            .any(|m| m["name"] == "similarity_search" && m["supportsStreaming"] == true)
    );
}

#[tokio::test]
async fn test_unknown_path_is_404_json() {
    let f = fixture().await;
    let request = Request::get("/brew").body(Body::empty()).unwrap();
    let (status, body) = send(&f.app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_get_on_rpc_path_is_405() {
    let f = fixture().await;
    let request = Request::get("/rpc").body(Body::empty()).unwrap();
    let response = f.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_missing_key_is_unauthorized_with_echoed_id() {
    let f = fixture().await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": "req-7",
        "method": "similarity_search",
        "params": {"flavorProfile": ["chocolate"]}
    });
    let (status, body) = send(&f.app, rpc(body, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "req-7");
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(body["error"]["message"], "Missing API key");
}

#[tokio::test]
async fn test_similarity_search_with_valid_key() {
    let f = fixture().await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "similarity_search",
        "params": {"flavorProfile": ["Chocolate"], "maxResults": 5}
    });
    let (status, body) = send(&f.app, rpc(body, Some(SEARCH_KEY))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    let result = &body["result"];
    assert_eq!(result["matchTier"], "lexical");
    assert_eq!(result["total"], 1);
    assert_eq!(result["results"][0]["name"], "Ethiopia Sidamo");
}

#[tokio::test]
async fn test_non_array_flavor_profile_is_invalid_params() {
    let f = fixture().await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "similarity_search",
        "params": {"flavorProfile": "chocolate"}
    });
    let (_, body) = send(&f.app, rpc(body, Some(SEARCH_KEY))).await;

    assert_eq!(body["error"]["code"], -32602);
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("flavorProfile")
    );
}

#[tokio::test]
async fn test_roaster_details_requires_permission() {
    let f = fixture().await;
    let request = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "get_roaster_details",
        "params": {"roasterId": f.roaster_id.to_string()}
    });

    let (_, denied) = send(&f.app, rpc(request.clone(), Some(SEARCH_KEY))).await;
    assert_eq!(denied["error"]["code"], -32001);

    let (_, allowed) = send(&f.app, rpc(request, Some(FULL_KEY))).await;
    assert_eq!(allowed["result"]["name"], "Nordic Roast");
    assert_eq!(allowed["result"]["city"], "Oslo");
}

#[tokio::test]
async fn test_malformed_roaster_id_is_invalid_params() {
    let f = fixture().await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "get_roaster_details",
        "params": {"roasterId": "nordic"}
    });
    let (_, body) = send(&f.app, rpc(body, Some(FULL_KEY))).await;

    assert_eq!(body["error"]["code"], -32602);
}

#[tokio::test]
async fn test_nearby_roasters_within_radius() {
    let f = fixture().await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 5,
        "method": "find_nearby_roasters",
        "params": {"latitude": 59.9139, "longitude": 10.7522, "radiusKm": 10}
    });
    let (_, body) = send(&f.app, rpc(body, Some(SEARCH_KEY))).await;

    let results = body["result"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["type"], "roaster");
    assert!(results[0]["distanceKm"].as_f64().unwrap() < 1.0);
}

#[tokio::test]
async fn test_streamed_non_streaming_method_is_refused() {
    let f = fixture().await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 6,
        "method": "find_nearby_roasters",
        "params": {"latitude": 0, "longitude": 0}
    });
    let mut request = rpc(body, Some(SEARCH_KEY));
    request
        .headers_mut()
        .insert(header::ACCEPT, "text/event-stream".parse().unwrap());

    let response = f.app.clone().oneshot(request).await.unwrap();
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert!(content_type.starts_with("application/json"));
    assert_eq!(body["error"]["code"], -32003);
    assert_eq!(body["id"], 6);
}

#[tokio::test]
async fn test_streamed_similarity_search_ends_with_final_event() {
    let f = fixture().await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 8,
        "method": "similarity_search",
        "params": {"flavorProfile": ["berry"]}
    });
    let mut request = rpc(body, Some(SEARCH_KEY));
    request
        .headers_mut()
        .insert(header::ACCEPT, "text/event-stream".parse().unwrap());

    let response = f.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let partial = text.find("event: partial").unwrap();
    let terminal = text.find("event: final").unwrap();
    assert!(partial < terminal);
    assert_eq!(text.matches("event: final").count(), 1);
    assert!(!text.contains("event: error"));
}

#[tokio::test]
async fn test_dev_mode_skips_authentication() {
    let settings = RpcSettings {
        dev_mode: true,
        ..RpcSettings::default()
    };
    let f = fixture_with(healthy_db(), settings).await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "get_roaster_details",
        "params": {"roasterId": f.roaster_id.to_string()}
    });
    let (_, body) = send(&f.app, rpc(body, None)).await;

    assert_eq!(body["result"]["name"], "Nordic Roast");
}

#[tokio::test]
async fn test_rate_limit_applies_per_key() {
    let settings = RpcSettings {
        rate_limit_per_minute: 1,
        ..RpcSettings::default()
    };
    let f = fixture_with(healthy_db(), settings).await;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 10,
        "method": "similarity_search",
        "params": {"flavorProfile": ["berry"]}
    });

    let (_, first) = send(&f.app, rpc(body.clone(), Some(SEARCH_KEY))).await;
    assert!(first.get("result").is_some());

    let (_, second) = send(&f.app, rpc(body.clone(), Some(SEARCH_KEY))).await;
    assert_eq!(second["error"]["code"], -32002);

    let (_, other_key) = send(&f.app, rpc(body, Some(FULL_KEY))).await;
    assert!(other_key.get("result").is_some());
}
