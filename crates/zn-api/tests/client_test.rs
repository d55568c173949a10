// Integration tests for `ZnClient` using wiremock.

use std::collections::HashSet;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use zn_api::types::{ClusterAssignmentSource, HealthState};
use zn_api::{CursorKey, Error, PageStrategy, Query, RetryPolicy, TransportConfig, ZnClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ZnClient) {
    let server = MockServer::start().await;
    let client = ZnClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn asset(i: usize) -> Value {
    json!({ "id": format!("a:a:{i:05}"), "name": format!("asset-{i:05}") })
}

fn query_value(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn query_usize(request: &Request, key: &str) -> usize {
    query_value(request, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[derive(Clone, Copy)]
enum Mode {
    OffsetCount,
    NextOffset,
    Cursor,
}

/// Serves `total` synthetic assets in whichever pagination style `mode`
/// names. Rejects requests that lost the caller's `_search` extra.
struct PagedAssets {
    total: usize,
    mode: Mode,
}

impl Respond for PagedAssets {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if query_value(request, "_search").as_deref() != Some("keep-me") {
            return ResponseTemplate::new(400).set_body_json(json!({"message": "extra lost"}));
        }
        let limit = query_usize(request, "_limit").max(1);
        let start = match self.mode {
            Mode::Cursor => query_value(request, "_cursor")
                .and_then(|c| c.trim_start_matches('c').parse().ok())
                .unwrap_or(0),
            _ => query_usize(request, "_offset"),
        };
        let end = (start + limit).min(self.total);
        let items: Vec<Value> = (start.min(end)..end).map(asset).collect();

        let body = match self.mode {
            Mode::OffsetCount => json!({ "items": items, "count": self.total }),
            Mode::NextOffset => {
                if end < self.total {
                    json!({ "items": items, "count": self.total, "nextOffset": end })
                } else {
                    json!({ "items": items, "count": self.total })
                }
            }
            Mode::Cursor => {
                let cursor = if end < self.total { format!("c{end}") } else { String::new() };
                json!({ "items": items, "scrollCursor": cursor })
            }
        };
        ResponseTemplate::new(200).set_body_json(body)
    }
}

async fn collect_ids(total: usize, page_size: usize, mode: Mode) -> Vec<String> {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets"))
        .respond_with(PagedAssets { total, mode })
        .mount(&server)
        .await;

    let strategy = match mode {
        Mode::OffsetCount => PageStrategy::OffsetCount { page_size },
        Mode::NextOffset => PageStrategy::NextOffset { page_size },
        Mode::Cursor => PageStrategy::Cursor {
            page_size,
            cursor_param: "_cursor".into(),
            cursor_key: CursorKey::ScrollCursor,
        },
    };
    let items: Vec<Value> = client
        .fetch_all("assets", &Query::new().with("_search", "keep-me"), &strategy)
        .await
        .unwrap();
    items
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_owned())
        .collect()
}

// ── Pagination ──────────────────────────────────────────────────────

#[tokio::test]
async fn offset_count_fetches_950_in_three_pages() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/assets"))
        .and(query_param("_limit", "1"))
        .and(query_param("with_count", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [asset(0)],
            "count": 950
        })))
        .expect(1)
        .mount(&server)
        .await;

    for (offset, len) in [(0, 400), (400, 400), (800, 150)] {
        let items: Vec<Value> = (offset..offset + len).map(asset).collect();
        Mock::given(method("GET"))
            .and(path("/api/v1/assets"))
            .and(query_param("_limit", "400"))
            .and(query_param("_offset", offset.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "items": items, "count": 950 })),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let assets = client
        .list_assets(&Query::new(), &PageStrategy::offset(400))
        .await
        .unwrap();

    assert_eq!(assets.len(), 950);
    let distinct: HashSet<&str> = assets.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(distinct.len(), 950);
    assert_eq!(assets[0].id, "a:a:00000");
    assert_eq!(assets[949].id, "a:a:00949");
}

#[tokio::test]
async fn every_strategy_returns_each_item_exactly_once() {
    for mode in [Mode::OffsetCount, Mode::NextOffset, Mode::Cursor] {
        for (total, page_size) in [(0, 10), (1, 10), (10, 10), (11, 10), (95, 7), (400, 400)] {
            let ids = collect_ids(total, page_size, mode).await;
            assert_eq!(ids.len(), total, "total={total} page_size={page_size}");
            let distinct: HashSet<&String> = ids.iter().collect();
            assert_eq!(distinct.len(), total);
            let expected: Vec<String> = (0..total).map(|i| format!("a:a:{i:05}")).collect();
            assert_eq!(ids, expected, "server order must be preserved");
        }
    }
}

#[tokio::test]
async fn error_mid_walk_aborts_without_partial_result() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/assets"))
        .and(query_param("_limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [], "count": 20})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets"))
        .and(query_param("_offset", "0"))
        .and(query_param("_limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": (0..10).map(asset).collect::<Vec<_>>(),
            "count": 20
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets"))
        .and(query_param("_offset", "10"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let result = client
        .list_assets(&Query::new(), &PageStrategy::offset(10))
        .await;

    match result {
        Err(Error::Server { status, body, .. }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn cursor_walk_stops_on_short_page() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/activities/network"))
        .and(query_param_is_missing("_cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"timestamp": 1_700_000_000_000_i64, "src": {"eventRecordId": 1}},
                {"timestamp": 1_700_000_000_500_i64, "src": {"eventRecordId": 2}}
            ],
            "scrollCursor": 1_700_000_000_500_i64
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/activities/network"))
        .and(query_param("_cursor", "1700000000500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"timestamp": 1_700_000_001_000_i64, "src": {"eventRecordId": 3}}],
            "scrollCursor": 1_700_000_001_000_i64
        })))
        .expect(1)
        .mount(&server)
        .await;

    let activities = client
        .list_network_activities(&Query::new().with("order", "desc"), 2)
        .await
        .unwrap();
    assert_eq!(activities.len(), 3);
    assert_eq!(activities[2].event_record_id().as_deref(), Some("3"));
}

/// Serves `total` segment servers with `_limit`/`_offset` and a `count`.
struct PagedSegmentServers {
    total: usize,
}

impl Respond for PagedSegmentServers {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let limit = query_usize(request, "_limit").max(1);
        let start = query_usize(request, "_offset").min(self.total);
        let end = (start + limit).min(self.total);
        let items: Vec<Value> = (start..end)
            .map(|i| json!({ "id": format!("ss-{i}"), "assetId": format!("a:a:ss{i}") }))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "items": items, "count": self.total }))
    }
}

#[tokio::test]
async fn segment_servers_are_read_past_the_first_page() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environments/segment-servers"))
        .respond_with(PagedSegmentServers { total: 401 })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environments/clusters"))
        .and(query_param("_offset", "400"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "C:d:late", "name": "Late"}],
            "count": 401
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environments/clusters"))
        .respond_with(|request: &Request| {
            let limit = query_usize(request, "_limit");
            let items: Vec<Value> = (0..limit.min(400))
                .map(|i| json!({ "id": format!("C:d:{i}"), "name": format!("c{i}") }))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({ "items": items, "count": 401 }))
        })
        .mount(&server)
        .await;

    let servers = client.list_segment_servers().await.unwrap();
    assert_eq!(servers.len(), 401);
    assert_eq!(servers[400].asset_id.as_deref(), Some("a:a:ss400"));

    let clusters = client.list_deployment_clusters().await.unwrap();
    assert_eq!(clusters.len(), 401);
    assert!(clusters.iter().any(|c| c.id == "C:d:late"));
}

// ── Auth & errors ───────────────────────────────────────────────────

#[tokio::test]
async fn authorization_header_carries_raw_token() {
    let server = MockServer::start().await;
    let token = "eyJhbGciOiJIUzI1NiJ9.e30.c2ln";

    Mock::given(method("GET"))
        .and(path("/api/v1/environments/clusters"))
        .and(header("authorization", token))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "C:d:1", "name": "Default"}],
            "count": 1
        })))
        // count probe, then the page itself
        .expect(2)
        .mount(&server)
        .await;

    let client = ZnClient::from_api_key(
        &SecretString::from(token),
        Some(&server.uri()),
        &TransportConfig::default(),
    )
    .unwrap();
    let clusters = client.list_deployment_clusters().await.unwrap();
    assert_eq!(clusters[0].name, "Default");
}

#[tokio::test]
async fn not_found_is_distinguished() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/assets/a:a:missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Asset not found"})),
        )
        .mount(&server)
        .await;

    let err = client.get_asset("a:a:missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Not found (HTTP 404): Asset not found");
    assert!(err.body().unwrap().contains("Asset not found"));
}

#[tokio::test]
async fn get_asset_unwraps_entity() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/assets/a:a:1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": {
                "id": "a:a:1",
                "name": "WS-01",
                "healthState": 2,
                "deploymentsClusterSource": 1
            }
        })))
        .mount(&server)
        .await;

    let asset = client.get_asset("a:a:1").await.unwrap();
    assert_eq!(asset.name, "WS-01");
    assert_eq!(asset.health_state, Some(HealthState::Unhealthy));
    assert_eq!(asset.cluster_source, Some(ClusterAssignmentSource::Automatic));
}

#[tokio::test]
async fn unauthorized_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/environments/clusters"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_deployment_clusters().await.unwrap_err();
    assert!(err.is_auth());
    assert!(!err.is_transient());
}

#[tokio::test]
async fn invalid_json_keeps_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/environments/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    match client.list_deployment_clusters().await {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>proxy</html>"),
        other => panic!("expected deserialization error, got {other:?}"),
    }
}

#[tokio::test]
async fn connection_failures_are_transient() {
    // Nothing listens on port 1.
    let client = ZnClient::from_reqwest("http://127.0.0.1:1", reqwest::Client::new())
        .unwrap()
        .with_retry(RetryPolicy::fixed(2, Duration::ZERO));
    let err = client.list_deployment_clusters().await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}

#[tokio::test]
async fn timed_out_writes_are_sent_once() {
    let server = MockServer::start().await;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = ZnClient::from_reqwest(&server.uri(), http)
        .unwrap()
        .with_retry(RetryPolicy::fixed(3, Duration::ZERO));

    let slow = ResponseTemplate::new(200)
        .set_body_json(json!({"entity": {"id": "a:a:1", "name": "WS-01"}}))
        .set_delay(Duration::from_millis(500));
    Mock::given(method("PUT"))
        .and(path("/api/v1/assets/a:a:1/deployments-cluster"))
        .respond_with(slow.clone())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets/a:a:1"))
        .respond_with(slow)
        .expect(3)
        .mount(&server)
        .await;

    let err = client.pin_asset("a:a:1", "C:d:1").await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
    let err = client.get_asset("a:a:1").await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}

#[tokio::test]
async fn reserved_characters_in_ids_stay_in_the_path() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets/a:a:1%2F..%2Fx%3Fy"))
        .and(query_param_is_missing("y"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no such asset"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/groups/custom/g:c:1%23frag/members"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get_asset("a:a:1/../x?y").await.unwrap_err();
    assert!(err.is_not_found());
    client
        .remove_group_members("g:c:1#frag", &["a:a:1".to_owned()])
        .await
        .unwrap();
}

// ── Groups ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_group_conflict_returns_existing() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/groups/custom"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "Group already exists"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups/custom"))
        .and(query_param("_search", "Break Glass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "g:c:2", "name": "Break Glass Old"},
                {"id": "g:c:1", "name": "Break Glass", "membersCount": 4}
            ],
            "count": 2
        })))
        .mount(&server)
        .await;

    let upserted = client
        .create_custom_group("Break Glass", "emergency access")
        .await
        .unwrap();
    assert!(!upserted.created);
    assert_eq!(upserted.entity.id, "g:c:1");
    assert_eq!(upserted.entity.members_count, Some(4));
}

#[tokio::test]
async fn create_group_success_fetches_entity() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/groups/custom"))
        .and(body_json(json!({
            "name": "Pilot",
            "description": "",
            "membersIds": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entityId": "g:c:9"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups/custom/g:c:9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": {"id": "g:c:9", "name": "Pilot"}
        })))
        .mount(&server)
        .await;

    let upserted = client.create_custom_group("Pilot", "").await.unwrap();
    assert!(upserted.created);
    assert_eq!(upserted.entity.name, "Pilot");
}

#[tokio::test]
async fn member_changes_send_ids() {
    let (server, client) = setup().await;
    let ids = vec!["a:a:1".to_owned(), "a:a:2".to_owned()];

    Mock::given(method("POST"))
        .and(path("/api/v1/groups/custom/g:c:1/members"))
        .and(body_json(json!({"membersIds": ["a:a:1", "a:a:2"]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/groups/custom/g:c:1/members"))
        .and(body_json(json!({"membersIds": ["a:a:1", "a:a:2"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client.add_group_members("g:c:1", &ids).await.unwrap();
    client.remove_group_members("g:c:1", &ids).await.unwrap();
}

// ── Clusters & filters ──────────────────────────────────────────────

#[tokio::test]
async fn pin_and_unpin() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/assets/a:a:1/deployments-cluster"))
        .and(body_json(json!({"deploymentsClusterId": "C:d:2"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/assets/a:a:1/deployments-cluster"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.pin_asset("a:a:1", "C:d:2").await.unwrap();
    client.unpin_asset("a:a:1").await.unwrap();
}

#[tokio::test]
async fn network_filters_build_catalog() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/activities/network/filters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filters": [
                {"id": "protocolType", "name": "Protocol",
                 "selections": [{"id": 6, "name": "TCP"}, {"id": 17, "name": "UDP"}]},
                {"id": "dstPort", "name": "Destination port"},
                {"id": "protocolType", "selections": []}
            ]
        })))
        .mount(&server)
        .await;

    let catalog = client.network_filters().await.unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.selection_name("protocolType", &json!(17)), Some("UDP"));
    assert!(catalog.contains("dstPort"));
}

#[tokio::test]
async fn empty_filter_catalog_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/activities/network/filters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"filters": []})))
        .mount(&server)
        .await;

    assert!(matches!(client.network_filters().await, Err(Error::Filter(_))));
}
