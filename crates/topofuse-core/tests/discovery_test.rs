#![allow(clippy::unwrap_used)]
// Integration tests for cloud discovery against a wiremock cloud API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use topofuse_api::{CloudClient, ErrorKind, GateConfig, TransportConfig};
use topofuse_core::{
    BranchScope, CloudDiscovery, CoreError, LinkKind, NodeKind, ScopeFilter, Vendor,
};

// ── Helpers ─────────────────────────────────────────────────────────

const GATE: GateConfig = GateConfig {
    min_interval: Duration::from_millis(5),
    backoff: Duration::from_millis(20),
};

fn discovery_at(base: &str) -> CloudDiscovery {
    let base = Url::parse(&format!("{base}/api/v1/")).unwrap();
    let key = "cloud-key".to_string().into();
    let client = CloudClient::new(base, &key, &TransportConfig::default(), GATE).unwrap();
    CloudDiscovery::new(Arc::new(client), 4)
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// One organization with three store networks, each holding one switch.
async fn mount_fleet(server: &MockServer) {
    mount_json(
        server,
        "/api/v1/organizations",
        json!([{ "id": "O_1", "name": "Brand East" }]),
    )
    .await;
    mount_json(
        server,
        "/api/v1/organizations/O_1/networks",
        json!([
            { "id": "N_1", "name": "Store 1", "productTypes": ["switch"] },
            { "id": "N_2", "name": "Store 2", "productTypes": ["switch"] },
            { "id": "N_3", "name": "Store 3", "productTypes": ["switch"] }
        ]),
    )
    .await;

    for n in 1..=3 {
        mount_json(
            server,
            &format!("/api/v1/networks/N_{n}/devices"),
            json!([{
                "serial": format!("Q2HP-0000-000{n}"),
                "mac": format!("e0:55:3d:00:00:0{n}"),
                "name": format!("store-{n}-idf"),
                "model": "MS120-8LP",
                "productType": "switch",
                "status": "online"
            }]),
        )
        .await;
    }
}

// ── Fatal organization failures ─────────────────────────────────────

#[tokio::test]
async fn test_org_auth_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/organizations"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "errors": ["Invalid API key"] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/O_1/networks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let result = discovery_at(&server.uri())
        .discover_topology(&ScopeFilter::default(), &CancellationToken::new())
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    let context = err.context().unwrap();
    assert_eq!(context.vendor, Vendor::CloudSwitch);
    assert_eq!(context.operation, "list organizations");
}

#[tokio::test]
async fn test_unreachable_cloud_is_transport_error() {
    let result = discovery_at("http://127.0.0.1:9")
        .discover_topology(&ScopeFilter::default(), &CancellationToken::new())
        .await;

    assert!(
        matches!(result, Err(CoreError::Transport { .. })),
        "expected Transport error, got: {result:?}"
    );
}

// ── Partial results ─────────────────────────────────────────────────

#[tokio::test]
async fn test_one_failed_network_keeps_the_others() {
    let server = MockServer::start().await;
    // Mounted first so it takes precedence over the healthy N_3 mock below.
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_3/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "errors": ["backend unavailable"] })))
        .mount(&server)
        .await;
    mount_fleet(&server).await;

    let discovery = discovery_at(&server.uri())
        .discover_topology(&ScopeFilter::default().without_ports(), &CancellationToken::new())
        .await
        .unwrap();

    let serials: Vec<_> = discovery
        .data
        .devices
        .iter()
        .map(|d| d.first_str(&["serial"]).unwrap())
        .collect();
    assert_eq!(serials, vec!["Q2HP-0000-0001", "Q2HP-0000-0002"]);
    assert_eq!(discovery.data.networks.len(), 3);

    assert_eq!(discovery.failures.len(), 1);
    let failure = &discovery.failures[0];
    assert_eq!(failure.scope, BranchScope::Network);
    assert_eq!(failure.id, "N_3");
    assert_eq!(failure.kind, ErrorKind::UpstreamData);

    // Strict callers still get the healthy subset.
    let strict = discovery.into_result().unwrap_err();
    assert_eq!(strict.data.devices.len(), 2);
}

#[tokio::test]
async fn test_devices_are_annotated_with_their_network() {
    let server = MockServer::start().await;
    mount_fleet(&server).await;

    let discovery = discovery_at(&server.uri())
        .discover_topology(
            &ScopeFilter::default().network("store 2").without_ports(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(discovery.is_complete());
    assert_eq!(discovery.data.devices.len(), 1);
    let device = &discovery.data.devices[0];
    assert_eq!(device.first_str(&["networkId"]).as_deref(), Some("N_2"));
    assert_eq!(device.first_str(&["networkName"]).as_deref(), Some("Store 2"));
}

// ── Canonical graph ─────────────────────────────────────────────────

#[tokio::test]
async fn test_canonical_topology_links_switch_neighbors() {
    let server = MockServer::start().await;
    mount_fleet(&server).await;

    mount_json(
        &server,
        "/api/v1/devices/Q2HP-0000-0001/switch/ports/statuses",
        json!([
            {
                "portId": "8", "status": "Connected", "speed": "1 Gbps",
                "lldp": { "systemName": "store-2-idf", "chassisId": "e0:55:3d:00:00:02", "portId": "1" }
            },
            { "portId": "9", "status": "Disconnected" }
        ]),
    )
    .await;
    for n in 2..=3 {
        mount_json(
            &server,
            &format!("/api/v1/devices/Q2HP-0000-000{n}/switch/ports/statuses"),
            json!([]),
        )
        .await;
    }

    let graph = discovery_at(&server.uri())
        .canonical_topology(&ScopeFilter::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(graph.is_complete());
    let graph = graph.data;
    assert_eq!(graph.metadata.source, Vendor::CloudSwitch);
    assert_eq!(graph.nodes.len(), 3);
    assert!(graph.nodes.iter().all(|n| n.kind == NodeKind::Switch));

    assert_eq!(graph.links.len(), 1);
    let link = &graph.links[0];
    assert_eq!(link.id, "Q2HP-0000-0001::Q2HP-0000-0002");
    assert_eq!(link.kind, LinkKind::Lldp);
    assert_eq!(link.bandwidth_mbps, Some(1_000));
}

#[tokio::test]
async fn test_failed_port_listing_is_a_device_failure() {
    let server = MockServer::start().await;
    mount_fleet(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/devices/Q2HP-0000-0002/switch/ports/statuses"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": ["Not found"] })))
        .mount(&server)
        .await;
    for n in [1, 3] {
        mount_json(
            &server,
            &format!("/api/v1/devices/Q2HP-0000-000{n}/switch/ports/statuses"),
            json!([]),
        )
        .await;
    }

    let discovery = discovery_at(&server.uri())
        .canonical_topology(&ScopeFilter::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(discovery.data.nodes.len(), 3);
    assert_eq!(discovery.failures.len(), 1);
    assert_eq!(discovery.failures[0].scope, BranchScope::Device);
    assert_eq!(discovery.failures[0].id, "Q2HP-0000-0002");
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancellation_discards_partial_work() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/organizations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": "O_1", "name": "Brand East" }]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let discovery = discovery_at(&server.uri());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = discovery
        .discover_topology(&ScopeFilter::default(), &cancel)
        .await;
    assert!(
        matches!(result, Err(CoreError::Cancelled { .. })),
        "expected Cancelled, got: {result:?}"
    );
}
