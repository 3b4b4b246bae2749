//! End-to-end tests of the directory client against a mock Management Portal.

use std::time::Duration;

use radar_cache::{CacheConfig, FetchError};
use radar_portal::{EntityKind, ManagementPortalClient, PortalConfig, PortalError};
use serde_json::json;
use url::Url;
use wiremock::matchers::{bearer_token, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> PortalConfig {
    PortalConfig {
        url: Url::parse(&server.uri()).unwrap(),
        request_timeout: Duration::from_secs(5),
        ..PortalConfig::default()
    }
}

fn subjects_body() -> serde_json::Value {
    json!([
        { "login": "sub-2", "project": { "projectName": "radar-pilot" }, "status": "ACTIVATED" },
        { "login": "sub-1", "project": { "projectName": "radar-pilot" }, "status": "ACTIVATED" },
        { "login": "sub-3", "project": { "projectName": "other" }, "sources": null, "attributes": null }
    ])
}

fn projects_body() -> serde_json::Value {
    json!([
        { "projectName": "radar-pilot", "humanReadableProjectName": "RADAR Pilot" },
        { "projectName": "other", "attributes": null },
        { "projectName": "empty" }
    ])
}

async fn mount_list(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == endpoint)
        .count()
}

#[tokio::test]
async fn test_subject_lookup_fetches_once_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/subjects"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(subjects_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = ManagementPortalClient::new(&config_for(&server)).unwrap();

    let subject = client.subject("sub-1").await.unwrap();
    assert_eq!(subject.project_name(), Some("radar-pilot"));

    let again = client.subject("sub-2").await.unwrap();
    assert_eq!(again.login, "sub-2");
    assert_eq!(client.subjects().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_subject_not_found() {
    let server = MockServer::start().await;
    mount_list(&server, "/api/subjects", subjects_body()).await;

    let client = ManagementPortalClient::new(&config_for(&server)).unwrap();

    let err = client.subject("nobody").await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::NotFound { kind: EntityKind::Subject, ref id } if id == "nobody"
    ));
    assert_eq!(err.to_string(), "Subject nobody not found");

    // The initial fetch already answers the lookup
    assert_eq!(requests_to(&server, "/api/subjects").await, 1);

    // With a fresh snapshot, a miss is confirmed by one more fetch
    assert!(client.subject("nobody-else").await.unwrap_err().is_not_found());
    assert_eq!(requests_to(&server, "/api/subjects").await, 2);
}

#[tokio::test]
async fn test_subjects_in_project() {
    let server = MockServer::start().await;
    mount_list(&server, "/api/subjects", subjects_body()).await;
    mount_list(&server, "/api/projects", projects_body()).await;

    let client = ManagementPortalClient::new(&config_for(&server)).unwrap();

    let subjects = client.subjects_in_project("radar-pilot").await.unwrap();
    let logins: Vec<_> = subjects.iter().map(|s| s.login.as_str()).collect();
    assert_eq!(logins, ["sub-1", "sub-2"]);
    assert_eq!(requests_to(&server, "/api/subjects").await, 1);

    // An empty project is confirmed with one extra fetch
    assert!(client.subjects_in_project("empty").await.unwrap().is_empty());
    assert_eq!(requests_to(&server, "/api/subjects").await, 2);

    let err = client.subjects_in_project("missing").await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::NotFound { kind: EntityKind::Project, .. }
    ));
}

#[tokio::test]
async fn test_check_subject_in_project() {
    let server = MockServer::start().await;
    mount_list(&server, "/api/subjects", subjects_body()).await;
    mount_list(&server, "/api/projects", projects_body()).await;

    let client = ManagementPortalClient::new(&config_for(&server)).unwrap();

    client.check_subject_in_project("radar-pilot", "sub-1").await.unwrap();

    let err = client.check_subject_in_project("radar-pilot", "sub-3").await.unwrap_err();
    assert_eq!(err.to_string(), "Subject sub-3 is not part of project radar-pilot");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_source_type_lookup() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        "/api/source-types",
        json!([
            {
                "producer": "Empatica",
                "model": "E4",
                "catalogVersion": "v1",
                "sourceTypeScope": "PASSIVE",
                "sourceData": [
                    { "sourceDataType": "EMPATICA_E4_ACCELEROMETER", "frequency": "32.0" }
                ]
            },
            { "producer": "RADAR", "model": "PHQ8", "catalogVersion": "1.0.0" }
        ]),
    )
    .await;

    let client = ManagementPortalClient::new(&config_for(&server)).unwrap();

    let e4 = client.source_type("Empatica", "E4", "v1").await.unwrap();
    assert_eq!(e4.source_data.len(), 1);
    assert!(e4.source_data[0].enabled);

    let err = client.source_type("Empatica", "E4", "v2").await.unwrap_err();
    assert_eq!(err.to_string(), "Source-type Empatica_E4_v2 not found");
}

#[tokio::test]
async fn test_cold_start_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = ManagementPortalClient::new(&config_for(&server)).unwrap();

    let err = client.project("radar-pilot").await.unwrap_err();
    let PortalError::Cache(cache_err) = &err else {
        panic!("expected cache error, got {err:?}");
    };
    assert_eq!(cache_err.fetch_error(), &FetchError::Http { status: 500 });
    assert!(err.to_string().contains("projects cache is unavailable"));

    // Backing off: no second request, same error
    let err = client.project("radar-pilot").await.unwrap_err();
    assert!(matches!(err, PortalError::Cache(_)));
}

#[tokio::test]
async fn test_malformed_response_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/subjects"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let client = ManagementPortalClient::new(&config_for(&server)).unwrap();

    let err = client.subjects().await.unwrap_err();
    let PortalError::Cache(cache_err) = err else {
        panic!("expected cache error");
    };
    assert!(matches!(cache_err.fetch_error(), FetchError::Parse(_)));
}

#[tokio::test]
async fn test_stale_snapshot_served_during_outage() {
    let server = MockServer::start().await;
    mount_list(&server, "/api/subjects", subjects_body()).await;

    let mut config = config_for(&server);
    config.cache = CacheConfig::new()
        .with_invalidate_after(Duration::from_millis(100))
        .with_retry_after(Duration::from_secs(3600));
    let client = ManagementPortalClient::new(&config).unwrap();

    assert_eq!(client.subjects().await.unwrap().len(), 3);

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/subjects"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    tokio::time::sleep(Duration::from_millis(150)).await;

    // Refresh fails; the previous snapshot is still served
    assert_eq!(client.subject("sub-1").await.unwrap().login, "sub-1");
    assert_eq!(client.subjects().await.unwrap().len(), 3);

    let stats = &client.cache_stats()[0];
    assert_eq!(stats.name, "subjects");
    assert_eq!(stats.version, 1);
    assert_eq!(stats.consecutive_failures, 1);
    assert!(stats.last_failure.is_some());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(bearer_token("portal-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = PortalConfig {
        access_token: Some("portal-secret".to_string()),
        ..config_for(&server)
    };
    let client = ManagementPortalClient::new(&config).unwrap();

    assert_eq!(client.projects().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_base_path_is_preserved() {
    let server = MockServer::start().await;
    mount_list(&server, "/managementportal/api/projects", projects_body()).await;

    let config = PortalConfig {
        url: Url::parse(&format!("{}/managementportal", server.uri())).unwrap(),
        ..config_for(&server)
    };
    let client = ManagementPortalClient::new(&config).unwrap();

    assert!(client.project("other").await.is_ok());
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let config = PortalConfig {
        cache: CacheConfig::new().with_invalidate_after(Duration::ZERO),
        ..PortalConfig::default()
    };

    let err = ManagementPortalClient::new(&config).err().unwrap();
    assert!(matches!(err, PortalError::Configuration(_)));
    assert!(err.to_string().contains("invalidate_after"));
}
