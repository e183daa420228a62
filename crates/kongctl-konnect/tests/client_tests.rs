//! Integration tests for the Konnect client against a mock HTTP server

use serde_json::{Map as JsonMap, Value as JsonValue, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kongctl_core::namespace::NamespaceFilter;
use kongctl_core::resource::ResourceKind;
use kongctl_core::{RemoteStore, StoreError};
use kongctl_konnect::{KonnectClient, KonnectConfig};

fn client_for(server: &MockServer) -> KonnectClient {
    client_with_cancel(server, CancellationToken::new())
}

fn client_with_cancel(server: &MockServer, cancel: CancellationToken) -> KonnectClient {
    KonnectClient::new(
        KonnectConfig {
            base_url: server.uri(),
            token: "kpat_test".into(),
            page_size: 2,
        },
        cancel,
    )
    .unwrap()
}

fn body(value: JsonValue) -> JsonMap<String, JsonValue> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn numbered_pagination_walks_until_total() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/portals"))
        .and(query_param("page[number]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "p-1", "name": "one", "labels": {"KONGCTL-namespace": "default"}},
                {"id": "p-2", "name": "two", "labels": {"KONGCTL-namespace": "default"}},
            ],
            "meta": {"page": {"total": 3, "size": 2, "number": 1}},
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/portals"))
        .and(query_param("page[number]", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "p-3", "name": "three", "labels": {"KONGCTL-namespace": "default"}},
            ],
            "meta": {"page": {"total": 3, "size": 2, "number": 2}},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let portals = client_for(&server).list_portals().await.unwrap();
    assert_eq!(portals.len(), 3);
    assert_eq!(portals[2].id, "p-3");
}

#[tokio::test]
async fn empty_page_terminates_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/apis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "meta": {"page": {"total": 0}},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let apis = client_for(&server).list_apis().await.unwrap();
    assert!(apis.is_empty());
}

#[tokio::test]
async fn cursor_pagination_follows_next() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/apis/a-1/documents"))
        .and(query_param_is_missing("page[after]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "d-1", "slug": "guide", "labels": {}}],
            "meta": {"next": "cursor-2"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/apis/a-1/documents"))
        .and(query_param("page[after]", "cursor-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "d-2", "slug": "faq", "labels": {}}],
            "meta": {},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let documents = client_for(&server).list_api_documents("a-1").await.unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1].slug, "faq");
}

#[tokio::test]
async fn list_managed_filters_labels_and_namespace() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/portals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "p-1", "name": "team-a portal", "labels": {"KONGCTL-namespace": "team-a"}},
                {"id": "p-2", "name": "team-b portal", "labels": {"KONGCTL-namespace": "team-b"}},
                {"id": "p-3", "name": "unmanaged", "labels": {"env": "prod"}},
                {"id": "p-4", "name": "legacy", "labels": {"KONGCTL-managed": "true"}},
            ],
            "meta": {"page": {"total": 4}},
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let filter = NamespaceFilter::from_names(["team-a"]);
    let managed = client
        .list_managed(ResourceKind::Portal, None, &filter)
        .await
        .unwrap();
    assert_eq!(managed.len(), 1);
    assert_eq!(managed[0].id, "p-1");

    let all = client
        .list_managed(ResourceKind::Portal, None, &NamespaceFilter::All)
        .await
        .unwrap();
    assert_eq!(all.len(), 2, "wildcard still excludes unmanaged resources");
}

#[tokio::test]
async fn find_adoptable_matches_legacy_by_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/portals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "p-1", "name": "managed", "labels": {"KONGCTL-namespace": "default"}},
                {"id": "p-2", "name": "legacy", "labels": {"KONGCTL-last-updated": "20240101-120000Z"}},
            ],
            "meta": {"page": {"total": 2}},
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let adopted = client
        .find_adoptable(ResourceKind::Portal, None, "legacy")
        .await
        .unwrap();
    assert_eq!(adopted.unwrap().id, "p-2");

    // Fully managed resources are not adoptable through the fallback.
    let not_adoptable = client
        .find_adoptable(ResourceKind::Portal, None, "managed")
        .await
        .unwrap();
    assert!(not_adoptable.is_none());
}

#[tokio::test]
async fn rate_limit_passes_through_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/portals"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"message": "rate limited"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).list_portals().await.unwrap_err();
    assert!(err.is_rate_limited());
    assert!(err.to_string().contains("rate limited"));
}

#[tokio::test]
async fn server_error_passes_through_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/apis"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_api(&body(json!({"name": "Users API"})))
        .await
        .unwrap_err();
    assert!(err.is_server_error());
}

#[tokio::test]
async fn missing_create_payload_is_response_validation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/portals"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_portal(&body(json!({"name": "Dev Portal"})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ResponseValidation { .. }));
}

#[tokio::test]
async fn update_sends_null_labels_for_removal() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v3/portals/p-1"))
        .and(body_partial_json(json!({"labels": {"owner": null}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p-1",
            "name": "Dev Portal",
            "labels": {"KONGCTL-namespace": "default"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let patch = body(json!({
        "labels": {"owner": null, "KONGCTL-namespace": "default"},
    }));
    let updated = client_for(&server).update_portal("p-1", &patch).await.unwrap();
    assert_eq!(updated.id, "p-1");
}

#[tokio::test]
async fn publication_routes_through_portal_path() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v3/apis/a-1/publications/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "portal_id": "p-1",
            "labels": {"KONGCTL-namespace": "default"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client_for(&server)
        .create(
            ResourceKind::ApiPublication,
            Some("a-1"),
            &body(json!({"portal_id": "p-1", "visibility": "public"})),
        )
        .await
        .unwrap();
    assert_eq!(created.id, "p-1");
}

#[tokio::test]
async fn portal_delete_forces() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v3/portals/p-1"))
        .and(query_param("force", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .delete(ResourceKind::Portal, None, "p-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_token_short_circuits() {
    let server = MockServer::start().await;
    // No mounts: a request reaching the server would 404 instead.

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client_with_cancel(&server, cancel)
        .list_portals()
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Cancelled));
}

#[tokio::test]
async fn child_listing_requires_parent() {
    let server = MockServer::start().await;

    let err = client_for(&server)
        .list_managed(ResourceKind::ApiVersion, None, &NamespaceFilter::All)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidRequest { .. }));
}
