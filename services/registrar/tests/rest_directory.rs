//! REST resource directory against a mock repository API.

use std::time::Duration;

use pidreg_id::ResourceId;
use pidreg_registrar::resource::{
    ResourceDirectory, ResourceType, RestDirectoryConfig, RestResourceDirectory,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn directory(server: &MockServer) -> RestResourceDirectory {
    RestResourceDirectory::new(&RestDirectoryConfig {
        base_url: format!("{}/server/api/", server.uri()),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_lookup_flattens_metadata() {
    let server = MockServer::start().await;
    let id = ResourceId::new();

    Mock::given(method("GET"))
        .and(path(format!("/server/api/core/items/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uuid": id.to_string(),
            "handle": "11234/77",
            "withdrawn": false,
            "type": "item",
            "metadata": {
                "dc.title": [{"value": "Compiling Routines", "language": null}],
                "dc.contributor.author": [
                    {"value": "Hopper, Grace"},
                    {"value": "Backus, John"}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resource = directory(&server).lookup(id).await.unwrap().unwrap();
    assert_eq!(resource.id, id);
    assert_eq!(resource.resource_type, ResourceType::Item);
    assert_eq!(resource.handle.as_deref(), Some("11234/77"));
    assert_eq!(resource.first_value("dc.title"), Some("Compiling Routines"));
    assert_eq!(
        resource.first_value("dc.contributor.author"),
        Some("Hopper, Grace")
    );
    assert_eq!(resource.metadata.len(), 3);
}

#[tokio::test]
async fn test_missing_resource_is_none() {
    let server = MockServer::start().await;
    let id = ResourceId::new();

    Mock::given(method("GET"))
        .and(path(format!("/server/api/core/items/{id}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert_eq!(directory(&server).lookup(id).await.unwrap(), None);
}

#[tokio::test]
async fn test_server_error_is_an_error() {
    let server = MockServer::start().await;
    let id = ResourceId::new();

    Mock::given(method("GET"))
        .and(path(format!("/server/api/core/items/{id}")))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&server)
        .await;

    let err = directory(&server).lookup(id).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}
