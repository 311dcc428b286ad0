//! DOI connector against a mock DataCite-style agency.

use pidreg_id::{IdentifierValue, RecordId};
use pidreg_registrar::client::{DoiClient, DoiClientConfig, DoiState};
use pidreg_registrar::connector::DoiConnector;
use pidreg_registrar::payload::RegistrationPayload;
use pidreg_registrar::{ConnectorError, RegistrationConnector};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOI: &str = "10.5072/fk2-x7k2";
const DOI_PATH: &str = "/dois/10.5072/fk2-x7k2";

fn client(server: &MockServer) -> DoiClient {
    DoiClient::new(&DoiClientConfig::new(server.uri()).with_credentials("repo.user", "s3cret"))
        .unwrap()
}

fn connector(server: &MockServer) -> DoiConnector {
    DoiConnector::new(client(server), "10.5072", "fk2-")
}

fn value() -> IdentifierValue {
    IdentifierValue::doi(DOI).unwrap()
}

fn payload() -> RegistrationPayload {
    RegistrationPayload {
        author: Some("Hopper, Grace".into()),
        title: Some("Compiling Routines".into()),
        year: Some("1952".into()),
        landing_page: Some("https://repo.example.org/11234/77".into()),
        ..RegistrationPayload::bare(value())
    }
}

fn state_body(state: &str) -> serde_json::Value {
    json!({"data": {"id": DOI, "type": "dois", "attributes": {"doi": DOI, "state": state}}})
}

#[tokio::test]
async fn test_mint_value_is_local() {
    let server = MockServer::start().await;
    let record = RecordId::new();

    let value = connector(&server).mint_value(record).await.unwrap();
    assert_eq!(value.doi_name(), Some(format!("10.5072/fk2-{}", record.suffix()).as_str()));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_publishes_with_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(DOI_PATH))
        .and(basic_auth("repo.user", "s3cret"))
        .and(body_partial_json(json!({
            "data": {
                "type": "dois",
                "attributes": {
                    "doi": DOI,
                    "event": "publish",
                    "url": "https://repo.example.org/11234/77",
                    "publicationYear": "1952"
                }
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(state_body("findable")))
        .expect(1)
        .mount(&server)
        .await;

    connector(&server).register(&payload()).await.unwrap();
}

#[tokio::test]
async fn test_reserve_keeps_draft() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(DOI_PATH))
        .and(body_partial_json(json!({"data": {"attributes": {"event": "publish"}}})))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(DOI_PATH))
        .and(body_partial_json(json!({"data": {"attributes": {"doi": DOI}}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(state_body("draft")))
        .expect(1)
        .mount(&server)
        .await;

    connector(&server).reserve(&payload()).await.unwrap();
}

#[tokio::test]
async fn test_delete_removes_draft() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(state_body("draft")))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(DOI_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    connector(&server).delete(&value()).await.unwrap();
}

#[tokio::test]
async fn test_delete_hides_public_doi() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(state_body("findable")))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(DOI_PATH))
        .and(body_partial_json(json!({"data": {"attributes": {"event": "hide"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(state_body("registered")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    connector(&server).delete(&value()).await.unwrap();
}

#[tokio::test]
async fn test_delete_of_unknown_doi_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOI_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    connector(&server).delete(&value()).await.unwrap();
}

#[tokio::test]
async fn test_state_queries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(state_body("findable")))
        .mount(&server)
        .await;

    assert_eq!(client(&server).get_state(DOI).await.unwrap(), Some(DoiState::Findable));

    let connector = connector(&server);
    assert!(connector.is_registered(&value()).await.unwrap());
    assert!(!connector.is_reserved(&value()).await.unwrap());
}

#[tokio::test]
async fn test_unknown_doi_has_no_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOI_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"status": "404", "title": "DOI not found"}]
        })))
        .mount(&server)
        .await;

    assert_eq!(client(&server).get_state(DOI).await.unwrap(), None);
    assert!(!connector(&server).is_registered(&value()).await.unwrap());
}

#[tokio::test]
async fn test_rate_limit_is_unreachable() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(DOI_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = connector(&server).register(&payload()).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Unreachable(_)));
}

#[tokio::test]
async fn test_validation_error_is_rejected_with_titles() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(DOI_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [
                {"source": "url", "title": "Can't be blank"},
                {"source": "titles", "title": "Title is required"}
            ]
        })))
        .mount(&server)
        .await;

    let err = connector(&server).register(&payload()).await.unwrap_err();
    match err {
        ConnectorError::Rejected { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Can't be blank; Title is required");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dark_value_is_malformed_for_doi_connector() {
    let server = MockServer::start().await;
    let dark = IdentifierValue::dark("hope", "x7k2").unwrap();

    let err = connector(&server).delete(&dark).await.unwrap_err();
    assert!(matches!(err, ConnectorError::MalformedValue(_)));
}
