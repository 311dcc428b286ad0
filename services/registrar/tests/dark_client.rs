//! dArk connector against a mock dArk service.

use std::time::Duration;

use pidreg_id::{IdentifierValue, RecordId};
use pidreg_registrar::client::{DarkClient, DarkClientConfig};
use pidreg_registrar::connector::DarkConnector;
use pidreg_registrar::payload::RegistrationPayload;
use pidreg_registrar::{ConnectorError, RegistrationConnector};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector(server: &MockServer) -> DarkConnector {
    let client = DarkClient::new(&DarkClientConfig::new(server.uri(), "hope")).unwrap();
    DarkConnector::new(client)
}

fn payload(landing_page: Option<&str>) -> RegistrationPayload {
    RegistrationPayload {
        author: Some("Hopper, Grace".into()),
        title: Some("Compiling Routines".into()),
        year: Some("1952".into()),
        url: Some("http://hdl.handle.net/11234/77".into()),
        landing_page: landing_page.map(str::to_string),
        ..RegistrationPayload::bare(IdentifierValue::dark("hope", "x7k2").unwrap())
    }
}

#[tokio::test]
async fn test_mint_value_uses_new_ark() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/core/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ark": "x7k2"})))
        .expect(1)
        .mount(&server)
        .await;

    let value = connector(&server).mint_value(RecordId::new()).await.unwrap();
    assert_eq!(value.as_str(), "dark:/hope/x7k2");
}

#[tokio::test]
async fn test_mint_value_with_non_json_body_is_unreachable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/core/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = connector(&server).mint_value(RecordId::new()).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Unreachable(_)));
}

#[tokio::test]
async fn test_register_sends_metadata_then_landing_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/core/set/hope/x7k2"))
        .and(body_json(json!({
            "payload": {
                "author": "Hopper, Grace",
                "title": "Compiling Routines",
                "year": "1952",
                "url": "http://hdl.handle.net/11234/77",
                "darkId": "dark:/hope/x7k2"
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/core/set/hope/x7k2"))
        .and(body_partial_json(json!({
            "external_url": "https://repo.example.org/11234/77"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    connector(&server)
        .register(&payload(Some("https://repo.example.org/11234/77")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reserve_sends_metadata_only() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/core/set/hope/x7k2"))
        .and(body_partial_json(json!({"payload": {"darkId": "dark:/hope/x7k2"}})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"external_url": "https://repo.example.org/11234/77"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    connector(&server)
        .reserve(&payload(Some("https://repo.example.org/11234/77")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_error_is_unreachable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/core/set/hope/x7k2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let err = connector(&server).reserve(&payload(None)).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Unreachable(_)));
}

#[tokio::test]
async fn test_client_error_is_rejected_with_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/core/set/hope/x7k2"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "unknown prefix hope"})),
        )
        .mount(&server)
        .await;

    let err = connector(&server).register(&payload(None)).await.unwrap_err();
    assert_eq!(
        err,
        ConnectorError::Rejected {
            status: 422,
            message: "unknown prefix hope".into(),
        }
    );
}

#[tokio::test]
async fn test_slow_service_times_out_as_unreachable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/core/new"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ark": "x7k2"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = DarkClientConfig {
        timeout: Duration::from_millis(200),
        ..DarkClientConfig::new(server.uri(), "hope")
    };
    let connector = DarkConnector::new(DarkClient::new(&config).unwrap());

    let err = connector.mint_value(RecordId::new()).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Unreachable(_)));
}

#[tokio::test]
async fn test_delete_and_queries_stay_local() {
    let server = MockServer::start().await;
    let connector = connector(&server);
    let value = IdentifierValue::dark("hope", "x7k2").unwrap();

    connector.delete(&value).await.unwrap();
    assert!(!connector.is_reserved(&value).await.unwrap());
    assert!(!connector.is_registered(&value).await.unwrap());

    assert!(server.received_requests().await.unwrap().is_empty());
}
