//! RESTCONF integration tests
//!
//! Runs RESTCONF PUT and GET through the dispatcher against a wiremock
//! server standing in for the device's HTTP surface.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netdispatch::dispatcher::{Dispatcher, DispatcherConfig};
use netdispatch::inventory::{Credentials, Device, TransportParams};
use netdispatch::operation::restconf::YANG_JSON;
use netdispatch::operation::{
    DeviceOperation, InterfaceConfig, RestconfClient, RestconfGet, RestconfPut, RestconfSettings,
};
use netdispatch::outcome::{FailureReason, Outcome, Payload};
use netdispatch::platform::PlatformRegistry;

const INTERFACES: &str = "/restconf/data/ietf-interfaces:interfaces";

fn client() -> Arc<RestconfClient> {
    let settings = RestconfSettings {
        scheme: "http".into(),
        ..RestconfSettings::default()
    };
    Arc::new(RestconfClient::new(settings).unwrap())
}

fn device_at(name: &str, port: u16) -> Arc<Device> {
    Arc::new(
        Device::new(name, "127.0.0.1", "cisco_csr1000v")
            .with_credentials(Credentials::new("developer", "C1sco12345"))
            .with_params(TransportParams {
                restconf_port: Some(port),
                ..TransportParams::default()
            }),
    )
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(
        Arc::new(PlatformRegistry::builtin()),
        DispatcherConfig {
            forks: 2,
            timeout: Duration::from_secs(5),
        },
    )
}

fn loopback() -> InterfaceConfig {
    InterfaceConfig::new("Loopback0").with_ipv4("172.16.1.100", "255.255.255.0")
}

#[tokio::test]
async fn test_put_interface() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/interface=Loopback0", INTERFACES)))
        .and(header("content-type", YANG_JSON))
        .and(header("accept", YANG_JSON))
        .and(basic_auth("developer", "C1sco12345"))
        .and(body_json(json!({
            "ietf-interfaces:interface": {
                "name": "Loopback0",
                "description": "Configured by RESTCONF",
                "type": "iana-if-type:softwareLoopback",
                "enabled": true,
                "ietf-ip:ipv4": {
                    "address": [{"ip": "172.16.1.100", "netmask": "255.255.255.0"}]
                }
            }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let device = device_at("CSR1", server.address().port());
    let op: Arc<dyn DeviceOperation> = Arc::new(RestconfPut::new(client(), loopback()));

    // PUT replaces, so repeating it succeeds the same way.
    for _ in 0..2 {
        let results = dispatcher()
            .run(std::slice::from_ref(&device), Arc::clone(&op))
            .await;
        match results.get("CSR1").unwrap() {
            Outcome::Success(Payload::HttpStatus(code)) => assert_eq!(*code, 204),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_put_rejected_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"errors":{"error":[{"error-tag":"malformed-message"}]}}"#),
        )
        .mount(&server)
        .await;

    let device = device_at("CSR1", server.address().port());
    let op: Arc<dyn DeviceOperation> = Arc::new(RestconfPut::new(client(), loopback()));
    let results = dispatcher().run(&[device], op).await;

    match results.get("CSR1").unwrap() {
        Outcome::Failure(failure) => {
            assert_eq!(failure.reason, FailureReason::ProtocolError);
            assert!(failure.detail.starts_with("HTTP 400"));
            assert!(failure.detail.contains("malformed-message"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_get_all_interfaces() {
    let server = MockServer::start().await;
    let document = json!({
        "ietf-interfaces:interfaces": {
            "interface": [
                {
                    "name": "GigabitEthernet1",
                    "type": "iana-if-type:ethernetCsmacd",
                    "enabled": true,
                    "ietf-ip:ipv4": {"address": [{"ip": "10.0.0.15", "netmask": "255.255.255.0"}]}
                },
                {
                    "name": "GigabitEthernet2",
                    "type": "iana-if-type:ethernetCsmacd",
                    "enabled": false
                }
            ]
        }
    });
    Mock::given(method("GET"))
        .and(path(INTERFACES))
        .and(header("accept", YANG_JSON))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .expect(1)
        .mount(&server)
        .await;

    let device = device_at("CSR1", server.address().port());
    let op: Arc<dyn DeviceOperation> = Arc::new(RestconfGet::all(client()));
    let results = dispatcher().run(&[device], op).await;

    let Some(Outcome::Success(Payload::Json(value))) = results.get("CSR1") else {
        panic!("unexpected outcome: {:?}", results.get("CSR1"));
    };
    let interfaces = value["interface"].as_array().unwrap();
    assert_eq!(interfaces.len(), 2);
    assert_eq!(interfaces[0]["name"], "GigabitEthernet1");
    assert_eq!(interfaces[0]["enabled"], true);
    assert_eq!(interfaces[0]["ietf-ip:ipv4"]["address"][0]["ip"], "10.0.0.15");
    assert_eq!(interfaces[1]["name"], "GigabitEthernet2");
    assert_eq!(interfaces[1]["enabled"], false);
}

#[tokio::test]
async fn test_get_single_interface() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/interface=GigabitEthernet2", INTERFACES)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ietf-interfaces:interface": {"name": "GigabitEthernet2", "enabled": false}
        })))
        .mount(&server)
        .await;

    let device = device_at("CSR1", server.address().port());
    let op: Arc<dyn DeviceOperation> =
        Arc::new(RestconfGet::interface(client(), "GigabitEthernet2"));
    let results = dispatcher().run(&[device], op).await;

    match results.get("CSR1").unwrap() {
        Outcome::Success(Payload::Json(value)) => {
            assert_eq!(value, &json!({"name": "GigabitEthernet2", "enabled": false}));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_get_not_found_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("uri-path not found"))
        .mount(&server)
        .await;

    let device = device_at("CSR1", server.address().port());
    let op: Arc<dyn DeviceOperation> = Arc::new(RestconfGet::interface(client(), "Loopback99"));
    let results = dispatcher().run(&[device], op).await;

    let outcome = results.get("CSR1").unwrap();
    assert_eq!(outcome.reason(), Some(FailureReason::ProtocolError));
}

#[tokio::test]
async fn test_get_invalid_json_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let device = device_at("CSR1", server.address().port());
    let op: Arc<dyn DeviceOperation> = Arc::new(RestconfGet::all(client()));
    let results = dispatcher().run(&[device], op).await;

    assert_eq!(
        results.get("CSR1").unwrap().reason(),
        Some(FailureReason::ProtocolError)
    );
}

#[tokio::test]
async fn test_refused_connection_is_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ietf-interfaces:interfaces": {"interface": []}
        })))
        .mount(&server)
        .await;

    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let devices = vec![
        device_at("CSR1", server.address().port()),
        device_at("CSR2", closed_port),
    ];
    let op: Arc<dyn DeviceOperation> = Arc::new(RestconfGet::all(client()));
    let results = dispatcher().run(&devices, op).await;

    assert!(results.get("CSR1").unwrap().is_success());
    assert_eq!(
        results.get("CSR2").unwrap().reason(),
        Some(FailureReason::ConnectionError)
    );
}

#[tokio::test]
async fn test_unsupported_platform_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let device = Arc::new(Device::new("R1", "127.0.0.1", "cisco_iol"));
    let op: Arc<dyn DeviceOperation> = Arc::new(RestconfGet::all(client()));
    let results = dispatcher().run(&[device], op).await;

    assert!(results.is_empty());
    assert_eq!(results.skipped_count(), 1);
}
