//! RESTCONF operations over HTTPS.
//!
//! Both operations address the `ietf-interfaces` YANG tree:
//!
//! ```text
//! {scheme}://{host}:{port}/restconf/data/ietf-interfaces:interfaces[/interface={name}]
//! ```
//!
//! Requests use basic auth and `application/yang-data+json` for both
//! `Content-Type` and `Accept`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{DeviceContext, DeviceOperation};
use crate::error::Result;
use crate::inventory::Device;
use crate::outcome::{Failure, Outcome, Payload};
use crate::platform::TransportKind;

/// YANG-data media type
pub const YANG_JSON: &str = "application/yang-data+json";

/// Top-level key of the interface list document
pub const INTERFACES_KEY: &str = "ietf-interfaces:interfaces";

/// Top-level key of a single interface document
pub const INTERFACE_KEY: &str = "ietf-interfaces:interface";

const INTERFACES_PATH: &str = "restconf/data/ietf-interfaces:interfaces";

/// Statuses a PUT may answer with on success.
const PUT_ACCEPTED: [StatusCode; 3] = [
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::NO_CONTENT,
];

// ============================================================================
// Client
// ============================================================================

/// Connection settings shared by all RESTCONF requests of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestconfSettings {
    /// Port used when the device does not override it
    pub port: u16,
    /// URL scheme
    pub scheme: String,
    /// Validate the device's TLS certificate
    pub validate_certs: bool,
}

impl Default for RestconfSettings {
    fn default() -> Self {
        Self {
            port: 443,
            scheme: "https".to_string(),
            validate_certs: true,
        }
    }
}

/// Shared HTTP client plus settings.
#[derive(Debug, Clone)]
pub struct RestconfClient {
    http: Client,
    settings: RestconfSettings,
}

impl RestconfClient {
    /// Build the client. Certificate validation follows `settings`.
    pub fn new(settings: RestconfSettings) -> Result<Self> {
        let builder = Client::builder();
        let http = if settings.validate_certs {
            builder.build()?
        } else {
            builder.danger_accept_invalid_certs(true).build()?
        };
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &RestconfSettings {
        &self.settings
    }

    /// URL of the interface list, or of one interface when `interface` is set.
    pub fn interfaces_url(&self, device: &Device, interface: Option<&str>) -> String {
        let port = device.params.restconf_port.unwrap_or(self.settings.port);
        let base = format!(
            "{}://{}:{}/{}",
            self.settings.scheme,
            device.address(),
            port,
            INTERFACES_PATH
        );
        match interface {
            Some(name) => format!("{}/interface={}", base, urlencoding::encode(name)),
            None => base,
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        device: &Device,
        timeout: Duration,
    ) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(device.credentials.user(), device.credentials.secret())
            .header(CONTENT_TYPE, YANG_JSON)
            .header(ACCEPT, YANG_JSON)
            .timeout(timeout)
    }
}

/// Map a transport-level reqwest error onto the failure taxonomy.
fn request_failure(err: reqwest::Error) -> Failure {
    if err.is_timeout() {
        Failure::timeout(err.to_string())
    } else if err.is_connect() {
        Failure::connection(err.to_string())
    } else {
        Failure::unexpected(err.to_string())
    }
}

// ============================================================================
// Interface document
// ============================================================================

/// IPv4 address entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Address {
    pub ip: String,
    pub netmask: String,
}

/// Desired state of one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub name: String,
    pub description: String,
    pub if_type: String,
    pub enabled: bool,
    pub ipv4: Option<Ipv4Address>,
}

impl InterfaceConfig {
    /// Loopback with the usual defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "Configured by RESTCONF".to_string(),
            if_type: "iana-if-type:softwareLoopback".to_string(),
            enabled: true,
            ipv4: None,
        }
    }

    pub fn with_ipv4(mut self, ip: impl Into<String>, netmask: impl Into<String>) -> Self {
        self.ipv4 = Some(Ipv4Address {
            ip: ip.into(),
            netmask: netmask.into(),
        });
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_type(mut self, if_type: impl Into<String>) -> Self {
        self.if_type = if_type.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The `ietf-interfaces:interface` request body.
    pub fn body(&self) -> serde_json::Value {
        let doc = InterfaceBody {
            interface: InterfaceDoc {
                name: &self.name,
                description: &self.description,
                if_type: &self.if_type,
                enabled: self.enabled,
                ipv4: self.ipv4.as_ref().map(|addr| Ipv4Doc {
                    address: std::slice::from_ref(addr),
                }),
            },
        };
        serde_json::json!(doc)
    }
}

#[derive(Serialize)]
struct InterfaceBody<'a> {
    #[serde(rename = "ietf-interfaces:interface")]
    interface: InterfaceDoc<'a>,
}

#[derive(Serialize)]
struct InterfaceDoc<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(rename = "type")]
    if_type: &'a str,
    enabled: bool,
    #[serde(rename = "ietf-ip:ipv4", skip_serializing_if = "Option::is_none")]
    ipv4: Option<Ipv4Doc<'a>>,
}

#[derive(Serialize)]
struct Ipv4Doc<'a> {
    address: &'a [Ipv4Address],
}

// ============================================================================
// Operations
// ============================================================================

/// RESTCONF PUT of one interface.
pub struct RestconfPut {
    client: Arc<RestconfClient>,
    interface: InterfaceConfig,
}

impl RestconfPut {
    pub fn new(client: Arc<RestconfClient>, interface: InterfaceConfig) -> Self {
        Self { client, interface }
    }

    async fn put(
        &self,
        ctx: &DeviceContext,
        timeout: Duration,
    ) -> std::result::Result<Payload, Failure> {
        let url = self
            .client
            .interfaces_url(&ctx.device, Some(&self.interface.name));
        debug!(device = %ctx.name(), url = %url, "RESTCONF PUT");

        let response = self
            .client
            .request(reqwest::Method::PUT, &url, &ctx.device, timeout)
            .body(self.interface.body().to_string())
            .send()
            .await
            .map_err(request_failure)?;

        let status = response.status();
        if PUT_ACCEPTED.contains(&status) {
            return Ok(Payload::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(Failure::protocol(format!("HTTP {}: {}", status.as_u16(), body)))
    }
}

#[async_trait]
impl DeviceOperation for RestconfPut {
    fn name(&self) -> &str {
        "restconf-put"
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Restconf
    }

    async fn execute(&self, ctx: &DeviceContext, timeout: Duration) -> Outcome {
        self.put(ctx, timeout).await.into()
    }
}

/// RESTCONF GET of all interfaces, or of one.
pub struct RestconfGet {
    client: Arc<RestconfClient>,
    interface: Option<String>,
}

impl RestconfGet {
    /// GET the whole interface list.
    pub fn all(client: Arc<RestconfClient>) -> Self {
        Self {
            client,
            interface: None,
        }
    }

    /// GET a single interface.
    pub fn interface(client: Arc<RestconfClient>, name: impl Into<String>) -> Self {
        Self {
            client,
            interface: Some(name.into()),
        }
    }

    fn response_key(&self) -> &'static str {
        if self.interface.is_some() {
            INTERFACE_KEY
        } else {
            INTERFACES_KEY
        }
    }

    async fn get(
        &self,
        ctx: &DeviceContext,
        timeout: Duration,
    ) -> std::result::Result<Payload, Failure> {
        let url = self
            .client
            .interfaces_url(&ctx.device, self.interface.as_deref());
        debug!(device = %ctx.name(), url = %url, "RESTCONF GET");

        let response = self
            .client
            .request(reqwest::Method::GET, &url, &ctx.device, timeout)
            .send()
            .await
            .map_err(request_failure)?;

        let status = response.status();
        let body = response.text().await.map_err(request_failure)?;
        if status != StatusCode::OK {
            return Err(Failure::protocol(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let mut document: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Failure::protocol(format!("invalid JSON in response: {}", e)))?;

        let key = self.response_key();
        match document.get_mut(key) {
            Some(value) => Ok(Payload::Json(value.take())),
            None => Err(Failure::protocol(format!("response has no '{}' key", key))),
        }
    }
}

#[async_trait]
impl DeviceOperation for RestconfGet {
    fn name(&self) -> &str {
        "restconf-get"
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Restconf
    }

    async fn execute(&self, ctx: &DeviceContext, timeout: Duration) -> Outcome {
        self.get(ctx, timeout).await.into()
    }
}
