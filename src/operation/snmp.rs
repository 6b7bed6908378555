//! SNMP GET.
//!
//! Identifiers are given either as a `MODULE,object,instance` triple, as the
//! `object.instance` shorthand, or as a literal dotted OID. Symbolic names are
//! resolved against a small built-in table covering the SNMPv2-MIB system
//! group and `IF-MIB::ifNumber`; resolution happens before any packet is sent.
//!
//! The [`SnmpClient`] seam mirrors the classic `(error_indication,
//! error_status, error_index, var_binds)` result so the three outcomes stay
//! distinct: transport trouble, an agent-reported error, or bindings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{DeviceContext, DeviceOperation};
use crate::outcome::{Failure, Outcome, Payload, VarBind};
use crate::platform::TransportKind;

/// `(module, object) -> OID prefix`
const MIB_TABLE: &[(&str, &str, &str)] = &[
    ("SNMPv2-MIB", "sysDescr", "1.3.6.1.2.1.1.1"),
    ("SNMPv2-MIB", "sysObjectID", "1.3.6.1.2.1.1.2"),
    ("SNMPv2-MIB", "sysUpTime", "1.3.6.1.2.1.1.3"),
    ("SNMPv2-MIB", "sysContact", "1.3.6.1.2.1.1.4"),
    ("SNMPv2-MIB", "sysName", "1.3.6.1.2.1.1.5"),
    ("SNMPv2-MIB", "sysLocation", "1.3.6.1.2.1.1.6"),
    ("SNMPv2-MIB", "sysServices", "1.3.6.1.2.1.1.7"),
    ("IF-MIB", "ifNumber", "1.3.6.1.2.1.2.1"),
];

// ============================================================================
// Identifiers
// ============================================================================

/// An object to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectIdentifier {
    /// `(module, object, instance)`; module may be empty for the shorthand
    Symbolic {
        module: String,
        object: String,
        instance: String,
    },
    /// Literal dotted OID
    Numeric(String),
}

impl ObjectIdentifier {
    /// Symbolic identifier.
    pub fn symbolic(
        module: impl Into<String>,
        object: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        ObjectIdentifier::Symbolic {
            module: module.into(),
            object: object.into(),
            instance: instance.into(),
        }
    }

    /// Resolve to a dotted numeric OID.
    pub fn resolve(&self) -> Result<String, String> {
        match self {
            ObjectIdentifier::Numeric(oid) => {
                let oid = oid.trim_start_matches('.');
                let valid = !oid.is_empty()
                    && oid
                        .split('.')
                        .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()));
                if valid {
                    Ok(oid.to_string())
                } else {
                    Err(format!("'{}' is not a valid OID", oid))
                }
            }
            ObjectIdentifier::Symbolic {
                module,
                object,
                instance,
            } => {
                let prefix = MIB_TABLE
                    .iter()
                    .find(|(m, o, _)| {
                        *o == object.as_str() && (module.is_empty() || *m == module.as_str())
                    })
                    .map(|(_, _, oid)| *oid)
                    .ok_or_else(|| format!("unknown MIB object {}", self))?;
                let instance = instance.trim_start_matches('.');
                if instance.is_empty() {
                    Ok(prefix.to_string())
                } else {
                    Ok(format!("{}.{}", prefix, instance))
                }
            }
        }
    }
}

impl FromStr for ObjectIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty object identifier".to_string());
        }

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if let [module, object, instance] = parts.as_slice() {
            return Ok(ObjectIdentifier::symbolic(*module, *object, *instance));
        }

        if s.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (object, instance) = s.split_once('.').unwrap_or((s, ""));
            return Ok(ObjectIdentifier::symbolic("", object, instance));
        }

        Ok(ObjectIdentifier::Numeric(s.to_string()))
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectIdentifier::Numeric(oid) => f.write_str(oid),
            ObjectIdentifier::Symbolic {
                module,
                object,
                instance,
            } => {
                if !module.is_empty() {
                    write!(f, "{}::", module)?;
                }
                f.write_str(object)?;
                if !instance.is_empty() {
                    write!(f, ".{}", instance)?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// Client seam
// ============================================================================

/// SNMP settings shared by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpSettings {
    /// Agent port used when the device does not override it
    pub port: u16,
    /// Community used when the device does not override it
    pub community: String,
    /// Retransmissions after the first request
    pub retries: u32,
}

impl Default for SnmpSettings {
    fn default() -> Self {
        Self {
            port: 161,
            community: "public".to_string(),
            retries: 0,
        }
    }
}

/// Agent endpoint and credentials for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpTarget {
    pub host: String,
    pub port: u16,
    pub community: String,
    pub timeout: Duration,
    pub retries: u32,
}

/// Transport-level problem; no response was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorIndication {
    Timeout(String),
    Unreachable(String),
    Other(String),
}

/// Agent-reported error for the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpErrorStatus {
    /// Status name, e.g. `noSuchName`
    pub status: String,
    /// 1-based index of the offending binding, when known
    pub index: Option<u32>,
}

/// Raw result of one GET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnmpResponse {
    pub error_indication: Option<ErrorIndication>,
    pub error_status: Option<SnmpErrorStatus>,
    /// `(oid, value)` pairs as returned
    pub var_binds: Vec<(String, String)>,
}

impl SnmpResponse {
    pub fn bindings(var_binds: Vec<(String, String)>) -> Self {
        Self {
            var_binds,
            ..Default::default()
        }
    }

    pub fn indication(indication: ErrorIndication) -> Self {
        Self {
            error_indication: Some(indication),
            ..Default::default()
        }
    }

    pub fn status(status: impl Into<String>, index: Option<u32>) -> Self {
        Self {
            error_status: Some(SnmpErrorStatus {
                status: status.into(),
                index,
            }),
            ..Default::default()
        }
    }
}

/// Seam over the SNMP protocol library.
#[async_trait]
pub trait SnmpClient: Send + Sync {
    /// Issue one GET carrying every OID in `oids`.
    async fn get(&self, target: &SnmpTarget, oids: &[String]) -> SnmpResponse;
}

/// [`SnmpClient`] backed by `async-snmp`, community v2c.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncSnmpClient;

#[async_trait]
impl SnmpClient for AsyncSnmpClient {
    async fn get(&self, target: &SnmpTarget, oids: &[String]) -> SnmpResponse {
        use async_snmp::{Auth, Client, Oid, Retry};

        let mut parsed = Vec::with_capacity(oids.len());
        for oid in oids {
            match Oid::parse(oid) {
                Ok(oid) => parsed.push(oid),
                Err(e) => return SnmpResponse::status(format!("badValue: {}", e), None),
            }
        }

        let addr = format!("{}:{}", target.host, target.port);
        let client = match Client::builder(addr.clone(), Auth::v2c(target.community.clone()))
            .timeout(target.timeout)
            .retry(Retry::fixed(target.retries, Duration::ZERO))
            .connect()
            .await
        {
            Ok(client) => client,
            Err(e) => {
                return SnmpResponse::indication(ErrorIndication::Unreachable(format!(
                    "{}: {}",
                    addr, e
                )))
            }
        };

        match client.get_many(&parsed).await {
            Ok(binds) => SnmpResponse::bindings(
                binds
                    .into_iter()
                    .map(|vb| (vb.oid.to_string(), vb.value.to_string()))
                    .collect(),
            ),
            Err(e) => response_from_error(&e),
        }
    }
}

/// Split an `async-snmp` failure into indication or agent status.
fn response_from_error(err: &async_snmp::Error) -> SnmpResponse {
    use async_snmp::Error;

    match err {
        Error::Snmp { status, index, .. } => SnmpResponse::status(status.to_string(), Some(*index)),
        Error::Timeout { .. } => SnmpResponse::indication(ErrorIndication::Timeout(err.to_string())),
        Error::Network { .. } => {
            SnmpResponse::indication(ErrorIndication::Unreachable(err.to_string()))
        }
        _ => SnmpResponse::indication(ErrorIndication::Other(err.to_string())),
    }
}

// ============================================================================
// Operation
// ============================================================================

/// SNMP GET of one or more identifiers in a single request.
pub struct SnmpGet {
    client: Arc<dyn SnmpClient>,
    settings: SnmpSettings,
    identifiers: Vec<(String, ObjectIdentifier)>,
}

impl SnmpGet {
    /// Build from identifier strings; the given strings label the results.
    pub fn new<I, S>(client: Arc<dyn SnmpClient>, settings: SnmpSettings, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identifiers = identifiers
            .into_iter()
            .map(|s| {
                let raw = s.as_ref().trim().to_string();
                let parsed = raw
                    .parse()
                    .unwrap_or_else(|_| ObjectIdentifier::Numeric(raw.clone()));
                (raw, parsed)
            })
            .collect();
        Self {
            client,
            settings,
            identifiers,
        }
    }

    fn target(&self, ctx: &DeviceContext, timeout: Duration) -> SnmpTarget {
        let params = &ctx.device.params;
        SnmpTarget {
            host: ctx.address().to_string(),
            port: params.snmp_port.unwrap_or(self.settings.port),
            community: params
                .snmp_community
                .clone()
                .unwrap_or_else(|| self.settings.community.clone()),
            timeout,
            retries: self.settings.retries,
        }
    }

    fn resolve_all(&self) -> Result<Vec<String>, Failure> {
        if self.identifiers.is_empty() {
            return Err(Failure::protocol("no object identifiers requested"));
        }
        self.identifiers
            .iter()
            .map(|(raw, id)| {
                id.resolve()
                    .map_err(|e| Failure::protocol(format!("{}: {}", raw, e)))
            })
            .collect()
    }

    async fn get(&self, ctx: &DeviceContext, timeout: Duration) -> Result<Payload, Failure> {
        let oids = self.resolve_all()?;
        let target = self.target(ctx, timeout);
        debug!(device = %ctx.name(), oids = ?oids, "SNMP GET");

        let response = self.client.get(&target, &oids).await;

        if let Some(indication) = response.error_indication {
            return Err(match indication {
                ErrorIndication::Timeout(detail) => Failure::timeout(detail),
                ErrorIndication::Unreachable(detail) | ErrorIndication::Other(detail) => {
                    Failure::connection(detail)
                }
            });
        }

        if let Some(status) = response.error_status {
            let at = status
                .index
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| self.identifiers.get(i as usize))
                .map(|(raw, _)| format!(" at {}", raw))
                .unwrap_or_default();
            return Err(Failure::protocol(format!("{}{}", status.status, at)));
        }

        if response.var_binds.len() != self.identifiers.len() {
            return Err(Failure::protocol(format!(
                "requested {} objects, agent returned {}",
                self.identifiers.len(),
                response.var_binds.len()
            )));
        }

        let binds = self
            .identifiers
            .iter()
            .zip(response.var_binds)
            .map(|((raw, _), (oid, value))| VarBind {
                identifier: raw.clone(),
                oid,
                value,
            })
            .collect();
        Ok(Payload::VarBinds(binds))
    }
}

#[async_trait]
impl DeviceOperation for SnmpGet {
    fn name(&self) -> &str {
        "snmp-get"
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Snmp
    }

    fn preflight(&self, _ctx: &DeviceContext) -> Result<(), Failure> {
        self.resolve_all().map(|_| ())
    }

    async fn execute(&self, ctx: &DeviceContext, timeout: Duration) -> Outcome {
        self.get(ctx, timeout).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Device, TransportParams};
    use crate::outcome::FailureReason;
    use std::sync::Mutex;

    struct CannedClient {
        response: SnmpResponse,
        seen: Mutex<Vec<(SnmpTarget, Vec<String>)>>,
    }

    impl CannedClient {
        fn new(response: SnmpResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SnmpClient for CannedClient {
        async fn get(&self, target: &SnmpTarget, oids: &[String]) -> SnmpResponse {
            self.seen
                .lock()
                .unwrap()
                .push((target.clone(), oids.to_vec()));
            self.response.clone()
        }
    }

    fn ctx() -> DeviceContext {
        let device = Device::new("RTR", "172.20.20.2", "cisco_iol").with_params(TransportParams {
            snmp_community: Some("labro".into()),
            ..Default::default()
        });
        DeviceContext::new(Arc::new(device), "cisco_ios", TransportKind::Snmp)
    }

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn test_parse_identifiers() {
        assert_eq!(
            "SNMPv2-MIB, sysDescr, 0".parse::<ObjectIdentifier>().unwrap(),
            ObjectIdentifier::symbolic("SNMPv2-MIB", "sysDescr", "0")
        );
        assert_eq!(
            "sysName.0".parse::<ObjectIdentifier>().unwrap(),
            ObjectIdentifier::symbolic("", "sysName", "0")
        );
        assert_eq!(
            "1.3.6.1.2.1.1.3.0".parse::<ObjectIdentifier>().unwrap(),
            ObjectIdentifier::Numeric("1.3.6.1.2.1.1.3.0".into())
        );
        assert!("".parse::<ObjectIdentifier>().is_err());
    }

    #[test]
    fn test_resolve_identifiers() {
        let id: ObjectIdentifier = "SNMPv2-MIB,sysUpTime,0".parse().unwrap();
        assert_eq!(id.resolve().unwrap(), "1.3.6.1.2.1.1.3.0");

        let id: ObjectIdentifier = "ifNumber.0".parse().unwrap();
        assert_eq!(id.resolve().unwrap(), "1.3.6.1.2.1.2.1.0");

        let id: ObjectIdentifier = ".1.3.6.1.2.1.1.5.0".parse().unwrap();
        assert_eq!(id.resolve().unwrap(), "1.3.6.1.2.1.1.5.0");

        let id: ObjectIdentifier = "IF-MIB,sysDescr,0".parse().unwrap();
        assert!(id.resolve().is_err());

        let id: ObjectIdentifier = "1.3.x.6".parse().unwrap();
        assert!(id.resolve().is_err());
    }

    #[tokio::test]
    async fn test_multi_oid_in_request_order() {
        let client = CannedClient::new(SnmpResponse::bindings(vec![
            ("1.3.6.1.2.1.1.1.0".into(), "Cisco IOS Software".into()),
            ("1.3.6.1.2.1.1.5.0".into(), "RTR".into()),
            ("1.3.6.1.2.1.1.3.0".into(), "123456".into()),
        ]));
        let op = SnmpGet::new(
            client.clone(),
            SnmpSettings::default(),
            ["sysDescr.0", "sysName.0", "sysUpTime.0"],
        );

        let outcome = op.execute(&ctx(), TIMEOUT).await;
        let Some(Payload::VarBinds(binds)) = outcome.payload() else {
            panic!("expected var binds, got {:?}", outcome);
        };
        let ids: Vec<_> = binds.iter().map(|b| b.identifier.as_str()).collect();
        assert_eq!(ids, vec!["sysDescr.0", "sysName.0", "sysUpTime.0"]);
        assert_eq!(binds[1].value, "RTR");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (target, oids) = &seen[0];
        assert_eq!(target.community, "labro");
        assert_eq!(target.port, 161);
        assert_eq!(
            oids,
            &vec![
                "1.3.6.1.2.1.1.1.0".to_string(),
                "1.3.6.1.2.1.1.5.0".to_string(),
                "1.3.6.1.2.1.1.3.0".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_indication_and_status_are_distinct() {
        let op = SnmpGet::new(
            CannedClient::new(SnmpResponse::indication(ErrorIndication::Timeout(
                "no response".into(),
            ))),
            SnmpSettings::default(),
            ["sysDescr.0"],
        );
        assert_eq!(
            op.execute(&ctx(), TIMEOUT).await.reason(),
            Some(FailureReason::Timeout)
        );

        let op = SnmpGet::new(
            CannedClient::new(SnmpResponse::indication(ErrorIndication::Unreachable(
                "no route".into(),
            ))),
            SnmpSettings::default(),
            ["sysDescr.0"],
        );
        assert_eq!(
            op.execute(&ctx(), TIMEOUT).await.reason(),
            Some(FailureReason::ConnectionError)
        );

        let op = SnmpGet::new(
            CannedClient::new(SnmpResponse::status("noSuchName", Some(2))),
            SnmpSettings::default(),
            ["sysDescr.0", "1.3.6.1.4.1.9.9.999.0"],
        );
        let outcome = op.execute(&ctx(), TIMEOUT).await;
        let Outcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.reason, FailureReason::ProtocolError);
        assert_eq!(failure.detail, "noSuchName at 1.3.6.1.4.1.9.9.999.0");
    }

    #[tokio::test]
    async fn test_unknown_symbol_sends_nothing() {
        let client = CannedClient::new(SnmpResponse::default());
        let op = SnmpGet::new(client.clone(), SnmpSettings::default(), ["SNMPv2-MIB,sysFoo,0"]);

        assert!(op.preflight(&ctx()).is_err());
        let outcome = op.execute(&ctx(), TIMEOUT).await;
        assert_eq!(outcome.reason(), Some(FailureReason::ProtocolError));
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_binding_count_mismatch() {
        let op = SnmpGet::new(
            CannedClient::new(SnmpResponse::bindings(vec![(
                "1.3.6.1.2.1.1.1.0".into(),
                "x".into(),
            )])),
            SnmpSettings::default(),
            ["sysDescr.0", "sysName.0"],
        );
        assert_eq!(
            op.execute(&ctx(), TIMEOUT).await.reason(),
            Some(FailureReason::ProtocolError)
        );
    }

    #[test]
    fn test_library_error_status_keeps_index() {
        let agent: std::net::SocketAddr = "192.0.2.10:161".parse().unwrap();
        let err = async_snmp::Error::Snmp {
            target: agent,
            status: async_snmp::ErrorStatus::NoSuchName,
            index: 2,
            oid: None,
        };

        let response = response_from_error(&err);
        assert!(response.error_indication.is_none());
        assert_eq!(
            response.error_status,
            Some(SnmpErrorStatus {
                status: "noSuchName".into(),
                index: Some(2),
            })
        );
    }

    #[test]
    fn test_library_timeout_is_indication() {
        let err = async_snmp::Error::Timeout {
            target: "192.0.2.10:161".parse().unwrap(),
            elapsed: Duration::from_secs(2),
            retries: 1,
        };

        let response = response_from_error(&err);
        assert!(matches!(
            response.error_indication,
            Some(ErrorIndication::Timeout(_))
        ));
        assert!(response.error_status.is_none());
    }

    #[tokio::test]
    async fn test_library_status_names_offending_identifier() {
        let err = async_snmp::Error::Snmp {
            target: "192.0.2.10:161".parse().unwrap(),
            status: async_snmp::ErrorStatus::NoSuchName,
            index: 2,
            oid: None,
        };
        let op = SnmpGet::new(
            CannedClient::new(response_from_error(&err)),
            SnmpSettings::default(),
            ["sysDescr.0", "SNMPv2-MIB,sysName,0"],
        );

        let Outcome::Failure(failure) = op.execute(&ctx(), TIMEOUT).await else {
            panic!("expected failure");
        };
        assert_eq!(failure.detail, "noSuchName at SNMPv2-MIB,sysName,0");
    }
}
