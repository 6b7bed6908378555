//! Per-device outcomes and the result set of a dispatcher run.
//!
//! An [`Outcome`] is produced exactly once per dispatched device and never
//! changes afterwards. Devices excluded before dispatch because their platform
//! has no registry row are recorded separately as [`Skipped`], never as a
//! failure.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::platform::TransportKind;

// ============================================================================
// Failure taxonomy
// ============================================================================

/// Why a dispatched device failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The transport could not establish a session or socket
    ConnectionError,
    /// The request exceeded its time budget
    Timeout,
    /// The device answered negatively (HTTP status, SNMP error-status, CLI error)
    ProtocolError,
    /// A local config artifact the operation needs is missing
    ConfigNotFound,
    /// Anything else a collaborator surfaced
    UnexpectedError,
}

impl FailureReason {
    /// Plain string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ConnectionError => "connection_error",
            FailureReason::Timeout => "timeout",
            FailureReason::ProtocolError => "protocol_error",
            FailureReason::ConfigNotFound => "config_not_found",
            FailureReason::UnexpectedError => "unexpected_error",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed device: a reason from the taxonomy plus the raw detail text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Failure category
    pub reason: FailureReason,
    /// Raw detail (response body, exception text, ...)
    pub detail: String,
}

impl Failure {
    /// Create a failure.
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn connection(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::ConnectionError, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::Timeout, detail)
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::ProtocolError, detail)
    }

    pub fn config_not_found(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::ConfigNotFound, detail)
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::UnexpectedError, detail)
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.detail)
    }
}

/// Errors raised by the transport seams (`CliConnector`, `SnmpClient`, probes).
///
/// They never leave an operation: the operation converts them into a
/// [`Failure`] through the `From` impl below.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        let reason = match &err {
            TransportError::Connect(_) | TransportError::Auth(_) => FailureReason::ConnectionError,
            TransportError::Timeout(_) => FailureReason::Timeout,
            TransportError::Protocol(_) => FailureReason::ProtocolError,
            TransportError::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                FailureReason::Timeout
            }
            TransportError::Io(_) => FailureReason::ConnectionError,
            TransportError::Other(_) => FailureReason::UnexpectedError,
        };
        Failure::new(reason, err.to_string())
    }
}

// ============================================================================
// Success payloads
// ============================================================================

/// One SNMP variable binding, labelled with the identifier the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarBind {
    /// Identifier as requested (symbolic triple or dotted OID)
    pub identifier: String,
    /// Numeric OID returned by the agent
    pub oid: String,
    /// Rendered value
    pub value: String,
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// What a successful operation hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// Accepted HTTP status of a write
    HttpStatus(u16),
    /// Parsed JSON document
    Json(serde_json::Value),
    /// Raw CLI transcript
    Text(String),
    /// SNMP bindings in request order
    VarBinds(Vec<VarBind>),
    /// Transcript written to disk
    Saved { path: PathBuf, bytes: usize },
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::HttpStatus(code) => write!(f, "HTTP {}", code),
            Payload::Json(value) => write!(f, "{}", value),
            Payload::Text(text) => f.write_str(text.trim_end()),
            Payload::VarBinds(binds) => {
                for (i, bind) in binds.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", bind)?;
                }
                Ok(())
            }
            Payload::Saved { path, bytes } => {
                write!(f, "saved {} bytes to {}", bytes, path.display())
            }
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Terminal result of one device's operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "lowercase")]
pub enum Outcome {
    Success(Payload),
    Failure(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Failure reason, if failed.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Outcome::Failure(f) => Some(f.reason),
            Outcome::Success(_) => None,
        }
    }

    /// Success payload, if succeeded.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Outcome::Success(p) => Some(p),
            Outcome::Failure(_) => None,
        }
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Outcome::Failure(failure)
    }
}

impl From<std::result::Result<Payload, Failure>> for Outcome {
    fn from(result: std::result::Result<Payload, Failure>) -> Self {
        match result {
            Ok(payload) => Outcome::Success(payload),
            Err(failure) => Outcome::Failure(failure),
        }
    }
}

// ============================================================================
// Result set
// ============================================================================

/// A device excluded from dispatch because its platform has no registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub device: String,
    pub platform: String,
    pub transport: TransportKind,
}

/// Outcomes of one dispatcher run, keyed by device name in dispatch order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    /// Operation name
    pub operation: String,
    /// Transport the operation ran over
    pub transport: TransportKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// One entry per dispatched device
    pub entries: IndexMap<String, Outcome>,
    /// Devices excluded for an unsupported platform
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Skipped>,
}

impl ResultSet {
    pub fn new(operation: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            operation: operation.into(),
            transport,
            started_at: Utc::now(),
            finished_at: None,
            entries: IndexMap::new(),
            skipped: Vec::new(),
        }
    }

    /// Record a device's outcome. A second outcome for the same device is
    /// rejected and `false` is returned.
    pub fn record(&mut self, device: impl Into<String>, outcome: Outcome) -> bool {
        let device = device.into();
        if self.entries.contains_key(&device) {
            tracing::warn!(device = %device, "Ignoring second outcome for device");
            return false;
        }
        self.entries.insert(device, outcome);
        true
    }

    /// Record a platform skip.
    pub fn skip(&mut self, skipped: Skipped) {
        self.skipped.push(skipped);
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn get(&self, device: &str) -> Option<&Outcome> {
        self.entries.get(device)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Outcome)> {
        self.entries.iter()
    }

    /// Names of devices in dispatch order.
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn success_count(&self) -> usize {
        self.entries.values().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.values().filter(|o| o.is_failure()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.values().any(Outcome::is_failure)
    }

    /// True when at least one device ran and none failed.
    pub fn all_succeeded(&self) -> bool {
        !self.is_empty() && !self.has_failures()
    }

    /// Failed devices with their failures, in dispatch order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Failure)> {
        self.entries.iter().filter_map(|(name, outcome)| match outcome {
            Outcome::Failure(f) => Some((name.as_str(), f)),
            Outcome::Success(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_mapping() {
        let f: Failure = TransportError::Connect("refused".into()).into();
        assert_eq!(f.reason, FailureReason::ConnectionError);

        let f: Failure = TransportError::Auth("bad password".into()).into();
        assert_eq!(f.reason, FailureReason::ConnectionError);

        let f: Failure = TransportError::Timeout("10s".into()).into();
        assert_eq!(f.reason, FailureReason::Timeout);

        let f: Failure = TransportError::Protocol("% Invalid input".into()).into();
        assert_eq!(f.reason, FailureReason::ProtocolError);
        assert_eq!(f.detail, "% Invalid input");

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        let f: Failure = TransportError::from(io).into();
        assert_eq!(f.reason, FailureReason::Timeout);

        let f: Failure = TransportError::Other("boom".into()).into();
        assert_eq!(f.reason, FailureReason::UnexpectedError);
    }

    #[test]
    fn test_result_set_records_once() {
        let mut set = ResultSet::new("cli-command", TransportKind::Cli);
        assert!(set.record("R1", Outcome::Success(Payload::Text("ok".into()))));
        assert!(!set.record("R1", Failure::timeout("late").into()));
        assert_eq!(set.len(), 1);
        assert!(set.get("R1").is_some_and(Outcome::is_success));
    }

    #[test]
    fn test_result_set_counts_and_order() {
        let mut set = ResultSet::new("snmp-get", TransportKind::Snmp);
        set.record("R3", Outcome::Success(Payload::VarBinds(vec![])));
        set.record("R1", Failure::connection("refused").into());
        set.record("R2", Outcome::Success(Payload::HttpStatus(204)));
        set.skip(Skipped {
            device: "SW9".into(),
            platform: "linux".into(),
            transport: TransportKind::Snmp,
        });

        assert_eq!(set.devices().collect::<Vec<_>>(), vec!["R3", "R1", "R2"]);
        assert_eq!(set.success_count(), 2);
        assert_eq!(set.failure_count(), 1);
        assert_eq!(set.skipped_count(), 1);
        assert!(set.has_failures());
        assert!(!set.all_succeeded());
        assert_eq!(set.failures().map(|(d, _)| d).collect::<Vec<_>>(), vec!["R1"]);
    }

    #[test]
    fn test_empty_result_set_is_not_success() {
        let set = ResultSet::new("restconf-get", TransportKind::Restconf);
        assert!(!set.all_succeeded());
        assert!(!set.has_failures());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = Outcome::Failure(Failure::config_not_found("configs/r1.ios"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["result"]["reason"], "config_not_found");

        let outcome = Outcome::Success(Payload::HttpStatus(201));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["result"]["kind"], "http_status");
        assert_eq!(json["result"]["value"], 201);
    }

    #[test]
    fn test_payload_display() {
        let binds = Payload::VarBinds(vec![
            VarBind {
                identifier: "SNMPv2-MIB,sysName,0".into(),
                oid: "1.3.6.1.2.1.1.5.0".into(),
                value: "R1".into(),
            },
            VarBind {
                identifier: "1.3.6.1.2.1.1.3.0".into(),
                oid: "1.3.6.1.2.1.1.3.0".into(),
                value: "12345".into(),
            },
        ]);
        assert_eq!(
            binds.to_string(),
            "1.3.6.1.2.1.1.5.0 = R1\n1.3.6.1.2.1.1.3.0 = 12345"
        );
        assert_eq!(Payload::HttpStatus(204).to_string(), "HTTP 204");
    }
}
