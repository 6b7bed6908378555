//! Shared fakes and fixtures for netdispatch integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

use netdispatch::inventory::{Credentials, Device, Inventory};
use netdispatch::operation::{CliConnector, CliTarget, SnmpClient, SnmpResponse, SnmpTarget};
use netdispatch::outcome::TransportError;

/// Three-router lab plus one switch and one server.
pub const LAB_HOSTS: &str = r#"
defaults:
  username: admin
  password: cisco
R1:
  hostname: 172.20.20.11
  platform: cisco_iol
  groups: [core]
R2:
  hostname: 172.20.20.12
  platform: cisco_iol
  groups: [core]
R3:
  hostname: 172.20.20.13
  platform: cisco_iol
  groups: [edge]
SW1:
  hostname: 172.20.20.21
  platform: arista_ceos
  groups: [access]
SRV:
  hostname: 172.20.20.99
  platform: linux
"#;

pub fn lab_inventory() -> Inventory {
    Inventory::from_yaml_str(LAB_HOSTS).unwrap()
}

pub fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

pub fn device(name: &str, platform: &str) -> Arc<Device> {
    Arc::new(
        Device::new(name, format!("{}.lab", name.to_lowercase()), platform)
            .with_credentials(Credentials::new("admin", "cisco")),
    )
}

/// Programmable CLI fake. Each device may be given a reply or an error and
/// an artificial delay; every session attempt is counted.
#[derive(Default)]
pub struct FakeCli {
    replies: Mutex<HashMap<String, Result<String, String>>>,
    delays: Mutex<HashMap<String, Duration>>,
    pub sessions: AtomicUsize,
    pub sent: Mutex<Vec<(String, Vec<String>)>>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeCli {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: &Arc<Self>, device: &str, text: &str) -> Arc<Self> {
        self.replies
            .lock()
            .unwrap()
            .insert(device.to_string(), Ok(text.to_string()));
        Arc::clone(self)
    }

    pub fn refuse(self: &Arc<Self>, device: &str) -> Arc<Self> {
        self.replies
            .lock()
            .unwrap()
            .insert(device.to_string(), Err("connection refused".to_string()));
        Arc::clone(self)
    }

    pub fn delay(self: &Arc<Self>, device: &str, delay: Duration) -> Arc<Self> {
        self.delays
            .lock()
            .unwrap()
            .insert(device.to_string(), delay);
        Arc::clone(self)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    async fn answer(&self, target: &CliTarget, lines: Vec<String>) -> Result<String, TransportError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(&target.name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push((target.name.clone(), lines));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self.replies.lock().unwrap().get(&target.name).cloned();
        match reply {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(TransportError::Connect(e)),
            None => Ok(format!("{}#", target.name)),
        }
    }
}

#[async_trait]
impl CliConnector for FakeCli {
    async fn send_command(
        &self,
        target: &CliTarget,
        command: &str,
    ) -> Result<String, TransportError> {
        self.answer(target, vec![command.to_string()]).await
    }

    async fn send_config(
        &self,
        target: &CliTarget,
        lines: &[String],
    ) -> Result<String, TransportError> {
        self.answer(target, lines.to_vec()).await
    }
}

/// SNMP fake answering from a fixed `oid -> value` table per host.
#[derive(Default)]
pub struct FakeSnmp {
    pub agents: HashMap<String, HashMap<String, String>>,
    pub requests: AtomicUsize,
}

#[async_trait]
impl SnmpClient for FakeSnmp {
    async fn get(&self, target: &SnmpTarget, oids: &[String]) -> SnmpResponse {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let Some(agent) = self.agents.get(&target.host) else {
            return SnmpResponse::indication(netdispatch::operation::ErrorIndication::Timeout(
                format!("no response from {}", target.host),
            ));
        };
        let mut binds = Vec::new();
        for (i, oid) in oids.iter().enumerate() {
            match agent.get(oid) {
                Some(value) => binds.push((oid.clone(), value.clone())),
                None => return SnmpResponse::status("noSuchName", Some(i as u32 + 1)),
            }
        }
        SnmpResponse::bindings(binds)
    }
}
