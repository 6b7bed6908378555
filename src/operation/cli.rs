//! CLI operations over SSH.
//!
//! The operations talk to devices through the [`CliConnector`] seam. The
//! production connector, [`RusshCliConnector`], opens one SSH session per
//! call: operational commands run through an `exec` channel, configuration
//! is typed into an interactive shell wrapped in `configure terminal` / `end`.

use async_trait::async_trait;
use russh::client::{self, Handle, Handler};
use russh::keys::key::PublicKey;
use russh::{ChannelMsg, Disconnect};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::{DeviceContext, DeviceOperation};
use crate::outcome::{Failure, Outcome, Payload, TransportError};
use crate::platform::TransportKind;

/// Command used to fetch the running configuration.
pub const SHOW_RUNNING_CONFIG: &str = "show running-config";

/// Canonical platforms `snmp_enable_commands` produces valid syntax for.
pub const SNMP_ENABLE_PLATFORMS: &[&str] = &["cisco_ios"];

/// Markers IOS-style CLIs print when a line is rejected.
const REJECTION_MARKERS: &[&str] = &[
    "% Invalid input",
    "% Incomplete command",
    "% Ambiguous command",
    "% Unknown command",
];

/// Connection parameters for one CLI session.
#[derive(Clone)]
pub struct CliTarget {
    /// Inventory name
    pub name: String,
    /// Address to connect to
    pub host: String,
    /// Port override; `None` uses the connector's default
    pub port: Option<u16>,
    pub username: String,
    pub password: Option<String>,
    /// Canonical CLI dialect (e.g. `cisco_ios`)
    pub platform: String,
    /// Connect / inactivity budget
    pub timeout: Duration,
}

impl CliTarget {
    /// Derive the target from a device context.
    pub fn from_context(ctx: &DeviceContext, timeout: Duration) -> Self {
        Self {
            name: ctx.name().to_string(),
            host: ctx.address().to_string(),
            port: ctx.device.params.ssh_port,
            username: ctx.device.credentials.user().to_string(),
            password: ctx.device.credentials.secret(),
            platform: ctx.canonical_platform.clone(),
            timeout,
        }
    }
}

impl std::fmt::Debug for CliTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliTarget")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("platform", &self.platform)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Seam over the interactive CLI session library.
#[async_trait]
pub trait CliConnector: Send + Sync {
    /// Run one operational command and return its raw output.
    async fn send_command(&self, target: &CliTarget, command: &str)
        -> Result<String, TransportError>;

    /// Enter configuration mode, send `lines`, leave it, and return the
    /// transcript.
    async fn send_config(
        &self,
        target: &CliTarget,
        lines: &[String],
    ) -> Result<String, TransportError>;
}

/// Return the first line the device rejected, as a protocol failure.
fn check_transcript(transcript: &str) -> Result<(), Failure> {
    for line in transcript.lines() {
        let line = line.trim();
        if REJECTION_MARKERS.iter().any(|m| line.starts_with(m)) {
            return Err(Failure::protocol(line.to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// russh connector
// ============================================================================

/// SSH settings for the russh connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    /// Port used when the device does not override it
    pub port: u16,
    /// Accept host keys that are not in known_hosts
    pub accept_unknown_hosts: bool,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: 22,
            accept_unknown_hosts: true,
        }
    }
}

/// Host key policy for device sessions.
struct DeviceKeyPolicy {
    host: String,
    port: u16,
    accept_unknown: bool,
}

#[async_trait]
impl Handler for DeviceKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match russh::keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => Ok(true),
            Ok(false) if self.accept_unknown => {
                debug!(
                    host = %self.host,
                    fingerprint = %server_public_key.fingerprint(),
                    "Accepting unknown device host key"
                );
                Ok(true)
            }
            Ok(false) => {
                warn!(host = %self.host, "Device host key not in known_hosts, rejecting");
                Ok(false)
            }
            Err(e) => {
                warn!(host = %self.host, error = %e, "Device host key verification failed");
                Ok(false)
            }
        }
    }
}

/// [`CliConnector`] backed by russh.
#[derive(Debug, Clone, Default)]
pub struct RusshCliConnector {
    settings: SshSettings,
}

impl RusshCliConnector {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }

    async fn open(&self, target: &CliTarget) -> Result<Handle<DeviceKeyPolicy>, TransportError> {
        let port = target.port.unwrap_or(self.settings.port);
        let mut config = client::Config::default();
        config.inactivity_timeout = Some(target.timeout);

        let addr = format!("{}:{}", target.host, port);
        let socket = tokio::time::timeout(target.timeout, tokio::net::TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::Timeout(format!("connecting to {}", addr)))?
            .map_err(|e| TransportError::Connect(format!("{}: {}", addr, e)))?;

        let handler = DeviceKeyPolicy {
            host: target.host.clone(),
            port,
            accept_unknown: self.settings.accept_unknown_hosts,
        };

        let mut session = client::connect_stream(Arc::new(config), socket, handler)
            .await
            .map_err(|e| TransportError::Connect(format!("SSH handshake failed: {}", e)))?;

        let password = target
            .password
            .as_deref()
            .ok_or_else(|| TransportError::Auth(format!("no password for {}", target.name)))?;
        let authenticated = session
            .authenticate_password(&target.username, password)
            .await
            .map_err(|e| TransportError::Auth(e.to_string()))?;
        if !authenticated {
            return Err(TransportError::Auth(format!(
                "password rejected for user '{}'",
                target.username
            )));
        }

        debug!(device = %target.name, addr = %addr, "SSH session established");
        Ok(session)
    }
}

/// Drain a channel until the device closes it.
async fn read_channel(channel: &mut russh::Channel<client::Msg>) -> (String, Option<u32>) {
    let mut output = Vec::new();
    let mut exit_status = None;

    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => output.extend_from_slice(data),
            ChannelMsg::ExtendedData { ref data, .. } => output.extend_from_slice(data),
            ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
            ChannelMsg::Close => break,
            _ => {}
        }
    }

    (String::from_utf8_lossy(&output).into_owned(), exit_status)
}

fn channel_error(e: russh::Error) -> TransportError {
    TransportError::Protocol(format!("SSH channel error: {}", e))
}

async fn close(session: Handle<DeviceKeyPolicy>) {
    if let Err(e) = session
        .disconnect(Disconnect::ByApplication, "", "en")
        .await
    {
        trace!(error = %e, "Ignoring disconnect error");
    }
}

#[async_trait]
impl CliConnector for RusshCliConnector {
    async fn send_command(
        &self,
        target: &CliTarget,
        command: &str,
    ) -> Result<String, TransportError> {
        let session = self.open(target).await?;
        let mut channel = session.channel_open_session().await.map_err(channel_error)?;
        channel.exec(true, command).await.map_err(channel_error)?;

        let (output, exit_status) = read_channel(&mut channel).await;
        close(session).await;

        match exit_status {
            Some(code) if code != 0 => Err(TransportError::Protocol(format!(
                "'{}' exited with status {}: {}",
                command,
                code,
                output.trim()
            ))),
            _ => Ok(output),
        }
    }

    async fn send_config(
        &self,
        target: &CliTarget,
        lines: &[String],
    ) -> Result<String, TransportError> {
        let session = self.open(target).await?;
        let mut channel = session.channel_open_session().await.map_err(channel_error)?;
        channel
            .request_pty(false, "vt100", 200, 48, 0, 0, &[])
            .await
            .map_err(channel_error)?;
        channel.request_shell(false).await.map_err(channel_error)?;

        let mut script = String::from("terminal length 0\nconfigure terminal\n");
        for line in lines {
            script.push_str(line);
            script.push('\n');
        }
        script.push_str("end\nexit\n");

        channel
            .data(script.as_bytes())
            .await
            .map_err(channel_error)?;

        let (transcript, _) = read_channel(&mut channel).await;
        close(session).await;
        Ok(transcript)
    }
}

// ============================================================================
// Config sources
// ============================================================================

/// Where a config push gets its lines from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicit lines
    Lines(Vec<String>),
    /// One file for every device
    File(PathBuf),
    /// `{dir}/{lowercase device name}.{ext}` with ext chosen by platform
    Directory(PathBuf),
}

/// Config file extension used for a canonical CLI platform.
pub fn config_extension(canonical_platform: &str) -> Option<&'static str> {
    match canonical_platform {
        "cisco_ios" => Some("ios"),
        "arista_eos" => Some("cfg"),
        _ => None,
    }
}

impl ConfigSource {
    /// File backing this source for `ctx`, if any.
    pub fn path_for(&self, ctx: &DeviceContext) -> Result<Option<PathBuf>, Failure> {
        match self {
            ConfigSource::Lines(_) => Ok(None),
            ConfigSource::File(path) => Ok(Some(path.clone())),
            ConfigSource::Directory(dir) => {
                let ext = config_extension(&ctx.canonical_platform).ok_or_else(|| {
                    Failure::config_not_found(format!(
                        "no config file naming known for platform '{}'",
                        ctx.canonical_platform
                    ))
                })?;
                Ok(Some(
                    dir.join(format!("{}.{}", ctx.name().to_lowercase(), ext)),
                ))
            }
        }
    }

    /// Lines to push to `ctx`.
    pub async fn load(&self, ctx: &DeviceContext) -> Result<Vec<String>, Failure> {
        let lines = match (self, self.path_for(ctx)?) {
            (ConfigSource::Lines(lines), _) => lines.clone(),
            (_, Some(path)) => read_config_file(&path).await?,
            (_, None) => Vec::new(),
        };
        if lines.is_empty() {
            return Err(Failure::config_not_found("no configuration lines to push"));
        }
        Ok(lines)
    }
}

async fn read_config_file(path: &Path) -> Result<Vec<String>, Failure> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Failure::config_not_found(format!("{} not found", path.display()))
        } else {
            Failure::unexpected(format!("reading {}: {}", path.display(), e))
        }
    })?;
    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Configuration lines enabling read-only SNMP for one management host.
pub fn snmp_enable_commands(
    acl_host: &str,
    community: &str,
    location: &str,
    contact: &str,
) -> Vec<String> {
    vec![
        format!("access-list 99 permit {}", acl_host),
        format!("snmp-server community {} RO 99", community),
        format!("snmp-server location {}", location),
        format!("snmp-server contact {}", contact),
    ]
}

// ============================================================================
// Operations
// ============================================================================

/// Push configuration lines through an interactive session.
pub struct CliConfigPush {
    connector: Arc<dyn CliConnector>,
    source: ConfigSource,
}

impl CliConfigPush {
    pub fn new(connector: Arc<dyn CliConnector>, source: ConfigSource) -> Self {
        Self { connector, source }
    }

    async fn push(&self, ctx: &DeviceContext, timeout: Duration) -> Result<Payload, Failure> {
        let lines = self.source.load(ctx).await?;
        let target = CliTarget::from_context(ctx, timeout);
        debug!(device = %ctx.name(), lines = lines.len(), "Pushing configuration");

        let transcript = self.connector.send_config(&target, &lines).await?;
        check_transcript(&transcript)?;
        Ok(Payload::Text(transcript))
    }
}

#[async_trait]
impl DeviceOperation for CliConfigPush {
    fn name(&self) -> &str {
        "cli-config-push"
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Cli
    }

    fn preflight(&self, ctx: &DeviceContext) -> Result<(), Failure> {
        match self.source.path_for(ctx)? {
            Some(path) if !path.is_file() => Err(Failure::config_not_found(format!(
                "{} not found",
                path.display()
            ))),
            _ => Ok(()),
        }
    }

    async fn execute(&self, ctx: &DeviceContext, timeout: Duration) -> Outcome {
        self.push(ctx, timeout).await.into()
    }
}

/// Run one operational command.
pub struct CliCommand {
    connector: Arc<dyn CliConnector>,
    command: String,
}

impl CliCommand {
    pub fn new(connector: Arc<dyn CliConnector>, command: impl Into<String>) -> Self {
        Self {
            connector,
            command: command.into(),
        }
    }

    async fn run(&self, ctx: &DeviceContext, timeout: Duration) -> Result<Payload, Failure> {
        let target = CliTarget::from_context(ctx, timeout);
        let output = self.connector.send_command(&target, &self.command).await?;
        check_transcript(&output)?;
        Ok(Payload::Text(output))
    }
}

#[async_trait]
impl DeviceOperation for CliCommand {
    fn name(&self) -> &str {
        "cli-command"
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Cli
    }

    async fn execute(&self, ctx: &DeviceContext, timeout: Duration) -> Outcome {
        self.run(ctx, timeout).await.into()
    }
}

/// Fetch the running configuration, optionally saving it to
/// `{output_dir}/{device}.cfg`.
pub struct FetchConfig {
    connector: Arc<dyn CliConnector>,
    output_dir: Option<PathBuf>,
}

impl FetchConfig {
    pub fn new(connector: Arc<dyn CliConnector>) -> Self {
        Self {
            connector,
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    async fn fetch(&self, ctx: &DeviceContext, timeout: Duration) -> Result<Payload, Failure> {
        let target = CliTarget::from_context(ctx, timeout);
        let config = self
            .connector
            .send_command(&target, SHOW_RUNNING_CONFIG)
            .await?;
        check_transcript(&config)?;
        if config.trim().is_empty() {
            return Err(Failure::protocol("no running configuration"));
        }

        let Some(dir) = &self.output_dir else {
            return Ok(Payload::Text(config));
        };

        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            Failure::unexpected(format!("creating {}: {}", dir.display(), e))
        })?;
        let path = dir.join(format!("{}.cfg", ctx.name()));
        tokio::fs::write(&path, config.as_bytes())
            .await
            .map_err(|e| Failure::unexpected(format!("writing {}: {}", path.display(), e)))?;

        debug!(device = %ctx.name(), path = %path.display(), "Saved running configuration");
        Ok(Payload::Saved {
            path,
            bytes: config.len(),
        })
    }
}

#[async_trait]
impl DeviceOperation for FetchConfig {
    fn name(&self) -> &str {
        "fetch-config"
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Cli
    }

    async fn execute(&self, ctx: &DeviceContext, timeout: Duration) -> Outcome {
        self.fetch(ctx, timeout).await.into()
    }
}
