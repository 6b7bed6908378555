//! CLI tests for netdispatch
//!
//! Exercises the binary with assert_cmd. Nothing here reaches a real
//! device: every command either stops before dispatch or only reads the
//! inventory.

mod common;

use assert_cmd::Command;
use common::{write_temp, LAB_HOSTS};
use predicates::prelude::*;
use tempfile::tempdir;

// Helper to get a command for testing, isolated from the caller's
// environment and working directory.
fn netdispatch_cmd(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("netdispatch").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("NETDISPATCH_CONFIG")
        .env_remove("NETDISPATCH_INVENTORY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let dir = tempdir().unwrap();
    netdispatch_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("interface-set"))
        .stdout(predicate::str::contains("snmp-get"))
        .stdout(predicate::str::contains("check-connectivity"));
}

#[test]
fn test_version() {
    let dir = tempdir().unwrap();
    netdispatch_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_list_devices() {
    let dir = tempdir().unwrap();
    let hosts = write_temp(".yaml", LAB_HOSTS);
    netdispatch_cmd(dir.path())
        .args(["-i", hosts.path().to_str().unwrap(), "list-devices"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::contains("arista_eos"))
        .stdout(predicate::str::is_match(r"SRV\s+172\.20\.20\.99\s+linux\s+-\s+-\s+-").unwrap());
}

#[test]
fn test_list_devices_json_with_group() {
    let dir = tempdir().unwrap();
    let hosts = write_temp(".yaml", LAB_HOSTS);
    let output = netdispatch_cmd(dir.path())
        .args([
            "-i",
            hosts.path().to_str().unwrap(),
            "--group",
            "core",
            "--output",
            "json",
            "list-devices",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["R1", "R2"]);
    assert_eq!(listed[0]["snmp"], "cisco_ios");
}

#[test]
fn test_inventory_from_config_file() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("hosts.yaml"), LAB_HOSTS).unwrap();
    std::fs::write(
        dir.path().join("netdispatch.toml"),
        "[defaults]\ninventory = \"hosts.yaml\"\n",
    )
    .unwrap();

    netdispatch_cmd(dir.path())
        .arg("list-devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("SW1"));
}

#[test]
fn test_missing_inventory_exit_code() {
    let dir = tempdir().unwrap();
    netdispatch_cmd(dir.path())
        .args(["-i", "does-not-exist.yaml", "list-devices"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Failed to load inventory"));
}

#[test]
fn test_invalid_config_exit_code() {
    let dir = tempdir().unwrap();
    let config = write_temp(".toml", "[defaults\nforks = ");
    netdispatch_cmd(dir.path())
        .args(["-c", config.path().to_str().unwrap(), "list-devices"])
        .assert()
        .code(4);
}

#[test]
fn test_empty_selection_exit_code() {
    let dir = tempdir().unwrap();
    let hosts = write_temp(".yaml", LAB_HOSTS);
    netdispatch_cmd(dir.path())
        .args([
            "-i",
            hosts.path().to_str().unwrap(),
            "--limit",
            "R99",
            "command",
            "show version",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No devices selected"));
}

#[test]
fn test_strict_platforms_exit_code() {
    let dir = tempdir().unwrap();
    let hosts = write_temp(".yaml", LAB_HOSTS);
    netdispatch_cmd(dir.path())
        .args([
            "-i",
            hosts.path().to_str().unwrap(),
            "--strict-platforms",
            "command",
            "show version",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported platform 'linux'"));
}

#[test]
fn test_unknown_snmp_identifier_rejected() {
    let dir = tempdir().unwrap();
    let hosts = write_temp(".yaml", LAB_HOSTS);
    netdispatch_cmd(dir.path())
        .args([
            "-i",
            hosts.path().to_str().unwrap(),
            "snmp-get",
            "SNMPv2-MIB,sysBogus,0",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid request"));
}

#[test]
fn test_invalid_interface_address_rejected() {
    let dir = tempdir().unwrap();
    let hosts = write_temp(".yaml", LAB_HOSTS);
    netdispatch_cmd(dir.path())
        .args([
            "-i",
            hosts.path().to_str().unwrap(),
            "interface-set",
            "--interface",
            "Loopback0",
            "--ip",
            "172.16.1.999",
            "--netmask",
            "255.255.255.0",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid IPv4 address"));
}

#[test]
fn test_check_connectivity_names_unreachable_devices() {
    let dir = tempdir().unwrap();
    let hosts = write_temp(
        ".yaml",
        "R1:\n  hostname: 192.0.2.1\n  platform: cisco_iol\nR2:\n  hostname: 192.0.2.2\n  platform: cisco_iol\n",
    );
    netdispatch_cmd(dir.path())
        .args([
            "-i",
            hosts.path().to_str().unwrap(),
            "check-connectivity",
            "--wait",
            "1",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("unreachable: [R1]"))
        .stdout(predicate::str::contains("unreachable: [R2]"))
        .stderr(predicate::str::contains("Unreachable"))
        .stderr(predicate::str::contains(
            "No devices reachable - check routing configuration",
        ));
}
