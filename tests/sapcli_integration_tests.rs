//! Integration tests for sapcli
//!
//! These tests run the CLI against configuration files in a temp directory

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HOSTAPD_CONF: &str = "\
interface=softap0
ctrl_interface=/var/run/hostapd
ssid=TestAP
channel=6
hw_mode=g
wpa=2
wpa_passphrase=password123
rsn_pairwise=CCMP
";

/// Helper to create a test sapcli command
fn sapcli() -> Command {
    Command::cargo_bin("sapcli").unwrap()
}

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("hostapd.conf"), HOSTAPD_CONF).unwrap();
        fs::write(root.join("qcom_cfg.ini"), "gFixedRate=0\nEND\n").unwrap();

        let config = root.join("sapctl.toml");
        fs::write(
            &config,
            format!(
                r#"
[paths]
hostapd_conf = "{root}/hostapd.conf"
ini = "{root}/qcom_cfg.ini"
hostapd_default = "{root}/hostapd_default.conf"
ini_default = "{root}/qcom_cfg_default.ini"
accept_list = "{root}/hostapd.accept"
deny_list = "{root}/hostapd.deny"
ctrl_client_socket = "{root}/ctrl_client"
daemon_socket = "{root}/sapd.sock"
"#,
                root = root.display()
            ),
        )
        .unwrap();

        Workspace { dir, config }
    }

    fn cmd(&self) -> Command {
        let mut cmd = sapcli();
        cmd.arg("--config").arg(&self.config);
        cmd
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn hostapd(&self) -> String {
        fs::read_to_string(self.path("hostapd.conf")).unwrap()
    }
}

#[test]
fn test_help_command() {
    sapcli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SoftAP Control CLI"));
}

#[test]
fn test_version_command() {
    sapcli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_get_ssid() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["get", "ssid"])
        .assert()
        .success()
        .stdout("success ssid=TestAP\n");
}

#[test]
fn test_set_then_get() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["set", "ssid=Guest"])
        .assert()
        .success()
        .stdout("success\n");

    ws.cmd()
        .args(["get", "ssid"])
        .assert()
        .success()
        .stdout("success ssid=Guest\n");
    assert!(ws.hostapd().contains("ssid=Guest\n"));
}

#[test]
fn test_exec_invalid_request() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["exec", "foo", "bar"])
        .assert()
        .failure()
        .code(1)
        .stdout("failure invalid-request\n");
}

#[test]
fn test_set_unknown_key() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["set", "unknownkey=1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("failure invalid-arg"));
}

#[test]
fn test_exec_channel_policy() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["exec", "set", "channel=13"])
        .assert()
        .success();

    let content = ws.hostapd();
    assert!(content.contains("hw_mode=b\n"));
    assert!(content.contains("channel=13\n"));
}

#[test]
fn test_default_value() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["get", "beacon_int"])
        .assert()
        .success()
        .stdout("success beacon_int=100\n");
}

#[test]
fn test_creates_mac_lists() {
    let ws = Workspace::new();
    ws.cmd().args(["get", "ssid"]).assert().success();
    assert!(ws.path("hostapd.accept").exists());
    assert!(ws.path("hostapd.deny").exists());
}

#[test]
fn test_setup() {
    let ws = Workspace::new();
    ws.cmd()
        .args([
            "setup",
            "--ssid",
            "Guest",
            "--security",
            "wpa-psk",
            "--passphrase",
            "secret123",
            "--channel",
            "11",
        ])
        .assert()
        .success()
        .stdout("success\n");

    let content = ws.hostapd();
    assert!(content.contains("ssid=Guest\n"));
    assert!(content.contains("wpa=1\n"));
    assert!(content.contains("wpa_passphrase=secret123\n"));
    assert!(content.contains("channel=11\n"));
}

#[test]
fn test_setup_reports_failing_step() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["setup", "--ssid", "Guest", "--channel", "500"])
        .assert()
        .failure()
        .stdout("failure invalid-param\n")
        .stderr(predicate::str::contains("channel"));
}

#[test]
fn test_init_writes_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("etc/sapctl.toml");

    sapcli()
        .arg("--config")
        .arg(&config)
        .arg("init")
        .assert()
        .success();

    let content = fs::read_to_string(&config).unwrap();
    assert!(content.contains("[paths]"));
    assert!(content.contains("[lifecycle]"));

    sapcli()
        .arg("--config")
        .arg(&config)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    sapcli()
        .arg("--config")
        .arg(&config)
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_list_commands() {
    sapcli()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("ssid"))
        .stdout(predicate::str::contains("sta_mac_list"));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    sapcli()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["get", "ssid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_remote_without_daemon() {
    let ws = Workspace::new();
    let socket: &Path = &ws.path("sapd.sock");
    ws.cmd()
        .arg("remote")
        .arg("--socket")
        .arg(socket)
        .args(["get", "ssid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("connecting to sapd"));
}
