//! Configuration management for sapctl

use crate::error::{SapError, SapResult};
use crate::store::ConfigFile;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main sapctl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SapConfig {
    /// File and socket locations
    #[serde(default)]
    pub paths: ConfigPaths,
    /// SoftAP process control
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigPaths {
    /// Live hostapd configuration
    #[serde(default = "default_hostapd_conf")]
    pub hostapd_conf: PathBuf,
    /// Live driver ini
    #[serde(default = "default_ini")]
    pub ini: PathBuf,
    /// Factory hostapd configuration used by `reset_to_default`
    #[serde(default = "default_hostapd_default")]
    pub hostapd_default: PathBuf,
    /// Factory driver ini used by `reset_to_default`
    #[serde(default = "default_ini_default")]
    pub ini_default: PathBuf,
    /// Allow list created on first use
    #[serde(default = "default_accept_list")]
    pub accept_list: PathBuf,
    /// Deny list created on first use
    #[serde(default = "default_deny_list")]
    pub deny_list: PathBuf,
    /// Where the control client binds its datagram socket
    #[serde(default = "default_ctrl_client_socket")]
    pub ctrl_client_socket: PathBuf,
    /// Unix socket `sapd` listens on
    #[serde(default = "default_daemon_socket")]
    pub daemon_socket: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// hostapd executable
    #[serde(default = "default_hostapd_bin")]
    pub hostapd_bin: PathBuf,
    /// pid file hostapd writes with `-P`
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
    /// Kernel module providing the SoftAP interface
    #[serde(default = "default_driver_module")]
    pub driver_module: String,
    /// Wait after launching hostapd before checking it is alive (ms)
    #[serde(default = "default_start_settle_ms")]
    pub start_settle_ms: u64,
    /// Maximum wait for hostapd to exit after SIGTERM (ms)
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    /// Control socket reply deadline (ms)
    #[serde(default = "default_ctrl_timeout_ms")]
    pub ctrl_timeout_ms: u64,
}

fn default_hostapd_conf() -> PathBuf {
    PathBuf::from("/data/hostapd/hostapd.conf")
}

fn default_ini() -> PathBuf {
    PathBuf::from("/system/etc/firmware/wlan/qcom_cfg.ini")
}

fn default_hostapd_default() -> PathBuf {
    PathBuf::from("/etc/hostapd/hostapd_default.conf")
}

fn default_ini_default() -> PathBuf {
    PathBuf::from("/system/etc/firmware/wlan/qcom_cfg_default.ini")
}

fn default_accept_list() -> PathBuf {
    PathBuf::from("/data/hostapd/hostapd.accept")
}

fn default_deny_list() -> PathBuf {
    PathBuf::from("/data/hostapd/hostapd.deny")
}

fn default_ctrl_client_socket() -> PathBuf {
    PathBuf::from("/data/hostapd/sapctl_ctrl")
}

fn default_daemon_socket() -> PathBuf {
    PathBuf::from("/run/sapctl/sapd.sock")
}

fn default_hostapd_bin() -> PathBuf {
    PathBuf::from("/usr/sbin/hostapd")
}

fn default_pid_file() -> PathBuf {
    PathBuf::from("/run/sapctl/hostapd.pid")
}

fn default_driver_module() -> String {
    "wlan".to_string()
}

fn default_start_settle_ms() -> u64 {
    2000
}

fn default_stop_timeout_ms() -> u64 {
    5000
}

fn default_ctrl_timeout_ms() -> u64 {
    2000
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            hostapd_conf: default_hostapd_conf(),
            ini: default_ini(),
            hostapd_default: default_hostapd_default(),
            ini_default: default_ini_default(),
            accept_list: default_accept_list(),
            deny_list: default_deny_list(),
            ctrl_client_socket: default_ctrl_client_socket(),
            daemon_socket: default_daemon_socket(),
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            hostapd_bin: default_hostapd_bin(),
            pid_file: default_pid_file(),
            driver_module: default_driver_module(),
            start_settle_ms: default_start_settle_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            ctrl_timeout_ms: default_ctrl_timeout_ms(),
        }
    }
}

impl Default for SapConfig {
    fn default() -> Self {
        Self {
            paths: ConfigPaths::default(),
            lifecycle: LifecycleSettings::default(),
        }
    }
}

impl LifecycleSettings {
    pub fn start_settle(&self) -> Duration {
        Duration::from_millis(self.start_settle_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn ctrl_timeout(&self) -> Duration {
        Duration::from_millis(self.ctrl_timeout_ms)
    }
}

impl SapConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> SapResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| SapError::ConfigError(format!("Failed to read config: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SapResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SapError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| SapError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn hostapd_file(&self) -> ConfigFile {
        ConfigFile::hostapd(&self.paths.hostapd_conf)
    }

    pub fn ini_file(&self) -> ConfigFile {
        ConfigFile::ini(&self.paths.ini)
    }

    /// Make sure the files every command relies on exist.
    ///
    /// Creates the hostapd directory, seeds a missing hostapd file from the
    /// factory default and creates empty allow/deny lists. Existing files are
    /// left untouched.
    pub fn ensure_files(&self) -> SapResult<()> {
        let conf = &self.paths.hostapd_conf;
        if let Some(dir) = conf.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                SapError::ConfigError(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        if !conf.exists() {
            info!("Seeding {:?} from {:?}", conf, self.paths.hostapd_default);
            fs::copy(&self.paths.hostapd_default, conf).map_err(|source| SapError::FileOpen {
                path: self.paths.hostapd_default.clone(),
                source,
            })?;
        }

        for list in [&self.paths.accept_list, &self.paths.deny_list] {
            if !list.exists() {
                debug!("Creating empty MAC list {:?}", list);
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(list)
                    .map_err(|source| SapError::FileOpen {
                        path: list.clone(),
                        source,
                    })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> SapConfig {
        let mut config = SapConfig::default();
        config.paths.hostapd_conf = dir.join("live/hostapd.conf");
        config.paths.hostapd_default = dir.join("hostapd_default.conf");
        config.paths.accept_list = dir.join("live/hostapd.accept");
        config.paths.deny_list = dir.join("live/hostapd.deny");
        config
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SapConfig = toml::from_str(
            r#"
[paths]
hostapd_conf = "/tmp/hostapd.conf"

[lifecycle]
driver_module = "ath6kl"
"#,
        )
        .unwrap();

        assert_eq!(config.paths.hostapd_conf, PathBuf::from("/tmp/hostapd.conf"));
        assert_eq!(config.paths.ini, default_ini());
        assert_eq!(config.lifecycle.driver_module, "ath6kl");
        assert_eq!(config.lifecycle.ctrl_timeout(), Duration::from_secs(2));

        let empty: SapConfig = toml::from_str("").unwrap();
        assert_eq!(empty.paths.daemon_socket, default_daemon_socket());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sapctl.toml");

        let mut config = config_in(dir.path());
        config.lifecycle.stop_timeout_ms = 750;
        config.save(&path).unwrap();

        let loaded = SapConfig::load(&path).unwrap();
        assert_eq!(loaded.paths.hostapd_conf, config.paths.hostapd_conf);
        assert_eq!(loaded.lifecycle.stop_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let err = SapConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SapError::ConfigError(_)));

        let path = dir.path().join("bad.toml");
        fs::write(&path, "[paths\n").unwrap();
        assert!(matches!(
            SapConfig::load(&path).unwrap_err(),
            SapError::ConfigError(_)
        ));
    }

    #[test]
    fn test_ensure_files_seeds_from_default() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        fs::write(&config.paths.hostapd_default, "ssid=Factory\n").unwrap();

        config.ensure_files().unwrap();
        assert_eq!(
            fs::read_to_string(&config.paths.hostapd_conf).unwrap(),
            "ssid=Factory\n"
        );
        assert!(config.paths.accept_list.exists());
        assert!(config.paths.deny_list.exists());

        // an existing file is never overwritten
        fs::write(&config.paths.hostapd_conf, "ssid=Mine\n").unwrap();
        config.ensure_files().unwrap();
        assert_eq!(
            fs::read_to_string(&config.paths.hostapd_conf).unwrap(),
            "ssid=Mine\n"
        );
    }

    #[test]
    fn test_ensure_files_without_default() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let err = config.ensure_files().unwrap_err();
        assert!(matches!(err, SapError::FileOpen { .. }));
    }
}
