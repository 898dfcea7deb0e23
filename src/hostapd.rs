//! hostapd and driver lifecycle
//!
//! Loading the driver module, starting and stopping hostapd, and reloading
//! the whole stack so it rereads the hostapd file and the driver ini.

use crate::config::LifecycleSettings;
use crate::error::{SapError, SapResult};
use crate::validation::sanitize_error_message;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// SoftAP process lifecycle
#[cfg_attr(test, mockall::automock)]
pub trait SoftapLifecycle: Send {
    /// Bring the SoftAP up: driver first, then hostapd
    fn load_driver(&self) -> SapResult<()>;
    /// Tear the SoftAP down: hostapd first, then the driver
    fn unload_driver(&self) -> SapResult<()>;
    fn start_softap(&self) -> SapResult<()>;
    fn stop_softap(&self) -> SapResult<()>;
    /// Stop beaconing without unloading anything
    fn stop_bss(&self) -> SapResult<()> {
        self.stop_softap()
    }
    /// Restart so both configuration files are reread
    fn reload_softap(&self) -> SapResult<()>;
    fn is_softap_enabled(&self) -> bool;
}

/// Lifecycle backed by `hostapd -B`, `modprobe` and `rmmod`
pub struct HostapdLifecycle {
    settings: LifecycleSettings,
    conf_path: PathBuf,
}

impl HostapdLifecycle {
    pub fn new(settings: LifecycleSettings, conf_path: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            conf_path: conf_path.into(),
        }
    }

    fn run(&self, program: &Path, args: &[&str]) -> SapResult<()> {
        let cmd = format!("{} {}", program.display(), args.join(" "));
        debug!("Running {}", cmd);

        let output = Command::new(program).args(args).output().map_err(|e| {
            SapError::ServiceError(format!("Failed to execute {}: {}", cmd, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SapError::CommandFailed {
                cmd,
                code: output.status.code(),
                stderr: sanitize_error_message(&stderr),
            });
        }
        Ok(())
    }

    fn running_pid(&self) -> Option<i32> {
        let pid = fs::read_to_string(&self.settings.pid_file).ok()?;
        let pid = pid.trim().parse::<i32>().ok()?;
        Path::new(&format!("/proc/{}", pid)).exists().then_some(pid)
    }
}

impl SoftapLifecycle for HostapdLifecycle {
    fn load_driver(&self) -> SapResult<()> {
        let module = self.settings.driver_module.as_str();
        info!("Loading driver module {}", module);
        self.run(Path::new("modprobe"), &[module])?;
        self.start_softap()
    }

    fn unload_driver(&self) -> SapResult<()> {
        self.stop_softap()?;
        let module = self.settings.driver_module.as_str();
        info!("Unloading driver module {}", module);
        self.run(Path::new("rmmod"), &[module])
    }

    fn start_softap(&self) -> SapResult<()> {
        if self.is_softap_enabled() {
            debug!("hostapd already running");
            return Ok(());
        }

        let pid_file = self.settings.pid_file.to_string_lossy().into_owned();
        let conf = self.conf_path.to_string_lossy().into_owned();
        self.run(&self.settings.hostapd_bin, &["-B", "-P", &pid_file, &conf])?;

        sleep(self.settings.start_settle());

        if !self.is_softap_enabled() {
            return Err(SapError::ServiceError(
                "hostapd process did not start successfully".to_string(),
            ));
        }
        info!("hostapd started with {:?}", self.conf_path);
        Ok(())
    }

    fn stop_softap(&self) -> SapResult<()> {
        let Some(pid) = self.running_pid() else {
            return Ok(());
        };

        self.run(Path::new("kill"), &["-TERM", &pid.to_string()])?;

        let deadline = Instant::now() + self.settings.stop_timeout();
        while Instant::now() < deadline {
            sleep(STOP_POLL_INTERVAL);
            if !self.is_softap_enabled() {
                let _ = fs::remove_file(&self.settings.pid_file);
                info!("hostapd stopped");
                return Ok(());
            }
        }

        warn!("hostapd (pid {}) ignored SIGTERM", pid);
        Err(SapError::Timeout("hostapd did not stop".to_string()))
    }

    fn reload_softap(&self) -> SapResult<()> {
        info!("Reloading SoftAP");
        self.unload_driver()?;
        self.load_driver()
    }

    fn is_softap_enabled(&self) -> bool {
        self.running_pid().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lifecycle(dir: &TempDir) -> HostapdLifecycle {
        let settings = LifecycleSettings {
            pid_file: dir.path().join("hostapd.pid"),
            hostapd_bin: dir.path().join("no-such-hostapd"),
            ..LifecycleSettings::default()
        };
        HostapdLifecycle::new(settings, dir.path().join("hostapd.conf"))
    }

    #[test]
    fn test_not_enabled_without_pid_file() {
        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle(&dir);
        assert!(!lifecycle.is_softap_enabled());
        // stopping a stopped SoftAP is a no-op
        assert!(lifecycle.stop_softap().is_ok());
        assert!(lifecycle.stop_bss().is_ok());
    }

    #[test]
    fn test_enabled_follows_pid() {
        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle(&dir);

        fs::write(dir.path().join("hostapd.pid"), format!("{}\n", std::process::id())).unwrap();
        assert!(lifecycle.is_softap_enabled());

        fs::write(dir.path().join("hostapd.pid"), "garbage").unwrap();
        assert!(!lifecycle.is_softap_enabled());
    }

    #[test]
    fn test_start_missing_binary() {
        let dir = TempDir::new().unwrap();
        let err = lifecycle(&dir).start_softap().unwrap_err();
        assert!(matches!(err, SapError::ServiceError(_)));
    }
}
