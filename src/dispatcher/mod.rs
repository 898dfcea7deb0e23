//! Command dispatcher
//!
//! Turns one request line into one response line: parse the verb, resolve
//! the command, validate the value and route it to its read or write
//! handler. Errors never escape; each is reported as its failure code.

mod get;
mod set;


use crate::config::SapConfig;
use crate::ctrl::{HostapdControl, UnixControlClient};
use crate::driver::{IoctlDriver, SoftapDriver};
use crate::error::{SapError, SapResult};
use crate::hostapd::{HostapdLifecycle, SoftapLifecycle};
use crate::protocol::{split_request, Response, Verb};
use crate::registry::{lookup, CommandDescriptor, InternalKey, Validator};
use crate::store::{CommentPolicy, ConfigFile, FileKind, WriteOutcome};
use tracing::{debug, warn};

/// Single-owner command handler
pub struct Dispatcher {
    config: SapConfig,
    hostapd: ConfigFile,
    ini: ConfigFile,
    driver: Box<dyn SoftapDriver>,
    control: Box<dyn HostapdControl>,
    lifecycle: Box<dyn SoftapLifecycle>,
    /// The driver ini changed since the last reload
    reload_pending: bool,
}

impl Dispatcher {
    pub fn new(
        config: SapConfig,
        driver: Box<dyn SoftapDriver>,
        control: Box<dyn HostapdControl>,
        lifecycle: Box<dyn SoftapLifecycle>,
    ) -> Self {
        Self {
            hostapd: config.hostapd_file(),
            ini: config.ini_file(),
            config,
            driver,
            control,
            lifecycle,
            reload_pending: false,
        }
    }

    /// Dispatcher wired to the real driver, control socket and hostapd
    pub fn from_config(config: SapConfig) -> Self {
        let control = UnixControlClient::new(&config.paths.ctrl_client_socket)
            .with_timeout(config.lifecycle.ctrl_timeout());
        let lifecycle =
            HostapdLifecycle::new(config.lifecycle.clone(), &config.paths.hostapd_conf);

        Self::new(
            config,
            Box::new(IoctlDriver::new()),
            Box::new(control),
            Box::new(lifecycle),
        )
    }

    pub fn config(&self) -> &SapConfig {
        &self.config
    }

    pub fn reload_pending(&self) -> bool {
        self.reload_pending
    }

    /// Handle one request line
    pub fn execute(&mut self, line: &str) -> Response {
        let line = line.trim_end_matches(['\r', '\n']);
        debug!("request: {}", line);

        let response = match self.handle(line) {
            Ok(response) => response,
            Err(e) => {
                warn!("'{}' failed: {}", line, e);
                Response::Failure(e.failure_code())
            }
        };

        debug!("response: {}", response);
        response
    }

    fn handle(&mut self, line: &str) -> SapResult<Response> {
        if let Err(e) = self.config.ensure_files() {
            warn!("Could not prepare configuration files: {}", e);
        }

        let (verb, args) = split_request(line)
            .ok_or_else(|| SapError::InvalidRequest(format!("not a get or set request: {}", line)))?;

        match verb {
            Verb::Get => {
                let descriptor = lookup(args)
                    .ok_or_else(|| SapError::InvalidParameter(format!("unknown command {}", args)))?;
                if !descriptor.handler.readable() {
                    return Err(SapError::InvalidArgument(format!(
                        "{} cannot be read",
                        descriptor.name
                    )));
                }
                let value = self.read(descriptor)?;
                Ok(Response::value(descriptor.name, value))
            }
            Verb::Set => {
                let descriptor = lookup(args)
                    .ok_or_else(|| SapError::InvalidArgument(format!("unknown command {}", args)))?;
                if !descriptor.handler.writable() {
                    return Err(SapError::InvalidArgument(format!(
                        "{} is read-only",
                        descriptor.name
                    )));
                }
                let value = set_value(descriptor, args)?;
                self.write(descriptor, &value)
            }
        }
    }

    fn file(&self, kind: FileKind) -> &ConfigFile {
        match kind {
            FileKind::Hostapd => &self.hostapd,
            FileKind::Ini => &self.ini,
        }
    }

    /// Read a command's persisted value, falling back to its default
    fn read_stored(&self, descriptor: &CommandDescriptor) -> SapResult<String> {
        let (kind, key) = descriptor.location().ok_or_else(|| {
            SapError::InvalidArgument(format!("{} has no stored value", descriptor.name))
        })?;
        self.file(kind)
            .read_field(key, descriptor.effective_default(), descriptor.read_policy)
    }

    /// Write a command's value under its storage key
    fn write_stored(&mut self, descriptor: &CommandDescriptor, value: &str) -> SapResult<()> {
        let (kind, key) = descriptor.location().ok_or_else(|| {
            SapError::InvalidArgument(format!("{} has no stored value", descriptor.name))
        })?;
        let outcome = self.file(kind).write_field(key, value)?;
        self.note_write(outcome);
        Ok(())
    }

    fn note_write(&mut self, outcome: WriteOutcome) {
        if outcome.ini_updated && !self.reload_pending {
            debug!("Driver ini changed, reload pending");
            self.reload_pending = true;
        }
    }

    /// Interface to run driver queries on. The SoftAP has to be up.
    fn driver_interface(&self) -> SapResult<String> {
        if !self.lifecycle.is_softap_enabled() {
            return Err(SapError::Driver("SoftAP is not enabled".to_string()));
        }
        let key = InternalKey::Interface.name();
        self.hostapd
            .read_value(key, CommentPolicy::EnabledOnly)?
            .ok_or_else(|| SapError::ParamMissing(key.to_string()))
    }
}

/// Extract and validate the value of a `set` request
fn set_value(descriptor: &CommandDescriptor, args: &str) -> SapResult<String> {
    if descriptor.validator == Validator::NoValue {
        return Ok(String::new());
    }

    let value = match args.split_once('=') {
        Some((_, value)) if !value.is_empty() => value,
        _ => {
            return Err(SapError::InvalidArgument(format!(
                "{} needs a value",
                descriptor.name
            )))
        }
    };

    descriptor.validator.normalize(value).map_err(|e| match e {
        SapError::InvalidParameter(_) => e,
        other => SapError::InvalidParameter(other.to_string()),
    })
}
