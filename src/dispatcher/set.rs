//! Write handlers

use super::Dispatcher;
use crate::ctrl::control_socket_path;
use crate::error::{SapError, SapResult};
use crate::mac::MacAddr;
use crate::maclist::{add_entries, remove_entries, resolve_list_path};
use crate::protocol::{FailureCode, Response};
use crate::radio::{apply_channel, apply_hw_mode, check_data_rate, HwMode};
use crate::registry::{CommandDescriptor, CommandId, Handler, InternalKey, WPS_METADATA};
use crate::security::{apply_security_mode, read_security_mode, SecurityMode};
use crate::store::Toggle;
use crate::validation::{parse_int, MIN_WPS_PIN_LEN};
use tracing::{info, warn};

/// `wps_state=` value hostapd reads as "configured"
const WPS_CONFIGURED: &str = "2";

impl Dispatcher {
    pub(super) fn write(&mut self, descriptor: &CommandDescriptor, value: &str) -> SapResult<Response> {
        match descriptor.handler {
            Handler::Field => self.write_stored(descriptor, value)?,
            Handler::SecurityMode => {
                let code = parse_int(value)?;
                let mode = SecurityMode::from_code(code)
                    .ok_or_else(|| SapError::InvalidParameter(format!("security mode {}", code)))?;
                apply_security_mode(&self.hostapd, mode)?;
            }
            Handler::WepKey | Handler::WepDefaultKey => {
                // checked before the write, which may itself bring a WEP line live
                let wep = matches!(read_security_mode(&self.hostapd), Ok(SecurityMode::Wep));
                self.write_stored(descriptor, value)?;
                if !wep {
                    self.hostapd.toggle_field(descriptor.name, Toggle::Disable)?;
                }
            }
            Handler::Pairwise => {
                let ht = Toggle::from(value != "TKIP");
                self.hostapd.toggle_field(InternalKey::Ieee80211n.name(), ht)?;
                self.write_stored(descriptor, value)?;
            }
            Handler::Channel => {
                let channel = value
                    .parse::<u32>()
                    .map_err(|_| SapError::InvalidParameter(format!("channel {}", value)))?;
                apply_channel(&self.hostapd, channel)?;
            }
            Handler::HwMode => {
                let mode = value.parse::<HwMode>()?;
                let outcome = apply_hw_mode(&self.hostapd, &self.ini, mode)?;
                self.note_write(outcome);
            }
            Handler::DataRate => {
                check_data_rate(&self.hostapd, parse_int(value)?)?;
                self.write_stored(descriptor, value)?;
            }
            Handler::MacAddress => {
                let mac = value.parse::<MacAddr>()?;
                self.write_stored(descriptor, &mac.to_compact())?;
            }
            Handler::MacAcl => {
                let allow = value == "1";
                self.hostapd
                    .toggle_field(InternalKey::AcceptMacFile.name(), Toggle::from(allow))?;
                self.hostapd
                    .toggle_field(InternalKey::DenyMacFile.name(), Toggle::from(!allow))?;
                self.write_stored(descriptor, value)?;
            }
            Handler::ListAdd(list) => {
                let path = resolve_list_path(&self.hostapd, list)?;
                add_entries(&path, value)?;
            }
            Handler::ListRemove(list) => {
                let path = resolve_list_path(&self.hostapd, list)?;
                remove_entries(&path, value)?;
            }
            Handler::ResetAp => self.reset_ap(parse_int(value)?)?,
            Handler::Commit => {
                if self.reload_pending {
                    self.lifecycle.reload_softap()?;
                    self.reload_pending = false;
                }
            }
            Handler::EnableSoftap => {
                let result = if value == "1" {
                    self.lifecycle.load_driver()
                } else {
                    self.lifecycle.unload_driver()
                };
                if let Err(e) = result {
                    warn!("enable_softap={} failed: {}", value, e);
                    return Ok(Response::Failure(FailureCode::CouldNotEnableSoftap));
                }
            }
            Handler::Disassociate => {
                let station = value.parse::<MacAddr>()?;
                let interface = self.driver_interface()?;
                self.driver.disassociate(&interface, station)?;
            }
            Handler::ResetToDefault => return self.reset_to_default(),
            Handler::WpsState => self.set_wps_state(descriptor, value == "1")?,
            Handler::WpsConfigMethod => self.start_wps(value)?,
            Handler::ApIsolate => {
                if value == "1" {
                    self.write_stored(descriptor, value)?;
                } else {
                    self.hostapd.toggle_field(descriptor.name, Toggle::Disable)?;
                }
            }
            Handler::AutoShutOff => {
                let seconds = parse_int(value)? * 60;
                self.write_stored(descriptor, &seconds.to_string())?;
            }
            Handler::ListShow(_)
            | Handler::StationList
            | Handler::SdkVersion
            | Handler::ApStats => {
                return Err(SapError::InvalidArgument(format!(
                    "{} is read-only",
                    descriptor.name
                )))
            }
        }

        Ok(Response::Done)
    }

    /// 0: restart, 1: reload, 2: stop the BSS, 3: stop and unload
    fn reset_ap(&mut self, mode: i64) -> SapResult<()> {
        info!("reset_ap mode {}", mode);
        match mode {
            0 => {
                self.lifecycle.stop_softap()?;
                if let Err(e) = self.lifecycle.start_softap() {
                    warn!("Restart failed, unloading driver: {}", e);
                    if let Err(unload) = self.lifecycle.unload_driver() {
                        warn!("Driver unload failed: {}", unload);
                    }
                    return Err(e);
                }
                Ok(())
            }
            1 => {
                self.lifecycle.reload_softap()?;
                self.reload_pending = false;
                Ok(())
            }
            2 => self.lifecycle.stop_bss(),
            3 => {
                self.lifecycle.stop_softap()?;
                self.lifecycle.unload_driver()
            }
            _ => Err(SapError::InvalidParameter(format!("reset_ap mode {}", mode))),
        }
    }

    fn reset_to_default(&mut self) -> SapResult<Response> {
        let paths = &self.config.paths;
        for (file, default) in [
            (&self.hostapd, &paths.hostapd_default),
            (&self.ini, &paths.ini_default),
        ] {
            match file.replace_with(default) {
                Ok(()) => info!("Restored {:?} from {:?}", file.path(), default),
                Err(e @ SapError::FileOpen { .. }) => {
                    warn!("reset_to_default: {}", e);
                    return Ok(Response::Failure(FailureCode::FileOpenError));
                }
                Err(e) => return Err(e),
            }
        }

        self.lifecycle.reload_softap()?;
        self.reload_pending = false;
        Ok(Response::Done)
    }

    fn set_wps_state(&mut self, descriptor: &CommandDescriptor, enable: bool) -> SapResult<()> {
        if enable && matches!(read_security_mode(&self.hostapd), Ok(SecurityMode::Wep)) {
            info!("WPS cannot run over WEP, switching to WPA/WPA2 mixed");
            apply_security_mode(&self.hostapd, SecurityMode::WpaWpa2Mixed)?;
        }

        let toggle = Toggle::from(enable);
        self.write_stored(descriptor, if enable { WPS_CONFIGURED } else { "0" })?;
        self.hostapd.toggle_field(descriptor.name, toggle)?;
        self.hostapd.write_field(InternalKey::EapServer.name(), "1")?;
        for field in WPS_METADATA {
            self.hostapd.toggle_field(field.name(), toggle)?;
        }
        Ok(())
    }

    /// `0` starts push-button, `1 <pin>` a PIN session
    fn start_wps(&mut self, value: &str) -> SapResult<()> {
        let mut words = value.split_whitespace();
        let command = match (words.next(), words.next()) {
            (Some("0"), _) => "WPS_PBC".to_string(),
            (Some("1"), Some(pin))
                if pin.len() >= MIN_WPS_PIN_LEN && pin.chars().all(|c| c.is_ascii_digit()) =>
            {
                format!("WPS_PIN any {}", pin)
            }
            _ => {
                return Err(SapError::InvalidParameter(format!(
                    "{} expects '0' or '1 <pin>'",
                    CommandId::ConfigMethods.name()
                )))
            }
        };

        let peer = control_socket_path(&self.hostapd)?;
        let reply = self.control.request(&peer, &command)?;
        info!("{} -> {}", command, reply);
        Ok(())
    }
}
