//! Read handlers

use super::Dispatcher;
use crate::error::{SapError, SapResult};
use crate::mac::MacAddr;
use crate::maclist::{resolve_list_path, show_entries};
use crate::registry::{CommandDescriptor, Handler};
use crate::security::read_security_mode;
use crate::store::CommentPolicy;
use crate::validation::{parse_int, unquote};

impl Dispatcher {
    pub(super) fn read(&self, descriptor: &CommandDescriptor) -> SapResult<String> {
        match descriptor.handler {
            Handler::SecurityMode => Ok(read_security_mode(&self.hostapd)?.to_string()),
            Handler::WepKey => {
                let key = self.read_stored(descriptor)?;
                Ok(unquote(&key).to_string())
            }
            Handler::Channel => {
                let channel = self.read_stored(descriptor)?;
                if !matches!(parse_int(&channel), Ok(0)) {
                    return Ok(channel);
                }
                let interface = self.driver_interface()?;
                let operating = self.driver.operating_channel(&interface)?;
                Ok(format!("0,{}", operating))
            }
            Handler::MacAddress => {
                let compact = self.read_stored(descriptor)?;
                MacAddr::from_compact(compact.trim())
                    .map(|mac| mac.to_string())
                    .map_err(|_| SapError::NotSupported(format!("stored MAC {}", compact)))
            }
            Handler::ListShow(list) => {
                let path = resolve_list_path(&self.hostapd, list)?;
                Ok(show_entries(&path)?.join(" "))
            }
            Handler::EnableSoftap => {
                let enabled = self.lifecycle.is_softap_enabled();
                Ok(if enabled { "1" } else { "0" }.to_string())
            }
            Handler::StationList => {
                let interface = self.driver_interface()?;
                let stations = self.driver.associated_stations(&interface)?;
                Ok(stations
                    .iter()
                    .map(|mac| mac.to_string())
                    .collect::<Vec<_>>()
                    .join(" "))
            }
            Handler::SdkVersion => Ok(env!("CARGO_PKG_VERSION").to_string()),
            Handler::ApStats => {
                if !self.lifecycle.is_softap_enabled() {
                    return Err(SapError::SoftapNotStarted);
                }
                let interface = self.driver_interface()?;
                self.driver.ap_statistics(&interface)
            }
            Handler::WpsState => {
                let state = self.read_stored(descriptor)?;
                Ok(if state.trim() == "2" { "1" } else { "0" }.to_string())
            }
            Handler::ApIsolate => {
                let value = self
                    .hostapd
                    .read_value(descriptor.name, CommentPolicy::EnabledOnly)?;
                Ok(value.unwrap_or_else(|| "0".to_string()))
            }
            Handler::AutoShutOff => {
                let seconds = parse_int(&self.read_stored(descriptor)?).unwrap_or(0);
                Ok((seconds / 60).to_string())
            }
            Handler::Field
            | Handler::WepDefaultKey
            | Handler::Pairwise
            | Handler::HwMode
            | Handler::DataRate
            | Handler::MacAcl
            | Handler::WpsConfigMethod => self.read_stored(descriptor),
            Handler::ListAdd(_)
            | Handler::ListRemove(_)
            | Handler::ResetAp
            | Handler::Commit
            | Handler::Disassociate
            | Handler::ResetToDefault => Err(SapError::InvalidArgument(format!(
                "{} cannot be read",
                descriptor.name
            ))),
        }
    }
}
