//! Security mode codec
//!
//! The security mode is never stored directly. It is derived from whether a
//! WEP default key is live and from the value of `wpa=`, and applying a mode
//! means enabling or disabling the key fields that belong to it.

use crate::error::{SapError, SapResult};
use crate::registry::{CommandId, InternalKey, WEP_KEYS};
use crate::store::{CommentPolicy, ConfigFile, Toggle};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    None = 0,
    Wep = 1,
    WpaPsk = 2,
    Wpa2Psk = 3,
    WpaWpa2Mixed = 4,
}

impl SecurityMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SecurityMode::None),
            1 => Some(SecurityMode::Wep),
            2 => Some(SecurityMode::WpaPsk),
            3 => Some(SecurityMode::Wpa2Psk),
            4 => Some(SecurityMode::WpaWpa2Mixed),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    /// Value of the `wpa=` entry for the WPA family
    pub fn wpa_value(self) -> Option<&'static str> {
        match self {
            SecurityMode::WpaPsk => Some("1"),
            SecurityMode::Wpa2Psk => Some("2"),
            SecurityMode::WpaWpa2Mixed => Some("3"),
            SecurityMode::None | SecurityMode::Wep => None,
        }
    }

    pub fn is_wpa_family(self) -> bool {
        self.wpa_value().is_some()
    }

    /// Parse the names accepted by the convenience setup entry.
    /// Anything unrecognized is an open network.
    pub fn from_setup_name(name: &str) -> Self {
        match name {
            "wep" => SecurityMode::Wep,
            "wpa-psk" => SecurityMode::WpaPsk,
            "wpa2-psk" => SecurityMode::Wpa2Psk,
            _ => SecurityMode::None,
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Derive the mode from a live WEP default key and the `wpa=` value.
pub fn derive(wep_default_key_live: bool, wpa: Option<&str>) -> SapResult<SecurityMode> {
    if wep_default_key_live {
        return Ok(SecurityMode::Wep);
    }

    let Some(wpa) = wpa else {
        return Ok(SecurityMode::None);
    };

    match wpa.chars().next() {
        Some('1') => Ok(SecurityMode::WpaPsk),
        Some('2') => Ok(SecurityMode::Wpa2Psk),
        Some('3') => Ok(SecurityMode::WpaWpa2Mixed),
        _ => Err(SapError::NotSupported(format!("wpa={}", wpa))),
    }
}

/// Read the current mode from the hostapd file
pub fn read_security_mode(hostapd: &ConfigFile) -> SapResult<SecurityMode> {
    let wep = hostapd.read_value(CommandId::WepDefaultKey.name(), CommentPolicy::EnabledOnly)?;
    let wpa = hostapd.read_value(InternalKey::Wpa.name(), CommentPolicy::EnabledOnly)?;
    derive(wep.is_some(), wpa.as_deref())
}

/// Enable the fields of `mode` and disable the others.
///
/// Not transactional: the first failing step aborts and leaves the earlier
/// steps applied.
pub fn apply_security_mode(hostapd: &ConfigFile, mode: SecurityMode) -> SapResult<()> {
    let wep = Toggle::from(mode == SecurityMode::Wep);
    let wpa = Toggle::from(mode.is_wpa_family());
    let rsn = Toggle::from(matches!(
        mode,
        SecurityMode::Wpa2Psk | SecurityMode::WpaWpa2Mixed
    ));

    let step = |key: &str, toggle: Toggle| {
        hostapd.toggle_field(key, toggle).map_err(|e| {
            warn!("Security mode {}: failed to update {}: {}", mode, key, e);
            e
        })
    };

    if let Some(value) = mode.wpa_value() {
        hostapd.write_field(InternalKey::Wpa.name(), value)?;
    }

    step(CommandId::WepDefaultKey.name(), wep)?;
    for key in WEP_KEYS {
        step(key.name(), wep)?;
    }
    step(CommandId::Passphrase.name(), wpa)?;

    if mode.is_wpa_family() {
        let tkip = Toggle::from(mode != SecurityMode::Wpa2Psk);
        step(CommandId::WpaPairwise.name(), tkip)?;
    }
    step(CommandId::RsnPairwise.name(), rsn)?;
    step(InternalKey::Wpa.name(), wpa)?;

    debug!("Security mode set to {:?}", mode);
    Ok(())
}
