//! Channel, hardware mode and data rate policy
//!
//! The three values constrain each other: a channel outside the current band
//! moves the hardware mode, and a mode change pulls the stored data rate and
//! channel back into range.

use crate::error::{SapError, SapResult};
use crate::registry::CommandId;
use crate::store::{CommentPolicy, ConfigFile, Toggle, WriteOutcome};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Highest 2.4 GHz channel
pub const MAX_2GHZ_CHANNEL: u32 = 14;

/// Channel used when a mode change leaves the stored channel out of band
pub const DEFAULT_2GHZ_CHANNEL: u32 = 1;
pub const DEFAULT_5GHZ_CHANNEL: u32 = 36;

/// Highest data-rate index per stored mode
pub const B_MODE_MAX_RATE: i64 = 4;
pub const G_MODE_MAX_RATE: i64 = 12;
pub const MAX_RATE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwMode {
    B,
    G,
    N,
    GOnly,
    NOnly,
    A,
}

impl HwMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HwMode::B => "b",
            HwMode::G => "g",
            HwMode::N => "n",
            HwMode::GOnly => "g-only",
            HwMode::NOnly => "n-only",
            HwMode::A => "a",
        }
    }

    /// Value written to `hw_mode=`; hostapd only knows b, g and a
    pub fn stored(self) -> &'static str {
        match self {
            HwMode::B => "b",
            HwMode::A => "a",
            HwMode::G | HwMode::N | HwMode::GOnly | HwMode::NOnly => "g",
        }
    }

    pub fn is_5ghz(self) -> bool {
        self == HwMode::A
    }
}

impl FromStr for HwMode {
    type Err = SapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "b" => Ok(HwMode::B),
            "g" => Ok(HwMode::G),
            "n" => Ok(HwMode::N),
            "g-only" => Ok(HwMode::GOnly),
            "n-only" => Ok(HwMode::NOnly),
            "a" => Ok(HwMode::A),
            _ => Err(SapError::InvalidParameter(format!("Unknown hw_mode {}", s))),
        }
    }
}

impl fmt::Display for HwMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest data-rate index allowed while `hw_mode=` holds `stored`
pub fn max_data_rate(stored: &str) -> i64 {
    match stored {
        "b" => B_MODE_MAX_RATE,
        "g" | "g-only" => G_MODE_MAX_RATE,
        _ => MAX_RATE,
    }
}

/// Mode rewrites needed before `channel` can be stored, in order
pub fn mode_changes_for_channel(current: &str, channel: u32) -> Vec<&'static str> {
    let mut changes = Vec::new();

    if current == "a" && channel <= MAX_2GHZ_CHANNEL {
        changes.push("g");
    }
    if current != "b" && (12..=MAX_2GHZ_CHANNEL).contains(&channel) {
        changes.push("b");
    }
    if channel > MAX_2GHZ_CHANNEL {
        changes.push("a");
    }

    changes
}

fn current_mode(hostapd: &ConfigFile) -> SapResult<String> {
    let hw_mode = CommandId::HwMode.descriptor();
    hostapd.read_field(hw_mode.name, hw_mode.default, CommentPolicy::EnabledOnly)
}

/// Store a channel, moving the hardware mode into the channel's band first
pub fn apply_channel(hostapd: &ConfigFile, channel: u32) -> SapResult<()> {
    let current = current_mode(hostapd)?;

    for mode in mode_changes_for_channel(&current, channel) {
        info!("Channel {} needs hw_mode={} (was {})", channel, mode, current);
        hostapd.write_field(CommandId::HwMode.name(), mode)?;
    }

    hostapd.write_field(CommandId::Channel.name(), &channel.to_string())?;
    Ok(())
}

/// Check a data-rate index against the stored hardware mode
pub fn check_data_rate(hostapd: &ConfigFile, rate: i64) -> SapResult<()> {
    let current = current_mode(hostapd)?;
    let max = max_data_rate(&current);
    if rate > max {
        return Err(SapError::InvalidParameter(format!(
            "Data rate index {} exceeds {} for hw_mode={}",
            rate, max, current
        )));
    }
    Ok(())
}

/// Switch the hardware mode and bring dependent fields in line.
///
/// Returns the ini write outcome when the data rate had to be reset.
pub fn apply_hw_mode(
    hostapd: &ConfigFile,
    ini: &ConfigFile,
    mode: HwMode,
) -> SapResult<WriteOutcome> {
    let basic_rates = CommandId::BasicRates.name();
    let require_ht = CommandId::RequireHt.name();
    let ieee80211n = CommandId::Ieee80211n.name();

    hostapd.toggle_field(basic_rates, Toggle::Disable)?;
    hostapd.toggle_field(require_ht, Toggle::Disable)?;
    hostapd.write_field(ieee80211n, "0")?;

    match mode {
        HwMode::GOnly => hostapd.toggle_field(basic_rates, Toggle::Enable)?,
        HwMode::NOnly => {
            hostapd.toggle_field(require_ht, Toggle::Enable)?;
            hostapd.write_field(ieee80211n, "1")?;
        }
        HwMode::N | HwMode::A => {
            hostapd.write_field(ieee80211n, "1")?;
        }
        HwMode::B => {
            hostapd.write_field(ieee80211n, "0")?;
        }
        HwMode::G => {}
    }

    let stored = mode.stored();
    hostapd.write_field(CommandId::HwMode.name(), stored)?;

    let mut outcome = WriteOutcome::default();

    let rate = CommandId::DataRate.descriptor();
    if let Some((_, key)) = rate.location() {
        let current = ini.read_field(key, rate.effective_default(), CommentPolicy::EnabledOnly)?;
        let max = max_data_rate(stored);
        if current.trim().parse::<i64>().map_or(false, |r| r > max) {
            debug!("Data rate {} out of range for hw_mode={}, resetting", current, stored);
            outcome = ini.write_field(key, "0")?;
        }
    }

    let channel = CommandId::Channel.descriptor();
    let current = hostapd.read_field(channel.name, channel.default, CommentPolicy::EnabledOnly)?;
    if let Ok(ch) = current.trim().parse::<u32>() {
        let replacement = if ch == 0 {
            None
        } else if mode.is_5ghz() && ch <= MAX_2GHZ_CHANNEL {
            Some(DEFAULT_5GHZ_CHANNEL)
        } else if !mode.is_5ghz() && ch > MAX_2GHZ_CHANNEL {
            Some(DEFAULT_2GHZ_CHANNEL)
        } else {
            None
        };

        if let Some(replacement) = replacement {
            info!("Channel {} outside hw_mode={} band, using {}", ch, mode, replacement);
            hostapd.write_field(channel.name, &replacement.to_string())?;
        }
    }

    Ok(outcome)
}
