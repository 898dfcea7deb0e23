//! MAC address codec

use crate::error::{SapError, SapResult};
use std::fmt;
use std::str::FromStr;

/// Length of the colon separated text form
pub const MAC_TEXT_LEN: usize = 17;

/// A 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Parse the 12 hex digit form used by the driver ini (`00deadbeef04`)
    pub fn from_compact(s: &str) -> SapResult<Self> {
        if s.len() != 12 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SapError::InvalidParameter(format!(
                "Invalid compact MAC address: {}",
                s
            )));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| SapError::InvalidParameter(format!("Invalid MAC address: {}", s)))?;
        }
        Ok(MacAddr(octets))
    }

    /// Render as 12 lowercase hex digits without separators
    pub fn to_compact(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl FromStr for MacAddr {
    type Err = SapError;

    /// Accepts exactly `XX:XX:XX:XX:XX:XX`, hex digits in either case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SapError::InvalidParameter(format!("Invalid MAC address: {}", s));

        if s.len() != MAC_TEXT_LEN {
            return Err(invalid());
        }

        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(MacAddr(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

/// True when `s` is a well formed colon separated MAC address
pub fn is_valid_mac(s: &str) -> bool {
    s.parse::<MacAddr>().is_ok()
}
