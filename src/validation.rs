//! Input validation and sanitization
//!
//! Every value that reaches a configuration file passes through here first,
//! so nothing written can break the line structure of the file.

use crate::error::{SapError, SapResult};

/// Maximum length for interface names (Linux kernel limit is 15)
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Maximum length for configuration values
const MAX_CONFIG_VALUE_LEN: usize = 512;

/// Maximum length for error messages shown to users
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// WPA passphrase bounds
pub const MIN_PASSPHRASE_LEN: usize = 8;
pub const MAX_PASSPHRASE_LEN: usize = 63;

/// Minimum length of a WPS PIN
pub const MIN_WPS_PIN_LEN: usize = 8;

/// Validate interface name before it is copied into an ioctl request
/// or used as a control socket path component.
///
/// Interface names must be alphanumeric with optional dashes and underscores,
/// and no longer than 15 characters (Linux kernel limit)
pub fn validate_interface_name(name: &str) -> SapResult<()> {
    if name.is_empty() {
        return Err(SapError::InvalidParameter(
            "Interface name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(SapError::InvalidParameter(format!(
            "Interface name too long (max {} characters)",
            MAX_INTERFACE_NAME_LEN
        )));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
            return Err(SapError::InvalidParameter(format!(
                "Invalid interface name '{}': contains invalid character '{}'",
                name, c
            )));
        }
    }

    if name.starts_with('-') {
        return Err(SapError::InvalidParameter(
            "Interface name cannot start with dash".to_string(),
        ));
    }

    Ok(())
}

/// Reject values that would corrupt a `key=value` line
pub fn sanitize_config_value(value: &str) -> SapResult<()> {
    if value.chars().any(|c| c.is_control() && c != '\t') {
        return Err(SapError::InvalidParameter(
            "Configuration value contains invalid control characters".to_string(),
        ));
    }

    if value.len() > MAX_CONFIG_VALUE_LEN {
        return Err(SapError::InvalidParameter(format!(
            "Configuration value too long (max {} characters)",
            MAX_CONFIG_VALUE_LEN
        )));
    }

    Ok(())
}

/// Check a free text value against a length window
pub fn validate_text_len(value: &str, min: usize, max: usize) -> SapResult<()> {
    let len = value.len();
    if len < min || len > max {
        return Err(SapError::InvalidParameter(format!(
            "Length {} outside {}..={}",
            len, min, max
        )));
    }
    Ok(())
}

/// Validate WiFi SSID
///
/// SSIDs are 1-32 bytes without control characters
pub fn validate_ssid(ssid: &str) -> SapResult<()> {
    if ssid.is_empty() {
        return Err(SapError::InvalidParameter(
            "SSID cannot be empty".to_string(),
        ));
    }

    if ssid.len() > 32 {
        return Err(SapError::InvalidParameter(
            "SSID cannot exceed 32 characters".to_string(),
        ));
    }

    if ssid.chars().any(|c| c.is_control()) {
        return Err(SapError::InvalidParameter(
            "SSID contains invalid control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate WPA passphrase
///
/// WPA requirements: 8-63 ASCII characters
pub fn validate_passphrase(passphrase: &str) -> SapResult<()> {
    if passphrase.len() < MIN_PASSPHRASE_LEN {
        return Err(SapError::InvalidParameter(format!(
            "Passphrase must be at least {} characters",
            MIN_PASSPHRASE_LEN
        )));
    }

    if passphrase.len() > MAX_PASSPHRASE_LEN {
        return Err(SapError::InvalidParameter(format!(
            "Passphrase cannot exceed {} characters",
            MAX_PASSPHRASE_LEN
        )));
    }

    if !passphrase.is_ascii() {
        return Err(SapError::InvalidParameter(
            "Passphrase must contain only ASCII characters".to_string(),
        ));
    }

    if passphrase.chars().any(|c| c.is_control()) {
        return Err(SapError::InvalidParameter(
            "Passphrase contains invalid control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a WEP key and return the form it is stored in.
///
/// 5, 13 or 16 ASCII characters are stored wrapped in double quotes;
/// 10, 26 or 32 hex digits are stored raw. A quoted input is unwrapped
/// before classification.
pub fn normalize_wep_key(key: &str) -> SapResult<String> {
    let key = unquote(key);

    match key.len() {
        5 | 13 | 16 if key.is_ascii() && !key.chars().any(|c| c.is_control()) => {
            Ok(format!("\"{}\"", key))
        }
        10 | 26 | 32 if key.chars().all(|c| c.is_ascii_hexdigit()) => Ok(key.to_string()),
        _ => Err(SapError::InvalidParameter(format!(
            "Invalid WEP key of length {}",
            key.len()
        ))),
    }
}

/// Strip one pair of surrounding double quotes
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Validate country code (ISO 3166-1 alpha-2, optionally followed by an
/// environment character as hostapd accepts)
pub fn validate_country_code(code: &str) -> SapResult<()> {
    if code.is_empty() || code.len() > 3 {
        return Err(SapError::InvalidParameter(
            "Country code must be 1 to 3 characters".to_string(),
        ));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        return Err(SapError::InvalidParameter(format!(
            "Invalid country code: {}",
            code
        )));
    }

    Ok(())
}

/// Parse a decimal integer strictly
pub fn parse_int(value: &str) -> SapResult<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| SapError::InvalidParameter(format!("Not an integer: {}", value)))
}

/// Parse a decimal integer and check it against an inclusive range
pub fn parse_int_in_range(value: &str, min: i64, max: i64) -> SapResult<i64> {
    let n = parse_int(value)?;
    if n < min || n > max {
        return Err(SapError::InvalidParameter(format!(
            "Value {} outside {}..={}",
            n, min, max
        )));
    }
    Ok(n)
}

/// Sanitize error messages to prevent information disclosure
pub fn sanitize_error_message(stderr: &str) -> String {
    let mut sanitized = stderr.trim().to_string();

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let mut cut = MAX_ERROR_MESSAGE_LEN;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("... (truncated)");
    }

    sanitized
}
