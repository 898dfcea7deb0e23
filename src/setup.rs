//! One-shot SoftAP setup
//!
//! Issues the usual `set` sequence for a fresh access point and finishes
//! with `commit`.

use crate::dispatcher::Dispatcher;
use crate::protocol::Response;
use crate::registry::CommandId;
use crate::security::SecurityMode;
use crate::validation::MAX_PASSPHRASE_LEN;
use thiserror::Error;
use tracing::{error, info};

pub const DEFAULT_PASSPHRASE: &str = "12345678";
pub const SSID_PREFIX: &str = "SOFTAP_SSID_";

/// Optional settings; anything left out gets a default
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub ssid: Option<String>,
    /// `open`, `wep`, `wpa-psk` or `wpa2-psk`
    pub security: Option<String>,
    pub passphrase: Option<String>,
    pub channel: Option<u32>,
}

/// The step that stopped the sequence and what it answered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("setup stopped at '{step}': {response}")]
pub struct SetupError {
    pub step: &'static str,
    pub response: Response,
}

fn random_ssid() -> String {
    format!("{}{}", SSID_PREFIX, rand::random::<u16>())
}

/// Configure the SoftAP with a single call
pub fn setup_softap(dispatcher: &mut Dispatcher, options: &SetupOptions) -> Result<(), SetupError> {
    let mode = options
        .security
        .as_deref()
        .map(SecurityMode::from_setup_name)
        .unwrap_or(SecurityMode::None);

    let mut steps = vec![
        (
            CommandId::Ssid,
            options.ssid.clone().unwrap_or_else(random_ssid),
        ),
        (CommandId::SecurityMode, mode.to_string()),
    ];

    if matches!(mode, SecurityMode::WpaPsk | SecurityMode::Wpa2Psk) {
        let passphrase: String = options
            .passphrase
            .as_deref()
            .unwrap_or(DEFAULT_PASSPHRASE)
            .chars()
            .take(MAX_PASSPHRASE_LEN)
            .collect();
        steps.push((CommandId::Passphrase, passphrase));
    }

    if let Some(channel) = options.channel {
        steps.push((CommandId::Channel, channel.to_string()));
    }

    for (id, value) in &steps {
        let request = format!("set {}={}", id.name(), value);
        let response = dispatcher.execute(&request);
        if !response.is_success() {
            error!("Setup step {} failed: {}", id.name(), response);
            return Err(SetupError {
                step: id.name(),
                response,
            });
        }
    }

    let response = dispatcher.execute(&format!("set {}", CommandId::Commit.name()));
    if !response.is_success() {
        return Err(SetupError {
            step: CommandId::Commit.name(),
            response,
        });
    }

    info!("SoftAP configured in {} steps", steps.len() + 1);
    Ok(())
}
