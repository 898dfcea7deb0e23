//! sapctl - SoftAP configuration library
//!
//! Line-oriented `get`/`set` command engine for a WiFi Soft Access Point:
//! - hostapd configuration and driver ini editing with atomic rewrites
//! - security mode, channel, hardware mode and data rate policy
//! - MAC allow/deny lists
//! - hostapd control socket requests (WPS)
//! - driver queries over private wireless ioctls
//! - SoftAP lifecycle (driver load, hostapd start/stop/reload)

pub mod error;
pub mod protocol;
pub mod validation;
pub mod config;
pub mod store;
pub mod mac;
pub mod registry;
pub mod security;
pub mod radio;
pub mod maclist;
pub mod ctrl;
pub mod driver;
pub mod hostapd;
pub mod dispatcher;
pub mod setup;

// Re-export commonly used types
pub use error::{SapError, SapResult};
pub use protocol::{FailureCode, Response, Verb};
pub use config::SapConfig;
pub use store::{CommentPolicy, ConfigFile, FileKind, Toggle, WriteOutcome};
pub use mac::MacAddr;
pub use registry::{lookup, CommandDescriptor, CommandId, InternalKey};
pub use security::SecurityMode;
pub use radio::HwMode;
pub use ctrl::{HostapdControl, UnixControlClient};
pub use driver::{IoctlDriver, SoftapDriver};
pub use hostapd::{HostapdLifecycle, SoftapLifecycle};
pub use dispatcher::Dispatcher;
pub use setup::{setup_softap, SetupError, SetupOptions};
