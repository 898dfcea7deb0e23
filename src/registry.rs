//! Command registry
//!
//! A static, ordered table of every command the engine understands. The
//! position of a descriptor in the table is its [`CommandId`].

use crate::error::{SapError, SapResult};
use crate::mac::MacAddr;
use crate::store::{CommentPolicy, FileKind};
use crate::validation::{
    normalize_wep_key, parse_int_in_range, sanitize_config_value, validate_country_code,
    validate_passphrase, validate_ssid, validate_text_len,
};

/// Stable command identifier, equal to the table position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Ssid,
    IgnoreBroadcastSsid,
    Channel,
    BeaconInterval,
    DtimPeriod,
    HwMode,
    AuthAlgs,
    SecurityMode,
    WepKey0,
    WepKey1,
    WepKey2,
    WepKey3,
    WepDefaultKey,
    Passphrase,
    WpaPairwise,
    RsnPairwise,
    MacAddress,
    ResetAp,
    MacAcl,
    AddToAllowList,
    AddToDenyList,
    RemoveFromAllowList,
    RemoveFromDenyList,
    AllowList,
    DenyList,
    Commit,
    EnableSoftap,
    DisassocSta,
    ResetToDefault,
    ProtectionFlag,
    DataRate,
    StaMacList,
    TxPower,
    SdkVersion,
    WmmEnabled,
    WpsState,
    ConfigMethods,
    Uuid,
    DeviceName,
    Manufacturer,
    ModelName,
    ModelNumber,
    SerialNumber,
    DeviceType,
    OsVersion,
    FriendlyName,
    ManufacturerUrl,
    ModelDescription,
    ModelUrl,
    Upc,
    FragThreshold,
    RtsThreshold,
    WpaGroupRekey,
    CountryCode,
    ApIsolate,
    Ieee80211d,
    ApStats,
    AutoShutOffTime,
    EnergyDetectThreshold,
    BasicRates,
    RequireHt,
    Ieee80211n,
}

/// The four WEP key slots, in order
pub const WEP_KEYS: [CommandId; 4] = [
    CommandId::WepKey0,
    CommandId::WepKey1,
    CommandId::WepKey2,
    CommandId::WepKey3,
];

/// WPS metadata fields enabled and disabled together with WPS
pub const WPS_METADATA: [CommandId; 13] = [
    CommandId::Uuid,
    CommandId::DeviceName,
    CommandId::Manufacturer,
    CommandId::ModelName,
    CommandId::ModelNumber,
    CommandId::SerialNumber,
    CommandId::DeviceType,
    CommandId::OsVersion,
    CommandId::FriendlyName,
    CommandId::ManufacturerUrl,
    CommandId::ModelDescription,
    CommandId::ModelUrl,
    CommandId::Upc,
];

impl CommandId {
    pub fn descriptor(self) -> &'static CommandDescriptor {
        &COMMANDS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

/// Keys that public commands are persisted under, or that handlers consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalKey {
    Wpa,
    AcceptMacFile,
    DenyMacFile,
    ApMacAddr,
    ApProtection,
    FixedRate,
    TxPowerCap,
    FragThreshold,
    RtsThreshold,
    WmmEnabled,
    Dot11dSupport,
    Ieee80211n,
    CtrlInterface,
    Interface,
    EapServer,
    AutoShutOff,
    EnergyDetect,
}

impl InternalKey {
    pub fn name(self) -> &'static str {
        match self {
            InternalKey::Wpa => "wpa",
            InternalKey::AcceptMacFile => "accept_mac_file",
            InternalKey::DenyMacFile => "deny_mac_file",
            InternalKey::ApMacAddr => "gAPMacAddr",
            InternalKey::ApProtection => "gEnableApProt",
            InternalKey::FixedRate => "gFixedRate",
            InternalKey::TxPowerCap => "gTxPowerCap",
            InternalKey::FragThreshold => "gFragmentationThreshold",
            InternalKey::RtsThreshold => "RTSThreshold",
            InternalKey::WmmEnabled => "WmmIsEnabled",
            InternalKey::Dot11dSupport => "g11dSupportEnabled",
            InternalKey::Ieee80211n => "ieee80211n",
            InternalKey::CtrlInterface => "ctrl_interface",
            InternalKey::Interface => "interface",
            InternalKey::EapServer => "eap_server",
            InternalKey::AutoShutOff => "gAPAutoShutOff",
            InternalKey::EnergyDetect => "gEnablePhyAgcListenMode",
        }
    }

    pub fn file(self) -> FileKind {
        match self {
            InternalKey::Wpa
            | InternalKey::AcceptMacFile
            | InternalKey::DenyMacFile
            | InternalKey::Ieee80211n
            | InternalKey::CtrlInterface
            | InternalKey::Interface
            | InternalKey::EapServer => FileKind::Hostapd,
            _ => FileKind::Ini,
        }
    }

    pub fn default_value(self) -> Option<&'static str> {
        match self {
            InternalKey::ApMacAddr => Some("00deadbeef04"),
            InternalKey::ApProtection => Some("1"),
            InternalKey::FixedRate => Some("0"),
            InternalKey::TxPowerCap => Some("27"),
            InternalKey::FragThreshold => Some("2346"),
            InternalKey::RtsThreshold => Some("2347"),
            InternalKey::WmmEnabled => Some("0"),
            InternalKey::Dot11dSupport => Some("1"),
            InternalKey::AutoShutOff => Some("0"),
            InternalKey::EnergyDetect => Some("128"),
            _ => None,
        }
    }
}

/// Where a command's value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// hostapd file, under the command name
    Hostapd,
    /// Under an internal key, in whichever file the key belongs to
    Internal(InternalKey),
    /// Not persisted as a single field
    None,
}

/// Allow or deny MAC access list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclList {
    Allow,
    Deny,
}

impl AclList {
    /// hostapd key naming the list file
    pub fn path_key(self) -> InternalKey {
        match self {
            AclList::Allow => InternalKey::AcceptMacFile,
            AclList::Deny => InternalKey::DenyMacFile,
        }
    }
}

/// Which routine serves a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Plain read and write through the command's storage
    Field,
    SecurityMode,
    WepKey,
    WepDefaultKey,
    Pairwise,
    Channel,
    HwMode,
    DataRate,
    MacAddress,
    MacAcl,
    ListAdd(AclList),
    ListRemove(AclList),
    ListShow(AclList),
    ResetAp,
    Commit,
    EnableSoftap,
    Disassociate,
    ResetToDefault,
    StationList,
    SdkVersion,
    ApStats,
    WpsState,
    WpsConfigMethod,
    ApIsolate,
    AutoShutOff,
}

impl Handler {
    pub fn readable(self) -> bool {
        !matches!(
            self,
            Handler::ListAdd(_)
                | Handler::ListRemove(_)
                | Handler::ResetAp
                | Handler::Commit
                | Handler::Disassociate
                | Handler::ResetToDefault
        )
    }

    pub fn writable(self) -> bool {
        !matches!(
            self,
            Handler::ListShow(_) | Handler::StationList | Handler::SdkVersion | Handler::ApStats
        )
    }
}

/// Value check applied to every `set` before it reaches a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Free text, only line safety is enforced
    Any,
    /// The command takes no value
    NoValue,
    Ssid,
    Passphrase,
    CountryCode,
    /// Byte length window
    Len(usize, usize),
    /// Inclusive integer range, re-rendered canonically
    Int(i64, i64),
    OneOf(&'static [&'static str]),
    WepKey,
    Mac,
    Uuid,
}

impl Validator {
    /// Check `value` and return the canonical form to store
    pub fn normalize(self, value: &str) -> SapResult<String> {
        if self == Validator::NoValue {
            return Ok(String::new());
        }
        sanitize_config_value(value)?;

        match self {
            Validator::Any | Validator::NoValue => Ok(value.to_string()),
            Validator::Ssid => validate_ssid(value).map(|_| value.to_string()),
            Validator::Passphrase => validate_passphrase(value).map(|_| value.to_string()),
            Validator::CountryCode => validate_country_code(value).map(|_| value.to_string()),
            Validator::Len(min, max) => validate_text_len(value, min, max).map(|_| value.to_string()),
            Validator::Int(min, max) => parse_int_in_range(value, min, max).map(|n| n.to_string()),
            Validator::OneOf(allowed) => {
                if allowed.contains(&value) {
                    Ok(value.to_string())
                } else {
                    Err(SapError::InvalidParameter(format!(
                        "Expected one of {:?}, got {}",
                        allowed, value
                    )))
                }
            }
            Validator::WepKey => normalize_wep_key(value),
            Validator::Mac => value.parse::<MacAddr>().map(|mac| mac.to_string()),
            Validator::Uuid => uuid::Uuid::parse_str(value)
                .map(|u| u.hyphenated().to_string())
                .map_err(|e| SapError::InvalidParameter(format!("Invalid UUID {}: {}", value, e))),
        }
    }
}

/// Immutable metadata for one command
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    pub id: CommandId,
    pub name: &'static str,
    pub default: Option<&'static str>,
    pub storage: Storage,
    pub validator: Validator,
    pub read_policy: CommentPolicy,
    pub handler: Handler,
}

impl CommandDescriptor {
    const fn new(id: CommandId, name: &'static str, validator: Validator) -> Self {
        Self {
            id,
            name,
            default: None,
            storage: Storage::Hostapd,
            validator,
            read_policy: CommentPolicy::EnabledOnly,
            handler: Handler::Field,
        }
    }

    const fn defaults_to(self, value: &'static str) -> Self {
        Self {
            default: Some(value),
            ..self
        }
    }

    const fn internal(self, key: InternalKey) -> Self {
        Self {
            storage: Storage::Internal(key),
            ..self
        }
    }

    const fn unstored(self) -> Self {
        Self {
            storage: Storage::None,
            ..self
        }
    }

    const fn commented(self) -> Self {
        Self {
            read_policy: CommentPolicy::IncludeCommented,
            ..self
        }
    }

    const fn handler(self, handler: Handler) -> Self {
        Self { handler, ..self }
    }

    /// File and key the command's value is persisted under, if any
    pub fn location(&self) -> Option<(FileKind, &'static str)> {
        match self.storage {
            Storage::Hostapd => Some((FileKind::Hostapd, self.name)),
            Storage::Internal(key) => Some((key.file(), key.name())),
            Storage::None => None,
        }
    }

    /// Default returned when the stored key is absent
    pub fn effective_default(&self) -> Option<&'static str> {
        match self.storage {
            Storage::Internal(key) => key.default_value().or(self.default),
            _ => self.default,
        }
    }
}

const PAIRWISE: &[&str] = &["TKIP", "CCMP", "TKIP CCMP"];
const HW_MODES: &[&str] = &["b", "g", "n", "g-only", "n-only", "a"];
const AUTH_ALGS: &[&str] = &["1", "2", "3"];

use CommandDescriptor as D;
use CommandId as C;
use Validator as V;

pub const COMMAND_COUNT: usize = 62;

static COMMANDS: [CommandDescriptor; COMMAND_COUNT] = [
    D::new(C::Ssid, "ssid", V::Ssid).defaults_to("QualcommSoftAP"),
    D::new(C::IgnoreBroadcastSsid, "ignore_broadcast_ssid", V::Int(0, 1)).defaults_to("0"),
    D::new(C::Channel, "channel", V::Int(0, 165)).defaults_to("1").handler(Handler::Channel),
    D::new(C::BeaconInterval, "beacon_int", V::Int(20, 1000)).defaults_to("100"),
    D::new(C::DtimPeriod, "dtim_period", V::Int(1, 255)).defaults_to("2"),
    D::new(C::HwMode, "hw_mode", V::OneOf(HW_MODES)).defaults_to("n").handler(Handler::HwMode),
    D::new(C::AuthAlgs, "auth_algs", V::OneOf(AUTH_ALGS)).defaults_to("3"),
    D::new(C::SecurityMode, "security_mode", V::Int(0, 4))
        .defaults_to("0")
        .unstored()
        .handler(Handler::SecurityMode),
    D::new(C::WepKey0, "wep_key0", V::WepKey).commented().handler(Handler::WepKey),
    D::new(C::WepKey1, "wep_key1", V::WepKey).commented().handler(Handler::WepKey),
    D::new(C::WepKey2, "wep_key2", V::WepKey).commented().handler(Handler::WepKey),
    D::new(C::WepKey3, "wep_key3", V::WepKey).commented().handler(Handler::WepKey),
    D::new(C::WepDefaultKey, "wep_default_key", V::Int(0, 3))
        .commented()
        .handler(Handler::WepDefaultKey),
    D::new(C::Passphrase, "wpa_passphrase", V::Passphrase).commented(),
    D::new(C::WpaPairwise, "wpa_pairwise", V::OneOf(PAIRWISE))
        .commented()
        .handler(Handler::Pairwise),
    D::new(C::RsnPairwise, "rsn_pairwise", V::OneOf(PAIRWISE))
        .commented()
        .handler(Handler::Pairwise),
    D::new(C::MacAddress, "mac_address", V::Mac)
        .defaults_to("00deadbeef04")
        .internal(InternalKey::ApMacAddr)
        .handler(Handler::MacAddress),
    D::new(C::ResetAp, "reset_ap", V::Int(0, 3)).unstored().handler(Handler::ResetAp),
    D::new(C::MacAcl, "macaddr_acl", V::Int(0, 1)).defaults_to("0").handler(Handler::MacAcl),
    D::new(C::AddToAllowList, "add_to_allow_list", V::Any)
        .unstored()
        .handler(Handler::ListAdd(AclList::Allow)),
    D::new(C::AddToDenyList, "add_to_deny_list", V::Any)
        .unstored()
        .handler(Handler::ListAdd(AclList::Deny)),
    D::new(C::RemoveFromAllowList, "remove_from_allow_list", V::Any)
        .unstored()
        .handler(Handler::ListRemove(AclList::Allow)),
    D::new(C::RemoveFromDenyList, "remove_from_deny_list", V::Any)
        .unstored()
        .handler(Handler::ListRemove(AclList::Deny)),
    D::new(C::AllowList, "allow_list", V::Any)
        .defaults_to("")
        .unstored()
        .handler(Handler::ListShow(AclList::Allow)),
    D::new(C::DenyList, "deny_list", V::Any)
        .defaults_to("")
        .unstored()
        .handler(Handler::ListShow(AclList::Deny)),
    D::new(C::Commit, "commit", V::NoValue).unstored().handler(Handler::Commit),
    D::new(C::EnableSoftap, "enable_softap", V::Int(0, 1))
        .unstored()
        .handler(Handler::EnableSoftap),
    D::new(C::DisassocSta, "disassoc_sta", V::Mac).unstored().handler(Handler::Disassociate),
    D::new(C::ResetToDefault, "reset_to_default", V::NoValue)
        .unstored()
        .handler(Handler::ResetToDefault),
    D::new(C::ProtectionFlag, "protection_flag", V::Int(0, 1))
        .defaults_to("1")
        .internal(InternalKey::ApProtection),
    D::new(C::DataRate, "data_rate", V::Int(0, 20))
        .defaults_to("0")
        .internal(InternalKey::FixedRate)
        .handler(Handler::DataRate),
    D::new(C::StaMacList, "sta_mac_list", V::Any).unstored().handler(Handler::StationList),
    D::new(C::TxPower, "tx_power", V::Int(2, 27))
        .defaults_to("27")
        .internal(InternalKey::TxPowerCap),
    D::new(C::SdkVersion, "sdk_version", V::Any)
        .defaults_to(env!("CARGO_PKG_VERSION"))
        .unstored()
        .handler(Handler::SdkVersion),
    D::new(C::WmmEnabled, "wmm_enabled", V::Int(0, 1))
        .defaults_to("0")
        .internal(InternalKey::WmmEnabled),
    D::new(C::WpsState, "wps_state", V::Int(0, 1)).defaults_to("0").handler(Handler::WpsState),
    D::new(C::ConfigMethods, "config_methods", V::Any).handler(Handler::WpsConfigMethod),
    D::new(C::Uuid, "uuid", V::Uuid),
    D::new(C::DeviceName, "device_name", V::Len(1, 32)),
    D::new(C::Manufacturer, "manufacturer", V::Len(1, 64)),
    D::new(C::ModelName, "model_name", V::Len(1, 32)),
    D::new(C::ModelNumber, "model_number", V::Len(1, 32)),
    D::new(C::SerialNumber, "serial_number", V::Len(1, 32)),
    D::new(C::DeviceType, "device_type", V::Len(1, 32)),
    D::new(C::OsVersion, "os_version", V::Len(1, 8)),
    D::new(C::FriendlyName, "friendly_name", V::Len(1, 64)),
    D::new(C::ManufacturerUrl, "manufacturer_url", V::Len(1, 256)),
    D::new(C::ModelDescription, "model_description", V::Len(1, 128)),
    D::new(C::ModelUrl, "model_url", V::Len(1, 256)),
    D::new(C::Upc, "upc", V::Len(1, 12)),
    D::new(C::FragThreshold, "fragm_threshold", V::Int(256, 2346))
        .internal(InternalKey::FragThreshold),
    D::new(C::RtsThreshold, "rts_threshold", V::Int(0, 2347)).internal(InternalKey::RtsThreshold),
    D::new(C::WpaGroupRekey, "wpa_group_rekey", V::Int(600, 86400)).commented(),
    D::new(C::CountryCode, "country_code", V::CountryCode),
    D::new(C::ApIsolate, "ap_isolate", V::Int(0, 1)).handler(Handler::ApIsolate),
    D::new(C::Ieee80211d, "ieee80211d", V::Int(0, 1)).internal(InternalKey::Dot11dSupport),
    D::new(C::ApStats, "apstat", V::Any).unstored().handler(Handler::ApStats),
    D::new(C::AutoShutOffTime, "auto_shut_off_time", V::Int(0, 1440))
        .internal(InternalKey::AutoShutOff)
        .handler(Handler::AutoShutOff),
    D::new(C::EnergyDetectThreshold, "energy_detect_threshold", V::Int(0, 255))
        .defaults_to("128")
        .internal(InternalKey::EnergyDetect),
    D::new(C::BasicRates, "basic_rates", V::Any),
    D::new(C::RequireHt, "require_ht", V::Int(0, 1)),
    D::new(C::Ieee80211n, "ieee80211n", V::Int(0, 1)).defaults_to("1"),
];

/// All descriptors in id order
pub fn commands() -> &'static [CommandDescriptor] {
    &COMMANDS
}

/// Resolve the command named at the start of `text`.
///
/// The name runs up to the first `=` or the end of the text, trailing
/// blanks ignored, and must match a registered name exactly.
pub fn lookup(text: &str) -> Option<&'static CommandDescriptor> {
    let name = text
        .split('=')
        .next()
        .unwrap_or(text)
        .trim_end_matches([' ', '\t']);
    COMMANDS.iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_match_positions() {
        for (index, descriptor) in commands().iter().enumerate() {
            assert_eq!(descriptor.id as usize, index, "{}", descriptor.name);
        }
        assert_eq!(CommandId::Ieee80211n as usize, COMMAND_COUNT - 1);
    }

    #[test]
    fn test_names_unique() {
        let names: HashSet<_> = commands().iter().map(|d| d.name).collect();
        assert_eq!(names.len(), COMMAND_COUNT);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("ssid").unwrap().id, CommandId::Ssid);
        assert_eq!(lookup("ssid=MyNet").unwrap().id, CommandId::Ssid);
        assert_eq!(lookup("channel \t").unwrap().id, CommandId::Channel);
        assert_eq!(lookup("wep_key0=abc").unwrap().id, CommandId::WepKey0);
        assert_eq!(lookup("wps_state=1").unwrap().id, CommandId::WpsState);

        assert!(lookup("unknownkey=1").is_none());
        assert!(lookup("ssi").is_none());
        assert!(lookup("ssidx=1").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_ini_redirects() {
        let rate = CommandId::DataRate.descriptor();
        assert_eq!(rate.location(), Some((FileKind::Ini, "gFixedRate")));

        let mac = CommandId::MacAddress.descriptor();
        assert_eq!(mac.location(), Some((FileKind::Ini, "gAPMacAddr")));
        assert_eq!(mac.effective_default(), Some("00deadbeef04"));

        let shutoff = CommandId::AutoShutOffTime.descriptor();
        assert_eq!(shutoff.effective_default(), Some("0"));

        assert_eq!(
            CommandId::Ssid.descriptor().location(),
            Some((FileKind::Hostapd, "ssid"))
        );
        assert_eq!(CommandId::SecurityMode.descriptor().location(), None);
    }

    #[test]
    fn test_validators() {
        assert_eq!(V::Int(0, 165).normalize("013").unwrap(), "13");
        assert!(V::Int(0, 165).normalize("abc").is_err());
        assert!(V::Int(20, 1000).normalize("10").is_err());

        assert_eq!(V::OneOf(HW_MODES).normalize("g-only").unwrap(), "g-only");
        assert!(V::OneOf(HW_MODES).normalize("ac").is_err());

        assert_eq!(
            V::Mac.normalize("aa:bb:cc:dd:ee:ff").unwrap(),
            "AA:BB:CC:DD:EE:FF"
        );
        assert_eq!(
            V::Uuid.normalize("12345678-9ABC-DEF0-1234-56789ABCDEF0").unwrap(),
            "12345678-9abc-def0-1234-56789abcdef0"
        );
        assert!(V::Uuid.normalize("not-a-uuid").is_err());

        assert!(V::Len(1, 8).normalize("123456789").is_err());
        assert!(V::Any.normalize("line\nbreak").is_err());
        assert_eq!(V::NoValue.normalize("").unwrap(), "");
    }

    #[test]
    fn test_access() {
        assert!(!CommandId::Commit.descriptor().handler.readable());
        assert!(!CommandId::AllowList.descriptor().handler.writable());
        assert!(!CommandId::SdkVersion.descriptor().handler.writable());
        assert!(CommandId::Channel.descriptor().handler.readable());
        assert!(CommandId::Channel.descriptor().handler.writable());
    }
}
