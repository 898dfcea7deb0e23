//! Config Store
//!
//! Read, write and enable/disable operations on line-oriented `key=value`
//! files. Every mutation streams the file into a sibling temp file
//! (`<path>~`) and renames it over the original, so a reader only ever sees
//! the old content or the complete new content.

use crate::error::{SapError, SapResult};
use std::ffi::OsString;
use std::fs::{self, File, Permissions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Line that closes the editable region of an ini-style file
pub const INI_END_SENTINEL: &[u8] = b"END";

/// Which dialect a file follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// hostapd.conf
    Hostapd,
    /// Driver ini; new keys go before `END`, the tail is preserved verbatim
    Ini,
}

/// Whether reads consider commented-out entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentPolicy {
    EnabledOnly,
    IncludeCommented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Enable,
    Disable,
}

impl From<bool> for Toggle {
    fn from(enable: bool) -> Self {
        if enable {
            Toggle::Enable
        } else {
            Toggle::Disable
        }
    }
}

/// Result of a successful write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The driver ini changed; the SoftAP needs a reload to pick it up
    pub ini_updated: bool,
}

/// A `key=value` file on disk
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    kind: FileKind,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn hostapd(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileKind::Hostapd)
    }

    pub fn ini(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileKind::Ini)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Look up the value of `key`. `Ok(None)` when no matching line exists.
    pub fn read_value(&self, key: &str, policy: CommentPolicy) -> SapResult<Option<String>> {
        let file = File::open(&self.path).map_err(|source| SapError::FileOpen {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(None);
            }

            let text = match (line.first(), policy) {
                (Some(b'#'), CommentPolicy::EnabledOnly) => continue,
                (Some(b'#'), CommentPolicy::IncludeCommented) => &line[1..],
                _ => &line[..],
            };

            if matches_key(text, key) {
                let value = trim_eol(&text[key.len() + 1..]);
                return Ok(Some(String::from_utf8_lossy(value).into_owned()));
            }
        }
    }

    /// Value of `key`, falling back to `default` when the key is absent.
    pub fn read_field(
        &self,
        key: &str,
        default: Option<&str>,
        policy: CommentPolicy,
    ) -> SapResult<String> {
        match self.read_value(key, policy)? {
            Some(value) => Ok(value),
            None => default
                .map(str::to_string)
                .ok_or_else(|| SapError::ParamMissing(key.to_string())),
        }
    }

    /// Set `key=value`, replacing the first matching line (commented or not)
    /// or inserting a new one.
    pub fn write_field(&self, key: &str, value: &str) -> SapResult<WriteOutcome> {
        let ini = self.kind == FileKind::Ini;

        let replaced = self.rewrite(|reader, out| {
            let mut line = Vec::new();
            let mut replaced = false;
            let mut terminated = true;
            let mut sentinel_seen = false;

            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line)? == 0 {
                    break;
                }

                let text = strip_comment(&line);
                if ini && text.starts_with(INI_END_SENTINEL) {
                    sentinel_seen = true;
                    break;
                }

                if !replaced && matches_key(text, key) {
                    writeln!(out, "{}={}", key, value)?;
                    replaced = true;
                    terminated = true;
                    continue;
                }

                out.write_all(&line)?;
                terminated = line.ends_with(b"\n");
            }

            if !replaced {
                if !terminated {
                    out.write_all(b"\n")?;
                }
                writeln!(out, "{}={}", key, value)?;
            }

            if ini {
                out.write_all(INI_END_SENTINEL)?;
                out.write_all(b"\n")?;
                if sentinel_seen {
                    io::copy(reader, out)?;
                }
            }

            Ok(replaced)
        })?;

        debug!(
            "{} {}={} in {:?}",
            if replaced { "Updated" } else { "Added" },
            key,
            value,
            self.path
        );

        Ok(WriteOutcome { ini_updated: ini })
    }

    /// Comment out (disable) or uncomment (enable) every line holding `key`.
    /// Other lines are copied byte for byte.
    pub fn toggle_field(&self, key: &str, toggle: Toggle) -> SapResult<()> {
        self.rewrite(|reader, out| {
            let mut line = Vec::new();
            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line)? == 0 {
                    return Ok(());
                }

                let text = strip_comment(&line);
                if matches_key(text, key) {
                    if toggle == Toggle::Disable {
                        out.write_all(b"#")?;
                    }
                    out.write_all(text)?;
                } else {
                    out.write_all(&line)?;
                }
            }
        })
    }

    /// Replace the whole file with the content of `source`.
    pub fn replace_with(&self, source: &Path) -> SapResult<()> {
        let mut input = File::open(source).map_err(|e| SapError::FileOpen {
            path: source.to_path_buf(),
            source: e,
        })?;
        let permissions = fs::metadata(&self.path).ok().map(|m| m.permissions());
        replace_atomically(&self.path, permissions, |out| {
            io::copy(&mut input, out).map(|_| ())
        })
    }

    fn rewrite<F, R>(&self, transform: F) -> SapResult<R>
    where
        F: FnOnce(&mut dyn BufRead, &mut dyn Write) -> io::Result<R>,
    {
        let source = File::open(&self.path).map_err(|e| SapError::FileOpen {
            path: self.path.clone(),
            source: e,
        })?;
        let permissions = source.metadata().ok().map(|m| m.permissions());
        replace_atomically(&self.path, permissions, move |out| {
            let mut reader = BufReader::new(source);
            transform(&mut reader, out)
        })
    }
}

/// Removes the temp file unless it was renamed into place
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Sibling temp path used while rewriting `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push("~");
    PathBuf::from(name)
}

/// Fill a temp file next to `path` and rename it over `path`.
///
/// The original is untouched until the rename; the temp file is removed on
/// every failure path.
pub(crate) fn replace_atomically<F, R>(
    path: &Path,
    permissions: Option<Permissions>,
    fill: F,
) -> SapResult<R>
where
    F: FnOnce(&mut dyn Write) -> io::Result<R>,
{
    let tmp_path = temp_path(path);
    let tmp = File::create(&tmp_path).map_err(|source| SapError::FileOpen {
        path: tmp_path.clone(),
        source,
    })?;
    let mut guard = TempFileGuard {
        path: tmp_path.clone(),
        armed: true,
    };

    let mut writer = BufWriter::new(tmp);
    let result = fill(&mut writer)?;
    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.sync_all()?;
    drop(tmp);

    if let Some(permissions) = permissions {
        fs::set_permissions(&tmp_path, permissions)?;
    }

    fs::rename(&tmp_path, path).map_err(|source| SapError::Rename {
        path: path.to_path_buf(),
        source,
    })?;
    guard.armed = false;

    Ok(result)
}

fn strip_comment(line: &[u8]) -> &[u8] {
    line.strip_prefix(b"#").unwrap_or(line)
}

fn matches_key(text: &[u8], key: &str) -> bool {
    text.starts_with(key.as_bytes()) && text.get(key.len()) == Some(&b'=')
}

fn trim_eol(value: &[u8]) -> &[u8] {
    let end = value
        .iter()
        .rposition(|b| *b != b'\r' && *b != b'\n')
        .map_or(0, |i| i + 1);
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hostapd_file(dir: &TempDir, content: &str) -> ConfigFile {
        let path = dir.path().join("hostapd.conf");
        fs::write(&path, content).unwrap();
        ConfigFile::hostapd(path)
    }

    fn ini_file(dir: &TempDir, content: &str) -> ConfigFile {
        let path = dir.path().join("qcom_cfg.ini");
        fs::write(&path, content).unwrap();
        ConfigFile::ini(path)
    }

    fn content(file: &ConfigFile) -> String {
        fs::read_to_string(file.path()).unwrap()
    }

    #[test]
    fn test_read_value() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(
            &dir,
            "interface=wlan0\r\n#wpa=2\nssid=Home Net\nssid_extra=x\nchannel=6",
        );

        assert_eq!(
            file.read_value("ssid", CommentPolicy::EnabledOnly).unwrap(),
            Some("Home Net".to_string())
        );
        assert_eq!(
            file.read_value("interface", CommentPolicy::EnabledOnly).unwrap(),
            Some("wlan0".to_string())
        );
        assert_eq!(
            file.read_value("channel", CommentPolicy::EnabledOnly).unwrap(),
            Some("6".to_string())
        );
        assert_eq!(file.read_value("wpa", CommentPolicy::EnabledOnly).unwrap(), None);
        assert_eq!(
            file.read_value("wpa", CommentPolicy::IncludeCommented).unwrap(),
            Some("2".to_string())
        );
        // A key is only matched when followed immediately by '='
        assert_eq!(file.read_value("ssi", CommentPolicy::EnabledOnly).unwrap(), None);
    }

    #[test]
    fn test_read_field_default_and_missing() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "channel=1\n");

        assert_eq!(
            file.read_field("beacon_int", Some("100"), CommentPolicy::EnabledOnly)
                .unwrap(),
            "100"
        );
        let err = file
            .read_field("wpa_passphrase", None, CommentPolicy::EnabledOnly)
            .unwrap_err();
        assert!(matches!(err, SapError::ParamMissing(_)));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::hostapd(dir.path().join("absent.conf"));
        let err = file.read_value("ssid", CommentPolicy::EnabledOnly).unwrap_err();
        assert!(matches!(err, SapError::FileOpen { .. }));
    }

    #[test]
    fn test_write_replaces_first_match() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "# comment\nssid=Old\nchannel=1\nssid=Shadow\n");

        file.write_field("ssid", "New").unwrap();
        assert_eq!(content(&file), "# comment\nssid=New\nchannel=1\nssid=Shadow\n");
    }

    #[test]
    fn test_write_enables_commented_entry() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "#wep_key0=\"abcde\"\nchannel=1\n");

        file.write_field("wep_key0", "0123456789").unwrap();
        assert_eq!(content(&file), "wep_key0=0123456789\nchannel=1\n");
    }

    #[test]
    fn test_write_appends_missing_key() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "channel=1\n");

        let outcome = file.write_field("ssid", "MyNet").unwrap();
        assert!(!outcome.ini_updated);
        assert_eq!(content(&file), "channel=1\nssid=MyNet\n");
    }

    #[test]
    fn test_write_appends_after_unterminated_line() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "channel=1");

        file.write_field("ssid", "MyNet").unwrap();
        assert_eq!(content(&file), "channel=1\nssid=MyNet\n");
    }

    #[test]
    fn test_ini_write_preserves_tail() {
        let dir = TempDir::new().unwrap();
        let file = ini_file(
            &dir,
            "gEnableApProt=1\nEND\n\n# Note: tail\nvendor_blob=abc\n",
        );

        let outcome = file.write_field("gTxPowerCap", "20").unwrap();
        assert!(outcome.ini_updated);
        assert_eq!(
            content(&file),
            "gEnableApProt=1\ngTxPowerCap=20\nEND\n\n# Note: tail\nvendor_blob=abc\n"
        );

        file.write_field("gEnableApProt", "0").unwrap();
        assert_eq!(
            content(&file),
            "gEnableApProt=0\ngTxPowerCap=20\nEND\n\n# Note: tail\nvendor_blob=abc\n"
        );
    }

    #[test]
    fn test_ini_write_adds_sentinel() {
        let dir = TempDir::new().unwrap();
        let file = ini_file(&dir, "gEnableApProt=1\n");

        file.write_field("WmmIsEnabled", "1").unwrap();
        assert_eq!(content(&file), "gEnableApProt=1\nWmmIsEnabled=1\nEND\n");
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "ssid=Home\nchannel=11\nbeacon_int=100\n");

        for key in ["ssid", "channel", "beacon_int"] {
            let before = file
                .read_value(key, CommentPolicy::EnabledOnly)
                .unwrap()
                .unwrap();
            file.write_field(key, &before).unwrap();
            let after = file
                .read_value(key, CommentPolicy::EnabledOnly)
                .unwrap()
                .unwrap();
            assert_eq!(before, after);
        }
        assert_eq!(content(&file), "ssid=Home\nchannel=11\nbeacon_int=100\n");
    }

    #[test]
    fn test_toggle_round_trip() {
        let dir = TempDir::new().unwrap();
        let original = "ssid=Home\nwpa_passphrase=secret123\n#other=1\nchannel=6\n";
        let file = hostapd_file(&dir, original);

        file.toggle_field("wpa_passphrase", Toggle::Disable).unwrap();
        assert_eq!(
            content(&file),
            "ssid=Home\n#wpa_passphrase=secret123\n#other=1\nchannel=6\n"
        );
        assert_eq!(
            file.read_value("wpa_passphrase", CommentPolicy::EnabledOnly)
                .unwrap(),
            None
        );

        // Disabling twice does not stack comment markers
        file.toggle_field("wpa_passphrase", Toggle::Disable).unwrap();
        file.toggle_field("wpa_passphrase", Toggle::Enable).unwrap();
        assert_eq!(content(&file), original);
    }

    #[test]
    fn test_toggle_absent_key_is_noop() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "ssid=Home\n");

        file.toggle_field("wep_key0", Toggle::Enable).unwrap();
        assert_eq!(content(&file), "ssid=Home\n");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "ssid=Home\n");

        file.write_field("channel", "6").unwrap();
        file.toggle_field("channel", Toggle::Disable).unwrap();
        assert!(!temp_path(file.path()).exists());
    }

    #[test]
    fn test_write_missing_file_fails_without_temp() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::hostapd(dir.path().join("absent.conf"));

        let err = file.write_field("ssid", "x").unwrap_err();
        assert!(matches!(err, SapError::FileOpen { .. }));
        assert!(!temp_path(file.path()).exists());
        assert!(!file.path().exists());
    }

    #[test]
    fn test_replace_with() {
        let dir = TempDir::new().unwrap();
        let file = hostapd_file(&dir, "ssid=Changed\n");
        let defaults = dir.path().join("hostapd_default.conf");
        fs::write(&defaults, "ssid=Default\nchannel=1\n").unwrap();

        file.replace_with(&defaults).unwrap();
        assert_eq!(content(&file), "ssid=Default\nchannel=1\n");

        let err = file
            .replace_with(&dir.path().join("missing_default.conf"))
            .unwrap_err();
        assert!(matches!(err, SapError::FileOpen { .. }));
        assert_eq!(content(&file), "ssid=Default\nchannel=1\n");
    }
}
