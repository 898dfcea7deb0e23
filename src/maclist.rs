//! MAC access lists
//!
//! Flat files holding one `XX:XX:XX:XX:XX:XX` per line. The hostapd file
//! names them through `accept_mac_file` and `deny_mac_file`.

use crate::error::{SapError, SapResult};
use crate::mac::{is_valid_mac, MAC_TEXT_LEN};
use crate::registry::AclList;
use crate::store::{replace_atomically, CommentPolicy, ConfigFile};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maximum number of entries in a list file
pub const MAX_ALLOWED_MAC: usize = 15;

/// Path of the list file, read from the hostapd file including a
/// commented-out entry.
pub fn resolve_list_path(hostapd: &ConfigFile, list: AclList) -> SapResult<PathBuf> {
    let key = list.path_key().name();
    hostapd
        .read_value(key, CommentPolicy::IncludeCommented)?
        .map(|path| PathBuf::from(path.trim()))
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or_else(|| SapError::ResourceUnavailable(format!("{} not configured", key)))
}

/// Append the valid MAC addresses in `input` (blank separated) until the
/// list holds [`MAX_ALLOWED_MAC`] lines. Every existing line counts, blank
/// ones included. Malformed tokens are skipped.
///
/// Returns the number of entries added. Creates the file when missing.
pub fn add_entries(path: &Path, input: &str) -> SapResult<usize> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SapError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;

    let existing = fs::read(path).map_err(|source| SapError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let count = existing.split_inclusive(|b| *b == b'\n').count();

    if count >= MAX_ALLOWED_MAC {
        warn!("MAC list {:?} is full", path);
        return Err(SapError::ListFull {
            path: path.to_path_buf(),
            count,
        });
    }

    let additions: Vec<&str> = input
        .split_whitespace()
        .filter(|token| is_valid_mac(token))
        .take(MAX_ALLOWED_MAC - count)
        .collect();

    let permissions = fs::metadata(path).ok().map(|m| m.permissions());
    replace_atomically(path, permissions, |out| {
        out.write_all(&existing)?;
        if !existing.is_empty() && !existing.ends_with(b"\n") {
            out.write_all(b"\n")?;
        }
        for mac in &additions {
            writeln!(out, "{}", mac)?;
        }
        Ok(())
    })?;

    debug!("Added {} entries to {:?}", additions.len(), path);
    Ok(additions.len())
}

fn mac_prefix(s: &str) -> &[u8] {
    let bytes = s.as_bytes();
    &bytes[..bytes.len().min(MAC_TEXT_LEN)]
}

/// Drop every line whose leading MAC matches one of the tokens in `input`
pub fn remove_entries(path: &Path, input: &str) -> SapResult<usize> {
    let file = fs::File::open(path).map_err(|source| SapError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let permissions = file.metadata().ok().map(|m| m.permissions());
    let targets: Vec<&[u8]> = input.split_whitespace().map(mac_prefix).collect();

    let removed = replace_atomically(path, permissions, |out| {
        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        let mut removed = 0;
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(removed);
            }
            let head = &line[..line.len().min(MAC_TEXT_LEN)];
            if targets.iter().any(|t| *t == head) {
                removed += 1;
            } else {
                out.write_all(&line)?;
            }
        }
    })?;

    debug!("Removed {} entries from {:?}", removed, path);
    Ok(removed)
}

/// Valid, uncommented entries of the list, at most [`MAX_ALLOWED_MAC`]
pub fn show_entries(path: &Path) -> SapResult<Vec<String>> {
    let file = fs::File::open(path).map_err(|source| SapError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }
        let entry = line.trim_end();
        if is_valid_mac(entry) {
            entries.push(entry.to_string());
            if entries.len() >= MAX_ALLOWED_MAC {
                break;
            }
        }
    }
    Ok(entries)
}
