//! Wireless driver queries
//!
//! Four private wireless-extension ioctls issued on a throwaway datagram
//! socket: operating channel, associated stations, disassociate a station
//! and AP statistics.

use crate::error::{SapError, SapResult};
use crate::mac::MacAddr;
use crate::validation::validate_interface_name;
use std::mem;
use tracing::debug;

/// First private wireless-extension ioctl
pub const SIOCIWFIRSTPRIV: u32 = 0x8BE0;
pub const IOCTL_GET_CHANNEL: u32 = SIOCIWFIRSTPRIV + 9;
pub const IOCTL_ASSOC_STA_MACADDR: u32 = SIOCIWFIRSTPRIV + 10;
pub const IOCTL_DISASSOC_STA: u32 = SIOCIWFIRSTPRIV + 11;
pub const IOCTL_AP_STATS: u32 = SIOCIWFIRSTPRIV + 12;

/// Stations the association query has room for
pub const MAX_STATIONS: usize = 8;
const STATION_BUF_LEN: usize = MAX_STATIONS * 6 + 8;
const STATS_BUF_LEN: usize = 256;

/// Operations the driver exposes to the SoftAP engine
#[cfg_attr(test, mockall::automock)]
pub trait SoftapDriver: Send {
    /// Channel the AP is operating on
    fn operating_channel(&self, interface: &str) -> SapResult<u32>;
    /// MAC addresses of the associated stations
    fn associated_stations(&self, interface: &str) -> SapResult<Vec<MacAddr>>;
    /// Kick one station
    fn disassociate(&self, interface: &str, station: MacAddr) -> SapResult<()>;
    /// Opaque statistics text
    fn ap_statistics(&self, interface: &str) -> SapResult<String>;
}

/// Decode the association payload: a native `unsigned long` byte count
/// followed by packed 6-byte addresses.
pub fn parse_station_payload(buf: &[u8]) -> Vec<MacAddr> {
    let header = mem::size_of::<libc::c_ulong>();
    if buf.len() < header {
        return Vec::new();
    }

    let mut count = [0u8; mem::size_of::<libc::c_ulong>()];
    count.copy_from_slice(&buf[..header]);
    let len = libc::c_ulong::from_ne_bytes(count) as usize;

    let body = &buf[header..];
    let len = len.min(body.len());
    body[..len]
        .chunks_exact(6)
        .map(|chunk| {
            let mut octets = [0u8; 6];
            octets.copy_from_slice(chunk);
            MacAddr(octets)
        })
        .collect()
}

/// Decode a NUL-terminated statistics blob
pub fn parse_stats_payload(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).trim_end().to_string()
}

/// Driver access through `ioctl(2)`
#[derive(Debug, Default, Clone, Copy)]
pub struct IoctlDriver;

impl IoctlDriver {
    pub fn new() -> Self {
        IoctlDriver
    }
}

#[cfg(target_os = "linux")]
mod sys {
    use super::*;
    use std::os::unix::io::RawFd;

    #[repr(C)]
    #[derive(Clone, Copy)]
    struct IwPoint {
        pointer: *mut libc::c_void,
        length: u16,
        flags: u16,
    }

    /// `struct iwreq`: interface name plus the 16-byte `iwreq_data` union,
    /// of which only the `iw_point` member is used here
    #[repr(C)]
    struct IwReq {
        ifr_name: [libc::c_char; libc::IFNAMSIZ],
        data: IwPoint,
        _pad: [u8; 16 - mem::size_of::<IwPoint>()],
    }

    struct IoctlSocket(RawFd);

    impl IoctlSocket {
        fn open() -> SapResult<Self> {
            let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
            if fd < 0 {
                return Err(SapError::Driver(format!(
                    "Failed to open ioctl socket: {}",
                    std::io::Error::last_os_error()
                )));
            }
            Ok(IoctlSocket(fd))
        }
    }

    impl Drop for IoctlSocket {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.0);
            }
        }
    }

    /// Issue one private ioctl with `buf` as the `iw_point` payload
    pub(super) fn private_ioctl(interface: &str, request: u32, buf: &mut [u8]) -> SapResult<()> {
        validate_interface_name(interface)?;
        let length = u16::try_from(buf.len())
            .map_err(|_| SapError::Driver("ioctl payload too large".to_string()))?;

        let mut req = IwReq {
            ifr_name: [0; libc::IFNAMSIZ],
            data: IwPoint {
                pointer: buf.as_mut_ptr() as *mut libc::c_void,
                length,
                flags: 0,
            },
            _pad: [0; 16 - mem::size_of::<IwPoint>()],
        };
        for (dst, src) in req.ifr_name.iter_mut().zip(interface.as_bytes()) {
            *dst = *src as libc::c_char;
        }

        let socket = IoctlSocket::open()?;
        let res = unsafe { libc::ioctl(socket.0, request as _, &mut req as *mut IwReq) };
        if res < 0 {
            return Err(SapError::Driver(format!(
                "ioctl {:#x} on {} failed: {}",
                request,
                interface,
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use super::*;

    pub(super) fn private_ioctl(interface: &str, request: u32, _buf: &mut [u8]) -> SapResult<()> {
        validate_interface_name(interface)?;
        Err(SapError::Driver(format!(
            "ioctl {:#x} is only available on Linux",
            request
        )))
    }
}

impl SoftapDriver for IoctlDriver {
    fn operating_channel(&self, interface: &str) -> SapResult<u32> {
        let mut buf = [0u8; mem::size_of::<i32>()];
        sys::private_ioctl(interface, IOCTL_GET_CHANNEL, &mut buf)?;
        let channel = i32::from_ne_bytes(buf);
        debug!("Operating channel on {}: {}", interface, channel);
        u32::try_from(channel)
            .map_err(|_| SapError::Driver(format!("Driver reported channel {}", channel)))
    }

    fn associated_stations(&self, interface: &str) -> SapResult<Vec<MacAddr>> {
        let mut buf = [0u8; STATION_BUF_LEN];
        sys::private_ioctl(interface, IOCTL_ASSOC_STA_MACADDR, &mut buf)?;
        Ok(parse_station_payload(&buf))
    }

    fn disassociate(&self, interface: &str, station: MacAddr) -> SapResult<()> {
        let mut buf = station.octets();
        sys::private_ioctl(interface, IOCTL_DISASSOC_STA, &mut buf)?;
        debug!("Disassociated {} from {}", station, interface);
        Ok(())
    }

    fn ap_statistics(&self, interface: &str) -> SapResult<String> {
        let mut buf = [0u8; STATS_BUF_LEN];
        sys::private_ioctl(interface, IOCTL_AP_STATS, &mut buf)?;
        Ok(parse_stats_payload(&buf))
    }
}
