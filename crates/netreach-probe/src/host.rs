//! Local host identity and name resolution.

use crate::error::HostError;
use std::net::{IpAddr, ToSocketAddrs};
#[cfg(unix)]
use std::{
    ffi::{CStr, CString},
    ptr,
};

/// The name this machine reports for itself.
#[cfg(unix)]
pub fn local_hostname() -> Result<String, HostError> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes and gethostname writes at most that many.
    let result = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if result != 0 {
        return Err(HostError::Hostname(std::io::Error::last_os_error()));
    }

    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..len].to_vec()).map_err(|_| HostError::NotUtf8)
}

#[cfg(not(unix))]
pub fn local_hostname() -> Result<String, HostError> {
    std::env::var("COMPUTERNAME").map_err(|err| match err {
        std::env::VarError::NotUnicode(_) => HostError::NotUtf8,
        std::env::VarError::NotPresent => HostError::Hostname(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "COMPUTERNAME is not set",
        )),
    })
}

/// Fully qualified name of this machine. Falls back to the plain hostname
/// when the resolver has no canonical name for it.
pub fn local_fqdn() -> Result<String, HostError> {
    let hostname = local_hostname()?;
    Ok(canonical_name(&hostname).unwrap_or(hostname))
}

#[cfg(unix)]
fn canonical_name(host: &str) -> Option<String> {
    let c_host = CString::new(host).ok()?;

    // SAFETY: an all-zero addrinfo is the documented "no hints" value.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_flags = libc::AI_CANONNAME;

    let mut res: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: c_host is NUL-terminated and res is freed below on success.
    let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), ptr::null(), &hints, &mut res) };
    if rc != 0 || res.is_null() {
        return None;
    }

    // SAFETY: res is a valid list returned by getaddrinfo; ai_canonname is
    // either null or a NUL-terminated string owned by that list.
    let name = unsafe {
        let canon = (*res).ai_canonname;
        if canon.is_null() {
            None
        } else {
            CStr::from_ptr(canon).to_str().ok().map(str::to_string)
        }
    };
    unsafe { libc::freeaddrinfo(res) };

    name.filter(|name| !name.is_empty())
}

#[cfg(not(unix))]
fn canonical_name(host: &str) -> Option<String> {
    let domain = std::env::var("USERDNSDOMAIN").ok()?;
    let domain = domain.trim().to_ascii_lowercase();
    if domain.is_empty() || host.contains('.') {
        return None;
    }
    Some(format!("{host}.{domain}"))
}

/// Every address `host` resolves to, IPv4 first, duplicates removed.
pub fn resolve_host(host: &str) -> Result<Vec<IpAddr>, HostError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }

    let addrs = (host, 0u16)
        .to_socket_addrs()
        .map_err(|source| HostError::Resolve {
            host: host.to_string(),
            source,
        })?;

    let mut ips: Vec<IpAddr> = Vec::new();
    for addr in addrs {
        if !ips.contains(&addr.ip()) {
            ips.push(addr.ip());
        }
    }
    ips.sort_by_key(|ip| ip.is_ipv6());

    if ips.is_empty() {
        return Err(HostError::NoAddress(host.to_string()));
    }
    Ok(ips)
}

/// First address for `host`, preferring IPv4.
pub fn resolve_ip(host: &str) -> Result<IpAddr, HostError> {
    let ips = resolve_host(host)?;
    ips.into_iter()
        .next()
        .ok_or_else(|| HostError::NoAddress(host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn literal_addresses_skip_lookup() {
        assert_eq!(
            resolve_host("127.0.0.1").unwrap(),
            vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]
        );
        assert_eq!(resolve_ip("::1").unwrap().to_string(), "::1");
    }

    #[test]
    fn localhost_resolves() {
        let ips = resolve_host("localhost").unwrap();
        assert!(ips.iter().all(|ip| ip.is_loopback()));
    }

    #[test]
    fn local_hostname_is_not_empty() {
        assert!(!local_hostname().unwrap().is_empty());
    }

    #[test]
    fn local_fqdn_is_not_empty() {
        assert!(!local_fqdn().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn canonical_name_of_localhost() {
        let name = canonical_name("localhost").unwrap();
        assert!(!name.is_empty());
        assert!(canonical_name("bad\0name").is_none());
    }

    #[test]
    fn invalid_name_is_an_error() {
        assert!(resolve_host("name with spaces.invalid").is_err());
    }
}
