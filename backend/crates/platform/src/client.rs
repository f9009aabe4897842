//! Client identification utilities
//!
//! Resolves the originating client IP behind reverse proxies and CDNs.

use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Proxy headers consulted in priority order
pub const CLIENT_IP_HEADERS: [&str; 7] = [
    "cf-connecting-ip",
    "client-ip",
    "x-forwarded-for",
    "x-forwarded",
    "x-cluster-client-ip",
    "forwarded-for",
    "forwarded",
];

/// Extract client IP address from headers
///
/// Walks [`CLIENT_IP_HEADERS`] in order, takes the first entry of each
/// comma-separated list and accepts it only if it is a publicly routable
/// address. Falls back to the socket peer address.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `peer_ip` - Direct connection IP address
///
/// ## Returns
/// The client IP address, or None if not determinable
pub fn extract_client_ip(headers: &HeaderMap, peer_ip: Option<IpAddr>) -> Option<IpAddr> {
    for name in CLIENT_IP_HEADERS {
        let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
            continue;
        };

        let Some(first) = value.split(',').next() else {
            continue;
        };

        if let Some(ip) = parse_candidate(first) {
            if is_routable(ip) {
                return Some(ip);
            }
        }
    }
    peer_ip
}

/// Parse one list entry: a bare address, `ip:port`, `[v6]:port`, or an
/// RFC 7239 `for=` pair
fn parse_candidate(raw: &str) -> Option<IpAddr> {
    let mut candidate = raw.trim();

    if let Some(pair) = candidate
        .split(';')
        .map(str::trim)
        .find(|part| {
            part.len() > 4 && part.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("for="))
        })
    {
        candidate = &pair[4..];
    }

    let candidate = candidate.trim_matches('"');

    if let Ok(ip) = candidate.parse::<IpAddr>() {
        return Some(ip);
    }

    // [2001:db8::1]:443
    if let Some(rest) = candidate.strip_prefix('[') {
        let (addr, _) = rest.split_once(']')?;
        return addr.parse::<Ipv6Addr>().ok().map(IpAddr::V6);
    }

    // 203.0.113.7:8080
    let (addr, _port) = candidate.rsplit_once(':')?;
    addr.parse::<Ipv4Addr>().ok().map(IpAddr::V4)
}

/// Whether the address can be a real client on the public internet
///
/// Rejects private, loopback, link-local, unspecified, documentation,
/// shared (CGNAT), reserved, broadcast and multicast ranges.
pub fn is_routable(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_routable_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_routable_v4(v4),
            None => is_routable_v6(v6),
        },
    }
}

fn is_routable_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (64..128).contains(&b);
    let reserved = a >= 240;
    let this_network = a == 0;

    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_documentation()
        || ip.is_broadcast()
        || ip.is_multicast()
        || shared
        || reserved
        || this_network)
}

fn is_routable_v6(ip: Ipv6Addr) -> bool {
    let segments = ip.segments();
    let documentation = segments[0] == 0x2001 && segments[1] == 0x0db8;

    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || ip.is_unique_local()
        || ip.is_unicast_link_local()
        || documentation)
}
