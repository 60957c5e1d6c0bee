//! SSRF protection: classifies outbound addresses against non-public ranges.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Why an address is refused, or `None` when it is publicly routable.
pub fn blocked_range(ip: &IpAddr) -> Option<&'static str> {
    match ip {
        IpAddr::V4(v4) => blocked_v4(v4),
        IpAddr::V6(v6) => blocked_v6(v6),
    }
}

pub fn is_public_ip(ip: &IpAddr) -> bool {
    blocked_range(ip).is_none()
}

fn blocked_v4(v4: &Ipv4Addr) -> Option<&'static str> {
    let [a, b, c, _] = v4.octets();
    if v4.is_loopback() {
        Some("loopback")
    } else if v4.is_private() {
        Some("private")
    } else if v4.is_link_local() {
        // includes cloud metadata 169.254.169.254
        Some("link-local")
    } else if v4.is_multicast() {
        Some("multicast")
    } else if v4.is_unspecified() || a == 0 {
        Some("unspecified")
    } else if v4.is_broadcast() {
        Some("broadcast")
    } else if a == 100 && (b & 0xc0) == 64 {
        // 100.64.0.0/10
        Some("shared address space")
    } else if a == 198 && (b & 0xfe) == 18 {
        // 198.18.0.0/15
        Some("benchmarking")
    } else if a == 192 && b == 0 && c == 0 {
        Some("protocol assignments")
    } else if v4.is_documentation() {
        Some("documentation")
    } else if a >= 240 {
        Some("reserved")
    } else {
        None
    }
}

fn blocked_v6(v6: &Ipv6Addr) -> Option<&'static str> {
    if let Some(v4) = v6.to_ipv4_mapped() {
        return blocked_v4(&v4);
    }
    if v6.is_loopback() {
        return Some("loopback");
    }
    if v6.is_unspecified() {
        return Some("unspecified");
    }
    if let Some(v4) = embedded_v4(v6) {
        return blocked_v4(&v4);
    }
    let segs = v6.segments();
    if v6.is_multicast() {
        Some("multicast")
    } else if (segs[0] & 0xfe00) == 0xfc00 {
        // unique-local fc00::/7
        Some("private")
    } else if (segs[0] & 0xffc0) == 0xfe80 {
        // link-local fe80::/10
        Some("link-local")
    } else if segs[0] == 0x2001 && segs[1] == 0x0db8 {
        Some("documentation")
    } else {
        None
    }
}

/// IPv4 address carried inside an IPv6 one: IPv4-compatible `::/96`,
/// NAT64 `64:ff9b::/96`, and 6to4 `2002::/16`.
fn embedded_v4(v6: &Ipv6Addr) -> Option<Ipv4Addr> {
    let segs = v6.segments();
    let from_pair = |hi: u16, lo: u16| {
        let [a, b] = hi.to_be_bytes();
        let [c, d] = lo.to_be_bytes();
        Ipv4Addr::new(a, b, c, d)
    };
    if segs[..6] == [0; 6] {
        Some(from_pair(segs[6], segs[7]))
    } else if segs[0] == 0x0064 && segs[1] == 0xff9b && segs[2..6] == [0; 4] {
        Some(from_pair(segs[6], segs[7]))
    } else if segs[0] == 0x2002 {
        Some(from_pair(segs[1], segs[2]))
    } else {
        None
    }
}

/// Literal-host check that needs no DNS: `localhost` names and IP literals.
pub fn blocked_literal_host(host: &str) -> Option<&'static str> {
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let lower = bare.trim_end_matches('.').to_ascii_lowercase();
    if lower == "localhost" || lower.ends_with(".localhost") {
        return Some("loopback");
    }
    bare.parse::<IpAddr>()
        .ok()
        .and_then(|ip| blocked_range(&ip))
}
