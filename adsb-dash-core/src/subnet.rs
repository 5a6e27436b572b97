//! /24 subnet expansion for the host sweep.

use std::net::Ipv4Addr;

/// All usable host addresses of the /24 containing `local`.
///
/// Always `.1` through `.254`; other prefix lengths are not supported.
pub fn subnet_hosts(local: Ipv4Addr) -> Vec<Ipv4Addr> {
    let [a, b, c, _] = local.octets();
    (1..=254).map(|d| Ipv4Addr::new(a, b, c, d)).collect()
}
