use std::net::IpAddr;

use crate::error::{Result, StoreError};

/// RFC 1918 ranges. IPv4-mapped IPv6 addresses are classified by their IPv4
/// form, any other IPv6 address is public.
pub fn is_private(ip: &IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(ip) => ip.is_private(),
        IpAddr::V6(_) => false,
    }
}

pub fn parse_ip(field: &str, value: &str) -> Result<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| StoreError::invalid_input(field, format!("`{value}` is not an IP address")))
}
