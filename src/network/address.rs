use crate::core::error::AddressError;
use pnet::util::MacAddr;
use std::net::{Ipv4Addr, Ipv6Addr};

/// `aa:bb:cc:dd:ee:ff` 形式のMACアドレスを解析する
///
/// 2桁の16進数6個をコロンで区切った形式のみ受け付ける (大文字小文字は問わない)。
pub fn parse_mac(address: &str) -> Result<MacAddr, AddressError> {
    let invalid = || AddressError::InvalidMac(address.to_string());

    let mut octets = [0u8; 6];
    let mut parts = address.split(':');
    for octet in octets.iter_mut() {
        let part = parts.next().ok_or_else(invalid)?;
        // from_str_radix は先頭の '+' を受け付けてしまう
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }

    Ok(MacAddr::new(octets[0], octets[1], octets[2], octets[3], octets[4], octets[5]))
}

/// 表示用: コロン区切りの大文字16進数
pub fn format_mac(address: &MacAddr) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        address.0, address.1, address.2, address.3, address.4, address.5
    )
}

pub fn mac_octets(address: &MacAddr) -> [u8; 6] {
    [address.0, address.1, address.2, address.3, address.4, address.5]
}

pub fn mac_from_slice(data: &[u8]) -> MacAddr {
    MacAddr::new(data[0], data[1], data[2], data[3], data[4], data[5])
}

pub fn parse_ipv4(address: &str) -> Result<Ipv4Addr, AddressError> {
    address
        .parse()
        .map_err(|_| AddressError::InvalidIp(address.to_string()))
}

pub fn parse_ipv6(address: &str) -> Result<Ipv6Addr, AddressError> {
    address
        .parse()
        .map_err(|_| AddressError::InvalidIp(address.to_string()))
}
