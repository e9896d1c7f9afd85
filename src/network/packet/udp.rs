use super::NetworkEndpoints;
use crate::network::checksum::ChecksumRegion;
use pnet::packet::ip::IpNextHeaderProtocols;

pub const HEADER_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UDPHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub checksum: u16,
}

impl UDPHeader {
    pub fn new(source_port: u16, destination_port: u16) -> Self {
        Self {
            source_port,
            destination_port,
            checksum: 0,
        }
    }

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < HEADER_LENGTH {
            return None;
        }

        let source_port = u16::from_be_bytes([data[0], data[1]]);
        let destination_port = u16::from_be_bytes([data[2], data[3]]);
        let length = u16::from_be_bytes([data[4], data[5]]) as usize;
        let checksum = u16::from_be_bytes([data[6], data[7]]);

        let end = length.clamp(HEADER_LENGTH, data.len());

        Some((
            Self {
                source_port,
                destination_port,
                checksum,
            },
            &data[HEADER_LENGTH..end],
        ))
    }

    pub fn encode(&self, endpoints: Option<NetworkEndpoints>, payload: &[u8]) -> Vec<u8> {
        let length = HEADER_LENGTH + payload.len();
        let mut buffer = Vec::with_capacity(length);

        buffer.extend_from_slice(&self.source_port.to_be_bytes());
        buffer.extend_from_slice(&self.destination_port.to_be_bytes());
        buffer.extend_from_slice(&(length as u16).to_be_bytes());
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(payload);

        let pseudo_header = endpoints
            .and_then(|e| e.pseudo_header(IpNextHeaderProtocols::Udp.0, length))
            .unwrap_or_default();
        let value = ChecksumRegion::with_pseudo_header(0, length, pseudo_header).patch(&mut buffer, 6);

        // 0 は「チェックサム無し」を意味するので 0xFFFF で送る
        if value == 0 {
            buffer[6..8].copy_from_slice(&0xFFFFu16.to_be_bytes());
        }

        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::checksum::checksum;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_encode_length_and_checksum() {
        let endpoints = NetworkEndpoints::new(
            IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(192, 168, 0, 2)),
        );
        let bytes = UDPHeader::new(53, 5353).encode(Some(endpoints), b"abc");
        assert_eq!(&bytes[4..6], &11u16.to_be_bytes());

        // 疑似ヘッダーを付けて再計算すると0になる
        let mut verify = endpoints.pseudo_header(17, bytes.len()).unwrap();
        verify.extend_from_slice(&bytes);
        assert_eq!(checksum(&verify), 0);
    }

    #[test]
    fn test_ipv6_pseudo_header_is_used() {
        let v6 = NetworkEndpoints::new(
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
        );
        let with = UDPHeader::new(1, 2).encode(Some(v6), &[]);
        let without = UDPHeader::new(1, 2).encode(None, &[]);
        assert_ne!(&with[6..8], &without[6..8]);
    }

    #[test]
    fn test_parse_honours_length_field() {
        let mut bytes = UDPHeader::new(1000, 2000).encode(None, &[7, 7]);
        bytes.extend_from_slice(&[0, 0, 0]);
        let (parsed, rest) = UDPHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.source_port, 1000);
        assert_eq!(parsed.destination_port, 2000);
        assert_eq!(rest, &[7, 7]);
    }
}
