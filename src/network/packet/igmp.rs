use crate::network::checksum::ChecksumRegion;
use std::net::Ipv4Addr;

pub const HEADER_LENGTH: usize = 8;

pub const MEMBERSHIP_REPORT_V2: u8 = 0x16;

/// IGMPv2 形式のメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IGMPHeader {
    pub message_type: u8,
    pub max_response_time: u8,
    pub checksum: u16,
    pub group_address: Ipv4Addr,
}

impl IGMPHeader {
    pub fn new(message_type: u8, max_response_time: u8, group_address: Ipv4Addr) -> Self {
        Self {
            message_type,
            max_response_time,
            checksum: 0,
            group_address,
        }
    }

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < HEADER_LENGTH {
            return None;
        }

        Some((
            Self {
                message_type: data[0],
                max_response_time: data[1],
                checksum: u16::from_be_bytes([data[2], data[3]]),
                group_address: Ipv4Addr::new(data[4], data[5], data[6], data[7]),
            },
            &data[HEADER_LENGTH..],
        ))
    }

    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_LENGTH + payload.len());
        buffer.push(self.message_type);
        buffer.push(self.max_response_time);
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&self.group_address.octets());
        buffer.extend_from_slice(payload);

        ChecksumRegion::new(0, buffer.len()).patch(&mut buffer, 2);
        buffer
    }
}
