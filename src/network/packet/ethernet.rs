use crate::network::address::{mac_from_slice, mac_octets};
use pnet::util::MacAddr;

pub const HEADER_LENGTH: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub ethertype: u16,
}

impl EthernetHeader {
    pub fn new(source: MacAddr, destination: MacAddr, ethertype: u16) -> Self {
        Self {
            destination,
            source,
            ethertype,
        }
    }

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < HEADER_LENGTH {
            return None;
        }

        let destination = mac_from_slice(&data[0..6]);
        let source = mac_from_slice(&data[6..12]);
        let ethertype = u16::from_be_bytes([data[12], data[13]]);

        Some((
            Self {
                destination,
                source,
                ethertype,
            },
            &data[HEADER_LENGTH..],
        ))
    }

    /// `ethertype` は次の層から決まった値 (次の層が無ければ自身の値)
    pub fn encode(&self, ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_LENGTH + payload.len());
        buffer.extend_from_slice(&mac_octets(&self.destination));
        buffer.extend_from_slice(&mac_octets(&self.source));
        buffer.extend_from_slice(&ethertype.to_be_bytes());
        buffer.extend_from_slice(payload);
        buffer
    }
}
