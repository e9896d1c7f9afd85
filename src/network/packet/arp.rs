use crate::network::address::{mac_from_slice, mac_octets};
use pnet::packet::ethernet::EtherTypes;
use pnet::util::MacAddr;
use std::net::Ipv4Addr;

pub const HEADER_LENGTH: usize = 28;

pub const HARDWARE_ETHERNET: u16 = 1;
pub const OPERATION_REQUEST: u16 = 1;
pub const OPERATION_REPLY: u16 = 2;

/// Ethernet上のIPv4用ARP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpHeader {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub operation: u16,
    pub sender_hardware_address: MacAddr,
    pub sender_protocol_address: Ipv4Addr,
    pub target_hardware_address: MacAddr,
    pub target_protocol_address: Ipv4Addr,
}

impl ArpHeader {
    pub fn new(
        operation: u16,
        sender_hardware_address: MacAddr,
        sender_protocol_address: Ipv4Addr,
        target_hardware_address: MacAddr,
        target_protocol_address: Ipv4Addr,
    ) -> Self {
        Self {
            hardware_type: HARDWARE_ETHERNET,
            protocol_type: EtherTypes::Ipv4.0,
            operation,
            sender_hardware_address,
            sender_protocol_address,
            target_hardware_address,
            target_protocol_address,
        }
    }

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < HEADER_LENGTH {
            return None;
        }

        // ハードウェア長とプロトコル長が 6/4 以外のものは扱わない
        if data[4] != 6 || data[5] != 4 {
            return None;
        }

        let hardware_type = u16::from_be_bytes([data[0], data[1]]);
        let protocol_type = u16::from_be_bytes([data[2], data[3]]);
        let operation = u16::from_be_bytes([data[6], data[7]]);
        let sender_hardware_address = mac_from_slice(&data[8..14]);
        let sender_protocol_address = Ipv4Addr::new(data[14], data[15], data[16], data[17]);
        let target_hardware_address = mac_from_slice(&data[18..24]);
        let target_protocol_address = Ipv4Addr::new(data[24], data[25], data[26], data[27]);

        Some((
            Self {
                hardware_type,
                protocol_type,
                operation,
                sender_hardware_address,
                sender_protocol_address,
                target_hardware_address,
                target_protocol_address,
            },
            &data[HEADER_LENGTH..],
        ))
    }

    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_LENGTH + payload.len());
        buffer.extend_from_slice(&self.hardware_type.to_be_bytes());
        buffer.extend_from_slice(&self.protocol_type.to_be_bytes());
        buffer.push(6);
        buffer.push(4);
        buffer.extend_from_slice(&self.operation.to_be_bytes());
        buffer.extend_from_slice(&mac_octets(&self.sender_hardware_address));
        buffer.extend_from_slice(&self.sender_protocol_address.octets());
        buffer.extend_from_slice(&mac_octets(&self.target_hardware_address));
        buffer.extend_from_slice(&self.target_protocol_address.octets());
        buffer.extend_from_slice(payload);
        buffer
    }
}
