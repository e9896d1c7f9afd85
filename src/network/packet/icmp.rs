use super::NetworkEndpoints;
use crate::network::checksum::ChecksumRegion;
use pnet::packet::ip::IpNextHeaderProtocols;

pub const HEADER_LENGTH: usize = 8;

pub const ICMPV4_ECHO_REQUEST: u8 = 8;

pub const ICMPV6_ECHO_REQUEST: u8 = 128;
pub const ICMPV6_MLD_QUERY: u8 = 130;
pub const ICMPV6_MLD_REPORT: u8 = 131;
pub const ICMPV6_MLD_DONE: u8 = 132;
pub const ICMPV6_ROUTER_SOLICITATION: u8 = 133;
pub const ICMPV6_ROUTER_ADVERTISEMENT: u8 = 134;
pub const ICMPV6_NEIGHBOR_SOLICITATION: u8 = 135;
pub const ICMPV6_NEIGHBOR_ADVERTISEMENT: u8 = 136;
pub const ICMPV6_REDIRECT: u8 = 137;
pub const ICMPV6_MLDV2_REPORT: u8 = 143;

/// NDP (RFC 4861) のタイプ。分類とフィルタの両方で同じ集合を使う。
pub const NDP_TYPES: [u8; 5] = [
    ICMPV6_ROUTER_SOLICITATION,
    ICMPV6_ROUTER_ADVERTISEMENT,
    ICMPV6_NEIGHBOR_SOLICITATION,
    ICMPV6_NEIGHBOR_ADVERTISEMENT,
    ICMPV6_REDIRECT,
];

/// MLDv1 (RFC 2710) と MLDv2 レポート (RFC 3810) のタイプ
pub const MLD_TYPES: [u8; 4] = [
    ICMPV6_MLD_QUERY,
    ICMPV6_MLD_REPORT,
    ICMPV6_MLD_DONE,
    ICMPV6_MLDV2_REPORT,
];

/// ICMPv4とICMPv6で共通の先頭8バイト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ICMPHeader {
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub checksum: u16,
    pub rest_of_header: u32,
}

impl ICMPHeader {
    pub fn new(icmp_type: u8, icmp_code: u8, rest_of_header: u32) -> Self {
        Self {
            icmp_type,
            icmp_code,
            checksum: 0,
            rest_of_header,
        }
    }

    /// エコー要求: 識別子とシーケンス番号
    pub fn echo(icmp_type: u8, identifier: u16, sequence: u16) -> Self {
        Self::new(icmp_type, 0, ((identifier as u32) << 16) | sequence as u32)
    }

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < HEADER_LENGTH {
            return None;
        }

        let icmp_type = data[0];
        let icmp_code = data[1];
        let checksum = u16::from_be_bytes([data[2], data[3]]);
        let rest_of_header = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);

        Some((
            Self {
                icmp_type,
                icmp_code,
                checksum,
                rest_of_header,
            },
            &data[HEADER_LENGTH..],
        ))
    }

    /// ICMPv4: チェックサムはICMPメッセージ全体 (疑似ヘッダー無し)
    pub fn encode_v4(&self, payload: &[u8]) -> Vec<u8> {
        let mut buffer = self.serialize(payload);
        ChecksumRegion::new(0, buffer.len()).patch(&mut buffer, 2);
        buffer
    }

    /// ICMPv6: チェックサムにIPv6疑似ヘッダーを含める
    pub fn encode_v6(&self, endpoints: Option<NetworkEndpoints>, payload: &[u8]) -> Vec<u8> {
        let mut buffer = self.serialize(payload);
        let pseudo_header = endpoints
            .and_then(|e| e.pseudo_header(IpNextHeaderProtocols::Icmpv6.0, buffer.len()))
            .unwrap_or_default();
        ChecksumRegion::with_pseudo_header(0, buffer.len(), pseudo_header).patch(&mut buffer, 2);
        buffer
    }

    fn serialize(&self, payload: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_LENGTH + payload.len());
        buffer.push(self.icmp_type);
        buffer.push(self.icmp_code);
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&self.rest_of_header.to_be_bytes());
        buffer.extend_from_slice(payload);
        buffer
    }
}
