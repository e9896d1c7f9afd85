use crate::network::checksum::ChecksumRegion;
use std::net::Ipv4Addr;

/// オプション無しのヘッダー長
pub const HEADER_LENGTH: usize = 20;

pub const DEFAULT_TTL: u8 = 64;
pub const FLAG_DONT_FRAGMENT: u8 = 0b010;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IPv4Header {
    pub dscp: u8,
    pub ecn: u8,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl IPv4Header {
    pub fn new(source: Ipv4Addr, destination: Ipv4Addr, protocol: u8) -> Self {
        Self {
            dscp: 0,
            ecn: 0,
            identification: 0,
            flags: FLAG_DONT_FRAGMENT,
            fragment_offset: 0,
            ttl: DEFAULT_TTL,
            protocol,
            checksum: 0,
            source,
            destination,
        }
    }

    /// 残りのデータは合計長で切り詰める (Ethernetのパディングを含めない)
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < HEADER_LENGTH {
            return None;
        }

        let version = (data[0] >> 4) & 0xf;
        let ihl = (data[0] & 0xf) as usize * 4;
        if version != 4 || ihl < HEADER_LENGTH || data.len() < ihl {
            return None;
        }

        let dscp = data[1] >> 2;
        let ecn = data[1] & 0x3;
        let total_length = u16::from_be_bytes([data[2], data[3]]) as usize;
        let identification = u16::from_be_bytes([data[4], data[5]]);
        let flags = (data[6] >> 5) & 0x7;
        let fragment_offset = u16::from_be_bytes([data[6] & 0x1f, data[7]]);
        let ttl = data[8];
        let protocol = data[9];
        let checksum = u16::from_be_bytes([data[10], data[11]]);
        let source = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let destination = Ipv4Addr::new(data[16], data[17], data[18], data[19]);

        // キャプチャが途中で切れている場合は手元にある分だけ
        let end = total_length.clamp(ihl, data.len());

        Some((
            Self {
                dscp,
                ecn,
                identification,
                flags,
                fragment_offset,
                ttl,
                protocol,
                checksum,
                source,
                destination,
            },
            &data[ihl..end],
        ))
    }

    /// 先頭以外のフラグメントには上位層のヘッダーが無い
    pub fn is_trailing_fragment(&self) -> bool {
        self.fragment_offset != 0
    }

    /// `protocol` は次の層から決まった値。チェックサムはヘッダー部分のみ。
    pub fn encode(&self, protocol: u8, payload: &[u8]) -> Vec<u8> {
        let total_length = (HEADER_LENGTH + payload.len()) as u16;
        let mut buffer = Vec::with_capacity(HEADER_LENGTH + payload.len());

        // バージョンとIHL
        buffer.push((4 << 4) | (HEADER_LENGTH / 4) as u8);
        // DSCP と ECN
        buffer.push((self.dscp << 2) | (self.ecn & 0x3));
        buffer.extend_from_slice(&total_length.to_be_bytes());
        buffer.extend_from_slice(&self.identification.to_be_bytes());
        // フラグとフラグメントオフセット
        let flags_offset = ((self.flags as u16 & 0x7) << 13) | (self.fragment_offset & 0x1fff);
        buffer.extend_from_slice(&flags_offset.to_be_bytes());
        buffer.push(self.ttl);
        buffer.push(protocol);
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&self.source.octets());
        buffer.extend_from_slice(&self.destination.octets());

        ChecksumRegion::new(0, HEADER_LENGTH).patch(&mut buffer, 10);

        buffer.extend_from_slice(payload);
        buffer
    }
}
