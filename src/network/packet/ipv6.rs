use std::net::Ipv6Addr;

pub const HEADER_LENGTH: usize = 40;

pub const DEFAULT_HOP_LIMIT: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IPv6Header {
    pub traffic_class: u8,
    pub flow_label: u32,
    pub next_header: u8,
    pub hop_limit: u8,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
}

impl IPv6Header {
    pub fn new(source: Ipv6Addr, destination: Ipv6Addr, next_header: u8) -> Self {
        Self {
            traffic_class: 0,
            flow_label: 0,
            next_header,
            hop_limit: DEFAULT_HOP_LIMIT,
            source,
            destination,
        }
    }

    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    /// 拡張ヘッダーは辿らない
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < HEADER_LENGTH {
            return None;
        }

        let version = (data[0] >> 4) & 0xf;
        if version != 6 {
            return None;
        }

        let traffic_class = ((data[0] & 0xf) << 4) | (data[1] >> 4);
        let flow_label = u32::from_be_bytes([0, data[1] & 0xf, data[2], data[3]]);
        let payload_length = u16::from_be_bytes([data[4], data[5]]) as usize;
        let next_header = data[6];
        let hop_limit = data[7];

        let mut source_bytes = [0u8; 16];
        source_bytes.copy_from_slice(&data[8..24]);
        let source = Ipv6Addr::from(source_bytes);

        let mut dest_bytes = [0u8; 16];
        dest_bytes.copy_from_slice(&data[24..40]);
        let destination = Ipv6Addr::from(dest_bytes);

        let end = (HEADER_LENGTH + payload_length).min(data.len());

        Some((
            Self {
                traffic_class,
                flow_label,
                next_header,
                hop_limit,
                source,
                destination,
            },
            &data[HEADER_LENGTH..end],
        ))
    }

    /// IPv6にはヘッダーチェックサムが無い
    pub fn encode(&self, next_header: u8, payload: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_LENGTH + payload.len());

        // バージョン、トラフィッククラス、フローラベル
        let first_word = (6u32 << 28) | ((self.traffic_class as u32) << 20) | (self.flow_label & 0xFFFFF);
        buffer.extend_from_slice(&first_word.to_be_bytes());

        // ペイロード長、次ヘッダー、ホップリミット
        buffer.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        buffer.push(next_header);
        buffer.push(self.hop_limit);

        buffer.extend_from_slice(&self.source.octets());
        buffer.extend_from_slice(&self.destination.octets());
        buffer.extend_from_slice(payload);
        buffer
    }
}
