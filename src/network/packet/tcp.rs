use super::NetworkEndpoints;
use crate::network::checksum::ChecksumRegion;
use pnet::packet::ip::IpNextHeaderProtocols;

/// オプション無しのヘッダー長
pub const HEADER_LENGTH: usize = 20;
/// データオフセットは4ビットなのでヘッダーは最大60バイト
pub const MAX_OPTIONS_LENGTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TCPFlags {
    pub urg: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
}

impl TCPFlags {
    pub fn syn() -> Self {
        Self {
            syn: true,
            ..Self::default()
        }
    }

    fn from_byte(byte: u8) -> Self {
        Self {
            urg: (byte & 0x20) != 0,
            ack: (byte & 0x10) != 0,
            psh: (byte & 0x08) != 0,
            rst: (byte & 0x04) != 0,
            syn: (byte & 0x02) != 0,
            fin: (byte & 0x01) != 0,
        }
    }

    fn to_byte(self) -> u8 {
        (self.urg as u8) << 5
            | (self.ack as u8) << 4
            | (self.psh as u8) << 3
            | (self.rst as u8) << 2
            | (self.syn as u8) << 1
            | self.fin as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TCPHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence_number: u32,
    pub acknowledgment_number: u32,
    pub flags: TCPFlags,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
    // オプションは解析せずそのまま保持する
    pub options: Vec<u8>,
}

impl TCPHeader {
    pub fn new(source_port: u16, destination_port: u16) -> Self {
        Self {
            source_port,
            destination_port,
            sequence_number: 0,
            acknowledgment_number: 0,
            flags: TCPFlags::default(),
            window_size: 0,
            checksum: 0,
            urgent_pointer: 0,
            options: Vec::new(),
        }
    }

    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < HEADER_LENGTH {
            return None;
        }

        let data_offset = ((data[12] >> 4) & 0xf) as usize * 4;
        if data_offset < HEADER_LENGTH || data.len() < data_offset {
            return None;
        }

        let source_port = u16::from_be_bytes([data[0], data[1]]);
        let destination_port = u16::from_be_bytes([data[2], data[3]]);
        let sequence_number = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let acknowledgment_number = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        let flags = TCPFlags::from_byte(data[13]);
        let window_size = u16::from_be_bytes([data[14], data[15]]);
        let checksum = u16::from_be_bytes([data[16], data[17]]);
        let urgent_pointer = u16::from_be_bytes([data[18], data[19]]);

        Some((
            Self {
                source_port,
                destination_port,
                sequence_number,
                acknowledgment_number,
                flags,
                window_size,
                checksum,
                urgent_pointer,
                options: data[HEADER_LENGTH..data_offset].to_vec(),
            },
            &data[data_offset..],
        ))
    }

    /// チェックサムは疑似ヘッダー + TCPヘッダー + ペイロードに対して計算する
    pub fn encode(&self, endpoints: Option<NetworkEndpoints>, payload: &[u8]) -> Vec<u8> {
        // 入り切らないオプションは切り捨て、4バイト境界までゼロで埋める
        let options = &self.options[..self.options.len().min(MAX_OPTIONS_LENGTH)];
        let options_length = (options.len() + 3) / 4 * 4;
        let header_length = HEADER_LENGTH + options_length;
        let mut buffer = Vec::with_capacity(header_length + payload.len());

        buffer.extend_from_slice(&self.source_port.to_be_bytes());
        buffer.extend_from_slice(&self.destination_port.to_be_bytes());
        buffer.extend_from_slice(&self.sequence_number.to_be_bytes());
        buffer.extend_from_slice(&self.acknowledgment_number.to_be_bytes());
        buffer.push(((header_length / 4) as u8) << 4);
        buffer.push(self.flags.to_byte());
        buffer.extend_from_slice(&self.window_size.to_be_bytes());
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&self.urgent_pointer.to_be_bytes());
        buffer.extend_from_slice(options);
        buffer.resize(header_length, 0);
        buffer.extend_from_slice(payload);

        let pseudo_header = endpoints
            .and_then(|e| e.pseudo_header(IpNextHeaderProtocols::Tcp.0, buffer.len()))
            .unwrap_or_default();
        ChecksumRegion::with_pseudo_header(0, buffer.len(), pseudo_header).patch(&mut buffer, 16);

        buffer
    }
}
