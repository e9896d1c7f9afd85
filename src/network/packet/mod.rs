pub mod arp;
pub mod ethernet;
pub mod icmp;
pub mod igmp;
pub mod ipv4;
pub mod ipv6;
pub mod tcp;
pub mod udp;

use crate::network::checksum;
use arp::ArpHeader;
use ethernet::EthernetHeader;
use icmp::ICMPHeader;
use igmp::IGMPHeader;
use ipv4::IPv4Header;
use ipv6::IPv6Header;
use log::debug;
use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocols;
use std::net::IpAddr;
use tcp::TCPHeader;
use udp::UDPHeader;

pub const ETHERTYPE_IPV4: u16 = EtherTypes::Ipv4.0;
pub const ETHERTYPE_IPV6: u16 = EtherTypes::Ipv6.0;
pub const ETHERTYPE_ARP: u16 = EtherTypes::Arp.0;

pub const PROTOCOL_ICMP: u8 = IpNextHeaderProtocols::Icmp.0;
pub const PROTOCOL_IGMP: u8 = IpNextHeaderProtocols::Igmp.0;
pub const PROTOCOL_TCP: u8 = IpNextHeaderProtocols::Tcp.0;
pub const PROTOCOL_UDP: u8 = IpNextHeaderProtocols::Udp.0;
pub const PROTOCOL_ICMPV6: u8 = IpNextHeaderProtocols::Icmpv6.0;

/// キャプチャ側から渡されるリンク層の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    Other(i32),
}

impl LinkType {
    /// libpcap の DLT 値から
    pub fn from_dlt(dlt: i32) -> Self {
        match dlt {
            1 => LinkType::Ethernet,
            other => LinkType::Other(other),
        }
    }
}

/// 疑似ヘッダーの計算に使う送信元と宛先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkEndpoints {
    pub source: IpAddr,
    pub destination: IpAddr,
}

impl NetworkEndpoints {
    pub fn new(source: IpAddr, destination: IpAddr) -> Self {
        Self { source, destination }
    }

    pub fn pseudo_header(&self, protocol: u8, length: usize) -> Option<Vec<u8>> {
        checksum::pseudo_header(self.source, self.destination, protocol, length)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Ethernet(EthernetHeader),
    Arp(ArpHeader),
    IPv4(IPv4Header),
    IPv6(IPv6Header),
    Tcp(TCPHeader),
    Udp(UDPHeader),
    IcmpV4(ICMPHeader),
    IcmpV6(ICMPHeader),
    Igmp(IGMPHeader),
}

impl Layer {
    /// この層を運ぶEthernetフレームのイーサタイプ
    pub fn ether_type(&self) -> Option<u16> {
        match self {
            Layer::Arp(_) => Some(ETHERTYPE_ARP),
            Layer::IPv4(_) => Some(ETHERTYPE_IPV4),
            Layer::IPv6(_) => Some(ETHERTYPE_IPV6),
            _ => None,
        }
    }

    /// この層を運ぶIPヘッダーのプロトコル番号
    pub fn ip_protocol(&self) -> Option<u8> {
        match self {
            Layer::Tcp(_) => Some(PROTOCOL_TCP),
            Layer::Udp(_) => Some(PROTOCOL_UDP),
            Layer::IcmpV4(_) => Some(PROTOCOL_ICMP),
            Layer::IcmpV6(_) => Some(PROTOCOL_ICMPV6),
            Layer::Igmp(_) => Some(PROTOCOL_IGMP),
            _ => None,
        }
    }

    pub fn endpoints(&self) -> Option<NetworkEndpoints> {
        match self {
            Layer::IPv4(h) => Some(NetworkEndpoints::new(IpAddr::V4(h.source), IpAddr::V4(h.destination))),
            Layer::IPv6(h) => Some(NetworkEndpoints::new(IpAddr::V6(h.source), IpAddr::V6(h.destination))),
            _ => None,
        }
    }

    /// `payload` は内側の層をすべてエンコードし終えたバイト列
    fn encode(&self, next: Option<&Layer>, endpoints: Option<NetworkEndpoints>, payload: &[u8]) -> Vec<u8> {
        match self {
            Layer::Ethernet(h) => h.encode(next.and_then(Layer::ether_type).unwrap_or(h.ethertype), payload),
            Layer::Arp(h) => h.encode(payload),
            Layer::IPv4(h) => h.encode(next.and_then(Layer::ip_protocol).unwrap_or(h.protocol), payload),
            Layer::IPv6(h) => h.encode(next.and_then(Layer::ip_protocol).unwrap_or(h.next_header), payload),
            Layer::Tcp(h) => h.encode(endpoints, payload),
            Layer::Udp(h) => h.encode(endpoints, payload),
            Layer::IcmpV4(h) => h.encode_v4(payload),
            Layer::IcmpV6(h) => h.encode_v6(endpoints, payload),
            Layer::Igmp(h) => h.encode(payload),
        }
    }
}

/// 外側 (Ethernet) から内側へ並んだヘッダーと、最後の未解析バイト列
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub layers: Vec<Layer>,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(layers: Vec<Layer>, payload: Vec<u8>) -> Self {
        Self { layers, payload }
    }

    /// 内側の層から順にシリアライズし、外側の層の前に連結していく
    ///
    /// 各層の識別子 (イーサタイプ, プロトコル番号) は次の層の種別から決まる。
    /// 長さフィールドとチェックサムは内側のバイト列から計算し直す。
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = self.payload.clone();

        for (index, layer) in self.layers.iter().enumerate().rev() {
            let next = self.layers.get(index + 1);
            let endpoints = index
                .checked_sub(1)
                .and_then(|outer| self.layers[outer].endpoints());
            buffer = layer.encode(next, endpoints, &buffer);
        }

        buffer
    }

    /// 失敗しない: 解析できたところまでの層と、残りをペイロードとして返す
    pub fn decode(data: &[u8], link_type: LinkType) -> Self {
        let mut layers = Vec::new();

        let payload = match link_type {
            LinkType::Ethernet => decode_ethernet(data, &mut layers),
            LinkType::Other(dlt) => {
                debug!("未対応のリンク層です: {}", dlt);
                data
            }
        };

        Self {
            layers,
            payload: payload.to_vec(),
        }
    }

    pub fn ethernet(&self) -> Option<&EthernetHeader> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Ethernet(h) => Some(h),
            _ => None,
        })
    }

    pub fn arp(&self) -> Option<&ArpHeader> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Arp(h) => Some(h),
            _ => None,
        })
    }

    pub fn icmpv6(&self) -> Option<&ICMPHeader> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::IcmpV6(h) => Some(h),
            _ => None,
        })
    }

    pub fn endpoints(&self) -> Option<NetworkEndpoints> {
        self.layers.iter().find_map(Layer::endpoints)
    }

    /// IPv4のプロトコル番号、またはIPv6の次ヘッダー
    pub fn ip_protocol(&self) -> Option<u8> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::IPv4(h) => Some(h.protocol),
            Layer::IPv6(h) => Some(h.next_header),
            _ => None,
        })
    }

    /// TCPとUDPのときだけポートを返す
    pub fn ports(&self) -> Option<(u16, u16)> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Tcp(h) => Some((h.source_port, h.destination_port)),
            Layer::Udp(h) => Some((h.source_port, h.destination_port)),
            _ => None,
        })
    }
}

fn decode_ethernet<'a>(data: &'a [u8], layers: &mut Vec<Layer>) -> &'a [u8] {
    let Some((ethernet, rest)) = EthernetHeader::parse(data) else {
        debug!("イーサネットヘッダーが途中で切れています: {} バイト", data.len());
        return data;
    };

    let ethertype = ethernet.ethertype;
    layers.push(Layer::Ethernet(ethernet));

    match ethertype {
        ETHERTYPE_IPV4 => decode_ipv4(rest, layers),
        ETHERTYPE_IPV6 => decode_ipv6(rest, layers),
        ETHERTYPE_ARP => match ArpHeader::parse(rest) {
            Some((arp, rest)) => {
                layers.push(Layer::Arp(arp));
                rest
            }
            None => {
                debug!("ARPヘッダーを解析できませんでした");
                rest
            }
        },
        // 他のイーサタイプはそのままペイロードとして扱う
        _ => rest,
    }
}

fn decode_ipv4<'a>(data: &'a [u8], layers: &mut Vec<Layer>) -> &'a [u8] {
    let Some((ipv4, rest)) = IPv4Header::parse(data) else {
        debug!("IPv4ヘッダーを解析できませんでした");
        return data;
    };

    let protocol = ipv4.protocol;
    let trailing_fragment = ipv4.is_trailing_fragment();
    layers.push(Layer::IPv4(ipv4));

    if trailing_fragment {
        return rest;
    }
    decode_transport(protocol, rest, layers)
}

fn decode_ipv6<'a>(data: &'a [u8], layers: &mut Vec<Layer>) -> &'a [u8] {
    let Some((ipv6, rest)) = IPv6Header::parse(data) else {
        debug!("IPv6ヘッダーを解析できませんでした");
        return data;
    };

    let next_header = ipv6.next_header;
    layers.push(Layer::IPv6(ipv6));
    decode_transport(next_header, rest, layers)
}

fn decode_transport<'a>(protocol: u8, data: &'a [u8], layers: &mut Vec<Layer>) -> &'a [u8] {
    let decoded = match protocol {
        PROTOCOL_TCP => TCPHeader::parse(data).map(|(h, rest)| (Layer::Tcp(h), rest)),
        PROTOCOL_UDP => UDPHeader::parse(data).map(|(h, rest)| (Layer::Udp(h), rest)),
        PROTOCOL_ICMP => ICMPHeader::parse(data).map(|(h, rest)| (Layer::IcmpV4(h), rest)),
        PROTOCOL_ICMPV6 => ICMPHeader::parse(data).map(|(h, rest)| (Layer::IcmpV6(h), rest)),
        PROTOCOL_IGMP => IGMPHeader::parse(data).map(|(h, rest)| (Layer::Igmp(h), rest)),
        // 未知のプロトコル番号はエラーにしない
        _ => return data,
    };

    match decoded {
        Some((layer, rest)) => {
            layers.push(layer);
            rest
        }
        None => {
            debug!("プロトコル {} のヘッダーが途中で切れています", protocol);
            data
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::util::MacAddr;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn ethernet(ethertype: u16) -> Layer {
        Layer::Ethernet(EthernetHeader::new(
            MacAddr::new(0x10, 0x20, 0x30, 0x40, 0x50, 0x60),
            MacAddr::new(0x33, 0x33, 0, 0, 0, 1),
            ethertype,
        ))
    }

    fn ipv4(protocol: u8) -> Layer {
        Layer::IPv4(IPv4Header::new(
            Ipv4Addr::new(192, 168, 1, 10),
            Ipv4Addr::new(192, 168, 1, 20),
            protocol,
        ))
    }

    fn ipv6(next_header: u8) -> Layer {
        Layer::IPv6(IPv6Header::new(
            "fe80::1".parse::<Ipv6Addr>().unwrap(),
            "ff02::1".parse::<Ipv6Addr>().unwrap(),
            next_header,
        ))
    }

    /// デコード結果から読み取ったチェックサムを消して構築時の値と比較できるようにする
    fn clear_checksums(mut frame: Frame) -> Frame {
        for layer in frame.layers.iter_mut() {
            match layer {
                Layer::IPv4(h) => h.checksum = 0,
                Layer::Tcp(h) => h.checksum = 0,
                Layer::Udp(h) => h.checksum = 0,
                Layer::IcmpV4(h) | Layer::IcmpV6(h) => h.checksum = 0,
                Layer::Igmp(h) => h.checksum = 0,
                _ => {}
            }
        }
        frame
    }

    fn assert_round_trip(frame: Frame) {
        let bytes = frame.encode();
        let decoded = Frame::decode(&bytes, LinkType::Ethernet);

        // 再エンコードしても同じバイト列になる (チェックサムも同じ値)
        assert_eq!(decoded.encode(), bytes);
        assert_eq!(clear_checksums(decoded), frame);
    }

    #[test]
    fn test_round_trip_all_combinations() {
        let mut tcp = TCPHeader::new(100, 4567);
        tcp.flags = tcp::TCPFlags::syn();
        tcp.window_size = 1024;

        let frames = vec![
            Frame::new(vec![ethernet(ETHERTYPE_IPV4), ipv4(PROTOCOL_TCP), Layer::Tcp(tcp.clone())], b"GET".to_vec()),
            Frame::new(vec![ethernet(ETHERTYPE_IPV6), ipv6(PROTOCOL_TCP), Layer::Tcp(tcp)], vec![]),
            Frame::new(vec![ethernet(ETHERTYPE_IPV4), ipv4(PROTOCOL_UDP), Layer::Udp(UDPHeader::new(53, 40000))], vec![1, 2, 3]),
            Frame::new(vec![ethernet(ETHERTYPE_IPV6), ipv6(PROTOCOL_UDP), Layer::Udp(UDPHeader::new(547, 546))], vec![9]),
            Frame::new(
                vec![ethernet(ETHERTYPE_IPV4), ipv4(PROTOCOL_ICMP), Layer::IcmpV4(ICMPHeader::echo(8, 0x3039, 1))],
                vec![],
            ),
            Frame::new(
                vec![ethernet(ETHERTYPE_IPV6), ipv6(PROTOCOL_ICMPV6), Layer::IcmpV6(ICMPHeader::echo(128, 7, 2))],
                vec![0xaa; 5],
            ),
            Frame::new(
                vec![
                    ethernet(ETHERTYPE_IPV4),
                    ipv4(PROTOCOL_IGMP),
                    Layer::Igmp(IGMPHeader::new(igmp::MEMBERSHIP_REPORT_V2, 0, Ipv4Addr::new(224, 0, 0, 1))),
                ],
                vec![],
            ),
            Frame::new(
                vec![
                    ethernet(ETHERTYPE_ARP),
                    Layer::Arp(ArpHeader::new(
                        arp::OPERATION_REPLY,
                        MacAddr::new(1, 2, 3, 4, 5, 6),
                        Ipv4Addr::new(10, 0, 0, 1),
                        MacAddr::new(6, 5, 4, 3, 2, 1),
                        Ipv4Addr::new(10, 0, 0, 2),
                    )),
                ],
                vec![],
            ),
        ];

        for frame in frames {
            assert_round_trip(frame);
        }
    }

    #[test]
    fn test_encode_fixes_discriminators() {
        // 識別子が食い違っていても、次の層の種別で上書きされる
        let frame = Frame::new(
            vec![ethernet(ETHERTYPE_ARP), ipv4(PROTOCOL_UDP), Layer::Tcp(TCPHeader::new(1, 2))],
            vec![],
        );
        let bytes = frame.encode();
        assert_eq!(&bytes[12..14], &ETHERTYPE_IPV4.to_be_bytes());
        assert_eq!(bytes[14 + 9], PROTOCOL_TCP);

        let decoded = Frame::decode(&bytes, LinkType::Ethernet);
        assert!(matches!(decoded.layers.last(), Some(Layer::Tcp(_))));
    }

    #[test]
    fn test_encode_is_innermost_first() {
        let frame = Frame::new(
            vec![ethernet(ETHERTYPE_IPV4), ipv4(PROTOCOL_UDP), Layer::Udp(UDPHeader::new(1, 2))],
            vec![0xde, 0xad],
        );
        let bytes = frame.encode();
        assert_eq!(bytes.len(), 14 + 20 + 8 + 2);
        assert_eq!(&bytes[14 + 2..14 + 4], &30u16.to_be_bytes());
        assert_eq!(&bytes[34 + 4..34 + 6], &10u16.to_be_bytes());
        assert_eq!(&bytes[42..], &[0xde, 0xad]);
    }

    #[test]
    fn test_decode_truncated_stops_at_last_full_layer() {
        let frame = Frame::new(
            vec![ethernet(ETHERTYPE_IPV4), ipv4(PROTOCOL_TCP), Layer::Tcp(TCPHeader::new(80, 8080))],
            vec![],
        );
        let bytes = frame.encode();

        // TCPヘッダーの途中で切る
        let decoded = Frame::decode(&bytes[..14 + 20 + 10], LinkType::Ethernet);
        assert_eq!(decoded.layers.len(), 2);
        assert!(decoded.ports().is_none());
        assert_eq!(decoded.payload.len(), 10);

        // IPv4ヘッダーの途中で切る
        let decoded = Frame::decode(&bytes[..20], LinkType::Ethernet);
        assert_eq!(decoded.layers.len(), 1);
        assert_eq!(decoded.payload.len(), 6);

        // Ethernetヘッダーすら無い
        let decoded = Frame::decode(&bytes[..5], LinkType::Ethernet);
        assert!(decoded.layers.is_empty());
        assert_eq!(decoded.payload.len(), 5);
    }

    #[test]
    fn test_decode_unknown_protocol_stops_without_error() {
        let frame = Frame::new(vec![ethernet(ETHERTYPE_IPV4), ipv4(47)], vec![0, 0, 0x08, 0]);
        let decoded = Frame::decode(&frame.encode(), LinkType::Ethernet);
        assert_eq!(decoded.layers.len(), 2);
        assert_eq!(decoded.ip_protocol(), Some(47));
        assert_eq!(decoded.payload, vec![0, 0, 0x08, 0]);
    }

    #[test]
    fn test_decode_unknown_ethertype_is_opaque() {
        let frame = Frame::new(vec![ethernet(0x88cc)], vec![1, 2, 3]);
        let decoded = Frame::decode(&frame.encode(), LinkType::Ethernet);
        assert_eq!(decoded.layers.len(), 1);
        assert_eq!(decoded.payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_other_link_type() {
        let decoded = Frame::decode(&[1, 2, 3, 4], LinkType::from_dlt(113));
        assert_eq!(LinkType::from_dlt(1), LinkType::Ethernet);
        assert!(decoded.layers.is_empty());
        assert_eq!(decoded.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_trailing_fragment_is_not_transport() {
        let mut header = IPv4Header::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, PROTOCOL_UDP);
        header.fragment_offset = 185;
        let frame = Frame::new(vec![ethernet(ETHERTYPE_IPV4), Layer::IPv4(header)], vec![0; 16]);
        let decoded = Frame::decode(&frame.encode(), LinkType::Ethernet);
        assert_eq!(decoded.layers.len(), 2);
        assert!(decoded.ports().is_none());
    }

    #[test]
    fn test_decode_is_stateless() {
        let frame = Frame::new(
            vec![ethernet(ETHERTYPE_IPV4), ipv4(PROTOCOL_UDP), Layer::Udp(UDPHeader::new(5, 6))],
            vec![],
        );
        let bytes = frame.encode();
        let first = Frame::decode(&bytes, LinkType::Ethernet);
        let _ = Frame::decode(&[0xff; 3], LinkType::Ethernet);
        let second = Frame::decode(&bytes, LinkType::Ethernet);
        assert_eq!(first, second);
    }
}
