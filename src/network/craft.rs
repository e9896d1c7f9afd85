use crate::core::error::{AddressError, SnifferResult};
use crate::network::address::{mac_octets, parse_ipv4, parse_ipv6, parse_mac};
use crate::network::injection::FrameSink;
use crate::network::packet::arp::{ArpHeader, OPERATION_REQUEST};
use crate::network::packet::ethernet::EthernetHeader;
use crate::network::packet::icmp::{
    ICMPHeader, ICMPV4_ECHO_REQUEST, ICMPV6_ECHO_REQUEST, ICMPV6_MLD_QUERY, ICMPV6_NEIGHBOR_SOLICITATION,
    ICMPV6_ROUTER_SOLICITATION,
};
use crate::network::packet::igmp::{IGMPHeader, MEMBERSHIP_REPORT_V2};
use crate::network::packet::ipv4::IPv4Header;
use crate::network::packet::ipv6::IPv6Header;
use crate::network::packet::tcp::{TCPFlags, TCPHeader};
use crate::network::packet::udp::UDPHeader;
use crate::network::packet::{Frame, Layer};
use log::info;
use std::fmt;

const LOOPBACK: &str = "127.0.0.1";
const LINK_LOCAL: &str = "fe80::1";
const ALL_NODES: &str = "ff02::1";
const ALL_ROUTERS: &str = "ff02::2";

const ECHO_IDENTIFIER: u16 = 0x3039;
/// NDP と MLD はリンク外に出ない
const LINK_HOP_LIMIT: u8 = 255;
/// MLD クエリの最大応答遅延 (ミリ秒)
const MLD_MAX_RESPONSE_DELAY: u32 = 10_000;

/// 送信ツールで選べるフレームの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    Tcp,
    Udp,
    IcmpV4Echo,
    IcmpV6Echo,
    NeighborSolicitation,
    RouterSolicitation,
    MldQuery,
    IgmpReport,
    ArpRequest,
}

impl SendKind {
    pub const ALL: [SendKind; 9] = [
        SendKind::Tcp,
        SendKind::Udp,
        SendKind::IcmpV4Echo,
        SendKind::IcmpV6Echo,
        SendKind::NeighborSolicitation,
        SendKind::RouterSolicitation,
        SendKind::MldQuery,
        SendKind::IgmpReport,
        SendKind::ArpRequest,
    ];

    /// '0'..'8' 以外は None
    pub fn from_key(key: char) -> Option<Self> {
        let index = key.to_digit(10)? as usize;
        Self::ALL.get(index).copied()
    }

    pub fn key(&self) -> char {
        let index = Self::ALL.iter().position(|k| k == self).unwrap_or_default();
        char::from(b'0' + index as u8)
    }

    pub fn description(&self) -> &'static str {
        match self {
            SendKind::Tcp => "TCP",
            SendKind::Udp => "UDP",
            SendKind::IcmpV4Echo => "ICMPv4 エコー要求",
            SendKind::IcmpV6Echo => "ICMPv6 エコー要求",
            SendKind::NeighborSolicitation => "NDP 近隣要請",
            SendKind::RouterSolicitation => "NDP ルーター要請",
            SendKind::MldQuery => "MLD クエリ",
            SendKind::IgmpReport => "IGMPv2 メンバーシップレポート",
            SendKind::ArpRequest => "ARP 要求",
        }
    }
}

impl fmt::Display for SendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key(), self.description())
    }
}

fn ethernet(source: &str, destination: &str) -> Result<Layer, AddressError> {
    // イーサタイプはエンコード時に次の層から決まる
    Ok(Layer::Ethernet(EthernetHeader::new(parse_mac(source)?, parse_mac(destination)?, 0)))
}

fn ipv4(source: &str, destination: &str) -> Result<IPv4Header, AddressError> {
    Ok(IPv4Header::new(parse_ipv4(source)?, parse_ipv4(destination)?, 0))
}

fn ipv6(source: &str, destination: &str) -> Result<IPv6Header, AddressError> {
    Ok(IPv6Header::new(parse_ipv6(source)?, parse_ipv6(destination)?, 0))
}

/// アドレスはすべてエンコード前に検証する
pub fn build_frame(kind: SendKind) -> Result<Frame, AddressError> {
    let frame = match kind {
        SendKind::Tcp => {
            let mut tcp = TCPHeader::new(100, 4567);
            tcp.flags = TCPFlags::syn();
            tcp.window_size = 1024;
            Frame::new(
                vec![
                    ethernet("10:20:30:40:50:60", "00:00:00:00:00:00")?,
                    Layer::IPv4(ipv4(LOOPBACK, LOOPBACK)?),
                    Layer::Tcp(tcp),
                ],
                Vec::new(),
            )
        }
        SendKind::Udp => Frame::new(
            vec![
                ethernet("60:50:40:30:20:10", "00:00:00:00:00:00")?,
                Layer::IPv4(ipv4(LOOPBACK, LOOPBACK)?),
                Layer::Udp(UDPHeader::new(100, 4567)),
            ],
            Vec::new(),
        ),
        SendKind::IcmpV4Echo => Frame::new(
            vec![
                ethernet("60:50:40:30:20:10", "00:00:00:00:00:00")?,
                Layer::IPv4(ipv4(LOOPBACK, LOOPBACK)?),
                Layer::IcmpV4(ICMPHeader::echo(ICMPV4_ECHO_REQUEST, ECHO_IDENTIFIER, 1)),
            ],
            Vec::new(),
        ),
        SendKind::IcmpV6Echo => Frame::new(
            vec![
                ethernet("60:50:40:30:20:10", "33:33:00:00:00:01")?,
                Layer::IPv6(ipv6(LINK_LOCAL, ALL_NODES)?),
                Layer::IcmpV6(ICMPHeader::echo(ICMPV6_ECHO_REQUEST, ECHO_IDENTIFIER, 1)),
            ],
            Vec::new(),
        ),
        SendKind::NeighborSolicitation => {
            let target = parse_ipv6("fe80::2")?;
            Frame::new(
                vec![
                    ethernet("60:50:40:30:20:10", "33:33:00:00:00:01")?,
                    Layer::IPv6(ipv6(LINK_LOCAL, ALL_NODES)?.with_hop_limit(LINK_HOP_LIMIT)),
                    Layer::IcmpV6(ICMPHeader::new(ICMPV6_NEIGHBOR_SOLICITATION, 0, 0)),
                ],
                target.octets().to_vec(),
            )
        }
        SendKind::RouterSolicitation => {
            let source = parse_mac("60:50:40:30:20:10")?;
            // 送信元リンク層アドレスオプション: タイプ1, 長さ1 (8オクテット単位)
            let mut option = vec![1, 1];
            option.extend_from_slice(&mac_octets(&source));
            Frame::new(
                vec![
                    ethernet("60:50:40:30:20:10", "33:33:00:00:00:02")?,
                    Layer::IPv6(ipv6(LINK_LOCAL, ALL_ROUTERS)?.with_hop_limit(LINK_HOP_LIMIT)),
                    Layer::IcmpV6(ICMPHeader::new(ICMPV6_ROUTER_SOLICITATION, 0, 0)),
                ],
                option,
            )
        }
        SendKind::MldQuery => Frame::new(
            vec![
                ethernet("60:50:40:30:20:10", "33:33:00:00:00:01")?,
                Layer::IPv6(ipv6(LINK_LOCAL, ALL_NODES)?.with_hop_limit(1)),
                Layer::IcmpV6(ICMPHeader::new(ICMPV6_MLD_QUERY, 0, MLD_MAX_RESPONSE_DELAY << 16)),
            ],
            // 一般クエリ: マルチキャストアドレスは未指定
            vec![0; 16],
        ),
        SendKind::IgmpReport => {
            let group = parse_ipv4("224.0.0.1")?;
            let mut ip = ipv4(LOOPBACK, "224.0.0.1")?;
            ip.ttl = 1;
            Frame::new(
                vec![
                    ethernet("60:50:40:30:20:10", "01:00:5e:00:00:01")?,
                    Layer::IPv4(ip),
                    Layer::Igmp(IGMPHeader::new(MEMBERSHIP_REPORT_V2, 0, group)),
                ],
                Vec::new(),
            )
        }
        SendKind::ArpRequest => Frame::new(
            vec![
                ethernet("00:00:00:00:00:00", "ff:ff:ff:ff:ff:ff")?,
                Layer::Arp(ArpHeader::new(
                    OPERATION_REQUEST,
                    parse_mac("00:00:00:00:00:00")?,
                    parse_ipv4(LOOPBACK)?,
                    parse_mac("00:00:00:00:00:00")?,
                    parse_ipv4(LOOPBACK)?,
                )),
            ],
            Vec::new(),
        ),
    };

    Ok(frame)
}

pub fn send_kind<S: FrameSink + ?Sized>(sink: &mut S, kind: SendKind) -> SnifferResult<()> {
    let bytes = build_frame(kind)?.encode();
    sink.send(&bytes)?;
    info!("{} を送信しました ({} バイト)", kind.description(), bytes.len());
    Ok(())
}
