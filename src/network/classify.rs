use crate::network::address::format_mac;
use crate::network::packet::icmp::{MLD_TYPES, NDP_TYPES};
use crate::network::packet::{
    Frame, ETHERTYPE_ARP, PROTOCOL_ICMP, PROTOCOL_ICMPV6, PROTOCOL_IGMP, PROTOCOL_TCP, PROTOCOL_UDP,
};
use chrono::{DateTime, Utc};
use pnet::util::MacAddr;
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Arp,
    Ndp,
    Mld,
    IcmpV6,
    /// IPv4のプロトコル番号 / IPv6の次ヘッダー
    Ip(u8),
    /// IPでもARPでもないEthernetフレーム
    EtherType(u16),
    Unknown,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Arp => write!(f, "ARP"),
            PacketKind::Ndp => write!(f, "NDP"),
            PacketKind::Mld => write!(f, "MLD"),
            PacketKind::IcmpV6 => write!(f, "ICMPv6"),
            PacketKind::Ip(protocol) => match protocol_name(*protocol) {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "Protocol({})", protocol),
            },
            PacketKind::EtherType(ethertype) => write!(f, "EtherType(0x{:04x})", ethertype),
            PacketKind::Unknown => write!(f, "Unknown"),
        }
    }
}

impl Serialize for PacketKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn protocol_name(protocol: u8) -> Option<&'static str> {
    match protocol {
        PROTOCOL_TCP => Some("Tcp"),
        PROTOCOL_UDP => Some("Udp"),
        PROTOCOL_ICMP => Some("Icmp"),
        PROTOCOL_IGMP => Some("Igmp"),
        PROTOCOL_ICMPV6 => Some("Icmpv6"),
        0 => Some("HopByHop"),
        43 => Some("Ipv6Route"),
        44 => Some("Ipv6Frag"),
        47 => Some("Gre"),
        50 => Some("Esp"),
        51 => Some("Ah"),
        59 => Some("Ipv6NoNxt"),
        60 => Some("Ipv6Opts"),
        89 => Some("Ospf"),
        103 => Some("Pim"),
        112 => Some("Vrrp"),
        132 => Some("Sctp"),
        _ => None,
    }
}

/// パケットの種別を判定する (最初に一致したものを採用)
///
/// 1. ARP (イーサタイプで決まり、ネットワーク層は見ない)
/// 2. ICMPv6 まで解析できた場合はタイプで NDP / MLD / ICMPv6 に分ける
/// 3. それ以外は IPv4/IPv6 のプロトコル番号をそのまま報告する
pub fn classify(frame: &Frame) -> PacketKind {
    if frame.arp().is_some() {
        return PacketKind::Arp;
    }

    if let Some(icmpv6) = frame.icmpv6() {
        return if NDP_TYPES.contains(&icmpv6.icmp_type) {
            PacketKind::Ndp
        } else if MLD_TYPES.contains(&icmpv6.icmp_type) {
            PacketKind::Mld
        } else {
            PacketKind::IcmpV6
        };
    }

    if let Some(protocol) = frame.ip_protocol() {
        return PacketKind::Ip(protocol);
    }

    match frame.ethernet() {
        // ARPヘッダーが途中で切れている場合もARPとして扱う
        Some(ethernet) if ethernet.ethertype == ETHERTYPE_ARP => PacketKind::Arp,
        Some(ethernet) => PacketKind::EtherType(ethernet.ethertype),
        None => PacketKind::Unknown,
    }
}

fn serialize_mac<S: Serializer>(address: &Option<MacAddr>, serializer: S) -> Result<S::Ok, S::Error> {
    match address {
        Some(address) => serializer.serialize_some(&format_mac(address)),
        None => serializer.serialize_none(),
    }
}

/// 表示用に取り出したフィールド
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketSummary {
    pub kind: PacketKind,
    pub timestamp: DateTime<Utc>,
    pub frame_length: usize,
    pub captured_length: usize,
    #[serde(serialize_with = "serialize_mac")]
    pub source_mac: Option<MacAddr>,
    #[serde(serialize_with = "serialize_mac")]
    pub destination_mac: Option<MacAddr>,
    pub source_ip: Option<IpAddr>,
    pub destination_ip: Option<IpAddr>,
    // 0 は有効なポート番号なので、TCP/UDP以外では None
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
    pub arp_operation: Option<u16>,
}

impl PacketSummary {
    pub fn from_frame(frame: &Frame, timestamp: DateTime<Utc>, frame_length: usize, captured_length: usize) -> Self {
        let ethernet = frame.ethernet();
        let arp = frame.arp();

        // ARPにはIPヘッダーが無いので送信元/宛先のプロトコルアドレスを使う
        let (source_ip, destination_ip) = match (frame.endpoints(), arp) {
            (Some(endpoints), _) => (Some(endpoints.source), Some(endpoints.destination)),
            (None, Some(arp)) => (
                Some(IpAddr::V4(arp.sender_protocol_address)),
                Some(IpAddr::V4(arp.target_protocol_address)),
            ),
            (None, None) => (None, None),
        };
        let ports = frame.ports();

        Self {
            kind: classify(frame),
            timestamp,
            frame_length,
            captured_length,
            source_mac: ethernet.map(|e| e.source),
            destination_mac: ethernet.map(|e| e.destination),
            source_ip,
            destination_ip,
            source_port: ports.map(|(source, _)| source),
            destination_port: ports.map(|(_, destination)| destination),
            arp_operation: arp.map(|a| a.operation),
        }
    }
}

impl fmt::Display for PacketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timestamp: {}", self.timestamp.to_rfc3339())?;
        writeln!(f, "type: {}", self.kind)?;
        if let Some(mac) = &self.source_mac {
            writeln!(f, "src MAC: {}", format_mac(mac))?;
        }
        if let Some(mac) = &self.destination_mac {
            writeln!(f, "dst MAC: {}", format_mac(mac))?;
        }
        writeln!(f, "frame length: {} bytes", self.frame_length)?;
        if let Some(ip) = &self.source_ip {
            writeln!(f, "src IP: {}", ip)?;
        }
        if let Some(ip) = &self.destination_ip {
            writeln!(f, "dst IP: {}", ip)?;
        }
        if let Some(port) = self.source_port {
            writeln!(f, "src port: {}", port)?;
        }
        if let Some(port) = self.destination_port {
            writeln!(f, "dst port: {}", port)?;
        }
        if let Some(operation) = self.arp_operation {
            writeln!(f, "ARP operation: {}", operation)?;
        }
        Ok(())
    }
}
