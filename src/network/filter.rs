use crate::network::packet::icmp::{MLD_TYPES, NDP_TYPES};
use serde::{Deserialize, Serialize};

/// キャプチャ開始時に指定されるフィルタ条件
///
/// ポートの 0 は「指定なし」を意味する。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub tcp: bool,
    pub udp: bool,
    pub icmp4: bool,
    pub icmp6: bool,
    pub arp: bool,
    pub ndp: bool,
    pub igmp: bool,
    pub mld: bool,
    /// 送信元・宛先のどちらか
    pub port: u16,
    pub port_source: u16,
    pub port_destination: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortClause {
    /// 汎用ポートだけが指定された場合: 方向を問わない
    Either(u16),
    Both { source: u16, destination: u16 },
    Source(u16),
    Destination(u16),
}

impl PortClause {
    fn render(&self, grouped: bool) -> String {
        match self {
            PortClause::Either(port) if grouped => format!("(src port {} or dst port {})", port, port),
            PortClause::Either(port) => format!("src port {} or dst port {}", port, port),
            // and の連結は左結合なので括弧は不要
            PortClause::Both { source, destination } => format!("src port {} and dst port {}", source, destination),
            PortClause::Source(port) => format!("src port {}", port),
            PortClause::Destination(port) => format!("dst port {}", port),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Predicate {
    Keyword(&'static str),
    /// キャプチャ側の文法に無いプロトコルは ICMPv6 のタイプで表す
    Icmpv6Types(&'static [u8]),
}

impl Predicate {
    fn render(&self, standalone: bool) -> String {
        match self {
            Predicate::Keyword(keyword) => keyword.to_string(),
            Predicate::Icmpv6Types(types) => {
                let tests = types
                    .iter()
                    .map(|t| format!("icmp6[0] == {}", t))
                    .collect::<Vec<_>>()
                    .join(" or ");
                if standalone {
                    format!("icmp6 and ({})", tests)
                } else {
                    format!("(icmp6 and ({}))", tests)
                }
            }
        }
    }
}

fn non_zero(port: u16) -> Option<u16> {
    (port != 0).then_some(port)
}

impl FilterOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 汎用ポートを未指定の方向に広げる
    ///
    /// 既に指定されている方向と同じ値なら何も足さない。
    fn port_clause(&self) -> Option<PortClause> {
        let mut source = non_zero(self.port_source);
        let mut destination = non_zero(self.port_destination);

        if let Some(port) = non_zero(self.port) {
            match (source, destination) {
                (None, None) => return Some(PortClause::Either(port)),
                (Some(explicit), None) if explicit != port => destination = Some(port),
                (None, Some(explicit)) if explicit != port => source = Some(port),
                _ => {}
            }
        }

        match (source, destination) {
            (Some(source), Some(destination)) => Some(PortClause::Both { source, destination }),
            (Some(source), None) => Some(PortClause::Source(source)),
            (None, Some(destination)) => Some(PortClause::Destination(destination)),
            (None, None) => None,
        }
    }

    /// フラグの宣言順に並べる
    fn predicates(&self) -> Vec<Predicate> {
        let flags = [
            (self.tcp, Predicate::Keyword("tcp")),
            (self.udp, Predicate::Keyword("udp")),
            (self.icmp4, Predicate::Keyword("icmp")),
            (self.icmp6, Predicate::Keyword("icmp6")),
            (self.arp, Predicate::Keyword("arp")),
            (self.ndp, Predicate::Icmpv6Types(&NDP_TYPES)),
            (self.igmp, Predicate::Keyword("igmp")),
            (self.mld, Predicate::Icmpv6Types(&MLD_TYPES)),
        ];

        flags
            .into_iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, predicate)| predicate)
            .collect()
    }

    /// libpcap のフィルタ式に変換する。条件が無ければ空文字列。
    ///
    /// ポート条件とプロトコル条件を両方持つ場合、複数の項からなる側を括弧で囲み
    /// `dst port 80 and (tcp or udp)` のように一つの項として結合する。
    pub fn compile(&self) -> String {
        let ports = self.port_clause();
        let predicates = self.predicates();

        let protocols = match predicates.as_slice() {
            [] => None,
            [single] => Some(single.render(ports.is_none())),
            many => Some(
                many.iter()
                    .map(|p| p.render(false))
                    .collect::<Vec<_>>()
                    .join(" or "),
            ),
        };

        match (ports, protocols) {
            (None, None) => String::new(),
            (None, Some(protocols)) => protocols,
            (Some(ports), None) => ports.render(false),
            (Some(ports), Some(protocols)) if predicates.len() > 1 => {
                format!("{} and ({})", ports.render(true), protocols)
            }
            (Some(ports), Some(protocols)) => format!("{} and {}", ports.render(true), protocols),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NDP: &str = "icmp6 and (icmp6[0] == 133 or icmp6[0] == 134 or icmp6[0] == 135 or icmp6[0] == 136 or icmp6[0] == 137)";
    const MLD: &str = "icmp6 and (icmp6[0] == 130 or icmp6[0] == 131 or icmp6[0] == 132 or icmp6[0] == 143)";

    #[test]
    fn test_empty_options_compile_to_empty_string() {
        let options = FilterOptions::default();
        assert!(options.is_empty());
        assert_eq!(options.compile(), "");
    }

    #[test]
    fn test_generic_port_widens_to_both_directions() {
        let options = FilterOptions {
            port: 53,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "src port 53 or dst port 53");
    }

    #[test]
    fn test_generic_port_does_not_overwrite_explicit() {
        let options = FilterOptions {
            port: 53,
            port_source: 53,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "src port 53");

        let options = FilterOptions {
            port: 53,
            port_destination: 53,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "dst port 53");
    }

    #[test]
    fn test_generic_port_fills_the_unset_direction() {
        let options = FilterOptions {
            port: 53,
            port_source: 8080,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "src port 8080 and dst port 53");

        let options = FilterOptions {
            port: 53,
            port_destination: 8080,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "src port 53 and dst port 8080");
    }

    #[test]
    fn test_explicit_ports_are_joined_with_and() {
        let options = FilterOptions {
            port_source: 1024,
            port_destination: 80,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "src port 1024 and dst port 80");

        // 両方明示された場合は同じ値でも and のまま
        let options = FilterOptions {
            port_source: 80,
            port_destination: 80,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "src port 80 and dst port 80");

        // 汎用ポートは両方指定済みなら無視される
        let options = FilterOptions {
            port: 9,
            port_source: 1,
            port_destination: 2,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "src port 1 and dst port 2");
    }

    #[test]
    fn test_protocols_are_grouped_when_combined_with_ports() {
        let options = FilterOptions {
            tcp: true,
            udp: true,
            port_destination: 80,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "dst port 80 and (tcp or udp)");

        let options = FilterOptions {
            udp: true,
            port: 53,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "(src port 53 or dst port 53) and udp");

        let options = FilterOptions {
            tcp: true,
            port_source: 22,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "src port 22 and tcp");
    }

    #[test]
    fn test_protocols_in_declaration_order() {
        let options = FilterOptions {
            tcp: true,
            udp: true,
            icmp4: true,
            icmp6: true,
            arp: true,
            igmp: true,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), "tcp or udp or icmp or icmp6 or arp or igmp");
    }

    #[test]
    fn test_ndp_and_mld_lower_to_type_tests() {
        let ndp = FilterOptions {
            ndp: true,
            ..FilterOptions::default()
        };
        assert_eq!(ndp.compile(), NDP);

        let mld = FilterOptions {
            mld: true,
            ..FilterOptions::default()
        };
        assert_eq!(mld.compile(), MLD);

        let mixed = FilterOptions {
            tcp: true,
            ndp: true,
            mld: true,
            ..FilterOptions::default()
        };
        assert_eq!(mixed.compile(), format!("tcp or ({}) or ({})", NDP, MLD));
    }

    #[test]
    fn test_single_compound_protocol_with_ports_is_grouped() {
        let options = FilterOptions {
            ndp: true,
            port_destination: 80,
            ..FilterOptions::default()
        };
        assert_eq!(options.compile(), format!("dst port 80 and ({})", NDP));

        let options = FilterOptions {
            arp: true,
            ndp: true,
            port: 7,
            ..FilterOptions::default()
        };
        assert_eq!(
            options.compile(),
            format!("(src port 7 or dst port 7) and (arp or ({}))", NDP)
        );
    }

    #[test]
    fn test_never_mentions_disabled_flags() {
        let options = FilterOptions {
            udp: true,
            ..FilterOptions::default()
        };
        let filter = options.compile();
        for keyword in ["tcp", "icmp", "arp", "igmp", "port"] {
            assert!(!filter.contains(keyword), "{} に {} が含まれています", filter, keyword);
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        let options = FilterOptions {
            tcp: true,
            mld: true,
            port: 443,
            ..FilterOptions::default()
        };
        let copied = options;
        assert_eq!(options.compile(), options.compile());
        assert_eq!(options.compile(), copied.compile());
    }
}
