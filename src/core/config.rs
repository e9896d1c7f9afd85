use crate::core::SnifferError;
use crate::network::filter::FilterOptions;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_SNAP_LENGTH: i32 = 65535;
pub const DEFAULT_TIMEOUT_MS: i32 = 1000;
/// 指定が無ければ1パケットだけ表示する
pub const DEFAULT_PACKET_COUNT: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub capture: CaptureConfig,
    pub filter: FilterOptions,
    pub output: OutputFormat,
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub interface: Option<String>,
    pub snap_length: i32,
    pub promiscuous: bool,
    pub timeout_ms: i32,
    /// 0 は無制限
    pub packet_count: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: None,
            snap_length: DEFAULT_SNAP_LENGTH,
            promiscuous: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            packet_count: DEFAULT_PACKET_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("text または json を指定してください: {}", other)),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, SnifferError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SnifferError::Config(format!("{}の値が真偽値ではありません: {}", name, value))),
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, SnifferError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| SnifferError::Config(format!("{}の値が無効です ({}): {}", name, value, e)))
}

/// 環境変数の読み取り元を差し替えられるようにする
struct Lookup<F> {
    lookup: F,
}

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, name: &str, default: T) -> Result<T, SnifferError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(name).map_or(Ok(default), |v| parse_value(name, &v))
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool, SnifferError> {
        self.get(name).map_or(Ok(default), |v| parse_bool(name, &v))
    }
}

impl Configuration {
    pub fn from_env() -> Result<Self, SnifferError> {
        // .envは任意
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SnifferError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup { lookup };

        // 0 以下だと読み取りが戻らず停止フラグを確認できない
        let timeout_ms = env.parse("SNIFFER_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms <= 0 {
            return Err(SnifferError::Config(format!(
                "SNIFFER_TIMEOUT_MSには正の値を指定してください: {}",
                timeout_ms
            )));
        }

        Ok(Configuration {
            capture: CaptureConfig {
                interface: env.get("SNIFFER_INTERFACE").map(|v| v.trim().to_string()),
                snap_length: env.parse("SNIFFER_SNAPLEN", DEFAULT_SNAP_LENGTH)?,
                promiscuous: env.flag("SNIFFER_PROMISCUOUS", true)?,
                timeout_ms,
                packet_count: env.parse("SNIFFER_PACKET_COUNT", DEFAULT_PACKET_COUNT)?,
            },
            filter: FilterOptions {
                tcp: env.flag("SNIFFER_TCP", false)?,
                udp: env.flag("SNIFFER_UDP", false)?,
                icmp4: env.flag("SNIFFER_ICMP4", false)?,
                icmp6: env.flag("SNIFFER_ICMP6", false)?,
                arp: env.flag("SNIFFER_ARP", false)?,
                ndp: env.flag("SNIFFER_NDP", false)?,
                igmp: env.flag("SNIFFER_IGMP", false)?,
                mld: env.flag("SNIFFER_MLD", false)?,
                port: env.parse("SNIFFER_PORT", 0)?,
                port_source: env.parse("SNIFFER_PORT_SOURCE", 0)?,
                port_destination: env.parse("SNIFFER_PORT_DESTINATION", 0)?,
            },
            output: env.parse("SNIFFER_OUTPUT", OutputFormat::Text)?,
            log_level: env.parse("SNIFFER_LOG_LEVEL", LevelFilter::Info)?,
            log_file: env.get("SNIFFER_LOG_FILE").map(PathBuf::from),
        })
    }
}
