use crate::core::error::{SnifferError, SnifferResult};
use crate::core::CaptureConfig;
use crate::network::packet::{Frame, LinkType};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use pcap::{Active, Capture, PacketHeader};
use std::sync::atomic::{AtomicBool, Ordering};

/// キャプチャ機構から渡される1フレーム
#[derive(Debug, Clone, Copy)]
pub struct CapturedFrame<'a> {
    pub data: &'a [u8],
    pub link_type: LinkType,
    pub timestamp: DateTime<Utc>,
    /// スナップ長で切り詰められる前の長さ
    pub original_length: usize,
}

impl CapturedFrame<'_> {
    pub fn decode(&self) -> Frame {
        Frame::decode(self.data, self.link_type)
    }
}

/// キャプチャループの状態。コールバックごとに受け渡して更新する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureState {
    pub displayed: usize,
    /// 0 は無制限
    pub limit: usize,
    pub running: bool,
}

impl CaptureState {
    pub fn new(limit: usize) -> Self {
        Self {
            displayed: 0,
            limit,
            running: true,
        }
    }

    pub fn record(self) -> Self {
        let displayed = self.displayed + 1;
        Self {
            displayed,
            limit: self.limit,
            running: self.limit == 0 || displayed < self.limit,
        }
    }

    pub fn stop(self) -> Self {
        Self {
            running: false,
            ..self
        }
    }
}

/// フレームをコールバックに渡し、進めた状態を返す
///
/// 停止済みの状態ではコールバックを呼ばない。
pub fn deliver<F>(state: CaptureState, frame: &CapturedFrame<'_>, callback: &mut F) -> CaptureState
where
    F: FnMut(&CapturedFrame<'_>),
{
    if !state.running {
        return state;
    }

    callback(frame);
    state.record()
}

fn timestamp_of(header: &PacketHeader) -> DateTime<Utc> {
    let micros = header.ts.tv_usec.clamp(0, 999_999) as u32;
    DateTime::from_timestamp(header.ts.tv_sec as i64, micros * 1_000).unwrap_or_default()
}

pub struct PacketCapture {
    capture: Capture<Active>,
    link_type: LinkType,
}

impl PacketCapture {
    pub fn open(config: &CaptureConfig, filter: &str) -> SnifferResult<Self> {
        let interface = config
            .interface
            .as_deref()
            .ok_or_else(|| SnifferError::DeviceSelection("キャプチャするインターフェースが指定されていません".to_string()))?;

        debug!(
            "キャプチャを初期化しています: {} (snaplen={}, promisc={}, timeout={}ms)",
            interface, config.snap_length, config.promiscuous, config.timeout_ms
        );

        let mut capture = Capture::from_device(interface)?
            .promisc(config.promiscuous)
            .snaplen(config.snap_length)
            .timeout(config.timeout_ms)
            .open()?;

        if !filter.is_empty() {
            capture.filter(filter, true)?;
            info!("フィルタを適用しました: {}", filter);
        }

        let link_type = LinkType::from_dlt(capture.get_datalink().0);
        info!("キャプチャを開始します: {} ({:?})", interface, link_type);

        Ok(Self { capture, link_type })
    }

    /// 状態が停止するか、停止フラグが立つまでフレームを配送する
    pub fn run<F>(&mut self, mut state: CaptureState, stop: &AtomicBool, mut callback: F) -> SnifferResult<CaptureState>
    where
        F: FnMut(&CapturedFrame<'_>),
    {
        while state.running {
            if stop.load(Ordering::SeqCst) {
                info!("停止要求を受け取りました");
                state = state.stop();
                break;
            }

            match self.capture.next_packet() {
                Ok(packet) => {
                    let frame = CapturedFrame {
                        data: packet.data,
                        link_type: self.link_type,
                        timestamp: timestamp_of(packet.header),
                        original_length: packet.header.len as usize,
                    };
                    state = deliver(state, &frame, &mut callback);
                }
                // 読み取りタイムアウトはエラーではない
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(e) => {
                    error!("パケットの読み取り中にエラーが発生しました: {}", e);
                    return Err(e.into());
                }
            }
        }

        info!("キャプチャを終了しました: {} 件", state.displayed);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: &[u8]) -> CapturedFrame<'_> {
        CapturedFrame {
            data,
            link_type: LinkType::Ethernet,
            timestamp: Utc::now(),
            original_length: data.len(),
        }
    }

    #[test]
    fn test_default_limit_stops_after_one() {
        let mut seen = 0;
        let mut callback = |_: &CapturedFrame<'_>| seen += 1;

        let state = deliver(CaptureState::new(1), &frame(&[0; 14]), &mut callback);
        assert_eq!(state.displayed, 1);
        assert!(!state.running);

        let state = deliver(state, &frame(&[0; 14]), &mut callback);
        assert_eq!(state.displayed, 1);
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let mut seen = 0;
        let mut callback = |_: &CapturedFrame<'_>| seen += 1;

        let mut state = CaptureState::new(0);
        for _ in 0..100 {
            state = deliver(state, &frame(&[]), &mut callback);
        }
        assert!(state.running);
        assert_eq!(state.displayed, 100);
        assert_eq!(seen, 100);
    }

    #[test]
    fn test_callback_sees_frame_metadata() {
        let data = [0xffu8; 20];
        let captured = CapturedFrame {
            original_length: 1514,
            ..frame(&data)
        };

        let mut lengths = Vec::new();
        let mut callback = |f: &CapturedFrame<'_>| lengths.push((f.data.len(), f.original_length));
        let state = deliver(CaptureState::new(3), &captured, &mut callback);

        assert_eq!(lengths, vec![(20, 1514)]);
        assert_eq!(state, CaptureState { displayed: 1, limit: 3, running: true });
    }

    #[test]
    fn test_stopped_state_is_returned_unchanged() {
        let stopped = CaptureState::new(5).stop();
        let mut called = false;
        let mut callback = |_: &CapturedFrame<'_>| called = true;
        assert_eq!(deliver(stopped, &frame(&[]), &mut callback), stopped);
        assert!(!called);
    }

    #[test]
    fn test_captured_frame_decodes_non_ethernet_as_opaque() {
        let data = [1u8, 2, 3, 4];
        let captured = CapturedFrame {
            link_type: LinkType::Other(113),
            ..frame(&data)
        };
        let decoded = captured.decode();
        assert!(decoded.layers.is_empty());
        assert_eq!(decoded.payload, data.to_vec());
    }
}
