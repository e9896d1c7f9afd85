use crate::core::error::{SnifferError, SnifferResult};
use log::{debug, info, warn};
use pnet::datalink::{self, Channel, DataLinkSender, NetworkInterface};
use std::io;

/// エンコード済みフレームの送信先
pub trait FrameSink {
    fn send(&mut self, frame: &[u8]) -> SnifferResult<()>;
}

pub struct PacketInjector {
    interface: String,
    tx: Box<dyn DataLinkSender>,
}

impl PacketInjector {
    pub fn open(interface: &NetworkInterface) -> SnifferResult<Self> {
        let tx = match datalink::channel(interface, Default::default()) {
            Ok(Channel::Ethernet(tx, _)) => tx,
            Ok(_) => {
                return Err(SnifferError::Injection(io::Error::new(
                    io::ErrorKind::Other,
                    "未サポートのチャネルタイプです",
                )))
            }
            Err(e) => return Err(SnifferError::Injection(e)),
        };

        info!("送信チャネルを開きました: {}", interface.name);
        Ok(Self {
            interface: interface.name.clone(),
            tx,
        })
    }
}

impl FrameSink for PacketInjector {
    /// 送信失敗はそのまま返す。再送はしない。
    fn send(&mut self, frame: &[u8]) -> SnifferResult<()> {
        debug!("{} へ {} バイト送信します", self.interface, frame.len());

        let result = match self.tx.send_to(frame, None) {
            Some(result) => result,
            None => Err(io::Error::new(io::ErrorKind::Other, "送信バッファを確保できませんでした")),
        };

        result.map_err(|e| {
            warn!("パケットの送信に失敗しました: {}", e);
            SnifferError::Injection(e)
        })
    }
}

/// 送信したフレームを保持するだけのシンク
#[cfg(test)]
impl FrameSink for Vec<Vec<u8>> {
    fn send(&mut self, frame: &[u8]) -> SnifferResult<()> {
        self.push(frame.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    impl FrameSink for FailingSink {
        fn send(&mut self, _frame: &[u8]) -> SnifferResult<()> {
            Err(SnifferError::Injection(io::Error::new(io::ErrorKind::PermissionDenied, "denied")))
        }
    }

    #[test]
    fn test_vec_sink_records_frames() {
        let mut sink: Vec<Vec<u8>> = Vec::new();
        sink.send(&[1, 2, 3]).unwrap();
        sink.send(&[4]).unwrap();
        assert_eq!(sink, vec![vec![1, 2, 3], vec![4]]);
    }

    #[test]
    fn test_failure_is_surfaced_unchanged() {
        match FailingSink.send(&[0]) {
            Err(SnifferError::Injection(e)) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("予期しない結果: {:?}", other),
        }
    }
}
