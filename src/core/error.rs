use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnifferError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("アドレスエラー: {0}")]
    Address(#[from] AddressError),

    #[error("キャプチャエラー: {0}")]
    Capture(#[from] pcap::Error),

    // 送信失敗は外部から返されたエラーをそのまま保持する (再送はしない)
    #[error("パケット注入エラー: {0}")]
    Injection(#[source] std::io::Error),

    #[error("デバイス選択エラー: {0}")]
    DeviceSelection(String),

    #[error("入出力エラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("出力エラー: {0}")]
    Output(#[from] serde_json::Error),

    #[error("タスクエラー: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("無効なMACアドレスです: {0}")]
    InvalidMac(String),

    #[error("無効なIPアドレスです: {0}")]
    InvalidIp(String),
}

pub type SnifferResult<T> = Result<T, SnifferError>;
