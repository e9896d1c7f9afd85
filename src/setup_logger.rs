use crate::core::error::{SnifferError, SnifferResult};
use env_logger::{Builder, Target};
use log::{debug, LevelFilter};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// 標準出力はパケットの表示に使うので、ログはファイルか標準エラーに出す
pub fn setup_logger(level: LevelFilter, log_file: Option<&Path>) -> SnifferResult<()> {
    let target = match log_file {
        Some(path) => Target::Pipe(Box::new(File::create(path)?)),
        None => Target::Stderr,
    };

    Builder::new()
        .filter_level(level)
        // タイムスタンプ付きのフォーマット
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(target)
        .try_init()
        .map_err(|e| SnifferError::Config(format!("ロガーの初期化に失敗しました: {}", e)))?;

    debug!("ロガーを初期化しました: {}", level);
    Ok(())
}
