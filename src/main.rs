use ipk_sniffer::core::{Configuration, OutputFormat, SnifferError, SnifferResult};
use ipk_sniffer::network::{CaptureState, PacketCapture, PacketSummary};
use ipk_sniffer::setup_logger::setup_logger;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task;

fn list_devices() -> SnifferResult<()> {
    let devices = pcap::Device::list()?;

    println!("利用可能なデバイス:");
    for device in devices {
        match device.desc {
            Some(desc) => println!("{} ({})", device.name, desc),
            None => println!("{}", device.name),
        }
    }

    Ok(())
}

fn print_summary(summary: &PacketSummary, output: OutputFormat) -> SnifferResult<()> {
    match output {
        OutputFormat::Text => println!("{}", summary),
        OutputFormat::Json => println!("{}", serde_json::to_string(summary)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), SnifferError> {
    let config = Configuration::from_env()?;
    setup_logger(config.log_level, config.log_file.as_deref())?;

    // インターフェースの指定が無ければ一覧を表示して終了
    let Some(interface) = config.capture.interface.clone() else {
        return list_devices();
    };

    let filter = config.filter.compile();
    info!("フィルタ: {}", if filter.is_empty() { "(なし)" } else { filter.as_str() });

    // Ctrl+C で停止フラグを立てる
    let stop = Arc::new(AtomicBool::new(false));
    let signal = Arc::clone(&stop);
    task::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C を受け取りました");
            signal.store(true, Ordering::SeqCst);
        }
    });

    let capture_config = config.capture.clone();
    let output = config.output;

    // libpcap の読み取りはブロックするので専用スレッドで回す
    let state = task::spawn_blocking(move || -> SnifferResult<CaptureState> {
        let mut capture = PacketCapture::open(&capture_config, &filter)?;
        println!("{} でキャプチャしています。Ctrl+C で停止します", interface);
        println!();

        capture.run(CaptureState::new(capture_config.packet_count), &stop, |frame| {
            let summary = PacketSummary::from_frame(
                &frame.decode(),
                frame.timestamp,
                frame.original_length,
                frame.data.len(),
            );
            if let Err(e) = print_summary(&summary, output) {
                error!("パケットの表示に失敗しました: {}", e);
            }
        })
    })
    .await??;

    info!("{} 件のパケットを表示しました", state.displayed);
    Ok(())
}
