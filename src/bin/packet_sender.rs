use ipk_sniffer::core::{Configuration, SnifferError};
use ipk_sniffer::network::{send_kind, PacketInjector, SendKind};
use ipk_sniffer::select_device::select_device;
use ipk_sniffer::setup_logger::setup_logger;
use log::{error, info};
use std::io::{self, BufRead};

fn print_menu() {
    println!("送信するパケットの番号を入力してください (それ以外で終了):");
    for kind in SendKind::ALL {
        println!("{}", kind);
    }
}

/// 1文字の入力だけを受け付ける
fn parse_key(line: &str) -> Option<SendKind> {
    let mut chars = line.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(key), None) => SendKind::from_key(key),
        _ => None,
    }
}

fn main() -> Result<(), SnifferError> {
    let config = Configuration::from_env()?;
    setup_logger(config.log_level, config.log_file.as_deref())?;

    let stdin = io::stdin();
    let mut input = stdin.lock();

    // デバイスの選択
    let interface = select_device(&mut input)?;
    let mut injector = PacketInjector::open(&interface)?;

    print_menu();

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let Some(kind) = parse_key(&line) else {
            info!("終了します");
            break;
        };

        // 失敗しても再送はせず、次の入力を待つ
        if let Err(e) = send_kind(&mut injector, kind) {
            error!("{} の送信に失敗しました: {}", kind.description(), e);
            eprintln!("ERR: {}", e);
        }
    }

    Ok(())
}
