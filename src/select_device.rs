use crate::core::error::{SnifferError, SnifferResult};
use pnet::datalink::{self, NetworkInterface};
use std::io::{self, BufRead, Write};

/// 番号の入力でインターフェースを選ぶ
pub fn select_device<R: BufRead>(input: &mut R) -> SnifferResult<NetworkInterface> {
    let interfaces = datalink::interfaces();
    if interfaces.is_empty() {
        return Err(SnifferError::DeviceSelection("利用可能なデバイスがありません".to_string()));
    }

    println!("利用可能なデバイス:");
    for (index, interface) in interfaces.iter().enumerate() {
        println!("{}. {}", index + 1, interface.name);
    }

    print!("使用するデバイスの番号を入力してください: ");
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let index = pick_index(&line, interfaces.len())?;

    let selected_interface = interfaces[index].clone();
    println!("選択されたデバイス: {}", selected_interface.name);

    Ok(selected_interface)
}

/// 1始まりの番号を配列の添字に変換する
fn pick_index(line: &str, count: usize) -> SnifferResult<usize> {
    let number: usize = line
        .trim()
        .parse()
        .map_err(|_| SnifferError::DeviceSelection(format!("番号ではありません: {}", line.trim())))?;

    if number == 0 || number > count {
        return Err(SnifferError::DeviceSelection(format!("無効なデバイス番号です: {}", number)));
    }

    Ok(number - 1)
}
