use std::net::IpAddr;

/// インターネットチェックサム (RFC 1071)
///
/// 16ビットのビッグエンディアンワードの1の補数和を取り、その補数を返す。
/// 奇数長の場合、末尾のバイトはゼロでパディングされる。
pub fn checksum(data: &[u8]) -> u16 {
    finish(sum_words(data, 0))
}

fn sum_words(data: &[u8], initial: u32) -> u32 {
    let mut sum = initial;

    // 16ビット単位で合計を計算
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
        // 桁あふれする前に折り返す
        if sum > 0xFFFF_0000 {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
    }

    if let Some(&byte) = chunks.remainder().first() {
        sum = sum.wrapping_add((byte as u32) << 8);
    }

    sum
}

fn finish(mut sum: u32) -> u16 {
    // 上位16ビットを下位16ビットに折り返す
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    // 1の補数を取る
    !sum as u16
}

/// TCP/UDP/ICMPv6の疑似ヘッダーを組み立てる
///
/// IPv4: 送信元(4) 宛先(4) ゼロ(1) プロトコル(1) 上位層長(2)
/// IPv6: 送信元(16) 宛先(16) 上位層長(4) ゼロ(3) 次ヘッダー(1)
///
/// アドレスファミリーが一致しない場合は `None` を返す。
pub fn pseudo_header(source: IpAddr, destination: IpAddr, protocol: u8, length: usize) -> Option<Vec<u8>> {
    match (source, destination) {
        (IpAddr::V4(source), IpAddr::V4(destination)) => {
            let mut header = Vec::with_capacity(12);
            header.extend_from_slice(&source.octets());
            header.extend_from_slice(&destination.octets());
            header.push(0);
            header.push(protocol);
            header.extend_from_slice(&(length as u16).to_be_bytes());
            Some(header)
        }
        (IpAddr::V6(source), IpAddr::V6(destination)) => {
            let mut header = Vec::with_capacity(40);
            header.extend_from_slice(&source.octets());
            header.extend_from_slice(&destination.octets());
            header.extend_from_slice(&(length as u32).to_be_bytes());
            header.extend_from_slice(&[0, 0, 0]);
            header.push(protocol);
            Some(header)
        }
        _ => None,
    }
}

/// エンコード中に一度だけ使われるチェックサム計算範囲
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRegion {
    pub start: usize,
    pub length: usize,
    pub pseudo_header: Vec<u8>,
}

impl ChecksumRegion {
    /// 疑似ヘッダーを持たない範囲 (IPv4ヘッダー, ICMPv4, IGMP)
    pub fn new(start: usize, length: usize) -> Self {
        Self {
            start,
            length,
            pseudo_header: Vec::new(),
        }
    }

    pub fn with_pseudo_header(start: usize, length: usize, pseudo_header: Vec<u8>) -> Self {
        Self {
            start,
            length,
            pseudo_header,
        }
    }

    /// バッファのうち自身の範囲についてチェックサムを計算する
    ///
    /// チェックサムフィールドは呼び出し前にゼロにしておくこと。
    /// 疑似ヘッダーは常に偶数長なので、続けて加算してもワード境界はずれない。
    pub fn compute(&self, buffer: &[u8]) -> u16 {
        let end = (self.start + self.length).min(buffer.len());
        let region = &buffer[self.start.min(end)..end];
        finish(sum_words(region, sum_words(&self.pseudo_header, 0)))
    }

    /// チェックサムを計算し、バッファの `offset` に書き込む
    pub fn patch(&self, buffer: &mut [u8], offset: usize) -> u16 {
        buffer[offset] = 0;
        buffer[offset + 1] = 0;
        let value = self.compute(buffer);
        buffer[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
        value
    }
}
