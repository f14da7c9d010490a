/// DNA 字母表大小：{0:$, 1:A, 2:C, 3:G, 4:T, 5:N}，0 用作序列分隔符。
pub const SIGMA: usize = 6;

#[inline]
pub fn to_alphabet(b: u8) -> u8 {
    if b == 0 {
        return 0;
    }
    match b.to_ascii_uppercase() {
        b'A' => 1,
        b'C' => 2,
        b'G' => 3,
        b'T' | b'U' => 4,
        _ => 5, // 其他字符一律视为 N
    }
}

#[inline]
pub fn from_alphabet(a: u8) -> u8 {
    match a {
        0 => b'$',
        1 => b'A',
        2 => b'C',
        3 => b'G',
        4 => b'T',
        _ => b'N',
    }
}

/// 将 ASCII 序列编码到 [0, SIGMA)。
pub fn encode(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| to_alphabet(b)).collect()
}

/// 将编码后的序列还原为 ASCII，便于日志和输出。
pub fn decode(codes: &[u8]) -> String {
    codes.iter().map(|&a| from_alphabet(a) as char).collect()
}
