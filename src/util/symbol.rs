/// 可被索引的符号：能映射到紧凑的序号 `ord`，且序号顺序与符号的字典序一致。
///
/// 索引构建只依赖 `ord`；字母表大小由调用方（Shape）或扫描文本得到。
pub trait Symbol: Copy + Eq + Ord + Send + Sync {
    fn ord(self) -> u32;
}

impl Symbol for u8 {
    #[inline]
    fn ord(self) -> u32 {
        self as u32
    }
}

impl Symbol for u16 {
    #[inline]
    fn ord(self) -> u32 {
        self as u32
    }
}

impl Symbol for u32 {
    #[inline]
    fn ord(self) -> u32 {
        self
    }
}

impl Symbol for char {
    #[inline]
    fn ord(self) -> u32 {
        self as u32
    }
}

/// 文本中最大的序号，空文本返回 None。
pub fn max_ord<T: Symbol>(text: &[T]) -> Option<u32> {
    text.iter().map(|&c| c.ord()).max()
}

/// 表示 `[0, max]` 内所有值所需的位数（至少 1 位）。
#[inline]
pub fn bits_for(max: u32) -> u32 {
    (u32::BITS - max.leading_zeros()).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ord_preserves_order() {
        assert!(b'a'.ord() < b'b'.ord());
        assert!('x'.ord() < 'y'.ord());
        assert_eq!(7u16.ord(), 7);
    }

    #[test]
    fn bit_widths() {
        assert_eq!(bits_for(0), 1);
        assert_eq!(bits_for(1), 1);
        assert_eq!(bits_for(5), 3);
        assert_eq!(bits_for(255), 8);
        assert_eq!(bits_for(256), 9);
        assert_eq!(bits_for(u32::MAX), 32);
    }

    #[test]
    fn max_ord_of_text() {
        assert_eq!(max_ord::<u8>(&[]), None);
        assert_eq!(max_ord(b"banana"), Some(b'n' as u32));
    }
}
