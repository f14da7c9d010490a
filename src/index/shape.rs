use serde::{Deserialize, Serialize};

use crate::util::symbol::Symbol;

/// q-gram 形状：长度为 `span` 的窗口中，`offsets` 给出参与哈希的位置（"1"），其余为空位（"0"）。
///
/// 哈希值是所选符号以 `sigma` 为基数的整数，高位在前，因此哈希序就是 q-gram 的字典序。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    sigma: u32,
    span: usize,
    offsets: Vec<usize>,
    /// sigma^(weight - 1)
    left_factor: u64,
}

impl Shape {
    /// 连续 q-gram。
    pub fn ungapped(q: usize, sigma: u32) -> Self {
        Self::from_offsets((0..q).collect(), q, sigma)
    }

    /// 由 "1"/"0" 串构造带空位的形状，例如 `"11011"`；必须以 '1' 开头。
    pub fn gapped(pattern: &str, sigma: u32) -> Self {
        assert!(pattern.starts_with('1'), "shape '{}' must begin with '1'", pattern);
        let offsets = pattern
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| match b {
                b'1' => Some(i),
                b'0' => None,
                _ => panic!("shape '{}' may only contain '0' and '1'", pattern),
            })
            .collect();
        Self::from_offsets(offsets, pattern.len(), sigma)
    }

    fn from_offsets(offsets: Vec<usize>, span: usize, sigma: u32) -> Self {
        assert!(sigma >= 1, "alphabet must not be empty");
        assert!(!offsets.is_empty(), "shape must have positive weight");
        let weight = offsets.len() as u32;
        assert!(
            u64::from(sigma).checked_pow(weight).is_some(),
            "sigma^weight = {}^{} overflows the 64-bit hash",
            sigma,
            weight
        );
        let left_factor = u64::from(sigma).pow(weight - 1);
        Self { sigma, span, offsets, left_factor }
    }

    pub fn span(&self) -> usize {
        self.span
    }

    pub fn weight(&self) -> usize {
        self.offsets.len()
    }

    pub fn sigma(&self) -> u32 {
        self.sigma
    }

    pub fn is_ungapped(&self) -> bool {
        self.offsets.len() == self.span
    }

    /// 不同哈希值的个数 sigma^weight。
    pub fn value_count(&self) -> u64 {
        self.left_factor * u64::from(self.sigma)
    }

    #[inline]
    fn ord<T: Symbol>(&self, c: T) -> u64 {
        let o = c.ord();
        debug_assert!(o < self.sigma, "symbol ordinal {} outside alphabet of size {}", o, self.sigma);
        u64::from(o)
    }

    /// 窗口 `window[..span]` 的哈希值。
    pub fn hash<T: Symbol>(&self, window: &[T]) -> u64 {
        assert!(window.len() >= self.span, "window shorter than shape span");
        let sigma = u64::from(self.sigma);
        self.offsets.iter().fold(0u64, |h, &i| h * sigma + self.ord(window[i]))
    }

    /// 由前一个窗口的哈希滚动计算后一个窗口（向右移动一位）的哈希。
    /// 带空位的形状直接重新计算。
    pub fn hash_next<T: Symbol>(&self, prev_window: &[T], prev_hash: u64, new_window: &[T]) -> u64 {
        if !self.is_ungapped() {
            return self.hash(new_window);
        }
        let sigma = u64::from(self.sigma);
        (prev_hash - self.ord(prev_window[0]) * self.left_factor) * sigma + self.ord(new_window[self.span - 1])
    }

    /// 模式串前 `min(len, span)` 个符号的哈希，不足部分按最小符号补齐。仅用于连续形状。
    pub fn hash_prefix<T: Symbol>(&self, pattern: &[T]) -> u64 {
        self.padded(pattern, 0)
    }

    /// 与 [`Shape::hash_prefix`] 配对的开区间上界：以该前缀开头的 q-gram 哈希都落在
    /// `[hash_prefix, hash_upper)` 内。
    pub fn hash_upper<T: Symbol>(&self, pattern: &[T]) -> u64 {
        self.padded(pattern, 1)
    }

    fn padded<T: Symbol>(&self, pattern: &[T], bump: u64) -> u64 {
        assert!(self.is_ungapped(), "prefix hashing needs an ungapped shape");
        let sigma = u64::from(self.sigma);
        let k = pattern.len().min(self.span);
        let h = pattern[..k].iter().fold(0u64, |h, &c| h * sigma + self.ord(c)) + bump;
        (k..self.span).fold(h, |h, _| h * sigma)
    }

    /// 依次给出文本中每个完整窗口的 (起始位置, 哈希)。
    pub fn hashes<'a, T: Symbol>(&'a self, text: &'a [T]) -> QGramHashes<'a, T> {
        QGramHashes { shape: self, text, pos: 0, last: None }
    }
}

pub struct QGramHashes<'a, T> {
    shape: &'a Shape,
    text: &'a [T],
    pos: usize,
    last: Option<u64>,
}

impl<T: Symbol> Iterator for QGramHashes<'_, T> {
    type Item = (usize, u64);

    fn next(&mut self) -> Option<(usize, u64)> {
        let span = self.shape.span;
        if self.pos + span > self.text.len() {
            return None;
        }
        let pos = self.pos;
        let h = match self.last {
            Some(prev) => self.shape.hash_next(&self.text[pos - 1..], prev, &self.text[pos..]),
            None => self.shape.hash(&self.text[pos..]),
        };
        self.last = Some(h);
        self.pos += 1;
        Some((pos, h))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.text.len() + 1).saturating_sub(self.pos + self.shape.span);
        (left, Some(left))
    }
}
