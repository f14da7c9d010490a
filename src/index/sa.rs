use std::cmp::Ordering;
use std::ops::Range;

use super::skew7;
use crate::config::PipeConfig;
use crate::error::{IndexError, Result};
use crate::pipe::{collect, Map, Source};
use crate::util::symbol::{max_ord, Symbol};

/// 位置以 u32 存储，文本长度必须小于 2^32 - 1。
pub(crate) fn check_text_len(len: usize) -> Result<()> {
    if len >= u32::MAX as usize {
        return Err(IndexError::TextTooLong { len });
    }
    Ok(())
}

/// 构建后缀数组（DC7 skew 流水线，线性时间），使用默认内存上限。
pub fn create_suffix_array<T: Symbol>(text: &[T]) -> Result<Vec<u32>> {
    create_suffix_array_with(text, &PipeConfig::default())
}

/// 构建后缀数组；中间结果超过 `config.memory_records` 时溢写到磁盘。
///
/// 后缀比较按符号序号进行，较短的后缀在相同前缀下排在前面。
pub fn create_suffix_array_with<T: Symbol>(text: &[T], config: &PipeConfig) -> Result<Vec<u32>> {
    assert!(!text.is_empty(), "cannot build a suffix array of an empty text");
    check_text_len(text.len())?;
    let max_code = max_ord(text)
        .and_then(|m| m.checked_add(1))
        .unwrap_or_else(|| panic!("symbol ordinal u32::MAX is reserved"));

    log::info!("building suffix array for {} symbols", text.len());
    let mut codes = Map::new(Source::new(text), |c: T| c.ord() + 1);
    let mut sa = skew7::suffix_sort(&mut codes, max_code, config, 0)?;
    collect(&mut sa)
}

/// 仅含后缀数组的全文索引，查询使用带 mlr 启发式的二分查找。
#[derive(Debug, Clone)]
pub struct SuffixArrayIndex<'t, T> {
    text: &'t [T],
    sa: Vec<u32>,
}

impl<'t, T: Symbol> SuffixArrayIndex<'t, T> {
    pub fn build(text: &'t [T], config: &PipeConfig) -> Result<Self> {
        let sa = create_suffix_array_with(text, config)?;
        Ok(Self { text, sa })
    }

    pub fn from_parts(text: &'t [T], sa: Vec<u32>) -> Self {
        assert_eq!(text.len(), sa.len(), "suffix array does not match the text");
        Self { text, sa }
    }

    pub fn text(&self) -> &'t [T] {
        self.text
    }

    pub fn sa(&self) -> &[u32] {
        &self.sa
    }

    /// 比较 `text[pos..]` 与 `pattern`，跳过已知相同的前 `skip` 个符号。
    /// 返回比较结果与公共前缀长度；模式串是后缀的前缀时视为相等。
    fn compare_suffix(&self, pos: usize, pattern: &[T], skip: usize) -> (Ordering, usize) {
        let suffix = &self.text[pos..];
        let mut k = skip;
        while k < pattern.len() {
            match suffix.get(k) {
                None => return (Ordering::Less, k),
                Some(c) => match c.cmp(&pattern[k]) {
                    Ordering::Equal => k += 1,
                    ord => return (ord, k),
                },
            }
        }
        (Ordering::Equal, k)
    }

    /// 以 `pattern` 为前缀的后缀在 SA 中的区间。
    pub fn equal_range(&self, pattern: &[T]) -> Range<usize> {
        assert!(!pattern.is_empty(), "empty pattern");
        let begin = self.partition(pattern, |ord| ord == Ordering::Less);
        let end = self.partition(pattern, |ord| ord != Ordering::Greater);
        begin..end.max(begin)
    }

    /// 第一个不满足 `before` 的 SA 下标。
    fn partition(&self, pattern: &[T], before: impl Fn(Ordering) -> bool) -> usize {
        let (mut lo, mut hi) = (0usize, self.sa.len());
        // lo 左侧与 hi 处的后缀各自与模式串的公共前缀长度
        let (mut lcp_lo, mut lcp_hi) = (0usize, 0usize);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let skip = lcp_lo.min(lcp_hi);
            let (ord, lcp) = self.compare_suffix(self.sa[mid] as usize, pattern, skip);
            if before(ord) {
                lo = mid + 1;
                lcp_lo = lcp;
            } else {
                hi = mid;
                lcp_hi = lcp;
            }
        }
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sa(text: &[u8]) -> Vec<u32> {
        let n = text.len();
        let mut suffixes: Vec<(usize, &[u8])> = (0..n).map(|i| (i, &text[i..])).collect();
        suffixes.sort_by(|a, b| a.1.cmp(b.1));
        suffixes.into_iter().map(|(i, _)| i as u32).collect()
    }

    fn make_text(len: usize) -> Vec<u8> {
        let mut x: u32 = 1_234_567;
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            v.push(((x >> 16) % 6) as u8);
        }
        v
    }

    #[test]
    fn sa_banana() {
        assert_eq!(create_suffix_array(b"banana").unwrap(), vec![5, 3, 1, 0, 4, 2]);
    }

    #[test]
    fn sa_basic() {
        // 文本：A C G T $  -> 1 2 3 4 0
        let text = [1u8, 2, 3, 4, 0];
        assert_eq!(create_suffix_array(&text).unwrap(), vec![4, 0, 1, 2, 3]);
    }

    #[test]
    fn sa_matches_naive_on_small_random_texts() {
        for len in 1..=64 {
            let text = make_text(len);
            assert_eq!(create_suffix_array(&text).unwrap(), naive_sa(&text), "mismatch on len={}", len);
        }
    }

    #[test]
    fn sa_handles_multiple_separators() {
        // 文本：A C $ G $  -> 1 2 0 3 0
        let text = [1u8, 2, 0, 3, 0];
        assert_eq!(create_suffix_array(&text).unwrap(), naive_sa(&text));
    }

    #[test]
    fn sa_over_chars_and_wide_symbols() {
        let text: Vec<char> = "mississippi".chars().collect();
        assert_eq!(create_suffix_array(&text).unwrap(), vec![10, 7, 4, 1, 0, 9, 8, 6, 3, 5, 2]);
        let wide: Vec<u32> = vec![70_000, 3, 70_000, 3, 1];
        let sa = create_suffix_array(&wide).unwrap();
        assert_eq!(sa, vec![4, 3, 1, 2, 0]);
    }

    #[test]
    #[should_panic(expected = "empty text")]
    fn sa_rejects_empty_text() {
        let _ = create_suffix_array::<u8>(&[]);
    }

    #[test]
    fn equal_range_finds_all_occurrences() {
        let text = b"mississippi";
        let index = SuffixArrayIndex::build(text, &PipeConfig::default()).unwrap();
        let hits = |p: &[u8]| {
            let mut v: Vec<u32> = index.sa()[index.equal_range(p)].to_vec();
            v.sort();
            v
        };
        assert_eq!(hits(b"ssi"), vec![2, 5]);
        assert_eq!(hits(b"i"), vec![1, 4, 7, 10]);
        assert_eq!(hits(b"mississippi"), vec![0]);
        assert!(hits(b"ssx").is_empty());
        assert!(hits(b"mississippix").is_empty());
        assert!(hits(b"a").is_empty());
        assert!(hits(b"z").is_empty());
    }

    #[test]
    fn equal_range_matches_scan() {
        let text = make_text(300);
        let index = SuffixArrayIndex::build(&text, &PipeConfig::default()).unwrap();
        for start in (0..290).step_by(7) {
            for len in 1..6 {
                let pattern = &text[start..start + len];
                let range = index.equal_range(pattern);
                let expected = (0..text.len()).filter(|&i| text[i..].starts_with(pattern)).count();
                assert_eq!(range.len(), expected, "mismatch on start={} len={}", start, len);
                for &p in &index.sa()[range] {
                    assert!(text[p as usize..].starts_with(pattern));
                }
            }
        }
    }
}
