//! 统一的精确匹配查找器：对任意全文索引逐个枚举模式串的出现位置。

use std::marker::PhantomData;
use std::ops::Range;

use super::esa::EnhancedSuffixArray;
use super::qgram::QGramIndex;
use super::sa::SuffixArrayIndex;
use crate::util::symbol::Symbol;

/// 可供 [`Finder`] 查询的索引：给出模式串的命中区间，以及区间内每一项对应的文本位置。
pub trait FindIndex<T> {
    fn find_range(&self, pattern: &[T]) -> Range<usize>;
    fn position_at(&self, i: usize) -> usize;
}

impl<T: Symbol> FindIndex<T> for SuffixArrayIndex<'_, T> {
    fn find_range(&self, pattern: &[T]) -> Range<usize> {
        self.equal_range(pattern)
    }

    fn position_at(&self, i: usize) -> usize {
        self.sa()[i] as usize
    }
}

impl<T: Symbol> FindIndex<T> for EnhancedSuffixArray<'_, T> {
    fn find_range(&self, pattern: &[T]) -> Range<usize> {
        self.find_interval(pattern).range()
    }

    fn position_at(&self, i: usize) -> usize {
        self.sa()[i] as usize
    }
}

impl<T: Symbol> FindIndex<T> for QGramIndex<'_, T> {
    fn find_range(&self, pattern: &[T]) -> Range<usize> {
        self.lookup(pattern)
    }

    fn position_at(&self, i: usize) -> usize {
        self.sa()[i] as usize
    }
}

/// 查找游标。
///
/// 首次调用 [`Finder::find`] 时查询索引并停在第一个命中；之后每次调用前进一个命中，
/// 越过末尾时返回 false。索引只被共享借用，多个 Finder 可以并发查询同一索引。
#[derive(Debug)]
pub struct Finder<'i, T, I: ?Sized> {
    index: &'i I,
    range: Option<Range<usize>>,
    cursor: usize,
    pattern_len: usize,
    _symbol: PhantomData<fn(&[T])>,
}

impl<'i, T, I: FindIndex<T> + ?Sized> Finder<'i, T, I> {
    pub fn new(index: &'i I) -> Self {
        Self { index, range: None, cursor: 0, pattern_len: 0, _symbol: PhantomData }
    }

    pub fn index(&self) -> &'i I {
        self.index
    }

    pub fn find(&mut self, pattern: &[T]) -> bool {
        match &self.range {
            None => {
                let range = self.index.find_range(pattern);
                self.cursor = range.start;
                self.pattern_len = pattern.len();
                self.range = Some(range);
            }
            Some(range) => {
                if self.cursor < range.end {
                    self.cursor += 1;
                }
            }
        }
        !self.at_end()
    }

    /// 回到未查询状态，下一次 `find` 会重新查询索引。
    pub fn clear(&mut self) {
        self.range = None;
        self.cursor = 0;
        self.pattern_len = 0;
    }

    /// 已查询且没有命中。
    pub fn empty(&self) -> bool {
        self.range.as_ref().map_or(false, |r| r.is_empty())
    }

    pub fn at_begin(&self) -> bool {
        self.range.as_ref().map_or(true, |r| self.cursor == r.start)
    }

    pub fn at_end(&self) -> bool {
        self.range.as_ref().map_or(true, |r| self.cursor >= r.end)
    }

    pub fn go_begin(&mut self) {
        if let Some(r) = &self.range {
            self.cursor = r.start;
        }
    }

    pub fn go_end(&mut self) {
        if let Some(r) = &self.range {
            self.cursor = r.end;
        }
    }

    /// 当前命中区间；尚未查询时为 None。
    pub fn range(&self) -> Option<Range<usize>> {
        self.range.clone()
    }

    pub fn count(&self) -> usize {
        self.range.as_ref().map_or(0, |r| r.len())
    }

    /// 当前命中的文本起始位置。
    pub fn position(&self) -> usize {
        assert!(!self.at_end(), "finder is not positioned on a hit");
        self.index.position_at(self.cursor)
    }

    pub fn begin_position(&self) -> usize {
        self.position()
    }

    /// 当前命中的文本结束位置（不含）。
    pub fn end_position(&self) -> usize {
        self.position() + self.pattern_len
    }

    /// 剩余命中的全部位置（从当前游标开始，索引顺序）。
    pub fn positions(&self) -> Vec<usize> {
        match &self.range {
            Some(r) => (self.cursor.min(r.end)..r.end).map(|i| self.index.position_at(i)).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, PipeConfig};
    use crate::index::shape::Shape;
    use crate::index::qgram::create_qgram_index;

    fn drain<I: FindIndex<u8>>(index: &I, pattern: &[u8]) -> Vec<usize> {
        let mut finder = Finder::new(index);
        let mut hits = Vec::new();
        while finder.find(pattern) {
            hits.push(finder.position());
        }
        hits.sort();
        hits
    }

    #[test]
    fn all_indexes_agree_on_banana() {
        let text = b"banana";
        let sa = SuffixArrayIndex::build(text, &PipeConfig::default()).unwrap();
        let esa = EnhancedSuffixArray::build(text, &IndexConfig::default()).unwrap();
        let codes: Vec<u8> = text.iter().map(|c| c - b'a').collect();
        let qgram = create_qgram_index(&codes, Shape::ungapped(3, 26)).unwrap();

        assert_eq!(drain(&sa, b"ana"), vec![1, 3]);
        assert_eq!(drain(&esa, b"ana"), vec![1, 3]);
        let ana: Vec<u8> = b"ana".iter().map(|c| c - b'a').collect();
        assert_eq!(drain(&qgram, &ana), vec![1, 3]);
        assert!(drain(&esa, b"nab").is_empty());
    }

    #[test]
    fn cursor_navigation() {
        let text = b"mississippi";
        let esa = EnhancedSuffixArray::build(text, &IndexConfig::default()).unwrap();
        let mut finder = Finder::new(&esa);
        assert!(finder.at_begin() && finder.at_end() && !finder.empty());

        assert!(finder.find(b"ss"));
        assert_eq!(finder.count(), 2);
        assert!(finder.at_begin());
        let first = finder.begin_position();
        assert_eq!(finder.end_position(), first + 2);
        assert!(finder.find(b"ss"));
        assert!(!finder.at_begin());
        assert!(!finder.find(b"ss"));
        assert!(finder.at_end());
        // 越过末尾后保持在末尾
        assert!(!finder.find(b"ss"));

        finder.go_begin();
        assert_eq!(finder.position(), first);
        assert_eq!(finder.positions().len(), 2);
        finder.go_end();
        assert!(finder.positions().is_empty());

        finder.clear();
        assert!(finder.range().is_none());
        assert!(!finder.find(b"x"));
        assert!(finder.empty());
    }

    #[test]
    #[should_panic(expected = "empty pattern")]
    fn empty_pattern_on_suffix_array() {
        let sa = SuffixArrayIndex::build(b"banana", &PipeConfig::default()).unwrap();
        Finder::new(&sa).find(b"");
    }

    #[test]
    #[should_panic(expected = "empty pattern")]
    fn empty_pattern_on_enhanced_suffix_array() {
        let esa = EnhancedSuffixArray::build(b"banana", &IndexConfig::default()).unwrap();
        Finder::new(&esa).find(b"");
    }

    #[test]
    #[should_panic(expected = "empty pattern")]
    fn empty_pattern_on_qgram_index() {
        let qgram = create_qgram_index(&[1u8, 0, 13, 0, 13, 0], Shape::ungapped(3, 26)).unwrap();
        Finder::new(&qgram).find(&[0u8; 0]);
    }

    #[test]
    fn concurrent_finders_share_an_index() {
        let text: Vec<u8> = b"acgtacgtgacgatcgatcgatcgtagctagcatcgac".repeat(8);
        let esa = EnhancedSuffixArray::build(&text, &IndexConfig::default()).unwrap();
        let patterns: [&[u8]; 4] = [b"acg", b"gatc", b"tag", b"cgac"];
        std::thread::scope(|s| {
            let handles: Vec<_> = patterns
                .iter()
                .map(|&p| {
                    let esa = &esa;
                    s.spawn(move || (p, drain(esa, p)))
                })
                .collect();
            for h in handles {
                let (p, hits) = h.join().unwrap();
                let expected: Vec<usize> = (0..text.len()).filter(|&i| text[i..].starts_with(p)).collect();
                assert_eq!(hits, expected);
            }
        });
    }
}
