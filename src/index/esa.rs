use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::childtab::ChildTable;
use super::lcp::create_lcp_table_with;
use super::sa::create_suffix_array_with;
use crate::config::{IndexConfig, LcpAlgorithm};
use crate::error::{IndexError, Result};
use crate::util::symbol::Symbol;

/// 索引元信息，随表一起持久化。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub text_len: u64,
    pub lcp_algorithm: LcpAlgorithm,
    pub reference_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 增强后缀数组的三张表（SA / LCP / 子表），不含文本本身。
///
/// 持久化格式：bincode 顺序写出元信息与三个定长整数数组。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsaTables {
    pub meta: IndexMeta,
    pub sa: Vec<u32>,
    pub lcp: Vec<u32>,
    pub child: ChildTable,
}

impl EsaTables {
    pub fn build<T: Symbol>(text: &[T], config: &IndexConfig) -> Result<Self> {
        let sa = create_suffix_array_with(text, &config.pipe)?;
        log::info!("building LCP table ({:?})", config.lcp);
        let lcp = create_lcp_table_with(text, &sa, config.lcp);
        log::info!("building child table");
        let child = ChildTable::build(&lcp);
        let meta = IndexMeta {
            text_len: text.len() as u64,
            lcp_algorithm: config.lcp,
            build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
            ..IndexMeta::default()
        };
        Ok(Self { meta, sa, lcp, child })
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let f = std::io::BufWriter::new(std::fs::File::create(path)?);
        bincode::serialize_into(f, self)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let f = std::io::BufReader::new(std::fs::File::open(path)?);
        Ok(bincode::deserialize_from(f)?)
    }
}

/// SA 上的半开区间 `[lb, rb)`，对应后缀树的一个结点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub lb: usize,
    pub rb: usize,
}

impl Interval {
    pub fn len(&self) -> usize {
        self.rb - self.lb
    }

    pub fn is_empty(&self) -> bool {
        self.rb <= self.lb
    }

    pub fn range(&self) -> Range<usize> {
        self.lb..self.rb
    }
}

/// 增强后缀数组：借用文本，持有 SA、LCP 与子表，支持与后缀树等价的自顶向下遍历。
#[derive(Debug, Clone)]
pub struct EnhancedSuffixArray<'t, T> {
    text: &'t [T],
    tables: EsaTables,
}

impl<'t, T: Symbol> EnhancedSuffixArray<'t, T> {
    pub fn build(text: &'t [T], config: &IndexConfig) -> Result<Self> {
        let tables = EsaTables::build(text, config)?;
        Ok(Self { text, tables })
    }

    /// 与已加载的表组合；表必须由同一文本构建。
    pub fn from_tables(text: &'t [T], tables: EsaTables) -> Result<Self> {
        let expected = tables.sa.len();
        if expected != text.len() || tables.lcp.len() != expected || tables.child.len() != expected {
            return Err(IndexError::TextMismatch { expected, actual: text.len() });
        }
        Ok(Self { text, tables })
    }

    pub fn into_tables(self) -> EsaTables {
        self.tables
    }

    pub fn tables(&self) -> &EsaTables {
        &self.tables
    }

    pub fn text(&self) -> &'t [T] {
        self.text
    }

    pub fn sa(&self) -> &[u32] {
        &self.tables.sa
    }

    pub fn lcp(&self) -> &[u32] {
        &self.tables.lcp
    }

    pub fn child_table(&self) -> &ChildTable {
        &self.tables.child
    }

    pub fn root(&self) -> Interval {
        Interval { lb: 0, rb: self.text.len() }
    }

    pub fn is_leaf(&self, iv: Interval) -> bool {
        iv.lb + 1 >= iv.rb
    }

    /// 结点所代表的字符串长度：叶子是后缀长度，内部结点是区间的 lcp 值。
    pub fn rep_length(&self, iv: Interval) -> usize {
        if self.is_leaf(iv) {
            return self.text.len() - self.tables.sa[iv.lb] as usize;
        }
        let boundary = self.tables.child.first_boundary(&self.tables.lcp, iv.lb, iv.rb);
        self.tables.lcp[boundary] as usize
    }

    pub fn children(&self, iv: Interval) -> Vec<Interval> {
        self.tables
            .child
            .children(&self.tables.lcp, iv.lb, iv.rb)
            .into_iter()
            .map(|(lb, rb)| Interval { lb, rb })
            .collect()
    }

    /// 结点下全部后缀的起始位置（SA 顺序）。
    pub fn occurrences(&self, iv: Interval) -> &[u32] {
        &self.tables.sa[iv.range()]
    }

    /// 结点所代表字符串的第 `depth` 个符号；后缀不够长时为 None。
    fn symbol_at(&self, iv: Interval, depth: usize) -> Option<T> {
        self.text.get(self.tables.sa[iv.lb] as usize + depth).copied()
    }

    /// 沿子表自顶向下匹配 `pattern`，返回以其为前缀的后缀区间；不存在时为空区间。
    pub fn find_interval(&self, pattern: &[T]) -> Interval {
        assert!(!pattern.is_empty(), "empty pattern");
        let m = pattern.len();
        let not_found = Interval { lb: 0, rb: 0 };
        let mut iv = self.root();
        let mut depth = 0usize;
        loop {
            let reach = if self.is_leaf(iv) { m } else { self.rep_length(iv).min(m) };
            let start = self.tables.sa[iv.lb] as usize;
            match self.text.get(start + depth..start + reach) {
                Some(edge) if edge == &pattern[depth..reach] => {}
                _ => return not_found,
            }
            if reach == m {
                return iv;
            }
            depth = reach;
            let c = pattern[depth];
            match self.children(iv).into_iter().find(|&child| self.symbol_at(child, depth) == Some(c)) {
                Some(child) => iv = child,
                None => return not_found,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banana() -> EnhancedSuffixArray<'static, u8> {
        EnhancedSuffixArray::build(b"banana", &IndexConfig::default()).unwrap()
    }

    #[test]
    fn banana_tables() {
        let esa = banana();
        assert_eq!(esa.sa(), &[5, 3, 1, 0, 4, 2]);
        assert_eq!(&esa.lcp()[1..], &[1, 3, 0, 0, 2]);
        assert_eq!(esa.tables().meta.text_len, 6);
    }

    #[test]
    fn root_children_and_depths() {
        let esa = banana();
        let root = esa.root();
        assert_eq!(esa.rep_length(root), 0);
        let children = esa.children(root);
        assert_eq!(children, vec![Interval { lb: 0, rb: 3 }, Interval { lb: 3, rb: 4 }, Interval { lb: 4, rb: 6 }]);
        assert_eq!(esa.rep_length(children[0]), 1); // "a"
        assert_eq!(esa.rep_length(children[1]), 6); // 叶子 "banana"
        assert_eq!(esa.rep_length(children[2]), 2); // "na"
        assert!(esa.is_leaf(children[1]));
    }

    #[test]
    fn top_down_search() {
        let esa = banana();
        let hits = |p: &[u8]| {
            let mut v = esa.occurrences(esa.find_interval(p)).to_vec();
            v.sort();
            v
        };
        assert_eq!(hits(b"ana"), vec![1, 3]);
        assert_eq!(hits(b"a"), vec![1, 3, 5]);
        assert_eq!(hits(b"banana"), vec![0]);
        assert_eq!(hits(b"nan"), vec![2]);
        assert!(hits(b"bananas").is_empty());
        assert!(hits(b"anb").is_empty());
        assert!(hits(b"c").is_empty());
    }

    #[test]
    fn search_matches_scan_on_random_text() {
        let mut x: u32 = 4242;
        let text: Vec<u8> = (0..400)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((x >> 16) % 3) as u8
            })
            .collect();
        let esa = EnhancedSuffixArray::build(&text, &IndexConfig::default()).unwrap();
        for start in (0..380).step_by(13) {
            for len in [1usize, 2, 5, 9, 20] {
                let pattern = &text[start..start + len];
                let iv = esa.find_interval(pattern);
                let expected = (0..text.len()).filter(|&i| text[i..].starts_with(pattern)).count();
                assert_eq!(iv.len(), expected, "mismatch on start={} len={}", start, len);
            }
        }
    }

    #[test]
    fn tables_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banana.esa");
        let esa = banana();
        esa.tables().save_to_file(&path).unwrap();
        let loaded = EsaTables::load_from_file(&path).unwrap();
        assert_eq!(&loaded, esa.tables());
        let restored = EnhancedSuffixArray::from_tables(&b"banana"[..], loaded).unwrap();
        assert_eq!(restored.find_interval(b"na").len(), 2);
    }

    #[test]
    fn loaded_tables_must_match_text() {
        let tables = banana().into_tables();
        let err = EnhancedSuffixArray::from_tables(&b"banan"[..], tables).unwrap_err();
        assert!(matches!(err, IndexError::TextMismatch { expected: 6, actual: 5 }));
    }

    #[test]
    fn in_place_lcp_gives_identical_tables() {
        let text = b"abracadabra_abracadabra";
        let aux = EnhancedSuffixArray::build(text, &IndexConfig::default()).unwrap();
        let config = IndexConfig { lcp: LcpAlgorithm::InPlace, ..IndexConfig::default() };
        let in_place = EnhancedSuffixArray::build(text, &config).unwrap();
        assert_eq!(aux.lcp(), in_place.lcp());
        assert_eq!(aux.child_table(), in_place.child_table());
    }
}
