//! q-gram 哈希索引：目录 `dir` 把每个 q-gram 映射到局部后缀数组上的区间 `[dir[b], dir[b + 1])`。
//!
//! 稠密布局直接以哈希值作桶号，目录大小 sigma^weight + 1；开放寻址布局通过 [`BucketMap`]
//! 把哈希映射到约 `alpha * #q-gram` 个桶。桶内位置用两遍计数排序填充，按文本位置递增。

use std::mem::size_of;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::sa::check_text_len;
use super::shape::Shape;
use crate::config::{DirLayout, QGramConfig};
use crate::error::{IndexError, Result};
use crate::util::symbol::Symbol;

/// 探测步长候选：选第一个不整除表长的素数，保证步长与表长互素。
const PROBE_STEPS: [u64; 42] = [
    43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139,
    149, 151, 157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227, 229, 233, 239, 241,
    251, 257,
];

/// 稠密目录的槽位上限（16 GiB 的 u32 目录）。
const MAX_DENSE_BUCKETS: u64 = 1 << 32;

fn coprime_step(len: u64) -> u64 {
    PROBE_STEPS.iter().copied().find(|&p| len % p != 0).unwrap_or(PROBE_STEPS[0])
}

/// 开放寻址哈希表：槽位记录占用它的 q-gram 哈希，冲突时以固定步长线性探测。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMap {
    slots: Vec<Option<u64>>,
    step: u64,
}

impl BucketMap {
    pub fn with_len(len: usize) -> Self {
        assert!(len > 0, "bucket map needs at least one slot");
        Self {
            slots: vec![None; len],
            step: coprime_step(len as u64),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// 槽位 `slot` 上的 q-gram 哈希。
    pub fn hash_at(&self, slot: usize) -> Option<u64> {
        self.slots.get(slot).copied().flatten()
    }

    /// 探测序列上第一个空槽或命中槽。
    fn probe(&self, hash: u64) -> usize {
        let len = self.slots.len() as u64;
        let mut slot = hash % len;
        for _ in 0..len {
            match self.slots[slot as usize] {
                None => return slot as usize,
                Some(h) if h == hash => return slot as usize,
                Some(_) => slot = (slot + self.step) % len,
            }
        }
        panic!("bucket map with {} slots is full", len)
    }

    /// 构建期：返回哈希对应的桶，首次出现时占用空槽。
    pub fn request_bucket(&mut self, hash: u64) -> usize {
        let slot = self.probe(hash);
        self.slots[slot] = Some(hash);
        slot
    }

    /// 查询期：只读探测，哈希不在表中时返回 None。
    pub fn get_bucket(&self, hash: u64) -> Option<usize> {
        let slot = self.probe(hash);
        self.slots[slot].map(|_| slot)
    }
}

/// 按内存占用选择目录布局。
fn choose_layout(num_qgrams: usize, shape: &Shape, config: &QGramConfig) -> Result<DirLayout> {
    let dense_len = shape
        .value_count()
        .checked_add(1)
        .filter(|&len| len <= MAX_DENSE_BUCKETS)
        .and_then(|len| usize::try_from(len).ok());
    let too_large = || IndexError::DirectoryTooLarge { sigma: shape.sigma(), weight: shape.weight() };
    Ok(match config.layout {
        DirLayout::Dense => {
            dense_len.ok_or_else(too_large)?;
            DirLayout::Dense
        }
        DirLayout::OpenAddressing => DirLayout::OpenAddressing,
        DirLayout::Auto => {
            let open_bytes = num_qgrams as f64 * config.alpha * (size_of::<u32>() + size_of::<Option<u64>>()) as f64;
            let dense_bytes = shape.value_count() as f64 * size_of::<u32>() as f64;
            if dense_len.is_none() || open_bytes < dense_bytes {
                DirLayout::OpenAddressing
            } else {
                DirLayout::Dense
            }
        }
    })
}

#[derive(Debug, Clone)]
pub struct QGramIndex<'t, T> {
    text: &'t [T],
    shape: Shape,
    dir: Vec<u32>,
    bucket_map: Option<BucketMap>,
    sa: Vec<u32>,
}

/// 以默认配置构建 q-gram 索引。
pub fn create_qgram_index<T: Symbol>(text: &[T], shape: Shape) -> Result<QGramIndex<'_, T>> {
    QGramIndex::build(text, shape, &QGramConfig::default())
}

impl<'t, T: Symbol> QGramIndex<'t, T> {
    pub fn build(text: &'t [T], shape: Shape, config: &QGramConfig) -> Result<Self> {
        assert!(config.alpha > 1.0, "alpha must exceed 1, got {}", config.alpha);
        check_text_len(text.len())?;
        if let Some(bad) = text.iter().find(|c| c.ord() >= shape.sigma()) {
            panic!("symbol ordinal {} outside alphabet of size {}", bad.ord(), shape.sigma());
        }

        let num_qgrams = (text.len() + 1).saturating_sub(shape.span());
        let layout = choose_layout(num_qgrams, &shape, config)?;
        let mut bucket_map = match layout {
            DirLayout::OpenAddressing => {
                let len = ((num_qgrams as f64 * config.alpha).ceil() as usize).max(num_qgrams + 1);
                Some(BucketMap::with_len(len))
            }
            _ => None,
        };
        let buckets = match &bucket_map {
            Some(map) => map.len(),
            None => shape.value_count() as usize,
        };
        log::info!(
            "building q-gram index: {} q-grams, weight {}, {} buckets ({})",
            num_qgrams,
            shape.weight(),
            buckets,
            if bucket_map.is_some() { "open addressing" } else { "dense" }
        );

        // 第一遍：计数
        let mut dir = vec![0u32; buckets + 1];
        for (_, h) in shape.hashes(text) {
            let bucket = match bucket_map.as_mut() {
                Some(map) => map.request_bucket(h),
                None => h as usize,
            };
            dir[bucket] += 1;
        }

        // dir[b + 1] = 桶 b 的起点，dir[0] = 0
        let mut start = 0u32;
        let mut pending = 0u32;
        for slot in dir.iter_mut() {
            let count = *slot;
            *slot = start;
            start += pending;
            pending = count;
        }

        // 第二遍：按位置填充，dir[b + 1] 递增到桶 b 的终点
        let mut sa = vec![0u32; num_qgrams];
        for (pos, h) in shape.hashes(text) {
            let bucket = match &bucket_map {
                Some(map) => map.get_bucket(h).unwrap_or_else(|| unreachable!("q-gram hash {} lost from bucket map", h)),
                None => h as usize,
            };
            let cursor = &mut dir[bucket + 1];
            sa[*cursor as usize] = pos as u32;
            *cursor += 1;
        }
        debug_assert_eq!(dir[buckets] as usize, num_qgrams);

        if let Some(map) = &bucket_map {
            log::debug!("bucket map: {} of {} slots used, step {}", map.occupied(), map.len(), map.step());
        }
        Ok(Self { text, shape, dir, bucket_map, sa })
    }

    pub fn text(&self) -> &'t [T] {
        self.text
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dir(&self) -> &[u32] {
        &self.dir
    }

    pub fn bucket_map(&self) -> Option<&BucketMap> {
        self.bucket_map.as_ref()
    }

    /// q-gram 起始位置，按桶分组，桶内按位置递增。
    pub fn sa(&self) -> &[u32] {
        &self.sa
    }

    pub fn is_open_addressing(&self) -> bool {
        self.bucket_map.is_some()
    }

    fn buckets(&self) -> usize {
        self.dir.len() - 1
    }

    /// 哈希值所在的桶；开放寻址下未出现的哈希返回 None。
    pub fn bucket_of(&self, hash: u64) -> Option<usize> {
        match &self.bucket_map {
            Some(map) => map.get_bucket(hash),
            None => usize::try_from(hash).ok().filter(|&b| b < self.buckets()),
        }
    }

    pub fn bucket_range(&self, bucket: usize) -> Range<usize> {
        self.dir[bucket] as usize..self.dir[bucket + 1] as usize
    }

    /// 模式串在局部后缀数组上的区间。
    ///
    /// 长度等于形状跨度时查一个桶；连续形状的稠密目录还支持更短的模式串，
    /// 此时返回所有以它为前缀的桶拼成的区间。其余长度属于前置条件错误。
    /// 含字母表外符号的模式串不可能出现在文本中，返回空区间。
    pub fn lookup(&self, pattern: &[T]) -> Range<usize> {
        assert!(!pattern.is_empty(), "empty pattern");
        let span = self.shape.span();
        assert!(
            pattern.len() == span
                || (pattern.len() < span && self.shape.is_ungapped() && !self.is_open_addressing()),
            "pattern of length {} cannot be looked up with a shape of span {}",
            pattern.len(),
            span
        );
        let sigma = self.shape.sigma();
        if pattern.iter().any(|c| c.ord() >= sigma) {
            return 0..0;
        }
        if pattern.len() == span {
            let hash = self.shape.hash(pattern);
            return self.bucket_of(hash).map_or(0..0, |b| self.bucket_range(b));
        }
        let lo = self.shape.hash_prefix(pattern) as usize;
        let hi = self.shape.hash_upper(pattern) as usize;
        self.dir[lo] as usize..self.dir[hi] as usize
    }

    /// q-gram 的全部出现位置。
    pub fn occurrences(&self, qgram: &[T]) -> &[u32] {
        &self.sa[self.lookup(qgram)]
    }

    /// 每个非空桶的 (哈希, 出现次数)，按哈希升序。
    pub fn bucket_counts(&self) -> Vec<(u64, u32)> {
        let count = |b: usize| self.dir[b + 1] - self.dir[b];
        let mut counts: Vec<(u64, u32)> = match &self.bucket_map {
            Some(map) => (0..map.len())
                .filter_map(|b| map.hash_at(b).map(|h| (h, count(b))))
                .collect(),
            None => (0..self.buckets())
                .filter(|&b| count(b) > 0)
                .map(|b| (b as u64, count(b)))
                .collect(),
        };
        counts.sort_unstable();
        counts
    }
}
