//! DC7 采样：从文本中选出剩余长度模 7 属于差分覆盖 {1, 2, 4} 的位置，
//! 并为每个位置取出其后 7 个符号（septet）作为排序键。

use std::fmt::Debug;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipe::{Record, Stage};

pub const MODULUS: usize = 7;

/// 差分覆盖 {1, 2, 4} mod 7。
#[inline]
pub const fn in_cover(residue: usize) -> bool {
    matches!(residue, 1 | 2 | 4)
}

/// 位置 `pos` 的剩余类：后缀长度模 7。
#[inline]
pub fn residue(n: usize, pos: usize) -> usize {
    (n - pos) % MODULUS
}

/// 后缀长度在 `[1, p]` 内的采样位置数量。
#[inline]
pub fn samples_up_to(p: usize) -> usize {
    let r = p % MODULUS;
    3 * (p / MODULUS) + usize::from(r >= 1) + usize::from(r >= 2) + usize::from(r >= 4)
}

/// 排序键：7 个符号码，字典序比较。码 0 表示文本末尾之后。
pub trait SeptetKey: Record + Ord + Copy + Debug {
    fn pack(symbols: &[u32; MODULUS], bits: u32) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Septet(pub [u32; MODULUS]);

impl SeptetKey for Septet {
    #[inline]
    fn pack(symbols: &[u32; MODULUS], _bits: u32) -> Self {
        Septet(*symbols)
    }
}

/// 位压缩的 septet：每个符号占 `bits` 位，高位在前，整数序即字典序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackedSeptet(pub u64);

impl PackedSeptet {
    pub fn fits(bits: u32) -> bool {
        bits as usize * MODULUS <= 64
    }
}

impl SeptetKey for PackedSeptet {
    #[inline]
    fn pack(symbols: &[u32; MODULUS], bits: u32) -> Self {
        debug_assert!(Self::fits(bits));
        PackedSeptet(symbols.iter().fold(0u64, |acc, &s| (acc << bits) | u64::from(s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleTuple<K> {
    pub key: K,
    pub pos: u32,
}

/// 采样阶段：对文本做一次正向扫描，按位置递增（后缀长度递减）输出采样元组。
pub struct Sampler<S, K> {
    text: S,
    n: usize,
    bits: u32,
    window: [u32; MODULUS],
    pos: usize,
    emitted: usize,
    _key: PhantomData<K>,
}

impl<S: Stage<Item = u32>, K: SeptetKey> Sampler<S, K> {
    pub fn new(text: S, bits: u32) -> Self {
        let n = text.len();
        Self {
            text,
            n,
            bits,
            window: [0; MODULUS],
            pos: 0,
            emitted: 0,
            _key: PhantomData,
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.window.copy_within(1.., 0);
        self.window[MODULUS - 1] = self.text.next_item()?.unwrap_or(0);
        self.pos += 1;
        Ok(())
    }
}

impl<S: Stage<Item = u32>, K: SeptetKey> Stage for Sampler<S, K> {
    type Item = SampleTuple<K>;

    fn len(&self) -> usize {
        samples_up_to(self.n)
    }

    fn begin_read(&mut self) -> Result<()> {
        self.text.begin_read()?;
        self.pos = 0;
        self.emitted = 0;
        for slot in self.window.iter_mut() {
            *slot = self.text.next_item()?.unwrap_or(0);
        }
        Ok(())
    }

    fn next_item(&mut self) -> Result<Option<Self::Item>> {
        while self.pos < self.n {
            let pos = self.pos;
            let sampled = in_cover(residue(self.n, pos));
            let key = if sampled { Some(K::pack(&self.window, self.bits)) } else { None };
            self.advance()?;
            if let Some(key) = key {
                self.emitted += 1;
                return Ok(Some(SampleTuple { key, pos: pos as u32 }));
            }
        }
        Ok(None)
    }

    fn eof(&self) -> bool {
        self.emitted >= self.len()
    }

    fn end_read(&mut self) {
        self.text.end_read();
    }
}

/// 命名阶段：读取按 septet 排好序的采样流，相同 septet 得到相同名字（从 1 开始）。
///
/// 读完后 [`Namer::distinct`] 给出不同名字的个数；等于采样数时名字就是最终排名。
pub struct Namer<S, K> {
    sorted: S,
    last: Option<K>,
    name: u32,
}

impl<S, K> Namer<S, K>
where
    S: Stage<Item = SampleTuple<K>>,
    K: SeptetKey,
{
    pub fn new(sorted: S) -> Self {
        Self { sorted, last: None, name: 0 }
    }

    pub fn distinct(&self) -> usize {
        self.name as usize
    }
}

impl<S, K> Stage for Namer<S, K>
where
    S: Stage<Item = SampleTuple<K>>,
    K: SeptetKey,
{
    /// (位置, 名字)
    type Item = (u32, u32);

    fn len(&self) -> usize {
        self.sorted.len()
    }

    fn begin_read(&mut self) -> Result<()> {
        self.last = None;
        self.name = 0;
        self.sorted.begin_read()
    }

    fn next_item(&mut self) -> Result<Option<(u32, u32)>> {
        let Some(tuple) = self.sorted.next_item()? else {
            return Ok(None);
        };
        if self.last != Some(tuple.key) {
            self.name += 1;
            self.last = Some(tuple.key);
        }
        Ok(Some((tuple.pos, self.name)))
    }

    fn eof(&self) -> bool {
        self.sorted.eof()
    }

    fn end_read(&mut self) {
        self.sorted.end_read();
    }
}

/// 采样位置在三种排列之间的换算。
///
/// - 线性序：采样位置按文本顺序编号。
/// - 切片序：先类 4、再类 2、最后类 1，每类内部按文本顺序；这是递归时缩减文本的顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLayout {
    n: usize,
    /// 类 4、2、1 的采样数量
    counts: [usize; 3],
}

const SLICE_CLASSES: [usize; 3] = [4, 2, 1];

impl SampleLayout {
    pub fn new(n: usize) -> Self {
        let counts = SLICE_CLASSES.map(|r| (n + MODULUS - r) / MODULUS);
        Self { n, counts }
    }

    pub fn len(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn linear_index(&self, pos: usize) -> usize {
        samples_up_to(self.n) - samples_up_to(self.n - pos)
    }

    pub fn sliced_index(&self, pos: usize) -> usize {
        let p = self.n - pos;
        let r = p % MODULUS;
        let block = match r {
            4 => 0,
            2 => 1,
            1 => 2,
            _ => panic!("position {} (residue {}) is not a sample", pos, r),
        };
        let offset: usize = self.counts[..block].iter().sum();
        offset + self.counts[block] - 1 - p / MODULUS
    }

    pub fn position_of_sliced(&self, index: usize) -> usize {
        let mut index = index;
        for (block, &r) in SLICE_CLASSES.iter().enumerate() {
            let count = self.counts[block];
            if index < count {
                let p = r + MODULUS * (count - 1 - index);
                return self.n - p;
            }
            index -= count;
        }
        panic!("sliced index out of range for text of length {}", self.n)
    }
}
