//! DC7 比较表与多路归并。
//!
//! 类 `a` 与类 `b` 的两个后缀之间，先比较 `SHIFT[a][b]` 个原始符号；若相同，
//! 两者各自在偏移 `SHIFT[a][b]` 处落到采样位置上，再比较该处的排名。

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use super::sampler::{in_cover, MODULUS};
use crate::error::Result;
use crate::pipe::{Mapper, Sorter, Stage};

/// 每个元组携带的原始符号数，覆盖 `SHIFT` 的最大值。
pub const WINDOW: usize = 6;

const fn shift_table() -> [[u8; MODULUS]; MODULUS] {
    let mut table = [[0u8; MODULUS]; MODULUS];
    let mut a = 0;
    while a < MODULUS {
        let mut b = 0;
        while b < MODULUS {
            let mut s = 0;
            while !(in_cover((a + MODULUS - s) % MODULUS) && in_cover((b + MODULUS - s) % MODULUS)) {
                s += 1;
            }
            table[a][b] = s as u8;
            b += 1;
        }
        a += 1;
    }
    table
}

const fn cover_offsets() -> [[u8; 3]; MODULUS] {
    let mut table = [[0u8; 3]; MODULUS];
    let mut c = 0;
    while c < MODULUS {
        let mut k = 0;
        let mut d = 0;
        while k < 3 {
            if in_cover((c + MODULUS - d) % MODULUS) {
                table[c][k] = d as u8;
                k += 1;
            }
            d += 1;
        }
        c += 1;
    }
    table
}

const fn rank_slots() -> [[u8; MODULUS]; MODULUS] {
    let offsets = cover_offsets();
    let mut table = [[0u8; MODULUS]; MODULUS];
    let mut c = 0;
    while c < MODULUS {
        let mut s = 0;
        while s < MODULUS {
            let mut slot = 0;
            while slot < 3 && (offsets[c][slot] as usize) < s {
                slot += 1;
            }
            table[c][s] = if slot < 3 { slot as u8 } else { 2 };
            s += 1;
        }
        c += 1;
    }
    table
}

/// `SHIFT[a][b]`：最小的 s，使两个类分别前进 s 后都落在差分覆盖上。
pub const SHIFT: [[u8; MODULUS]; MODULUS] = shift_table();

/// `COVER_OFFSETS[c]`：类 c 的位置之后最近的三个采样位置偏移。
pub const COVER_OFFSETS: [[u8; 3]; MODULUS] = cover_offsets();

/// `RANK_SLOT[c][s]`：偏移 s 在 `COVER_OFFSETS[c]` 中的下标。
pub const RANK_SLOT: [[u8; MODULUS]; MODULUS] = rank_slots();

/// 扩展元组：位置、其后三个采样位置的排名、以及前 `WINDOW` 个符号码。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassTuple {
    pub class: u8,
    pub pos: u32,
    pub ranks: [u32; 3],
    pub window: [u32; WINDOW],
}

impl ClassTuple {
    #[inline]
    fn rank_at(&self, shift: usize) -> u32 {
        self.ranks[RANK_SLOT[self.class as usize][shift] as usize]
    }
}

impl PartialEq for ClassTuple {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl Eq for ClassTuple {}

impl PartialOrd for ClassTuple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassTuple {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.pos == other.pos {
            return Ordering::Equal;
        }
        let shift = SHIFT[self.class as usize][other.class as usize] as usize;
        self.window[..shift]
            .cmp(&other.window[..shift])
            .then_with(|| self.rank_at(shift).cmp(&other.rank_at(shift)))
            .then_with(|| panic!("distinct suffixes at {} and {} compare equal", self.pos, other.pos))
    }
}

/// 非采样类在 `ClassStreams::sorted` 中的下标。
#[inline]
pub fn sorted_slot(class: usize) -> Option<usize> {
    match class {
        0 => Some(0),
        3 => Some(1),
        5 => Some(2),
        6 => Some(3),
        _ => None,
    }
}

/// Extender 的五路输出：类 0、3、5、6 各自排序，类 {1,2,4} 按排名直接放置。
pub struct ClassStreams {
    pub sorted: [Sorter<ClassTuple>; 4],
    pub samples: Mapper<ClassTuple>,
}

impl ClassStreams {
    fn stream_mut(&mut self, class: usize) -> &mut dyn Stage<Item = ClassTuple> {
        match sorted_slot(class) {
            Some(slot) => &mut self.sorted[slot],
            None => &mut self.samples,
        }
    }

    fn each_mut(&mut self) -> impl Iterator<Item = &mut dyn Stage<Item = ClassTuple>> {
        let samples: &mut dyn Stage<Item = ClassTuple> = &mut self.samples;
        self.sorted
            .iter_mut()
            .map(|s| s as &mut dyn Stage<Item = ClassTuple>)
            .chain(std::iter::once(samples))
    }

    fn len(&self) -> usize {
        self.sorted.iter().map(Stage::len).sum::<usize>() + self.samples.len()
    }
}

/// 基于优先队列的五路归并，按排名递增输出位置，输出即后缀数组。
///
/// 队列中每一路至多一个元组；弹出后从同一路补充下一个（采样流的来源由弹出位置的类决定）。
pub struct Merger {
    streams: ClassStreams,
    heap: BinaryHeap<Reverse<ClassTuple>>,
    emitted: usize,
}

impl Merger {
    pub fn new(streams: ClassStreams) -> Self {
        Self { streams, heap: BinaryHeap::with_capacity(5), emitted: 0 }
    }

    fn open(&mut self) -> Result<()> {
        self.heap.clear();
        self.emitted = 0;
        for stream in self.streams.each_mut() {
            stream.begin_read()?;
            if let Some(first) = stream.next_item()? {
                self.heap.push(Reverse(first));
            }
        }
        Ok(())
    }
}

impl Stage for Merger {
    type Item = u32;

    fn len(&self) -> usize {
        self.streams.len()
    }

    fn begin_read(&mut self) -> Result<()> {
        let opened = self.open();
        if opened.is_err() {
            self.end_read();
        }
        opened
    }

    fn next_item(&mut self) -> Result<Option<u32>> {
        let Some(Reverse(lowest)) = self.heap.pop() else {
            return Ok(None);
        };
        if let Some(next) = self.streams.stream_mut(lowest.class as usize).next_item()? {
            self.heap.push(Reverse(next));
        }
        self.emitted += 1;
        Ok(Some(lowest.pos))
    }

    fn eof(&self) -> bool {
        self.heap.is_empty()
    }

    fn end_read(&mut self) {
        for stream in self.streams.each_mut() {
            stream.end_read();
        }
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_lands_both_classes_on_the_cover() {
        for a in 0..MODULUS {
            for b in 0..MODULUS {
                let s = SHIFT[a][b] as usize;
                assert!(s < MODULUS);
                assert!(in_cover((a + MODULUS - s) % MODULUS), "a={} b={}", a, b);
                assert!(in_cover((b + MODULUS - s) % MODULUS), "a={} b={}", a, b);
                assert!(s <= WINDOW);
            }
        }
    }

    #[test]
    fn shift_table_known_rows() {
        let expected: [[u8; 7]; 7] = [
            [3, 6, 5, 6, 3, 3, 5],
            [6, 0, 0, 6, 0, 4, 4],
            [5, 0, 0, 1, 0, 1, 5],
            [6, 6, 1, 1, 2, 1, 2],
            [3, 0, 0, 2, 0, 3, 2],
            [3, 4, 1, 1, 3, 1, 4],
            [5, 4, 5, 2, 2, 4, 2],
        ];
        assert_eq!(SHIFT, expected);
    }

    #[test]
    fn cover_offsets_and_rank_slots_agree() {
        assert_eq!(COVER_OFFSETS[0], [3, 5, 6]);
        assert_eq!(COVER_OFFSETS[4], [0, 2, 3]);
        assert_eq!(COVER_OFFSETS[1], [0, 4, 6]);
        for c in 0..MODULUS {
            for (k, &d) in COVER_OFFSETS[c].iter().enumerate() {
                assert!(in_cover((c + MODULUS - d as usize) % MODULUS));
                assert_eq!(RANK_SLOT[c][d as usize] as usize, k);
            }
        }
        // 比较时用到的每个偏移都是对应类的采样偏移
        for a in 0..MODULUS {
            for b in 0..MODULUS {
                let s = SHIFT[a][b];
                assert!(COVER_OFFSETS[a].contains(&s));
                assert!(COVER_OFFSETS[b].contains(&s));
            }
        }
    }

    fn tuple(class: u8, pos: u32, ranks: [u32; 3], window: [u32; WINDOW]) -> ClassTuple {
        ClassTuple { class, pos, ranks, window }
    }

    #[test]
    fn comparator_prefers_symbols_then_ranks() {
        // 类 0 与类 3：SHIFT = 6
        let a = tuple(0, 0, [5, 6, 7], [1, 2, 3, 4, 5, 6]);
        let b = tuple(3, 10, [1, 2, 3], [1, 2, 3, 4, 5, 7]);
        assert_eq!(a.cmp(&b), Ordering::Less);
        // 窗口相同时比较偏移 6 处的排名
        let c = tuple(3, 10, [1, 2, 3], [1, 2, 3, 4, 5, 6]);
        let slot = RANK_SLOT[3][6] as usize;
        let mut ranks = [9, 9, 9];
        ranks[slot] = 100;
        let c = ClassTuple { ranks, ..c };
        assert_eq!(a.cmp(&c), Ordering::Less);
        assert_eq!(c.cmp(&a), Ordering::Greater);
        assert_eq!(a.cmp(&a), Ordering::Equal);
    }

    #[test]
    #[should_panic(expected = "compare equal")]
    fn comparator_tie_is_an_invariant_violation() {
        let a = tuple(1, 3, [4, 0, 0], [1, 0, 0, 0, 0, 0]);
        let b = tuple(2, 8, [4, 0, 0], [1, 0, 0, 0, 0, 0]);
        let _ = a.cmp(&b);
    }
}
