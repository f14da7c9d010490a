//! 子表：在 LCP 数组上编码后缀树的分支结构。
//!
//! 每个下标至多存一个链接，类型由与 LCP 值的关系区分：
//! - `nextl`：`child[i] > i` 且 `lcp[child[i]] == lcp[i]`，同一区间内的下一个 l-index；
//! - `down`：`child[i] > i` 且 `lcp[child[i]] > lcp[i]`，以 i 为左端的区间的第一个 l-index；
//! - `up`：存于 `child[r - 1]`，右端为 r 的区间的第一个 l-index（值小于 r）。
//!
//! 同一下标上 `nextl` 优先于 `down`；`down` 只在区间是其父区间最后一个孩子时才被查询，
//! 此时不会有 `nextl`。

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildTable {
    links: Vec<Option<u32>>,
}

/// 双栈扫描的显式状态。栈元素为 (下标, lcp)。
struct ScanState {
    up_down: Vec<(u32, u32)>,
    nextl: Vec<(u32, u32)>,
    /// 本轮最后一个从 up/down 栈弹出的元素
    last_up_down: Option<(u32, u32)>,
    /// 已写入 nextl 的槽位，up/down 不再覆盖
    nextl_slots: BitVec,
}

impl ScanState {
    fn new(n: usize) -> Self {
        Self {
            up_down: vec![(0, 0)],
            nextl: vec![(0, 0)],
            last_up_down: None,
            nextl_slots: bitvec![0; n],
        }
    }

    fn link_up_down(&self, links: &mut [Option<u32>], slot: u32, target: u32) {
        if !self.nextl_slots[slot as usize] {
            links[slot as usize] = Some(target);
        }
    }

    fn link_nextl(&mut self, links: &mut [Option<u32>], slot: u32, target: u32) {
        links[slot as usize] = Some(target);
        self.nextl_slots.set(slot as usize, true);
    }

    /// 处理位置 j（`j == n` 时 `lcp_j` 为虚拟的 0）。
    fn step(&mut self, links: &mut [Option<u32>], j: u32, lcp_j: u32, virtual_end: bool) {
        while self.nextl.last().map_or(false, |&(_, l)| lcp_j < l) {
            self.nextl.pop();
        }
        if let Some(&(top, l)) = self.nextl.last() {
            if lcp_j == l {
                if !virtual_end {
                    self.link_nextl(links, top, j);
                }
                self.nextl.pop();
            }
        }
        self.nextl.push((j, lcp_j));

        self.last_up_down = None;
        while self.up_down.last().map_or(false, |&(_, l)| lcp_j < l) {
            let last = self.up_down.pop();
            self.last_up_down = last;
            let (Some((last_idx, last_lcp)), Some(&(top_idx, top_lcp))) = (last, self.up_down.last()) else {
                unreachable!("up/down stack bottom has lcp 0 and is never popped");
            };
            if lcp_j <= top_lcp && top_lcp != last_lcp {
                self.link_up_down(links, top_idx, last_idx);
            }
        }
        if let Some((last_idx, _)) = self.last_up_down {
            self.link_up_down(links, j - 1, last_idx);
        }
        self.up_down.push((j, lcp_j));
    }
}

impl ChildTable {
    /// 对 LCP 数组做一次从左到右的线性扫描构建子表。
    pub fn build(lcp: &[u32]) -> Self {
        let n = lcp.len();
        let mut links = vec![None; n];
        if n == 0 {
            return Self { links };
        }
        let mut state = ScanState::new(n);
        for j in 1..=n {
            let virtual_end = j == n;
            let lcp_j = if virtual_end { 0 } else { lcp[j] };
            state.step(&mut links, j as u32, lcp_j, virtual_end);
        }
        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<usize> {
        self.links.get(i).copied().flatten().map(|v| v as usize)
    }

    pub fn as_slice(&self) -> &[Option<u32>] {
        &self.links
    }

    /// i 之后与 i 同层的下一个 l-index。
    #[inline]
    pub fn nextl(&self, lcp: &[u32], i: usize) -> Option<usize> {
        self.get(i).filter(|&v| v > i && lcp[v] == lcp[i])
    }

    /// 下标 i 存的是 up 链接（指向左侧）。
    #[inline]
    pub fn is_up(&self, i: usize) -> bool {
        self.get(i).map_or(false, |v| v <= i)
    }

    #[inline]
    pub fn is_nextl(&self, lcp: &[u32], i: usize) -> bool {
        self.nextl(lcp, i).is_some()
    }

    /// 右端为 `rb` 的区间的第一个 l-index（未经区间检查）。
    #[inline]
    pub fn up(&self, rb: usize) -> Option<usize> {
        rb.checked_sub(1).and_then(|i| self.get(i)).filter(|&v| v < rb)
    }

    /// 左端为 `lb` 的区间的第一个 l-index。
    #[inline]
    pub fn down(&self, lcp: &[u32], lb: usize) -> Option<usize> {
        self.get(lb).filter(|&v| v > lb && lcp[v] > lcp[lb])
    }

    /// 非叶区间 `[lb, rb)` 的第一个 l-index。整个 `[0, n)` 是根，从 `child[0]` 进入。
    pub fn first_boundary(&self, lcp: &[u32], lb: usize, rb: usize) -> usize {
        debug_assert!(rb - lb >= 2, "leaf interval has no boundaries");
        let found = if lb == 0 && rb == self.len() {
            self.get(0)
        } else {
            self.up(rb).filter(|&v| lb < v).or_else(|| self.down(lcp, lb))
        };
        match found {
            Some(v) if lb < v && v < rb => v,
            _ => panic!("child table has no boundary for interval [{}, {})", lb, rb),
        }
    }

    /// 区间 `[lb, rb)` 的全部孩子区间；叶子返回空。
    pub fn children(&self, lcp: &[u32], lb: usize, rb: usize) -> Vec<(usize, usize)> {
        if rb - lb < 2 {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut left = lb;
        let mut boundary = self.first_boundary(lcp, lb, rb);
        loop {
            out.push((left, boundary));
            left = boundary;
            match self.nextl(lcp, boundary) {
                Some(next) if next < rb => boundary = next,
                _ => break,
            }
        }
        out.push((left, rb));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::lcp::create_lcp_table;
    use crate::index::sa::create_suffix_array;

    /// 朴素参考：按区间内最小 LCP 值切分。
    fn naive_children(lcp: &[u32], lb: usize, rb: usize) -> Vec<(usize, usize)> {
        if rb - lb < 2 {
            return Vec::new();
        }
        let min = lcp[lb + 1..rb].iter().copied().min().unwrap_or(0);
        let mut out = Vec::new();
        let mut left = lb;
        for k in lb + 1..rb {
            if lcp[k] == min {
                out.push((left, k));
                left = k;
            }
        }
        out.push((left, rb));
        out
    }

    fn assert_same_tree(lcp: &[u32]) {
        let table = ChildTable::build(lcp);
        let mut stack = vec![(0usize, lcp.len())];
        while let Some((lb, rb)) = stack.pop() {
            let expected = naive_children(lcp, lb, rb);
            assert_eq!(table.children(lcp, lb, rb), expected, "mismatch on [{}, {}) of {:?}", lb, rb, lcp);
            stack.extend(expected);
        }
    }

    #[test]
    fn hand_built_lcp() {
        let lcp = [0, 2, 0, 1, 3, 0];
        let table = ChildTable::build(&lcp);
        assert_eq!(table.as_slice(), &[Some(2), Some(1), Some(5), Some(4), Some(3), None]);
        assert_eq!(table.children(&lcp, 0, 6), vec![(0, 2), (2, 5), (5, 6)]);
        assert_eq!(table.children(&lcp, 2, 5), vec![(2, 3), (3, 5)]);
        assert!(table.is_nextl(&lcp, 0) && table.is_nextl(&lcp, 2));
        assert!(table.is_up(1) && table.is_up(4));
        assert_eq!(table.down(&lcp, 3), Some(4));
        assert!(!table.is_up(3) && !table.is_nextl(&lcp, 3));
        assert_same_tree(&lcp);
    }

    #[test]
    fn banana_tree() {
        let text = b"banana";
        let sa = create_suffix_array(text).unwrap();
        let lcp = create_lcp_table(text, &sa);
        let table = ChildTable::build(&lcp);
        // 根：a 开头 / banana / na 开头
        assert_eq!(table.children(&lcp, 0, 6), vec![(0, 3), (3, 4), (4, 6)]);
        assert_eq!(table.children(&lcp, 0, 3), vec![(0, 1), (1, 3)]);
        assert_same_tree(&lcp);
    }

    #[test]
    fn root_without_zero_boundary() {
        // "aaaa" 的所有后缀共享前缀 a，根本身就是 1-区间
        let lcp = [0, 1, 2, 3];
        assert_same_tree(&lcp);
        assert_eq!(ChildTable::build(&lcp).children(&lcp, 0, 4), vec![(0, 1), (1, 4)]);
    }

    #[test]
    fn trees_of_random_texts() {
        let mut x: u32 = 99;
        for len in 1..=120 {
            for sigma in [2u32, 3, 5] {
                let text: Vec<u8> = (0..len)
                    .map(|_| {
                        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                        ((x >> 16) % sigma) as u8
                    })
                    .collect();
                let sa = create_suffix_array(&text).unwrap();
                assert_same_tree(&create_lcp_table(&text, &sa));
            }
        }
    }

    #[test]
    fn single_suffix_has_no_links() {
        let table = ChildTable::build(&[0]);
        assert_eq!(table.as_slice(), &[None]);
        assert!(table.children(&[0], 0, 1).is_empty());
    }
}
