//! LCP 数组（Kasai 算法）。
//!
//! 约定：`lcp[0] = 0`，`lcp[r]` 为后缀 `sa[r - 1]` 与 `sa[r]` 的最长公共前缀长度。

use crate::config::LcpAlgorithm;
use crate::util::symbol::Symbol;

const MARK: u32 = 1 << 31;
const MASK: u32 = !MARK;

#[inline]
fn extend_match<T: Symbol>(text: &[T], a: usize, b: usize, mut h: usize) -> usize {
    let n = text.len();
    while a + h < n && b + h < n && text[a + h] == text[b + h] {
        h += 1;
    }
    h
}

/// 按指定算法构建 LCP 数组。
pub fn create_lcp_table_with<T: Symbol>(text: &[T], sa: &[u32], algorithm: LcpAlgorithm) -> Vec<u32> {
    match algorithm {
        LcpAlgorithm::Auxiliary => create_lcp_table(text, sa),
        LcpAlgorithm::InPlace => {
            let mut lcp = vec![0u32; sa.len()];
            create_lcp_table_in_place(text, sa, &mut lcp);
            lcp
        }
    }
}

/// Kasai 算法：先求逆后缀数组，再按文本位置顺序计算，h 每步至多减一。
pub fn create_lcp_table<T: Symbol>(text: &[T], sa: &[u32]) -> Vec<u32> {
    let n = text.len();
    assert_eq!(sa.len(), n, "suffix array does not match the text");

    let mut isa = vec![0u32; n];
    for (rank, &pos) in sa.iter().enumerate() {
        isa[pos as usize] = rank as u32;
    }

    let mut lcp = vec![0u32; n];
    let mut h = 0usize;
    for i in 0..n {
        let rank = isa[i] as usize;
        if rank == 0 {
            h = 0;
            continue;
        }
        let j = sa[rank - 1] as usize;
        h = extend_match(text, i, j, h);
        lcp[rank] = h as u32;
        h = h.saturating_sub(1);
    }
    lcp
}

/// 不分配逆后缀数组的 Kasai 变体，结果写入 `lcp`。
///
/// 1. `lcp[sa[r]] = r`，即 `lcp` 暂存逆后缀数组；
/// 2. 按文本位置计算 LCP 值，覆盖原位并置最高位标记；
/// 3. 沿 SA 置换的环把值搬到 SA 下标处，同时清除标记。
///
/// 要求 `n < 2^31`。
pub fn create_lcp_table_in_place<T: Symbol>(text: &[T], sa: &[u32], lcp: &mut [u32]) {
    let n = text.len();
    assert_eq!(sa.len(), n, "suffix array does not match the text");
    assert_eq!(lcp.len(), n, "lcp buffer does not match the text");
    assert!(n < MARK as usize, "in-place LCP needs n < 2^31");

    for (rank, &pos) in sa.iter().enumerate() {
        lcp[pos as usize] = rank as u32;
    }

    let mut h = 0usize;
    for i in 0..n {
        let rank = lcp[i] as usize;
        if rank == 0 {
            h = 0;
            lcp[i] = MARK;
            continue;
        }
        let j = sa[rank - 1] as usize;
        h = extend_match(text, i, j, h);
        lcp[i] = h as u32 | MARK;
        h = h.saturating_sub(1);
    }

    for i in 0..n {
        if lcp[i] & MARK == 0 {
            continue;
        }
        let head = lcp[i];
        let mut j = i;
        while sa[j] as usize != i {
            let next = sa[j] as usize;
            lcp[j] = lcp[next] & MASK;
            j = next;
        }
        lcp[j] = head & MASK;
    }
}
