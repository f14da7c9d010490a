//! 构建参数。所有阶段共享同一份配置，由 CLI 参数或调用方直接构造。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 流水线中每个存储阶段（Pool / Sorter / Mapper）的内存上限。
///
/// 超过 `memory_records` 条记录后，阶段将数据溢写到 `temp_dir`（缺省为系统临时目录）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeConfig {
    pub memory_records: usize,
    pub temp_dir: Option<PathBuf>,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            memory_records: 4 << 20,
            temp_dir: None,
        }
    }
}

impl PipeConfig {
    /// 仅用于测试和小规模数据：强制极小的内存上限以触发溢写路径。
    pub fn with_memory_records(memory_records: usize) -> Self {
        assert!(memory_records > 0, "memory_records must be positive");
        Self {
            memory_records,
            temp_dir: None,
        }
    }
}

/// LCP 构建算法选择。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LcpAlgorithm {
    /// 额外分配逆后缀数组（Kasai 经典版本）。
    #[default]
    Auxiliary,
    /// 复用 LCP 数组自身存储，以最高位作标记。
    InPlace,
}

/// q-gram 目录布局。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirLayout {
    /// 按内存占用自动选择。
    #[default]
    Auto,
    /// sigma^weight + 1 的稠密目录，哈希值直接作下标。
    Dense,
    /// 开放寻址 + BucketMap。
    OpenAddressing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QGramConfig {
    /// 开放寻址表相对 q-gram 数量的放大系数，必须大于 1。
    pub alpha: f64,
    pub layout: DirLayout,
}

impl Default for QGramConfig {
    fn default() -> Self {
        Self {
            alpha: 1.6,
            layout: DirLayout::Auto,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub pipe: PipeConfig,
    pub lcp: LcpAlgorithm,
    pub qgram: QGramConfig,
}
