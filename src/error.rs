use thiserror::Error;

/// 索引构建与持久化过程中可能出现的错误。
///
/// 前置条件（空模式串、空文本等）属于调用方的编程错误，以断言处理，不在此列。
#[derive(Debug, Error)]
pub enum IndexError {
    /// 外存溢写文件读写失败。
    #[error("spill storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// 定长记录编码 / 解码失败。
    #[error("record serialization failed: {0}")]
    Serialization(#[from] bincode::Error),

    /// Mapper 的目标槽位越界、重复写入或未被填满。
    #[error("mapper slot {slot} of {len}: {reason}")]
    InvalidMapping {
        slot: usize,
        len: usize,
        reason: &'static str,
    },

    /// 稠密目录需要 sigma^weight + 1 个槽位，超出可寻址范围。
    #[error("dense q-gram directory for sigma={sigma}, weight={weight} does not fit in memory")]
    DirectoryTooLarge { sigma: u32, weight: usize },

    /// 文本长度超出 32 位位置编码的范围。
    #[error("text of length {len} exceeds the 32-bit position limit")]
    TextTooLong { len: usize },

    /// 参考序列 FASTA 格式错误。
    #[error("invalid reference FASTA at line {line}: {reason}")]
    InvalidReference { line: usize, reason: &'static str },

    /// 加载的表与给定文本不匹配。
    #[error("index tables were built for a text of length {expected}, got {actual}")]
    TextMismatch { expected: usize, actual: usize },
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
