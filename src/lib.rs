//! # esa-rust
//!
//! 全文索引构建库：后缀数组、LCP、子表（增强后缀数组）与 q-gram 索引。
//!
//! - **后缀数组**：DC7 差分覆盖 skew 算法，以拉取式流水线实现，中间结果超过内存上限时溢写到磁盘
//! - **LCP**：Kasai 线性时间算法，提供额外逆数组与原地两种版本
//! - **子表**：一次栈扫描得到 up / down / nextl 链接，支持后缀树式的自顶向下遍历
//! - **q-gram 索引**：稠密目录或开放寻址目录，两遍计数排序填充
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use esa_rust::config::IndexConfig;
//! use esa_rust::index::{EnhancedSuffixArray, Finder};
//!
//! let text = b"banana";
//! let esa = EnhancedSuffixArray::build(text, &IndexConfig::default()).unwrap();
//!
//! let mut finder = Finder::new(&esa);
//! while finder.find(b"ana") {
//!     println!("hit at {}", finder.position());
//! }
//! ```
//!
//! ## 模块说明
//!
//! - [`pipe`]：流水线协议与可溢写的存储阶段（Pool / Sorter / Mapper）
//! - [`index`]：后缀数组、LCP、子表、增强后缀数组、q-gram 索引、查找器
//! - [`reference`]：FASTA 参考序列加载与位置换算
//! - [`util`]：符号抽象与 DNA 编码

pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod pipe;
pub mod reference;
pub mod util;

pub use error::{IndexError, Result};
