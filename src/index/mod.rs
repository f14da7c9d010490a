//! 全文索引：后缀数组（DC7 skew）、LCP、子表、增强后缀数组、q-gram 索引与查找器。

pub mod childtab;
pub mod esa;
pub mod extender;
pub mod find;
pub mod lcp;
pub mod merger;
pub mod qgram;
pub mod sa;
pub mod sampler;
pub mod shape;
pub mod skew7;

pub use childtab::ChildTable;
pub use esa::{EnhancedSuffixArray, EsaTables, IndexMeta, Interval};
pub use find::{FindIndex, Finder};
pub use lcp::{create_lcp_table, create_lcp_table_in_place, create_lcp_table_with};
pub use qgram::{create_qgram_index, BucketMap, QGramIndex};
pub use sa::{create_suffix_array, create_suffix_array_with, SuffixArrayIndex};
pub use shape::Shape;
