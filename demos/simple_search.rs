//! 演示如何在 library 模式下构建增强后缀数组并查找模式串。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_search
//! ```

use std::io::Cursor;

use esa_rust::config::IndexConfig;
use esa_rust::index::{create_qgram_index, EnhancedSuffixArray, Finder, Shape};
use esa_rust::reference::Reference;
use esa_rust::util::dna;

fn main() -> anyhow::Result<()> {
    // 1. 两条参考序列，拼接时以 0 分隔
    let fasta = b">ref1\nACGTACGTAGCTGATCGTAGCTAGCTAG\n>ref2\nCTGATCGTAGCTAGCTGAT\n";
    let reference = Reference::from_fasta(Cursor::new(&fasta[..]))?;
    println!("参考序列: {} 条, 总长 {} bp", reference.contigs.len(), reference.total_len());

    // 2. 构建 SA + LCP + 子表
    let esa = EnhancedSuffixArray::build(&reference.text, &IndexConfig::default())?;
    let root = esa.root();
    println!("根结点有 {} 个孩子", esa.children(root).len());

    // 3. 精确匹配
    let pattern = dna::encode(b"GCTGATCGTAG");
    let mut finder = Finder::new(&esa);
    while finder.find(&pattern) {
        if let Some((contig, offset)) = reference.locate(finder.position()) {
            println!("  {} 命中 {}:{}", dna::decode(&pattern), contig.name, offset);
        }
    }
    if finder.empty() {
        println!("  {} 无命中", dna::decode(&pattern));
    }

    // 4. q-gram 索引上的同一查询
    let qgram = create_qgram_index(&reference.text, Shape::ungapped(pattern.len(), dna::SIGMA as u32))?;
    println!("q-gram 索引: {} 处出现", qgram.occurrences(&pattern).len());
    Ok(())
}
