//! 参考序列加载：多条 FASTA 记录编码后以符号 0 分隔，拼成一条索引文本。

use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::util::dna;

/// 一条参考序列在拼接文本中的位置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contig {
    pub name: String,
    pub len: u32,
    pub offset: u32,
}

impl Contig {
    fn end(&self) -> u32 {
        self.offset + self.len
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reference {
    /// 编码到 [0, dna::SIGMA) 的拼接文本
    pub text: Vec<u8>,
    pub contigs: Vec<Contig>,
}

impl Reference {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        Self::from_fasta(std::io::BufReader::new(f))
    }

    /// 逐行解析 FASTA。头行取第一个空白前的部分作为名字，序列行中的空白被忽略。
    pub fn from_fasta<R: BufRead>(reader: R) -> Result<Self> {
        let mut reference = Reference::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            if let Some(header) = line.strip_prefix('>') {
                let name = header.split_whitespace().next().unwrap_or("");
                if name.is_empty() {
                    return Err(IndexError::InvalidReference { line: line_no, reason: "header without a name" });
                }
                reference.start_contig(name);
                continue;
            }
            let residues = line.bytes().filter(|b| !b.is_ascii_whitespace());
            match reference.contigs.last_mut() {
                Some(contig) => {
                    let before = reference.text.len();
                    reference.text.extend(residues.map(dna::to_alphabet));
                    contig.len += (reference.text.len() - before) as u32;
                }
                None if residues.clone().next().is_none() => {}
                None => {
                    return Err(IndexError::InvalidReference { line: line_no, reason: "sequence data before the first header" })
                }
            }
            if reference.text.len() >= u32::MAX as usize {
                return Err(IndexError::TextTooLong { len: reference.text.len() });
            }
        }
        if reference.contigs.is_empty() {
            return Err(IndexError::InvalidReference { line: 0, reason: "no sequences" });
        }
        if reference.contigs.iter().all(|c| c.len == 0) {
            return Err(IndexError::InvalidReference { line: 0, reason: "all sequences are empty" });
        }
        Ok(reference)
    }

    fn start_contig(&mut self, name: &str) {
        if !self.contigs.is_empty() {
            self.text.push(0);
        }
        self.contigs.push(Contig { name: name.to_string(), len: 0, offset: self.text.len() as u32 });
    }

    pub fn total_len(&self) -> usize {
        self.contigs.iter().map(|c| c.len as usize).sum()
    }

    /// 把拼接文本上的位置换算为 (contig, contig 内偏移)；落在分隔符上时为 None。
    pub fn locate(&self, pos: usize) -> Option<(&Contig, usize)> {
        let pos = u32::try_from(pos).ok()?;
        let idx = self.contigs.partition_point(|c| c.end() <= pos);
        let contig = self.contigs.get(idx)?;
        (contig.offset <= pos).then(|| (contig, (pos - contig.offset) as usize))
    }
}
