use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::pool::{Record, RunFile, RunReader, RunWriter};
use super::{Sink, Stage};
use crate::config::PipeConfig;
use crate::error::Result;

/// 归并堆中的一项：记录 + 来源 run 编号（相等记录按 run 顺序输出，保证稳定）。
struct Head<T> {
    item: T,
    run: usize,
}

impl<T: Ord> PartialEq for Head<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Head<T> {}

impl<T: Ord> PartialOrd for Head<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Head<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.item.cmp(&other.item).then(self.run.cmp(&other.run))
    }
}

/// 一次归并同时打开的 run 数上限。
const MERGE_FAN_IN: usize = 16;

/// 多路归并游标：每个 run 一个读取器，堆里放各 run 的当前首条记录。
struct MergeCursor<T> {
    readers: Vec<RunReader<T>>,
    heap: BinaryHeap<Reverse<Head<T>>>,
}

impl<T: Record + Ord> MergeCursor<T> {
    fn open<'a>(runs: impl Iterator<Item = &'a RunFile<T>>) -> Result<Self>
    where
        T: 'a,
    {
        let mut readers = Vec::new();
        let mut heap = BinaryHeap::new();
        for (run, file) in runs.enumerate() {
            let mut reader = file.open()?;
            if let Some(item) = reader.next()? {
                heap.push(Reverse(Head { item, run }));
            }
            readers.push(reader);
        }
        Ok(Self { readers, heap })
    }

    fn next(&mut self) -> Result<Option<T>> {
        match self.heap.pop() {
            Some(Reverse(Head { item, run })) => {
                if let Some(next) = self.readers[run].next()? {
                    self.heap.push(Reverse(Head { item: next, run }));
                }
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }
}

/// 把若干相邻 run 归并成一个新 run。
fn merge_runs<T: Record + Ord>(runs: &[RunFile<T>], config: &PipeConfig) -> Result<RunFile<T>> {
    let mut cursor = MergeCursor::open(runs.iter())?;
    let mut writer = RunWriter::create(config)?;
    while let Some(item) = cursor.next()? {
        writer.push(&item)?;
    }
    writer.finish()
}

enum SortedRead<T> {
    Idle,
    Memory { cursor: usize },
    Merge(MergeCursor<T>),
}

/// 外部排序阶段：按 `T: Ord` 升序输出写入的全部记录，排序是稳定的。
///
/// 每 `memory_records` 条记录构成一个 run，在内存中排序；多于一个 run 时各 run 写入临时文件，
/// 读取时用优先队列做多路归并。同层 run 攒满 `MERGE_FAN_IN` 个即合并为高一层的 run，
/// 打开的文件数保持在对数级。
pub struct Sorter<T> {
    config: PipeConfig,
    run: Vec<T>,
    runs: Vec<RunFile<T>>,
    /// 与 `runs` 一一对应的合并层数，沿 run 顺序不增
    levels: Vec<u32>,
    len: usize,
    emitted: usize,
    read: SortedRead<T>,
}

impl<T: Record + Ord> Sorter<T> {
    pub fn new(config: &PipeConfig) -> Self {
        Self {
            config: config.clone(),
            run: Vec::new(),
            runs: Vec::new(),
            levels: Vec::new(),
            len: 0,
            emitted: 0,
            read: SortedRead::Idle,
        }
    }

    /// 已溢写到磁盘的 run 数量；全部在内存中时为 0。
    pub fn spilled_runs(&self) -> usize {
        self.runs.len()
    }

    fn flush_run(&mut self) -> Result<()> {
        self.run.sort();
        let mut writer = RunWriter::create(&self.config)?;
        for item in &self.run {
            writer.push(item)?;
        }
        let file = writer.finish()?;
        log::debug!("sorter spilled run #{} with {} records", self.runs.len(), file.len());
        self.runs.push(file);
        self.levels.push(0);
        self.run.clear();
        self.compact()
    }

    /// 末尾 `MERGE_FAN_IN` 个 run 同层时合并为一个。只合并相邻 run，稳定性不变。
    fn compact(&mut self) -> Result<()> {
        while self.runs.len() >= MERGE_FAN_IN {
            let tail = self.runs.len() - MERGE_FAN_IN;
            let level = self.levels[tail];
            if self.levels[tail..].iter().any(|&l| l != level) {
                break;
            }
            self.merge_tail(tail, level + 1)?;
        }
        Ok(())
    }

    fn merge_tail(&mut self, tail: usize, level: u32) -> Result<()> {
        let merged = merge_runs(&self.runs[tail..], &self.config)?;
        log::debug!("sorter merged {} runs into one of {} records", self.runs.len() - tail, merged.len());
        self.runs.truncate(tail);
        self.levels.truncate(tail);
        self.runs.push(merged);
        self.levels.push(level);
        Ok(())
    }
}

impl<T: Record + Ord> Sink<T> for Sorter<T> {
    fn begin_write(&mut self) -> Result<()> {
        self.run.clear();
        self.runs.clear();
        self.levels.clear();
        self.len = 0;
        self.read = SortedRead::Idle;
        Ok(())
    }

    fn push(&mut self, item: T) -> Result<()> {
        self.run.push(item);
        self.len += 1;
        if self.run.len() >= self.config.memory_records {
            self.flush_run()?;
        }
        Ok(())
    }

    fn end_write(&mut self) -> Result<()> {
        match self.runs.len() {
            0 => self.run.sort(),
            // 只有一个未合并过的满 run：读回内存，避免单路归并
            1 if self.run.is_empty() && self.levels[0] == 0 => {
                self.levels.clear();
                if let Some(file) = self.runs.pop() {
                    let mut reader = file.open()?;
                    while let Some(item) = reader.next()? {
                        self.run.push(item);
                    }
                }
            }
            _ => {
                if !self.run.is_empty() {
                    self.flush_run()?;
                }
                while self.runs.len() > MERGE_FAN_IN {
                    let tail = self.runs.len() - MERGE_FAN_IN;
                    let level = self.levels[tail] + 1;
                    self.merge_tail(tail, level)?;
                }
            }
        }
        Ok(())
    }
}

impl<T: Record + Ord> Stage for Sorter<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.len
    }

    fn begin_read(&mut self) -> Result<()> {
        self.emitted = 0;
        if self.runs.is_empty() {
            self.read = SortedRead::Memory { cursor: 0 };
            return Ok(());
        }
        self.read = SortedRead::Merge(MergeCursor::open(self.runs.iter())?);
        Ok(())
    }

    fn next_item(&mut self) -> Result<Option<T>> {
        let item = match &mut self.read {
            SortedRead::Idle => None,
            SortedRead::Memory { cursor } => {
                let item = self.run.get(*cursor).cloned();
                *cursor += 1;
                item
            }
            SortedRead::Merge(cursor) => cursor.next()?,
        };
        if item.is_some() {
            self.emitted += 1;
        }
        Ok(item)
    }

    fn eof(&self) -> bool {
        self.emitted >= self.len
    }

    fn end_read(&mut self) {
        self.read = SortedRead::Idle;
    }
}
