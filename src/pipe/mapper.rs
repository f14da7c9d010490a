use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom};

use bitvec::prelude::*;

use super::pool::{temp_file, Record, RunFile, RunReader};
use super::{Sink, Stage};
use crate::config::PipeConfig;
use crate::error::{IndexError, Result};

type KeyFn<T> = Box<dyn Fn(&T) -> usize + Send + Sync>;

enum Slots<T> {
    Memory(Vec<Option<T>>),
    Disk {
        file: Option<BufWriter<File>>,
        /// 写入位置对应的槽位；键连续时不必 seek。
        next_slot: usize,
        filled: BitVec,
        record_size: Option<u64>,
        written: Option<RunFile<T>>,
    },
}

/// 按键函数放置记录的阶段：记录 `x` 写入位置 `key(x)`，读取时按位置顺序输出。
///
/// 长度必须预先给出，且每个位置恰好写入一次（键函数在 `[0, len)` 上构成置换）。
/// `len` 超过内存上限时改用预分配的临时文件，每个槽位是一条定长记录。
pub struct Mapper<T> {
    config: PipeConfig,
    len: usize,
    key: KeyFn<T>,
    slots: Slots<T>,
    cursor: usize,
    reader: Option<RunReader<T>>,
}

impl<T: Record> Mapper<T> {
    pub fn new<K>(len: usize, key: K, config: &PipeConfig) -> Self
    where
        K: Fn(&T) -> usize + Send + Sync + 'static,
    {
        Self {
            config: config.clone(),
            len,
            key: Box::new(key),
            slots: Slots::Memory(Vec::new()),
            cursor: 0,
            reader: None,
        }
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self.slots, Slots::Disk { .. })
    }

    fn invalid(&self, slot: usize, reason: &'static str) -> IndexError {
        IndexError::InvalidMapping { slot, len: self.len, reason }
    }
}

impl<T: Record> Sink<T> for Mapper<T> {
    fn begin_write(&mut self) -> Result<()> {
        self.reader = None;
        self.slots = if self.len > self.config.memory_records {
            log::debug!("mapper places {} records on disk", self.len);
            Slots::Disk {
                file: Some(BufWriter::with_capacity(1 << 16, temp_file(&self.config)?)),
                next_slot: 0,
                filled: bitvec![0; self.len],
                record_size: None,
                written: None,
            }
        } else {
            let mut slots = Vec::with_capacity(self.len);
            slots.resize_with(self.len, || None);
            Slots::Memory(slots)
        };
        Ok(())
    }

    fn push(&mut self, item: T) -> Result<()> {
        let slot = (self.key)(&item);
        if slot >= self.len {
            return Err(self.invalid(slot, "key out of range"));
        }
        let duplicate = match &mut self.slots {
            Slots::Memory(slots) => slots[slot].replace(item).is_some(),
            Slots::Disk { file, next_slot, filled, record_size, .. } => {
                let size = bincode::serialized_size(&item)?;
                let width = *record_size.get_or_insert(size);
                if width != size {
                    return Err(IndexError::InvalidMapping {
                        slot,
                        len: self.len,
                        reason: "records are not fixed-width",
                    });
                }
                let Some(file) = file.as_mut() else {
                    return Err(IndexError::InvalidMapping { slot, len: self.len, reason: "write after end_write" });
                };
                if slot != *next_slot {
                    file.seek(SeekFrom::Start(slot as u64 * width))?;
                }
                bincode::serialize_into(&mut *file, &item)?;
                *next_slot = slot + 1;
                filled.replace(slot, true)
            }
        };
        if duplicate {
            return Err(self.invalid(slot, "slot written twice"));
        }
        Ok(())
    }

    fn end_write(&mut self) -> Result<()> {
        let missing = match &mut self.slots {
            Slots::Memory(slots) => slots.iter().position(Option::is_none),
            Slots::Disk { file, filled, written, .. } => {
                let missing = filled.first_zero();
                if missing.is_none() {
                    if let Some(writer) = file.take() {
                        let file = writer.into_inner().map_err(std::io::IntoInnerError::into_error)?;
                        *written = Some(RunFile::new(file, self.len));
                    }
                }
                missing
            }
        };
        match missing {
            Some(slot) => Err(self.invalid(slot, "slot left empty")),
            None => Ok(()),
        }
    }
}

impl<T: Record> Stage for Mapper<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.len
    }

    fn begin_read(&mut self) -> Result<()> {
        self.cursor = 0;
        self.reader = match &self.slots {
            Slots::Disk { written: Some(run), .. } => Some(run.open()?),
            _ => None,
        };
        Ok(())
    }

    fn next_item(&mut self) -> Result<Option<T>> {
        let item = match (&mut self.reader, &self.slots) {
            (Some(reader), _) => reader.next()?,
            (None, Slots::Memory(slots)) => slots.get(self.cursor).cloned().flatten(),
            (None, Slots::Disk { .. }) => None,
        };
        if item.is_some() {
            self.cursor += 1;
        }
        Ok(item)
    }

    fn eof(&self) -> bool {
        self.cursor >= self.len
    }

    fn end_read(&mut self) {
        self.reader = None;
    }
}
