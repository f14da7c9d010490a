use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Sink, Stage};
use crate::config::PipeConfig;
use crate::error::Result;

/// 可在流水线中传递并溢写到磁盘的定长记录。
pub trait Record: Clone + Serialize + DeserializeOwned {}

impl<T: Clone + Serialize + DeserializeOwned> Record for T {}

pub(crate) fn temp_file(config: &PipeConfig) -> Result<File> {
    let file = match &config.temp_dir {
        Some(dir) => tempfile::tempfile_in(dir)?,
        None => tempfile::tempfile()?,
    };
    Ok(file)
}

/// 顺序写入的溢写文件。
pub(crate) struct RunWriter<T> {
    writer: BufWriter<File>,
    len: usize,
    _marker: PhantomData<fn(T)>,
}

impl<T: Record> RunWriter<T> {
    pub(crate) fn create(config: &PipeConfig) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::with_capacity(1 << 16, temp_file(config)?),
            len: 0,
            _marker: PhantomData,
        })
    }

    pub(crate) fn push(&mut self, item: &T) -> Result<()> {
        bincode::serialize_into(&mut self.writer, item)?;
        self.len += 1;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<RunFile<T>> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        Ok(RunFile::new(file, self.len))
    }
}

/// 写完的溢写文件，可反复从头读取。
pub(crate) struct RunFile<T> {
    file: File,
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> RunFile<T> {
    pub(crate) fn new(file: File, len: usize) -> Self {
        Self { file, len, _marker: PhantomData }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn open(&self) -> Result<RunReader<T>> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(RunReader {
            reader: BufReader::with_capacity(1 << 16, file),
            remaining: self.len,
            _marker: PhantomData,
        })
    }
}

pub(crate) struct RunReader<T> {
    reader: BufReader<File>,
    remaining: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> RunReader<T> {
    pub(crate) fn next(&mut self) -> Result<Option<T>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let item = bincode::deserialize_from(&mut self.reader)?;
        self.remaining -= 1;
        Ok(Some(item))
    }
}

/// 先进先出的记录池：写入后可按写入顺序反复读取。
///
/// 记录数超过 `memory_records` 时整体溢写到匿名临时文件，之后的写入直接追加到文件。
pub struct Pool<T> {
    config: PipeConfig,
    memory: Vec<T>,
    writer: Option<RunWriter<T>>,
    spilled: Option<RunFile<T>>,
    len: usize,
    cursor: usize,
    reader: Option<RunReader<T>>,
}

impl<T: Record> Pool<T> {
    pub fn new(config: &PipeConfig) -> Self {
        Self {
            config: config.clone(),
            memory: Vec::new(),
            writer: None,
            spilled: None,
            len: 0,
            cursor: 0,
            reader: None,
        }
    }

    pub fn is_spilled(&self) -> bool {
        self.spilled.is_some() || self.writer.is_some()
    }

    fn spill(&mut self) -> Result<()> {
        let mut writer = RunWriter::create(&self.config)?;
        for item in &self.memory {
            writer.push(item)?;
        }
        log::debug!("pool spilled {} records to disk", self.memory.len());
        self.memory = Vec::new();
        self.writer = Some(writer);
        Ok(())
    }
}

impl<T: Record> Sink<T> for Pool<T> {
    fn begin_write(&mut self) -> Result<()> {
        self.memory.clear();
        self.writer = None;
        self.spilled = None;
        self.reader = None;
        self.len = 0;
        Ok(())
    }

    fn push(&mut self, item: T) -> Result<()> {
        self.len += 1;
        if let Some(writer) = self.writer.as_mut() {
            return writer.push(&item);
        }
        self.memory.push(item);
        if self.memory.len() > self.config.memory_records {
            self.spill()?;
        }
        Ok(())
    }

    fn end_write(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            self.spilled = Some(writer.finish()?);
        }
        Ok(())
    }
}

impl<T: Record> Stage for Pool<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.len
    }

    fn begin_read(&mut self) -> Result<()> {
        self.cursor = 0;
        self.reader = match &self.spilled {
            Some(run) => Some(run.open()?),
            None => None,
        };
        Ok(())
    }

    fn next_item(&mut self) -> Result<Option<T>> {
        let item = match self.reader.as_mut() {
            Some(reader) => reader.next()?,
            None => self.memory.get(self.cursor).cloned(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::{collect, pump, Source};

    #[test]
    fn in_memory_pool_keeps_order() {
        let config = PipeConfig::default();
        let data: Vec<u32> = (0..100).rev().collect();
        let mut pool = Pool::new(&config);
        pump(&mut Source::new(&data), &mut pool).unwrap();
        assert!(!pool.is_spilled());
        assert_eq!(pool.len(), 100);
        assert_eq!(collect(&mut pool).unwrap(), data);
    }

    #[test]
    fn spilled_pool_reads_back_everything_twice() {
        let config = PipeConfig::with_memory_records(7);
        let data: Vec<(u32, u64)> = (0..1000u32).map(|i| (i, u64::from(i) * 31)).collect();
        let mut pool = Pool::new(&config);
        pump(&mut Source::new(&data), &mut pool).unwrap();
        assert!(pool.is_spilled());
        assert_eq!(collect(&mut pool).unwrap(), data);
        assert_eq!(collect(&mut pool).unwrap(), data);
    }

    #[test]
    fn spill_into_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipeConfig { memory_records: 2, temp_dir: Some(dir.path().to_path_buf()) };
        let data = [1u32, 2, 3, 4, 5];
        let mut pool = Pool::new(&config);
        pump(&mut Source::new(&data), &mut pool).unwrap();
        assert!(pool.is_spilled());
        assert_eq!(collect(&mut pool).unwrap(), data.to_vec());
    }

    #[test]
    fn rewriting_resets_contents() {
        let config = PipeConfig::with_memory_records(3);
        let mut pool = Pool::new(&config);
        pump(&mut Source::new(&[9u32; 10]), &mut pool).unwrap();
        pump(&mut Source::new(&[1u32, 2]), &mut pool).unwrap();
        assert!(!pool.is_spilled());
        assert_eq!(collect(&mut pool).unwrap(), vec![1, 2]);
    }
}
