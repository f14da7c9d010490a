//! 流式流水线协议。
//!
//! 每个阶段按拉取（pull）方式逐条产出记录：`begin_read` 准备状态，`next_item` 按需计算下一条，
//! `end_read` 释放资源。[`read`] 返回的 [`Reading`] 把这一生命周期收进作用域：
//! 打开时调用 `begin_read`，离开作用域时调用 `end_read`。
//!
//! 存储阶段（[`Pool`]、[`Sorter`]、[`Mapper`]）同时实现 [`Sink`]，写满内存上限后自动溢写到临时文件。

pub mod mapper;
pub mod pool;
pub mod sorter;

pub use mapper::Mapper;
pub use pool::{Pool, Record};
pub use sorter::Sorter;

use crate::error::Result;

/// 拉取式流水线阶段。
pub trait Stage {
    type Item;

    /// 输出记录数（精确值或上界），供下游预先分配存储。
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 准备读取；上游阶段在此之前被打开。任何上游失败都使整个阶段失败。
    fn begin_read(&mut self) -> Result<()>;

    /// 计算下一条记录；流结束时返回 `Ok(None)`。
    fn next_item(&mut self) -> Result<Option<Self::Item>>;

    fn eof(&self) -> bool;

    /// 释放读取资源，可重复调用。
    fn end_read(&mut self);
}

impl<S: Stage + ?Sized> Stage for &mut S {
    type Item = S::Item;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn begin_read(&mut self) -> Result<()> {
        (**self).begin_read()
    }

    fn next_item(&mut self) -> Result<Option<Self::Item>> {
        (**self).next_item()
    }

    fn eof(&self) -> bool {
        (**self).eof()
    }

    fn end_read(&mut self) {
        (**self).end_read();
    }
}

/// 可写入的存储阶段。
pub trait Sink<T> {
    fn begin_write(&mut self) -> Result<()>;
    fn push(&mut self, item: T) -> Result<()>;
    fn end_write(&mut self) -> Result<()>;
}

/// 一次读取过程的作用域守卫，析构时调用 `end_read`。
pub struct Reading<'s, S: Stage + ?Sized> {
    stage: &'s mut S,
}

impl<S: Stage + ?Sized> Reading<'_, S> {
    pub fn eof(&self) -> bool {
        self.stage.eof()
    }

    pub fn len(&self) -> usize {
        self.stage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stage.is_empty()
    }
}

impl<S: Stage + ?Sized> Iterator for Reading<'_, S> {
    type Item = Result<S::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stage.next_item().transpose()
    }
}

impl<S: Stage + ?Sized> Drop for Reading<'_, S> {
    fn drop(&mut self) {
        self.stage.end_read();
    }
}

/// 打开阶段进行读取。
pub fn read<S: Stage + ?Sized>(stage: &mut S) -> Result<Reading<'_, S>> {
    if let Err(e) = stage.begin_read() {
        stage.end_read();
        return Err(e);
    }
    Ok(Reading { stage })
}

/// 把整条流写入 `dst`。
pub fn pump<S, D>(src: &mut S, dst: &mut D) -> Result<()>
where
    S: Stage + ?Sized,
    D: Sink<S::Item> + ?Sized,
{
    dst.begin_write()?;
    for item in read(src)? {
        dst.push(item?)?;
    }
    dst.end_write()
}

/// 把整条流收集到内存。
pub fn collect<S: Stage + ?Sized>(src: &mut S) -> Result<Vec<S::Item>> {
    let mut out = Vec::with_capacity(src.len());
    for item in read(src)? {
        out.push(item?);
    }
    Ok(out)
}

/// 切片上的可重复读取源。
pub struct Source<'a, T> {
    data: &'a [T],
    cursor: usize,
}

impl<'a, T: Copy> Source<'a, T> {
    pub fn new(data: &'a [T]) -> Self {
        Self { data, cursor: 0 }
    }
}

impl<T: Copy> Stage for Source<'_, T> {
    type Item = T;

    fn len(&self) -> usize {
        self.data.len()
    }

    fn begin_read(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn next_item(&mut self) -> Result<Option<T>> {
        let item = self.data.get(self.cursor).copied();
        if item.is_some() {
            self.cursor += 1;
        }
        Ok(item)
    }

    fn eof(&self) -> bool {
        self.cursor >= self.data.len()
    }

    fn end_read(&mut self) {}
}

/// 逐条变换。
pub struct Map<S, F> {
    inner: S,
    f: F,
}

impl<S, F> Map<S, F> {
    pub fn new(inner: S, f: F) -> Self {
        Self { inner, f }
    }
}

impl<S, F, U> Stage for Map<S, F>
where
    S: Stage,
    F: FnMut(S::Item) -> U,
{
    type Item = U;

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn begin_read(&mut self) -> Result<()> {
        self.inner.begin_read()
    }

    fn next_item(&mut self) -> Result<Option<U>> {
        Ok(self.inner.next_item()?.map(&mut self.f))
    }

    fn eof(&self) -> bool {
        self.inner.eof()
    }

    fn end_read(&mut self) {
        self.inner.end_read();
    }
}

/// 为每条记录附加从 0 开始的序号。
pub struct Counter<S> {
    inner: S,
    count: usize,
}

impl<S> Counter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, count: 0 }
    }
}

impl<S: Stage> Stage for Counter<S> {
    type Item = (usize, S::Item);

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn begin_read(&mut self) -> Result<()> {
        self.count = 0;
        self.inner.begin_read()
    }

    fn next_item(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.inner.next_item()?.map(|item| {
            let k = self.count;
            self.count += 1;
            (k, item)
        }))
    }

    fn eof(&self) -> bool {
        self.inner.eof()
    }

    fn end_read(&mut self) {
        self.inner.end_read();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tracked<'a> {
        inner: Source<'a, u32>,
        open: bool,
        closes: usize,
    }

    impl Stage for Tracked<'_> {
        type Item = u32;

        fn len(&self) -> usize {
            self.inner.len()
        }

        fn begin_read(&mut self) -> Result<()> {
            self.open = true;
            self.inner.begin_read()
        }

        fn next_item(&mut self) -> Result<Option<u32>> {
            assert!(self.open, "read before begin_read");
            self.inner.next_item()
        }

        fn eof(&self) -> bool {
            self.inner.eof()
        }

        fn end_read(&mut self) {
            self.open = false;
            self.closes += 1;
        }
    }

    #[test]
    fn reading_guard_closes_on_drop() {
        let data = [3u32, 1, 4];
        let mut stage = Tracked { inner: Source::new(&data), open: false, closes: 0 };
        {
            let mut r = read(&mut stage).unwrap();
            assert_eq!(r.next().unwrap().unwrap(), 3);
        }
        assert!(!stage.open);
        assert_eq!(stage.closes, 1);
    }

    #[test]
    fn source_is_rereadable() {
        let data = [1u8, 2, 3];
        let mut src = Source::new(&data);
        assert_eq!(collect(&mut src).unwrap(), vec![1, 2, 3]);
        assert!(src.eof());
        assert_eq!(collect(&mut src).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn map_and_counter_compose() {
        let data = [10u32, 20, 30];
        let mut stage = Map::new(Counter::new(Source::new(&data)), |(k, v): (usize, u32)| v + k as u32);
        assert_eq!(stage.len(), 3);
        assert_eq!(collect(&mut stage).unwrap(), vec![10, 21, 32]);
    }

    #[test]
    fn stages_compose_by_reference() {
        let data = [5u32, 6];
        let mut src = Source::new(&data);
        {
            let mut doubled = Map::new(&mut src, |v: u32| v * 2);
            assert_eq!(collect(&mut doubled).unwrap(), vec![10, 12]);
        }
        assert!(src.eof());
    }
}
