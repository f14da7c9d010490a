//! DC7 skew 后缀排序流水线。
//!
//! 一层递归由以下阶段组成：
//!
//! ```text
//! text ─▶ Sampler ─▶ Sorter ─▶ Namer ─┬─▶ (名字互异) ─────────────────────────────┐
//!                                     └─▶ Mapper(切片序) ─▶ 递归排序 ─▶ Counter ─┤
//!                                                                                ▼
//!                      text ─▶ Extender ◀──────────────── Mapper(线性序 排名)
//!                                 │
//!                                 ▼
//!                        5 路 Sorter/Mapper ─▶ Merger ─▶ SA
//! ```

use super::extender::extend;
use super::merger::Merger;
use super::sampler::{Namer, PackedSeptet, SampleLayout, Sampler, SeptetKey, Septet};
use crate::config::PipeConfig;
use crate::error::Result;
use crate::pipe::{pump, Counter, Map, Mapper, Pool, Sorter, Stage};
use crate::util::symbol::bits_for;

/// 对码值位于 `[1, max_code]` 的文本做后缀排序，0 保留为文本末尾。
///
/// 文本会被读取两次（采样与扩展），因此必须可重复读取。返回按后缀序排列的位置。
pub fn suffix_sort<S>(text: &mut S, max_code: u32, config: &PipeConfig, depth: usize) -> Result<Pool<u32>>
where
    S: Stage<Item = u32>,
{
    let n = text.len();
    assert!(n > 0, "suffix sorting needs a non-empty text");
    log::debug!("skew7 level {}: n={}, max_code={}", depth, n, max_code);

    let bits = bits_for(max_code);
    let mut names = if PackedSeptet::fits(bits) {
        rank_samples::<S, PackedSeptet>(text, bits, config, depth)?
    } else {
        rank_samples::<S, Septet>(text, bits, config, depth)?
    };

    let streams = extend(text, &mut names, config)?;
    drop(names);

    let mut merger = Merger::new(streams);
    let mut sa = Pool::new(config);
    pump(&mut merger, &mut sa)?;
    debug_assert_eq!(sa.len(), n);
    Ok(sa)
}

/// 求出全部采样位置的排名，按文本顺序输出 (位置, 排名)。
fn rank_samples<S, K>(text: &mut S, bits: u32, config: &PipeConfig, depth: usize) -> Result<Mapper<(u32, u32)>>
where
    S: Stage<Item = u32>,
    K: SeptetKey,
{
    let n = text.len();
    let layout = SampleLayout::new(n);
    let m = layout.len();

    let mut sorted = Sorter::<_>::new(config);
    pump(&mut Sampler::<_, K>::new(&mut *text, bits), &mut sorted)?;

    let mut namer = Namer::new(sorted);
    let mut sliced = Mapper::new(m, move |&(pos, _): &(u32, u32)| layout.sliced_index(pos as usize), config);
    pump(&mut namer, &mut sliced)?;
    let distinct = namer.distinct();
    drop(namer);

    let mut linear = Mapper::new(m, move |&(pos, _): &(u32, u32)| layout.linear_index(pos as usize), config);
    if distinct == m {
        log::debug!("skew7 level {}: all {} septets distinct", depth, m);
        pump(&mut sliced, &mut linear)?;
        return Ok(linear);
    }

    log::debug!("skew7 level {}: {} names for {} samples, recursing", depth, distinct, m);
    let mut reduced = Pool::new(config);
    pump(&mut Map::new(&mut sliced, |(_, name): (u32, u32)| name), &mut reduced)?;
    drop(sliced);

    let reduced_sa = suffix_sort(&mut reduced, distinct as u32, config, depth + 1)?;
    drop(reduced);

    let mut ranked = Map::new(Counter::new(reduced_sa), move |(k, index): (usize, u32)| {
        (layout.position_of_sliced(index as usize) as u32, k as u32 + 1)
    });
    pump(&mut ranked, &mut linear)?;
    Ok(linear)
}
