use std::collections::VecDeque;

use super::merger::{sorted_slot, ClassStreams, ClassTuple, COVER_OFFSETS, WINDOW};
use super::sampler::{residue, MODULUS};
use crate::config::PipeConfig;
use crate::error::Result;
use crate::pipe::{read, Mapper, Sink, Sorter, Stage};

fn rank_of(pending: &VecDeque<(u32, u32)>, pos: usize) -> u32 {
    pending
        .iter()
        .find(|&&(p, _)| p as usize == pos)
        .map(|&(_, rank)| rank)
        .unwrap_or_else(|| panic!("sample position {} has no rank", pos))
}

/// 将采样排名扩展到全部位置。
///
/// 同时读取文本和按文本顺序排列的 (采样位置, 排名) 流，为每个位置生成一个 [`ClassTuple`]：
/// 其后 `WINDOW` 个符号以及 `COVER_OFFSETS` 给出的三个采样位置的排名（越过文本末尾记为 0）。
/// 类 0、3、5、6 的元组写入各自的 Sorter，采样类的元组按自身排名写入 Mapper，
/// 因而采样流无需比较排序。
pub fn extend<S, N>(text: &mut S, names: &mut N, config: &PipeConfig) -> Result<ClassStreams>
where
    S: Stage<Item = u32> + ?Sized,
    N: Stage<Item = (u32, u32)> + ?Sized,
{
    let n = text.len();
    let mut streams = ClassStreams {
        sorted: std::array::from_fn(|_| Sorter::new(config)),
        samples: Mapper::new(
            names.len(),
            |t: &ClassTuple| (t.ranks[0] as usize).wrapping_sub(1),
            config,
        ),
    };
    for sorter in streams.sorted.iter_mut() {
        sorter.begin_write()?;
    }
    streams.samples.begin_write()?;

    {
        let mut text_in = read(text)?;
        let mut names_in = read(names)?;

        let mut window = [0u32; WINDOW];
        for slot in window.iter_mut() {
            *slot = text_in.next().transpose()?.unwrap_or(0);
        }
        // 覆盖 [pos, pos + 6] 内全部采样位置的排名
        let mut pending: VecDeque<(u32, u32)> = VecDeque::with_capacity(MODULUS);
        let mut names_done = false;

        for pos in 0..n {
            while !names_done && pending.back().map_or(true, |&(p, _)| (p as usize) < pos + MODULUS - 1) {
                match names_in.next().transpose()? {
                    Some(named) => pending.push_back(named),
                    None => names_done = true,
                }
            }
            while pending.front().map_or(false, |&(p, _)| (p as usize) < pos) {
                pending.pop_front();
            }

            let class = residue(n, pos);
            let mut ranks = [0u32; 3];
            for (rank, &offset) in ranks.iter_mut().zip(COVER_OFFSETS[class].iter()) {
                let q = pos + offset as usize;
                if q < n {
                    *rank = rank_of(&pending, q);
                }
            }
            let tuple = ClassTuple { class: class as u8, pos: pos as u32, ranks, window };
            match sorted_slot(class) {
                Some(slot) => streams.sorted[slot].push(tuple)?,
                None => streams.samples.push(tuple)?,
            }

            window.copy_within(1.., 0);
            window[WINDOW - 1] = text_in.next().transpose()?.unwrap_or(0);
        }
    }

    for sorter in streams.sorted.iter_mut() {
        sorter.end_write()?;
    }
    streams.samples.end_write()?;
    log::debug!(
        "extended {} positions: {} sampled, {} to sort",
        n,
        streams.samples.len(),
        streams.sorted.iter().map(Stage::len).sum::<usize>()
    );
    Ok(streams)
}
