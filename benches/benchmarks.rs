use criterion::{black_box, criterion_group, criterion_main, Criterion};

use esa_rust::config::{IndexConfig, PipeConfig};
use esa_rust::index::{
    create_lcp_table, create_lcp_table_in_place, create_qgram_index, create_suffix_array, create_suffix_array_with,
    ChildTable, EnhancedSuffixArray, Finder, SuffixArrayIndex, Shape,
};
use esa_rust::util::dna;

fn make_reference(len: usize) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut x: u32 = 42;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    dna::encode(&seq)
}

fn bench_suffix_array(c: &mut Criterion) {
    let text = make_reference(100_000);
    c.bench_function("suffix_array_100k", |b| {
        b.iter(|| black_box(create_suffix_array(black_box(&text))))
    });

    // 小内存上限，走外存归并路径
    let small = make_reference(20_000);
    let spill = PipeConfig::with_memory_records(4096);
    c.bench_function("suffix_array_20k_spilled", |b| {
        b.iter(|| black_box(create_suffix_array_with(black_box(&small), &spill)))
    });
}

fn bench_lcp(c: &mut Criterion) {
    let text = make_reference(100_000);
    let sa = create_suffix_array(&text).unwrap();
    c.bench_function("lcp_auxiliary_100k", |b| b.iter(|| black_box(create_lcp_table(&text, &sa))));
    c.bench_function("lcp_in_place_100k", |b| {
        let mut lcp = vec![0u32; sa.len()];
        b.iter(|| {
            create_lcp_table_in_place(&text, &sa, &mut lcp);
            black_box(&lcp);
        })
    });
}

fn bench_child_table(c: &mut Criterion) {
    let text = make_reference(100_000);
    let sa = create_suffix_array(&text).unwrap();
    let lcp = create_lcp_table(&text, &sa);
    c.bench_function("child_table_100k", |b| b.iter(|| black_box(ChildTable::build(black_box(&lcp)))));
}

fn bench_qgram(c: &mut Criterion) {
    let text = make_reference(100_000);
    c.bench_function("qgram_build_q10_100k", |b| {
        b.iter(|| black_box(create_qgram_index(&text, Shape::ungapped(10, dna::SIGMA as u32))))
    });
    c.bench_function("qgram_build_q20_100k", |b| {
        b.iter(|| black_box(create_qgram_index(&text, Shape::ungapped(20, dna::SIGMA as u32))))
    });
}

fn bench_find(c: &mut Criterion) {
    let text = make_reference(100_000);
    let pattern = text[5_000..5_020].to_vec();
    let esa = EnhancedSuffixArray::build(&text, &IndexConfig::default()).unwrap();
    let sa = SuffixArrayIndex::build(&text, &PipeConfig::default()).unwrap();
    let qgram = create_qgram_index(&text, Shape::ungapped(20, dna::SIGMA as u32)).unwrap();

    c.bench_function("find_esa_20bp", |b| {
        b.iter(|| {
            let mut finder = Finder::new(&esa);
            while finder.find(black_box(&pattern)) {}
        })
    });
    c.bench_function("find_sa_20bp", |b| {
        b.iter(|| {
            let mut finder = Finder::new(&sa);
            while finder.find(black_box(&pattern)) {}
        })
    });
    c.bench_function("find_qgram_20bp", |b| {
        b.iter(|| {
            let mut finder = Finder::new(&qgram);
            while finder.find(black_box(&pattern)) {}
        })
    });
}

criterion_group!(benches, bench_suffix_array, bench_lcp, bench_child_table, bench_qgram, bench_find);
criterion_main!(benches);
