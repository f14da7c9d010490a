use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;

use esa_rust::config::{DirLayout, IndexConfig, LcpAlgorithm, PipeConfig, QGramConfig};
use esa_rust::index::{EnhancedSuffixArray, EsaTables, Finder, QGramIndex, Shape};
use esa_rust::logging;
use esa_rust::reference::Reference;
use esa_rust::util::dna;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "esa-rust", author, version, about = "Enhanced suffix array and q-gram index builder", arg_required_else_help = true)]
struct Cli {
    /// Log build phases to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the enhanced suffix array (SA + LCP + child table) of a reference
    Index {
        /// Reference FASTA file
        reference: String,
        /// Output prefix; tables are written to <prefix>.esa
        #[arg(short, long, default_value = "ref")]
        output: String,
        /// Records kept in memory per pipeline stage before spilling to disk
        #[arg(long = "memory-records", default_value_t = 4 << 20)]
        memory_records: usize,
        /// Directory for spill files (system temp dir if omitted)
        #[arg(long = "temp-dir")]
        temp_dir: Option<String>,
        /// Build the LCP table in place instead of with an inverse suffix array
        #[arg(long = "in-place-lcp")]
        in_place_lcp: bool,
    },
    /// Find exact occurrences of patterns using a saved index
    Search {
        /// Index prefix given to `index`
        #[arg(short = 'i', long = "index")]
        index: String,
        /// The reference FASTA the index was built from
        reference: String,
        /// Patterns to search (A/C/G/T/N)
        #[arg(required = true)]
        patterns: Vec<String>,
        /// Report at most this many hits per pattern
        #[arg(long = "max-hits", default_value_t = 100)]
        max_hits: usize,
    },
    /// Build a q-gram index and print bucket statistics
    Qgram {
        /// Reference FASTA file
        reference: String,
        /// q-gram length (ungapped shape)
        #[arg(short = 'q', long, default_value_t = 8, conflicts_with = "shape")]
        q: usize,
        /// Gapped shape such as 1101011
        #[arg(long)]
        shape: Option<String>,
        /// Open addressing load factor (> 1)
        #[arg(long, default_value_t = 1.6)]
        alpha: f64,
        #[arg(long, value_enum, default_value_t = LayoutArg::Auto)]
        layout: LayoutArg,
        /// Number of most frequent q-grams to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    Auto,
    Dense,
    Open,
}

impl From<LayoutArg> for DirLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Auto => DirLayout::Auto,
            LayoutArg::Dense => DirLayout::Dense,
            LayoutArg::Open => DirLayout::OpenAddressing,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);
    match cli.command {
        Commands::Index { reference, output, memory_records, temp_dir, in_place_lcp } => {
            anyhow::ensure!(memory_records > 0, "--memory-records must be positive");
            let config = IndexConfig {
                pipe: PipeConfig { memory_records, temp_dir: temp_dir.map(Into::into) },
                lcp: if in_place_lcp { LcpAlgorithm::InPlace } else { LcpAlgorithm::Auxiliary },
                ..IndexConfig::default()
            };
            run_index(&reference, &output, &config)
        }
        Commands::Search { index, reference, patterns, max_hits } => run_search(&index, &reference, &patterns, max_hits),
        Commands::Qgram { reference, q, shape, alpha, layout, top } => {
            anyhow::ensure!(alpha > 1.0, "--alpha must be greater than 1");
            let config = QGramConfig { alpha, layout: layout.into() };
            run_qgram(&reference, q, shape.as_deref(), &config, top)
        }
    }
}

fn load_reference(path: &str) -> Result<Reference> {
    Reference::from_path(path).with_context(|| format!("cannot load reference FASTA '{}'", path))
}

fn run_index(reference: &str, output: &str, config: &IndexConfig) -> Result<()> {
    let r = load_reference(reference)?;
    println!("reference: {}", reference);
    println!("sequences: {}", r.contigs.len());
    println!("total_len: {}", r.total_len());

    let mut tables = EsaTables::build(&r.text, config).context("index construction failed")?;
    tables.meta.reference_file = Some(reference.to_string());
    tables.meta.build_args = Some(std::env::args().collect::<Vec<_>>().join(" "));

    let out_path = format!("{}.esa", output);
    tables
        .save_to_file(&out_path)
        .with_context(|| format!("cannot write index to '{}'", out_path))?;
    println!("index saved: {}", out_path);
    Ok(())
}

fn run_search(index_prefix: &str, reference: &str, patterns: &[String], max_hits: usize) -> Result<()> {
    let r = load_reference(reference)?;
    let index_path = format!("{}.esa", index_prefix);
    let tables = EsaTables::load_from_file(&index_path).with_context(|| format!("cannot read index '{}'", index_path))?;
    log::info!(
        "loaded index built {}",
        tables.meta.build_timestamp.as_deref().unwrap_or("at an unknown time")
    );
    let esa = EnhancedSuffixArray::from_tables(&r.text, tables)
        .with_context(|| format!("index '{}' does not belong to '{}'", index_path, reference))?;

    let results: Vec<(usize, Vec<usize>)> = patterns
        .par_iter()
        .map(|p| {
            let codes = dna::encode(p.as_bytes());
            let mut finder = Finder::new(&esa);
            let mut hits = Vec::new();
            if !codes.is_empty() {
                while finder.find(&codes) {
                    hits.push(finder.position());
                }
            }
            hits.sort_unstable();
            (finder.count(), hits)
        })
        .collect();

    for (pattern, (count, hits)) in patterns.iter().zip(results) {
        println!("{}\t{} hits", pattern, count);
        for pos in hits.into_iter().take(max_hits) {
            if let Some((contig, offset)) = r.locate(pos) {
                println!("\t{}:{}", contig.name, offset + 1);
            }
        }
    }
    Ok(())
}

fn run_qgram(reference: &str, q: usize, shape: Option<&str>, config: &QGramConfig, top: usize) -> Result<()> {
    let r = load_reference(reference)?;
    let sigma = dna::SIGMA as u32;
    let shape = match shape {
        Some(pattern) => {
            anyhow::ensure!(
                pattern.starts_with('1') && pattern.ends_with('1') && pattern.bytes().all(|b| b == b'0' || b == b'1'),
                "shape '{}' must consist of 0/1 and start and end with 1",
                pattern
            );
            Shape::gapped(pattern, sigma)
        }
        None => {
            anyhow::ensure!(q > 0, "-q must be positive");
            Shape::ungapped(q, sigma)
        }
    };
    let weight = shape.weight();
    let index = QGramIndex::build(&r.text, shape, config).context("q-gram index construction failed")?;

    let mut counts = index.bucket_counts();
    println!("reference: {}", reference);
    println!("q-grams: {}", index.sa().len());
    println!("distinct: {}", counts.len());
    println!("layout: {}", if index.is_open_addressing() { "open addressing" } else { "dense" });
    println!("directory: {} buckets", index.dir().len() - 1);

    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (hash, count) in counts.into_iter().take(top) {
        println!("{}\t{}", decode_hash(hash, weight, sigma), count);
    }
    Ok(())
}

/// 把哈希值还原为所选位置上的符号串。
fn decode_hash(mut hash: u64, weight: usize, sigma: u32) -> String {
    let mut codes = vec![0u8; weight];
    for slot in codes.iter_mut().rev() {
        *slot = (hash % u64::from(sigma)) as u8;
        hash /= u64::from(sigma);
    }
    dna::decode(&codes)
}
