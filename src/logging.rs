use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// 初始化日志：输出到 stderr，格式为 `[HH:MM:SS] LEVEL: message`，时间为进程启动后经过的时长。
///
/// verbose 为 true 时级别为 Info，否则为 Warn；`RUST_LOG` 仍可覆盖。
pub fn init_logger(verbose: bool) {
    let start = *START_TIME.get_or_init(Instant::now);

    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(move |buf, record| {
            let secs = start.elapsed().as_secs();
            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {}: {}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}
