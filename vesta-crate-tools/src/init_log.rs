use std::io::Write;

fn build_logger(filter: log::LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            let info_style = buf
                .default_level_style(log::Level::Info)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green)));
            let warn_style = buf
                .default_level_style(log::Level::Warn)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)));
            let error_style = buf
                .default_level_style(log::Level::Error)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red)));

            let level_style = match record.level() {
                log::Level::Info => info_style,
                log::Level::Warn => warn_style,
                log::Level::Error => error_style,
                _ => buf.default_level_style(record.level()),
            };
            let grey_style = info_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));
            let black_style = info_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(75, 75, 75))));

            let line = record.line().unwrap_or(!0);
            let file = record.file().unwrap_or("").split(['\\', '/']).next_back().unwrap_or("");
            let time = chrono::Local::now().format("%H:%M:%S%.3f");
            let level = record.level();
            let thread = std::thread::current();
            let thread_name = thread.name().unwrap_or("-");

            writeln!(
                buf,
                "{level_style}[{time}] {level}{level_style:#} {grey_style}[{file}:{line}] <{thread_name}>{grey_style:#} \
                 {black_style}{}{black_style:#}",
                record.args()
            )
        })
        .filter(None, filter);
    builder
}

/// 初始化全局 logger，只能调用一次
///
/// 可以通过 `RUST_LOG` 环境变量覆盖默认的 Info 级别
pub fn init_log() {
    let mut builder = build_logger(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

/// 测试用的 logger
///
/// 输出交给 test harness 捕获；多个测试重复调用是安全的
pub fn init_test_log() {
    let _ = build_logger(log::LevelFilter::Debug).is_test(true).try_init();
}
