//! Browser console logging

use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_web::MakeWebConsoleWriter;

/// Route `tracing` events to the browser console at `log_level`
pub fn init(log_level: &str) {
    let level = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .with(level)
        .try_init()
        .is_err()
    {
        web_sys::console::warn_1(&"Tracing was already initialized".into());
    }
}
