use std::fs::File;

use anyhow::Context;
use time::{
    format_description::{self, parse},
    OffsetDateTime, UtcOffset,
};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, FmtSubscriber};

use crate::configuration::Configuration;

/// Install the global subscriber for the process called `name`.
///
/// With `config.log` everything is written to a timestamped file, otherwise warnings and errors
/// go to stderr. Stdout is never used: it is a protocol channel for players.
pub fn init_logger(name: &str, config: &Configuration) -> anyhow::Result<()> {
    let (writer, level) = if config.log {
        let file_name = get_log_file_name(name)?;
        let file = File::create(&file_name)
            .with_context(|| format!("could not create log file '{file_name}'"))?;
        (BoxMakeWriter::new(file), Level::TRACE)
    } else {
        (BoxMakeWriter::new(std::io::stderr), Level::WARN)
    };

    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")?,
    );

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(writer)
        .finish();

    set_global_default(subscriber)
        .context("Could not set global default tracing subscriber")
}

fn get_log_file_name(name: &str) -> anyhow::Result<String> {
    let format = parse("[year]-[month]-[day]_[hour]:[minute]:[second]")?;
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(format!("{name}_{}_log.txt", now.format(&format)?))
}
