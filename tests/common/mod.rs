#![allow(dead_code)]

use std::{
    io::{BufRead, BufReader, Write},
    time::Duration,
};

use path_race::{
    channel::{pipe, PipeReader, PipeWriter},
    prelude::*,
};
use time::format_description;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub const EXAMPLE_PATH: &str = "7;::-Mo1V11V22Mo1Mo1::-";

/// Log everything to the test output. Only the first call in a test binary has an effect.
pub fn init_test_logger() {
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        format_description::parse("[hour]:[minute]:[second]").unwrap(),
    );

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_timer(timer)
        .with_test_writer()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn quiet() -> Configuration {
    Configuration::new()
        .with_verbose(false)
        .with_shutdown_timeout(Duration::from_secs(5))
}

/// The player's end of a pipe pair, driven by hand from a test.
pub struct ScriptedPlayer {
    pub input: BufReader<PipeReader>,
    pub output: PipeWriter,
}

impl ScriptedPlayer {
    pub fn send(&mut self, text: &str) {
        self.output.write_all(text.as_bytes()).unwrap();
    }

    pub fn expect(&mut self, line: &str) {
        let mut got = String::new();
        self.input.read_line(&mut got).unwrap();
        assert_eq!(got.trim_end_matches('\n'), line);
    }
}

/// A dealer-side channel and the scripted player at its other end.
pub fn scripted_seat() -> (PlayerChannel, ScriptedPlayer) {
    let (to_player, player_input) = pipe();
    let (player_output, from_player) = pipe();
    (
        PlayerChannel {
            reader: Box::new(BufReader::new(from_player)),
            writer: Box::new(to_player),
        },
        ScriptedPlayer {
            input: BufReader::new(player_input),
            output: player_output,
        },
    )
}
