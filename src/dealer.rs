//! Dealer orchestration: start the players, run the game, collect them.
//!
//! The scheduler runs on its own thread while the caller's thread watches for an early stop.
//! Once one is triggered, players get `shutdown_timeout` to leave; the ones still running after
//! that are killed, which ends any read the scheduler is blocked in.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use tracing::{info, instrument, warn};

use crate::{
    channel::ChannelFactory,
    configuration::Configuration,
    error::{CommsError, GameError, StartupError},
    path::Path,
    scheduler::{EarlyStop, Outcome, TurnScheduler},
    status::StatusDump,
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs one game per call with the players provided by a [`ChannelFactory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Dealer {
    config: Configuration,
}

impl Dealer {
    pub fn new(config: Configuration) -> Self {
        Dealer { config }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Play a full game on `path`.
    ///
    /// `on_seated` receives the game's [`EarlyStop`] once every player is connected and before
    /// the first message is served, so that interrupts can be wired up. After an early stop this
    /// returns within about twice the shutdown timeout, even if players ignore `EARLY`.
    #[instrument(skip_all, fields(players = path.players_count()))]
    pub fn run<F: ChannelFactory>(
        &self,
        path: Path,
        factory: &mut F,
        on_seated: impl FnOnce(EarlyStop),
    ) -> Result<Outcome, GameError> {
        let players_count = path.players_count();
        let mut channels = Vec::with_capacity(players_count);
        for id in 0..players_count {
            let channel = factory
                .open(id, players_count)
                .map_err(|e| StartupError::PlayerStart(format!("{e:#}")))?;
            channels.push(channel);
        }
        info!("every player started");

        let scheduler = TurnScheduler::new(path, channels, self.config);
        let early = scheduler.early_stop();
        on_seated(early.clone());
        if self.config.verbose {
            print!("{}", StatusDump::new(scheduler.path(), scheduler.state()));
        }

        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("scheduler".to_owned())
            .spawn(move || {
                // the receiver may be gone after a forced shutdown
                let _ = tx.send(scheduler.run());
            })
            .map_err(CommsError::from)?;

        let outcome = self.await_outcome(&rx, &early, factory);
        if outcome.is_none() {
            // the scheduler only drops its sender without a result when it panicked
            if let Err(panic) = worker.join() {
                std::panic::resume_unwind(panic);
            }
        }

        if let Err(e) = factory.wait_all(self.config.shutdown_timeout) {
            warn!("could not collect players: {e:#}");
        }
        outcome.unwrap_or(Ok(Outcome::Early))
    }

    /// Wait for the scheduler's result, enforcing the shutdown timeout once `early` fired.
    ///
    /// `None` when the scheduler thread ended without a result.
    fn await_outcome<F: ChannelFactory>(
        &self,
        rx: &Receiver<Result<Outcome, GameError>>,
        early: &EarlyStop,
        factory: &mut F,
    ) -> Option<Result<Outcome, GameError>> {
        let timeout = self.config.shutdown_timeout;
        let mut deadline = None;
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(outcome) => return Some(outcome),
                Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {}
            }
            if !early.is_triggered() {
                continue;
            }
            let kill_at = *deadline.get_or_insert_with(|| Instant::now() + timeout);
            if Instant::now() < kill_at {
                continue;
            }

            warn!("players still connected after early game over, stopping them");
            if let Err(e) = factory.wait_all(Duration::ZERO) {
                warn!("could not stop players: {e:#}");
            }
            return match rx.recv_timeout(timeout) {
                Ok(outcome) => Some(outcome),
                Err(RecvTimeoutError::Disconnected) => None,
                // a stream is still held open elsewhere, leave the scheduler behind
                Err(RecvTimeoutError::Timeout) => {
                    warn!("scheduler still blocked, giving up on it");
                    Some(Ok(Outcome::Early))
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::bail;

    use super::*;
    use crate::channel::{pipe, InProcessFactory, PipeWriter, PlayerChannel};

    fn quiet() -> Configuration {
        Configuration::new()
            .with_verbose(false)
            .with_shutdown_timeout(Duration::from_secs(5))
    }

    #[test]
    fn in_process_game_finishes() {
        let path = Path::parse("7;::-Mo1V11V22Mo1Mo1::-", 2).unwrap();
        let mut factory = InProcessFactory::new();
        let outcome = Dealer::new(quiet()).run(path, &mut factory, |_| {}).unwrap();
        let Outcome::Finished(state) = outcome else {
            panic!("game did not finish");
        };
        assert_eq!(state.positions(), vec![6, 6]);
        assert_eq!(factory.results().len(), 2);
        assert!(factory.results().iter().all(|(_, r)| r.is_ok()));
    }

    struct Refusing;

    impl ChannelFactory for Refusing {
        fn open(&mut self, id: usize, _: usize) -> anyhow::Result<PlayerChannel> {
            bail!("player {id} refused to start")
        }

        fn wait_all(&mut self, _: Duration) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn player_start_failure() {
        let path = Path::parse("3;::-Mo1::-", 1).unwrap();
        let err = Dealer::new(quiet())
            .run(path, &mut Refusing, |_| {})
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::Startup(StartupError::PlayerStart(ref msg)) if msg.contains("refused")
        ));
    }

    /// Players that ask for the path and then never answer, until stopped.
    #[derive(Default)]
    struct Silent {
        outputs: Vec<PipeWriter>,
        stopped: bool,
    }

    impl ChannelFactory for Silent {
        fn open(&mut self, _: usize, _: usize) -> anyhow::Result<PlayerChannel> {
            let (mut output, from_player) = pipe();
            output.write_all(b"^")?;
            self.outputs.push(output);
            Ok(PlayerChannel {
                reader: Box::new(std::io::BufReader::new(from_player)),
                writer: Box::new(std::io::sink()),
            })
        }

        fn wait_all(&mut self, timeout: Duration) -> anyhow::Result<()> {
            if timeout.is_zero() && !self.outputs.is_empty() {
                self.stopped = true;
            }
            self.outputs.clear();
            Ok(())
        }
    }

    #[test]
    fn early_stop_does_not_wait_for_silent_players() {
        let path = Path::parse("3;::-Mo1::-", 2).unwrap();
        let config = quiet().with_shutdown_timeout(Duration::from_millis(100));
        let mut factory = Silent::default();
        let start = Instant::now();

        let outcome = Dealer::new(config)
            .run(path, &mut factory, |early| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(200));
                    early.trigger();
                });
            })
            .unwrap();

        assert_eq!(outcome, Outcome::Early);
        assert!(factory.stopped);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
