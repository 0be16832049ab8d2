//! Dealer-side game loop.
//!
//! The scheduler first serves the path to every player, in id order, then plays one turn at a
//! time until the game is over:
//!
//! 1. the player furthest behind acts, the latest arrival first when several share a site;
//! 2. it is sent `YT` and answers with the site it moves to;
//! 3. the move is applied and broadcast to every player;
//! 4. once a player on the final site has been joined by everybody, `DONE` is broadcast.
//!
//! Only the scheduler mutates the authoritative [`GameState`], between fully flushed exchanges.

use std::{
    io::{BufRead, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
};

use tracing::{debug, error, info, instrument, warn};

use crate::{
    channel::PlayerChannel,
    configuration::Configuration,
    error::{CommsError, GameError},
    path::Path,
    protocol::{self, DealerMessage, MoveBroadcast},
    state::{GameState, MoveEffect},
    status::StatusDump,
};

/// How much the dealer checks a declared move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovePolicy {
    /// Any site from the player's position to the end of the path is accepted. Players are
    /// trusted to respect capacities.
    #[default]
    Trusting,
    /// As `Trusting`, and the target must also have room left.
    CapacityChecked,
}

/// Where the scheduler is in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingPaths,
    Scheduling,
    Finished,
}

/// How a game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Played to the end, with the final records.
    Finished(GameState),
    /// Interrupted by an [`EarlyStop`].
    Early,
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

fn send(writer: &Mutex<Box<dyn Write + Send>>, msg: &DealerMessage) -> Result<(), CommsError> {
    let mut guard = writer.lock().map_err(|_| CommsError::Poisoned)?;
    protocol::write_message(&mut **guard, msg)
}

/// Handle ending a running game from another thread, e.g. a signal handler.
///
/// Does not keep the players' streams alive on its own.
#[derive(Clone)]
pub struct EarlyStop {
    triggered: Arc<AtomicBool>,
    writers: Vec<Weak<Mutex<Box<dyn Write + Send>>>>,
}

impl EarlyStop {
    /// Tell every player the game is over. Only the first call has an effect.
    pub fn trigger(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!("early game over");
        for (id, writer) in self.writers.iter().enumerate() {
            let Some(writer) = writer.upgrade() else {
                continue;
            };
            if let Err(e) = send(&writer, &DealerMessage::Early) {
                warn!(player = id, "could not send EARLY: {e}");
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

struct Seat {
    reader: Box<dyn BufRead + Send>,
    writer: SharedWriter,
}

/// Drives a game over one channel per player.
pub struct TurnScheduler {
    path: Path,
    state: GameState,
    seats: Vec<Seat>,
    phase: Phase,
    config: Configuration,
    triggered: Arc<AtomicBool>,
    last_pass: Option<usize>,
    turns: usize,
}

impl TurnScheduler {
    /// `channels[id]` connects to player `id`.
    pub fn new(path: Path, channels: Vec<PlayerChannel>, config: Configuration) -> Self {
        let state = GameState::new(channels.len());
        let seats = channels
            .into_iter()
            .map(|c| Seat {
                reader: c.reader,
                writer: Arc::new(Mutex::new(c.writer)),
            })
            .collect();
        TurnScheduler {
            path,
            state,
            seats,
            phase: Phase::AwaitingPaths,
            config,
            triggered: Arc::new(AtomicBool::new(false)),
            last_pass: None,
            turns: 0,
        }
    }

    pub fn early_stop(&self) -> EarlyStop {
        EarlyStop {
            triggered: self.triggered.clone(),
            writers: self.seats.iter().map(|s| Arc::downgrade(&s.writer)).collect(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of turns played so far.
    pub fn turns(&self) -> usize {
        self.turns
    }

    fn broadcast(&self, msg: &DealerMessage) -> Result<(), CommsError> {
        for seat in &self.seats {
            send(&seat.writer, msg)?;
        }
        Ok(())
    }

    /// Answer every player's path request, in id order.
    #[instrument(skip(self))]
    pub fn serve_paths(&mut self) -> Result<(), CommsError> {
        for (id, seat) in self.seats.iter_mut().enumerate() {
            protocol::read_path_request(&mut *seat.reader)?;
            let mut writer = seat.writer.lock().map_err(|_| CommsError::Poisoned)?;
            protocol::send_path(&mut **writer, &self.path)?;
            debug!(player = id, "path served");
        }
        self.phase = Phase::Scheduling;
        Ok(())
    }

    fn check_move(&self, player: usize, target: usize) -> Result<(), CommsError> {
        let position = self.state.record(player).map_or(0, |r| r.position);
        let invalid = CommsError::InvalidMove { player, target };
        let Some(site) = self.path.site(target) else {
            return Err(invalid);
        };
        if target < position {
            return Err(invalid);
        }
        if self.config.move_policy == MovePolicy::CapacityChecked
            && target != position
            && self.state.occupancy(target) >= site.capacity
        {
            return Err(invalid);
        }
        Ok(())
    }

    /// Play a single turn, returns the phase reached.
    pub fn play_turn(&mut self) -> Result<Phase, CommsError> {
        let Some(player) = self.state.next_player() else {
            self.phase = Phase::Finished;
            return Ok(self.phase);
        };
        let position = self.state.record(player).map_or(0, |r| r.position);

        send(&self.seats[player].writer, &DealerMessage::YourTurn)?;
        let target = protocol::read_move(&mut *self.seats[player].reader)?;
        self.check_move(player, target)?;

        let effect = if target == position {
            // a pass leaves the state as it is, so the same player is asked again
            if self.last_pass == Some(player) {
                return Err(CommsError::InvalidMove { player, target });
            }
            self.last_pass = Some(player);
            info!(player, site = target, "pass");
            MoveEffect::default()
        } else {
            self.last_pass = None;
            let kind = self.path.site(target).map(|s| s.kind);
            self.state.arrive(player, target);
            let effect = kind.map(MoveEffect::of_site).unwrap_or_default();
            if let Some(kind) = kind {
                self.state.count_visit(player, kind);
            }
            self.state.credit(player, &effect);
            info!(player, from = position, to = target, "move");
            effect
        };
        self.turns += 1;

        self.broadcast(&DealerMessage::Happened(MoveBroadcast {
            player,
            site: target,
            effect,
        }))?;
        if self.config.verbose {
            print!("{}", StatusDump::new(&self.path, &self.state));
        }

        if self.state.is_finished(&self.path) {
            self.broadcast(&DealerMessage::Done)?;
            self.phase = Phase::Finished;
            info!(turns = self.turns, "game over");
        }
        Ok(self.phase)
    }

    fn interrupted_or(&self, e: CommsError) -> Result<Outcome, GameError> {
        if self.triggered.load(Ordering::SeqCst) {
            debug!("stream error after early stop: {e}");
            Ok(Outcome::Early)
        } else {
            error!("{e}");
            Err(e.into())
        }
    }

    /// Play the whole game.
    #[instrument(skip(self), fields(players = self.seats.len()))]
    pub fn run(mut self) -> Result<Outcome, GameError> {
        if self.phase == Phase::AwaitingPaths {
            if let Err(e) = self.serve_paths() {
                return self.interrupted_or(e);
            }
        }
        while self.phase != Phase::Finished {
            if self.triggered.load(Ordering::SeqCst) {
                return Ok(Outcome::Early);
            }
            if let Err(e) = self.play_turn() {
                return self.interrupted_or(e);
            }
        }
        Ok(Outcome::Finished(self.state))
    }
}
