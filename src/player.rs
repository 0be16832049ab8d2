//! Player side of the game.
//!
//! A player asks for the path, then waits for dealer messages. It keeps its own copy of the
//! game state up to date from the broadcasts and answers every turn request with the site picked
//! by [`choose_target`].

use std::io::{BufRead, Write};

use tracing::{debug, info, instrument};

use crate::{
    error::{CommsError, GameError},
    path::Path,
    protocol::{self, DealerMessage, MoveBroadcast, PlayerMessage},
    state::{GameState, PlayerRecord},
    status::StatusDump,
    strategy::{choose_target, Occupancy},
};

/// What a player knows about the game.
///
/// Positions and ranks are known for everybody, money and points only for the player itself.
#[derive(Debug, Clone)]
pub struct PlayerView {
    id: usize,
    path: Path,
    state: GameState,
}

impl PlayerView {
    pub fn new(id: usize, path: Path, players_count: usize) -> Self {
        PlayerView {
            id,
            path,
            state: GameState::new(players_count),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    fn me(&self) -> &PlayerRecord {
        &self.state.records()[self.id]
    }

    /// The site this player wants to move to, `None` to pass.
    pub fn decide(&self) -> Option<usize> {
        let occupancy = Occupancy::of(&self.state, &self.path);
        choose_target(&self.path, self.me(), &occupancy)
    }

    /// Decide and record the move locally. Returns the site to declare, the current site when
    /// passing.
    pub fn declare(&mut self) -> usize {
        match self.decide() {
            Some(site) => {
                self.state.arrive(self.id, site);
                site
            }
            None => self.me().position,
        }
    }

    /// Mirror a move announced by the dealer.
    pub fn apply_broadcast(&mut self, hap: &MoveBroadcast) -> Result<(), CommsError> {
        if hap.player >= self.state.players_count() || hap.site >= self.path.site_count() {
            return Err(CommsError::Malformed(DealerMessage::Happened(*hap).to_string()));
        }
        self.state.arrive(hap.player, hap.site);
        if hap.player == self.id {
            self.state.credit(self.id, &hap.effect);
        }
        Ok(())
    }
}

/// Play a whole game as player `id`, reading dealer messages from `reader` and answering on
/// `writer`.
#[instrument(skip(reader, writer))]
pub fn run_player<R: BufRead, W: Write>(
    players_count: usize,
    id: usize,
    mut reader: R,
    mut writer: W,
) -> Result<(), GameError> {
    protocol::request_path(&mut writer)?;
    let path = protocol::read_path(&mut reader, players_count)?;
    let mut view = PlayerView::new(id, path, players_count);
    debug!("\n{}", StatusDump::new(view.path(), view.state()));

    loop {
        match protocol::read_dealer_message(&mut reader)? {
            DealerMessage::YourTurn => {
                let site = view.declare();
                protocol::write_message(&mut writer, &PlayerMessage::Move(site))?;
            }
            DealerMessage::Happened(hap) => {
                view.apply_broadcast(&hap)?;
                debug!("\n{}", StatusDump::new(view.path(), view.state()));
            }
            DealerMessage::Done => {
                let me = view.me();
                info!(money = me.money, points = me.points, "game over");
                return Ok(());
            }
            DealerMessage::Early => return Err(GameError::EarlyGameOver),
        }
    }
}
