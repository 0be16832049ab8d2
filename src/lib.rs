//! # Path Race
//!
//! A turn-based race along a path of typed sites, played by one dealer process and one process
//! per player, talking over line based byte streams.
//!
//! It provides:
//! - Path parsing and validation (`Path`)
//! - The shared game model: positions, arrival ranks, money and points (`GameState`)
//! - The wire protocol between dealer and players (`protocol`)
//! - The dealer's turn scheduler (`TurnScheduler`) and orchestration (`Dealer`)
//! - The deterministic player strategy (`choose_target`) and client loop (`run_player`)
//!
//! A game goes like this: every player asks for the path, then the dealer repeatedly picks the
//! player furthest behind, asks it for a move, and broadcasts the move to everybody. The game is
//! over once every player stands on the final barrier.
//!
//! # Documentation Overview
//!
//! - For the board format and its size limit, see [`path`].
//! - For the messages and their encoding, see [`protocol`].
//! - For turn order, move checks and interrupts, see [`scheduler`].
//! - For how players are started and connected, see [`channel`] and [`dealer`].
//! - For configuring verbosity, logging and move checks, see
//!   [`Configuration`](crate::configuration::Configuration).
//!
//! # Usage Example
//!
//! Play a game with every player running on a thread of the current process:
//!
//! ```no_run
//! use path_race::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let path = Path::parse("7;::-Mo1V11V22Mo1Mo1::-", 2)?;
//!     let config = Configuration::new().with_verbose(false);
//!
//!     let mut players = InProcessFactory::new();
//!     match Dealer::new(config).run(path, &mut players, |_| {})? {
//!         Outcome::Finished(state) => println!("{}", Scores(&state)),
//!         Outcome::Early => println!("interrupted"),
//!     }
//!     Ok(())
//! }
//! ```

pub use anyhow;
pub mod channel;
pub mod cli;
pub mod configuration;
pub mod dealer;
pub mod error;
pub mod logger;
pub mod path;
pub mod player;
pub mod protocol;
pub mod scheduler;
pub mod state;
pub mod status;
pub mod strategy;

/// Commonly used types and functions for quick access.
///
/// ```rust
/// use path_race::prelude::*;
/// ```
pub mod prelude {
    pub use crate::channel::{ChannelFactory, InProcessFactory, PlayerChannel, ProcessFactory};
    pub use crate::configuration::Configuration;
    pub use crate::dealer::Dealer;
    pub use crate::error::{CommsError, GameError, PathError, Role, StartupError};
    pub use crate::path::{Path, Site, SiteKind};
    pub use crate::player::{run_player, PlayerView};
    pub use crate::scheduler::{EarlyStop, MovePolicy, Outcome, TurnScheduler};
    pub use crate::state::{GameState, PlayerRecord};
    pub use crate::status::{Scores, StatusDump};
    pub use crate::strategy::choose_target;
}
