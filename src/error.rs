//! Error taxonomy shared by the dealer and the players.
//!
//! Every error is fatal: the protocol has no notion of redelivery, so the side that detects a
//! problem reports it on stderr and exits with a status taken from [`GameError::exit_code`].

use std::io;

use thiserror::Error;

/// A malformed board description.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PathError {
    /// The description does not start with a decimal site count.
    #[error("missing or malformed site count")]
    MissingSiteCount,
    /// The site count is not followed by `;`.
    #[error("expected ';' after the site count")]
    MissingSeparator,
    /// A path needs at least a start and an end barrier.
    #[error("a path needs at least 2 sites, got {0}")]
    TooFewSites(usize),
    /// A two-character code that names no site kind.
    #[error("unknown site code '{code}' at site {index}")]
    UnknownSite { index: usize, code: String },
    /// A non-barrier site without its decimal capacity.
    #[error("site {index} has no capacity")]
    MissingCapacity { index: usize },
    /// The number of site tokens differs from the declared count.
    #[error("declared {declared} sites but found {found}")]
    SiteCountMismatch { declared: usize, found: usize },
    /// The first site is not a barrier.
    #[error("path must start with a barrier")]
    FirstNotBarrier,
    /// The last site is not a barrier.
    #[error("path must end with a barrier")]
    LastNotBarrier,
    /// The serialized form does not fit the byte budget for this game.
    #[error("path needs {len} bytes but at most {limit} are allowed")]
    TooLong { len: usize, limit: usize },
    /// The path file could not be read.
    #[error("could not read path: {0}")]
    Unreadable(String),
}

/// A peer closed its stream or sent something that cannot be understood.
#[derive(Debug, Error)]
pub enum CommsError {
    #[error("peer closed the stream")]
    Closed,
    #[error("stream ended in the middle of a message")]
    Truncated,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed message '{0}'")]
    Malformed(String),
    #[error("expected {expected}, got '{got}'")]
    UnexpectedMessage { expected: &'static str, got: String },
    #[error("player {player} declared an invalid move to site {target}")]
    InvalidMove { player: usize, target: usize },
    #[error("player channel lock poisoned")]
    Poisoned,
}

/// Invalid process arguments or a failure before any game logic runs.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StartupError {
    #[error("Usage: player pcount ID")]
    PlayerArgsCount,
    #[error("Usage: dealer deck path p1 {{p2}}")]
    DealerArgsCount,
    #[error("Invalid player count")]
    PlayerCount,
    #[error("Invalid ID")]
    PlayerId,
    #[error("Error reading deck")]
    Deck,
    #[error("Error starting process: {0}")]
    PlayerStart(String),
}

/// Which binary is reporting; exit codes differ between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Dealer,
    Player,
}

impl Role {
    /// Lower-case name used for log file names and spans.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Dealer => "dealer",
            Role::Player => "player",
        }
    }
}

/// Any error that ends a game.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid path: {0}")]
    Path(#[from] PathError),
    #[error("Communications error: {0}")]
    Comms(#[from] CommsError),
    #[error("{0}")]
    Startup(#[from] StartupError),
    #[error("Early game over")]
    EarlyGameOver,
}

impl GameError {
    /// Process exit status for this error.
    pub fn exit_code(&self, role: Role) -> i32 {
        match role {
            Role::Player => match self {
                GameError::Startup(
                    StartupError::PlayerArgsCount | StartupError::DealerArgsCount,
                ) => 1,
                GameError::Startup(StartupError::PlayerCount) => 2,
                GameError::Startup(StartupError::PlayerId) => 3,
                GameError::Startup(_) => 1,
                GameError::Path(_) => 4,
                GameError::EarlyGameOver => 5,
                GameError::Comms(_) => 6,
            },
            Role::Dealer => match self {
                GameError::Startup(StartupError::Deck) => 2,
                GameError::Startup(StartupError::PlayerStart(_)) => 4,
                GameError::Startup(_) => 1,
                GameError::Path(_) => 3,
                GameError::Comms(_) => 5,
                GameError::EarlyGameOver => 9,
            },
        }
    }
}
