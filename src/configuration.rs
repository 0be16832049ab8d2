//! Config for the dealer and player behaviors
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional. Flags are enabled by the case-insensitive value `"true"`.
//!
//! - `RACE_VERBOSE` — Print the board after every turn and the final scores (default: `true`)
//! - `RACE_LOG` — Log to a timestamped file instead of stderr (default: `false`)
//! - `RACE_CHECK_CAPACITY` — Reject moves onto full sites on the dealer side (default: `false`)
//! - `RACE_IN_PROCESS` — Run players as threads of the dealer process (default: `false`)
//! - `RACE_DEBUG_PLAYER_STDERR` — Let player processes write to stderr (default: `false`)
//! - `RACE_SHUTDOWN_TIMEOUT_MS` — How long to wait for players to exit (default: `1000`)

use std::time::Duration;

use crate::scheduler::MovePolicy;

/// Configuration for dealer and player behaviors.
#[derive(Debug, Clone, Copy)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) move_policy: MovePolicy,
    pub(crate) in_process_players: bool,
    pub(crate) debug_player_stderr: bool,
    pub(crate) shutdown_timeout: Duration,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The dealer prints the board after every turn and the scores at the end.
    /// - Logs go to stderr, warnings and errors only.
    /// - The dealer trusts players to respect site capacities.
    /// - Every player runs in its own process, with stderr discarded.
    /// - Players get one second to exit once the game is over.
    pub fn new() -> Self {
        Self {
            verbose: true,
            log: false,
            move_policy: MovePolicy::Trusting,
            in_process_players: false,
            debug_player_stderr: false,
            shutdown_timeout: Duration::from_millis(1000),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Any unset or unparsable variable results in the default value for its field.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        let default = Self::new();
        let move_policy = if get_env_flag("RACE_CHECK_CAPACITY", false) {
            MovePolicy::CapacityChecked
        } else {
            MovePolicy::Trusting
        };
        let shutdown_timeout = std::env::var("RACE_SHUTDOWN_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(default.shutdown_timeout);

        Self {
            verbose: get_env_flag("RACE_VERBOSE", default.verbose),
            log: get_env_flag("RACE_LOG", default.log),
            move_policy,
            in_process_players: get_env_flag("RACE_IN_PROCESS", default.in_process_players),
            debug_player_stderr: get_env_flag(
                "RACE_DEBUG_PLAYER_STDERR",
                default.debug_player_stderr,
            ),
            shutdown_timeout,
        }
    }

    /// Enable or disable board and score printing.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Choose how the dealer validates declared moves.
    pub fn with_move_policy(mut self, value: MovePolicy) -> Self {
        self.move_policy = value;
        self
    }

    /// Run players as threads instead of processes.
    pub fn with_in_process_players(mut self, value: bool) -> Self {
        self.in_process_players = value;
        self
    }

    /// Enable or disable player stderr output (debug purposes only).
    pub fn with_debug_player_stderr(mut self, value: bool) -> Self {
        self.debug_player_stderr = value;
        self
    }

    /// How long to wait for players to exit before killing them.
    pub fn with_shutdown_timeout(mut self, value: Duration) -> Self {
        self.shutdown_timeout = value;
        self
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn in_process_players(&self) -> bool {
        self.in_process_players
    }

    pub fn debug_player_stderr(&self) -> bool {
        self.debug_player_stderr
    }

    pub fn move_policy(&self) -> MovePolicy {
        self.move_policy
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
