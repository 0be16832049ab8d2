//! Command line arguments of the `dealer` and `player` binaries.
//!
//! Argument slices exclude the program name.

use std::{fs::File, io::Read, path::PathBuf};

use crate::error::StartupError;

/// `player <playersCount> <id>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerArgs {
    pub players_count: usize,
    pub id: usize,
}

fn parse_digits(arg: &str) -> Option<usize> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    arg.parse().ok()
}

pub fn parse_player_args(args: &[String]) -> Result<PlayerArgs, StartupError> {
    let [count, id] = args else {
        return Err(StartupError::PlayerArgsCount);
    };
    let players_count = parse_digits(count)
        .filter(|&n| n >= 1)
        .ok_or(StartupError::PlayerCount)?;
    let id = parse_digits(id)
        .filter(|&id| id < players_count)
        .ok_or(StartupError::PlayerId)?;
    Ok(PlayerArgs { players_count, id })
}

/// `dealer <deck> <path> <player>...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealerArgs {
    pub deck: PathBuf,
    pub path: PathBuf,
    /// One program per player, in id order.
    pub players: Vec<String>,
}

pub fn parse_dealer_args(args: &[String]) -> Result<DealerArgs, StartupError> {
    match args {
        [deck, path, players @ ..] if !players.is_empty() => Ok(DealerArgs {
            deck: PathBuf::from(deck),
            path: PathBuf::from(path),
            players: players.to_vec(),
        }),
        _ => Err(StartupError::DealerArgsCount),
    }
}

/// The deck content is not used, it only has to be readable.
pub fn check_deck(deck: &std::path::Path) -> Result<(), StartupError> {
    let mut buf = Vec::new();
    File::open(deck)
        .and_then(|mut f| f.read_to_end(&mut buf))
        .map_err(|_| StartupError::Deck)?;
    Ok(())
}
