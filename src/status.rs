//! Human readable picture of the board, for diagnostics only.
//!
//! ```text
//! :: Mo V1 V2 Mo Mo ::
//! 1        0
//!          2
//! ```
//!
//! The first line lists the sites. Below, each player id is printed under its site, on the row
//! matching its rank.

use std::fmt::{self, Display};

use crate::{path::Path, state::GameState};

const COLUMN_WIDTH: usize = 3;

/// Borrowing view that renders a path and the players on it.
pub struct StatusDump<'a> {
    path: &'a Path,
    state: &'a GameState,
}

impl<'a> StatusDump<'a> {
    pub fn new(path: &'a Path, state: &'a GameState) -> Self {
        StatusDump { path, state }
    }
}

impl Display for StatusDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sites = self
            .path
            .sites()
            .iter()
            .map(|s| s.kind.code())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(f, "{sites}")?;

        let site_count = self.path.site_count();
        let players_count = self.state.players_count();
        let mut grid = vec![vec![None; site_count]; players_count];
        for (id, record) in self.state.records().iter().enumerate() {
            if let Some(cell) = grid
                .get_mut(record.rank)
                .and_then(|row| row.get_mut(record.position))
            {
                *cell = Some(id);
            }
        }

        let mut printed = 0;
        for row in grid {
            if printed >= players_count {
                break;
            }
            let mut line = String::new();
            for cell in row {
                match cell {
                    Some(id) => {
                        line.push_str(&format!("{id:<COLUMN_WIDTH$}"));
                        printed += 1;
                    }
                    None => line.push_str(&" ".repeat(COLUMN_WIDTH)),
                }
            }
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

/// Final scores line, `Scores: 3,1`, in player id order.
pub struct Scores<'a>(pub &'a GameState);

impl Display for Scores<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scores = self
            .0
            .records()
            .iter()
            .map(|r| r.final_score().to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "Scores: {scores}")
    }
}
