//! Per-player records and the rules that tie them together: rank assignment, turn selection
//! and the end-of-game predicate.
//!
//! The dealer owns the authoritative [`GameState`]. Each player keeps its own copy, in which only
//! its own money and points are meaningful.

use crate::path::{Path, SiteKind};

/// Money every player starts with.
pub const INITIAL_MONEY: i32 = 7;

/// Money gained when stopping on a [`SiteKind::Money`] site.
pub const MONEY_SITE_GAIN: i32 = 3;

/// What is known about one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Index of the occupied site.
    pub position: usize,
    /// Arrival order among the players on the same site, later arrivals rank higher.
    pub rank: usize,
    pub money: i32,
    pub points: i32,
    /// Number of [`SiteKind::Visit1`] sites stopped on.
    pub v1_visits: u32,
    /// Number of [`SiteKind::Visit2`] sites stopped on.
    pub v2_visits: u32,
}

impl Default for PlayerRecord {
    fn default() -> Self {
        PlayerRecord {
            position: 0,
            rank: 0,
            money: INITIAL_MONEY,
            points: 0,
            v1_visits: 0,
            v2_visits: 0,
        }
    }
}

impl PlayerRecord {
    /// Points at the end of the game: earned points plus one per visit.
    pub fn final_score(&self) -> i64 {
        i64::from(self.points) + i64::from(self.v1_visits) + i64::from(self.v2_visits)
    }
}

/// Rank of every player given only their positions.
///
/// A player's rank is the number of players with a higher id on the same site, which makes the
/// lowest id the most recent arrival.
pub fn calculate_rankings(positions: &[usize]) -> Vec<usize> {
    positions
        .iter()
        .enumerate()
        .map(|(id, position)| {
            positions[id + 1..]
                .iter()
                .filter(|other| *other == position)
                .count()
        })
        .collect()
}

/// Effect of a move on the mover's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveEffect {
    pub point_delta: i32,
    pub money_delta: i32,
    /// Drawn card, `0` when none.
    pub drawn_card: u32,
}

impl MoveEffect {
    /// Effect of stopping on a site of `kind`.
    ///
    /// Discount and draw sites carry no effect yet: the money to points conversion is not part
    /// of the rules the dealer applies, and there is no deck.
    pub fn of_site(kind: SiteKind) -> MoveEffect {
        match kind {
            SiteKind::Money => MoveEffect {
                money_delta: MONEY_SITE_GAIN,
                ..MoveEffect::default()
            },
            _ => MoveEffect::default(),
        }
    }
}

/// Records of every player, indexed by player id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    records: Vec<PlayerRecord>,
}

impl GameState {
    /// Everybody on the first site, ranked by [`calculate_rankings`].
    pub fn new(players_count: usize) -> GameState {
        let rankings = calculate_rankings(&vec![0; players_count]);
        let records = rankings
            .into_iter()
            .map(|rank| PlayerRecord {
                rank,
                ..PlayerRecord::default()
            })
            .collect();
        GameState { records }
    }

    /// Build a state from explicit records.
    pub fn from_records(records: Vec<PlayerRecord>) -> GameState {
        GameState { records }
    }

    pub fn players_count(&self) -> usize {
        self.records.len()
    }

    pub fn record(&self, player: usize) -> Option<&PlayerRecord> {
        self.records.get(player)
    }

    pub fn records(&self) -> &[PlayerRecord] {
        &self.records
    }

    pub fn positions(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.position).collect()
    }

    /// Number of players on `site`, `except` excluded.
    pub fn occupancy_except(&self, site: usize, except: Option<usize>) -> usize {
        self.records
            .iter()
            .enumerate()
            .filter(|(id, r)| Some(*id) != except && r.position == site)
            .count()
    }

    /// Number of players on `site`.
    pub fn occupancy(&self, site: usize) -> usize {
        self.occupancy_except(site, None)
    }

    /// Move `player` to `site` as the newest arrival there.
    ///
    /// Moving a player to the site it already occupies changes nothing, which makes applying
    /// the same move twice harmless. Capacity is not checked.
    pub fn arrive(&mut self, player: usize, site: usize) {
        if self.records[player].position == site {
            return;
        }
        let rank = self.occupancy_except(site, Some(player));
        let record = &mut self.records[player];
        record.position = site;
        record.rank = rank;
    }

    /// Apply the ledger part of a move.
    pub fn credit(&mut self, player: usize, effect: &MoveEffect) {
        let record = &mut self.records[player];
        record.points += effect.point_delta;
        record.money += effect.money_delta;
    }

    /// Count a stop on `kind` in the visit tallies.
    pub fn count_visit(&mut self, player: usize, kind: SiteKind) {
        let record = &mut self.records[player];
        match kind {
            SiteKind::Visit1 => record.v1_visits += 1,
            SiteKind::Visit2 => record.v2_visits += 1,
            _ => {}
        }
    }

    /// The player who acts next: the furthest behind, and among those the latest arrival.
    pub fn next_player(&self) -> Option<usize> {
        self.records
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.position.cmp(&b.position).then(b.rank.cmp(&a.rank)))
            .map(|(id, _)| id)
    }

    /// True once a player on the final site has been reached by every other player.
    pub fn is_finished(&self, path: &Path) -> bool {
        let last = path.last_index();
        let max_rank = self.players_count().saturating_sub(1);
        self.records
            .iter()
            .any(|r| r.position == last && r.rank == max_rank)
    }
}
