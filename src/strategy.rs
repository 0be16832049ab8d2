//! Deterministic move selection used by every player.
//!
//! Rules, in priority order, evaluated from an origin site and never past the next barrier:
//!
//! 1. with money left, go to the nearest discount site;
//! 2. on the first pass only, go to the next site if it is a money site;
//! 3. otherwise stop at the nearest of the next visit-1, visit-2 or barrier sites.
//!
//! When the chosen site is full, the rules are evaluated again from that site with rule 2
//! disabled. A player on the final site has nowhere to go.

use crate::{
    path::{Path, SiteKind},
    state::{GameState, PlayerRecord},
};

/// Number of players on each site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy(Vec<usize>);

impl Occupancy {
    /// Snapshot of `state` on `path`.
    pub fn of(state: &GameState, path: &Path) -> Occupancy {
        let mut counts = vec![0; path.site_count()];
        for record in state.records() {
            if let Some(count) = counts.get_mut(record.position) {
                *count += 1;
            }
        }
        Occupancy(counts)
    }

    pub fn at(&self, site: usize) -> usize {
        self.0.get(site).copied().unwrap_or(0)
    }

    /// True if one more player fits on `site`.
    pub fn has_room(&self, path: &Path, site: usize) -> bool {
        path.site(site).is_some_and(|s| self.at(site) < s.capacity)
    }
}

impl From<Vec<usize>> for Occupancy {
    fn from(counts: Vec<usize>) -> Self {
        Occupancy(counts)
    }
}

/// Site the rules pick from `origin`, ignoring capacity.
fn rule_target(
    path: &Path,
    money: i32,
    origin: usize,
    limit: usize,
    money_rule: bool,
) -> Option<usize> {
    if money > 0 {
        if let Some(site) = path.next_of_kind(SiteKind::Discount, origin, limit) {
            return Some(site);
        }
    }

    let next = origin + 1;
    if money_rule
        && next <= limit
        && path.site(next).is_some_and(|s| s.kind == SiteKind::Money)
    {
        return Some(next);
    }

    [SiteKind::Visit1, SiteKind::Visit2, SiteKind::Barrier]
        .into_iter()
        .filter_map(|kind| path.next_of_kind(kind, origin, limit))
        .min()
}

/// Where `me` should move, or `None` to pass.
pub fn choose_target(path: &Path, me: &PlayerRecord, occupancy: &Occupancy) -> Option<usize> {
    if me.position + 1 >= path.site_count() {
        return None;
    }
    let limit = path.next_barrier(me.position)?;

    let first = rule_target(path, me.money, me.position, limit, true);
    std::iter::successors(first, |&full| rule_target(path, me.money, full, limit, false))
        .find(|&site| occupancy.has_room(path, site))
}
