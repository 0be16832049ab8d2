//! The board: an ordered sequence of typed, capacity-bounded sites.
//!
//! A path is described by a single line of text:
//!
//! ```text
//! 7;::-Mo1V11V22Mo1Mo1::-
//! ```
//!
//! The leading integer is the number of sites, then every site follows without separator. A
//! barrier is written `::-`, any other site is a two-character code followed by its capacity.
//! Barriers always hold every player, so their capacity is the player count of the game.
//!
//! The serialized form is bounded by [`max_serialized_len`], which depends only on the number
//! of players and the number of sites. Parsing rejects descriptions that do not fit.

use std::fmt::{self, Display};

use tracing::{debug, instrument};

use crate::error::PathError;

/// How a barrier is spelled on the wire.
pub const BARRIER_TOKEN: &str = "::-";

/// What happens to a player stopping on a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteKind {
    /// Gain money.
    Money,
    /// Counts towards the first visit tally.
    Visit1,
    /// Counts towards the second visit tally.
    Visit2,
    /// Convert money to points.
    Discount,
    /// Draw a card.
    Draw,
    /// Mandatory stop. Also marks both ends of the path.
    Barrier,
}

impl SiteKind {
    /// Two-character code of this kind.
    pub fn code(&self) -> &'static str {
        match self {
            SiteKind::Money => "Mo",
            SiteKind::Visit1 => "V1",
            SiteKind::Visit2 => "V2",
            SiteKind::Discount => "Do",
            SiteKind::Draw => "Ri",
            SiteKind::Barrier => "::",
        }
    }

    /// Inverse of [`SiteKind::code`].
    pub fn from_code(code: &str) -> Option<SiteKind> {
        match code {
            "Mo" => Some(SiteKind::Money),
            "V1" => Some(SiteKind::Visit1),
            "V2" => Some(SiteKind::Visit2),
            "Do" => Some(SiteKind::Discount),
            "Ri" => Some(SiteKind::Draw),
            "::" => Some(SiteKind::Barrier),
            _ => None,
        }
    }
}

/// A position on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub kind: SiteKind,
    pub capacity: usize,
}

impl Site {
    pub fn new(kind: SiteKind, capacity: usize) -> Site {
        Site { kind, capacity }
    }

    pub fn is_barrier(&self) -> bool {
        self.kind == SiteKind::Barrier
    }
}

/// Number of decimal digits needed to print `n`.
fn digit_count(n: usize) -> usize {
    let mut digits = 1;
    let mut rest = n / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits
}

/// Maximum number of bytes a serialized path can take, newline and terminator included.
///
/// Every site takes its two-character code plus at most as many capacity digits as the player
/// count has, which also covers the three-character barrier token.
pub fn max_serialized_len(players_count: usize, site_count: usize) -> usize {
    digit_count(site_count)
        .saturating_add(1)
        .saturating_add(site_count.saturating_mul(2 + digit_count(players_count)))
        .saturating_add(2)
}

/// The fixed board of a game. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    sites: Vec<Site>,
    players_count: usize,
}

impl Path {
    /// Build a path from already decoded sites.
    ///
    /// Barrier capacities are set to `players_count`.
    pub fn new(mut sites: Vec<Site>, players_count: usize) -> Result<Path, PathError> {
        for site in sites.iter_mut().filter(|s| s.is_barrier()) {
            site.capacity = players_count;
        }
        let path = Path {
            sites,
            players_count,
        };
        path.validate()?;
        Ok(path)
    }

    /// Decode a textual description. A single trailing newline is accepted.
    #[instrument(level = "debug")]
    pub fn parse(text: &str, players_count: usize) -> Result<Path, PathError> {
        let line = text.strip_suffix('\n').unwrap_or(text);

        let digits = line.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(PathError::MissingSiteCount);
        }
        let declared: usize = line[..digits]
            .parse()
            .map_err(|_| PathError::MissingSiteCount)?;
        let Some(body) = line[digits..].strip_prefix(';') else {
            return Err(PathError::MissingSeparator);
        };

        let sites = parse_sites(body, players_count)?;
        if sites.len() != declared {
            return Err(PathError::SiteCountMismatch {
                declared,
                found: sites.len(),
            });
        }

        let path = Path {
            sites,
            players_count,
        };
        path.validate()?;
        debug!(sites = path.site_count(), "path parsed");
        Ok(path)
    }

    /// Read the first line of `file` as a path description.
    pub fn from_file(
        file: impl AsRef<std::path::Path>,
        players_count: usize,
    ) -> Result<Path, PathError> {
        let content = std::fs::read_to_string(file.as_ref())
            .map_err(|e| PathError::Unreadable(e.to_string()))?;
        let line = content.lines().next().unwrap_or_default();
        Path::parse(line, players_count)
    }

    fn validate(&self) -> Result<(), PathError> {
        if self.sites.len() < 2 {
            return Err(PathError::TooFewSites(self.sites.len()));
        }
        if !self.sites[0].is_barrier() {
            return Err(PathError::FirstNotBarrier);
        }
        if !self.sites[self.sites.len() - 1].is_barrier() {
            return Err(PathError::LastNotBarrier);
        }
        let limit = max_serialized_len(self.players_count, self.sites.len());
        // newline and terminator
        let len = self.serialize().len() + 2;
        if len > limit {
            return Err(PathError::TooLong { len, limit });
        }
        Ok(())
    }

    /// Exact inverse of [`Path::parse`], without the trailing newline.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Index of the final barrier.
    pub fn last_index(&self) -> usize {
        self.sites.len() - 1
    }

    pub fn players_count(&self) -> usize {
        self.players_count
    }

    pub fn site(&self, index: usize) -> Option<&Site> {
        self.sites.get(index)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Nearest site of `kind` strictly after `from` and no further than `limit`.
    pub fn next_of_kind(&self, kind: SiteKind, from: usize, limit: usize) -> Option<usize> {
        let end = limit.min(self.last_index());
        (from + 1..=end).find(|&i| self.sites[i].kind == kind)
    }

    /// Nearest barrier strictly after `from`.
    pub fn next_barrier(&self, from: usize) -> Option<usize> {
        self.next_of_kind(SiteKind::Barrier, from, self.last_index())
    }
}

fn parse_sites(body: &str, players_count: usize) -> Result<Vec<Site>, PathError> {
    let bytes = body.as_bytes();
    let mut sites = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let index = sites.len();
        if body[pos..].starts_with(BARRIER_TOKEN) {
            sites.push(Site::new(SiteKind::Barrier, players_count));
            pos += BARRIER_TOKEN.len();
            continue;
        }

        let code = body.get(pos..pos + 2).ok_or_else(|| PathError::UnknownSite {
            index,
            code: body[pos..].to_owned(),
        })?;
        let kind = match SiteKind::from_code(code) {
            Some(SiteKind::Barrier) | None => {
                return Err(PathError::UnknownSite {
                    index,
                    code: code.to_owned(),
                })
            }
            Some(kind) => kind,
        };
        pos += 2;

        let digits = bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return Err(PathError::MissingCapacity { index });
        }
        let capacity = body[pos..pos + digits]
            .parse()
            .map_err(|_| PathError::MissingCapacity { index })?;
        pos += digits;

        sites.push(Site::new(kind, capacity));
    }

    Ok(sites)
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.sites.len())?;
        for site in &self.sites {
            if site.is_barrier() {
                f.write_str(BARRIER_TOKEN)?;
            } else {
                write!(f, "{}{}", site.kind.code(), site.capacity)?;
            }
        }
        Ok(())
    }
}
