//! Text protocol spoken between the dealer and its players.
//!
//! Every message is one newline-terminated line, except the path request, which is the single
//! byte `^`:
//!
//! | Direction         | Message            | Line                                   |
//! |-------------------|--------------------|----------------------------------------|
//! | player -> dealer  | request path       | `^` (no newline)                       |
//! | dealer -> player  | path               | `7;::-Mo1V11V22Mo1Mo1::-`              |
//! | dealer -> player  | your turn          | `YT`                                   |
//! | player -> dealer  | move               | `DO<site>`                             |
//! | dealer -> all     | move happened      | `HAP<id>,<site>,<points>,<money>,<card>` |
//! | dealer -> all     | game over          | `DONE`                                 |
//! | dealer -> all     | early game over    | `EARLY`                                |
//!
//! Writers flush before returning: the peer may be blocked on a read for that very message.

use std::{
    fmt::{self, Display},
    io::{self, BufRead, Read, Write},
    str::FromStr,
};

use tracing::trace;

use crate::{
    error::{CommsError, GameError, PathError},
    path::{max_serialized_len, Path},
    state::MoveEffect,
};

/// Sent once by each player to ask for the path.
pub const PATH_REQUEST: u8 = b'^';

/// Longest site count accepted in front of a path, in digits.
const MAX_COUNT_PREFIX: usize = 20;

/// Result of a turn, as sent to every player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveBroadcast {
    pub player: usize,
    pub site: usize,
    pub effect: MoveEffect,
}

/// Lines the dealer sends once the path was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealerMessage {
    YourTurn,
    Happened(MoveBroadcast),
    Done,
    Early,
}

/// Lines a player sends to the dealer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerMessage {
    /// Move to the given site. Naming the current site passes the turn.
    Move(usize),
}

impl Display for DealerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealerMessage::YourTurn => f.write_str("YT"),
            DealerMessage::Happened(hap) => write!(
                f,
                "HAP{},{},{},{},{}",
                hap.player,
                hap.site,
                hap.effect.point_delta,
                hap.effect.money_delta,
                hap.effect.drawn_card
            ),
            DealerMessage::Done => f.write_str("DONE"),
            DealerMessage::Early => f.write_str("EARLY"),
        }
    }
}

/// Decimal number with an optional minus sign. `FromStr` alone would also take a leading `+`.
fn field<T: FromStr>(value: Option<&str>, line: &str) -> Result<T, CommsError> {
    value
        .filter(|v| v.starts_with(|c: char| c.is_ascii_digit() || c == '-'))
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| CommsError::Malformed(line.to_owned()))
}

impl FromStr for DealerMessage {
    type Err = CommsError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line {
            "YT" => return Ok(DealerMessage::YourTurn),
            "DONE" => return Ok(DealerMessage::Done),
            "EARLY" => return Ok(DealerMessage::Early),
            _ => {}
        }
        let Some(fields) = line.strip_prefix("HAP") else {
            return Err(CommsError::Malformed(line.to_owned()));
        };
        let mut fields = fields.split(',');
        let hap = MoveBroadcast {
            player: field(fields.next(), line)?,
            site: field(fields.next(), line)?,
            effect: MoveEffect {
                point_delta: field(fields.next(), line)?,
                money_delta: field(fields.next(), line)?,
                drawn_card: field(fields.next(), line)?,
            },
        };
        if fields.next().is_some() {
            return Err(CommsError::Malformed(line.to_owned()));
        }
        Ok(DealerMessage::Happened(hap))
    }
}

impl Display for PlayerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerMessage::Move(site) => write!(f, "DO{site}"),
        }
    }
}

impl FromStr for PlayerMessage {
    type Err = CommsError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let Some(site) = line.strip_prefix("DO") else {
            return Err(CommsError::UnexpectedMessage {
                expected: "move",
                got: line.to_owned(),
            });
        };
        Ok(PlayerMessage::Move(field(Some(site), line)?))
    }
}

fn map_write_error(e: io::Error) -> CommsError {
    if e.kind() == io::ErrorKind::BrokenPipe {
        CommsError::Closed
    } else {
        CommsError::Io(e)
    }
}

/// Write `msg` followed by a newline, then flush.
pub fn write_message<W: Write + ?Sized>(
    writer: &mut W,
    msg: &impl Display,
) -> Result<(), CommsError> {
    trace!(%msg, "send");
    writeln!(writer, "{msg}").map_err(map_write_error)?;
    writer.flush().map_err(map_write_error)
}

/// Read one line, without its newline.
pub fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<String, CommsError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(CommsError::Closed);
    }
    if line.pop() != Some('\n') {
        return Err(CommsError::Truncated);
    }
    trace!(%line, "recv");
    Ok(line)
}

/// Player side: ask the dealer for the path.
pub fn request_path<W: Write + ?Sized>(writer: &mut W) -> Result<(), CommsError> {
    writer.write_all(&[PATH_REQUEST]).map_err(map_write_error)?;
    writer.flush().map_err(map_write_error)
}

/// Dealer side: wait for a player's path request.
pub fn read_path_request<R: Read + ?Sized>(reader: &mut R) -> Result<(), CommsError> {
    let mut byte = [0u8];
    match reader.read_exact(&mut byte) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(CommsError::Closed),
        Err(e) => return Err(CommsError::Io(e)),
    }
    if byte[0] != PATH_REQUEST {
        return Err(CommsError::UnexpectedMessage {
            expected: "path request",
            got: char::from(byte[0]).to_string(),
        });
    }
    Ok(())
}

/// Dealer side: send the path.
pub fn send_path<W: Write + ?Sized>(writer: &mut W, path: &Path) -> Result<(), CommsError> {
    write_message(writer, path)
}

/// Player side: receive and decode the path.
///
/// The `<count>;` prefix is read first, the rest of the line is then bounded by
/// [`max_serialized_len`]. The dealer may be interrupted before serving the path, in which case
/// `EARLY` comes instead.
pub fn read_path<R: BufRead + ?Sized>(
    reader: &mut R,
    players_count: usize,
) -> Result<Path, GameError> {
    let mut prefix = String::new();
    loop {
        let mut byte = [0u8];
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                let err = if prefix.is_empty() {
                    CommsError::Closed
                } else {
                    CommsError::Truncated
                };
                return Err(err.into());
            }
            Err(e) => return Err(CommsError::Io(e).into()),
        }
        match byte[0] {
            b';' => break,
            b'\n' if prefix == DealerMessage::Early.to_string() => {
                return Err(GameError::EarlyGameOver)
            }
            b'\n' => return Err(PathError::MissingSeparator.into()),
            b => prefix.push(char::from(b)),
        }
        if prefix.len() > MAX_COUNT_PREFIX {
            return Err(PathError::MissingSiteCount.into());
        }
    }

    let site_count = Some(prefix.as_str())
        .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|p| p.parse().ok())
        .ok_or(PathError::MissingSiteCount)?;
    let limit = max_serialized_len(players_count, site_count);

    let mut body = String::new();
    (&mut *reader)
        .take(limit as u64)
        .read_line(&mut body)
        .map_err(CommsError::from)?;
    if !body.ends_with('\n') {
        if body.len() >= limit {
            let len = prefix.len() + 1 + body.len();
            return Err(PathError::TooLong { len, limit }.into());
        }
        return Err(CommsError::Truncated.into());
    }
    body.pop();
    trace!(%prefix, %body, "recv");
    Ok(Path::parse(&format!("{prefix};{body}"), players_count)?)
}

/// Player side: read the next dealer line.
pub fn read_dealer_message<R: BufRead + ?Sized>(
    reader: &mut R,
) -> Result<DealerMessage, CommsError> {
    read_line(reader)?.parse()
}

/// Dealer side: read a move declaration, returns the target site.
pub fn read_move<R: BufRead + ?Sized>(reader: &mut R) -> Result<usize, CommsError> {
    let PlayerMessage::Move(site) = read_line(reader)?.parse::<PlayerMessage>()?;
    Ok(site)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::PathError;

    fn hap(player: usize, site: usize, points: i32, money: i32, card: u32) -> DealerMessage {
        DealerMessage::Happened(MoveBroadcast {
            player,
            site,
            effect: MoveEffect {
                point_delta: points,
                money_delta: money,
                drawn_card: card,
            },
        })
    }

    #[test]
    fn encode_dealer_messages() {
        let mut out = Vec::new();
        write_message(&mut out, &DealerMessage::YourTurn).unwrap();
        write_message(&mut out, &hap(1, 4, 0, 3, 0)).unwrap();
        write_message(&mut out, &hap(0, 2, -1, -2, 5)).unwrap();
        write_message(&mut out, &DealerMessage::Done).unwrap();
        write_message(&mut out, &DealerMessage::Early).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "YT\nHAP1,4,0,3,0\nHAP0,2,-1,-2,5\nDONE\nEARLY\n"
        );
    }

    #[test]
    fn decode_dealer_messages() {
        let mut input = Cursor::new("YT\nHAP1,4,0,3,0\nDONE\nEARLY\n");
        assert_eq!(read_dealer_message(&mut input).unwrap(), DealerMessage::YourTurn);
        assert_eq!(read_dealer_message(&mut input).unwrap(), hap(1, 4, 0, 3, 0));
        assert_eq!(read_dealer_message(&mut input).unwrap(), DealerMessage::Done);
        assert_eq!(read_dealer_message(&mut input).unwrap(), DealerMessage::Early);
        assert!(matches!(
            read_dealer_message(&mut input),
            Err(CommsError::Closed)
        ));
    }

    #[test]
    fn reject_malformed_broadcasts() {
        for line in [
            "HAP1,4,0,3",
            "HAP1,4,0,3,0,9",
            "HAPx,4,0,3,0",
            "HAP-1,4,0,3,0",
            "HA1,4,0,3,0",
            "HAP+1,+2,0,0,0",
            "HAP1,2,+3,0,0",
            "HAP1,2,0, 3,0",
            "YTX",
            "",
        ] {
            assert!(
                matches!(line.parse::<DealerMessage>(), Err(CommsError::Malformed(_))),
                "{line}"
            );
        }
    }

    #[test]
    fn moves() {
        let mut out = Vec::new();
        write_message(&mut out, &PlayerMessage::Move(12)).unwrap();
        assert_eq!(out, b"DO12\n");
        assert_eq!(read_move(&mut Cursor::new(out)).unwrap(), 12);

        assert!(matches!(
            read_move(&mut Cursor::new("DO\n")),
            Err(CommsError::Malformed(_))
        ));
        assert!(matches!(
            read_move(&mut Cursor::new("DO+3\n")),
            Err(CommsError::Malformed(_))
        ));
        assert!(matches!(
            read_move(&mut Cursor::new("GO3\n")),
            Err(CommsError::UnexpectedMessage { .. })
        ));
    }

    #[test]
    fn eof_mid_line_is_truncated() {
        assert!(matches!(
            read_move(&mut Cursor::new("DO3")),
            Err(CommsError::Truncated)
        ));
        assert!(matches!(
            read_move(&mut Cursor::new("")),
            Err(CommsError::Closed)
        ));
    }

    #[test]
    fn path_exchange() {
        let mut request = Vec::new();
        request_path(&mut request).unwrap();
        assert_eq!(request, b"^");
        read_path_request(&mut Cursor::new(request)).unwrap();
        assert!(matches!(
            read_path_request(&mut Cursor::new(b"x")),
            Err(CommsError::UnexpectedMessage { .. })
        ));
        assert!(matches!(
            read_path_request(&mut Cursor::new(b"")),
            Err(CommsError::Closed)
        ));

        let path = Path::parse("7;::-Mo1V11V22Mo1Mo1::-", 2).unwrap();
        let mut payload = Vec::new();
        send_path(&mut payload, &path).unwrap();
        assert_eq!(payload, b"7;::-Mo1V11V22Mo1Mo1::-\n");
        assert_eq!(read_path(&mut Cursor::new(payload), 2).unwrap(), path);
    }

    #[test]
    fn bad_path_payload_is_a_path_error() {
        let result = read_path(&mut Cursor::new("7;::-Mo1V11V22Mo1Mo1:-\n"), 2);
        assert!(matches!(result, Err(GameError::Path(PathError::UnknownSite { .. }))));
        let result = read_path(&mut Cursor::new(""), 2);
        assert!(matches!(result, Err(GameError::Comms(CommsError::Closed))));
    }

    #[test]
    fn early_instead_of_path() {
        let result = read_path(&mut Cursor::new("EARLY\n"), 2);
        assert!(matches!(result, Err(GameError::EarlyGameOver)));
    }

    #[test]
    fn negative_deltas_are_accepted() {
        assert_eq!("HAP0,3,-2,-1,4".parse::<DealerMessage>().unwrap(), hap(0, 3, -2, -1, 4));
    }

    #[test]
    fn path_line_is_bounded_by_its_site_count() {
        // 3 sites for 2 players allow 13 bytes, the body here is longer
        let mut input = Cursor::new("3;::-Mo1Mo1Mo1Mo1Mo1::-\nYT\n");
        let result = read_path(&mut input, 2);
        assert!(matches!(
            result,
            Err(GameError::Path(PathError::TooLong { limit: 13, .. }))
        ));
        // nothing past the budget was consumed
        assert_eq!(input.position(), 2 + 13);

        let result = read_path(&mut Cursor::new("3;::-Mo1::-"), 2);
        assert!(matches!(result, Err(GameError::Comms(CommsError::Truncated))));
    }

    #[test]
    fn path_prefix_must_be_a_count() {
        for line in ["x;::-Mo1::-\n", ";::-Mo1::-\n", "123456789012345678901234;\n"] {
            let result = read_path(&mut Cursor::new(line), 2);
            assert!(
                matches!(result, Err(GameError::Path(PathError::MissingSiteCount))),
                "{line}"
            );
        }
        let result = read_path(&mut Cursor::new("::-Mo1::-\n"), 2);
        assert!(matches!(result, Err(GameError::Path(_))));
        let result = read_path(&mut Cursor::new("YT\n"), 2);
        assert!(matches!(
            result,
            Err(GameError::Path(PathError::MissingSeparator))
        ));
    }
}
