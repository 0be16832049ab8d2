//! Byte streams between the dealer and its players.
//!
//! The dealer only needs, for every player, something to read its messages from and something
//! to write messages to. A [`ChannelFactory`] provides those: [`ProcessFactory`] launches one
//! child process per player and talks to it through its stdin/stdout, [`InProcessFactory`] runs
//! players on threads and connects them with in-memory [`pipe`]s.

use std::{
    io::{self, BufRead, BufReader, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use tracing::{debug, info, instrument, warn};

use crate::{error::GameError, player::run_player};

/// The dealer's end of the connection to one player.
pub struct PlayerChannel {
    /// Messages from the player.
    pub reader: Box<dyn BufRead + Send>,
    /// Messages to the player.
    pub writer: Box<dyn Write + Send>,
}

/// Starts players and hands out their channels.
pub trait ChannelFactory {
    /// Start player `id` of a `players_count` players game.
    fn open(&mut self, id: usize, players_count: usize) -> anyhow::Result<PlayerChannel>;

    /// Wait for every started player to exit, for at most `timeout` overall.
    fn wait_all(&mut self, timeout: Duration) -> anyhow::Result<()>;
}

fn create_process(command: &str, args: &[String], allow_stderr: bool) -> anyhow::Result<Child> {
    let mut cmd = Command::new(command);
    cmd.args(args).stdin(Stdio::piped()).stdout(Stdio::piped());
    if !allow_stderr {
        cmd.stderr(Stdio::null());
    }
    // keep players out of the terminal's process group: interrupts are for the dealer, which
    // forwards them as an early game over
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut cmd, 0);
    cmd.spawn()
        .with_context(|| format!("command '{command}' not found"))
}

/// A player child process. Killed on drop if it did not exit.
#[derive(Debug)]
pub struct PlayerProcess {
    pub id: usize,
    pub child: Child,
    cleaned_up: bool,
}

impl PlayerProcess {
    /// Wait until `deadline` for the process to exit.
    pub fn wait_until(&mut self, deadline: Instant) -> anyhow::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = self.child.try_wait().context("could not wait for player")? {
                self.cleaned_up = true;
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn try_kill(&mut self) -> anyhow::Result<()> {
        self.child.kill().context("could not kill process")?;
        self.child.wait().context("could not reap process")?;
        self.cleaned_up = true;
        Ok(())
    }
}

impl Drop for PlayerProcess {
    fn drop(&mut self) {
        if !self.cleaned_up {
            if let Err(e) = self.try_kill() {
                warn!(player = self.id, "could not kill player on drop: {e:#}");
            }
        }
    }
}

/// Launches `<program> <players_count> <id>` for every player.
pub struct ProcessFactory {
    programs: Vec<String>,
    allow_stderr: bool,
    processes: Vec<PlayerProcess>,
}

impl ProcessFactory {
    /// `programs[id]` is the executable of player `id`.
    pub fn new(programs: Vec<String>, allow_stderr: bool) -> Self {
        ProcessFactory {
            programs,
            allow_stderr,
            processes: vec![],
        }
    }
}

impl ChannelFactory for ProcessFactory {
    #[instrument(skip(self))]
    fn open(&mut self, id: usize, players_count: usize) -> anyhow::Result<PlayerChannel> {
        let program = self
            .programs
            .get(id)
            .ok_or_else(|| anyhow!("no program for player {id}"))?;
        let args = [players_count.to_string(), id.to_string()];

        let mut child = create_process(program, &args, self.allow_stderr)?;
        let stdin = child.stdin.take().context("player stdin not piped")?;
        let stdout = child.stdout.take().context("player stdout not piped")?;
        debug!(pid = child.id(), "player started");

        self.processes.push(PlayerProcess {
            id,
            child,
            cleaned_up: false,
        });
        Ok(PlayerChannel {
            reader: Box::new(BufReader::new(stdout)),
            writer: Box::new(stdin),
        })
    }

    #[instrument(skip(self))]
    fn wait_all(&mut self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = Instant::now() + timeout;
        for process in &mut self.processes {
            match process.wait_until(deadline)? {
                Some(status) => info!(player = process.id, %status, "player exited"),
                None => {
                    warn!(player = process.id, "player still running, killing it");
                    process.try_kill()?;
                }
            }
        }
        self.processes.clear();
        Ok(())
    }
}

/// Runs every player on its own thread of the current process.
#[derive(Default)]
pub struct InProcessFactory {
    handles: Vec<(usize, JoinHandle<Result<(), GameError>>)>,
    results: Vec<(usize, Result<(), GameError>)>,
}

impl InProcessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// How each joined player ended, by id.
    pub fn results(&self) -> &[(usize, Result<(), GameError>)] {
        &self.results
    }
}

impl ChannelFactory for InProcessFactory {
    fn open(&mut self, id: usize, players_count: usize) -> anyhow::Result<PlayerChannel> {
        let (to_player, player_input) = pipe();
        let (player_output, from_player) = pipe();

        let handle = thread::Builder::new()
            .name(format!("player-{id}"))
            .spawn(move || {
                run_player(players_count, id, BufReader::new(player_input), player_output)
            })
            .context("could not spawn player thread")?;
        self.handles.push((id, handle));

        Ok(PlayerChannel {
            reader: Box::new(BufReader::new(from_player)),
            writer: Box::new(to_player),
        })
    }

    fn wait_all(&mut self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = Instant::now() + timeout;
        while self.handles.iter().any(|(_, h)| !h.is_finished()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        let mut stuck = vec![];
        for (id, handle) in self.handles.drain(..) {
            if !handle.is_finished() {
                stuck.push(id);
                continue;
            }
            let result = handle
                .join()
                .map_err(|_| anyhow!("player {id} panicked"))?;
            info!(player = id, ?result, "player finished");
            self.results.push((id, result));
        }
        if !stuck.is_empty() {
            // threads cannot be killed, they end with the process
            warn!(?stuck, "players did not finish in time");
        }
        Ok(())
    }
}

/// Writing end of an in-memory pipe. Dropping it ends the stream for the reader.
pub struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

/// Reading end of an in-memory pipe.
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

/// A unidirectional, unbounded byte stream between two threads.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel();
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            pending: vec![],
            offset: 0,
        },
    )
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.offset >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                // every writer is gone
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.offset);
        buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}
