//! Process session management for the gpg subprocess.
//!
//! A [`Spawner`] turns a configuration plus operation arguments into a live
//! [`Session`]: the child process with a pipe pair wired so the driver
//! writes gpg's command channel (the child's stdin) and reads its status
//! channel (the child's stdout). The trait seam exists so tests can swap in
//! a double that replays canned status text instead of running gpg.

use crate::config::GpgConfig;
use crate::errors::{GpgError, GpgResult};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

/// Flags prepended to every gpg invocation: batch/non-interactive mode, no
/// terminal, and the command/status channels pinned to fds 0 and 1 so the
/// subprocess reads protocol commands from stdin and writes status lines to
/// stdout.
pub const FIXED_ARGS: &[&str] = &[
    "--use-agent",
    "--command-fd",
    "0",
    "--status-fd",
    "1",
    "--quiet",
    "--batch",
    "--no-tty",
];

/// A live exchange with one gpg subprocess.
///
/// Reads block until data or end-of-stream; no timeout is modeled. A hung
/// subprocess shows up as a blocked read, which is an accepted external-tool
/// risk. [`Session::kill`] exists solely for unexpected-output branches and
/// must always be followed by [`Session::wait`] to reap the child.
pub trait Session {
    /// Writes one line (plus newline terminator) to the command channel and
    /// flushes it.
    fn send_line(&mut self, line: &str) -> GpgResult<()>;

    /// Reads one status line, without its line terminator. Returns `None` at
    /// end-of-stream.
    fn read_line(&mut self) -> GpgResult<Option<String>>;

    /// Drains the status channel to end-of-stream.
    fn read_to_end(&mut self) -> GpgResult<String>;

    /// Closes the driver's ends of both channels, then blocks until the
    /// subprocess exits and returns its exit status. Closing first matters:
    /// gpg sees end-of-file on its command channel and a consumer draining
    /// the status channel sees end-of-stream.
    fn wait(&mut self) -> GpgResult<i32>;

    /// Forcibly terminates the subprocess. Errors are logged, not raised.
    fn kill(&mut self);
}

/// Spawns sessions. Implemented by [`GpgSpawner`] for the real binary and by
/// a scripted double in tests; the driver picks one at construction time.
pub trait Spawner {
    /// Spawns gpg with the fixed flags plus `extra_args`.
    fn spawn(&self, config: &GpgConfig, extra_args: &[OsString]) -> GpgResult<Box<dyn Session>>;
}

/// Builds the full argument vector for one invocation.
pub(crate) fn invocation_args(extra_args: &[OsString]) -> Vec<OsString> {
    FIXED_ARGS
        .iter()
        .map(OsString::from)
        .chain(extra_args.iter().cloned())
        .collect()
}

/// The real spawner, backed by `std::process`.
pub struct GpgSpawner;

impl Spawner for GpgSpawner {
    fn spawn(&self, config: &GpgConfig, extra_args: &[OsString]) -> GpgResult<Box<dyn Session>> {
        let args = invocation_args(extra_args);
        debug!("spawning {} with {} args", config.binary_path().display(), args.len());

        let mut command = Command::new(config.binary_path());
        command
            .args(&args)
            .current_dir("/")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // gpg can block on an unread stderr, so it goes to the null sink.
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            // CREATE_NO_WINDOW: gpg is a console application and must not
            // flash an empty window when spawned from a windowed host.
            command.creation_flags(0x0800_0000);
        }

        let mut child = command.spawn().map_err(|err| {
            GpgError::Internal(format!(
                "failed to spawn {}: {}",
                config.binary_path().display(),
                err
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GpgError::Internal("child stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GpgError::Internal("child stdout not captured".to_string()))?;

        Ok(Box::new(GpgSession {
            child,
            command_channel: Some(BufWriter::new(stdin)),
            status_channel: Some(BufReader::new(stdout)),
        }))
    }
}

/// A session over a real gpg child process.
pub struct GpgSession {
    child: Child,
    command_channel: Option<BufWriter<ChildStdin>>,
    status_channel: Option<BufReader<ChildStdout>>,
}

impl Session for GpgSession {
    fn send_line(&mut self, line: &str) -> GpgResult<()> {
        let writer = self
            .command_channel
            .as_mut()
            .ok_or_else(|| GpgError::Internal("command channel already closed".to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> GpgResult<Option<String>> {
        let reader = self
            .status_channel
            .as_mut()
            .ok_or_else(|| GpgError::Internal("status channel already closed".to_string()))?;
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn read_to_end(&mut self) -> GpgResult<String> {
        let reader = self
            .status_channel
            .as_mut()
            .ok_or_else(|| GpgError::Internal("status channel already closed".to_string()))?;
        let mut output = String::new();
        reader.read_to_string(&mut output)?;
        debug!("read {} bytes of status output", output.len());
        Ok(output)
    }

    fn wait(&mut self) -> GpgResult<i32> {
        // Dropping the wrappers closes our pipe ends before reaping.
        self.command_channel.take();
        self.status_channel.take();

        let status = self.child.wait()?;
        Ok(status.code().unwrap_or(-1))
    }

    fn kill(&mut self) {
        if let Err(err) = self.child.kill() {
            warn!("failed to kill gpg subprocess: {}", err);
        }
    }
}
