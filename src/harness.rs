use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use crate::fixture::Fixture;
use crate::format::Format;

/// Default wall-clock budget for one decoder invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit code reported when the process never produced one of its own.
pub const NO_EXIT_CODE: i32 = -1;

/// What one decoder run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

impl InvocationOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            exit_code: NO_EXIT_CODE,
            timed_out: false,
        }
    }

    pub fn timeout() -> Self {
        Self {
            timed_out: true,
            ..Self::failed("Timeout")
        }
    }
}

/// Write `bytes` to a fresh fixture file, run `binary` on it and remove the
/// file again. Never fails: every problem ends up in the outcome.
pub fn invoke(binary: &Path, format: Format, bytes: &[u8], timeout: Duration) -> InvocationOutcome {
    let fixture = match Fixture::write(format, bytes) {
        Ok(fixture) => fixture,
        Err(err) => return InvocationOutcome::failed(format!("{err:#}")),
    };
    let outcome = run_with_timeout(binary, &[fixture.path().as_os_str()], timeout);
    fixture.remove();
    outcome
}

/// Run `program` directly (no shell) and collect its output, killing it and
/// everything it spawned once `timeout` has elapsed.
///
/// The budget covers the whole invocation, including draining output that a
/// backgrounded descendant keeps open after the program itself exits.
pub fn run_with_timeout(program: &Path, args: &[&OsStr], timeout: Duration) -> InvocationOutcome {
    match spawn_and_wait(program, args, timeout) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!(program = %program.display(), "invocation failed: {err:#}");
            InvocationOutcome::failed(format!("{err:#}"))
        }
    }
}

/// Point in time an invocation must be finished by. `None` when the timeout
/// is too large to represent, which means no limit.
type Deadline = Option<Instant>;

fn remaining(deadline: Deadline) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

fn spawn_and_wait(program: &Path, args: &[&OsStr], timeout: Duration) -> Result<InvocationOutcome> {
    let deadline: Deadline = Instant::now().checked_add(timeout);
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a timeout can take down descendants too.
        command.process_group(0);
    }
    let mut child = command
        .spawn()
        .with_context(|| format!("spawning {program:?}"))?;
    tracing::debug!(program = %program.display(), pid = child.id(), "spawned");

    // Drain both pipes while waiting; a full pipe stalls the child.
    let (tx, rx) = mpsc::channel();
    drain(Stream::Stdout, child.stdout.take(), tx.clone());
    drain(Stream::Stderr, child.stderr.take(), tx);

    let Some(status) = wait_deadline(&mut child, deadline)? else {
        terminate(&mut child);
        child.wait().context("reaping timed out child")?;
        tracing::debug!(program = %program.display(), ?timeout, "timed out");
        return Ok(InvocationOutcome::timeout());
    };

    let Some((stdout, stderr)) = collect(&rx, deadline)? else {
        // The child is gone but something it spawned still holds the pipes.
        terminate(&mut child);
        tracing::debug!(program = %program.display(), ?timeout, "timed out draining output");
        return Ok(InvocationOutcome::timeout());
    };
    let exit_code = status.code().unwrap_or(NO_EXIT_CODE);
    tracing::debug!(
        program = %program.display(),
        exit_code,
        stdout_len = stdout.len(),
        stderr_len = stderr.len(),
        "exited"
    );
    Ok(InvocationOutcome {
        stdout,
        stderr,
        exit_code,
        timed_out: false,
    })
}

fn wait_deadline(child: &mut Child, deadline: Deadline) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait().context("waiting for child")? {
            return Ok(Some(status));
        }
        let pause = match remaining(deadline) {
            Some(left) if left.is_zero() => return Ok(None),
            Some(left) => POLL_INTERVAL.min(left),
            None => POLL_INTERVAL,
        };
        thread::sleep(pause);
    }
}

/// Kill the child's whole process group. Readers blocked on its pipes see
/// end of file once every member is gone.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        tracing::warn!(pid = child.id(), "pid out of range, killing child only");
        let _ = child.kill();
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => tracing::warn!(pid, "failed to kill process group: {err}"),
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::warn!(pid = child.id(), "failed to kill timed out child: {err}");
    }
}

#[derive(Clone, Copy, Debug)]
enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, io::Result<Vec<u8>>);

fn drain<R: Read + Send + 'static>(stream: Stream, pipe: Option<R>, tx: Sender<Chunk>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let read = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        // The receiver is gone once the invocation gave up on this output.
        let _ = tx.send((stream, read));
    });
}

/// Wait for both readers until `deadline`. `None` if time ran out first.
fn collect(rx: &Receiver<Chunk>, deadline: Deadline) -> Result<Option<(String, String)>> {
    let (mut stdout, mut stderr) = (None, None);
    while stdout.is_none() || stderr.is_none() {
        let (stream, read) = match remaining(deadline) {
            Some(left) => match rx.recv_timeout(left) {
                Ok(chunk) => chunk,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => bail!("output reader exited early"),
            },
            None => rx.recv().context("output reader exited early")?,
        };
        let bytes = read.context("reading child output")?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        match stream {
            Stream::Stdout => stdout = Some(text),
            Stream::Stderr => stderr = Some(text),
        }
    }
    Ok(stdout.zip(stderr))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn captures_output_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let bin = script(&dir, "echo", "echo \"out $1\"; echo err >&2; exit 3");
        let out = run_with_timeout(&bin, &[OsStr::new("arg")], DEFAULT_TIMEOUT);
        assert_eq!(out.stdout, "out arg\n");
        assert_eq!(out.stderr, "err\n");
        assert_eq!(out.exit_code, 3);
        assert!(!out.timed_out);
    }

    #[test]
    fn missing_binary_is_an_outcome() {
        let dir = TempDir::new().unwrap();
        let out = run_with_timeout(&dir.path().join("nope"), &[], DEFAULT_TIMEOUT);
        assert_eq!(out.exit_code, NO_EXIT_CODE);
        assert!(out.stdout.is_empty());
        assert!(out.stderr.contains("spawning"), "{}", out.stderr);
    }

    #[test]
    fn non_executable_is_an_outcome() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain");
        fs::write(&path, "not a program").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        let out = run_with_timeout(&path, &[], DEFAULT_TIMEOUT);
        assert_eq!(out.exit_code, NO_EXIT_CODE);
        assert!(!out.stderr.is_empty());
    }

    #[test]
    fn slow_child_is_killed() {
        let dir = TempDir::new().unwrap();
        let bin = script(&dir, "slow", "exec sleep 5");
        let started = Instant::now();
        let out = run_with_timeout(&bin, &[], Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(out, InvocationOutcome::timeout());
        assert_eq!(out.stderr, "Timeout");
    }

    #[test]
    fn backgrounded_descendant_cannot_outlast_timeout() {
        let dir = TempDir::new().unwrap();
        let bin = script(&dir, "detach", "sleep 5 &\necho INTEGER 42\nexit 0");
        let started = Instant::now();
        let out = run_with_timeout(&bin, &[], Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
        assert_eq!(out, InvocationOutcome::timeout());
    }

    #[test]
    fn unrepresentable_timeout_means_no_limit() {
        let dir = TempDir::new().unwrap();
        let bin = script(&dir, "quick", "echo done");
        let out = run_with_timeout(&bin, &[], Duration::from_secs(u64::MAX));
        assert_eq!(out.exit_code, 0, "{}", out.stderr);
        assert_eq!(out.stdout, "done\n");
        assert!(!out.timed_out);
    }

    #[test]
    fn invoke_passes_fixture_and_removes_it() {
        let dir = TempDir::new().unwrap();
        let seen = dir.path().join("seen");
        let bin = script(
            &dir,
            "record",
            &format!("echo \"$1\" > '{}'; od -An -tx1 \"$1\"", seen.display()),
        );
        let out = invoke(&bin, Format::Asn1, &[0x05, 0x00], DEFAULT_TIMEOUT);
        assert_eq!(out.exit_code, 0, "{}", out.stderr);
        assert_eq!(out.stdout.split_whitespace().collect::<Vec<_>>(), ["05", "00"]);
        let fixture = fs::read_to_string(&seen).unwrap();
        let fixture = Path::new(fixture.trim_end());
        assert!(fixture.to_string_lossy().ends_with(".der"));
        assert!(!fixture.exists());
    }

    #[test]
    fn fixture_is_removed_after_timeout() {
        let dir = TempDir::new().unwrap();
        let seen = dir.path().join("seen");
        let bin = script(
            &dir,
            "hang",
            &format!("echo \"$1\" > '{}'; exec sleep 5", seen.display()),
        );
        let out = invoke(&bin, Format::Cbor, &[0xf6], Duration::from_millis(300));
        assert!(out.timed_out);
        let fixture = fs::read_to_string(&seen).unwrap();
        assert!(!Path::new(fixture.trim_end()).exists());
    }
}
