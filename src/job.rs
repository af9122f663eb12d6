//! Launching a parsed pipeline.
//!
//! One child per process, wired stdin-to-stdout with pipes. In an interactive
//! shell every child of a job joins one process group — the first child's pid
//! — and that group is given the controlling terminal for the duration of the
//! job. `setpgid` is issued from both the parent and the child because either
//! side can win the race between `fork` and the child's first instructions;
//! the terminal handoff happens in the child *before* default signal
//! dispositions are restored, while SIGTTOU is still ignored.
//!
//! The parent then blocks in `wait(2)` until every child of the job has been
//! reaped, records each exit or signal status, and finally takes the terminal
//! back.

use crate::parser::{Pipeline, Process, RedirKind, RedirSource, Redirection};
use anyhow::{anyhow, bail, Context, Result};
use nix::fcntl::{fcntl, open, FcntlArg, OFlag};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::stat::{stat, Mode};
use nix::sys::termios::{tcsetattr, SetArg, Termios};
use nix::sys::wait::{wait, WaitStatus};
use nix::unistd::{
    close, dup2, execv, fork, getpgrp, getpid, pipe, setpgid, tcsetpgrp, ForkResult, Pid,
};
use std::ffi::CString;
use std::io;
use std::os::fd::{IntoRawFd, RawFd};

const STDIN: RawFd = 0;
const STDOUT: RawFd = 1;

/// Terminal state an interactive shell carries between jobs: its own process
/// group and the attributes to reinstate once a job finishes.
pub struct JobControl {
    pub shell_pgid: Pid,
    pub termios: Termios,
}

/// How one launched process ended, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Exited(i32),
    Signaled(Signal),
}

impl Status {
    /// Shell-convention exit code: 128+N for a death by signal N.
    pub fn code(&self) -> i32 {
        match self {
            Status::Running => -1,
            Status::Exited(code) => *code,
            Status::Signaled(sig) => 128 + *sig as i32,
        }
    }
}

/// One forked member of a job.
#[derive(Debug)]
pub struct Launched {
    pub pid: Pid,
    pub status: Status,
}

/// A launched pipeline: the process group shared by its members and the
/// members themselves, in pipeline order.
#[derive(Debug)]
pub struct Job {
    pub pgid: Pid,
    pub procs: Vec<Launched>,
}

impl Job {
    /// Exit code of the final process in the pipeline.
    pub fn last_status(&self) -> i32 {
        self.procs.last().map(|p| p.status.code()).unwrap_or(0)
    }
}

/// Fork, wire, and wait for a whole pipeline. On return every member has
/// been reaped and, interactively, the terminal is back in the shell's
/// hands.
pub fn run(shname: &str, pipeline: &Pipeline, control: Option<&JobControl>) -> Result<Job> {
    for proc in &pipeline.procs {
        if proc.argv.is_empty() {
            bail!("missing command name");
        }
    }

    let mut job = launch(shname, pipeline, control)?;
    let waited = wait_all(&mut job);
    let restored = match control {
        Some(control) => restore_terminal(control),
        None => Ok(()),
    };
    waited?;
    restored?;

    if control.is_some() && job.procs.last().map(|p| p.status) == Some(Status::Signaled(Signal::SIGINT))
    {
        // the kernel already echoed ^C; finish the line
        println!();
    }
    Ok(job)
}

fn launch(shname: &str, pipeline: &Pipeline, control: Option<&JobControl>) -> Result<Job> {
    let count = pipeline.procs.len();
    let mut procs = Vec::with_capacity(count);
    let mut pgid: Option<Pid> = None;
    let mut in_fd: RawFd = STDIN;

    for (i, proc) in pipeline.procs.iter().enumerate() {
        let (next_in, out_fd) = if i + 1 < count {
            let (read_end, write_end) = pipe().context("pipe")?;
            (Some(read_end.into_raw_fd()), write_end.into_raw_fd())
        } else {
            (None, STDOUT)
        };

        match unsafe { fork() }.context("fork")? {
            ForkResult::Child => child(shname, proc, in_fd, out_fd, pgid, control.is_some()),
            ForkResult::Parent { child } => {
                if control.is_some() {
                    // mirror of the child's own setpgid; whichever runs
                    // first wins the race
                    let _ = setpgid(child, pgid.unwrap_or(child));
                    pgid.get_or_insert(child);
                }
                procs.push(Launched {
                    pid: child,
                    status: Status::Running,
                });
            }
        }

        if in_fd != STDIN {
            let _ = close(in_fd);
        }
        if out_fd != STDOUT {
            let _ = close(out_fd);
        }
        in_fd = next_in.unwrap_or(STDIN);
    }

    Ok(Job {
        pgid: pgid.unwrap_or_else(getpgrp),
        procs,
    })
}

fn wait_all(job: &mut Job) -> Result<()> {
    let mut remaining = job.procs.len();
    while remaining > 0 {
        let (pid, status) = match wait().context("wait")? {
            WaitStatus::Exited(pid, code) => (pid, Status::Exited(code)),
            WaitStatus::Signaled(pid, sig, _) => (pid, Status::Signaled(sig)),
            other => bail!("wait: unexpected child state {other:?}"),
        };
        let Some(entry) = job.procs.iter_mut().find(|p| p.pid == pid) else {
            bail!("wait: reaped unknown child {pid}");
        };
        entry.status = status;
        remaining -= 1;
    }
    Ok(())
}

fn restore_terminal(control: &JobControl) -> Result<()> {
    tcsetpgrp(io::stdin(), control.shell_pgid).context("tcsetpgrp")?;
    tcsetattr(io::stdin(), SetArg::TCSADRAIN, &control.termios).context("tcsetattr")?;
    Ok(())
}

/// The forked side. Never returns: either the process image is replaced or a
/// diagnostic goes to stderr and the child exits 1.
fn child(
    shname: &str,
    proc: &Process,
    in_fd: RawFd,
    out_fd: RawFd,
    pgid: Option<Pid>,
    interactive: bool,
) -> ! {
    if let Err(err) = child_setup(proc, in_fd, out_fd, pgid, interactive) {
        eprintln!("{shname}: {err:#}");
    }
    std::process::exit(1);
}

fn child_setup(
    proc: &Process,
    in_fd: RawFd,
    out_fd: RawFd,
    pgid: Option<Pid>,
    interactive: bool,
) -> Result<()> {
    if interactive {
        // 0 means "become the group leader": the first child names the group
        setpgid(Pid::from_raw(0), pgid.unwrap_or(Pid::from_raw(0))).context("setpgid")?;
        if in_fd == STDIN {
            // must precede resetting SIGTTOU, which is still ignored here
            tcsetpgrp(io::stdin(), pgid.unwrap_or_else(getpid)).context("tcsetpgrp")?;
        }
    }

    for sig in [
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGTSTP,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
        Signal::SIGCHLD,
    ] {
        unsafe { signal(sig, SigHandler::SigDfl) }.context("signal")?;
    }

    if in_fd != STDIN {
        dup2(in_fd, STDIN).context("dup2")?;
        let _ = close(in_fd);
    }
    if out_fd != STDOUT {
        dup2(out_fd, STDOUT).context("dup2")?;
        let _ = close(out_fd);
    }
    for redir in &proc.redirs {
        apply_redirection(redir)?;
    }

    for assignment in &proc.env {
        if let Some((name, value)) = assignment.split_once('=') {
            std::env::set_var(name, value);
        }
    }

    let path = resolve(&proc.argv[0]).ok_or_else(|| anyhow!("{}: command not found", proc.argv[0]))?;
    let path_c = CString::new(path.clone()).context("command path contains NUL")?;
    let argv_c = proc
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .context("argument contains NUL")?;
    match execv(&path_c, &argv_c) {
        Ok(never) => match never {},
        Err(err) => Err(anyhow::Error::new(err).context(path)),
    }
}

/// Make `redir.fd` refer to the redirection's source, in list order.
fn apply_redirection(redir: &Redirection) -> Result<()> {
    let (src, opened) = match &redir.source {
        RedirSource::Path(path) => {
            let flags = match redir.kind {
                RedirKind::PathIn => OFlag::O_RDONLY,
                RedirKind::PathTrunc => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                RedirKind::PathAppend => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
                RedirKind::PathInOut => OFlag::O_RDWR | OFlag::O_CREAT,
                RedirKind::FdIn | RedirKind::FdOut => {
                    unreachable!("descriptor redirection carrying a path")
                }
            };
            let mode = Mode::from_bits_truncate(0o666);
            let fd = open(path.as_str(), flags, mode).with_context(|| path.clone())?;
            (fd, true)
        }
        RedirSource::Fd(fd) => (*fd, false),
    };

    if src == redir.fd {
        return Ok(());
    }
    // the target may or may not be open; either way the slot must be free
    let _ = close(redir.fd);
    let landed = fcntl(src, FcntlArg::F_DUPFD(redir.fd)).context("fcntl")?;
    if landed != redir.fd {
        bail!("descriptor duplication landed on {landed}, wanted {}", redir.fd);
    }
    if opened {
        let _ = close(src);
    }
    Ok(())
}

/// Resolve `argv[0]`: verbatim when it names a path, otherwise the first
/// `$PATH` directory whose candidate exists. The probe is `stat`, not
/// `access(X_OK)`, so a non-executable match earlier on `$PATH` wins over a
/// later executable one.
fn resolve(argv0: &str) -> Option<String> {
    if argv0.contains('/') {
        return Some(argv0.to_string());
    }
    let path = std::env::var("PATH").ok()?;
    for dir in path.split(':') {
        if dir.is_empty() {
            continue;
        }
        let candidate = format!("{dir}/{argv0}");
        if stat(candidate.as_str()).is_ok() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_shell_conventions() {
        assert_eq!(Status::Exited(0).code(), 0);
        assert_eq!(Status::Exited(3).code(), 3);
        assert_eq!(Status::Signaled(Signal::SIGINT).code(), 130);
        assert_eq!(Status::Signaled(Signal::SIGKILL).code(), 137);
    }

    #[test]
    fn resolve_uses_paths_with_separators_verbatim() {
        assert_eq!(resolve("/no/such/place").as_deref(), Some("/no/such/place"));
        assert_eq!(resolve("./also/relative").as_deref(), Some("./also/relative"));
    }

    #[test]
    fn resolve_searches_path_directories() {
        let found = resolve("sh").expect("sh should be on PATH");
        assert!(found.ends_with("/sh"), "resolved to {found}");
        assert!(resolve("no_such_program_zz").is_none());
    }
}
