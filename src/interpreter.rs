//! The shell driver.
//!
//! [`Interpreter`] owns everything that outlives a single command: the
//! program name used in diagnostics, the history ring, the last exit status,
//! and — interactively — the shell's process group and saved terminal
//! attributes. One instance serves both the interactive REPL and the
//! one-shot (`-c` / piped stdin) modes.

use crate::editor::{self, ReadLine};
use crate::history::History;
use crate::job::{self, JobControl};
use crate::parser;
use anyhow::{bail, Context, Result};
use nix::sys::signal::{kill, signal, SigHandler, Signal};
use nix::sys::termios::tcgetattr;
use nix::unistd::{getpgrp, setpgid, tcgetpgrp, tcsetpgrp, Pid};
use std::io;

/// A minimal interactive shell.
///
/// Example
/// ```no_run
/// use minish::Interpreter;
/// let mut sh = Interpreter::new("minish");
/// let status = sh.run("echo hello | cat").unwrap();
/// assert_eq!(status, 0);
/// ```
pub struct Interpreter {
    name: String,
    history: History,
    last_status: i32,
    control: Option<JobControl>,
}

impl Interpreter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: History::new(),
            last_status: 0,
            control: None,
        }
    }

    /// Parse `input` as one pipeline and run it to completion.
    ///
    /// Returns the exit status of the pipeline's last process. Blank input
    /// is a no-op that keeps the previous status.
    pub fn run(&mut self, input: &str) -> Result<i32> {
        let pipeline = parser::parse(input).map_err(anyhow::Error::new)?;
        if pipeline.is_empty() {
            return Ok(self.last_status);
        }
        let job = job::run(&self.name, &pipeline, self.control.as_ref())?;
        self.last_status = job.last_status();
        Ok(self.last_status)
    }

    /// The interactive loop: claim the terminal, then read, record, and run
    /// lines until the user exits with `^D`.
    ///
    /// A failing command is reported and the loop continues; only a dead
    /// terminal or a fatal syscall error ends the session with an error.
    pub fn repl(&mut self) -> Result<()> {
        let control = claim_terminal()?;
        ignore_job_signals()?;
        let termios = control.termios.clone();
        self.control = Some(control);

        loop {
            match editor::read_line(&self.history, &termios) {
                ReadLine::Line(line) => {
                    if line.is_empty() {
                        continue;
                    }
                    self.history.add(&line);
                    if let Err(err) = self.run(&line) {
                        eprintln!("{}: {:#}", self.name, err);
                    }
                }
                ReadLine::Exit => break,
                ReadLine::Interrupted => bail!("failed to read terminal input"),
            }
        }
        Ok(())
    }
}

/// Wait until the shell is its terminal's foreground job, then take a
/// process group of its own, seize the terminal, and save its attributes.
fn claim_terminal() -> Result<JobControl> {
    loop {
        let foreground = tcgetpgrp(io::stdin()).context("tcgetpgrp")?;
        if foreground == getpgrp() {
            break;
        }
        kill(Pid::from_raw(0), Signal::SIGTTIN).context("kill")?;
    }

    // fails with EPERM for a session leader; that is fine
    let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
    let shell_pgid = getpgrp();
    tcsetpgrp(io::stdin(), shell_pgid).context("tcsetpgrp")?;
    let termios = tcgetattr(io::stdin()).context("tcgetattr")?;
    Ok(JobControl {
        shell_pgid,
        termios,
    })
}

/// The interactive shell shrugs off job-control signals itself; children put
/// the defaults back before exec so `^C` reaches the foreground job only.
fn ignore_job_signals() -> Result<()> {
    for sig in [
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGTSTP,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
    ] {
        unsafe { signal(sig, SigHandler::SigIgn) }.context("signal")?;
    }
    unsafe { signal(Signal::SIGCHLD, SigHandler::SigDfl) }.context("signal")?;
    Ok(())
}
