use anyhow::{Context, Result};
use argh::FromArgs;
use minish::{term, Interpreter};
use nix::sys::termios::tcgetattr;
use std::io::{self, IsTerminal, Read};

#[derive(FromArgs)]
/// A small interactive POSIX-style shell.
struct Options {
    /// run a single command and exit
    #[argh(option, short = 'c', arg_name = "command")]
    command: Option<String>,

    /// print the code of every input byte until ^D (terminal debugging aid)
    #[argh(switch, short = 'D')]
    debug_input: bool,
}

fn main() {
    let options: Options = argh::from_env();
    let name = program_name();
    if let Err(err) = run(&name, options) {
        eprintln!("{name}: {err:#}");
        std::process::exit(1);
    }
}

fn run(name: &str, options: Options) -> Result<()> {
    if options.debug_input {
        return debug_input_mode();
    }

    let mut interpreter = Interpreter::new(name);
    if let Some(command) = options.command {
        interpreter.run(&command)?;
        return Ok(());
    }

    if io::stdin().is_terminal() {
        return interpreter.repl();
    }

    // not a terminal: treat everything on stdin as one input
    let mut bytes = Vec::new();
    io::stdin()
        .read_to_end(&mut bytes)
        .context("read")?;
    interpreter.run(&String::from_utf8_lossy(&bytes))?;
    Ok(())
}

fn program_name() -> String {
    let argv0 = std::env::args().next().unwrap_or_default();
    match argv0.rsplit('/').next() {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => "minish".to_string(),
    }
}

/// `-D`: dump raw input bytes as the terminal delivers them.
fn debug_input_mode() -> Result<()> {
    let saved = tcgetattr(io::stdin()).context("tcgetattr")?;
    term::enter_raw(&saved).context("tcsetattr")?;
    let result = debug_input_loop();
    let _ = term::restore(&saved);
    result
}

fn debug_input_loop() -> Result<()> {
    let mut stdin = io::stdin().lock();
    while let Some(byte) = term::read_byte(&mut stdin)? {
        if byte.is_ascii_graphic() || byte == b' ' {
            println!("\\0{byte:x} {byte} '{}'", byte as char);
        } else {
            println!("\\0{byte:x} {byte}");
        }
        if byte == 0x04 {
            break; // ^D
        }
    }
    Ok(())
}
