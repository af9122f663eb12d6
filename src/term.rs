//! Terminal plumbing for the line editor.
//!
//! Raw-mode entry/exit around saved termios attributes, character-at-a-time
//! input with EINTR retry, the VT escape repertoire the editor draws with,
//! and the SIGWINCH flag. Everything here talks to the process's real
//! terminal; the editor itself stays generic over `Read`/`Write`.

use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::termios::{tcsetattr, InputFlags, LocalFlags, SetArg, Termios};
use std::io::{self, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};

/// Clear the whole screen.
pub const CLEAR_SCREEN: &str = "\x1b[2J";
/// Save the cursor position (`ESC[s` is not supported by Apple's terminal).
pub const SAVE_CURSOR: &str = "\x1b7";
/// Restore the saved cursor position.
pub const RESTORE_CURSOR: &str = "\x1b8";
/// Clear from the cursor to the end of the line.
pub const CLEAR_TO_EOL: &str = "\x1b[K";

/// Append a relative horizontal cursor move to `buf`; zero appends nothing.
pub fn move_cursor(buf: &mut String, moves: isize) {
    if moves > 0 {
        buf.push_str(&format!("\x1b[{moves}C"));
    } else if moves < 0 {
        buf.push_str(&format!("\x1b[{}D", -moves));
    }
}

/// Append an absolute move to column `col` (1-based).
pub fn cursor_column(buf: &mut String, col: usize) {
    buf.push_str(&format!("\x1b[{col}G"));
}

/// Append an absolute move to row `row` (1-based), keeping the column.
pub fn cursor_row(buf: &mut String, row: usize) {
    buf.push_str(&format!("\x1b[{row}d"));
}

/// Append an absolute move to `row`;`col` (both 1-based).
pub fn cursor_to(buf: &mut String, row: usize, col: usize) {
    buf.push_str(&format!("\x1b[{row};{col}H"));
}

/// Reapply `saved` with echo, canonical input, signal generation, extended
/// processing and XON/XOFF flow control switched off.
pub fn enter_raw(saved: &Termios) -> nix::Result<()> {
    let mut raw = saved.clone();
    raw.input_flags.remove(InputFlags::IXON);
    raw.local_flags.remove(
        LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::ISIG | LocalFlags::IEXTEN,
    );
    tcsetattr(io::stdin(), SetArg::TCSADRAIN, &raw)
}

/// Put the terminal back into its saved state.
pub fn restore(saved: &Termios) -> nix::Result<()> {
    tcsetattr(io::stdin(), SetArg::TCSADRAIN, saved)
}

/// Next byte from `input`, retrying interrupted reads. `None` is end of
/// input.
pub fn read_byte(input: &mut dyn Read) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

static WINCH: AtomicBool = AtomicBool::new(false);

extern "C" fn on_winch(_signum: libc::c_int) {
    WINCH.store(true, Ordering::Relaxed);
}

/// Install the window-change handler, returning the previous disposition so
/// the caller can put it back when the editing session ends.
pub fn install_winch() -> nix::Result<SigAction> {
    let act = SigAction::new(
        SigHandler::Handler(on_winch),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGWINCH, &act) }
}

/// Restore a previously saved SIGWINCH disposition.
pub fn restore_winch(old: &SigAction) {
    let _ = unsafe { sigaction(Signal::SIGWINCH, old) };
}

/// Consume the window-change flag.
pub fn take_winch() -> bool {
    WINCH.swap(false, Ordering::Relaxed)
}
