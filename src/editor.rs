//! The interactive line editor.
//!
//! A raw-mode, UTF-8-aware single-line editor drawn with plain VT escapes.
//! The editable state is a buffer of rows: row 0 is the line being composed,
//! rows 1.. shadow the history ring newest-first. History rows are
//! materialized into private copies the first time they are edited, so the
//! ring itself is never modified. The cursor column is a byte offset that is
//! always kept on a code-point boundary; everything the editor sends to the
//! terminal is measured in code points.
//!
//! [`Editor::edit`] is generic over `Read`/`Write` so the dispatch logic can
//! be driven from tests; [`read_line`] is the raw-mode wrapper over the real
//! terminal.

use crate::history::{self, History};
use crate::keys::{Ctrl, Decoded, Decoder, Key};
use crate::term;
use crate::utf8;
use anyhow::{anyhow, Result};
use nix::sys::termios::Termios;
use nix::unistd::Uid;
use std::io::{self, Read, Write};

const SEARCH_PREFIX: &str = "(reverse-search)`': ";
/// Byte offset inside the overlay where the query is spliced in (right after
/// the backtick).
const QUERY_START: usize = SEARCH_PREFIX.len() - 3;

/// What an editing session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// The user accepted a line (possibly empty).
    Line(String),
    /// `^D`: the user asked the shell to exit.
    Exit,
    /// Input failed or the editor state went bad; the session is over.
    Interrupted,
}

/// The reverse-search overlay: the fully rendered
/// ``(reverse-search)`QUERY': RESULT`` line plus the query's byte length.
struct Search {
    line: String,
    query_len: usize,
}

/// One line-editing session over a borrowed history.
pub struct Editor<'a> {
    history: &'a History,
    ps1: String,
    /// Row 0 is the fresh line; row r shadows `history[r - 1]` until edited.
    rows: Vec<Option<String>>,
    row: usize,
    /// Byte offset into the current row; invariant: a code-point boundary.
    col: usize,
    search: Option<Search>,
}

/// Code points in `s`.
fn width(s: &str) -> isize {
    s.chars().count() as isize
}

/// Code points in the first `col` bytes of `s`; errors when `col` does not
/// land on a code-point boundary.
fn prefix_width(s: &str, col: usize) -> Result<isize> {
    s.as_bytes()
        .get(..col)
        .and_then(utf8::count)
        .map(|n| n as isize)
        .ok_or_else(|| anyhow!("cursor is not on a code point boundary"))
}

impl<'a> Editor<'a> {
    pub fn new(history: &'a History, ps1: impl Into<String>) -> Self {
        Self {
            history,
            ps1: ps1.into(),
            rows: vec![None; history::CAPACITY + 1],
            row: 0,
            col: 0,
            search: None,
        }
    }

    /// Run the session to completion. I/O failures and internal state errors
    /// surface as [`ReadLine::Interrupted`].
    pub fn edit(&mut self, input: &mut dyn Read, out: &mut dyn Write) -> ReadLine {
        match self.edit_loop(input, out) {
            Ok(outcome) => outcome,
            Err(_) => ReadLine::Interrupted,
        }
    }

    fn edit_loop(&mut self, input: &mut dyn Read, out: &mut dyn Write) -> Result<ReadLine> {
        out.write_all(self.ps1.as_bytes())?;
        out.flush()?;
        let mut decoder = Decoder::new();
        loop {
            if term::take_winch() {
                self.repaint(out)?;
            }
            let Some(byte) = term::read_byte(input)? else {
                return Ok(ReadLine::Interrupted);
            };
            match decoder.feed(byte) {
                // broken escape/UTF-8 sequences are dropped silently
                Decoded::Pending | Decoded::Invalid => continue,
                Decoded::Key(key) => {
                    if let Some(done) = self.dispatch(key, out)? {
                        return Ok(done);
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, key: Key, out: &mut dyn Write) -> Result<Option<ReadLine>> {
        let ctrl = match key {
            Key::Text(ch) => {
                if self.search.is_some() {
                    self.search_insert(ch, out)?;
                } else {
                    self.insert_text(ch, out)?;
                }
                return Ok(None);
            }
            Key::Ctrl(c) => c,
        };

        match ctrl {
            Ctrl::Exit => {
                self.emit(out, "^D\n")?;
                return Ok(Some(ReadLine::Exit));
            }
            Ctrl::Enter => {
                self.emit(out, "\n")?;
                return Ok(Some(ReadLine::Line(self.current().to_string())));
            }
            Ctrl::LineKill => {
                self.emit(out, "^C\n")?;
                return Ok(Some(ReadLine::Line(String::new())));
            }
            Ctrl::Search => {
                if self.search.is_some() {
                    self.next_search(out)?;
                } else {
                    self.enter_search(out)?;
                }
            }
            Ctrl::Tab => {
                // no completion; in search mode TAB accepts the landed line
                if self.search.is_some() {
                    self.exit_search(out, None)?;
                }
            }
            Ctrl::Backspace => {
                if self.search.is_some() {
                    self.search_backspace(out)?;
                } else {
                    self.backspace(out)?;
                }
            }
            Ctrl::Up => self.history_up(out)?,
            Ctrl::Down => self.history_down(out)?,
            Ctrl::Clear => self.clear_screen(out)?,
            Ctrl::Delete | Ctrl::Back | Ctrl::Forward | Ctrl::Home | Ctrl::End => {
                if self.search.is_none() {
                    self.motion(ctrl, out, None)?;
                } else {
                    // leave the search, land on the found line, then move
                    let mut moves = 0;
                    self.exit_search(out, Some(&mut moves))?;
                    self.motion(ctrl, out, Some(&mut moves))?;
                    self.redraw_line(out, &self.ps1, self.current(), moves)?;
                }
            }
            Ctrl::PageUp | Ctrl::PageDown => {}
        }
        Ok(None)
    }

    fn motion(&mut self, ctrl: Ctrl, out: &mut dyn Write, collect: Option<&mut isize>) -> Result<()> {
        match ctrl {
            Ctrl::Delete => self.delete_at(out, collect),
            Ctrl::Back => self.cursor_back(out, collect),
            Ctrl::Forward => self.cursor_forward(out, collect),
            Ctrl::Home => self.cursor_home(out, collect),
            Ctrl::End => self.cursor_end(out, collect),
            _ => Ok(()),
        }
    }

    // ---- row access -----------------------------------------------------

    fn line_at(&self, row: usize) -> Option<&str> {
        let stored = self.rows.get(row)?;
        if let Some(line) = stored {
            return Some(line);
        }
        if row > 0 {
            self.history.get(row - 1)
        } else {
            None
        }
    }

    fn current(&self) -> &str {
        self.line_at(self.row).unwrap_or("")
    }

    /// Materialize the current row for mutation. History lines are copied on
    /// first write; the ring itself is never touched.
    fn current_mut(&mut self) -> &mut String {
        let history: &'a History = self.history;
        let seed = if self.row > 0 {
            history.get(self.row - 1)
        } else {
            None
        };
        self.rows[self.row].get_or_insert_with(|| seed.unwrap_or("").to_string())
    }

    // ---- drawing primitives ---------------------------------------------

    fn emit(&self, out: &mut dyn Write, s: &str) -> Result<()> {
        out.write_all(s.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Repaint from the cursor to end of line: optional move, save, repaint
    /// tail, restore, optional move.
    fn redraw_from_cursor(
        &self,
        out: &mut dyn Write,
        tail: &str,
        before: isize,
        after: isize,
    ) -> Result<()> {
        let mut seq = String::new();
        term::move_cursor(&mut seq, before);
        seq.push_str(term::SAVE_CURSOR);
        seq.push_str(term::CLEAR_TO_EOL);
        seq.push_str(tail);
        seq.push_str(term::RESTORE_CURSOR);
        term::move_cursor(&mut seq, after);
        self.emit(out, &seq)
    }

    /// Repaint the whole line from column 1, then nudge the cursor by
    /// `moves` code points.
    fn redraw_line(&self, out: &mut dyn Write, prefix: &str, body: &str, moves: isize) -> Result<()> {
        let mut seq = String::from(term::SAVE_CURSOR);
        term::cursor_column(&mut seq, 1);
        seq.push_str(prefix);
        seq.push_str(body);
        seq.push_str(term::CLEAR_TO_EOL);
        seq.push_str(term::RESTORE_CURSOR);
        term::move_cursor(&mut seq, moves);
        self.emit(out, &seq)
    }

    /// Repaint the whole line leaving the cursor at its end.
    fn redraw_line_eol(&self, out: &mut dyn Write, body: &str) -> Result<()> {
        let mut seq = String::new();
        term::cursor_column(&mut seq, 1);
        seq.push_str(&self.ps1);
        seq.push_str(body);
        seq.push_str(term::SAVE_CURSOR);
        seq.push_str(term::CLEAR_TO_EOL);
        seq.push_str(term::RESTORE_CURSOR);
        self.emit(out, &seq)
    }

    /// Full repaint after a window-size change.
    fn repaint(&self, out: &mut dyn Write) -> Result<()> {
        match &self.search {
            Some(search) => self.redraw_line(out, "", &search.line, 0),
            None => self.redraw_line(out, &self.ps1, self.current(), 0),
        }
    }

    fn redraw_overlay(&self, out: &mut dyn Write, moves: isize) -> Result<()> {
        match &self.search {
            Some(search) => self.redraw_line(out, "", &search.line, moves),
            None => Ok(()),
        }
    }

    // ---- plain editing --------------------------------------------------

    fn insert_text(&mut self, ch: char, out: &mut dyn Write) -> Result<()> {
        let mut enc = [0u8; 4];
        let bytes = ch.encode_utf8(&mut enc);
        let col = self.col;
        let tail = {
            let line = self.current_mut();
            if !line.is_char_boundary(col) {
                return Err(anyhow!("cursor is not on a code point boundary"));
            }
            line.insert_str(col, bytes);
            line[col..].to_string()
        };
        self.col = col + bytes.len();
        self.redraw_from_cursor(out, &tail, 0, 1)
    }

    fn backspace(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.col == 0 {
            return Ok(());
        }
        let col = self.col;
        let (tail, new_col) = {
            let line = self.current_mut();
            let del = utf8::tail_len(&line.as_bytes()[..col])
                .ok_or_else(|| anyhow!("cursor is not on a code point boundary"))?;
            line.replace_range(col - del..col, "");
            (line[col - del..].to_string(), col - del)
        };
        self.col = new_col;
        self.redraw_from_cursor(out, &tail, -1, 0)
    }

    fn delete_at(&mut self, out: &mut dyn Write, collect: Option<&mut isize>) -> Result<()> {
        let col = self.col;
        if col >= self.current().len() {
            return Ok(());
        }
        let tail = {
            let line = self.current_mut();
            let del = utf8::seq_len(line.as_bytes()[col])
                .ok_or_else(|| anyhow!("cursor is not on a code point boundary"))?;
            let del = del.min(line.len() - col);
            line.replace_range(col..col + del, "");
            line[col..].to_string()
        };
        if collect.is_none() {
            self.redraw_from_cursor(out, &tail, 0, 0)?;
        }
        Ok(())
    }

    // ---- cursor motion --------------------------------------------------

    fn cursor_back(&mut self, out: &mut dyn Write, collect: Option<&mut isize>) -> Result<()> {
        if self.col == 0 {
            return Ok(());
        }
        let step = utf8::tail_len(&self.current().as_bytes()[..self.col])
            .ok_or_else(|| anyhow!("cursor is not on a code point boundary"))?;
        self.col -= step.min(self.col);
        match collect {
            Some(moves) => *moves -= 1,
            None => {
                let mut seq = String::new();
                term::move_cursor(&mut seq, -1);
                self.emit(out, &seq)?;
            }
        }
        Ok(())
    }

    fn cursor_forward(&mut self, out: &mut dyn Write, collect: Option<&mut isize>) -> Result<()> {
        let line_len = self.current().len();
        if self.col >= line_len {
            return Ok(());
        }
        let step = utf8::seq_len(self.current().as_bytes()[self.col])
            .ok_or_else(|| anyhow!("cursor is not on a code point boundary"))?;
        self.col = (self.col + step).min(line_len);
        match collect {
            Some(moves) => *moves += 1,
            None => {
                let mut seq = String::new();
                term::move_cursor(&mut seq, 1);
                self.emit(out, &seq)?;
            }
        }
        Ok(())
    }

    fn cursor_home(&mut self, out: &mut dyn Write, collect: Option<&mut isize>) -> Result<()> {
        let mut moves = 0;
        while self.col > 0 {
            self.cursor_back(out, Some(&mut moves))?;
        }
        self.apply_moves(out, moves, collect)
    }

    fn cursor_end(&mut self, out: &mut dyn Write, collect: Option<&mut isize>) -> Result<()> {
        let mut moves = 0;
        while self.col < self.current().len() {
            self.cursor_forward(out, Some(&mut moves))?;
        }
        self.apply_moves(out, moves, collect)
    }

    fn apply_moves(
        &self,
        out: &mut dyn Write,
        moves: isize,
        collect: Option<&mut isize>,
    ) -> Result<()> {
        match collect {
            Some(total) => {
                *total += moves;
                Ok(())
            }
            None => {
                let mut seq = String::new();
                term::move_cursor(&mut seq, moves);
                self.emit(out, &seq)
            }
        }
    }

    // ---- history browsing -----------------------------------------------

    fn history_up(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.row >= self.history.len() {
            return Ok(()); // already at the oldest line
        }
        let mut ignored = 0;
        self.exit_search(out, Some(&mut ignored))?;
        self.row += 1;
        self.col = self.current().len();
        self.redraw_line_eol(out, self.current())
    }

    fn history_down(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.row == 0 {
            return Ok(());
        }
        let mut ignored = 0;
        self.exit_search(out, Some(&mut ignored))?;
        self.row -= 1;
        self.col = self.current().len();
        self.redraw_line_eol(out, self.current())
    }

    fn clear_screen(&mut self, out: &mut dyn Write) -> Result<()> {
        let mut moves = 0;
        self.exit_search(out, Some(&mut moves))?;
        let mut seq = String::new();
        term::move_cursor(&mut seq, moves);
        seq.push_str(term::SAVE_CURSOR);
        seq.push_str(term::CLEAR_SCREEN);
        term::cursor_to(&mut seq, 1, 1);
        seq.push_str(&self.ps1);
        seq.push_str(self.current());
        seq.push_str(term::RESTORE_CURSOR);
        term::cursor_row(&mut seq, 1);
        self.emit(out, &seq)
    }

    // ---- reverse search -------------------------------------------------

    fn enter_search(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.search.is_some() {
            return Ok(());
        }
        let mut line = String::with_capacity(SEARCH_PREFIX.len() + self.current().len());
        line.push_str(SEARCH_PREFIX);
        line.push_str(self.current());
        let moves = width(SEARCH_PREFIX) - width(&self.ps1);
        self.redraw_line(out, "", &line, moves)?;
        self.search = Some(Search { line, query_len: 0 });
        Ok(())
    }

    /// Walk upward: find the next row past the current one that still
    /// contains the query. Stays put when nothing further matches.
    fn next_search(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.search.is_none() {
            return Ok(());
        }
        let (prev_row, prev_col) = (self.row, self.col);
        let mut moves = 0;
        self.search_update(self.row + 1, &mut moves)?;
        if moves == 0 && self.row == prev_row && self.col == prev_col {
            return Ok(());
        }
        self.redraw_overlay(out, moves)
    }

    fn search_insert(&mut self, ch: char, out: &mut dyn Write) -> Result<()> {
        let mut enc = [0u8; 4];
        let bytes = ch.encode_utf8(&mut enc);
        let Some(search) = self.search.as_mut() else {
            return Err(anyhow!("not in search mode"));
        };
        search.line.insert_str(QUERY_START + search.query_len, bytes);
        search.query_len += bytes.len();
        // the query grew by one code point, shifting the cursor right
        let mut moves = 1;
        self.search_update(0, &mut moves)?;
        self.redraw_overlay(out, moves)
    }

    fn search_backspace(&mut self, out: &mut dyn Write) -> Result<()> {
        let Some(search) = self.search.as_mut() else {
            return Err(anyhow!("not in search mode"));
        };
        if search.query_len == 0 {
            return Ok(());
        }
        let query_end = QUERY_START + search.query_len;
        let del = utf8::tail_len(&search.line.as_bytes()[QUERY_START..query_end])
            .ok_or_else(|| anyhow!("search query is not valid UTF-8"))?;
        search.line.replace_range(query_end - del..query_end, "");
        search.query_len -= del;
        let mut moves = -1;
        self.search_update(0, &mut moves)?;
        self.redraw_overlay(out, moves)
    }

    /// Find the first row at or past `start` containing the query, land on
    /// it, splice it into the overlay, and account the cursor delta (in code
    /// points) into `moves`. A miss leaves everything untouched.
    fn search_update(&mut self, start: usize, moves: &mut isize) -> Result<()> {
        let query = {
            let Some(search) = self.search.as_ref() else {
                return Err(anyhow!("not in search mode"));
            };
            search.line[QUERY_START..QUERY_START + search.query_len].to_string()
        };

        let mut hit: Option<(usize, usize, String)> = None;
        for row in start..self.rows.len() {
            if let Some(line) = self.line_at(row) {
                if let Some(pos) = line.find(&query) {
                    hit = Some((row, pos, line.to_string()));
                    break;
                }
            }
        }
        let Some((row, pos, line)) = hit else {
            return Ok(());
        };

        let next = prefix_width(&line, pos)?;
        let prev = prefix_width(self.current(), self.col)?;
        if let Some(search) = self.search.as_mut() {
            let result_start = QUERY_START + search.query_len + 3; // "': "
            search.line.truncate(result_start);
            search.line.push_str(&line);
        }
        self.row = row;
        self.col = pos;
        *moves += next - prev;
        Ok(())
    }

    /// Leave search mode. With `collect` the cursor delta is accumulated for
    /// the caller to apply; without it the prompt line is repainted here.
    fn exit_search(&mut self, out: &mut dyn Write, collect: Option<&mut isize>) -> Result<()> {
        let Some(search) = self.search.take() else {
            return Ok(());
        };
        let query = &search.line[QUERY_START..QUERY_START + search.query_len];
        let moves = width(&self.ps1) - (width(SEARCH_PREFIX) + width(query));
        match collect {
            Some(total) => {
                *total += moves;
                Ok(())
            }
            None => self.redraw_line(out, &self.ps1, self.current(), moves),
        }
    }
}

/// `PS1` if set, else the uid-conventional default.
fn default_prompt() -> String {
    std::env::var("PS1").unwrap_or_else(|_| {
        if Uid::current().is_root() {
            "# ".to_string()
        } else {
            "$ ".to_string()
        }
    })
}

/// One interactive line from the process's terminal: raw mode in, SIGWINCH
/// handler installed, session run, everything restored on the way out.
pub fn read_line(history: &History, saved: &Termios) -> ReadLine {
    if term::enter_raw(saved).is_err() {
        return ReadLine::Interrupted;
    }
    let winch = term::install_winch();
    let mut editor = Editor::new(history, default_prompt());
    let outcome = editor.edit(&mut io::stdin().lock(), &mut io::stdout().lock());
    if let Ok(previous) = &winch {
        term::restore_winch(previous);
    }
    let _ = term::restore(saved);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn session(history: &History, bytes: &[u8]) -> (ReadLine, String) {
        let mut editor = Editor::new(history, "$ ");
        let mut input = Cursor::new(bytes.to_vec());
        let mut output = Vec::new();
        let outcome = editor.edit(&mut input, &mut output);
        (outcome, String::from_utf8_lossy(&output).into_owned())
    }

    fn accepted(history: &History, bytes: &[u8]) -> String {
        match session(history, bytes).0 {
            ReadLine::Line(line) => line,
            other => panic!("expected an accepted line, got {other:?}"),
        }
    }

    fn seeded(lines: &[&str]) -> History {
        let mut history = History::new();
        for line in lines {
            history.add(line);
        }
        history
    }

    #[test]
    fn typed_text_round_trips() {
        let history = History::new();
        assert_eq!(accepted(&history, "echo hi\n".as_bytes()), "echo hi");
        assert_eq!(accepted(&history, "héllo wörld 日本\n".as_bytes()), "héllo wörld 日本");
        assert_eq!(accepted(&history, b"\n"), "");
    }

    #[test]
    fn prompt_is_written_first() {
        let history = History::new();
        let (_, output) = session(&history, b"x\n");
        assert!(output.starts_with("$ "), "output was {output:?}");
    }

    #[test]
    fn backspace_removes_whole_code_points() {
        let history = History::new();
        let mut bytes = "aé".as_bytes().to_vec();
        bytes.push(0x7f);
        bytes.extend_from_slice(b"b\n");
        assert_eq!(accepted(&history, &bytes), "ab");
    }

    #[test]
    fn backspace_at_start_is_a_no_op() {
        let history = History::new();
        let mut bytes = vec![0x7f, 0x7f];
        bytes.extend_from_slice(b"ok\n");
        assert_eq!(accepted(&history, &bytes), "ok");
    }

    #[test]
    fn home_and_end_insert_at_the_edges() {
        let history = History::new();
        // "abc", ^A, "X", ^E, "Y"
        let bytes = b"abc\x01X\x05Y\n";
        assert_eq!(accepted(&history, bytes), "XabcY");
    }

    #[test]
    fn cursor_motion_lands_on_code_point_boundaries() {
        let history = History::new();
        // "héllo", home, forward twice, insert "X" between é and l
        let bytes = "héllo\x01\x06\x06X\n".as_bytes();
        assert_eq!(accepted(&history, bytes), "héXllo");
    }

    #[test]
    fn delete_removes_under_the_cursor() {
        let history = History::new();
        let bytes = b"abc\x01\x1b[3~\n";
        assert_eq!(accepted(&history, bytes), "bc");
    }

    #[test]
    fn arrow_left_then_insert() {
        let history = History::new();
        let bytes = b"ac\x1b[Db\n";
        assert_eq!(accepted(&history, bytes), "abc");
    }

    #[test]
    fn history_up_recalls_previous_lines() {
        let history = seeded(&["first", "second"]);
        assert_eq!(accepted(&history, b"\x1b[A\n"), "second");
        assert_eq!(accepted(&history, b"\x1b[A\x1b[A\n"), "first");
        // walking past the oldest entry stays put
        assert_eq!(accepted(&history, b"\x1b[A\x1b[A\x1b[A\n"), "first");
    }

    #[test]
    fn up_then_down_returns_to_the_fresh_line() {
        let history = seeded(&["first", "second"]);
        assert_eq!(accepted(&history, b"ab\x1b[A\x1b[B\n"), "ab");
        assert_eq!(accepted(&history, b"\x1b[A\x1b[A\x1b[B\n"), "second");
    }

    #[test]
    fn editing_a_history_line_does_not_change_history() {
        let history = seeded(&["second"]);
        let mut bytes = b"\x1b[A".to_vec();
        bytes.push(0x7f); // drop the trailing "d"
        bytes.push(b'\n');
        assert_eq!(accepted(&history, &bytes), "secon");
        assert_eq!(history.get(0), Some("second"));
    }

    #[test]
    fn line_kill_returns_an_empty_line() {
        let history = History::new();
        let (outcome, output) = session(&history, b"doomed\x03");
        assert_eq!(outcome, ReadLine::Line(String::new()));
        assert!(output.contains("^C\n"));
    }

    #[test]
    fn ctrl_d_exits() {
        let history = History::new();
        let (outcome, output) = session(&history, &[0x04]);
        assert_eq!(outcome, ReadLine::Exit);
        assert!(output.contains("^D\n"));
        // ^D exits even with text on the line
        assert_eq!(session(&history, b"abc\x04").0, ReadLine::Exit);
    }

    #[test]
    fn eof_interrupts_the_session() {
        let history = History::new();
        assert_eq!(session(&history, b"abc").0, ReadLine::Interrupted);
    }

    #[test]
    fn invalid_bytes_are_dropped() {
        let history = History::new();
        // a stray continuation byte and an unknown control byte are ignored
        assert_eq!(accepted(&history, &[0x80, 0x0b, b'o', b'k', b'\n']), "ok");
    }

    #[test]
    fn reverse_search_finds_the_newest_match() {
        let history = seeded(&["echo one", "grep foo", "echo two"]);
        // ^R then "ec": newest matching entry wins
        assert_eq!(accepted(&history, b"\x12ec\n"), "echo two");
    }

    #[test]
    fn repeated_search_walks_to_older_matches() {
        let history = seeded(&["echo one", "grep foo", "echo two"]);
        assert_eq!(accepted(&history, b"\x12ec\x12\n"), "echo one");
        // no further match: stays on the oldest hit
        assert_eq!(accepted(&history, b"\x12ec\x12\x12\n"), "echo one");
    }

    #[test]
    fn search_overlay_is_rendered() {
        let history = seeded(&["echo one"]);
        let (_, output) = session(&history, b"\x12e\n");
        assert!(
            output.contains("(reverse-search)`e': echo one"),
            "output was {output:?}"
        );
    }

    #[test]
    fn search_backspace_shrinks_the_query() {
        let history = seeded(&["echo one", "grep foo"]);
        // query "g" lands on "grep foo"; removing it and typing "e" lands on
        // the newer "grep foo" again (it contains "e"), so force "ec"
        let mut bytes = b"\x12g".to_vec();
        bytes.push(0x7f);
        bytes.extend_from_slice(b"ec\n");
        assert_eq!(accepted(&history, &bytes), "echo one");
    }

    #[test]
    fn search_miss_keeps_the_current_line() {
        let history = seeded(&["echo one"]);
        assert_eq!(accepted(&history, b"\x12zz\n"), "");
    }

    #[test]
    fn tab_accepts_the_search_result_for_further_editing() {
        let history = seeded(&["grep foo"]);
        // land on "grep foo", leave search with TAB, append at the cursor
        let bytes = b"\x12g\tX\n";
        assert_eq!(accepted(&history, bytes), "Xgrep foo");
    }

    #[test]
    fn search_exit_via_motion_applies_the_motion() {
        let history = seeded(&["grep foo"]);
        // ^R "g" lands at column 0 of "grep foo"; End then "!" appends
        let bytes = b"\x12g\x05!\n";
        assert_eq!(accepted(&history, bytes), "grep foo!");
    }
}
