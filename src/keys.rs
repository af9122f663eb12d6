//! Incremental decoding of terminal input bytes into key events.
//!
//! The editor reads one byte at a time; this state machine accumulates bytes
//! until they form either a complete UTF-8 code point or one of the control
//! keys the editor reacts to. Unrecognized control bytes and broken escape or
//! UTF-8 sequences are reported as invalid so the caller can drop them and
//! keep going.

use crate::utf8;

const CTRL_A: u8 = 0x01;
const CTRL_B: u8 = 0x02;
const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const CTRL_E: u8 = 0x05;
const CTRL_F: u8 = 0x06;
const CTRL_L: u8 = 0x0c;
const CTRL_R: u8 = 0x12;
const BACKSPACE: u8 = 0x7f;
const ESC: u8 = 0x1b;

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A complete code point of printable input.
    Text(char),
    /// A named editing action.
    Ctrl(Ctrl),
}

/// The control-key repertoire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ctrl {
    /// `^C`: discard the line being edited.
    LineKill,
    /// `^D`: end the session.
    Exit,
    /// `^L`: clear the screen and repaint.
    Clear,
    /// `\n`: accept the line.
    Enter,
    Tab,
    /// `^R`: incremental reverse history search.
    Search,
    /// `ESC[3~`: delete the code point under the cursor.
    Delete,
    /// `0x7f`: delete the code point before the cursor.
    Backspace,
    /// `^A`, `ESC[1~`, `ESC[7~`, `ESC[H`, `ESCOH`.
    Home,
    /// `^E`, `ESC[4~`, `ESC[8~`, `ESC[F`, `ESCOF`.
    End,
    /// `^B`, `ESC[D`.
    Back,
    /// `^F`, `ESC[C`.
    Forward,
    /// `ESC[A`.
    Up,
    /// `ESC[B`.
    Down,
    /// `ESC[5~`.
    PageUp,
    /// `ESC[6~`.
    PageDown,
}

/// Result of feeding one byte to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// More bytes are needed.
    Pending,
    /// A complete key event.
    Key(Key),
    /// The accumulated bytes do not form anything recognizable; the
    /// accumulator has been dropped.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    /// Collecting the continuation bytes of a multi-byte code point.
    Text { buf: [u8; 4], have: u8, need: u8 },
    /// Seen `ESC`, waiting for `[` or `O`.
    Escape,
    /// Seen `ESC[`.
    Csi,
    /// Seen `ESC[<digit>`, waiting for the closing `~`.
    CsiDigit(u8),
    /// Seen `ESCO`.
    Ss3,
}

/// The byte-to-key state machine. One instance per editing session.
pub struct Decoder {
    state: State,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            state: State::Start,
        }
    }

    /// Feed one byte. On [`Decoded::Key`] and [`Decoded::Invalid`] the
    /// decoder is reset and ready for the next sequence.
    pub fn feed(&mut self, byte: u8) -> Decoded {
        let decoded = self.step(byte);
        if !matches!(decoded, Decoded::Pending) {
            self.state = State::Start;
        }
        decoded
    }

    fn step(&mut self, byte: u8) -> Decoded {
        match self.state {
            State::Start => self.start(byte),
            State::Text { mut buf, have, need } => {
                buf[have as usize] = byte;
                if have + 1 < need {
                    self.state = State::Text {
                        buf,
                        have: have + 1,
                        need,
                    };
                    return Decoded::Pending;
                }
                let decoded = std::str::from_utf8(&buf[..need as usize])
                    .ok()
                    .and_then(|s| s.chars().next());
                match decoded {
                    Some(ch) => Decoded::Key(Key::Text(ch)),
                    None => Decoded::Invalid,
                }
            }
            State::Escape => match byte {
                b'[' => {
                    self.state = State::Csi;
                    Decoded::Pending
                }
                b'O' => {
                    self.state = State::Ss3;
                    Decoded::Pending
                }
                _ => Decoded::Invalid,
            },
            State::Ss3 => match byte {
                b'H' => ctrl(Ctrl::Home),
                b'F' => ctrl(Ctrl::End),
                _ => Decoded::Invalid,
            },
            State::Csi => match byte {
                b'0'..=b'9' => {
                    self.state = State::CsiDigit(byte);
                    Decoded::Pending
                }
                b'A' => ctrl(Ctrl::Up),
                b'B' => ctrl(Ctrl::Down),
                b'C' => ctrl(Ctrl::Forward),
                b'D' => ctrl(Ctrl::Back),
                b'H' => ctrl(Ctrl::Home),
                b'F' => ctrl(Ctrl::End),
                _ => Decoded::Invalid,
            },
            State::CsiDigit(digit) => {
                if byte != b'~' {
                    return Decoded::Invalid;
                }
                match digit {
                    b'1' | b'7' => ctrl(Ctrl::Home),
                    b'4' | b'8' => ctrl(Ctrl::End),
                    b'3' => ctrl(Ctrl::Delete),
                    b'5' => ctrl(Ctrl::PageUp),
                    b'6' => ctrl(Ctrl::PageDown),
                    _ => Decoded::Invalid,
                }
            }
        }
    }

    fn start(&mut self, byte: u8) -> Decoded {
        match byte {
            ESC => {
                self.state = State::Escape;
                Decoded::Pending
            }
            CTRL_A => ctrl(Ctrl::Home),
            CTRL_B => ctrl(Ctrl::Back),
            CTRL_C => ctrl(Ctrl::LineKill),
            CTRL_D => ctrl(Ctrl::Exit),
            CTRL_E => ctrl(Ctrl::End),
            CTRL_F => ctrl(Ctrl::Forward),
            CTRL_L => ctrl(Ctrl::Clear),
            CTRL_R => ctrl(Ctrl::Search),
            b'\n' => ctrl(Ctrl::Enter),
            b'\t' => ctrl(Ctrl::Tab),
            BACKSPACE => ctrl(Ctrl::Backspace),
            0x00..=0x1f => Decoded::Invalid,
            _ => match utf8::seq_len(byte) {
                Some(1) => Decoded::Key(Key::Text(byte as char)),
                Some(need) => {
                    let mut buf = [0u8; 4];
                    buf[0] = byte;
                    self.state = State::Text {
                        buf,
                        have: 1,
                        need: need as u8,
                    };
                    Decoded::Pending
                }
                None => Decoded::Invalid,
            },
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn ctrl(c: Ctrl) -> Decoded {
    Decoded::Key(Key::Ctrl(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<Decoded> {
        let mut dec = Decoder::new();
        bytes.iter().map(|&b| dec.feed(b)).collect()
    }

    fn last_key(bytes: &[u8]) -> Key {
        match decode(bytes).pop().unwrap() {
            Decoded::Key(k) => k,
            other => panic!("expected a key, got {other:?}"),
        }
    }

    #[test]
    fn plain_ascii_is_text() {
        assert_eq!(last_key(b"a"), Key::Text('a'));
        assert_eq!(last_key(b" "), Key::Text(' '));
    }

    #[test]
    fn multibyte_code_points_accumulate() {
        let bytes = "é".as_bytes();
        let steps = decode(bytes);
        assert_eq!(steps[0], Decoded::Pending);
        assert_eq!(steps[1], Decoded::Key(Key::Text('é')));
        assert_eq!(last_key("😀".as_bytes()), Key::Text('😀'));
    }

    #[test]
    fn control_bytes_map_to_actions() {
        assert_eq!(last_key(&[0x01]), Key::Ctrl(Ctrl::Home));
        assert_eq!(last_key(&[0x03]), Key::Ctrl(Ctrl::LineKill));
        assert_eq!(last_key(&[0x04]), Key::Ctrl(Ctrl::Exit));
        assert_eq!(last_key(&[0x12]), Key::Ctrl(Ctrl::Search));
        assert_eq!(last_key(b"\n"), Key::Ctrl(Ctrl::Enter));
        assert_eq!(last_key(&[0x7f]), Key::Ctrl(Ctrl::Backspace));
    }

    #[test]
    fn escape_sequences_decode() {
        assert_eq!(last_key(b"\x1b[A"), Key::Ctrl(Ctrl::Up));
        assert_eq!(last_key(b"\x1b[B"), Key::Ctrl(Ctrl::Down));
        assert_eq!(last_key(b"\x1b[C"), Key::Ctrl(Ctrl::Forward));
        assert_eq!(last_key(b"\x1b[D"), Key::Ctrl(Ctrl::Back));
        assert_eq!(last_key(b"\x1b[H"), Key::Ctrl(Ctrl::Home));
        assert_eq!(last_key(b"\x1bOF"), Key::Ctrl(Ctrl::End));
        assert_eq!(last_key(b"\x1b[3~"), Key::Ctrl(Ctrl::Delete));
        assert_eq!(last_key(b"\x1b[5~"), Key::Ctrl(Ctrl::PageUp));
        assert_eq!(last_key(b"\x1b[7~"), Key::Ctrl(Ctrl::Home));
        assert_eq!(last_key(b"\x1b[8~"), Key::Ctrl(Ctrl::End));
    }

    #[test]
    fn junk_is_invalid_and_recoverable() {
        let mut dec = Decoder::new();
        assert_eq!(dec.feed(0x1b), Decoded::Pending);
        assert_eq!(dec.feed(b'x'), Decoded::Invalid);
        // decoder resumes cleanly after dropping the bad sequence
        assert_eq!(dec.feed(b'a'), Decoded::Key(Key::Text('a')));

        assert_eq!(decode(&[0x0b]).pop().unwrap(), Decoded::Invalid); // ^K
        assert_eq!(decode(&[0x80]).pop().unwrap(), Decoded::Invalid); // bare continuation
        assert_eq!(decode(b"\x1b[9~").pop().unwrap(), Decoded::Invalid);
    }

    #[test]
    fn overlong_or_broken_utf8_is_invalid() {
        // lead byte announcing 2 bytes followed by a non-continuation
        assert_eq!(decode(&[0xc3, b'a']).pop().unwrap(), Decoded::Invalid);
    }
}
