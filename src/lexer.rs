//! Tokenization of the shell's surface syntax.
//!
//! The lexer walks a byte cursor over one input and hands out tokens on
//! demand: words, runs of metacharacters, and words that were cut short by an
//! adjacent metacharacter (no separator in between). Quoting is deliberately
//! primitive: `'` and `"` behave identically, interior bytes are copied
//! verbatim, and there are no escapes — no expansion of any kind happens
//! here.

use std::fmt;

/// Input field separators.
const IFS: &[u8] = b" \t\n";
/// Bytes that terminate a word and form operator tokens.
const METACHARS: &[u8] = b"|&;()<>";

/// A lexical or syntactic error, tagged with the input line it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// One token of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token's text. Quotes are stripped; metacharacter runs are verbatim.
    pub text: String,
    /// The token is a run of metacharacters.
    pub meta: bool,
    /// The word was terminated by an adjacent metacharacter rather than a
    /// separator; a following redirection operator may claim it as its
    /// target file descriptor.
    pub pre_meta: bool,
}

impl Token {
    fn word(text: String, pre_meta: bool) -> Self {
        Self {
            text,
            meta: false,
            pre_meta,
        }
    }

    fn operator(text: String) -> Self {
        Self {
            text,
            meta: true,
            pre_meta: false,
        }
    }
}

/// Pull-based tokenizer with a one-deep pushback buffer.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    pushback: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            pushback: None,
        }
    }

    /// The line the cursor is currently on (1-based; newlines inside quotes
    /// count too).
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Store one token for re-delivery on the next [`next_token`] call.
    ///
    /// [`next_token`]: Lexer::next_token
    pub fn push_back(&mut self, token: Token) {
        assert!(
            self.pushback.is_none(),
            "token pushed back while one is already buffered"
        );
        self.pushback = Some(token);
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        if let Some(token) = self.pushback.take() {
            return Ok(Some(token));
        }

        self.skip_separators();
        let Some(&byte) = self.input.get(self.pos) else {
            return Ok(None);
        };

        if METACHARS.contains(&byte) {
            return Ok(Some(self.operator_run()));
        }
        self.word().map(Some)
    }

    fn skip_separators(&mut self) {
        while let Some(&byte) = self.input.get(self.pos) {
            if !IFS.contains(&byte) {
                break;
            }
            if byte == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    /// A maximal run of metacharacter bytes, stored verbatim.
    fn operator_run(&mut self) -> Token {
        let start = self.pos;
        while let Some(&byte) = self.input.get(self.pos) {
            if !METACHARS.contains(&byte) {
                break;
            }
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        Token::operator(text)
    }

    /// A word: unquoted bytes plus the verbatim interior of any quoted spans.
    /// Ends at an unquoted separator, an unquoted metacharacter (PRE_META),
    /// or end of input.
    fn word(&mut self) -> Result<Token, SyntaxError> {
        let mut text = Vec::new();
        loop {
            let Some(&byte) = self.input.get(self.pos) else {
                break;
            };
            if IFS.contains(&byte) {
                if byte == b'\n' {
                    self.line += 1;
                }
                self.pos += 1;
                break;
            }
            if METACHARS.contains(&byte) {
                // leave the metacharacter for the next call
                let text = String::from_utf8_lossy(&text).into_owned();
                return Ok(Token::word(text, true));
            }
            if byte == b'\'' || byte == b'"' {
                self.quoted_span(byte, &mut text)?;
                continue;
            }
            text.push(byte);
            self.pos += 1;
        }
        Ok(Token::word(String::from_utf8_lossy(&text).into_owned(), false))
    }

    fn quoted_span(&mut self, quote: u8, text: &mut Vec<u8>) -> Result<(), SyntaxError> {
        self.pos += 1; // opening quote
        loop {
            match self.input.get(self.pos) {
                None => {
                    return Err(SyntaxError::new(
                        self.line,
                        format!(
                            "unexpected EOF while looking for matching quote `{}'",
                            quote as char
                        ),
                    ));
                }
                Some(&byte) if byte == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(&byte) => {
                    if byte == b'\n' {
                        self.line += 1;
                    }
                    text.push(byte);
                    self.pos += 1;
                }
            }
        }
    }
}
