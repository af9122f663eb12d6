//! Parsing tokens into a pipeline of process descriptors.
//!
//! A pipeline is an ordered, non-empty list of processes joined by `|`. Each
//! process collects leading `NAME=value` environment assignments, an argument
//! vector, and an ordered list of redirections. Redirection operators may be
//! preceded by a bare file-descriptor number glued to the operator
//! (`2>errs`); the lexer marks such words PRE_META and the builder here
//! decides whether the number belongs to the operator or is an ordinary
//! argument.

use crate::lexer::{Lexer, SyntaxError, Token};

/// What a redirection does with its target descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirKind {
    /// `<`: open a path for reading.
    PathIn,
    /// `>`: open a path for writing, truncating.
    PathTrunc,
    /// `>>`: open a path for writing, appending.
    PathAppend,
    /// `<>`: open a path for reading and writing, no truncation.
    PathInOut,
    /// `<&`: duplicate an existing descriptor for reading.
    FdIn,
    /// `>&`: duplicate an existing descriptor for writing.
    FdOut,
}

/// Where redirected data comes from or goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirSource {
    Path(String),
    Fd(i32),
}

/// One redirection: make descriptor `fd` refer to `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub fd: i32,
    pub kind: RedirKind,
    pub source: RedirSource,
}

/// The parsed form of one command in a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Process {
    /// Leading `NAME=value` assignments, applied to the child only.
    pub env: Vec<String>,
    pub argv: Vec<String>,
    pub redirs: Vec<Redirection>,
}

/// An ordered, non-empty list of processes connected stdin-to-stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub procs: Vec<Process>,
}

impl Pipeline {
    /// True when the input held nothing to run at all.
    pub fn is_empty(&self) -> bool {
        self.procs.len() == 1
            && self.procs[0].argv.is_empty()
            && self.procs[0].env.is_empty()
            && self.procs[0].redirs.is_empty()
    }
}

/// Parse one whole input into a pipeline.
pub fn parse(input: &str) -> Result<Pipeline, SyntaxError> {
    Builder::new(input).pipeline()
}

struct Builder<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Builder<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.lexer.line(), message)
    }

    /// pipeline := process ('|' process)*
    fn pipeline(&mut self) -> Result<Pipeline, SyntaxError> {
        let mut procs = Vec::new();
        loop {
            procs.push(self.process()?);
            let Some(token) = self.lexer.next_token()? else {
                break;
            };
            debug_assert!(token.meta, "process building stopped on a word token");
            if token.text != "|" {
                return Err(self.error(format!("unexpected metacharacter `{}'", token.text)));
            }
            if procs.last().is_some_and(|p| p.argv.is_empty()) {
                return Err(self.error("unexpected metacharacter `|'"));
            }
            match self.lexer.next_token()? {
                None => return Err(self.error("syntax error: unexpected end of file")),
                Some(next) => self.lexer.push_back(next),
            }
        }
        Ok(Pipeline { procs })
    }

    /// process := (assignment | word | redirection)*
    ///
    /// Ends at end of input or just before a `|`, which is pushed back for
    /// the pipeline loop.
    fn process(&mut self) -> Result<Process, SyntaxError> {
        let mut proc = Process::default();
        let mut done_vars = false;
        // a word glued to the next operator, kept until we know whether that
        // operator wants it as a target fd
        let mut pre_meta: Option<Token> = None;

        while let Some(token) = self.lexer.next_token()? {
            if token.meta {
                if token.text.starts_with('<') || token.text.starts_with('>') {
                    let fd_word = pre_meta.take();
                    let fd_word = match fd_word {
                        Some(word) if parse_fd(&word.text).is_some() => Some(word),
                        Some(word) => {
                            // not a descriptor number: an ordinary word after all
                            self.take_word(&mut proc, &mut done_vars, word.text);
                            None
                        }
                        None => None,
                    };
                    let redir = self.redirection(&token.text, fd_word)?;
                    proc.redirs.push(redir);
                    continue;
                }
                if token.text == "|" {
                    self.lexer.push_back(token);
                    break;
                }
                return Err(self.error(format!("unexpected metacharacter `{}'", token.text)));
            }

            if let Some(word) = pre_meta.take() {
                self.take_word(&mut proc, &mut done_vars, word.text);
            }
            if token.pre_meta {
                pre_meta = Some(token);
                continue;
            }
            self.take_word(&mut proc, &mut done_vars, token.text);
        }

        if let Some(word) = pre_meta.take() {
            self.take_word(&mut proc, &mut done_vars, word.text);
        }
        Ok(proc)
    }

    /// File a plain word as either an environment assignment or an argument.
    fn take_word(&self, proc: &mut Process, done_vars: &mut bool, word: String) {
        if !*done_vars && is_assignment(&word) {
            proc.env.push(word);
            return;
        }
        *done_vars = true;
        proc.argv.push(word);
    }

    /// One redirection. `fd_word` carries the glued descriptor number, if
    /// any; the default target is 0 for `<`-operators and 1 for
    /// `>`-operators.
    fn redirection(&mut self, op: &str, fd_word: Option<Token>) -> Result<Redirection, SyntaxError> {
        let kind = match op {
            "<" => RedirKind::PathIn,
            ">" => RedirKind::PathTrunc,
            ">>" => RedirKind::PathAppend,
            "<>" => RedirKind::PathInOut,
            "<&" => RedirKind::FdIn,
            ">&" => RedirKind::FdOut,
            _ => return Err(self.error(format!("unknown redirection op `{op}'"))),
        };
        let fd = match fd_word {
            Some(word) => match parse_fd(&word.text) {
                Some(fd) => fd,
                None => unreachable!("pre-meta word accepted as fd but unparsable"),
            },
            None if op.starts_with('<') => 0,
            None => 1,
        };

        let target = match self.lexer.next_token()? {
            None => return Err(self.error("syntax error: unexpected end of file")),
            Some(token) if token.meta => {
                return Err(self.error(format!("unexpected metacharacter `{}'", token.text)));
            }
            Some(token) => token.text,
        };

        let source = match kind {
            RedirKind::FdIn | RedirKind::FdOut => match parse_fd(&target) {
                Some(fd) => RedirSource::Fd(fd),
                None => {
                    return Err(self.error(format!("invalid redirection fd `{target}'")));
                }
            },
            _ => RedirSource::Path(target),
        };

        Ok(Redirection { fd, kind, source })
    }
}

/// A non-negative descriptor number: digits only, no sign, no garbage.
fn parse_fd(text: &str) -> Option<i32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `NAME=...` where NAME is a valid identifier.
fn is_assignment(word: &str) -> bool {
    let Some(eq) = word.find('=') else {
        return false;
    };
    let name = &word[..eq];
    let mut bytes = name.bytes();
    let Some(first) = bytes.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(input: &str) -> Process {
        let mut pipeline = parse(input).unwrap();
        assert_eq!(pipeline.procs.len(), 1, "expected a single process");
        pipeline.procs.remove(0)
    }

    fn err(input: &str) -> SyntaxError {
        parse(input).unwrap_err()
    }

    #[test]
    fn simple_command() {
        let proc = one("echo hello");
        assert_eq!(proc.argv, ["echo", "hello"]);
        assert!(proc.env.is_empty());
        assert!(proc.redirs.is_empty());
    }

    #[test]
    fn leading_assignments_go_to_env() {
        let proc = one("FOO=bar BAZ=qux cmd a b");
        assert_eq!(proc.env, ["FOO=bar", "BAZ=qux"]);
        assert_eq!(proc.argv, ["cmd", "a", "b"]);
    }

    #[test]
    fn assignments_after_the_command_are_arguments() {
        let proc = one("cmd FOO=bar");
        assert!(proc.env.is_empty());
        assert_eq!(proc.argv, ["cmd", "FOO=bar"]);
    }

    #[test]
    fn invalid_names_are_not_assignments() {
        let proc = one("2FOO=bar cmd");
        assert_eq!(proc.argv, ["2FOO=bar", "cmd"]);
        let proc = one("=x cmd");
        assert_eq!(proc.argv, ["=x", "cmd"]);
    }

    #[test]
    fn pipeline_of_three() {
        let pipeline = parse("a|b|c").unwrap();
        let argvs: Vec<_> = pipeline.procs.iter().map(|p| p.argv.clone()).collect();
        assert_eq!(argvs, [["a"], ["b"], ["c"]]);
    }

    #[test]
    fn redirections_with_descriptors() {
        let proc = one("cmd 2>err.txt >&1");
        assert_eq!(proc.argv, ["cmd"]);
        assert_eq!(
            proc.redirs,
            [
                Redirection {
                    fd: 2,
                    kind: RedirKind::PathTrunc,
                    source: RedirSource::Path("err.txt".into()),
                },
                Redirection {
                    fd: 1,
                    kind: RedirKind::FdOut,
                    source: RedirSource::Fd(1),
                },
            ]
        );
    }

    #[test]
    fn default_descriptors() {
        let proc = one("cmd <in >>log <>io");
        assert_eq!(
            proc.redirs
                .iter()
                .map(|r| (r.fd, r.kind))
                .collect::<Vec<_>>(),
            [
                (0, RedirKind::PathIn),
                (1, RedirKind::PathAppend),
                (0, RedirKind::PathInOut),
            ]
        );
    }

    #[test]
    fn non_numeric_pre_meta_word_stays_an_argument() {
        let proc = one("echo abc>out");
        assert_eq!(proc.argv, ["echo", "abc"]);
        assert_eq!(
            proc.redirs,
            [Redirection {
                fd: 1,
                kind: RedirKind::PathTrunc,
                source: RedirSource::Path("out".into()),
            }]
        );
    }

    #[test]
    fn quoted_words_concatenate() {
        let proc = one("\"hello world\"");
        assert_eq!(proc.argv, ["hello world"]);
        let proc = one("'it''s'");
        assert_eq!(proc.argv, ["its"]);
    }

    #[test]
    fn unterminated_quote_reports_the_quote() {
        let e = err("'unterminated");
        assert!(e.message.contains("unexpected EOF while looking for matching quote"));
    }

    #[test]
    fn trailing_pipe_is_an_error() {
        let e = err("cmd |");
        assert_eq!(e.message, "syntax error: unexpected end of file");
    }

    #[test]
    fn leading_pipe_is_an_error() {
        let e = err("| cmd");
        assert_eq!(e.message, "unexpected metacharacter `|'");
    }

    #[test]
    fn unsupported_operators_are_errors() {
        assert_eq!(err("a && b").message, "unexpected metacharacter `&&'");
        assert_eq!(err("a ; b").message, "unexpected metacharacter `;'");
        assert_eq!(err("cmd <<eof").message, "unknown redirection op `<<'");
    }

    #[test]
    fn missing_redirection_target_is_an_error() {
        assert_eq!(err("cmd >").message, "syntax error: unexpected end of file");
        assert_eq!(err("cmd > | x").message, "unexpected metacharacter `|'");
    }

    #[test]
    fn bad_fd_source_is_an_error() {
        assert_eq!(err("cmd >&file").message, "invalid redirection fd `file'");
    }

    #[test]
    fn error_lines_follow_newlines() {
        let e = err("ok\nok\ncmd |");
        assert_eq!(e.line, 3);
    }

    #[test]
    fn empty_input_is_an_empty_pipeline() {
        let pipeline = parse("").unwrap();
        assert!(pipeline.is_empty());
        let pipeline = parse(" \t\n").unwrap();
        assert!(pipeline.is_empty());
        let pipeline = parse("FOO=bar").unwrap();
        assert!(!pipeline.is_empty());
    }
}
