//! Command line parsing.
//!
//! A line is split into a verb, ordered positional arguments and named
//! `key:value` arguments. Parsing is total: every input produces a
//! [`Command`], malformed quoting is kept as literal text.

use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

/// Immutable parse result of one input line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    verb: String,
    simple_args: Vec<String>,
    named_args: HashMap<String, String>,
}

impl Command {
    /// Parse a raw input line.
    ///
    /// The first token is the verb (lowercased) unless it is itself a named
    /// argument, in which case the verb is empty and the whole line is
    /// argument parsing.
    pub fn parse(raw: &str) -> Self {
        let mut tokens = tokenize(raw).into_iter();
        let mut cmd = Command::default();

        let Some(first) = tokens.next() else {
            return cmd;
        };
        if first.named_split().is_some() {
            cmd.push_arg(first);
        } else {
            cmd.verb = first.text.to_lowercase();
        }
        for token in tokens {
            cmd.push_arg(token);
        }
        cmd
    }

    fn push_arg(&mut self, token: Token) {
        match token.named_split() {
            Some(colon) => {
                let key = token.text[..colon].to_lowercase();
                let value = token.text[colon + 1..].to_string();
                self.named_args.insert(key, value);
            },
            None => self.simple_args.push(token.text),
        }
    }

    /// The lowercased verb. Empty for blank lines.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Positional arguments in encounter order.
    pub fn simple_args(&self) -> &[String] {
        &self.simple_args
    }

    /// Positional argument at `index`, if present.
    pub fn simple_arg(&self, index: usize) -> Option<&str> {
        self.simple_args.get(index).map(String::as_str)
    }

    /// Look up a named argument (keys are case-insensitive).
    pub fn named_arg(&self, key: &str) -> Option<&str> {
        self.named_args
            .get(&key.to_lowercase())
            .map(String::as_str)
    }

    /// Look up a named argument, treating an empty value as absent.
    pub fn non_empty_named_arg(&self, key: &str) -> Option<&str> {
        self.named_arg(key).filter(|v| !v.is_empty())
    }

    /// All named arguments, keyed by lowercased name.
    pub fn named_args(&self) -> &HashMap<String, String> {
        &self.named_args
    }

    pub fn named_arg_count(&self) -> usize {
        self.named_args.len()
    }

    /// Whether any positional argument equals one of `flags` exactly.
    pub fn has_flag(&self, flags: &[&str]) -> bool {
        self.simple_args
            .iter()
            .any(|a| flags.contains(&a.as_str()))
    }

    /// Whether the line carried neither positional nor named arguments.
    pub fn has_no_args(&self) -> bool {
        self.simple_args.is_empty() && self.named_args.is_empty()
    }
}

impl FromStr for Command {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Command::parse(s))
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        Command::parse(s)
    }
}

/// Split a string into argument words using the command quoting rules.
///
/// Named-argument detection is not applied; `a:b` stays one word.
pub fn split_arguments(raw: &str) -> Vec<String> {
    tokenize(raw).into_iter().map(|t| t.text).collect()
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Token {
    text: String,
    /// Byte offset of the first `:` seen outside quotes and not escaped.
    colon: Option<usize>,
}

impl Token {
    /// Offset of the key/value separator when this token is a named argument.
    fn named_split(&self) -> Option<usize> {
        let colon = self.colon?;
        if colon == 0 || is_drive_prefix(&self.text, colon) {
            return None;
        }
        Some(colon)
    }
}

/// `C:\Games` is a path, not a named argument.
fn is_drive_prefix(text: &str, colon: usize) -> bool {
    let bytes = text.as_bytes();
    colon == 1 && bytes[0].is_ascii_alphabetic() && bytes.get(2) == Some(&b'\\')
}

/// Tokenize respecting double quotes.
///
/// - Whitespace outside quotes separates tokens.
/// - `"..."` spans are kept as part of the current token with the quotes
///   stripped; `""` yields an empty token.
/// - `\"` and `\:` escape the next character; other backslashes are literal
///   so Windows paths survive.
/// - An unterminated quote is re-inserted as a literal `"`.
fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut colon = None;
    let mut started = false;
    let mut quote_open: Option<usize> = None;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if quote_open.is_some() {
            match ch {
                '"' => quote_open = None,
                '\\' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                },
                _ => current.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                started = true;
                quote_open = Some(current.len());
            },
            '\\' if matches!(chars.peek(), Some('"') | Some(':')) => {
                started = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            },
            ':' => {
                started = true;
                if colon.is_none() {
                    colon = Some(current.len());
                }
                current.push(':');
            },
            c if c.is_whitespace() => {
                if started {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        colon: colon.take(),
                    });
                    started = false;
                }
            },
            _ => {
                started = true;
                current.push(ch);
            },
        }
    }

    if let Some(at) = quote_open {
        current.insert(at, '"');
    }
    if started {
        tokens.push(Token {
            text: current,
            colon,
        });
    }

    tokens
}
