//! Line-oriented tokenizer.
//!
//! Leading whitespace is turned into `Indent`/`Dedent` tokens against an
//! indent stack; blank and comment-only lines never affect indentation.
//! Inside open brackets a line break is not a statement boundary.

use std::iter::Peekable;
use std::str::Chars;

use super::{ErrorKind, SandboxError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Name(String),
    Int(i64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    Plus,
    Minus,
    Star,
    SlashSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) line: usize,
}

pub(crate) fn syntax_error(message: impl AsRef<str>, line: usize) -> SandboxError {
    SandboxError::new(
        ErrorKind::SyntaxError,
        format!("{} (line {line})", message.as_ref()),
    )
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SandboxError> {
    let mut tokens = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut bracket_depth = 0usize;
    let mut last_line = 1;

    for (index, raw_line) in source.split('\n').enumerate() {
        let line_no = index + 1;
        last_line = line_no;
        let text = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let mut line = LineLexer::new(text, line_no);

        if bracket_depth == 0 {
            let width = line.skip_indent();
            if line.at_logical_end() {
                continue;
            }
            apply_indent(width, &mut indents, &mut tokens, line_no)?;
        }

        line.lex_rest(&mut tokens, &mut bracket_depth)?;
        if bracket_depth == 0 && !ends_statement(&tokens) {
            tokens.push(Token {
                kind: TokenKind::Newline,
                line: line_no,
            });
        }
    }

    if bracket_depth > 0 {
        return Err(syntax_error("unexpected EOF while parsing", last_line));
    }
    if !ends_statement(&tokens) {
        tokens.push(Token {
            kind: TokenKind::Newline,
            line: last_line,
        });
    }
    while indents.len() > 1 {
        indents.pop();
        tokens.push(Token {
            kind: TokenKind::Dedent,
            line: last_line,
        });
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        line: last_line,
    });
    Ok(tokens)
}

fn ends_statement(tokens: &[Token]) -> bool {
    matches!(
        tokens.last().map(|token| &token.kind),
        None | Some(TokenKind::Newline) | Some(TokenKind::Indent) | Some(TokenKind::Dedent)
    )
}

fn apply_indent(
    width: usize,
    indents: &mut Vec<usize>,
    tokens: &mut Vec<Token>,
    line: usize,
) -> Result<(), SandboxError> {
    let current = indents.last().copied().unwrap_or(0);
    if width > current {
        indents.push(width);
        tokens.push(Token {
            kind: TokenKind::Indent,
            line,
        });
        return Ok(());
    }
    while indents.last().is_some_and(|top| *top > width) {
        indents.pop();
        tokens.push(Token {
            kind: TokenKind::Dedent,
            line,
        });
    }
    if indents.last().copied().unwrap_or(0) != width {
        return Err(SandboxError::new(
            ErrorKind::IndentationError,
            format!("unindent does not match any outer indentation level (line {line})"),
        ));
    }
    Ok(())
}

struct LineLexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> LineLexer<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self {
            chars: text.chars().peekable(),
            line,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn consume_if(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.next_char();
            true
        } else {
            false
        }
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            buf.push(c);
            self.next_char();
        }
    }

    /// Consumes leading whitespace and returns its width; tabs advance to
    /// the next multiple of 8.
    fn skip_indent(&mut self) -> usize {
        let mut width = 0;
        loop {
            match self.peek_char() {
                Some(' ') => width += 1,
                Some('\t') => width = (width / 8 + 1) * 8,
                _ => return width,
            }
            self.next_char();
        }
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek_char(), Some(' ' | '\t')) {
            self.next_char();
        }
    }

    /// True when only a comment or nothing is left on the line.
    fn at_logical_end(&mut self) -> bool {
        matches!(self.peek_char(), None | Some('#'))
    }

    fn lex_rest(
        &mut self,
        tokens: &mut Vec<Token>,
        bracket_depth: &mut usize,
    ) -> Result<(), SandboxError> {
        loop {
            self.skip_spaces();
            if self.at_logical_end() {
                return Ok(());
            }
            let Some(c) = self.next_char() else {
                return Ok(());
            };
            let kind = match c {
                '(' | '[' => {
                    *bracket_depth += 1;
                    if c == '(' {
                        TokenKind::LParen
                    } else {
                        TokenKind::LBracket
                    }
                }
                ')' | ']' => {
                    if *bracket_depth == 0 {
                        return Err(syntax_error(format!("unmatched '{c}'"), self.line));
                    }
                    *bracket_depth -= 1;
                    if c == ')' {
                        TokenKind::RParen
                    } else {
                        TokenKind::RBracket
                    }
                }
                ',' => TokenKind::Comma,
                ':' => TokenKind::Colon,
                '%' => TokenKind::Percent,
                '+' if self.consume_if('=') => TokenKind::PlusAssign,
                '+' => TokenKind::Plus,
                '-' if self.consume_if('=') => TokenKind::MinusAssign,
                '-' => TokenKind::Minus,
                '*' if self.consume_if('=') => TokenKind::StarAssign,
                '*' => TokenKind::Star,
                '/' if self.consume_if('/') => TokenKind::SlashSlash,
                '/' => {
                    return Err(syntax_error(
                        "true division is not available, use '//'",
                        self.line,
                    ))
                }
                '=' if self.consume_if('=') => TokenKind::EqEq,
                '=' => TokenKind::Assign,
                '!' if self.consume_if('=') => TokenKind::NotEq,
                '<' if self.consume_if('=') => TokenKind::LtE,
                '<' => TokenKind::Lt,
                '>' if self.consume_if('=') => TokenKind::GtE,
                '>' => TokenKind::Gt,
                '\'' | '"' => TokenKind::Str(self.read_string(c)?),
                c if c.is_ascii_digit() => TokenKind::Int(self.read_int(c)?),
                c if c.is_alphabetic() || c == '_' => TokenKind::Name(self.read_identifier(c)),
                other => {
                    return Err(syntax_error(
                        format!("invalid character '{other}'"),
                        self.line,
                    ))
                }
            };
            tokens.push(Token {
                kind,
                line: self.line,
            });
        }
    }

    fn read_identifier(&mut self, first: char) -> String {
        let mut id = String::new();
        id.push(first);
        self.consume_while(|c| c.is_alphanumeric() || c == '_', &mut id);
        id
    }

    fn read_int(&mut self, first: char) -> Result<i64, SandboxError> {
        let mut digits = String::new();
        digits.push(first);
        self.consume_while(|c| c.is_ascii_digit() || c == '_', &mut digits);
        if self.peek_char().is_some_and(|c| c.is_alphabetic() || c == '.') {
            return Err(syntax_error("invalid decimal literal", self.line));
        }
        let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
        cleaned.parse::<i64>().map_err(|_| {
            SandboxError::new(
                ErrorKind::OverflowError,
                format!("integer literal too large (line {})", self.line),
            )
        })
    }

    fn read_string(&mut self, quote: char) -> Result<String, SandboxError> {
        let mut value = String::new();
        loop {
            match self.next_char() {
                None => {
                    return Err(syntax_error("unterminated string literal", self.line));
                }
                Some(c) if c == quote => return Ok(value),
                Some('\\') => match self.next_char() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('\\') => value.push('\\'),
                    Some('\'') => value.push('\''),
                    Some('"') => value.push('"'),
                    Some('0') => value.push('\0'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => {
                        return Err(syntax_error("unterminated string literal", self.line));
                    }
                },
                Some(c) => value.push(c),
            }
        }
    }
}
