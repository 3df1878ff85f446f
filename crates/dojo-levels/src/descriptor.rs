//! Level descriptor grammar.
//!
//! A descriptor is a small declarative file, one per level:
//!
//! ```text
//! difficulty 2
//! description "Stage the README file."
//! hints [
//!   "Look at `git add`.",
//!   "Run `git status` to see what is staged."]
//! setup do
//!   prepares a repository with an untracked README
//! end
//! solution
//! ```
//!
//! `difficulty`, `description`, `hints` and `requests` are data. `setup`,
//! `solution` and `hint` only *bind* logic: the logic itself is compiled into
//! the handler registry. A binding is written as a bare keyword, a quoted
//! handler name (`solution "init"`), or a `do ... end` block whose body is kept
//! as opaque text and never executed. A block ends at the first line reading
//! `end` that is indented no deeper than the line holding its `do`.

use std::collections::HashSet;

use thiserror::Error;

/// Errors produced while tokenizing or parsing a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Input ended in the middle of a declaration.
    #[error("unexpected end of input after '{after}'")]
    UnexpectedEof {
        /// The field being parsed.
        after: String,
    },
    /// A token appeared where it is not allowed.
    #[error("line {line}: unexpected {found}")]
    UnexpectedToken {
        /// 1-based line number.
        line: usize,
        /// Description of the offending token.
        found: String,
    },
    /// A character that cannot start any token.
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar {
        /// 1-based line number.
        line: usize,
        /// The character.
        ch: char,
    },
    /// A field name that is not part of the grammar.
    #[error("line {line}: unknown field '{name}'")]
    UnknownField {
        /// 1-based line number.
        line: usize,
        /// The field name.
        name: String,
    },
    /// The same field declared twice.
    #[error("line {line}: field '{name}' declared more than once")]
    DuplicateField {
        /// 1-based line number.
        line: usize,
        /// The field name.
        name: String,
    },
    /// `difficulty` with a value that is not a positive integer.
    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// The literal as written.
        value: String,
    },
    /// A string literal without a closing quote.
    #[error("line {line}: unterminated string")]
    UnterminatedString {
        /// 1-based line number where the string starts.
        line: usize,
    },
    /// A `do` block without a matching `end`.
    #[error("line {line}: 'do' block is missing its 'end'")]
    UnterminatedBlock {
        /// 1-based line number where the block starts.
        line: usize,
    },
}

impl DescriptorError {
    /// What the level author should do about this error.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::UnexpectedEof { .. } => "Give the last field in the descriptor a value",
            Self::UnexpectedToken { .. } | Self::InvalidNumber { .. } => {
                "Check the field's value: difficulty takes a positive number, description a string, hints and requests a [ ... ] list of strings"
            }
            Self::UnexpectedChar { .. } => "Remove the stray character or quote the text it belongs to",
            Self::UnknownField { .. } => {
                "Use only difficulty, description, hints, requests, setup, solution and hint"
            }
            Self::DuplicateField { .. } => "Declare each field once",
            Self::UnterminatedString { .. } => "Close the string with the quote it was opened with",
            Self::UnterminatedBlock { .. } => {
                "Close the block with an 'end' line indented like the line holding 'do'"
            }
        }
    }
}

/// How a descriptor binds one of its logic capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Bare keyword: use the handler registered under the level id.
    Implicit,
    /// Quoted handler name.
    Named(String),
    /// `do ... end` block; the body is documentation only.
    Block(String),
}

impl Binding {
    /// Returns the registry name this binding resolves against.
    #[must_use]
    pub fn handler_name<'a>(&'a self, level_id: &'a str) -> &'a str {
        match self {
            Self::Named(name) => name,
            Self::Implicit | Self::Block(_) => level_id,
        }
    }
}

/// Parsed, uninterpreted contents of a descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    /// `difficulty <int>`.
    pub difficulty: Option<u32>,
    /// `description "<string>"`.
    pub description: Option<String>,
    /// `hints [ ... ]`.
    pub hints: Option<Vec<String>>,
    /// `requests [ ... ]`.
    pub requests: Option<Vec<String>>,
    /// `setup` binding.
    pub setup: Option<Binding>,
    /// `solution` binding.
    pub solution: Option<Binding>,
    /// `hint` binding.
    pub hint: Option<Binding>,
}

impl Descriptor {
    /// Parses descriptor source text.
    ///
    /// Only the grammar is checked here; semantic rules (a mandatory
    /// `solution`, `hints` versus `hint`) are enforced by the loader.
    pub fn parse(source: &str) -> Result<Self, DescriptorError> {
        let tokens = tokenize(source)?;
        Parser::new(tokens).parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Int(String),
    Str(String),
    Block(String),
    LBracket,
    RBracket,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{name}'"),
            Self::Int(value) => format!("number {value}"),
            Self::Str(_) => "string".to_string(),
            Self::Block(_) => "'do' block".to_string(),
            Self::LBracket => "'['".to_string(),
            Self::RBracket => "']'".to_string(),
            Self::Comma => "','".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, DescriptorError> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
    };
    let mut tokens = Vec::new();

    while let Some(ch) = lexer.peek() {
        if ch == '\n' {
            lexer.line += 1;
            lexer.pos += 1;
            continue;
        }
        if ch.is_whitespace() {
            lexer.pos += 1;
            continue;
        }
        if ch == '#' {
            lexer.skip_comment();
            continue;
        }

        let line = lexer.line;
        let token = match ch {
            '"' | '\'' => Token::Str(lexer.string(ch)?),
            '[' => {
                lexer.pos += 1;
                Token::LBracket
            }
            ']' => {
                lexer.pos += 1;
                Token::RBracket
            }
            ',' => {
                lexer.pos += 1;
                Token::Comma
            }
            c if c.is_ascii_digit() || c == '-' => Token::Int(lexer.number()),
            c if is_ident_start(c) => {
                let word = lexer.word();
                if word == "do" {
                    Token::Block(lexer.block(line)?)
                } else {
                    Token::Ident(word)
                }
            }
            other => return Err(DescriptorError::UnexpectedChar { line, ch: other }),
        };
        tokens.push(Spanned { token, line });
    }

    Ok(tokens)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn word(&mut self) -> String {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            value.push(c);
            self.pos += 1;
        }
        value
    }

    fn number(&mut self) -> String {
        let mut value = String::new();
        if self.peek() == Some('-') {
            value.push('-');
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            value.push(c);
            self.pos += 1;
        }
        value
    }

    fn string(&mut self, quote: char) -> Result<String, DescriptorError> {
        let start = self.line;
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                c if c == quote => return Ok(value),
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        break;
                    };
                    self.pos += 1;
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        '\n' => self.line += 1,
                        other => value.push(other),
                    }
                }
                '\n' => {
                    self.line += 1;
                    value.push('\n');
                }
                other => value.push(other),
            }
        }
        Err(DescriptorError::UnterminatedString { line: start })
    }

    /// Consumes a block body line by line.
    ///
    /// The body is opaque: the block closes at the first line reading `end`
    /// that is indented no deeper than the line holding `do`. Deeper `end`
    /// lines belong to the body.
    fn block(&mut self, start: usize) -> Result<String, DescriptorError> {
        let indent = self.line_indent();
        let trailing = self.rest_of_line();
        let trailing = trailing.trim();
        if trailing == "end" {
            return Ok(String::new());
        }

        let mut body = vec![trailing.to_string()];
        while self.peek() == Some('\n') {
            self.pos += 1;
            self.line += 1;
            let text = self.rest_of_line();
            if text.trim() == "end" && indent_of(&text) <= indent {
                return Ok(body.join("\n").trim().to_string());
            }
            body.push(text);
        }

        Err(DescriptorError::UnterminatedBlock { line: start })
    }

    /// Indentation of the line the lexer is on.
    fn line_indent(&self) -> usize {
        let before = self.chars.get(..self.pos).unwrap_or_default();
        let line_start = before.iter().rposition(|&c| c == '\n').map_or(0, |i| i + 1);
        self.chars
            .iter()
            .skip(line_start)
            .take_while(|c| matches!(c, ' ' | '\t'))
            .count()
    }

    /// Consumes text up to, not including, the next newline.
    fn rest_of_line(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.pos += 1;
        }
        text
    }
}

fn indent_of(text: &str) -> usize {
    text.chars().take_while(|c| matches!(c, ' ' | '\t')).count()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn expect(&mut self, field: &str) -> Result<Spanned, DescriptorError> {
        self.advance().ok_or_else(|| DescriptorError::UnexpectedEof {
            after: field.to_string(),
        })
    }

    fn parse(mut self) -> Result<Descriptor, DescriptorError> {
        let mut descriptor = Descriptor::default();
        let mut seen = HashSet::new();

        while let Some(Spanned { token, line }) = self.advance() {
            let Token::Ident(name) = token else {
                return Err(DescriptorError::UnexpectedToken {
                    line,
                    found: token.describe(),
                });
            };
            if !seen.insert(name.clone()) {
                return Err(DescriptorError::DuplicateField { line, name });
            }

            match name.as_str() {
                "difficulty" => descriptor.difficulty = Some(self.parse_number(&name)?),
                "description" => descriptor.description = Some(self.parse_string(&name)?),
                "hints" => descriptor.hints = Some(self.parse_list(&name)?),
                "requests" => descriptor.requests = Some(self.parse_list(&name)?),
                "setup" => descriptor.setup = Some(self.parse_binding()),
                "solution" => descriptor.solution = Some(self.parse_binding()),
                "hint" => descriptor.hint = Some(self.parse_binding()),
                _ => return Err(DescriptorError::UnknownField { line, name }),
            }
        }

        Ok(descriptor)
    }

    fn parse_number(&mut self, field: &str) -> Result<u32, DescriptorError> {
        match self.expect(field)? {
            Spanned {
                token: Token::Int(value),
                line,
            } => value
                .parse()
                .map_err(|_| DescriptorError::InvalidNumber { line, value }),
            Spanned { token, line } => Err(DescriptorError::UnexpectedToken {
                line,
                found: token.describe(),
            }),
        }
    }

    fn parse_string(&mut self, field: &str) -> Result<String, DescriptorError> {
        match self.expect(field)? {
            Spanned {
                token: Token::Str(value),
                ..
            } => Ok(value),
            Spanned { token, line } => Err(DescriptorError::UnexpectedToken {
                line,
                found: token.describe(),
            }),
        }
    }

    fn parse_list(&mut self, field: &str) -> Result<Vec<String>, DescriptorError> {
        let open = self.expect(field)?;
        if open.token != Token::LBracket {
            return Err(DescriptorError::UnexpectedToken {
                line: open.line,
                found: open.token.describe(),
            });
        }

        let mut items = Vec::new();
        loop {
            if self.peek() == Some(&Token::RBracket) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_string(field)?);
            match self.expect(field)? {
                Spanned {
                    token: Token::Comma,
                    ..
                } => {}
                Spanned {
                    token: Token::RBracket,
                    ..
                } => return Ok(items),
                Spanned { token, line } => {
                    return Err(DescriptorError::UnexpectedToken {
                        line,
                        found: token.describe(),
                    })
                }
            }
        }
    }

    fn parse_binding(&mut self) -> Binding {
        match self.peek() {
            Some(Token::Block(body)) => {
                let binding = Binding::Block(body.clone());
                self.pos += 1;
                binding
            }
            Some(Token::Str(name)) => {
                let binding = Binding::Named(name.clone());
                self.pos += 1;
                binding
            }
            _ => Binding::Implicit,
        }
    }
}
