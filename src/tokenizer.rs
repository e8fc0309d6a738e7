use std::fmt;

use crate::error::{Error, Result};

/// Represents the smallest meaningful units (atoms) of the SQL language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // --- SQL Keywords ---
    Create,
    Table,
    Drop,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    Update,
    Set,
    Delete,
    And,
    Or,
    Not,
    Is,
    Null,
    As,
    Limit,
    Order,
    By,
    Asc,
    Desc,
    Primary,
    Key,

    // --- Data Types ---
    Integer,
    Text,
    Boolean,

    // --- Identifiers & Literals ---
    /// A name representing a table or a column (e.g., `users`, `id`).
    Ident(String),
    /// A 64-bit integer literal (e.g., `42`).
    Number(i64),
    /// A string literal, defined between single quotes (e.g., `'Alice'`).
    String(String),
    /// The boolean literal `TRUE`.
    True,
    /// The boolean literal `FALSE`.
    False,

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Semicolon `;`
    Semicolon,
    /// Multiplication or wildcard symbol `*`
    Star,
    Plus,
    Minus,
    Slash,
    Equal,
    /// `<>` or `!=`
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // --- Special ---
    /// Represents the end of the current statement.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::Ident(name) => return write!(f, "identifier '{name}'"),
            Self::Number(n) => return write!(f, "number {n}"),
            Self::String(s) => return write!(f, "string '{s}'"),
            Self::Eof => return write!(f, "end of input"),
            Self::Create => "CREATE",
            Self::Table => "TABLE",
            Self::Drop => "DROP",
            Self::Insert => "INSERT",
            Self::Into => "INTO",
            Self::Values => "VALUES",
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Update => "UPDATE",
            Self::Set => "SET",
            Self::Delete => "DELETE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Is => "IS",
            Self::Null => "NULL",
            Self::As => "AS",
            Self::Limit => "LIMIT",
            Self::Order => "ORDER",
            Self::By => "BY",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Primary => "PRIMARY",
            Self::Key => "KEY",
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::LeftParen => "'('",
            Self::RightParen => "')'",
            Self::Comma => "','",
            Self::Semicolon => "';'",
            Self::Star => "'*'",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Slash => "'/'",
            Self::Equal => "'='",
            Self::NotEqual => "'<>'",
            Self::Less => "'<'",
            Self::LessEqual => "'<='",
            Self::Greater => "'>'",
            Self::GreaterEqual => "'>='",
        };
        write!(f, "{keyword}")
    }
}

/// A token together with the character offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// A lexical scanner (lexer) that converts a raw SQL string into a sequence of [Token]s.
///
/// The tokenizer is an [Iterator]: tokens are produced lazily, one per call to
/// `next`, and the sequence ends when the input is exhausted. After a lexical
/// error the scanner resumes past the offending character, so callers may keep
/// pulling tokens to resynchronize.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens, stopping at
    /// the first lexical error.
    ///
    /// # Example
    /// ```
    /// # use minisql::tokenizer::{Tokenizer, TokenKind};
    /// let tokens = Tokenizer::new("SELECT *").tokenize().unwrap();
    /// assert_eq!(tokens[0].kind, TokenKind::Select);
    /// assert_eq!(tokens[1].offset, 7);
    /// ```
    pub fn tokenize(self) -> Result<Vec<Token>> {
        self.collect()
    }

    /// Offset one past the last character of the input.
    pub fn end_offset(&self) -> usize {
        self.input.len()
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token> {
        let start = self.position;
        let ch = self.current_char();

        let kind = match ch {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '*' => self.single(TokenKind::Star),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '/' => self.single(TokenKind::Slash),
            '=' => self.single(TokenKind::Equal),
            '<' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => self.single(TokenKind::LessEqual),
                    Some('>') => self.single(TokenKind::NotEqual),
                    _ => TokenKind::Less,
                }
            }
            '>' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => self.single(TokenKind::GreaterEqual),
                    _ => TokenKind::Greater,
                }
            }
            '!' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => self.single(TokenKind::NotEqual),
                    _ => {
                        return Err(Error::Lexical {
                            offset: start,
                            message: "character '!' is not supported".into(),
                        });
                    }
                }
            }
            '\'' => self.read_string()?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number()?,
            _ => {
                self.advance();
                return Err(Error::Lexical {
                    offset: start,
                    message: format!("character {ch:?} is not supported"),
                });
            }
        };

        tracing::trace!(offset = start, token = %kind, "token");
        Ok(Token::new(kind, start))
    }

    // --- Navigation Helpers ---

    /// Returns the character at the current position.
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Moves the cursor forward by one character.
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Consumes one character and yields `kind`.
    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Checks if the cursor has reached the end of the input.
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Consumes any whitespace characters (spaces, tabs, newlines).
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads a sequence of alphanumeric characters and determines if it's
    /// a reserved SQL keyword or a user-defined identifier.
    ///
    /// Keywords are matched case-insensitively; identifiers keep their case.
    fn read_identifier(&mut self) -> TokenKind {
        let mut ident = String::new();

        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            ident.push(self.current_char());
            self.advance();
        }

        match ident.to_uppercase().as_str() {
            "CREATE" => TokenKind::Create,
            "TABLE" => TokenKind::Table,
            "DROP" => TokenKind::Drop,
            "INSERT" => TokenKind::Insert,
            "INTO" => TokenKind::Into,
            "VALUES" => TokenKind::Values,
            "SELECT" => TokenKind::Select,
            "FROM" => TokenKind::From,
            "WHERE" => TokenKind::Where,
            "UPDATE" => TokenKind::Update,
            "SET" => TokenKind::Set,
            "DELETE" => TokenKind::Delete,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "IS" => TokenKind::Is,
            "NULL" => TokenKind::Null,
            "AS" => TokenKind::As,
            "LIMIT" => TokenKind::Limit,
            "ORDER" => TokenKind::Order,
            "BY" => TokenKind::By,
            "ASC" => TokenKind::Asc,
            "DESC" => TokenKind::Desc,
            "PRIMARY" => TokenKind::Primary,
            "KEY" => TokenKind::Key,
            "INT" | "INTEGER" => TokenKind::Integer,
            "TEXT" | "VARCHAR" => TokenKind::Text,
            "BOOL" | "BOOLEAN" => TokenKind::Boolean,
            "TRUE" => TokenKind::True,
            "FALSE" => TokenKind::False,
            _ => TokenKind::Ident(ident),
        }
    }

    /// Reads an unsigned integer literal. Negative numbers are parsed as a
    /// unary minus applied to the literal.
    fn read_number(&mut self) -> Result<TokenKind> {
        let start = self.position;
        let mut number = String::new();

        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            number.push(self.current_char());
            self.advance();
        }

        number
            .parse::<i64>()
            .map(TokenKind::Number)
            .map_err(|e| Error::Lexical {
                offset: start,
                message: format!("invalid integer literal {number}: {e}"),
            })
    }

    /// Reads a string literal enclosed in single quotes. A doubled quote `''`
    /// inside the literal stands for one quote character.
    fn read_string(&mut self) -> Result<TokenKind> {
        let start = self.position;
        self.advance(); // Skip the opening quote

        let mut string = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(Error::Lexical {
                        offset: start,
                        message: "unterminated string literal".into(),
                    });
                }
                Some('\'') => {
                    self.advance();
                    if self.peek_char() == Some('\'') {
                        string.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    string.push(c);
                    self.advance();
                }
            }
        }

        Ok(TokenKind::String(string))
    }
}

impl Iterator for Tokenizer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        if self.is_at_end() {
            return None;
        }
        Some(self.next_token())
    }
}
