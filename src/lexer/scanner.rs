use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// Scanner for VectorL source text
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Start position of current token
    start: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Line where the current token starts
    start_line: usize,
    /// Column where the current token starts
    start_column: usize,
}

impl Scanner {
    /// Creates a new scanner over source code
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scans all tokens from source code and returns them as a vector
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
            (self.current, self.current),
        ));

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();

        match c {
            ' ' | '\r' | '\t' | '\x0c' => {}
            '\n' => {
                self.line += 1;
                self.column = 1;
            }

            '/' => {
                if self.match_char('/') {
                    self.skip_line_comment();
                } else if self.match_char('*') {
                    self.skip_block_comment()?;
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }

            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            '[' => self.add_token(TokenKind::LeftBracket),
            ']' => self.add_token(TokenKind::RightBracket),
            ',' => self.add_token(TokenKind::Comma),
            ';' => self.add_token(TokenKind::Semicolon),
            '?' => self.add_token(TokenKind::Question),
            '~' => self.add_token(TokenKind::Tilde),
            '^' => self.add_token(TokenKind::Caret),
            '+' => self.add_token(TokenKind::Plus),
            '-' => self.add_token(TokenKind::Minus),
            '*' => self.add_token(TokenKind::Star),
            '%' => self.add_token(TokenKind::Percent),

            '.' => {
                if self.peek() == '.' && self.peek_next() == '.' {
                    self.advance();
                    self.advance();
                    self.add_token(TokenKind::Ellipsis);
                } else {
                    self.add_token(TokenKind::Dot);
                }
            }
            ':' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::Assign);
                } else {
                    self.add_token(TokenKind::Colon);
                }
            }
            '=' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::EqEq);
                } else {
                    self.add_token(TokenKind::Equals);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::NotEq);
                } else {
                    self.add_token(TokenKind::Bang);
                }
            }
            '<' => {
                if self.match_char('<') {
                    self.add_token(TokenKind::Shl);
                } else if self.match_char('=') {
                    self.add_token(TokenKind::LtEq);
                } else {
                    self.add_token(TokenKind::Lt);
                }
            }
            '>' => {
                if self.match_char('>') {
                    self.add_token(TokenKind::Shr);
                } else if self.match_char('=') {
                    self.add_token(TokenKind::GtEq);
                } else {
                    self.add_token(TokenKind::Gt);
                }
            }
            '&' => {
                if self.match_char('&') {
                    self.add_token(TokenKind::AndAnd);
                } else {
                    self.add_token(TokenKind::Amp);
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.add_token(TokenKind::OrOr);
                } else {
                    self.add_token(TokenKind::Pipe);
                }
            }

            '"' => self.scan_string()?,

            c if c.is_ascii_digit() => self.scan_number()?,

            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier_or_keyword(),

            _ => {
                return Err(Error::LexError {
                    ch: c,
                    line: self.start_line,
                    column: self.start_column,
                });
            }
        }

        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        loop {
            if self.is_at_end() {
                return Err(Error::syntax(
                    self.start_line,
                    self.start_column,
                    "unterminated comment",
                ));
            }
            let c = self.advance();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else if c == '*' && self.match_char('/') {
                return Ok(());
            }
        }
    }

    fn scan_string(&mut self) -> Result<()> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() == '\\' {
                self.advance();
                let escaped = self.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    _ => {
                        return Err(Error::syntax(
                            self.line,
                            self.column,
                            format!("invalid escape sequence \\{}", escaped),
                        ));
                    }
                }
            } else {
                if self.peek() == '\n' {
                    return Err(Error::syntax(
                        self.start_line,
                        self.start_column,
                        "unterminated string",
                    ));
                }
                value.push(self.advance());
            }
        }

        if self.is_at_end() {
            return Err(Error::syntax(
                self.start_line,
                self.start_column,
                "unterminated string",
            ));
        }

        self.advance(); // closing "
        self.add_token(TokenKind::String(value));
        Ok(())
    }

    fn scan_number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance(); // consume .
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if matches!(self.peek(), 'e' | 'E') {
            let signed = matches!(self.peek_next(), '+' | '-');
            let digit_at = if signed { self.current + 2 } else { self.current + 1 };
            if self.char_at(digit_at).is_ascii_digit() {
                is_float = true;
                self.advance(); // e
                if signed {
                    self.advance();
                }
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        if is_float {
            let value: f64 = text.parse().map_err(|_| {
                Error::syntax(self.start_line, self.start_column, format!("invalid float literal {}", text))
            })?;
            self.add_token(TokenKind::Float(value));
        } else {
            let value: i64 = text.parse().map_err(|_| {
                Error::syntax(
                    self.start_line,
                    self.start_column,
                    format!("integer literal {} out of range", text),
                )
            })?;
            self.add_token(TokenKind::Integer(value));
        }

        Ok(())
    }

    fn scan_identifier_or_keyword(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let kind = if text == "_" {
            TokenKind::Underscore
        } else {
            TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier(text))
        };
        self.add_token(kind);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn char_at(&self, pos: usize) -> char {
        self.source.get(pos).copied().unwrap_or('\0')
    }

    fn peek(&self) -> char {
        self.char_at(self.current)
    }

    fn peek_next(&self) -> char {
        self.char_at(self.current + 1)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            self.column += 1;
            true
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(
            kind,
            lexeme,
            self.start_line,
            self.start_column,
            (self.start, self.current),
        ));
    }
}
