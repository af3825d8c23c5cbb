use serde::{Deserialize, Serialize};
use std::fmt;

/// A single token from the source code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token
    pub lexeme: String,
    /// Line number where token appears (1-indexed)
    pub line: usize,
    /// Column number where token starts (1-indexed)
    pub column: usize,
    /// Character offsets `[start, end)` in the source
    pub span: (usize, usize),
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: String, line: usize, column: usize, span: (usize, usize)) -> Self {
        Token {
            kind,
            lexeme,
            line,
            column,
            span,
        }
    }
}

/// All token types of VectorL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Integer(i64),
    /// Floating-point literal
    Float(f64),
    /// String literal (only legal in `print`)
    String(String),
    /// `true`
    True,
    /// `false`
    False,

    /// Identifier
    Identifier(String),

    // Type names
    /// `int`
    Int,
    /// `real`
    Real,
    /// `bool`
    Bool,
    /// `time`
    Time,

    // Declarations
    /// `const`
    Const,
    /// `var`
    Var,
    /// `let`
    Let,
    /// `event`
    Event,
    /// `on`
    On,
    /// `func`
    Func,

    // Statements
    /// `emit`
    Emit,
    /// `after`
    After,
    /// `print`
    Print,
    /// `import`
    Import,
    /// `from`
    From,
    /// `if`
    If,
    /// `then` (reserved)
    Then,
    /// `else`
    Else,

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `~`
    Tilde,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `=`
    Equals,
    /// `:=`
    Assign,
    /// `?`
    Question,
    /// `:`
    Colon,

    // Delimiters
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `;`
    Semicolon,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `_` full-axis selector
    Underscore,
    /// `...`
    Ellipsis,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Reserved word for an identifier-shaped lexeme
    pub fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "int" => TokenKind::Int,
            "real" => TokenKind::Real,
            "bool" => TokenKind::Bool,
            "time" => TokenKind::Time,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "let" => TokenKind::Let,
            "event" => TokenKind::Event,
            "on" => TokenKind::On,
            "func" => TokenKind::Func,
            "emit" => TokenKind::Emit,
            "after" => TokenKind::After,
            "print" => TokenKind::Print,
            "import" => TokenKind::Import,
            "from" => TokenKind::From,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            _ => return None,
        })
    }

    /// Checks if this token is a reserved word
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Real
                | TokenKind::Bool
                | TokenKind::Time
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::Let
                | TokenKind::Event
                | TokenKind::On
                | TokenKind::Func
                | TokenKind::Emit
                | TokenKind::After
                | TokenKind::Print
                | TokenKind::Import
                | TokenKind::From
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
        )
    }

    /// Checks if this token names a scalar type
    pub fn is_type_name(&self) -> bool {
        matches!(
            self,
            TokenKind::Int | TokenKind::Real | TokenKind::Bool | TokenKind::Time
        )
    }

    /// Checks if this token opens a top-level declaration
    pub fn starts_declaration(&self) -> bool {
        matches!(
            self,
            TokenKind::Import
                | TokenKind::From
                | TokenKind::Event
                | TokenKind::Func
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::On
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::Float(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Int => write!(f, "int"),
            TokenKind::Real => write!(f, "real"),
            TokenKind::Bool => write!(f, "bool"),
            TokenKind::Time => write!(f, "time"),
            TokenKind::Const => write!(f, "const"),
            TokenKind::Var => write!(f, "var"),
            TokenKind::Let => write!(f, "let"),
            TokenKind::Event => write!(f, "event"),
            TokenKind::On => write!(f, "on"),
            TokenKind::Func => write!(f, "func"),
            TokenKind::Emit => write!(f, "emit"),
            TokenKind::After => write!(f, "after"),
            TokenKind::Print => write!(f, "print"),
            TokenKind::Import => write!(f, "import"),
            TokenKind::From => write!(f, "from"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Then => write!(f, "then"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Amp => write!(f, "&"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::Shl => write!(f, "<<"),
            TokenKind::Shr => write!(f, ">>"),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Equals => write!(f, "="),
            TokenKind::Assign => write!(f, ":="),
            TokenKind::Question => write!(f, "?"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::LeftBracket => write!(f, "["),
            TokenKind::RightBracket => write!(f, "]"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::LeftBrace => write!(f, "{{"),
            TokenKind::RightBrace => write!(f, "}}"),
            TokenKind::Underscore => write!(f, "_"),
            TokenKind::Ellipsis => write!(f, "..."),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}
