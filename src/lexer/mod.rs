//! Lexical analysis for VectorL
//!
//! Converts source text into a stream of tokens, each carrying its line,
//! column and character span.

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};
