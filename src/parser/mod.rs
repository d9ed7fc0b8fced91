pub mod lexer;
pub mod parser;
pub mod types;
pub mod word_parser;

pub use lexer::{Lexer, Token, TokenType};
pub use parser::{parse, Parser};
pub use types::ParseException;
pub use word_parser::parse_word;
