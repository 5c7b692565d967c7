//! Teleidoscope Lexer
//!
//! Tokenizes Teleidoscope source code into a stream of tokens.
//! Handles keywords, operators, number literals, identifiers, and
//! `#` line comments.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tlc_common::{CompilerError, SourceLocation, SourceSpan};

/// Teleidoscope token types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenType {
    /// Number literal, always lexed as a double
    Number(f64),

    /// Identifier: [a-zA-Z][a-zA-Z0-9]*
    Identifier(String),

    // Keywords
    Def,
    Extern,
    If,
    Then,
    Else,
    For,
    In,

    // Operators
    Plus,      // +
    Minus,     // -
    Star,      // *
    Less,      // <
    Equal,     // =

    // Delimiters
    LeftParen,  // (
    RightParen, // )
    Comma,      // ,
    Semicolon,  // ;

    EndOfFile,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Number(n) => write!(f, "{}", n),
            TokenType::Identifier(s) => write!(f, "{}", s),
            TokenType::Def => write!(f, "def"),
            TokenType::Extern => write!(f, "extern"),
            TokenType::If => write!(f, "if"),
            TokenType::Then => write!(f, "then"),
            TokenType::Else => write!(f, "else"),
            TokenType::For => write!(f, "for"),
            TokenType::In => write!(f, "in"),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Star => write!(f, "*"),
            TokenType::Less => write!(f, "<"),
            TokenType::Equal => write!(f, "="),
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::Comma => write!(f, ","),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::EndOfFile => write!(f, "EOF"),
        }
    }
}

/// A token with location information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    pub span: SourceSpan,
}

impl Token {
    pub fn new(token_type: TokenType, span: SourceSpan) -> Self {
        Self { token_type, span }
    }

    pub fn eof(location: SourceLocation) -> Self {
        Self {
            token_type: TokenType::EndOfFile,
            span: SourceSpan::new(location.clone(), location),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.token_type, self.span.start)
    }
}

/// Teleidoscope Lexer
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    keywords: HashMap<String, TokenType>,
}

impl Lexer {
    /// Create a new lexer
    pub fn new(input: &str) -> Self {
        let mut lexer = Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            keywords: HashMap::new(),
        };

        lexer.initialize_keywords();
        lexer
    }

    /// Initialize keyword map
    fn initialize_keywords(&mut self) {
        let keywords = [
            ("def", TokenType::Def),
            ("extern", TokenType::Extern),
            ("if", TokenType::If),
            ("then", TokenType::Then),
            ("else", TokenType::Else),
            ("for", TokenType::For),
            ("in", TokenType::In),
        ];

        for (keyword, token_type) in keywords {
            self.keywords.insert(keyword.to_string(), token_type);
        }
    }

    /// Get current character
    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        if let Some(ch) = self.current_char() {
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(ch)
        } else {
            None
        }
    }

    /// Get current location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new_simple(self.line, self.column)
    }

    /// Skip whitespace and `#` line comments
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                // comment until the end of the line
                while let Some(ch) = self.current_char() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Tokenize an identifier or keyword
    fn tokenize_identifier(&mut self) -> TokenType {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if let Some(keyword_token) = self.keywords.get(&identifier) {
            keyword_token.clone()
        } else {
            TokenType::Identifier(identifier)
        }
    }

    /// Tokenize a number literal: [0-9.]+
    fn tokenize_number(&mut self) -> Result<TokenType, CompilerError> {
        let start = self.current_location();
        let mut number = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == '.' {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let value = number.parse::<f64>().map_err(|_| {
            CompilerError::lexer_error(format!("Invalid number literal: {}", number), start)
        })?;

        Ok(TokenType::Number(value))
    }

    /// Tokenize the next token
    fn next_token(&mut self) -> Result<Token, CompilerError> {
        self.skip_trivia();

        let start = self.current_location();

        let ch = match self.current_char() {
            Some(ch) => ch,
            None => return Ok(Token::eof(start)),
        };

        let token_type = if ch.is_ascii_alphabetic() {
            self.tokenize_identifier()
        } else if ch.is_ascii_digit() || ch == '.' {
            self.tokenize_number()?
        } else {
            self.advance();
            match ch {
                '+' => TokenType::Plus,
                '-' => TokenType::Minus,
                '*' => TokenType::Star,
                '<' => TokenType::Less,
                '=' => TokenType::Equal,
                '(' => TokenType::LeftParen,
                ')' => TokenType::RightParen,
                ',' => TokenType::Comma,
                ';' => TokenType::Semicolon,
                _ => {
                    return Err(CompilerError::lexer_error(
                        format!("Unexpected character: {:?}", ch),
                        start,
                    ));
                }
            }
        };

        let end = self.current_location();
        Ok(Token::new(token_type, SourceSpan::new(start, end)))
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompilerError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let at_end = matches!(token.token_type, TokenType::EndOfFile);
            tokens.push(token);
            if at_end {
                break;
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<TokenType> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = token_types("def fib extern if then else for in x1");
        assert_eq!(
            tokens,
            vec![
                TokenType::Def,
                TokenType::Identifier("fib".to_string()),
                TokenType::Extern,
                TokenType::If,
                TokenType::Then,
                TokenType::Else,
                TokenType::For,
                TokenType::In,
                TokenType::Identifier("x1".to_string()),
                TokenType::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = token_types("42 1.5 .4 0.25");
        assert_eq!(
            tokens,
            vec![
                TokenType::Number(42.0),
                TokenType::Number(1.5),
                TokenType::Number(0.4),
                TokenType::Number(0.25),
                TokenType::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_operators_and_delimiters() {
        let tokens = token_types("( ) , ; = + - * <");
        assert_eq!(
            tokens,
            vec![
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::Comma,
                TokenType::Semicolon,
                TokenType::Equal,
                TokenType::Plus,
                TokenType::Minus,
                TokenType::Star,
                TokenType::Less,
                TokenType::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = token_types("fib(40) # Compute the 40th number\n# a full-line comment\n;");
        assert_eq!(
            tokens,
            vec![
                TokenType::Identifier("fib".to_string()),
                TokenType::LeftParen,
                TokenType::Number(40.0),
                TokenType::RightParen,
                TokenType::Semicolon,
                TokenType::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_invalid_number() {
        let result = Lexer::new("1.2.3").tokenize();
        assert!(matches!(result, Err(CompilerError::LexError { .. })));
    }

    #[test]
    fn test_unexpected_character() {
        let result = Lexer::new("x @ y").tokenize();
        assert!(matches!(result, Err(CompilerError::LexError { .. })));
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("def\nfib").tokenize().unwrap();
        assert_eq!(tokens[0].span.start.line, 1);
        assert_eq!(tokens[0].span.start.column, 1);
        assert_eq!(tokens[1].span.start.line, 2);
        assert_eq!(tokens[1].span.start.column, 1);
        assert_eq!(tokens[1].span.end.column, 4);
    }
}
