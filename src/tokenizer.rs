use std::fmt;

use crate::error::ParseError;

/// Represents the smallest meaningful units of the query language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // --- Actions ---
    Add,
    Remove,
    Get,
    Set,
    Drop,

    // --- Keywords ---
    Entry,
    Where,
    And,
    In,
    To,

    // --- Comparators ---
    Is,
    Not,
    Includes,
    Excludes,

    // --- Words & Literals ---
    /// A bare word: table or column name, entry id or unquoted value.
    /// Inside `[...]` a bare value may contain spaces (`Foo Bar`).
    Word(String),
    /// A value between single or double quotes, quotes stripped.
    Quoted(String),

    // --- Symbols ---
    /// Left bracket `[`
    LeftBracket,
    /// Right bracket `]`
    RightBracket,
    /// Comma `,`
    Comma,

    // --- Special ---
    /// Represents the end of the input.
    Eof,
}

impl Token {
    /// Maps a bare word to its keyword token, case-insensitively.
    fn keyword(word: &str) -> Option<Self> {
        let token = match word.to_ascii_uppercase().as_str() {
            "ADD" => Self::Add,
            "REMOVE" => Self::Remove,
            "GET" => Self::Get,
            "SET" => Self::Set,
            "DROP" => Self::Drop,
            "ENTRY" => Self::Entry,
            "WHERE" => Self::Where,
            "AND" => Self::And,
            "IN" => Self::In,
            "TO" => Self::To,
            "IS" => Self::Is,
            "NOT" => Self::Not,
            "INCLUDES" => Self::Includes,
            "EXCLUDES" => Self::Excludes,
            _ => return None,
        };
        Some(token)
    }
}

/// Whether `word` would be read as a keyword rather than a name.
pub(crate) fn is_keyword(word: &str) -> bool {
    Token::keyword(word).is_some()
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Get => "GET",
            Self::Set => "SET",
            Self::Drop => "DROP",
            Self::Entry => "ENTRY",
            Self::Where => "WHERE",
            Self::And => "AND",
            Self::In => "IN",
            Self::To => "TO",
            Self::Is => "IS",
            Self::Not => "NOT",
            Self::Includes => "INCLUDES",
            Self::Excludes => "EXCLUDES",
            Self::Word(w) => return write!(f, "{w:?}"),
            Self::Quoted(q) => return write!(f, "'{q}'"),
            Self::LeftBracket => "'['",
            Self::RightBracket => "']'",
            Self::Comma => "','",
            Self::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// A lexical scanner that converts a query line into a sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
    /// How many `[` are currently open. Inside brackets, bare values run to the next `,` or `]`.
    bracket_depth: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.trim().chars().collect(),
            position: 0,
            bracket_depth: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens ending in [Token::Eof].
    ///
    /// # Errors
    /// Returns [ParseError::UnterminatedQuote] if a quoted value is never closed.
    ///
    /// # Example
    /// ```
    /// # use flatdb::tokenizer::{Tokenizer, Token};
    /// let tokens = Tokenizer::new("DROP People").tokenize().unwrap();
    /// assert_eq!(tokens, vec![Token::Drop, Token::Word("People".into()), Token::Eof]);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let ch = self.current_char();

        match ch {
            '[' => {
                self.advance();
                self.bracket_depth += 1;
                Ok(Token::LeftBracket)
            }
            ']' => {
                self.advance();
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                Ok(Token::RightBracket)
            }
            ',' => {
                self.advance();
                Ok(Token::Comma)
            }
            '\'' | '"' => self.read_quoted(ch),
            _ if self.bracket_depth > 0 => Ok(self.read_raw_value()),
            _ => Ok(self.read_word()),
        }
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads up to the next whitespace or symbol, then checks it against the keywords.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        while !self.is_at_end() {
            let c = self.current_char();
            if c.is_whitespace() || matches!(c, '[' | ']' | ',') {
                break;
            }
            word.push(c);
            self.advance();
        }

        Token::keyword(&word).unwrap_or(Token::Word(word))
    }

    /// Reads a bare value inside `[...]`: everything up to the next `,` or `]`,
    /// with trailing whitespace removed. Keywords are not recognised here.
    fn read_raw_value(&mut self) -> Token {
        let mut value = String::new();

        while !self.is_at_end() && !matches!(self.current_char(), ',' | ']') {
            value.push(self.current_char());
            self.advance();
        }

        Token::Word(value.trim_end().to_string())
    }

    /// Reads a value enclosed in `quote`, which is either `'` or `"`.
    fn read_quoted(&mut self, quote: char) -> Result<Token, ParseError> {
        let start = self.position;
        self.advance(); // Skip the opening quote

        let mut value = String::new();
        while !self.is_at_end() && self.current_char() != quote {
            value.push(self.current_char());
            self.advance();
        }

        if self.is_at_end() {
            return Err(ParseError::UnterminatedQuote { position: start });
        }

        // Skip the closing quote
        self.advance();

        Ok(Token::Quoted(value))
    }
}
