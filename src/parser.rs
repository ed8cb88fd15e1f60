use crate::ast::{Comparator, HeaderDependency, Query, QuerySet, Target};
use crate::error::ParseError;
use crate::tokenizer::{Token, Tokenizer};
use crate::value::Literal;

/// Recursive-descent parser turning a token stream into a single [Query].
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Query, ParseError> {
        match self.current_token() {
            Token::Add => self.parse_add(),
            Token::Remove => self.parse_remove(),
            Token::Get => self.parse_get(),
            Token::Set => self.parse_set(),
            Token::Drop => self.parse_drop(),
            Token::Word(word) => Err(ParseError::UnknownAction {
                found: word.clone(),
            }),
            Token::Eof => Err(ParseError::UnknownAction {
                found: String::new(),
            }),
            other => Err(ParseError::UnknownAction {
                found: other.to_string(),
            }),
        }
    }

    //helpers
    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn consume(&mut self, expected: Token) -> Result<(), ParseError> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current_token().to_string(),
        }
    }

    /// Renders the tokens left to consume, for error messages.
    fn remaining(&self) -> String {
        self.tokens[self.position..]
            .iter()
            .filter(|t| **t != Token::Eof)
            .map(Token::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Consumes the mandatory `IN <table>` suffix, which must end the query.
    fn parse_table_suffix(&mut self) -> Result<String, ParseError> {
        match self.current_token() {
            Token::In => self.advance(),
            Token::Eof => return Err(ParseError::MissingTable),
            _ => return Err(self.unexpected("IN")),
        }

        let table = match self.current_token() {
            Token::Word(table) => table.clone(),
            _ => return Err(ParseError::MissingTable),
        };
        self.advance();

        if !self.is_at_end() {
            return Err(self.unexpected("end of input after table name"));
        }
        Ok(table)
    }

    /// `[ value (, value)* ]`
    fn parse_value_list(&mut self) -> Result<Vec<Literal>, ParseError> {
        if *self.current_token() != Token::LeftBracket {
            return Err(ParseError::MalformedValueList {
                reason: format!("expected '[', found {}", self.current_token()),
            });
        }
        self.advance();

        let mut values = vec![];
        loop {
            let value = match self.current_token() {
                Token::Word(w) => Literal::bare(w.clone()),
                Token::Quoted(q) => Literal::quoted(q.clone()),
                Token::Eof => {
                    return Err(ParseError::MalformedValueList {
                        reason: "missing closing ']'".into(),
                    });
                }
                _ => {
                    return Err(ParseError::MalformedValueList {
                        reason: format!("empty value at position {}", values.len()),
                    });
                }
            };
            values.push(value);
            self.advance();

            match self.current_token() {
                Token::Comma => {
                    self.advance();
                    continue;
                }
                Token::RightBracket => {
                    self.advance();
                    break;
                }
                Token::Eof => {
                    return Err(ParseError::MalformedValueList {
                        reason: "missing closing ']'".into(),
                    });
                }
                other => {
                    return Err(ParseError::MalformedValueList {
                        reason: format!("expected ',' or ']', found {other}"),
                    });
                }
            }
        }
        Ok(values)
    }

    /// `ENTRY id`, `WHERE ...`, or nothing (every entry).
    fn parse_target(&mut self) -> Result<Target, ParseError> {
        match self.current_token() {
            Token::Entry => {
                self.advance();
                let id = match self.current_token() {
                    Token::Word(id) | Token::Quoted(id) => id.clone(),
                    _ => return Err(ParseError::MissingEntryId),
                };
                self.advance();
                Ok(Target::EntryId(id))
            }
            Token::Where => {
                self.advance();
                self.parse_dependencies().map(Target::Dependencies)
            }
            _ => Ok(Target::all()),
        }
    }

    fn parse_dependencies(&mut self) -> Result<Vec<HeaderDependency>, ParseError> {
        if matches!(self.current_token(), Token::In | Token::To | Token::Eof) {
            return Err(ParseError::EmptyWhere);
        }

        let mut dependencies = vec![];
        loop {
            dependencies.push(self.parse_dependency()?);
            if *self.current_token() == Token::And {
                self.advance();
                continue;
            }
            break;
        }
        Ok(dependencies)
    }

    /// `column comparator value`
    fn parse_dependency(&mut self) -> Result<HeaderDependency, ParseError> {
        let column = match self.current_token() {
            Token::Word(column) => column.clone(),
            _ => return Err(self.unexpected("column name")),
        };
        self.advance();

        let comparator = match self.current_token() {
            Token::Is => Comparator::Equals,
            Token::Not => Comparator::NotEquals,
            Token::Includes => Comparator::Contains,
            Token::Excludes => Comparator::NotContains,
            Token::Word(found) => {
                return Err(ParseError::UnknownComparator {
                    found: found.clone(),
                });
            }
            other => {
                return Err(ParseError::UnknownComparator {
                    found: other.to_string(),
                });
            }
        };
        self.advance();

        // A bare value is every word up to the next keyword, so `Foo Bar` needs no quotes.
        let value = match self.current_token() {
            Token::Quoted(q) => {
                let value = Literal::quoted(q.clone());
                self.advance();
                value
            }
            Token::Word(_) => {
                let mut words = vec![];
                while let Token::Word(w) = self.current_token() {
                    words.push(w.clone());
                    self.advance();
                }
                Literal::bare(words.join(" "))
            }
            _ => return Err(ParseError::MissingValue { column }),
        };

        Ok(HeaderDependency {
            column,
            comparator,
            value,
        })
    }

    fn parse_add(&mut self) -> Result<Query, ParseError> {
        self.consume(Token::Add)?;
        let values = self.parse_value_list()?;
        let table = self.parse_table_suffix()?;
        Ok(Query::Add { table, values })
    }

    fn parse_remove(&mut self) -> Result<Query, ParseError> {
        self.consume(Token::Remove)?;
        let target = self.parse_target()?;
        let table = self.parse_table_suffix()?;
        Ok(Query::Remove { table, target })
    }

    fn parse_get(&mut self) -> Result<Query, ParseError> {
        self.consume(Token::Get)?;
        let target = self.parse_target()?;
        let table = self.parse_table_suffix()?;
        Ok(Query::Get { table, target })
    }

    fn parse_set(&mut self) -> Result<Query, ParseError> {
        self.consume(Token::Set)?;
        let target = self.parse_target()?;
        self.consume(Token::To)?;
        let values = self.parse_value_list()?;
        let table = self.parse_table_suffix()?;
        Ok(Query::Set {
            table,
            target,
            values,
        })
    }

    /// `DROP <table>` and nothing else.
    fn parse_drop(&mut self) -> Result<Query, ParseError> {
        self.consume(Token::Drop)?;
        let table = match self.current_token() {
            Token::Word(table) => table.clone(),
            _ => {
                return Err(ParseError::MalformedDrop {
                    found: format!("DROP {}", self.remaining()).trim_end().to_string(),
                });
            }
        };
        self.advance();

        if !self.is_at_end() {
            return Err(ParseError::MalformedDrop {
                found: format!("DROP {table} {}", self.remaining()),
            });
        }
        Ok(Query::Drop { table })
    }
}

impl Query {
    /// Parses one line of query text.
    ///
    /// # Example
    /// ```
    /// # use flatdb::{Query, Target};
    /// let query = Query::parse("GET ENTRY a1b2c3 IN People").unwrap();
    /// assert_eq!(
    ///     query,
    ///     Query::Get { table: "People".into(), target: Target::EntryId("a1b2c3".into()) }
    /// );
    /// ```
    pub fn parse(text: &str) -> Result<Query, ParseError> {
        let tokens = Tokenizer::new(text).tokenize()?;
        Parser::new(tokens).parse()
    }
}

impl QuerySet {
    /// Parses several queries separated by newlines or `;`. Blank statements
    /// are skipped; separators inside quoted values are kept.
    pub fn parse(text: &str) -> Result<QuerySet, ParseError> {
        split_statements(text)
            .into_iter()
            .map(Query::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(QuerySet::from)
    }
}

fn split_statements(text: &str) -> Vec<&str> {
    let mut statements = vec![];
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '\n' | ';') => {
                statements.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(&text[start..]);

    statements
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
