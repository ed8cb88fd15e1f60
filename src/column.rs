use serde::{Deserialize, Serialize};

use crate::data_type::StorageType;
use crate::error::{QueryError, QueryResult};
use crate::tokenizer::is_keyword;

/// Characters that would break either the DSL or the header encoding.
const RESERVED: &[char] = &[',', ':', ';', '[', ']', '{', '}', '\'', '"', '\\'];

/// A schema entry: a column name and the storage type of its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnHeader {
    pub name: String,
    pub storage_type: StorageType,
}

impl ColumnHeader {
    pub fn new(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            name: name.into(),
            storage_type,
        }
    }
}

/// The ordered list of columns of a table.
///
/// Order is significant: records store their values positionally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnHeader>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnHeader>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the position and header of the column called `name`.
    pub fn find(&self, name: &str) -> Option<(usize, &ColumnHeader)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnHeader> {
        self.columns.iter()
    }

    /// Checks that the schema can be written to a table header.
    ///
    /// # Errors
    /// Returns [QueryError::InvalidSchema] when there are no columns, when a
    /// name is empty or contains reserved characters, or when two columns
    /// share a name.
    pub fn validate(&self) -> QueryResult<()> {
        if self.columns.is_empty() {
            return Err(QueryError::InvalidSchema {
                reason: "a table needs at least one column".into(),
            });
        }
        for (i, column) in self.columns.iter().enumerate() {
            validate_name(&column.name)?;
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(QueryError::InvalidSchema {
                    reason: format!("duplicate column {:?}", column.name),
                });
            }
        }
        Ok(())
    }
}

impl From<Vec<ColumnHeader>> for Schema {
    fn from(columns: Vec<ColumnHeader>) -> Self {
        Self { columns }
    }
}

/// Table and column names must be single DSL words that the header can hold verbatim
/// and that the tokenizer does not read as keywords.
pub fn validate_name(name: &str) -> QueryResult<()> {
    if name.is_empty() {
        return Err(QueryError::InvalidSchema {
            reason: "names must not be empty".into(),
        });
    }
    if name.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
        return Err(QueryError::InvalidSchema {
            reason: format!("name {name:?} contains whitespace or a reserved character"),
        });
    }
    if is_keyword(name) {
        return Err(QueryError::InvalidSchema {
            reason: format!("name {name:?} is a query keyword"),
        });
    }
    Ok(())
}
