use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Literal;

/// How a WHERE-clause predicate compares a column against a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    /// `IS`
    Equals,
    /// `NOT`
    NotEquals,
    /// `INCLUDES`
    Contains,
    /// `EXCLUDES`
    NotContains,
}

impl Comparator {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Equals => "IS",
            Self::NotEquals => "NOT",
            Self::Contains => "INCLUDES",
            Self::NotContains => "EXCLUDES",
        }
    }
}

/// One WHERE-clause predicate, e.g. `Age IS 30`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderDependency {
    pub column: String,
    pub comparator: Comparator,
    pub value: Literal,
}

impl HeaderDependency {
    pub fn new(column: impl Into<String>, comparator: Comparator, value: Literal) -> Self {
        Self {
            column: column.into(),
            comparator,
            value,
        }
    }
}

/// Which entries a GET, REMOVE or SET applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// `ENTRY <id>`
    EntryId(String),
    /// Conjunction of predicates. Empty means every entry.
    Dependencies(Vec<HeaderDependency>),
}

impl Target {
    pub fn all() -> Self {
        Self::Dependencies(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Add {
        table: String,
        values: Vec<Literal>,
    },
    Remove {
        table: String,
        target: Target,
    },
    Get {
        table: String,
        target: Target,
    },
    Set {
        table: String,
        target: Target,
        values: Vec<Literal>,
    },
    Drop {
        table: String,
    },
}

impl Query {
    /// Name of the table the query runs against.
    pub fn table(&self) -> &str {
        match self {
            Self::Add { table, .. }
            | Self::Remove { table, .. }
            | Self::Get { table, .. }
            | Self::Set { table, .. }
            | Self::Drop { table } => table,
        }
    }

    /// The leading DSL keyword.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Add { .. } => "ADD",
            Self::Remove { .. } => "REMOVE",
            Self::Get { .. } => "GET",
            Self::Set { .. } => "SET",
            Self::Drop { .. } => "DROP",
        }
    }

    /// Whether the query writes to the table file.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Get { .. })
    }
}

/// A batch of queries dispatched in submission order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuerySet {
    pub queries: Vec<Query>,
}

impl QuerySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, query: Query) {
        self.queries.push(query);
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Query> {
        self.queries.iter()
    }
}

impl From<Vec<Query>> for QuerySet {
    fn from(queries: Vec<Query>) -> Self {
        Self { queries }
    }
}

impl From<Query> for QuerySet {
    fn from(query: Query) -> Self {
        Self {
            queries: vec![query],
        }
    }
}

impl FromIterator<Query> for QuerySet {
    fn from_iter<I: IntoIterator<Item = Query>>(iter: I) -> Self {
        Self {
            queries: iter.into_iter().collect(),
        }
    }
}

// Display renders a query back into DSL text that parses to the same query.

fn write_values(f: &mut fmt::Formatter<'_>, values: &[Literal]) -> fmt::Result {
    f.write_str("[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    f.write_str("]")
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryId(id) => write!(f, "ENTRY {id}"),
            Self::Dependencies(deps) if deps.is_empty() => Ok(()),
            Self::Dependencies(deps) => {
                f.write_str("WHERE")?;
                for (i, dep) in deps.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND")?;
                    }
                    write!(f, " {} {} {}", dep.column, dep.comparator.keyword(), dep.value)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { table, values } => {
                f.write_str("ADD ")?;
                write_values(f, values)?;
                write!(f, " IN {table}")
            }
            Self::Remove { table, target } | Self::Get { table, target } => {
                write!(f, "{} ", self.action())?;
                if !matches!(target, Target::Dependencies(d) if d.is_empty()) {
                    write!(f, "{target} ")?;
                }
                write!(f, "IN {table}")
            }
            Self::Set {
                table,
                target,
                values,
            } => {
                f.write_str("SET ")?;
                if !matches!(target, Target::Dependencies(d) if d.is_empty()) {
                    write!(f, "{target} ")?;
                }
                f.write_str("TO ")?;
                write_values(f, values)?;
                write!(f, " IN {table}")
            }
            Self::Drop { table } => write!(f, "DROP {table}"),
        }
    }
}
