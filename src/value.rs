use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data_type::StorageType;

/// Represents a single typed value stored in a table.
///
/// The variant always agrees with the [StorageType] of the column the value
/// belongs to; the table engine refuses to write anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A 64-bit signed integer value.
    Int(i64),
    /// A 64-bit floating-point value.
    Dec(f64),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning across result sets.
    Str(Arc<str>),
}

impl Value {
    /// Returns the inner integer value if this is a [Value::Int].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner float value if this is a [Value::Dec].
    pub fn as_dec(&self) -> Option<f64> {
        match self {
            Self::Dec(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Str].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Widens numeric values to `f64`. Strings yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Dec(f) => Some(*f),
            Self::Str(_) => None,
        }
    }

    /// Returns the [StorageType] corresponding to this value.
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Int(_) => StorageType::Integer,
            Self::Dec(_) => StorageType::Decimal,
            Self::Str(_) => StorageType::String,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Dec(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Arc::from(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Dec(d) => f.write_str(&format_decimal(*d)),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Formats a decimal so that it always reads back as a decimal (`46.0`, not `46`).
pub(crate) fn format_decimal(d: f64) -> String {
    let text = d.to_string();
    if d.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}

/// A literal as written in a query, before it is coerced to a column type.
///
/// Quoting matters: a quoted literal is always a string, even when its text
/// looks numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    text: String,
    quoted: bool,
}

impl Literal {
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    /// The literal text with any surrounding quotes already stripped.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// A bare `*`, which in a SET value list keeps the current column value.
    pub fn is_wildcard(&self) -> bool {
        !self.quoted && self.text == "*"
    }

    /// Classifies the literal syntactically.
    ///
    /// # Example
    /// ```
    /// # use flatdb::{Literal, StorageType};
    /// assert_eq!(Literal::bare("-42").classify(), StorageType::Integer);
    /// assert_eq!(Literal::bare("3.5").classify(), StorageType::Decimal);
    /// assert_eq!(Literal::quoted("42").classify(), StorageType::String);
    /// ```
    pub fn classify(&self) -> StorageType {
        if self.quoted {
            StorageType::String
        } else if is_integer(&self.text) {
            StorageType::Integer
        } else if is_decimal(&self.text) {
            StorageType::Decimal
        } else {
            StorageType::String
        }
    }

    /// Converts the literal to a [Value] of the requested type.
    ///
    /// Returns `None` when the literal's classification disagrees with `target`,
    /// or when a numeric literal does not fit its representation (an `i64`
    /// overflow, or a decimal too large to be finite).
    pub fn coerce(&self, target: StorageType) -> Option<Value> {
        if self.classify() != target {
            return None;
        }
        match target {
            StorageType::Integer => self.text.parse::<i64>().ok().map(Value::Int),
            StorageType::Decimal => self
                .text
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .map(Value::Dec),
            StorageType::String => Some(Value::Str(Arc::from(self.text.as_str()))),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.quoted {
            return f.write_str(&self.text);
        }
        let quote = if self.text.contains('\'') { '"' } else { '\'' };
        write!(f, "{quote}{}{quote}", self.text)
    }
}

fn strip_sign(text: &str) -> &str {
    text.strip_prefix('-').unwrap_or(text)
}

/// `-?[0-9]+`
pub fn is_integer(text: &str) -> bool {
    let digits = strip_sign(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `-?` followed by ASCII digits with exactly one `.` among them.
pub fn is_decimal(text: &str) -> bool {
    let body = strip_sign(text);
    let mut dots = 0;
    let mut digits = 0;
    for b in body.bytes() {
        match b {
            b'.' => dots += 1,
            b'0'..=b'9' => digits += 1,
            _ => return false,
        }
    }
    dots == 1 && digits > 0
}
