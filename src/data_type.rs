use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents the storage types a table column can declare.
/// Every value written to a column must match its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    /// A 64-bit signed integer.
    Integer,
    /// A 64-bit floating-point number.
    Decimal,
    /// A UTF-8 character string.
    String,
}

impl StorageType {
    /// Numeric code used in the table header (`0:Age`).
    pub fn code(self) -> u8 {
        match self {
            Self::Integer => 0,
            Self::Decimal => 1,
            Self::String => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Integer),
            1 => Some(Self::Decimal),
            2 => Some(Self::String),
            _ => None,
        }
    }

    /// Single-letter tag prefixed to each value inside a record (`I:30`).
    pub fn tag(self) -> char {
        match self {
            Self::Integer => 'I',
            Self::Decimal => 'D',
            Self::String => 'S',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'I' => Some(Self::Integer),
            'D' => Some(Self::Decimal),
            'S' => Some(Self::String),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::Decimal => "DECIMAL",
            Self::String => "STRING",
        };
        f.write_str(name)
    }
}

impl FromStr for StorageType {
    type Err = String;

    /// Accepts the type names used on the command line, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => Ok(Self::Integer),
            "DECIMAL" | "DEC" | "FLOAT" => Ok(Self::Decimal),
            "STRING" | "STR" | "TEXT" => Ok(Self::String),
            _ => Err(format!("unknown storage type {s:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_tags_are_consistent() {
        for ty in [StorageType::Integer, StorageType::Decimal, StorageType::String] {
            assert_eq!(StorageType::from_code(ty.code()), Some(ty));
            assert_eq!(StorageType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(StorageType::from_code(3), None);
        assert_eq!(StorageType::from_tag('X'), None);
    }

    #[test]
    fn test_is_numeric() {
        assert!(StorageType::Integer.is_numeric());
        assert!(StorageType::Decimal.is_numeric());
        assert!(!StorageType::String.is_numeric());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("integer".parse(), Ok(StorageType::Integer));
        assert_eq!("Text".parse(), Ok(StorageType::String));
        assert_eq!("DECIMAL".parse(), Ok(StorageType::Decimal));
        assert!("blob".parse::<StorageType>().is_err());
    }
}
