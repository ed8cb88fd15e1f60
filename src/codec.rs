//! Text encoding of table files.
//!
//! A table file is a header followed by records concatenated with no separator:
//!
//! ```text
//! [People,2:Name,0:Age]{a1b2c3;S:Bob,I:30}{d4e5f6;S:Foo Bar,I:46}
//! ```
//!
//! Header columns are `code:name` with codes 0 (integer), 1 (decimal) and
//! 2 (string). Record values are `tag:value` with tags `I`, `D` and `S`, in
//! schema order. Inside string values `\`, `{`, `}` and `,` are escaped with a
//! backslash, so strings without those characters are stored verbatim. A
//! backslash before any other character is literal, which keeps older files
//! holding paths like `C:\dir` readable.

use std::ops::Range;
use std::path::Path;

use crate::column::{ColumnHeader, Schema, validate_name};
use crate::data_type::StorageType;
use crate::entry::Entry;
use crate::error::{QueryError, QueryResult};
use crate::value::{Value, format_decimal};

/// Parsed table header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub schema: Schema,
    /// Byte length of the header; records start right after it.
    pub len: usize,
}

pub fn encode_header(name: &str, schema: &Schema) -> String {
    let mut out = String::from("[");
    out.push_str(name);
    for column in schema.iter() {
        out.push(',');
        out.push_str(&column.storage_type.code().to_string());
        out.push(':');
        out.push_str(&column.name);
    }
    out.push(']');
    out
}

/// Reads the `[Name,code:col,...]` header at the start of `text`.
///
/// `path` is only used for error reporting.
pub fn decode_header(text: &str, path: &Path) -> QueryResult<Header> {
    if !text.starts_with('[') {
        return Err(QueryError::corrupt(path, 0, "missing '[' header"));
    }
    let close = text
        .find(']')
        .ok_or_else(|| QueryError::corrupt(path, 0, "unterminated header"))?;

    let mut parts = text[1..close].split(',');
    let name = parts.next().unwrap_or_default().to_string();
    validate_name(&name).map_err(|e| QueryError::corrupt(path, 1, e.to_string()))?;

    let mut columns = vec![];
    for part in parts {
        let (code, column) = part
            .split_once(':')
            .ok_or_else(|| QueryError::corrupt(path, 0, format!("bad column {part:?}")))?;
        let storage_type = code
            .parse::<u8>()
            .ok()
            .and_then(StorageType::from_code)
            .ok_or_else(|| QueryError::corrupt(path, 0, format!("bad type code {code:?}")))?;
        columns.push(ColumnHeader::new(column, storage_type));
    }

    let schema = Schema::new(columns);
    schema
        .validate()
        .map_err(|e| QueryError::corrupt(path, 0, e.to_string()))?;

    Ok(Header {
        name,
        schema,
        len: close + 1,
    })
}

/// Encodes `entry` as `{id;T:val,...}`.
pub fn encode_entry(entry: &Entry) -> String {
    let mut out = String::with_capacity(16 + entry.data.len() * 8);
    out.push('{');
    out.push_str(&entry.id);
    out.push(';');
    for (i, value) in entry.values().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push(value.storage_type().tag());
        out.push(':');
        match value {
            Value::Int(v) => out.push_str(&v.to_string()),
            Value::Dec(v) => out.push_str(&format_decimal(*v)),
            Value::Str(s) => escape_into(&mut out, s),
        }
    }
    out.push('}');
    out
}

/// Bytes that a backslash escapes inside a string value.
fn is_escaped(b: u8) -> bool {
    matches!(b, b'\\' | b'{' | b'}' | b',')
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        if c.is_ascii() && is_escaped(c as u8) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next_if(|n| n.is_ascii() && is_escaped(*n as u8)) {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// A record located in the file text but not yet decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord<'a> {
    /// Byte range of the whole record, braces included.
    pub span: Range<usize>,
    pub id: &'a str,
    /// Everything between `;` and the closing `}`.
    pub body: &'a str,
}

impl RawRecord<'_> {
    /// Decodes the record's values against `schema`.
    pub fn decode(&self, schema: &Schema, path: &Path) -> QueryResult<Entry> {
        let fields = split_fields(self.body);
        if fields.len() != schema.len() {
            return Err(QueryError::corrupt(
                path,
                self.span.start,
                format!("expected {} values, found {}", schema.len(), fields.len()),
            ));
        }

        let mut data = Vec::with_capacity(fields.len());
        for (field, column) in fields.into_iter().zip(schema.iter()) {
            let value = decode_field(field, column.storage_type).ok_or_else(|| {
                QueryError::corrupt(
                    path,
                    self.span.start,
                    format!("bad value {field:?} for column {:?}", column.name),
                )
            })?;
            data.push((column.name.clone(), value));
        }
        Ok(Entry::new(self.id, data))
    }
}

/// Splits a record body on the commas that are not escaped.
fn split_fields(body: &str) -> Vec<&str> {
    if body.is_empty() {
        return vec![];
    }
    let bytes = body.as_bytes();
    let mut fields = vec![];
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).copied().is_some_and(is_escaped) => i += 1,
            b',' => {
                fields.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    fields.push(&body[start..]);
    fields
}

fn decode_field(field: &str, expected: StorageType) -> Option<Value> {
    let mut chars = field.chars();
    let tag = chars.next().and_then(StorageType::from_tag)?;
    if tag != expected || chars.next() != Some(':') {
        return None;
    }
    let text = &field[2..];
    match tag {
        StorageType::Integer => text.parse().ok().map(Value::Int),
        StorageType::Decimal => text.parse().ok().map(Value::Dec),
        StorageType::String => Some(Value::from(unescape(text).as_str())),
    }
}

/// Scans the record section of a table file, one `{...}` at a time.
///
/// The scan walks bytes and tracks whether it is inside a string value, so
/// escaped braces and commas in strings never end a record early.
pub struct RecordReader<'a> {
    text: &'a str,
    pos: usize,
    path: &'a Path,
}

impl<'a> RecordReader<'a> {
    /// Reads records from `text`, starting at byte `offset` (usually the header length).
    pub fn new(text: &'a str, offset: usize, path: &'a Path) -> Self {
        Self {
            text,
            pos: offset,
            path,
        }
    }

    fn corrupt(&mut self, offset: usize, reason: &str) -> QueryError {
        // stop iterating after the first error
        self.pos = self.text.len();
        QueryError::corrupt(self.path, offset, reason)
    }

    fn scan_record(&mut self) -> QueryResult<RawRecord<'a>> {
        let text = self.text;
        let bytes = text.as_bytes();
        let start = self.pos;
        if bytes[start] != b'{' {
            return Err(self.corrupt(start, "expected '{'"));
        }

        let mut i = start + 1;
        while i < bytes.len() && bytes[i] != b';' {
            if matches!(bytes[i], b'{' | b'}' | b',') {
                return Err(self.corrupt(i, "malformed entry id"));
            }
            i += 1;
        }
        if i >= bytes.len() || i == start + 1 {
            return Err(self.corrupt(start, "missing entry id"));
        }
        let id_end = i;
        i += 1;

        let body_start = i;
        let mut field_start = true;
        let mut in_string = false;
        loop {
            if i >= bytes.len() {
                return Err(self.corrupt(start, "unterminated record"));
            }
            let b = bytes[i];
            if field_start {
                in_string = b == b'S';
                field_start = false;
            }
            match b {
                b'\\' if in_string && bytes.get(i + 1).copied().is_some_and(is_escaped) => i += 1,
                b',' => field_start = true,
                b'}' => break,
                b'{' => return Err(self.corrupt(i, "unexpected '{' inside record")),
                _ => {}
            }
            i += 1;
        }

        self.pos = i + 1;
        Ok(RawRecord {
            span: start..i + 1,
            id: &text[start + 1..id_end],
            body: &text[body_start..i],
        })
    }
}

impl<'a> Iterator for RecordReader<'a> {
    type Item = QueryResult<RawRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.text;
        let bytes = text.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }
        Some(self.scan_record())
    }
}
