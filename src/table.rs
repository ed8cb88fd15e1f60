use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::ast::{Comparator, HeaderDependency, Query, Target};
use crate::codec::{RecordReader, decode_header, encode_entry, encode_header};
use crate::column::{Schema, validate_name};
use crate::config::StoreConfig;
use crate::data_type::StorageType;
use crate::entry::{Entry, EntrySet};
use crate::error::{QueryError, QueryResult};
use crate::value::{Literal, Value};

#[derive(Debug, Default)]
struct TableState {
    dropped: bool,
}

/// A table backed by a single text file.
///
/// Every query takes the table lock: GET shares it, ADD, REMOVE, SET and
/// DROP hold it exclusively. A `Table` can therefore be shared between
/// threads (e.g. behind an `Arc`) without corrupting its file.
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Schema,
    path: PathBuf,
    sync_writes: bool,
    state: RwLock<TableState>,
}

/// A matched record: where it sits in the file and what it decodes to.
type Selected = (Range<usize>, Entry);

impl Table {
    /// Creates `<dir>/<name>.tbl` and writes the header.
    ///
    /// # Errors
    /// Returns [QueryError::InvalidSchema] for unusable names or schemas and
    /// [QueryError::Io] if the file already exists or cannot be written.
    pub fn create<P: AsRef<Path>>(dir: P, name: &str, schema: Schema) -> QueryResult<Self> {
        Self::create_with(&StoreConfig::new(dir), name, schema)
    }

    /// Creates a table file in the data directory of `config`.
    pub fn create_with(config: &StoreConfig, name: &str, schema: Schema) -> QueryResult<Self> {
        validate_name(name)?;
        schema.validate()?;

        fs::create_dir_all(&config.data_dir).map_err(|e| QueryError::io(&config.data_dir, e))?;
        let path = config.table_path(name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| QueryError::io(&path, e))?;
        file.write_all(encode_header(name, &schema).as_bytes())
            .map_err(|e| QueryError::io(&path, e))?;
        if config.sync_writes {
            file.sync_all().map_err(|e| QueryError::io(&path, e))?;
        }

        info!(table = name, path = ?path, columns = schema.len(), "created table");
        Ok(Self {
            name: name.to_string(),
            schema,
            path,
            sync_writes: config.sync_writes,
            state: RwLock::new(TableState::default()),
        })
    }

    /// Opens an existing table file, reading its schema back from the header.
    pub fn load<P: AsRef<Path>>(path: P) -> QueryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let text = fs::read_to_string(&path).map_err(|e| QueryError::io(&path, e))?;
        let header = decode_header(&text, &path)?;

        info!(table = %header.name, path = ?path, columns = header.schema.len(), "loaded table");
        Ok(Self {
            name: header.name,
            schema: header.schema,
            path,
            sync_writes: true,
            state: RwLock::new(TableState::default()),
        })
    }

    /// Sets whether writes are fsynced before a query returns.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dropped(&self) -> bool {
        self.state.read().dropped
    }

    /// Executes `query` against this table.
    ///
    /// The table name carried by the query is not checked here; routing by
    /// name is the job of [crate::Database].
    ///
    /// # Example
    /// ```
    /// # use flatdb::{ColumnHeader, Query, Schema, StorageType, Table, Value};
    /// let dir = tempfile::tempdir().unwrap();
    /// let schema = Schema::new(vec![
    ///     ColumnHeader::new("Name", StorageType::String),
    ///     ColumnHeader::new("Age", StorageType::Integer),
    /// ]);
    /// let table = Table::create(dir.path(), "People", schema).unwrap();
    ///
    /// table.query(&Query::parse("ADD [Bob, 30] IN People").unwrap()).unwrap();
    /// let found = table.query(&Query::parse("GET WHERE Age IS 30 IN People").unwrap()).unwrap();
    /// assert_eq!(found.first().unwrap().get("Name"), Some(&Value::from("Bob")));
    /// ```
    pub fn query(&self, query: &Query) -> QueryResult<EntrySet> {
        let issued_at = Instant::now();
        let result = match query {
            Query::Add { values, .. } => self.add(values),
            Query::Get { target, .. } => self.get(target, issued_at),
            Query::Remove { target, .. } => self.remove(target),
            Query::Set { target, values, .. } => self.set(target, values, issued_at),
            Query::Drop { .. } => self.drop_table(),
        }?;

        debug!(
            table = %self.name,
            action = query.action(),
            mutation = query.is_mutation(),
            entries = result.len(),
            elapsed_us = issued_at.elapsed().as_micros() as u64,
            "query executed"
        );
        Ok(result)
    }

    fn check_dropped(&self, state: &TableState) -> QueryResult<()> {
        if state.dropped {
            Err(QueryError::TableDropped {
                table: self.name.clone(),
            })
        } else {
            Ok(())
        }
    }

    fn add(&self, values: &[Literal]) -> QueryResult<EntrySet> {
        let state = self.state.write();
        self.check_dropped(&state)?;

        let data = self
            .coerce_row(values)?
            .into_iter()
            .zip(self.schema.iter())
            .map(|(value, column)| {
                value.map(|v| (column.name.clone(), v)).ok_or_else(|| {
                    self.type_mismatch(&column.name, "*", column.storage_type)
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;
        let entry = Entry::new(generate_id(), data);

        // Appending never needs to look at existing records.
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| QueryError::io(&self.path, e))?;
        file.write_all(encode_entry(&entry).as_bytes())
            .map_err(|e| QueryError::io(&self.path, e))?;
        if self.sync_writes {
            file.sync_data().map_err(|e| QueryError::io(&self.path, e))?;
        }

        Ok(EntrySet::from(vec![entry]))
    }

    fn get(&self, target: &Target, issued_at: Instant) -> QueryResult<EntrySet> {
        let state = self.state.read();
        self.check_dropped(&state)?;

        let text = self.read_file()?;
        let selected = self.select(&text, target)?;

        let elapsed = elapsed_ms(issued_at);
        Ok(selected
            .into_iter()
            .map(|(_, mut entry)| {
                entry.query_time_ms = Some(elapsed);
                entry
            })
            .collect())
    }

    fn remove(&self, target: &Target) -> QueryResult<EntrySet> {
        let state = self.state.write();
        self.check_dropped(&state)?;

        let mut text = self.read_file()?;
        let selected = self.select(&text, target)?;
        if selected.is_empty() {
            return Ok(EntrySet::new());
        }

        // Splice from the back so earlier spans stay valid.
        for (span, _) in selected.iter().rev() {
            text.replace_range(span.clone(), "");
        }
        self.write_atomic(&text)?;

        Ok(selected.into_iter().map(|(_, entry)| entry).collect())
    }

    fn set(&self, target: &Target, values: &[Literal], issued_at: Instant) -> QueryResult<EntrySet> {
        let state = self.state.write();
        self.check_dropped(&state)?;

        // Checked before touching the file, even when nothing matches.
        let replacements = self.coerce_row(values)?;

        let mut text = self.read_file()?;
        let selected = self.select(&text, target)?;
        if selected.is_empty() {
            return Ok(EntrySet::new());
        }

        let updated: Vec<(Range<usize>, Entry)> = selected
            .into_iter()
            .map(|(span, old)| {
                let data = old
                    .data
                    .into_iter()
                    .zip(&replacements)
                    .map(|((column, current), new)| (column, new.clone().unwrap_or(current)))
                    .collect();
                (span, Entry::new(old.id, data))
            })
            .collect();

        for (span, entry) in updated.iter().rev() {
            text.replace_range(span.clone(), &encode_entry(entry));
        }
        self.write_atomic(&text)?;

        let elapsed = elapsed_ms(issued_at);
        Ok(updated
            .into_iter()
            .map(|(_, mut entry)| {
                entry.query_time_ms = Some(elapsed);
                entry
            })
            .collect())
    }

    fn drop_table(&self) -> QueryResult<EntrySet> {
        let mut state = self.state.write();
        self.check_dropped(&state)?;

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(table = %self.name, path = ?self.path, "table file already gone");
            }
            Err(e) => return Err(QueryError::io(&self.path, e)),
        }
        state.dropped = true;

        info!(table = %self.name, "dropped table");
        Ok(EntrySet::new())
    }

    /// Type-checks one value per column. `None` marks a `*` wildcard,
    /// which only SET gives a meaning to.
    fn coerce_row(&self, values: &[Literal]) -> QueryResult<Vec<Option<Value>>> {
        if values.len() != self.schema.len() {
            return Err(QueryError::ValueCountMismatch {
                expected: self.schema.len(),
                found: values.len(),
            });
        }

        values
            .iter()
            .zip(self.schema.iter())
            .map(|(literal, column)| {
                if literal.is_wildcard() {
                    return Ok(None);
                }
                literal
                    .coerce(column.storage_type)
                    .map(Some)
                    .ok_or_else(|| {
                        self.type_mismatch(&column.name, literal.text(), column.storage_type)
                    })
            })
            .collect()
    }

    fn type_mismatch(&self, column: &str, value: &str, expected: StorageType) -> QueryError {
        QueryError::TypeMismatch {
            column: column.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    /// Finds the records addressed by `target`, in file order.
    fn select(&self, text: &str, target: &Target) -> QueryResult<Vec<Selected>> {
        let header = decode_header(text, &self.path)?;
        let records = RecordReader::new(text, header.len, &self.path);

        match target {
            Target::EntryId(id) => {
                for record in records {
                    let record = record?;
                    if record.id == id {
                        let entry = record.decode(&self.schema, &self.path)?;
                        return Ok(vec![(record.span, entry)]);
                    }
                }
                Err(QueryError::EntryNotFound {
                    table: self.name.clone(),
                    id: id.clone(),
                })
            }
            Target::Dependencies(dependencies) => {
                let predicates = dependencies
                    .iter()
                    .map(|d| Predicate::compile(&self.schema, d))
                    .collect::<QueryResult<Vec<_>>>()?;

                let mut selected = vec![];
                for record in records {
                    let record = record?;
                    let entry = record.decode(&self.schema, &self.path)?;
                    if predicates.iter().all(|p| p.matches(&entry)) {
                        selected.push((record.span, entry));
                    }
                }
                Ok(selected)
            }
        }
    }

    fn read_file(&self) -> QueryResult<String> {
        fs::read_to_string(&self.path).map_err(|e| QueryError::io(&self.path, e))
    }

    /// Replaces the table file: write a sibling temp file, sync, rename over.
    fn write_atomic(&self, contents: &str) -> QueryResult<()> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());
        let tmp_path = self.path.with_file_name(format!(".{file_name}.tmp"));

        let mut file = File::create(&tmp_path).map_err(|e| QueryError::io(&tmp_path, e))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| QueryError::io(&tmp_path, e))?;
        if self.sync_writes {
            file.sync_all().map_err(|e| QueryError::io(&tmp_path, e))?;
        }
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| QueryError::io(&self.path, e))?;

        // Sync the directory so the rename itself is durable
        if self.sync_writes {
            let dir = match self.path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            if let Err(e) = File::open(dir).and_then(|dir| dir.sync_all()) {
                warn!(table = %self.name, dir = ?dir, error = %e, "failed to sync table directory");
            }
        }

        debug!(table = %self.name, bytes = contents.len(), "rewrote table file");
        Ok(())
    }
}

/// 64 random bits as 16 lowercase hex digits. Uniqueness is not checked.
fn generate_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// The right-hand side of a dependency, resolved against its column once per query.
#[derive(Debug, Clone, PartialEq)]
enum Operand<'q> {
    Int(i64),
    Dec(f64),
    Text(&'q str),
}

#[derive(Debug)]
struct Predicate<'q> {
    index: usize,
    comparator: Comparator,
    operand: Operand<'q>,
}

impl<'q> Predicate<'q> {
    /// Resolves the column and decides how the value will be compared.
    fn compile(schema: &Schema, dependency: &'q HeaderDependency) -> QueryResult<Self> {
        let invalid = |reason: String| QueryError::InvalidDependency {
            column: dependency.column.clone(),
            reason,
        };

        let (index, column) = schema
            .find(&dependency.column)
            .ok_or_else(|| invalid("no such column".into()))?;
        let literal = &dependency.value;

        let operand = match dependency.comparator {
            Comparator::Contains | Comparator::NotContains => Operand::Text(literal.text()),
            Comparator::Equals | Comparator::NotEquals => {
                if literal.is_quoted() || !column.storage_type.is_numeric() {
                    Operand::Text(literal.text())
                } else {
                    match literal.classify() {
                        StorageType::Integer => literal
                            .text()
                            .parse()
                            .map(Operand::Int)
                            .map_err(|_| invalid(format!("{:?} is out of range", literal.text())))?,
                        StorageType::Decimal => literal
                            .text()
                            .parse::<f64>()
                            .ok()
                            .filter(|d| d.is_finite())
                            .map(Operand::Dec)
                            .ok_or_else(|| invalid(format!("{:?} is out of range", literal.text())))?,
                        StorageType::String => {
                            return Err(invalid(format!(
                                "{:?} cannot be compared with a {} column",
                                literal.text(),
                                column.storage_type
                            )));
                        }
                    }
                }
            }
        };

        Ok(Self {
            index,
            comparator: dependency.comparator,
            operand,
        })
    }

    fn matches(&self, entry: &Entry) -> bool {
        let value = &entry.data[self.index].1;
        match self.comparator {
            Comparator::Equals => self.equals(value),
            Comparator::NotEquals => !self.equals(value),
            Comparator::Contains => self.contains(value),
            Comparator::NotContains => !self.contains(value),
        }
    }

    fn equals(&self, value: &Value) -> bool {
        match (value, &self.operand) {
            (Value::Int(a), Operand::Int(b)) => a == b,
            (_, Operand::Text(t)) => text_form(value) == *t,
            (_, Operand::Int(b)) => value
                .as_f64()
                .is_some_and(|a| (a - *b as f64).abs() < f64::EPSILON),
            (_, Operand::Dec(b)) => value.as_f64().is_some_and(|a| (a - b).abs() < f64::EPSILON),
        }
    }

    fn contains(&self, value: &Value) -> bool {
        match &self.operand {
            Operand::Text(t) => text_form(value).contains(t),
            // compile always yields text operands for INCLUDES / EXCLUDES
            _ => false,
        }
    }
}

fn text_form(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Str(s) => Cow::Borrowed(s.as_ref()),
        other => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use tempfile::TempDir;

    use super::*;
    use crate::column::ColumnHeader;

    fn people_schema() -> Schema {
        Schema::new(vec![
            ColumnHeader::new("Name", StorageType::String),
            ColumnHeader::new("Age", StorageType::Integer),
        ])
    }

    fn people(dir: &TempDir) -> Table {
        Table::create(dir.path(), "People", people_schema())
            .unwrap()
            .with_sync_writes(false)
    }

    fn run(table: &Table, text: &str) -> QueryResult<EntrySet> {
        table.query(&Query::parse(text).unwrap())
    }

    fn add(table: &Table, name: &str, age: i64) -> String {
        let text = format!("ADD ['{name}', {age}] IN People");
        run(table, &text).unwrap().first().unwrap().id.clone()
    }

    fn names(set: &EntrySet) -> Vec<String> {
        set.iter()
            .map(|e| e.get("Name").unwrap().to_string())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────
    // Create & load
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_create_writes_header() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);

        assert_eq!(table.path(), dir.path().join("People.tbl"));
        assert_eq!(
            fs::read_to_string(table.path()).unwrap(),
            "[People,2:Name,0:Age]"
        );
    }

    #[test]
    fn test_create_rejects_existing_file_and_bad_names() {
        let dir = TempDir::new().unwrap();
        people(&dir);

        assert!(matches!(
            Table::create(dir.path(), "People", people_schema()),
            Err(QueryError::Io { .. })
        ));
        assert!(matches!(
            Table::create(dir.path(), "Bad Name", people_schema()),
            Err(QueryError::InvalidSchema { .. })
        ));
        // keywords could never be addressed from a query
        assert!(matches!(
            Table::create(dir.path(), "Drop", people_schema()),
            Err(QueryError::InvalidSchema { .. })
        ));
        assert!(matches!(
            Table::create(
                dir.path(),
                "Flags",
                Schema::new(vec![ColumnHeader::new("And", StorageType::Integer)])
            ),
            Err(QueryError::InvalidSchema { .. })
        ));
        assert!(!dir.path().join("Drop.tbl").exists());
        assert!(!dir.path().join("Flags.tbl").exists());
    }

    #[test]
    fn test_load_reads_schema_and_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Legacy.tbl");
        fs::write(
            &path,
            "[Legacy,0:Age,2:Name]{a1b2c3;I:30,S:Bob}{d4e5f6;I:46,S:Foo Bar}",
        )
        .unwrap();

        let table = Table::load(&path).unwrap();
        assert_eq!(table.name(), "Legacy");
        assert_eq!(table.schema().columns[0], ColumnHeader::new("Age", StorageType::Integer));

        let found = run(&table, "GET ENTRY d4e5f6 IN Legacy").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().unwrap().get("Name"), Some(&Value::from("Foo Bar")));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        match Table::load(dir.path().join("nope.tbl")) {
            Err(QueryError::Io { kind, .. }) => assert_eq!(kind, "NotFound"),
            other => panic!("unexpected {other:?}"),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // ADD
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_add_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);

        let added = run(&table, "ADD [Foo Bar, 46] IN People").unwrap();
        let entry = added.first().unwrap();
        assert_eq!(entry.id.len(), 16);
        assert!(entry.id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(entry.query_time_ms, None);

        let found = run(&table, &format!("GET ENTRY {} IN People", entry.id)).unwrap();
        let got = found.first().unwrap();
        assert_eq!(got.id, entry.id);
        assert_eq!(got.data, entry.data);
        assert!(got.query_time_ms.is_some());
    }

    #[test]
    fn test_add_type_mismatch_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        add(&table, "Bob", 30);
        let before = fs::read_to_string(table.path()).unwrap();

        let err = run(&table, "ADD [Alice, old] IN People").unwrap_err();
        assert_eq!(
            err,
            QueryError::TypeMismatch {
                column: "Age".into(),
                value: "old".into(),
                expected: StorageType::Integer,
            }
        );
        // an unquoted number is not a string
        assert!(matches!(
            run(&table, "ADD [42, 1] IN People"),
            Err(QueryError::TypeMismatch { .. })
        ));
        assert!(matches!(
            run(&table, "ADD [Alice, 1.5] IN People"),
            Err(QueryError::TypeMismatch { .. })
        ));

        assert_eq!(fs::read_to_string(table.path()).unwrap(), before);
    }

    #[test]
    fn test_add_value_count_mismatch() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);

        assert_eq!(
            run(&table, "ADD [Bob] IN People"),
            Err(QueryError::ValueCountMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_infinite_decimals_are_rejected() {
        let dir = TempDir::new().unwrap();
        let table = Table::create(
            dir.path(),
            "Stock",
            Schema::new(vec![ColumnHeader::new("Price", StorageType::Decimal)]),
        )
        .unwrap()
        .with_sync_writes(false);
        run(&table, "ADD [2.5] IN Stock").unwrap();
        let before = fs::read_to_string(table.path()).unwrap();

        let huge = format!("{}.0", "9".repeat(400));
        assert!(matches!(
            run(&table, &format!("ADD [{huge}] IN Stock")),
            Err(QueryError::TypeMismatch { column, .. }) if column == "Price"
        ));
        assert!(matches!(
            run(&table, &format!("SET TO [{huge}] IN Stock")),
            Err(QueryError::TypeMismatch { .. })
        ));
        assert!(matches!(
            run(&table, &format!("GET WHERE Price IS {huge} IN Stock")),
            Err(QueryError::InvalidDependency { column, .. }) if column == "Price"
        ));
        assert_eq!(fs::read_to_string(table.path()).unwrap(), before);
    }

    #[test]
    fn test_add_wildcard_is_rejected() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);

        assert!(matches!(
            run(&table, "ADD [Bob, *] IN People"),
            Err(QueryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_strings_with_special_characters_round_trip() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);

        let id = add(&table, "a}b{c,d\\e", 1);
        add(&table, "plain", 2);

        let found = run(&table, &format!("GET ENTRY {id} IN People")).unwrap();
        assert_eq!(
            found.first().unwrap().get("Name"),
            Some(&Value::from("a}b{c,d\\e"))
        );
        assert_eq!(run(&table, "GET IN People").unwrap().len(), 2);
    }

    // ─────────────────────────────────────────────────────────────
    // GET
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_get_entry_not_found() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        add(&table, "Bob", 30);

        assert_eq!(
            run(&table, "GET ENTRY deadbeef IN People"),
            Err(QueryError::EntryNotFound {
                table: "People".into(),
                id: "deadbeef".into()
            })
        );
    }

    #[test]
    fn test_get_where_is_conjunctive() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        add(&table, "Joe Blow", 96);
        add(&table, "Xavier", 1);
        add(&table, "Max", 1);
        add(&table, "Alex", 2);

        let both = run(&table, "GET WHERE Age IS 1 AND Name INCLUDES x IN People").unwrap();
        assert_eq!(names(&both), vec!["Max"]);

        let one = run(&table, "GET WHERE Age IS 1 IN People").unwrap();
        assert_eq!(names(&one), vec!["Xavier", "Max"]);

        let other = run(&table, "GET WHERE Name INCLUDES x IN People").unwrap();
        assert_eq!(names(&other), vec!["Max", "Alex"]);

        for entry in &both {
            assert!(one.contains(entry));
            assert!(other.contains(entry));
        }
    }

    #[test]
    fn test_get_all_and_negations() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        add(&table, "Foo Bar", 46);
        add(&table, "Joe Blow", 96);

        assert_eq!(run(&table, "GET IN People").unwrap().len(), 2);
        assert_eq!(
            names(&run(&table, "GET WHERE Age NOT 46 IN People").unwrap()),
            vec!["Joe Blow"]
        );
        assert_eq!(
            names(&run(&table, "GET WHERE Name EXCLUDES Blow IN People").unwrap()),
            vec!["Foo Bar"]
        );
        assert_eq!(
            names(&run(&table, "GET WHERE Name IS Foo Bar IN People").unwrap()),
            vec!["Foo Bar"]
        );
    }

    #[test]
    fn test_equality_coerces_to_column_type() {
        let dir = TempDir::new().unwrap();
        let schema = Schema::new(vec![
            ColumnHeader::new("Code", StorageType::String),
            ColumnHeader::new("Price", StorageType::Decimal),
            ColumnHeader::new("Qty", StorageType::Integer),
        ]);
        let table = Table::create(dir.path(), "Stock", schema)
            .unwrap()
            .with_sync_writes(false);
        run(&table, "ADD ['46', 2.5, 3] IN Stock").unwrap();
        run(&table, "ADD [abc, 46.0, 4] IN Stock").unwrap();

        // bare number against a string column compares text
        assert_eq!(run(&table, "GET WHERE Code IS 46 IN Stock").unwrap().len(), 1);
        // numeric comparison across integer and decimal literals
        assert_eq!(run(&table, "GET WHERE Price IS 46 IN Stock").unwrap().len(), 1);
        assert_eq!(run(&table, "GET WHERE Price IS 2.50 IN Stock").unwrap().len(), 1);
        assert_eq!(run(&table, "GET WHERE Qty IS 3.0 IN Stock").unwrap().len(), 1);
        // quoted literals compare as strings, even against numeric columns
        assert_eq!(run(&table, "GET WHERE Qty IS '3' IN Stock").unwrap().len(), 1);
        assert_eq!(run(&table, "GET WHERE Price IS '46' IN Stock").unwrap().len(), 0);
        assert_eq!(run(&table, "GET WHERE Price IS '46.0' IN Stock").unwrap().len(), 1);
        // substring tests use the string form
        assert_eq!(run(&table, "GET WHERE Price INCLUDES .5 IN Stock").unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_dependencies() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);

        assert!(matches!(
            run(&table, "GET WHERE Height IS 3 IN People"),
            Err(QueryError::InvalidDependency { column, .. }) if column == "Height"
        ));
        assert!(matches!(
            run(&table, "GET WHERE Age IS old IN People"),
            Err(QueryError::InvalidDependency { column, .. }) if column == "Age"
        ));
    }

    // ─────────────────────────────────────────────────────────────
    // REMOVE
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_remove_entry() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let first = add(&table, "Bob", 30);
        let second = add(&table, "Alice", 31);

        let removed = run(&table, &format!("REMOVE ENTRY {first} IN People")).unwrap();
        assert_eq!(names(&removed), vec!["Bob"]);

        assert!(matches!(
            run(&table, &format!("GET ENTRY {first} IN People")),
            Err(QueryError::EntryNotFound { .. })
        ));
        assert!(run(&table, &format!("GET ENTRY {second} IN People")).is_ok());
        assert!(matches!(
            run(&table, &format!("REMOVE ENTRY {first} IN People")),
            Err(QueryError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_where_splices_every_match() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        add(&table, "a", 1);
        add(&table, "b", 2);
        add(&table, "c", 1);
        add(&table, "d", 1);

        let removed = run(&table, "REMOVE WHERE Age IS 1 IN People").unwrap();
        assert_eq!(names(&removed), vec!["a", "c", "d"]);
        assert_eq!(names(&run(&table, "GET IN People").unwrap()), vec!["b"]);

        let text = fs::read_to_string(table.path()).unwrap();
        assert!(text.starts_with("[People,2:Name,0:Age]{"));
        assert_eq!(text.matches('{').count(), 1);
    }

    #[test]
    fn test_remove_without_match_keeps_file() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        add(&table, "a", 1);
        let before = fs::read_to_string(table.path()).unwrap();

        assert!(run(&table, "REMOVE WHERE Age IS 7 IN People").unwrap().is_empty());
        assert_eq!(fs::read_to_string(table.path()).unwrap(), before);
    }

    #[test]
    fn test_synced_rewrite_replaces_file() {
        let dir = TempDir::new().unwrap();
        let table = Table::create(dir.path(), "People", people_schema()).unwrap();
        add(&table, "a", 1);
        add(&table, "b", 2);

        run(&table, "REMOVE WHERE Name IS a IN People").unwrap();
        assert_eq!(names(&run(&table, "GET IN People").unwrap()), vec!["b"]);
        assert!(!dir.path().join(".People.tbl.tmp").exists());
    }

    #[test]
    fn test_remove_all() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        add(&table, "a", 1);
        add(&table, "b", 2);

        assert_eq!(run(&table, "REMOVE IN People").unwrap().len(), 2);
        assert_eq!(
            fs::read_to_string(table.path()).unwrap(),
            "[People,2:Name,0:Age]"
        );
    }

    // ─────────────────────────────────────────────────────────────
    // SET
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_set_wildcard_keeps_column() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let id = add(&table, "Joe Blow", 96);

        let updated = run(&table, &format!("SET ENTRY {id} TO [*, 97] IN People")).unwrap();
        let entry = updated.first().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.get("Age"), Some(&Value::Int(97)));
        assert!(entry.query_time_ms.is_some());

        let found = run(&table, &format!("GET ENTRY {id} IN People")).unwrap();
        let entry = found.first().unwrap();
        assert_eq!(entry.get("Name"), Some(&Value::from("Joe Blow")));
        assert_eq!(entry.get("Age"), Some(&Value::Int(97)));
    }

    #[test]
    fn test_set_where_updates_in_place() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        add(&table, "a", 1);
        add(&table, "b", 2);
        add(&table, "c", 1);

        let updated = run(&table, "SET WHERE Age IS 1 TO ['a much longer name', *] IN People")
            .unwrap();
        assert_eq!(updated.len(), 2);

        let all = run(&table, "GET IN People").unwrap();
        assert_eq!(
            names(&all),
            vec!["a much longer name", "b", "a much longer name"]
        );
    }

    #[test]
    fn test_set_type_checks_values() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let id = add(&table, "a", 1);
        let before = fs::read_to_string(table.path()).unwrap();

        assert!(matches!(
            run(&table, &format!("SET ENTRY {id} TO [*, x] IN People")),
            Err(QueryError::TypeMismatch { .. })
        ));
        assert!(matches!(
            run(&table, &format!("SET ENTRY {id} TO [*] IN People")),
            Err(QueryError::ValueCountMismatch { .. })
        ));
        assert_eq!(fs::read_to_string(table.path()).unwrap(), before);
    }

    // ─────────────────────────────────────────────────────────────
    // DROP
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_drop_deletes_file_and_blocks_queries() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let id = add(&table, "a", 1);

        assert!(run(&table, "DROP People").unwrap().is_empty());
        assert!(!table.path().exists());
        assert!(table.is_dropped());

        for text in [
            "ADD [b, 2] IN People".to_string(),
            "GET IN People".to_string(),
            format!("GET ENTRY {id} IN People"),
            "REMOVE IN People".to_string(),
            "SET TO [*, 3] IN People".to_string(),
            "DROP People".to_string(),
        ] {
            assert_eq!(
                run(&table, &text),
                Err(QueryError::TableDropped {
                    table: "People".into()
                }),
                "{text}"
            );
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Corruption & concurrency
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_corrupt_records_are_reported() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let mut file = OpenOptions::new().append(true).open(table.path()).unwrap();
        file.write_all(b"{abc;S:x,I:notanumber}").unwrap();

        assert!(matches!(
            run(&table, "GET IN People"),
            Err(QueryError::CorruptTable { .. })
        ));
    }

    #[test]
    fn test_concurrent_mutations_are_serialized() {
        let dir = TempDir::new().unwrap();
        let table = Arc::new(people(&dir));
        let seeded: Vec<String> = (0..8).map(|i| add(&table, &format!("seed{i}"), 0)).collect();

        let mut handles = vec![];
        for (t, id) in seeded.into_iter().enumerate() {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for i in 0..10 {
                    run(&table, &format!("ADD ['w{t}', {i}] IN People")).unwrap();
                    run(&table, &format!("SET ENTRY {id} TO [*, {i}] IN People")).unwrap();
                    run(&table, "GET WHERE Age IS 0 IN People").unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let all = run(&table, "GET IN People").unwrap();
        assert_eq!(all.len(), 8 + 8 * 10);
        let seeds: Vec<_> = all
            .iter()
            .filter(|e| e.get("Name").is_some_and(|n| n.to_string().starts_with("seed")))
            .collect();
        assert_eq!(seeds.len(), 8);
        assert!(seeds.iter().all(|e| e.get("Age") == Some(&Value::Int(9))));
    }
}
