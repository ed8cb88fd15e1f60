use std::collections::HashMap;
use std::fs;

use tracing::{debug, info, warn};

use crate::{
    ast::QuerySet,
    column::Schema,
    config::StoreConfig,
    entry::EntrySet,
    error::{QueryError, QueryResult},
    table::Table,
};

/// A named registry of tables.
/// It routes each query of a batch to its table and concatenates the results.
#[derive(Debug, Default)]
pub struct Database {
    /// Where [Database::create_table] puts new table files.
    config: StoreConfig,
    /// A map of table names to their respective [Table] structures.
    tables: HashMap<String, Table>,
}

impl Database {
    /// Creates a new, empty database using the default [StoreConfig].
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a new, empty database that creates its tables according to `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            tables: HashMap::default(),
        }
    }

    /// Opens every table file found in the data directory of `config`.
    ///
    /// The directory is created if missing. Files that cannot be loaded, or
    /// that declare a table name already registered, are skipped with a warning.
    pub fn open(config: StoreConfig) -> QueryResult<Self> {
        fs::create_dir_all(&config.data_dir).map_err(|e| QueryError::io(&config.data_dir, e))?;
        let dir = fs::read_dir(&config.data_dir).map_err(|e| QueryError::io(&config.data_dir, e))?;

        let mut paths = vec![];
        for entry in dir {
            let entry = entry.map_err(|e| QueryError::io(&config.data_dir, e))?;
            let path = entry.path();
            if config.is_table_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut db = Self::with_config(config);
        for path in paths {
            let table = match Table::load(&path) {
                Ok(table) => table.with_sync_writes(db.config.sync_writes),
                Err(e) => {
                    warn!(path = ?path, error = %e, "skipping unreadable table file");
                    continue;
                }
            };
            if let Err(e) = db.add_table(table) {
                warn!(path = ?path, error = %e, "skipping table file");
            }
        }

        info!(dir = ?db.config.data_dir, tables = db.tables.len(), "opened database");
        Ok(db)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates a new table file in the data directory and registers it.
    ///
    /// # Errors
    /// Returns [QueryError::TableExists] if a table with the same name is
    /// already registered, or any error of [Table::create_with].
    pub fn create_table(&mut self, name: &str, schema: Schema) -> QueryResult<&Table> {
        if self.tables.contains_key(name) {
            return Err(QueryError::TableExists {
                table: name.to_string(),
            });
        }
        let table = Table::create_with(&self.config, name, schema)?;
        Ok(self.tables.entry(name.to_string()).or_insert(table))
    }

    /// Registers an already opened table under its own name.
    ///
    /// # Errors
    /// Returns [QueryError::TableExists] if the name is taken.
    pub fn add_table(&mut self, table: Table) -> QueryResult<()> {
        if self.tables.contains_key(table.name()) {
            return Err(QueryError::TableExists {
                table: table.name().to_string(),
            });
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    /// Unregisters a table and hands it back. The table file is left alone.
    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.remove(name)
    }

    /// Retrieves a reference to a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns the names of all registered tables, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs every query of the batch in order and concatenates their results.
    ///
    /// There is no rollback: when a query fails, the mutations made by the
    /// queries before it stay applied.
    ///
    /// # Errors
    /// Returns [QueryError::TableNotFound] for an unregistered table name, or
    /// the first error raised by a table.
    pub fn query(&self, queries: &QuerySet) -> QueryResult<EntrySet> {
        let mut results = EntrySet::new();

        for (i, query) in queries.iter().enumerate() {
            let table = self
                .get_table(query.table())
                .ok_or_else(|| QueryError::TableNotFound {
                    table: query.table().to_string(),
                })?;

            let entries = table.query(query).inspect_err(|e| {
                debug!(position = i, query = %query, error = %e, "query in batch failed");
            })?;
            results.add_all(entries);
        }

        Ok(results)
    }

    /// Parses `text` as one or more queries (separated by newlines or `;`) and runs them.
    ///
    /// # Example
    /// ```
    /// use flatdb::{ColumnHeader, Database, Schema, StorageType, StoreConfig};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let mut db = Database::with_config(StoreConfig::new(dir.path()));
    /// db.create_table("Pets", Schema::new(vec![ColumnHeader::new("Name", StorageType::String)]))
    ///     .unwrap();
    ///
    /// let added = db.execute("ADD [Rex] IN Pets; ADD [Tom] IN Pets").unwrap();
    /// assert_eq!(added.len(), 2);
    /// assert_eq!(db.execute("GET WHERE Name IS Rex IN Pets").unwrap().len(), 1);
    /// ```
    pub fn execute(&self, text: &str) -> QueryResult<EntrySet> {
        let queries = QuerySet::parse(text)?;
        self.query(&queries)
    }
}
