use std::path::{Path, PathBuf};

/// Default file extension of table files.
pub const DEFAULT_EXTENSION: &str = "tbl";

/// Where and how table files are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one file per table.
    pub data_dir: PathBuf,
    /// Extension of table files, without the dot.
    pub extension: String,
    /// Whether to fsync table files (and their directory on rewrite) before returning.
    pub sync_writes: bool,
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            extension: DEFAULT_EXTENSION.to_string(),
            sync_writes: true,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Path of the backing file for table `name`.
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.{}", self.extension))
    }

    /// Whether `path` looks like a table file of this store.
    pub fn is_table_file(&self, path: &Path) -> bool {
        path.is_file() && path.extension().is_some_and(|ext| ext == self.extension.as_str())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("./data")
    }
}
