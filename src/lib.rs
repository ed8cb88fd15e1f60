pub mod ast;
pub mod codec;
pub mod column;
pub mod config;
pub mod data_type;
pub mod database;
pub mod entry;
pub mod error;
pub mod parser;
pub mod rpc;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use ast::{Comparator, HeaderDependency, Query, QuerySet, Target};
pub use column::{ColumnHeader, Schema};
pub use config::StoreConfig;
pub use data_type::StorageType;
pub use database::Database;
pub use entry::{Entry, EntrySet};
pub use error::{ParseError, QueryError, QueryResult};
pub use rpc::{Envelope, QueryPayload};
pub use table::Table;
pub use value::{Literal, Value};
