//! A small embeddable in-memory SQL engine.
//!
//! Statements go through the [tokenizer], the [parser] and the [executor]
//! against a [Catalog] of columnar tables. [Database] ties the pipeline
//! together behind a text interface.

pub mod ast;
pub mod catalog;
pub mod column;
pub mod config;
pub mod data_type;
pub mod database;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod parser;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use catalog::Catalog;
pub use column::Column;
pub use config::Config;
pub use data_type::DataType;
pub use database::Database;
pub use error::{Error, ErrorKind, Result};
pub use executor::{Executor, QueryResult, StatementOutput};
pub use parser::parse_statements;
pub use table::{ColumnDef, Row, Schema, Table};
pub use value::Value;
