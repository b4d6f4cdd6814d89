//! Data module - CSV loading, schema and grouped aggregation

mod loader;
mod processor;
pub mod schema;

pub use loader::{DataLoader, LoadError, Table};
pub use processor::{AggregateRow, DataProcessor, MeanRow, ProcessorError};
