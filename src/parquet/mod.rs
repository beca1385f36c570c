//! Handles serialising and saving tables to disk in the _parquet_ file format.

pub mod table;
pub mod warnings;

pub use table::save_table;
pub use warnings::save_warnings;
