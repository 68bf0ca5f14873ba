pub mod csv_table;
pub mod discovery;
pub mod error;
pub mod polars_utils;
pub mod vocabulary;

pub use csv_table::{CsvTable, is_empty_file, read_csv_table, read_csv_table_with_delimiter};
pub use discovery::{SubtableDiscovery, discover_subtables, list_csv_files, parse_subtable_name};
pub use error::{IngestError, Result};
pub use polars_utils::{any_to_i64, any_to_optional_string};
pub use vocabulary::load_concept_reference;
