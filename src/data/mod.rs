//! Input datasets.

mod loader;

pub use loader::{load_csv, parse_number, parse_year, read_dataset, Dataset};
