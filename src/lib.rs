pub mod cli;
pub mod config;
pub mod container;
pub mod cursor;
pub mod dedup;
pub mod importer;
pub mod index;
pub mod instances;
pub mod material;
pub mod resolver;

pub use importer::{run_import, MapImport};
