#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # Matrix-Core-Io
//!
//! Stream discovery (C2) and the parallel analyzer-data loader (C3):
//! directory scanning, monthly-parquet reads, schema/contract enforcement,
//! and the filename-based `Stream` column repair.

pub mod contract;
pub mod convert;
pub mod discovery;
pub mod error;
pub mod loader;

pub use discovery::{discover_streams, monthly_files};
pub use error::IoError;
pub use loader::{LoadOptions, load_all_streams};
