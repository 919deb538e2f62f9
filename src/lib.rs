//! Compiles Excel workbooks into canonical text fixtures: one TSV mock per
//! selected sheet, an optional SHA-1 manifest, and a deliverable bundle in
//! zip, text or text+zip form, with an incremental watch mode on top.

pub mod app;
pub mod bundle;
pub mod config;
pub mod error;
pub mod excel;
pub mod hashing;
pub mod pipeline;
pub mod watcher;

pub use app::App;
pub use config::{Config, Overrides};
pub use error::{Error, ErrorKind, Result};
