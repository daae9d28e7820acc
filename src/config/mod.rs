// src/config/mod.rs

//! Graph documents and runner settings.
//!
//! Responsibilities:
//! - Define the YAML/JSON graph document and TOML settings model (`model.rs`).
//! - Load, build and store graphs (`loader.rs`).
//! - Validate documents and settings before use (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DocumentFormat, build_graph, load_and_validate, load_from_path, load_graph, load_settings,
    store_document,
};
pub use model::{GraphDocument, JobEntry, RawGraphDocument, RunnerConfig};
pub use validate::{validate_document, validate_settings};
