//! Rule-document loading: YAML DTOs and their conversion into the
//! validated domain model.

pub mod dto;
pub mod loader;

pub use loader::{load_file, load_str, LoadError};
