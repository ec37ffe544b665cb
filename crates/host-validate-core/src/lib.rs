//! # host-validate-core
//!
//! Declarative host validation: load a set of *facts* — rules describing
//! what to examine on a host (files, directory contents, command output,
//! access permissions, or computations over other facts) — order them by
//! their inter-fact references, evaluate them, and report PASS/FAIL.
//!
//! ## Example
//!
//! ```ignore
//! use host_validate_core::{load_file, Engine, FactList, OutputMode};
//!
//! let facts = load_file(Path::new("rules/common.yaml"))?;
//! let mut engine = Engine::new(OutputMode { show_reports: true, ..Default::default() }, None);
//! let failures = engine.validate(facts)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod engine;
mod fact;
mod parse;
mod probe;
mod resolver;

pub use document::{load_file, load_str, LoadError};
pub use engine::{Engine, EngineError, OutputMode};
pub use fact::{
    AccessCheck, AccessSource, CommandSource, DictRule, DirEntSource, Expression, Fact, FactList,
    FactMatch, FileSource, ListRule, MatchTest, Parse, ParseRule, Report, ScalarRule, Severity,
    SetRule, StringSource, ValueSource,
};
pub use probe::{HostProbe, SystemProbe};
pub use resolver::ResolveError;
