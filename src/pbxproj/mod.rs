//! Duplicate file-reference cleanup for Xcode `project.pbxproj` documents
//!
//! The cleanup is a pure text transform split into single-purpose stages:
//!
//! - `scanner`: extracts `<identifier> /* <file name> */` references
//! - `sections`: locates `Begin/End <name> section` marker ranges
//! - `duplicates`: groups references by file name, keeps the earliest
//! - `remover`: drops every line mentioning a redundant identifier
//! - `validator`: required markers and brace balance after the rewrite
//! - `pipeline`: runs the stages in order over one document

pub mod duplicates;
pub mod pipeline;
pub mod remover;
pub mod scanner;
pub mod sections;
pub mod validator;

pub use duplicates::{DuplicateGroup, DuplicateSummary};
pub use pipeline::{decode_document, CleanupPipeline, CleanupResult};
pub use remover::{MatchMode, RemovedLine};
pub use scanner::Reference;
pub use sections::MarkerWarning;
